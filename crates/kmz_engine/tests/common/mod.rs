#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

use bytes::Bytes;
use kmz_engine::{ArchiveError, ArchiveReader, KmzArchive, ParsedDocument};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(kmz_logging::initialize_for_tests);
}

/// In-memory KMZ assembled entry by entry, in the order given.
#[derive(Default)]
pub struct KmzBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl KmzBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, content: impl AsRef<[u8]>) -> Self {
        self.entries
            .push((name.to_string(), content.as_ref().to_vec()));
        self
    }

    pub fn bytes(self) -> Bytes {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in self.entries {
            if name.ends_with('/') {
                zip.add_directory(name, SimpleFileOptions::default()).unwrap();
            } else {
                zip.start_file(name, SimpleFileOptions::default()).unwrap();
                zip.write_all(&content).unwrap();
            }
        }
        Bytes::from(zip.finish().unwrap().into_inner())
    }

    pub fn archive(self) -> KmzArchive {
        KmzArchive::open(self.bytes()).unwrap()
    }
}

pub fn kml(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <kml xmlns=\"http://www.opengis.net/kml/2.2\"><Document>{body}</Document></kml>"
    )
}

pub fn link(name: &str, href: &str) -> String {
    format!("<NetworkLink><name>{name}</name><Link><href>{href}</href></Link></NetworkLink>")
}

pub fn overlay(icon: &str, south: f64, west: f64, north: f64, east: f64) -> String {
    format!(
        "<GroundOverlay><Icon><href>{icon}</href></Icon><LatLonBox>\
         <north>{north}</north><south>{south}</south><east>{east}</east><west>{west}</west>\
         </LatLonBox></GroundOverlay>"
    )
}

pub fn parse(path: &str, xml: &str) -> ParsedDocument {
    ParsedDocument::parse(path, xml).unwrap()
}

/// Counts reads to prove a walk stays bounded.
pub struct CountingArchive {
    pub inner: KmzArchive,
    reads: AtomicUsize,
}

impl CountingArchive {
    pub fn new(inner: KmzArchive) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ArchiveReader for CountingArchive {
    async fn read(&self, path: &str) -> Result<Option<Bytes>, ArchiveError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(path).await
    }
}
