use std::collections::HashMap;
use std::io::{Cursor, Read};

use bytes::Bytes;
use kmz_core::normalize_entry_name;
use kmz_logging::kmz_debug;
use zip::ZipArchive;

/// Largest buffer reserved up front for one entry.
const MAX_PREALLOCATION: u64 = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive worker failed: {0}")]
    Worker(String),
}

/// Read access to archive entries by exact, archive-relative path.
#[async_trait::async_trait]
pub trait ArchiveReader: Send + Sync {
    /// Decompressed bytes of the file at `path`, or `None` when the archive
    /// has no such file (directory markers included).
    async fn read(&self, path: &str) -> Result<Option<Bytes>, ArchiveError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
}

/// Zip archive held fully in memory. The central directory is parsed once;
/// each read decompresses its entry on the blocking pool.
#[derive(Clone)]
pub struct KmzArchive {
    zip: ZipArchive<Cursor<Bytes>>,
    entries: Vec<ArchiveEntry>,
    by_path: HashMap<String, usize>,
}

impl KmzArchive {
    pub fn open(bytes: Bytes) -> Result<Self, ArchiveError> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(zip.len());
        let mut by_path = HashMap::with_capacity(zip.len());
        for index in 0..zip.len() {
            let file = zip.by_index_raw(index)?;
            let path = normalize_entry_name(file.name());
            let entry = ArchiveEntry {
                is_dir: file.is_dir(),
                size: file.size(),
                path,
            };
            // First occurrence wins for duplicated names.
            by_path.entry(entry.path.clone()).or_insert(index);
            entries.push(entry);
        }
        kmz_debug!("Opened archive with {} entries", entries.len());
        Ok(Self {
            zip,
            entries,
            by_path,
        })
    }

    /// Entries in archive order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path
            .get(path)
            .is_some_and(|&index| !self.entries[index].is_dir)
    }

    /// First KML document in archive order.
    pub fn root_document(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| !entry.is_dir && is_kml_name(&entry.path))
            .map(|entry| entry.path.as_str())
    }
}

#[async_trait::async_trait]
impl ArchiveReader for KmzArchive {
    async fn read(&self, path: &str) -> Result<Option<Bytes>, ArchiveError> {
        let Some(&index) = self.by_path.get(path) else {
            return Ok(None);
        };
        if self.entries[index].is_dir {
            return Ok(None);
        }

        let mut zip = self.zip.clone();
        let capacity = initial_capacity(self.entries[index].size);
        tokio::task::spawn_blocking(move || -> Result<Option<Bytes>, ArchiveError> {
            let mut file = zip.by_index(index)?;
            let mut buf = Vec::with_capacity(capacity);
            file.read_to_end(&mut buf)?;
            Ok(Some(Bytes::from(buf)))
        })
        .await
        .map_err(|err| ArchiveError::Worker(err.to_string()))?
    }
}

/// Sizes in the central directory are untrusted; a larger entry still reads
/// fully, it just grows the buffer as it goes.
fn initial_capacity(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOCATION)).unwrap_or(0)
}

fn is_kml_name(path: &str) -> bool {
    path.len() > 4
        && path
            .get(path.len() - 4..)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(".kml"))
}

#[cfg(test)]
mod tests {
    use super::{initial_capacity, is_kml_name, MAX_PREALLOCATION};

    #[test]
    fn kml_names_match_case_insensitively() {
        assert!(is_kml_name("doc.kml"));
        assert!(is_kml_name("files/DOC.KML"));
        assert!(!is_kml_name(".kml"));
        assert!(!is_kml_name("doc.kmz"));
        assert!(!is_kml_name("kml"));
    }

    #[test]
    fn declared_sizes_do_not_drive_allocation() {
        assert_eq!(initial_capacity(512), 512);
        assert_eq!(initial_capacity(u64::MAX), MAX_PREALLOCATION as usize);
    }
}
