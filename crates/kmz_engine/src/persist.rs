use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("storage directory missing or not writable: {0}")]
    StorageDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure the storage directory exists; create if missing.
pub fn ensure_storage_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::StorageDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::StorageDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::StorageDir(e.to_string()))?;
    }
    Ok(())
}

/// Writes files into `dir` through a temp file in the same directory, so a
/// reader never sees a partial file under the final name.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Start a file whose content arrives in pieces.
    pub fn stage(&self) -> Result<StagedFile, PersistError> {
        ensure_storage_dir(&self.dir)?;
        let tmp = NamedTempFile::new_in(&self.dir)?;
        Ok(StagedFile {
            dir: self.dir.clone(),
            tmp,
            written: 0,
        })
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let mut staged = self.stage()?;
        staged.append(content)?;
        staged.commit(filename)
    }
}

/// Temp file being filled; removed on drop unless committed.
#[derive(Debug)]
pub struct StagedFile {
    dir: PathBuf,
    tmp: NamedTempFile,
    written: u64,
}

impl StagedFile {
    pub fn append(&mut self, chunk: &[u8]) -> Result<(), PersistError> {
        self.tmp.write_all(chunk)?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Move the content to `{dir}/{filename}`, replacing any existing file.
    pub fn commit(mut self, filename: &str) -> Result<PathBuf, PersistError> {
        self.tmp.flush()?;
        self.tmp.as_file_mut().sync_all()?;
        let target = self.dir.join(filename);
        self.tmp
            .persist(&target)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
