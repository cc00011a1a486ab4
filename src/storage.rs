//! Output artifact storage with guaranteed cleanup.
//!
//! Every annotated PDF written to disk gets a unique name,
//! `annotated_<random>.pdf`, so concurrent requests sharing an output
//! directory never collide. A [`StoredOutput`] owns its file: dropping it
//! deletes the file, which covers error paths and "send then forget" response
//! handlers. Call [`StoredOutput::persist`] or [`StoredOutput::keep`] to retain
//! the result.

use crate::error::AnnotateError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const OUTPUT_PREFIX: &str = "annotated_";
const OUTPUT_SUFFIX: &str = ".pdf";
/// Random characters in each generated name.
const NAME_ENTROPY: usize = 16;

/// A directory that annotated PDFs are written into.
#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
}

impl Default for OutputStore {
    fn default() -> Self {
        Self::temp()
    }
}

impl OutputStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the system temp directory.
    pub fn temp() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a new uniquely named file in this store.
    pub fn write(&self, bytes: &[u8]) -> Result<StoredOutput, AnnotateError> {
        let write_err = |source: std::io::Error| AnnotateError::OutputWrite {
            path: self.dir.clone(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(write_err)?;
        let mut file = tempfile::Builder::new()
            .prefix(OUTPUT_PREFIX)
            .suffix(OUTPUT_SUFFIX)
            .rand_bytes(NAME_ENTROPY)
            .tempfile_in(&self.dir)
            .map_err(write_err)?;
        file.write_all(bytes).map_err(write_err)?;
        file.flush().map_err(write_err)?;

        debug!("Stored {} bytes at {}", bytes.len(), file.path().display());
        Ok(StoredOutput { file })
    }
}

/// An annotated PDF on disk, deleted on drop unless persisted.
#[derive(Debug)]
pub struct StoredOutput {
    file: NamedTempFile,
}

impl StoredOutput {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Move the file to `dest` (atomic when on the same filesystem) and keep it.
    pub fn persist(self, dest: impl AsRef<Path>) -> Result<PathBuf, AnnotateError> {
        let dest = dest.as_ref().to_path_buf();
        self.file
            .persist(&dest)
            .map_err(|e| AnnotateError::OutputWrite {
                path: dest.clone(),
                source: e.error,
            })?;
        Ok(dest)
    }

    /// Keep the file under its generated name.
    pub fn keep(self) -> Result<PathBuf, AnnotateError> {
        let path = self.file.path().to_path_buf();
        self.file
            .keep()
            .map(|(_, p)| p)
            .map_err(|e| AnnotateError::OutputWrite {
                path,
                source: e.error,
            })
    }
}
