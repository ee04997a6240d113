//! Whole-file JSON dataset backend.
//!
//! The dataset is one pretty-printed JSON array. Every append reads the
//! array, extends it and writes it back through a temp file in the same
//! directory, so a crash mid-write leaves the previous dataset intact.

use crate::store::{DatasetStore, StoreError};
use gazemark_core::Sample;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the dataset file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn write_all(&self, samples: &[Sample]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        {
            let mut writer = BufWriter::new(&mut tmp);
            serde_json::to_writer_pretty(&mut writer, samples).map_err(StoreError::Encode)?;
            writer.flush().map_err(|e| self.io_error(e))?;
        }
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;

        tmp.persist(&self.path).map_err(|e| StoreError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;
        Ok(())
    }
}

impl DatasetStore for JsonFileStore {
    fn read_all(&self) -> Result<Option<Vec<Sample>>, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    fn append(&mut self, samples: Vec<Sample>) -> Result<usize, StoreError> {
        let mut dataset = self.read_all()?.unwrap_or_default();
        let added = samples.len();
        dataset.extend(samples);
        self.write_all(&dataset)?;

        tracing::debug!(
            path = %self.path.display(),
            added,
            total = dataset.len(),
            "dataset written"
        );
        Ok(dataset.len())
    }
}
