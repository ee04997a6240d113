use gazemark_core::Sample;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dataset {path} is not a valid JSON array of samples: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode dataset: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to replace dataset {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Backing storage for the collected samples.
///
/// Implementations are driven from a single writer, so `append` may do a
/// plain read-modify-write without its own locking.
pub trait DatasetStore: Send {
    /// Every stored sample in insertion order, or `None` if nothing has
    /// ever been written.
    fn read_all(&self) -> Result<Option<Vec<Sample>>, StoreError>;

    /// Append `samples` after the existing ones and return the new total.
    fn append(&mut self, samples: Vec<Sample>) -> Result<usize, StoreError>;
}
