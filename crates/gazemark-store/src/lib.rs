//! gazemark-store — Persistence for the landmark dataset.
//!
//! Defines the `DatasetStore` abstraction (read everything, append a batch)
//! and a JSON-file backend that rewrites the whole array on each append.

pub mod json_file;
pub mod store;

pub use json_file::JsonFileStore;
pub use store::{DatasetStore, StoreError};
