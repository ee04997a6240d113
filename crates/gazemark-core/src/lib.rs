//! gazemark-core — Landmark sample model and ingest logic.
//!
//! Resolves pupil coordinates supplied by the eye-tracking client, appends
//! them to each sample's face-mesh landmarks, and computes statistics over
//! the collected dataset. No I/O happens here.

pub mod ingest;
pub mod pupil;
pub mod stats;
pub mod types;

pub use ingest::{process_batch, FlagMode, ProcessedBatch};
pub use types::{DatasetStats, IngestRequest, IngestSummary, PupilInfo, Sample};

/// Dataset file name used when none is configured.
pub const DEFAULT_DATASET_FILE: &str = "face_landmarks_dataset_with_pupil.json";
