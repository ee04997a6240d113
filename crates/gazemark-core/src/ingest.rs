//! Batch augmentation: append left/right pupil points to each sample's
//! landmarks and record provenance in its metadata.

use crate::pupil::{self, Eye, PupilReading};
use crate::types::{PupilInfo, Provenance, Sample};
use serde_json::Value;

/// How `pupil_*_added` is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlagMode {
    /// Set whenever the client supplied a value, even one that was rejected
    /// as malformed and never appended.
    #[default]
    Supplied,
    /// Set only when a supplied point was actually appended.
    Appended,
}

impl FlagMode {
    fn flag(self, reading: &PupilReading) -> bool {
        match self {
            FlagMode::Supplied => reading.is_supplied(),
            FlagMode::Appended => reading.is_point(),
        }
    }
}

/// Result of processing one request's samples.
#[derive(Debug, Clone)]
pub struct ProcessedBatch {
    pub samples: Vec<Sample>,
    pub pupil_info: PupilInfo,
}

/// Process every sample independently, preserving input order.
pub fn process_batch(samples: Vec<Sample>, mode: FlagMode) -> ProcessedBatch {
    let samples: Vec<Sample> = samples
        .into_iter()
        .map(|sample| augment_sample(sample, mode).0)
        .collect();

    let pupil_info = PupilInfo {
        pupil_left_added: samples.iter().any(|s| s.pupil_flags().0),
        pupil_right_added: samples.iter().any(|s| s.pupil_flags().1),
        total_landmarks_per_sample: samples.first().map_or(0, Sample::landmark_count),
    };

    ProcessedBatch {
        samples,
        pupil_info,
    }
}

/// Append the two pupil points to `sample.landmarks`.
///
/// Samples whose `landmarks` is missing or not an array are returned
/// unchanged with `None`. Otherwise each eye contributes one point (the
/// supplied coordinates or the default origin), except a malformed value,
/// which contributes nothing. The returned provenance has already been
/// written into `sample.metadata`.
pub fn augment_sample(mut sample: Sample, mode: FlagMode) -> (Sample, Option<Provenance>) {
    let left = pupil::read(pupil::resolve(
        Eye::Left,
        sample.pupil_left.as_ref(),
        sample.metadata_map(),
    ));
    let right = pupil::read(pupil::resolve(
        Eye::Right,
        sample.pupil_right.as_ref(),
        sample.metadata_map(),
    ));

    let mut landmarks = match sample.landmarks.take() {
        Some(Value::Array(points)) => points,
        other => {
            sample.landmarks = other;
            return (sample, None);
        }
    };

    let original_landmarks_count = landmarks.len();
    append_pupil(&mut landmarks, Eye::Left, &left);
    append_pupil(&mut landmarks, Eye::Right, &right);

    let provenance = Provenance {
        pupil_left_added: mode.flag(&left),
        pupil_right_added: mode.flag(&right),
        total_landmarks: landmarks.len(),
        original_landmarks_count,
    };
    sample.landmarks = Some(Value::Array(landmarks));
    let mut metadata = sample.take_metadata_map();
    provenance.write_into(&mut metadata);
    sample.metadata = Some(Value::Object(metadata));

    (sample, Some(provenance))
}

fn append_pupil(landmarks: &mut Vec<Value>, eye: Eye, reading: &PupilReading) {
    match reading {
        PupilReading::Point(point) => landmarks.push(point.clone()),
        PupilReading::Malformed(value) => {
            tracing::warn!(eye = eye.name(), value = %value, "invalid pupil format; no point appended");
        }
        PupilReading::Missing => {
            tracing::warn!(eye = eye.name(), "pupil not supplied; default point appended");
            landmarks.push(pupil::default_point());
        }
    }
}
