use crate::types::{DatasetStats, LandmarkRange, Sample};

/// Message reported when no dataset has been written yet.
pub const NO_DATA_MESSAGE: &str = "no dataset found";

/// Compute dataset statistics.
///
/// `None` means the backing store has never been written.
pub fn compute(dataset: Option<&[Sample]>) -> DatasetStats {
    let Some(samples) = dataset else {
        return DatasetStats::NoData {
            message: NO_DATA_MESSAGE.to_string(),
        };
    };
    if samples.is_empty() {
        return DatasetStats::Empty { total_samples: 0 };
    }

    let counts: Vec<usize> = samples.iter().map(Sample::landmark_count).collect();
    let min = counts.iter().copied().min().unwrap_or(0);
    let max = counts.iter().copied().max().unwrap_or(0);
    let average = counts.iter().sum::<usize>() as f64 / counts.len() as f64;

    DatasetStats::Success {
        total_samples: samples.len(),
        samples_with_pupils: samples.iter().filter(|s| s.has_pupils()).count(),
        average_landmarks_per_sample: average,
        landmark_count_range: LandmarkRange { min, max },
    }
}
