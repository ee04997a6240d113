use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One face-landmark capture as sent by the browser client.
///
/// Only the fields the ingest path inspects are named; everything else
/// (timestamps, gaze predictions, ...) lands in `extra` and is written back
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Landmark points, normally 468 `[x, y, z]` triples. Kept as raw JSON so a
    /// non-array value can pass through untouched.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub pupil_left: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub pupil_right: Option<Value>,
    /// Per-sample metadata: an object, or an explicit `null` kept as given.
    #[serde(default, deserialize_with = "object_or_null", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Maps an explicit `null` to `Some(Value::Null)` so it survives a round trip.
/// A missing key still falls back to `None` through `#[serde(default)]`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Like [`present`], but rejects anything other than an object or `null`.
fn object_or_null<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        value @ (Value::Null | Value::Object(_)) => Ok(Some(value)),
        other => Err(de::Error::custom(format!(
            "metadata must be an object or null, got {other}"
        ))),
    }
}

impl Sample {
    /// Number of landmark points, or 0 when `landmarks` is missing or not an array.
    pub fn landmark_count(&self) -> usize {
        self.landmarks
            .as_ref()
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// The `metadata` object, if the sample carries one.
    pub fn metadata_map(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref().and_then(Value::as_object)
    }

    /// Take the `metadata` object out of the sample; a missing or `null`
    /// value yields an empty map.
    pub fn take_metadata_map(&mut self) -> Map<String, Value> {
        match self.metadata.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// `(pupil_left_added, pupil_right_added)` as recorded in `metadata`.
    pub fn pupil_flags(&self) -> (bool, bool) {
        let flag = |key: &str| {
            self.metadata_map()
                .and_then(|m| m.get(key))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };
        (flag(Provenance::LEFT_KEY), flag(Provenance::RIGHT_KEY))
    }

    /// Whether either pupil flag is set.
    pub fn has_pupils(&self) -> bool {
        let (left, right) = self.pupil_flags();
        left || right
    }
}

/// Body of `POST /receive_landmarks`.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub landmarks_data: Vec<Sample>,
    /// Free-form batch metadata, echoed back in the response.
    #[serde(default = "empty_object")]
    pub metadata: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Bookkeeping written into each processed sample's `metadata`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provenance {
    pub pupil_left_added: bool,
    pub pupil_right_added: bool,
    pub total_landmarks: usize,
    pub original_landmarks_count: usize,
}

impl Provenance {
    pub const LEFT_KEY: &'static str = "pupil_left_added";
    pub const RIGHT_KEY: &'static str = "pupil_right_added";
    pub const TOTAL_KEY: &'static str = "total_landmarks";
    pub const ORIGINAL_KEY: &'static str = "original_landmarks_count";

    /// Insert the four fields into `metadata`, overwriting stale values.
    pub fn write_into(&self, metadata: &mut Map<String, Value>) {
        metadata.insert(Self::LEFT_KEY.into(), Value::Bool(self.pupil_left_added));
        metadata.insert(Self::RIGHT_KEY.into(), Value::Bool(self.pupil_right_added));
        metadata.insert(Self::TOTAL_KEY.into(), Value::from(self.total_landmarks));
        metadata.insert(
            Self::ORIGINAL_KEY.into(),
            Value::from(self.original_landmarks_count),
        );
    }
}

/// Per-batch pupil summary returned to the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PupilInfo {
    /// True if any sample in the batch has `pupil_left_added`.
    pub pupil_left_added: bool,
    /// True if any sample in the batch has `pupil_right_added`.
    pub pupil_right_added: bool,
    /// Landmark count of the first sample in the batch (0 if none).
    pub total_landmarks_per_sample: usize,
}

/// Success body of `POST /receive_landmarks`.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub status: &'static str,
    pub samples_received: usize,
    pub total_samples: usize,
    pub metadata: Value,
    pub pupil_info: PupilInfo,
}

/// Aggregate statistics over the stored dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatasetStats {
    /// No dataset file exists yet.
    NoData { message: String },
    /// The dataset file holds an empty array.
    Empty { total_samples: usize },
    Success {
        total_samples: usize,
        samples_with_pupils: usize,
        average_landmarks_per_sample: f64,
        landmark_count_range: LandmarkRange,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LandmarkRange {
    pub min: usize,
    pub max: usize,
}
