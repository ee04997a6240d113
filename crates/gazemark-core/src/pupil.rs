//! Pupil coordinate resolution and normalization.
//!
//! The client may place `pupil_left`/`pupil_right` on the sample itself or
//! inside its `metadata`. Each eye is resolved independently and the
//! top-level field wins.

use serde_json::{Map, Value};

/// The point appended when the client supplied no pupil for an eye.
pub const DEFAULT_PUPIL_POINT: [f64; 3] = [0.0, 0.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    /// JSON field carrying this eye's coordinates.
    pub fn field(self) -> &'static str {
        match self {
            Eye::Left => "pupil_left",
            Eye::Right => "pupil_right",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Eye::Left => "left",
            Eye::Right => "right",
        }
    }
}

/// Outcome of inspecting one eye's resolved pupil value.
#[derive(Debug, Clone, PartialEq)]
pub enum PupilReading {
    /// Nothing supplied (or an explicit `null`).
    Missing,
    /// Supplied, but not a sequence of at least two elements.
    Malformed(Value),
    /// Normalized `[x, y, z]` point ready to append.
    Point(Value),
}

impl PupilReading {
    /// Whether the client supplied anything for this eye, well-formed or not.
    pub fn is_supplied(&self) -> bool {
        !matches!(self, PupilReading::Missing)
    }

    pub fn is_point(&self) -> bool {
        matches!(self, PupilReading::Point(_))
    }
}

/// Pick the value for `eye`: the top-level field if set, else `metadata.<field>`.
pub fn resolve<'a>(
    eye: Eye,
    top_level: Option<&'a Value>,
    metadata: Option<&'a Map<String, Value>>,
) -> Option<&'a Value> {
    top_level
        .filter(|v| !v.is_null())
        .or_else(|| metadata.and_then(|m| m.get(eye.field())))
        .filter(|v| !v.is_null())
}

/// Classify a resolved value and, if usable, normalize it to three components.
///
/// `[x, y]` becomes `[x, y, 0.0]`; longer sequences keep their first three
/// elements. Components are copied as given, without type checks, so integer
/// pixel coordinates stay integers and a client-side `NaN` (sent as `null`)
/// still occupies its slot.
pub fn read(value: Option<&Value>) -> PupilReading {
    let Some(value) = value else {
        return PupilReading::Missing;
    };

    let Some(coords) = value.as_array() else {
        return PupilReading::Malformed(value.clone());
    };
    if coords.len() < 2 {
        return PupilReading::Malformed(value.clone());
    }

    let mut point: Vec<Value> = coords[..coords.len().min(3)].to_vec();
    if point.len() == 2 {
        point.push(Value::from(0.0));
    }
    PupilReading::Point(Value::Array(point))
}

/// `[0.0, 0.0, 0.0]` as a JSON value.
pub fn default_point() -> Value {
    Value::Array(DEFAULT_PUPIL_POINT.iter().map(|&c| Value::from(c)).collect())
}
