// Strong typing over strings. Newtypes for timestamps, identifiers, and normalized units.
// All clocks come from the host; the engine never reads wall time itself.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Timestamp in milliseconds on the host's clock. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_millis(ms: u64) -> Self {
        Timestamp(ms)
    }

    /// Convert a JS `performance.now()` style value. Negative and NaN clamp to zero.
    pub fn from_host_millis(ms: f64) -> Self {
        if ms.is_finite() && ms > 0.0 {
            Timestamp(ms as u64)
        } else {
            Timestamp(0)
        }
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_secs(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn saturating_add(&self, ms: u64) -> Self {
        Timestamp(self.0.saturating_add(ms))
    }

    /// Milliseconds elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn saturating_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Identifier of a microgame capability in the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MicrogameId(String);

impl MicrogameId {
    pub fn new(id: impl Into<String>) -> Self {
        MicrogameId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MicrogameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MicrogameId {
    fn from(id: &str) -> Self {
        MicrogameId::new(id)
    }
}

/// Reference to an audio asset the host knows how to load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        TrackId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result reported by a microgame. Scoring depends on nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub win: bool,
}

impl Outcome {
    pub const WIN: Outcome = Outcome { win: true };
    pub const LOSE: Outcome = Outcome { win: false };
}

/// Normalized coordinate (0.0 to 1.0, resolution-independent).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NormalizedCoord {
    pub x: f32,
    pub y: f32,
}

impl NormalizedCoord {
    pub fn new(x: f32, y: f32) -> Self {
        NormalizedCoord {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    pub fn center() -> Self {
        NormalizedCoord { x: 0.5, y: 0.5 }
    }

    pub fn distance(&self, other: &NormalizedCoord) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Pointer state forwarded by the host on every animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct InputState {
    pub pointer: Option<NormalizedCoord>,
    #[serde(default)]
    pub pressed: bool,
}

impl InputState {
    pub fn pointer_at(x: f32, y: f32) -> Self {
        InputState {
            pointer: Some(NormalizedCoord::new(x, y)),
            pressed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_conversions() {
        let ts = Timestamp::from_millis(1_500);
        assert_eq!(ts.as_millis(), 1_500);
        assert!((ts.as_secs() - 1.5).abs() < 0.0001);
        assert_eq!(ts.saturating_add(500).as_millis(), 2_000);
        assert_eq!(ts.saturating_since(Timestamp::from_millis(2_000)), 0);
    }

    #[test]
    fn host_millis_clamp() {
        assert_eq!(Timestamp::from_host_millis(-4.0).as_millis(), 0);
        assert_eq!(Timestamp::from_host_millis(f64::NAN).as_millis(), 0);
        assert_eq!(Timestamp::from_host_millis(16.7).as_millis(), 16);
    }

    #[test]
    fn normalized_coord_clamps() {
        let coord = NormalizedCoord::new(1.5, -0.5);
        assert_eq!(coord.x, 1.0);
        assert_eq!(coord.y, 0.0);
    }

    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let id = MicrogameId::new("avoid");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"avoid\"");
        let track: TrackId = serde_json::from_str("\"theme\"").unwrap();
        assert_eq!(track.as_str(), "theme");
    }
}
