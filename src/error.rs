// Typed errors with thiserror. Surface meaningful messages to JS.
// Unit and audio failures are absorbed by the engine; these types never reach the renderer as panics.

use thiserror::Error;

use crate::phase::Phase;
use crate::types::MicrogameId;

/// Engine error types.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown microgame: {0}")]
    UnknownMicrogame(MicrogameId),

    #[error("Microgame {microgame_id} failed: {message}")]
    UnitFailed {
        microgame_id: MicrogameId,
        message: String,
    },

    #[error("Cannot {action} while in phase {phase:?}")]
    InvalidTransition { phase: Phase, action: &'static str },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

/// Audio failures. Always swallowed by the engine after logging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("Playback rejected: {0}")]
    Rejected(String),

    #[error("Audio backend unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EngineError::InvalidConfig("missing field".to_string());
        assert!(err.to_string().contains("missing field"));

        let err = EngineError::UnknownMicrogame(MicrogameId::new("ghost"));
        assert_eq!(err.to_string(), "Unknown microgame: ghost");
    }

    #[test]
    fn invalid_transition_names_phase() {
        let err = EngineError::InvalidTransition {
            phase: Phase::Playing,
            action: "restart",
        };
        assert_eq!(err.to_string(), "Cannot restart while in phase Playing");
    }

    #[test]
    fn serde_errors_convert() {
        let err: EngineError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, EngineError::Serialization(_)));
    }
}
