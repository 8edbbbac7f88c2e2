//! Speech engine and microphone permission collaborators
//!
//! The speech-to-text engine itself is a black box. The daemon only needs
//! to start, stop and abort it; final transcripts and failures are
//! delivered to the session by whoever hosts the engine.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Failure reported by the speech engine for a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", content = "code", rename_all = "snake_case")]
pub enum RecognitionError {
    #[error("Microphone access denied. Please allow microphone access.")]
    NotAllowed,

    #[error("No speech detected. Please try again.")]
    NoSpeech,

    #[error("Voice recognition error: {0}")]
    Other(String),
}

impl RecognitionError {
    /// Map an engine error code to a failure reason
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "not-allowed" | "permission_denied" => Self::NotAllowed,
            "no-speech" => Self::NoSpeech,
            "" => Self::Other("unknown".to_string()),
            other => Self::Other(other.to_string()),
        }
    }
}

/// A speech-to-text engine producing one final transcript per session
pub trait SpeechEngine: Send {
    /// Short name for logs and status
    fn name(&self) -> &'static str;

    /// Whether this host can run speech recognition at all
    fn is_supported(&self) -> bool;

    /// Begin a single-shot recognition session
    fn start(&mut self) -> Result<(), RecognitionError>;

    /// Stop listening; no further result is expected
    fn stop(&mut self);

    /// Abandon the session immediately
    fn abort(&mut self);
}

/// Engine whose transcripts are relayed from a front end over IPC
#[derive(Debug, Default)]
pub struct RelayEngine {
    active: bool,
}

impl RelayEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl SpeechEngine for RelayEngine {
    fn name(&self) -> &'static str {
        "relay"
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn start(&mut self) -> Result<(), RecognitionError> {
        if self.active {
            return Err(RecognitionError::Other("already started".to_string()));
        }
        self.active = true;
        debug!("relay engine armed");
        Ok(())
    }

    fn stop(&mut self) {
        self.active = false;
    }

    fn abort(&mut self) {
        self.active = false;
    }
}

/// Placeholder engine for hosts without speech recognition
#[derive(Debug, Default)]
pub struct UnsupportedEngine;

impl SpeechEngine for UnsupportedEngine {
    fn name(&self) -> &'static str {
        "none"
    }

    fn is_supported(&self) -> bool {
        false
    }

    fn start(&mut self) -> Result<(), RecognitionError> {
        Err(RecognitionError::Other("not supported".to_string()))
    }

    fn stop(&mut self) {}

    fn abort(&mut self) {}
}

/// Answer to a microphone access request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Granted,
    Denied,
}

/// Prompts for microphone access before a session starts
pub trait MicrophonePermission: Send {
    fn request(&mut self) -> PermissionDecision;
}

/// Permission with a fixed, configured answer
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission {
    decision: PermissionDecision,
}

impl StaticPermission {
    pub fn allow() -> Self {
        Self {
            decision: PermissionDecision::Granted,
        }
    }

    pub fn deny() -> Self {
        Self {
            decision: PermissionDecision::Denied,
        }
    }
}

impl MicrophonePermission for StaticPermission {
    fn request(&mut self) -> PermissionDecision {
        self.decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(RecognitionError::from_code("not-allowed"), RecognitionError::NotAllowed);
        assert_eq!(
            RecognitionError::from_code("permission_denied"),
            RecognitionError::NotAllowed
        );
        assert_eq!(RecognitionError::from_code("no-speech"), RecognitionError::NoSpeech);
        assert_eq!(
            RecognitionError::from_code("network"),
            RecognitionError::Other("network".to_string())
        );
        assert_eq!(
            RecognitionError::from_code("").to_string(),
            "Voice recognition error: unknown"
        );
    }

    #[test]
    fn test_relay_engine_single_shot() {
        let mut engine = RelayEngine::new();
        assert!(engine.start().is_ok());
        assert!(engine.is_active());
        assert!(engine.start().is_err());
        engine.stop();
        assert!(!engine.is_active());
        assert!(engine.start().is_ok());
    }

    #[test]
    fn test_unsupported_engine() {
        let mut engine = UnsupportedEngine;
        assert!(!engine.is_supported());
        assert!(engine.start().is_err());
    }

    #[test]
    fn test_static_permission() {
        assert_eq!(StaticPermission::allow().request(), PermissionDecision::Granted);
        assert_eq!(StaticPermission::deny().request(), PermissionDecision::Denied);
    }
}
