//! Events module for calculator and voice session activity
//!
//! Provides structured event types broadcast by the controller to
//! subscribed IPC clients.

use serde::{Deserialize, Serialize};

use crate::calculator::{Calculation, Operator};

/// Events emitted by the controller while processing actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CalcEvent {
    /// A voice session started listening
    ListeningStarted,

    /// Listening ended without a command (stop, or after processing)
    ListeningStopped,

    /// Listening was abandoned by the user
    ListeningCancelled,

    /// The engine delivered a final transcript
    TranscriptReceived { text: String },

    /// A transcript was interpreted as an arithmetic command
    CommandRecognized {
        left: f64,
        right: f64,
        operator: Operator,
    },

    /// A transcript could not be interpreted
    CommandRejected { text: String, reason: String },

    /// A calculation finished with a numeric result
    Computed { calculation: Calculation },

    /// A division by zero produced the error sentinel
    DivisionByZero { left: f64 },

    /// The voice channel failed (permission, engine, no speech)
    VoiceFailed { message: String },

    /// The calculator was reset
    Cleared,
}

impl std::fmt::Display for CalcEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalcEvent::ListeningStarted => write!(f, "LISTENING_STARTED"),
            CalcEvent::ListeningStopped => write!(f, "LISTENING_STOPPED"),
            CalcEvent::ListeningCancelled => write!(f, "LISTENING_CANCELLED"),
            CalcEvent::TranscriptReceived { text } => write!(f, "TRANSCRIPT_RECEIVED ({:?})", text),
            CalcEvent::CommandRecognized {
                left,
                right,
                operator,
            } => write!(f, "COMMAND_RECOGNIZED ({} {} {})", left, operator, right),
            CalcEvent::CommandRejected { reason, .. } => write!(f, "COMMAND_REJECTED ({})", reason),
            CalcEvent::Computed { calculation } => {
                write!(f, "COMPUTED ({})", calculation.equation())
            }
            CalcEvent::DivisionByZero { left } => write!(f, "DIVISION_BY_ZERO ({} ÷ 0)", left),
            CalcEvent::VoiceFailed { message } => write!(f, "VOICE_FAILED ({})", message),
            CalcEvent::Cleared => write!(f, "CLEARED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = CalcEvent::CommandRecognized {
            left: 5.0,
            right: 2.0,
            operator: Operator::Add,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("command_recognized"));
        assert!(json.contains("\"operator\":\"add\""));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"listening_started"}"#;
        let event: CalcEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, CalcEvent::ListeningStarted));
    }

    #[test]
    fn test_event_display() {
        let event = CalcEvent::Computed {
            calculation: Calculation {
                left: 6.0,
                right: 3.0,
                operator: Operator::Divide,
                result: 2.0,
            },
        };
        assert_eq!(event.to_string(), "COMPUTED (6 ÷ 3 = 2)");
    }
}
