//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::calculator::Key;
use crate::controller::{Action, DisplaySnapshot};
use crate::events::CalcEvent;
use crate::voice::{RecognitionError, SessionState};

/// Largest frame body either side may send
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from a front end to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// Request the current display without changing anything
    GetDisplay,

    /// Manual key press, e.g. `"7"`, `"+"`, `"="`, `"DEL"`
    Press { key: Key },

    /// Begin a voice session
    StartListening,

    /// End the voice session without applying anything
    StopListening,

    /// Abandon the voice session
    CancelListening,

    /// Final transcript from the front end's speech engine
    Transcript { text: String },

    /// The front end's speech engine failed with an error code
    RecognitionFailed { code: String },

    /// Subscribe to event notifications
    Subscribe,

    /// Stop the daemon
    Shutdown,
}

impl Request {
    /// Controller action for requests that go through the calculator
    pub fn action(&self) -> Option<Action> {
        match self {
            Request::GetStatus | Request::GetDisplay => Some(Action::Snapshot),
            Request::Press { key } => Some(Action::Press(*key)),
            Request::StartListening => Some(Action::StartListening),
            Request::StopListening => Some(Action::StopListening),
            Request::CancelListening => Some(Action::CancelListening),
            Request::Transcript { text } => Some(Action::Transcript(text.clone())),
            Request::RecognitionFailed { code } => {
                Some(Action::RecognitionFailed(RecognitionError::from_code(code)))
            }
            Request::Ping | Request::Subscribe | Request::Shutdown => None,
        }
    }
}

/// Responses from daemon to a front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current daemon status
    Status(DaemonStatus),

    /// Display after the request was processed
    Display(DisplaySnapshot),

    /// Subscription confirmed
    Subscribed,

    /// Shutdown has been requested
    ShuttingDown,

    /// Error response
    Error { code: String, message: String },
}

/// Push notification from daemon to subscribed clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Notification {
    /// Controller event occurred
    Event(CalcEvent),
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Configured speech engine
    pub engine: String,

    /// Whether voice input is available
    pub voice_supported: bool,

    /// Voice session state
    pub session: SessionState,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl DaemonStatus {
    pub fn new(engine: &str, display: &DisplaySnapshot, uptime_secs: u64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            engine: engine.to_string(),
            voice_supported: display.voice_supported,
            session: display.session,
            uptime_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::Operator;

    #[test]
    fn test_request_serialization() {
        let req = Request::Press {
            key: Key::Operator(Operator::Multiply),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"type":"press","key":"×"}"#);
    }

    #[test]
    fn test_request_deserialization() {
        let req: Request = serde_json::from_str(r#"{"type":"press","key":"7"}"#).unwrap();
        assert_eq!(req.action(), Some(Action::Press(Key::Digit('7'))));

        let req: Request =
            serde_json::from_str(r#"{"type":"recognition_failed","code":"no-speech"}"#).unwrap();
        assert_eq!(
            req.action(),
            Some(Action::RecognitionFailed(RecognitionError::NoSpeech))
        );

        assert!(serde_json::from_str::<Request>(r#"{"type":"press","key":"sqrt"}"#).is_err());
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Error {
            code: "bad_request".to_string(),
            message: "nope".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"type\":\"error\""));
    }

    #[test]
    fn test_notification_keeps_event_tag() {
        let note = Notification::Event(CalcEvent::ListeningStarted);
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(json, r#"{"type":"event","data":{"type":"listening_started"}}"#);
    }
}
