//! Voice input module
//!
//! Wraps an external speech-to-text engine and microphone permission
//! prompt in an explicit session with start, stop and cancel.

mod engine;
mod session;

pub use engine::{
    MicrophonePermission, RecognitionError, RelayEngine, SpeechEngine, StaticPermission,
    UnsupportedEngine,
};
pub use session::{SessionState, VoiceError, VoiceSession};
