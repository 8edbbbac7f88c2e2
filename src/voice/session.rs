//! Single-shot voice session
//!
//! Valid transitions:
//! - Idle -> Listening (start)
//! - Listening -> Processing (final transcript delivered)
//! - Processing -> Idle (command applied or rejected)
//! - Listening -> Idle (stop, cancel, engine failure)

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::engine::{MicrophonePermission, PermissionDecision, RecognitionError, SpeechEngine};

/// Lifecycle state of the voice session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session, ready to start
    Idle,
    /// Engine is capturing speech
    Listening,
    /// A transcript is being applied to the calculator
    Processing,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Listening => write!(f, "Listening"),
            SessionState::Processing => write!(f, "Processing"),
        }
    }
}

impl SessionState {
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        matches!(
            (self, target),
            (SessionState::Idle, SessionState::Listening)
                | (SessionState::Listening, SessionState::Processing)
                | (SessionState::Processing, SessionState::Idle)
                | (SessionState::Listening, SessionState::Idle)
        )
    }
}

/// Errors surfaced to the user from the voice channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoiceError {
    #[error("Speech recognition not supported on this host.")]
    Unsupported,

    #[error("Please allow microphone access for voice input.")]
    PermissionDenied,

    #[error("Could not start voice recognition. Try again.")]
    StartFailed(RecognitionError),

    #[error("Already listening.")]
    AlreadyListening,

    #[error("Not listening. Tap mic for voice input.")]
    NotListening,

    #[error("Voice input is resetting, try again in {remaining_ms}ms.")]
    CoolingDown { remaining_ms: u64 },

    #[error(transparent)]
    Recognition(#[from] RecognitionError),
}

/// Explicit start/stop/cancel session over a speech engine
pub struct VoiceSession {
    state: SessionState,
    engine: Box<dyn SpeechEngine>,
    permission: Box<dyn MicrophonePermission>,
    /// Minimum gap between a session ending and the next one starting
    rearm_delay: Duration,
    ended_at: Option<Instant>,
}

impl VoiceSession {
    pub fn new(
        engine: Box<dyn SpeechEngine>,
        permission: Box<dyn MicrophonePermission>,
        rearm_delay: Duration,
    ) -> Self {
        Self {
            state: SessionState::Idle,
            engine,
            permission,
            rearm_delay,
            ended_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == SessionState::Listening
    }

    pub fn is_supported(&self) -> bool {
        self.engine.is_supported()
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Start listening
    ///
    /// Permission is requested only once every other precondition holds; a
    /// denial returns before the engine is touched.
    pub fn start(&mut self) -> Result<(), VoiceError> {
        if self.state != SessionState::Idle {
            return Err(VoiceError::AlreadyListening);
        }

        if let Some(ended_at) = self.ended_at {
            let elapsed = ended_at.elapsed();
            if elapsed < self.rearm_delay {
                let remaining_ms = (self.rearm_delay - elapsed).as_millis() as u64;
                return Err(VoiceError::CoolingDown { remaining_ms });
            }
        }

        if !self.engine.is_supported() {
            return Err(VoiceError::Unsupported);
        }

        if self.permission.request() == PermissionDecision::Denied {
            info!("microphone permission denied");
            return Err(VoiceError::PermissionDenied);
        }

        if let Err(e) = self.engine.start() {
            warn!(engine = self.engine.name(), ?e, "engine failed to start");
            return Err(VoiceError::StartFailed(e));
        }

        self.transition(SessionState::Listening);
        Ok(())
    }

    /// Accept the final transcript, moving to Processing
    ///
    /// Returns the normalized (trimmed, lowercase) transcript. The caller
    /// must call [`VoiceSession::end`] once it has been applied.
    pub fn finish(&mut self, transcript: &str) -> Result<String, VoiceError> {
        if !self.is_listening() {
            return Err(VoiceError::NotListening);
        }
        self.engine.stop();
        self.transition(SessionState::Processing);
        Ok(transcript.trim().to_lowercase())
    }

    /// Record an engine failure, ending the session
    pub fn fail(&mut self, error: RecognitionError) -> VoiceError {
        if !self.is_listening() {
            return VoiceError::NotListening;
        }
        warn!(?error, "speech recognition failed");
        self.engine.abort();
        self.end();
        VoiceError::Recognition(error)
    }

    /// Stop listening without applying anything
    pub fn stop(&mut self) -> Result<(), VoiceError> {
        if !self.is_listening() {
            return Err(VoiceError::NotListening);
        }
        self.engine.stop();
        self.end();
        Ok(())
    }

    /// Abort the session without applying anything
    pub fn cancel(&mut self) -> Result<(), VoiceError> {
        if !self.is_listening() {
            return Err(VoiceError::NotListening);
        }
        self.engine.abort();
        self.end();
        Ok(())
    }

    /// Return to Idle and start the re-arm window
    pub fn end(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }
        self.transition(SessionState::Idle);
        self.ended_at = Some(Instant::now());
    }

    fn transition(&mut self, target: SessionState) {
        debug_assert!(
            self.state.can_transition_to(target),
            "invalid voice session transition {} -> {}",
            self.state,
            target
        );
        debug!(from = %self.state, to = %target, "voice session transition");
        self.state = target;
    }
}
