//! Controller owning the calculator and voice session
//!
//! Every user action (a key press, a voice session change, a transcript)
//! is processed here one at a time. Only this task mutates calculator
//! state; IPC clients send actions over a channel and await the resulting
//! display snapshot.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use crate::calculator::{Calculation, Calculator, ComputeOutcome, Key};
use crate::events::CalcEvent;
use crate::interpreter::{self, USAGE_HINT};
use crate::summary;
use crate::voice::{RecognitionError, SessionState, VoiceError, VoiceSession};

const STATUS_IDLE: &str = "Tap mic for voice input";
const STATUS_LISTENING: &str = "Listening... Speak now!";

/// Actions the controller accepts
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Manual key press
    Press(Key),
    StartListening,
    StopListening,
    CancelListening,
    /// Final transcript from the speech engine
    Transcript(String),
    /// The speech engine ended the session with an error
    RecognitionFailed(RecognitionError),
    /// Read the display without changing anything
    Snapshot,
}

/// An action paired with the channel its display snapshot is sent back on
#[derive(Debug)]
pub struct ActionRequest {
    pub action: Action,
    pub reply: oneshot::Sender<DisplaySnapshot>,
}

/// What the front end should render after an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    /// Value line
    pub result: String,
    /// Pending expression preview
    pub expression: String,
    /// Status line
    pub status: String,
    /// Error banner text; `None` hides the banner
    pub error: Option<String>,
    /// Summary panel text
    pub summary: Option<String>,
    /// Voice session state
    pub session: SessionState,
    /// Whether voice input is available at all
    pub voice_supported: bool,
}

/// Single owner of calculator and voice session state
pub struct Controller {
    calculator: Calculator,
    voice: VoiceSession,
    summary: Option<String>,
    error: Option<String>,
    /// Shown on the value line instead of the operand until the next action
    notice: Option<String>,
    event_tx: broadcast::Sender<CalcEvent>,
}

impl Controller {
    /// Create a controller with a fresh calculator
    pub fn new(voice: VoiceSession, event_tx: broadcast::Sender<CalcEvent>) -> Self {
        let error = if voice.is_supported() {
            None
        } else {
            Some(VoiceError::Unsupported.to_string())
        };

        Self {
            calculator: Calculator::new(),
            voice,
            summary: None,
            error,
            notice: None,
            event_tx,
        }
    }

    #[cfg(test)]
    pub fn calculator(&self) -> &Calculator {
        &self.calculator
    }

    /// Run the controller, processing actions until all senders are gone
    pub async fn run(&mut self, mut action_rx: mpsc::Receiver<ActionRequest>) {
        info!(engine = self.voice.engine_name(), "controller started");

        while let Some(ActionRequest { action, reply }) = action_rx.recv().await {
            let snapshot = self.handle(action);
            if reply.send(snapshot).is_err() {
                debug!("action requester went away before reply");
            }
        }

        info!("controller stopped");
    }

    /// Process one action and return the resulting display
    pub fn handle(&mut self, action: Action) -> DisplaySnapshot {
        if action != Action::Snapshot {
            self.notice = None;
        }

        match action {
            Action::Press(key) => self.handle_key(key),
            Action::StartListening => self.start_listening(),
            Action::StopListening => match self.voice.stop() {
                Ok(()) => self.emit(CalcEvent::ListeningStopped),
                Err(e) => debug!(%e, "stop ignored"),
            },
            Action::CancelListening => match self.voice.cancel() {
                Ok(()) => self.emit(CalcEvent::ListeningCancelled),
                Err(e) => debug!(%e, "cancel ignored"),
            },
            Action::Transcript(text) => self.handle_transcript(&text),
            Action::RecognitionFailed(error) => {
                let error = self.voice.fail(error);
                self.voice_failed(error);
            }
            Action::Snapshot => {}
        }

        self.snapshot()
    }

    /// Current display without processing anything
    pub fn snapshot(&self) -> DisplaySnapshot {
        let status = if self.voice.is_listening() {
            STATUS_LISTENING
        } else {
            STATUS_IDLE
        };

        DisplaySnapshot {
            result: self
                .notice
                .clone()
                .unwrap_or_else(|| self.calculator.current().to_string()),
            expression: self.calculator.expression(),
            status: status.to_string(),
            error: self.error.clone(),
            summary: self.summary.clone(),
            session: self.voice.state(),
            voice_supported: self.voice.is_supported(),
        }
    }

    fn handle_key(&mut self, key: Key) {
        debug!(%key, "key pressed");
        let outcome = self.calculator.press(key);
        if key == Key::Clear {
            self.emit(CalcEvent::Cleared);
        }
        self.record_outcome(outcome);
    }

    fn start_listening(&mut self) {
        match self.voice.start() {
            Ok(()) => {
                self.error = None;
                self.emit(CalcEvent::ListeningStarted);
            }
            Err(e) => self.voice_failed(e),
        }
    }

    fn handle_transcript(&mut self, text: &str) {
        let transcript = match self.voice.finish(text) {
            Ok(t) => t,
            Err(e) => {
                self.voice_failed(e);
                return;
            }
        };

        self.emit(CalcEvent::TranscriptReceived {
            text: transcript.clone(),
        });
        self.apply_transcript(&transcript);

        self.voice.end();
        self.emit(CalcEvent::ListeningStopped);
    }

    /// Interpret a transcript and drive it through the calculator
    fn apply_transcript(&mut self, transcript: &str) {
        let command = match interpreter::interpret(transcript) {
            Ok(command) => command,
            Err(reason) => {
                info!(%reason, transcript, "no command in transcript");
                self.notice = Some(USAGE_HINT.to_string());
                self.emit(CalcEvent::CommandRejected {
                    text: transcript.to_string(),
                    reason: reason.to_string(),
                });
                return;
            }
        };

        info!(
            left = command.left,
            right = command.right,
            operator = %command.operator,
            "voice command recognized"
        );
        self.emit(CalcEvent::CommandRecognized {
            left: command.left,
            right: command.right,
            operator: command.operator,
        });

        let outcome = self.calculator.apply_command(&command);
        if let Some(calc) = self.record_outcome(outcome) {
            self.summary = Some(summary::voice_summary(&calc, &command.raw_text));
        }
    }

    /// Emit the result of a compute and refresh the summary panel
    fn record_outcome(&mut self, outcome: Option<ComputeOutcome>) -> Option<Calculation> {
        match outcome? {
            ComputeOutcome::Value(calc) => {
                self.summary = Some(summary::calculation_summary(&calc));
                self.emit(CalcEvent::Computed { calculation: calc });
                Some(calc)
            }
            ComputeOutcome::DivisionByZero { left } => {
                self.emit(CalcEvent::DivisionByZero { left });
                None
            }
        }
    }

    fn voice_failed(&mut self, error: VoiceError) {
        let message = error.to_string();
        self.error = Some(message.clone());
        self.emit(CalcEvent::VoiceFailed { message });
    }

    fn emit(&self, event: CalcEvent) {
        debug!(%event, "emitting event");
        let _ = self.event_tx.send(event);
    }
}

/// Cloneable sender side used by IPC clients
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    action_tx: mpsc::Sender<ActionRequest>,
}

impl ControllerHandle {
    pub fn new(action_tx: mpsc::Sender<ActionRequest>) -> Self {
        Self { action_tx }
    }

    /// Send an action and wait for the controller's display snapshot
    pub async fn dispatch(&self, action: Action) -> Result<DisplaySnapshot> {
        let (reply, reply_rx) = oneshot::channel();
        self.action_tx
            .send(ActionRequest { action, reply })
            .await
            .ok()
            .context("controller is not running")?;
        reply_rx.await.context("controller dropped the action")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::calculator::Operator;
    use crate::voice::{RelayEngine, StaticPermission, UnsupportedEngine};

    fn create_controller() -> (Controller, broadcast::Receiver<CalcEvent>) {
        let (tx, rx) = broadcast::channel(64);
        let voice = VoiceSession::new(
            Box::new(RelayEngine::new()),
            Box::new(StaticPermission::allow()),
            Duration::ZERO,
        );
        (Controller::new(voice, tx), rx)
    }

    fn press_all(controller: &mut Controller, labels: &[&str]) -> DisplaySnapshot {
        let mut snapshot = controller.snapshot();
        for label in labels {
            snapshot = controller.handle(Action::Press(label.parse().unwrap()));
        }
        snapshot
    }

    fn speak(controller: &mut Controller, text: &str) -> DisplaySnapshot {
        controller.handle(Action::StartListening);
        controller.handle(Action::Transcript(text.to_string()))
    }

    fn drain(rx: &mut broadcast::Receiver<CalcEvent>) -> Vec<CalcEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_initial_display() {
        let (controller, _) = create_controller();
        let display = controller.snapshot();
        assert_eq!(display.result, "0");
        assert_eq!(display.expression, "");
        assert_eq!(display.status, STATUS_IDLE);
        assert_eq!(display.error, None);
        assert_eq!(display.session, SessionState::Idle);
    }

    #[test]
    fn test_manual_calculation() {
        let (mut controller, mut rx) = create_controller();
        let display = press_all(&mut controller, &["1", "2", "+", "3"]);
        assert_eq!(display.expression, "12 + 3");

        let display = controller.handle(Action::Press(Key::Equals));
        assert_eq!(display.result, "15");
        assert_eq!(display.expression, "");
        let summary = display.summary.unwrap();
        assert!(summary.starts_with("Calculation Summary:"));
        assert!(summary.contains("Result: 15."));

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, CalcEvent::Computed { calculation } if calculation.result == 15.0)));
    }

    #[test]
    fn test_voice_end_to_end() {
        let (mut controller, mut rx) = create_controller();

        let display = controller.handle(Action::StartListening);
        assert_eq!(display.status, STATUS_LISTENING);
        assert_eq!(display.session, SessionState::Listening);

        let display = controller.handle(Action::Transcript("Five plus two".to_string()));
        assert_eq!(display.result, "7");
        assert_eq!(display.status, STATUS_IDLE);
        assert_eq!(display.session, SessionState::Idle);
        let summary = display.summary.unwrap();
        assert!(summary.contains("addition"));
        assert!(summary.contains('7'));
        assert!(summary.contains("\"five plus two\""));

        let events = drain(&mut rx);
        assert_eq!(events[0], CalcEvent::ListeningStarted);
        assert!(events.contains(&CalcEvent::CommandRecognized {
            left: 5.0,
            right: 2.0,
            operator: Operator::Add,
        }));
        assert_eq!(events.last(), Some(&CalcEvent::ListeningStopped));
    }

    #[test]
    fn test_voice_and_manual_agree() {
        let (mut spoken, _) = create_controller();
        speak(&mut spoken, "6 divided by 4");

        let (mut typed, _) = create_controller();
        press_all(&mut typed, &["6", "÷", "4", "="]);

        assert_eq!(spoken.calculator(), typed.calculator());
    }

    #[test]
    fn test_rejected_transcript_leaves_state() {
        let (mut controller, mut rx) = create_controller();
        press_all(&mut controller, &["4", "2"]);
        let before = controller.calculator().clone();

        let display = speak(&mut controller, "hello there");
        assert_eq!(display.result, USAGE_HINT);
        assert_eq!(controller.calculator(), &before);
        assert_eq!(display.session, SessionState::Idle);
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, CalcEvent::CommandRejected { .. })));

        // The hint disappears on the next action
        let display = controller.handle(Action::Snapshot);
        assert_eq!(display.result, USAGE_HINT);
        let display = controller.handle(Action::Press(Key::Digit('1')));
        assert_eq!(display.result, "421");
    }

    #[test]
    fn test_voice_division_by_zero_skips_summary() {
        let (mut controller, _) = create_controller();
        let display = speak(&mut controller, "6 divided by 0");
        assert_eq!(display.result, "Error");
        assert_eq!(display.summary, None);
    }

    #[test]
    fn test_transcript_without_session_is_rejected() {
        let (mut controller, _) = create_controller();
        let display = controller.handle(Action::Transcript("5 plus 2".to_string()));
        assert_eq!(display.result, "0");
        assert_eq!(display.error, Some(VoiceError::NotListening.to_string()));
    }

    #[test]
    fn test_cancel_applies_nothing() {
        let (mut controller, mut rx) = create_controller();
        controller.handle(Action::StartListening);
        let display = controller.handle(Action::CancelListening);
        assert_eq!(display.session, SessionState::Idle);

        // A late transcript from the cancelled session is ignored
        let display = controller.handle(Action::Transcript("5 plus 2".to_string()));
        assert_eq!(display.result, "0");
        assert!(drain(&mut rx).contains(&CalcEvent::ListeningCancelled));
    }

    #[test]
    fn test_recognition_failure_shows_error() {
        let (mut controller, _) = create_controller();
        controller.handle(Action::StartListening);
        let display = controller.handle(Action::RecognitionFailed(RecognitionError::NoSpeech));
        assert_eq!(display.error.as_deref(), Some("No speech detected. Please try again."));
        assert_eq!(display.session, SessionState::Idle);

        // Starting a new session hides the banner
        let display = controller.handle(Action::StartListening);
        assert_eq!(display.error, None);
    }

    #[test]
    fn test_permission_denied() {
        let (tx, _rx) = broadcast::channel(16);
        let voice = VoiceSession::new(
            Box::new(RelayEngine::new()),
            Box::new(StaticPermission::deny()),
            Duration::ZERO,
        );
        let mut controller = Controller::new(voice, tx);
        let display = controller.handle(Action::StartListening);
        assert_eq!(
            display.error.as_deref(),
            Some("Please allow microphone access for voice input.")
        );
        assert_eq!(display.session, SessionState::Idle);
    }

    #[test]
    fn test_unsupported_voice_reported_at_startup() {
        let (tx, _rx) = broadcast::channel(16);
        let voice = VoiceSession::new(
            Box::new(UnsupportedEngine),
            Box::new(StaticPermission::allow()),
            Duration::ZERO,
        );
        let controller = Controller::new(voice, tx);
        let display = controller.snapshot();
        assert!(!display.voice_supported);
        assert_eq!(display.error, Some(VoiceError::Unsupported.to_string()));
    }

    #[tokio::test]
    async fn test_run_serves_handle() {
        let (mut controller, _) = create_controller();
        let (action_tx, action_rx) = mpsc::channel(8);
        let handle = ControllerHandle::new(action_tx);

        let task = tokio::spawn(async move {
            controller.run(action_rx).await;
        });

        handle.dispatch(Action::Press(Key::Digit('9'))).await.unwrap();
        let display = handle.dispatch(Action::Press(Key::Percent)).await.unwrap();
        assert_eq!(display.result, "0.09");

        drop(handle);
        tokio_test::assert_ok!(task.await);
    }
}
