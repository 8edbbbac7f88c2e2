//! Configuration loading and management

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::voice::{
    MicrophonePermission, RelayEngine, SpeechEngine, StaticPermission, UnsupportedEngine,
};

/// Default gap before a new voice session may start
const DEFAULT_REARM_DELAY_MS: u64 = 300;

/// Which speech engine the daemon drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Transcripts relayed from the front end over IPC
    Relay,
    /// Voice input disabled
    #[serde(rename = "none")]
    Disabled,
}

impl EngineKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "relay" => Ok(Self::Relay),
            "none" | "off" => Ok(Self::Disabled),
            other => bail!("unknown speech engine {other:?} (expected relay or none)"),
        }
    }

    pub fn build(&self) -> Box<dyn SpeechEngine> {
        match self {
            EngineKind::Relay => Box::new(RelayEngine::new()),
            EngineKind::Disabled => Box::new(UnsupportedEngine),
        }
    }
}

/// Answer given to microphone access requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MicrophonePolicy {
    Allow,
    Deny,
}

impl MicrophonePolicy {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => bail!("unknown microphone policy {other:?} (expected allow or deny)"),
        }
    }

    pub fn build(&self) -> Box<dyn MicrophonePermission> {
        match self {
            MicrophonePolicy::Allow => Box::new(StaticPermission::allow()),
            MicrophonePolicy::Deny => Box::new(StaticPermission::deny()),
        }
    }
}

/// Optional settings read from `config.json` in the data directory
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    socket_path: Option<PathBuf>,
    engine: Option<EngineKind>,
    microphone: Option<MicrophonePolicy>,
    rearm_delay_ms: Option<u64>,
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Speech engine to drive
    pub engine: EngineKind,

    /// Microphone permission policy
    pub microphone: MicrophonePolicy,

    /// Minimum gap between voice sessions
    pub rearm_delay: Duration,
}

impl Config {
    /// Load configuration from defaults, `config.json`, then environment
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("voicecalc");

        let mut config = Self::defaults(data_dir);

        let file_path = config.data_dir.join("config.json");
        if file_path.exists() {
            config.apply_file(&file_path)?;
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn defaults(data_dir: PathBuf) -> Self {
        Self {
            socket_path: data_dir.join("daemon.sock"),
            data_dir,
            engine: EngineKind::Relay,
            microphone: MicrophonePolicy::Allow,
            rearm_delay: Duration::from_millis(DEFAULT_REARM_DELAY_MS),
        }
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.apply_json(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    fn apply_json(&mut self, raw: &str) -> Result<()> {
        let file: FileConfig = serde_json::from_str(raw)?;
        if let Some(socket_path) = file.socket_path {
            self.socket_path = socket_path;
        }
        if let Some(engine) = file.engine {
            self.engine = engine;
        }
        if let Some(microphone) = file.microphone {
            self.microphone = microphone;
        }
        if let Some(ms) = file.rearm_delay_ms {
            self.rearm_delay = Duration::from_millis(ms);
        }
        Ok(())
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(path) = var("VOICECALC_SOCKET") {
            self.socket_path = PathBuf::from(path);
        }
        if let Some(engine) = var("VOICECALC_ENGINE") {
            self.engine = EngineKind::parse(&engine).context("VOICECALC_ENGINE")?;
        }
        if let Some(policy) = var("VOICECALC_MICROPHONE") {
            self.microphone = MicrophonePolicy::parse(&policy).context("VOICECALC_MICROPHONE")?;
        }
        if let Some(ms) = var("VOICECALC_REARM_MS") {
            let ms: u64 = ms.trim().parse().context("VOICECALC_REARM_MS")?;
            self.rearm_delay = Duration::from_millis(ms);
        }
        Ok(())
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}
