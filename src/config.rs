use crate::history::Overflow;
use crate::parser::Limits;
use crate::signals::InterruptPolicy;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Location of the user overlay, relative to `$HOME`.
const USER_CONFIG: &str = ".config/speak/config.toml";

/// Interpreter settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    pub prompt: String,
    pub history_capacity: usize,
    pub history_overflow: Overflow,
    pub max_line_length: usize,
    pub max_tokens: usize,
    pub max_segments: usize,
    pub child_interrupt: InterruptPolicy,
    pub pipeline_failure_stops_chain: bool,
}

/// User settings merged over the defaults; absent keys keep the default.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigOverlay {
    prompt: Option<String>,
    history_capacity: Option<usize>,
    history_overflow: Option<Overflow>,
    max_line_length: Option<usize>,
    max_tokens: Option<usize>,
    max_segments: Option<usize>,
    child_interrupt: Option<InterruptPolicy>,
    pipeline_failure_stops_chain: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// Parse the embedded default configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge user overlay from ~/.config/speak/config.toml (if exists)
    ///
    /// A broken user file is reported and ignored.
    pub fn load() -> Self {
        let mut config = Self::default_config();
        if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            match Self::read_overlay(&path) {
                Ok(overlay) => config.apply_overlay(overlay),
                Err(e) => eprintln!("speak: {e:#}"),
            }
        }
        config
    }

    /// Load the defaults merged with the overlay at `path`, which must exist and parse.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::default_config();
        config.apply_overlay(Self::read_overlay(path)?);
        Ok(config)
    }

    /// Merge an overlay given as TOML text over the defaults.
    pub fn from_overlay_str(content: &str) -> Result<Self> {
        let overlay: ConfigOverlay = toml::from_str(content).context("config parse error")?;
        let mut config = Self::default_config();
        config.apply_overlay(overlay);
        Ok(config)
    }

    fn user_config_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(Path::new(&home).join(USER_CONFIG))
    }

    fn read_overlay(path: &Path) -> Result<ConfigOverlay> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("config parse error in {}", path.display()))
    }

    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(v) = overlay.prompt {
            self.prompt = v;
        }
        if let Some(v) = overlay.history_capacity {
            self.history_capacity = v;
        }
        if let Some(v) = overlay.history_overflow {
            self.history_overflow = v;
        }
        if let Some(v) = overlay.max_line_length {
            self.max_line_length = v;
        }
        if let Some(v) = overlay.max_tokens {
            self.max_tokens = v;
        }
        if let Some(v) = overlay.max_segments {
            self.max_segments = v;
        }
        if let Some(v) = overlay.child_interrupt {
            self.child_interrupt = v;
        }
        if let Some(v) = overlay.pipeline_failure_stops_chain {
            self.pipeline_failure_stops_chain = v;
        }
    }

    /// Splitting and tokenizing ceilings.
    pub fn limits(&self) -> Limits {
        Limits {
            max_tokens: self.max_tokens,
            max_segments: self.max_segments,
        }
    }
}
