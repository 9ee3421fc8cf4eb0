//! `code-sensei.toml` discovery and parsing.
//!
//! Configuration is layered: built-in defaults, then the nearest
//! `code-sensei.toml` (or an explicit `--config` path), then environment
//! overrides. The provider token only ever comes from the environment.
//!
//! # File format
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! cors_origin = "http://localhost:5173"
//!
//! [limits]
//! max_code_chars = 10000
//!
//! [ai]
//! enabled = true
//! min_chars = 100
//! token_env = "HF_TOKEN"
//!
//! [gateway.optimize]
//! providers = ["https://api-inference.huggingface.co/models/microsoft/codereviewer-base"]
//! timeout_secs = 60
//!
//! [gateway.optimize.options]
//! temperature = 0.2
//! top_k = 40
//!
//! [rules]
//! disabled = ["magic_numbers"]
//! ```
//!
//! A partially specified `[gateway.<kind>]` table is completed from the
//! general-purpose chain, not from that kind's built-in chain.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::gateway::{Acceptance, GenerationOptions};

/// Name of the configuration file searched for on startup.
pub const CONFIG_FILE_NAME: &str = "code-sensei.toml";

const HF_MODELS: &str = "https://api-inference.huggingface.co/models";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenseiConfig {
    /// The file this config was loaded from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
    pub server: ServerConfig,
    pub limits: LimitsConfig,
    pub ai: AiConfig,
    pub gateway: GatewayConfig,
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS; `*` allows any.
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origin: "http://localhost:5173".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Longest accepted submission, in characters.
    pub max_code_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_code_chars: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// When false the gateway is skipped and every report is heuristic.
    pub enabled: bool,
    pub min_chars: usize,
    pub loading_sentinel: String,
    /// Environment variable holding the provider token.
    pub token_env: String,
    /// Resolved from `token_env`; never read from or written to the file.
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        let acceptance = Acceptance::default();
        Self {
            enabled: true,
            min_chars: acceptance.min_chars,
            loading_sentinel: acceptance.loading_sentinel,
            token_env: "HF_TOKEN".to_string(),
            token: None,
        }
    }
}

impl AiConfig {
    pub fn acceptance(&self) -> Acceptance {
        Acceptance {
            min_chars: self.min_chars,
            loading_sentinel: self.loading_sentinel.clone(),
        }
    }
}

/// An ordered provider chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Model endpoint URLs, tried in order.
    pub providers: Vec<String>,
    /// Per-provider timeout.
    pub timeout_secs: u64,
    pub options: GenerationOptions,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            providers: [
                "microsoft/codebert-base",
                "codeparrot/codeparrot",
                "gpt2",
                "facebook/blenderbot-400M-distill",
            ]
            .iter()
            .map(|model| format!("{HF_MODELS}/{model}"))
            .collect(),
            timeout_secs: 30,
            options: GenerationOptions::default(),
        }
    }
}

impl ChainConfig {
    fn optimize() -> Self {
        Self {
            providers: ["microsoft/codereviewer-base", "codeparrot/codeparrot"]
                .iter()
                .map(|model| format!("{HF_MODELS}/{model}"))
                .collect(),
            timeout_secs: 60,
            options: GenerationOptions {
                temperature: 0.2,
                top_p: 0.95,
                repetition_penalty: 1.2,
                top_k: Some(40),
                ..GenerationOptions::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub review: ChainConfig,
    pub bugs: ChainConfig,
    pub optimize: ChainConfig,
    pub learn: ChainConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            review: ChainConfig::default(),
            bugs: ChainConfig::default(),
            optimize: ChainConfig::optimize(),
            learn: ChainConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Rule IDs that are never evaluated.
    pub disabled: Vec<String>,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Walk up from `start_dir` and return the first `code-sensei.toml` found.
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = if start_dir.is_file() {
        start_dir.parent()?.to_path_buf()
    } else {
        start_dir.to_path_buf()
    };

    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl SenseiConfig {
    /// Parse a config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;

        let mut config: SenseiConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Load the explicit file, or discover one upward from `start_dir`.
    /// Environment overrides are not applied.
    pub fn discover(explicit: Option<&Path>, start_dir: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match find_config_file(start_dir) {
                Some(path) => Self::from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Full startup load: file layer from the working directory, then the
    /// process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("reading current directory")?;
        let mut config = Self::discover(explicit, &cwd)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.ai.token = lookup(&self.ai.token_env).filter(|t| !t.trim().is_empty());

        if let Some(port) = lookup("PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid PORT"),
            }
        }

        if let Some(flag) = lookup("CODE_SENSEI_AI_ENABLED") {
            match parse_flag(&flag) {
                Some(enabled) => self.ai.enabled = enabled,
                None => warn!(value = %flag, "Ignoring invalid CODE_SENSEI_AI_ENABLED"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
