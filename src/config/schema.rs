//! Configuration schema and file handling.

use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

use crate::inference::GenerateOptions;
use crate::session::{FullContext, SessionOptions, TailWindow};

// ── Top-level config ──────────────────────────────────────────────

/// Top-level parley configuration, loaded from `config.toml`.
///
/// Resolution order for the workspace: `PARLEY_WORKSPACE` env → `~/.parley`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory - computed at load time, not serialized.
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed at load time, not serialized.
    #[serde(skip)]
    pub config_path: PathBuf,
    /// API key for the inference backend. Overridden by `PARLEY_API_KEY` or `API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL override for the inference API (e.g. a compatible gateway).
    #[serde(default)]
    pub api_url: Option<String>,
    /// Inference client ID. Default: `"openai"`.
    #[serde(default = "default_provider")]
    pub default_provider: Option<String>,
    /// Model routed through the selected client.
    #[serde(default = "default_model")]
    pub default_model: Option<String>,
    /// Default model temperature (0.0–2.0). Default: `0.7`.
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,

    /// Session behavior (`[session]`).
    #[serde(default)]
    pub session: SessionConfig,

    /// Durable store backend (`[store]`).
    #[serde(default)]
    pub store: StoreConfig,
}

/// Session behavior configuration (`[session]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Instruction used for the system turn of every new session.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Per-turn deadline in seconds, queue wait included. `0` disables it.
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: u64,
    /// Cap on non-system turns sent to inference. Unset sends everything.
    #[serde(default)]
    pub max_context_turns: Option<usize>,
    /// Cap on generated tokens per reply. Unset defers to the backend.
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            turn_timeout_secs: default_turn_timeout_secs(),
            max_context_turns: None,
            max_output_tokens: None,
        }
    }
}

/// Durable store configuration (`[store]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend kind: `"sqlite"` or `"memory"`. Default: `"sqlite"`.
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// Directory for the sqlite database. Default: `<workspace>/state`.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
        }
    }
}

fn default_provider() -> Option<String> {
    Some("openai".to_string())
}

fn default_model() -> Option<String> {
    Some("gpt-4o-mini".to_string())
}

fn default_temperature() -> f64 {
    0.7
}

fn default_system_prompt() -> String {
    "You are a helpful assistant. Answer plainly and keep context from earlier in the conversation."
        .to_string()
}

fn default_turn_timeout_secs() -> u64 {
    120
}

fn default_store_backend() -> String {
    "sqlite".to_string()
}

impl Default for Config {
    fn default() -> Self {
        let parley_dir = default_parley_dir();
        Self {
            workspace_dir: parley_dir.clone(),
            config_path: parley_dir.join("config.toml"),
            api_key: None,
            api_url: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            session: SessionConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

fn default_parley_dir() -> PathBuf {
    let home = UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
    home.join(".parley")
}

fn resolve_parley_dir() -> PathBuf {
    match std::env::var("PARLEY_WORKSPACE") {
        Ok(dir) if !dir.trim().is_empty() => {
            PathBuf::from(shellexpand::tilde(dir.trim()).into_owned())
        }
        _ => default_parley_dir(),
    }
}

impl Config {
    pub async fn load_or_init() -> Result<Self> {
        let parley_dir = resolve_parley_dir();
        let config_path = parley_dir.join("config.toml");

        fs::create_dir_all(&parley_dir).await.with_context(|| {
            format!("Failed to create config directory: {}", parley_dir.display())
        })?;

        let (mut config, initialized) = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
            (config, false)
        } else {
            (Config::default(), true)
        };

        config.config_path = config_path.clone();
        config.workspace_dir = parley_dir;

        if initialized {
            config.save().await?;
            // Restrict permissions on the new file; it may hold an API key.
            #[cfg(unix)]
            {
                use std::{fs::Permissions, os::unix::fs::PermissionsExt};
                let _ = fs::set_permissions(&config_path, Permissions::from_mode(0o600)).await;
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        tracing::info!(
            path = %config.config_path.display(),
            workspace = %config.workspace_dir.display(),
            initialized,
            "Config loaded"
        );
        Ok(config)
    }

    pub async fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let parent_dir = self
            .config_path
            .parent()
            .context("Config path must have a parent directory")?;
        fs::create_dir_all(parent_dir).await.with_context(|| {
            format!("Failed to create config directory: {}", parent_dir.display())
        })?;

        let file_name = self
            .config_path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("config.toml");
        let temp_path = parent_dir.join(format!(".{file_name}.tmp"));

        fs::write(&temp_path, toml_str.as_bytes())
            .await
            .context("Failed to write config temp file")?;
        fs::rename(&temp_path, &self.config_path)
            .await
            .context("Failed to move config into place")?;
        Ok(())
    }

    /// Apply environment variable overrides to config.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("PARLEY_API_KEY").or_else(|_| std::env::var("API_KEY")) {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(provider) = std::env::var("PARLEY_PROVIDER") {
            if !provider.is_empty() {
                self.default_provider = Some(provider);
            }
        }
        if let Ok(model) = std::env::var("PARLEY_MODEL") {
            if !model.is_empty() {
                self.default_model = Some(model);
            }
        }
    }

    /// Validate values that would otherwise fail at arbitrary runtime points.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            anyhow::bail!("default_temperature must be between 0.0 and 2.0");
        }
        match self.store.backend.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "memory" => {}
            other => anyhow::bail!("store.backend '{other}' is not one of: sqlite, memory"),
        }
        if self.session.system_prompt.trim().is_empty() {
            anyhow::bail!("session.system_prompt must not be empty");
        }
        Ok(())
    }

    /// Session options derived from this config.
    pub fn session_options(&self) -> SessionOptions {
        let defaults = GenerateOptions::default();
        SessionOptions {
            system_prompt: self.session.system_prompt.clone(),
            generate: GenerateOptions {
                model: self.default_model.clone().unwrap_or(defaults.model),
                temperature: self.default_temperature,
                max_output_tokens: self.session.max_output_tokens,
            },
            context: match self.session.max_context_turns {
                Some(max_turns) => Arc::new(TailWindow { max_turns }),
                None => Arc::new(FullContext),
            },
        }
    }

    /// Per-turn deadline from config; `None` when disabled.
    pub fn turn_deadline(&self) -> Option<Duration> {
        match self.session.turn_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
