use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::blame::Pacing;

/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_VAR: &str = "WOB_CONFIG";
pub const BOT_TOKEN_VAR: &str = "WOB_TOKEN";
pub const SIGNING_SECRET_VAR: &str = "WOB_SIGNING_SECRET";
pub const APP_TOKEN_VAR: &str = "WOB_APP_TOKEN";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
}

#[derive(Deserialize, Clone)]
pub struct SlackConfig {
    /// Bot token (`xoxb-`) used for Web API calls
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub signing_secret: String,
    /// App-level token (`xapp-`) used to open Socket Mode connections
    #[serde(default)]
    pub app_token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            signing_secret: String::new(),
            app_token: String::new(),
            api_base: default_api_base(),
        }
    }
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &redact(&self.bot_token))
            .field("signing_secret", &redact(&self.signing_secret))
            .field("app_token", &redact(&self.app_token))
            .field("api_base", &self.api_base)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnimationConfig {
    #[serde(default = "default_frame_delay_ms")]
    pub frame_delay_ms: u64,
    #[serde(default = "default_drumroll_delay_ms")]
    pub drumroll_delay_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frame_delay_ms: default_frame_delay_ms(),
            drumroll_delay_ms: default_drumroll_delay_ms(),
        }
    }
}

fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))
}

fn default_api_base() -> String {
    "https://slack.com/api".to_string()
}

fn default_frame_delay_ms() -> u64 {
    1500
}

fn default_drumroll_delay_ms() -> u64 {
    2500
}

impl Config {
    /// Pacing of the blame animation
    pub fn pacing(&self) -> Pacing {
        Pacing {
            frame: Duration::from_millis(self.animation.frame_delay_ms),
            drumroll: Duration::from_millis(self.animation.drumroll_delay_ms),
        }
    }

    /// Load from the process environment, reading the file named by
    /// `WOB_CONFIG` first if it is set.
    pub fn load() -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let content = match env(CONFIG_PATH_VAR) {
            Some(path) => Some(read_config_file(Path::new(&path))?),
            None => None,
        };
        Self::from_sources(content.as_deref(), env)
    }

    /// Build the config from optional TOML text and an environment lookup.
    /// Environment values win over the file.
    pub fn from_sources<F>(content: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = match content {
            Some(content) => toml::from_str(content).context("Failed to parse config file")?,
            None => Config::default(),
        };

        let overrides = [
            (BOT_TOKEN_VAR, &mut config.slack.bot_token),
            (SIGNING_SECRET_VAR, &mut config.slack.signing_secret),
            (APP_TOKEN_VAR, &mut config.slack.app_token),
        ];
        for (key, field) in overrides {
            if let Some(value) = env(key).filter(|v| !v.trim().is_empty()) {
                *field = value;
            }
            if field.trim().is_empty() {
                bail!("{} is not set", key);
            }
        }

        Ok(config)
    }
}
