//! Settings
//!
//! Built once at process start from the environment (after the CLI has loaded
//! any env file) and passed by reference to whatever needs it.

use std::collections::HashMap;
use std::time::Duration;

use crate::conversation::LoopConfig;
use crate::error::{ChatError, Result};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_PUSHOVER_API: &str = "https://api.pushover.net/1/messages.json";
pub const DEFAULT_MAX_ROUNDS: usize = 10;
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// Pushover credentials and endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct PushoverSettings {
    pub user: String,
    pub token: String,
    pub api_url: String,
}

impl std::fmt::Debug for PushoverSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushoverSettings")
            .field("user", &"***")
            .field("token", &"***")
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Process-wide settings
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,

    /// `None` when notifications are disabled
    pub pushover: Option<PushoverSettings>,

    pub max_rounds: usize,

    /// `None` disables the per-call timeout
    pub backend_timeout: Option<Duration>,
    pub tool_timeout: Option<Duration>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("openai_api_key", &"***")
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("pushover", &self.pushover)
            .field("max_rounds", &self.max_rounds)
            .field("backend_timeout", &self.backend_timeout)
            .field("tool_timeout", &self.tool_timeout)
            .finish()
    }
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// Variable names are matched case-insensitively.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup(std::env::vars()))
    }

    /// Read settings through an arbitrary lookup keyed by upper-case names
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let openai_api_key = get("OPENAI_API_KEY")
            .ok_or_else(|| ChatError::Configuration("OPENAI_API_KEY not set".into()))?;

        let pushover = match (get("PUSHOVER_USER"), get("PUSHOVER_TOKEN")) {
            (Some(user), Some(token)) => Some(PushoverSettings {
                user,
                token,
                api_url: get("PUSHOVER_API").unwrap_or_else(|| DEFAULT_PUSHOVER_API.into()),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ChatError::Configuration(
                    "PUSHOVER_USER is set but PUSHOVER_TOKEN is not".into(),
                ))
            }
            (None, Some(_)) => {
                return Err(ChatError::Configuration(
                    "PUSHOVER_TOKEN is set but PUSHOVER_USER is not".into(),
                ))
            }
        };

        let max_rounds = parse_or(get("CHATLOOP_MAX_ROUNDS"), "CHATLOOP_MAX_ROUNDS", DEFAULT_MAX_ROUNDS)?;
        let backend_timeout = timeout_secs(
            get("CHATLOOP_BACKEND_TIMEOUT_SECS"),
            "CHATLOOP_BACKEND_TIMEOUT_SECS",
            DEFAULT_BACKEND_TIMEOUT_SECS,
        )?;
        let tool_timeout = timeout_secs(
            get("CHATLOOP_TOOL_TIMEOUT_SECS"),
            "CHATLOOP_TOOL_TIMEOUT_SECS",
            DEFAULT_TOOL_TIMEOUT_SECS,
        )?;

        Ok(Self {
            openai_api_key,
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            pushover,
            max_rounds,
            backend_timeout,
            tool_timeout,
        })
    }

    /// Loop limits derived from these settings
    pub const fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            max_rounds: self.max_rounds,
            backend_timeout: self.backend_timeout,
            tool_timeout: self.tool_timeout,
        }
    }
}

/// Case-insensitive lookup over `vars`.
///
/// Values are trimmed and empty values count as unset. Settings and the CLI
/// both resolve their variables through this.
pub fn env_lookup<I>(vars: I) -> impl Fn(&str) -> Option<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let vars: HashMap<String, String> = vars
        .into_iter()
        .map(|(k, v)| (k.to_ascii_uppercase(), v))
        .collect();
    move |key: &str| {
        vars.get(&key.to_ascii_uppercase())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    value.map_or(Ok(default), |raw| {
        raw.parse()
            .map_err(|_| ChatError::Configuration(format!("{key} must be a non-negative integer, got '{raw}'")))
    })
}

// Zero disables the timeout
fn timeout_secs(value: Option<String>, key: &str, default: u64) -> Result<Option<Duration>> {
    let secs = parse_or(value, key, default)?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}
