//! Settings loaded from the environment.

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use standup_ai::OpenAiConfig;
use standup_messaging::WhapiConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Directory of JSON files
    Json,
    /// SQLite database
    Sqlite,
}

/// Runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Data directory for the JSON backend
    pub data_dir: PathBuf,
    /// Backend
    pub storage: StorageKind,
    /// SQLite URL or path
    pub database_url: Option<String>,
    /// OpenAI key; AI features are disabled without it
    pub openai_api_key: Option<String>,
    /// OpenAI-compatible base URL
    pub openai_base_url: String,
    /// Model name
    pub openai_model: String,
    /// Model request timeout
    pub llm_timeout: Duration,
    /// Bound on each collaborator call of an insight run
    pub call_timeout: Option<Duration>,
    /// Whapi key; sending is disabled without it
    pub whapi_api_key: Option<String>,
    /// Whapi base URL
    pub whapi_base_url: String,
    /// Zone used to decide what "today" is
    pub timezone: Tz,
}

impl Settings {
    /// Load from the process environment, reading `.env` when present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to read variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let storage = match var("STANDUP_STORAGE").as_deref() {
            None | Some("json") => StorageKind::Json,
            Some("sqlite") => StorageKind::Sqlite,
            Some(other) => bail!("STANDUP_STORAGE must be 'json' or 'sqlite', got '{other}'"),
        };

        let secs = |key: &str| -> Result<Option<Duration>> {
            var(key)
                .map(|v| {
                    v.parse()
                        .map(Duration::from_secs)
                        .with_context(|| format!("{key} is not a number: '{v}'"))
                })
                .transpose()
        };
        let llm_timeout = secs("STANDUP_LLM_TIMEOUT_SECS")?.unwrap_or(Duration::from_secs(60));
        let call_timeout = secs("STANDUP_CALL_TIMEOUT_SECS")?;

        let timezone = match var("TIMEZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("TIMEZONE '{name}' is not a known zone: {e}"))?,
            None => chrono_tz::Asia::Kolkata,
        };

        Ok(Self {
            data_dir: var("STANDUP_DATA_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".standup")),
            storage,
            database_url: var("STANDUP_DATABASE_URL"),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com".to_string()),
            openai_model: var("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
            llm_timeout,
            call_timeout,
            whapi_api_key: var("WHAPI_API_KEY"),
            whapi_base_url: var("WHAPI_BASE_URL").unwrap_or_else(|| "https://gate.whapi.cloud".to_string()),
            timezone,
        })
    }

    /// Model client settings, when a key is configured.
    pub fn openai(&self) -> Option<OpenAiConfig> {
        Some(OpenAiConfig {
            api_key: self.openai_api_key.clone()?,
            base_url: self.openai_base_url.clone(),
            model: self.openai_model.clone(),
            timeout: self.llm_timeout,
            ..Default::default()
        })
    }

    /// Gateway settings, when a key is configured.
    pub fn whapi(&self) -> Option<WhapiConfig> {
        Some(WhapiConfig {
            api_key: self.whapi_api_key.clone()?,
            base_url: self.whapi_base_url.clone(),
            ..Default::default()
        })
    }
}
