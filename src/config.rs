use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "HealthInsight";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Placeholder substituted for a recognized patient identifier.
pub const REDACTION_TOKEN: &str = "[REDACTED]";

/// Largest upload accepted by the HTTP layer.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024; // 25MB

/// Upper bound on in-memory report sessions before the oldest is evicted.
pub const MAX_SESSIONS: usize = 256;

/// OpenAI-compatible completion endpoint (Groq).
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_ANALYSIS_MODEL: &str = "mixtral-8x7b-32768";
pub const DEFAULT_CHAT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "healthinsight_lib=info,healthinsight=info,tower_http=warn"
}

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub analysis_model: String,
    pub chat_model: String,
    pub timeout_secs: u64,
    pub bind: SocketAddr,
    /// Directory for transient upload copies. `None` uses the OS temp dir.
    pub staging_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            bind: SocketAddr::from(([127, 0, 0, 1], 8501)),
            staging_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Unparseable values fall
    /// back to defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout_secs = match non_empty("HEALTHINSIGHT_TIMEOUT_SECS") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Invalid HEALTHINSIGHT_TIMEOUT_SECS, using default");
                defaults.timeout_secs
            }),
            None => defaults.timeout_secs,
        };

        let bind = match non_empty("HEALTHINSIGHT_BIND") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Invalid HEALTHINSIGHT_BIND, using {DEFAULT_BIND}");
                defaults.bind
            }),
            None => defaults.bind,
        };

        Self {
            api_key: non_empty("GROQ_API_KEY"),
            api_base: non_empty("HEALTHINSIGHT_API_BASE").unwrap_or(defaults.api_base),
            analysis_model: non_empty("HEALTHINSIGHT_ANALYSIS_MODEL")
                .unwrap_or(defaults.analysis_model),
            chat_model: non_empty("HEALTHINSIGHT_CHAT_MODEL").unwrap_or(defaults.chat_model),
            timeout_secs,
            bind,
            staging_dir: non_empty("HEALTHINSIGHT_STAGING_DIR").map(PathBuf::from),
        }
    }
}
