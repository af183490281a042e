use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Longest silence tolerated between analyze stream chunks.
    pub stream_idle_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base: String,
    pub http: HttpSettings,
    pub offline: bool,
    pub store: StoreKind,
    pub comparison_enabled: bool,
    pub export_dir: PathBuf,
}

impl AppConfig {
    /// Reads the process environment. Call after the dotenv files are loaded.
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let api_base = var("ROAST_API_BASE")
            .map(|val| val.trim().trim_end_matches('/').to_string())
            .filter(|val| !val.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let request_timeout = var("ROAST_REQUEST_TIMEOUT_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(60)
            .clamp(5, 600);
        let connect_timeout = var("ROAST_CONNECT_TIMEOUT_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(10)
            .clamp(1, 120);
        let stream_idle_timeout = var("ROAST_STREAM_IDLE_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(120)
            .clamp(10, 900);
        let store = match var("ROAST_SESSION_STORE")
            .unwrap_or_default()
            .trim()
            .to_lowercase()
            .as_str()
        {
            "file" => StoreKind::File,
            _ => StoreKind::Memory,
        };
        let export_dir = var("ROAST_EXPORT_DIR")
            .filter(|val| !val.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            api_base,
            http: HttpSettings {
                request_timeout: Duration::from_secs(request_timeout),
                connect_timeout: Duration::from_secs(connect_timeout),
                stream_idle_timeout: Duration::from_secs(stream_idle_timeout),
            },
            offline: flag(var("ROAST_OFFLINE")),
            store,
            comparison_enabled: flag(var("ROAST_COMPARISON")),
            export_dir,
        }
    }
}

fn flag(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim).map(str::to_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
