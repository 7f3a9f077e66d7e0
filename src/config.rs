use anyhow::{Result, anyhow};
use directories::BaseDirs;
use serde::Deserialize;
use std::path::PathBuf;

// Public search-only credentials for the hosted Ubuntu IRC log index.
const DEFAULT_APP_ID: &str = "PBF4ZR3KBT";
const DEFAULT_API_KEY: &str = "9188cd13a0dbf3d0af949802b0e31489";
const DEFAULT_INDEX: &str = "ubuntu_irc_logs";

#[derive(Debug, Clone)]
pub struct Paths {
    pub root: PathBuf,
}

impl Paths {
    pub fn new(root_override: Option<PathBuf>) -> Result<Self> {
        let root = match root_override {
            Some(path) => path,
            None => {
                let base = BaseDirs::new().ok_or_else(|| anyhow!("missing home dir"))?;
                base.home_dir().join(".ubunolia")
            }
        };
        Ok(Self { root })
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserConfig {
    /// Algolia application id (read-only access).
    pub app_id: Option<String>,
    /// Algolia search-only API key.
    pub api_key: Option<String>,
    /// Name of the hosted index to query.
    pub index: Option<String>,
    /// Page size for general searches. The index tops out at 1000.
    pub page_size: Option<u64>,
    /// Per-request timeout in seconds.
    pub request_timeout: Option<u64>,
    /// Channel the `connect` command replays.
    pub poll_channel: Option<String>,
    /// Day prefix the `connect` command replays, e.g. "2017-05-16T".
    /// The current wall-clock HH:MM is appended each poll cycle.
    pub poll_day: Option<String>,
    /// Maximum retained session log lines.
    pub log_capacity: Option<usize>,
    /// Maximum retained command history entries.
    pub history_capacity: Option<usize>,
}

impl UserConfig {
    pub fn load(paths: &Paths) -> Result<Self> {
        let path = paths.config_file();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: UserConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn resolve_app_id(&self) -> String {
        if let Ok(app_id) = std::env::var("UBUNOLIA_APP_ID") {
            return app_id;
        }
        self.app_id
            .clone()
            .unwrap_or_else(|| DEFAULT_APP_ID.to_string())
    }

    pub fn resolve_api_key(&self) -> String {
        if let Ok(api_key) = std::env::var("UBUNOLIA_API_KEY") {
            return api_key;
        }
        self.api_key
            .clone()
            .unwrap_or_else(|| DEFAULT_API_KEY.to_string())
    }

    pub fn resolve_index(&self) -> String {
        if let Ok(index) = std::env::var("UBUNOLIA_INDEX") {
            return index;
        }
        self.index
            .clone()
            .unwrap_or_else(|| DEFAULT_INDEX.to_string())
    }

    pub fn page_size(&self) -> u64 {
        self.page_size.unwrap_or(1000)
    }

    pub fn request_timeout(&self) -> u64 {
        self.request_timeout.unwrap_or(10)
    }

    pub fn poll_channel(&self) -> String {
        self.poll_channel
            .clone()
            .unwrap_or_else(|| "ubuntu".to_string())
    }

    pub fn poll_day(&self) -> String {
        self.poll_day
            .clone()
            .unwrap_or_else(|| "2017-05-16T".to_string())
    }

    pub fn log_capacity(&self) -> usize {
        self.log_capacity.unwrap_or(100)
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity.unwrap_or(100)
    }
}
