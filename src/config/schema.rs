use crate::error::ConfigError;
use chrono::Utc;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Sample variables used to validate the duplicate-notice template at load
/// time, so a bad template fails at startup instead of per message.
const TEMPLATE_VARS: [(&str, &str); 5] = [
    ("submitter", "bob"),
    ("original_submitter", "alice"),
    ("formatted_date", "1.1.2026 00:00:00"),
    ("url", "http://example.com"),
    ("title", "Example Domain"),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log: UrlLogConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Notice formatting for the dedup pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlLogConfig {
    /// chrono format string for the original submission time in duplicate
    /// notices.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Tera template for the duplicate notice. Available variables:
    /// `submitter`, `original_submitter`, `formatted_date`, `url`, `title`.
    #[serde(default = "default_old_message")]
    pub old_message: String,
}

fn default_date_format() -> String {
    "%-d.%-m.%Y %H:%M:%S".to_string()
}

fn default_old_message() -> String {
    "{{ submitter }}: Old link!!1! {{ original_submitter }} told this already {{ formatted_date }}"
        .to_string()
}

impl Default for UrlLogConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            old_message: default_old_message(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on the downloaded body; titles live in <head>, so the
    /// rest of a large page is never needed.
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: usize,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_content_bytes() -> usize {
    256 * 1024
}

fn default_max_redirects() -> usize {
    5
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_content_bytes: default_max_content_bytes(),
            max_redirects: default_max_redirects(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8060
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("urllog.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Config {
    /// Load the configuration, merged over defaults.
    ///
    /// With an explicit path the file must exist. Without one,
    /// `~/.urllog/config.toml` is used and a default file is written on
    /// first run.
    pub fn load_or_init(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let contents = fs::read_to_string(path)
                    .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
                Self::from_toml(&contents)?
            }
            None => {
                let config_path = Self::default_path()?;
                if config_path.exists() {
                    let contents = fs::read_to_string(&config_path)?;
                    Self::from_toml(&contents)?
                } else {
                    let config = Self::default();
                    config.save(&config_path)?;
                    config
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Load(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Load(format!("serialize config: {e}")))?;
        fs::write(path, toml_str)?;
        Ok(())
    }

    fn default_path() -> Result<PathBuf, ConfigError> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .ok_or_else(|| ConfigError::Load("could not find home directory".to_string()))?;
        Ok(home.join(".urllog").join("config.toml"))
    }

    /// Reject configurations that would fail per-message.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Date format: chrono reports bad specifiers only at render time.
        let mut rendered = String::new();
        write!(rendered, "{}", Utc::now().format(&self.log.date_format)).map_err(|_| {
            ConfigError::Validation(format!("invalid date format {:?}", self.log.date_format))
        })?;

        // Notice template: render once with every supported variable bound.
        let mut ctx = tera::Context::new();
        for (key, value) in TEMPLATE_VARS {
            ctx.insert(key, value);
        }
        tera::Tera::one_off(&self.log.old_message, &ctx, false).map_err(|e| {
            ConfigError::Validation(format!("invalid old_message template: {e}"))
        })?;

        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
