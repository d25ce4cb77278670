use std::{fmt, num::NonZeroU32, path::Path, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use url::Url;

use super::query::DEFAULT_PAGE_SIZE;

/// Client configuration.
///
/// Stored as TOML with a `_version` tag so the on-disk format can evolve
/// independently of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Versions", into = "Versions")]
pub struct Config {
    /// Base URL of the catalog REST API.
    api_url: Url,

    /// Base URL of the web viewer, used to build shareable permalinks.
    web_url: Url,

    /// Records per list page.
    page_size: NonZeroU32,

    /// Per-request timeout, in seconds.
    timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            web_url: default_web_url(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Errors raised while loading, saving or editing the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file: {0}")]
    Read(#[source] std::io::Error),

    /// The file could not be written.
    #[error("Failed to write config file: {0}")]
    Write(#[source] std::io::Error),

    /// The file is not valid TOML or holds invalid values.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// No such setting.
    #[error("unknown setting '{0}' (expected one of: api_url, web_url, page_size, timeout_secs)")]
    UnknownKey(String),

    /// The value is not valid for the setting.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// The setting being changed.
        key: ConfigKey,
        /// Why the value was rejected.
        reason: String,
    },
}

/// A named configuration setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    /// `api_url`
    ApiUrl,
    /// `web_url`
    WebUrl,
    /// `page_size`
    PageSize,
    /// `timeout_secs`
    TimeoutSecs,
}

impl ConfigKey {
    /// All settings, in display order.
    pub const ALL: [Self; 4] = [Self::ApiUrl, Self::WebUrl, Self::PageSize, Self::TimeoutSecs];

    /// The setting's name in the config file.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ApiUrl => "api_url",
            Self::WebUrl => "web_url",
            Self::PageSize => "page_size",
            Self::TimeoutSecs => "timeout_secs",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.name() == s.trim().replace('-', "_"))
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads the configuration, falling back to defaults if the file does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(ConfigError::Write)
    }

    /// Base URL of the catalog API.
    #[must_use]
    pub const fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Base URL of the web viewer.
    #[must_use]
    pub const fn web_url(&self) -> &Url {
        &self.web_url
    }

    /// Records per list page.
    #[must_use]
    pub const fn page_size(&self) -> NonZeroU32 {
        self.page_size
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Overrides the API base URL.
    pub fn set_api_url(&mut self, url: Url) {
        self.api_url = url;
    }

    /// Returns a setting's value as text.
    #[must_use]
    pub fn get(&self, key: ConfigKey) -> String {
        match key {
            ConfigKey::ApiUrl => self.api_url.to_string(),
            ConfigKey::WebUrl => self.web_url.to_string(),
            ConfigKey::PageSize => self.page_size.to_string(),
            ConfigKey::TimeoutSecs => self.timeout_secs.to_string(),
        }
    }

    /// Parses and applies a setting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the value cannot be parsed;
    /// the configuration is left unchanged.
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue { key, reason };
        let value = value.trim();

        match key {
            ConfigKey::ApiUrl => self.api_url = parse_base_url(value).map_err(invalid)?,
            ConfigKey::WebUrl => self.web_url = parse_base_url(value).map_err(invalid)?,
            ConfigKey::PageSize => {
                self.page_size = value
                    .parse()
                    .map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;
            }
            ConfigKey::TimeoutSecs => {
                self.timeout_secs = value
                    .parse()
                    .map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;
            }
        }
        Ok(())
    }
}

/// Parses a base URL, requiring an http(s) scheme.
///
/// # Errors
///
/// Returns a description of the problem if the URL is invalid.
pub fn parse_base_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| format!("'{raw}' is not a valid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}', expected http or https")),
    }
}

fn default_api_url() -> Url {
    Url::parse("http://localhost:8000").expect("default api url is valid")
}

fn default_web_url() -> Url {
    Url::parse("http://localhost:3000").expect("default web url is valid")
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_page_size() -> NonZeroU32 {
    DEFAULT_PAGE_SIZE
}

/// The serialized versions of the configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_url: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        web_url: Option<String>,

        #[serde(default = "default_page_size")]
        page_size: NonZeroU32,

        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl TryFrom<Versions> for Config {
    type Error = String;

    fn try_from(versions: Versions) -> Result<Self, Self::Error> {
        match versions {
            Versions::V1 {
                api_url,
                web_url,
                page_size,
                timeout_secs,
            } => Ok(Self {
                api_url: api_url
                    .as_deref()
                    .map_or_else(|| Ok(default_api_url()), parse_base_url)?,
                web_url: web_url
                    .as_deref()
                    .map_or_else(|| Ok(default_web_url()), parse_base_url)?,
                page_size,
                timeout_secs,
            }),
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            api_url: Some(config.api_url.to_string()),
            web_url: Some(config.web_url.to_string()),
            page_size: config.page_size,
            timeout_secs: config.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\napi_url = \"https://api.example.org\"\npage_size = 20\ntimeout_secs = 5\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.api_url().as_str(), "https://api.example.org/");
        assert_eq!(config.web_url().as_str(), "http://localhost:3000/");
        assert_eq!(config.page_size().get(), 20);
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.to_string().starts_with("Failed to read config file:"));
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&tmp.path().join("missing.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_invalid_values_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\napi_url = \"ftp://example.org\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.to_string().starts_with("Failed to parse config file:"));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let result: Result<Config, _> = toml::from_str("_version = \"1\"\npage_size = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn empty_file_returns_default() {
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tender-viewer.toml");

        let mut config = Config::default();
        config.set(ConfigKey::WebUrl, "https://tenders.example.org").unwrap();
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn set_rejects_invalid_values_without_change() {
        let mut config = Config::default();
        let error = config.set(ConfigKey::PageSize, "0").unwrap_err();
        assert!(error.to_string().starts_with("invalid value for page_size"));
        assert_eq!(config, Config::default());

        assert!(config.set(ConfigKey::ApiUrl, "not a url").is_err());
    }

    #[test]
    fn parses_keys() {
        assert_eq!("page-size".parse::<ConfigKey>().unwrap(), ConfigKey::PageSize);
        assert!("colour".parse::<ConfigKey>().is_err());
    }
}
