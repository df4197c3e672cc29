use crate::error::SyncError;
use crate::global;
use crate::zoom::{Credentials, RetryPolicy, User, DEFAULT_API_BASE_URL, DEFAULT_OAUTH_URL};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable names read during resolution.
pub mod env_keys {
    pub const ACCOUNT_ID: &str = "ZOOM_ACCOUNT_ID";
    pub const CLIENT_ID: &str = "ZOOM_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "ZOOM_CLIENT_SECRET";
    pub const RECORDING_YEAR: &str = "ZOOM_RECORDING_YEAR";
    pub const RECORDING_MONTH_FROM: &str = "ZOOM_RECORDING_MONTH_FROM";
    pub const RECORDING_MONTH_TO: &str = "ZOOM_RECORDING_MONTH_TO";
    pub const USERS_FILTER: &str = "ZOOM_USERS_FILTER";
    pub const DOWNLOAD_DIR: &str = "ZOOM_DOWNLOAD_DIR";
    pub const CACHE_DIR: &str = "ZOOM_CACHE_DIR";
}

/// On-disk TOML configuration. Every field is optional.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub account: AccountConfig,
    pub range: RangeConfig,
    pub filter: FilterConfig,
    pub storage: StorageConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub account_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    pub year: Option<i32>,
    /// First month to list (1-12).
    pub month_from: Option<u32>,
    /// Month to stop before (exclusive, up to 13).
    pub month_to: Option<u32>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub download_dir: PathBuf,
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// End-to-end deadline for token and listing requests.
    pub timeout_seconds: u64,
    /// A download fails once no bytes arrive for this long.
    pub download_idle_timeout_seconds: u64,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub api_base_url: String,
    pub oauth_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("./downloads"),
            cache_dir: PathBuf::from("."),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 300,
            download_idle_timeout_seconds: 60,
            max_attempts: 3,
            retry_base_delay_ms: 500,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            oauth_url: DEFAULT_OAUTH_URL.to_string(),
        }
    }
}

impl Config {
    /// Load the config file at `path`, or the default location when `None`.
    ///
    /// A missing file at the default location yields defaults; a missing file
    /// that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = Self::config_path()?;
                if !default_path.exists() {
                    info!("No config file at {:?}, using environment only", default_path);
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

/// Values given on the command line; they win over every other source.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub year: Option<i32>,
    pub month_from: Option<u32>,
    pub month_to: Option<u32>,
    pub users: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

/// Email allow-list. An empty list lets every user through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    emails: Vec<String>,
}

impl UserFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|email| email.as_ref().trim().to_ascii_lowercase())
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated list; blank or empty means no filtering.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn is_unrestricted(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn emails(&self) -> &[String] {
        &self.emails
    }

    pub fn allows(&self, user: &User) -> bool {
        self.is_unrestricted() || self.emails.iter().any(|e| e.eq_ignore_ascii_case(&user.email))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub download_idle_timeout: Duration,
    pub retry: RetryPolicy,
    pub api_base_url: String,
    pub oauth_url: String,
}

/// Year and month window whose recordings get listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingRange {
    pub year: i32,
    pub month_from: u32,
    pub month_to: u32,
}

impl RecordingRange {
    /// Months to list, `month_from` inclusive to `month_to` exclusive.
    pub fn months(&self) -> std::ops::Range<u32> {
        self.month_from..self.month_to
    }

    fn resolve<F>(
        config: &RangeConfig,
        env: &F,
        overrides: &ConfigOverrides,
    ) -> crate::error::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let year = match overrides.year {
            Some(year) => year,
            None => parse_number(env_value(env, env_keys::RECORDING_YEAR), env_keys::RECORDING_YEAR)?
                .or(config.year)
                .ok_or_else(|| missing(env_keys::RECORDING_YEAR))?,
        };
        let month_from = match overrides.month_from {
            Some(month) => month,
            None => parse_number(env_value(env, env_keys::RECORDING_MONTH_FROM), env_keys::RECORDING_MONTH_FROM)?
                .or(config.month_from)
                .ok_or_else(|| missing(env_keys::RECORDING_MONTH_FROM))?,
        };
        let month_to = match overrides.month_to {
            Some(month) => month,
            None => parse_number(env_value(env, env_keys::RECORDING_MONTH_TO), env_keys::RECORDING_MONTH_TO)?
                .or(config.month_to)
                .ok_or_else(|| missing(env_keys::RECORDING_MONTH_TO))?,
        };

        if year <= 0 {
            return Err(SyncError::config(format!(
                "{} must be a positive year, got {year}",
                env_keys::RECORDING_YEAR
            )));
        }
        if !(1..=12).contains(&month_from) {
            return Err(SyncError::config(format!(
                "{} must be between 1 and 12, got {month_from}",
                env_keys::RECORDING_MONTH_FROM
            )));
        }
        if month_to < month_from || month_to > 13 {
            return Err(SyncError::config(format!(
                "{} must be between {month_from} and 13 (exclusive bound), got {month_to}",
                env_keys::RECORDING_MONTH_TO
            )));
        }

        Ok(Self {
            year,
            month_from,
            month_to,
        })
    }
}

/// Fully resolved, validated settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: Credentials,
    /// Unset for commands that never list recordings.
    pub range: Option<RecordingRange>,
    pub user_filter: UserFilter,
    pub download_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub http: HttpSettings,
}

impl Settings {
    /// Resolve everything, including the recording range, from the process environment.
    pub fn from_env(config: Config, overrides: ConfigOverrides) -> crate::error::Result<Self> {
        Self::resolve(config, |key| std::env::var(key).ok(), overrides)
    }

    /// Resolve from the process environment without a recording range.
    pub fn account_from_env(
        config: Config,
        overrides: ConfigOverrides,
    ) -> crate::error::Result<Self> {
        Self::resolve_account(config, |key| std::env::var(key).ok(), overrides)
    }

    /// Merge file config, environment (via `env`) and overrides, then validate.
    pub fn resolve<F>(
        config: Config,
        env: F,
        overrides: ConfigOverrides,
    ) -> crate::error::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let range = RecordingRange::resolve(&config.range, &env, &overrides);
        let mut settings = Self::resolve_account(config, &env, overrides)?;
        settings.range = Some(range?);
        Ok(settings)
    }

    /// Like [`Settings::resolve`] but skips the recording range entirely.
    pub fn resolve_account<F>(
        config: Config,
        env: F,
        overrides: ConfigOverrides,
    ) -> crate::error::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials {
            account_id: required(env_value(&env, env_keys::ACCOUNT_ID).or(config.account.account_id), env_keys::ACCOUNT_ID)?,
            client_id: required(env_value(&env, env_keys::CLIENT_ID).or(config.account.client_id), env_keys::CLIENT_ID)?,
            client_secret: required(
                env_value(&env, env_keys::CLIENT_SECRET).or(config.account.client_secret),
                env_keys::CLIENT_SECRET,
            )?,
        };

        let user_filter = match overrides.users.or_else(|| env(env_keys::USERS_FILTER)) {
            Some(raw) => UserFilter::parse(&raw),
            None => UserFilter::new(&config.filter.users),
        };

        let download_dir = overrides
            .download_dir
            .or_else(|| env_value(&env, env_keys::DOWNLOAD_DIR).map(PathBuf::from))
            .unwrap_or(config.storage.download_dir);
        let cache_dir = overrides
            .cache_dir
            .or_else(|| env_value(&env, env_keys::CACHE_DIR).map(PathBuf::from))
            .unwrap_or(config.storage.cache_dir);

        if config.http.timeout_seconds == 0 {
            return Err(SyncError::config("http.timeout_seconds must be greater than 0"));
        }
        if config.http.download_idle_timeout_seconds == 0 {
            return Err(SyncError::config(
                "http.download_idle_timeout_seconds must be greater than 0",
            ));
        }

        let http = HttpSettings {
            timeout: Duration::from_secs(config.http.timeout_seconds),
            download_idle_timeout: Duration::from_secs(config.http.download_idle_timeout_seconds),
            retry: RetryPolicy {
                max_attempts: config.http.max_attempts.max(1),
                base_delay: Duration::from_millis(config.http.retry_base_delay_ms),
            },
            api_base_url: config.http.api_base_url,
            oauth_url: config.http.oauth_url,
        };

        Ok(Self {
            credentials,
            range: None,
            user_filter,
            download_dir,
            cache_dir,
            http,
        })
    }

    /// The recording range, or a config error when it was never resolved.
    pub fn range(&self) -> crate::error::Result<&RecordingRange> {
        self.range
            .as_ref()
            .ok_or_else(|| SyncError::config("recording range is not configured"))
    }
}

/// Trimmed, non-empty environment value.
fn env_value<F>(env: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn missing(key: &str) -> SyncError {
    SyncError::config(format!("{key} is not set. Please set the ZOOM_* environment variables"))
}

fn required(value: Option<String>, key: &str) -> crate::error::Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| missing(key))
}

fn parse_number<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
) -> crate::error::Result<Option<T>> {
    value
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| SyncError::config(format!("{key} must be an integer, got {raw:?}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (env_keys::ACCOUNT_ID, "acct"),
            (env_keys::CLIENT_ID, "client"),
            (env_keys::CLIENT_SECRET, "secret"),
            (env_keys::RECORDING_YEAR, "2024"),
            (env_keys::RECORDING_MONTH_FROM, "1"),
            (env_keys::RECORDING_MONTH_TO, "4"),
        ]
    }

    fn user(email: &str) -> User {
        serde_json::from_value(json!({"id": "x", "email": email})).unwrap()
    }

    #[test]
    fn test_resolve_from_env() {
        let settings =
            Settings::resolve(Config::default(), env_from(&full_env()), ConfigOverrides::default())
                .unwrap();

        assert_eq!(settings.credentials.account_id, "acct");
        let range = settings.range().unwrap();
        assert_eq!(range.year, 2024);
        assert_eq!(range.months().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(settings.user_filter.is_unrestricted());
        assert_eq!(settings.download_dir, PathBuf::from("./downloads"));
        assert_eq!(settings.cache_dir, PathBuf::from("."));
        assert_eq!(settings.http.timeout, Duration::from_secs(300));
        assert_eq!(settings.http.download_idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let env: Vec<_> = full_env()
            .into_iter()
            .filter(|(k, _)| *k != env_keys::CLIENT_SECRET)
            .collect();

        let err = Settings::resolve(Config::default(), env_from(&env), ConfigOverrides::default())
            .unwrap_err();
        match err {
            SyncError::Config(message) => assert!(message.contains("ZOOM_CLIENT_SECRET")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_year_is_config_error() {
        let mut env = full_env();
        env.push((env_keys::RECORDING_YEAR, "twenty"));
        let err = Settings::resolve(Config::default(), env_from(&env), ConfigOverrides::default())
            .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_month_range_validation() {
        let mut env = full_env();
        env.push((env_keys::RECORDING_MONTH_FROM, "5"));
        env.push((env_keys::RECORDING_MONTH_TO, "3"));
        assert!(Settings::resolve(Config::default(), env_from(&env), ConfigOverrides::default()).is_err());

        let overrides = ConfigOverrides {
            month_from: Some(12),
            month_to: Some(13),
            ..Default::default()
        };
        let settings = Settings::resolve(Config::default(), env_from(&full_env()), overrides).unwrap();
        assert_eq!(settings.range().unwrap().months().collect::<Vec<_>>(), vec![12]);

        let overrides = ConfigOverrides {
            month_from: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve(Config::default(), env_from(&full_env()), overrides).is_err());
    }

    #[test]
    fn test_file_values_fill_gaps_and_env_wins() {
        let config: Config = toml::from_str(
            r#"
            [account]
            account_id = "file-acct"
            client_id = "file-client"
            client_secret = "file-secret"

            [range]
            year = 2022
            month_from = 3
            month_to = 5

            [filter]
            users = ["Alice@Example.com"]

            [storage]
            download_dir = "/srv/recordings"

            [http]
            timeout_seconds = 60
            download_idle_timeout_seconds = 120
            max_attempts = 5
            "#,
        )
        .unwrap();

        let settings = Settings::resolve(
            config,
            env_from(&[(env_keys::ACCOUNT_ID, "env-acct")]),
            ConfigOverrides::default(),
        )
        .unwrap();

        assert_eq!(settings.credentials.account_id, "env-acct");
        assert_eq!(settings.credentials.client_id, "file-client");
        assert_eq!(settings.range().unwrap().year, 2022);
        assert_eq!(settings.user_filter.emails(), ["alice@example.com".to_string()]);
        assert_eq!(settings.download_dir, PathBuf::from("/srv/recordings"));
        assert_eq!(settings.http.timeout, Duration::from_secs(60));
        assert_eq!(settings.http.download_idle_timeout, Duration::from_secs(120));
        assert_eq!(settings.http.retry.max_attempts, 5);
    }

    #[test]
    fn test_account_settings_do_not_need_range() {
        let env = [
            (env_keys::ACCOUNT_ID, "acct"),
            (env_keys::CLIENT_ID, "client"),
            (env_keys::CLIENT_SECRET, "secret"),
            (env_keys::USERS_FILTER, "a@example.com"),
        ];

        let settings =
            Settings::resolve_account(Config::default(), env_from(&env), ConfigOverrides::default())
                .unwrap();
        assert!(settings.range.is_none());
        assert!(matches!(settings.range(), Err(SyncError::Config(_))));
        assert!(settings.user_filter.allows(&user("a@example.com")));

        let err = Settings::resolve(Config::default(), env_from(&env), ConfigOverrides::default())
            .unwrap_err();
        match err {
            SyncError::Config(message) => assert!(message.contains("ZOOM_RECORDING_YEAR")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_idle_timeout_is_rejected() {
        let mut config = Config::default();
        config.http.download_idle_timeout_seconds = 0;
        let err = Settings::resolve(config, env_from(&full_env()), ConfigOverrides::default())
            .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_empty_env_filter_clears_file_filter() {
        let mut config = Config::default();
        config.filter.users = vec!["a@example.com".to_string()];
        let mut env = full_env();
        env.push((env_keys::USERS_FILTER, "  "));

        let settings = Settings::resolve(config, env_from(&env), ConfigOverrides::default()).unwrap();
        assert!(settings.user_filter.is_unrestricted());
    }

    #[test]
    fn test_user_filter_parse() {
        let filter = UserFilter::parse("a@example.com, B@example.com,,");
        assert_eq!(filter.emails().len(), 2);
        assert!(filter.allows(&user("a@example.com")));
        assert!(filter.allows(&user("b@EXAMPLE.com")));
        assert!(!filter.allows(&user("c@example.com")));

        assert!(UserFilter::parse("").is_unrestricted());
        assert!(UserFilter::all().allows(&user("anyone@example.com")));
    }
}
