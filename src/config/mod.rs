/// Environment-driven settings
use crate::errors::{ApiError, ApiResult};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_AUTH_URL: &str =
    "https://tdx.transportdata.tw/auth/realms/TDXConnect/protocol/openid-connect/token";
pub const DEFAULT_API_URL: &str =
    "https://tdx.transportdata.tw/api/basic/v2/Air/FIDS/Airport/Arrival?%24top=200&%24format=JSON";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub tdx: TdxConfig,
    pub refresh_interval_seconds: u64,
    pub cache: CacheConfig,
    pub notifications: NotificationConfig,
    pub history_capacity: Option<usize>,
    pub http_timeout_seconds: u64,
    pub rate_limit_backoff_seconds: u64,
    pub bind_addr: String,
}

#[derive(Clone, Debug)]
pub struct TdxConfig {
    pub app_id: String,
    pub app_key: String,
    pub auth_url: String,
    pub api_url: String,
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub path: PathBuf,
    /// `None` keeps a cache file forever
    pub ttl: Option<Duration>,
}

#[derive(Clone, Debug)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// `None` notifies every cycle
    pub dedup_window: Option<Duration>,
    pub smtp: SmtpConfig,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl AppConfig {
    /// Load the settings file into the environment, then resolve settings from it
    pub fn from_env() -> ApiResult<Self> {
        let env_file = env::var("ENV_FILE").unwrap_or_else(|_| ".env".to_string());
        load_env_file(Path::new(&env_file));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve settings through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };

        let tdx = TdxConfig {
            app_id: vars.required("TDX_APP_ID")?,
            app_key: vars.required("TDX_APP_KEY")?,
            auth_url: vars.or("TDX_AUTH_URL", DEFAULT_AUTH_URL),
            api_url: vars.or("TDX_API_URL", DEFAULT_API_URL),
        };

        let enabled = vars
            .or("ENABLE_EMAIL_NOTIFICATIONS", "false")
            .to_lowercase()
            == "true";

        let smtp = SmtpConfig {
            host: vars.or("SMTP_HOST", "smtp.gmail.com"),
            port: vars.parsed("SMTP_PORT", 587)?,
            username: vars.required_if("SMTP_USERNAME", enabled)?,
            password: vars.required_if("SMTP_PASSWORD", enabled)?,
            from: vars.required_if("SMTP_FROM", enabled)?,
            to: vars.required_if("SMTP_TO", enabled)?,
        };

        Ok(Self {
            tdx,
            refresh_interval_seconds: vars.nonzero("REFRESH_INTERVAL", 60)?,
            cache: CacheConfig {
                path: PathBuf::from(vars.or("CACHE_FILE", "flight_data_cache.csv")),
                ttl: vars
                    .optional_parsed::<u64>("CACHE_TTL_SECONDS")?
                    .map(Duration::from_secs),
            },
            notifications: NotificationConfig {
                enabled,
                dedup_window: vars
                    .optional_parsed::<u64>("NOTIFY_DEDUP_SECONDS")?
                    .map(Duration::from_secs),
                smtp,
            },
            history_capacity: vars.optional_parsed("HISTORY_CAPACITY")?,
            http_timeout_seconds: vars.parsed("HTTP_TIMEOUT_SECONDS", 30)?,
            rate_limit_backoff_seconds: vars.parsed("RATE_LIMIT_BACKOFF_SECONDS", 60)?,
            bind_addr: vars.or("BIND_ADDR", "0.0.0.0:3000"),
        })
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn or(&self, key: &str, default: &str) -> String {
        (self.lookup)(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &str) -> ApiResult<String> {
        match (self.lookup)(key) {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(ApiError::MissingConfiguration(key.to_string())),
        }
    }

    fn required_if(&self, key: &str, required: bool) -> ApiResult<Option<String>> {
        if required {
            self.required(key).map(Some)
        } else {
            Ok((self.lookup)(key))
        }
    }

    fn optional_parsed<T: std::str::FromStr>(&self, key: &str) -> ApiResult<Option<T>> {
        match (self.lookup)(key) {
            None => Ok(None),
            Some(v) if v.trim().is_empty() => Ok(None),
            Some(v) => v
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ApiError::InvalidConfiguration {
                    key: key.to_string(),
                    value: v,
                }),
        }
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> ApiResult<T> {
        Ok(self.optional_parsed(key)?.unwrap_or(default))
    }

    fn nonzero(&self, key: &str, default: u64) -> ApiResult<u64> {
        match self.parsed(key, default)? {
            0 => Err(ApiError::InvalidConfiguration {
                key: key.to_string(),
                value: "0".to_string(),
            }),
            n => Ok(n),
        }
    }
}

/// Parse one `KEY=VALUE` settings line
pub fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    let value = if quoted {
        &value[1..value.len() - 1]
    } else {
        value
    };

    Some((key.to_string(), value.to_string()))
}

/// Copy settings file entries into the process environment.
///
/// Variables already present are left alone, so the real environment and
/// earlier lines win. An unreadable file counts as no overrides.
pub fn load_env_file(path: &Path) {
    for (key, value) in pending_env_entries(path, |key| env::var_os(key).is_some()) {
        env::set_var(key, value);
    }
}

/// Entries from the settings file that are not yet set, first occurrence wins
fn pending_env_entries<F>(path: &Path, is_set: F) -> Vec<(String, String)>
where
    F: Fn(&str) -> bool,
{
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };

    let mut pending: Vec<(String, String)> = Vec::new();
    for (key, value) in content.lines().filter_map(parse_env_line) {
        if key.is_empty() || is_set(&key) || pending.iter().any(|(k, _)| *k == key) {
            continue;
        }
        pending.push((key, value));
    }
    pending
}
