//! Environment configuration.
//!
//! | Variable                          | Default        | Used by                 |
//! |-----------------------------------|----------------|-------------------------|
//! | `CATALOG_RELAY_BIND_ADDR`         | `0.0.0.0:3000` | `serve`                 |
//! | `CATALOG_RELAY_LOG_LEVEL`         | `info`         | all                     |
//! | `CATALOG_RELAY_MAX_UPLOAD_BYTES`  | `20971520`     | `serve`                 |
//! | `UPSTREAM_URL`                    | required       | `serve`, `dispatch`     |
//! | `UPSTREAM_TIMEOUT_SECS`           | `30`           | `serve`, `dispatch`     |
//! | `UPSTREAM_MAX_CONCURRENCY`        | `8`            | `serve`, `dispatch`     |
//! | `CSV_DELIMITER`                   | `;`            | all                     |
//! | `BASIC_AUTH_USERNAME` / `_PASSWORD` | required     | `serve`                 |
//!
//! Shop credentials (`{SHOP}_POA`, `{SHOP}_API_KEY`) are read per request
//! and are not part of [`Settings`].

use std::net::SocketAddr;
use std::time::Duration;

use crate::dispatch::DispatchSettings;
use crate::error::ConfigError;
use crate::parser::DEFAULT_DELIMITER;

/// Basic-auth pair guarding the HTTP surface.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuthSettings {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthSettings")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Process-wide settings.
///
/// Optional fields are only required by some commands; see
/// [`Settings::require_upstream`] and [`Settings::require_basic_auth`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub max_upload_bytes: usize,
    pub upstream_url: Option<String>,
    pub upstream_timeout: Duration,
    pub upstream_max_concurrency: usize,
    pub csv_delimiter: u8,
    pub basic_auth: Option<BasicAuthSettings>,
}

impl Settings {
    pub fn require_upstream(&self) -> Result<&str, ConfigError> {
        self.upstream_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("UPSTREAM_URL".to_string()))
    }

    pub fn require_basic_auth(&self) -> Result<&BasicAuthSettings, ConfigError> {
        self.basic_auth.as_ref().ok_or_else(|| {
            ConfigError::MissingEnvVar("BASIC_AUTH_USERNAME / BASIC_AUTH_PASSWORD".to_string())
        })
    }

    /// Dispatcher settings; fails without an upstream URL.
    pub fn dispatch_settings(&self) -> Result<DispatchSettings, ConfigError> {
        Ok(DispatchSettings {
            endpoint: self.require_upstream()?.to_string(),
            timeout: self.upstream_timeout,
            max_concurrency: self.upstream_max_concurrency,
        })
    }
}

/// Load settings, reading a `.env` file first if present.
pub fn load_settings() -> Result<Settings, ConfigError> {
    dotenvy::dotenv().ok();
    build_settings(|key| std::env::var(key))
}

/// Build settings from an env-var lookup function.
fn build_settings<F>(lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let bind_addr = or_default("CATALOG_RELAY_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("CATALOG_RELAY_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("CATALOG_RELAY_LOG_LEVEL", "info");
    let max_upload_bytes = parse_usize("CATALOG_RELAY_MAX_UPLOAD_BYTES", "20971520")?;

    let upstream_url = optional("UPSTREAM_URL");
    let upstream_timeout = Duration::from_secs(parse_u64("UPSTREAM_TIMEOUT_SECS", "30")?);
    let upstream_max_concurrency = parse_usize("UPSTREAM_MAX_CONCURRENCY", "8")?;
    if upstream_max_concurrency == 0 {
        return Err(invalid(
            "UPSTREAM_MAX_CONCURRENCY",
            "must be at least 1".to_string(),
        ));
    }

    let csv_delimiter = match optional("CSV_DELIMITER") {
        None => DEFAULT_DELIMITER,
        Some(raw) => parse_delimiter(&raw).map_err(|reason| invalid("CSV_DELIMITER", reason))?,
    };

    let basic_auth = match (optional("BASIC_AUTH_USERNAME"), optional("BASIC_AUTH_PASSWORD")) {
        (Some(username), Some(password)) => Some(BasicAuthSettings { username, password }),
        _ => None,
    };

    Ok(Settings {
        bind_addr,
        log_level,
        max_upload_bytes,
        upstream_url,
        upstream_timeout,
        upstream_max_concurrency,
        csv_delimiter,
        basic_auth,
    })
}

/// A delimiter must be exactly one ASCII character. `\t` is accepted for tab.
pub fn parse_delimiter(raw: &str) -> Result<u8, String> {
    if raw == "\\t" {
        return Ok(b'\t');
    }
    match raw.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(format!("expected a single ASCII character, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    fn full_env<'a>() -> HashMap<&'a str, &'a str> {
        let mut m = HashMap::new();
        m.insert("UPSTREAM_URL", "https://catalog.example.com/api/products");
        m.insert("BASIC_AUTH_USERNAME", "admin");
        m.insert("BASIC_AUTH_PASSWORD", "hunter2");
        m
    }

    #[test]
    fn defaults_apply_with_empty_env() {
        let map = HashMap::new();
        let cfg = build_settings(lookup_from_map(&map)).unwrap();

        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(cfg.upstream_timeout, Duration::from_secs(30));
        assert_eq!(cfg.upstream_max_concurrency, 8);
        assert_eq!(cfg.csv_delimiter, b';');
        assert!(cfg.upstream_url.is_none());
        assert!(cfg.basic_auth.is_none());
    }

    #[test]
    fn require_upstream_fails_when_unset() {
        let map = HashMap::new();
        let cfg = build_settings(lookup_from_map(&map)).unwrap();
        assert!(
            matches!(cfg.require_upstream(), Err(ConfigError::MissingEnvVar(ref v)) if v == "UPSTREAM_URL")
        );
        assert!(cfg.dispatch_settings().is_err());
    }

    #[test]
    fn full_env_yields_dispatch_and_auth_settings() {
        let map = full_env();
        let cfg = build_settings(lookup_from_map(&map)).unwrap();

        let dispatch = cfg.dispatch_settings().unwrap();
        assert_eq!(dispatch.endpoint, "https://catalog.example.com/api/products");
        assert_eq!(dispatch.max_concurrency, 8);
        assert_eq!(cfg.require_basic_auth().unwrap().username, "admin");
    }

    #[test]
    fn basic_auth_requires_both_values() {
        let mut map = full_env();
        map.remove("BASIC_AUTH_PASSWORD");
        let cfg = build_settings(lookup_from_map(&map)).unwrap();
        assert!(cfg.require_basic_auth().is_err());
    }

    #[test]
    fn invalid_bind_addr() {
        let mut map = full_env();
        map.insert("CATALOG_RELAY_BIND_ADDR", "not-an-addr");
        let result = build_settings(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CATALOG_RELAY_BIND_ADDR"),
            "got: {result:?}"
        );
    }

    #[test]
    fn zero_concurrency_rejected() {
        let mut map = full_env();
        map.insert("UPSTREAM_MAX_CONCURRENCY", "0");
        let result = build_settings(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "UPSTREAM_MAX_CONCURRENCY")
        );
    }

    #[test]
    fn timeout_override() {
        let mut map = full_env();
        map.insert("UPSTREAM_TIMEOUT_SECS", "5");
        let cfg = build_settings(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.upstream_timeout, Duration::from_secs(5));
    }

    #[test]
    fn delimiter_override_and_validation() {
        let mut map = full_env();
        map.insert("CSV_DELIMITER", ",");
        assert_eq!(build_settings(lookup_from_map(&map)).unwrap().csv_delimiter, b',');

        map.insert("CSV_DELIMITER", ";;");
        let result = build_settings(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CSV_DELIMITER")
        );
    }

    #[test]
    fn parse_delimiter_cases() {
        assert_eq!(parse_delimiter("|"), Ok(b'|'));
        assert_eq!(parse_delimiter("\\t"), Ok(b'\t'));
        assert!(parse_delimiter("é").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let map = full_env();
        let cfg = build_settings(lookup_from_map(&map)).unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("hunter2"));
    }
}
