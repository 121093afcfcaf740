//! Client configuration loaded from JSON or `PRODEX_*` environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Connection settings for a Prodex server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_url")]
    pub url: String,
    pub login: String,
    pub password: String,
    /// Request timeout handed to the transport. `None` waits forever.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: Option<u64>,
}

fn default_url() -> String {
    "http://localhost:8000/".to_string()
}

fn default_timeout_secs() -> Option<u64> {
    Some(30)
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            login: login.into(),
            password: password.into(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// Read `PRODEX_URL`, `PRODEX_LOGIN`, `PRODEX_PASSWORD` and
    /// `PRODEX_TIMEOUT_SECS` (`0` disables the timeout).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).ok_or_else(|| ApiError::InvalidValue(format!("{key} is not set")));
        let timeout_secs = match lookup("PRODEX_TIMEOUT_SECS") {
            None => default_timeout_secs(),
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .map_err(|_| ApiError::InvalidValue(format!("PRODEX_TIMEOUT_SECS: {raw} is not a number")))?;
                (secs > 0).then_some(secs)
            }
        };
        Ok(Self {
            url: lookup("PRODEX_URL").unwrap_or_else(default_url),
            login: required("PRODEX_LOGIN")?,
            password: required("PRODEX_PASSWORD")?,
            timeout_secs,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn json_defaults() {
        let config = ClientConfig::from_json(r#"{"login":"root","password":"PRODEX"}"#).unwrap();
        assert_eq!(config.url, "http://localhost:8000/");
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn json_requires_credentials() {
        assert!(matches!(
            ClientConfig::from_json(r#"{"url":"http://x/"}"#),
            Err(ApiError::Deserialization(_))
        ));
    }

    #[test]
    fn env_values() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("PRODEX_URL", "http://prodex.local/"),
            ("PRODEX_LOGIN", "root"),
            ("PRODEX_PASSWORD", "PRODEX"),
            ("PRODEX_TIMEOUT_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.url, "http://prodex.local/");
        assert_eq!(config.login, "root");
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn env_requires_login() {
        let err = ClientConfig::from_lookup(lookup(&[("PRODEX_PASSWORD", "x")])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidValue(ref msg) if msg.contains("PRODEX_LOGIN")));
    }

    #[test]
    fn env_rejects_bad_timeout() {
        let err = ClientConfig::from_lookup(lookup(&[
            ("PRODEX_LOGIN", "root"),
            ("PRODEX_PASSWORD", "x"),
            ("PRODEX_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidValue(_)));
    }
}
