use std::time::Duration;

use crate::client::XmlApiError;
use crate::version::Version;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub url: String,
    pub api_key: String,
    pub target: Option<String>,
    pub version: Option<Version>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            target: None,
            version: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Reads `XMLAPI_URL`, `XMLAPI_API_KEY`, `XMLAPI_TARGET`, `XMLAPI_VERSION`
    /// and `XMLAPI_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, XmlApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, XmlApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| XmlApiError::Config(format!("{key} is not set")))
        };
        let url = required("XMLAPI_URL")?;
        let api_key = required("XMLAPI_API_KEY")?;
        let target = lookup("XMLAPI_TARGET").filter(|v| !v.is_empty());
        let version = lookup("XMLAPI_VERSION")
            .map(|v| v.parse::<Version>())
            .transpose()?;
        let timeout_secs = match lookup("XMLAPI_TIMEOUT_SECS") {
            Some(value) => value
                .parse::<u64>()
                .map_err(|_| XmlApiError::Config(format!("invalid XMLAPI_TIMEOUT_SECS: {value}")))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            url,
            api_key,
            target,
            version,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
