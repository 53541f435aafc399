//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Default bound on every outbound service call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime configuration for the flows and the HTTP services.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Base URL of the verification and wallet API, without trailing slash.
    pub api_base_url: String,
    /// Upper bound for a single outbound call.
    pub request_timeout: Duration,
    /// Contact shown when a wallet is locked or a PIN must be reset.
    pub support_contact: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            support_contact: "support@example.com".to_string(),
        }
    }
}

impl FlowConfig {
    /// Build a config from `KYC_WALLET_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("KYC_WALLET_API_URL") {
            let url = url.trim().trim_end_matches('/').to_string();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    key: "KYC_WALLET_API_URL".to_string(),
                    message: format!("expected an http(s) URL, got '{url}'"),
                });
            }
            config.api_base_url = url;
        }

        if let Some(secs) = lookup("KYC_WALLET_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "KYC_WALLET_TIMEOUT_SECS".to_string(),
                message: format!("{e}"),
            })?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "KYC_WALLET_TIMEOUT_SECS".to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(contact) = lookup("KYC_WALLET_SUPPORT_CONTACT")
            && !contact.trim().is_empty()
        {
            config.support_contact = contact.trim().to_string();
        }

        Ok(config)
    }
}
