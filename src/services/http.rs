//! reqwest-backed implementation of both service contracts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use super::model::*;
use super::{VerificationService, WalletService};
use crate::config::FlowConfig;
use crate::error::{ConfigError, ServiceError};
use crate::session::Session;

/// HTTP client for the verification and wallet APIs.
///
/// The bearer token is read from the shared `Session` on every request, so a
/// sign-in or refresh takes effect immediately.
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    session: Arc<Session>,
}

impl HttpApiClient {
    pub fn new(config: &FlowConfig, session: Arc<Session>) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        let base_url = Url::parse(&config.api_base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "api_base_url".to_string(),
                message: format!("'{}' is not a usable base URL", config.api_base_url),
            })?;
        Ok(Self {
            client,
            base_url,
            timeout: config.request_timeout,
            session,
        })
    }

    /// Append path segments to the base URL. Each segment is percent-encoded
    /// on its own, so `/`, `?`, `#` or `..` inside one cannot change the
    /// endpoint.
    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a request and decode the JSON body, mapping transport and status
    /// failures onto `ServiceError`.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<T, ServiceError> {
        let mut request = self.client.request(method.clone(), url);
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        tracing::debug!(%method, path, "Calling API");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout {
                    endpoint: path.to_string(),
                    timeout: self.timeout,
                }
            } else {
                ServiceError::Transport {
                    endpoint: path.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ServiceError::Unauthorized {
                endpoint: path.to_string(),
            });
        }

        let text = response.text().await.map_err(|e| ServiceError::Transport {
            endpoint: path.to_string(),
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(ServiceError::Rejected {
                endpoint: path.to_string(),
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| ServiceError::InvalidResponse {
            endpoint: path.to_string(),
            reason: e.to_string(),
        })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ServiceError> {
        self.send(Method::POST, path, self.url(path.split('/')), Some(body))
            .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        self.send(Method::GET, path, self.url(path.split('/')), None)
            .await
    }
}

/// Pull a human-readable message out of an error body. Servers answer with
/// `message`, `detail` or `error`; anything else is passed through as text.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "detail", "error"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    body.trim().to_string()
}

fn to_json<T: serde::Serialize>(value: &T, endpoint: &str) -> Result<serde_json::Value, ServiceError> {
    serde_json::to_value(value).map_err(|e| ServiceError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: format!("failed to encode request: {e}"),
    })
}

fn reveal(secret: &SecretString) -> &str {
    secret.expose_secret()
}

#[async_trait]
impl VerificationService for HttpApiClient {
    async fn submit_name(&self, request: &NameSubmission) -> Result<NameInfo, ServiceError> {
        let path = "verification/name";
        self.post(path, to_json(request, path)?).await
    }

    async fn submit_bvn(&self, request: &BvnSubmission) -> Result<IdentityCheck, ServiceError> {
        let path = "verification/bvn";
        self.post(path, to_json(request, path)?).await
    }

    async fn submit_nin(&self, request: &NinSubmission) -> Result<IdentityCheck, ServiceError> {
        let path = "verification/nin";
        self.post(path, to_json(request, path)?).await
    }

    async fn submit_address(
        &self,
        request: &AddressSubmission,
    ) -> Result<AddressInfo, ServiceError> {
        let path = "verification/address";
        self.post(path, to_json(request, path)?).await
    }

    async fn summary(&self) -> Result<VerificationSummary, ServiceError> {
        self.get("verification/summary").await
    }

    async fn submit_final(&self) -> Result<FinalSubmission, ServiceError> {
        self.post("verification/submit", serde_json::json!({})).await
    }
}

#[async_trait]
impl WalletService for HttpApiClient {
    async fn wallet_status(&self) -> Result<WalletStatus, ServiceError> {
        self.get("wallet/status").await
    }

    async fn setup_wallet(&self, request: &WalletSetup) -> Result<MessageResponse, ServiceError> {
        let body = serde_json::json!({
            "bank_name": request.bank_name,
            "account_number": request.account_number,
            "pin": reveal(&request.pin),
            "confirm_pin": reveal(&request.confirm_pin),
        });
        self.post("wallet/setup", body).await
    }

    async fn validate_pin(
        &self,
        current_pin: &SecretString,
    ) -> Result<MessageResponse, ServiceError> {
        let body = serde_json::json!({ "current_pin": reveal(current_pin) });
        self.post("wallet/pin/validate", body).await
    }

    async fn change_pin(&self, request: &PinChange) -> Result<MessageResponse, ServiceError> {
        let body = serde_json::json!({
            "old_pin": reveal(&request.old_pin),
            "new_pin": reveal(&request.new_pin),
            "confirm_new_pin": reveal(&request.confirm_new_pin),
        });
        self.post("wallet/pin/change", body).await
    }

    async fn reset_pin(
        &self,
        token: &str,
        request: &PinReset,
    ) -> Result<MessageResponse, ServiceError> {
        let body = serde_json::json!({
            "new_pin": reveal(&request.new_pin),
            "confirm_new_pin": reveal(&request.confirm_new_pin),
        });
        // The token is a single path segment and is kept out of logs and
        // error endpoints.
        let path = "wallet/pin/reset";
        let url = self.url(path.split('/').chain([token]));
        self.send(Method::POST, path, url, Some(body)).await
    }

    async fn update_wallet_details(
        &self,
        request: &WalletDetailsUpdate,
    ) -> Result<MessageResponse, ServiceError> {
        let path = "wallet/details";
        let body = to_json(request, path)?;
        self.send(Method::PATCH, path, self.url(path.split('/')), Some(body))
            .await
    }

    async fn withdraw(
        &self,
        request: &WithdrawalRequest,
    ) -> Result<WithdrawalResponse, ServiceError> {
        let body = serde_json::json!({
            "amount": request.amount.to_string(),
            "pin": reveal(&request.pin),
        });
        self.post("wallet/withdraw", body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_structured_fields() {
        assert_eq!(error_message(r#"{"message": "Wallet is disabled"}"#), "Wallet is disabled");
        assert_eq!(error_message(r#"{"detail": "Invalid PIN"}"#), "Invalid PIN");
        assert_eq!(error_message(" Bad Gateway \n"), "Bad Gateway");
    }

    #[test]
    fn url_joins_without_double_slash() {
        let config = FlowConfig {
            api_base_url: "http://127.0.0.1:9/api/".to_string(),
            ..Default::default()
        };
        let client = HttpApiClient::new(&config, Arc::new(Session::new())).unwrap();
        assert_eq!(
            client.url("wallet/status".split('/')).as_str(),
            "http://127.0.0.1:9/api/wallet/status"
        );
    }

    #[test]
    fn reset_token_stays_one_segment() {
        let client = HttpApiClient::new(&FlowConfig::default(), Arc::new(Session::new())).unwrap();
        for token in ["../../withdraw", "abc/def", "x?y=1#frag"] {
            let url = client.url("wallet/pin/reset".split('/').chain([token]));
            assert!(
                url.path().starts_with("/api/wallet/pin/reset/"),
                "{token:?} escaped to {url}"
            );
            assert_eq!(url.path_segments().unwrap().count(), 5, "{url}");
            assert_eq!(url.query(), None);
            assert_eq!(url.fragment(), None);
        }
    }

    #[test]
    fn unusable_base_url_is_a_config_error() {
        let config = FlowConfig {
            api_base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            HttpApiClient::new(&config, Arc::new(Session::new())),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
