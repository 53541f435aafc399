//! Error types for the onboarding and wallet flows.

use std::time::Duration;

/// Exact rejection text the wallet service uses once repeated bad PINs have
/// locked the wallet.
pub const WALLET_DISABLED_MESSAGE: &str = "Wallet is disabled";

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failures reported by (or while talking to) the verification and wallet
/// services.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("{endpoint} rejected the session credentials")]
    Unauthorized { endpoint: String },

    #[error("{endpoint} rejected the request ({status}): {message}")]
    Rejected {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("{endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },

    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl ServiceError {
    /// Shorthand for a server-side rejection carrying the server's message.
    pub fn rejected(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            endpoint: endpoint.into(),
            status: 400,
            message: message.into(),
        }
    }
}

/// Which identity number a verification result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityDocument {
    Bvn,
    Nin,
}

impl std::fmt::Display for IdentityDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bvn => write!(f, "BVN"),
            Self::Nin => write!(f, "NIN"),
        }
    }
}

/// Errors surfaced to the user by a flow. Held as local state by whichever
/// machine produced it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlowError {
    /// Client-side validation failed; no request was made.
    #[error("{0}")]
    Validation(String),

    #[error(
        "{document} verification failed (confidence: {confidence}). Please check the number and try again."
    )]
    VerificationMismatch {
        document: IdentityDocument,
        confidence: f64,
    },

    #[error("Authentication required")]
    AuthRequired,

    #[error(
        "Your wallet has been disabled after too many incorrect PIN attempts. Please contact support at {support_contact}."
    )]
    WalletDisabled { support_contact: String },

    #[error("Network error. Please check your connection and try again.")]
    Network,

    /// Raw failure message from the server.
    #[error("{0}")]
    Server(String),

    #[error("Cannot {action} while in {state}")]
    InvalidAction { state: String, action: String },
}

impl FlowError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid_action(state: impl ToString, action: impl Into<String>) -> Self {
        Self::InvalidAction {
            state: state.to_string(),
            action: action.into(),
        }
    }

    /// Whether the server reported the wallet as locked.
    pub fn is_wallet_disabled(&self) -> bool {
        match self {
            Self::WalletDisabled { .. } => true,
            Self::Server(message) => message == WALLET_DISABLED_MESSAGE,
            _ => false,
        }
    }

    /// Turn a raw "Wallet is disabled" rejection into the support-contact
    /// variant. Every other error passes through untouched.
    pub fn escalate_disabled(self, support_contact: &str) -> Self {
        if self.is_wallet_disabled() {
            Self::WalletDisabled {
                support_contact: support_contact.to_string(),
            }
        } else {
            self
        }
    }
}

impl From<ServiceError> for FlowError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unauthorized { .. } => Self::AuthRequired,
            ServiceError::Rejected { message, .. } if message.trim().is_empty() => {
                Self::Server("Something went wrong. Please try again.".to_string())
            }
            ServiceError::Rejected { message, .. } => Self::Server(message),
            ServiceError::Timeout { .. }
            | ServiceError::Transport { .. }
            | ServiceError::InvalidResponse { .. } => Self::Network,
        }
    }
}
