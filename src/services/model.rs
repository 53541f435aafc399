//! Request and response shapes for the verification and wallet services.
//!
//! Responses are plain serde types. Requests that carry PINs hold them as
//! `SecretString` and are serialized by the transport, never derived.

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

// ── Identity verification ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSubmission {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameInfo {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BvnSubmission {
    pub bvn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NinSubmission {
    pub nin: String,
}

/// Outcome of a BVN or NIN match against the national registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityCheck {
    pub verified: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSubmission {
    pub state: String,
    pub lga: String,
    pub city: String,
    pub street: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub lga: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub street: String,
}

/// Server-authoritative onboarding progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSummary {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub bvn: Option<String>,
    #[serde(default)]
    pub nin: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub lga: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub bvn_verified: bool,
    #[serde(default)]
    pub nin_verified: bool,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalSubmission {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

// ── Wallet ──────────────────────────────────────────────────────────

/// Authoritative wallet state as owned by the wallet service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletStatus {
    pub activated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl WalletStatus {
    pub fn is_disabled(&self) -> bool {
        self.disabled.unwrap_or(false)
    }
}

/// Generic `{ message }` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug)]
pub struct WalletSetup {
    pub bank_name: String,
    pub account_number: String,
    pub pin: SecretString,
    pub confirm_pin: SecretString,
}

#[derive(Debug)]
pub struct PinChange {
    pub old_pin: SecretString,
    pub new_pin: SecretString,
    pub confirm_new_pin: SecretString,
}

#[derive(Debug)]
pub struct PinReset {
    pub new_pin: SecretString,
    pub confirm_new_pin: SecretString,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletDetailsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
}

#[derive(Debug)]
pub struct WithdrawalRequest {
    pub amount: Decimal,
    pub pin: SecretString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalResponse {
    pub transaction_id: String,
}
