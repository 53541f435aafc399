//! Collaborator contracts: the identity verification service and the wallet
//! service.
//!
//! Flows only ever see these traits. `HttpApiClient` is the production
//! implementation; tests substitute in-memory doubles.

pub mod http;
pub mod model;

pub use http::HttpApiClient;
pub use model::*;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::ServiceError;

/// Identity verification service (legal name, BVN, NIN, address).
#[async_trait]
pub trait VerificationService: Send + Sync {
    async fn submit_name(&self, request: &NameSubmission) -> Result<NameInfo, ServiceError>;

    async fn submit_bvn(&self, request: &BvnSubmission) -> Result<IdentityCheck, ServiceError>;

    async fn submit_nin(&self, request: &NinSubmission) -> Result<IdentityCheck, ServiceError>;

    async fn submit_address(
        &self,
        request: &AddressSubmission,
    ) -> Result<AddressInfo, ServiceError>;

    /// Authoritative progress for the signed-in user.
    async fn summary(&self) -> Result<VerificationSummary, ServiceError>;

    /// Submit the completed verification for review.
    async fn submit_final(&self) -> Result<FinalSubmission, ServiceError>;
}

/// Wallet service: provisioning, PIN lifecycle and money movement.
#[async_trait]
pub trait WalletService: Send + Sync {
    async fn wallet_status(&self) -> Result<WalletStatus, ServiceError>;

    async fn setup_wallet(&self, request: &WalletSetup) -> Result<MessageResponse, ServiceError>;

    /// Rejects on mismatch or when the wallet is disabled.
    async fn validate_pin(&self, current_pin: &SecretString)
    -> Result<MessageResponse, ServiceError>;

    async fn change_pin(&self, request: &PinChange) -> Result<MessageResponse, ServiceError>;

    /// Only reachable with a token delivered out of band.
    async fn reset_pin(
        &self,
        token: &str,
        request: &PinReset,
    ) -> Result<MessageResponse, ServiceError>;

    async fn update_wallet_details(
        &self,
        request: &WalletDetailsUpdate,
    ) -> Result<MessageResponse, ServiceError>;

    async fn withdraw(
        &self,
        request: &WithdrawalRequest,
    ) -> Result<WithdrawalResponse, ServiceError>;
}
