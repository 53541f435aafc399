//! Flow context: the dependencies every machine is built from.

use std::future::Future;
use std::sync::Arc;

use tracing::warn;

use crate::config::FlowConfig;
use crate::error::{FlowError, ServiceError};
use crate::navigation::Navigator;
use crate::services::{VerificationService, WalletService};
use crate::session::SessionAuthority;

/// Explicitly injected collaborators shared by the onboarding and wallet
/// machines. Cheap to clone.
#[derive(Clone)]
pub struct FlowContext {
    pub session: Arc<dyn SessionAuthority>,
    pub verification: Arc<dyn VerificationService>,
    pub wallet: Arc<dyn WalletService>,
    pub navigator: Arc<dyn Navigator>,
    pub config: Arc<FlowConfig>,
}

impl FlowContext {
    pub fn new(
        session: Arc<dyn SessionAuthority>,
        verification: Arc<dyn VerificationService>,
        wallet: Arc<dyn WalletService>,
        navigator: Arc<dyn Navigator>,
        config: FlowConfig,
    ) -> Self {
        Self {
            session,
            verification,
            wallet,
            navigator,
            config: Arc::new(config),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn support_contact(&self) -> &str {
        &self.config.support_contact
    }

    /// Run one outbound call.
    ///
    /// The session is checked before `request` is polled, so an
    /// unauthenticated caller never reaches the network. The call is bounded
    /// by `request_timeout` and is never retried.
    pub async fn call<T, F>(&self, operation: &'static str, request: F) -> Result<T, FlowError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        if !self.session.is_authenticated() {
            warn!(operation, "Call refused: no authenticated session");
            return Err(FlowError::AuthRequired);
        }

        match tokio::time::timeout(self.config.request_timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(operation, error = %e, "Service call failed");
                Err(FlowError::from(e))
            }
            Err(_) => {
                warn!(
                    operation,
                    timeout = ?self.config.request_timeout,
                    "Service call timed out"
                );
                Err(FlowError::Network)
            }
        }
    }
}
