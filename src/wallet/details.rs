//! Bank-details update for an activated wallet.

use std::sync::Arc;

use tracing::{info, warn};

use super::status::{WalletEvent, WalletStatusStore};
use super::{ACCOUNT_NUMBER_LENGTH, normalize_account_number};
use crate::context::FlowContext;
use crate::error::FlowError;
use crate::services::WalletDetailsUpdate;

/// Edits the payout bank of an existing wallet. Blank fields are left
/// unchanged on the server.
pub struct WalletDetailsEditor {
    ctx: FlowContext,
    store: Arc<WalletStatusStore>,
    bank_name: String,
    account_number: String,
    error: Option<FlowError>,
}

impl WalletDetailsEditor {
    pub fn new(ctx: FlowContext, store: Arc<WalletStatusStore>) -> Self {
        Self {
            ctx,
            store,
            bank_name: String::new(),
            account_number: String::new(),
            error: None,
        }
    }

    pub fn bank_name(&self) -> &str {
        &self.bank_name
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn error(&self) -> Option<&FlowError> {
        self.error.as_ref()
    }

    pub fn set_bank_name(&mut self, bank_name: &str) {
        self.bank_name = bank_name.trim().to_string();
    }

    pub fn set_account_number(&mut self, raw: &str) {
        self.account_number = normalize_account_number(raw);
    }

    /// Build the PATCH body from whatever was entered.
    pub fn update(&self) -> Result<WalletDetailsUpdate, FlowError> {
        let bank_name = (!self.bank_name.is_empty()).then(|| self.bank_name.clone());
        let account_number = (!self.account_number.is_empty()).then(|| self.account_number.clone());
        if bank_name.is_none() && account_number.is_none() {
            return Err(FlowError::validation(
                "Enter a bank name or account number to update",
            ));
        }
        if account_number
            .as_ref()
            .is_some_and(|a| a.len() != ACCOUNT_NUMBER_LENGTH)
        {
            return Err(FlowError::validation(format!(
                "Account number must be exactly {ACCOUNT_NUMBER_LENGTH} digits"
            )));
        }
        Ok(WalletDetailsUpdate {
            bank_name,
            account_number,
        })
    }

    /// Send the update, then refresh wallet status. Entered values are
    /// cleared on success and kept on failure.
    pub async fn submit(&mut self) -> Result<String, FlowError> {
        let request = match self.update() {
            Ok(request) => request,
            Err(e) => return self.fail(e),
        };
        let ctx = self.ctx.clone();
        match ctx
            .call(
                "update_wallet_details",
                ctx.wallet.update_wallet_details(&request),
            )
            .await
        {
            Ok(response) => {
                info!(
                    bank_changed = request.bank_name.is_some(),
                    account_changed = request.account_number.is_some(),
                    "Wallet details updated"
                );
                if let Err(e) = self.store.refresh(&self.ctx).await {
                    warn!(error = %e, "Wallet status refresh after details update failed");
                }
                self.store.publish(WalletEvent::DetailsUpdated);
                self.bank_name.clear();
                self.account_number.clear();
                self.error = None;
                Ok(response.message)
            }
            Err(e) => {
                warn!(error = %e, "Wallet details update failed");
                self.fail(e)
            }
        }
    }

    fn fail<T>(&mut self, error: FlowError) -> Result<T, FlowError> {
        self.error = Some(error.clone());
        Err(error)
    }
}
