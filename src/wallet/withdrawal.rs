//! Withdrawal: amount → PIN.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::pin::PinEntry;
use super::status::{WalletEvent, WalletStatusStore};
use crate::context::FlowContext;
use crate::error::FlowError;
use crate::services::WithdrawalRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalStep {
    Amount,
    Pin,
}

impl std::fmt::Display for WithdrawalStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Amount => write!(f, "amount"),
            Self::Pin => write!(f, "pin"),
        }
    }
}

/// Proof of an accepted withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalReceipt {
    pub transaction_id: String,
    pub amount: Decimal,
    pub completed_at: DateTime<Utc>,
}

/// Check an amount against the client's last-known balance.
///
/// The balance may be stale; the server re-checks when the withdrawal is
/// committed.
pub fn validate_amount(raw: &str, balance: Decimal) -> Result<Decimal, FlowError> {
    let raw = raw.trim();
    let amount = Decimal::from_str(raw)
        .ok()
        .filter(|amount| *amount > Decimal::ZERO)
        .ok_or_else(|| FlowError::validation("Please enter a valid amount"))?;
    if amount > balance {
        return Err(FlowError::validation("Amount exceeds available balance"));
    }
    Ok(amount)
}

pub struct WithdrawalFlow {
    ctx: FlowContext,
    store: Arc<WalletStatusStore>,
    step: WithdrawalStep,
    amount: String,
    validated: Option<Decimal>,
    pin: PinEntry,
    error: Option<FlowError>,
}

impl WithdrawalFlow {
    pub fn new(ctx: FlowContext, store: Arc<WalletStatusStore>) -> Self {
        Self {
            ctx,
            store,
            step: WithdrawalStep::Amount,
            amount: String::new(),
            validated: None,
            pin: PinEntry::new(),
            error: None,
        }
    }

    pub fn step(&self) -> WithdrawalStep {
        self.step
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn error(&self) -> Option<&FlowError> {
        self.error.as_ref()
    }

    pub fn set_amount(&mut self, raw: &str) {
        self.amount = raw.trim().to_string();
        self.validated = None;
    }

    pub fn pin_mut(&mut self) -> Option<&mut PinEntry> {
        match self.step {
            WithdrawalStep::Pin => Some(&mut self.pin),
            WithdrawalStep::Amount => None,
        }
    }

    /// Validate the amount against the last-known balance and move to PIN
    /// entry. Wallet status is fetched first if it has never been loaded.
    pub async fn continue_to_pin(&mut self) -> Result<Decimal, FlowError> {
        if self.step != WithdrawalStep::Amount {
            return self.fail(FlowError::invalid_action(self.step, "continue to PIN"));
        }
        if self.store.current().await.is_none()
            && let Err(e) = self.store.refresh(&self.ctx).await
        {
            return self.fail(e);
        }
        let balance = self.store.balance().await;
        match validate_amount(&self.amount, balance) {
            Ok(amount) => {
                debug!(step = %WithdrawalStep::Pin, "Withdrawal step changed");
                self.validated = Some(amount);
                self.step = WithdrawalStep::Pin;
                self.error = None;
                Ok(amount)
            }
            Err(e) => self.fail(e),
        }
    }

    /// Back to the amount step. The amount is kept; the PIN is discarded.
    pub fn back(&mut self) -> bool {
        if self.step != WithdrawalStep::Pin {
            return false;
        }
        self.step = WithdrawalStep::Amount;
        self.pin = PinEntry::new();
        self.error = None;
        true
    }

    /// Commit with the entered PIN.
    pub async fn submit(&mut self) -> Result<WithdrawalReceipt, FlowError> {
        let amount = match (self.step, self.validated) {
            (WithdrawalStep::Pin, Some(amount)) => amount,
            _ => return self.fail(FlowError::invalid_action(self.step, "withdraw")),
        };
        let pin = match self.pin.to_secret() {
            Ok(pin) => pin,
            Err(e) => return self.fail(e),
        };
        if self.store.is_disabled().await {
            return self.fail(FlowError::WalletDisabled {
                support_contact: self.ctx.support_contact().to_string(),
            });
        }

        let request = WithdrawalRequest { amount, pin };
        let ctx = self.ctx.clone();
        match ctx.call("withdraw", ctx.wallet.withdraw(&request)).await {
            Ok(response) => {
                info!(transaction_id = %response.transaction_id, %amount, "Withdrawal accepted");
                if let Err(e) = self.store.refresh(&self.ctx).await {
                    warn!(error = %e, "Wallet status refresh after withdrawal failed");
                }
                self.store.publish(WalletEvent::Withdrawal {
                    transaction_id: response.transaction_id.clone(),
                    amount,
                });
                self.reset();
                Ok(WithdrawalReceipt {
                    transaction_id: response.transaction_id,
                    amount,
                    completed_at: Utc::now(),
                })
            }
            Err(e) => {
                let e = e.escalate_disabled(self.ctx.support_contact());
                self.fail(e)
            }
        }
    }

    pub fn reset(&mut self) {
        self.step = WithdrawalStep::Amount;
        self.amount.clear();
        self.validated = None;
        self.pin = PinEntry::new();
        self.error = None;
    }

    fn fail<T>(&mut self, error: FlowError) -> Result<T, FlowError> {
        self.error = Some(error.clone());
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::error::{ServiceError, WALLET_DISABLED_MESSAGE};
    use crate::testing::{Harness, StubWallet};

    async fn flow_with_balance(balance: Decimal) -> (Harness, WithdrawalFlow) {
        let harness = Harness::with_wallet(StubWallet::activated("12345", balance));
        let store = WalletStatusStore::new();
        store.refresh(&harness.ctx).await.unwrap();
        let flow = WithdrawalFlow::new(harness.ctx.clone(), store);
        (harness, flow)
    }

    #[test]
    fn amount_validation_messages() {
        let balance = dec!(400);
        assert_eq!(
            validate_amount("500", balance),
            Err(FlowError::validation("Amount exceeds available balance"))
        );
        for invalid in ["0", "", "abc", "-5", "  "] {
            assert_eq!(
                validate_amount(invalid, balance),
                Err(FlowError::validation("Please enter a valid amount")),
                "{invalid:?} should be invalid"
            );
        }
        assert_eq!(validate_amount(" 400 ", balance), Ok(dec!(400)));
        assert_eq!(validate_amount("12.50", balance), Ok(dec!(12.50)));
    }

    #[tokio::test]
    async fn exceeding_balance_blocks_advancement() {
        let (harness, mut flow) = flow_with_balance(dec!(400)).await;
        flow.set_amount("500");

        assert!(flow.continue_to_pin().await.is_err());
        assert_eq!(flow.step(), WithdrawalStep::Amount);
        assert_eq!(
            flow.error(),
            Some(&FlowError::validation("Amount exceeds available balance"))
        );
        assert_eq!(harness.wallet.count("withdraw"), 0);
    }

    #[tokio::test]
    async fn unloaded_status_is_fetched_before_checking_the_amount() {
        let harness = Harness::with_wallet(StubWallet::activated("12345", dec!(1000)));
        let mut flow = WithdrawalFlow::new(harness.ctx.clone(), WalletStatusStore::new());
        flow.set_amount("100");

        assert_eq!(flow.continue_to_pin().await, Ok(dec!(100)));
        assert_eq!(flow.step(), WithdrawalStep::Pin);
        assert_eq!(harness.wallet.count("wallet_status"), 1);
    }

    #[tokio::test]
    async fn failed_status_fetch_is_not_reported_as_overdraft() {
        let harness = Harness::with_wallet(StubWallet::activated("12345", dec!(1000)));
        let mut flow = WithdrawalFlow::new(harness.ctx.clone(), WalletStatusStore::new());
        flow.set_amount("100");
        harness.session.sign_out();

        assert_eq!(flow.continue_to_pin().await, Err(FlowError::AuthRequired));
        assert_eq!(flow.step(), WithdrawalStep::Amount);
        assert_eq!(flow.error(), Some(&FlowError::AuthRequired));
    }

    #[tokio::test]
    async fn back_preserves_amount() {
        let (_harness, mut flow) = flow_with_balance(dec!(1000)).await;
        flow.set_amount("250");
        flow.continue_to_pin().await.unwrap();
        flow.pin_mut().unwrap().set("123");

        assert!(flow.back());
        assert_eq!(flow.step(), WithdrawalStep::Amount);
        assert_eq!(flow.amount(), "250");
        assert!(flow.pin_mut().is_none());
    }

    #[tokio::test]
    async fn successful_withdrawal_refreshes_balance() {
        let (harness, mut flow) = flow_with_balance(dec!(1000)).await;
        let store = flow.store.clone();
        flow.set_amount("250");
        flow.continue_to_pin().await.unwrap();
        flow.pin_mut().unwrap().set("12345");

        let receipt = flow.submit().await.unwrap();

        assert_eq!(receipt.transaction_id, "txn-0001");
        assert_eq!(receipt.amount, dec!(250));
        assert_eq!(store.balance().await, dec!(750));
        assert_eq!(flow.step(), WithdrawalStep::Amount);
        assert!(flow.amount().is_empty());
        let (amount, pin) = harness.wallet.last_withdrawal.lock().unwrap().clone().unwrap();
        assert_eq!(amount, dec!(250));
        assert_eq!(pin, "12345");
    }

    #[tokio::test]
    async fn server_failures_surface_raw_message() {
        let (_harness, mut flow) = flow_with_balance(dec!(1000)).await;
        flow.set_amount("100");
        flow.continue_to_pin().await.unwrap();
        flow.pin_mut().unwrap().set("11111");

        assert_eq!(
            flow.submit().await,
            Err(FlowError::Server("Invalid PIN".into()))
        );
        assert_eq!(flow.step(), WithdrawalStep::Pin);
    }

    #[tokio::test]
    async fn disabled_wallet_is_special_cased() {
        let (harness, mut flow) = flow_with_balance(dec!(1000)).await;
        flow.set_amount("100");
        flow.continue_to_pin().await.unwrap();
        flow.pin_mut().unwrap().set("12345");
        *harness.wallet.fail_next.lock().unwrap() =
            Some(ServiceError::rejected("wallet/withdraw", WALLET_DISABLED_MESSAGE));

        let err = flow.submit().await.unwrap_err();
        assert_eq!(
            err,
            FlowError::WalletDisabled {
                support_contact: "support@example.com".into()
            }
        );
    }

    #[tokio::test]
    async fn incomplete_pin_is_rejected_locally() {
        let (harness, mut flow) = flow_with_balance(dec!(1000)).await;
        flow.set_amount("100");
        flow.continue_to_pin().await.unwrap();
        flow.pin_mut().unwrap().set("12");

        assert!(matches!(flow.submit().await, Err(FlowError::Validation(_))));
        assert_eq!(harness.wallet.count("withdraw"), 0);
    }
}
