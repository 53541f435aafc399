//! Wallet provisioning: bank details → PIN → confirm PIN → success / error.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::guard::{CloseGuard, CloseOutcome};
use super::pin::PinEntry;
use super::status::{WalletEvent, WalletStatusStore};
use super::{ACCOUNT_NUMBER_LENGTH, normalize_account_number};
use crate::context::FlowContext;
use crate::error::FlowError;
use crate::services::WalletSetup;

/// Steps of the provisioning flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningStep {
    Bank,
    Pin,
    Confirm,
    Success { message: String },
    Error { message: String },
}

impl std::fmt::Display for ProvisioningStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Bank => "bank",
            Self::Pin => "pin",
            Self::Confirm => "confirm",
            Self::Success { .. } => "success",
            Self::Error { .. } => "error",
        };
        write!(f, "{s}")
    }
}

/// Result of acknowledging a terminal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// Success acknowledged: status refreshed and the flow closed.
    Closed,
    /// Error acknowledged: everything cleared, back at the bank step.
    Restarted,
}

/// Guided wallet setup. Opened whenever the wallet is not yet activated.
pub struct WalletProvisioning {
    ctx: FlowContext,
    store: Arc<WalletStatusStore>,
    guard: CloseGuard,
    step: ProvisioningStep,
    bank_name: String,
    account_number: String,
    pin: PinEntry,
    confirm_pin: PinEntry,
    error: Option<FlowError>,
    open: bool,
}

impl WalletProvisioning {
    pub fn new(ctx: FlowContext, store: Arc<WalletStatusStore>) -> Self {
        Self {
            ctx,
            store,
            guard: CloseGuard::wallet_activated(),
            step: ProvisioningStep::Bank,
            bank_name: String::new(),
            account_number: String::new(),
            pin: PinEntry::new(),
            confirm_pin: PinEntry::new(),
            error: None,
            open: false,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn step(&self) -> &ProvisioningStep {
        &self.step
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn bank_name(&self) -> &str {
        &self.bank_name
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn pin(&self) -> &PinEntry {
        &self.pin
    }

    pub fn confirm_pin(&self) -> &PinEntry {
        &self.confirm_pin
    }

    pub fn error(&self) -> Option<&FlowError> {
        self.error.as_ref()
    }

    /// The PIN being typed on the current step, if the step collects one.
    pub fn pin_entry_mut(&mut self) -> Option<&mut PinEntry> {
        match self.step {
            ProvisioningStep::Pin => Some(&mut self.pin),
            ProvisioningStep::Confirm => Some(&mut self.confirm_pin),
            _ => None,
        }
    }

    // ── Opening ─────────────────────────────────────────────────────

    /// Fetch authoritative status; an unactivated wallet forces the flow
    /// open. Returns whether it is open.
    pub async fn sync_with_status(&mut self) -> Result<bool, FlowError> {
        let status = match self.store.refresh(&self.ctx).await {
            Ok(status) => status,
            Err(e) => {
                self.error = Some(e.clone());
                return Err(e);
            }
        };
        if !status.activated && !self.open {
            debug!("Wallet not activated; opening provisioning");
            self.reset();
            self.open = true;
        }
        Ok(self.open)
    }

    // ── Bank step ───────────────────────────────────────────────────

    pub fn select_bank(&mut self, bank_name: &str) {
        self.bank_name = bank_name.trim().to_string();
    }

    /// Digits only, at most ten.
    pub fn set_account_number(&mut self, raw: &str) {
        self.account_number = normalize_account_number(raw);
    }

    pub fn continue_to_pin(&mut self) -> Result<(), FlowError> {
        self.expect_step(ProvisioningStep::Bank, "continue to PIN")?;
        if self.account_number.len() != ACCOUNT_NUMBER_LENGTH {
            return self.fail(FlowError::validation(format!(
                "Account number must be exactly {ACCOUNT_NUMBER_LENGTH} digits"
            )));
        }
        if self.bank_name.is_empty() {
            return self.fail(FlowError::validation("Please select a bank"));
        }
        self.transition(ProvisioningStep::Pin);
        Ok(())
    }

    // ── PIN steps ───────────────────────────────────────────────────

    pub fn continue_to_confirm(&mut self) -> Result<(), FlowError> {
        self.expect_step(ProvisioningStep::Pin, "continue to confirmation")?;
        if let Err(e) = self.pin.to_secret() {
            return self.fail(e);
        }
        self.transition(ProvisioningStep::Confirm);
        Ok(())
    }

    /// Step back without discarding anything already entered.
    pub fn back(&mut self) -> bool {
        let previous = match self.step {
            ProvisioningStep::Pin => ProvisioningStep::Bank,
            ProvisioningStep::Confirm => ProvisioningStep::Pin,
            _ => return false,
        };
        self.transition(previous);
        true
    }

    /// Submit from the confirm step.
    ///
    /// A mismatch keeps both PINs and stays on confirm. An auth failure
    /// leaves everything untouched. Any other failure moves to the error
    /// step.
    pub async fn submit(&mut self) -> Result<(), FlowError> {
        self.expect_step(ProvisioningStep::Confirm, "submit")?;

        let (pin, confirm_pin) = match (self.pin.to_secret(), self.confirm_pin.to_secret()) {
            (Ok(pin), Ok(confirm)) => (pin, confirm),
            (Err(e), _) | (_, Err(e)) => return self.fail(e),
        };
        if !self.pin.matches(&self.confirm_pin) {
            return self.fail(FlowError::validation("PINs do not match"));
        }

        let request = WalletSetup {
            bank_name: self.bank_name.clone(),
            account_number: self.account_number.clone(),
            pin,
            confirm_pin,
        };
        let ctx = self.ctx.clone();
        match ctx.call("setup_wallet", ctx.wallet.setup_wallet(&request)).await {
            Ok(response) => {
                info!(bank = %self.bank_name, "Wallet provisioned");
                self.error = None;
                self.store.publish(WalletEvent::Provisioned);
                self.transition(ProvisioningStep::Success {
                    message: response.message,
                });
                Ok(())
            }
            Err(FlowError::AuthRequired) => self.fail(FlowError::AuthRequired),
            Err(e) => {
                warn!(error = %e, "Wallet setup failed");
                self.error = Some(e.clone());
                self.transition(ProvisioningStep::Error {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    // ── Exits ───────────────────────────────────────────────────────

    /// The single action on the success and error steps.
    ///
    /// Success refreshes wallet status upstream and closes. Error resets to
    /// an empty bank step.
    pub async fn acknowledge(&mut self) -> Result<Acknowledgement, FlowError> {
        match self.step {
            ProvisioningStep::Success { .. } => {
                self.close_after_success().await;
                Ok(Acknowledgement::Closed)
            }
            ProvisioningStep::Error { .. } => {
                self.reset();
                Ok(Acknowledgement::Restarted)
            }
            _ => self.fail(FlowError::invalid_action(&self.step, "acknowledge")),
        }
    }

    /// Close from any step. Outside of success, wallet status is re-checked
    /// and an unactivated wallet redirects out of the wallet area.
    pub async fn close(&mut self) -> CloseOutcome {
        if matches!(self.step, ProvisioningStep::Success { .. }) {
            self.close_after_success().await;
            return CloseOutcome::Closed;
        }
        let outcome = self.guard.check(&self.ctx, &self.store).await;
        self.reset();
        self.open = false;
        outcome
    }

    // ── Internals ───────────────────────────────────────────────────

    /// Leaving success never runs the guard: refresh upstream status once
    /// and close.
    async fn close_after_success(&mut self) {
        if let Err(e) = self.store.refresh(&self.ctx).await {
            warn!(error = %e, "Wallet status refresh after provisioning failed");
        }
        self.reset();
        self.open = false;
    }

    fn reset(&mut self) {
        self.step = ProvisioningStep::Bank;
        self.bank_name.clear();
        self.account_number.clear();
        self.pin = PinEntry::new();
        self.confirm_pin = PinEntry::new();
        self.error = None;
    }

    fn transition(&mut self, next: ProvisioningStep) {
        debug!(from = %self.step, to = %next, "Provisioning step changed");
        self.step = next;
        if !matches!(self.step, ProvisioningStep::Error { .. }) {
            self.error = None;
        }
    }

    fn expect_step(&mut self, expected: ProvisioningStep, action: &str) -> Result<(), FlowError> {
        if !self.open {
            return self.fail(FlowError::invalid_action("closed", action));
        }
        if self.step != expected {
            return self.fail(FlowError::invalid_action(&self.step, action));
        }
        Ok(())
    }

    fn fail<T>(&mut self, error: FlowError) -> Result<T, FlowError> {
        self.error = Some(error.clone());
        Err(error)
    }
}
