//! PIN lifecycle: the change-PIN flow, the forgotten-PIN notice, and
//! redemption of an out-of-band reset token.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::pin::PinEntry;
use super::status::{WalletEvent, WalletStatusStore};
use crate::context::FlowContext;
use crate::error::FlowError;
use crate::services::{PinChange, PinReset};

/// Steps of the change-PIN flow, numbered 1 to 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangePinStep {
    OldPin,
    NewPin,
    ConfirmPin,
}

impl ChangePinStep {
    pub fn number(&self) -> u8 {
        match self {
            Self::OldPin => 1,
            Self::NewPin => 2,
            Self::ConfirmPin => 3,
        }
    }

    fn prev(&self) -> Option<ChangePinStep> {
        match self {
            Self::OldPin => None,
            Self::NewPin => Some(Self::OldPin),
            Self::ConfirmPin => Some(Self::NewPin),
        }
    }
}

impl std::fmt::Display for ChangePinStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::OldPin => "old_pin",
            Self::NewPin => "new_pin",
            Self::ConfirmPin => "confirm_pin",
        };
        write!(f, "{s}")
    }
}

/// Change PIN: old PIN (checked by the server before moving on) → new PIN →
/// confirmation → commit.
///
/// Once the server reports the wallet as disabled the flow is locked on the
/// support-contact message.
pub struct ChangePinFlow {
    ctx: FlowContext,
    store: Arc<WalletStatusStore>,
    step: ChangePinStep,
    old_pin: PinEntry,
    new_pin: PinEntry,
    confirm_pin: PinEntry,
    error: Option<FlowError>,
    open: bool,
    locked: bool,
}

impl ChangePinFlow {
    pub fn new(ctx: FlowContext, store: Arc<WalletStatusStore>) -> Self {
        Self {
            ctx,
            store,
            step: ChangePinStep::OldPin,
            old_pin: PinEntry::new(),
            new_pin: PinEntry::new(),
            confirm_pin: PinEntry::new(),
            error: None,
            open: false,
            locked: false,
        }
    }

    pub fn step(&self) -> ChangePinStep {
        self.step
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// True once the wallet was reported disabled.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn error(&self) -> Option<&FlowError> {
        self.error.as_ref()
    }

    pub fn open(&mut self) {
        self.reset();
        self.open = true;
    }

    /// The PIN collected on the current step.
    pub fn entry_mut(&mut self) -> &mut PinEntry {
        match self.step {
            ChangePinStep::OldPin => &mut self.old_pin,
            ChangePinStep::NewPin => &mut self.new_pin,
            ChangePinStep::ConfirmPin => &mut self.confirm_pin,
        }
    }

    /// Step 1: validate the current PIN with the server before advancing.
    pub async fn submit_old_pin(&mut self) -> Result<(), FlowError> {
        self.expect_step(ChangePinStep::OldPin, "validate current PIN")?;
        let old_pin = match self.old_pin.to_secret() {
            Ok(pin) => pin,
            Err(e) => return self.fail(e),
        };
        self.ensure_not_disabled().await?;

        let ctx = self.ctx.clone();
        match ctx.call("validate_pin", ctx.wallet.validate_pin(&old_pin)).await {
            Ok(_) => {
                self.transition(ChangePinStep::NewPin);
                Ok(())
            }
            Err(e) => self.server_failure(e),
        }
    }

    /// Step 2: the new PIN must be complete.
    pub fn continue_to_confirm(&mut self) -> Result<(), FlowError> {
        self.expect_step(ChangePinStep::NewPin, "continue to confirmation")?;
        if let Err(e) = self.new_pin.to_secret() {
            return self.fail(e);
        }
        self.transition(ChangePinStep::ConfirmPin);
        Ok(())
    }

    /// Back one step. A no-op on step 1.
    pub fn back(&mut self) -> bool {
        if self.locked {
            return false;
        }
        match self.step.prev() {
            Some(prev) => {
                self.transition(prev);
                true
            }
            None => false,
        }
    }

    /// Step 3: commit. Requires the confirmation to equal the new PIN. On
    /// success the wallet status is refreshed, the flow resets to step 1 and
    /// closes.
    pub async fn commit(&mut self) -> Result<String, FlowError> {
        self.expect_step(ChangePinStep::ConfirmPin, "change PIN")?;
        let (old_pin, new_pin, confirm_new_pin) = match (
            self.old_pin.to_secret(),
            self.new_pin.to_secret(),
            self.confirm_pin.to_secret(),
        ) {
            (Ok(old), Ok(new), Ok(confirm)) => (old, new, confirm),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return self.fail(e),
        };
        if !self.new_pin.matches(&self.confirm_pin) {
            return self.fail(FlowError::validation("PINs do not match"));
        }
        self.ensure_not_disabled().await?;

        let request = PinChange {
            old_pin,
            new_pin,
            confirm_new_pin,
        };
        let ctx = self.ctx.clone();
        match ctx.call("change_pin", ctx.wallet.change_pin(&request)).await {
            Ok(response) => {
                info!("Wallet PIN changed");
                if let Err(e) = self.store.refresh(&self.ctx).await {
                    warn!(error = %e, "Wallet status refresh after PIN change failed");
                }
                self.store.publish(WalletEvent::PinChanged);
                self.reset();
                self.open = false;
                Ok(response.message)
            }
            Err(e) => self.server_failure(e),
        }
    }

    pub fn close(&mut self) {
        self.reset();
        self.open = false;
    }

    fn reset(&mut self) {
        self.step = ChangePinStep::OldPin;
        self.old_pin = PinEntry::new();
        self.new_pin = PinEntry::new();
        self.confirm_pin = PinEntry::new();
        self.error = None;
        self.locked = false;
    }

    fn transition(&mut self, next: ChangePinStep) {
        debug!(from = %self.step, to = %next, "Change-PIN step changed");
        self.step = next;
        self.error = None;
    }

    fn expect_step(&mut self, expected: ChangePinStep, action: &str) -> Result<(), FlowError> {
        if self.locked {
            return Err(self.disabled_error());
        }
        if !self.open {
            return self.fail(FlowError::invalid_action("closed", action));
        }
        if self.step != expected {
            return self.fail(FlowError::invalid_action(self.step, action));
        }
        Ok(())
    }

    /// Refuse PIN-gated calls when the last-known status says disabled.
    async fn ensure_not_disabled(&mut self) -> Result<(), FlowError> {
        if self.store.is_disabled().await {
            self.locked = true;
            return self.fail(self.disabled_error());
        }
        Ok(())
    }

    fn server_failure<T>(&mut self, error: FlowError) -> Result<T, FlowError> {
        let error = error.escalate_disabled(self.ctx.support_contact());
        if matches!(error, FlowError::WalletDisabled { .. }) {
            warn!("Wallet disabled during PIN change");
            self.locked = true;
        }
        self.fail(error)
    }

    fn disabled_error(&self) -> FlowError {
        FlowError::WalletDisabled {
            support_contact: self.ctx.support_contact().to_string(),
        }
    }

    fn fail<T>(&mut self, error: FlowError) -> Result<T, FlowError> {
        self.error = Some(error.clone());
        Err(error)
    }
}

/// The only state of the forgotten-PIN path: there is no self-service
/// reset, just instructions to contact support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinResetNotice {
    pub support_contact: String,
}

impl PinResetNotice {
    pub fn new(ctx: &FlowContext) -> Self {
        Self {
            support_contact: ctx.support_contact().to_string(),
        }
    }

    pub fn message(&self) -> String {
        format!(
            "PIN reset is not available in the app. Please contact support at {} to reset your wallet PIN.",
            self.support_contact
        )
    }
}

/// Redeem a reset token delivered out of band. Not reachable from any flow.
pub async fn redeem_reset_token(
    ctx: &FlowContext,
    token: &str,
    new_pin: &PinEntry,
    confirm_pin: &PinEntry,
) -> Result<String, FlowError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(FlowError::validation("Reset token is required"));
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(FlowError::validation("Invalid reset token"));
    }
    let request = PinReset {
        new_pin: new_pin.to_secret()?,
        confirm_new_pin: confirm_pin.to_secret()?,
    };
    if !new_pin.matches(confirm_pin) {
        return Err(FlowError::validation("PINs do not match"));
    }
    let response = ctx
        .call("reset_pin", ctx.wallet.reset_pin(token, &request))
        .await
        .map_err(|e| e.escalate_disabled(ctx.support_contact()))?;
    info!("Wallet PIN reset with token");
    Ok(response.message)
}
