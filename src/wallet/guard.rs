//! Exit guard shared by every wallet modal.

use tracing::{debug, warn};

use super::status::WalletStatusStore;
use crate::context::FlowContext;
use crate::navigation::Route;
use crate::services::WalletStatus;

/// What happened when a modal was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The wallet satisfies the requirement; the user stays where they are.
    Closed,
    /// The requirement failed and the user was sent elsewhere.
    Redirected(Route),
}

/// Re-checks authoritative wallet state on exit and runs a fallback
/// redirect when a required predicate does not hold.
#[derive(Debug, Clone, Copy)]
pub struct CloseGuard {
    required: fn(&WalletStatus) -> bool,
    fallback: Route,
}

impl CloseGuard {
    pub fn new(required: fn(&WalletStatus) -> bool, fallback: Route) -> Self {
        Self { required, fallback }
    }

    /// Leaving a wallet view with an unactivated wallet sends the user out of
    /// the wallet area.
    pub fn wallet_activated() -> Self {
        Self::new(|status| status.activated, Route::Home)
    }

    /// Refetch status and apply the guard. A failed refetch counts as the
    /// requirement not holding.
    pub async fn check(&self, ctx: &FlowContext, store: &WalletStatusStore) -> CloseOutcome {
        let satisfied = match store.refresh(ctx).await {
            Ok(status) => (self.required)(&status),
            Err(e) => {
                warn!(error = %e, "Could not confirm wallet status on close");
                false
            }
        };

        if satisfied {
            debug!("Close guard satisfied");
            CloseOutcome::Closed
        } else {
            ctx.navigator.navigate(self.fallback);
            CloseOutcome::Redirected(self.fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::testing::{Harness, StubWallet};

    #[tokio::test]
    async fn activated_wallet_closes_in_place() {
        let harness = Harness::with_wallet(StubWallet::activated("12345", dec!(0)));
        let store = WalletStatusStore::new();

        let outcome = CloseGuard::wallet_activated()
            .check(&harness.ctx, &store)
            .await;

        assert_eq!(outcome, CloseOutcome::Closed);
        assert!(harness.navigator.history().is_empty());
        assert_eq!(harness.wallet.count("wallet_status"), 1);
    }

    #[tokio::test]
    async fn unactivated_wallet_redirects_out() {
        let harness = Harness::new();
        let store = WalletStatusStore::new();

        let outcome = CloseGuard::wallet_activated()
            .check(&harness.ctx, &store)
            .await;

        assert_eq!(outcome, CloseOutcome::Redirected(Route::Home));
        assert_eq!(harness.navigator.history(), vec![Route::Home]);
    }

    #[tokio::test]
    async fn custom_predicate_and_fallback() {
        let harness = Harness::with_wallet(StubWallet::activated("12345", dec!(0)));
        let store = WalletStatusStore::new();
        let guard = CloseGuard::new(|s| s.balance.is_some_and(|b| b > dec!(0)), Route::WalletArea);

        let outcome = guard.check(&harness.ctx, &store).await;
        assert_eq!(outcome, CloseOutcome::Redirected(Route::WalletArea));
    }
}
