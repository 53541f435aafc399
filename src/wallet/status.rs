//! Last-known wallet status with broadcast to subscribers.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};

use crate::context::FlowContext;
use crate::error::FlowError;
use crate::services::WalletStatus;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Wallet notifications fanned out to anything displaying wallet state.
#[derive(Debug, Clone, PartialEq)]
pub enum WalletEvent {
    StatusRefreshed(WalletStatus),
    Provisioned,
    PinChanged,
    DetailsUpdated,
    Withdrawal {
        transaction_id: String,
        amount: Decimal,
    },
}

/// Client-side copy of the authoritative wallet status.
///
/// The wallet service owns the truth; this copy is advisory and only ever
/// replaced wholesale by `refresh`.
pub struct WalletStatusStore {
    current: RwLock<Option<WalletStatus>>,
    tx: broadcast::Sender<WalletEvent>,
}

impl WalletStatusStore {
    pub fn new() -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            current: RwLock::new(None),
            tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.tx.subscribe()
    }

    /// Last fetched status, if any.
    pub async fn current(&self) -> Option<WalletStatus> {
        self.current.read().await.clone()
    }

    /// Last-known balance; zero when unknown.
    pub async fn balance(&self) -> Decimal {
        self.current
            .read()
            .await
            .as_ref()
            .and_then(|s| s.balance)
            .unwrap_or(Decimal::ZERO)
    }

    pub async fn is_disabled(&self) -> bool {
        self.current
            .read()
            .await
            .as_ref()
            .is_some_and(WalletStatus::is_disabled)
    }

    /// Refetch from the wallet service, store, and broadcast.
    pub async fn refresh(&self, ctx: &FlowContext) -> Result<WalletStatus, FlowError> {
        let status = ctx
            .call("wallet_status", ctx.wallet.wallet_status())
            .await?;
        debug!(
            activated = status.activated,
            disabled = status.is_disabled(),
            "Wallet status refreshed"
        );
        *self.current.write().await = Some(status.clone());
        self.publish(WalletEvent::StatusRefreshed(status.clone()));
        Ok(status)
    }

    pub fn publish(&self, event: WalletEvent) {
        if !matches!(event, WalletEvent::StatusRefreshed(_)) {
            info!(?event, "Wallet event");
        }
        // Ok if no receivers are listening yet
        let _ = self.tx.send(event);
    }
}
