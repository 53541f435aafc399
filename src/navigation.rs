//! Navigation targets the flows can redirect to.

use std::sync::Mutex;

/// Areas of the application a flow may send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Wallet dashboard; the destination once identity checks are done.
    WalletArea,
    /// Anywhere outside the wallet area.
    Home,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WalletArea => write!(f, "wallet"),
            Self::Home => write!(f, "home"),
        }
    }
}

/// Performs redirects requested by the flows.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that only remembers where it was sent. Used by the console and
/// by tests.
#[derive(Default)]
pub struct RouteLog {
    routes: Mutex<Vec<Route>>,
}

impl RouteLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every route navigated to so far, oldest first.
    pub fn history(&self) -> Vec<Route> {
        match self.routes.lock() {
            Ok(routes) => routes.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn last(&self) -> Option<Route> {
        self.history().last().copied()
    }
}

impl Navigator for RouteLog {
    fn navigate(&self, route: Route) {
        tracing::info!(%route, "Redirecting");
        match self.routes.lock() {
            Ok(mut routes) => routes.push(route),
            Err(poisoned) => poisoned.into_inner().push(route),
        }
    }
}
