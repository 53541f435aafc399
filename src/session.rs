//! Session authority: the single source of "is this user signed in?".
//!
//! `Session` owns the bearer token and announces credential changes on a
//! broadcast channel, so components subscribe explicitly instead of sharing a
//! global client with hidden listeners.

use std::sync::RwLock;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 16;

/// Gate consulted before every mutating call.
pub trait SessionAuthority: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

/// Credential change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    TokenRefreshed,
    SignedOut,
}

/// In-memory session holding the current access token.
pub struct Session {
    token: RwLock<Option<SecretString>>,
    tx: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Create a signed-out session.
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self {
            token: RwLock::new(None),
            tx,
        }
    }

    /// Create a session that already carries a token.
    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.store(Some(SecretString::from(token.into())));
        session
    }

    /// Subscribe to credential changes.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Store a token. Publishes `SignedIn`, or `TokenRefreshed` when a token
    /// was already present.
    pub fn sign_in(&self, token: impl Into<String>) {
        let had_token = self.store(Some(SecretString::from(token.into())));
        let event = if had_token {
            SessionEvent::TokenRefreshed
        } else {
            SessionEvent::SignedIn
        };
        info!(?event, "Session credentials updated");
        // Ok if nobody is listening
        let _ = self.tx.send(event);
    }

    /// Drop the token and publish `SignedOut`.
    pub fn sign_out(&self) {
        if self.store(None) {
            info!("Session signed out");
            let _ = self.tx.send(SessionEvent::SignedOut);
        } else {
            debug!("sign_out on a session without credentials");
        }
    }

    /// Current bearer token, if signed in.
    pub fn token(&self) -> Option<SecretString> {
        match self.token.read() {
            Ok(guard) => guard
                .as_ref()
                .map(|t| SecretString::from(t.expose_secret().to_owned())),
            Err(poisoned) => poisoned
                .into_inner()
                .as_ref()
                .map(|t| SecretString::from(t.expose_secret().to_owned())),
        }
    }

    /// Replace the token, returning whether one was present before.
    fn store(&self, token: Option<SecretString>) -> bool {
        let mut guard = match self.token.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let had_token = guard.is_some();
        *guard = token;
        had_token
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionAuthority for Session {
    fn is_authenticated(&self) -> bool {
        match self.token.read() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_signed_out() {
        let session = Session::new();
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
    }

    #[test]
    fn sign_in_and_out_publish_events() {
        let session = Session::new();
        let mut rx = session.subscribe();

        session.sign_in("abc");
        session.sign_in("def");
        session.sign_out();

        assert_eq!(rx.try_recv().unwrap(), SessionEvent::SignedIn);
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::TokenRefreshed);
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::SignedOut);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn token_is_redacted_in_debug_output() {
        let session = Session::with_token("super-secret-token");
        let token = session.token().unwrap();
        assert_eq!(token.expose_secret(), "super-secret-token");
        assert!(!format!("{token:?}").contains("super-secret-token"));
    }

    #[test]
    fn sign_out_without_token_publishes_nothing() {
        let session = Session::new();
        let mut rx = session.subscribe();
        session.sign_out();
        assert!(rx.try_recv().is_err());
    }
}
