//! Session lifecycle.
//!
//! The [`ConnectionManager`] owns the session state machine:
//!
//! ```text
//!                    request
//!    ┌──────────────┐──────►┌────────────┐
//!    │ Disconnected │       │ Connecting │
//!    └──────▲───────┘◄──────└─────┬──────┘
//!           │        denied /     │ granted
//!           │        unavailable  │
//!           │               ┌─────▼──────┐
//!           └───────────────│ Connected  │
//!              disconnect   └────────────┘
//! ```
//!
//! Each Connected session carries a fresh **epoch** — a monotonically
//! increasing tag that every in-flight remote call is keyed by. Disconnecting
//! never cancels those calls; it just guarantees that when they resolve, the
//! epoch no longer matches and the result is discarded. Disconnection itself
//! is synchronous and unconditional.
//!
//! The manager holds the only writer for the session channel. Everyone else
//! observes through [`ConnectionManager::subscribe`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::ledger::address::Address;
use crate::ledger::handle::LedgerHandle;
use crate::session::provider::{IdentityProvider, ProviderError};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Monotonically increasing tag identifying one Connected session.
pub type Epoch = u64;

/// The live half of a Connected session: the epoch tag, the granted
/// identity, and the bound ledger handle.
#[derive(Clone)]
pub struct SessionHandle {
    /// Tag for stale-result suppression. Unique per connection.
    pub epoch: Epoch,
    /// The signing identity this session acts as.
    pub identity: Address,
    /// Ledger handle bound to that identity.
    pub ledger: Arc<dyn LedgerHandle>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("epoch", &self.epoch)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// The session state. Owned exclusively by the [`ConnectionManager`].
#[derive(Debug, Clone, Default)]
pub enum Session {
    /// No identity bound. The initial state, and where every failure lands.
    #[default]
    Disconnected,
    /// A connection request is in flight with the identity provider.
    Connecting,
    /// An identity is bound and the ledger is reachable.
    Connected(SessionHandle),
}

impl Session {
    /// Returns the handle when Connected.
    pub fn handle(&self) -> Option<&SessionHandle> {
        match self {
            Session::Connected(handle) => Some(handle),
            _ => None,
        }
    }

    /// Returns the current epoch when Connected.
    pub fn epoch(&self) -> Option<Epoch> {
        self.handle().map(|h| h.epoch)
    }

    /// Returns `true` when Connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Session::Connected(_))
    }
}

// ---------------------------------------------------------------------------
// ConnectionManager
// ---------------------------------------------------------------------------

/// Owner of the session state machine and sole writer of the session
/// channel.
pub struct ConnectionManager {
    provider: Arc<dyn IdentityProvider>,
    session_tx: watch::Sender<Session>,
    next_epoch: AtomicU64,
}

impl ConnectionManager {
    /// Creates a manager in the Disconnected state.
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (session_tx, _) = watch::channel(Session::Disconnected);
        ConnectionManager {
            provider,
            session_tx,
            next_epoch: AtomicU64::new(1),
        }
    }

    /// Subscribes to session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session_tx.subscribe()
    }

    /// Returns a clone of the current session state.
    pub fn current(&self) -> Session {
        self.session_tx.borrow().clone()
    }

    /// Requests a connection from the identity provider.
    ///
    /// Moves Disconnected → Connecting, suspends on the provider, then
    /// either publishes the Connected session (with a fresh epoch) or
    /// returns to Disconnected.
    ///
    /// # Errors
    ///
    /// [`ProviderError::AlreadyConnected`] if a session is active or being
    /// established; [`ProviderError::Unavailable`] / [`ProviderError::Denied`]
    /// as reported by the provider. Both provider failures leave the machine
    /// Disconnected.
    pub async fn connect(&self) -> Result<SessionHandle, ProviderError> {
        let claimed = self.session_tx.send_if_modified(|session| match session {
            Session::Disconnected => {
                *session = Session::Connecting;
                true
            }
            _ => false,
        });
        if !claimed {
            return Err(ProviderError::AlreadyConnected);
        }

        let binding = match self.provider.connect().await {
            Ok(binding) => binding,
            Err(err) => {
                self.session_tx.send_replace(Session::Disconnected);
                tracing::warn!(error = %err, "connection attempt failed");
                return Err(err);
            }
        };

        let handle = SessionHandle {
            epoch: self.next_epoch.fetch_add(1, Ordering::Relaxed),
            identity: binding.identity,
            ledger: binding.ledger,
        };

        // A disconnect may have raced the provider; a session granted after
        // that must not resurrect the connection.
        let installed = self.session_tx.send_if_modified(|session| match session {
            Session::Connecting => {
                *session = Session::Connected(handle.clone());
                true
            }
            _ => false,
        });
        if !installed {
            tracing::debug!(epoch = handle.epoch, "granted session discarded after disconnect");
            return Err(ProviderError::Denied(
                "connection aborted locally".to_string(),
            ));
        }

        tracing::info!(
            identity = %handle.identity.short(),
            epoch = handle.epoch,
            "session connected"
        );
        Ok(handle)
    }

    /// Tears the session down locally. Synchronous and unconditional; does
    /// not revoke anything on the provider side. In-flight remote calls
    /// keyed to the old epoch become inert.
    pub fn disconnect(&self) {
        let was_connected = self
            .session_tx
            .send_replace(Session::Disconnected)
            .is_connected();
        if was_connected {
            tracing::info!("session disconnected");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::MemoryLedger;
    use crate::session::provider::{Binding, StaticProvider};
    use async_trait::async_trait;

    fn alice() -> Address {
        Address::parse("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap()
    }

    fn manager() -> ConnectionManager {
        let identity = alice();
        ConnectionManager::new(Arc::new(StaticProvider::new(
            identity.clone(),
            MemoryLedger::new(identity),
        )))
    }

    struct UnavailableProvider;

    #[async_trait]
    impl IdentityProvider for UnavailableProvider {
        async fn connect(&self) -> Result<Binding, ProviderError> {
            Err(ProviderError::Unavailable)
        }
    }

    #[tokio::test]
    async fn starts_disconnected() {
        let manager = manager();
        assert!(matches!(manager.current(), Session::Disconnected));
    }

    #[tokio::test]
    async fn connect_publishes_session() {
        let manager = manager();
        let handle = manager.connect().await.unwrap();
        assert_eq!(handle.identity, alice());
        assert_eq!(manager.current().epoch(), Some(handle.epoch));
    }

    #[tokio::test]
    async fn unavailable_provider_returns_to_disconnected() {
        let manager = ConnectionManager::new(Arc::new(UnavailableProvider));
        let err = manager.connect().await.unwrap_err();
        assert_eq!(err, ProviderError::Unavailable);
        assert!(matches!(manager.current(), Session::Disconnected));
    }

    #[tokio::test]
    async fn second_connect_is_rejected() {
        let manager = manager();
        manager.connect().await.unwrap();
        assert_eq!(
            manager.connect().await.unwrap_err(),
            ProviderError::AlreadyConnected
        );
        // The live session was not disturbed.
        assert!(manager.current().is_connected());
    }

    #[tokio::test]
    async fn disconnect_is_unconditional() {
        let manager = manager();
        manager.connect().await.unwrap();
        manager.disconnect();
        assert!(matches!(manager.current(), Session::Disconnected));

        // Disconnecting while already disconnected is a quiet no-op.
        manager.disconnect();
        assert!(matches!(manager.current(), Session::Disconnected));
    }

    #[tokio::test]
    async fn epochs_increase_across_reconnects() {
        let manager = manager();
        let first = manager.connect().await.unwrap();
        manager.disconnect();
        let second = manager.connect().await.unwrap();
        assert!(second.epoch > first.epoch);
    }
}
