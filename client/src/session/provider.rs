//! Identity providers.
//!
//! An [`IdentityProvider`] is whatever hands out signing identities —
//! a browser wallet extension, a hardware signer, or the in-process
//! [`StaticProvider`] used by the demo and tests. Connecting yields exactly
//! one identity together with a [`LedgerHandle`] already bound to it.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::ledger::address::Address;
use crate::ledger::handle::LedgerHandle;
use crate::ledger::memory::MemoryLedger;

/// Errors produced by a connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// No identity provider is reachable at all. The user has to install
    /// or enable one; nothing this client can do about it.
    #[error("no identity provider available")]
    Unavailable,

    /// The provider exists but the user (or the provider itself) refused
    /// the connection request.
    #[error("connection request denied: {0}")]
    Denied(String),

    /// A session is already active or being established. The existing
    /// session is left untouched.
    #[error("a session is already active")]
    AlreadyConnected,
}

/// The result of a granted connection: one identity, one bound handle.
#[derive(Clone)]
pub struct Binding {
    /// The signing identity the provider granted.
    pub identity: Address,
    /// A ledger handle bound to that identity.
    pub ledger: Arc<dyn LedgerHandle>,
}

/// Source of signing identities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Requests a connection. Resolves with exactly one [`Binding`], or
    /// fails with [`ProviderError::Unavailable`] / [`ProviderError::Denied`].
    async fn connect(&self) -> Result<Binding, ProviderError>;
}

/// A provider that always grants the same identity against a shared
/// [`MemoryLedger`]. Backs the demo subcommand and most tests.
pub struct StaticProvider {
    identity: Address,
    ledger: MemoryLedger,
}

impl StaticProvider {
    /// Creates a provider granting `identity` bound to `ledger`.
    pub fn new(identity: Address, ledger: MemoryLedger) -> Self {
        StaticProvider { identity, ledger }
    }
}

#[async_trait]
impl IdentityProvider for StaticProvider {
    async fn connect(&self) -> Result<Binding, ProviderError> {
        Ok(Binding {
            identity: self.identity.clone(),
            ledger: Arc::new(self.ledger.bind(self.identity.clone())),
        })
    }
}
