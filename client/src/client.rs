//! # Client Facade
//!
//! [`Client`] wires the three stateful components — connection manager,
//! snapshot resolver, operation orchestrator — around the observable store
//! and exposes the surface a front end actually calls. Each field group
//! still has exactly one writer; the facade only sequences them (most
//! visibly on disconnect, where all three clear in one synchronous sweep).

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use crate::access::{derive_view, View};
use crate::amount::Amount;
use crate::ledger::address::Address;
use crate::ledger::handle::LedgerError;
use crate::ledger::request::WriteDraft;
use crate::ops::orchestrator::{
    OperationError, Orchestrator, PendingOperation, SubmitOutcome,
};
use crate::session::manager::{ConnectionManager, Session};
use crate::session::provider::{IdentityProvider, ProviderError};
use crate::snapshot::resolver::{Resolver, RoleSnapshot};

/// Failures of the stand-alone read queries on the facade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// No connected session to read through.
    #[error("no connected session")]
    NotConnected,

    /// The ledger read failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// The assembled session-and-orchestration client.
pub struct Client {
    manager: ConnectionManager,
    resolver: Arc<Resolver>,
    orchestrator: Orchestrator,
}

impl Client {
    /// Builds a client around the given identity provider. Starts
    /// disconnected with no snapshot and an idle operation slot.
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let manager = ConnectionManager::new(provider);
        let resolver = Arc::new(Resolver::new(manager.subscribe()));
        let orchestrator = Orchestrator::new(manager.subscribe(), Arc::clone(&resolver));
        Client {
            manager,
            resolver,
            orchestrator,
        }
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Connects to the identity provider and runs the initial snapshot
    /// refresh. The refresh is best-effort: a connected session with a
    /// failed refresh simply presents as [`View::Resolving`] until the next
    /// refresh succeeds.
    ///
    /// # Errors
    ///
    /// Whatever [`ConnectionManager::connect`] reports; the session is
    /// Disconnected afterwards in every error case except
    /// [`ProviderError::AlreadyConnected`].
    pub async fn connect(&self) -> Result<(), ProviderError> {
        let handle = self.manager.connect().await?;
        self.resolver.refresh(&handle).await;
        Ok(())
    }

    /// Disconnects locally: clears the session, drops the snapshot, and
    /// resets the pending slot, mid-flight or not. Synchronous and
    /// unconditional. Results of calls still in flight are discarded when
    /// they resolve.
    pub fn disconnect(&self) {
        self.manager.disconnect();
        self.resolver.clear();
        self.orchestrator.reset();
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Validates and submits one write through the orchestrator. See
    /// [`Orchestrator::submit`] for the lifecycle contract.
    pub async fn submit(&self, draft: &WriteDraft) -> Result<SubmitOutcome, OperationError> {
        self.orchestrator.submit(draft).await
    }

    /// Returns a terminal operation slot to idle.
    pub fn acknowledge(&self) {
        self.orchestrator.acknowledge();
    }

    // -----------------------------------------------------------------------
    // Reads & observation
    // -----------------------------------------------------------------------

    /// Re-runs the snapshot refresh for the current session, if any.
    pub async fn refresh(&self) {
        let handle = self.manager.current().handle().cloned();
        if let Some(handle) = handle {
            self.resolver.refresh(&handle).await;
        }
    }

    /// The view to present right now.
    pub fn view(&self) -> View {
        derive_view(&self.manager.current(), self.resolver.current().as_ref())
    }

    /// Clone of the current session state.
    pub fn session(&self) -> Session {
        self.manager.current()
    }

    /// Clone of the current snapshot, if published.
    pub fn snapshot(&self) -> Option<RoleSnapshot> {
        self.resolver.current()
    }

    /// Clone of the pending-operation slot.
    pub fn pending(&self) -> PendingOperation {
        self.orchestrator.current()
    }

    /// Subscribes to session changes.
    pub fn watch_session(&self) -> watch::Receiver<Session> {
        self.manager.subscribe()
    }

    /// Subscribes to snapshot changes.
    pub fn watch_snapshot(&self) -> watch::Receiver<Option<RoleSnapshot>> {
        self.resolver.subscribe()
    }

    /// Subscribes to pending-slot changes.
    pub fn watch_pending(&self) -> watch::Receiver<PendingOperation> {
        self.orchestrator.subscribe()
    }

    /// The combined balance-and-membership read for an arbitrary address.
    /// A stand-alone query: it does not touch the session, snapshot, or
    /// pending state.
    pub async fn balance_and_status(
        &self,
        address: &Address,
    ) -> Result<(Amount, bool), QueryError> {
        let handle = self
            .manager
            .current()
            .handle()
            .cloned()
            .ok_or(QueryError::NotConnected)?;
        Ok(handle.ledger.balance_and_status(address).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::memory::MemoryLedger;
    use crate::session::provider::StaticProvider;

    fn addr(fill: char) -> Address {
        Address::parse(&format!("0x{}", fill.to_string().repeat(40))).unwrap()
    }

    fn client_for(identity: Address, ledger: MemoryLedger) -> Client {
        Client::new(Arc::new(StaticProvider::new(identity, ledger)))
    }

    #[tokio::test]
    async fn fresh_client_is_unauthenticated() {
        let ledger = MemoryLedger::new(addr('a'));
        let client = client_for(addr('a'), ledger);
        assert_eq!(client.view(), View::Unauthenticated);
        assert!(client.snapshot().is_none());
    }

    #[tokio::test]
    async fn connect_publishes_view_for_owner_member() {
        let ledger = MemoryLedger::new(addr('a'));
        ledger.seed_member(addr('a'));
        let client = client_for(addr('a'), ledger);

        client.connect().await.unwrap();
        assert_eq!(
            client.view(),
            View::Authorized {
                can_manage_members: true
            }
        );
    }

    #[tokio::test]
    async fn unregistered_identity_is_unauthorized() {
        let ledger = MemoryLedger::new(addr('a'));
        let client = client_for(addr('b'), ledger);

        client.connect().await.unwrap();
        assert_eq!(client.view(), View::Unauthorized);
    }

    #[tokio::test]
    async fn disconnect_clears_everything() {
        let ledger = MemoryLedger::new(addr('a'));
        ledger.seed_member(addr('a'));
        let client = client_for(addr('a'), ledger);
        client.connect().await.unwrap();
        assert!(client.snapshot().is_some());

        client.disconnect();
        assert!(matches!(client.session(), Session::Disconnected));
        assert!(client.snapshot().is_none());
        assert_eq!(client.pending(), PendingOperation::default());
        assert_eq!(client.view(), View::Unauthenticated);
    }

    #[tokio::test]
    async fn balance_and_status_requires_connection() {
        let ledger = MemoryLedger::new(addr('a'));
        let client = client_for(addr('a'), ledger);
        assert_eq!(
            client.balance_and_status(&addr('b')).await.unwrap_err(),
            QueryError::NotConnected
        );
    }

    #[tokio::test]
    async fn balance_and_status_reads_through() {
        let ledger = MemoryLedger::new(addr('a'));
        ledger.seed_member(addr('b'));
        ledger.seed_balance(addr('b'), Amount::parse("2").unwrap());
        let client = client_for(addr('a'), ledger);
        client.connect().await.unwrap();

        let (balance, is_member) = client.balance_and_status(&addr('b')).await.unwrap();
        assert_eq!(balance, Amount::parse("2").unwrap());
        assert!(is_member);
    }
}
