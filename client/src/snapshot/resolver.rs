//! Snapshot resolution.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::amount::Amount;
use crate::ledger::address::Address;
use crate::session::manager::{Session, SessionHandle};

// ---------------------------------------------------------------------------
// RoleSnapshot
// ---------------------------------------------------------------------------

/// The atomically-published bundle of role, balance, and membership data
/// for the current session. Rebuilt wholesale on every refresh — never
/// patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSnapshot {
    /// Whether the session identity is the ledger owner. Owner status gates
    /// the membership-management capability in the presented view; the
    /// ledger re-checks it on every privileged write regardless.
    pub is_owner: bool,
    /// Whether the session identity is a registered member.
    pub is_member: bool,
    /// The session identity's ledger balance.
    pub balance: Amount,
    /// The full membership list, in the ledger's insertion order.
    pub members: Vec<Address>,
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Owner of the snapshot channel and the only component that writes it.
pub struct Resolver {
    snapshot_tx: watch::Sender<Option<RoleSnapshot>>,
    session_rx: watch::Receiver<Session>,
}

impl Resolver {
    /// Creates a resolver with no published snapshot, observing the given
    /// session channel for staleness checks.
    pub fn new(session_rx: watch::Receiver<Session>) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        Resolver {
            snapshot_tx,
            session_rx,
        }
    }

    /// Subscribes to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<RoleSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Returns a clone of the current snapshot, if one is published.
    pub fn current(&self) -> Option<RoleSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Drops the published snapshot. Called on disconnect — a snapshot is
    /// only meaningful while its session is connected.
    pub fn clear(&self) {
        self.snapshot_tx.send_replace(None);
    }

    /// Runs one refresh cycle for the given session.
    ///
    /// Issues the four reads concurrently, with no ordering among them, and
    /// publishes the snapshot only once all four have resolved *and* the
    /// session is still the one that asked. Any read failure keeps the
    /// previous snapshot in place and logs a warning — refreshes never
    /// surface a user-facing error.
    pub async fn refresh(&self, handle: &SessionHandle) {
        let identity = &handle.identity;
        let (owner, is_member, balance, members) = tokio::join!(
            handle.ledger.owner(),
            handle.ledger.is_member(identity),
            handle.ledger.balance_of(identity),
            handle.ledger.member_list(),
        );

        let snapshot = match (owner, is_member, balance, members) {
            (Ok(owner), Ok(is_member), Ok(balance), Ok(members)) => RoleSnapshot {
                is_owner: owner == handle.identity,
                is_member,
                balance,
                members,
            },
            (owner, is_member, balance, members) => {
                let failed: Vec<&str> = [
                    owner.is_err().then_some("owner"),
                    is_member.is_err().then_some("is_member"),
                    balance.is_err().then_some("balance"),
                    members.is_err().then_some("member_list"),
                ]
                .into_iter()
                .flatten()
                .collect();
                tracing::warn!(
                    epoch = handle.epoch,
                    reads = ?failed,
                    "snapshot refresh failed, keeping previous snapshot"
                );
                return;
            }
        };

        // Results are keyed by the epoch captured at request time; only a
        // still-current session may publish.
        if self.session_rx.borrow().epoch() != Some(handle.epoch) {
            tracing::debug!(epoch = handle.epoch, "discarding stale snapshot");
            return;
        }

        tracing::debug!(
            epoch = handle.epoch,
            is_owner = snapshot.is_owner,
            is_member = snapshot.is_member,
            members = snapshot.members.len(),
            "snapshot published"
        );
        self.snapshot_tx.send_replace(Some(snapshot));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
