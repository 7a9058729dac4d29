//! The bound ledger handle.
//!
//! [`LedgerHandle`] is the seam between this client and the remote ledger.
//! A handle is produced by the identity provider already bound to one
//! signing identity; every read and write below runs as that identity.
//!
//! Writes are two-phase. [`LedgerHandle::submit`] returns once the ledger
//! has *accepted* the request — acceptance does not imply success.
//! [`LedgerHandle::await_confirmation`] resolves when the write is finalized
//! or reverted. The orchestrator owns the policy around those two phases;
//! this trait only exposes them.

use async_trait::async_trait;
use thiserror::Error;

use crate::amount::Amount;
use crate::ledger::address::Address;
use crate::ledger::request::{WriteKind, WriteRequest};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A read against the ledger failed. Reads are best-effort; callers log
/// and move on rather than surfacing these to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ledger read failed: {0}")]
pub struct LedgerError(pub String);

/// A write was declined before it ever reached the ledger — the user or
/// the provider refused to sign, or the transport dropped. Terminal for
/// the attempt; never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The signer declined the request.
    #[error("submission rejected: {reason}")]
    Rejected {
        /// Why the signer declined, as reported by the provider.
        reason: String,
    },

    /// The connection to the ledger dropped mid-submission.
    #[error("ledger unreachable: {0}")]
    Unreachable(String),
}

/// The ledger accepted the write and then reverted it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
pub struct RevertError {
    /// The remote-supplied revert reason, when the ledger gave one.
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// SubmittedWrite
// ---------------------------------------------------------------------------

/// Receipt for an accepted-but-unconfirmed write. Pass it back to
/// [`LedgerHandle::await_confirmation`] to learn the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedWrite {
    /// Handle-local sequence number for the accepted write.
    pub id: u64,
    /// The kind that was submitted, for logging.
    pub kind: WriteKind,
}

// ---------------------------------------------------------------------------
// LedgerHandle
// ---------------------------------------------------------------------------

/// A remote ledger bound to one signing identity.
///
/// Every method is a suspension point. None of them are cancellable —
/// dropping the future does not withdraw the request, which is why the
/// session layer suppresses stale results instead of cancelling.
#[async_trait]
pub trait LedgerHandle: Send + Sync {
    /// Reads the ledger owner's address.
    async fn owner(&self) -> Result<Address, LedgerError>;

    /// Reads whether `address` is a registered member.
    async fn is_member(&self, address: &Address) -> Result<bool, LedgerError>;

    /// Reads the ledger balance of `address`, in base units.
    async fn balance_of(&self, address: &Address) -> Result<Amount, LedgerError>;

    /// Reads the full membership list, in the ledger's insertion order.
    async fn member_list(&self) -> Result<Vec<Address>, LedgerError>;

    /// Reads the combined balance-and-membership view of `address`.
    async fn balance_and_status(&self, address: &Address)
        -> Result<(Amount, bool), LedgerError>;

    /// Submits a state-changing request. Resolves on *acceptance*;
    /// success is only known after [`await_confirmation`](Self::await_confirmation).
    async fn submit(&self, request: WriteRequest) -> Result<SubmittedWrite, SubmitError>;

    /// Waits for a previously accepted write to be finalized or reverted.
    async fn await_confirmation(&self, submitted: SubmittedWrite) -> Result<(), RevertError>;
}
