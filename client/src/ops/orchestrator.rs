//! The write-operation lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::ledger::handle::SubmitError;
use crate::ledger::request::{ValidationError, WriteDraft, WriteKind, WriteRequest};
use crate::session::manager::{Epoch, Session};
use crate::snapshot::resolver::Resolver;

// ---------------------------------------------------------------------------
// Status & PendingOperation
// ---------------------------------------------------------------------------

/// Lifecycle state of the single pending-operation slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpStatus {
    /// No operation in progress.
    #[default]
    Idle,
    /// The write is being signed and handed to the ledger.
    Submitting,
    /// The ledger accepted the write; finalization is pending.
    AwaitingConfirmation,
    /// The write was finalized.
    Confirmed,
    /// The write was declined or reverted.
    Failed,
}

impl OpStatus {
    /// Whether the slot is occupied by a live write. Only these two states
    /// block a new submission.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, OpStatus::Submitting | OpStatus::AwaitingConfirmation)
    }

    /// Whether the slot holds a finished outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OpStatus::Confirmed | OpStatus::Failed)
    }
}

impl fmt::Display for OpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Submitting => "Submitting",
            Self::AwaitingConfirmation => "AwaitingConfirmation",
            Self::Confirmed => "Confirmed",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// The single pending-operation slot.
///
/// On failure the validated request is preserved so the user can retry
/// without re-typing; on confirmation it is cleared. The slot resets to
/// [`OpStatus::Idle`] on disconnect or [`Orchestrator::acknowledge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// The kind of the most recent write, kept through terminal states
    /// for display.
    pub kind: Option<WriteKind>,
    /// The validated parameters. Cleared on confirmation, preserved on
    /// failure.
    pub request: Option<WriteRequest>,
    /// Lifecycle status.
    pub status: OpStatus,
    /// The surfaced failure message, when status is Failed.
    pub failure: Option<String>,
    /// When the current attempt left Idle.
    pub started_at: Option<DateTime<Utc>>,
}

impl PendingOperation {
    fn idle() -> Self {
        PendingOperation::default()
    }
}

// ---------------------------------------------------------------------------
// Errors & outcome
// ---------------------------------------------------------------------------

/// Failures surfaced by [`Orchestrator::submit`]. Each is reported once per
/// attempt; nothing is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// Local validation failed. The slot never left Idle and the ledger
    /// was never contacted.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No connected session to submit through.
    #[error("no connected session")]
    NotConnected,

    /// Another write is already submitting or awaiting confirmation. The
    /// live operation is left untouched.
    #[error("another operation is already in flight")]
    InFlight,

    /// Declined before the write reached the ledger (signature refusal or
    /// similar provider-level rejection).
    #[error("submission rejected: {reason}")]
    Rejected {
        /// The provider-supplied reason.
        reason: String,
    },

    /// The connection dropped mid-submission. Terminal for this attempt.
    #[error("ledger unreachable: {0}")]
    Unreachable(String),

    /// The ledger accepted and then reverted the write.
    #[error("{}", .reason.as_deref().unwrap_or("the ledger rejected the operation"))]
    Reverted {
        /// The remote-supplied reason, when the ledger gave one.
        reason: Option<String>,
    },
}

/// Successful return of [`Orchestrator::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The write was finalized and, for refresh-triggering kinds, the
    /// snapshot refresh has run.
    Confirmed,
    /// The session changed while the write was in flight; its result was
    /// discarded and no state was touched.
    Discarded,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Driver of the submit → pending → confirmed/reverted lifecycle, and the
/// only writer of the pending-operation slot.
pub struct Orchestrator {
    pending_tx: watch::Sender<PendingOperation>,
    session_rx: watch::Receiver<Session>,
    resolver: Arc<Resolver>,
}

impl Orchestrator {
    /// Creates an orchestrator with an Idle slot.
    pub fn new(session_rx: watch::Receiver<Session>, resolver: Arc<Resolver>) -> Self {
        let (pending_tx, _) = watch::channel(PendingOperation::idle());
        Orchestrator {
            pending_tx,
            session_rx,
            resolver,
        }
    }

    /// Subscribes to pending-slot changes.
    pub fn subscribe(&self) -> watch::Receiver<PendingOperation> {
        self.pending_tx.subscribe()
    }

    /// Returns a clone of the current slot.
    pub fn current(&self) -> PendingOperation {
        self.pending_tx.borrow().clone()
    }

    /// Resets the slot to Idle unconditionally. Called on disconnect,
    /// mid-flight or not — the in-flight call's eventual result is
    /// epoch-guarded and will be discarded.
    pub fn reset(&self) {
        self.pending_tx.send_replace(PendingOperation::idle());
    }

    /// Returns a terminal slot (Confirmed or Failed) to Idle. A live or
    /// already-Idle slot is left alone.
    pub fn acknowledge(&self) {
        self.pending_tx.send_if_modified(|pending| {
            if pending.status.is_terminal() {
                *pending = PendingOperation::idle();
                true
            } else {
                false
            }
        });
    }

    /// Validates and submits one write, driving it to a terminal state.
    ///
    /// Validation happens before the slot leaves Idle; a draft that fails
    /// validation never reaches the ledger. At most one write may be in
    /// flight: a submit while the slot is Submitting or AwaitingConfirmation
    /// returns [`OperationError::InFlight`] without touching the live
    /// operation. On confirmation of a balance- or membership-affecting
    /// kind, the snapshot refresh runs before this returns.
    ///
    /// Every transition after an await point is guarded by the session
    /// epoch captured at submit time: if the session changed underneath the
    /// write, the result is discarded ([`SubmitOutcome::Discarded`]) and no
    /// state is touched.
    pub async fn submit(&self, draft: &WriteDraft) -> Result<SubmitOutcome, OperationError> {
        let request = draft.validate()?;
        let kind = request.kind();

        let handle = match self.session_rx.borrow().handle() {
            Some(handle) => handle.clone(),
            None => return Err(OperationError::NotConnected),
        };
        let epoch = handle.epoch;

        // Single-flight claim: check and transition with no await point in
        // between. A live operation stays untouched.
        let claimed = self.pending_tx.send_if_modified(|pending| {
            if pending.status.is_in_flight() {
                false
            } else {
                *pending = PendingOperation {
                    kind: Some(kind),
                    request: Some(request.clone()),
                    status: OpStatus::Submitting,
                    failure: None,
                    started_at: Some(Utc::now()),
                };
                true
            }
        });
        if !claimed {
            return Err(OperationError::InFlight);
        }

        tracing::info!(%kind, epoch, "submitting write");
        let submitted = match handle.ledger.submit(request).await {
            Ok(submitted) => submitted,
            Err(err) => {
                let operr = match err {
                    SubmitError::Rejected { reason } => OperationError::Rejected { reason },
                    SubmitError::Unreachable(msg) => OperationError::Unreachable(msg),
                };
                let surfaced = operr.to_string();
                if !self.transition_if_current(epoch, |pending| {
                    pending.status = OpStatus::Failed;
                    pending.failure = Some(surfaced.clone());
                }) {
                    return Ok(SubmitOutcome::Discarded);
                }
                tracing::warn!(%kind, error = %surfaced, "write rejected before submission");
                return Err(operr);
            }
        };

        if !self.transition_if_current(epoch, |pending| {
            pending.status = OpStatus::AwaitingConfirmation;
        }) {
            return Ok(SubmitOutcome::Discarded);
        }

        match handle.ledger.await_confirmation(submitted).await {
            Ok(()) => {
                if !self.transition_if_current(epoch, |pending| {
                    pending.status = OpStatus::Confirmed;
                    pending.request = None;
                    pending.failure = None;
                }) {
                    return Ok(SubmitOutcome::Discarded);
                }
                tracing::info!(%kind, epoch, "write confirmed");
                if kind.triggers_refresh() {
                    // A failed refresh logs inside the resolver and must
                    // not fail the confirmed write.
                    self.resolver.refresh(&handle).await;
                }
                Ok(SubmitOutcome::Confirmed)
            }
            Err(revert) => {
                let surfaced = revert
                    .reason
                    .clone()
                    .unwrap_or_else(|| "the ledger rejected the operation".to_string());
                if !self.transition_if_current(epoch, |pending| {
                    pending.status = OpStatus::Failed;
                    pending.failure = Some(surfaced.clone());
                }) {
                    return Ok(SubmitOutcome::Discarded);
                }
                tracing::warn!(%kind, reason = %surfaced, "write reverted");
                Err(OperationError::Reverted {
                    reason: revert.reason,
                })
            }
        }
    }

    /// Applies a slot mutation only while the session that started the
    /// write is still current. Returns `false` — leaving the slot alone —
    /// when the result belongs to a stale session.
    fn transition_if_current(
        &self,
        epoch: Epoch,
        mutate: impl FnOnce(&mut PendingOperation),
    ) -> bool {
        if self.session_rx.borrow().epoch() != Some(epoch) {
            tracing::debug!(epoch, "discarding stale write result");
            return false;
        }
        self.pending_tx.send_modify(mutate);
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
