//! # Operations Module — Write Lifecycle Orchestration
//!
//! Every state-changing interaction with the ledger goes through one
//! [`Orchestrator`] and one [`PendingOperation`] slot:
//!
//! ```text
//!  Idle ──validate──► Submitting ──accepted──► AwaitingConfirmation
//!   ▲                     │                          │         │
//!   │                     │ declined                 │ revert  │ finalized
//!   │                     ▼                          ▼         ▼
//!   │                  Failed ◄──────────────── Failed     Confirmed
//!   └───────────────── acknowledge / disconnect ───────────────┘
//! ```
//!
//! The slot enforces single-flight — a second submission while one is live
//! is refused outright, which is what stands between a double-click and a
//! double deposit. Confirmed writes that move balance or membership hand
//! control to the snapshot resolver before the caller gets its result back.

pub mod orchestrator;

pub use orchestrator::{
    OpStatus, OperationError, Orchestrator, PendingOperation, SubmitOutcome,
};
