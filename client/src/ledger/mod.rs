//! # Ledger Module — The External Collaborator Seam
//!
//! Everything the client knows about the remote ledger lives here. The
//! ledger's own accounting executes remotely; this module only models the
//! surface we talk to:
//!
//! ```text
//! address.rs — 0x-hex addresses, lowercase-normalized, short display form
//! request.rs — WriteKind / WriteRequest / WriteDraft and local validation
//! handle.rs  — the LedgerHandle trait: five reads, submit, confirmation
//! memory.rs  — in-process implementation for the demo binary and tests
//! ```
//!
//! ## Two-phase writes
//!
//! A write is *accepted* and then, later, *finalized or reverted*. The two
//! phases are separate trait methods because the orchestrator treats them
//! differently: acceptance moves an operation into the awaiting state,
//! and only finalization makes it confirmed.

pub mod address;
pub mod handle;
pub mod memory;
pub mod request;

pub use address::{Address, AddressError};
pub use handle::{LedgerError, LedgerHandle, RevertError, SubmitError, SubmittedWrite};
pub use memory::{BoundLedger, ConfirmMode, MemoryLedger};
pub use request::{ValidationError, WriteDraft, WriteKind, WriteRequest};
