//! Write requests and their validation.
//!
//! User input arrives as a [`WriteDraft`] of raw strings — exactly what a
//! form or prompt hands over. [`WriteDraft::validate`] turns it into a typed
//! [`WriteRequest`] or a [`ValidationError`]; nothing invalid ever reaches
//! the ledger. The [`WriteKind`] discriminant drives two pieces of policy:
//! which kinds carry an attached value payload, and which kinds trigger a
//! snapshot refresh after confirmation.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::amount::{Amount, AmountError};
use crate::ledger::address::{Address, AddressError};

// ---------------------------------------------------------------------------
// WriteKind
// ---------------------------------------------------------------------------

/// Discriminant for the seven state-changing ledger operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteKind {
    /// Register a new member. Owner-only on the ledger side.
    AddMember,
    /// Flag an existing member. Owner-only; the flag's meaning is the
    /// ledger's business, not ours.
    FlagMember,
    /// Credit the caller's balance with the attached value.
    Deposit,
    /// Record that someone owes the caller. Pure bookkeeping — moves no value.
    RecordDebt,
    /// Pay down a debt, sending the attached value to the creditor.
    PayDebt,
    /// Send the attached value to another member.
    Transfer,
    /// Withdraw from the caller's ledger balance back to their wallet.
    Withdraw,
}

impl WriteKind {
    /// Whether a confirmed write of this kind changes balance or membership
    /// and therefore requires a snapshot refresh. `RecordDebt` mutates
    /// neither, so it is the one kind that does not.
    pub fn triggers_refresh(&self) -> bool {
        !matches!(self, WriteKind::RecordDebt)
    }
}

impl fmt::Display for WriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AddMember => "add-member",
            Self::FlagMember => "flag-member",
            Self::Deposit => "deposit",
            Self::RecordDebt => "record-debt",
            Self::PayDebt => "pay-debt",
            Self::Transfer => "transfer",
            Self::Withdraw => "withdraw",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// WriteRequest
// ---------------------------------------------------------------------------

/// A fully validated state-changing request, ready to submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteRequest {
    /// Register `member`.
    AddMember {
        /// The address to register.
        member: Address,
    },
    /// Flag `member`.
    FlagMember {
        /// The address to flag.
        member: Address,
    },
    /// Credit the caller with `value` (attached).
    Deposit {
        /// The attached value.
        value: Amount,
    },
    /// Record that `debtor` owes the caller `amount`.
    RecordDebt {
        /// Who owes.
        debtor: Address,
        /// How much, as a call parameter — no value moves.
        amount: Amount,
    },
    /// Pay `value` (attached) toward the caller's debt to `creditor`.
    PayDebt {
        /// Who is owed.
        creditor: Address,
        /// The attached value.
        value: Amount,
    },
    /// Send `value` (attached) to `to`.
    Transfer {
        /// The recipient.
        to: Address,
        /// The attached value.
        value: Amount,
    },
    /// Withdraw `amount` from the caller's ledger balance.
    Withdraw {
        /// How much to withdraw, as a call parameter.
        amount: Amount,
    },
}

impl WriteRequest {
    /// Returns the kind discriminant.
    pub fn kind(&self) -> WriteKind {
        match self {
            Self::AddMember { .. } => WriteKind::AddMember,
            Self::FlagMember { .. } => WriteKind::FlagMember,
            Self::Deposit { .. } => WriteKind::Deposit,
            Self::RecordDebt { .. } => WriteKind::RecordDebt,
            Self::PayDebt { .. } => WriteKind::PayDebt,
            Self::Transfer { .. } => WriteKind::Transfer,
            Self::Withdraw { .. } => WriteKind::Withdraw,
        }
    }

    /// Returns the value payload for value-attached kinds
    /// (Deposit, PayDebt, Transfer), `None` otherwise.
    pub fn attached_value(&self) -> Option<Amount> {
        match self {
            Self::Deposit { value }
            | Self::PayDebt { value, .. }
            | Self::Transfer { value, .. } => Some(*value),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Local validation failures. These are reported immediately and never
/// reach the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was left empty.
    #[error("{field} is required")]
    MissingField {
        /// Name of the empty field.
        field: &'static str,
    },

    /// An address field failed to parse.
    #[error("{field}: {source}")]
    BadAddress {
        /// Name of the offending field.
        field: &'static str,
        /// The underlying parse failure.
        source: AddressError,
    },

    /// An amount field failed to parse.
    #[error("{field}: {source}")]
    BadAmount {
        /// Name of the offending field.
        field: &'static str,
        /// The underlying parse failure.
        source: AmountError,
    },
}

/// The raw, user-entered form of a write: strings straight from the input
/// fields. Held onto after a failure so the user can retry without
/// re-typing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteDraft {
    /// Draft for [`WriteRequest::AddMember`].
    AddMember {
        /// Raw address string.
        member: String,
    },
    /// Draft for [`WriteRequest::FlagMember`].
    FlagMember {
        /// Raw address string.
        member: String,
    },
    /// Draft for [`WriteRequest::Deposit`].
    Deposit {
        /// Raw decimal amount string.
        amount: String,
    },
    /// Draft for [`WriteRequest::RecordDebt`].
    RecordDebt {
        /// Raw debtor address string.
        debtor: String,
        /// Raw decimal amount string.
        amount: String,
    },
    /// Draft for [`WriteRequest::PayDebt`].
    PayDebt {
        /// Raw creditor address string.
        creditor: String,
        /// Raw decimal amount string.
        amount: String,
    },
    /// Draft for [`WriteRequest::Transfer`].
    Transfer {
        /// Raw recipient address string.
        to: String,
        /// Raw decimal amount string.
        amount: String,
    },
    /// Draft for [`WriteRequest::Withdraw`].
    Withdraw {
        /// Raw decimal amount string.
        amount: String,
    },
}

impl WriteDraft {
    /// Returns the kind this draft will become.
    pub fn kind(&self) -> WriteKind {
        match self {
            Self::AddMember { .. } => WriteKind::AddMember,
            Self::FlagMember { .. } => WriteKind::FlagMember,
            Self::Deposit { .. } => WriteKind::Deposit,
            Self::RecordDebt { .. } => WriteKind::RecordDebt,
            Self::PayDebt { .. } => WriteKind::PayDebt,
            Self::Transfer { .. } => WriteKind::Transfer,
            Self::Withdraw { .. } => WriteKind::Withdraw,
        }
    }

    /// Validates every field and produces a typed [`WriteRequest`].
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered: an empty field,
    /// a malformed address, or a malformed amount.
    pub fn validate(&self) -> Result<WriteRequest, ValidationError> {
        match self {
            Self::AddMember { member } => Ok(WriteRequest::AddMember {
                member: parse_address("member address", member)?,
            }),
            Self::FlagMember { member } => Ok(WriteRequest::FlagMember {
                member: parse_address("member address", member)?,
            }),
            Self::Deposit { amount } => Ok(WriteRequest::Deposit {
                value: parse_amount("amount", amount)?,
            }),
            Self::RecordDebt { debtor, amount } => Ok(WriteRequest::RecordDebt {
                debtor: parse_address("debtor address", debtor)?,
                amount: parse_amount("amount", amount)?,
            }),
            Self::PayDebt { creditor, amount } => Ok(WriteRequest::PayDebt {
                creditor: parse_address("creditor address", creditor)?,
                value: parse_amount("amount", amount)?,
            }),
            Self::Transfer { to, amount } => Ok(WriteRequest::Transfer {
                to: parse_address("recipient address", to)?,
                value: parse_amount("amount", amount)?,
            }),
            Self::Withdraw { amount } => Ok(WriteRequest::Withdraw {
                amount: parse_amount("amount", amount)?,
            }),
        }
    }
}

fn parse_address(field: &'static str, raw: &str) -> Result<Address, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Address::parse(raw).map_err(|source| ValidationError::BadAddress { field, source })
}

fn parse_amount(field: &'static str, raw: &str) -> Result<Amount, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Amount::parse(raw).map_err(|source| ValidationError::BadAmount { field, source })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
