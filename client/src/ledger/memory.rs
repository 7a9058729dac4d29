//! In-process ledger.
//!
//! [`MemoryLedger`] implements [`LedgerHandle`] entirely in memory. It backs
//! the `demo` subcommand and the test suite — the places where running
//! against a real remote ledger would be pointless or flaky. The bookkeeping
//! is deliberately simplified; it exists so the session and orchestration
//! lifecycle can be exercised end to end with realistic accept/confirm/revert
//! behavior, not to be a faithful ledger.
//!
//! ## Confirmation modes
//!
//! In the default `Auto` mode a submitted write is decided immediately:
//! acceptance and finalization collapse into one step, like a devnet with
//! instant blocks. In `Manual` mode accepted writes queue up undecided until
//! the driver calls [`MemoryLedger::confirm_next`] or
//! [`MemoryLedger::revert_next`] — which is how tests hold an operation in
//! the awaiting-confirmation state for as long as they need.
//!
//! ## Fault injection
//!
//! [`MemoryLedger::reject_next_submit`] makes the next submission fail
//! before acceptance (a signature refusal); [`MemoryLedger::revert_next_write`]
//! makes the next write revert at confirmation time with a chosen reason.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::amount::Amount;
use crate::ledger::address::Address;
use crate::ledger::handle::{
    LedgerError, LedgerHandle, RevertError, SubmitError, SubmittedWrite,
};
use crate::ledger::request::WriteRequest;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// How confirmations are decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmMode {
    /// Writes are applied and finalized at submission time.
    Auto,
    /// Writes queue undecided until the driver confirms or reverts them.
    Manual,
}

struct Undecided {
    caller: Address,
    request: WriteRequest,
    decide: oneshot::Sender<Result<(), RevertError>>,
}

struct State {
    owner: Address,
    members: Vec<Address>,
    flagged: HashSet<Address>,
    balances: HashMap<Address, Amount>,
    debts: HashMap<(Address, Address), Amount>,
    mode: ConfirmMode,
    next_id: u64,
    reject_submit: Option<String>,
    revert_write: Option<String>,
    undecided: VecDeque<Undecided>,
    waiting: HashMap<u64, oneshot::Receiver<Result<(), RevertError>>>,
}

impl State {
    fn is_active_member(&self, address: &Address) -> bool {
        self.members.contains(address) && !self.flagged.contains(address)
    }

    fn balance(&self, address: &Address) -> Amount {
        self.balances.get(address).copied().unwrap_or(Amount::ZERO)
    }

    /// Applies a decided write to the books. A returned [`RevertError`]
    /// leaves the state untouched, like a reverted transaction would.
    fn apply(&mut self, caller: &Address, request: &WriteRequest) -> Result<(), RevertError> {
        match request {
            WriteRequest::AddMember { member } => {
                if caller != &self.owner {
                    return Err(revert("only the owner can add members"));
                }
                if self.members.contains(member) {
                    return Err(revert("already a member"));
                }
                self.members.push(member.clone());
                Ok(())
            }
            WriteRequest::FlagMember { member } => {
                if caller != &self.owner {
                    return Err(revert("only the owner can flag members"));
                }
                if !self.members.contains(member) {
                    return Err(revert("not a member"));
                }
                self.flagged.insert(member.clone());
                Ok(())
            }
            WriteRequest::Deposit { value } => {
                if !self.is_active_member(caller) {
                    return Err(revert("not a registered member"));
                }
                let new = self
                    .balance(caller)
                    .base_units()
                    .checked_add(value.base_units())
                    .ok_or_else(|| revert("balance overflow"))?;
                self.balances
                    .insert(caller.clone(), Amount::from_base_units(new));
                Ok(())
            }
            WriteRequest::RecordDebt { debtor, amount } => {
                if !self.is_active_member(debtor) {
                    return Err(revert("debtor is not a member"));
                }
                let key = (debtor.clone(), caller.clone());
                let owed = self.debts.get(&key).copied().unwrap_or(Amount::ZERO);
                let new = owed
                    .base_units()
                    .checked_add(amount.base_units())
                    .ok_or_else(|| revert("debt overflow"))?;
                self.debts.insert(key, Amount::from_base_units(new));
                Ok(())
            }
            WriteRequest::PayDebt { creditor, value } => {
                let key = (caller.clone(), creditor.clone());
                let owed = self.debts.get(&key).copied().unwrap_or(Amount::ZERO);
                if owed.is_zero() {
                    return Err(revert("no recorded debt to this creditor"));
                }
                let remaining = owed.base_units().saturating_sub(value.base_units());
                self.debts.insert(key, Amount::from_base_units(remaining));
                let credited = self
                    .balance(creditor)
                    .base_units()
                    .checked_add(value.base_units())
                    .ok_or_else(|| revert("balance overflow"))?;
                self.balances
                    .insert(creditor.clone(), Amount::from_base_units(credited));
                Ok(())
            }
            WriteRequest::Transfer { to, value } => {
                if !self.is_active_member(to) {
                    return Err(revert("recipient is not a member"));
                }
                let credited = self
                    .balance(to)
                    .base_units()
                    .checked_add(value.base_units())
                    .ok_or_else(|| revert("balance overflow"))?;
                self.balances
                    .insert(to.clone(), Amount::from_base_units(credited));
                Ok(())
            }
            WriteRequest::Withdraw { amount } => {
                let held = self.balance(caller);
                if held < *amount {
                    return Err(revert("insufficient balance"));
                }
                self.balances.insert(
                    caller.clone(),
                    Amount::from_base_units(held.base_units() - amount.base_units()),
                );
                Ok(())
            }
        }
    }
}

fn revert(reason: &str) -> RevertError {
    RevertError {
        reason: Some(reason.to_string()),
    }
}

// ---------------------------------------------------------------------------
// MemoryLedger
// ---------------------------------------------------------------------------

/// Shared in-process ledger. Clones share the same books; call
/// [`MemoryLedger::bind`] to get a [`LedgerHandle`] acting as one identity.
#[derive(Clone)]
pub struct MemoryLedger {
    state: Arc<Mutex<State>>,
}

impl MemoryLedger {
    /// Creates a ledger with the given owner and otherwise empty books.
    /// The owner is not a member until added like anyone else.
    pub fn new(owner: Address) -> Self {
        MemoryLedger {
            state: Arc::new(Mutex::new(State {
                owner,
                members: Vec::new(),
                flagged: HashSet::new(),
                balances: HashMap::new(),
                debts: HashMap::new(),
                mode: ConfirmMode::Auto,
                next_id: 0,
                reject_submit: None,
                revert_write: None,
                undecided: VecDeque::new(),
                waiting: HashMap::new(),
            })),
        }
    }

    /// Binds the ledger to a caller identity, producing a [`LedgerHandle`].
    pub fn bind(&self, caller: Address) -> BoundLedger {
        BoundLedger {
            caller,
            ledger: self.clone(),
        }
    }

    /// Switches the confirmation mode.
    pub fn set_mode(&self, mode: ConfirmMode) {
        self.state.lock().mode = mode;
    }

    /// Registers a member directly, bypassing the owner-only write path.
    pub fn seed_member(&self, address: Address) {
        let mut state = self.state.lock();
        if !state.members.contains(&address) {
            state.members.push(address);
        }
    }

    /// Sets a balance directly, bypassing the deposit path.
    pub fn seed_balance(&self, address: Address, amount: Amount) {
        self.state.lock().balances.insert(address, amount);
    }

    /// Makes the next submission fail before acceptance with the given
    /// reason (a declined signature, in provider terms).
    pub fn reject_next_submit(&self, reason: &str) {
        self.state.lock().reject_submit = Some(reason.to_string());
    }

    /// Makes the next accepted write revert at confirmation time with the
    /// given reason, instead of applying.
    pub fn revert_next_write(&self, reason: &str) {
        self.state.lock().revert_write = Some(reason.to_string());
    }

    /// Number of accepted writes still awaiting a manual decision.
    pub fn undecided_count(&self) -> usize {
        self.state.lock().undecided.len()
    }

    /// Manual mode: finalizes the oldest undecided write, applying it to
    /// the books. Returns `false` when nothing is queued.
    pub fn confirm_next(&self) -> bool {
        let mut state = self.state.lock();
        match state.undecided.pop_front() {
            Some(entry) => {
                let outcome = state.apply(&entry.caller, &entry.request);
                let _ = entry.decide.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Manual mode: reverts the oldest undecided write with the given
    /// reason. Returns `false` when nothing is queued.
    pub fn revert_next(&self, reason: &str) -> bool {
        let mut state = self.state.lock();
        match state.undecided.pop_front() {
            Some(entry) => {
                let _ = entry.decide.send(Err(revert(reason)));
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// BoundLedger
// ---------------------------------------------------------------------------

/// A [`MemoryLedger`] bound to one caller identity.
pub struct BoundLedger {
    caller: Address,
    ledger: MemoryLedger,
}

#[async_trait]
impl LedgerHandle for BoundLedger {
    async fn owner(&self) -> Result<Address, LedgerError> {
        Ok(self.ledger.state.lock().owner.clone())
    }

    async fn is_member(&self, address: &Address) -> Result<bool, LedgerError> {
        Ok(self.ledger.state.lock().is_active_member(address))
    }

    async fn balance_of(&self, address: &Address) -> Result<Amount, LedgerError> {
        Ok(self.ledger.state.lock().balance(address))
    }

    async fn member_list(&self) -> Result<Vec<Address>, LedgerError> {
        Ok(self.ledger.state.lock().members.clone())
    }

    async fn balance_and_status(
        &self,
        address: &Address,
    ) -> Result<(Amount, bool), LedgerError> {
        let state = self.ledger.state.lock();
        Ok((state.balance(address), state.is_active_member(address)))
    }

    async fn submit(&self, request: WriteRequest) -> Result<SubmittedWrite, SubmitError> {
        let mut state = self.ledger.state.lock();

        if let Some(reason) = state.reject_submit.take() {
            return Err(SubmitError::Rejected { reason });
        }

        let id = state.next_id;
        state.next_id += 1;
        let kind = request.kind();
        let (decide, outcome) = oneshot::channel();

        match state.mode {
            ConfirmMode::Auto => {
                // Acceptance and finalization collapse into one step.
                let decision = match state.revert_write.take() {
                    Some(reason) => Err(revert(&reason)),
                    None => state.apply(&self.caller, &request),
                };
                let _ = decide.send(decision);
            }
            ConfirmMode::Manual => {
                state.undecided.push_back(Undecided {
                    caller: self.caller.clone(),
                    request,
                    decide,
                });
            }
        }

        state.waiting.insert(id, outcome);
        Ok(SubmittedWrite { id, kind })
    }

    async fn await_confirmation(&self, submitted: SubmittedWrite) -> Result<(), RevertError> {
        let outcome = self.ledger.state.lock().waiting.remove(&submitted.id);
        match outcome {
            Some(rx) => rx.await.unwrap_or_else(|_| {
                Err(RevertError {
                    reason: Some("confirmation lost".to_string()),
                })
            }),
            None => Err(RevertError {
                reason: Some("unknown write".to_string()),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(fill: char) -> Address {
        Address::parse(&format!("0x{}", fill.to_string().repeat(40))).unwrap()
    }

    fn one() -> Amount {
        Amount::parse("1").unwrap()
    }

    #[tokio::test]
    async fn owner_adds_member_and_list_preserves_order() {
        let owner = addr('a');
        let ledger = MemoryLedger::new(owner.clone());
        let handle = ledger.bind(owner.clone());

        for member in [owner.clone(), addr('b'), addr('c')] {
            let submitted = handle
                .submit(WriteRequest::AddMember { member })
                .await
                .unwrap();
            handle.await_confirmation(submitted).await.unwrap();
        }

        let list = handle.member_list().await.unwrap();
        assert_eq!(list, vec![owner, addr('b'), addr('c')]);
    }

    #[tokio::test]
    async fn non_owner_add_member_reverts() {
        let ledger = MemoryLedger::new(addr('a'));
        ledger.seed_member(addr('b'));
        let handle = ledger.bind(addr('b'));

        let submitted = handle
            .submit(WriteRequest::AddMember { member: addr('c') })
            .await
            .unwrap();
        let err = handle.await_confirmation(submitted).await.unwrap_err();
        assert_eq!(err.reason.as_deref(), Some("only the owner can add members"));
    }

    #[tokio::test]
    async fn deposit_then_withdraw() {
        let ledger = MemoryLedger::new(addr('a'));
        ledger.seed_member(addr('b'));
        let handle = ledger.bind(addr('b'));

        let submitted = handle
            .submit(WriteRequest::Deposit { value: one() })
            .await
            .unwrap();
        handle.await_confirmation(submitted).await.unwrap();
        assert_eq!(handle.balance_of(&addr('b')).await.unwrap(), one());

        let submitted = handle
            .submit(WriteRequest::Withdraw {
                amount: Amount::parse("0.4").unwrap(),
            })
            .await
            .unwrap();
        handle.await_confirmation(submitted).await.unwrap();
        assert_eq!(
            handle.balance_of(&addr('b')).await.unwrap(),
            Amount::parse("0.6").unwrap()
        );
    }

    #[tokio::test]
    async fn overdraw_reverts_with_reason() {
        let ledger = MemoryLedger::new(addr('a'));
        ledger.seed_member(addr('b'));
        let handle = ledger.bind(addr('b'));

        let submitted = handle
            .submit(WriteRequest::Withdraw { amount: one() })
            .await
            .unwrap();
        let err = handle.await_confirmation(submitted).await.unwrap_err();
        assert_eq!(err.reason.as_deref(), Some("insufficient balance"));
    }

    #[tokio::test]
    async fn debt_cycle() {
        let ledger = MemoryLedger::new(addr('a'));
        ledger.seed_member(addr('b'));
        ledger.seed_member(addr('c'));

        // C records that B owes them one.
        let creditor = ledger.bind(addr('c'));
        let submitted = creditor
            .submit(WriteRequest::RecordDebt {
                debtor: addr('b'),
                amount: one(),
            })
            .await
            .unwrap();
        creditor.await_confirmation(submitted).await.unwrap();

        // B pays it back; C's balance is credited.
        let debtor = ledger.bind(addr('b'));
        let submitted = debtor
            .submit(WriteRequest::PayDebt {
                creditor: addr('c'),
                value: one(),
            })
            .await
            .unwrap();
        debtor.await_confirmation(submitted).await.unwrap();
        assert_eq!(debtor.balance_of(&addr('c')).await.unwrap(), one());

        // Nothing left to pay.
        let submitted = debtor
            .submit(WriteRequest::PayDebt {
                creditor: addr('c'),
                value: one(),
            })
            .await
            .unwrap();
        let err = debtor.await_confirmation(submitted).await.unwrap_err();
        assert_eq!(err.reason.as_deref(), Some("no recorded debt to this creditor"));
    }

    #[tokio::test]
    async fn flagged_member_stops_counting() {
        let owner = addr('a');
        let ledger = MemoryLedger::new(owner.clone());
        ledger.seed_member(addr('b'));
        let handle = ledger.bind(owner);

        assert!(handle.is_member(&addr('b')).await.unwrap());

        let submitted = handle
            .submit(WriteRequest::FlagMember { member: addr('b') })
            .await
            .unwrap();
        handle.await_confirmation(submitted).await.unwrap();
        assert!(!handle.is_member(&addr('b')).await.unwrap());
    }

    #[tokio::test]
    async fn manual_mode_holds_until_decided() {
        let ledger = MemoryLedger::new(addr('a'));
        ledger.seed_member(addr('b'));
        ledger.set_mode(ConfirmMode::Manual);
        let handle = ledger.bind(addr('b'));

        let submitted = handle
            .submit(WriteRequest::Deposit { value: one() })
            .await
            .unwrap();
        assert_eq!(ledger.undecided_count(), 1);

        // Nothing applied yet.
        assert_eq!(handle.balance_of(&addr('b')).await.unwrap(), Amount::ZERO);

        assert!(ledger.confirm_next());
        handle.await_confirmation(submitted).await.unwrap();
        assert_eq!(handle.balance_of(&addr('b')).await.unwrap(), one());
    }

    #[tokio::test]
    async fn injected_submit_rejection() {
        let ledger = MemoryLedger::new(addr('a'));
        ledger.seed_member(addr('b'));
        ledger.reject_next_submit("user denied signature");
        let handle = ledger.bind(addr('b'));

        let err = handle
            .submit(WriteRequest::Deposit { value: one() })
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Rejected { .. }));

        // Only the next submission was poisoned.
        assert!(handle
            .submit(WriteRequest::Deposit { value: one() })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn injected_revert() {
        let ledger = MemoryLedger::new(addr('a'));
        ledger.seed_member(addr('b'));
        ledger.revert_next_write("insufficient");
        let handle = ledger.bind(addr('b'));

        let submitted = handle
            .submit(WriteRequest::Deposit { value: one() })
            .await
            .unwrap();
        let err = handle.await_confirmation(submitted).await.unwrap_err();
        assert_eq!(err.reason.as_deref(), Some("insufficient"));

        // The injected revert did not touch the books.
        assert_eq!(handle.balance_of(&addr('b')).await.unwrap(), Amount::ZERO);
    }
}
