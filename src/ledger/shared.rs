use std::sync::Arc;

use parking_lot::Mutex;

use crate::address::Address;
use crate::calls::LedgerCall;

use super::{Amount, Ledger, LedgerError, LedgerEvent, LedgerSnapshot, TokenMetadata};

/// Cloneable handle serializing every call through one lock, so concurrent
/// callers observe some sequential order of their operations.
#[derive(Clone, Debug)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    pub fn metadata(&self) -> TokenMetadata {
        self.inner.lock().metadata().clone()
    }

    pub fn total_supply(&self) -> Amount {
        self.inner.lock().total_supply()
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.inner.lock().balance_of(account)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.inner.lock().allowance(owner, spender)
    }

    pub fn transfer(
        &self,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        self.inner.lock().transfer(caller, to, amount)
    }

    pub fn approve(
        &self,
        caller: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        self.inner.lock().approve(caller, spender, amount)
    }

    pub fn transfer_from(
        &self,
        caller: Address,
        owner: Address,
        to: Address,
        amount: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        self.inner.lock().transfer_from(caller, owner, to, amount)
    }

    pub fn increase_allowance(
        &self,
        caller: Address,
        spender: Address,
        added: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        self.inner.lock().increase_allowance(caller, spender, added)
    }

    pub fn decrease_allowance(
        &self,
        caller: Address,
        spender: Address,
        subtracted: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        self.inner.lock().decrease_allowance(caller, spender, subtracted)
    }

    pub fn execute(&self, caller: Address, call: &LedgerCall) -> Result<LedgerEvent, LedgerError> {
        self.inner.lock().execute(caller, call)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.inner.lock().snapshot()
    }

    /// Runs `f` against the ledger while holding the lock, for reads that
    /// must see one consistent state.
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.inner.lock())
    }
}

impl From<Ledger> for SharedLedger {
    fn from(ledger: Ledger) -> Self {
        Self::new(ledger)
    }
}
