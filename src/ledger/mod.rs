use std::collections::BTreeMap;

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::address::Address;
use crate::units::serde_amount;

mod shared;
mod state_root;

pub use shared::SharedLedger;
pub use state_root::compute_state_root;

pub type Amount = U256;

/// Fixed precision of every ledger: 1 token = 10^18 smallest units.
pub const DECIMALS: u8 = 18;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient balance in {account}: have {balance}, need {needed}")]
    InsufficientBalance {
        account: Address,
        balance: Amount,
        needed: Amount,
    },
    #[error("insufficient allowance for {spender} on {owner}: have {allowance}, need {needed}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        allowance: Amount,
        needed: Amount,
    },
    #[error("transfer party is the null address")]
    InvalidRecipient,
    #[error("approval party is the null address")]
    InvalidSpender,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("balances sum to {sum}, total supply is {total_supply}")]
    ConservationViolated { total_supply: Amount, sum: Amount },
}

impl LedgerError {
    /// Stable snake_case label, used in logs and script output.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::InsufficientAllowance { .. } => "insufficient_allowance",
            LedgerError::InvalidRecipient => "invalid_recipient",
            LedgerError::InvalidSpender => "invalid_spender",
            LedgerError::Overflow => "overflow",
            LedgerError::ConservationViolated { .. } => "conservation_violated",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(with = "serde_amount")]
    pub total_supply: Amount,
}

/// Notification describing a successful mutation. Returned to the caller,
/// who decides where to route it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LedgerEvent {
    Transfer {
        from: Address,
        to: Address,
        #[serde(with = "serde_amount")]
        value: Amount,
    },
    Approval {
        owner: Address,
        spender: Address,
        #[serde(with = "serde_amount")]
        value: Amount,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceEntry {
    pub account: Address,
    #[serde(with = "serde_amount")]
    pub balance: Amount,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllowanceEntry {
    pub owner: Address,
    pub spender: Address,
    #[serde(with = "serde_amount")]
    pub allowance: Amount,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub meta: TokenMetadata,
    pub balances: Vec<BalanceEntry>,
    pub allowances: Vec<AllowanceEntry>,
    #[serde(with = "state_root::serde_root")]
    pub state_root: [u8; 32],
}

/// Fixed-supply token ledger.
///
/// Only non-zero balances and allowances are stored; anything absent reads
/// as zero. Every mutation validates fully before writing, so a failed call
/// leaves the ledger untouched.
#[derive(Clone, Debug)]
pub struct Ledger {
    meta: TokenMetadata,
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<(Address, Address), Amount>,
}

impl Ledger {
    /// Creates a ledger holding `initial_supply` whole tokens, all credited
    /// to `creator`.
    ///
    /// Callers outside the crate go through [`crate::deploy::deploy`], which
    /// validates the parameters (non-null creator among them) first.
    pub(crate) fn new(
        creator: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        initial_supply: u128,
    ) -> Self {
        // u128::MAX * 10^18 < 2^256, so this cannot overflow.
        let total_supply = U256::from(initial_supply) * U256::exp10(DECIMALS as usize);
        let meta = TokenMetadata {
            name: name.into(),
            symbol: symbol.into(),
            decimals: DECIMALS,
            total_supply,
        };
        debug_assert!(!creator.is_zero(), "creator must not be the null address");
        let mut balances = BTreeMap::new();
        if !total_supply.is_zero() {
            balances.insert(creator, total_supply);
        }
        debug!(
            name = %meta.name,
            symbol = %meta.symbol,
            %creator,
            total_supply = %total_supply,
            "ledger created"
        );
        Self {
            meta,
            balances,
            allowances: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn symbol(&self) -> &str {
        &self.meta.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.meta.decimals
    }

    pub fn total_supply(&self) -> Amount {
        self.meta.total_supply
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.meta
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    /// Accounts holding a non-zero balance, in address order.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    pub fn transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        let result = self.apply_transfer(caller, to, amount);
        self.finish("transfer", result)
    }

    /// Sets the allowance of `spender` over `caller`'s balance, replacing any
    /// previous value.
    pub fn approve(
        &mut self,
        caller: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        let result = Self::check_approval_parties(caller, spender)
            .map(|()| self.set_allowance(caller, spender, amount));
        self.finish("approve", result)
    }

    /// Moves `amount` from `owner` to `to` on the strength of the allowance
    /// `owner` granted to `caller`, which shrinks by exactly `amount`.
    pub fn transfer_from(
        &mut self,
        caller: Address,
        owner: Address,
        to: Address,
        amount: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        let result = self.apply_transfer_from(caller, owner, to, amount);
        self.finish("transfer_from", result)
    }

    /// Adds `added` to the current allowance.
    pub fn increase_allowance(
        &mut self,
        caller: Address,
        spender: Address,
        added: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        let result = Self::check_approval_parties(caller, spender).and_then(|()| {
            let updated = self
                .allowance(&caller, &spender)
                .checked_add(added)
                .ok_or(LedgerError::Overflow)?;
            Ok(self.set_allowance(caller, spender, updated))
        });
        self.finish("increase_allowance", result)
    }

    /// Subtracts `subtracted` from the current allowance; fails rather than
    /// clamping at zero.
    pub fn decrease_allowance(
        &mut self,
        caller: Address,
        spender: Address,
        subtracted: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        let result = Self::check_approval_parties(caller, spender).and_then(|()| {
            let current = self.allowance(&caller, &spender);
            let updated =
                current
                    .checked_sub(subtracted)
                    .ok_or(LedgerError::InsufficientAllowance {
                        owner: caller,
                        spender,
                        allowance: current,
                        needed: subtracted,
                    })?;
            Ok(self.set_allowance(caller, spender, updated))
        });
        self.finish("decrease_allowance", result)
    }

    /// Recomputes the sum of all balances and compares it with the supply.
    pub fn check_conservation(&self) -> Result<(), LedgerError> {
        let mut sum = U256::zero();
        for balance in self.balances.values() {
            sum = sum.checked_add(*balance).ok_or(LedgerError::Overflow)?;
        }
        if sum != self.meta.total_supply {
            return Err(LedgerError::ConservationViolated {
                total_supply: self.meta.total_supply,
                sum,
            });
        }
        Ok(())
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            meta: self.meta.clone(),
            balances: self
                .balances
                .iter()
                .map(|(account, balance)| BalanceEntry {
                    account: *account,
                    balance: *balance,
                })
                .collect(),
            allowances: self
                .allowances
                .iter()
                .map(|((owner, spender), allowance)| AllowanceEntry {
                    owner: *owner,
                    spender: *spender,
                    allowance: *allowance,
                })
                .collect(),
            state_root: compute_state_root(&self.balances, &self.allowances),
        }
    }

    fn apply_transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        // a null party on either side of a transfer is reported as an
        // invalid recipient
        if caller.is_zero() || to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        self.move_balance(caller, to, amount)?;
        Ok(LedgerEvent::Transfer {
            from: caller,
            to,
            value: amount,
        })
    }

    fn apply_transfer_from(
        &mut self,
        caller: Address,
        owner: Address,
        to: Address,
        amount: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        if owner.is_zero() || to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        let balance = self.balance_of(&owner);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                account: owner,
                balance,
                needed: amount,
            });
        }
        let allowance = self.allowance(&owner, &caller);
        let remaining = allowance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientAllowance {
                owner,
                spender: caller,
                allowance,
                needed: amount,
            })?;
        self.move_balance(owner, to, amount)?;
        self.store_allowance(owner, caller, remaining);
        Ok(LedgerEvent::Transfer {
            from: owner,
            to,
            value: amount,
        })
    }

    /// Neither party of an approval may be the null address; both cases
    /// surface as an invalid spender.
    fn check_approval_parties(owner: Address, spender: Address) -> Result<(), LedgerError> {
        if owner.is_zero() || spender.is_zero() {
            return Err(LedgerError::InvalidSpender);
        }
        Ok(())
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, value: Amount) -> LedgerEvent {
        self.store_allowance(owner, spender, value);
        LedgerEvent::Approval {
            owner,
            spender,
            value,
        }
    }

    fn store_allowance(&mut self, owner: Address, spender: Address, value: Amount) {
        if value.is_zero() {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), value);
        }
    }

    fn store_balance(&mut self, account: Address, value: Amount) {
        if value.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, value);
        }
    }

    /// Debits `from` and credits `to`. Both new values are computed before
    /// either is written.
    fn move_balance(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.balance_of(&from);
        let debited = balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                account: from,
                balance,
                needed: amount,
            })?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.store_balance(from, debited);
        self.store_balance(to, credited);
        Ok(())
    }

    fn finish(
        &self,
        op: &'static str,
        result: Result<LedgerEvent, LedgerError>,
    ) -> Result<LedgerEvent, LedgerError> {
        match &result {
            Ok(event) => {
                debug!(op, ?event, "ledger call applied");
                debug_assert_eq!(self.check_conservation(), Ok(()));
            }
            Err(err) => warn!(op, kind = err.kind(), error = %err, "ledger call rejected"),
        }
        result
    }
}
