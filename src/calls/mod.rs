//! Serializable ledger calls and a JSON-lines script runner built on them.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::ledger::{Amount, Ledger, LedgerError, LedgerEvent};
use crate::units::serde_amount;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerCall {
    Transfer {
        to: Address,
        #[serde(with = "serde_amount")]
        amount: Amount,
    },
    Approve {
        spender: Address,
        #[serde(with = "serde_amount")]
        amount: Amount,
    },
    TransferFrom {
        owner: Address,
        to: Address,
        #[serde(with = "serde_amount")]
        amount: Amount,
    },
    IncreaseAllowance {
        spender: Address,
        #[serde(with = "serde_amount")]
        added: Amount,
    },
    DecreaseAllowance {
        spender: Address,
        #[serde(with = "serde_amount")]
        subtracted: Amount,
    },
}

impl Ledger {
    /// Dispatches `call` on behalf of `caller`.
    pub fn execute(&mut self, caller: Address, call: &LedgerCall) -> Result<LedgerEvent, LedgerError> {
        match *call {
            LedgerCall::Transfer { to, amount } => self.transfer(caller, to, amount),
            LedgerCall::Approve { spender, amount } => self.approve(caller, spender, amount),
            LedgerCall::TransferFrom { owner, to, amount } => {
                self.transfer_from(caller, owner, to, amount)
            }
            LedgerCall::IncreaseAllowance { spender, added } => {
                self.increase_allowance(caller, spender, added)
            }
            LedgerCall::DecreaseAllowance { spender, subtracted } => {
                self.decrease_allowance(caller, spender, subtracted)
            }
        }
    }
}

/// One line of a call script.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptEntry {
    pub caller: Address,
    pub call: LedgerCall,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    Ok { event: LedgerEvent },
    Err { kind: String, error: String },
}

impl From<Result<LedgerEvent, LedgerError>> for CallOutcome {
    fn from(result: Result<LedgerEvent, LedgerError>) -> Self {
        match result {
            Ok(event) => CallOutcome::Ok { event },
            Err(err) => CallOutcome::Err {
                kind: err.kind().to_string(),
                error: err.to_string(),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallRecord {
    pub index: usize,
    pub caller: Address,
    pub call: LedgerCall,
    pub outcome: CallOutcome,
}

#[derive(Debug, thiserror::Error)]
#[error("script line {line}: {source}")]
pub struct ScriptError {
    pub line: usize,
    #[source]
    pub source: serde_json::Error,
}

/// Parses a JSON-lines script. Blank lines and lines starting with `#` are
/// skipped; `line` in errors is 1-based.
pub fn parse_script(text: &str) -> Result<Vec<ScriptEntry>, ScriptError> {
    text.lines()
        .enumerate()
        .filter(|(_, l)| {
            let l = l.trim();
            !l.is_empty() && !l.starts_with('#')
        })
        .map(|(idx, l)| {
            serde_json::from_str(l).map_err(|source| ScriptError {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

/// Applies every entry in order. A rejected call is recorded and the replay
/// carries on with the next entry.
pub fn replay<I>(ledger: &mut Ledger, entries: I) -> Vec<CallRecord>
where
    I: IntoIterator<Item = ScriptEntry>,
{
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let outcome = ledger.execute(entry.caller, &entry.call).into();
            CallRecord {
                index,
                caller: entry.caller,
                call: entry.call,
                outcome,
            }
        })
        .collect()
}
