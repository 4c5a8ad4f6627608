//! Fixed-supply fungible token ledger.
//!
//! The crate is organised around a single state machine and the thin layers
//! that drive it:
//!
//! * [`ledger`]: balances, allowances, and the transfer / approve /
//!   delegated-transfer operations, plus a lock-guarded [`SharedLedger`].
//! * [`address`]: the 20-byte account identifier and its text form.
//! * [`units`]: conversion between display units and smallest units.
//! * [`calls`]: serializable calls and a JSON-lines replay runner.
//! * [`config`] / [`deploy`](mod@deploy): construction parameters and instance
//!   addressing.
//!
//! Supply is fixed when a ledger is created; nothing mints or burns.

pub mod address;
pub mod calls;
pub mod config;
pub mod deploy;
pub mod ledger;
pub mod units;

pub use address::Address;
pub use calls::{LedgerCall, ScriptEntry};
pub use config::DeployConfig;
pub use deploy::{deploy, Deployment};
pub use ledger::{Amount, Ledger, LedgerError, LedgerEvent, SharedLedger, DECIMALS};
