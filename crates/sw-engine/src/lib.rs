//! sw-engine - Migration engine for Stepwise
//!
//! This crate ties the pieces together: the table journal that records
//! applied scripts, the script executor that preprocesses, splits and runs
//! one script, and the upgrade orchestrator that applies whatever is pending.
//!
//! Runs are single-threaded and sequential. No lock is taken on the
//! journal, so concurrent upgrades of one database are unsupported.

pub mod error;
pub mod executor;
pub mod journal;
pub mod upgrade;

pub use error::{EngineError, EngineResult};
pub use executor::ScriptExecutor;
pub use journal::{Journal, TableJournal, APPLIED_FORMAT};
pub use upgrade::{UpgradeEngine, UpgradeEngineBuilder, UpgradeResult, UpgradeState};
