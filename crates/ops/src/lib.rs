#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Verification pipeline for xfck
//!
//! Three phases run strictly in order against a shared [`VerifyContext`]:
//!
//! 1. enumerate the destination tree into an empty ledger (one transaction)
//! 2. hash every destination file whose `hash_new` is still null
//! 3. hash every source file whose `hash_old` is still null
//!
//! All progress lives in the ledger, so an interrupted run resumes by
//! running the pipeline again.

mod context;
mod dir_queue;
mod enumerate;
mod hash_pool;
mod pipeline;
mod types;

pub use context::{open_ledger, VerifyContext, VerifyContextBuilder};
pub use enumerate::enumerate;
pub use hash_pool::hash_side;
pub use pipeline::{ledger_status, run_pipeline};
pub use types::{EnumerationReport, HashPhaseReport, PipelineOptions, PipelineReport};

pub use xfck_ledger::{Ledger, LedgerStatus, Side};
