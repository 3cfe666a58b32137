//! Phase reports and run options

use serde::{Deserialize, Serialize};
use xfck_ledger::{LedgerStatus, Side};

/// Which phases a run executes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub skip_new: bool,
    pub skip_old: bool,
    /// Stop once the ledger is populated
    pub enumerate_only: bool,
}

impl PipelineOptions {
    #[must_use]
    pub fn runs(&self, side: Side) -> bool {
        if self.enumerate_only {
            return false;
        }
        match side {
            Side::New => !self.skip_new,
            Side::Old => !self.skip_old,
        }
    }
}

/// Outcome of the single population pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationReport {
    pub directories: u64,
    pub files: u64,
    /// Entries that are neither directories nor regular files
    pub skipped: u64,
    pub duration_ms: u64,
}

/// Outcome of one hash phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashPhaseReport {
    pub side: Side,
    /// Pending rows handed to the workers
    pub queued: u64,
    pub hashed: u64,
    /// Files that could not be read or whose update failed; they stay pending
    pub failed: u64,
    /// Updates that matched no null row
    pub unchanged: u64,
    pub duration_ms: u64,
}

impl HashPhaseReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Everything a run did, plus where the ledger stands afterwards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// `None` when the ledger was already populated
    pub enumeration: Option<EnumerationReport>,
    pub phases: Vec<HashPhaseReport>,
    pub status: LedgerStatus,
}

impl PipelineReport {
    #[must_use]
    pub fn phase(&self, side: Side) -> Option<&HashPhaseReport> {
        self.phases.iter().find(|p| p.side == side)
    }

    #[must_use]
    pub fn failed(&self) -> u64 {
        self.phases.iter().map(|p| p.failed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerate_only_runs_no_side() {
        let options = PipelineOptions {
            enumerate_only: true,
            ..PipelineOptions::default()
        };
        assert!(!options.runs(Side::New));
        assert!(!options.runs(Side::Old));
    }

    #[test]
    fn test_skip_is_per_side() {
        let options = PipelineOptions {
            skip_old: true,
            ..PipelineOptions::default()
        };
        assert!(options.runs(Side::New));
        assert!(!options.runs(Side::Old));
    }
}
