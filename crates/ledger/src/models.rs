//! Ledger row types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Which tree a hash column or hash phase refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Destination tree, column `hash_new`
    New,
    /// Source tree, column `hash_old`
    Old,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::New, Side::Old];

    /// Ledger column holding this side's digest
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Side::New => "hash_new",
            Side::Old => "hash_old",
        }
    }

    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Side::New => "destination",
            Side::Old => "source",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::New => f.write_str("new"),
            Side::Old => f.write_str("old"),
        }
    }
}

/// A file discovered during enumeration, not yet hashed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    /// Path relative to the destination root, `/`-separated
    pub filename: String,
    pub size: i64,
    pub changed: DateTime<Utc>,
}

/// A full ledger row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Entry {
    pub filename: String,
    pub size: i64,
    pub changed: DateTime<Utc>,
    pub hash_new: Option<String>,
    pub hash_old: Option<String>,
}

impl Entry {
    /// Both sides have been hashed
    #[must_use]
    pub fn is_matched(&self) -> bool {
        self.hash_new.is_some() && self.hash_old.is_some()
    }
}

/// Row counts describing how far verification has progressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStatus {
    pub total: u64,
    pub pending_new: u64,
    pub pending_old: u64,
    pub hashed_both: u64,
}

impl LedgerStatus {
    #[must_use]
    pub fn pending(&self, side: Side) -> u64 {
        match side {
            Side::New => self.pending_new,
            Side::Old => self.pending_old,
        }
    }

    /// No row is waiting on either side
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pending_new == 0 && self.pending_old == 0
    }
}
