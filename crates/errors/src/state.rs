//! Ledger and database error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StateError {
    #[error("database error: {message}")]
    DatabaseError { message: String },

    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("schema creation failed: {message}")]
    SchemaFailed { message: String },

    #[error("transaction failed: {message}")]
    TransactionFailed { message: String },

    #[error("invalid filter clause: {message}")]
    InvalidFilter { message: String },
}

impl UserFacingError for StateError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ConnectionFailed { .. } => {
                Some("Check the ledger database path and that its directory is writable.")
            }
            Self::InvalidFilter { .. } => {
                Some("Fix the `where_clause` fragment; it is appended verbatim to the query.")
            }
            Self::TransactionFailed { .. } => {
                Some("The enumeration was rolled back; the next run starts it again.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::TransactionFailed { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::DatabaseError { .. } => "state.database_error",
            Self::ConnectionFailed { .. } => "state.connection_failed",
            Self::SchemaFailed { .. } => "state.schema_failed",
            Self::TransactionFailed { .. } => "state.transaction_failed",
            Self::InvalidFilter { .. } => "state.invalid_filter",
        };
        Some(code)
    }
}
