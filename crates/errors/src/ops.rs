//! Pipeline orchestration error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum OpsError {
    #[error("worker task failed: {message}")]
    WorkerFailed { message: String },

    #[error("channel closed: {channel}")]
    ChannelClosed { channel: String },

    #[error("context creation failed: {message}")]
    ContextCreationFailed { message: String },
}

impl UserFacingError for OpsError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::WorkerFailed { .. } | Self::ChannelClosed { .. } => {
                Some("Progress already written to the ledger is kept; rerun to resume.")
            }
            Self::ContextCreationFailed { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::WorkerFailed { .. } | Self::ChannelClosed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::WorkerFailed { .. } => "ops.worker_failed",
            Self::ChannelClosed { .. } => "ops.channel_closed",
            Self::ContextCreationFailed { .. } => "ops.context_creation_failed",
        };
        Some(code)
    }
}
