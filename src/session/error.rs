//! Session error taxonomy.

use thiserror::Error;

use crate::inference::InferenceError;
use crate::store::StoreError;

/// Malformed session key; a caller error, never retried.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid session key: {reason}")]
pub struct InvalidKeyError {
    pub reason: &'static str,
}

impl InvalidKeyError {
    pub(crate) fn empty() -> Self {
        Self {
            reason: "key must not be empty",
        }
    }
}

/// Why a turn failed. Carries the underlying cause for the caller to log.
///
/// `Inference` means the in-memory transcript was rolled back to its pre-turn
/// state and nothing was persisted. `Persistence` means the assistant reply
/// was generated and is live in memory, but durability was not achieved for
/// this turn; a restart before the next successful persist loses it.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("deadline elapsed before the turn was admitted")]
    QueueDeadline,

    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
}
