//! Keyed session actors: durable, strictly isolated conversation state.
//!
//! One [`SessionActor`] per external key owns that conversation's transcript
//! and serializes every operation on it; the [`SessionRegistry`] guarantees
//! the key-to-actor mapping is 1:1 and stable for the life of the process.

pub mod actor;
pub mod context;
pub mod error;
pub mod registry;
pub mod transcript;

pub use actor::{SessionActor, SessionOptions};
pub use context::{ContextPolicy, FullContext, TailWindow};
pub use error::{InvalidKeyError, TurnError};
pub use registry::SessionRegistry;
pub use transcript::{Role, Transcript, Turn};

use crate::inference::InferenceClient;
use crate::store::SessionStore;
use std::sync::Arc;

/// Create a registry over the given collaborators.
pub fn create_registry(
    store: Arc<dyn SessionStore>,
    client: Arc<dyn InferenceClient>,
    options: SessionOptions,
) -> Arc<SessionRegistry> {
    Arc::new(SessionRegistry::new(store, client, options))
}
