//! Session registry: maps external keys to live session actors.
//!
//! Process-wide dispatch table modeled as an explicit struct rather than
//! ambient global state: constructed at startup, drained at shutdown.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::actor::{SessionActor, SessionOptions};
use super::error::InvalidKeyError;
use crate::inference::InferenceClient;
use crate::store::SessionStore;

pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    client: Arc<dyn InferenceClient>,
    options: SessionOptions,
    actors: Mutex<HashMap<String, Arc<SessionActor>>>,
}

impl SessionRegistry {
    pub fn new(
        store: Arc<dyn SessionStore>,
        client: Arc<dyn InferenceClient>,
        options: SessionOptions,
    ) -> Self {
        Self {
            store,
            client,
            options,
            actors: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a key to its one live actor, constructing it on first use.
    ///
    /// Construction happens under the map lock, so concurrent first-requests
    /// for an unseen key observe a single winner; the durable restore itself
    /// runs lazily under the actor's own writer slot. The same key always
    /// yields a handle to the same logical actor; across process restarts
    /// the rebuilt actor restores from the same key-derived durable state.
    pub fn resolve(&self, session_key: &str) -> Result<Arc<SessionActor>, InvalidKeyError> {
        if session_key.trim().is_empty() {
            return Err(InvalidKeyError::empty());
        }

        let mut actors = self.actors.lock();
        let actor = actors
            .entry(session_key.to_string())
            .or_insert_with(|| {
                tracing::debug!(key = %session_key, "session actor constructed");
                Arc::new(SessionActor::new(
                    session_key.to_string(),
                    Arc::clone(&self.store),
                    Arc::clone(&self.client),
                    self.options.clone(),
                ))
            });
        Ok(Arc::clone(actor))
    }

    /// Number of live actors.
    pub fn len(&self) -> usize {
        self.actors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.lock().is_empty()
    }

    /// Drop the in-memory instance for `key` if it is idle and unreferenced.
    ///
    /// Returns false when the actor is mid-operation or a caller still holds
    /// a handle. A later `resolve` reconstructs the actor from durable state,
    /// indistinguishable to callers from a long-lived instance.
    pub fn evict(&self, key: &str) -> bool {
        let mut actors = self.actors.lock();
        match actors.get(key) {
            Some(actor) if Arc::strong_count(actor) == 1 && actor.is_idle() => {
                actors.remove(key);
                tracing::debug!(key = %key, "session actor evicted");
                true
            }
            _ => false,
        }
    }

    /// Wait for every in-flight operation to finish. New operations admitted
    /// after the snapshot are not waited on; callers stop routing first.
    pub async fn drain(&self) {
        let actors: Vec<Arc<SessionActor>> = self.actors.lock().values().cloned().collect();
        let count = actors.len();
        for actor in actors {
            actor.quiesce().await;
        }
        tracing::info!(actors = count, "registry drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::testing::EchoClient;
    use crate::store::InMemorySessionStore;
    use std::time::Duration;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(EchoClient::new()),
            SessionOptions::default(),
        )
    }

    #[test]
    fn empty_key_is_rejected() {
        let registry = registry();
        assert!(registry.resolve("").is_err());
        assert!(registry.resolve("   ").is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn same_key_resolves_to_same_actor() {
        let registry = registry();
        let first = registry.resolve("alice").unwrap();
        let second = registry.resolve("alice").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_keys_resolve_to_distinct_actors() {
        let registry = registry();
        let alice = registry.resolve("alice").unwrap();
        let bob = registry.resolve("bob").unwrap();
        assert!(!Arc::ptr_eq(&alice, &bob));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_first_requests_observe_one_winner() {
        let registry = Arc::new(registry());

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                registry.resolve("alice").unwrap()
            }));
        }

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }
        assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn turns_through_registry_stay_isolated_per_key() {
        let registry = registry();

        registry
            .resolve("alice")
            .unwrap()
            .handle_turn("from alice")
            .await
            .unwrap();
        registry
            .resolve("bob")
            .unwrap()
            .handle_turn("from bob")
            .await
            .unwrap();

        let alice = registry.resolve("alice").unwrap().history().await.unwrap();
        assert!(alice.iter().all(|t| !t.content.contains("bob")));
        let bob = registry.resolve("bob").unwrap().history().await.unwrap();
        assert!(bob.iter().all(|t| !t.content.contains("alice")));
    }

    #[tokio::test]
    async fn evicted_actor_is_rebuilt_from_durable_state() {
        let registry = registry();

        registry
            .resolve("alice")
            .unwrap()
            .handle_turn("hi")
            .await
            .unwrap();

        assert!(registry.evict("alice"));
        assert_eq!(registry.len(), 0);

        // Indistinguishable from the long-lived instance.
        let history = registry.resolve("alice").unwrap().history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hi");
    }

    #[tokio::test]
    async fn evict_refuses_held_or_busy_actors() {
        let registry = registry();

        let held = registry.resolve("alice").unwrap();
        assert!(!registry.evict("alice"));
        drop(held);
        assert!(registry.evict("alice"));
        assert!(!registry.evict("alice"));
    }

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_in_flight_turns() {
        let registry = Arc::new(SessionRegistry::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(EchoClient::with_delay(Duration::from_millis(100))),
            SessionOptions::default(),
        ));

        let actor = registry.resolve("alice").unwrap();
        let turn = tokio::spawn(async move { actor.handle_turn("slow").await.unwrap() });
        {
            let probe = registry.resolve("alice").unwrap();
            while probe.is_idle() {
                tokio::task::yield_now().await;
            }
        }

        registry.drain().await;

        // The turn that was in flight at drain time has completed.
        let history = registry.resolve("alice").unwrap().history().await.unwrap();
        assert_eq!(history.len(), 2);
        turn.await.unwrap();
    }
}
