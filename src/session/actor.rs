//! The session actor: single-writer owner of one conversation's state.
//!
//! All operations on one session key funnel through the actor's execution
//! slot (a fair async mutex), so turns apply in admission order and a restore
//! is never raced by a concurrent turn. The durable store only ever sees
//! whole, consistent records: a user turn is not persisted until its paired
//! assistant turn exists.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use super::context::{ContextPolicy, FullContext};
use super::error::TurnError;
use super::transcript::{Transcript, Turn};
use crate::inference::{GenerateOptions, InferenceClient, InferenceError};
use crate::store::{SessionRecord, SessionStore, StoreError};

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer plainly and keep context from earlier in the conversation.";

/// Per-session tuning applied to every actor a registry creates.
#[derive(Clone)]
pub struct SessionOptions {
    /// Instruction for the single system turn of a newly created session.
    pub system_prompt: String,
    pub generate: GenerateOptions,
    pub context: Arc<dyn ContextPolicy>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            generate: GenerateOptions::default(),
            context: Arc::new(FullContext),
        }
    }
}

/// One conversation's in-memory state.
struct Session {
    created_at: DateTime<Utc>,
    transcript: Transcript,
}

impl Session {
    fn create(options: &SessionOptions) -> Self {
        Self {
            created_at: Utc::now(),
            transcript: Transcript::with_system(options.system_prompt.clone()),
        }
    }

    /// Rebuild verbatim from a durable record; no reinitialization.
    fn restore(record: SessionRecord) -> Self {
        Self {
            created_at: record.created_at,
            transcript: Transcript::from_turns(record.turns),
        }
    }

    fn to_record(&self, key: &str) -> SessionRecord {
        SessionRecord {
            session_key: key.to_string(),
            created_at: self.created_at,
            turns: self.transcript.turns().to_vec(),
        }
    }
}

pub struct SessionActor {
    key: String,
    store: Arc<dyn SessionStore>,
    client: Arc<dyn InferenceClient>,
    options: SessionOptions,
    /// Single-writer execution slot; tokio's mutex queues waiters in FIFO
    /// admission order. `None` until the first admitted operation restores
    /// or creates state.
    state: Mutex<Option<Session>>,
}

impl SessionActor {
    pub(crate) fn new(
        key: String,
        store: Arc<dyn SessionStore>,
        client: Arc<dyn InferenceClient>,
        options: SessionOptions,
    ) -> Self {
        Self {
            key,
            store,
            client,
            options,
            state: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Execute one turn with no caller-supplied deadline.
    pub async fn handle_turn(&self, user_text: &str) -> Result<String, TurnError> {
        self.handle_turn_until(user_text, None).await
    }

    /// Execute one turn, bounded by an optional deadline.
    ///
    /// A deadline that elapses while queued abandons the FIFO slot with no
    /// side effects. One that elapses mid-inference cancels the call and is
    /// handled like any other inference failure: the in-memory transcript is
    /// rolled back to its pre-turn state and nothing is persisted.
    pub async fn handle_turn_until(
        &self,
        user_text: &str,
        deadline: Option<Instant>,
    ) -> Result<String, TurnError> {
        let mut slot = self.admit(deadline).await?;
        let session = self.ensure_loaded(&mut slot).await?;

        let checkpoint = session.transcript.len();
        session.transcript.push(Turn::user(user_text));

        let context = self.options.context.select(session.transcript.turns());
        let generated = match deadline {
            Some(deadline) => {
                match tokio::time::timeout_at(
                    deadline,
                    self.client.generate(&context, &self.options.generate),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(InferenceError::Timeout),
                }
            }
            None => self.client.generate(&context, &self.options.generate).await,
        };

        let reply = match generated {
            Ok(reply) => reply,
            Err(err) => {
                session.transcript.truncate(checkpoint);
                tracing::debug!(key = %self.key, error = %err, "turn rolled back, inference failed");
                return Err(TurnError::Inference(err));
            }
        };

        session.transcript.push(Turn::assistant(reply.clone()));
        let record = session.to_record(&self.key);
        if let Err(err) = self.store.put(&self.key, &record).await {
            // The reply stays live in memory; durability was not achieved.
            tracing::warn!(key = %self.key, error = %err, "turn generated but not persisted");
            return Err(TurnError::Persistence(err));
        }

        tracing::debug!(key = %self.key, turns = session.transcript.len(), "turn applied");
        Ok(reply)
    }

    /// Read-only snapshot of the conversation, excluding the system turn.
    /// Serializes against in-flight turns so it never sees a half-applied one.
    pub async fn history(&self) -> Result<Vec<Turn>, TurnError> {
        let mut slot = self.state.lock().await;
        let session = self.ensure_loaded(&mut slot).await?;
        Ok(session.transcript.visible().to_vec())
    }

    /// Truncate the transcript back to the single initial system turn and
    /// persist that state. The session identity survives.
    pub async fn reset(&self) -> Result<(), TurnError> {
        let mut slot = self.state.lock().await;
        let session = self.ensure_loaded(&mut slot).await?;

        session.transcript.truncate(1);
        let record = session.to_record(&self.key);
        self.store.put(&self.key, &record).await?;

        tracing::info!(key = %self.key, "session reset");
        Ok(())
    }

    /// Wait until the in-flight operation, if any, has finished.
    pub(crate) async fn quiesce(&self) {
        drop(self.state.lock().await);
    }

    /// True when no operation currently holds the execution slot.
    pub(crate) fn is_idle(&self) -> bool {
        self.state.try_lock().is_ok()
    }

    async fn admit(
        &self,
        deadline: Option<Instant>,
    ) -> Result<MutexGuard<'_, Option<Session>>, TurnError> {
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, self.state.lock())
                .await
                .map_err(|_| TurnError::QueueDeadline),
            None => Ok(self.state.lock().await),
        }
    }

    /// Restore-or-create, performed by the first admitted operation.
    async fn ensure_loaded<'a>(
        &self,
        slot: &'a mut Option<Session>,
    ) -> Result<&'a mut Session, StoreError> {
        match slot {
            Some(session) => Ok(session),
            None => {
                let session = match self.store.get(&self.key).await? {
                    Some(record) => {
                        tracing::debug!(
                            key = %self.key,
                            turns = record.turns.len(),
                            "session restored from durable store"
                        );
                        Session::restore(record)
                    }
                    None => {
                        tracing::debug!(key = %self.key, "session created");
                        Session::create(&self.options)
                    }
                };
                Ok(slot.insert(session))
            }
        }
    }
}
