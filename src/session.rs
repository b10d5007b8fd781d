use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{interval, Duration};

use crate::error::SessionError;
use crate::ingest::Document;
use crate::llm::{Message, ModelClient, Role};

/// Append-only chat history, oldest message first.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) -> Result<(), SessionError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(SessionError::EmptyContent);
        }
        self.messages.push(Message::new(role, content));
        Ok(())
    }

    /// The whole history, in order. Nothing is truncated.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Default)]
pub struct SessionState {
    pub conversation: Conversation,
    pub document: Option<Document>,
    pub last_active: DateTime<Utc>,
    /// Held for a whole chat turn so turns on one session never interleave.
    turn: Arc<Mutex<()>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            last_active: Utc::now(),
            ..Self::default()
        }
    }

    fn touch(&mut self) {
        self.last_active = Utc::now();
    }
}

/// In-memory sessions keyed by id. Idle sessions expire after the TTL.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionState>>>,
    ttl: TimeDelta,
}

impl SessionStore {
    pub fn new(ttl: TimeDelta) -> Self {
        let store = Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        };

        let sweeper = store.clone();
        tokio::spawn(async move {
            let mut cleanup_interval = interval(Duration::from_secs(60));
            loop {
                cleanup_interval.tick().await;
                sweeper.cleanup_expired().await;
            }
        });

        store
    }

    async fn cleanup_expired(&self) {
        // A TTL reaching past the earliest representable time expires nothing.
        let Some(cutoff) = Utc::now().checked_sub_signed(self.ttl) else {
            return;
        };
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, state| state.last_active > cutoff);
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::info!("Expired {} idle sessions", expired);
        }
    }

    pub async fn create(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        sessions.insert(id.clone(), SessionState::new());
        tracing::info!("Session {} started", id);
        id
    }

    pub async fn remove(&self, id: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        sessions
            .remove(id)
            .map(|_| tracing::info!("Session {} ended", id))
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    pub async fn attach_document(&self, id: &str, document: Document) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let state = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        state.document = Some(document);
        state.touch();
        Ok(())
    }

    pub async fn document(&self, id: &str) -> Result<Document, SessionError> {
        let mut sessions = self.sessions.write().await;
        let state = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        state.touch();
        state
            .document
            .clone()
            .ok_or_else(|| SessionError::NoDocument(id.to_string()))
    }

    pub async fn history(&self, id: &str) -> Result<Vec<Message>, SessionError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .map(|state| state.conversation.snapshot())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub async fn clear_history(&self, id: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let state = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        state.conversation.clear();
        state.touch();
        Ok(())
    }

    /// Appends the user's message, sends the full history, and appends the
    /// reply. The store lock is released while the model is working; the
    /// session's turn lock is not, so a second chat on the same session waits.
    ///
    /// If the model call fails the user message stays in the history and no
    /// reply is recorded.
    pub async fn chat(
        &self,
        id: &str,
        text: &str,
        client: &dyn ModelClient,
        max_tokens: u32,
    ) -> Result<String, SessionError> {
        let turn = {
            let sessions = self.sessions.read().await;
            sessions
                .get(id)
                .map(|state| state.turn.clone())
                .ok_or_else(|| SessionError::NotFound(id.to_string()))?
        };
        let _turn = turn.lock().await;

        let history = {
            let mut sessions = self.sessions.write().await;
            let state = sessions
                .get_mut(id)
                .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
            state.conversation.append(Role::User, text)?;
            state.touch();
            state.conversation.snapshot()
        };

        let reply = client.complete(&history, None, max_tokens).await?;

        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(state) => {
                if let Err(e) = state.conversation.append(Role::Assistant, reply.clone()) {
                    tracing::warn!("Dropped empty reply in session {}: {}", id, e);
                }
                state.touch();
            }
            None => tracing::warn!("Session {} ended before its reply arrived", id),
        }

        Ok(reply)
    }
}
