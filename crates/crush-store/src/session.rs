use std::sync::{Arc, Mutex};

use crush_core::{CONTEXT_WINDOW, HISTORY_CAP, HistoryEntry, context_window, truncate_history};

use crate::error::{Result, StoreError};
use crate::store::LocalStorage;

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const CHAT_HISTORY_KEY: &str = "chatHistory";

/// Auth token and durable chat history, shared by every component that
/// talks to the backend.
///
/// Cloning is cheap and clones share both the storage and the history lock,
/// so concurrent appends from different tasks never lose entries.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn LocalStorage>,
    history_lock: Arc<Mutex<()>>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            storage,
            history_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn storage(&self) -> &Arc<dyn LocalStorage> {
        &self.storage
    }

    // --- Auth token ---

    pub fn token(&self) -> Result<Option<String>> {
        Ok(self
            .storage
            .get_item(AUTH_TOKEN_KEY)?
            .filter(|t| !t.is_empty()))
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        self.storage.set_item(AUTH_TOKEN_KEY, token)
    }

    pub fn clear_token(&self) -> Result<()> {
        self.storage.remove_item(AUTH_TOKEN_KEY)
    }

    // --- Chat history ---

    /// Full durable history, oldest first. Unreadable history is logged and
    /// treated as empty.
    pub fn chat_history(&self) -> Result<Vec<HistoryEntry>> {
        let Some(json) = self.storage.get_item(CHAT_HISTORY_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&json) {
            Ok(history) => Ok(history),
            Err(e) => {
                tracing::warn!("ignoring unreadable chat history: {e}");
                Ok(Vec::new())
            }
        }
    }

    /// The trailing context sent with each assistant request.
    pub fn recent_history(&self) -> Result<Vec<HistoryEntry>> {
        let history = self.chat_history()?;
        Ok(context_window(&history, CONTEXT_WINDOW).to_vec())
    }

    /// Append entries and keep only the newest `HISTORY_CAP`.
    /// Returns the resulting history length.
    pub fn append_history(&self, entries: &[HistoryEntry]) -> Result<usize> {
        let _guard = self.history_lock.lock().map_err(|_| StoreError::Lock)?;

        let mut history = self.chat_history()?;
        history.extend_from_slice(entries);
        truncate_history(&mut history, HISTORY_CAP);

        let json = serde_json::to_string(&history)?;
        self.storage.set_item(CHAT_HISTORY_KEY, &json)?;
        Ok(history.len())
    }

    pub fn clear_history(&self) -> Result<()> {
        let _guard = self.history_lock.lock().map_err(|_| StoreError::Lock)?;
        self.storage.remove_item(CHAT_HISTORY_KEY)
    }
}
