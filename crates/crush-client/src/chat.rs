use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crush_core::{ChatMessage, FALLBACK_REPLY, HistoryEntry, Sender, Transcript};
use crush_store::SessionStore;

use crate::client::ApiClient;
use crate::error::{ApiError, Result};

/// Run a durable-history operation on the blocking pool. History reads and
/// writes go through SQLite under a `std::sync::Mutex`.
async fn on_store<T, F>(store: &SessionStore, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&SessionStore) -> crush_store::Result<T> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| ApiError::Io(std::io::Error::other(e)))?
        .map_err(ApiError::from)
}

/// Conversation with the dating assistant.
///
/// Sends are single-flight: a second `send` waits until the first reply
/// (or fallback) has been appended, so every bot message directly follows
/// the user message it answers.
pub struct ChatSession {
    client: ApiClient,
    transcript: Mutex<Transcript>,
    flight: Mutex<()>,
    cancel: CancellationToken,
}

impl ChatSession {
    pub fn new(client: ApiClient, transcript_capacity: usize) -> Self {
        Self {
            client,
            transcript: Mutex::new(Transcript::with_greeting(transcript_capacity)),
            flight: Mutex::new(()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Snapshot of the on-screen transcript.
    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.lock().await.to_vec()
    }

    /// Send one message and return the bot message appended in response.
    ///
    /// Blank input is ignored. A failed assistant call yields the fixed
    /// fallback reply and leaves durable history untouched. Returns `None`
    /// when the input is blank or the session was cancelled.
    pub async fn send(&self, message: &str) -> Option<ChatMessage> {
        if message.trim().is_empty() {
            return None;
        }

        let _flight = self.flight.lock().await;
        if self.cancel.is_cancelled() {
            return None;
        }

        self.transcript.lock().await.push(Sender::User, message);

        let session = self.client.session();
        let history = on_store(session, SessionStore::recent_history)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("could not load chat history: {e}");
                Vec::new()
            });

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            result = self.client.chatbot(message, &history) => result,
        };

        let reply = match result {
            Ok(reply) => {
                let turn = [HistoryEntry::user(message), HistoryEntry::assistant(&reply)];
                if let Err(e) = on_store(session, move |s| s.append_history(&turn)).await {
                    tracing::warn!("could not save chat history: {e}");
                }
                reply
            }
            Err(e) => {
                tracing::error!("assistant unavailable, using fallback reply: {e}");
                FALLBACK_REPLY.to_string()
            }
        };

        Some(self.transcript.lock().await.push(Sender::Bot, reply))
    }

    /// Forget the durable history. The on-screen transcript is kept.
    pub fn clear_history(&self) -> Result<()> {
        self.client.session().clear_history()?;
        Ok(())
    }
}
