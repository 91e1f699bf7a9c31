use tokio_util::sync::CancellationToken;

use crush_core::{
    AdvancePolicy, Displacement, InteractionRecord, InteractionType, Profile, Release, SwipeDeck,
};

use crate::client::ApiClient;
use crate::error::{ApiError, Result};

/// What happened to a released gesture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwipeOutcome {
    /// Below the threshold; the card went back to the origin.
    Reset,
    /// An interaction was submitted and the deck settled.
    Submitted {
        record: InteractionRecord,
        acknowledged: bool,
        cursor: usize,
    },
    /// A previous gesture is still being resolved.
    Busy,
    /// No profiles left; a refresh is needed.
    Exhausted,
    /// The session was cancelled. The deck is frozen from here on: a
    /// gesture resolved before the cancel stays pending and is never
    /// settled, and every later call reports `Cancelled`.
    Cancelled,
}

/// Swipe discovery over the backend: fetches the profile deck and submits
/// one interaction per resolved gesture.
///
/// Submission failures are logged and swallowed. Whether the cursor still
/// advances is decided by the session's [`AdvancePolicy`].
pub struct SwipeSession {
    client: ApiClient,
    deck: SwipeDeck,
    policy: AdvancePolicy,
    cancel: CancellationToken,
}

impl SwipeSession {
    pub fn new(client: ApiClient, policy: AdvancePolicy) -> Self {
        Self {
            client,
            deck: SwipeDeck::default(),
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Tie the session to an externally owned token, e.g. one cancelled
    /// when the screen that owns the session goes away.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn deck(&self) -> &SwipeDeck {
        &self.deck
    }

    pub fn policy(&self) -> AdvancePolicy {
        self.policy
    }

    pub fn current(&self) -> Option<&Profile> {
        self.deck.current()
    }

    pub fn is_exhausted(&self) -> bool {
        self.deck.is_exhausted()
    }

    /// Re-fetch the full profile sequence and rewind the cursor.
    /// On failure the current deck is kept.
    pub async fn refresh(&mut self) -> Result<usize> {
        let profiles = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ApiError::Cancelled),
            fetched = self.client.fetch_profiles() => fetched?,
        };

        self.deck.replace(profiles);
        tracing::info!("loaded {} profiles", self.deck.len());
        Ok(self.deck.len())
    }

    pub fn drag(&mut self, d: Displacement) {
        self.deck.drag(d);
    }

    pub async fn release(&mut self, d: Displacement) -> SwipeOutcome {
        if self.cancel.is_cancelled() {
            return SwipeOutcome::Cancelled;
        }

        let record = match self.deck.release(d) {
            Release::Resolved(record) => record,
            Release::Reset => return SwipeOutcome::Reset,
            Release::Pending => return SwipeOutcome::Busy,
            Release::Exhausted => return SwipeOutcome::Exhausted,
        };

        let acknowledged = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return SwipeOutcome::Cancelled,
            sent = self.client.send_interaction(&record) => match sent {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(
                        "interaction {} for {} not acknowledged: {e}",
                        record.kind,
                        record.target_user_id
                    );
                    false
                }
            },
        };

        self.deck.settle(acknowledged, self.policy);
        SwipeOutcome::Submitted {
            record,
            acknowledged,
            cursor: self.deck.cursor(),
        }
    }

    /// Button press: a fling in the matching direction.
    pub async fn press(&mut self, kind: InteractionType) -> SwipeOutcome {
        self.release(Displacement::for_button(kind)).await
    }
}
