//! CrushCloud client core.
//!
//! Swipe classification, the profile deck with its forward-only cursor,
//! chat transcript and history windowing, and the backend wire types.
//!
//! Zero I/O: no opinions about transport or persistence.

pub mod chat;
pub mod constants;
pub mod deck;
pub mod gesture;
pub mod model;

pub use chat::{
    ChatMessage, HistoryEntry, Role, SUGGESTED_TOPICS, Sender, SuggestedTopic, Transcript,
    context_window, truncate_history,
};
pub use constants::{
    CONTEXT_WINDOW, DEFAULT_TRANSCRIPT_CAPACITY, FALLBACK_REPLY, FLING_DISTANCE, GREETING,
    HISTORY_CAP, SWIPE_THRESHOLD,
};
pub use deck::{AdvancePolicy, Release, SwipeDeck};
pub use gesture::{Displacement, InteractionType, classify};
pub use model::{
    AuthResponse, Credentials, InteractionRecord, Match, MatchMessage, MatrimonyDetails,
    MatrimonyUpdate, Profile, ProfileUpdate, Registration, User,
};
