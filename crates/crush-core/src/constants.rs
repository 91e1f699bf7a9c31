/// Drag distance (points) a card must exceed before a release counts as a swipe.
pub const SWIPE_THRESHOLD: f64 = 120.0;

/// Canonical displacement used for button presses; well past the threshold.
pub const FLING_DISTANCE: f64 = 500.0;

/// Most recent durable history entries forwarded to the assistant as context.
pub const CONTEXT_WINDOW: usize = 10;

/// Durable chat history cap. Older entries are dropped on every append.
pub const HISTORY_CAP: usize = 50;

/// Default in-memory transcript size before the oldest messages are dropped.
pub const DEFAULT_TRANSCRIPT_CAPACITY: usize = 200;

/// First bot message of every transcript.
pub const GREETING: &str = "Hi! I'm your CrushCloud assistant. I can help with profile tips, \
conversation starters, or dating advice. What can I help with today?";

/// Bot message substituted when the assistant call fails.
pub const FALLBACK_REPLY: &str =
    "Sorry, I'm having trouble responding right now. Please try again later.";
