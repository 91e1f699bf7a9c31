//! Network side of the CrushCloud client: the REST client with bearer-token
//! injection, the swipe session that submits interactions, and the
//! assistant chat session.

pub mod chat;
pub mod client;
pub mod error;
pub mod swipe;

pub use chat::ChatSession;
pub use client::{ApiClient, DEFAULT_API_URL};
pub use error::{ApiError, Result};
pub use swipe::{SwipeOutcome, SwipeSession};
