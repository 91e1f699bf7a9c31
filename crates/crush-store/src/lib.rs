//! Local persistence for the CrushCloud client: a key/value storage
//! contract with SQLite and in-memory backends, and the session store that
//! keeps the auth token and durable chat history on top of it.

pub mod error;
pub mod paths;
pub mod schema;
pub mod session;
pub mod store;

pub use error::{Result, StoreError};
pub use paths::{DB_FILE_NAME, default_base_dir, open_default};
pub use session::{AUTH_TOKEN_KEY, CHAT_HISTORY_KEY, SessionStore};
pub use store::{LocalStorage, MemoryStorage, SqliteStorage};
