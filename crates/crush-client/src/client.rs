use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crush_core::{
    AuthResponse, Credentials, HistoryEntry, InteractionRecord, Match, MatchMessage, Profile,
    ProfileUpdate, Registration, User,
};
use crush_store::SessionStore;

use crate::error::{ApiError, Result};

/// Backend base URL, fixed at build time via `CRUSH_API_URL`.
pub const DEFAULT_API_URL: &str = match option_env!("CRUSH_API_URL") {
    Some(url) => url,
    None => "https://api.crushcloud.com",
};

const PHOTO_FIELD: &str = "photo";
const PHOTO_FILE_NAME: &str = "profile-photo.jpg";
const PHOTO_MIME: &str = "image/jpeg";

#[derive(Serialize)]
struct ChatbotRequest<'a> {
    message: &'a str,
    history: &'a [HistoryEntry],
}

#[derive(Deserialize)]
struct ChatbotResponse {
    reply: String,
}

#[derive(Serialize)]
struct OutgoingMessage<'a> {
    content: &'a str,
}

/// REST client for the CrushCloud backend.
///
/// Every request carries `Authorization: Bearer <token>` when the session
/// store holds a token and goes out unauthenticated otherwise. Requests are
/// single-shot: no retry, no timeout override, no idempotency key.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(base_url: &str, session: SessionStore) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let http = Client::builder()
            .user_agent(concat!("crushcloud/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Base URL joined with percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments);
        tracing::debug!("{method} {url}");
        let builder = self.http.request(method, url);
        // Single-row SQLite lookup, read inline on the calling task.
        Ok(match self.session.token()? {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status { status, body });
        }

        // Empty bodies decode as `null`: fine for acks, an error for typed payloads.
        let body = if body.trim().is_empty() { "null" } else { &body };
        Ok(serde_json::from_str(body)?)
    }

    // --- Auth ---

    /// Log in and persist the returned token.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth: AuthResponse = self
            .execute(
                self.request(Method::POST, &["auth", "login"])?
                    .json(&credentials),
            )
            .await
            .inspect_err(|e| tracing::error!("login failed: {e}"))?;

        self.session.set_token(&auth.token)?;
        tracing::info!("logged in as {}", auth.user.id);
        Ok(auth.user)
    }

    /// Create an account and persist the returned token.
    pub async fn register(&self, registration: &Registration) -> Result<User> {
        let auth: AuthResponse = self
            .execute(
                self.request(Method::POST, &["auth", "register"])?
                    .json(registration),
            )
            .await
            .inspect_err(|e| tracing::error!("registration failed: {e}"))?;

        self.session.set_token(&auth.token)?;
        tracing::info!("registered {}", auth.user.id);
        Ok(auth.user)
    }

    /// Forget the local token. The backend is not contacted.
    pub fn logout(&self) -> Result<()> {
        self.session
            .clear_token()
            .inspect_err(|e| tracing::error!("logout failed: {e}"))?;
        Ok(())
    }

    // --- Profile ---

    pub async fn get_profile(&self, user_id: &str) -> Result<Profile> {
        self.execute(self.request(Method::GET, &["users", user_id])?)
            .await
            .inspect_err(|e| tracing::error!("fetching profile {user_id} failed: {e}"))
    }

    pub async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<Profile> {
        self.execute(self.request(Method::PUT, &["users", user_id])?.json(update))
            .await
            .inspect_err(|e| tracing::error!("updating profile {user_id} failed: {e}"))
    }

    /// Upload a JPEG as a multipart `photo` part. Returns the backend's photo reference.
    pub async fn upload_photo(&self, user_id: &str, photo: &Path) -> Result<Value> {
        let bytes = tokio::fs::read(photo)
            .await
            .inspect_err(|e| tracing::error!("reading {} failed: {e}", photo.display()))?;
        let part = Part::bytes(bytes)
            .file_name(PHOTO_FILE_NAME)
            .mime_str(PHOTO_MIME)?;
        let form = Form::new().part(PHOTO_FIELD, part);

        self.execute(
            self.request(Method::POST, &["users", user_id, "photos"])?
                .multipart(form),
        )
        .await
        .inspect_err(|e| tracing::error!("uploading photo for {user_id} failed: {e}"))
    }

    // --- Discovery ---

    pub async fn fetch_profiles(&self) -> Result<Vec<Profile>> {
        self.execute(self.request(Method::GET, &["profiles"])?)
            .await
            .inspect_err(|e| tracing::error!("fetching profiles failed: {e}"))
    }

    pub async fn send_interaction(&self, record: &InteractionRecord) -> Result<Value> {
        self.execute(self.request(Method::POST, &["interactions"])?.json(record))
            .await
            .inspect_err(|e| {
                tracing::error!(
                    "sending {} for {} failed: {e}",
                    record.kind,
                    record.target_user_id
                );
            })
    }

    // --- Matches & messages ---

    pub async fn get_matches(&self) -> Result<Vec<Match>> {
        self.execute(self.request(Method::GET, &["matches"])?)
            .await
            .inspect_err(|e| tracing::error!("fetching matches failed: {e}"))
    }

    pub async fn get_messages(&self, match_id: &str) -> Result<Vec<MatchMessage>> {
        self.execute(self.request(Method::GET, &["matches", match_id, "messages"])?)
            .await
            .inspect_err(|e| tracing::error!("fetching messages for {match_id} failed: {e}"))
    }

    pub async fn send_message(&self, match_id: &str, content: &str) -> Result<Value> {
        self.execute(
            self.request(Method::POST, &["matches", match_id, "messages"])?
                .json(&OutgoingMessage { content }),
        )
        .await
        .inspect_err(|e| tracing::error!("sending message to {match_id} failed: {e}"))
    }

    // --- Settings ---

    pub async fn update_preferences(&self, preferences: &Value) -> Result<Value> {
        self.execute(
            self.request(Method::PUT, &["users", "preferences"])?
                .json(preferences),
        )
        .await
        .inspect_err(|e| tracing::error!("updating preferences failed: {e}"))
    }

    // --- Assistant ---

    /// One assistant round trip. `history` is sent as given; callers trim it.
    pub async fn chatbot(&self, message: &str, history: &[HistoryEntry]) -> Result<String> {
        let response: ChatbotResponse = self
            .execute(
                self.request(Method::POST, &["chatbot"])?
                    .json(&ChatbotRequest { message, history }),
            )
            .await
            .inspect_err(|e| tracing::error!("chatbot request failed: {e}"))?;
        Ok(response.reply)
    }
}
