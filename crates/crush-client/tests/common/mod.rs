//! Shared fixtures for the client integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use crush_client::ApiClient;
use crush_store::{MemoryStorage, SessionStore};
use serde_json::{Value, json};
use wiremock::MockServer;

pub fn session() -> SessionStore {
    SessionStore::new(Arc::new(MemoryStorage::new()))
}

pub fn client(server: &MockServer, session: &SessionStore) -> ApiClient {
    ApiClient::new(&server.uri(), session.clone()).unwrap()
}

pub fn profile_json(id: &str, name: &str, age: u32) -> Value {
    json!({
        "id": id,
        "name": name,
        "age": age,
        "bio": format!("{name}'s bio"),
        "photos": [format!("https://cdn.example.com/{id}.jpg")]
    })
}

pub fn user_json(id: &str) -> Value {
    json!({"id": id, "email": format!("{id}@example.com"), "name": "Test User"})
}
