//! Assistant chat session: context window, durable history cap, fallback
//! on failure and reply ordering.

mod common;

use std::sync::Arc;
use std::time::Duration;

use crush_client::ChatSession;
use crush_core::{FALLBACK_REPLY, GREETING, HISTORY_CAP, HistoryEntry, Sender};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use common::{client, session};

/// Echoes the user message back as `re: <message>`.
fn echo(delay: Duration) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync + 'static {
    move |req: &Request| {
        let body: Value = req.body_json().unwrap();
        let message = body["message"].as_str().unwrap_or_default().to_string();
        ResponseTemplate::new(200)
            .set_body_json(json!({"reply": format!("re: {message}")}))
            .set_delay(delay)
    }
}

async fn echo_backend(delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chatbot"))
        .respond_with(echo(delay))
        .mount(&server)
        .await;
    server
}

fn seed(store: &crush_store::SessionStore, turns: usize) {
    for i in 0..turns {
        store
            .append_history(&[
                HistoryEntry::user(format!("q{i}")),
                HistoryEntry::assistant(format!("a{i}")),
            ])
            .unwrap();
    }
}

#[tokio::test]
async fn transcript_opens_with_greeting() {
    let server = echo_backend(Duration::ZERO).await;
    let store = session();
    let chat = ChatSession::new(client(&server, &store), 100);

    let transcript = chat.transcript().await;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].sender, Sender::Bot);
    assert_eq!(transcript[0].text, GREETING);
}

#[tokio::test]
async fn send_forwards_last_ten_and_persists_turn() {
    let server = echo_backend(Duration::ZERO).await;
    let store = session();
    seed(&store, 6); // 12 durable entries
    let chat = ChatSession::new(client(&server, &store), 100);

    let reply = chat.send("what should I wear?").await.unwrap();
    assert_eq!(reply.sender, Sender::Bot);
    assert_eq!(reply.text, "re: what should I wear?");

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 10);
    assert_eq!(history[0], json!({"role": "user", "content": "q1"}));
    assert_eq!(history[9], json!({"role": "assistant", "content": "a5"}));

    let durable = store.chat_history().unwrap();
    assert_eq!(durable.len(), 14);
    assert_eq!(durable[12], HistoryEntry::user("what should I wear?"));
    assert_eq!(durable[13], HistoryEntry::assistant("re: what should I wear?"));

    let texts: Vec<String> = chat.transcript().await.into_iter().map(|m| m.text).collect();
    assert_eq!(
        texts,
        vec![
            GREETING.to_string(),
            "what should I wear?".to_string(),
            "re: what should I wear?".to_string(),
        ]
    );
}

#[tokio::test]
async fn durable_history_stays_capped() {
    let server = echo_backend(Duration::ZERO).await;
    let store = session();
    seed(&store, 25); // exactly at the cap
    let chat = ChatSession::new(client(&server, &store), 100);

    for i in 0..3 {
        chat.send(&format!("more {i}")).await.unwrap();
        assert!(store.chat_history().unwrap().len() <= HISTORY_CAP);
    }

    let durable = store.chat_history().unwrap();
    assert_eq!(durable.len(), HISTORY_CAP);
    assert_eq!(durable.last().unwrap().content, "re: more 2");
    assert_eq!(durable[0].content, "q3");

    for req in server.received_requests().await.unwrap() {
        let body: Value = req.body_json().unwrap();
        assert!(body["history"].as_array().unwrap().len() <= 10);
    }
}

#[tokio::test]
async fn failure_shows_fallback_and_keeps_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chatbot"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let store = session();
    seed(&store, 2);
    let before = store.chat_history().unwrap();
    let chat = ChatSession::new(client(&server, &store), 100);

    let reply = chat.send("hello?").await.unwrap();
    assert_eq!(reply.sender, Sender::Bot);
    assert_eq!(reply.text, FALLBACK_REPLY);

    assert_eq!(store.chat_history().unwrap(), before);
    let transcript = chat.transcript().await;
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript[1].sender, Sender::User);
    assert_eq!(transcript[1].text, "hello?");
}

#[tokio::test]
async fn blank_input_is_ignored() {
    let server = echo_backend(Duration::ZERO).await;
    let store = session();
    let chat = ChatSession::new(client(&server, &store), 100);

    assert!(chat.send("   ").await.is_none());
    assert_eq!(chat.transcript().await.len(), 1);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn overlapping_sends_keep_replies_in_order() {
    let server = echo_backend(Duration::from_millis(50)).await;
    let store = session();
    let chat = Arc::new(ChatSession::new(client(&server, &store), 100));

    let first = {
        let chat = chat.clone();
        tokio::spawn(async move { chat.send("first").await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = {
        let chat = chat.clone();
        tokio::spawn(async move { chat.send("second").await })
    };
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let texts: Vec<String> = chat.transcript().await.into_iter().map(|m| m.text).collect();
    assert_eq!(
        &texts[1..],
        &["first", "re: first", "second", "re: second"]
    );

    let ids: Vec<u64> = chat.transcript().await.iter().map(|m| m.id).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let durable: Vec<String> = store
        .chat_history()
        .unwrap()
        .into_iter()
        .map(|e| e.content)
        .collect();
    assert_eq!(durable, vec!["first", "re: first", "second", "re: second"]);
}

#[tokio::test]
async fn cancelled_session_appends_nothing() {
    let server = echo_backend(Duration::from_secs(5)).await;
    let store = session();
    let chat = Arc::new(ChatSession::new(client(&server, &store), 100));
    let token = chat.cancellation_token();

    let pending = {
        let chat = chat.clone();
        tokio::spawn(async move { chat.send("are you there?").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    assert!(pending.await.unwrap().is_none());
    let transcript = chat.transcript().await;
    // Greeting plus the user message; no reply was appended
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1].sender, Sender::User);
    assert!(store.chat_history().unwrap().is_empty());
}

#[tokio::test]
async fn clear_history_wipes_durable_entries() {
    let server = echo_backend(Duration::ZERO).await;
    let store = session();
    seed(&store, 3);
    let chat = ChatSession::new(client(&server, &store), 100);

    chat.clear_history().unwrap();
    assert!(store.chat_history().unwrap().is_empty());
    assert_eq!(chat.transcript().await.len(), 1);
}
