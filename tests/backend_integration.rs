//! Drives the HTTP backend and the stream consumer against a local server
//! that behaves like the remote chat endpoint.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::{Value, json};

use tutor_chat::backend::{ChatBackend, ChatRequest, HttpChatBackend};
use tutor_chat::chat::{ChatView, DEFAULT_ERROR_MESSAGE, DEFAULT_GREETING, Message, ViewOptions};
use tutor_chat::consumer::CycleOutcome;
use tutor_chat::error::StreamError;

#[derive(Clone)]
struct MockBackend {
    requests: Arc<Mutex<Vec<Value>>>,
    chunks: Arc<Vec<Vec<u8>>>,
    session_id: Option<&'static str>,
}

impl MockBackend {
    fn new(session_id: Option<&'static str>, chunks: &[&[u8]]) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            chunks: Arc::new(chunks.iter().map(|c| c.to_vec()).collect()),
            session_id,
        }
    }

    fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

async fn chat_handler(State(mock): State<MockBackend>, Json(body): Json<Value>) -> Response {
    mock.requests.lock().unwrap().push(body);

    let chunks: Vec<Vec<u8>> = mock.chunks.as_ref().clone();
    let body = futures::stream::iter(chunks).then(|chunk| async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok::<_, Infallible>(Bytes::from(chunk))
    });

    let mut builder = Response::builder().header("content-type", "text/plain; charset=utf-8");
    if let Some(id) = mock.session_id {
        builder = builder.header("X-Session-Id", id);
    }
    builder.body(Body::from_stream(body)).unwrap()
}

async fn failing_handler() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/chat")
}

async fn spawn_mock(mock: MockBackend) -> String {
    serve(
        Router::new()
            .route("/api/chat", post(chat_handler))
            .with_state(mock),
    )
    .await
}

fn view_for(endpoint: &str) -> ChatView {
    let backend = HttpChatBackend::new(endpoint).unwrap();
    ChatView::new("it-view", Arc::new(backend), &ViewOptions::default())
}

#[tokio::test]
async fn test_list_comprehension_conversation() {
    let mock = MockBackend::new(Some("sess-42"), &[b"A list comp", b"rehension is..."]);
    let endpoint = spawn_mock(mock.clone()).await;
    let view = view_for(&endpoint);

    let outcome = view
        .send("What is a list comprehension?".to_string())
        .await
        .unwrap();

    assert_eq!(outcome, CycleOutcome::Completed);
    assert_eq!(
        view.snapshot().to_vec(),
        vec![
            Message::bot(DEFAULT_GREETING),
            Message::user("What is a list comprehension?"),
            Message::bot("A list comprehension is..."),
        ]
    );
    assert_eq!(
        mock.requests(),
        vec![json!({ "query": "What is a list comprehension?", "session_id": null })]
    );
}

#[tokio::test]
async fn test_session_id_is_sent_on_follow_up() {
    let mock = MockBackend::new(Some("sess-42"), &[b"ok"]);
    let endpoint = spawn_mock(mock.clone()).await;
    let view = view_for(&endpoint);

    view.send("first".to_string()).await.unwrap();
    view.send("second".to_string()).await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests[0]["session_id"], Value::Null);
    assert_eq!(requests[1]["session_id"], json!("sess-42"));
    assert_eq!(view.session_id().as_deref(), Some("sess-42"));
    assert_eq!(view.snapshot().len(), 5);
}

#[tokio::test]
async fn test_multibyte_text_split_over_the_wire() {
    // "café ☕" with both multi-byte characters split between chunks.
    let bytes = "café ☕".as_bytes();
    let mock = MockBackend::new(None, &[&bytes[..4], &bytes[4..7], &bytes[7..]]);
    let endpoint = spawn_mock(mock).await;
    let view = view_for(&endpoint);

    view.send("coffee?".to_string()).await.unwrap();

    assert_eq!(view.snapshot().last(), Some(&Message::bot("café ☕")));
    assert!(view.session_id().is_none());
}

#[tokio::test]
async fn test_server_error_status() {
    let endpoint = serve(Router::new().route("/api/chat", post(failing_handler))).await;

    let backend = HttpChatBackend::new(&endpoint).unwrap();
    let err = backend
        .open(&ChatRequest {
            query: "hi".to_string(),
            session_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::Status { status: 500 }));

    let view = view_for(&endpoint);
    assert_eq!(view.send("hi".to_string()).await.unwrap(), CycleOutcome::Failed);
    assert_eq!(
        view.snapshot().to_vec(),
        vec![
            Message::bot(DEFAULT_GREETING),
            Message::user("hi"),
            Message::bot(DEFAULT_ERROR_MESSAGE),
        ]
    );
}

#[tokio::test]
async fn test_unreachable_backend() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let view = view_for(&format!("http://{addr}/api/chat"));
    assert_eq!(view.send("hi".to_string()).await.unwrap(), CycleOutcome::Failed);

    let messages = view.snapshot().to_vec();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2], Message::bot(DEFAULT_ERROR_MESSAGE));
}

#[tokio::test]
async fn test_custom_session_header() {
    async fn handler() -> Response {
        Response::builder()
            .header("X-Conversation", "conv-7")
            .header("X-Session-Id", "ignored")
            .body(Body::from("hello"))
            .unwrap()
    }

    let endpoint = serve(Router::new().route("/api/chat", post(handler))).await;
    let backend = HttpChatBackend::new(&endpoint)
        .unwrap()
        .session_header("X-Conversation");
    let view = ChatView::new("it-view", Arc::new(backend), &ViewOptions::default());

    view.send("hi".to_string()).await.unwrap();
    assert_eq!(view.session_id().as_deref(), Some("conv-7"));
    assert_eq!(view.snapshot().last(), Some(&Message::bot("hello")));
}
