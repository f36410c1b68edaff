//! Forwarder against a real HTTP listener standing in for the companion app.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use connector_core::config::PORT_KEY;
use connector_core::{
    ConfigCache, Endpoint, Forwarder, HttpTransport, MemoryStore, Namespace, Notification,
    NotificationResult, Notifier, SendOutcome,
};

type Received = Arc<Mutex<Vec<(&'static str, Value)>>>;

#[derive(Default)]
struct CountingNotifier {
    shown: Mutex<Vec<Notification>>,
}

impl Notifier for CountingNotifier {
    fn notify(&self, notification: &Notification) -> NotificationResult {
        self.shown.lock().push(notification.clone());
        NotificationResult::Sent
    }
}

async fn single(State(received): State<Received>, Json(body): Json<Value>) -> StatusCode {
    received.lock().push(("single", body));
    StatusCode::OK
}

async fn batch(State(received): State<Received>, Json(body): Json<Value>) -> StatusCode {
    received.lock().push(("batch", body));
    StatusCode::ACCEPTED
}

/// Starts a fake companion app and returns its port.
async fn spawn_companion(received: Received) -> u16 {
    let app = Router::new()
        .route("/single", post(single))
        .route("/batch", post(batch))
        .with_state(received);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    port
}

fn forwarder(port: u16, notifier: Arc<CountingNotifier>) -> Forwarder {
    let store = MemoryStore::with_entry(Namespace::Sync, PORT_KEY, json!(port));
    let config = ConfigCache::new(Arc::new(store));
    Forwarder::new(config, Arc::new(HttpTransport::new().unwrap()), notifier).with_host("127.0.0.1")
}

#[tokio::test]
async fn test_posts_single_and_batch_as_json() {
    let received: Received = Arc::default();
    let port = spawn_companion(received.clone()).await;
    let notifier = Arc::new(CountingNotifier::default());
    let fwd = forwarder(port, notifier.clone());

    let descriptor = json!({
        "url": "https://host/a.zip",
        "filename": "a.zip",
        "fileSize": 10,
        "mimeType": "application/zip",
        "agent": "test"
    });
    let single_outcome = fwd.send(&descriptor, Endpoint::Single).await.unwrap();
    let batch_outcome = fwd
        .send(&json!([{"link": "https://host/b.zip"}]), Endpoint::Batch)
        .await
        .unwrap();

    assert_eq!(single_outcome, SendOutcome::Delivered { status: 200 });
    assert_eq!(batch_outcome, SendOutcome::Delivered { status: 202 });

    let received = received.lock().clone();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0], ("single", descriptor));
    assert_eq!(received[1].0, "batch");
    assert!(notifier.shown.lock().is_empty());
}

#[tokio::test]
async fn test_refused_connection_notifies_once() {
    // Bind then drop to get a port nobody listens on.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let notifier = Arc::new(CountingNotifier::default());
    let fwd = forwarder(port, notifier.clone());

    let outcome = fwd.send(&json!({"url": "https://a"}), Endpoint::Single).await.unwrap();

    assert_eq!(outcome, SendOutcome::Unreachable);
    let shown = notifier.shown.lock();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0], Notification::companion_unreachable());
}

#[tokio::test]
async fn test_request_carries_no_connector_user_agent() {
    let seen: Arc<Mutex<Vec<HeaderMap>>> = Arc::default();
    let app = Router::new()
        .route(
            "/single",
            post(
                |State(seen): State<Arc<Mutex<Vec<HeaderMap>>>>, headers: HeaderMap| async move {
                    seen.lock().push(headers);
                    StatusCode::OK
                },
            ),
        )
        .with_state(seen.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let fwd = forwarder(port, Arc::new(CountingNotifier::default()));
    fwd.send(&json!({"url": "https://a"}), Endpoint::Single).await.unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].get(header::USER_AGENT).is_none());
    assert_eq!(
        seen[0].get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
}
