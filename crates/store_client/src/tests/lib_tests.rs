use super::*;
use std::collections::HashMap;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode as HttpStatus},
    response::{IntoResponse, Response as HttpResponse},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration as TimeDelta, Utc};
use serde_json::json;
use shared::protocol::{ChangeKind, GUESTS_CHANGES_TOPIC, JOIN_EVENT, POSTGRES_CHANGES_EVENT};
use tokio::{net::TcpListener, sync::oneshot};
use uuid::Uuid;

const STUB_ADMIN_PASSWORD: &str = "correct horse battery staple";
const STUB_ACCESS_TOKEN: &str = "stub-access-token";

#[derive(Clone)]
struct StubStoreState {
    guests: Arc<Mutex<Vec<Guest>>>,
    inserted_payload: Arc<Mutex<Option<oneshot::Sender<serde_json::Value>>>>,
    list_queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    delete_bearers: Arc<Mutex<Vec<Option<String>>>>,
    fail_list_with: Arc<Mutex<Option<String>>>,
}

impl StubStoreState {
    fn new() -> Self {
        Self {
            guests: Arc::new(Mutex::new(Vec::new())),
            inserted_payload: Arc::new(Mutex::new(None)),
            list_queries: Arc::new(Mutex::new(Vec::new())),
            delete_bearers: Arc::new(Mutex::new(Vec::new())),
            fail_list_with: Arc::new(Mutex::new(None)),
        }
    }
}

fn guest_row(id: &str, name: &str, guests: i64, minutes_ago: i64) -> Guest {
    let confirmed = Utc::now() - TimeDelta::minutes(minutes_ago);
    Guest {
        id: GuestId(id.to_string()),
        name: name.to_string(),
        email: format!("{id}@example.com"),
        guests,
        confirmation_date: confirmed,
        created_at: confirmed,
    }
}

async fn handle_insert_guest(
    State(state): State<StubStoreState>,
    Json(payload): Json<serde_json::Value>,
) -> HttpStatus {
    let confirmed = Utc::now();
    state.guests.lock().await.insert(
        0,
        Guest {
            id: GuestId(Uuid::new_v4().to_string()),
            name: payload["name"].as_str().unwrap_or_default().to_string(),
            email: payload["email"].as_str().unwrap_or_default().to_string(),
            guests: payload["guests"].as_i64().unwrap_or_default(),
            confirmation_date: confirmed,
            created_at: confirmed,
        },
    );
    if let Some(tx) = state.inserted_payload.lock().await.take() {
        let _ = tx.send(payload);
    }
    HttpStatus::CREATED
}

async fn handle_list_guests(
    State(state): State<StubStoreState>,
    Query(query): Query<HashMap<String, String>>,
) -> HttpResponse {
    state.list_queries.lock().await.push(query);
    if let Some(message) = state.fail_list_with.lock().await.clone() {
        return (
            HttpStatus::INTERNAL_SERVER_ERROR,
            Json(shared::error::StoreErrorBody::new(message)),
        )
            .into_response();
    }
    Json(state.guests.lock().await.clone()).into_response()
}

async fn handle_delete_guest(
    State(state): State<StubStoreState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> HttpStatus {
    let bearer = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());
    state.delete_bearers.lock().await.push(bearer);

    if let Some(target) = query
        .get("id")
        .and_then(|filter| filter.strip_prefix("eq."))
    {
        state
            .guests
            .lock()
            .await
            .retain(|guest| guest.id.as_str() != target);
    }
    // Success whether or not a row matched, like the real store.
    HttpStatus::NO_CONTENT
}

async fn handle_password_grant(
    Query(query): Query<HashMap<String, String>>,
    Json(request): Json<PasswordGrantRequest>,
) -> HttpResponse {
    assert_eq!(query.get("grant_type").map(String::as_str), Some("password"));
    if request.password == STUB_ADMIN_PASSWORD {
        Json(SessionTokenResponse {
            access_token: STUB_ACCESS_TOKEN.to_string(),
            token_type: "bearer".to_string(),
            expires_in: Some(3600),
        })
        .into_response()
    } else {
        (
            HttpStatus::BAD_REQUEST,
            Json(shared::error::AuthErrorBody::new(
                "invalid_grant",
                "Invalid login credentials",
            )),
        )
            .into_response()
    }
}

async fn handle_realtime_socket(ws: WebSocketUpgrade) -> HttpResponse {
    ws.on_upgrade(drive_realtime_socket)
}

async fn drive_realtime_socket(mut socket: WebSocket) {
    let Some(Ok(WsMessage::Text(text))) = socket.recv().await else {
        return;
    };
    let join: RealtimeFrame = serde_json::from_str(&text).expect("join frame");
    assert_eq!(join.event, JOIN_EVENT);
    assert_eq!(join.topic, GUESTS_CHANGES_TOPIC);

    let reply = RealtimeFrame {
        topic: join.topic.clone(),
        event: REPLY_EVENT.to_string(),
        payload: json!({ "status": "ok" }),
        reference: join.reference.clone(),
    };
    let _ = socket
        .send(WsMessage::Text(serde_json::to_string(&reply).expect("reply")))
        .await;

    let change = RealtimeFrame {
        topic: GUESTS_CHANGES_TOPIC.to_string(),
        event: POSTGRES_CHANGES_EVENT.to_string(),
        payload: json!({ "data": { "type": "INSERT" } }),
        reference: None,
    };
    let _ = socket
        .send(WsMessage::Text(
            serde_json::to_string(&change).expect("change"),
        ))
        .await;

    // Keep the channel open; the client side owns teardown.
    while socket.recv().await.is_some() {}
}

async fn spawn_stub_store(state: StubStoreState) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    let app = Router::new()
        .route(
            "/rest/v1/guests",
            post(handle_insert_guest)
                .get(handle_list_guests)
                .delete(handle_delete_guest),
        )
        .route("/auth/v1/token", post(handle_password_grant))
        .route("/realtime/v1/websocket", get(handle_realtime_socket))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn stub_settings(base_url: &str) -> StoreSettings {
    let mut settings = StoreSettings::default();
    config::apply_base_url(&mut settings, base_url);
    settings.api_key = "stub-api-key".to_string();
    settings
}

#[tokio::test]
async fn submit_rsvp_posts_exactly_the_caller_supplied_fields() {
    let state = StubStoreState::new();
    let (tx, rx) = oneshot::channel();
    *state.inserted_payload.lock().await = Some(tx);
    let base = spawn_stub_store(state).await;
    let store = HostedGuestStore::new(stub_settings(&base));

    store
        .submit_rsvp(&NewRsvp {
            name: "Ana Silva".to_string(),
            email: "ana@example.com".to_string(),
            guests: 2,
        })
        .await
        .expect("submit");

    let payload = rx.await.expect("captured insert");
    assert_eq!(
        payload,
        json!({ "name": "Ana Silva", "email": "ana@example.com", "guests": 2 })
    );
}

#[tokio::test]
async fn submit_rsvp_rejects_out_of_range_party_size_before_any_network_io() {
    // Default settings point at a store that is not running; reaching the
    // network would surface as Transport, not InvalidRsvp.
    let store = HostedGuestStore::new(StoreSettings::default());

    for guests in [0, 5, -1] {
        let err = store
            .submit_rsvp(&NewRsvp {
                name: "Ana Silva".to_string(),
                email: "ana@example.com".to_string(),
                guests,
            })
            .await
            .expect_err("must reject");
        assert!(matches!(err, StoreError::InvalidRsvp(_)), "got {err}");
    }

    let err = store
        .submit_rsvp(&NewRsvp {
            name: String::new(),
            email: "ana@example.com".to_string(),
            guests: 1,
        })
        .await
        .expect_err("empty name must reject");
    assert!(matches!(err, StoreError::InvalidRsvp(_)));
}

#[tokio::test]
async fn list_guests_requests_descending_confirmation_order() {
    let state = StubStoreState::new();
    {
        let mut guests = state.guests.lock().await;
        guests.push(guest_row("g2", "Bruna Costa", 3, 5));
        guests.push(guest_row("g1", "Ana Silva", 2, 60));
    }
    let queries = Arc::clone(&state.list_queries);
    let base = spawn_stub_store(state).await;
    let store = HostedGuestStore::new(stub_settings(&base));

    let listed = store.list_guests().await.expect("list");

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id.as_str(), "g2");
    assert_eq!(listed[1].id.as_str(), "g1");

    let recorded = queries.lock().await;
    assert_eq!(
        recorded[0].get("order").map(String::as_str),
        Some("confirmation_date.desc")
    );
}

#[tokio::test]
async fn delete_guest_removes_matching_row_and_ignores_unknown_ids() {
    let state = StubStoreState::new();
    {
        let mut guests = state.guests.lock().await;
        guests.push(guest_row("g1", "Ana Silva", 2, 10));
        guests.push(guest_row("g2", "Bruna Costa", 3, 5));
    }
    let base = spawn_stub_store(state).await;
    let store = HostedGuestStore::new(stub_settings(&base));

    store
        .delete_guest(&GuestId("missing".to_string()))
        .await
        .expect("unknown id is a no-op");

    store
        .delete_guest(&GuestId("g1".to_string()))
        .await
        .expect("delete g1");

    let listed = store.list_guests().await.expect("list");
    assert_eq!(listed.len(), 1);
    assert!(listed.iter().all(|guest| guest.id.as_str() != "g1"));
}

#[tokio::test]
async fn list_guests_surfaces_the_store_rejection_body() {
    let state = StubStoreState::new();
    *state.fail_list_with.lock().await = Some("backend exploded".to_string());
    let base = spawn_stub_store(state).await;
    let store = HostedGuestStore::new(stub_settings(&base));

    let err = store.list_guests().await.expect_err("must fail");
    match err {
        StoreError::Rejected { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "backend exploded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn admin_auth_rejects_a_wrong_password() {
    let base = spawn_stub_store(StubStoreState::new()).await;
    let store = HostedGuestStore::new(stub_settings(&base));

    let err = store
        .authenticate_admin("not the password")
        .await
        .expect_err("must reject");
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn admin_auth_attaches_the_session_bearer_to_later_requests() {
    let state = StubStoreState::new();
    let bearers = Arc::clone(&state.delete_bearers);
    let base = spawn_stub_store(state).await;
    let store = HostedGuestStore::new(stub_settings(&base));

    let session = store
        .authenticate_admin(STUB_ADMIN_PASSWORD)
        .await
        .expect("authenticate");
    assert_eq!(session.access_token, STUB_ACCESS_TOKEN);

    store
        .delete_guest(&GuestId("g1".to_string()))
        .await
        .expect("delete");

    let recorded = bearers.lock().await;
    assert_eq!(
        recorded[0].as_deref(),
        Some(format!("Bearer {STUB_ACCESS_TOKEN}").as_str())
    );
}

#[tokio::test]
async fn change_feed_delivers_guest_change_notices() {
    let base = spawn_stub_store(StubStoreState::new()).await;
    let store = HostedGuestStore::new(stub_settings(&base));
    let mut changes = store.subscribe_changes();

    let feed = store.start_change_feed().await.expect("start feed");

    let notice = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .expect("notice within deadline")
        .expect("channel open");
    assert_eq!(notice.kind, ChangeKind::Insert);

    // The single-subscription discipline holds while the feed is alive...
    let second = store.start_change_feed().await;
    assert!(matches!(second, Err(StoreError::ChangeFeed(_))));

    // ...and releasing the handle makes room for a fresh feed.
    drop(feed);
    let restarted = store.start_change_feed().await.expect("restart feed");
    drop(restarted);
}
