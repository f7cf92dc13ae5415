use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use shared::{
    domain::{is_valid_party_size, AdminSession, Guest, GuestId, NewRsvp},
    error::{AuthErrorBody, StoreErrorBody},
    protocol::{ChangeNotice, PasswordGrantRequest, RealtimeFrame, SessionTokenResponse,
        REPLY_EVENT},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{interval, Duration, MissedTickBehavior},
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};
use url::Url;

pub mod config;
pub mod error;

pub use config::{load_settings, StoreSettings};
pub use error::{AuthError, StoreError};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Contract of the guest repository against the hosted store.
///
/// Persistence, auth, and change notifications all live on the remote side;
/// this trait is the thin typed seam the application drives. Fakes implement
/// it in tests.
#[async_trait]
pub trait GuestStore: Send + Sync {
    /// Insert one guest row; `id` and both timestamps are store-assigned.
    async fn submit_rsvp(&self, rsvp: &NewRsvp) -> Result<(), StoreError>;

    /// All guest rows, most recent confirmation first.
    async fn list_guests(&self) -> Result<Vec<Guest>, StoreError>;

    /// Delete by id. A missing row is a no-op, not an error.
    async fn delete_guest(&self, id: &GuestId) -> Result<(), StoreError>;

    /// Exchange the configured admin identity plus `password` for a session.
    async fn authenticate_admin(&self, password: &str) -> Result<AdminSession, AuthError>;

    /// Channel of guest-table change notifications. Consumers re-fetch the
    /// listing on every notice instead of interpreting payloads.
    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeNotice>;
}

/// Owner handle for the single realtime feed.
///
/// Dropping it aborts the socket reader, so release happens exactly once on
/// every exit path of the consumer.
pub struct ChangeFeedHandle {
    task: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

impl Drop for ChangeFeedHandle {
    fn drop(&mut self) {
        self.task.abort();
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Guest repository client backed by the hosted store's REST + realtime
/// surface.
pub struct HostedGuestStore {
    http: Client,
    settings: StoreSettings,
    session: Mutex<Option<AdminSession>>,
    changes: broadcast::Sender<ChangeNotice>,
    feed_running: Arc<AtomicBool>,
}

impl HostedGuestStore {
    pub fn new(settings: StoreSettings) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            http: Client::new(),
            settings,
            session: Mutex::new(None),
            changes,
            feed_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Connect the realtime websocket, join the guest-table channel, and
    /// forward every change frame onto the broadcast channel until the
    /// returned handle is dropped or the socket closes.
    ///
    /// At most one feed runs at a time; a second call while one is live is
    /// rejected.
    pub async fn start_change_feed(&self) -> Result<ChangeFeedHandle, StoreError> {
        if self.feed_running.swap(true, Ordering::SeqCst) {
            return Err(StoreError::ChangeFeed(
                "a change feed is already running".into(),
            ));
        }

        match self.connect_change_feed().await {
            Ok(handle) => Ok(handle),
            Err(err) => {
                self.feed_running.store(false, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    async fn connect_change_feed(&self) -> Result<ChangeFeedHandle, StoreError> {
        let url = self.realtime_connect_url()?;
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|err| StoreError::ChangeFeed(format!("failed to connect {url}: {err}")))?;
        let (mut write, mut read) = ws_stream.split();

        let join = serde_json::to_string(&RealtimeFrame::join_guest_changes(1))
            .map_err(|err| StoreError::ChangeFeed(format!("failed to encode join frame: {err}")))?;
        write
            .send(Message::Text(join))
            .await
            .map_err(|err| StoreError::ChangeFeed(format!("failed to join channel: {err}")))?;
        info!(topic = shared::protocol::GUESTS_CHANGES_TOPIC, "change feed joined");

        let changes = self.changes.clone();
        let running = Arc::clone(&self.feed_running);
        let task = tokio::spawn(async move {
            let mut heartbeat = interval(HEARTBEAT_INTERVAL);
            heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut reference: u64 = 1;
            loop {
                tokio::select! {
                    _ = heartbeat.tick() => {
                        reference += 1;
                        let Ok(text) = serde_json::to_string(&RealtimeFrame::heartbeat(reference))
                        else {
                            continue;
                        };
                        if let Err(err) = write.send(Message::Text(text)).await {
                            warn!("change feed heartbeat failed: {err}");
                            break;
                        }
                    }
                    frame = read.next() => {
                        match frame {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<RealtimeFrame>(&text) {
                                    Ok(frame) => {
                                        if let Some(notice) = frame.guest_change() {
                                            let _ = changes.send(notice);
                                        } else if frame.event == REPLY_EVENT {
                                            tracing::debug!(
                                                topic = %frame.topic,
                                                "realtime channel reply"
                                            );
                                        }
                                    }
                                    Err(err) => warn!("invalid realtime frame: {err}"),
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(err)) => {
                                warn!("change feed receive failed: {err}");
                                break;
                            }
                        }
                    }
                }
            }
            info!("change feed terminated");
            running.store(false, Ordering::SeqCst);
        });

        Ok(ChangeFeedHandle {
            task,
            running: Arc::clone(&self.feed_running),
        })
    }

    fn realtime_connect_url(&self) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.settings.realtime_url)
            .map_err(|err| StoreError::ChangeFeed(format!("invalid realtime url: {err}")))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.settings.api_key)
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }

    fn guests_endpoint(&self) -> String {
        format!("{}/guests", self.settings.rest_url)
    }

    /// Project api key on every request, plus the admin bearer once a
    /// session exists.
    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("apikey", &self.settings.api_key);
        match self.session.lock().await.as_ref() {
            Some(session) => request.bearer_auth(&session.access_token),
            None => request,
        }
    }

    async fn rejection(response: Response) -> StoreError {
        let status = response.status().as_u16();
        let message = match response.json::<StoreErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => "unreadable error body".to_string(),
        };
        StoreError::Rejected { status, message }
    }
}

fn validate_rsvp(rsvp: &NewRsvp) -> Result<(), StoreError> {
    if rsvp.name.trim().is_empty() {
        return Err(StoreError::InvalidRsvp("name must not be empty".into()));
    }
    if rsvp.email.trim().is_empty() || !rsvp.email.contains('@') {
        return Err(StoreError::InvalidRsvp(
            "email must look like an address".into(),
        ));
    }
    if !is_valid_party_size(rsvp.guests) {
        return Err(StoreError::InvalidRsvp(format!(
            "party size {} is outside the offered range",
            rsvp.guests
        )));
    }
    Ok(())
}

#[async_trait]
impl GuestStore for HostedGuestStore {
    async fn submit_rsvp(&self, rsvp: &NewRsvp) -> Result<(), StoreError> {
        validate_rsvp(rsvp)?;

        let response = self
            .authorize(self.http.post(self.guests_endpoint()))
            .await
            .header("Prefer", "return=minimal")
            .json(rsvp)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        info!(guests = rsvp.guests, "rsvp stored");
        Ok(())
    }

    async fn list_guests(&self) -> Result<Vec<Guest>, StoreError> {
        let response = self
            .authorize(self.http.get(self.guests_endpoint()))
            .await
            .query(&[("select", "*"), ("order", "confirmation_date.desc")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        let guests: Vec<Guest> = response.json().await?;
        Ok(guests)
    }

    async fn delete_guest(&self, id: &GuestId) -> Result<(), StoreError> {
        let response = self
            .authorize(self.http.delete(self.guests_endpoint()))
            .await
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        // The store answers success whether or not a row matched, which is
        // exactly the contract: deleting an absent id is a no-op.
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        info!(%id, "guest deletion requested");
        Ok(())
    }

    async fn authenticate_admin(&self, password: &str) -> Result<AdminSession, AuthError> {
        let response = self
            .http
            .post(format!("{}/token", self.settings.auth_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.settings.api_key)
            .json(&PasswordGrantRequest {
                email: self.settings.admin_email.clone(),
                password: password.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST
            || status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
        {
            if let Ok(body) = response.json::<AuthErrorBody>().await {
                warn!(reason = body.describe(), "admin sign-in rejected");
            }
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let token: SessionTokenResponse = response.json().await?;
        let session = AdminSession {
            access_token: token.access_token,
            expires_in: token.expires_in,
        };
        *self.session.lock().await = Some(session.clone());
        info!("admin session established");
        Ok(session)
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeNotice> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
