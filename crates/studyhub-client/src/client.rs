//! Authenticated client and renewal coordinator
//!
//! `ApiClient::execute` is the single entry point for every API call in the
//! application. The fast path is one dispatch with no coordination. When a
//! dispatch comes back `AuthExpired`, the renewal state machine takes over:
//!
//! - The `Idle` → `Refreshing` transition happens under a mutex, so exactly
//!   one caller observes it and becomes the driver. The driver issues the
//!   single renewal call.
//! - Every other caller that hits `AuthExpired` while `Refreshing` parks a
//!   `PendingCall` in the queue and suspends on a oneshot channel. No
//!   second renewal call is issued.
//! - The driver resolves the whole queue: on success it persists the new
//!   tokens, returns the slot to `Idle`, and replays every queued request
//!   (each caller gets its own replay result); on failure it fails every
//!   waiter with the same classification it got itself.
//!
//! The slot mutex is `std::sync::Mutex` and is never held across an await;
//! every critical section is a handful of queue operations.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use common::Secret;
use studyhub_auth::{CredentialStore, renew_session};

use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::notify::SessionNotifier;
use crate::outcome::{Error, Outcome, Result};
use crate::request::ApiRequest;

/// Renewal calls that outlive this are treated as transport failures so
/// queued callers are never left hanging.
const DEFAULT_RENEW_TIMEOUT: Duration = Duration::from_secs(30);

/// One queued unit of work, created when a request hits `AuthExpired`
/// while a renewal is already in flight. Resolved exactly once.
struct PendingCall {
    request: ApiRequest,
    reply: oneshot::Sender<Result<serde_json::Value>>,
}

/// Renewal state: a single slot per client, never a global.
enum RefreshSlot {
    Idle,
    Refreshing { queue: Vec<PendingCall> },
}

/// What the single-flight gate decided for one `AuthExpired` caller.
enum Role {
    Driver(ApiRequest),
    Waiter(oneshot::Receiver<Result<serde_json::Value>>),
}

/// Authenticated API client with transparent session renewal.
pub struct ApiClient {
    dispatcher: Dispatcher,
    http: reqwest::Client,
    base_url: Arc<str>,
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn SessionNotifier>,
    slot: Arc<Mutex<RefreshSlot>>,
    renew_timeout: Duration,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        http: reqwest::Client,
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn SessionNotifier>,
    ) -> Self {
        let base_url: Arc<str> = Arc::from(base_url.into());
        Self {
            dispatcher: Dispatcher::new(http.clone(), Arc::clone(&base_url), Arc::clone(&store)),
            http,
            base_url,
            store,
            notifier,
            slot: Arc::new(Mutex::new(RefreshSlot::Idle)),
            renew_timeout: DEFAULT_RENEW_TIMEOUT,
        }
    }

    /// Build a client from a loaded configuration.
    pub fn from_config(
        config: &ClientConfig,
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn SessionNotifier>,
    ) -> common::Result<Self> {
        let http = config.http_client()?;
        Ok(
            Self::new(config.api.base_url.clone(), http, store, notifier)
                .with_renew_timeout(config.renew_timeout()),
        )
    }

    /// Override the bound on the renewal call.
    pub fn with_renew_timeout(mut self, timeout: Duration) -> Self {
        self.renew_timeout = timeout;
        self
    }

    /// Issue an authenticated request, renewing the session if needed.
    ///
    /// The only suspension point beyond ordinary I/O is waiting for an
    /// in-flight renewal. Dropping the returned future while queued removes
    /// only this call; the driver and other waiters are unaffected.
    pub async fn execute(&self, request: ApiRequest) -> Result<serde_json::Value> {
        match self.dispatcher.send(&request).await {
            Outcome::AuthExpired => self.renew_and_replay(request).await,
            outcome => settle(outcome),
        }
    }

    pub async fn get(&self, path: &str) -> Result<serde_json::Value> {
        self.execute(ApiRequest::get(path)).await
    }

    pub async fn post(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        self.execute(ApiRequest::post(path, body)).await
    }

    pub async fn patch(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        self.execute(ApiRequest::patch(path, body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<serde_json::Value> {
        self.execute(ApiRequest::delete(path)).await
    }

    /// Handle an `AuthExpired` dispatch: queue behind an in-flight renewal
    /// or become the driver of a new one.
    async fn renew_and_replay(&self, request: ApiRequest) -> Result<serde_json::Value> {
        let credentials = self.store.get().await;
        let Some(refresh_token) = credentials.refresh_token else {
            info!("access token rejected with no refresh token, session invalid");
            self.notifier.session_invalidated();
            return Err(Error::SessionInvalid);
        };

        let role = {
            let mut slot = lock_slot(&self.slot);
            match &mut *slot {
                RefreshSlot::Refreshing { queue } => {
                    let (reply, receiver) = oneshot::channel();
                    queue.push(PendingCall { request, reply });
                    debug!(queued = queue.len(), "renewal in flight, queueing request");
                    Role::Waiter(receiver)
                }
                RefreshSlot::Idle => {
                    *slot = RefreshSlot::Refreshing { queue: Vec::new() };
                    Role::Driver(request)
                }
            }
        };

        match role {
            Role::Waiter(receiver) => match receiver.await {
                Ok(result) => result,
                // The driver was dropped before resolving us.
                Err(_) => Err(Error::Transport("session renewal aborted".into())),
            },
            Role::Driver(request) => self.drive_renewal(request, refresh_token).await,
        }
    }

    /// Issue the one renewal call and resolve every waiter plus our own
    /// original request.
    async fn drive_renewal(
        &self,
        request: ApiRequest,
        refresh_token: Secret<String>,
    ) -> Result<serde_json::Value> {
        info!("access token rejected, renewing session");
        let guard = DriverGuard::new(Arc::clone(&self.slot));

        let renewed = match tokio::time::timeout(
            self.renew_timeout,
            renew_session(&self.http, &self.base_url, refresh_token.expose()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(studyhub_auth::Error::Http(format!(
                "session renewal timed out after {:?}",
                self.renew_timeout
            ))),
        };

        match renewed {
            Ok(session) => {
                // Persist before releasing the queue so every replay reads
                // the new access token from the store. The refresh token is
                // only replaced when the server rotated it.
                let mut credentials = self.store.get().await;
                credentials.access_token = Some(Secret::new(session.access_token));
                if let Some(rotated) = session.refresh_token {
                    credentials.refresh_token = Some(Secret::new(rotated));
                }
                if let Err(e) = self.store.set(credentials).await {
                    warn!(error = %e, "failed to persist renewed credentials");
                }

                let queue = guard.finish();
                info!(replays = queue.len() + 1, "session renewed, replaying requests");

                let replays = queue.into_iter().map(|call| {
                    let dispatcher = self.dispatcher.clone();
                    async move {
                        let outcome = dispatcher.send(&call.request).await;
                        // A dropped receiver means that caller gave up.
                        let _ = call.reply.send(settle(outcome));
                    }
                });
                join_all(replays).await;

                settle(self.dispatcher.send(&request).await)
            }
            Err(studyhub_auth::Error::InvalidCredentials(reason)) => {
                warn!(%reason, "refresh token rejected, session invalidated");
                if let Err(e) = self.store.clear().await {
                    warn!(error = %e, "failed to clear credentials");
                }
                // One signal per renewal attempt, not one per waiter.
                self.notifier.session_invalidated();

                for call in guard.finish() {
                    let _ = call.reply.send(Err(Error::SessionInvalid));
                }
                Err(Error::SessionInvalid)
            }
            Err(studyhub_auth::Error::Http(reason)) => {
                // Renewal never reached the server: keep the credentials so
                // a later request can retry renewal from scratch.
                warn!(%reason, "session renewal unreachable, keeping credentials");
                for call in guard.finish() {
                    let _ = call.reply.send(Err(Error::Transport(reason.clone())));
                }
                Err(Error::Transport(reason))
            }
            Err(other) => {
                // The renewal endpoint answered with a non-auth failure
                // (e.g. 500). Not an authoritative rejection, so the
                // session survives.
                let reason = other.to_string();
                warn!(%reason, "session renewal failed, keeping credentials");
                for call in guard.finish() {
                    let _ = call.reply.send(Err(Error::Api(reason.clone())));
                }
                Err(Error::Api(reason))
            }
        }
    }
}

/// Map a dispatch outcome to the caller-facing result.
fn settle(outcome: Outcome) -> Result<serde_json::Value> {
    match outcome {
        Outcome::Success(value) => Ok(value),
        Outcome::Transport(reason) => Err(Error::Transport(reason)),
        Outcome::Api(message) => Err(Error::Api(message)),
        // The freshly renewed token was rejected again. Renewing a second
        // time could loop forever, so surface the rejection instead.
        Outcome::AuthExpired => Err(Error::Api("request rejected after session renewal".into())),
    }
}

fn lock_slot(slot: &Mutex<RefreshSlot>) -> MutexGuard<'_, RefreshSlot> {
    // A poisoned slot only means a panic mid-queue-operation; the queue
    // contents are still sound to drain.
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Take the queue and return the slot to `Idle`.
fn drain_to_idle(slot: &Mutex<RefreshSlot>) -> Vec<PendingCall> {
    let mut slot = lock_slot(slot);
    match std::mem::replace(&mut *slot, RefreshSlot::Idle) {
        RefreshSlot::Refreshing { queue } => queue,
        RefreshSlot::Idle => Vec::new(),
    }
}

/// Returns the slot to `Idle` even if the driver future is dropped
/// mid-renewal, failing any queued waiters so nobody hangs forever.
struct DriverGuard {
    slot: Option<Arc<Mutex<RefreshSlot>>>,
}

impl DriverGuard {
    fn new(slot: Arc<Mutex<RefreshSlot>>) -> Self {
        Self { slot: Some(slot) }
    }

    fn finish(mut self) -> Vec<PendingCall> {
        match self.slot.take() {
            Some(slot) => drain_to_idle(&slot),
            None => Vec::new(),
        }
    }
}

impl Drop for DriverGuard {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            let queue = drain_to_idle(&slot);
            if !queue.is_empty() {
                warn!(waiters = queue.len(), "renewal driver dropped, failing queued requests");
            }
            for call in queue {
                let _ = call
                    .reply
                    .send(Err(Error::Transport("session renewal aborted".into())));
            }
        }
    }
}
