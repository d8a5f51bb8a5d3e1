use chrono::Duration;
use rand::{distributions::Alphanumeric, Rng};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::events::{InvalidationReason, SessionEvent};
use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::models::login::{LAST_UPDATED_FIELD, LOGIN_TIME_FIELD, SESSION_ID_FIELD};
use crate::models::{LoginResponse, UserRecord};
use crate::store::EncryptedStore;

/// Storage keys. Each entry is encrypted separately.
pub const USER_KEY: &str = "user";
pub const LOGIN_RESPONSE_KEY: &str = "loginResponse";
pub const TIMESTAMP_KEY: &str = "sessionTimestamp";

/// Sessions expire 24 hours after their last persisted write.
pub const SESSION_TIMEOUT_MS: i64 = 24 * 60 * 60 * 1000;

/// Random characters in a generated session id (the rest is the login time).
const SESSION_ID_RANDOM_LEN: usize = 9;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Owns the signed-in identity for one running application.
///
/// All operations are synchronous. Expiry is enforced lazily by
/// [`is_authenticated`](Self::is_authenticated) and [`restore`](Self::restore);
/// nothing runs in the background.
pub struct SessionManager {
    store: EncryptedStore,
    clock: Box<dyn Clock>,
    user: Option<UserRecord>,
    login_response: Option<LoginResponse>,
    timestamp: Option<i64>,
    is_loading: bool,
    events: broadcast::Sender<SessionEvent>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session_id", &self.session_id())
            .field("timestamp", &self.timestamp)
            .field("is_loading", &self.is_loading)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// A manager that has not yet restored from storage (`is_loading()`).
    pub fn new(store: EncryptedStore) -> Self {
        Self::with_clock(store, SystemClock)
    }

    pub fn with_clock(store: EncryptedStore, clock: impl Clock + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            clock: Box::new(clock),
            user: None,
            login_response: None,
            timestamp: None,
            is_loading: true,
            events,
        }
    }

    /// Construct and run the start-up restore pass.
    pub fn open(store: EncryptedStore) -> Self {
        let mut manager = Self::new(store);
        manager.restore();
        manager
    }

    pub fn open_with_clock(store: EncryptedStore, clock: impl Clock + 'static) -> Self {
        let mut manager = Self::with_clock(store, clock);
        manager.restore();
        manager
    }

    /// Load a persisted session, if there is a complete and unexpired one.
    ///
    /// A missing, unreadable or expired entry invalidates the whole session
    /// and all stored entries are removed. Returns whether a session is now
    /// active. Nothing is broadcast: no one can have subscribed yet when this
    /// runs inside `open`, so start-up expiry shows only as an unauthenticated
    /// manager.
    pub fn restore(&mut self) -> bool {
        let restored = match self.load_persisted() {
            Some((user, login_response, timestamp)) => {
                let now = self.clock.now_millis();
                if Self::expired_at(timestamp, now) {
                    info!(age_ms = now - timestamp, "Stored session expired");
                    self.clear();
                    false
                } else {
                    self.user = Some(user);
                    self.login_response = Some(login_response);
                    self.timestamp = Some(now);
                    if let Err(e) = self.store.set(TIMESTAMP_KEY, &now) {
                        warn!(error = %e, "Failed to persist refreshed session timestamp");
                    }
                    debug!(session_id = ?self.session_id(), "Session restored");
                    true
                }
            }
            None => {
                self.clear();
                false
            }
        };

        self.is_loading = false;
        restored
    }

    /// Establish a session from the login endpoint's response.
    ///
    /// Succeeds only for `success == true` with a non-empty `employee_data`
    /// object; anything else leaves the current state untouched.
    pub fn login(&mut self, response: &LoginResponse) -> bool {
        let Some(identity) = response.identity() else {
            warn!(success = ?response.success, "Login response rejected, no session established");
            return false;
        };

        let now = self.clock.now_millis();
        let session_id = generate_session_id(now);

        let mut user = identity.clone();
        user.insert(LOGIN_TIME_FIELD.to_string(), Value::from(now));
        user.insert(SESSION_ID_FIELD.to_string(), Value::from(session_id.clone()));

        self.user = Some(user);
        self.login_response = Some(response.clone());
        self.timestamp = Some(now);
        self.persist();

        info!(session_id = %session_id, "Session established");
        self.broadcast(SessionEvent::Established { session_id });
        true
    }

    /// [`login`](Self::login) for an untyped response body. Bodies that do
    /// not have the login response shape are failed logins.
    pub fn login_value(&mut self, response: &Value) -> bool {
        match serde_json::from_value::<LoginResponse>(response.clone()) {
            Ok(response) => self.login(&response),
            Err(e) => {
                warn!(error = %e, "Login response has unexpected shape");
                false
            }
        }
    }

    /// End the session. Safe without a session; always notifies subscribers.
    pub fn logout(&mut self) {
        let session_id = self.session_id().map(str::to_string);
        self.clear();
        info!(session_id = ?session_id, "Logged out");
        self.broadcast(SessionEvent::invalidated(InvalidationReason::Logout));
    }

    /// Shallow-merge `updates` into the identity and stamp `lastUpdated`.
    ///
    /// Fails without a session or with no/empty updates. An expired session
    /// is cleared rather than revived. Field shapes are not checked; any key
    /// may be overwritten.
    pub fn update_user(&mut self, updates: Option<UserRecord>) -> bool {
        let Some(updates) = updates.filter(|u| !u.is_empty()) else {
            debug!("Ignoring empty user update");
            return false;
        };
        if self.user.is_some() && !self.is_authenticated() {
            warn!("User update on an expired session");
            return false;
        }
        let now = self.clock.now_millis();
        let Some(user) = self.user.as_mut() else {
            warn!("User update without an active session");
            return false;
        };

        user.extend(updates);
        user.insert(LAST_UPDATED_FIELD.to_string(), Value::from(now));
        self.timestamp = Some(now);
        self.persist();

        let session_id = self.session_id().map(str::to_string);
        debug!(session_id = ?session_id, "User updated");
        self.broadcast(SessionEvent::UserUpdated { session_id });
        true
    }

    /// [`update_user`](Self::update_user) for an untyped value; `null` and
    /// non-objects fail.
    pub fn update_user_value(&mut self, updates: &Value) -> bool {
        self.update_user(updates.as_object().cloned())
    }

    /// Whether a session is present and younger than [`SESSION_TIMEOUT_MS`].
    ///
    /// An expired session found here is cleared from memory and storage.
    pub fn is_authenticated(&mut self) -> bool {
        let Some(timestamp) = self.timestamp.filter(|_| self.user.is_some()) else {
            return false;
        };

        let now = self.clock.now_millis();
        if Self::expired_at(timestamp, now) {
            info!(age_ms = now - timestamp, "Session expired");
            self.clear();
            self.broadcast(SessionEvent::invalidated(InvalidationReason::Expired));
            return false;
        }
        true
    }

    /// Expiry check without side effects.
    pub fn is_expired(&self) -> bool {
        match self.timestamp {
            Some(timestamp) => Self::expired_at(timestamp, self.clock.now_millis()),
            None => true,
        }
    }

    /// True only until the first [`restore`](Self::restore) completes.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }

    pub fn login_response(&self) -> Option<&LoginResponse> {
        self.login_response.as_ref()
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn session_id(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|u| u.get(SESSION_ID_FIELD))
            .and_then(Value::as_str)
    }

    /// `employee_data` exactly as the server sent it at login.
    pub fn get_employee_data(&self) -> Option<&Value> {
        self.login_response
            .as_ref()
            .and_then(|r| r.employee_data.as_ref())
    }

    /// The server's login message, or an empty string.
    pub fn get_login_message(&self) -> &str {
        self.login_response
            .as_ref()
            .and_then(|r| r.message.as_deref())
            .unwrap_or("")
    }

    /// Time left before expiry; zero without a session.
    pub fn time_until_expiry(&self) -> Duration {
        match self.timestamp {
            Some(timestamp) => {
                let remaining = timestamp + SESSION_TIMEOUT_MS - self.clock.now_millis();
                Duration::milliseconds(remaining.max(0))
            }
            None => Duration::zero(),
        }
    }

    /// Whole minutes of [`time_until_expiry`](Self::time_until_expiry).
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes()
    }

    /// Receive session lifecycle events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn expired_at(timestamp: i64, now: i64) -> bool {
        now - timestamp > SESSION_TIMEOUT_MS
    }

    fn load_persisted(&self) -> Option<(UserRecord, LoginResponse, i64)> {
        let user = self.store.get::<UserRecord>(USER_KEY)?;
        let login_response = self.store.get::<LoginResponse>(LOGIN_RESPONSE_KEY)?;
        let timestamp = self.store.get::<i64>(TIMESTAMP_KEY)?;
        Some((user, login_response, timestamp))
    }

    /// Write all three entries or none. A partial write would pair this
    /// identity with another session's response or timestamp on reload.
    fn persist(&self) {
        if let Err(e) = self.try_persist() {
            warn!(error = %e, "Failed to persist session, continuing in memory");
            self.remove_persisted();
        }
    }

    fn try_persist(&self) -> Result<(), StoreError> {
        if let (Some(user), Some(login_response), Some(timestamp)) =
            (&self.user, &self.login_response, self.timestamp)
        {
            self.store.set(USER_KEY, user)?;
            self.store.set(LOGIN_RESPONSE_KEY, login_response)?;
            self.store.set(TIMESTAMP_KEY, &timestamp)?;
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.user = None;
        self.login_response = None;
        self.timestamp = None;
        self.remove_persisted();
    }

    fn remove_persisted(&self) {
        self.store.remove(USER_KEY);
        self.store.remove(LOGIN_RESPONSE_KEY);
        self.store.remove(TIMESTAMP_KEY);
    }

    fn broadcast(&self, event: SessionEvent) {
        // Err only means nobody is subscribed
        let _ = self.events.send(event);
    }
}

/// Opaque client-side trace id: random characters followed by the login
/// time in hex. Not a credential.
fn generate_session_id(now_millis: i64) -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{}{:x}", random.to_ascii_lowercase(), now_millis.max(0))
}

// ============================================================================
// Tests
// ============================================================================
