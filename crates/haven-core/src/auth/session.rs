//! The session store: single source of truth for the current authentication
//! state.
//!
//! All mutation flows through the four operations (`login`, `signup`,
//! `logout`, `refresh`). Every transition replaces the whole snapshot
//! atomically, persists it, and notifies observers, so a reader never sees a
//! half-updated session. Each mutating attempt is tagged with a generation;
//! `logout` bumps the generation, and completions from an older generation
//! are discarded rather than allowed to overwrite the reset.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::models::{AuthPayload, User};
use crate::storage::Storage;

use super::MockAuthService;

/// Storage key holding the persisted session snapshot
const AUTH_STORAGE_KEY: &str = "auth-storage";

/// Current authentication state.
///
/// `is_loading` and `last_error` are transient UI state and are never
/// persisted; a restored snapshot always starts with them at their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub identity: Option<User>,
    pub access_token: Option<String>,
    /// Epoch milliseconds
    pub access_token_expiry: Option<i64>,
    pub refresh_token: Option<String>,
    /// Epoch milliseconds
    pub refresh_token_expiry: Option<i64>,
    pub is_authenticated: bool,
    #[serde(skip)]
    pub is_loading: bool,
    #[serde(skip)]
    pub last_error: Option<String>,
}

impl SessionState {
    /// True when the access token is absent or its expiry has passed.
    pub fn access_token_expired(&self) -> bool {
        match self.access_token_expiry {
            Some(expiry) => expiry <= Utc::now().timestamp_millis(),
            None => true,
        }
    }

    /// True when a refresh token exists but its expiry has passed.
    pub fn refresh_token_expired(&self) -> bool {
        self.refresh_token_expiry
            .is_some_and(|expiry| expiry <= Utc::now().timestamp_millis())
    }

    /// Structural invariant: authenticated iff identity and access token are
    /// both present, and refresh token/expiry are set together.
    fn is_consistent(&self) -> bool {
        let authenticated = self.identity.is_some() && self.access_token.is_some();
        self.is_authenticated == authenticated
            && self.refresh_token.is_some() == self.refresh_token_expiry.is_some()
    }
}

/// Session state plus the generation counter guarding in-flight completions.
struct Guarded {
    state: SessionState,
    generation: u64,
}

struct SessionInner {
    service: MockAuthService,
    storage: Arc<dyn Storage>,
    guarded: Mutex<Guarded>,
    watch_tx: watch::Sender<SessionState>,
    /// Serializes refresh attempts so concurrent callers coalesce into one
    /// service call
    refresh_gate: tokio::sync::Mutex<()>,
}

/// Clone is cheap - all state is behind an `Arc`.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl SessionStore {
    /// Build a store, restoring the last persisted snapshot if one exists.
    ///
    /// A missing, malformed, or inconsistent snapshot falls back to the
    /// initial logged-out state.
    pub fn new(service: MockAuthService, storage: Arc<dyn Storage>) -> Self {
        let state = restore(storage.as_ref());
        let (watch_tx, _) = watch::channel(state.clone());
        Self {
            inner: Arc::new(SessionInner {
                service,
                storage,
                guarded: Mutex::new(Guarded { state, generation: 0 }),
                watch_tx,
                refresh_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> SessionState {
        self.inner.guarded.lock().unwrap().state.clone()
    }

    /// Observe every state transition. The receiver always holds the latest
    /// snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.watch_tx.subscribe()
    }

    /// Authenticate with email and password.
    ///
    /// On success the whole session is replaced with the new identity and
    /// token pair. On failure only `last_error` changes; an already
    /// authenticated session keeps its tokens.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let generation = self.generation();
        self.apply_if_current(generation, |s| {
            s.is_loading = true;
            s.last_error = None;
        });

        match self.inner.service.login(email, password).await {
            Ok(payload) => {
                let user = payload.user.clone();
                if self.apply_if_current(generation, |s| commit_payload(s, payload)) {
                    info!(email = email, "Login committed");
                } else {
                    debug!("Discarding login result from a superseded attempt");
                }
                Ok(user)
            }
            Err(err) => {
                self.apply_if_current(generation, |s| {
                    s.is_loading = false;
                    s.last_error = Some(err.to_string());
                });
                Err(err)
            }
        }
    }

    /// Register a new account and authenticate as it. Same commit and
    /// failure shape as `login`.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let generation = self.generation();
        self.apply_if_current(generation, |s| {
            s.is_loading = true;
            s.last_error = None;
        });

        match self.inner.service.signup(name, email, password).await {
            Ok(payload) => {
                let user = payload.user.clone();
                if self.apply_if_current(generation, |s| commit_payload(s, payload)) {
                    info!(email = email, "Signup committed");
                } else {
                    debug!("Discarding signup result from a superseded attempt");
                }
                Ok(user)
            }
            Err(err) => {
                self.apply_if_current(generation, |s| {
                    s.is_loading = false;
                    s.last_error = Some(err.to_string());
                });
                Err(err)
            }
        }
    }

    /// Reset the session to the initial logged-out state.
    ///
    /// Synchronous and unconditional; tokens are not revoked remotely. Any
    /// login/signup/refresh still in flight is superseded and its eventual
    /// completion discarded.
    pub fn logout(&self) {
        let state = {
            let mut guarded = self.inner.guarded.lock().unwrap();
            guarded.generation += 1;
            guarded.state = SessionState::default();
            guarded.state.clone()
        };
        self.persist_and_notify(&state);
        info!("Logged out");
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Fails with `NoRefreshToken` (no state change) when no refresh token
    /// is held, and with `RefreshTokenExpired` (full reset) when its expiry
    /// has passed. A service-level failure also resets the session and
    /// records "Session expired" before re-signalling the error.
    ///
    /// Concurrent calls coalesce: they queue on an internal gate, and a
    /// caller that finds the access token already replaced returns without
    /// a redundant service call.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let (refresh_token, token_before, generation) = {
            let guarded = self.inner.guarded.lock().unwrap();
            (
                guarded.state.refresh_token.clone(),
                guarded.state.access_token.clone(),
                guarded.generation,
            )
        };

        let Some(refresh_token) = refresh_token else {
            return Err(AuthError::NoRefreshToken);
        };

        if self.snapshot().refresh_token_expired() {
            warn!("Refresh token expired, resetting session");
            self.reset_if_current(generation, None);
            return Err(AuthError::RefreshTokenExpired);
        }

        let _gate = self.inner.refresh_gate.lock().await;
        {
            let guarded = self.inner.guarded.lock().unwrap();
            if guarded.generation != generation {
                // Logged out while waiting for the gate
                return Err(AuthError::SessionExpired);
            }
            if guarded.state.access_token != token_before {
                debug!("Coalesced with an already-completed refresh");
                return Ok(());
            }
        }

        self.apply_if_current(generation, |s| s.is_loading = true);

        match self.inner.service.refresh_token(&refresh_token).await {
            Ok(payload) => {
                if self.apply_if_current(generation, |s| {
                    s.access_token = Some(payload.access_token);
                    s.access_token_expiry = Some(payload.access_token_expiry);
                    s.is_loading = false;
                }) {
                    debug!("Access token refreshed");
                } else {
                    debug!("Discarding refresh result from a superseded attempt");
                }
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Token refresh failed, resetting session");
                self.reset_if_current(generation, Some(AuthError::SessionExpired.to_string()));
                Err(err)
            }
        }
    }

    fn generation(&self) -> u64 {
        self.inner.guarded.lock().unwrap().generation
    }

    /// Apply a mutation and commit it, unless the attempt that produced it
    /// has been superseded by a logout or reset. Returns whether it applied.
    fn apply_if_current(&self, generation: u64, mutate: impl FnOnce(&mut SessionState)) -> bool {
        let state = {
            let mut guarded = self.inner.guarded.lock().unwrap();
            if guarded.generation != generation {
                return false;
            }
            mutate(&mut guarded.state);
            guarded.state.clone()
        };
        self.persist_and_notify(&state);
        true
    }

    /// Reset to the initial state (bumping the generation), keeping an
    /// optional error message for the UI to surface.
    fn reset_if_current(&self, generation: u64, last_error: Option<String>) -> bool {
        let state = {
            let mut guarded = self.inner.guarded.lock().unwrap();
            if guarded.generation != generation {
                return false;
            }
            guarded.generation += 1;
            guarded.state = SessionState {
                last_error,
                ..SessionState::default()
            };
            guarded.state.clone()
        };
        self.persist_and_notify(&state);
        true
    }

    /// Persistence happens after the in-memory commit; a write failure loses
    /// at most the latest transition, never produces an inconsistent one.
    fn persist_and_notify(&self, state: &SessionState) {
        match serde_json::to_string(state) {
            Ok(contents) => {
                if let Err(e) = self.inner.storage.set(AUTH_STORAGE_KEY, &contents) {
                    warn!(error = %e, "Failed to persist session snapshot");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize session snapshot"),
        }
        self.inner.watch_tx.send_replace(state.clone());
    }
}

fn commit_payload(state: &mut SessionState, payload: AuthPayload) {
    state.identity = Some(payload.user);
    state.access_token = Some(payload.access_token);
    state.access_token_expiry = Some(payload.access_token_expiry);
    state.refresh_token = Some(payload.refresh_token);
    state.refresh_token_expiry = Some(payload.refresh_token_expiry);
    state.is_authenticated = true;
    state.is_loading = false;
    state.last_error = None;
}

fn restore(storage: &dyn Storage) -> SessionState {
    match storage.get(AUTH_STORAGE_KEY) {
        Ok(Some(contents)) => match serde_json::from_str::<SessionState>(&contents) {
            Ok(state) if state.is_consistent() => {
                debug!(authenticated = state.is_authenticated, "Restored session snapshot");
                state
            }
            Ok(_) => {
                warn!("Inconsistent session snapshot, starting fresh");
                SessionState::default()
            }
            Err(e) => {
                warn!(error = %e, "Malformed session snapshot, starting fresh");
                SessionState::default()
            }
        },
        Ok(None) => SessionState::default(),
        Err(e) => {
            warn!(error = %e, "Failed to read session snapshot, starting fresh");
            SessionState::default()
        }
    }
}
