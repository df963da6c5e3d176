//! Mock authentication service.
//!
//! Simulates a remote auth backend: bounded fake network latency, opaque
//! token minting, and expiry computation from the configured TTLs. Signup
//! durably appends to the credential store; no operation has side effects
//! on failure.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::AuthError;
use crate::models::{AuthPayload, RefreshPayload};

use super::CredentialStore;

/// Length of the random portion of a minted token
const TOKEN_RANDOM_LEN: usize = 24;

/// Simulated network latency per operation.
///
/// Defaults mirror observed remote latencies; tests inject `MockLatency::none()`
/// to keep the suite fast.
#[derive(Debug, Clone, Copy)]
pub struct MockLatency {
    pub login: Duration,
    pub signup: Duration,
    pub refresh: Duration,
}

impl Default for MockLatency {
    fn default() -> Self {
        Self {
            login: Duration::from_millis(800),
            signup: Duration::from_millis(1000),
            refresh: Duration::from_millis(500),
        }
    }
}

impl MockLatency {
    pub fn none() -> Self {
        Self {
            login: Duration::ZERO,
            signup: Duration::ZERO,
            refresh: Duration::ZERO,
        }
    }
}

/// Per-operation call counters. As a mock, the service exposes these so
/// tests can assert how many calls a scenario produced (e.g. coalesced
/// refreshes).
#[derive(Default)]
struct CallCounters {
    login: AtomicUsize,
    signup: AtomicUsize,
    refresh: AtomicUsize,
}

/// Clone is cheap - the credential store and counters are shared.
#[derive(Clone)]
pub struct MockAuthService {
    credentials: CredentialStore,
    config: Arc<ApiConfig>,
    latency: MockLatency,
    counters: Arc<CallCounters>,
}

impl MockAuthService {
    pub fn new(credentials: CredentialStore, config: ApiConfig) -> Self {
        Self {
            credentials,
            config: Arc::new(config),
            latency: MockLatency::default(),
            counters: Arc::new(CallCounters::default()),
        }
    }

    pub fn with_latency(mut self, latency: MockLatency) -> Self {
        self.latency = latency;
        self
    }

    /// Verify credentials by email lookup and mint a fresh token pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, AuthError> {
        self.counters.login.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.latency.login).await;

        let record = self
            .credentials
            .find_by_email(email)
            .filter(|r| r.password == password)
            .ok_or(AuthError::InvalidCredentials)?;

        debug!(email = email, "Login succeeded");
        Ok(self.mint_payload(record.to_user()))
    }

    /// Register a new identity and mint a token pair, exactly as login does.
    ///
    /// Fails with `EmailAlreadyRegistered` before anything is written.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<AuthPayload, AuthError> {
        self.counters.signup.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.latency.signup).await;

        let record = self.credentials.append(name, email, password)?;

        debug!(email = email, id = %record.id, "Signup succeeded");
        Ok(self.mint_payload(record.to_user()))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The mock only rejects an empty value; it does not otherwise validate
    /// the token's authenticity, and the refresh token is not rotated. A real
    /// backend must validate server-side.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshPayload, AuthError> {
        self.counters.refresh.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.latency.refresh).await;

        if refresh_token.is_empty() {
            return Err(AuthError::InvalidRefreshToken);
        }

        let now = Utc::now();
        Ok(RefreshPayload {
            access_token: mint_token(),
            access_token_expiry: (now + self.config.access_token_ttl).timestamp_millis(),
        })
    }

    pub fn login_calls(&self) -> usize {
        self.counters.login.load(Ordering::Relaxed)
    }

    pub fn signup_calls(&self) -> usize {
        self.counters.signup.load(Ordering::Relaxed)
    }

    pub fn refresh_calls(&self) -> usize {
        self.counters.refresh.load(Ordering::Relaxed)
    }

    fn mint_payload(&self, user: crate::models::User) -> AuthPayload {
        let now = Utc::now();
        AuthPayload {
            user,
            access_token: mint_token(),
            access_token_expiry: (now + self.config.access_token_ttl).timestamp_millis(),
            refresh_token: mint_token(),
            refresh_token_expiry: (now + self.config.refresh_token_ttl).timestamp_millis(),
        }
    }
}

/// Mint an opaque bearer token: random alphanumeric suffixed with the mint
/// time, so collisions are practically impossible even within one clock tick.
fn mint_token() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{}{:x}", random, Utc::now().timestamp_millis())
}
