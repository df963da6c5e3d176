//! Authentication core: credential store, mock auth service, session store.
//!
//! This module provides:
//! - `CredentialStore`: durable registry of signup records (mock database)
//! - `MockAuthService`: simulated-latency login/signup/refresh with opaque
//!   token minting
//! - `SessionStore`: the single source of truth for "am I logged in",
//!   persisted after every transition and observable through a watch channel
//!
//! Sessions are persisted under the `auth-storage` key and restored on
//! construction; access tokens expire after minutes, refresh tokens after
//! days.

pub mod credentials;
pub mod service;
pub mod session;

pub use credentials::CredentialStore;
pub use service::{MockAuthService, MockLatency};
pub use session::{SessionState, SessionStore};
