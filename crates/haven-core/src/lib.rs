//! Haven core - client-side authentication session lifecycle.
//!
//! The library models a token-based session end to end: a mock
//! authentication service mints access/refresh token pairs with expiries,
//! the session store owns and persists the session state across restarts,
//! and the request gateway attaches tokens to outgoing calls and
//! transparently refreshes them, retrying once on a 401.
//!
//! Everything is injectable: storage, transport, configuration, and the
//! session itself are explicit values rather than ambient globals, so tests
//! and embedders can wire their own collaborators.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use api::{CallOptions, MockTransport, RequestGateway};
pub use auth::{CredentialStore, MockAuthService, SessionState, SessionStore};
pub use config::ApiConfig;
pub use error::AuthError;
pub use storage::{FileStorage, MemoryStorage, Storage};
