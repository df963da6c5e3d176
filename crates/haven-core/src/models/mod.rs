//! Domain types shared across the auth core and the gateway.
//!
//! Wire shapes use camelCase field names to match the documented persistence
//! and response layouts.

pub mod report;
pub mod user;

pub use report::{Report, ReportResponse, ReportsResponse};
pub use user::{AuthPayload, CredentialRecord, RefreshPayload, User};
