//! Request gateway and transports.
//!
//! This module provides:
//! - `RequestGateway`: the single entry point for authenticated calls, with
//!   proactive (local expiry) and reactive (401) token refresh paths
//! - `Transport`: the seam between the gateway and the wire
//! - `MockTransport`: the in-process API the demo runs against
//! - `HttpTransport`: a real HTTP transport for when a backend exists

pub mod gateway;
pub mod mock;
pub mod transport;

pub use gateway::{CallOptions, RequestGateway};
pub use mock::MockTransport;
pub use transport::{GatewayRequest, GatewayResponse, HttpTransport, Method, Transport};
