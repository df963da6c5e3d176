//! In-process mock API transport.
//!
//! Serves the reports endpoints against the bundled sample data, with
//! simulated latency. Like the rest of the mock backend it only checks that
//! a bearer credential is present, not that it is genuine.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::AuthError;
use crate::models::{report, Report};

use super::{GatewayRequest, GatewayResponse, Method, Transport};

/// Default simulated latency per request
const DEFAULT_LATENCY_MS: u64 = 600;

pub struct MockTransport {
    base_url: String,
    bearer_header: String,
    reports: Vec<Report>,
    latency: Duration,
}

impl MockTransport {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            bearer_header: config.bearer_header.clone(),
            reports: report::sample_reports(),
            latency: Duration::from_millis(DEFAULT_LATENCY_MS),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn has_bearer(&self, request: &GatewayRequest) -> bool {
        request.headers.iter().any(|(name, value)| {
            name.eq_ignore_ascii_case(&self.bearer_header) && value.starts_with("Bearer ")
        })
    }

    fn route(&self, request: &GatewayRequest) -> GatewayResponse {
        let path = request
            .url
            .strip_prefix(&self.base_url)
            .unwrap_or(&request.url);

        if !self.has_bearer(request) {
            return error_response(401, "Authentication required");
        }

        match (request.method, path) {
            (Method::Get, "/reports") => ok_response(json!({ "reports": self.reports })),
            (Method::Get, path) if path.starts_with("/reports/") => {
                let id = &path["/reports/".len()..];
                match self.reports.iter().find(|r| r.id == id) {
                    Some(report) => ok_response(json!({ "report": report })),
                    None => error_response(404, "Report not found"),
                }
            }
            _ => error_response(404, "Not found"),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: GatewayRequest) -> Result<GatewayResponse, AuthError> {
        tokio::time::sleep(self.latency).await;
        let response = self.route(&request);
        debug!(
            method = request.method.as_str(),
            url = %request.url,
            status = response.status,
            "Mock transport handled request"
        );
        Ok(response)
    }
}

fn ok_response(body: serde_json::Value) -> GatewayResponse {
    GatewayResponse {
        status: 200,
        body: body.to_string(),
    }
}

fn error_response(status: u16, message: &str) -> GatewayResponse {
    GatewayResponse {
        status,
        body: json!({ "message": message }).to_string(),
    }
}
