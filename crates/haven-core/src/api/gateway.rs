//! The request gateway: single entry point for all API calls.
//!
//! Two independent safety nets cover a stale access token, because the local
//! clock and the server's validation can disagree: a proactive refresh when
//! the stored expiry has passed, and a reactive refresh-and-retry-once when
//! the server answers 401. A second consecutive 401 is a hard failure.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::SessionStore;
use crate::config::ApiConfig;
use crate::error::AuthError;

use super::{GatewayRequest, GatewayResponse, Method, Transport};

/// Per-call options. Defaults to an authenticated GET with no body.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub require_auth: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            method: Method::Get,
            body: None,
            require_auth: true,
        }
    }
}

impl CallOptions {
    pub fn public() -> Self {
        Self {
            require_auth: false,
            ..Self::default()
        }
    }
}

/// Clone is cheap - the transport, session, and config are shared.
#[derive(Clone)]
pub struct RequestGateway {
    transport: Arc<dyn Transport>,
    session: SessionStore,
    config: Arc<ApiConfig>,
}

impl RequestGateway {
    pub fn new(transport: Arc<dyn Transport>, session: SessionStore, config: ApiConfig) -> Self {
        Self {
            transport,
            session,
            config: Arc::new(config),
        }
    }

    /// Issue a call to `endpoint`, handling authentication end to end.
    ///
    /// 1. Authenticated calls fail fast with `AuthenticationRequired` when
    ///    no session is held; no request goes out.
    /// 2. A locally-expired access token is refreshed before the request;
    ///    a failed refresh aborts the call with `SessionExpired`.
    /// 3. The bearer token is attached under the configured header.
    /// 4. A 401 response triggers one refresh-and-retry; the retry's 401 is
    ///    surfaced as a hard failure instead of looping.
    /// 5. Any other non-success status becomes `RequestFailed`, carrying the
    ///    server's `message` when it sent one.
    pub async fn call(&self, endpoint: &str, options: CallOptions) -> Result<GatewayResponse, AuthError> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let mut is_retry = false;

        loop {
            let session = self.session.snapshot();
            if options.require_auth && !session.is_authenticated {
                return Err(AuthError::AuthenticationRequired);
            }

            if options.require_auth && !is_retry && session.access_token_expired() {
                debug!(endpoint = endpoint, "Access token expired locally, refreshing");
                if let Err(e) = self.session.refresh().await {
                    warn!(endpoint = endpoint, error = %e, "Refresh before request failed");
                    return Err(AuthError::SessionExpired);
                }
            }

            // Re-read: a refresh above (or on a retry) replaced the token
            let session = self.session.snapshot();
            let mut request = GatewayRequest {
                method: options.method,
                url: url.clone(),
                headers: Vec::new(),
                body: options.body.clone(),
            };
            if options.require_auth {
                if let Some(token) = &session.access_token {
                    request
                        .headers
                        .push((self.config.bearer_header.clone(), format!("Bearer {}", token)));
                }
            }

            let response = self.transport.send(request).await?;

            if response.status == 401 && !is_retry {
                debug!(endpoint = endpoint, "Got 401, refreshing and retrying once");
                if let Err(e) = self.session.refresh().await {
                    warn!(endpoint = endpoint, error = %e, "Refresh after 401 failed");
                    return Err(AuthError::SessionExpired);
                }
                is_retry = true;
                continue;
            }

            if !response.is_success() {
                return Err(AuthError::from_response(response.status, &response.body));
            }

            return Ok(response);
        }
    }

    /// Authenticated GET decoded into `T`.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, AuthError> {
        self.call(endpoint, CallOptions::default()).await?.json()
    }

    /// Authenticated POST with a JSON body, decoded into `T`.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, AuthError> {
        let body = serde_json::to_value(body)
            .map_err(|e| AuthError::Network(format!("Invalid request body: {}", e)))?;
        let options = CallOptions {
            method: Method::Post,
            body: Some(body),
            require_auth: true,
        };
        self.call(endpoint, options).await?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockTransport;
    use crate::auth::{CredentialStore, MockAuthService, MockLatency, SessionState};
    use crate::models::{ReportResponse, ReportsResponse};
    use crate::storage::{MemoryStorage, Storage};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Transport fed a script of responses, recording every request.
    struct StubTransport {
        script: Mutex<VecDeque<GatewayResponse>>,
        requests: Mutex<Vec<GatewayRequest>>,
    }

    impl StubTransport {
        fn new(script: Vec<(u16, &str)>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|(status, body)| GatewayResponse {
                            status,
                            body: body.to_string(),
                        })
                        .collect(),
                ),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<GatewayRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn bearer_of(request: &GatewayRequest) -> Option<String> {
            request
                .headers
                .iter()
                .find(|(name, _)| name == "Authorization")
                .map(|(_, value)| value.clone())
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn send(&self, request: GatewayRequest) -> Result<GatewayResponse, AuthError> {
            self.requests.lock().unwrap().push(request);
            let response = self.script.lock().unwrap().pop_front();
            Ok(response.expect("unexpected request beyond scripted responses"))
        }
    }

    struct Fixture {
        storage: Arc<MemoryStorage>,
        service: MockAuthService,
        session: SessionStore,
    }

    fn fixture() -> Fixture {
        let storage: Arc<MemoryStorage> = Arc::new(MemoryStorage::new());
        let credentials = CredentialStore::new(storage.clone());
        let service = MockAuthService::new(credentials, ApiConfig::default())
            .with_latency(MockLatency::none());
        let session = SessionStore::new(service.clone(), storage.clone());
        Fixture {
            storage,
            service,
            session,
        }
    }

    fn gateway(f: &Fixture, transport: Arc<dyn Transport>) -> RequestGateway {
        RequestGateway::new(transport, f.session.clone(), ApiConfig::default())
    }

    fn mock_gateway(f: &Fixture) -> RequestGateway {
        let transport =
            MockTransport::new(&ApiConfig::default()).with_latency(Duration::ZERO);
        gateway(f, Arc::new(transport))
    }

    /// Persist a snapshot directly, simulating a session restored from an
    /// earlier run with the given token expiries.
    fn seed_session(
        storage: &MemoryStorage,
        access_expiry_ms_from_now: i64,
        refresh_expiry_ms_from_now: i64,
    ) {
        let now = Utc::now().timestamp_millis();
        let snapshot = serde_json::json!({
            "identity": {"id": "1", "name": "Demo User", "email": "user@example.com"},
            "accessToken": "stale-access-token",
            "accessTokenExpiry": now + access_expiry_ms_from_now,
            "refreshToken": "stored-refresh-token",
            "refreshTokenExpiry": now + refresh_expiry_ms_from_now,
            "isAuthenticated": true
        });
        storage.set("auth-storage", &snapshot.to_string()).unwrap();
    }

    #[tokio::test]
    async fn test_unauthenticated_call_fails_without_network() {
        let f = fixture();
        let transport = StubTransport::new(vec![]);
        let gateway = gateway(&f, transport.clone());

        let err = gateway.call("/reports", CallOptions::default()).await.unwrap_err();
        assert_eq!(err, AuthError::AuthenticationRequired);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_public_call_skips_auth_entirely() {
        let f = fixture();
        let transport = StubTransport::new(vec![(200, r#"{"ok": true}"#)]);
        let gateway = gateway(&f, transport.clone());

        let response = gateway.call("/status", CallOptions::public()).await.unwrap();
        assert_eq!(response.status, 200);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(StubTransport::bearer_of(&requests[0]).is_none());
    }

    #[tokio::test]
    async fn test_login_then_protected_call_attaches_token() {
        let f = fixture();
        f.session.login("user@example.com", "password").await.unwrap();
        let token = f.session.snapshot().access_token.unwrap();

        let transport = StubTransport::new(vec![(200, r#"{"ok": true}"#)]);
        let gateway = gateway(&f, transport.clone());
        gateway.call("/reports", CallOptions::default()).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://api.example.com/reports");
        assert_eq!(
            StubTransport::bearer_of(&requests[0]).as_deref(),
            Some(format!("Bearer {}", token).as_str())
        );
    }

    #[tokio::test]
    async fn test_end_to_end_reports_flow() {
        let f = fixture();
        f.session.login("user@example.com", "password").await.unwrap();
        let gateway = mock_gateway(&f);

        let list: ReportsResponse = gateway.get("/reports").await.unwrap();
        assert_eq!(list.reports.len(), 5);

        let details: ReportResponse = gateway.get("/reports/1").await.unwrap();
        assert_eq!(details.report.title, "Monthly Sales Report");

        let err = gateway.get::<ReportResponse>("/reports/99").await.unwrap_err();
        assert_eq!(
            err,
            AuthError::RequestFailed {
                status: 404,
                message: "Report not found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_wrong_password_keeps_gateway_locked() {
        let f = fixture();
        let err = f.session.login("user@example.com", "wrong").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert!(!f.session.snapshot().is_authenticated);

        let gateway = mock_gateway(&f);
        let err = gateway.get::<ReportsResponse>("/reports").await.unwrap_err();
        assert_eq!(err, AuthError::AuthenticationRequired);
    }

    #[tokio::test]
    async fn test_expired_access_token_refreshes_before_request() {
        let f = fixture();
        // Restored session whose access token expired a minute ago but whose
        // refresh token is still good
        seed_session(&f.storage, -60_000, 60_000);
        let session = SessionStore::new(f.service.clone(), f.storage.clone());

        let transport = StubTransport::new(vec![(200, r#"{"ok": true}"#)]);
        let gateway = RequestGateway::new(transport.clone(), session.clone(), ApiConfig::default());

        gateway.call("/reports", CallOptions::default()).await.unwrap();

        // Exactly one refresh, and the single request carried the new token
        assert_eq!(f.service.refresh_calls(), 1);
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let bearer = StubTransport::bearer_of(&requests[0]).unwrap();
        assert_ne!(bearer, "Bearer stale-access-token");
        assert_eq!(
            bearer,
            format!("Bearer {}", session.snapshot().access_token.unwrap())
        );
    }

    #[tokio::test]
    async fn test_expired_refresh_token_aborts_without_network() {
        let f = fixture();
        seed_session(&f.storage, -60_000, -1_000);
        let session = SessionStore::new(f.service.clone(), f.storage.clone());

        let transport = StubTransport::new(vec![]);
        let gateway = RequestGateway::new(transport.clone(), session.clone(), ApiConfig::default());

        let err = gateway.call("/reports", CallOptions::default()).await.unwrap_err();
        assert_eq!(err, AuthError::SessionExpired);
        assert!(transport.requests().is_empty());
        assert_eq!(session.snapshot(), SessionState::default());
    }

    #[tokio::test]
    async fn test_401_refreshes_and_retries_once() {
        let f = fixture();
        f.session.login("user@example.com", "password").await.unwrap();

        let transport = StubTransport::new(vec![
            (401, r#"{"message": "Unauthorized"}"#),
            (200, r#"{"ok": true}"#),
        ]);
        let gateway = gateway(&f, transport.clone());

        let response = gateway.call("/reports", CallOptions::default()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(f.service.refresh_calls(), 1);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        // The retry carried a different, freshly minted token
        let first = StubTransport::bearer_of(&requests[0]).unwrap();
        let second = StubTransport::bearer_of(&requests[1]).unwrap();
        assert_ne!(first, second);
        assert_eq!(
            second,
            format!("Bearer {}", f.session.snapshot().access_token.unwrap())
        );
    }

    #[tokio::test]
    async fn test_second_401_is_a_hard_failure() {
        let f = fixture();
        f.session.login("user@example.com", "password").await.unwrap();

        let transport = StubTransport::new(vec![
            (401, r#"{"message": "Unauthorized"}"#),
            (401, r#"{"message": "Still unauthorized"}"#),
        ]);
        let gateway = gateway(&f, transport.clone());

        let err = gateway.call("/reports", CallOptions::default()).await.unwrap_err();
        assert_eq!(
            err,
            AuthError::RequestFailed {
                status: 401,
                message: "Still unauthorized".to_string()
            }
        );
        // No third attempt, and only the one refresh between the two
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(f.service.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn test_server_error_surfaces_message_without_touching_session() {
        let f = fixture();
        f.session.login("user@example.com", "password").await.unwrap();
        let before = f.session.snapshot();

        let transport = StubTransport::new(vec![(500, r#"{"message": "boom"}"#)]);
        let gateway = gateway(&f, transport);

        let err = gateway.call("/reports", CallOptions::default()).await.unwrap_err();
        assert_eq!(
            err,
            AuthError::RequestFailed {
                status: 500,
                message: "boom".to_string()
            }
        );
        assert_eq!(f.session.snapshot(), before);
    }

    #[tokio::test]
    async fn test_non_json_error_body_gets_status_message() {
        let f = fixture();
        f.session.login("user@example.com", "password").await.unwrap();

        let transport = StubTransport::new(vec![(502, "Bad Gateway")]);
        let gateway = gateway(&f, transport);

        let err = gateway.call("/reports", CallOptions::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status 502");
    }
}
