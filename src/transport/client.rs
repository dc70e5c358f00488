use std::sync::Arc;

use metrics::counter;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::ApiSettings;
use crate::session::SessionState;

use super::{ApiRequest, ResponseBody, TransportError};

const METRIC_TRANSPORT_REQUESTS: &str = "careboard_transport_requests_total";

/// HTTP client bound to one API base URL and one session.
///
/// Never touches the cache; it only talks to the server and, on a 401, to the
/// session.
#[derive(Debug)]
pub struct AuthenticatedTransport {
    client: Client,
    base: Url,
    session: Arc<SessionState>,
}

impl AuthenticatedTransport {
    pub fn new(api: &ApiSettings, session: Arc<SessionState>) -> Result<Self, TransportError> {
        let mut base = api.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = Client::builder()
            .user_agent(Self::user_agent())
            .cookie_store(true);
        if let Some(timeout) = api.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("failed to build client: {e}")))?;

        Ok(Self {
            client,
            base,
            session,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("careboard/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    /// Resolve `path` against the base URL; a leading `/` is ignored.
    pub fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidRequest(format!("invalid path `{path}`: {e}")))
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, TransportError> {
        self.send_request(&ApiRequest::new(method, path).with_body(body))
            .await
    }

    #[instrument(skip_all, fields(method = %request.method, path = %request.path))]
    pub async fn send_request(&self, request: &ApiRequest) -> Result<Value, TransportError> {
        if request.authenticated && self.session.is_expired() {
            debug!("Session already expired; request not sent");
            counter!(METRIC_TRANSPORT_REQUESTS, "outcome" => "skipped").increment(1);
            return Err(TransportError::Unauthorized);
        }

        let mut url = self.url(&request.path)?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }

        let mut builder = self.client.request(request.method.clone(), url);
        if request.authenticated {
            if let Some(token) = self.session.token() {
                builder = builder.bearer_auth(token);
            }
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|err| {
            warn!(error = %err, "Request failed without a response");
            counter!(METRIC_TRANSPORT_REQUESTS, "outcome" => "network_error").increment(1);
            TransportError::Network(err.to_string())
        })?;

        let result = self.handle(response, request).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(TransportError::Unauthorized) => "unauthorized",
            Err(_) => "error",
        };
        counter!(METRIC_TRANSPORT_REQUESTS, "outcome" => outcome).increment(1);
        result
    }

    async fn handle(&self, response: Response, request: &ApiRequest) -> Result<Value, TransportError> {
        let status = response.status();
        debug!(status = status.as_u16(), "Response received");

        if status == StatusCode::UNAUTHORIZED && request.authenticated {
            warn!("Server rejected the session token");
            self.session.handle_unauthorized();
            return Err(TransportError::Unauthorized);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(format!("failed to read body: {e}")))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            let message = if text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or(status.as_str())
                    .to_string()
            } else {
                text
            };
            return Err(TransportError::http(status.as_u16(), message));
        }

        match request.response {
            ResponseBody::Ignore => Ok(Value::Null),
            ResponseBody::Json if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Value::Null),
            ResponseBody::Json => serde_json::from_slice(&bytes).map_err(TransportError::decode),
        }
    }
}
