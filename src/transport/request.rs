use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::TransportError;

/// How a successful response body is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseBody {
    /// Parse the body as JSON; an empty body yields `null`.
    #[default]
    Json,
    /// Discard the body and yield `null`.
    Ignore,
}

/// One call against the API, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub response: ResponseBody,
    /// Whether the session token is attached and a 401 counts as expiry.
    pub authenticated: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            response: ResponseBody::Json,
            authenticated: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    /// Serialize `payload` as the JSON body.
    pub fn with_json<T: Serialize + ?Sized>(self, payload: &T) -> Result<Self, TransportError> {
        let body = serde_json::to_value(payload)
            .map_err(|e| TransportError::InvalidRequest(format!("failed to encode body: {e}")))?;
        Ok(self.with_body(Some(body)))
    }

    pub fn ignore_response(mut self) -> Self {
        self.response = ResponseBody::Ignore;
        self
    }

    /// Send without the session token, e.g. for the login call itself.
    ///
    /// A 401 on an anonymous request is an ordinary [`TransportError::Http`]
    /// and leaves the session untouched.
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }
}
