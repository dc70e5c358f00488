//! Session state and the global policy for expired sessions.
//!
//! A [`SessionState`] owns the bearer token (through a [`TokenStore`]) and
//! decides, once for the whole application, what an HTTP 401 means for
//! callers: an empty result, an error, or an empty result plus a redirect to
//! the login page.

mod navigator;
mod store;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use metrics::counter;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::transport::TransportError;

pub use navigator::{LoggingNavigator, Navigator};
pub use store::{FileTokenStore, MemoryTokenStore, TOKEN_KEY, TokenStore};

const DEFAULT_LOGIN_PATH: &str = "/login";
const METRIC_SESSION_EXPIRED: &str = "careboard_session_expired_total";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("token store io error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("token store at {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },
}

/// What callers observe when the server rejects the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPolicy {
    /// Callers receive an empty result.
    ReturnEmpty,
    /// Callers receive [`TransportError::Unauthorized`].
    ThrowError,
    /// Callers receive an empty result and the app navigates to login once.
    #[default]
    RedirectToLogin,
}

impl SessionPolicy {
    pub fn returns_empty(self) -> bool {
        matches!(self, Self::ReturnEmpty | Self::RedirectToLogin)
    }
}

impl fmt::Display for SessionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReturnEmpty => "return_empty",
            Self::ThrowError => "throw_error",
            Self::RedirectToLogin => "redirect_to_login",
        })
    }
}

impl std::str::FromStr for SessionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "return_empty" => Ok(Self::ReturnEmpty),
            "throw_error" => Ok(Self::ThrowError),
            "redirect_to_login" => Ok(Self::RedirectToLogin),
            other => Err(format!(
                "unknown session policy `{other}` (expected return_empty, throw_error or redirect_to_login)"
            )),
        }
    }
}

/// Process-wide authentication state.
///
/// The token is read from the store on every request. The first 401 latches
/// the session as expired; until [`SessionState::login`] stores a new token,
/// authenticated requests fail without touching the network.
pub struct SessionState {
    store: Arc<dyn TokenStore>,
    policy: SessionPolicy,
    login_path: String,
    navigator: Arc<dyn Navigator>,
    expired: AtomicBool,
}

pub struct SessionStateBuilder {
    store: Arc<dyn TokenStore>,
    policy: SessionPolicy,
    login_path: String,
    navigator: Arc<dyn Navigator>,
}

impl SessionStateBuilder {
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn build(self) -> SessionState {
        SessionState {
            store: self.store,
            policy: self.policy,
            login_path: self.login_path,
            navigator: self.navigator,
            expired: AtomicBool::new(false),
        }
    }
}

impl SessionState {
    pub fn builder(policy: SessionPolicy, store: Arc<dyn TokenStore>) -> SessionStateBuilder {
        SessionStateBuilder {
            store,
            policy,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            navigator: Arc::new(LoggingNavigator),
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Current bearer token. An unreadable store counts as signed out.
    pub fn token(&self) -> Option<String> {
        match self.store.load() {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(err) => {
                warn!(error = %err, "Failed to read session token; sending request unauthenticated");
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.is_expired() && self.token().is_some()
    }

    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    /// Store a new token and lift the expiry latch.
    pub fn login(&self, token: &str) -> Result<(), SessionError> {
        self.store.save(token.trim())?;
        self.expired.store(false, Ordering::SeqCst);
        info!("Session token stored");
        Ok(())
    }

    pub fn logout(&self) -> Result<(), SessionError> {
        self.store.clear()?;
        self.expired.store(false, Ordering::SeqCst);
        info!("Session token cleared");
        Ok(())
    }

    /// Record a 401 from the server.
    ///
    /// Only the first call after a login latches the session and, under
    /// [`SessionPolicy::RedirectToLogin`], triggers navigation. Returns whether
    /// this call was that first one.
    pub fn handle_unauthorized(&self) -> bool {
        if self.expired.swap(true, Ordering::SeqCst) {
            return false;
        }

        counter!(METRIC_SESSION_EXPIRED).increment(1);
        warn!(policy = %self.policy, "Session expired");
        if self.policy == SessionPolicy::RedirectToLogin {
            self.navigator.redirect_to_login(&self.login_path);
        }
        true
    }

    /// Apply the policy to a finished call: `Ok(None)` is the empty result.
    pub fn settle<T>(&self, result: Result<T, TransportError>) -> Result<Option<T>, TransportError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(TransportError::Unauthorized) if self.policy.returns_empty() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("policy", &self.policy)
            .field("login_path", &self.login_path)
            .field("expired", &self.is_expired())
            .finish_non_exhaustive()
    }
}
