//! The application-wide synchronization context.

use std::sync::Arc;

use careboard_api_types::{LoginRequest, LoginResponse};
use reqwest::Method;
use serde_json::Value;
use tracing::{info, instrument};

use crate::cache::{CacheConfig, FetchOptions, QueryKey, ResourceCache};
use crate::config::{ApiSettings, Settings};
use crate::infra::InfraError;
use crate::mutation::{MutationCoordinator, MutationDescriptor};
use crate::session::{FileTokenStore, Navigator, SessionError, SessionState};
use crate::transport::{ApiRequest, AuthenticatedTransport, TransportError};

const LOGIN_PATH: &str = "api/auth/login";

/// One transport, one cache, one coordinator and one session, built once at
/// start-up and handed to every resource binding.
///
/// Cloning is cheap; clones share all state.
#[derive(Debug, Clone)]
pub struct SyncContext {
    session: Arc<SessionState>,
    transport: Arc<AuthenticatedTransport>,
    cache: ResourceCache,
    mutations: MutationCoordinator,
}

impl SyncContext {
    pub fn new(
        api: &ApiSettings,
        cache: CacheConfig,
        session: Arc<SessionState>,
    ) -> Result<Self, TransportError> {
        let transport = Arc::new(AuthenticatedTransport::new(api, Arc::clone(&session))?);
        let cache = ResourceCache::new(cache);
        let mutations = MutationCoordinator::new(Arc::clone(&transport), cache.clone());
        Ok(Self {
            session,
            transport,
            cache,
            mutations,
        })
    }

    /// Build from resolved settings, persisting the token to the configured file.
    pub fn from_settings(
        settings: &Settings,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, InfraError> {
        let store = Arc::new(FileTokenStore::new(&settings.session.token_file));
        let session = SessionState::builder(settings.session.policy, store)
            .login_path(settings.session.login_path.clone())
            .navigator(navigator)
            .build();
        let context = Self::new(
            &settings.api,
            CacheConfig::from(&settings.cache),
            Arc::new(session),
        )?;
        Ok(context)
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn transport(&self) -> &Arc<AuthenticatedTransport> {
        &self.transport
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn mutations(&self) -> &MutationCoordinator {
        &self.mutations
    }

    /// Cached read of `request` under `key`, with the session policy applied.
    pub async fn query(
        &self,
        key: &QueryKey,
        request: ApiRequest,
        options: FetchOptions,
    ) -> Result<Option<Value>, TransportError> {
        let result = self
            .cache
            .get_or_fetch(key, self.fetcher(request), options)
            .await;
        self.session.settle(result)
    }

    /// Revalidate `key` in the background if it is missing or stale.
    pub fn revalidate(&self, key: &QueryKey, request: ApiRequest, options: FetchOptions) {
        self.cache.refresh(key, self.fetcher(request), options);
    }

    pub async fn mutate(
        &self,
        descriptor: MutationDescriptor,
    ) -> Result<Option<Value>, TransportError> {
        self.mutations.mutate(descriptor).await
    }

    /// Establish a new session token. Cached data belongs to the previous
    /// identity and is dropped.
    #[instrument(skip_all)]
    pub fn login(&self, token: &str) -> Result<(), SessionError> {
        self.session.login(token)?;
        self.cache.clear();
        info!("Signed in");
        Ok(())
    }

    /// Exchange credentials for a token at `api/auth/login` and store it.
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn sign_in(&self, credentials: &LoginRequest) -> Result<LoginResponse, InfraError> {
        let request = ApiRequest::new(Method::POST, LOGIN_PATH)
            .with_json(credentials)?
            .anonymous();
        let value = self.transport.send_request(&request).await?;
        let response: LoginResponse =
            serde_json::from_value(value).map_err(TransportError::decode)?;
        self.login(&response.token)?;
        Ok(response)
    }

    #[instrument(skip_all)]
    pub fn logout(&self) -> Result<(), SessionError> {
        self.session.logout()?;
        self.cache.clear();
        info!("Signed out");
        Ok(())
    }

    fn fetcher(
        &self,
        request: ApiRequest,
    ) -> impl Fn() -> futures::future::BoxFuture<'static, Result<Value, TransportError>> + use<>
    {
        let transport = Arc::clone(&self.transport);
        let request = Arc::new(request);
        move || {
            let transport = Arc::clone(&transport);
            let request = Arc::clone(&request);
            Box::pin(async move { transport.send_request(&request).await })
        }
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::query_key;
    use crate::session::{MemoryTokenStore, SessionPolicy};

    fn context(server: &MockServer, policy: SessionPolicy) -> SyncContext {
        let session = SessionState::builder(
            policy,
            Arc::new(MemoryTokenStore::new(Some("tok".into()))),
        )
        .build();
        let api = ApiSettings::new(Url::parse(&server.base_url()).expect("url"));
        SyncContext::new(&api, CacheConfig::default(), Arc::new(session)).expect("context")
    }

    #[tokio::test]
    async fn query_caches_until_invalidated() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/hope-snippets");
                then.status(200).json_body(json!([{"id": 1}]));
            })
            .await;

        let ctx = context(&server, SessionPolicy::ThrowError);
        let key = query_key!["hopeSnippets"];
        let request = ApiRequest::get("api/hope-snippets");

        for _ in 0..3 {
            let value = ctx
                .query(&key, request.clone(), FetchOptions::default())
                .await
                .expect("query");
            assert_eq!(value, Some(json!([{"id": 1}])));
        }
        assert_eq!(mock.hits_async().await, 1);

        assert_eq!(ctx.cache().invalidate(&key), 1);
        assert_eq!(mock.hits_async().await, 1);
        ctx.query(&key, request, FetchOptions::default())
            .await
            .expect("refetch");
        assert_eq!(mock.hits_async().await, 2);
    }

    #[tokio::test]
    async fn unauthorized_query_returns_empty_under_redirect() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/caregivers");
                then.status(401);
            })
            .await;

        let ctx = context(&server, SessionPolicy::RedirectToLogin);
        let value = ctx
            .query(
                &query_key!["caregivers"],
                ApiRequest::get("api/caregivers"),
                FetchOptions::default(),
            )
            .await;
        assert_eq!(value, Ok(None));
        assert!(ctx.session().is_expired());
    }

    #[tokio::test]
    async fn logout_clears_token_and_cache() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/documents");
                then.status(200).json_body(json!([]));
            })
            .await;

        let ctx = context(&server, SessionPolicy::ThrowError);
        ctx.query(
            &query_key!["documents"],
            ApiRequest::get("api/documents"),
            FetchOptions::default(),
        )
        .await
        .expect("query");
        assert_eq!(ctx.cache().len(), 1);

        ctx.logout().expect("logout");
        assert!(ctx.cache().is_empty());
        assert!(ctx.session().token().is_none());

        ctx.login("again").expect("login");
        assert_eq!(ctx.session().token().as_deref(), Some("again"));
    }

    #[tokio::test]
    async fn sign_in_stores_token_without_sending_the_old_one() {
        let server = MockServer::start_async().await;
        let login = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/auth/login")
                    .header_missing("authorization")
                    .json_body(json!({"email": "ana@example.com", "password": "pw"}));
                then.status(200).json_body(json!({
                    "token": "fresh",
                    "user": {"id": 1, "email": "ana@example.com"}
                }));
            })
            .await;

        let session = SessionState::builder(
            SessionPolicy::ThrowError,
            Arc::new(MemoryTokenStore::default()),
        )
        .build();
        let api = ApiSettings::new(Url::parse(&server.base_url()).expect("url"));
        let ctx = SyncContext::new(&api, CacheConfig::default(), Arc::new(session))
            .expect("context");

        let response = ctx
            .sign_in(&LoginRequest {
                email: "ana@example.com".into(),
                password: "pw".into(),
            })
            .await
            .expect("sign in");

        login.assert_async().await;
        assert_eq!(response.user.map(|u| u.id), Some(1));
        assert_eq!(ctx.session().token().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn rejected_credentials_leave_session_untouched() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/login");
                then.status(401).body("bad credentials");
            })
            .await;

        let ctx = context(&server, SessionPolicy::RedirectToLogin);
        let err = ctx
            .sign_in(&LoginRequest {
                email: "ana@example.com".into(),
                password: "nope".into(),
            })
            .await
            .expect_err("rejected");

        assert!(matches!(
            err,
            InfraError::Transport(TransportError::Http { status: 401, .. })
        ));
        assert!(!ctx.session().is_expired());
        assert_eq!(ctx.session().token().as_deref(), Some("tok"));
    }
}
