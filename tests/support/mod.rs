#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use careboard::config::ApiSettings;
use careboard::session::{MemoryTokenStore, Navigator, SessionPolicy, SessionState};
use careboard::{CacheConfig, SyncContext};
use httpmock::MockServer;
use url::Url;

#[derive(Debug, Default)]
pub struct CountingNavigator {
    redirects: AtomicUsize,
}

impl CountingNavigator {
    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for CountingNavigator {
    fn redirect_to_login(&self, _login_path: &str) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub ctx: SyncContext,
    pub navigator: Arc<CountingNavigator>,
}

pub fn harness(server: &MockServer, policy: SessionPolicy) -> Harness {
    harness_with_timeout(server, policy, None)
}

pub fn harness_with_timeout(
    server: &MockServer,
    policy: SessionPolicy,
    timeout: Option<Duration>,
) -> Harness {
    let navigator = Arc::new(CountingNavigator::default());
    let session = SessionState::builder(
        policy,
        Arc::new(MemoryTokenStore::new(Some("test-token".to_string()))),
    )
    .navigator(navigator.clone())
    .build();

    let api = ApiSettings {
        base_url: Url::parse(&server.base_url()).expect("mock server url"),
        timeout,
    };
    let ctx = SyncContext::new(&api, CacheConfig::default(), Arc::new(session))
        .expect("sync context");
    Harness { ctx, navigator }
}
