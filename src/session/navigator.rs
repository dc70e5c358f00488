use tracing::warn;

/// Performs the navigation to the authentication entry point.
///
/// Browser bindings replace the location; headless callers report it.
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self, login_path: &str);
}

/// Navigator that only logs where the user should go.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn redirect_to_login(&self, login_path: &str) {
        warn!(login_path, "Session expired; sign in again");
    }
}
