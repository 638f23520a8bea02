//! Credential access used by the request layer.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

/// Where the request layer reads credentials from and reports auth failures to.
pub trait Session: Send + Sync {
    fn token(&self) -> Option<String>;

    /// Drop stored credentials and user data.
    fn clear(&self);

    /// Send the user back to the sign-in entry point.
    fn redirect_to_sign_in(&self);
}

/// In-memory session, suitable for the CLI and tests.
#[derive(Debug, Default)]
pub struct MemorySession {
    token: RwLock<Option<String>>,
    redirects: AtomicU32,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.set_token(token);
        session
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
    }

    pub fn redirect_count(&self) -> u32 {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Session for MemorySession {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn clear(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn redirect_to_sign_in(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
        log::info!("Session expired, redirecting to sign-in");
    }
}
