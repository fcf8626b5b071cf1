use crate::error::{ConsoleError, ConsoleResult};
use crate::models::{Session, UserSummary};
use crate::store::{LocalStore, TOKEN_KEY};
use crate::surface::Surface;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Sole owner of the session token. Other components only read it.
pub struct SessionHolder {
    store: Arc<dyn LocalStore>,
    surface: Arc<dyn Surface>,
    login_url: String,
    user: Mutex<Option<UserSummary>>,
}

impl SessionHolder {
    pub fn new(store: Arc<dyn LocalStore>, surface: Arc<dyn Surface>, login_url: &str) -> Self {
        Self {
            store,
            surface,
            login_url: login_url.to_string(),
            user: Mutex::new(None),
        }
    }

    pub fn get_token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).filter(|t| !t.trim().is_empty())
    }

    pub fn current(&self) -> Option<Session> {
        let token = self.get_token()?;
        Some(Session {
            token,
            user: self.current_user(),
        })
    }

    pub fn current_user(&self) -> Option<UserSummary> {
        self.user.lock().ok().and_then(|u| u.clone())
    }

    pub fn begin(&self, token: &str, user: UserSummary) -> ConsoleResult<()> {
        self.store
            .set(TOKEN_KEY, token)
            .map_err(|e| ConsoleError::Storage(e.to_string()))?;
        info!("Session started for {}", user.email);
        if let Ok(mut guard) = self.user.lock() {
            *guard = Some(user);
        }
        Ok(())
    }

    pub fn set_user(&self, user: UserSummary) {
        if let Ok(mut guard) = self.user.lock() {
            *guard = Some(user);
        }
    }

    /// Redirects to the login surface when no token is held. Callers stop
    /// initialising on `Err`.
    pub fn require_authenticated(&self) -> ConsoleResult<Session> {
        match self.current() {
            Some(session) => Ok(session),
            None => {
                info!("No session token, sending to login");
                self.surface.redirect(&self.login_url);
                Err(ConsoleError::Unauthorized)
            }
        }
    }

    /// Drops the token and user, then redirects to login. There is no refresh
    /// protocol: an expired token always means a full re-login.
    pub fn invalidate(&self) {
        if let Err(e) = self.store.remove(TOKEN_KEY) {
            warn!("Failed to clear stored token: {}", e);
        }
        if let Ok(mut guard) = self.user.lock() {
            *guard = None;
        }
        self.surface.redirect(&self.login_url);
    }
}
