//! Login redirects.
//!
//! The browser location is abstracted behind `Navigator`; `LoginRedirector` adds
//! the two login paths and the guard against redirecting from a login page.
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::realm::LoginTarget;

pub trait Navigator: Send + Sync {
    /// Path of the page currently shown.
    fn current_path(&self) -> String;

    /// Full navigation to `path`.
    fn navigate(&self, path: &str);
}

/// Navigator that only records where it was sent.
#[derive(Debug, Default)]
pub struct MemoryNavigator {
    location: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            location: Mutex::new(start.into()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Every navigation performed, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, path: &str) {
        info!(to = %path, "navigating");
        *self.location.lock().unwrap_or_else(PoisonError::into_inner) = path.to_string();
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}

#[derive(Clone)]
pub struct LoginRedirector {
    navigator: Arc<dyn Navigator>,
    enduser_login: String,
    backoffice_login: String,
}

impl std::fmt::Debug for LoginRedirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRedirector")
            .field("enduser_login", &self.enduser_login)
            .field("backoffice_login", &self.backoffice_login)
            .finish()
    }
}

impl LoginRedirector {
    pub fn new(
        navigator: Arc<dyn Navigator>,
        enduser_login: impl Into<String>,
        backoffice_login: impl Into<String>,
    ) -> Self {
        Self {
            navigator,
            enduser_login: enduser_login.into(),
            backoffice_login: backoffice_login.into(),
        }
    }

    pub fn path_for(&self, target: LoginTarget) -> &str {
        match target {
            LoginTarget::EndUser => &self.enduser_login,
            LoginTarget::Backoffice => &self.backoffice_login,
        }
    }

    pub fn is_login_page(&self, path: &str) -> bool {
        path == self.enduser_login || path == self.backoffice_login
    }

    /// Navigate to the login page for `target`.
    ///
    /// No-op while already on either login page. Returns whether it navigated.
    pub fn redirect(&self, target: LoginTarget) -> bool {
        let current = self.navigator.current_path();
        if self.is_login_page(&current) {
            debug!(current = %current, %target, "already on a login page, skipping redirect");
            return false;
        }
        self.navigator.navigate(self.path_for(target));
        true
    }
}
