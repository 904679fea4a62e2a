//! Persisted login state and application selection.

use std::sync::Arc;
use tracely_common_core::{LocalStore, StoreError};

pub const TOKEN_KEY: &str = "_tracely_token";
pub const USER_KEY: &str = "_tracely_user";
pub const CURRENT_APP_KEY: &str = "_tracely_current_app";

/// Typed view over the local store.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn LocalStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    pub fn token(&self) -> Result<Option<String>, StoreError> {
        self.non_empty(TOKEN_KEY)
    }

    pub fn username(&self) -> Result<Option<String>, StoreError> {
        self.non_empty(USER_KEY)
    }

    pub fn current_app(&self) -> Result<Option<String>, StoreError> {
        self.non_empty(CURRENT_APP_KEY)
    }

    pub fn is_logged_in(&self) -> Result<bool, StoreError> {
        Ok(self.token()?.is_some())
    }

    pub fn set_auth(&self, token: &str, username: &str) -> Result<(), StoreError> {
        self.store.set(TOKEN_KEY, token)?;
        self.store.set(USER_KEY, username)
    }

    /// Forget the token and username. The selected app is kept.
    pub fn clear_auth(&self) -> Result<(), StoreError> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(USER_KEY)
    }

    pub fn set_current_app(&self, app_id: &str) -> Result<(), StoreError> {
        self.store.set(CURRENT_APP_KEY, app_id)
    }

    fn non_empty(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.store.get(key)?.filter(|v| !v.is_empty()))
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}
