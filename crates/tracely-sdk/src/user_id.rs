//! Anonymous per-installation user id.

use parking_lot::Mutex;
use std::sync::Arc;
use tracely_common_core::LocalStore;

/// Storage key of the anonymous id.
pub const USER_ID_KEY: &str = "_tracely_uid";

/// Lazily creates and remembers the anonymous user id.
///
/// The id is a UUID v4 persisted in the local store on first use. If the store
/// cannot be read or written, a process-lifetime id is used instead.
pub struct UserIds {
    store: Arc<dyn LocalStore>,
    cached: Mutex<Option<String>>,
}

impl UserIds {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            store,
            cached: Mutex::new(None),
        }
    }

    pub fn get_or_create(&self) -> String {
        let mut cached = self.cached.lock();
        if let Some(id) = cached.as_ref() {
            return id.clone();
        }

        let id = match self.store.get(USER_ID_KEY) {
            Ok(Some(id)) if !id.is_empty() => id,
            Ok(_) => {
                let id = uuid::Uuid::new_v4().to_string();
                if let Err(e) = self.store.set(USER_ID_KEY, &id) {
                    tracing::warn!(error = %e, "failed to persist user id, using an ephemeral one");
                }
                id
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read user id, using an ephemeral one");
                uuid::Uuid::new_v4().to_string()
            }
        };

        *cached = Some(id.clone());
        id
    }
}

impl std::fmt::Debug for UserIds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserIds")
            .field("cached", &self.cached.lock().is_some())
            .finish()
    }
}
