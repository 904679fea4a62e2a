//! The host's current location, shared by capture and navigation.

use parking_lot::RwLock;
use std::sync::Arc;

/// Current href, cheap to clone and safe to share across threads.
#[derive(Debug, Clone)]
pub struct Location {
    href: Arc<RwLock<String>>,
}

impl Location {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: Arc::new(RwLock::new(href.into())),
        }
    }

    pub fn href(&self) -> String {
        self.href.read().clone()
    }

    pub fn set(&self, href: impl Into<String>) {
        *self.href.write() = href.into();
    }

    /// Path component of the href. Relative hrefs are accepted as-is, minus
    /// any query or fragment.
    pub fn pathname(&self) -> String {
        pathname_of(&self.href.read())
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new("/")
    }
}

pub(crate) fn pathname_of(href: &str) -> String {
    match url::Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => {
            let path = href.split(['?', '#']).next().unwrap_or_default();
            if path.is_empty() {
                "/".to_string()
            } else {
                path.to_string()
            }
        }
    }
}
