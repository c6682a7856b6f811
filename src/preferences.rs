//! User preferences: homepage and media blocking flag.
//!
//! Thin typed layer over a [`KeyValueStore`]. A missing or mistyped value
//! reads as the default; saving returns the store error so the caller can
//! decide whether to report it.

use std::sync::Arc;

use toml::Value;
use tracing::info;

use crate::store::{KeyValueStore, StoreError};

pub const DEFAULT_HOMEPAGE: &str = "https://lite.duckduckgo.com";

const KEY_HOMEPAGE: &str = "homepage_url";
const KEY_MEDIA_BLOCKING: &str = "media_blocking_enabled";

pub struct Preferences<S> {
    store: Arc<S>,
    default_homepage: String,
    default_media_blocking: bool,
}

impl<S: KeyValueStore> Preferences<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_defaults(store, DEFAULT_HOMEPAGE, true)
    }

    /// Preferences whose unsaved values come from the configuration.
    pub fn with_defaults(store: Arc<S>, homepage: &str, media_blocking: bool) -> Self {
        Self {
            store,
            default_homepage: homepage.to_string(),
            default_media_blocking: media_blocking,
        }
    }

    pub fn load_homepage(&self) -> String {
        self.store
            .get_string(KEY_HOMEPAGE)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.default_homepage.clone())
    }

    pub fn save_homepage(&self, url: &str) -> Result<(), StoreError> {
        self.store.put(KEY_HOMEPAGE, Value::from(url))?;
        info!(url, "Homepage saved");
        Ok(())
    }

    pub fn is_media_blocking_enabled(&self) -> bool {
        self.store
            .get_bool(KEY_MEDIA_BLOCKING)
            .unwrap_or(self.default_media_blocking)
    }

    pub fn save_media_blocking(&self, enabled: bool) -> Result<(), StoreError> {
        self.store.put(KEY_MEDIA_BLOCKING, Value::from(enabled))
    }
}
