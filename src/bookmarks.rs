//! Bookmark list.
//!
//! Stored as one array under a single store key, newest first, unique by URL.
//! A list that cannot be decoded reads as empty.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use toml::Value;
use tracing::warn;

use crate::store::{KeyValueStore, StoreError};

const KEY_BOOKMARKS: &str = "bookmarks_list";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub title: String,
    pub url: String,
}

impl Bookmark {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

pub struct BookmarkManager<S> {
    store: Arc<S>,
}

impl<S: KeyValueStore> BookmarkManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Vec<Bookmark> {
        let Some(value) = self.store.get(KEY_BOOKMARKS) else {
            return Vec::new();
        };
        value.try_into().unwrap_or_else(|e| {
            warn!(error = %e, "Unreadable bookmark list, treating as empty");
            Vec::new()
        })
    }

    /// Adds at the top. Returns `false` if the URL is already bookmarked.
    pub fn add(&self, bookmark: Bookmark) -> Result<bool, StoreError> {
        let mut bookmarks = self.list();
        if bookmarks.iter().any(|b| b.url == bookmark.url) {
            return Ok(false);
        }
        bookmarks.insert(0, bookmark);
        self.save(&bookmarks)?;
        Ok(true)
    }

    /// Removes every bookmark with this URL. Returns `false` if none matched.
    pub fn delete(&self, url: &str) -> Result<bool, StoreError> {
        let mut bookmarks = self.list();
        let before = bookmarks.len();
        bookmarks.retain(|b| b.url != url);
        if bookmarks.len() == before {
            return Ok(false);
        }
        self.save(&bookmarks)?;
        Ok(true)
    }

    fn save(&self, bookmarks: &[Bookmark]) -> Result<(), StoreError> {
        self.store.put(KEY_BOOKMARKS, Value::try_from(bookmarks)?)
    }
}
