//! Cookie storage keyed by session, one cookie string per key.

use std::collections::HashMap;

/// Maps a session key to the cookie header value replayed for it.
///
/// Cookie strings are stored verbatim, no parsing or merging: a later
/// `set` for the same key unconditionally replaces the earlier value.
/// Not synchronized; callers sharing a jar across tasks wrap it in a
/// mutex.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    entries: HashMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }

    pub fn set(&mut self, key: &str, cookie: &str) {
        self.entries.insert(key.to_string(), cookie.to_string());
    }

    pub fn delete(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
