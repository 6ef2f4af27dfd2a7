//! Asset URL resolution
//!
//! Slides reference library media as `assets://<relative path>` (or the odd
//! `file://` URL from older documents). The projector can only load URLs
//! served through the `local-image://` protocol, so references are rewritten
//! against the open library before a snapshot leaves the process.

use std::collections::HashMap;
use tracing::debug;

const ASSETS_SCHEME: &str = "assets://";
const FILE_SCHEME: &str = "file://";
const LOCAL_SCHEME: &str = "local-image://";

/// Turns a slide's asset reference into a servable URL
pub trait AssetResolver: Send {
    /// Resolve `url` against `library_root`. Unresolvable input is returned unchanged.
    fn resolve(&mut self, library_root: Option<&str>, url: &str) -> String;

    /// Forget anything cached (called when the library changes)
    fn clear_cache(&mut self) {}
}

/// Resolver for the on-disk `.dclib` library layout, with a per-root cache
#[derive(Debug, Default)]
pub struct LibraryAssetResolver {
    cache: HashMap<String, String>,
}

impl LibraryAssetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve_uncached(library_root: &str, url: &str) -> Option<String> {
        if let Some(relative) = url.strip_prefix(ASSETS_SCHEME) {
            let root = library_root.trim_end_matches('/');
            let relative = relative.trim_start_matches('/');
            return Some(format!("{}{}/assets/{}", LOCAL_SCHEME, root, relative));
        }
        url.strip_prefix(FILE_SCHEME)
            .map(|path| format!("{}{}", LOCAL_SCHEME, path))
    }
}

impl AssetResolver for LibraryAssetResolver {
    fn resolve(&mut self, library_root: Option<&str>, url: &str) -> String {
        if url.starts_with(LOCAL_SCHEME) {
            return url.to_string();
        }
        if !url.starts_with(ASSETS_SCHEME) && !url.starts_with(FILE_SCHEME) {
            return url.to_string();
        }
        let Some(root) = library_root else {
            debug!("Cannot resolve {} without an open library", url);
            return url.to_string();
        };

        let key = format!("{}::{}", root, url);
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }

        let resolved = Self::resolve_uncached(root, url).unwrap_or_else(|| url.to_string());
        self.cache.insert(key, resolved.clone());
        resolved
    }

    fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
