//! Per-file parse tree cache gated by content hash
//!
//! Every indexed file keeps the hash and text it was last parsed from along with
//! the resulting green tree. Re-indexing identical content is a hash lookup and
//! a string comparison; only changed content is parsed again.
//!
//! ## Cache Strategy
//!
//! - **Key**: Absolute file path
//! - **Value**: (content hash, content, green tree); the content guards against
//!   hash collisions
//! - **Invalidation**: Explicit (`invalidate`) or implicit on content change

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use rowan::GreenNode;
use rustc_hash::FxHasher;
use tracing::trace;

use super::umple::{self, SyntaxNode};

#[derive(Debug, Clone)]
struct CachedTree {
    hash: u64,
    content: Arc<str>,
    green: GreenNode,
}

/// Cache of parse trees for indexed files
#[derive(Debug, Default)]
pub struct ParseCache {
    /// Maps file path -> last parsed content and tree
    entries: DashMap<PathBuf, CachedTree>,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes a fast, non-cryptographic hash of the content
    fn hash_content(content: &str) -> u64 {
        let mut hasher = FxHasher::default();
        content.hash(&mut hasher);
        hasher.finish()
    }

    /// Returns true if `content` is exactly what `path` was last parsed from
    pub fn is_current(&self, path: &Path, content: &str) -> bool {
        let hash = Self::hash_content(content);
        self.entries
            .get(path)
            .map(|entry| entry.hash == hash && &*entry.content == content)
            .unwrap_or(false)
    }

    /// Parses and stores `content` for `path` unless it is unchanged.
    ///
    /// # Returns
    /// `Some(root)` with the fresh tree when the content changed (or was never
    /// seen), `None` when the cached tree is still current.
    pub fn update(&self, path: &Path, content: &str) -> Option<SyntaxNode> {
        if self.is_current(path, content) {
            trace!("Parse cache hit for {}", path.display());
            return None;
        }

        let parse = umple::parse(content);
        trace!(
            "Parsed {} ({} bytes, {} syntax errors)",
            path.display(),
            content.len(),
            parse.errors.len()
        );
        let root = parse.syntax();
        self.entries.insert(
            path.to_path_buf(),
            CachedTree {
                hash: Self::hash_content(content),
                content: Arc::from(content),
                green: parse.green,
            },
        );
        Some(root)
    }

    /// Tree for `content`, reusing the cached one when it matches
    pub fn tree_for(&self, path: &Path, content: &str) -> SyntaxNode {
        if self.is_current(path, content) {
            if let Some(entry) = self.entries.get(path) {
                return SyntaxNode::new_root(entry.green.clone());
            }
        }
        self.update(path, content)
            .unwrap_or_else(|| umple::parse(content).syntax())
    }

    /// Last tree parsed for `path`
    pub fn get(&self, path: &Path) -> Option<SyntaxNode> {
        self.entries
            .get(path)
            .map(|entry| SyntaxNode::new_root(entry.green.clone()))
    }

    /// Forgets `path`; the next update parses again
    pub fn invalidate(&self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_is_hash_gated() {
        let cache = ParseCache::new();
        let path = Path::new("/ws/A.ump");

        assert!(cache.update(path, "class A {}").is_some());
        assert!(cache.update(path, "class A {}").is_none());
        assert!(cache.update(path, "class A { x; }").is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_tree_for_reuses_current_tree() {
        let cache = ParseCache::new();
        let path = Path::new("/ws/A.ump");
        cache.update(path, "class A {}");

        let tree = cache.tree_for(path, "class A {}");
        assert_eq!(tree.text().to_string(), "class A {}");

        let tree = cache.tree_for(path, "class B {}");
        assert_eq!(tree.text().to_string(), "class B {}");
        assert!(cache.is_current(path, "class B {}"));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = ParseCache::new();
        cache.update(Path::new("/ws/A.ump"), "class A {}");
        cache.update(Path::new("/ws/B.ump"), "class B {}");

        cache.invalidate(Path::new("/ws/A.ump"));
        assert!(cache.get(Path::new("/ws/A.ump")).is_none());
        assert!(cache.update(Path::new("/ws/A.ump"), "class A {}").is_some());

        cache.clear();
        assert!(cache.is_empty());
    }
}
