//! Cross-file symbol index
//!
//! Holds every indexed file's definitions twice: per file (so a file's
//! contribution can be retracted wholesale) and per container name (so lookups
//! by owner are a single bucket read). Containers merge across files by name,
//! which is how Umple mixins and split class fragments compose.
//!
//! Inheritance is kept the same way: per-file `isA` maps plus a merged graph
//! rebuilt for the affected classes whenever a file changes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::lsp::features::symbols::{extract_isa, extract_symbols};
use crate::lsp::models::{SymbolEntry, SymbolKind};
use crate::parsers::ParseCache;
use crate::parsers::umple::SyntaxNode;

/// Injectable index of all symbols seen so far
#[derive(Debug, Default)]
pub struct SymbolIndex {
    cache: ParseCache,
    /// container name -> entries from every file
    containers: HashMap<String, Vec<SymbolEntry>>,
    /// file -> entries it contributed
    file_symbols: HashMap<PathBuf, Vec<SymbolEntry>>,
    /// file -> its own `isA` edges
    file_isa: HashMap<PathBuf, HashMap<String, Vec<String>>>,
    /// merged `isA` graph
    isa: HashMap<String, Vec<String>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `content` as the current text of `path`.
    ///
    /// Returns `false` without parsing when the content hash is unchanged.
    /// Otherwise the file's previous symbols and `isA` edges are replaced and
    /// `true` is returned. Both steps happen under `&mut self`, so readers never
    /// see the file half indexed.
    pub fn index_file(&mut self, path: &Path, content: &str) -> bool {
        let Some(root) = self.cache.update(path, content) else {
            return false;
        };
        self.retract(path);
        self.insert(path, &root);
        true
    }

    /// Drop everything `path` contributed
    pub fn remove_file(&mut self, path: &Path) {
        self.retract(path);
        self.cache.invalidate(path);
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.containers.clear();
        self.file_symbols.clear();
        self.file_isa.clear();
        self.isa.clear();
    }

    /// Parse tree last indexed for `path`
    pub fn tree(&self, path: &Path) -> Option<SyntaxNode> {
        self.cache.get(path)
    }

    pub fn is_indexed(&self, path: &Path) -> bool {
        self.file_symbols.contains_key(path)
    }

    pub fn indexed_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.file_symbols.keys()
    }

    fn insert(&mut self, path: &Path, root: &SyntaxNode) {
        let symbols = extract_symbols(path, root);
        for symbol in &symbols {
            if let Some(container) = &symbol.container {
                self.containers
                    .entry(container.clone())
                    .or_default()
                    .push(symbol.clone());
            }
        }

        let isa = extract_isa(root);
        for (class, parents) in &isa {
            let merged = self.isa.entry(class.clone()).or_default();
            for parent in parents {
                if !merged.contains(parent) {
                    merged.push(parent.clone());
                }
            }
        }

        debug!(
            "Indexed {}: {} symbols, {} isA entries",
            path.display(),
            symbols.len(),
            isa.len()
        );
        self.file_symbols.insert(path.to_path_buf(), symbols);
        self.file_isa.insert(path.to_path_buf(), isa);
    }

    fn retract(&mut self, path: &Path) {
        if let Some(symbols) = self.file_symbols.remove(path) {
            let containers: HashSet<&String> =
                symbols.iter().filter_map(|s| s.container.as_ref()).collect();
            for container in containers {
                if let Some(bucket) = self.containers.get_mut(container) {
                    bucket.retain(|entry| entry.file != path);
                    if bucket.is_empty() {
                        self.containers.remove(container);
                    }
                }
            }
        }

        if let Some(isa) = self.file_isa.remove(path) {
            for class in isa.keys() {
                let mut merged: Vec<String> = Vec::new();
                for parents in self.file_isa.values().filter_map(|m| m.get(class)) {
                    for parent in parents {
                        if !merged.contains(parent) {
                            merged.push(parent.clone());
                        }
                    }
                }
                if merged.is_empty() {
                    self.isa.remove(class);
                } else {
                    self.isa.insert(class.clone(), merged);
                }
            }
        }
        trace!("Retracted {}", path.display());
    }

    /// Direct parents of `class`
    pub fn parents(&self, class: &str) -> &[String] {
        self.isa.get(class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `class` followed by all its ancestors, breadth first; cycles are cut
    pub fn lineage(&self, class: &str) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(class);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current.to_string());
            for parent in self.parents(current) {
                queue.push_back(parent);
            }
        }
        order
    }

    /// Entries registered under `container`
    pub fn container_symbols(&self, container: &str) -> &[SymbolEntry] {
        self.containers
            .get(container)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Find definitions named `name` with one of `kinds`.
    ///
    /// With a container only that container is searched, plus every ancestor
    /// container when `inherited` is set. Without one, all files are searched.
    /// All matches are returned; a name shadowed further down the hierarchy
    /// does not hide the inherited one.
    pub fn lookup(
        &self,
        name: &str,
        kinds: &[SymbolKind],
        container: Option<&str>,
        inherited: bool,
    ) -> Vec<SymbolEntry> {
        let matches = |entry: &&SymbolEntry| entry.name == name && kinds.contains(&entry.kind);
        match container {
            Some(container) => {
                let owners = if inherited {
                    self.lineage(container)
                } else {
                    vec![container.to_string()]
                };
                owners
                    .iter()
                    .flat_map(|owner| self.container_symbols(owner).iter())
                    .filter(matches)
                    .cloned()
                    .collect()
            }
            None => self
                .file_symbols
                .values()
                .flatten()
                .filter(matches)
                .cloned()
                .collect(),
        }
    }

    /// Every symbol of one of `kinds`, optionally limited to `files`
    pub fn symbols_of_kind(&self, kinds: &[SymbolKind], files: Option<&HashSet<PathBuf>>) -> Vec<SymbolEntry> {
        self.file_symbols
            .iter()
            .filter(|(file, _)| files.map(|f| f.contains(*file)).unwrap_or(true))
            .flat_map(|(_, symbols)| symbols.iter())
            .filter(|entry| kinds.contains(&entry.kind))
            .cloned()
            .collect()
    }

    /// Symbols defined in one file, in document order
    pub fn file_symbols(&self, path: &Path) -> &[SymbolEntry] {
        self.file_symbols
            .get(path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(name: &str) -> PathBuf {
        PathBuf::from(format!("/ws/{}", name))
    }

    #[test]
    fn test_index_file_is_idempotent() {
        let mut index = SymbolIndex::new();
        assert!(index.index_file(&path("A.ump"), "class A { x; }"));
        assert!(!index.index_file(&path("A.ump"), "class A { x; }"));
        assert_eq!(index.lookup("x", &[SymbolKind::Attribute], Some("A"), false).len(), 1);
    }

    #[test]
    fn test_reindex_replaces_contribution() {
        let mut index = SymbolIndex::new();
        index.index_file(&path("A.ump"), "class A { x; }");
        index.index_file(&path("A.ump"), "class A { y; }");

        assert!(index.lookup("x", &[SymbolKind::Attribute], Some("A"), false).is_empty());
        assert_eq!(index.lookup("y", &[SymbolKind::Attribute], Some("A"), false).len(), 1);
    }

    #[test]
    fn test_containers_merge_across_files() {
        let mut index = SymbolIndex::new();
        index.index_file(&path("A.ump"), "class A { x; }");
        index.index_file(&path("A2.ump"), "class A { y; }");
        assert_eq!(index.container_symbols("A").len(), 4);

        index.remove_file(&path("A2.ump"));
        let names: Vec<&str> = index.container_symbols("A").iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "x"]);
    }

    #[test]
    fn test_empty_buckets_are_deleted() {
        let mut index = SymbolIndex::new();
        index.index_file(&path("A.ump"), "class A { x; }");
        index.remove_file(&path("A.ump"));
        assert!(index.container_symbols("A").is_empty());
        assert!(index.containers.is_empty());
        assert!(!index.is_indexed(&path("A.ump")));
    }

    #[test]
    fn test_isa_is_retracted_per_file() {
        let mut index = SymbolIndex::new();
        index.index_file(&path("A.ump"), "class A { isA B; }");
        index.index_file(&path("A2.ump"), "class A { isA C; }");
        assert_eq!(index.parents("A"), &["B".to_string(), "C".to_string()]);

        index.index_file(&path("A2.ump"), "class A { }");
        assert_eq!(index.parents("A"), &["B".to_string()]);

        index.remove_file(&path("A.ump"));
        assert!(index.parents("A").is_empty());
    }

    #[test]
    fn test_inherited_lookup_returns_all_matches() {
        let mut index = SymbolIndex::new();
        index.index_file(&path("m.ump"), "class Base { name; }\nclass Mid { isA Base; name; }\nclass Leaf { isA Mid; }");

        let found = index.lookup("name", &[SymbolKind::Attribute], Some("Leaf"), true);
        let owners: Vec<&str> = found.iter().filter_map(|s| s.container.as_deref()).collect();
        assert_eq!(owners, vec!["Mid", "Base"]);

        assert!(index.lookup("name", &[SymbolKind::Attribute], Some("Leaf"), false).is_empty());
    }

    #[test]
    fn test_inheritance_cycle_terminates() {
        let mut index = SymbolIndex::new();
        index.index_file(&path("c.ump"), "class A { isA B; a; }\nclass B { isA A; b; }");

        assert_eq!(index.lineage("A"), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(index.lookup("b", &[SymbolKind::Attribute], Some("A"), true).len(), 1);
        assert!(index.lookup("zzz", &[SymbolKind::Attribute], Some("A"), true).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut index = SymbolIndex::new();
        index.index_file(&path("A.ump"), "class A { isA B; }");
        index.clear();
        assert!(index.parents("A").is_empty());
        assert!(index.container_symbols("A").is_empty());
        assert!(index.index_file(&path("A.ump"), "class A { isA B; }"));
    }
}
