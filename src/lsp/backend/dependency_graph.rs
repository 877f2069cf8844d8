//! Import dependency graph between `.ump` files
//!
//! - **Forward edges**: `file A → files that A imports with use`
//! - **Reverse edges**: `file B → files that import B` (for re-validation)
//!
//! When a file changes, every open document that transitively imports it has
//! stale diagnostics. [`DependencyGraph::get_dependents`] walks the reverse
//! edges to find them.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tracing::{debug, trace};

#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    /// file → set of files it imports
    forward: Arc<DashMap<PathBuf, Arc<DashSet<PathBuf>>>>,

    /// file → set of files importing it
    reverse: Arc<DashMap<PathBuf, Arc<DashSet<PathBuf>>>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent` imports `dependency`
    pub fn add_dependency(&self, dependent: PathBuf, dependency: PathBuf) {
        self.forward
            .entry(dependent.clone())
            .or_insert_with(|| Arc::new(DashSet::new()))
            .insert(dependency.clone());
        self.reverse
            .entry(dependency.clone())
            .or_insert_with(|| Arc::new(DashSet::new()))
            .insert(dependent.clone());
        trace!("Added dependency: {} → {}", dependent.display(), dependency.display());
    }

    /// Replace the direct imports of `file`
    pub fn set_dependencies(&self, file: &Path, dependencies: impl IntoIterator<Item = PathBuf>) {
        self.clear_forward_edges(file);
        for dependency in dependencies {
            if dependency != file {
                self.add_dependency(file.to_path_buf(), dependency);
            }
        }
    }

    /// All files that transitively import `file`, excluding `file` itself
    pub fn get_dependents(&self, file: &Path) -> HashSet<PathBuf> {
        let mut dependents = HashSet::new();
        let mut queue = VecDeque::from([file.to_path_buf()]);

        while let Some(current) = queue.pop_front() {
            let Some(direct) = self.reverse.get(&current).map(|set| Arc::clone(set.value())) else {
                continue;
            };
            for dependent in direct.iter() {
                if dependent.as_path() != file && dependents.insert(dependent.clone()) {
                    queue.push_back(dependent.clone());
                }
            }
        }

        debug!("Found {} dependent(s) of {}", dependents.len(), file.display());
        dependents
    }

    /// Direct imports of `file`
    pub fn get_dependencies(&self, file: &Path) -> HashSet<PathBuf> {
        self.forward
            .get(file)
            .map(|set| set.iter().map(|path| path.clone()).collect())
            .unwrap_or_default()
    }

    /// Forget `file` and every edge touching it
    pub fn remove_file(&self, file: &Path) {
        self.clear_forward_edges(file);
        if let Some((_, dependents)) = self.reverse.remove(file) {
            for dependent in dependents.iter() {
                if let Some(deps) = self.forward.get(dependent.key()) {
                    deps.remove(file);
                }
            }
        }
    }

    pub fn file_count(&self) -> usize {
        let mut files: HashSet<PathBuf> = self.forward.iter().map(|e| e.key().clone()).collect();
        files.extend(self.reverse.iter().map(|e| e.key().clone()));
        files.len()
    }

    pub fn clear(&self) {
        self.forward.clear();
        self.reverse.clear();
    }

    fn clear_forward_edges(&self, file: &Path) {
        let Some((_, dependencies)) = self.forward.remove(file) else {
            return;
        };
        for dependency in dependencies.iter() {
            let now_empty = match self.reverse.get(dependency.key()) {
                Some(dependents) => {
                    dependents.remove(file);
                    dependents.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.reverse.remove_if(dependency.key(), |_, set| set.is_empty());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(name: &str) -> PathBuf {
        PathBuf::from(format!("/ws/{}", name))
    }

    #[test]
    fn test_transitive_dependents() {
        let graph = DependencyGraph::new();
        // A imports B, B imports C
        graph.add_dependency(p("A.ump"), p("B.ump"));
        graph.add_dependency(p("B.ump"), p("C.ump"));

        let dependents = graph.get_dependents(&p("C.ump"));
        assert_eq!(dependents, HashSet::from([p("A.ump"), p("B.ump")]));
        assert!(graph.get_dependents(&p("A.ump")).is_empty());
    }

    #[test]
    fn test_cycle_terminates() {
        let graph = DependencyGraph::new();
        graph.add_dependency(p("A.ump"), p("B.ump"));
        graph.add_dependency(p("B.ump"), p("A.ump"));

        assert_eq!(graph.get_dependents(&p("A.ump")), HashSet::from([p("B.ump")]));
    }

    #[test]
    fn test_set_dependencies_replaces_edges() {
        let graph = DependencyGraph::new();
        graph.set_dependencies(&p("A.ump"), [p("B.ump"), p("C.ump")]);
        graph.set_dependencies(&p("A.ump"), [p("C.ump")]);

        assert_eq!(graph.get_dependencies(&p("A.ump")), HashSet::from([p("C.ump")]));
        assert!(graph.get_dependents(&p("B.ump")).is_empty());
        assert_eq!(graph.get_dependents(&p("C.ump")), HashSet::from([p("A.ump")]));
    }

    #[test]
    fn test_remove_file() {
        let graph = DependencyGraph::new();
        graph.add_dependency(p("A.ump"), p("B.ump"));
        graph.add_dependency(p("B.ump"), p("C.ump"));
        graph.remove_file(&p("B.ump"));

        assert!(graph.get_dependencies(&p("A.ump")).is_empty());
        assert!(graph.get_dependents(&p("C.ump")).is_empty());

        graph.clear();
        assert_eq!(graph.file_count(), 0);
    }
}
