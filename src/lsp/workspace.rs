//! Workspace facade
//!
//! Ties the open documents, the symbol index, the import graph and the
//! validator together. Every lookup first indexes the document and the files
//! it can reach through `use`, and answers only from those files.
//!
//! ```text
//! completion_at / definition_at
//!       ↓
//! collect_reachable_files (overlays first, then disk)
//!       ↓
//! SymbolIndex::index_file for the document + reachable files
//!       ↓
//! completion context / reference resolution, scoped to reachable files
//! ```
//!
//! Validation runs the configured provider against a [`ShadowWorkspace`] and
//! remaps its records onto the document. A result is only returned while it is
//! still current for the requested version.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use ropey::Rope;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{CompletionItem, Diagnostic, DocumentSymbol, TextDocumentContentChangeEvent, Url};
use tracing::{debug, trace, warn};

use crate::lsp::backend::dependency_graph::DependencyGraph;
use crate::lsp::diagnostic_provider::{DiagnosticProvider, ValidatorError};
use crate::lsp::diagnostic_remapper::remap_diagnostics;
use crate::lsp::document::{DocumentError, UmpleDocument};
use crate::lsp::features::completion::{completion_info, completion_items};
use crate::lsp::features::goto_definition::{find_definitions, import_target_at};
use crate::lsp::features::symbols::document_symbols;
use crate::lsp::imports::{
    Overlays, build_import_map, collect_reachable_files, file_imports, normalize_path, read_source, resolve_import,
};
use crate::lsp::models::{CompletionInfo, SymbolEntry};
use crate::lsp::shadow_workspace::ShadowWorkspace;
use crate::lsp::symbol_index::SymbolIndex;
use crate::parsers::position_utils::{byte_offset, offset_to_text_size};
use crate::parsers::umple;

/// Shared state behind the language server
pub struct UmpleWorkspace {
    index: RwLock<SymbolIndex>,
    graph: DependencyGraph,
    documents: DashMap<PathBuf, Arc<UmpleDocument>>,
    provider: RwLock<Option<Arc<dyn DiagnosticProvider>>>,
}

impl std::fmt::Debug for UmpleWorkspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UmpleWorkspace")
            .field(
                "provider",
                &self.provider.read().as_ref().map(|provider| provider.backend_name()),
            )
            .field("documents", &self.documents.len())
            .finish()
    }
}

impl Default for UmpleWorkspace {
    fn default() -> Self {
        Self::new(None)
    }
}

impl UmpleWorkspace {
    pub fn new(provider: Option<Arc<dyn DiagnosticProvider>>) -> Self {
        Self {
            index: RwLock::new(SymbolIndex::new()),
            graph: DependencyGraph::new(),
            documents: DashMap::new(),
            provider: RwLock::new(provider),
        }
    }

    pub fn set_provider(&self, provider: Option<Arc<dyn DiagnosticProvider>>) {
        *self.provider.write() = provider;
    }

    pub fn has_provider(&self) -> bool {
        self.provider.read().is_some()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Run `f` against the symbol index
    pub fn with_index<R>(&self, f: impl FnOnce(&SymbolIndex) -> R) -> R {
        f(&self.index.read())
    }

    // Documents

    pub fn open_document(&self, uri: Url, path: &Path, text: &str, version: i32) -> Arc<UmpleDocument> {
        let path = normalize_path(path);
        let document = Arc::new(UmpleDocument::new(uri, path.clone(), text, version));
        self.documents.insert(path.clone(), Arc::clone(&document));
        self.index.write().index_file(&path, text);
        self.record_imports(&path, text);
        debug!("Opened {} (version {})", path.display(), version);
        document
    }

    pub fn change_document(
        &self,
        path: &Path,
        changes: &[TextDocumentContentChangeEvent],
        version: i32,
    ) -> Option<Result<Arc<UmpleDocument>, DocumentError>> {
        let path = normalize_path(path);
        let document = self.document(&path)?;
        Some(document.apply(changes, version).map(|text| {
            self.index.write().index_file(&path, &text);
            self.record_imports(&path, &text);
            document
        }))
    }

    pub fn document(&self, path: &Path) -> Option<Arc<UmpleDocument>> {
        self.documents
            .get(&normalize_path(path))
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn open_documents(&self) -> Vec<Arc<UmpleDocument>> {
        self.documents.iter().map(|entry| Arc::clone(entry.value())).collect()
    }

    /// Stop tracking `path`. Its symbols fall back to the saved file, or are
    /// dropped when there is none.
    pub async fn close_document(&self, path: &Path) -> Option<Arc<UmpleDocument>> {
        let path = normalize_path(path);
        let (_, document) = self.documents.remove(&path)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                self.index.write().index_file(&path, &text);
                self.record_imports(&path, &text);
            }
            Err(_) => {
                self.index.write().remove_file(&path);
                self.graph.remove_file(&path);
            }
        }
        debug!("Closed {}", path.display());
        Some(document)
    }

    /// Unsaved text of every open document
    pub fn overlays(&self) -> Overlays {
        self.documents
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().text()))
            .collect()
    }

    /// Whether `version` is still the latest version of the open `path`
    pub fn is_current(&self, path: &Path, version: i32) -> bool {
        self.document(path)
            .map(|document| document.version() == version)
            .unwrap_or(false)
    }

    /// Open documents that transitively import `path`
    pub fn open_dependents(&self, path: &Path) -> Vec<Arc<UmpleDocument>> {
        self.graph
            .get_dependents(&normalize_path(path))
            .iter()
            .filter_map(|dependent| self.document(dependent))
            .collect()
    }

    fn record_imports(&self, path: &Path, text: &str) {
        let Some(dir) = path.parent() else {
            return;
        };
        let dependencies: Vec<PathBuf> = file_imports(text)
            .into_iter()
            .map(|(target, _)| resolve_import(dir, &target))
            .collect();
        self.graph.set_dependencies(path, dependencies);
    }

    // Lookups

    /// Index `document` and every file it can reach.
    ///
    /// Returns the lookup scope: the reachable files plus the document.
    pub async fn index_reachable(&self, document: &Path, content: &str) -> HashSet<PathBuf> {
        let document = normalize_path(document);
        let overlays = self.overlays();
        let mut scope = collect_reachable_files(&document, content, &overlays).await;

        let mut sources = vec![(document.clone(), content.to_string())];
        for file in scope.iter().filter(|file| **file != document) {
            if let Some(text) = read_source(file, &overlays).await {
                sources.push((file.clone(), text));
            }
        }

        let changed = {
            let mut index = self.index.write();
            sources
                .iter()
                .filter(|(path, text)| index.index_file(path, text))
                .count()
        };
        for (path, text) in &sources {
            self.record_imports(path, text);
        }
        trace!(
            "Indexed {} of {} file(s) reachable from {}",
            changed,
            sources.len(),
            document.display()
        );

        scope.insert(document);
        scope
    }

    /// Completion context at `(line, col)`
    pub async fn completion_at(&self, document: &Path, text: &str, line: usize, col: usize) -> CompletionInfo {
        self.index_reachable(document, text).await;
        completion_info(text, line, col)
    }

    /// Completion items at `(line, col)`, drawn from the reachable files
    pub async fn completion_items_at(
        &self,
        document: &Path,
        text: &str,
        line: usize,
        col: usize,
    ) -> Vec<CompletionItem> {
        let scope = self.index_reachable(document, text).await;
        let info = completion_info(text, line, col);
        let index = self.index.read();
        completion_items(&info, &index, document, Some(&scope))
    }

    /// Definitions of the identifier at `(line, col)`
    pub async fn definition_at(&self, document: &Path, text: &str, line: usize, col: usize) -> Vec<SymbolEntry> {
        let document = normalize_path(document);
        let scope = self.index_reachable(&document, text).await;
        let offset = byte_offset(&Rope::from_str(text), line, col);

        let index = self.index.read();
        let Some(root) = index.tree(&document) else {
            return Vec::new();
        };
        find_definitions(&index, &root, offset_to_text_size(offset), Some(&scope))
    }

    /// File named by a `use` path at `(line, col)`
    pub fn import_target(&self, document: &Path, text: &str, line: usize, col: usize) -> Option<PathBuf> {
        let root = umple::parse(text).syntax();
        let offset = byte_offset(&Rope::from_str(text), line, col);
        import_target_at(&root, offset_to_text_size(offset), document)
    }

    /// Outline of `text`
    pub fn document_symbols(&self, document: &Path, text: &str) -> Vec<DocumentSymbol> {
        let document = normalize_path(document);
        let mut index = self.index.write();
        index.index_file(&document, text);
        index
            .tree(&document)
            .map(|root| document_symbols(&root))
            .unwrap_or_default()
    }

    // Validation

    /// Validate `text` as version `version` of `document`.
    ///
    /// `Ok(None)` means the result must not be published: validation is off,
    /// `token` was cancelled, or the document moved past `version`.
    pub async fn validate(
        &self,
        document: &Path,
        text: &str,
        version: i32,
        token: &CancellationToken,
    ) -> Result<Option<Vec<Diagnostic>>, ValidatorError> {
        let Some(provider) = self.provider.read().clone() else {
            trace!("No diagnostic provider; skipping {}", document.display());
            return Ok(None);
        };
        let document = normalize_path(document);
        let overlays = self.overlays();

        let reachable = collect_reachable_files(&document, text, &overlays).await;
        let import_map = build_import_map(&document, text, &overlays).await;
        if token.is_cancelled() {
            return Ok(None);
        }

        let shadow = match ShadowWorkspace::create(&document, text, &reachable, &overlays, token).await {
            Ok(shadow) => shadow,
            Err(ValidatorError::Cancelled) => return Ok(None),
            Err(e) => return Err(e),
        };
        let shadow_paths = shadow.paths();
        let result = provider.validate(shadow.target_file(), token).await;
        if let Err(e) = shadow.cleanup() {
            warn!("Failed to remove shadow workspace: {}", e);
        }

        let raw = match result {
            Ok(raw) => raw,
            Err(ValidatorError::Cancelled) => return Ok(None),
            Err(e) => return Err(e),
        };

        // No awaits past this point: an edit can only land before the check
        if token.is_cancelled() || !self.is_current(&document, version) {
            debug!("Discarding stale validation of {} (version {})", document.display(), version);
            return Ok(None);
        }
        let diagnostics = remap_diagnostics(&raw, text, &document, &import_map, Some(&shadow_paths));
        debug!(
            "{} diagnostic(s) for {} (version {}) from {}",
            diagnostics.len(),
            document.display(),
            version,
            provider.backend_name()
        );
        Ok(Some(diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::fs;

    fn uri(path: &Path) -> Url {
        Url::from_file_path(path).unwrap()
    }

    #[tokio::test]
    async fn test_definition_scoped_to_reachable_files() {
        let dir = tempfile::tempdir().unwrap();
        let shared = dir.path().join("Shared.ump");
        let unrelated = dir.path().join("Other.ump");
        fs::write(&shared, "class Person { name; }").unwrap();
        let workspace = UmpleWorkspace::default();
        // Known to the index but not imported by the document
        workspace.open_document(uri(&unrelated), &unrelated, "class Person {}", 1);

        let document = dir.path().join("Main.ump");
        let text = indoc! {"
            use Shared.ump;
            class Student {
              isA Person;
            }
        "};
        let found = workspace.definition_at(&document, text, 2, 7).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file, normalize_path(&shared));
    }

    #[tokio::test]
    async fn test_open_dependents_follow_imports() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("A.ump");
        let b = dir.path().join("B.ump");
        let workspace = UmpleWorkspace::default();
        workspace.open_document(uri(&a), &a, "use B.ump;", 1);
        workspace.open_document(uri(&b), &b, "class B {}", 1);

        let dependents = workspace.open_dependents(&b);
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].path(), normalize_path(&a));
        assert!(workspace.open_dependents(&a).is_empty());
    }

    #[tokio::test]
    async fn test_validate_without_provider_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("A.ump");
        let workspace = UmpleWorkspace::default();
        workspace.open_document(uri(&a), &a, "class A {}", 1);
        let result = workspace
            .validate(&a, "class A {}", 1, &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_close_falls_back_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("A.ump");
        fs::write(&a, "class Saved {}").unwrap();
        let workspace = UmpleWorkspace::default();
        workspace.open_document(uri(&a), &a, "class Unsaved {}", 1);
        workspace.close_document(&a).await.unwrap();

        let names: Vec<String> = workspace.with_index(|index| {
            index
                .file_symbols(&normalize_path(&a))
                .iter()
                .map(|entry| entry.name.clone())
                .collect()
        });
        assert_eq!(names, vec!["Saved".to_string()]);
        assert!(!workspace.is_current(&a, 1));
    }
}
