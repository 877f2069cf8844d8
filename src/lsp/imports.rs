//! Import reachability
//!
//! Follows file-valued `use` statements (`use lib/Shared.ump;`) from a document
//! to every file it transitively pulls in. Mixset `use` statements name
//! constructs, not files, and are ignored here.
//!
//! Open documents are read from their in-memory overlay, everything else from
//! disk. Targets that cannot be read are skipped.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};

use ropey::Rope;
use tracing::{debug, trace};

use crate::parsers::position_utils::byte_offset_to_position;
use crate::parsers::umple::{self, SyntaxKind};

/// Unsaved editor content by absolute path
pub type Overlays = HashMap<PathBuf, String>;

/// Imported file (absolute, normalized) → line of the document's `use`
/// statement that pulls it in
pub type ImportMap = HashMap<PathBuf, u32>;

/// Lexically normalize a path: drop `.` and fold `..` into its parent
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Absolute, normalized path of a `use` target written in a file under `dir`
pub fn resolve_import(dir: &Path, target: &str) -> PathBuf {
    let target = Path::new(target);
    if target.is_absolute() {
        normalize_path(target)
    } else {
        normalize_path(&dir.join(target))
    }
}

/// File-valued `use` targets with the zero-based line of their statement
pub fn file_imports(content: &str) -> Vec<(String, u32)> {
    let root = umple::parse(content).syntax();
    let rope = Rope::from_str(content);
    umple::use_paths(&root)
        .into_iter()
        .filter(|(path, _)| umple::is_file_import(path))
        .map(|(path, node)| {
            let start = node
                .ancestors()
                .find(|n| n.kind() == SyntaxKind::USE_STATEMENT)
                .map(|statement| statement.text_range().start())
                .unwrap_or_else(|| node.text_range().start());
            (path, byte_offset_to_position(&rope, usize::from(start)).line)
        })
        .collect()
}

/// Current text of `path`: overlay first, then disk
pub async fn read_source(path: &Path, overlays: &Overlays) -> Option<String> {
    if let Some(text) = overlays.get(path) {
        return Some(text.clone());
    }
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Some(text),
        Err(e) => {
            debug!("Skipping unreadable import {}: {}", path.display(), e);
            None
        }
    }
}

/// Every file transitively imported by the document at `path`.
///
/// The document itself appears only when an import cycle leads back to it.
/// Each file is expanded once.
pub async fn collect_reachable_files(path: &Path, content: &str, overlays: &Overlays) -> HashSet<PathBuf> {
    let root = normalize_path(path);
    let mut visited: HashSet<PathBuf> = HashSet::from([root.clone()]);
    let mut reachable: HashSet<PathBuf> = HashSet::new();
    let mut queue: VecDeque<(PathBuf, String)> = VecDeque::from([(root, content.to_string())]);

    while let Some((file, text)) = queue.pop_front() {
        let Some(dir) = file.parent() else {
            continue;
        };
        for (target, _) in file_imports(&text) {
            let resolved = resolve_import(dir, &target);
            if visited.contains(&resolved) {
                reachable.insert(resolved);
                continue;
            }
            let Some(source) = read_source(&resolved, overlays).await else {
                continue;
            };
            trace!("{} imports {}", file.display(), resolved.display());
            visited.insert(resolved.clone());
            reachable.insert(resolved.clone());
            queue.push_back((resolved, source));
        }
    }

    debug!("{} file(s) reachable from {}", reachable.len(), path.display());
    reachable
}

/// Files the document imports, directly or through other imports, mapped to
/// the `use` line that leads to them. The first direct import wins when
/// several lead to the same file.
pub async fn build_import_map(document: &Path, content: &str, overlays: &Overlays) -> ImportMap {
    let document = normalize_path(document);
    let mut map = ImportMap::new();
    let Some(dir) = document.parent() else {
        return map;
    };

    for (target, line) in file_imports(content) {
        let direct = resolve_import(dir, &target);
        let mut visited: HashSet<PathBuf> = HashSet::from([document.clone()]);
        let mut queue: VecDeque<PathBuf> = VecDeque::from([direct]);
        while let Some(file) = queue.pop_front() {
            if !visited.insert(file.clone()) {
                continue;
            }
            map.entry(file.clone()).or_insert(line);
            let (Some(text), Some(file_dir)) = (read_source(&file, overlays).await, file.parent()) else {
                continue;
            };
            for (nested, _) in file_imports(&text) {
                queue.push_back(resolve_import(file_dir, &nested));
            }
        }
    }
    map
}
