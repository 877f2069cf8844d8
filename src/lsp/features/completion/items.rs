//! Completion item construction
//!
//! Turns a [`CompletionInfo`] into LSP items: keywords and operators from the
//! grammar, symbols from the index scoped by the enclosing class and state
//! machine, and file names for `use` paths.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind};
use tracing::debug;
use walkdir::WalkDir;

use crate::lsp::models::{CompletionInfo, SymbolEntry, SymbolKind, SymbolKinds};
use crate::lsp::symbol_index::SymbolIndex;

/// How deep `use` path completion looks below the document's directory
const USE_PATH_DEPTH: usize = 3;

/// Symbols visible for `kinds` at the position described by `info`.
///
/// Class members come from the enclosing class and its ancestors, states from
/// the root state machine, everything else from the reachable files.
pub fn scoped_symbols(
    index: &SymbolIndex,
    kinds: &[SymbolKind],
    info: &CompletionInfo,
    reachable: Option<&HashSet<PathBuf>>,
) -> Vec<SymbolEntry> {
    let (members, rest): (Vec<SymbolKind>, Vec<SymbolKind>) =
        kinds.iter().partition(|kind| kind.is_class_member());
    let (states, global): (Vec<SymbolKind>, Vec<SymbolKind>) =
        rest.iter().partition(|kind| kind.is_state_member());

    let mut symbols = Vec::new();
    if !members.is_empty() {
        if let Some(class) = &info.enclosing_class {
            for owner in index.lineage(class) {
                symbols.extend(
                    index
                        .container_symbols(&owner)
                        .iter()
                        .filter(|entry| members.contains(&entry.kind))
                        .cloned(),
                );
            }
        }
    }
    if !states.is_empty() {
        if let Some(machine) = &info.enclosing_state_machine {
            symbols.extend(
                index
                    .container_symbols(machine)
                    .iter()
                    .filter(|entry| states.contains(&entry.kind))
                    .cloned(),
            );
        }
    }
    if !global.is_empty() {
        symbols.extend(index.symbols_of_kind(&global, None));
    }

    if let Some(files) = reachable {
        symbols.retain(|entry| files.contains(&entry.file));
    }
    symbols
}

/// Attributes declared directly in the enclosing class
fn own_attributes(index: &SymbolIndex, info: &CompletionInfo) -> Vec<SymbolEntry> {
    let Some(class) = &info.enclosing_class else {
        return Vec::new();
    };
    index
        .container_symbols(class)
        .iter()
        .filter(|entry| entry.kind == SymbolKind::Attribute)
        .cloned()
        .collect()
}

/// `.ump` files below `dir`, relative to it, excluding `document`
pub fn use_path_candidates(dir: &Path, document: &Path) -> Vec<String> {
    let mut candidates: Vec<String> = WalkDir::new(dir)
        .max_depth(USE_PATH_DEPTH)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.path() != document)
        .filter(|entry| entry.path().extension().map(|e| e == "ump").unwrap_or(false))
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(dir)
                .ok()
                .map(|relative| relative.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    candidates.sort();
    candidates
}

fn symbol_item(entry: &SymbolEntry) -> CompletionItem {
    let detail = match &entry.container {
        Some(container) if container != &entry.name => format!("{} in {}", entry.kind, container),
        _ => entry.kind.to_string(),
    };
    CompletionItem {
        label: entry.name.clone(),
        kind: Some(entry.kind.to_completion_kind()),
        detail: Some(detail),
        sort_text: Some(format!("1_{}", entry.name)),
        ..Default::default()
    }
}

fn plain_item(label: &str, kind: CompletionItemKind, rank: u8) -> CompletionItem {
    CompletionItem {
        label: label.to_string(),
        kind: Some(kind),
        sort_text: Some(format!("{}_{}", rank, label)),
        ..Default::default()
    }
}

/// Completion items for `info`, filtered by its prefix.
///
/// `document` is the file being edited; its directory is searched for `use`
/// path candidates.
pub fn completion_items(
    info: &CompletionInfo,
    index: &SymbolIndex,
    document: &Path,
    reachable: Option<&HashSet<PathBuf>>,
) -> Vec<CompletionItem> {
    if info.is_comment || info.is_definition_name {
        return Vec::new();
    }

    let mut items = Vec::new();
    match &info.symbol_kinds {
        Some(SymbolKinds::Suppress) => return Vec::new(),
        Some(SymbolKinds::UsePath) => {
            if let Some(dir) = document.parent() {
                for path in use_path_candidates(dir, document) {
                    items.push(plain_item(&path, CompletionItemKind::FILE, 0));
                }
            }
            for mixset in index.symbols_of_kind(&[SymbolKind::Mixset], None) {
                items.push(symbol_item(&mixset));
            }
        }
        Some(SymbolKinds::OwnAttribute) => {
            items.extend(own_attributes(index, info).iter().map(symbol_item));
        }
        Some(SymbolKinds::Kinds(kinds)) => {
            items.extend(scoped_symbols(index, kinds, info, reachable).iter().map(symbol_item));
        }
        None => {}
    }

    if !matches!(info.symbol_kinds, Some(SymbolKinds::UsePath)) {
        for keyword in &info.keywords {
            items.push(plain_item(keyword, CompletionItemKind::KEYWORD, 2));
        }
        for operator in &info.operators {
            items.push(plain_item(operator, CompletionItemKind::OPERATOR, 3));
        }
    }

    let mut seen = HashSet::new();
    items.retain(|item| item.label.starts_with(&info.prefix) && seen.insert(item.label.clone()));
    debug!(
        "{} completion items for prefix {:?} ({:?})",
        items.len(),
        info.prefix,
        info.symbol_kinds
    );
    items
}
