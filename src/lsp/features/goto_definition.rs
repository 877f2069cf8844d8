//! Go-to-definition for Umple
//!
//! ```text
//! identifier under cursor
//!       ↓
//! reference rules → kinds valid at that position
//!       ↓
//! partition kinds by container rule
//!       ├─→ attributes/methods/templates: enclosing class + its ancestors
//!       ├─→ states/state machines: outermost state machine
//!       └─→ everything else: its own name
//!       ↓
//! SymbolIndex lookups, limited to the reachable files
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rowan::TextSize;
use tracing::{debug, trace};

use crate::lsp::features::query::UMPLE_QUERIES;
use crate::lsp::features::symbols::{enclosing_class, outermost_state_machine};
use crate::lsp::imports::resolve_import;
use crate::lsp::models::{SymbolEntry, SymbolKind};
use crate::lsp::symbol_index::SymbolIndex;
use crate::parsers::umple::{self, SyntaxKind, SyntaxNode, SyntaxToken};

/// Identifier-like token at `offset`, if any
pub fn identifier_at(root: &SyntaxNode, offset: TextSize) -> Option<SyntaxToken> {
    let token = umple::token_at(root, offset)?;
    match token.kind() {
        SyntaxKind::IDENT => Some(token),
        _ if in_use_path(&token) => Some(token),
        _ => None,
    }
}

fn in_use_path(token: &SyntaxToken) -> bool {
    token
        .parent()
        .map(|parent| parent.kind() == SyntaxKind::USE_PATH)
        .unwrap_or(false)
}

/// Symbol kinds `token` may refer to, from the most specific reference rule.
///
/// `None` when the token is not in a reference position (a declared name, a
/// keyword, embedded code).
pub fn resolve_definition_kinds(token: &SyntaxToken) -> Option<Vec<SymbolKind>> {
    let capture = UMPLE_QUERIES.most_specific_reference(token)?;
    trace!(
        "Reference {:?} at {:?} resolves to {:?}",
        token.text(),
        capture.span(),
        capture.kinds
    );
    Some(capture.kinds.to_vec())
}

/// Name a reference capture looks up: the whole path for mixset `use`
/// targets, otherwise the identifier itself
fn reference_name(token: &SyntaxToken) -> String {
    match token.parent() {
        Some(parent) if parent.kind() == SyntaxKind::USE_PATH => parent.text().to_string(),
        _ => token.text().to_string(),
    }
}

/// File a `use` path at `offset` points at, resolved against `document`
pub fn import_target_at(root: &SyntaxNode, offset: TextSize, document: &Path) -> Option<PathBuf> {
    let token = umple::token_at(root, offset)?;
    let path = token
        .parent_ancestors()
        .find(|node| node.kind() == SyntaxKind::USE_PATH)?
        .text()
        .to_string();
    if !umple::is_file_import(&path) {
        return None;
    }
    let dir = document.parent()?;
    Some(resolve_import(dir, &path))
}

/// Definitions of the identifier at `offset`.
///
/// When `reachable` is given, only symbols from those files are returned.
pub fn find_definitions(
    index: &SymbolIndex,
    root: &SyntaxNode,
    offset: TextSize,
    reachable: Option<&HashSet<PathBuf>>,
) -> Vec<SymbolEntry> {
    let Some(token) = identifier_at(root, offset) else {
        return Vec::new();
    };
    let Some(kinds) = resolve_definition_kinds(&token) else {
        debug!("No reference rule covers {:?}", token.text());
        return Vec::new();
    };
    let name = reference_name(&token);
    let Some(node) = token.parent() else {
        return Vec::new();
    };

    let (members, rest): (Vec<SymbolKind>, Vec<SymbolKind>) =
        kinds.iter().partition(|kind| kind.is_class_member());
    let (states, own): (Vec<SymbolKind>, Vec<SymbolKind>) =
        rest.iter().partition(|kind| kind.is_state_member());

    let mut found = Vec::new();
    if !members.is_empty() {
        let class = enclosing_class(&node);
        found.extend(index.lookup(&name, &members, class.as_deref(), true));
    }
    if !states.is_empty() {
        let machine = outermost_state_machine(&node);
        found.extend(index.lookup(&name, &states, machine.as_deref(), false));
    }
    if !own.is_empty() {
        found.extend(index.lookup(&name, &own, Some(&name), false));
    }

    if let Some(files) = reachable {
        found.retain(|entry| files.contains(&entry.file));
    }
    let mut seen = HashSet::new();
    found.retain(|entry| seen.insert((entry.file.clone(), entry.range.start.line, entry.range.start.character)));
    debug!("{} definition(s) for {:?} ({:?})", found.len(), name, kinds);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::umple::parse;
    use tower_lsp::lsp_types::Position;

    fn definitions_of(index: &SymbolIndex, text: &str, needle: &str) -> Vec<SymbolEntry> {
        let root = parse(text).syntax();
        let offset = text.find(needle).unwrap() + 1;
        find_definitions(index, &root, TextSize::from(offset as u32), None)
    }

    #[test]
    fn test_declared_name_has_no_reference_kinds() {
        let root = parse("class Student {}").syntax();
        let token = identifier_at(&root, TextSize::from(7)).unwrap();
        assert_eq!(token.text(), "Student");
        assert_eq!(resolve_definition_kinds(&token), None);
    }

    #[test]
    fn test_type_reference_resolves_to_class() {
        let mut index = SymbolIndex::new();
        let text = "class Person { name; }\nclass Student { isA Person; }";
        index.index_file(Path::new("/ws/a.ump"), text);

        let found = definitions_of(&index, text, "Person;");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, SymbolKind::Class);
        assert_eq!(found[0].range.start, Position::new(0, 6));
    }

    #[test]
    fn test_transition_target_resolves_within_root_machine() {
        let mut index = SymbolIndex::new();
        let text = "class D {\n  sm {\n    Open { close -> Closed; }\n    Closed { Inner {} }\n  }\n  other { Closed {} }\n}";
        index.index_file(Path::new("/ws/d.ump"), text);

        let found = definitions_of(&index, text, "Closed;");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].container.as_deref(), Some("sm"));
        assert_eq!(found[0].range.start.line, 3);
    }

    #[test]
    fn test_guard_resolves_inherited_attribute() {
        let mut index = SymbolIndex::new();
        let text = "class Base { ready; }\nclass D { isA Base; sm { Open { go [ready] -> Open; } } }";
        index.index_file(Path::new("/ws/d.ump"), text);

        let found = definitions_of(&index, text, "ready]");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].container.as_deref(), Some("Base"));
    }

    #[test]
    fn test_reachable_filter() {
        let mut index = SymbolIndex::new();
        index.index_file(Path::new("/ws/p.ump"), "class Person {}");
        let text = "class Student { isA Person; }";
        index.index_file(Path::new("/ws/s.ump"), text);

        let root = parse(text).syntax();
        let offset = TextSize::from(text.find("Person").unwrap() as u32);
        let only_self: HashSet<PathBuf> = [PathBuf::from("/ws/s.ump")].into_iter().collect();
        assert!(find_definitions(&index, &root, offset, Some(&only_self)).is_empty());
        assert_eq!(find_definitions(&index, &root, offset, None).len(), 1);
    }

    #[test]
    fn test_import_target() {
        let text = "use lib/Shared.ump;\nuse Logging;";
        let root = parse(text).syntax();
        let target = import_target_at(&root, TextSize::from(6), Path::new("/ws/main.ump"));
        assert_eq!(target, Some(PathBuf::from("/ws/lib/Shared.ump")));

        let offset = TextSize::from(text.find("Logging").unwrap() as u32 + 1);
        assert_eq!(import_target_at(&root, offset, Path::new("/ws/main.ump")), None);
    }
}
