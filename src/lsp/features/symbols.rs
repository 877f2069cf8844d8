//! Symbol extraction from parsed Umple documents
//!
//! Runs the definition query over a tree and turns each capture into a
//! [`SymbolEntry`] with its container resolved:
//!
//! - attributes, methods and templates belong to the nearest enclosing class,
//!   interface or trait
//! - states and state machines belong to the outermost enclosing state machine
//! - everything else is its own container
//!
//! Also records `isA` edges and builds the document outline.

use std::collections::HashMap;
use std::path::Path;

use ropey::Rope;
use rustc_hash::FxHashMap;
use tower_lsp::lsp_types::DocumentSymbol;
use tracing::trace;

use crate::lsp::features::query::UMPLE_QUERIES;
use crate::lsp::models::{SymbolEntry, SymbolKind};
use crate::parsers::position_utils::text_range_to_lsp;
use crate::parsers::umple::{self, SyntaxKind, SyntaxNode};

/// Name of the nearest class-like entity enclosing `node`
pub fn enclosing_class(node: &SyntaxNode) -> Option<String> {
    node.ancestors()
        .find(|ancestor| ancestor.kind().is_class_like())
        .and_then(|class| umple::name_of(&class))
}

/// Name of the outermost state machine enclosing (or being) `node`
pub fn outermost_state_machine(node: &SyntaxNode) -> Option<String> {
    node.ancestors()
        .filter(|ancestor| ancestor.kind() == SyntaxKind::STATE_MACHINE)
        .last()
        .and_then(|machine| umple::name_of(&machine))
}

fn container_for(kind: SymbolKind, declaration: &SyntaxNode, name: &str) -> Option<String> {
    if kind.is_class_member() {
        enclosing_class(declaration)
    } else if kind.is_state_member() {
        outermost_state_machine(declaration)
    } else {
        Some(name.to_string())
    }
}

/// All definitions in `root`, attributed to `path`
pub fn extract_symbols(path: &Path, root: &SyntaxNode) -> Vec<SymbolEntry> {
    let text = Rope::from_str(&root.text().to_string());
    let symbols: Vec<SymbolEntry> = UMPLE_QUERIES
        .definitions(root)
        .into_iter()
        .map(|capture| {
            let name = capture.name.text().to_string();
            SymbolEntry {
                container: container_for(capture.kind, &capture.declaration, &name),
                range: text_range_to_lsp(&text, capture.name.text_range()),
                kind: capture.kind,
                file: path.to_path_buf(),
                name,
            }
        })
        .collect();
    trace!("Extracted {} symbols from {}", symbols.len(), path.display());
    symbols
}

/// `class → [parent]` for every `isA` declaration in `root`
pub fn extract_isa(root: &SyntaxNode) -> HashMap<String, Vec<String>> {
    let mut isa: HashMap<String, Vec<String>> = HashMap::new();
    for decl in root.descendants().filter(|n| n.kind() == SyntaxKind::ISA_DECL) {
        let Some(class) = enclosing_class(&decl) else {
            continue;
        };
        let parents = isa.entry(class).or_default();
        for type_ref in decl.children().filter(|n| n.kind() == SyntaxKind::TYPE_REF) {
            if let Some(parent) = umple::type_name(&type_ref) {
                if !parents.contains(&parent) {
                    parents.push(parent);
                }
            }
        }
    }
    isa.retain(|_, parents| !parents.is_empty());
    isa
}

/// Hierarchical outline of the document
pub fn document_symbols(root: &SyntaxNode) -> Vec<DocumentSymbol> {
    let text = Rope::from_str(&root.text().to_string());
    let declarations: FxHashMap<SyntaxNode, SymbolKind> = UMPLE_QUERIES
        .definitions(root)
        .into_iter()
        .map(|capture| (capture.declaration, capture.kind))
        .collect();
    outline(root, &text, &declarations)
}

fn outline(
    node: &SyntaxNode,
    text: &Rope,
    declarations: &FxHashMap<SyntaxNode, SymbolKind>,
) -> Vec<DocumentSymbol> {
    let mut symbols = Vec::new();
    for child in node.children() {
        let nested = outline(&child, text, declarations);
        let (Some(kind), Some(name)) = (declarations.get(&child), umple::name_token(&child)) else {
            symbols.extend(nested);
            continue;
        };
        #[allow(deprecated)]
        symbols.push(DocumentSymbol {
            name: name.text().to_string(),
            detail: Some(kind.to_string()),
            kind: kind.to_lsp_symbol_kind(),
            tags: None,
            deprecated: None,
            range: text_range_to_lsp(text, child.text_range()),
            selection_range: text_range_to_lsp(text, name.text_range()),
            children: if nested.is_empty() { None } else { Some(nested) },
        });
    }
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::umple::parse;
    use tower_lsp::lsp_types::Position;

    const SOURCE: &str = "class Student {\n  isA Person;\n  name;\n  void enrol() {}\n  status {\n    Active { quit -> Gone; }\n    Gone {}\n  }\n  1 -- * Course courses;\n}\n";

    fn find<'a>(symbols: &'a [SymbolEntry], name: &str) -> &'a SymbolEntry {
        symbols.iter().find(|s| s.name == name).unwrap()
    }

    #[test]
    fn test_containers() {
        let root = parse(SOURCE).syntax();
        let symbols = extract_symbols(Path::new("/ws/Student.ump"), &root);

        assert_eq!(find(&symbols, "Student").container.as_deref(), Some("Student"));
        assert_eq!(find(&symbols, "name").container.as_deref(), Some("Student"));
        assert_eq!(find(&symbols, "enrol").container.as_deref(), Some("Student"));
        assert_eq!(find(&symbols, "status").container.as_deref(), Some("status"));
        assert_eq!(find(&symbols, "Active").container.as_deref(), Some("status"));
        assert_eq!(find(&symbols, "Gone").container.as_deref(), Some("status"));
        assert_eq!(find(&symbols, "courses").kind, SymbolKind::Association);
        assert_eq!(find(&symbols, "courses").container.as_deref(), Some("courses"));
    }

    #[test]
    fn test_symbol_range_is_name_range() {
        let root = parse(SOURCE).syntax();
        let symbols = extract_symbols(Path::new("/ws/Student.ump"), &root);
        let name = find(&symbols, "name");
        assert_eq!(name.range.start, Position::new(2, 2));
        assert_eq!(name.range.end, Position::new(2, 6));
    }

    #[test]
    fn test_missing_names_are_skipped() {
        let root = parse("class { x; }\nclass Ok {}").syntax();
        let symbols = extract_symbols(Path::new("/ws/A.ump"), &root);
        assert!(symbols.iter().any(|s| s.name == "Ok"));
        assert!(symbols.iter().all(|s| s.kind != SymbolKind::Class || s.name == "Ok"));
    }

    #[test]
    fn test_extract_isa() {
        let root = parse("class A { isA B, C; }\nclass D { isA A; }\nclass E {}").syntax();
        let isa = extract_isa(&root);
        assert_eq!(isa.get("A"), Some(&vec!["B".to_string(), "C".to_string()]));
        assert_eq!(isa.get("D"), Some(&vec!["A".to_string()]));
        assert!(!isa.contains_key("E"));
    }

    #[test]
    fn test_document_symbols_nest_members() {
        let root = parse(SOURCE).syntax();
        let outline = document_symbols(&root);
        assert_eq!(outline.len(), 1);
        let class = &outline[0];
        assert_eq!(class.name, "Student");
        let children: Vec<&str> = class
            .children
            .as_ref()
            .unwrap()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(children, vec!["name", "enrol", "status", "courses"]);
    }
}
