//! Symbol index behavior across files

use std::path::{Path, PathBuf};

use indoc::indoc;
use umple_language_server::lsp::models::SymbolKind;
use umple_language_server::lsp::symbol_index::SymbolIndex;

fn path(name: &str) -> PathBuf {
    PathBuf::from("/ws").join(name)
}

#[test]
fn test_index_file_is_idempotent() {
    let mut index = SymbolIndex::new();
    let content = "class Person { name; }";

    assert!(index.index_file(&path("Person.ump"), content));
    assert!(!index.index_file(&path("Person.ump"), content));
    assert_eq!(index.container_symbols("Person").len(), 2);

    assert!(index.index_file(&path("Person.ump"), "class Person { name; age; }"));
    assert_eq!(index.container_symbols("Person").len(), 3);
}

#[test]
fn test_inherited_attribute_through_isa() {
    let mut index = SymbolIndex::new();
    index.index_file(&path("Person.ump"), "class Person { name; }");
    index.index_file(
        &path("Student.ump"),
        indoc! {"
            class Student {
              isA Person;
              Integer number;
            }
        "},
    );

    let found = index.lookup("name", &[SymbolKind::Attribute], Some("Student"), true);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].container.as_deref(), Some("Person"));
    assert_eq!(found[0].file, path("Person.ump"));

    assert!(index.lookup("name", &[SymbolKind::Attribute], Some("Student"), false).is_empty());
}

#[test]
fn test_inheritance_cycle_terminates() {
    let mut index = SymbolIndex::new();
    index.index_file(
        &path("Cycle.ump"),
        indoc! {"
            class X { isA Y; x; }
            class Y { isA X; y; }
        "},
    );

    assert_eq!(index.lineage("X"), vec!["X".to_string(), "Y".to_string()]);
    let found = index.lookup("y", &[SymbolKind::Attribute], Some("X"), true);
    assert_eq!(found.len(), 1);
}

#[test]
fn test_removing_a_file_retracts_its_contribution() {
    let mut index = SymbolIndex::new();
    index.index_file(&path("A.ump"), "class Shared { a; }");
    index.index_file(&path("B.ump"), "class Shared { b; }");
    assert_eq!(index.lookup("b", &[SymbolKind::Attribute], Some("Shared"), false).len(), 1);

    index.remove_file(Path::new("/ws/B.ump"));
    assert!(index.lookup("b", &[SymbolKind::Attribute], Some("Shared"), false).is_empty());
    assert_eq!(index.lookup("a", &[SymbolKind::Attribute], Some("Shared"), false).len(), 1);
}
