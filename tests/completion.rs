//! Completion through the workspace: suppression and cross-file scoping

use std::fs;

use indoc::indoc;
use tower_lsp::lsp_types::{CompletionItemKind, Url};
use umple_language_server::lsp::models::{SymbolKind, SymbolKinds};
use umple_language_server::lsp::workspace::UmpleWorkspace;

#[tokio::test]
async fn test_no_completions_inside_comments() {
    let dir = tempfile::tempdir().unwrap();
    let document = dir.path().join("A.ump");
    let workspace = UmpleWorkspace::default();
    let text = "class A {\n  // isA Pe";

    let info = workspace.completion_at(&document, text, 1, 11).await;
    assert!(info.is_comment);
    assert!(workspace.completion_items_at(&document, text, 1, 11).await.is_empty());
}

#[tokio::test]
async fn test_no_completions_for_new_names() {
    let dir = tempfile::tempdir().unwrap();
    let document = dir.path().join("A.ump");
    let workspace = UmpleWorkspace::default();

    for (text, line, col) in [("class Pe", 0, 8), ("class A {\n  Integer co", 1, 12)] {
        let info = workspace.completion_at(&document, text, line, col).await;
        assert!(info.is_definition_name, "{text:?}");
        assert!(workspace.completion_items_at(&document, text, line, col).await.is_empty());
    }
}

#[tokio::test]
async fn test_isa_offers_imported_classes_only() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Shared.ump"), "class Person {}\nclass Place {}").unwrap();
    let stray = dir.path().join("Stray.ump");
    let workspace = UmpleWorkspace::default();
    workspace.open_document(Url::from_file_path(&stray).unwrap(), &stray, "class Penguin {}", 1);

    let document = dir.path().join("Main.ump");
    let text = indoc! {"
        use Shared.ump;
        class Student {
          isA P"};

    let info = workspace.completion_at(&document, text, 2, 7).await;
    assert_eq!(info.symbol_kinds, Some(SymbolKinds::Kinds(SymbolKind::CLASS_LIKE.to_vec())));
    assert_eq!(info.prefix, "P");

    let items = workspace.completion_items_at(&document, text, 2, 7).await;
    let classes: Vec<&str> = items
        .iter()
        .filter(|item| item.kind == Some(CompletionItemKind::CLASS))
        .map(|item| item.label.as_str())
        .collect();
    assert!(classes.contains(&"Person"));
    assert!(classes.contains(&"Place"));
    assert!(!classes.contains(&"Penguin"));
}
