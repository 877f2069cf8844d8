//! Import reachability and the diagnostics it feeds

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use indoc::indoc;
use umple_language_server::lsp::diagnostic_provider::RawDiagnostic;
use umple_language_server::lsp::diagnostic_remapper::remap_diagnostics;
use umple_language_server::lsp::imports::{
    ImportMap, Overlays, build_import_map, collect_reachable_files, normalize_path,
};

fn raw(filename: &str, line: u32, message: &str) -> RawDiagnostic {
    RawDiagnostic {
        error_code: Some("1004".to_string()),
        severity: 2,
        url: None,
        line,
        filename: filename.to_string(),
        message: message.to_string(),
    }
}

#[tokio::test]
async fn test_import_cycle_yields_both_files() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("A.ump");
    let b = dir.path().join("B.ump");
    fs::write(&a, "use B.ump;\nclass A {}").unwrap();
    fs::write(&b, "use A.ump;\nclass B {}").unwrap();

    let reachable = collect_reachable_files(&a, "use B.ump;\nclass A {}", &Overlays::new()).await;
    let expected: HashSet<PathBuf> = HashSet::from([normalize_path(&a), normalize_path(&b)]);
    assert_eq!(reachable, expected);
}

#[tokio::test]
async fn test_relative_paths_are_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let lib = dir.path().join("lib");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&lib).unwrap();
    fs::write(lib.join("Base.ump"), "class Base {}").unwrap();

    let reachable =
        collect_reachable_files(&src.join("Main.ump"), "use ./../lib/Base.ump;", &Overlays::new()).await;
    assert_eq!(reachable, HashSet::from([normalize_path(&lib.join("Base.ump"))]));
}

#[tokio::test]
async fn test_direct_and_transitive_diagnostics_remap_to_use_lines() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("B.ump"),
        indoc! {"
            use C.ump;

            class B { name; name; }
        "},
    )
    .unwrap();
    fs::write(dir.path().join("C.ump"), "class C {}").unwrap();

    let document = dir.path().join("D.ump");
    let text = indoc! {"
        // model
        use B.ump;
        class D {}
    "};
    let import_map = build_import_map(&document, text, &Overlays::new()).await;
    let expected = ImportMap::from([
        (normalize_path(&dir.path().join("B.ump")), 1),
        (normalize_path(&dir.path().join("C.ump")), 1),
    ]);
    assert_eq!(import_map, expected);

    let records = [
        raw("B.ump", 3, "Duplicate attribute name"),
        raw("C.ump", 1, "Unused class"),
        raw("D.ump", 3, "Local problem"),
    ];
    let diagnostics = remap_diagnostics(&records, text, &normalize_path(&document), &import_map, None);
    assert_eq!(diagnostics.len(), 3);

    assert_eq!(diagnostics[0].range.start.line, 1);
    assert_eq!(diagnostics[0].message, "In imported file (B.ump:3): Duplicate attribute name");
    assert_eq!(diagnostics[1].range.start.line, 1);
    assert_eq!(diagnostics[1].message, "In imported file (C.ump:1): Unused class");
    assert_eq!(diagnostics[2].range.start.line, 2);
    assert_eq!(diagnostics[2].message, "Local problem");
}
