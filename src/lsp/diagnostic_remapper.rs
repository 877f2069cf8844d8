//! Mapping validator records onto the edited document
//!
//! Records for the document itself become whole-line diagnostics. Records for
//! files it imports are attached to the `use` line that pulls the file in,
//! with the real origin in the message. Records that can be attached nowhere
//! are dropped.

use std::path::{Path, PathBuf};

use ropey::Rope;
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range};
use tracing::trace;

use crate::lsp::diagnostic_provider::RawDiagnostic;
use crate::lsp::imports::{ImportMap, resolve_import};
use crate::lsp::shadow_workspace::ShadowPaths;
use crate::parsers::position_utils::line_content_chars;

pub const DIAGNOSTIC_SOURCE: &str = "umple";

/// File a validator record belongs to
#[derive(Debug, PartialEq, Eq)]
enum Origin<'a> {
    Document,
    Import { file: &'a Path, use_line: u32 },
}

fn base_name(file: &Path) -> Option<&str> {
    file.file_name().and_then(|name| name.to_str())
}

/// Original file named by `reported`, when it carries a directory
fn resolve_reported(reported: &str, document: &Path, shadow: Option<&ShadowPaths>) -> Option<PathBuf> {
    if let Some(shadow) = shadow {
        return shadow.original(reported);
    }
    let path = Path::new(reported);
    if !path.is_absolute() && path.components().count() < 2 {
        return None;
    }
    Some(resolve_import(document.parent().unwrap_or(document), reported))
}

fn locate<'a>(
    reported: &str,
    document: &Path,
    import_map: &'a ImportMap,
    shadow: Option<&ShadowPaths>,
) -> Option<Origin<'a>> {
    if let Some(file) = resolve_reported(reported, document, shadow) {
        if file == document {
            return Some(Origin::Document);
        }
        return import_map
            .get_key_value(&file)
            .map(|(file, line)| Origin::Import { file, use_line: *line });
    }

    // A bare file name only counts when exactly one candidate carries it
    let name = Path::new(reported).file_name()?.to_str()?;
    let own = base_name(document) == Some(name);
    let mut imports = import_map
        .iter()
        .filter(|(file, _)| base_name(file) == Some(name));
    match (own, imports.next(), imports.next()) {
        (true, None, _) => Some(Origin::Document),
        (false, Some((file, line)), None) => Some(Origin::Import { file, use_line: *line }),
        _ => {
            trace!("Ambiguous diagnostic file name {}", reported);
            None
        }
    }
}

fn severity(raw: &RawDiagnostic) -> DiagnosticSeverity {
    if raw.severity <= 2 {
        DiagnosticSeverity::ERROR
    } else {
        DiagnosticSeverity::WARNING
    }
}

/// Range covering the content of `line`, from its first non-blank char
fn line_range(text: &Rope, line: u32) -> Range {
    let last_line = text.len_lines().saturating_sub(1);
    let line = (line as usize).min(last_line);
    let len = line_content_chars(text, line);
    let start = text
        .line(line)
        .chars()
        .take(len)
        .position(|c| !c.is_whitespace())
        .unwrap_or(len);
    Range::new(
        Position::new(line as u32, start as u32),
        Position::new(line as u32, len as u32),
    )
}

fn diagnostic(raw: &RawDiagnostic, range: Range, message: String) -> Diagnostic {
    Diagnostic {
        range,
        severity: Some(severity(raw)),
        code: raw.error_code.clone().map(NumberOrString::String),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message,
        ..Default::default()
    }
}

/// Convert validator records into diagnostics for `document`.
///
/// `import_map` comes from [`build_import_map`](crate::lsp::imports::build_import_map);
/// `shadow` maps file names reported inside a shadow workspace back to the
/// files they mirror.
pub fn remap_diagnostics(
    raw: &[RawDiagnostic],
    document_text: &str,
    document: &Path,
    import_map: &ImportMap,
    shadow: Option<&ShadowPaths>,
) -> Vec<Diagnostic> {
    let text = Rope::from_str(document_text);
    let mut diagnostics = Vec::new();

    for record in raw {
        match locate(&record.filename, document, import_map, shadow) {
            Some(Origin::Document) => {
                let range = line_range(&text, record.line.saturating_sub(1));
                diagnostics.push(diagnostic(record, range, record.message.clone()));
            }
            Some(Origin::Import { file, use_line }) => {
                let shown = match shadow {
                    Some(shadow) => shadow.display(file),
                    None => Path::new(&record.filename),
                };
                let message = format!(
                    "In imported file ({}:{}): {}",
                    shown.display(),
                    record.line,
                    record.message
                );
                diagnostics.push(diagnostic(record, line_range(&text, use_line), message));
            }
            None => trace!("Dropping diagnostic for unmapped file {}", record.filename),
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(filename: &str, line: u32, severity: u32, message: &str) -> RawDiagnostic {
        RawDiagnostic {
            error_code: Some("1".to_string()),
            severity,
            url: None,
            line,
            filename: filename.to_string(),
            message: message.to_string(),
        }
    }

    const DOCUMENT: &str = "/ws/app/D.ump";

    fn remap(records: &[RawDiagnostic], text: &str, import_map: &ImportMap) -> Vec<Diagnostic> {
        remap_diagnostics(records, text, Path::new(DOCUMENT), import_map, None)
    }

    #[test]
    fn test_own_file_spans_line_content() {
        let text = "class A {\n    name;\n}\n";
        let diagnostics = remap(&[raw("D.ump", 2, 1, "bad")], text, &ImportMap::new());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range, Range::new(Position::new(1, 4), Position::new(1, 9)));
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diagnostics[0].message, "bad");
    }

    #[test]
    fn test_warning_severity_and_line_clamp() {
        let diagnostics = remap(&[raw(DOCUMENT, 40, 3, "w")], "class D {}", &ImportMap::new());
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(diagnostics[0].range.start.line, 0);
    }

    #[test]
    fn test_imported_file_attaches_to_use_line() {
        let text = "use B.ump;\nclass D {}\n";
        let map = ImportMap::from([(PathBuf::from("/ws/app/B.ump"), 0)]);
        let diagnostics = remap(&[raw("B.ump", 3, 2, "oops")], text, &map);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.start.line, 0);
        assert_eq!(diagnostics[0].message, "In imported file (B.ump:3): oops");
    }

    #[test]
    fn test_unmapped_file_is_dropped() {
        assert!(remap(&[raw("Z.ump", 1, 1, "x")], "class D {}", &ImportMap::new()).is_empty());
        assert!(remap(&[raw("/elsewhere/D.ump", 1, 1, "x")], "class D {}", &ImportMap::new()).is_empty());
    }

    #[test]
    fn test_import_sharing_the_document_name() {
        let text = "use ../lib/D.ump;\nclass D {}\n";
        let map = ImportMap::from([(PathBuf::from("/ws/lib/D.ump"), 0)]);

        let diagnostics = remap(&[raw("../lib/D.ump", 4, 1, "clash")], text, &map);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.start.line, 0);
        assert_eq!(diagnostics[0].message, "In imported file (../lib/D.ump:4): clash");

        // Could be either file
        assert!(remap(&[raw("D.ump", 4, 1, "clash")], text, &map).is_empty());
    }

    #[test]
    fn test_same_named_imports_use_their_own_lines() {
        let text = "use lib/Base.ump;\nuse vendor/Base.ump;\n";
        let map = ImportMap::from([
            (PathBuf::from("/ws/app/lib/Base.ump"), 0),
            (PathBuf::from("/ws/app/vendor/Base.ump"), 1),
        ]);
        let shadow = ShadowPaths::new(
            Path::new("/tmp/umple-shadow-1"),
            Path::new("/ws/app"),
            Path::new("/tmp/umple-shadow-1/D.ump"),
        );
        let records = [
            raw("vendor/Base.ump", 2, 1, "v"),
            raw("/tmp/umple-shadow-1/lib/Base.ump", 5, 1, "l"),
            raw("Base.ump", 1, 1, "?"),
        ];

        let diagnostics = remap_diagnostics(&records, text, Path::new(DOCUMENT), &map, Some(&shadow));
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].range.start.line, 1);
        assert_eq!(diagnostics[0].message, "In imported file (vendor/Base.ump:2): v");
        assert_eq!(diagnostics[1].range.start.line, 0);
        assert_eq!(diagnostics[1].message, "In imported file (lib/Base.ump:5): l");
    }
}
