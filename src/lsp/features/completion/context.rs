//! Completion context detection
//!
//! Works out what may be typed at a cursor position without consulting the
//! symbol index:
//!
//! 1. Cursor inside a comment: nothing completes
//! 2. Partial identifier before the cursor becomes the prefix
//! 3. Cursor where a new name is being declared: nothing completes
//! 4. Keywords and operators the grammar accepts after the previous token
//! 5. Symbol kinds allowed by the innermost scope rule
//! 6. Enclosing class and root state machine, for scoped symbol lookups
//!
//! The tree is never patched with placeholder tokens. Incomplete input already
//! parses into incomplete nodes that extend to the cursor.

use ropey::Rope;
use rowan::TextSize;
use tracing::trace;

use crate::lsp::features::query::UMPLE_QUERIES;
use crate::lsp::features::symbols::{enclosing_class, outermost_state_machine};
use crate::lsp::models::CompletionInfo;
use crate::parsers::position_utils::{byte_offset, offset_to_text_size};
use crate::parsers::umple::{self, SyntaxKind, SyntaxNode, SyntaxToken};

/// Words after which the next identifier always names something new
pub const DEFINITION_KEYWORDS: &[&str] = &[
    "class",
    "interface",
    "trait",
    "enum",
    "mixset",
    "statemachine",
    "namespace",
    "emit",
    "queued",
    "pooled",
    "req",
    "final",
];

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Partial identifier ending at byte `offset`
pub fn extract_partial_identifier(text: &str, offset: usize) -> &str {
    let before = &text[..offset];
    let start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_identifier_char(*c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(offset);
    &before[start..]
}

/// Complete word ending before byte `offset`, skipping whitespace
fn previous_word(text: &str, offset: usize) -> &str {
    let end = text[..offset].trim_end().len();
    extract_partial_identifier(text, end)
}

fn is_in_comment(root: &SyntaxNode, offset: TextSize) -> bool {
    root.token_at_offset(offset)
        .right_biased()
        .map(|token| token.kind().is_comment())
        .unwrap_or(false)
}

/// A type was just written and the declared name must follow it
fn follows_declaration_type(token: &SyntaxToken) -> bool {
    if token.kind() != SyntaxKind::IDENT {
        return false;
    }
    let Some(parent) = token.parent() else {
        return false;
    };
    let Some(owner) = parent.parent() else {
        return false;
    };
    match parent.kind() {
        SyntaxKind::TYPE_REF => matches!(
            owner.kind(),
            SyntaxKind::ATTRIBUTE_DECL
                | SyntaxKind::METHOD_DECL
                | SyntaxKind::PARAM
                | SyntaxKind::ASSOCIATION_END
        ),
        // `Integer |` parses as an untyped attribute named `Integer`
        SyntaxKind::NAME => {
            owner.kind() == SyntaxKind::ATTRIBUTE_DECL
                && !owner.children().any(|n| n.kind() == SyntaxKind::TYPE_REF)
                && !owner
                    .children_with_tokens()
                    .any(|e| e.kind() == SyntaxKind::SEMICOLON)
        }
        _ => false,
    }
}

/// Split lookahead kinds into keywords and operators
fn partition_expected(expected: &[SyntaxKind]) -> (Vec<String>, Vec<String>) {
    let mut keywords: Vec<String> = Vec::new();
    let mut operators: Vec<String> = Vec::new();
    for kind in expected {
        if kind.is_named() || kind.is_structural() {
            continue;
        }
        let Some(text) = kind.text() else {
            continue;
        };
        let bucket = if text.starts_with(|c: char| c.is_ascii_alphabetic()) {
            &mut keywords
        } else if text.starts_with(['<', '>', '-']) {
            &mut operators
        } else {
            continue;
        };
        if !bucket.iter().any(|existing| existing == text) {
            bucket.push(text.to_string());
        }
    }
    (keywords, operators)
}

/// Completion context at a zero-based `(line, col)` in `content`
pub fn completion_info(content: &str, line: usize, col: usize) -> CompletionInfo {
    let rope = Rope::from_str(content);
    let offset = byte_offset(&rope, line, col);
    let root = umple::parse(content).syntax();

    if offset > 0 {
        let char_before = rope.char_to_byte(rope.byte_to_char(offset) - 1);
        if is_in_comment(&root, offset_to_text_size(char_before)) {
            trace!("Completion at {}:{} is inside a comment", line, col);
            return CompletionInfo {
                is_comment: true,
                ..Default::default()
            };
        }
    }

    let prefix = extract_partial_identifier(content, offset);
    let prefix_start = offset - prefix.len();
    let previous = umple::prev_non_trivia_token(&root, offset_to_text_size(prefix_start));

    if DEFINITION_KEYWORDS.contains(&previous_word(content, prefix_start))
        || previous.as_ref().map(follows_declaration_type).unwrap_or(false)
    {
        trace!("Completion at {}:{} names a new declaration", line, col);
        return CompletionInfo {
            is_definition_name: true,
            ..Default::default()
        };
    }

    let state_offset = previous
        .as_ref()
        .map(|token| usize::from(token.text_range().end()))
        .unwrap_or(0);
    let (keywords, operators) = partition_expected(&umple::lookahead(content, state_offset));

    let cursor = offset_to_text_size(offset);
    let symbol_kinds = UMPLE_QUERIES
        .innermost_scope(&root, cursor)
        .map(|scope| scope.symbols.to_symbol_kinds());

    let anchor = umple::token_at(&root, cursor).and_then(|token| token.parent());
    let enclosing_class = anchor.as_ref().and_then(enclosing_class);
    let enclosing_state_machine = anchor.as_ref().and_then(outermost_state_machine);

    CompletionInfo {
        keywords,
        operators,
        symbol_kinds,
        is_definition_name: false,
        is_comment: false,
        prefix: prefix.to_string(),
        enclosing_class,
        enclosing_state_machine,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsp::models::{SymbolKind, SymbolKinds};

    fn info_at_end(text: &str) -> CompletionInfo {
        let rope = Rope::from_str(text);
        let line = rope.len_lines() - 1;
        let col = rope.line(line).len_chars();
        completion_info(text, line, col)
    }

    #[test]
    fn test_extract_partial_identifier() {
        assert_eq!(extract_partial_identifier("isA Per", 7), "Per");
        assert_eq!(extract_partial_identifier("isA ", 4), "");
        assert_eq!(extract_partial_identifier("a_b1", 4), "a_b1");
    }

    #[test]
    fn test_comment_suppresses_everything() {
        let info = info_at_end("class A {\n  // note ");
        assert!(info.is_comment);
        assert!(info.keywords.is_empty());
        assert_eq!(info.symbol_kinds, None);
    }

    #[test]
    fn test_block_comment() {
        let info = completion_info("/* a\n b */ class A {}", 1, 1);
        assert!(info.is_comment);
    }

    #[test]
    fn test_definition_keyword_suppresses() {
        for text in ["class ", "class Stu", "enum ", "mixset M { class ", "interface I"] {
            let info = info_at_end(text);
            assert!(info.is_definition_name, "{text:?}");
            assert!(!info.is_comment);
            assert!(info.keywords.is_empty());
        }
    }

    #[test]
    fn test_attribute_name_after_type_suppresses() {
        assert!(info_at_end("class A {\n  Integer ").is_definition_name);
        assert!(info_at_end("class A {\n  Integer co").is_definition_name);
        assert!(info_at_end("class A {\n  void run(String ").is_definition_name);
        assert!(!info_at_end("class A {\n  isA ").is_definition_name);
    }

    #[test]
    fn test_start_of_file_offers_top_level_keywords() {
        let info = completion_info("", 0, 0);
        assert!(info.keywords.contains(&"class".to_string()));
        assert!(info.keywords.contains(&"use".to_string()));
        assert!(info.operators.is_empty());
        assert_eq!(info.symbol_kinds, None);
    }

    #[test]
    fn test_class_body() {
        let info = info_at_end("class A {\n  ");
        assert!(info.keywords.contains(&"isA".to_string()));
        assert!(!info.keywords.iter().any(|k| k == "{" || k == ";"));
        assert_eq!(info.symbol_kinds, Some(SymbolKinds::Kinds(SymbolKind::TYPES.to_vec())));
        assert_eq!(info.enclosing_class.as_deref(), Some("A"));
    }

    #[test]
    fn test_association_operators() {
        let info = info_at_end("class A {\n  1 ");
        assert!(info.operators.contains(&"--".to_string()));
        assert!(info.operators.contains(&"->".to_string()));
        assert!(info.operators.contains(&"<@>-".to_string()));
    }

    #[test]
    fn test_isa_prefix() {
        let info = info_at_end("class A {\n  isA Pe");
        assert_eq!(info.prefix, "Pe");
        assert_eq!(info.symbol_kinds, Some(SymbolKinds::Kinds(SymbolKind::CLASS_LIKE.to_vec())));
    }

    #[test]
    fn test_transition_target_in_nested_state() {
        let info = info_at_end("class A {\n  sm {\n    Outer {\n      Inner { go -> ");
        assert_eq!(info.symbol_kinds, Some(SymbolKinds::Kinds(vec![SymbolKind::State])));
        assert_eq!(info.enclosing_state_machine.as_deref(), Some("sm"));
        assert_eq!(info.enclosing_class.as_deref(), Some("A"));
    }

    #[test]
    fn test_constraint_and_code_scopes() {
        let info = info_at_end("class A {\n  age;\n  [a");
        assert_eq!(info.symbol_kinds, Some(SymbolKinds::OwnAttribute));

        let info = info_at_end("class A {\n  void m() { ret");
        assert_eq!(info.symbol_kinds, Some(SymbolKinds::Suppress));
    }

    #[test]
    fn test_use_path_scope() {
        let info = info_at_end("use Sha");
        assert_eq!(info.symbol_kinds, Some(SymbolKinds::UsePath));
        assert_eq!(info.prefix, "Sha");
    }
}
