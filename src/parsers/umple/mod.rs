//! Lossless, error tolerant parser for the Umple modeling language
//!
//! ```text
//! Source Text
//!     ↓
//! Lexer (logos) → Tokens with SyntaxKind
//!     ↓
//! Parser → GreenNode tree (immutable, cheap to clone)
//!     ↓
//! SyntaxNode (rowan) → CST with parent pointers
//! ```
//!
//! Comments and whitespace are kept as trivia tokens, so every byte of the
//! input appears in the tree and node ranges map directly onto the document.

mod lexer;
mod parser;
mod syntax_kind;

pub use lexer::{Token, tokenize};
pub use parser::{Parse, SyntaxError, lookahead, parse};
pub(crate) use parser::ASSOCIATION_OPERATORS;
pub use syntax_kind::{SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken, UmpleLanguage};

use rowan::{TextSize, TokenAtOffset};

/// The identifier inside a declaration's NAME child
pub fn name_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    node.children()
        .find(|child| child.kind() == SyntaxKind::NAME)
        .and_then(|name| ident_token(&name))
}

/// Declared name of a node, if it has one
pub fn name_of(node: &SyntaxNode) -> Option<String> {
    name_token(node).map(|token| token.text().to_string())
}

/// First IDENT token directly inside `node`
pub fn ident_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|element| element.into_token())
        .find(|token| token.kind() == SyntaxKind::IDENT)
}

/// Referenced type name of a TYPE_REF (`java.util.Date` → `Date`)
pub fn type_name(type_ref: &SyntaxNode) -> Option<String> {
    type_ref
        .children_with_tokens()
        .filter_map(|element| element.into_token())
        .filter(|token| token.kind() == SyntaxKind::IDENT)
        .last()
        .map(|token| token.text().to_string())
}

/// A `use` target names a file when it ends in `.ump`; otherwise it names a mixset
pub fn is_file_import(path: &str) -> bool {
    path.ends_with(".ump")
}

/// Every `use` target in the file, in source order, with its node
pub fn use_paths(root: &SyntaxNode) -> Vec<(String, SyntaxNode)> {
    root.descendants()
        .filter(|node| node.kind() == SyntaxKind::USE_PATH)
        .map(|node| (node.text().to_string(), node))
        .collect()
}

/// Leaf token at a byte offset. Between two tokens the left one wins unless it
/// is trivia, so a cursor right after an identifier lands on the identifier.
pub fn token_at(root: &SyntaxNode, offset: TextSize) -> Option<SyntaxToken> {
    match root.token_at_offset(offset) {
        TokenAtOffset::None => None,
        TokenAtOffset::Single(token) => Some(token),
        TokenAtOffset::Between(left, right) => {
            if left.kind().is_trivia() && !right.kind().is_trivia() {
                Some(right)
            } else {
                Some(left)
            }
        }
    }
}

/// Last non-trivia token that ends at or before `offset`
pub fn prev_non_trivia_token(root: &SyntaxNode, offset: TextSize) -> Option<SyntaxToken> {
    let mut token = match root.token_at_offset(offset) {
        TokenAtOffset::None => return None,
        TokenAtOffset::Single(token) if token.text_range().start() < offset => {
            if token.text_range().end() <= offset {
                token
            } else {
                token.prev_token()?
            }
        }
        TokenAtOffset::Single(token) => token.prev_token()?,
        TokenAtOffset::Between(left, _) => left,
    };
    while token.kind().is_trivia() {
        token = token.prev_token()?;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_helpers() {
        let root = parse("class Student { isA java.lang.Person; }").syntax();
        let class = root.descendants().find(|n| n.kind() == SyntaxKind::CLASS_DECL).unwrap();
        assert_eq!(name_of(&class).as_deref(), Some("Student"));

        let type_ref = root.descendants().find(|n| n.kind() == SyntaxKind::TYPE_REF).unwrap();
        assert_eq!(type_name(&type_ref).as_deref(), Some("Person"));
    }

    #[test]
    fn test_use_paths_and_file_detection() {
        let root = parse("use Shared.ump;\nuse Logging;").syntax();
        let paths: Vec<String> = use_paths(&root).into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["Shared.ump", "Logging"]);
        assert!(is_file_import(&paths[0]));
        assert!(!is_file_import(&paths[1]));
    }

    #[test]
    fn test_prev_non_trivia_token_skips_whitespace() {
        let text = "class A {   ";
        let root = parse(text).syntax();
        let token = prev_non_trivia_token(&root, TextSize::of(text)).unwrap();
        assert_eq!(token.kind(), SyntaxKind::L_BRACE);

        let token = prev_non_trivia_token(&root, TextSize::from(7)).unwrap();
        assert_eq!(token.text(), "A");
    }
}
