//! Query engine and rule tables for Umple
//!
//! The tables below play the role of `locals.scm`-style query files: they
//! describe where definitions, references and completion scopes live in the
//! syntax tree. The engine evaluates them against a parsed document.

use once_cell::sync::Lazy;
use rowan::{TextSize, TokenAtOffset};
use tracing::debug;

use super::query_types::{
    Anchor, Context, DefinitionCapture, DefinitionRule, QueryType, ReferenceCapture, ReferenceRule,
    ScopeCapture, ScopeRule, ScopeSymbols,
};
use crate::lsp::models::SymbolKind;
use crate::parsers::umple::{self, ASSOCIATION_OPERATORS, SyntaxKind, SyntaxKind::*, SyntaxNode, SyntaxToken};

const fn definition(parent: SyntaxKind, kind: SymbolKind) -> DefinitionRule {
    DefinitionRule {
        capture: NAME,
        context: Context::Parent(parent),
        kind,
    }
}

const fn reference(capture: SyntaxKind, context: Context, kinds: &'static [SymbolKind]) -> ReferenceRule {
    ReferenceRule {
        capture,
        context,
        kinds,
        when: None,
    }
}

const fn scope(node: SyntaxKind, anchor: Anchor, symbols: ScopeSymbols) -> ScopeRule {
    ScopeRule { node, anchor, symbols }
}

static DEFINITIONS: &[DefinitionRule] = &[
    definition(CLASS_DECL, SymbolKind::Class),
    definition(INTERFACE_DECL, SymbolKind::Interface),
    definition(TRAIT_DECL, SymbolKind::Trait),
    definition(ENUM_DECL, SymbolKind::Enum),
    definition(MIXSET_DECL, SymbolKind::Mixset),
    definition(REQUIREMENT_DECL, SymbolKind::Requirement),
    definition(STATE_MACHINE, SymbolKind::StateMachine),
    definition(STATE, SymbolKind::State),
    definition(ATTRIBUTE_DECL, SymbolKind::Attribute),
    definition(METHOD_DECL, SymbolKind::Method),
    definition(EMIT_DECL, SymbolKind::Method),
    definition(TEMPLATE_DECL, SymbolKind::Template),
    definition(ASSOCIATION_END, SymbolKind::Association),
];

fn is_mixset_path(node: &SyntaxNode) -> bool {
    !umple::is_file_import(&node.text().to_string())
}

static REFERENCES: &[ReferenceRule] = &[
    reference(TYPE_REF, Context::Anywhere, SymbolKind::TYPES),
    reference(TYPE_REF, Context::Parent(ISA_DECL), SymbolKind::CLASS_LIKE),
    reference(TYPE_REF, Context::Parent(ASSOCIATION_END), SymbolKind::CLASS_LIKE),
    reference(NAME_REF, Context::Parent(TRANSITION), &[SymbolKind::State]),
    reference(NAME_REF, Context::Parent(KEY_DECL), &[SymbolKind::Attribute]),
    reference(NAME_REF, Context::Parent(IMPLEMENTS_REQ), &[SymbolKind::Requirement]),
    reference(NAME_REF, Context::Parent(TEMPLATE_LIST), &[SymbolKind::Template]),
    reference(NAME_REF, Context::Ancestor(CONSTRAINT), &[SymbolKind::Attribute]),
    reference(NAME_REF, Context::Ancestor(GUARD), &[SymbolKind::Attribute]),
    reference(NAME_REF, Context::Ancestor(INITIALIZER), &[SymbolKind::Attribute]),
    ReferenceRule {
        capture: USE_PATH,
        context: Context::Parent(USE_STATEMENT),
        kinds: &[SymbolKind::Mixset],
        when: Some(is_mixset_path),
    },
];

static SCOPES: &[ScopeRule] = &[
    scope(CODE_BLOCK, Anchor::AfterToken(&[L_BRACE]), ScopeSymbols::Suppress),
    scope(TEMPLATE_DECL, Anchor::AfterNode(NAME), ScopeSymbols::Suppress),
    scope(ENUM_DECL, Anchor::AfterToken(&[L_BRACE]), ScopeSymbols::Suppress),
    scope(USE_STATEMENT, Anchor::AfterToken(&[USE_KW]), ScopeSymbols::UsePath),
    scope(CONSTRAINT, Anchor::AfterToken(&[L_BRACKET]), ScopeSymbols::OwnAttribute),
    scope(GUARD, Anchor::AfterToken(&[L_BRACKET]), ScopeSymbols::Kinds(&[SymbolKind::Attribute])),
    scope(TRANSITION, Anchor::AfterToken(&[ARROW]), ScopeSymbols::Kinds(&[SymbolKind::State])),
    scope(ISA_DECL, Anchor::AfterToken(&[ISA_KW]), ScopeSymbols::Kinds(SymbolKind::CLASS_LIKE)),
    scope(ASSOCIATION_DECL, Anchor::AfterToken(ASSOCIATION_OPERATORS), ScopeSymbols::Kinds(SymbolKind::CLASS_LIKE)),
    scope(ASSOCIATION_BLOCK, Anchor::AfterToken(&[L_BRACE]), ScopeSymbols::Kinds(SymbolKind::CLASS_LIKE)),
    scope(CLASS_BODY, Anchor::AfterToken(&[L_BRACE]), ScopeSymbols::Kinds(SymbolKind::TYPES)),
    scope(PARAM_LIST, Anchor::AfterToken(&[L_PAREN]), ScopeSymbols::Kinds(SymbolKind::TYPES)),
    scope(KEY_DECL, Anchor::AfterToken(&[KEY_KW]), ScopeSymbols::Kinds(&[SymbolKind::Attribute])),
    scope(IMPLEMENTS_REQ, Anchor::AfterToken(&[IMPLEMENTS_REQ_KW]), ScopeSymbols::Kinds(&[SymbolKind::Requirement])),
    scope(TEMPLATE_LIST, Anchor::AfterToken(&[L_PAREN]), ScopeSymbols::Kinds(&[SymbolKind::Template])),
];

/// Shared engine over the Umple rule tables
pub static UMPLE_QUERIES: Lazy<QueryEngine> = Lazy::new(QueryEngine::umple);

/// Query engine for a set of rule tables
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine {
    definitions: &'static [DefinitionRule],
    references: &'static [ReferenceRule],
    scopes: &'static [ScopeRule],
}

impl QueryEngine {
    pub fn umple() -> Self {
        let engine = Self {
            definitions: DEFINITIONS,
            references: REFERENCES,
            scopes: SCOPES,
        };
        for query_type in [QueryType::Definitions, QueryType::References, QueryType::Scopes] {
            debug!(
                "Loaded {} rules for {}",
                engine.rule_count(query_type),
                query_type.description()
            );
        }
        engine
    }

    pub fn rule_count(&self, query_type: QueryType) -> usize {
        match query_type {
            QueryType::Definitions => self.definitions.len(),
            QueryType::References => self.references.len(),
            QueryType::Scopes => self.scopes.len(),
        }
    }

    /// Every definition in the tree, in document order
    pub fn definitions(&self, root: &SyntaxNode) -> Vec<DefinitionCapture> {
        let mut captures = Vec::new();
        for node in root.descendants() {
            let Some(rule) = self
                .definitions
                .iter()
                .find(|rule| rule.capture == node.kind() && rule.context.matches(&node))
            else {
                continue;
            };
            let (Some(name), Some(declaration)) = (umple::ident_token(&node), node.parent()) else {
                continue;
            };
            captures.push(DefinitionCapture {
                name,
                declaration,
                kind: rule.kind,
            });
        }
        captures
    }

    /// All reference captures whose node covers `token`
    pub fn references_covering(&self, token: &SyntaxToken) -> Vec<ReferenceCapture> {
        let mut captures = Vec::new();
        for node in token.parent_ancestors() {
            for rule in self.references.iter().filter(|rule| rule.capture == node.kind()) {
                if !rule.context.matches(&node) {
                    continue;
                }
                if let Some(when) = rule.when {
                    if !when(&node) {
                        continue;
                    }
                }
                captures.push(ReferenceCapture {
                    node: node.clone(),
                    kinds: rule.kinds,
                });
            }
        }
        captures
    }

    /// Smallest covering capture; equal spans prefer the rule with fewer kinds
    pub fn most_specific_reference(&self, token: &SyntaxToken) -> Option<ReferenceCapture> {
        self.references_covering(token)
            .into_iter()
            .min_by_key(|capture| (capture.span().len(), capture.kinds.len()))
    }

    /// All scope captures whose span contains `offset`, deepest first
    pub fn scopes_containing(&self, root: &SyntaxNode, offset: TextSize) -> Vec<ScopeCapture> {
        let mut nodes: Vec<SyntaxNode> = Vec::new();
        let tokens: Vec<SyntaxToken> = match root.token_at_offset(offset) {
            TokenAtOffset::None => Vec::new(),
            TokenAtOffset::Single(token) => vec![token],
            TokenAtOffset::Between(left, right) => vec![left, right],
        };
        for token in tokens {
            for node in token.parent_ancestors() {
                if !nodes.contains(&node) {
                    nodes.push(node);
                }
            }
        }

        let mut captures = Vec::new();
        for node in nodes {
            for rule in self.scopes.iter().filter(|rule| rule.node == node.kind()) {
                let Some(start) = anchor_offset(&node, rule.anchor) else {
                    continue;
                };
                let end = node.text_range().end();
                let inclusive = !last_significant_token(&node)
                    .map(|t| matches!(t.kind(), R_BRACE | R_BRACKET | R_PAREN | SEMICOLON))
                    .unwrap_or(false);
                let contains = start <= offset && (offset < end || (inclusive && offset == end));
                if contains {
                    captures.push(ScopeCapture {
                        node: node.clone(),
                        start,
                        end,
                        symbols: rule.symbols,
                    });
                }
            }
        }
        captures
    }

    /// Narrowest scope containing `offset`
    pub fn innermost_scope(&self, root: &SyntaxNode, offset: TextSize) -> Option<ScopeCapture> {
        self.scopes_containing(root, offset)
            .into_iter()
            .min_by_key(|capture| capture.width())
    }
}

fn anchor_offset(node: &SyntaxNode, anchor: Anchor) -> Option<TextSize> {
    match anchor {
        Anchor::NodeStart => Some(node.text_range().start()),
        Anchor::AfterToken(kinds) => node
            .children_with_tokens()
            .filter_map(|element| element.into_token())
            .find(|token| kinds.contains(&token.kind()))
            .map(|token| token.text_range().end()),
        Anchor::AfterNode(kind) => node
            .children()
            .find(|child| child.kind() == kind)
            .map(|child| child.text_range().end()),
    }
}

/// Last non-trivia token inside `node`
fn last_significant_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    let start = node.text_range().start();
    let mut token = node.last_token()?;
    while token.kind().is_trivia() {
        token = token.prev_token()?;
        if token.text_range().start() < start {
            return None;
        }
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsp::models::SymbolKinds;
    use crate::parsers::umple::parse;

    fn scope_at(text: &str, marker: &str) -> Option<SymbolKinds> {
        let offset = text.find(marker).unwrap() + marker.len();
        let root = parse(text).syntax();
        UMPLE_QUERIES
            .innermost_scope(&root, TextSize::from(offset as u32))
            .map(|capture| capture.symbols.to_symbol_kinds())
    }

    fn reference_kinds(text: &str, needle: &str) -> Option<Vec<SymbolKind>> {
        let offset = text.find(needle).unwrap();
        let root = parse(text).syntax();
        let token = umple::token_at(&root, TextSize::from(offset as u32 + 1))?;
        UMPLE_QUERIES
            .most_specific_reference(&token)
            .map(|capture| capture.kinds.to_vec())
    }

    #[test]
    fn test_definitions_in_document_order() {
        let root = parse("class A { x; void m() {} sm { S1 {} } }").syntax();
        let found: Vec<(String, SymbolKind)> = UMPLE_QUERIES
            .definitions(&root)
            .into_iter()
            .map(|c| (c.name.text().to_string(), c.kind))
            .collect();
        assert_eq!(
            found,
            vec![
                ("A".to_string(), SymbolKind::Class),
                ("x".to_string(), SymbolKind::Attribute),
                ("m".to_string(), SymbolKind::Method),
                ("sm".to_string(), SymbolKind::StateMachine),
                ("S1".to_string(), SymbolKind::State),
            ]
        );
    }

    #[test]
    fn test_isa_reference_prefers_class_like_kinds() {
        let kinds = reference_kinds("class B { isA Person; }", "Person");
        assert_eq!(kinds, Some(SymbolKind::CLASS_LIKE.to_vec()));

        let kinds = reference_kinds("class B { Person p; }", "Person");
        assert_eq!(kinds, Some(SymbolKind::TYPES.to_vec()));
    }

    #[test]
    fn test_transition_target_and_guard_references() {
        let text = "class D { sm { Open { close [ready] -> Closed; } Closed {} } }";
        assert_eq!(reference_kinds(text, "Closed;"), Some(vec![SymbolKind::State]));
        assert_eq!(reference_kinds(text, "ready"), Some(vec![SymbolKind::Attribute]));
    }

    #[test]
    fn test_use_path_reference_only_for_mixsets() {
        assert_eq!(reference_kinds("use Logging;", "Logging"), Some(vec![SymbolKind::Mixset]));
        assert_eq!(reference_kinds("use Shared.ump;", "Shared"), None);
    }

    #[test]
    fn test_scope_innermost_wins() {
        let text = "class A { isA  }";
        assert_eq!(
            scope_at(text, "isA "),
            Some(SymbolKinds::Kinds(SymbolKind::CLASS_LIKE.to_vec()))
        );
        assert_eq!(
            scope_at("class A { void m() { x } }", "{ x"),
            Some(SymbolKinds::Suppress)
        );
        assert_eq!(
            scope_at("class A { }", "{ "),
            Some(SymbolKinds::Kinds(SymbolKind::TYPES.to_vec()))
        );
    }

    #[test]
    fn test_scope_after_transition_arrow() {
        let text = "class A { sm { S1 { go -> ; } } }";
        assert_eq!(
            scope_at(text, "-> "),
            Some(SymbolKinds::Kinds(vec![SymbolKind::State]))
        );
    }

    #[test]
    fn test_closing_brace_ends_scope() {
        let text = "class A { }\n";
        assert_eq!(scope_at(text, "}"), None);
    }
}
