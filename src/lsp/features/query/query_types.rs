//! Query type definitions and capture metadata
//!
//! A query is a table of structural rules over the Umple syntax tree. Each
//! rule names the node kind it captures and the context the capture must
//! appear in; the engine walks the tree and reports every capture that
//! satisfies its rule.

use rowan::{TextRange, TextSize};

use crate::lsp::models::{SymbolKind, SymbolKinds};
use crate::parsers::umple::{SyntaxKind, SyntaxNode, SyntaxToken};

/// Types of queries supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    /// Names introduced by declarations
    Definitions,
    /// Identifiers that refer to declarations
    References,
    /// Regions that decide which symbols complete
    Scopes,
}

impl QueryType {
    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            QueryType::Definitions => "Symbol definitions",
            QueryType::References => "Symbol references",
            QueryType::Scopes => "Completion scopes",
        }
    }
}

/// Structural position a capture must occupy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// The capture's parent has this kind
    Parent(SyntaxKind),
    /// Some ancestor of the capture has this kind
    Ancestor(SyntaxKind),
    /// No constraint
    Anywhere,
}

impl Context {
    pub fn matches(&self, capture: &SyntaxNode) -> bool {
        match self {
            Context::Parent(kind) => capture.parent().map(|p| p.kind() == *kind).unwrap_or(false),
            Context::Ancestor(kind) => capture.ancestors().skip(1).any(|a| a.kind() == *kind),
            Context::Anywhere => true,
        }
    }
}

/// `(name) @definition.<kind>` inside a declaration
#[derive(Debug, Clone, Copy)]
pub struct DefinitionRule {
    pub capture: SyntaxKind,
    pub context: Context,
    pub kind: SymbolKind,
}

/// `(capture) @reference.<kinds>`; `when` further restricts the capture
#[derive(Debug, Clone, Copy)]
pub struct ReferenceRule {
    pub capture: SyntaxKind,
    pub context: Context,
    pub kinds: &'static [SymbolKind],
    pub when: Option<fn(&SyntaxNode) -> bool>,
}

/// Where a scope begins inside its node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// At the node's first byte
    NodeStart,
    /// After the first direct child token of one of these kinds
    AfterToken(&'static [SyntaxKind]),
    /// After the first direct child node of this kind
    AfterNode(SyntaxKind),
}

/// Static counterpart of [`SymbolKinds`] for rule tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeSymbols {
    Kinds(&'static [SymbolKind]),
    Suppress,
    UsePath,
    OwnAttribute,
}

impl ScopeSymbols {
    pub fn to_symbol_kinds(self) -> SymbolKinds {
        match self {
            ScopeSymbols::Kinds(kinds) => SymbolKinds::Kinds(kinds.to_vec()),
            ScopeSymbols::Suppress => SymbolKinds::Suppress,
            ScopeSymbols::UsePath => SymbolKinds::UsePath,
            ScopeSymbols::OwnAttribute => SymbolKinds::OwnAttribute,
        }
    }
}

/// `(node) @scope.<symbols>` spanning from `anchor` to the node's end
#[derive(Debug, Clone, Copy)]
pub struct ScopeRule {
    pub node: SyntaxKind,
    pub anchor: Anchor,
    pub symbols: ScopeSymbols,
}

/// A definition capture
#[derive(Debug, Clone)]
pub struct DefinitionCapture {
    /// The declared identifier
    pub name: SyntaxToken,
    /// The declaration node owning the name
    pub declaration: SyntaxNode,
    pub kind: SymbolKind,
}

/// A reference capture covering some identifier
#[derive(Debug, Clone)]
pub struct ReferenceCapture {
    pub node: SyntaxNode,
    pub kinds: &'static [SymbolKind],
}

impl ReferenceCapture {
    pub fn span(&self) -> TextRange {
        self.node.text_range()
    }
}

/// A scope capture containing some offset
#[derive(Debug, Clone)]
pub struct ScopeCapture {
    pub node: SyntaxNode,
    pub start: TextSize,
    pub end: TextSize,
    pub symbols: ScopeSymbols,
}

impl ScopeCapture {
    pub fn width(&self) -> TextSize {
        self.end - self.start
    }
}
