use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{CompletionItemKind, Range, SymbolKind as LspSymbolKind};

/// Kinds of named model elements the index tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Interface,
    Trait,
    Enum,
    Attribute,
    State,
    #[serde(rename = "statemachine")]
    StateMachine,
    Method,
    Association,
    Mixset,
    Requirement,
    Template,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 12] = [
        SymbolKind::Class,
        SymbolKind::Interface,
        SymbolKind::Trait,
        SymbolKind::Enum,
        SymbolKind::Attribute,
        SymbolKind::State,
        SymbolKind::StateMachine,
        SymbolKind::Method,
        SymbolKind::Association,
        SymbolKind::Mixset,
        SymbolKind::Requirement,
        SymbolKind::Template,
    ];

    /// Entities that can own attributes, methods and templates
    pub const CLASS_LIKE: &'static [SymbolKind] =
        &[SymbolKind::Class, SymbolKind::Interface, SymbolKind::Trait];

    /// Anything usable as a type name
    pub const TYPES: &'static [SymbolKind] = &[
        SymbolKind::Class,
        SymbolKind::Interface,
        SymbolKind::Trait,
        SymbolKind::Enum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Trait => "trait",
            SymbolKind::Enum => "enum",
            SymbolKind::Attribute => "attribute",
            SymbolKind::State => "state",
            SymbolKind::StateMachine => "statemachine",
            SymbolKind::Method => "method",
            SymbolKind::Association => "association",
            SymbolKind::Mixset => "mixset",
            SymbolKind::Requirement => "requirement",
            SymbolKind::Template => "template",
        }
    }

    /// Members are contained by the class-like entity that declares them
    pub fn is_class_member(&self) -> bool {
        matches!(self, SymbolKind::Attribute | SymbolKind::Method | SymbolKind::Template)
    }

    /// States and state machines are contained by the outermost state machine
    pub fn is_state_member(&self) -> bool {
        matches!(self, SymbolKind::State | SymbolKind::StateMachine)
    }

    pub fn to_lsp_symbol_kind(&self) -> LspSymbolKind {
        match self {
            SymbolKind::Class => LspSymbolKind::CLASS,
            SymbolKind::Interface => LspSymbolKind::INTERFACE,
            SymbolKind::Trait => LspSymbolKind::INTERFACE,
            SymbolKind::Enum => LspSymbolKind::ENUM,
            SymbolKind::Attribute => LspSymbolKind::FIELD,
            SymbolKind::State => LspSymbolKind::ENUM_MEMBER,
            SymbolKind::StateMachine => LspSymbolKind::ENUM,
            SymbolKind::Method => LspSymbolKind::METHOD,
            SymbolKind::Association => LspSymbolKind::PROPERTY,
            SymbolKind::Mixset => LspSymbolKind::MODULE,
            SymbolKind::Requirement => LspSymbolKind::STRING,
            SymbolKind::Template => LspSymbolKind::FUNCTION,
        }
    }

    pub fn to_completion_kind(&self) -> CompletionItemKind {
        match self {
            SymbolKind::Class => CompletionItemKind::CLASS,
            SymbolKind::Interface | SymbolKind::Trait => CompletionItemKind::INTERFACE,
            SymbolKind::Enum => CompletionItemKind::ENUM,
            SymbolKind::Attribute => CompletionItemKind::FIELD,
            SymbolKind::State => CompletionItemKind::ENUM_MEMBER,
            SymbolKind::StateMachine => CompletionItemKind::ENUM,
            SymbolKind::Method => CompletionItemKind::METHOD,
            SymbolKind::Association => CompletionItemKind::PROPERTY,
            SymbolKind::Mixset => CompletionItemKind::MODULE,
            SymbolKind::Requirement => CompletionItemKind::REFERENCE,
            SymbolKind::Template => CompletionItemKind::SNIPPET,
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named definition found in an indexed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: String,
    pub kind: SymbolKind,
    pub file: PathBuf,
    /// Range of the defining identifier
    pub range: Range,
    /// Name of the owning entity; see [`SymbolKind::is_class_member`] and
    /// [`SymbolKind::is_state_member`]. Every other kind is its own container.
    pub container: Option<String>,
}

/// What kind of symbols may be completed at a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKinds {
    /// Symbols of these kinds
    Kinds(Vec<SymbolKind>),
    /// No symbols at all (embedded code, template bodies, enum bodies)
    Suppress,
    /// File names and mixsets after `use`
    UsePath,
    /// Attributes of the enclosing class only, without inherited ones
    OwnAttribute,
}

/// Everything the completion handler needs to know about a cursor position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionInfo {
    pub keywords: Vec<String>,
    pub operators: Vec<String>,
    pub symbol_kinds: Option<SymbolKinds>,
    pub is_definition_name: bool,
    pub is_comment: bool,
    pub prefix: String,
    pub enclosing_class: Option<String>,
    pub enclosing_state_machine: Option<String>,
}
