//! Syntax kinds for the Umple concrete syntax tree
//!
//! Tokens are leaves (identifiers, keywords, punctuation, comments). Nodes are
//! the composite constructs the extractor and the query tables match against.

/// All syntax kinds (tokens and nodes) in an Umple document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    WHITESPACE = 0,
    LINE_COMMENT,
    BLOCK_COMMENT,

    // =========================================================================
    // LITERALS
    // =========================================================================
    IDENT,
    INTEGER,
    DECIMAL,
    STRING,
    /// `<<! ... !>>` template text
    TEMPLATE_TEXT,

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    L_BRACE,     // {
    R_BRACE,     // }
    L_BRACKET,   // [
    R_BRACKET,   // ]
    L_PAREN,     // (
    R_PAREN,     // )
    SEMICOLON,   // ;
    COMMA,       // ,
    DOT,         // .
    DOT_DOT,     // ..
    COLON,       // :
    STAR,        // *
    SLASH,       // /
    EQ,          // =
    EQ_EQ,       // ==
    BANG_EQ,     // !=
    LT,          // <
    GT,          // >
    LT_EQ,       // <=
    GT_EQ,       // >=
    PLUS,        // +
    MINUS,       // -
    BANG,        // !
    PERCENT,     // %
    AMP_AMP,     // &&
    PIPE_PIPE,   // ||

    // =========================================================================
    // ASSOCIATION AND TRANSITION OPERATORS
    // =========================================================================
    ARROW,          // ->
    LEFT_ARROW,     // <-
    DASH_DASH,      // --
    COMPOSE_LEFT,   // <@>-
    COMPOSE_RIGHT,  // -<@>
    DIRECTED_RIGHT, // >->
    DIRECTED_LEFT,  // <-<

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    USE_KW,
    NAMESPACE_KW,
    GENERATE_KW,
    CLASS_KW,
    INTERFACE_KW,
    TRAIT_KW,
    ENUM_KW,
    MIXSET_KW,
    STATEMACHINE_KW,
    ASSOCIATION_KW,
    REQ_KW,
    ISA_KW,
    KEY_KW,
    IMPLEMENTS_REQ_KW,
    EMIT_KW,
    DEPEND_KW,
    SINGLETON_KW,
    ABSTRACT_KW,
    CONST_KW,
    IMMUTABLE_KW,
    LAZY_KW,
    UNIQUE_KW,
    AUTOUNIQUE_KW,
    INTERNAL_KW,
    DEFAULTED_KW,
    SETTABLE_KW,
    PUBLIC_KW,
    PRIVATE_KW,
    PROTECTED_KW,
    STATIC_KW,
    QUEUED_KW,
    POOLED_KW,
    ENTRY_KW,
    EXIT_KW,
    DO_KW,
    FINAL_KW,
    AFTER_KW,
    AFTER_EVERY_KW,

    // =========================================================================
    // NODES
    // =========================================================================
    SOURCE_FILE,
    USE_STATEMENT,
    USE_PATH,
    NAMESPACE_DECL,
    GENERATE_DECL,
    QUALIFIED_NAME,
    CLASS_DECL,
    INTERFACE_DECL,
    TRAIT_DECL,
    CLASS_BODY,
    ENUM_DECL,
    ENUM_VALUE,
    MIXSET_DECL,
    REQUIREMENT_DECL,
    ASSOCIATION_BLOCK,
    ASSOCIATION_DECL,
    ASSOCIATION_END,
    MULTIPLICITY,
    ISA_DECL,
    TYPE_REF,
    TYPE_ARGS,
    ATTRIBUTE_DECL,
    INITIALIZER,
    METHOD_DECL,
    PARAM_LIST,
    PARAM,
    CODE_BLOCK,
    KEY_DECL,
    IMPLEMENTS_REQ,
    EMIT_DECL,
    TEMPLATE_LIST,
    TEMPLATE_DECL,
    DEPEND_DECL,
    MODIFIER_DECL,
    CONSTRAINT,
    STATE_MACHINE,
    STATE_BODY,
    STATE,
    TRANSITION,
    EVENT_SPEC,
    GUARD,
    ACTION,
    ENTRY_EXIT_ACTION,
    /// Definition name (wraps an IDENT)
    NAME,
    /// Reference to a named entity (wraps an IDENT)
    NAME_REF,

    // =========================================================================
    // SPECIAL
    // =========================================================================
    /// Unrecognized input (token) or a recovery region (node)
    ERROR,
    /// Sentinel returned when peeking past the last token; never in a tree
    EOF,

    #[doc(hidden)]
    __LAST,
}

use SyntaxKind::*;

impl SyntaxKind {
    /// Whitespace or comment
    pub fn is_trivia(self) -> bool {
        matches!(self, WHITESPACE | LINE_COMMENT | BLOCK_COMMENT)
    }

    pub fn is_comment(self) -> bool {
        matches!(self, LINE_COMMENT | BLOCK_COMMENT)
    }

    pub fn is_keyword(self) -> bool {
        (self as u16) >= (USE_KW as u16) && (self as u16) <= (AFTER_EVERY_KW as u16)
    }

    pub fn is_punct(self) -> bool {
        (self as u16) >= (L_BRACE as u16) && (self as u16) <= (DIRECTED_LEFT as u16)
    }

    /// Tokens whose text varies (identifiers, numbers, strings); the lookahead
    /// filter drops these since they cannot be offered as literal completions.
    pub fn is_named(self) -> bool {
        matches!(self, IDENT | INTEGER | DECIMAL | STRING | TEMPLATE_TEXT | ERROR | EOF)
    }

    /// Punctuation that only delimits structure and is never worth completing
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            L_BRACE | R_BRACE | L_BRACKET | R_BRACKET | L_PAREN | R_PAREN | SEMICOLON | COMMA
                | DOT | DOT_DOT | COLON | STAR | SLASH | EQ
        )
    }

    /// Class-like entities own attributes, methods and templates
    pub fn is_class_like(self) -> bool {
        matches!(self, CLASS_DECL | INTERFACE_DECL | TRAIT_DECL)
    }

    /// Literal source text of a fixed token, if it has one
    pub fn text(self) -> Option<&'static str> {
        let text = match self {
            L_BRACE => "{",
            R_BRACE => "}",
            L_BRACKET => "[",
            R_BRACKET => "]",
            L_PAREN => "(",
            R_PAREN => ")",
            SEMICOLON => ";",
            COMMA => ",",
            DOT => ".",
            DOT_DOT => "..",
            COLON => ":",
            STAR => "*",
            SLASH => "/",
            EQ => "=",
            EQ_EQ => "==",
            BANG_EQ => "!=",
            LT => "<",
            GT => ">",
            LT_EQ => "<=",
            GT_EQ => ">=",
            PLUS => "+",
            MINUS => "-",
            BANG => "!",
            PERCENT => "%",
            AMP_AMP => "&&",
            PIPE_PIPE => "||",
            ARROW => "->",
            LEFT_ARROW => "<-",
            DASH_DASH => "--",
            COMPOSE_LEFT => "<@>-",
            COMPOSE_RIGHT => "-<@>",
            DIRECTED_RIGHT => ">->",
            DIRECTED_LEFT => "<-<",
            USE_KW => "use",
            NAMESPACE_KW => "namespace",
            GENERATE_KW => "generate",
            CLASS_KW => "class",
            INTERFACE_KW => "interface",
            TRAIT_KW => "trait",
            ENUM_KW => "enum",
            MIXSET_KW => "mixset",
            STATEMACHINE_KW => "statemachine",
            ASSOCIATION_KW => "association",
            REQ_KW => "req",
            ISA_KW => "isA",
            KEY_KW => "key",
            IMPLEMENTS_REQ_KW => "implementsReq",
            EMIT_KW => "emit",
            DEPEND_KW => "depend",
            SINGLETON_KW => "singleton",
            ABSTRACT_KW => "abstract",
            CONST_KW => "const",
            IMMUTABLE_KW => "immutable",
            LAZY_KW => "lazy",
            UNIQUE_KW => "unique",
            AUTOUNIQUE_KW => "autounique",
            INTERNAL_KW => "internal",
            DEFAULTED_KW => "defaulted",
            SETTABLE_KW => "settable",
            PUBLIC_KW => "public",
            PRIVATE_KW => "private",
            PROTECTED_KW => "protected",
            STATIC_KW => "static",
            QUEUED_KW => "queued",
            POOLED_KW => "pooled",
            ENTRY_KW => "entry",
            EXIT_KW => "exit",
            DO_KW => "do",
            FINAL_KW => "final",
            AFTER_KW => "after",
            AFTER_EVERY_KW => "afterEvery",
            _ => return None,
        };
        Some(text)
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

impl From<rowan::SyntaxKind> for SyntaxKind {
    fn from(raw: rowan::SyntaxKind) -> Self {
        assert!(raw.0 < SyntaxKind::__LAST as u16);
        // Safety: every raw kind in a tree was produced from a SyntaxKind and is bounds checked above
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }
}

/// Language definition for rowan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UmpleLanguage {}

impl rowan::Language for UmpleLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw.into()
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

pub type SyntaxNode = rowan::SyntaxNode<UmpleLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<UmpleLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<UmpleLanguage>;
