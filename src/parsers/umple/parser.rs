//! Recursive descent parser for Umple
//!
//! Builds a rowan GreenNode tree from tokens. Parsing never fails: anything the
//! grammar does not recognise is wrapped in ERROR nodes and parsing resumes at
//! the next construct.
//!
//! The same parser doubles as the lookahead oracle. [`lookahead`] parses only
//! the text before an offset and records every token kind the parser tested for
//! once it ran out of input, up to the first error at that point.

use super::lexer::{Lexer, Token};
use super::syntax_kind::SyntaxKind::{self, *};
use rowan::{Checkpoint, GreenNode, GreenNodeBuilder, TextRange, TextSize};

/// Parse result containing the green tree and any errors
#[derive(Debug, Clone)]
pub struct Parse {
    pub green: GreenNode,
    pub errors: Vec<SyntaxError>,
}

impl Parse {
    /// Get the root syntax node
    pub fn syntax(&self) -> super::SyntaxNode {
        super::SyntaxNode::new_root(self.green.clone())
    }

    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Parse Umple source code into a CST
pub fn parse(input: &str) -> Parse {
    let tokens: Vec<_> = Lexer::new(input).collect();
    let mut parser = Parser::new(&tokens);
    parser.parse_source_file();
    parser.finish()
}

/// Token kinds the grammar accepts right after `input[..offset]`.
///
/// The result is unfiltered: it contains named tokens (`IDENT`) and structural
/// punctuation alongside keywords and operators.
pub fn lookahead(input: &str, offset: usize) -> Vec<SyntaxKind> {
    let mut end = offset.min(input.len());
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    let tokens: Vec<_> = Lexer::new(&input[..end]).collect();
    let mut parser = Parser::new(&tokens);
    parser.tracking = true;
    parser.parse_source_file();
    parser.expected
}

pub(crate) const TOP_LEVEL_FIRST: &[SyntaxKind] = &[
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
];

const ATTRIBUTE_MODIFIERS: &[SyntaxKind] = &[
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
    ABSTRACT_KW,
];

const CLASS_MEMBER_FIRST: &[SyntaxKind] = &[
    ISA_KW,
    KEY_KW,
    IMPLEMENTS_REQ_KW,
    DEPEND_KW,
    EMIT_KW,
    MIXSET_KW,
    ENUM_KW,
    SINGLETON_KW,
    QUEUED_KW,
    POOLED_KW,
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
    ABSTRACT_KW,
    IDENT,
    INTEGER,
    STAR,
    L_BRACKET,
];

const MIXSET_MEMBER_FIRST: &[SyntaxKind] = &[
    CLASS_KW,
    INTERFACE_KW,
    TRAIT_KW,
    STATEMACHINE_KW,
    ASSOCIATION_KW,
    REQ_KW,
    ISA_KW,
    KEY_KW,
    IMPLEMENTS_REQ_KW,
    DEPEND_KW,
    EMIT_KW,
    MIXSET_KW,
    ENUM_KW,
    QUEUED_KW,
    POOLED_KW,
    IDENT,
    INTEGER,
    STAR,
];

const STATE_MEMBER_FIRST: &[SyntaxKind] = &[
    ENTRY_KW,
    EXIT_KW,
    DO_KW,
    FINAL_KW,
    AFTER_KW,
    AFTER_EVERY_KW,
    IDENT,
    L_BRACKET,
    SLASH,
    ARROW,
    PIPE_PIPE,
];

const ASSOCIATION_MEMBER_FIRST: &[SyntaxKind] = &[INTEGER, STAR];

pub(crate) const ASSOCIATION_OPERATORS: &[SyntaxKind] = &[
    DASH_DASH,
    ARROW,
    LEFT_ARROW,
    COMPOSE_LEFT,
    COMPOSE_RIGHT,
    DIRECTED_RIGHT,
    DIRECTED_LEFT,
];

/// The parser state
struct Parser<'a> {
    tokens: &'a [Token<'a>],
    pos: usize,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<SyntaxError>,
    /// Record kinds tested at end of input
    tracking: bool,
    /// Set by the first error at end of input; recording stops there
    frozen: bool,
    expected: Vec<SyntaxKind>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            pos: 0,
            builder: GreenNodeBuilder::new(),
            errors: Vec::new(),
            tracking: false,
            frozen: false,
            expected: Vec::new(),
        }
    }

    fn finish(self) -> Parse {
        Parse {
            green: self.builder.finish(),
            errors: self.errors,
        }
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    /// Index of the nth non-trivia token at or after `pos`
    fn nth_index(&self, n: usize) -> Option<usize> {
        self.tokens
            .iter()
            .enumerate()
            .skip(self.pos)
            .filter(|(_, t)| !t.kind.is_trivia())
            .nth(n)
            .map(|(i, _)| i)
    }

    /// Kind of the nth non-trivia token; never records
    fn nth(&self, n: usize) -> SyntaxKind {
        self.nth_index(n)
            .map(|i| self.tokens[i].kind)
            .unwrap_or(EOF)
    }

    fn peek(&self) -> SyntaxKind {
        self.nth(0)
    }

    fn at_eof(&self) -> bool {
        self.peek() == EOF
    }

    fn at(&mut self, kind: SyntaxKind) -> bool {
        let current = self.peek();
        if current == EOF {
            self.record(kind);
        }
        current == kind
    }

    fn at_any(&mut self, kinds: &[SyntaxKind]) -> bool {
        let current = self.peek();
        if current == EOF {
            self.probe(kinds);
        }
        kinds.contains(&current)
    }

    /// Record a whole FIRST set when a loop runs out of input
    fn probe(&mut self, kinds: &[SyntaxKind]) {
        if self.at_eof() {
            for &kind in kinds {
                self.record(kind);
            }
        }
    }

    fn record(&mut self, kind: SyntaxKind) {
        if self.tracking && !self.frozen && !self.expected.contains(&kind) {
            self.expected.push(kind);
        }
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    fn eat_trivia(&mut self) {
        let tokens = self.tokens;
        while let Some(token) = tokens.get(self.pos) {
            if !token.kind.is_trivia() {
                break;
            }
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    /// Consume pending trivia and the next real token
    fn bump(&mut self) {
        self.eat_trivia();
        let tokens = self.tokens;
        if let Some(token) = tokens.get(self.pos) {
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: SyntaxKind) -> bool {
        if self.eat(kind) {
            true
        } else {
            let what = kind.text().map(|t| format!("'{}'", t)).unwrap_or_else(|| format!("{:?}", kind));
            self.error(format!("expected {}", what));
            false
        }
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    /// Record an error at the next token. Pending trivia joins the current
    /// node so an incomplete construct extends up to whatever follows it.
    fn error(&mut self, message: impl Into<String>) {
        let range = match self.nth_index(0) {
            Some(i) => TextRange::at(self.tokens[i].offset, TextSize::of(self.tokens[i].text)),
            None => TextRange::empty(self.tokens.last().map(|t| t.end()).unwrap_or_default()),
        };
        self.errors.push(SyntaxError::new(message, range));
        self.eat_trivia();
        if self.at_eof() {
            self.frozen = true;
        }
    }

    /// Skip to the end of the broken construct: past a `;`, or up to a `}` or a
    /// keyword that starts a new member.
    fn recover(&mut self, message: &str, first: &[SyntaxKind]) {
        self.error(message);
        if self.at_eof() {
            return;
        }
        self.start_node(ERROR);
        loop {
            let kind = self.peek();
            self.bump();
            if kind == SEMICOLON {
                break;
            }
            let next = self.peek();
            if next == EOF || next == R_BRACE || (next.is_keyword() && first.contains(&next)) {
                break;
            }
        }
        self.finish_node();
    }

    /// Wrap a single token in an ERROR node
    fn bump_error(&mut self) {
        self.start_node(ERROR);
        self.bump();
        self.finish_node();
    }

    // =========================================================================
    // Node building helpers
    // =========================================================================

    fn start_node(&mut self, kind: SyntaxKind) {
        self.eat_trivia();
        self.builder.start_node(kind.into());
    }

    fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.eat_trivia();
        self.builder.checkpoint()
    }

    fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        self.builder.start_node_at(checkpoint, kind.into());
    }

    /// `{ member* }` with a FIRST-set probe when input ends inside the braces
    fn parse_braced(&mut self, first: &[SyntaxKind], member: fn(&mut Self)) {
        if !self.expect(L_BRACE) {
            return;
        }
        while !self.at(R_BRACE) {
            if self.at_eof() {
                self.probe(first);
                break;
            }
            let before = self.nth_index(0);
            member(self);
            if self.nth_index(0) == before {
                self.bump_error();
            }
        }
        self.expect(R_BRACE);
    }

    // =========================================================================
    // Grammar rules: top level
    // =========================================================================

    /// SourceFile = TopLevel*
    fn parse_source_file(&mut self) {
        self.builder.start_node(SOURCE_FILE.into());
        loop {
            if self.at_eof() {
                self.probe(TOP_LEVEL_FIRST);
                break;
            }
            let before = self.nth_index(0);
            self.parse_top_level();
            if self.nth_index(0) == before {
                self.bump_error();
            }
        }
        self.eat_trivia();
        self.builder.finish_node();
    }

    fn parse_top_level(&mut self) {
        match self.peek() {
            USE_KW => self.parse_use(),
            NAMESPACE_KW => self.parse_namespace(),
            GENERATE_KW => self.parse_generate(),
            CLASS_KW => self.parse_class_like(CLASS_DECL),
            INTERFACE_KW => self.parse_class_like(INTERFACE_DECL),
            TRAIT_KW => self.parse_class_like(TRAIT_DECL),
            ENUM_KW => self.parse_enum(),
            MIXSET_KW => self.parse_mixset(),
            REQ_KW => self.parse_requirement(),
            ASSOCIATION_KW => self.parse_association_block(),
            STATEMACHINE_KW => self.parse_state_machine(),
            _ => self.recover("expected a declaration", TOP_LEVEL_FIRST),
        }
    }

    /// UseStatement = 'use' UsePath (',' UsePath)* ';'
    fn parse_use(&mut self) {
        self.start_node(USE_STATEMENT);
        self.bump();
        self.parse_use_path();
        while self.eat(COMMA) {
            self.parse_use_path();
        }
        self.expect(SEMICOLON);
        self.finish_node();
    }

    /// A run of tokens with no trivia between them, e.g. `../lib/Base.ump`
    fn parse_use_path(&mut self) {
        let starts_path = match self.peek() {
            EOF | SEMICOLON | COMMA | L_BRACE | R_BRACE => false,
            kind => !TOP_LEVEL_FIRST.contains(&kind),
        };
        if !starts_path {
            self.error("expected a file or mixset name");
            return;
        }
        self.start_node(USE_PATH);
        self.bump();
        let tokens = self.tokens;
        while let Some(token) = tokens.get(self.pos) {
            if token.kind.is_trivia() || matches!(token.kind, SEMICOLON | COMMA | L_BRACE | R_BRACE) {
                break;
            }
            self.bump();
        }
        self.finish_node();
    }

    /// Namespace = 'namespace' QualifiedName ';'
    fn parse_namespace(&mut self) {
        self.start_node(NAMESPACE_DECL);
        self.bump();
        if self.peek() == MINUS {
            self.bump();
        } else if self.at(IDENT) {
            self.start_node(QUALIFIED_NAME);
            self.bump();
            while self.peek() == DOT && self.nth(1) == IDENT {
                self.bump();
                self.bump();
            }
            self.finish_node();
        } else {
            self.error("expected a namespace name");
        }
        self.expect(SEMICOLON);
        self.finish_node();
    }

    fn parse_generate(&mut self) {
        self.start_node(GENERATE_DECL);
        self.bump();
        while !self.at_eof() {
            let kind = self.peek();
            if kind == SEMICOLON || kind == R_BRACE || TOP_LEVEL_FIRST.contains(&kind) {
                break;
            }
            self.bump();
        }
        self.expect(SEMICOLON);
        self.finish_node();
    }

    /// ClassLike = ('class' | 'interface' | 'trait') Name ClassBody
    fn parse_class_like(&mut self, kind: SyntaxKind) {
        self.start_node(kind);
        self.bump();
        self.parse_name();
        if self.at(L_BRACE) {
            self.parse_class_body();
        } else {
            self.error("expected '{'");
        }
        self.finish_node();
    }

    fn parse_class_body(&mut self) {
        self.start_node(CLASS_BODY);
        self.parse_braced(CLASS_MEMBER_FIRST, Self::parse_class_member);
        self.finish_node();
    }

    fn parse_name(&mut self) -> bool {
        if self.at(IDENT) {
            self.start_node(NAME);
            self.bump();
            self.finish_node();
            true
        } else {
            self.error("expected a name");
            false
        }
    }

    fn parse_name_ref(&mut self) {
        self.start_node(NAME_REF);
        self.bump();
        self.finish_node();
    }

    /// NameRef (',' NameRef)*
    fn parse_name_ref_list(&mut self, what: &str) {
        loop {
            if self.at(IDENT) {
                self.parse_name_ref();
            } else {
                self.error(format!("expected {}", what));
                break;
            }
            if !self.eat(COMMA) {
                break;
            }
        }
    }

    /// Enum = 'enum' Name '{' (Value (',' Value)*)? '}'
    fn parse_enum(&mut self) {
        self.start_node(ENUM_DECL);
        self.bump();
        self.parse_name();
        if self.expect(L_BRACE) {
            loop {
                match self.peek() {
                    IDENT => {
                        self.start_node(ENUM_VALUE);
                        self.bump();
                        self.finish_node();
                    }
                    COMMA => self.bump(),
                    R_BRACE | EOF => break,
                    _ => self.bump_error(),
                }
            }
            self.expect(R_BRACE);
        }
        self.finish_node();
    }

    /// Mixset = 'mixset' Name ('{' MixsetMember* '}' | TopLevel)
    fn parse_mixset(&mut self) {
        self.start_node(MIXSET_DECL);
        self.bump();
        self.parse_name();
        let next = self.peek();
        if next == L_BRACE {
            self.parse_braced(MIXSET_MEMBER_FIRST, Self::parse_mixset_member);
        } else if TOP_LEVEL_FIRST.contains(&next) {
            self.parse_top_level();
        } else {
            self.error("expected '{'");
        }
        self.finish_node();
    }

    fn parse_mixset_member(&mut self) {
        match self.peek() {
            MIXSET_KW | ENUM_KW => self.parse_class_member(),
            kind if TOP_LEVEL_FIRST.contains(&kind) => self.parse_top_level(),
            _ => self.parse_class_member(),
        }
    }

    /// Requirement = 'req' Name Ident? CodeBlock
    fn parse_requirement(&mut self) {
        self.start_node(REQUIREMENT_DECL);
        self.bump();
        self.parse_name();
        if self.peek() == IDENT {
            self.bump();
        }
        if self.peek() == L_BRACE {
            self.parse_code_block();
        } else {
            self.error("expected requirement text");
        }
        self.finish_node();
    }

    /// AssociationBlock = 'association' Ident? '{' Association* '}'
    fn parse_association_block(&mut self) {
        self.start_node(ASSOCIATION_BLOCK);
        self.bump();
        if self.peek() == IDENT {
            self.bump();
        }
        self.parse_braced(ASSOCIATION_MEMBER_FIRST, Self::parse_association_member);
        self.finish_node();
    }

    fn parse_association_member(&mut self) {
        match self.peek() {
            INTEGER | STAR => self.parse_association(false),
            _ => self.recover("expected an association", &[]),
        }
    }

    // =========================================================================
    // Grammar rules: class members
    // =========================================================================

    fn parse_class_member(&mut self) {
        match self.peek() {
            ISA_KW => self.parse_isa(),
            KEY_KW => self.parse_key(),
            IMPLEMENTS_REQ_KW => self.parse_implements_req(),
            DEPEND_KW => self.parse_depend(),
            EMIT_KW => self.parse_emit(),
            MIXSET_KW => self.parse_mixset(),
            ENUM_KW => self.parse_enum(),
            L_BRACKET => self.parse_constraint(),
            QUEUED_KW | POOLED_KW => self.parse_state_machine(),
            SINGLETON_KW | ABSTRACT_KW if self.nth(1) == SEMICOLON => self.parse_modifier(),
            INTEGER | STAR => self.parse_association(true),
            IDENT if self.nth(1) == L_BRACE => self.parse_state_machine(),
            IDENT if self.nth(1) == TEMPLATE_TEXT => self.parse_template(),
            IDENT => self.parse_attribute_or_method(),
            kind if ATTRIBUTE_MODIFIERS.contains(&kind) => self.parse_attribute_or_method(),
            _ => self.recover("expected a class member", CLASS_MEMBER_FIRST),
        }
    }

    /// IsA = 'isA' TypeRef (',' TypeRef)* ';'
    fn parse_isa(&mut self) {
        self.start_node(ISA_DECL);
        self.bump();
        loop {
            if !self.parse_type_ref() {
                break;
            }
            if !self.eat(COMMA) {
                break;
            }
        }
        self.expect(SEMICOLON);
        self.finish_node();
    }

    /// TypeRef = Ident ('.' Ident)* TypeArgs? ('[' ']')*
    fn parse_type_ref(&mut self) -> bool {
        if !self.at(IDENT) {
            self.error("expected a type");
            return false;
        }
        self.start_node(TYPE_REF);
        self.bump();
        while self.peek() == DOT && self.nth(1) == IDENT {
            self.bump();
            self.bump();
        }
        if self.peek() == LT {
            self.parse_type_args();
        }
        while self.peek() == L_BRACKET && self.nth(1) == R_BRACKET {
            self.bump();
            self.bump();
        }
        self.finish_node();
        true
    }

    fn parse_type_args(&mut self) {
        self.start_node(TYPE_ARGS);
        self.bump();
        loop {
            match self.peek() {
                GT => {
                    self.bump();
                    break;
                }
                IDENT => {
                    self.parse_type_ref();
                }
                EOF | SEMICOLON | L_BRACE | R_BRACE => {
                    self.error("expected '>'");
                    break;
                }
                _ => self.bump(),
            }
        }
        self.finish_node();
    }

    /// Key = 'key' '{' (NameRef (',' NameRef)*)? '}'
    fn parse_key(&mut self) {
        self.start_node(KEY_DECL);
        self.bump();
        if self.expect(L_BRACE) {
            while !self.at(R_BRACE) && !self.at_eof() {
                if self.peek() == IDENT {
                    self.parse_name_ref();
                } else if !self.eat(COMMA) {
                    self.error("expected an attribute name");
                    break;
                }
            }
            self.expect(R_BRACE);
        }
        self.finish_node();
    }

    /// ImplementsReq = 'implementsReq' NameRef (',' NameRef)* ';'
    fn parse_implements_req(&mut self) {
        self.start_node(IMPLEMENTS_REQ);
        self.bump();
        self.parse_name_ref_list("a requirement name");
        self.expect(SEMICOLON);
        self.finish_node();
    }

    fn parse_depend(&mut self) {
        self.start_node(DEPEND_DECL);
        self.bump();
        while !matches!(self.peek(), SEMICOLON | R_BRACE | EOF) {
            self.bump();
        }
        self.expect(SEMICOLON);
        self.finish_node();
    }

    /// Emit = 'emit' Name ParamList? ('(' NameRef (',' NameRef)* ')')? ';'
    fn parse_emit(&mut self) {
        self.start_node(EMIT_DECL);
        self.bump();
        self.parse_name();
        if self.peek() == L_PAREN {
            self.parse_param_list();
        }
        if self.peek() == L_PAREN {
            self.start_node(TEMPLATE_LIST);
            self.bump();
            self.parse_name_ref_list("a template name");
            self.expect(R_PAREN);
            self.finish_node();
        }
        self.expect(SEMICOLON);
        self.finish_node();
    }

    /// Constraint = '[' Expr ']'
    fn parse_constraint(&mut self) {
        self.start_node(CONSTRAINT);
        self.bump();
        self.parse_expr(&[R_BRACKET]);
        self.expect(R_BRACKET);
        self.finish_node();
    }

    fn parse_modifier(&mut self) {
        self.start_node(MODIFIER_DECL);
        self.bump();
        self.expect(SEMICOLON);
        self.finish_node();
    }

    /// Template = Name TemplateText
    fn parse_template(&mut self) {
        self.start_node(TEMPLATE_DECL);
        self.parse_name();
        self.bump();
        self.finish_node();
    }

    /// Attribute = Modifier* TypeRef? Name ('=' Expr)? ';'
    /// Method    = Modifier* TypeRef? Name ParamList (Ident? CodeBlock)* | ';'
    fn parse_attribute_or_method(&mut self) {
        let checkpoint = self.checkpoint();
        while ATTRIBUTE_MODIFIERS.contains(&self.peek()) {
            self.bump();
        }
        if self.peek() == IDENT && matches!(self.nth(1), IDENT | LT | L_BRACKET | DOT) {
            self.parse_type_ref();
        }
        self.parse_name();

        if self.peek() == L_PAREN {
            self.start_node_at(checkpoint, METHOD_DECL);
            self.parse_param_list();
            let mut has_body = false;
            loop {
                if self.peek() == IDENT && self.nth(1) == L_BRACE {
                    self.bump();
                }
                if self.peek() != L_BRACE {
                    break;
                }
                self.parse_code_block();
                has_body = true;
            }
            if !has_body {
                self.expect(SEMICOLON);
            }
        } else {
            self.start_node_at(checkpoint, ATTRIBUTE_DECL);
            if self.peek() == EQ {
                self.start_node(INITIALIZER);
                self.bump();
                self.parse_expr(&[]);
                self.finish_node();
            }
            self.expect(SEMICOLON);
        }
        self.finish_node();
    }

    /// ParamList = '(' (Param (',' Param)*)? ')'
    fn parse_param_list(&mut self) {
        self.start_node(PARAM_LIST);
        self.bump();
        if self.peek() != R_PAREN {
            loop {
                if self.peek() != IDENT {
                    self.error("expected a parameter");
                    break;
                }
                self.start_node(PARAM);
                self.parse_type_ref();
                self.parse_name();
                self.finish_node();
                if !self.eat(COMMA) {
                    break;
                }
            }
        }
        self.expect(R_PAREN);
        self.finish_node();
    }

    /// Opaque expression; identifiers become NAME_REFs. Stops at a statement
    /// boundary or, outside parentheses, at one of `terminators`.
    fn parse_expr(&mut self, terminators: &[SyntaxKind]) {
        let mut depth = 0usize;
        loop {
            let kind = self.peek();
            match kind {
                EOF | SEMICOLON | L_BRACE | R_BRACE => break,
                _ if depth == 0 && terminators.contains(&kind) => break,
                IDENT => self.parse_name_ref(),
                L_PAREN => {
                    depth += 1;
                    self.bump();
                }
                R_PAREN => {
                    depth = depth.saturating_sub(1);
                    self.bump();
                }
                _ => self.bump(),
            }
        }
    }

    /// Balanced `{ ... }` of embedded host-language code
    fn parse_code_block(&mut self) {
        self.start_node(CODE_BLOCK);
        self.bump();
        let mut depth = 1usize;
        loop {
            match self.peek() {
                EOF => {
                    self.error("unterminated code block");
                    break;
                }
                L_BRACE => {
                    depth += 1;
                    self.bump();
                }
                R_BRACE => {
                    self.bump();
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => self.bump(),
            }
        }
        self.finish_node();
    }

    /// Association = End Operator End ';'
    ///
    /// Inline associations (inside a class) omit the type on the left end.
    fn parse_association(&mut self, inline: bool) {
        self.start_node(ASSOCIATION_DECL);
        self.parse_association_end(inline);
        if self.at_any(ASSOCIATION_OPERATORS) {
            self.bump();
        } else {
            self.error("expected an association operator");
        }
        self.parse_association_end(false);
        self.expect(SEMICOLON);
        self.finish_node();
    }

    fn parse_association_end(&mut self, untyped: bool) {
        self.start_node(ASSOCIATION_END);
        self.parse_multiplicity();
        if !untyped {
            self.parse_type_ref();
        }
        if self.peek() == IDENT {
            self.start_node(NAME);
            self.bump();
            self.finish_node();
        }
        self.finish_node();
    }

    /// Multiplicity = (Integer | '*') ('..' (Integer | '*'))?
    fn parse_multiplicity(&mut self) {
        self.start_node(MULTIPLICITY);
        if self.at_any(&[INTEGER, STAR]) {
            self.bump();
            if self.peek() == DOT_DOT {
                self.bump();
                if self.at_any(&[INTEGER, STAR]) {
                    self.bump();
                } else {
                    self.error("expected an upper bound");
                }
            }
        } else {
            self.error("expected a multiplicity");
        }
        self.finish_node();
    }

    // =========================================================================
    // Grammar rules: state machines
    // =========================================================================

    /// StateMachine = ('statemachine' | 'queued' | 'pooled')? Name StateBody
    fn parse_state_machine(&mut self) {
        self.start_node(STATE_MACHINE);
        while matches!(self.peek(), STATEMACHINE_KW | QUEUED_KW | POOLED_KW) {
            self.bump();
        }
        self.parse_name();
        if self.peek() == L_BRACE {
            self.parse_state_body();
        } else {
            self.expect(SEMICOLON);
        }
        self.finish_node();
    }

    fn parse_state_body(&mut self) {
        self.start_node(STATE_BODY);
        self.parse_braced(STATE_MEMBER_FIRST, Self::parse_state_member);
        self.finish_node();
    }

    fn parse_state_member(&mut self) {
        match self.peek() {
            ENTRY_KW | EXIT_KW | DO_KW => self.parse_entry_exit(),
            FINAL_KW => self.parse_state(),
            IDENT if matches!(self.nth(1), L_BRACE | SEMICOLON) => self.parse_state(),
            IDENT | L_BRACKET | SLASH | ARROW | AFTER_KW | AFTER_EVERY_KW => self.parse_transition(),
            PIPE_PIPE => self.bump(),
            _ => self.recover("expected a state or transition", STATE_MEMBER_FIRST),
        }
    }

    /// State = 'final'? Name (StateBody | ';')
    fn parse_state(&mut self) {
        self.start_node(STATE);
        if self.peek() == FINAL_KW {
            self.bump();
        }
        self.parse_name();
        if self.peek() == L_BRACE {
            self.parse_state_body();
        } else {
            self.expect(SEMICOLON);
        }
        self.finish_node();
    }

    /// EntryExit = ('entry' | 'exit' | 'do') '/'? Ident? CodeBlock
    fn parse_entry_exit(&mut self) {
        self.start_node(ENTRY_EXIT_ACTION);
        self.bump();
        if self.peek() == SLASH {
            self.bump();
        }
        if self.peek() == IDENT && self.nth(1) == L_BRACE {
            self.bump();
        }
        if self.peek() == L_BRACE {
            self.parse_code_block();
        } else {
            self.error("expected an action block");
        }
        self.finish_node();
    }

    /// Transition = Event? Guard? Action? '->' Action? NameRef ';'
    fn parse_transition(&mut self) {
        self.start_node(TRANSITION);
        match self.peek() {
            IDENT => {
                self.start_node(EVENT_SPEC);
                self.bump();
                if self.peek() == L_PAREN {
                    self.parse_param_list();
                }
                self.finish_node();
            }
            AFTER_KW | AFTER_EVERY_KW => {
                self.start_node(EVENT_SPEC);
                self.bump();
                if self.expect(L_PAREN) {
                    self.parse_expr(&[R_PAREN]);
                    self.expect(R_PAREN);
                }
                self.finish_node();
            }
            _ => {}
        }
        if self.peek() == L_BRACKET {
            self.start_node(GUARD);
            self.bump();
            self.parse_expr(&[R_BRACKET]);
            self.expect(R_BRACKET);
            self.finish_node();
        }
        if self.peek() == SLASH {
            self.parse_action();
        }
        if self.expect(ARROW) {
            if self.peek() == SLASH {
                self.parse_action();
            }
            if self.at(IDENT) {
                self.parse_name_ref();
                while self.peek() == DOT && self.nth(1) == IDENT {
                    self.bump();
                    self.parse_name_ref();
                }
            } else {
                self.error("expected a target state");
            }
        }
        self.expect(SEMICOLON);
        self.finish_node();
    }

    /// Action = '/' Ident? CodeBlock
    fn parse_action(&mut self) {
        self.start_node(ACTION);
        self.bump();
        if self.peek() == IDENT && self.nth(1) == L_BRACE {
            self.bump();
        }
        if self.peek() == L_BRACE {
            self.parse_code_block();
        } else {
            self.error("expected an action block");
        }
        self.finish_node();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::umple::SyntaxNode;

    fn find(root: &SyntaxNode, kind: SyntaxKind) -> Vec<SyntaxNode> {
        root.descendants().filter(|n| n.kind() == kind).collect()
    }

    #[test]
    fn test_parse_empty() {
        let parse = parse("");
        assert!(parse.ok());
        assert_eq!(parse.syntax().kind(), SOURCE_FILE);
    }

    #[test]
    fn test_tree_is_lossless() {
        let source = "class A {\n  Integer x; // note\n  sm { s1 { e -> s2; } s2 {} }\n}\n";
        assert_eq!(parse(source).syntax().text().to_string(), source);

        let broken = "class { ]] Integer ; -> }}";
        assert_eq!(parse(broken).syntax().text().to_string(), broken);
    }

    #[test]
    fn test_parse_class_members() {
        let source = r#"
            class Student {
                isA Person, Serializable;
                name;
                Integer age = 18;
                lazy String[] nicknames;
                key { name }
                [age > 0]
                void greet(String who) { System.out.println("{"); }
                1 -- * Course courses;
            }
        "#;
        let parse = parse(source);
        assert!(parse.ok(), "errors: {:?}", parse.errors);
        let root = parse.syntax();
        assert_eq!(find(&root, ISA_DECL).len(), 1);
        assert_eq!(find(&root, ATTRIBUTE_DECL).len(), 3);
        assert_eq!(find(&root, METHOD_DECL).len(), 1);
        assert_eq!(find(&root, ASSOCIATION_DECL).len(), 1);
        assert_eq!(find(&root, CONSTRAINT).len(), 1);
        assert_eq!(find(&root, KEY_DECL).len(), 1);
    }

    #[test]
    fn test_parse_state_machine() {
        let source = r#"
            class Door {
                status {
                    Open {
                        entry / { log(); }
                        close [locked == false] -> Closed;
                    }
                    Closed {
                        open -> Open;
                        after(5) -> Open;
                    }
                    final Broken;
                }
            }
        "#;
        let parse = parse(source);
        assert!(parse.ok(), "errors: {:?}", parse.errors);
        let root = parse.syntax();
        assert_eq!(find(&root, STATE_MACHINE).len(), 1);
        assert_eq!(find(&root, STATE).len(), 3);
        assert_eq!(find(&root, TRANSITION).len(), 3);
        assert_eq!(find(&root, GUARD).len(), 1);
    }

    #[test]
    fn test_parse_top_level_declarations() {
        let source = r#"
            namespace school.core;
            use Base.ump, ../lib/Util.ump;
            generate Java;
            interface Named { String getName(); }
            trait Identified { id; }
            enum Color { Red, Green }
            mixset Extra { class Added { x; } }
            req R1 { The system shall work. }
            association { 1 Person owner -- * Car cars; }
            statemachine Light { On { flip -> Off; } Off {} }
        "#;
        let parse = parse(source);
        assert!(parse.ok(), "errors: {:?}", parse.errors);
        let root = parse.syntax();
        let paths: Vec<String> = find(&root, USE_PATH).iter().map(|n| n.text().to_string()).collect();
        assert_eq!(paths, vec!["Base.ump", "../lib/Util.ump"]);
        assert_eq!(find(&root, ENUM_VALUE).len(), 2);
        assert_eq!(find(&root, MIXSET_DECL).len(), 1);
        assert_eq!(find(&root, REQUIREMENT_DECL).len(), 1);
        assert_eq!(find(&root, ASSOCIATION_BLOCK).len(), 1);
    }

    #[test]
    fn test_recovers_after_garbage() {
        let parse = parse("class A { ??? ; Integer x; }\nclass B {}");
        assert!(!parse.ok());
        let root = parse.syntax();
        assert_eq!(find(&root, CLASS_DECL).len(), 2);
        assert_eq!(find(&root, ATTRIBUTE_DECL).len(), 1);
    }

    #[test]
    fn test_incomplete_node_extends_over_trailing_whitespace() {
        let source = "class A { isA   ";
        let root = parse(source).syntax();
        let isa = &find(&root, ISA_DECL)[0];
        assert_eq!(u32::from(isa.text_range().end()) as usize, source.len());
    }

    #[test]
    fn test_lookahead_at_start_of_file() {
        let expected = lookahead("", 0);
        assert!(expected.contains(&CLASS_KW));
        assert!(expected.contains(&USE_KW));
        assert!(!expected.contains(&ISA_KW));
    }

    #[test]
    fn test_lookahead_in_class_body() {
        let expected = lookahead("class A {", 9);
        assert!(expected.contains(&ISA_KW));
        assert!(expected.contains(&LAZY_KW));
        assert!(!expected.contains(&CLASS_KW));
    }

    #[test]
    fn test_lookahead_after_multiplicity_offers_operators() {
        let source = "class A { 1 ";
        let expected = lookahead(source, source.len());
        assert!(expected.contains(&DASH_DASH));
        assert!(expected.contains(&ARROW));
        assert!(expected.contains(&COMPOSE_LEFT));
        assert!(!expected.contains(&ISA_KW));
    }

    #[test]
    fn test_lookahead_in_state_body() {
        let source = "class A { sm { s1 {";
        let expected = lookahead(source, source.len());
        assert!(expected.contains(&ENTRY_KW));
        assert!(expected.contains(&EXIT_KW));
        assert!(!expected.contains(&ISA_KW));
    }
}
