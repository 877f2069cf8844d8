//! Logos-based lexer for Umple
//!
//! Produces every token including trivia so the tree stays lossless.
//! Unterminated block comments and templates run to end of input.

use super::syntax_kind::SyntaxKind;
use logos::Logos;
use rowan::TextSize;

/// A token with its kind, text, and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub offset: TextSize,
}

impl Token<'_> {
    pub fn end(&self) -> TextSize {
        self.offset + TextSize::of(self.text)
    }
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    offset: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            offset: 0,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;
        let text = self.inner.slice();
        let offset = TextSize::new(self.offset);
        self.offset += text.len() as u32;

        let kind = match logos_token {
            Ok(t) => t.into(),
            Err(()) => SyntaxKind::ERROR,
        };

        Some(Token { kind, text, offset })
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

fn block_comment(lex: &mut logos::Lexer<LogosToken>) {
    let rest = lex.remainder();
    let len = rest.find("*/").map(|i| i + 2).unwrap_or(rest.len());
    lex.bump(len);
}

fn template_text(lex: &mut logos::Lexer<LogosToken>) {
    let rest = lex.remainder();
    let len = rest.find("!>>").map(|i| i + 3).unwrap_or(rest.len());
    lex.bump(len);
}

/// Logos token enum - maps to SyntaxKind
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum LogosToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r"[0-9]+\.[0-9]+")]
    Decimal,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    String,

    #[token("<<!", template_text)]
    TemplateText,

    // =========================================================================
    // OPERATORS (longest first)
    // =========================================================================
    #[token("<@>-")]
    ComposeLeft,

    #[token("-<@>")]
    ComposeRight,

    #[token(">->")]
    DirectedRight,

    #[token("<-<")]
    DirectedLeft,

    #[token("->")]
    Arrow,

    #[token("<-")]
    LeftArrow,

    #[token("--")]
    DashDash,

    #[token("..")]
    DotDot,

    #[token("==")]
    EqEq,

    #[token("!=")]
    BangEq,

    #[token("<=")]
    LtEq,

    #[token(">=")]
    GtEq,

    #[token("&&")]
    AmpAmp,

    #[token("||")]
    PipePipe,

    // =========================================================================
    // SINGLE-CHARACTER PUNCTUATION
    // =========================================================================
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("!")]
    Bang,
    #[token("%")]
    Percent,

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    #[token("use")]
    Use,
    #[token("namespace")]
    Namespace,
    #[token("generate")]
    Generate,
    #[token("class")]
    Class,
    #[token("interface")]
    Interface,
    #[token("trait")]
    Trait,
    #[token("enum")]
    Enum,
    #[token("mixset")]
    Mixset,
    #[token("statemachine")]
    Statemachine,
    #[token("association")]
    Association,
    #[token("req")]
    Req,
    #[token("isA")]
    IsA,
    #[token("key")]
    Key,
    #[token("implementsReq")]
    ImplementsReq,
    #[token("emit")]
    Emit,
    #[token("depend")]
    Depend,
    #[token("singleton")]
    Singleton,
    #[token("abstract")]
    Abstract,
    #[token("const")]
    Const,
    #[token("immutable")]
    Immutable,
    #[token("lazy")]
    Lazy,
    #[token("unique")]
    Unique,
    #[token("autounique")]
    Autounique,
    #[token("internal")]
    Internal,
    #[token("defaulted")]
    Defaulted,
    #[token("settable")]
    Settable,
    #[token("public")]
    Public,
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("static")]
    Static,
    #[token("queued")]
    Queued,
    #[token("pooled")]
    Pooled,
    #[token("entry")]
    Entry,
    #[token("exit")]
    Exit,
    #[token("do")]
    Do,
    #[token("final")]
    Final,
    #[token("after")]
    After,
    #[token("afterEvery")]
    AfterEvery,
}

impl From<LogosToken> for SyntaxKind {
    fn from(token: LogosToken) -> Self {
        use LogosToken as T;
        match token {
            T::Whitespace => SyntaxKind::WHITESPACE,
            T::LineComment => SyntaxKind::LINE_COMMENT,
            T::BlockComment => SyntaxKind::BLOCK_COMMENT,
            T::Ident => SyntaxKind::IDENT,
            T::Integer => SyntaxKind::INTEGER,
            T::Decimal => SyntaxKind::DECIMAL,
            T::String => SyntaxKind::STRING,
            T::TemplateText => SyntaxKind::TEMPLATE_TEXT,
            T::ComposeLeft => SyntaxKind::COMPOSE_LEFT,
            T::ComposeRight => SyntaxKind::COMPOSE_RIGHT,
            T::DirectedRight => SyntaxKind::DIRECTED_RIGHT,
            T::DirectedLeft => SyntaxKind::DIRECTED_LEFT,
            T::Arrow => SyntaxKind::ARROW,
            T::LeftArrow => SyntaxKind::LEFT_ARROW,
            T::DashDash => SyntaxKind::DASH_DASH,
            T::DotDot => SyntaxKind::DOT_DOT,
            T::EqEq => SyntaxKind::EQ_EQ,
            T::BangEq => SyntaxKind::BANG_EQ,
            T::LtEq => SyntaxKind::LT_EQ,
            T::GtEq => SyntaxKind::GT_EQ,
            T::AmpAmp => SyntaxKind::AMP_AMP,
            T::PipePipe => SyntaxKind::PIPE_PIPE,
            T::LBrace => SyntaxKind::L_BRACE,
            T::RBrace => SyntaxKind::R_BRACE,
            T::LBracket => SyntaxKind::L_BRACKET,
            T::RBracket => SyntaxKind::R_BRACKET,
            T::LParen => SyntaxKind::L_PAREN,
            T::RParen => SyntaxKind::R_PAREN,
            T::Semicolon => SyntaxKind::SEMICOLON,
            T::Comma => SyntaxKind::COMMA,
            T::Dot => SyntaxKind::DOT,
            T::Colon => SyntaxKind::COLON,
            T::Star => SyntaxKind::STAR,
            T::Slash => SyntaxKind::SLASH,
            T::Eq => SyntaxKind::EQ,
            T::Lt => SyntaxKind::LT,
            T::Gt => SyntaxKind::GT,
            T::Plus => SyntaxKind::PLUS,
            T::Minus => SyntaxKind::MINUS,
            T::Bang => SyntaxKind::BANG,
            T::Percent => SyntaxKind::PERCENT,
            T::Use => SyntaxKind::USE_KW,
            T::Namespace => SyntaxKind::NAMESPACE_KW,
            T::Generate => SyntaxKind::GENERATE_KW,
            T::Class => SyntaxKind::CLASS_KW,
            T::Interface => SyntaxKind::INTERFACE_KW,
            T::Trait => SyntaxKind::TRAIT_KW,
            T::Enum => SyntaxKind::ENUM_KW,
            T::Mixset => SyntaxKind::MIXSET_KW,
            T::Statemachine => SyntaxKind::STATEMACHINE_KW,
            T::Association => SyntaxKind::ASSOCIATION_KW,
            T::Req => SyntaxKind::REQ_KW,
            T::IsA => SyntaxKind::ISA_KW,
            T::Key => SyntaxKind::KEY_KW,
            T::ImplementsReq => SyntaxKind::IMPLEMENTS_REQ_KW,
            T::Emit => SyntaxKind::EMIT_KW,
            T::Depend => SyntaxKind::DEPEND_KW,
            T::Singleton => SyntaxKind::SINGLETON_KW,
            T::Abstract => SyntaxKind::ABSTRACT_KW,
            T::Const => SyntaxKind::CONST_KW,
            T::Immutable => SyntaxKind::IMMUTABLE_KW,
            T::Lazy => SyntaxKind::LAZY_KW,
            T::Unique => SyntaxKind::UNIQUE_KW,
            T::Autounique => SyntaxKind::AUTOUNIQUE_KW,
            T::Internal => SyntaxKind::INTERNAL_KW,
            T::Defaulted => SyntaxKind::DEFAULTED_KW,
            T::Settable => SyntaxKind::SETTABLE_KW,
            T::Public => SyntaxKind::PUBLIC_KW,
            T::Private => SyntaxKind::PRIVATE_KW,
            T::Protected => SyntaxKind::PROTECTED_KW,
            T::Static => SyntaxKind::STATIC_KW,
            T::Queued => SyntaxKind::QUEUED_KW,
            T::Pooled => SyntaxKind::POOLED_KW,
            T::Entry => SyntaxKind::ENTRY_KW,
            T::Exit => SyntaxKind::EXIT_KW,
            T::Do => SyntaxKind::DO_KW,
            T::Final => SyntaxKind::FINAL_KW,
            T::After => SyntaxKind::AFTER_KW,
            T::AfterEvery => SyntaxKind::AFTER_EVERY_KW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SyntaxKind::*;

    fn kinds(input: &str) -> Vec<SyntaxKind> {
        tokenize(input)
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !k.is_trivia())
            .collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("class Student isA Person"),
            vec![CLASS_KW, IDENT, ISA_KW, IDENT]
        );
        assert_eq!(kinds("classroom"), vec![IDENT]);
    }

    #[test]
    fn test_association_operators() {
        assert_eq!(
            kinds("1 -- * 0..1 -> <- <@>- -<@> >-> <-<"),
            vec![
                INTEGER,
                DASH_DASH,
                STAR,
                INTEGER,
                DOT_DOT,
                INTEGER,
                ARROW,
                LEFT_ARROW,
                COMPOSE_LEFT,
                COMPOSE_RIGHT,
                DIRECTED_RIGHT,
                DIRECTED_LEFT
            ]
        );
    }

    #[test]
    fn test_comments_are_trivia() {
        let tokens = tokenize("// line\n/* block */ x");
        assert_eq!(tokens[0].kind, LINE_COMMENT);
        assert_eq!(tokens[2].kind, BLOCK_COMMENT);
        assert_eq!(tokens[2].text, "/* block */");
    }

    #[test]
    fn test_unterminated_block_comment_runs_to_end() {
        let tokens = tokenize("x /* never closed\nclass A {}");
        let last = tokens.last().unwrap();
        assert_eq!(last.kind, BLOCK_COMMENT);
        assert_eq!(last.end(), TextSize::of("x /* never closed\nclass A {}"));
    }

    #[test]
    fn test_template_text_is_single_token() {
        assert_eq!(kinds("t <<!Hello {name}!>>"), vec![IDENT, TEMPLATE_TEXT]);
    }

    #[test]
    fn test_offsets_are_contiguous() {
        let input = "class A { Integer x; }";
        let mut expected = TextSize::new(0);
        for token in tokenize(input) {
            assert_eq!(token.offset, expected);
            expected = token.end();
        }
        assert_eq!(expected, TextSize::of(input));
    }
}
