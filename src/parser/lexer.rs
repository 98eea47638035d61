//! Logos-based lexer for Go source.
//!
//! Fast tokenization using the logos crate. Trivia is split off into
//! comments (kept for doc links and directives) and the statement
//! terminators the grammar elides at line ends are inserted here.

use logos::Logos;
use text_size::{TextRange, TextSize};

use super::parser::SyntaxError;

/// Kind of a significant token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    Int,
    Float,
    Imag,
    Char,
    String,

    // Keywords
    Break,
    Case,
    Chan,
    Const,
    Continue,
    Default,
    Defer,
    Else,
    Fallthrough,
    For,
    Func,
    Go,
    Goto,
    If,
    Import,
    Interface,
    Map,
    Package,
    Range,
    Return,
    Select,
    Struct,
    Switch,
    Type,
    Var,

    // Operators and punctuation
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
    AddAssign,
    SubAssign,
    MulAssign,
    QuoAssign,
    RemAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
    AndNotAssign,
    LAnd,
    LOr,
    Arrow,
    Inc,
    Dec,
    Eql,
    Lss,
    Gtr,
    Assign,
    Not,
    Tilde,
    Neq,
    Leq,
    Geq,
    Define,
    Ellipsis,
    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Period,
    Colon,

    Error,
    Eof,
}

impl TokenKind {
    /// Whether a line break after this token terminates the statement.
    fn ends_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Ident
                | TokenKind::Int
                | TokenKind::Float
                | TokenKind::Imag
                | TokenKind::Char
                | TokenKind::String
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Fallthrough
                | TokenKind::Return
                | TokenKind::Inc
                | TokenKind::Dec
                | TokenKind::RParen
                | TokenKind::RBrack
                | TokenKind::RBrace
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::Int
                | TokenKind::Float
                | TokenKind::Imag
                | TokenKind::Char
                | TokenKind::String
        )
    }

    /// Binary operator precedence, or 0 when the token is not a binary operator.
    pub fn precedence(self) -> u8 {
        match self {
            TokenKind::LOr => 1,
            TokenKind::LAnd => 2,
            TokenKind::Eql
            | TokenKind::Neq
            | TokenKind::Lss
            | TokenKind::Leq
            | TokenKind::Gtr
            | TokenKind::Geq => 3,
            TokenKind::Add | TokenKind::Sub | TokenKind::Or | TokenKind::Xor => 4,
            TokenKind::Mul
            | TokenKind::Quo
            | TokenKind::Rem
            | TokenKind::Shl
            | TokenKind::Shr
            | TokenKind::And
            | TokenKind::AndNot => 5,
            _ => 0,
        }
    }
}

/// A significant token. Inserted terminators have an empty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: TextRange,
}

impl Token {
    pub fn is_implicit_semi(&self) -> bool {
        self.kind == TokenKind::Semi && self.range.is_empty()
    }
}

/// A line or block comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub range: TextRange,
    pub text: String,
}

impl Comment {
    /// Comment text without the comment markers.
    pub fn content(&self) -> &str {
        if let Some(rest) = self.text.strip_prefix("//") {
            rest
        } else {
            self.text
                .strip_prefix("/*")
                .and_then(|t| t.strip_suffix("*/"))
                .unwrap_or(&self.text)
        }
    }
}

/// Output of [`tokenize`].
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
    pub errors: Vec<SyntaxError>,
}

/// Logos token enum - maps to TokenKind
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum LogosToken {
    #[regex(r"[ \t\r\f]+")]
    Whitespace,

    #[token("\n")]
    Newline,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"[0-9][0-9_]*|0[xX][0-9a-fA-F_]+|0[oO][0-7_]+|0[bB][01_]+")]
    Int,

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?|\.[0-9]+([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+")]
    Float,

    #[regex(r"([0-9]+|[0-9]+\.[0-9]*|\.[0-9]+)i")]
    Imag,

    #[regex(r"'([^'\\\n]|\\[^\n])+'")]
    Char,

    #[regex(r#""([^"\\\n]|\\[^\n])*""#)]
    String,

    #[regex(r"`[^`]*`")]
    RawString,

    #[token("break")]
    Break,
    #[token("case")]
    Case,
    #[token("chan")]
    Chan,
    #[token("const")]
    Const,
    #[token("continue")]
    Continue,
    #[token("default")]
    Default,
    #[token("defer")]
    Defer,
    #[token("else")]
    Else,
    #[token("fallthrough")]
    Fallthrough,
    #[token("for")]
    For,
    #[token("func")]
    Func,
    #[token("go")]
    Go,
    #[token("goto")]
    Goto,
    #[token("if")]
    If,
    #[token("import")]
    Import,
    #[token("interface")]
    Interface,
    #[token("map")]
    Map,
    #[token("package")]
    Package,
    #[token("range")]
    Range,
    #[token("return")]
    Return,
    #[token("select")]
    Select,
    #[token("struct")]
    Struct,
    #[token("switch")]
    Switch,
    #[token("type")]
    Type,
    #[token("var")]
    Var,

    #[token("+")]
    Add,
    #[token("-")]
    Sub,
    #[token("*")]
    Mul,
    #[token("/")]
    Quo,
    #[token("%")]
    Rem,
    #[token("&")]
    And,
    #[token("|")]
    Or,
    #[token("^")]
    Xor,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&^")]
    AndNot,
    #[token("+=")]
    AddAssign,
    #[token("-=")]
    SubAssign,
    #[token("*=")]
    MulAssign,
    #[token("/=")]
    QuoAssign,
    #[token("%=")]
    RemAssign,
    #[token("&=")]
    AndAssign,
    #[token("|=")]
    OrAssign,
    #[token("^=")]
    XorAssign,
    #[token("<<=")]
    ShlAssign,
    #[token(">>=")]
    ShrAssign,
    #[token("&^=")]
    AndNotAssign,
    #[token("&&")]
    LAnd,
    #[token("||")]
    LOr,
    #[token("<-")]
    Arrow,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,
    #[token("==")]
    Eql,
    #[token("<")]
    Lss,
    #[token(">")]
    Gtr,
    #[token("=")]
    Assign,
    #[token("!")]
    Not,
    #[token("~")]
    Tilde,
    #[token("!=")]
    Neq,
    #[token("<=")]
    Leq,
    #[token(">=")]
    Geq,
    #[token(":=")]
    Define,
    #[token("...")]
    Ellipsis,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBrack,
    #[token("]")]
    RBrack,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(".")]
    Period,
    #[token(":")]
    Colon,
}

impl LogosToken {
    fn kind(self) -> Option<TokenKind> {
        use LogosToken as L;
        use TokenKind as T;
        let kind = match self {
            L::Whitespace | L::Newline | L::LineComment | L::BlockComment => return None,
            L::Ident => T::Ident,
            L::Int => T::Int,
            L::Float => T::Float,
            L::Imag => T::Imag,
            L::Char => T::Char,
            L::String | L::RawString => T::String,
            L::Break => T::Break,
            L::Case => T::Case,
            L::Chan => T::Chan,
            L::Const => T::Const,
            L::Continue => T::Continue,
            L::Default => T::Default,
            L::Defer => T::Defer,
            L::Else => T::Else,
            L::Fallthrough => T::Fallthrough,
            L::For => T::For,
            L::Func => T::Func,
            L::Go => T::Go,
            L::Goto => T::Goto,
            L::If => T::If,
            L::Import => T::Import,
            L::Interface => T::Interface,
            L::Map => T::Map,
            L::Package => T::Package,
            L::Range => T::Range,
            L::Return => T::Return,
            L::Select => T::Select,
            L::Struct => T::Struct,
            L::Switch => T::Switch,
            L::Type => T::Type,
            L::Var => T::Var,
            L::Add => T::Add,
            L::Sub => T::Sub,
            L::Mul => T::Mul,
            L::Quo => T::Quo,
            L::Rem => T::Rem,
            L::And => T::And,
            L::Or => T::Or,
            L::Xor => T::Xor,
            L::Shl => T::Shl,
            L::Shr => T::Shr,
            L::AndNot => T::AndNot,
            L::AddAssign => T::AddAssign,
            L::SubAssign => T::SubAssign,
            L::MulAssign => T::MulAssign,
            L::QuoAssign => T::QuoAssign,
            L::RemAssign => T::RemAssign,
            L::AndAssign => T::AndAssign,
            L::OrAssign => T::OrAssign,
            L::XorAssign => T::XorAssign,
            L::ShlAssign => T::ShlAssign,
            L::ShrAssign => T::ShrAssign,
            L::AndNotAssign => T::AndNotAssign,
            L::LAnd => T::LAnd,
            L::LOr => T::LOr,
            L::Arrow => T::Arrow,
            L::Inc => T::Inc,
            L::Dec => T::Dec,
            L::Eql => T::Eql,
            L::Lss => T::Lss,
            L::Gtr => T::Gtr,
            L::Assign => T::Assign,
            L::Not => T::Not,
            L::Tilde => T::Tilde,
            L::Neq => T::Neq,
            L::Leq => T::Leq,
            L::Geq => T::Geq,
            L::Define => T::Define,
            L::Ellipsis => T::Ellipsis,
            L::LParen => T::LParen,
            L::RParen => T::RParen,
            L::LBrack => T::LBrack,
            L::RBrack => T::RBrack,
            L::LBrace => T::LBrace,
            L::RBrace => T::RBrace,
            L::Comma => T::Comma,
            L::Semi => T::Semi,
            L::Period => T::Period,
            L::Colon => T::Colon,
        };
        Some(kind)
    }
}

/// Consume a `/* ... */` comment up to the first `*/`, or to the end of
/// input when it is never closed.
fn block_comment(lex: &mut logos::Lexer<'_, LogosToken>) {
    let rest = lex.remainder();
    let len = rest.find("*/").map_or(rest.len(), |i| i + 2);
    lex.bump(len);
}

/// Tokenize an entire source file.
///
/// Line breaks following a token that can end a statement produce an
/// implicit `;` with an empty range at the line break.
pub fn tokenize(input: &str) -> Lexed {
    let mut lexed = Lexed::default();
    let mut lexer = LogosToken::lexer(input);
    let mut last: Option<TokenKind> = None;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let range = TextRange::new(
            TextSize::new(span.start as u32),
            TextSize::new(span.end as u32),
        );
        let text = lexer.slice();

        let token = match result {
            Ok(token) => token,
            Err(()) => {
                lexed
                    .errors
                    .push(SyntaxError::new(format!("unexpected character {text:?}"), range));
                push(&mut lexed, &mut last, TokenKind::Error, range);
                continue;
            }
        };

        match token {
            LogosToken::Whitespace => {}
            LogosToken::Newline => terminate(&mut lexed, &mut last, range.start()),
            LogosToken::LineComment => {
                lexed.comments.push(Comment {
                    range,
                    text: text.to_string(),
                });
            }
            LogosToken::BlockComment => {
                if text.len() < 4 || !text.ends_with("*/") {
                    lexed
                        .errors
                        .push(SyntaxError::new("comment not terminated", range));
                }
                lexed.comments.push(Comment {
                    range,
                    text: text.to_string(),
                });
                if text.contains('\n') {
                    terminate(&mut lexed, &mut last, range.start());
                }
            }
            other => {
                if let Some(kind) = other.kind() {
                    push(&mut lexed, &mut last, kind, range);
                }
            }
        }
    }

    let end = TextSize::of(input);
    terminate(&mut lexed, &mut last, end);
    lexed.tokens.push(Token {
        kind: TokenKind::Eof,
        range: TextRange::empty(end),
    });
    lexed
}

fn push(lexed: &mut Lexed, last: &mut Option<TokenKind>, kind: TokenKind, range: TextRange) {
    lexed.tokens.push(Token { kind, range });
    *last = Some(kind);
}

fn terminate(lexed: &mut Lexed, last: &mut Option<TokenKind>, at: TextSize) {
    if last.is_some_and(TokenKind::ends_statement) {
        lexed.tokens.push(Token {
            kind: TokenKind::Semi,
            range: TextRange::empty(at),
        });
    }
    *last = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_and_idents() {
        assert_eq!(
            kinds("func f"),
            vec![
                TokenKind::Func,
                TokenKind::Ident,
                TokenKind::Semi,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_implicit_semicolon_after_return() {
        let lexed = tokenize("return\nx");
        assert_eq!(lexed.tokens[1].kind, TokenKind::Semi);
        assert!(lexed.tokens[1].is_implicit_semi());
    }

    #[test]
    fn test_no_semicolon_after_operator() {
        assert_eq!(
            kinds("a +\nb"),
            vec![
                TokenKind::Ident,
                TokenKind::Add,
                TokenKind::Ident,
                TokenKind::Semi,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_comments_are_collected() {
        let lexed = tokenize("// Doc for [T].\ntype T int /* trailing */");
        assert_eq!(lexed.comments.len(), 2);
        assert_eq!(lexed.comments[0].content(), " Doc for [T].");
        assert_eq!(lexed.comments[1].content(), " trailing ");
    }

    #[test]
    fn test_block_comment_between_tokens() {
        let lexed = tokenize("x /* a * b **/ y");
        assert!(lexed.errors.is_empty(), "{:?}", lexed.errors);
        assert_eq!(
            lexed.tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Semi, TokenKind::Eof]
        );
        assert_eq!(lexed.comments[0].content(), " a * b *");
    }

    #[test]
    fn test_block_comment_ends_at_first_close() {
        let lexed = tokenize("/* one */ x /* two */");
        assert_eq!(lexed.comments.len(), 2);
        assert_eq!(lexed.comments[1].content(), " two ");
    }

    #[test]
    fn test_multiline_block_comment_terminates_statement() {
        assert_eq!(
            kinds("x /*\n*/ y"),
            vec![
                TokenKind::Ident,
                TokenKind::Semi,
                TokenKind::Ident,
                TokenKind::Semi,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        let lexed = tokenize("x /* open");
        assert_eq!(lexed.errors.len(), 1);
        assert_eq!(lexed.errors[0].message, "comment not terminated");
        assert_eq!(lexed.comments.len(), 1);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 0x1F 2.5 .5 1e3 3i")[..6],
            [
                TokenKind::Int,
                TokenKind::Int,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Imag
            ]
        );
    }
}
