//! Go source parser
//!
//! - **logos** for lexing, with automatic statement terminators
//! - a recursive descent parser producing an arena AST
//!
//! ```text
//! Source Text
//!     ↓
//! Lexer (logos) → Tokens + comments
//!     ↓
//! Parser → File { nodes: Vec<Node> } with parent links
//!     ↓
//! HIR → objects, scopes and types
//! ```

#[allow(clippy::module_inception)]
mod parser;

pub mod ast;
mod lexer;
pub mod walk;

pub use ast::*;
pub use lexer::{Comment, Token, TokenKind, tokenize};
pub use parser::{SyntaxError, parse};

pub use text_size::{TextRange, TextSize};
