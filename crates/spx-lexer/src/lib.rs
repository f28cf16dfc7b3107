//! # spx Lexer
//!
//! Tokenizer for spx source. Follows Go's rule of turning a line break into
//! a statement terminator after tokens that can end a statement.

pub mod token;
pub mod lexer;

// Re-export all public types from modules
pub use token::{Token, TokenKind};
pub use lexer::{unquote, Lexer};
