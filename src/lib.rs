//! cellsh - values and tokens for a Lisp-flavored command shell
//!
//! # Overview
//!
//! This crate is the front end of the shell: the [`Cell`] value model every
//! program and runtime value is built from, and the [`Scanner`] that turns
//! interactive input into tokens for a grammar.
//!
//! ## Values
//!
//! ```text
//! 42  3/4  2.5        numbers; arithmetic is exact over rationals
//! "text"  'text'      strings
//! ls  -l              symbols
//! a b c               a list (cons cells ending in Null)
//! a :: b              an improper pair
//! ```
//!
//! Small integers and short symbols are shared through process-wide caches,
//! so repeated construction of `0` or `ls` does not allocate.
//!
//! ## Tokens
//!
//! The scanner is pulled one token at a time. It handles quoting, comments,
//! backslash continuation and shell operators (`|`, `&&`, `>>`, `<(` ...),
//! resolving operators to canonical names such as `pipe-stdout`.
//!
//! # Example
//!
//! ```rust
//! use std::io::Cursor;
//! use cellsh::{make_integer, make_rational, ReaderSource, Scanner, TokenKind};
//! use num_bigint::BigInt;
//! use num_rational::BigRational;
//!
//! let third = make_rational(BigRational::new(BigInt::from(1), BigInt::from(3)));
//! let sum = third.add(&third).unwrap().add(&third).unwrap();
//! assert!(sum.equals(&make_integer(1)));
//!
//! let mut scanner = Scanner::new("example", ReaderSource::new(Cursor::new("ls | wc\n")));
//! let token = scanner.next_token().unwrap();
//! assert_eq!(token.kind, TokenKind::Symbol);
//! assert_eq!(scanner.next_token().unwrap().text, "pipe-stdout");
//! ```

pub mod cache;
pub mod cell;
pub mod config;
pub mod lexer;
pub mod numeric;
pub mod source;
pub mod terminal;

// Re-export commonly used items
pub use cache::cache_symbols;
pub use cell::{
    car, cdr, cons, is_atom, is_boolean, is_cons, is_float, is_integer, is_null, is_number,
    is_rational, is_string, is_symbol, list, make_boolean, make_constant, make_float,
    make_integer, make_rational, make_string, make_symbol, make_variable, Cell, CellError,
    Reference, FALSE, TRUE,
};
pub use config::Config;
pub use lexer::{resolve_operator, LexError, Scanner, Token, TokenKind};
pub use source::{EditorSource, LineSource, ReadStatus, ReaderSource, ScriptedSource};
#[cfg(unix)]
pub use terminal::ControllingTerminal;
pub use terminal::Foreground;

/// Scan a complete piece of text into tokens, ending with [`TokenKind::End`]
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    let mut scanner = Scanner::new("<string>", ReaderSource::new(std::io::Cursor::new(text)))
        .with_error_handler(|_, _, _| {});
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token()?;
        let done = token.kind == TokenKind::End;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}
