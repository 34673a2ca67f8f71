//! Common test utilities for cellsh integration tests

use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use num_bigint::BigInt;
use num_rational::BigRational;

#[allow(unused_imports)]
pub use cellsh::{
    make_integer, make_rational, Cell, ReaderSource, Scanner, ScriptedSource, Token, TokenKind,
};

/// Scan `input` to the end, dropping the final End token
#[allow(dead_code)]
pub fn scan(input: &str) -> Vec<Token> {
    let mut tokens = cellsh::tokenize(input).unwrap();
    tokens.pop();
    tokens
}

/// (kind, text) pairs for the tokens of `input`
#[allow(dead_code)]
pub fn pairs(input: &str) -> Vec<(TokenKind, String)> {
    scan(input).into_iter().map(|t| (t.kind, t.text)).collect()
}

/// Scanner over in-memory text
#[allow(dead_code)]
pub fn scanner(input: &str) -> Scanner<ReaderSource<Cursor<String>>> {
    Scanner::new("test", ReaderSource::new(Cursor::new(input.to_string())))
}

/// Error reports collected from a scanner's handler
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct Reports(Rc<RefCell<Vec<(String, usize, String)>>>);

#[allow(dead_code)]
impl Reports {
    pub fn handler(&self) -> impl FnMut(&str, usize, &str) + 'static {
        let sink = Rc::clone(&self.0);
        move |name, line, msg| {
            sink.borrow_mut()
                .push((name.to_string(), line, msg.to_string()))
        }
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn get(&self, i: usize) -> (String, usize, String) {
        self.0.borrow()[i].clone()
    }
}

#[allow(dead_code)]
pub fn ratio(n: i64, d: i64) -> Cell {
    make_rational(BigRational::new(BigInt::from(n), BigInt::from(d)))
}

#[allow(dead_code)]
pub fn int(v: i64) -> Cell {
    make_integer(v)
}
