//! Tokenization for cellsh
//!
//! [`Scanner`] is a resumable state machine pulled one token at a time by an
//! external grammar. It asks its [`LineSource`] for another physical line
//! whenever the buffer runs dry, so a token may span line refills (quoted
//! text, continuations, comments).

use std::fmt;
use std::io;

use thiserror::Error;

use crate::cell::{make_string, make_symbol, Cell};
use crate::source::{LineSource, ReadStatus};
use crate::terminal::Foreground;

/// Identifier of the first named token, after the character range
pub const FIRST_NAMED_ID: i32 = 57346;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Punctuation, identified by its own character
    Newline,
    Percent,
    LParen,
    RParen,
    Semicolon,
    At,
    Backtick,
    LBrace,
    RBrace,
    Colon,

    // Literals
    Symbol,
    BraceExpansion,
    SingleQuoted,
    DoubleQuoted,
    /// `!"..."`
    BangDouble,

    // Operators; text is the canonical name
    Background,
    AndF,
    OrF,
    Pipe,
    Redirect,
    Substitute,
    Cons,

    /// Ctrl-C while waiting for input
    Interrupt,
    End,
}

impl TokenKind {
    fn punctuation(c: char) -> Option<TokenKind> {
        Some(match c {
            '\n' => TokenKind::Newline,
            '%' => TokenKind::Percent,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ';' => TokenKind::Semicolon,
            '@' => TokenKind::At,
            '`' => TokenKind::Backtick,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ':' => TokenKind::Colon,
            _ => return None,
        })
    }

    /// The character a punctuation token stands for
    pub fn as_char(self) -> Option<char> {
        Some(match self {
            TokenKind::Newline => '\n',
            TokenKind::Percent => '%',
            TokenKind::LParen => '(',
            TokenKind::RParen => ')',
            TokenKind::Semicolon => ';',
            TokenKind::At => '@',
            TokenKind::Backtick => '`',
            TokenKind::LBrace => '{',
            TokenKind::RBrace => '}',
            TokenKind::Colon => ':',
            _ => return None,
        })
    }

    /// Integer identifier for a generated grammar.
    ///
    /// Punctuation uses its character code, end of input is 0 and every
    /// other kind has a fixed id from [`FIRST_NAMED_ID`] upwards.
    pub fn id(self) -> i32 {
        match self {
            TokenKind::End => 0,
            TokenKind::Symbol => FIRST_NAMED_ID,
            TokenKind::BraceExpansion => FIRST_NAMED_ID + 1,
            TokenKind::SingleQuoted => FIRST_NAMED_ID + 2,
            TokenKind::DoubleQuoted => FIRST_NAMED_ID + 3,
            TokenKind::BangDouble => FIRST_NAMED_ID + 4,
            TokenKind::Background => FIRST_NAMED_ID + 5,
            TokenKind::AndF => FIRST_NAMED_ID + 6,
            TokenKind::OrF => FIRST_NAMED_ID + 7,
            TokenKind::Pipe => FIRST_NAMED_ID + 8,
            TokenKind::Redirect => FIRST_NAMED_ID + 9,
            TokenKind::Substitute => FIRST_NAMED_ID + 10,
            TokenKind::Cons => FIRST_NAMED_ID + 11,
            TokenKind::Interrupt => FIRST_NAMED_ID + 12,
            punct => punct.as_char().map_or(0, |c| c as i32),
        }
    }

    fn is_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Background
                | TokenKind::AndF
                | TokenKind::OrF
                | TokenKind::Pipe
                | TokenKind::Redirect
                | TokenKind::Substitute
        )
    }

    /// Tokens after which a line break does not end the statement
    fn continues_line(self) -> bool {
        matches!(
            self,
            TokenKind::OrF | TokenKind::AndF | TokenKind::Pipe | TokenKind::Redirect
        )
    }
}

/// Spellings of shell operators and their canonical names
pub const OPERATORS: &[(&str, &str)] = &[
    ("!>", "redirect-stderr"),
    ("!>>", "append-stderr"),
    ("!|", "pipe-stderr"),
    ("!|+", "channel-stderr"),
    ("&", "spawn"),
    ("&&", "and"),
    ("<", "redirect-stdin"),
    ("<(", "substitute-stdout"),
    (">", "redirect-stdout"),
    (">(", "substitute-stdin"),
    (">>", "append-stdout"),
    ("|", "pipe-stdout"),
    ("|+", "channel-stdout"),
    ("||", "or"),
];

/// Canonical name of an operator spelling
pub fn resolve_operator(text: &str) -> Option<&'static str> {
    OPERATORS
        .iter()
        .find(|(spelling, _)| *spelling == text)
        .map(|(_, name)| *name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text, or the canonical name for operators
    pub text: String,
    /// Line the token ended on
    pub line: usize,
}

impl Token {
    fn control(kind: TokenKind, line: usize) -> Self {
        Token {
            kind,
            text: String::new(),
            line,
        }
    }

    pub fn id(&self) -> i32 {
        self.kind.id()
    }

    /// Text with quote delimiters removed; escapes are left as written
    pub fn raw(&self) -> &str {
        let text = self.text.as_str();
        let inner = match self.kind {
            TokenKind::SingleQuoted | TokenKind::DoubleQuoted => {
                text.get(1..text.len().saturating_sub(1))
            }
            TokenKind::BangDouble => text.get(2..text.len().saturating_sub(1)),
            _ => None,
        };
        inner.unwrap_or(text)
    }

    /// The value carried by a literal token
    pub fn literal(&self) -> Option<Cell> {
        match self.kind {
            TokenKind::Symbol | TokenKind::BraceExpansion => Some(make_symbol(&self.text)),
            TokenKind::SingleQuoted => Some(make_string(self.raw())),
            TokenKind::DoubleQuoted | TokenKind::BangDouble => {
                Some(make_string(unescape(self.raw())))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Interrupt | TokenKind::End => write!(f, "{:?}", self.kind),
            _ => write!(f, "{:?} {:?}", self.kind, self.text),
        }
    }
}

/// Decode backslash escapes in double-quoted text
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('a') => out.push('\x07'),
            Some('e') => out.push('\x1b'),
            Some(c @ ('\\' | '"' | '$' | '`')) => out.push(c),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[derive(Error, Debug)]
pub enum LexError {
    #[error("line {line}: unexpected {ch:?}")]
    Unexpected { ch: char, line: usize },
    #[error("line {line}: unterminated quoted text")]
    Unterminated { line: usize },
    #[error("read failed: {0}")]
    Read(#[from] io::Error),
}

/// Receives (source name, line number, message) for each lexical fault
pub type ErrorHandler = Box<dyn FnMut(&str, usize, &str)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Ampersand,
    Bang,
    BangDouble,
    BangDoubleEscape,
    BangGreater,
    Colon,
    Comment,
    DoubleQuoted,
    DoubleQuotedEscape,
    Greater,
    Less,
    Pipe,
    SingleQuoted,
    Symbol,
}

impl State {
    fn is_quoted(self) -> bool {
        matches!(
            self,
            State::BangDouble
                | State::BangDoubleEscape
                | State::DoubleQuoted
                | State::DoubleQuotedEscape
                | State::SingleQuoted
        )
    }
}

/// Characters that end a symbol
fn ends_symbol(c: char) -> bool {
    matches!(
        c,
        '\n' | '%'
            | '&'
            | '\''
            | '('
            | ')'
            | ';'
            | '<'
            | '@'
            | '`'
            | '|'
            | '\t'
            | ' '
            | '"'
            | '#'
            | ':'
            | '>'
    )
}

enum Refill {
    Filled,
    Interrupted,
    Retry,
}

pub struct Scanner<S> {
    source: S,
    name: String,
    on_error: ErrorHandler,
    foreground: Option<Box<dyn Foreground>>,

    line: Vec<char>,
    cursor: usize,
    start: usize,
    lineno: usize,

    state: State,
    token: Option<TokenKind>,
    previous: Option<TokenKind>,
    finished: bool,
}

impl<S: LineSource> Scanner<S> {
    pub fn new(name: impl Into<String>, source: S) -> Self {
        Scanner {
            source,
            name: name.into(),
            on_error: Box::new(|name, line, msg| eprintln!("{}:{}: {}", name, line, msg)),
            foreground: None,
            line: Vec::new(),
            cursor: 0,
            start: 0,
            lineno: 0,
            state: State::Start,
            token: None,
            previous: None,
            finished: false,
        }
    }

    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&str, usize, &str) + 'static,
    {
        self.on_error = Box::new(handler);
        self
    }

    /// Reclaim the terminal through `foreground` when a read fails
    pub fn with_foreground(mut self, foreground: Box<dyn Foreground>) -> Self {
        self.foreground = Some(foreground);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of physical lines read so far
    pub fn line_number(&self) -> usize {
        self.lineno
    }

    pub fn is_finished(&self) -> bool {
        self.finished && self.cursor >= self.line.len()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Report a problem at the current location
    pub fn error(&mut self, msg: &str) {
        (self.on_error)(&self.name, self.lineno, msg);
    }

    /// Drop buffered text and partial tokens
    pub fn reset(&mut self) {
        self.line.clear();
        self.cursor = 0;
        self.start = 0;
        self.state = State::Start;
        self.token = None;
        self.previous = None;
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        let mut retries = 0;

        while self.token.is_none() {
            if self.cursor >= self.line.len() {
                if self.finished {
                    return self.finish();
                }
                match self.refill(&mut retries)? {
                    Refill::Filled | Refill::Retry => continue,
                    Refill::Interrupted => {
                        log::debug!("{}: interrupted, discarding buffered input", self.name);
                        self.reset();
                        return Ok(Token::control(TokenKind::Interrupt, self.lineno));
                    }
                }
            }

            if self.step()? {
                self.cursor += 1;
            }

            if self.token == Some(TokenKind::Newline)
                && self.previous.map_or(false, TokenKind::continues_line)
            {
                self.token = None;
                self.state = State::Start;
            }
        }

        Ok(self.emit())
    }

    /// Run the state machine on the current character.
    ///
    /// Returns whether the character was consumed.
    fn step(&mut self) -> Result<bool, LexError> {
        let c = self.line[self.cursor];

        match self.state {
            State::Start => {
                self.start = self.cursor;
                match c {
                    '\n' | '%' | '(' | ')' | ';' | '@' | '`' | '}' => {
                        self.token = TokenKind::punctuation(c);
                    }
                    '\t' | ' ' => {}
                    '!' => self.state = State::Bang,
                    '"' => self.state = State::DoubleQuoted,
                    '#' => self.state = State::Comment,
                    '&' => self.state = State::Ampersand,
                    '\'' => self.state = State::SingleQuoted,
                    ':' => self.state = State::Colon,
                    '<' => self.state = State::Less,
                    '>' => self.state = State::Greater,
                    '|' => self.state = State::Pipe,
                    _ => {
                        self.state = State::Symbol;
                        return Ok(false);
                    }
                }
            }

            State::Ampersand => {
                if c == '&' {
                    self.token = Some(TokenKind::AndF);
                } else {
                    self.token = Some(TokenKind::Background);
                    return Ok(false);
                }
            }

            State::Bang => match c {
                '"' => self.state = State::BangDouble,
                '>' => self.state = State::BangGreater,
                '|' => self.state = State::Pipe,
                _ => {
                    self.state = State::Symbol;
                    return Ok(false);
                }
            },

            State::BangGreater => {
                self.token = Some(TokenKind::Redirect);
                if c != '>' {
                    return Ok(false);
                }
            }

            State::Colon => {
                if c == ':' {
                    self.token = Some(TokenKind::Cons);
                } else {
                    self.token = Some(TokenKind::Colon);
                    return Ok(false);
                }
            }

            State::Comment => {
                let escaped = self.cursor > 0 && self.line[self.cursor - 1] == '\\';
                if c == '\n' && !escaped {
                    // The newline itself still ends the statement.
                    self.state = State::Start;
                    return Ok(false);
                }
            }

            State::BangDouble
            | State::BangDoubleEscape
            | State::DoubleQuoted
            | State::DoubleQuotedEscape => {
                while self.cursor < self.line.len() {
                    match self.state {
                        State::BangDoubleEscape => self.state = State::BangDouble,
                        State::DoubleQuotedEscape => self.state = State::DoubleQuoted,
                        _ => match self.line[self.cursor] {
                            '"' => break,
                            '\\' if self.state == State::BangDouble => {
                                self.state = State::BangDoubleEscape
                            }
                            '\\' => self.state = State::DoubleQuotedEscape,
                            _ => {}
                        },
                    }
                    self.cursor += 1;
                }
                if self.cursor >= self.line.len() {
                    return Ok(false);
                }
                self.token = Some(if self.state == State::BangDouble {
                    TokenKind::BangDouble
                } else {
                    TokenKind::DoubleQuoted
                });
            }

            State::Greater => {
                self.token = Some(TokenKind::Redirect);
                match c {
                    '(' => self.token = Some(TokenKind::Substitute),
                    '>' => {}
                    _ => return Ok(false),
                }
            }

            State::Less => {
                if c == '(' {
                    self.token = Some(TokenKind::Substitute);
                } else {
                    let line = self.lineno;
                    self.error("unexpected '<' (expected '<(')");
                    self.state = State::Start;
                    self.start = self.cursor;
                    return Err(LexError::Unexpected { ch: '<', line });
                }
            }

            State::Pipe => match c {
                '+' => self.token = Some(TokenKind::Pipe),
                '|' => self.token = Some(TokenKind::OrF),
                _ => {
                    self.token = Some(TokenKind::Pipe);
                    return Ok(false);
                }
            },

            State::SingleQuoted => {
                while self.cursor < self.line.len() && self.line[self.cursor] != '\'' {
                    self.cursor += 1;
                }
                if self.cursor >= self.line.len() {
                    // Keep the line break as escape text so the quote can
                    // continue on the next line.
                    if self.line.last() == Some(&'\n') {
                        self.line.pop();
                        self.line.push('\\');
                        self.line.push('n');
                        self.cursor = self.line.len();
                    }
                    return Ok(false);
                }
                self.token = Some(TokenKind::SingleQuoted);
            }

            State::Symbol => {
                if ends_symbol(c) {
                    self.token = Some(TokenKind::Symbol);
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }

    fn emit(&mut self) -> Token {
        let mut kind = self.token.take().unwrap_or(TokenKind::End);
        let mut text: String = self.line[self.start..self.cursor].iter().collect();

        if kind == TokenKind::Symbol && text.contains(|c: char| c == '{' || c == '}') {
            kind = match text.as_str() {
                "{" => TokenKind::LBrace,
                "}" => TokenKind::RBrace,
                _ => TokenKind::BraceExpansion,
            };
        } else if kind.is_operator() {
            if let Some(name) = resolve_operator(&text) {
                text = name.to_string();
            }
        }

        self.state = State::Start;
        self.previous = Some(kind);

        let token = Token {
            kind,
            text,
            line: self.lineno,
        };
        log::trace!("{}:{}: {}", self.name, self.lineno, token);
        token
    }

    fn finish(&mut self) -> Result<Token, LexError> {
        if self.state.is_quoted() {
            let line = self.lineno;
            self.error("unterminated quoted text");
            self.reset();
            return Err(LexError::Unterminated { line });
        }

        self.state = State::Start;
        self.previous = None;
        Ok(Token::control(TokenKind::End, self.lineno))
    }

    /// Request another physical line and append it to the buffer
    fn refill(&mut self, retries: &mut u32) -> Result<Refill, LexError> {
        let (text, status) = self.source.read_line('\n');

        let mut ended = false;
        let failure = match status {
            ReadStatus::Ok => {
                *retries = 0;
                None
            }
            ReadStatus::Interrupted => return Ok(Refill::Interrupted),
            ReadStatus::EndOfStream => {
                ended = true;
                None
            }
            ReadStatus::Failed(e) => {
                if *retries < 1 {
                    if let Some(fg) = self.foreground.as_mut() {
                        if fg.reclaim() {
                            *retries += 1;
                            log::debug!("{}: read failed ({}), retrying in foreground", self.name, e);
                            return Ok(Refill::Retry);
                        }
                    }
                }
                log::warn!("{}: read failed: {}", self.name, e);
                ended = true;
                Some(e)
            }
        };

        self.lineno += 1;
        let mut chars: Vec<char> = text.chars().collect();
        if chars.last() == Some(&'\n') {
            chars.pop();
            if chars.last() == Some(&'\r') {
                chars.pop();
            }
            let backslashes = chars.iter().rev().take_while(|&&c| c == '\\').count();
            if backslashes % 2 == 1 {
                chars.pop();
            } else {
                chars.push('\n');
            }
        }
        if ended {
            chars.push('\n');
            self.finished = true;
        }
        log::debug!("{}:{}: read {} chars", self.name, self.lineno, chars.len());

        if self.state != State::Start && self.start < self.cursor {
            let mut kept: Vec<char> = self.line[self.start..self.cursor].to_vec();
            self.cursor -= self.start;
            kept.extend(chars);
            self.line = kept;
        } else {
            self.line = chars;
            self.cursor = 0;
        }
        self.start = 0;

        match failure {
            Some(e) => Err(LexError::Read(e)),
            None => Ok(Refill::Filled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{is_string, is_symbol};
    use crate::source::{ReaderSource, ScriptedSource};
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    fn scan(input: &str) -> Vec<(TokenKind, String)> {
        let mut scanner = Scanner::new("test", ReaderSource::new(Cursor::new(input)));
        let mut out = Vec::new();
        loop {
            let tok = scanner.next_token().unwrap();
            if tok.kind == TokenKind::End {
                return out;
            }
            out.push((tok.kind, tok.text));
        }
    }

    fn tok(kind: TokenKind, text: &str) -> (TokenKind, String) {
        (kind, text.to_string())
    }

    fn nl() -> (TokenKind, String) {
        tok(TokenKind::Newline, "\n")
    }

    struct Reclaim {
        calls: Rc<RefCell<usize>>,
        result: bool,
    }

    impl Foreground for Reclaim {
        fn reclaim(&mut self) -> bool {
            *self.calls.borrow_mut() += 1;
            self.result
        }
    }

    #[test]
    fn test_pipeline() {
        let toks = scan("ls -l | grep foo\n");
        assert_eq!(
            toks[..6],
            [
                tok(TokenKind::Symbol, "ls"),
                tok(TokenKind::Symbol, "-l"),
                tok(TokenKind::Pipe, "pipe-stdout"),
                tok(TokenKind::Symbol, "grep"),
                tok(TokenKind::Symbol, "foo"),
                nl(),
            ]
        );
    }

    #[test]
    fn test_end_of_stream_adds_newline() {
        assert_eq!(
            scan("echo hi"),
            vec![tok(TokenKind::Symbol, "echo"), tok(TokenKind::Symbol, "hi"), nl()]
        );
    }

    #[test]
    fn test_double_quoted_keeps_escapes() {
        let mut scanner = Scanner::new("test", ReaderSource::new(Cursor::new("echo \"a\\nb\"\n")));
        assert_eq!(scanner.next_token().unwrap().text, "echo");
        let t = scanner.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::DoubleQuoted);
        assert_eq!(t.text, "\"a\\nb\"");
        assert_eq!(t.raw(), "a\\nb");
    }

    #[test]
    fn test_escaped_quote_inside_double_quotes() {
        let toks = scan("\"say \\\"hi\\\"\"\n");
        assert_eq!(toks[0], tok(TokenKind::DoubleQuoted, "\"say \\\"hi\\\"\""));
    }

    #[test]
    fn test_bang_double() {
        let toks = scan("!\"x y\" z\n");
        assert_eq!(toks[0], tok(TokenKind::BangDouble, "!\"x y\""));
        assert_eq!(toks[1], tok(TokenKind::Symbol, "z"));
    }

    #[test]
    fn test_bang_alone_is_symbol() {
        assert_eq!(scan("!x\n")[0], tok(TokenKind::Symbol, "!x"));
    }

    #[test]
    fn test_continuation_joins_lines() {
        assert_eq!(
            scan("echo foo\\\nbar\n")[..3],
            [tok(TokenKind::Symbol, "echo"), tok(TokenKind::Symbol, "foobar"), nl()]
        );
    }

    #[test]
    fn test_escaped_backslash_is_not_continuation() {
        let toks = scan("a\\\\\nb\n");
        assert_eq!(toks[0], tok(TokenKind::Symbol, "a\\\\"));
        assert_eq!(toks[1], nl());
        assert_eq!(toks[2], tok(TokenKind::Symbol, "b"));
    }

    #[test]
    fn test_newline_after_and_is_suppressed() {
        assert_eq!(
            scan("foo && \n bar\n")[..4],
            [
                tok(TokenKind::Symbol, "foo"),
                tok(TokenKind::AndF, "and"),
                tok(TokenKind::Symbol, "bar"),
                nl(),
            ]
        );
    }

    #[test]
    fn test_newline_after_pipe_is_suppressed() {
        assert_eq!(
            scan("ls |\n wc\n")[..4],
            [
                tok(TokenKind::Symbol, "ls"),
                tok(TokenKind::Pipe, "pipe-stdout"),
                tok(TokenKind::Symbol, "wc"),
                nl(),
            ]
        );
    }

    #[test]
    fn test_newline_after_symbol_is_kept() {
        assert_eq!(scan("a\nb\n")[1], nl());
    }

    #[test]
    fn test_crlf() {
        assert_eq!(scan("a\r\n")[..2], [tok(TokenKind::Symbol, "a"), nl()]);
    }

    #[test]
    fn test_operators() {
        let cases = [
            ("!>", TokenKind::Redirect, "redirect-stderr"),
            ("!>>", TokenKind::Redirect, "append-stderr"),
            ("!|", TokenKind::Pipe, "pipe-stderr"),
            ("!|+", TokenKind::Pipe, "channel-stderr"),
            ("&", TokenKind::Background, "spawn"),
            ("&&", TokenKind::AndF, "and"),
            ("<(", TokenKind::Substitute, "substitute-stdout"),
            (">", TokenKind::Redirect, "redirect-stdout"),
            (">(", TokenKind::Substitute, "substitute-stdin"),
            (">>", TokenKind::Redirect, "append-stdout"),
            ("|", TokenKind::Pipe, "pipe-stdout"),
            ("|+", TokenKind::Pipe, "channel-stdout"),
            ("||", TokenKind::OrF, "or"),
            ("::", TokenKind::Cons, "::"),
            (":", TokenKind::Colon, ":"),
        ];
        for (spelling, kind, text) in cases {
            let toks = scan(&format!("{} x\n", spelling));
            assert_eq!(toks[0], tok(kind, text), "{spelling:?}");
            assert_eq!(toks[1], tok(TokenKind::Symbol, "x"), "{spelling:?}");
        }
    }

    #[test]
    fn test_operator_table() {
        assert_eq!(OPERATORS.len(), 14);
        assert_eq!(resolve_operator("<"), Some("redirect-stdin"));
        assert_eq!(resolve_operator("&&"), Some("and"));
        assert_eq!(resolve_operator("<<"), None);
    }

    #[test]
    fn test_operators_end_symbols() {
        assert_eq!(
            scan("a|b\n")[..3],
            [
                tok(TokenKind::Symbol, "a"),
                tok(TokenKind::Pipe, "pipe-stdout"),
                tok(TokenKind::Symbol, "b"),
            ]
        );
    }

    #[test]
    fn test_punctuation() {
        let toks = scan("(a);@b%`c`\n");
        let kinds: Vec<_> = toks.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds[..10],
            [
                TokenKind::LParen,
                TokenKind::Symbol,
                TokenKind::RParen,
                TokenKind::Semicolon,
                TokenKind::At,
                TokenKind::Symbol,
                TokenKind::Percent,
                TokenKind::Backtick,
                TokenKind::Symbol,
                TokenKind::Backtick,
            ]
        );
    }

    #[test]
    fn test_braces() {
        assert_eq!(
            scan("{ a{b,c} }\n")[..3],
            [
                tok(TokenKind::LBrace, "{"),
                tok(TokenKind::BraceExpansion, "a{b,c}"),
                tok(TokenKind::RBrace, "}"),
            ]
        );
    }

    #[test]
    fn test_comment() {
        assert_eq!(
            scan("echo hi # note | here\nls\n")[..5],
            [
                tok(TokenKind::Symbol, "echo"),
                tok(TokenKind::Symbol, "hi"),
                nl(),
                tok(TokenKind::Symbol, "ls"),
                nl(),
            ]
        );
    }

    #[test]
    fn test_comment_continues_across_lines() {
        assert_eq!(
            scan("# one\\\ntwo\nls\n")[..3],
            [nl(), tok(TokenKind::Symbol, "ls"), nl()]
        );
    }

    #[test]
    fn test_single_quote_across_lines() {
        let src = ScriptedSource::new().line("echo 'a").line("b'");
        let mut scanner = Scanner::new("test", src);
        assert_eq!(scanner.next_token().unwrap().text, "echo");
        let t = scanner.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::SingleQuoted);
        assert_eq!(t.raw(), "a\\nb");
        assert_eq!(t.line, 2);
    }

    #[test]
    fn test_double_quote_across_lines() {
        let src = ScriptedSource::new().line("say \"one").line("two\"");
        let mut scanner = Scanner::new("test", src);
        scanner.next_token().unwrap();
        let t = scanner.next_token().unwrap();
        assert_eq!(t.kind, TokenKind::DoubleQuoted);
        assert_eq!(t.raw(), "one\ntwo");
    }

    #[test]
    fn test_bare_less_is_a_fault() {
        let reports = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reports);
        let mut scanner = Scanner::new("input", ReaderSource::new(Cursor::new("cat < file\n")))
            .with_error_handler(move |name, line, msg| {
                sink.borrow_mut().push(format!("{}:{}: {}", name, line, msg))
            });

        assert_eq!(scanner.next_token().unwrap().text, "cat");
        assert!(matches!(
            scanner.next_token(),
            Err(LexError::Unexpected { ch: '<', line: 1 })
        ));
        assert_eq!(reports.borrow().len(), 1);
        assert!(reports.borrow()[0].starts_with("input:1: "));

        // Scanning resumes after the fault.
        assert_eq!(scanner.next_token().unwrap().text, "file");
    }

    #[test]
    fn test_interrupt_emits_one_token_and_resumes() {
        let src = ScriptedSource::new()
            .line("echo 'unfinished")
            .interrupt()
            .line("ls");
        let mut scanner = Scanner::new("tty", src);

        assert_eq!(scanner.next_token().unwrap().text, "echo");
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::Interrupt);
        assert_eq!(scanner.next_token().unwrap(), Token {
            kind: TokenKind::Symbol,
            text: "ls".to_string(),
            line: 2,
        });
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::Newline);
    }

    #[test]
    fn test_failed_read_retries_once_in_foreground() {
        let calls = Rc::new(RefCell::new(0));
        let src = ScriptedSource::new().fail(io::ErrorKind::Other).line("ok");
        let mut scanner = Scanner::new("tty", src).with_foreground(Box::new(Reclaim {
            calls: Rc::clone(&calls),
            result: true,
        }));

        assert_eq!(scanner.next_token().unwrap().text, "ok");
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_second_failure_ends_stream() {
        let calls = Rc::new(RefCell::new(0));
        let src = ScriptedSource::new()
            .fail(io::ErrorKind::Other)
            .fail(io::ErrorKind::Other)
            .line("never");
        let mut scanner = Scanner::new("tty", src).with_foreground(Box::new(Reclaim {
            calls: Rc::clone(&calls),
            result: true,
        }));

        assert!(matches!(scanner.next_token(), Err(LexError::Read(_))));
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::Newline);
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::End);
        assert_eq!(scanner.source().remaining(), 1);
    }

    #[test]
    fn test_failure_without_foreground_is_not_retried() {
        let src = ScriptedSource::new().fail(io::ErrorKind::BrokenPipe).line("never");
        let mut scanner = Scanner::new("pipe", src);
        assert!(matches!(scanner.next_token(), Err(LexError::Read(_))));
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::Newline);
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::End);
        assert!(scanner.is_finished());
    }

    #[test]
    fn test_unterminated_quote_at_end() {
        let reports = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&reports);
        let src = ScriptedSource::new().line("echo \"open");
        let mut scanner = Scanner::new("test", src)
            .with_error_handler(move |_, _, _| *sink.borrow_mut() += 1);

        assert_eq!(scanner.next_token().unwrap().text, "echo");
        assert!(matches!(
            scanner.next_token(),
            Err(LexError::Unterminated { line: 2 })
        ));
        assert_eq!(*reports.borrow(), 1);
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::End);
    }

    #[test]
    fn test_error_reports_current_location() {
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let mut scanner = Scanner::new("script", ScriptedSource::new().line("a"))
            .with_error_handler(move |name, line, msg| {
                *sink.borrow_mut() = Some((name.to_string(), line, msg.to_string()))
            });
        scanner.next_token().unwrap();
        scanner.error("syntax error");
        assert_eq!(
            seen.borrow().clone(),
            Some(("script".to_string(), 1, "syntax error".to_string()))
        );
    }

    #[test]
    fn test_reset_discards_buffered_text() {
        let src = ScriptedSource::new().line("a b c").line("d");
        let mut scanner = Scanner::new("test", src);
        assert_eq!(scanner.next_token().unwrap().text, "a");
        scanner.reset();
        assert_eq!(scanner.next_token().unwrap().text, "d");
    }

    #[test]
    fn test_token_ids() {
        assert_eq!(TokenKind::Newline.id(), 10);
        assert_eq!(TokenKind::LParen.id(), '(' as i32);
        assert_eq!(TokenKind::End.id(), 0);
        assert_eq!(TokenKind::Symbol.id(), FIRST_NAMED_ID);
        assert_eq!(TokenKind::Interrupt.id(), FIRST_NAMED_ID + 12);
    }

    #[test]
    fn test_literals() {
        let toks = scan("sym 'a\\tb' \"a\\tb\"\n");
        let mut scanner = Scanner::new("t", ReaderSource::new(Cursor::new("sym 'a\\tb' \"a\\tb\"\n")));
        let sym = scanner.next_token().unwrap().literal().unwrap();
        assert!(is_symbol(&sym));
        let single = scanner.next_token().unwrap().literal().unwrap();
        assert!(is_string(&single));
        assert_eq!(single.raw(), Some("a\\tb"));
        let double = scanner.next_token().unwrap().literal().unwrap();
        assert_eq!(double.raw(), Some("a\tb"));
        assert_eq!(toks.len(), 5);
    }

    #[test]
    fn test_operator_has_no_literal() {
        let t = Token {
            kind: TokenKind::Pipe,
            text: "pipe-stdout".to_string(),
            line: 1,
        };
        assert!(t.literal().is_none());
    }
}
