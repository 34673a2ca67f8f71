//! Runtime values
//!
//! Every value the shell manipulates is a [`Cell`]. The variants form three
//! nested capability sets:
//!
//! - every cell can be tested for truth, compared and rendered;
//! - atoms (booleans, numbers, strings, symbols) also project to float,
//!   integer and exact rational;
//! - numbers (integers, floats, rationals and symbols) also order and do
//!   arithmetic. All arithmetic is exact: both operands are projected to
//!   rationals and the result is a canonical rational.
//!
//! Pairs build lists. [`Cell::Null`] is the single empty list; its head and
//! tail are both Null. Variables and constants are reference cells.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};
use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::cache;
use crate::numeric;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CellError {
    #[error("not a number: {0:?}")]
    NotNumeric(String),
    #[error("operation not permitted")]
    NotPermitted,
    #[error("constant cannot be set")]
    ConstantSet,
    #[error("division by zero")]
    DivisionByZero,
    #[error("{0} is not an atom")]
    NotAnAtom(&'static str),
    #[error("{0} is not a number")]
    NotANumber(&'static str),
    #[error("{0} is not a reference")]
    NotAReference(&'static str),
    #[error("{0} is not a cons cell")]
    NotACons(&'static str),
    #[error("float {0} has no exact value")]
    NotFinite(f64),
    #[error("{0} does not fit in 64 bits")]
    OutOfRange(String),
}

/// A value in the shell's universal representation
#[derive(Clone)]
pub enum Cell {
    /// The empty list
    Null,
    Boolean(bool),
    Integer(Arc<i64>),
    Float(f64),
    Rational(Arc<BigRational>),
    String(Arc<Text>),
    Symbol(Arc<str>),
    Pair(Arc<Pair>),
    Variable(Arc<Variable>),
    Constant(Arc<Constant>),
}

/// The canonical true value
pub const TRUE: Cell = Cell::Boolean(true);

/// The canonical false value
pub const FALSE: Cell = Cell::Boolean(false);

/// Immutable string contents plus a lazily computed numeric projection
pub struct Text {
    text: String,
    number: OnceCell<Option<BigRational>>,
}

impl Text {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    fn rational(&self) -> Option<&BigRational> {
        self.number
            .get_or_init(|| numeric::parse_rational(&self.text))
            .as_ref()
    }
}

/// A cons cell
pub struct Pair {
    head: Cell,
    tail: Cell,
}

impl Pair {
    pub fn head(&self) -> &Cell {
        &self.head
    }

    pub fn tail(&self) -> &Cell {
        &self.tail
    }
}

// Unlinks a long list one node at a time; recursive drops exhaust the stack.
impl Drop for Pair {
    fn drop(&mut self) {
        let mut tail = std::mem::replace(&mut self.tail, Cell::Null);
        while let Cell::Pair(p) = tail {
            match Arc::try_unwrap(p) {
                Ok(mut pair) => tail = std::mem::replace(&mut pair.tail, Cell::Null),
                Err(_) => break,
            }
        }
    }
}

/// Read and replace access to a reference cell
pub trait Reference {
    /// Current value
    fn get(&self) -> Cell;

    /// Replace the current value
    fn set(&self, value: Cell) -> Result<(), CellError>;

    /// A new mutable variable holding the current value
    fn copy(&self) -> Cell {
        make_variable(self.get())
    }
}

/// A mutable reference cell
pub struct Variable {
    value: RwLock<Cell>,
}

impl Reference for Variable {
    fn get(&self) -> Cell {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, value: Cell) -> Result<(), CellError> {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = value;
        Ok(())
    }
}

/// A read-only reference cell
pub struct Constant {
    inner: Variable,
}

impl Reference for Constant {
    fn get(&self) -> Cell {
        self.inner.get()
    }

    fn set(&self, _value: Cell) -> Result<(), CellError> {
        Err(CellError::ConstantSet)
    }
}

// ============================================================================
// Construction
// ============================================================================

pub fn make_boolean(v: bool) -> Cell {
    if v {
        TRUE
    } else {
        FALSE
    }
}

/// Integer cell; values in [-256, 255] are shared instances
pub fn make_integer(v: i64) -> Cell {
    Cell::Integer(cache::integer(v))
}

pub fn make_float(v: f64) -> Cell {
    Cell::Float(v)
}

/// Rational cell; integral values in [-256, 255] are shared instances
pub fn make_rational(r: BigRational) -> Cell {
    Cell::Rational(cache::rational(r))
}

pub fn make_string(s: impl Into<String>) -> Cell {
    Cell::String(Arc::new(Text {
        text: s.into(),
        number: OnceCell::new(),
    }))
}

/// Symbol cell; symbols of three characters or fewer are interned
pub fn make_symbol(s: &str) -> Cell {
    Cell::Symbol(cache::symbol(s))
}

pub fn cons(head: Cell, tail: Cell) -> Cell {
    Cell::Pair(Arc::new(Pair { head, tail }))
}

pub fn make_variable(v: Cell) -> Cell {
    Cell::Variable(Arc::new(Variable {
        value: RwLock::new(v),
    }))
}

pub fn make_constant(v: Cell) -> Cell {
    Cell::Constant(Arc::new(Constant {
        inner: Variable {
            value: RwLock::new(v),
        },
    }))
}

/// Proper list of `items`
pub fn list<I>(items: I) -> Cell
where
    I: IntoIterator<Item = Cell>,
    I::IntoIter: DoubleEndedIterator,
{
    items
        .into_iter()
        .rev()
        .fold(Cell::Null, |tail, head| cons(head, tail))
}

// ============================================================================
// List access and predicates
// ============================================================================

/// Head of a pair; the head of Null is Null
pub fn car(c: &Cell) -> Result<Cell, CellError> {
    match c {
        Cell::Null => Ok(Cell::Null),
        Cell::Pair(p) => Ok(p.head.clone()),
        other => Err(CellError::NotACons(other.kind())),
    }
}

/// Tail of a pair; the tail of Null is Null
pub fn cdr(c: &Cell) -> Result<Cell, CellError> {
    match c {
        Cell::Null => Ok(Cell::Null),
        Cell::Pair(p) => Ok(p.tail.clone()),
        other => Err(CellError::NotACons(other.kind())),
    }
}

pub fn is_atom(c: &Cell) -> bool {
    matches!(
        c,
        Cell::Boolean(_)
            | Cell::Integer(_)
            | Cell::Float(_)
            | Cell::Rational(_)
            | Cell::String(_)
            | Cell::Symbol(_)
    )
}

pub fn is_boolean(c: &Cell) -> bool {
    matches!(c, Cell::Boolean(_))
}

/// True for pairs, including Null
pub fn is_cons(c: &Cell) -> bool {
    matches!(c, Cell::Pair(_) | Cell::Null)
}

pub fn is_float(c: &Cell) -> bool {
    matches!(c, Cell::Float(_))
}

pub fn is_integer(c: &Cell) -> bool {
    matches!(c, Cell::Integer(_))
}

pub fn is_null(c: &Cell) -> bool {
    matches!(c, Cell::Null)
}

pub fn is_number(c: &Cell) -> bool {
    matches!(c, Cell::Integer(_) | Cell::Float(_) | Cell::Rational(_))
}

pub fn is_rational(c: &Cell) -> bool {
    matches!(c, Cell::Rational(_))
}

pub fn is_string(c: &Cell) -> bool {
    matches!(c, Cell::String(_))
}

pub fn is_symbol(c: &Cell) -> bool {
    matches!(c, Cell::Symbol(_))
}

// ============================================================================
// Capabilities
// ============================================================================

enum Arith {
    Add,
    Divide,
    Modulo,
    Multiply,
    Subtract,
}

impl Cell {
    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Cell::Null => "null",
            Cell::Boolean(_) => "boolean",
            Cell::Integer(_) => "integer",
            Cell::Float(_) => "float",
            Cell::Rational(_) => "rational",
            Cell::String(_) => "string",
            Cell::Symbol(_) => "symbol",
            Cell::Pair(_) => "cons",
            Cell::Variable(_) => "variable",
            Cell::Constant(_) => "constant",
        }
    }

    /// True when both handles refer to the same instance.
    ///
    /// Floats are never shared, so two floats are never the same instance.
    pub fn same(&self, other: &Cell) -> bool {
        match (self, other) {
            (Cell::Null, Cell::Null) => true,
            (Cell::Boolean(a), Cell::Boolean(b)) => a == b,
            (Cell::Integer(a), Cell::Integer(b)) => Arc::ptr_eq(a, b),
            (Cell::Rational(a), Cell::Rational(b)) => Arc::ptr_eq(a, b),
            (Cell::String(a), Cell::String(b)) => Arc::ptr_eq(a, b),
            (Cell::Symbol(a), Cell::Symbol(b)) => Arc::ptr_eq(a, b),
            (Cell::Pair(a), Cell::Pair(b)) => Arc::ptr_eq(a, b),
            (Cell::Variable(a), Cell::Variable(b)) => Arc::ptr_eq(a, b),
            (Cell::Constant(a), Cell::Constant(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Cell::Null => false,
            Cell::Boolean(b) => *b,
            Cell::Integer(i) => **i != 0,
            Cell::Float(f) => *f != 0.0,
            Cell::Rational(r) => !r.is_zero(),
            Cell::String(_) => true,
            Cell::Symbol(s) => &**s != "false",
            Cell::Pair(_) | Cell::Variable(_) | Cell::Constant(_) => true,
        }
    }

    /// Value equality.
    ///
    /// Numbers compare exactly against any atom's rational projection,
    /// strings and symbols compare by text, booleans by truth, pairs
    /// structurally and reference cells through their current value.
    ///
    /// Not symmetric for reference cells: a variable on the left compares
    /// through its value, but no other cell looks inside one on the right.
    pub fn equals(&self, other: &Cell) -> bool {
        if self.same(other) {
            return true;
        }

        match self {
            Cell::Null => false,
            Cell::Pair(_) => pairs_equal(self, other),
            Cell::Boolean(b) => is_atom(other) && *b == other.is_truthy(),
            Cell::Integer(_) | Cell::Float(_) | Cell::Rational(_) => {
                if !is_atom(other) {
                    return false;
                }
                match (self.as_exact_rational(), other.as_exact_rational()) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                }
            }
            Cell::String(_) | Cell::Symbol(_) => {
                is_atom(other) && self.atom_text() == other.atom_text()
            }
            Cell::Variable(v) => v.get().equals(other),
            Cell::Constant(c) => c.get().equals(other),
        }
    }

    /// Text an atom compares by: the raw contents for strings, the rendered
    /// form for everything else
    fn atom_text(&self) -> String {
        match self {
            Cell::String(t) => t.text.clone(),
            Cell::Symbol(s) => s.to_string(),
            other => other.to_string(),
        }
    }

    /// Unquoted contents of a string or symbol
    pub fn raw(&self) -> Option<&str> {
        match self {
            Cell::String(t) => Some(t.as_str()),
            Cell::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// True when the exact rational projection would succeed. The integer
    /// and float projections can still reject text such as `1.5` or `3/4`.
    pub fn is_numeric(&self) -> bool {
        match self {
            Cell::Integer(_) | Cell::Rational(_) => true,
            Cell::Float(f) => f.is_finite(),
            Cell::String(t) => t.rational().is_some(),
            Cell::Symbol(s) => numeric::parse_rational(s).is_some(),
            _ => false,
        }
    }

    pub fn as_float(&self) -> Result<f64, CellError> {
        match self {
            Cell::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Cell::Integer(i) => Ok(**i as f64),
            Cell::Float(f) => Ok(*f),
            Cell::Rational(r) => Ok(rational_to_f64(r)),
            Cell::String(t) => {
                numeric::parse_float(&t.text).ok_or_else(|| CellError::NotNumeric(t.text.clone()))
            }
            Cell::Symbol(s) => {
                numeric::parse_float(s).ok_or_else(|| CellError::NotNumeric(s.to_string()))
            }
            other => Err(CellError::NotAnAtom(other.kind())),
        }
    }

    /// Integer projection; rationals truncate toward zero
    pub fn as_int(&self) -> Result<i64, CellError> {
        match self {
            Cell::Boolean(b) => Ok(i64::from(*b)),
            Cell::Integer(i) => Ok(**i),
            Cell::Float(f) => Ok(*f as i64),
            Cell::Rational(r) => r
                .to_integer()
                .to_i64()
                .ok_or_else(|| CellError::OutOfRange(numeric::format_rational(r))),
            Cell::String(t) => {
                numeric::parse_int(&t.text).ok_or_else(|| CellError::NotNumeric(t.text.clone()))
            }
            Cell::Symbol(s) => {
                numeric::parse_int(s).ok_or_else(|| CellError::NotNumeric(s.to_string()))
            }
            other => Err(CellError::NotAnAtom(other.kind())),
        }
    }

    /// Exact rational projection; floats convert from their binary value
    pub fn as_exact_rational(&self) -> Result<BigRational, CellError> {
        match self {
            Cell::Boolean(b) => Ok(BigRational::from_integer(BigInt::from(u8::from(*b)))),
            Cell::Integer(i) => Ok(BigRational::from_integer(BigInt::from(**i))),
            Cell::Float(f) => BigRational::from_float(*f).ok_or(CellError::NotFinite(*f)),
            Cell::Rational(r) => Ok((**r).clone()),
            Cell::String(t) => t
                .rational()
                .cloned()
                .ok_or_else(|| CellError::NotNumeric(t.text.clone())),
            Cell::Symbol(s) => {
                numeric::parse_rational(s).ok_or_else(|| CellError::NotNumeric(s.to_string()))
            }
            other => Err(CellError::NotAnAtom(other.kind())),
        }
    }

    fn check_number(&self) -> Result<(), CellError> {
        match self {
            Cell::Integer(_) | Cell::Float(_) | Cell::Rational(_) | Cell::Symbol(_) => Ok(()),
            other => Err(CellError::NotANumber(other.kind())),
        }
    }

    fn operand(other: &Cell) -> Result<BigRational, CellError> {
        if !is_atom(other) {
            return Err(CellError::NotAnAtom(other.kind()));
        }
        other.as_exact_rational()
    }

    fn compare(&self, other: &Cell) -> Result<std::cmp::Ordering, CellError> {
        self.check_number()?;
        if let Cell::Symbol(s) = self {
            // Symbols order as text.
            if !is_atom(other) {
                return Err(CellError::NotAnAtom(other.kind()));
            }
            return Ok((**s).cmp(other.atom_text().as_str()));
        }
        let a = self.as_exact_rational()?;
        let b = Cell::operand(other)?;
        Ok(a.cmp(&b))
    }

    pub fn greater(&self, other: &Cell) -> Result<bool, CellError> {
        Ok(self.compare(other)?.is_gt())
    }

    pub fn less(&self, other: &Cell) -> Result<bool, CellError> {
        Ok(self.compare(other)?.is_lt())
    }

    fn arithmetic(&self, other: &Cell, op: Arith) -> Result<Cell, CellError> {
        self.check_number()?;
        let a = self.as_exact_rational()?;
        let b = Cell::operand(other)?;

        let result = match op {
            Arith::Add => a + b,
            Arith::Subtract => a - b,
            Arith::Multiply => a * b,
            Arith::Divide => {
                if b.is_zero() {
                    return Err(CellError::DivisionByZero);
                }
                a / b
            }
            Arith::Modulo => BigRational::from_integer(modulo(&a, &b)?),
        };

        Ok(make_rational(result))
    }

    pub fn add(&self, other: &Cell) -> Result<Cell, CellError> {
        self.arithmetic(other, Arith::Add)
    }

    pub fn divide(&self, other: &Cell) -> Result<Cell, CellError> {
        self.arithmetic(other, Arith::Divide)
    }

    /// Euclidean remainder; both operands must be exact integers
    pub fn modulo(&self, other: &Cell) -> Result<Cell, CellError> {
        self.arithmetic(other, Arith::Modulo)
    }

    pub fn multiply(&self, other: &Cell) -> Result<Cell, CellError> {
        self.arithmetic(other, Arith::Multiply)
    }

    pub fn subtract(&self, other: &Cell) -> Result<Cell, CellError> {
        self.arithmetic(other, Arith::Subtract)
    }

    /// Current value of a variable or constant
    pub fn get(&self) -> Result<Cell, CellError> {
        match self {
            Cell::Variable(v) => Ok(v.get()),
            Cell::Constant(c) => Ok(c.get()),
            other => Err(CellError::NotAReference(other.kind())),
        }
    }

    /// Replace the value of a variable; constants refuse
    pub fn set(&self, value: Cell) -> Result<(), CellError> {
        match self {
            Cell::Variable(v) => v.set(value),
            Cell::Constant(c) => c.set(value),
            other => Err(CellError::NotAReference(other.kind())),
        }
    }

    /// Fresh mutable variable holding the current value
    pub fn copy(&self) -> Result<Cell, CellError> {
        match self {
            Cell::Variable(v) => Ok(v.copy()),
            Cell::Constant(c) => Ok(c.copy()),
            other => Err(CellError::NotAReference(other.kind())),
        }
    }
}

fn rational_to_f64(r: &BigRational) -> f64 {
    r.to_f64().unwrap_or_else(|| {
        let n = r.numer().to_f64().unwrap_or(f64::NAN);
        let d = r.denom().to_f64().unwrap_or(f64::NAN);
        n / d
    })
}

fn modulo(a: &BigRational, b: &BigRational) -> Result<BigInt, CellError> {
    if !a.is_integer() || !b.is_integer() {
        return Err(CellError::NotPermitted);
    }
    let m = b.numer().abs();
    if m.is_zero() {
        return Err(CellError::DivisionByZero);
    }
    Ok(((a.numer() % &m) + &m) % &m)
}

fn pairs_equal(a: &Cell, b: &Cell) -> bool {
    let (mut a, mut b) = (a.clone(), b.clone());
    loop {
        if a.same(&b) {
            return true;
        }
        let (pa, pb) = match (&a, &b) {
            (Cell::Pair(pa), Cell::Pair(pb)) => (Arc::clone(pa), Arc::clone(pb)),
            (Cell::Pair(_), _) | (_, Cell::Pair(_)) => return false,
            _ => return a.equals(&b),
        };
        if !pa.head.equals(&pb.head) {
            return false;
        }
        a = pa.tail.clone();
        b = pb.tail.clone();
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// A head is wrapped in parentheses when it is itself a list
fn needs_parens(head: &Cell) -> bool {
    match head {
        Cell::Null => true,
        Cell::Pair(p) => is_cons(&p.tail),
        _ => false,
    }
}

fn write_list(f: &mut fmt::Formatter, first: &Arc<Pair>) -> fmt::Result {
    let mut pair = Arc::clone(first);
    loop {
        if needs_parens(&pair.head) {
            write!(f, "({})", pair.head)?;
        } else {
            write!(f, "{}", pair.head)?;
        }

        let next = match &pair.tail {
            Cell::Null => return Ok(()),
            Cell::Pair(p) => Arc::clone(p),
            tail => return write!(f, "::{tail}"),
        };
        write!(f, " ")?;
        pair = next;
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Float(x) => write!(f, "{}", numeric::format_float(*x)),
            Cell::Rational(r) => write!(f, "{}", numeric::format_rational(r)),
            Cell::String(t) => write!(f, "{}", escape(&t.text)),
            Cell::Symbol(s) => write!(f, "{s}"),
            Cell::Pair(p) => write_list(f, p),
            Cell::Variable(v) => write!(f, "%variable {:p}%", Arc::as_ptr(v)),
            Cell::Constant(c) => write!(f, "%ct {:p}%", Arc::as_ptr(c)),
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "Null"),
            Cell::Pair(_) => write!(f, "Pair({self})"),
            other => write!(f, "{}({other})", other.kind()),
        }
    }
}

/// Same-variant value equality. Use [`Cell::equals`] for the shell's
/// cross-kind comparison.
impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other) && self.equals(other)
    }
}
