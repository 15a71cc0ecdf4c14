//! Representation of run-time values
use core::fmt;
use std::rc::Rc;

use crate::{
    runtime::{Closure, PrimOp},
    Number,
};

// Type that stores all possible values!
#[derive(Clone, Default, Debug)]
pub enum Value {
    // the return value of set! and of (if #f x)
    #[default]
    Void,
    Number(Number),
    Bool(bool),
    // Rc so copying a value out of the store never copies text
    String(Rc<str>),
    // the value of 'ident (quote ident)
    Symbol(Rc<str>),
    // This is the value written as ()
    Null,
    Pair(Rc<Pair>),
    PrimOp(PrimOp),
    Closure(Rc<Closure>),
}

#[derive(Debug, Clone)]
pub struct Pair {
    pub car: Value,
    pub cdr: Value,
}

// Unlinks the cdr chain one pair at a time, so long lists don't exhaust the stack
impl Drop for Pair {
    fn drop(&mut self) {
        let mut next = std::mem::take(&mut self.cdr);
        while let Value::Pair(rc) = next {
            match Rc::try_unwrap(rc) {
                Ok(mut pair) => next = std::mem::take(&mut pair.cdr),
                // still shared, someone else drops the rest
                Err(_) => break,
            }
        }
    }
}

impl PartialEq for Pair {
    fn eq(&self, other: &Self) -> bool {
        let (mut a, mut b) = (self, other);
        loop {
            if core::ptr::eq(a, b) {
                return true;
            }
            if a.car != b.car {
                return false;
            }
            match (&a.cdr, &b.cdr) {
                (Value::Pair(x), Value::Pair(y)) => (a, b) = (&**x, &**y),
                (x, y) => return x == y,
            }
        }
    }
}

impl Value {
    /// Only `#f` is false.
    pub fn is_true(&self) -> bool {
        !matches!(self, Self::Bool(false))
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<&Pair> {
        match self {
            Self::Pair(p) => Some(p),
            _ => None,
        }
    }

    pub fn cons(car: Value, cdr: Value) -> Self {
        Self::Pair(Rc::new(Pair { car, cdr }))
    }

    /// Builds a proper list out of `items`.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        items
            .into_iter()
            .rev()
            .fold(Self::Null, |cdr, car| Self::cons(car, cdr))
    }

    /// Whether this is `()` or a chain of pairs ending in `()`.
    pub fn is_list(&self) -> bool {
        let mut current = self;
        loop {
            match current {
                Self::Null => return true,
                Self::Pair(p) => current = &p.cdr,
                _ => return false,
            }
        }
    }

    pub fn is_procedure(&self) -> bool {
        matches!(self, Self::PrimOp(_) | Self::Closure(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Number(_) => "number",
            Self::Bool(_) => "boolean",
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Null => "null",
            Self::Pair(_) => "pair",
            Self::PrimOp(_) | Self::Closure(_) => "procedure",
        }
    }

    /// Identity comparison: atoms compare by value, pairs and closures by
    /// allocation.
    pub fn eqv(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Pair(a), Self::Pair(b)) => Rc::ptr_eq(a, b),
            (Self::Closure(a), Self::Closure(b)) => Rc::ptr_eq(a, b),
            (a, b) => a == b,
        }
    }
}

// Structural equality, which is what equal? needs
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Void, Self::Void) | (Self::Null, Self::Null) => true,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Symbol(a), Self::Symbol(b)) => a == b,
            (Self::Pair(a), Self::Pair(b)) => **a == **b,
            (Self::PrimOp(a), Self::PrimOp(b)) => a == b,
            (Self::Closure(a), Self::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            c if c.is_control() => write!(f, "\\x{:x};", u32::from(c))?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "\"")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "#<void>"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(true) => write!(f, "#t"),
            Value::Bool(false) => write!(f, "#f"),
            Value::String(s) => write_string(f, s),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Null => write!(f, "()"),
            Value::Pair(p) => {
                write!(f, "({}", p.car)?;
                let mut rest = &p.cdr;
                loop {
                    match rest {
                        Value::Null => break,
                        Value::Pair(next) => {
                            write!(f, " {}", next.car)?;
                            rest = &next.cdr;
                        }
                        tail => {
                            write!(f, " . {tail}")?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
            Value::PrimOp(op) => write!(f, "#<procedure {}>", op.name()),
            Value::Closure(_) => write!(f, "#<procedure>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use assert2::{check, let_assert};

    use super::Value;
    use crate::{runtime::PrimOp, Number};

    fn int(i: i64) -> Value {
        Value::Number(Number::Integer(i))
    }

    #[test]
    fn truthiness() {
        check!(!Value::Bool(false).is_true());
        check!(Value::Bool(true).is_true());
        check!(int(0).is_true());
        check!(Value::Null.is_true());
        check!(Value::String(Rc::from("")).is_true());
        check!(Value::Void.is_true());
    }

    #[test]
    fn display() {
        check!(Value::list([int(1), int(2), int(3)]).to_string() == "(1 2 3)");
        check!(Value::cons(int(1), Value::cons(int(2), int(3))).to_string() == "(1 2 . 3)");
        check!(Value::list([Value::Null, Value::Bool(false)]).to_string() == "(() #f)");
        check!(Value::String(Rc::from("a\"b\n")).to_string() == r#""a\"b\n""#);
        check!(Value::Symbol(Rc::from("abc")).to_string() == "abc");
        check!(Value::PrimOp(PrimOp::Add).to_string() == "#<procedure +>");
        check!(Value::Void.to_string() == "#<void>");
    }

    #[test]
    fn lists() {
        check!(Value::Null.is_list());
        check!(Value::list([int(1)]).is_list());
        check!(!Value::cons(int(1), int(2)).is_list());
        check!(!int(1).is_list());
    }

    #[test]
    fn equality() {
        let a = Value::list([int(1), int(2)]);
        let b = Value::list([int(1), int(2)]);
        check!(a == b);
        check!(!a.eqv(&b));
        check!(a.eqv(&a.clone()));
        check!(int(1).eqv(&int(1)));
        check!(int(1) != Value::Number(Number::Real(1.0)));
        check!(Value::Symbol(Rc::from("x")).eqv(&Value::Symbol(Rc::from("x"))));
        check!(Value::cons(int(1), int(2)) != Value::cons(int(1), int(3)));
        check!(Value::list([int(1)]) != Value::list([int(1), int(2)]));
    }

    #[test]
    fn long_lists_compare_and_drop() {
        let a = Value::list((0..200_000).map(int));
        let b = Value::list((0..200_000).map(int));
        check!(a == b);
        let c = Value::list((0..200_000).map(|i| int(if i == 199_999 { -1 } else { i })));
        check!(a != c);
        drop((a, b, c));
    }

    #[test]
    fn shared_tails_survive_drop() {
        let tail = Value::list((0..1000).map(int));
        let head = Value::cons(int(-1), tail.clone());
        drop(head);
        let_assert!(Some(pair) = tail.as_pair());
        check!(pair.car == int(0));
        check!(tail.to_string().ends_with("998 999)"));
    }
}
