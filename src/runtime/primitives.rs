//! Built-in procedures. These are resolved by name while building the syntax
//! tree, so a program can never rebind them.
use std::{collections::HashMap, sync::LazyLock};

use super::Arity;
use crate::{
    world::value::{Pair, Value},
    Number,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    NumEq,
    Not,
    And,
    Or,
    Eq,
    Equal,
    StringEq,
    Cons,
    Car,
    Cdr,
    List,
    IsPair,
    IsList,
    IsNull,
    IsNumber,
    IsBoolean,
    IsSymbol,
    IsString,
    IsProcedure,
}

static BY_NAME: LazyLock<HashMap<&str, PrimOp>> =
    LazyLock::new(|| PrimOp::ALL.iter().map(|op| (op.name(), *op)).collect());

impl PrimOp {
    pub const ALL: [PrimOp; 25] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Lt,
        Self::Gt,
        Self::NumEq,
        Self::Not,
        Self::And,
        Self::Or,
        Self::Eq,
        Self::Equal,
        Self::StringEq,
        Self::Cons,
        Self::Car,
        Self::Cdr,
        Self::List,
        Self::IsPair,
        Self::IsList,
        Self::IsNull,
        Self::IsNumber,
        Self::IsBoolean,
        Self::IsSymbol,
        Self::IsString,
        Self::IsProcedure,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        BY_NAME.get(name).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::NumEq => "=",
            Self::Not => "not",
            Self::And => "and",
            Self::Or => "or",
            Self::Eq => "eq?",
            Self::Equal => "equal?",
            Self::StringEq => "string=?",
            Self::Cons => "cons",
            Self::Car => "car",
            Self::Cdr => "cdr",
            Self::List => "list",
            Self::IsPair => "pair?",
            Self::IsList => "list?",
            Self::IsNull => "null?",
            Self::IsNumber => "number?",
            Self::IsBoolean => "boolean?",
            Self::IsSymbol => "symbol?",
            Self::IsString => "string?",
            Self::IsProcedure => "procedure?",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Self::Add | Self::Mul | Self::And | Self::Or | Self::List => Arity::Min(0),
            Self::Sub | Self::Div | Self::Lt | Self::Gt | Self::NumEq | Self::StringEq => {
                Arity::Min(1)
            }
            Self::Eq | Self::Equal | Self::Cons => Arity::Exact(2),
            Self::Not
            | Self::Car
            | Self::Cdr
            | Self::IsPair
            | Self::IsList
            | Self::IsNull
            | Self::IsNumber
            | Self::IsBoolean
            | Self::IsSymbol
            | Self::IsString
            | Self::IsProcedure => Arity::Exact(1),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PrimitiveError {
    #[error("{op}: expected {expected} argument(s), got {given}")]
    WrongArity {
        op: &'static str,
        expected: Arity,
        given: usize,
    },
    #[error("{op}: expected a {expected}, got {found}")]
    WrongType {
        op: &'static str,
        expected: &'static str,
        found: Value,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
}

type NumOp = fn(Number, Number) -> Result<Number, PrimitiveError>;

fn number(op: PrimOp, value: &Value) -> Result<Number, PrimitiveError> {
    value.as_number().ok_or_else(|| PrimitiveError::WrongType {
        op: op.name(),
        expected: "number",
        found: value.clone(),
    })
}

fn add(a: Number, b: Number) -> Result<Number, PrimitiveError> {
    match (a, b) {
        (Number::Integer(x), Number::Integer(y)) => x
            .checked_add(y)
            .map(Number::Integer)
            .ok_or(PrimitiveError::Overflow),
        (x, y) => Ok(Number::Real(x.to_f64() + y.to_f64())),
    }
}

fn sub(a: Number, b: Number) -> Result<Number, PrimitiveError> {
    match (a, b) {
        (Number::Integer(x), Number::Integer(y)) => x
            .checked_sub(y)
            .map(Number::Integer)
            .ok_or(PrimitiveError::Overflow),
        (x, y) => Ok(Number::Real(x.to_f64() - y.to_f64())),
    }
}

fn mul(a: Number, b: Number) -> Result<Number, PrimitiveError> {
    match (a, b) {
        (Number::Integer(x), Number::Integer(y)) => x
            .checked_mul(y)
            .map(Number::Integer)
            .ok_or(PrimitiveError::Overflow),
        (x, y) => Ok(Number::Real(x.to_f64() * y.to_f64())),
    }
}

fn div(a: Number, b: Number) -> Result<Number, PrimitiveError> {
    if b.is_zero() {
        return Err(PrimitiveError::DivisionByZero);
    }
    match (a, b) {
        // exact only when it divides evenly
        (Number::Integer(x), Number::Integer(y)) => match x.checked_rem(y) {
            Some(0) => x
                .checked_div(y)
                .map(Number::Integer)
                .ok_or(PrimitiveError::Overflow),
            Some(_) => Ok(Number::Real(x as f64 / y as f64)),
            None => Err(PrimitiveError::Overflow),
        },
        (x, y) => Ok(Number::Real(x.to_f64() / y.to_f64())),
    }
}

fn fold_numbers(op: PrimOp, args: &[Value], init: Number, f: NumOp) -> Result<Value, PrimitiveError> {
    args.iter()
        .try_fold(init, |acc, arg| f(acc, number(op, arg)?))
        .map(Value::Number)
}

/// `(- x)` is `(- 0 x)`, `(/ x)` is `(/ 1 x)`, otherwise folds from the first operand.
fn reduce_numbers(op: PrimOp, args: &[Value], unit: Number, f: NumOp) -> Result<Value, PrimitiveError> {
    match args {
        [only] => f(unit, number(op, only)?).map(Value::Number),
        [first, rest @ ..] => fold_numbers(op, rest, number(op, first)?, f),
        [] => Ok(Value::Number(unit)),
    }
}

fn compare(op: PrimOp, args: &[Value], holds: fn(Number, Number) -> bool) -> Result<Value, PrimitiveError> {
    let numbers = args
        .iter()
        .map(|arg| number(op, arg))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Bool(numbers.windows(2).all(|w| holds(w[0], w[1]))))
}

fn pair(op: PrimOp, value: &Value) -> Result<&Pair, PrimitiveError> {
    value.as_pair().ok_or_else(|| PrimitiveError::WrongType {
        op: op.name(),
        expected: "pair",
        found: value.clone(),
    })
}

/// Applies a primitive to already evaluated arguments.
pub fn apply_primitive(op: PrimOp, args: &[Value]) -> Result<Value, PrimitiveError> {
    let expected = op.arity();
    if !expected.is_satisfied(args.len()) {
        return Err(PrimitiveError::WrongArity {
            op: op.name(),
            expected,
            given: args.len(),
        });
    }

    match op {
        PrimOp::Add => fold_numbers(op, args, Number::Integer(0), add),
        PrimOp::Mul => fold_numbers(op, args, Number::Integer(1), mul),
        PrimOp::Sub => reduce_numbers(op, args, Number::Integer(0), sub),
        PrimOp::Div => reduce_numbers(op, args, Number::Integer(1), div),
        PrimOp::Lt => compare(op, args, Number::num_lt),
        PrimOp::Gt => compare(op, args, |a, b| b.num_lt(a)),
        PrimOp::NumEq => compare(op, args, Number::num_eq),
        PrimOp::Not => Ok(Value::Bool(!args[0].is_true())),
        // and/or are ordinary procedures here: every operand is already evaluated
        PrimOp::And => Ok(args
            .iter()
            .find(|arg| !arg.is_true())
            .or(args.last())
            .cloned()
            .unwrap_or(Value::Bool(true))),
        PrimOp::Or => Ok(args
            .iter()
            .find(|arg| arg.is_true())
            .cloned()
            .unwrap_or(Value::Bool(false))),
        PrimOp::Eq => Ok(Value::Bool(args[0].eqv(&args[1]))),
        PrimOp::Equal => Ok(Value::Bool(args[0] == args[1])),
        PrimOp::StringEq => {
            let strings = args
                .iter()
                .map(|arg| match arg {
                    Value::String(s) => Ok(s),
                    other => Err(PrimitiveError::WrongType {
                        op: op.name(),
                        expected: "string",
                        found: other.clone(),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Bool(strings.windows(2).all(|w| w[0] == w[1])))
        }
        PrimOp::Cons => Ok(Value::cons(args[0].clone(), args[1].clone())),
        PrimOp::Car => Ok(pair(op, &args[0])?.car.clone()),
        PrimOp::Cdr => Ok(pair(op, &args[0])?.cdr.clone()),
        PrimOp::List => Ok(Value::list(args.iter().cloned())),
        PrimOp::IsPair => Ok(Value::Bool(matches!(args[0], Value::Pair(_)))),
        PrimOp::IsList => Ok(Value::Bool(args[0].is_list())),
        PrimOp::IsNull => Ok(Value::Bool(matches!(args[0], Value::Null))),
        PrimOp::IsNumber => Ok(Value::Bool(matches!(args[0], Value::Number(_)))),
        PrimOp::IsBoolean => Ok(Value::Bool(matches!(args[0], Value::Bool(_)))),
        PrimOp::IsSymbol => Ok(Value::Bool(matches!(args[0], Value::Symbol(_)))),
        PrimOp::IsString => Ok(Value::Bool(matches!(args[0], Value::String(_)))),
        PrimOp::IsProcedure => Ok(Value::Bool(args[0].is_procedure())),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use arbtest::arbtest;
    use assert2::{check, let_assert};

    use super::{apply_primitive, PrimOp, PrimitiveError};
    use crate::{runtime::Arity, world::value::Value, Number};

    fn int(i: i64) -> Value {
        Value::Number(Number::Integer(i))
    }

    fn real(r: f64) -> Value {
        Value::Number(Number::Real(r))
    }

    #[test]
    fn names_resolve() {
        for op in PrimOp::ALL {
            check!(PrimOp::from_name(op.name()) == Some(op));
        }
        check!(PrimOp::from_name("set!") == None);
        check!(PrimOp::from_name("lambda") == None);
    }

    #[test]
    fn arithmetic() {
        check!(apply_primitive(PrimOp::Add, &[]) == Ok(int(0)));
        check!(apply_primitive(PrimOp::Add, &[int(1), int(2), int(3)]) == Ok(int(6)));
        check!(apply_primitive(PrimOp::Add, &[int(1), real(0.5)]) == Ok(real(1.5)));
        check!(apply_primitive(PrimOp::Sub, &[int(5)]) == Ok(int(-5)));
        check!(apply_primitive(PrimOp::Sub, &[int(10), int(3), int(2)]) == Ok(int(5)));
        check!(apply_primitive(PrimOp::Mul, &[]) == Ok(int(1)));
        check!(apply_primitive(PrimOp::Div, &[int(6), int(3)]) == Ok(int(2)));
        check!(apply_primitive(PrimOp::Div, &[int(1), int(2)]) == Ok(real(0.5)));
        check!(apply_primitive(PrimOp::Div, &[int(2)]) == Ok(real(0.5)));
    }

    #[test]
    fn arithmetic_errors() {
        check!(apply_primitive(PrimOp::Div, &[int(1), int(0)]) == Err(PrimitiveError::DivisionByZero));
        check!(apply_primitive(PrimOp::Div, &[real(1.0), real(0.0)]) == Err(PrimitiveError::DivisionByZero));
        check!(apply_primitive(PrimOp::Add, &[int(i64::MAX), int(1)]) == Err(PrimitiveError::Overflow));
        check!(apply_primitive(PrimOp::Div, &[int(i64::MIN), int(-1)]) == Err(PrimitiveError::Overflow));
        let_assert!(
            Err(PrimitiveError::WrongType { op: "+", expected: "number", found }) =
                apply_primitive(PrimOp::Add, &[int(1), Value::Bool(true)])
        );
        check!(found == Value::Bool(true));
    }

    #[test]
    fn exact_addition_matches_i64() {
        arbtest(|u| {
            let a: i64 = u.arbitrary()?;
            let b: i64 = u.arbitrary()?;
            let result = apply_primitive(PrimOp::Add, &[int(a), int(b)]);
            match a.checked_add(b) {
                Some(sum) => {
                    check!(result == Ok(int(sum)));
                }
                None => {
                    check!(result == Err(PrimitiveError::Overflow));
                }
            }
            Ok(())
        });
    }

    #[test]
    fn comparisons() {
        check!(apply_primitive(PrimOp::Lt, &[int(1), int(2), int(3)]) == Ok(Value::Bool(true)));
        check!(apply_primitive(PrimOp::Lt, &[int(1), int(3), int(2)]) == Ok(Value::Bool(false)));
        check!(apply_primitive(PrimOp::Gt, &[int(2), real(1.5)]) == Ok(Value::Bool(true)));
        check!(apply_primitive(PrimOp::NumEq, &[int(1), real(1.0)]) == Ok(Value::Bool(true)));
        check!(apply_primitive(PrimOp::NumEq, &[int(7)]) == Ok(Value::Bool(true)));
    }

    #[test]
    fn logic() {
        check!(apply_primitive(PrimOp::Not, &[Value::Bool(false)]) == Ok(Value::Bool(true)));
        check!(apply_primitive(PrimOp::Not, &[int(0)]) == Ok(Value::Bool(false)));
        check!(apply_primitive(PrimOp::And, &[]) == Ok(Value::Bool(true)));
        check!(apply_primitive(PrimOp::And, &[int(1), int(2)]) == Ok(int(2)));
        check!(apply_primitive(PrimOp::And, &[int(1), Value::Bool(false), int(2)]) == Ok(Value::Bool(false)));
        check!(apply_primitive(PrimOp::Or, &[]) == Ok(Value::Bool(false)));
        check!(apply_primitive(PrimOp::Or, &[Value::Bool(false), int(3)]) == Ok(int(3)));
    }

    #[test]
    fn pairs_and_lists() {
        let pair = apply_primitive(PrimOp::Cons, &[int(1), int(2)]).unwrap();
        check!(apply_primitive(PrimOp::Car, &[pair.clone()]) == Ok(int(1)));
        check!(apply_primitive(PrimOp::Cdr, &[pair.clone()]) == Ok(int(2)));
        check!(apply_primitive(PrimOp::IsList, &[pair.clone()]) == Ok(Value::Bool(false)));

        let list = apply_primitive(PrimOp::List, &[int(1), int(2)]).unwrap();
        check!(list.to_string() == "(1 2)");
        check!(apply_primitive(PrimOp::IsList, &[list.clone()]) == Ok(Value::Bool(true)));
        check!(apply_primitive(PrimOp::IsNull, &[Value::Null]) == Ok(Value::Bool(true)));
        check!(apply_primitive(PrimOp::Eq, &[list.clone(), list.clone()]) == Ok(Value::Bool(true)));

        let same = apply_primitive(PrimOp::List, &[int(1), int(2)]).unwrap();
        check!(apply_primitive(PrimOp::Eq, &[list.clone(), same.clone()]) == Ok(Value::Bool(false)));
        check!(apply_primitive(PrimOp::Equal, &[list, same]) == Ok(Value::Bool(true)));

        let_assert!(Err(PrimitiveError::WrongType { op: "car", .. }) = apply_primitive(PrimOp::Car, &[Value::Null]));
    }

    #[test]
    fn strings_and_predicates() {
        let s = |t: &str| Value::String(Rc::from(t));
        check!(apply_primitive(PrimOp::StringEq, &[s("a"), s("a")]) == Ok(Value::Bool(true)));
        check!(apply_primitive(PrimOp::StringEq, &[s("a"), s("b")]) == Ok(Value::Bool(false)));
        check!(apply_primitive(PrimOp::IsProcedure, &[Value::PrimOp(PrimOp::Car)]) == Ok(Value::Bool(true)));
        check!(apply_primitive(PrimOp::IsSymbol, &[Value::Symbol(Rc::from("a"))]) == Ok(Value::Bool(true)));
        check!(apply_primitive(PrimOp::IsString, &[Value::Symbol(Rc::from("a"))]) == Ok(Value::Bool(false)));
    }

    #[test]
    fn arity_is_checked() {
        check!(
            apply_primitive(PrimOp::Cons, &[int(1)])
                == Err(PrimitiveError::WrongArity { op: "cons", expected: Arity::Exact(2), given: 1 })
        );
        let_assert!(Err(PrimitiveError::WrongArity { given: 0, .. }) = apply_primitive(PrimOp::Sub, &[]));
    }
}
