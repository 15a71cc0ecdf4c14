//! runtimes are responsible for executing programs against the contents of a [`World`](crate::World)
//!
//! Variables are split in two: an [`Env`] maps a name to an [`Address`], and the
//! [`Store`] maps that address to the variable's current [`Value`]. `set!` only ever
//! touches the store, so environments can be shared freely between closures.

use core::fmt;
use std::rc::Rc;

use lasso::Spur;

use crate::{syntax::CExp, world::value::Value};

pub mod environment;
pub mod primitives;
pub mod store;
pub mod treewalk;

pub use environment::{Env, GlobalFrame};
pub use primitives::{PrimOp, PrimitiveError};
pub use store::{Address, OutOfBounds, Store};

/// Everything that can go wrong while evaluating a well-formed program.
///
/// None of these are recovered from: the first one raised aborts the whole
/// evaluation, and store mutations made before it stay in place.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("unbound variable: {0}")]
    UnboundVariable(Box<str>),
    #[error(transparent)]
    OutOfBounds(#[from] OutOfBounds),
    #[error("bad procedure: {0}")]
    BadProcedure(Value),
    #[error("empty program")]
    EmptyProgram,
    #[error("procedure expects {expected} argument(s), got {given}")]
    ArityMismatch { expected: usize, given: usize },
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),
}

/// A procedure written in the language itself.
///
/// The environment is the one active where the `lambda` was evaluated, not
/// where the closure ends up being called.
pub struct Closure {
    pub params: Rc<[Spur]>,
    pub body: Rc<[CExp]>,
    pub env: Env,
}

impl Closure {
    pub fn arity(&self) -> Arity {
        Arity::Exact(self.params.len())
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("arity", &self.arity())
            .field("body_len", &self.body.len())
            .finish_non_exhaustive()
    }
}

/// Procedure arity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Min(usize),
}

impl Arity {
    pub fn is_satisfied(&self, len: usize) -> bool {
        match self {
            Self::Exact(e) => *e == len,
            Self::Min(m) => *m <= len,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(e) => write!(f, "{e}"),
            Self::Min(m) => write!(f, "at least {m}"),
        }
    }
}
