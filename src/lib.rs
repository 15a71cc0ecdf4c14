//! cellar evaluates a small Scheme with `set!` and closures, keeping variable
//! bindings (environments) apart from variable contents (the store).
//!
//! ```
//! let mut world = cellar::World::new();
//! let value = world
//!     .eval_source("(define n 0) (define bump (lambda () (set! n (+ n 1)) n)) (bump) (bump)")
//!     .unwrap();
//! assert_eq!(value.to_string(), "2");
//! ```
pub mod general_parser;
pub mod lexer;
mod num;
pub mod runtime;
pub mod syntax;
pub mod world;

pub use general_parser::{gast::*, general_parse, GAst, ParseError, ParseErrorKind};
pub use num::Number;
pub use runtime::{Address, Env, EvalError, PrimOp, Store};
pub use world::{value, Error, RedefinePolicy, World, WorldOptions};
