//! A World is one evaluation session: it owns the interner, the store and the
//! global frame, so definitions made by one call are visible to the next.

use lasso::{Rodeo, Spur};

use crate::{
    general_parse,
    general_parser::ParseError,
    runtime::{EvalError, GlobalFrame, Store},
    syntax::{Program, SyntaxBuilder, SyntaxError},
};

pub mod value;

use value::Value;

/// What a second top-level `define` of the same name does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RedefinePolicy {
    /// The name is rebound to the new cell; the old cell stays allocated.
    #[default]
    LatestWins,
    /// A new binding is appended, but lookups keep finding the first one.
    FirstWins,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorldOptions {
    pub redefine: RedefinePolicy,
    /// Fold identifiers to lower case unless a `#!no-fold-case` says otherwise.
    pub fold_case: bool,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Parse(Vec<ParseError>),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

#[derive(Debug, Default)]
pub struct World {
    /// interner for every variable name the session has seen
    pub(crate) rodeo: Rodeo,
    pub(crate) store: Store,
    pub(crate) global: GlobalFrame,
    pub(crate) options: WorldOptions,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: WorldOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> WorldOptions {
        self.options
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn global(&self) -> &GlobalFrame {
        &self.global
    }

    pub fn intern(&mut self, name: &str) -> Spur {
        self.rodeo.get_or_intern(name)
    }

    pub fn resolve(&self, name: Spur) -> &str {
        self.rodeo.resolve(&name)
    }

    /// Reads `source` and converts it to a [`Program`], without running it.
    pub fn parse(&mut self, source: &str) -> Result<Program, Error> {
        let gast = general_parse(source);
        if !gast.is_ok() {
            return Err(Error::Parse(gast.errors().to_vec()));
        }
        let program =
            SyntaxBuilder::new(&mut self.rodeo, self.options.fold_case).program(&gast.module())?;
        Ok(program)
    }

    /// Reads and runs `source` as one sequence in the global environment.
    pub fn eval_source(&mut self, source: &str) -> Result<Value, Error> {
        let program = self.parse(source)?;
        Ok(self.eval_program(&program)?)
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::{Error, World};
    use crate::{general_parser::ParseErrorKind, syntax::SyntaxErrorKind};

    #[test]
    fn interning() {
        let mut world = World::new();
        let a = world.intern("abc");
        check!(world.intern("abc") == a);
        check!(world.resolve(a) == "abc");
    }

    #[test]
    fn reader_errors_come_first() {
        let mut world = World::new();
        let_assert!(Err(Error::Parse(errors)) = world.eval_source("(+ 1"));
        let_assert!([err] = &errors[..]);
        check!(err.kind == ParseErrorKind::UnclosedList);

        let_assert!(Err(Error::Syntax(err)) = world.eval_source("(define x 1) (lambda (y y) y)"));
        check!(err.kind == SyntaxErrorKind::DuplicateName("y".into()));
        // nothing ran
        check!(world.store().is_empty());
    }

    #[test]
    fn error_messages() {
        let mut world = World::new();
        let_assert!(Err(err) = world.eval_source("undefined-thing"));
        check!(err.to_string() == "unbound variable: undefined-thing");
        let_assert!(Err(err) = world.eval_source(") ("));
        check!(err.to_string() == "unexpected `)`; list is never closed");
    }

    #[test]
    fn long_quoted_lists() {
        let items = (0..200_000).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let source = format!("(define xs '({items})) (define ys '({items})) (car xs)");
        let mut world = World::new();
        let_assert!(Ok(value) = world.eval_source(&source));
        check!(value.to_string() == "0");
        let_assert!(Ok(value) = world.eval_source("(equal? xs ys)"));
        check!(value.to_string() == "#t");
        drop(world);
    }
}
