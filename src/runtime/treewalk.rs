//! A recursive, applicative-order evaluator that walks the syntax tree directly.
//!
//! Every binding form allocates fresh store cells, and `set!` writes through the
//! address its variable resolves to, so closures sharing a frame also share
//! updates made through it.
use std::rc::Rc;

use lasso::Spur;
use tracing::{debug, trace};

use super::{primitives::apply_primitive, store::Address, Closure, Env, EvalError};
use crate::{
    syntax::{CExp, DefineExp, Exp, Program},
    world::{value::Value, World},
};

impl World {
    pub fn eval_program(&mut self, program: &Program) -> Result<Value, EvalError> {
        self.eval_sequence(&program.exps)
    }

    /// Runs top-level forms in order and returns the value of the last one.
    ///
    /// A sequence has to end in an expression: an empty one, or one whose last
    /// form is a definition, fails with [`EvalError::EmptyProgram`] (after that
    /// definition has been made).
    pub fn eval_sequence(&mut self, exps: &[Exp]) -> Result<Value, EvalError> {
        let Some((last, init)) = exps.split_last() else {
            return Err(EvalError::EmptyProgram);
        };
        for exp in init {
            self.eval_toplevel(exp)?;
        }
        match last {
            Exp::Define(define) => {
                self.define(define)?;
                Err(EvalError::EmptyProgram)
            }
            Exp::Expr(exp) => self.evaluate(exp, &Env::Global),
        }
    }

    /// Runs one top-level form. Definitions evaluate to [`Value::Void`].
    pub fn eval_toplevel(&mut self, exp: &Exp) -> Result<Value, EvalError> {
        match exp {
            Exp::Define(define) => {
                self.define(define)?;
                Ok(Value::Void)
            }
            Exp::Expr(exp) => self.evaluate(exp, &Env::Global),
        }
    }

    fn define(&mut self, define: &DefineExp) -> Result<(), EvalError> {
        let value = self.evaluate(&define.val, &Env::Global)?;
        let address = self.store.allocate(value);
        debug!(name = self.resolve(define.var), %address, "defining global");
        self.global.define(define.var, address, self.options.redefine);
        Ok(())
    }

    fn lookup(&self, env: &Env, var: Spur) -> Result<Address, EvalError> {
        env.lookup(&self.global, var)
            .ok_or_else(|| EvalError::UnboundVariable(Box::from(self.resolve(var))))
    }

    pub fn evaluate(&mut self, exp: &CExp, env: &Env) -> Result<Value, EvalError> {
        match exp {
            CExp::Num(n) => Ok(Value::Number(*n)),
            CExp::Bool(b) => Ok(Value::Bool(*b)),
            CExp::Str(s) => Ok(Value::String(s.clone())),
            CExp::Lit(value) => Ok(value.clone()),
            CExp::PrimOp(op) => Ok(Value::PrimOp(*op)),
            CExp::VarRef(var) => {
                let address = self.lookup(env, *var)?;
                Ok(self.store.read(address)?)
            }
            CExp::If(if_exp) => {
                if self.evaluate(&if_exp.test, env)?.is_true() {
                    self.evaluate(&if_exp.then, env)
                } else {
                    match &if_exp.alt {
                        Some(alt) => self.evaluate(alt, env),
                        None => Ok(Value::Void),
                    }
                }
            }
            CExp::Proc(proc) => Ok(Value::Closure(Rc::new(Closure {
                params: proc.params.clone(),
                body: proc.body.clone(),
                env: env.clone(),
            }))),
            CExp::Let(let_exp) => {
                let vals = self.evaluate_all(&let_exp.vals, env)?;
                let addresses = self.store.allocate_all(vals);
                let env = Env::extend(let_exp.vars.clone(), addresses, env.clone());
                self.eval_body(&let_exp.body, &env)
            }
            CExp::App(app) => {
                let rator = self.evaluate(&app.rator, env)?;
                let rands = self.evaluate_all(&app.rands, env)?;
                self.apply(rator, rands)
            }
            CExp::Set(set) => {
                let value = self.evaluate(&set.val, env)?;
                let address = self.lookup(env, set.var)?;
                self.store.write(address, value)?;
                Ok(Value::Void)
            }
        }
    }

    // strictly left to right
    fn evaluate_all(&mut self, exps: &[CExp], env: &Env) -> Result<Vec<Value>, EvalError> {
        exps.iter().map(|exp| self.evaluate(exp, env)).collect()
    }

    fn eval_body(&mut self, body: &[CExp], env: &Env) -> Result<Value, EvalError> {
        let Some((last, init)) = body.split_last() else {
            return Err(EvalError::EmptyProgram);
        };
        for exp in init {
            self.evaluate(exp, env)?;
        }
        self.evaluate(last, env)
    }

    /// Applies an evaluated operator to evaluated operands.
    #[tracing::instrument(level = "trace", skip_all, fields(arity = args.len()))]
    pub fn apply(&mut self, procedure: Value, args: Vec<Value>) -> Result<Value, EvalError> {
        match procedure {
            Value::PrimOp(op) => {
                trace!(op = op.name(), "applying primitive");
                Ok(apply_primitive(op, &args)?)
            }
            Value::Closure(closure) => {
                if closure.params.len() != args.len() {
                    return Err(EvalError::ArityMismatch {
                        expected: closure.params.len(),
                        given: args.len(),
                    });
                }
                let addresses = self.store.allocate_all(args);
                // the captured environment, not the caller's
                let env = Env::extend(closure.params.clone(), addresses, closure.env.clone());
                self.eval_body(&closure.body, &env)
            }
            other => Err(EvalError::BadProcedure(other)),
        }
    }
}
