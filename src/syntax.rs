//! The syntax layer turns datum read by the general parser into the expression
//! tree the evaluator walks.
//!
//! Everything that can be rejected without running the program is rejected here:
//! malformed special forms, nested `define`s, dotted applications and names
//! bound twice in one frame. Primitive names resolve to [`PrimOp`]s at this point,
//! so programs can neither rebind nor shadow them.
use std::{collections::HashSet, rc::Rc};

use lasso::{Rodeo, Spur};

use crate::{
    general_parser::{
        gast::{ContainsDatum as _, Datum, DatumKind, FoldCase, GAstNode as _, List, Module},
        special_forms::SpecialForm,
    },
    lexer::Span,
    runtime::PrimOp,
    world::value::Value,
    Number,
};

/// A whole source text: a sequence of definitions and expressions.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub exps: Vec<Exp>,
}

/// A top-level form.
#[derive(Debug, Clone)]
pub enum Exp {
    Define(DefineExp),
    Expr(CExp),
}

#[derive(Debug, Clone)]
pub struct DefineExp {
    pub var: Spur,
    pub val: CExp,
}

/// Expressions that can appear anywhere, not just at top level.
#[derive(Debug, Clone)]
pub enum CExp {
    Num(Number),
    Bool(bool),
    Str(Rc<str>),
    /// a quoted datum, already converted to the value it denotes
    Lit(Value),
    PrimOp(PrimOp),
    VarRef(Spur),
    If(Box<IfExp>),
    Proc(ProcExp),
    Let(LetExp),
    App(AppExp),
    Set(Box<SetExp>),
}

#[derive(Debug, Clone)]
pub struct IfExp {
    pub test: CExp,
    pub then: CExp,
    pub alt: Option<CExp>,
}

#[derive(Debug, Clone)]
pub struct ProcExp {
    pub params: Rc<[Spur]>,
    pub body: Rc<[CExp]>,
}

#[derive(Debug, Clone)]
pub struct LetExp {
    pub vars: Rc<[Spur]>,
    pub vals: Vec<CExp>,
    pub body: Rc<[CExp]>,
}

#[derive(Debug, Clone)]
pub struct AppExp {
    pub rator: Box<CExp>,
    pub rands: Vec<CExp>,
}

#[derive(Debug, Clone)]
pub struct SetExp {
    pub var: Spur,
    pub val: CExp,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SyntaxErrorKind {
    #[error("empty application (write '() for the empty list)")]
    EmptyApplication,
    #[error("malformed {0} form")]
    MalformedSpecialForm(&'static str),
    #[error("define is only allowed at top level")]
    NestedDefine,
    #[error("`{0}` is bound more than once")]
    DuplicateName(Box<str>),
    #[error("expected a symbol")]
    ExpectedSymbol,
    #[error("dotted lists can only appear quoted")]
    DottedList,
    #[error("unsupported literal")]
    UnsupportedLiteral,
    #[error("`{0}` is reserved and cannot be bound")]
    ReservedName(Box<str>),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{kind}")]
pub struct SyntaxError {
    pub span: Span,
    pub kind: SyntaxErrorKind,
}

impl SyntaxError {
    fn at(datum: &Datum, kind: SyntaxErrorKind) -> Self {
        Self {
            span: datum.span(),
            kind,
        }
    }
}

fn malformed(datum: &Datum, form: SpecialForm) -> SyntaxError {
    SyntaxError::at(datum, SyntaxErrorKind::MalformedSpecialForm(form.keyword()))
}

/// Builds [`Program`]s, interning every variable name into the given [`Rodeo`].
pub struct SyntaxBuilder<'r> {
    rodeo: &'r mut Rodeo,
    fold_default: bool,
    fold_case: FoldCase,
}

impl<'r> SyntaxBuilder<'r> {
    pub fn new(rodeo: &'r mut Rodeo, fold_case: bool) -> Self {
        Self {
            rodeo,
            fold_default: fold_case,
            fold_case: FoldCase::uniform(fold_case),
        }
    }

    pub fn program(&mut self, module: &Module) -> Result<Program, SyntaxError> {
        self.fold_case = FoldCase::new(module, self.fold_default);
        let exps = module
            .datum()
            .map(|datum| self.toplevel(&datum))
            .collect::<Result<_, _>>()?;
        Ok(Program { exps })
    }

    fn toplevel(&mut self, datum: &Datum) -> Result<Exp, SyntaxError> {
        match datum.as_list() {
            Some(list) if list.special_form(&self.fold_case) == Some(SpecialForm::Define) => {
                self.define(datum, &list).map(Exp::Define)
            }
            _ => self.cexp(datum).map(Exp::Expr),
        }
    }

    /// `(define name expr)` or `(define (name params ...) body ...)`
    fn define(&mut self, datum: &Datum, list: &List) -> Result<DefineExp, SyntaxError> {
        if list.has_dot() {
            return Err(SyntaxError::at(datum, SyntaxErrorKind::DottedList));
        }
        let items: Vec<_> = list.datum().collect();
        match &items[..] {
            [_, target, rest @ ..] if target.kind() == Some(DatumKind::List) => {
                let Some(signature) = target.as_list() else {
                    return Err(malformed(datum, SpecialForm::Define));
                };
                if signature.has_dot() {
                    return Err(SyntaxError::at(target, SyntaxErrorKind::DottedList));
                }
                let mut names = signature.datum();
                let Some(name) = names.next() else {
                    return Err(malformed(datum, SpecialForm::Define));
                };
                let var = self.binding(&name)?;
                let params = self.bindings(names)?;
                let body = self.body(rest)?;
                Ok(DefineExp {
                    var,
                    val: CExp::Proc(ProcExp { params, body }),
                })
            }
            [_, name, val] => Ok(DefineExp {
                var: self.binding(name)?,
                val: self.cexp(val)?,
            }),
            _ => Err(malformed(datum, SpecialForm::Define)),
        }
    }

    pub fn cexp(&mut self, datum: &Datum) -> Result<CExp, SyntaxError> {
        let unsupported = || SyntaxError::at(datum, SyntaxErrorKind::UnsupportedLiteral);
        match datum.kind().ok_or_else(unsupported)? {
            DatumKind::Number => datum
                .as_number()
                .and_then(|n| n.number())
                .map(CExp::Num)
                .ok_or_else(unsupported),
            DatumKind::StringToken => datum
                .as_string()
                .and_then(|s| s.string())
                .map(|s| CExp::Str(Rc::from(s)))
                .ok_or_else(unsupported),
            DatumKind::Boolean => datum
                .as_bool()
                .and_then(|b| b.bool())
                .map(CExp::Bool)
                .ok_or_else(unsupported),
            DatumKind::Symbol => {
                let name = self.symbol_name(datum)?;
                if let Some(op) = PrimOp::from_name(&name) {
                    Ok(CExp::PrimOp(op))
                } else if let Some(form) = SpecialForm::from_keyword(&name) {
                    Err(malformed(datum, form))
                } else {
                    Ok(CExp::VarRef(self.rodeo.get_or_intern(name)))
                }
            }
            DatumKind::Quoted => {
                let inner = datum
                    .as_quoted()
                    .and_then(|q| q.quoted())
                    .ok_or_else(|| malformed(datum, SpecialForm::Quote))?;
                self.quote(&inner).map(CExp::Lit)
            }
            DatumKind::List => {
                let list = datum.as_list().ok_or_else(unsupported)?;
                self.compound(datum, &list)
            }
        }
    }

    fn compound(&mut self, datum: &Datum, list: &List) -> Result<CExp, SyntaxError> {
        let form = list.special_form(&self.fold_case);
        if list.has_dot() && form != Some(SpecialForm::Quote) {
            return Err(SyntaxError::at(datum, SyntaxErrorKind::DottedList));
        }
        let items: Vec<_> = list.datum().collect();
        let Some(form) = form else {
            let Some((rator, rands)) = items.split_first() else {
                return Err(SyntaxError::at(datum, SyntaxErrorKind::EmptyApplication));
            };
            return Ok(CExp::App(AppExp {
                rator: Box::new(self.cexp(rator)?),
                rands: rands
                    .iter()
                    .map(|rand| self.cexp(rand))
                    .collect::<Result<_, _>>()?,
            }));
        };

        match (form, &items[..]) {
            (SpecialForm::Quote, [_, quoted]) if !list.has_dot() => self.quote(quoted).map(CExp::Lit),
            (SpecialForm::Define, _) => Err(SyntaxError::at(datum, SyntaxErrorKind::NestedDefine)),
            (SpecialForm::SetBang, [_, name, val]) => Ok(CExp::Set(Box::new(SetExp {
                var: self.binding(name)?,
                val: self.cexp(val)?,
            }))),
            (SpecialForm::If, [_, test, then, alt @ ..]) if alt.len() <= 1 => {
                Ok(CExp::If(Box::new(IfExp {
                    test: self.cexp(test)?,
                    then: self.cexp(then)?,
                    alt: alt.first().map(|alt| self.cexp(alt)).transpose()?,
                })))
            }
            (SpecialForm::Lambda, [_, params, body @ ..]) => {
                let params = params
                    .as_list()
                    .filter(|params| !params.has_dot())
                    .ok_or_else(|| malformed(datum, form))?;
                Ok(CExp::Proc(ProcExp {
                    params: self.bindings(params.datum())?,
                    body: self.body(body)?,
                }))
            }
            (SpecialForm::Let, [_, bindings, body @ ..]) => {
                let bindings = bindings
                    .as_list()
                    .filter(|bindings| !bindings.has_dot())
                    .ok_or_else(|| malformed(datum, form))?;
                let mut names = vec![];
                let mut vals = vec![];
                for binding in bindings.datum() {
                    let pair: Vec<_> = binding
                        .as_list()
                        .filter(|pair| !pair.has_dot())
                        .map(|pair| pair.datum().collect())
                        .unwrap_or_default();
                    let [name, val] = &pair[..] else {
                        return Err(malformed(&binding, form));
                    };
                    names.push(name.clone());
                    vals.push(self.cexp(val)?);
                }
                Ok(CExp::Let(LetExp {
                    vars: self.bindings(names.into_iter())?,
                    vals,
                    body: self.body(body)?,
                }))
            }
            (form, _) => Err(malformed(datum, form)),
        }
    }

    fn body(&mut self, datums: &[Datum]) -> Result<Rc<[CExp]>, SyntaxError> {
        datums.iter().map(|datum| self.cexp(datum)).collect()
    }

    fn symbol_name(&self, datum: &Datum) -> Result<Box<str>, SyntaxError> {
        datum
            .as_symbol()
            .and_then(|sym| sym.identifier_in(&self.fold_case))
            .ok_or_else(|| SyntaxError::at(datum, SyntaxErrorKind::ExpectedSymbol))
    }

    /// A name about to be bound (or assigned to).
    fn binding(&mut self, datum: &Datum) -> Result<Spur, SyntaxError> {
        let name = self.symbol_name(datum)?;
        if PrimOp::from_name(&name).is_some() || SpecialForm::from_keyword(&name).is_some() {
            return Err(SyntaxError::at(datum, SyntaxErrorKind::ReservedName(name)));
        }
        Ok(self.rodeo.get_or_intern(name))
    }

    /// Names bound together in one frame, which must be distinct.
    fn bindings(&mut self, datums: impl Iterator<Item = Datum>) -> Result<Rc<[Spur]>, SyntaxError> {
        let mut seen = HashSet::new();
        let mut vars = vec![];
        for datum in datums {
            let var = self.binding(&datum)?;
            if !seen.insert(var) {
                let name = Box::from(self.rodeo.resolve(&var));
                return Err(SyntaxError::at(&datum, SyntaxErrorKind::DuplicateName(name)));
            }
            vars.push(var);
        }
        Ok(vars.into())
    }

    /// Converts a quoted datum into the value it stands for.
    pub fn quote(&self, datum: &Datum) -> Result<Value, SyntaxError> {
        let unsupported = || SyntaxError::at(datum, SyntaxErrorKind::UnsupportedLiteral);
        match datum.kind().ok_or_else(unsupported)? {
            DatumKind::Number => datum
                .as_number()
                .and_then(|n| n.number())
                .map(Value::Number)
                .ok_or_else(unsupported),
            DatumKind::StringToken => datum
                .as_string()
                .and_then(|s| s.string())
                .map(|s| Value::String(Rc::from(s)))
                .ok_or_else(unsupported),
            DatumKind::Boolean => datum
                .as_bool()
                .and_then(|b| b.bool())
                .map(Value::Bool)
                .ok_or_else(unsupported),
            DatumKind::Symbol => Ok(Value::Symbol(Rc::from(self.symbol_name(datum)?))),
            DatumKind::Quoted => {
                let inner = datum
                    .as_quoted()
                    .and_then(|q| q.quoted())
                    .ok_or_else(unsupported)?;
                Ok(Value::list([
                    Value::Symbol(Rc::from(SpecialForm::Quote.keyword())),
                    self.quote(&inner)?,
                ]))
            }
            DatumKind::List => {
                let list = datum.as_list().ok_or_else(unsupported)?;
                let (items, tail) = list.split_dot();
                let tail = match tail {
                    Some(tail) => self.quote(&tail)?,
                    None => Value::Null,
                };
                items
                    .iter()
                    .rev()
                    .try_fold(tail, |cdr, item| -> Result<_, SyntaxError> {
                        Ok(Value::cons(self.quote(item)?, cdr))
                    })
            }
        }
    }
}
