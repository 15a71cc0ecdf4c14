//! The types of this module make the results of the general parser more
//! accessible by providing a strongly-typed layer on top of the CST produced
//! by the parser.
use icu_casemap::CaseMapper;

use crate::{
    lexer::{Directive, Span, Token},
    Number,
};

/// GAst Syntax Types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[repr(u16)]
pub enum SyntaxKind {
    // Literals
    // (which correspond to lexer tokens)
    /// (
    LPAREN = 0,
    /// )
    RPAREN,
    /// .
    DOT,
    /// '
    QUOTE_SYM,
    /// ; comment
    COMMENT,
    /// #!(no-)?fold-case
    DIRECTIVE,
    /// any kind of inline whitespace
    WHITESPACE,
    /// \r | \n | \r\n
    LINEEND,
    /// a symbol literal (=identifier)
    SYMBOL,
    /// a number literal
    NUMBER,
    /// a string literal
    STRING,
    /// a boolean literal
    BOOLEAN,
    /// anything the lexer or parser could not make sense of
    ERROR,

    // composite nodes
    /// `(+ 2 3)`, `()` or `(a . b)`
    LIST,
    /// ' DATUM
    QUOTED,
    /// wraps any valid datum
    DATUM,
    /// top-level node: a list of s-expressions
    ROOT,
}
use SyntaxKind::*;

const KINDS: [SyntaxKind; ROOT as usize + 1] = [
    LPAREN, RPAREN, DOT, QUOTE_SYM, COMMENT, DIRECTIVE, WHITESPACE, LINEEND, SYMBOL, NUMBER,
    STRING, BOOLEAN, ERROR, LIST, QUOTED, DATUM, ROOT,
];

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CellarLang {}
impl rowan::Language for CellarLang {
    type Kind = SyntaxKind;
    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        KINDS[usize::from(raw.0)]
    }
    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

pub type CellarSyntaxNode = rowan::SyntaxNode<CellarLang>;
pub type CellarSyntaxToken = rowan::SyntaxToken<CellarLang>;
pub type CellarSyntaxElement = rowan::NodeOrToken<CellarSyntaxNode, CellarSyntaxToken>;

/// Anything that is a non-terminal
pub trait GAstNode {
    fn cast(syntax: CellarSyntaxNode) -> Option<Self>
    where
        Self: Sized;

    fn syntax(&self) -> &CellarSyntaxNode;

    /// Byte range of this node in the source
    fn span(&self) -> Span {
        let range = self.syntax().text_range();
        usize::from(range.start())..usize::from(range.end())
    }
}

/// Anything that is a terminal
pub trait GAstToken {
    fn cast(syntax: CellarSyntaxToken) -> Option<Self>
    where
        Self: Sized;

    fn syntax(&self) -> &CellarSyntaxToken;

    /// Byte range of this token in the source
    fn span(&self) -> Span {
        let range = self.syntax().text_range();
        usize::from(range.start())..usize::from(range.end())
    }
}

macro_rules! simple_gast {
    (node $name:ident from $kind:ident) => {
        impl GAstNode for $name {
            fn cast(syntax: CellarSyntaxNode) -> Option<Self>
            where
                Self: Sized,
            {
                (syntax.kind() == $kind).then_some(Self(syntax))
            }

            fn syntax(&self) -> &CellarSyntaxNode {
                &self.0
            }
        }
    };

    (node $name:ident from $kind:ident $with:expr) => {
        impl GAstNode for $name {
            fn cast(syntax: CellarSyntaxNode) -> Option<Self>
            where
                Self: Sized,
            {
                (syntax.kind() == $kind && $with(&syntax)).then_some(Self(syntax))
            }

            fn syntax(&self) -> &CellarSyntaxNode {
                &self.0
            }
        }
    };

    (token $name:ident from $kind:ident) => {
        impl GAstToken for $name {
            fn cast(syntax: CellarSyntaxToken) -> Option<Self>
            where
                Self: Sized,
            {
                (syntax.kind() == $kind).then_some(Self(syntax))
            }

            fn syntax(&self) -> &CellarSyntaxToken {
                &self.0
            }
        }
    };
}

/// Any node that can contain datum
pub trait ContainsDatum {
    fn datum(&self) -> impl Iterator<Item = Datum>;
}

macro_rules! contains_datum {
    ($tyn:ident) => {
        impl ContainsDatum for $tyn {
            fn datum(&self) -> impl Iterator<Item = Datum> {
                self.0.children().filter_map(Datum::cast)
            }
        }
    };
}

/// Root GAst type for a source text
#[derive(Debug, Clone)]
pub struct Module(pub(crate) CellarSyntaxNode);
simple_gast!(node Module from ROOT);
contains_datum!(Module);

/// Whether identifiers fold case at a given point of a source text.
///
/// The last `#!fold-case` or `#!no-fold-case` before a position decides; without
/// one, the default applies. Built with a single pass over the tree.
#[derive(Debug, Clone, Default)]
pub struct FoldCase {
    default: bool,
    // (end of directive, folds) in source order
    switches: Vec<(usize, bool)>,
}

impl FoldCase {
    pub fn uniform(fold: bool) -> Self {
        Self {
            default: fold,
            switches: vec![],
        }
    }

    pub fn new(module: &Module, default: bool) -> Self {
        let switches = module
            .syntax()
            .descendants_with_tokens()
            .filter_map(CellarSyntaxElement::into_token)
            .filter(|tok| tok.kind() == DIRECTIVE)
            .filter_map(|tok| match Token::lexer(tok.text()).next() {
                Some(Ok(Token::Directive(directive))) => Some((
                    usize::from(tok.text_range().end()),
                    directive == Directive::FoldCase,
                )),
                _ => None,
            })
            .collect();
        Self { default, switches }
    }

    pub fn at(&self, offset: usize) -> bool {
        match self.switches.partition_point(|(end, _)| *end <= offset) {
            0 => self.default,
            idx => self.switches[idx - 1].1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatumKind {
    List,
    Quoted,
    Symbol,
    Number,
    StringToken,
    Boolean,
}

#[derive(Debug, Clone)]
pub struct Datum(CellarSyntaxNode);
impl Datum {
    // If this says `Some`, calling the matching as_* must return `Some` too
    pub fn kind(&self) -> Option<DatumKind> {
        match self.0.children_with_tokens().next() {
            None => None,
            Some(CellarSyntaxElement::Node(node)) => match node.kind() {
                LIST => Some(DatumKind::List),
                QUOTED => Some(DatumKind::Quoted),
                _ => None,
            },
            Some(CellarSyntaxElement::Token(tok)) => match tok.kind() {
                SYMBOL => Some(DatumKind::Symbol),
                NUMBER => Some(DatumKind::Number),
                STRING => Some(DatumKind::StringToken),
                BOOLEAN => Some(DatumKind::Boolean),
                _ => None,
            },
        }
    }
}
// *all* validly parsed datum only contain 1 child
simple_gast!(node Datum from DATUM |syntax: &CellarSyntaxNode| {
    syntax.children_with_tokens().count() == 1
});

macro_rules! datum_as_type {
    (node $name:ident for $type:ident from $stype:ident) => {
        impl Datum {
            pub fn $name(&self) -> Option<$type> {
                match self.0.children().next() {
                    Some(node) if node.kind() == $stype => $type::cast(node),
                    _ => None,
                }
            }
        }
    };

    (token $name:ident for $type:ident from $stype:ident) => {
        impl Datum {
            pub fn $name(&self) -> Option<$type> {
                match self.0.children_with_tokens().next() {
                    Some(CellarSyntaxElement::Token(token)) if token.kind() == $stype => {
                        $type::cast(token)
                    }
                    _ => None,
                }
            }
        }
    };
}
datum_as_type!(node as_list for List from LIST);
datum_as_type!(node as_quoted for Quoted from QUOTED);
datum_as_type!(token as_symbol for Symbol from SYMBOL);
datum_as_type!(token as_number for NumberToken from NUMBER);
datum_as_type!(token as_string for StringToken from STRING);
datum_as_type!(token as_bool for Boolean from BOOLEAN);

#[derive(Debug, Clone)]
pub struct List(CellarSyntaxNode);
impl List {
    /// Get the head element
    pub fn head(&self) -> Option<Datum> {
        self.datum().next()
    }

    /// Looks for a dot token within (without checking for valid structure)
    pub fn has_dot(&self) -> bool {
        self.0
            .children_with_tokens()
            .any(|elem| matches!(elem, CellarSyntaxElement::Token(tok) if tok.kind() == DOT))
    }

    /// Splits the elements around the dot: everything before it, and the single
    /// datum after it (if the list is dotted at all).
    pub fn split_dot(&self) -> (Vec<Datum>, Option<Datum>) {
        let mut before = vec![];
        let mut after = None;
        let mut seen_dot = false;
        for elem in self.0.children_with_tokens() {
            match elem {
                CellarSyntaxElement::Token(tok) if tok.kind() == DOT => seen_dot = true,
                CellarSyntaxElement::Node(node) => {
                    if let Some(datum) = Datum::cast(node) {
                        if seen_dot {
                            after = Some(datum);
                        } else {
                            before.push(datum);
                        }
                    }
                }
                CellarSyntaxElement::Token(_) => {}
            }
        }
        (before, after)
    }
}
simple_gast!(node List from LIST);
contains_datum!(List);

#[derive(Debug, Clone)]
pub struct Quoted(CellarSyntaxNode);
impl Quoted {
    /// The datum under the quote; `None` only for erroneous trees
    pub fn quoted(&self) -> Option<Datum> {
        self.datum().next()
    }
}
simple_gast!(node Quoted from QUOTED);
contains_datum!(Quoted);

#[derive(Debug, Clone)]
pub struct Symbol(CellarSyntaxToken);
impl Symbol {
    /// returns the identifier, case-folded if asked to
    pub fn identifier(&self, fold: bool) -> Option<Box<str>> {
        let Some(Ok(Token::Identifier(id))) = Token::lexer(self.0.text()).next() else {
            return None;
        };
        if fold {
            Some(Box::from(CaseMapper::new().fold_string(&id).as_str()))
        } else {
            Some(id)
        }
    }

    /// returns the identifier, folded according to the directives in effect where it appears
    pub fn identifier_in(&self, fold_case: &FoldCase) -> Option<Box<str>> {
        self.identifier(fold_case.at(self.span().start))
    }
}
simple_gast!(token Symbol from SYMBOL);

macro_rules! simple_extract {
    ($ty:ident::$name:ident from $tok:ident as $type:ty) => {
        impl $ty {
            pub fn $name(&self) -> Option<$type> {
                if let Some(Ok(Token::$tok(val))) = Token::lexer(self.0.text()).next() {
                    Some(val)
                } else {
                    None
                }
            }
        }
    };
}

#[derive(Debug, Clone)]
pub struct NumberToken(CellarSyntaxToken);
simple_gast!(token NumberToken from NUMBER);
simple_extract!(NumberToken::number from Number as Number);

#[derive(Debug, Clone)]
pub struct StringToken(CellarSyntaxToken);
simple_gast!(token StringToken from STRING);
simple_extract!(StringToken::string from String as Box<str>);

#[derive(Debug, Clone)]
pub struct Boolean(CellarSyntaxToken);
simple_gast!(token Boolean from BOOLEAN);
simple_extract!(Boolean::bool from Boolean as bool);
