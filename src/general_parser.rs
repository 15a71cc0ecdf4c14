//! General parsing starts where the lexer dropped off, and handles nested syntax, while
//! also forming a GAst which is a relatively simple layer on top of a [`rowan`] CST.
//!
//! The parser never gives up: every byte of the source ends up in the tree, and
//! problems are collected as [`ParseError`]s next to it.
use rowan::{GreenNode, GreenNodeBuilder};

use crate::lexer::{LexerError, Span, Token};

pub mod gast;
pub mod special_forms;

use gast::{CellarSyntaxNode, Module, SyntaxKind, SyntaxKind::*};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    #[error("unexpected `)`")]
    UnexpectedCloseParen,
    #[error("list is never closed")]
    UnclosedList,
    #[error("quote is not followed by a datum")]
    DanglingQuote,
    #[error("`.` must be followed by exactly one datum and preceded by at least one")]
    MisplacedDot,
    #[error(transparent)]
    Lexer(#[from] LexerError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{kind}")]
pub struct ParseError {
    pub span: Span,
    pub kind: ParseErrorKind,
}

/// The result of a general parse: a lossless tree and the errors found while building it.
#[derive(Debug, Clone)]
pub struct GAst {
    green: GreenNode,
    errors: Vec<ParseError>,
}

impl GAst {
    pub fn syntax(&self) -> CellarSyntaxNode {
        CellarSyntaxNode::new_root(self.green.clone())
    }

    pub fn module(&self) -> Module {
        // the parser always opens the tree with a ROOT node
        Module(self.syntax())
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn general_parse(source: &str) -> GAst {
    let tokens = Token::lexer(source)
        .spanned()
        .map(|(token, span)| (token, span.clone(), &source[span]))
        .collect();
    Parser {
        tokens,
        pos: 0,
        builder: GreenNodeBuilder::new(),
        errors: vec![],
    }
    .parse()
}

struct Parser<'src> {
    tokens: Vec<(Result<Token, LexerError>, Span, &'src str)>,
    pos: usize,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<ParseError>,
}

fn token_kind(token: &Token) -> SyntaxKind {
    match token {
        Token::IntralineWhitespace => WHITESPACE,
        Token::LineEnding => LINEEND,
        Token::Comment => COMMENT,
        Token::Directive(_) => DIRECTIVE,
        Token::LParen => LPAREN,
        Token::RParen => RPAREN,
        Token::Quote => QUOTE_SYM,
        Token::Dot => DOT,
        Token::Identifier(_) => SYMBOL,
        Token::Boolean(_) => BOOLEAN,
        Token::String(_) => STRING,
        Token::Number(_) => NUMBER,
    }
}

impl<'src> Parser<'src> {
    fn parse(mut self) -> GAst {
        self.builder.start_node(ROOT.into());
        while let Some(token) = self.peek() {
            match token {
                Ok(Token::RParen) => {
                    self.error_here(ParseErrorKind::UnexpectedCloseParen);
                    self.bump_as(ERROR);
                }
                Ok(Token::Dot) => {
                    self.error_here(ParseErrorKind::MisplacedDot);
                    self.bump_as(ERROR);
                }
                Ok(token) if token.is_trivia() => self.bump(),
                _ => self.datum(),
            }
        }
        self.builder.finish_node();

        GAst {
            green: self.builder.finish(),
            errors: self.errors,
        }
    }

    fn peek(&self) -> Option<&Result<Token, LexerError>> {
        self.tokens.get(self.pos).map(|(token, _, _)| token)
    }

    fn span_here(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some((_, span, _)) => span.clone(),
            None => {
                let end = self.tokens.last().map_or(0, |(_, span, _)| span.end);
                end..end
            }
        }
    }

    fn error_here(&mut self, kind: ParseErrorKind) {
        let span = self.span_here();
        self.errors.push(ParseError { span, kind });
    }

    fn bump(&mut self) {
        let kind = match self.peek() {
            Some(Ok(token)) => token_kind(token),
            Some(Err(_)) => ERROR,
            None => return,
        };
        self.bump_as(kind);
    }

    fn bump_as(&mut self, kind: SyntaxKind) {
        if let Some((_, _, text)) = self.tokens.get(self.pos) {
            self.builder.token(kind.into(), text);
            self.pos += 1;
        }
    }

    fn eat_trivia(&mut self) {
        while let Some(Ok(token)) = self.peek() {
            if !token.is_trivia() {
                break;
            }
            self.bump();
        }
    }

    /// Parses exactly one datum (or records why one could not be parsed).
    fn datum(&mut self) {
        match self.peek() {
            Some(Err(err)) => {
                let err = err.clone();
                self.error_here(err.into());
                self.bump_as(ERROR);
            }
            Some(Ok(Token::LParen)) => {
                self.builder.start_node(DATUM.into());
                self.list();
                self.builder.finish_node();
            }
            Some(Ok(Token::Quote)) => {
                self.builder.start_node(DATUM.into());
                self.quoted();
                self.builder.finish_node();
            }
            Some(Ok(
                Token::Identifier(_) | Token::Boolean(_) | Token::String(_) | Token::Number(_),
            )) => {
                self.builder.start_node(DATUM.into());
                self.bump();
                self.builder.finish_node();
            }
            // callers only hand us datum starts
            _ => self.bump(),
        }
    }

    fn list(&mut self) {
        let open = self.span_here();
        self.builder.start_node(LIST.into());
        self.bump_as(LPAREN);

        let mut before_dot = 0usize;
        let mut after_dot = 0usize;
        let mut dot_span = None::<Span>;
        loop {
            self.eat_trivia();
            match self.peek() {
                None => {
                    self.errors.push(ParseError {
                        span: open,
                        kind: ParseErrorKind::UnclosedList,
                    });
                    break;
                }
                Some(Ok(Token::RParen)) => {
                    self.bump_as(RPAREN);
                    break;
                }
                Some(Ok(Token::Dot)) => {
                    if dot_span.is_some() {
                        self.error_here(ParseErrorKind::MisplacedDot);
                        self.bump_as(ERROR);
                    } else {
                        dot_span = Some(self.span_here());
                        self.bump_as(DOT);
                    }
                }
                Some(Err(_)) => self.datum(),
                Some(Ok(_)) => {
                    self.datum();
                    if dot_span.is_some() {
                        after_dot += 1;
                    } else {
                        before_dot += 1;
                    }
                }
            }
        }

        if let Some(span) = dot_span {
            if before_dot == 0 || after_dot != 1 {
                self.errors.push(ParseError {
                    span,
                    kind: ParseErrorKind::MisplacedDot,
                });
            }
        }
        self.builder.finish_node();
    }

    fn quoted(&mut self) {
        self.builder.start_node(QUOTED.into());
        self.bump_as(QUOTE_SYM);
        self.eat_trivia();
        match self.peek() {
            Some(Ok(Token::RParen | Token::Dot)) | None => {
                self.error_here(ParseErrorKind::DanglingQuote);
            }
            Some(_) => self.datum(),
        }
        self.builder.finish_node();
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::{general_parse, gast::ContainsDatum as _, ParseErrorKind};
    use crate::{lexer::LexerError, DatumKind};

    #[test]
    fn lossless_tree() {
        let source = "(define x 1) ; one\n'(a . b)";
        let gast = general_parse(source);
        check!(gast.is_ok());
        check!(gast.syntax().text().to_string() == source);
        let kinds: Vec<_> = gast.module().datum().filter_map(|d| d.kind()).collect();
        check!(kinds == [DatumKind::List, DatumKind::Quoted]);
    }

    #[test]
    fn unbalanced_parens() {
        let gast = general_parse("(+ 1 2");
        let_assert!([err] = gast.errors());
        check!(err.kind == ParseErrorKind::UnclosedList);
        check!(err.span == (0..1));

        let gast = general_parse("1)");
        let_assert!([err] = gast.errors());
        check!(err.kind == ParseErrorKind::UnexpectedCloseParen);
        check!(err.span == (1..2));
    }

    #[test]
    fn dot_placement() {
        check!(general_parse("(a . b)").is_ok());
        check!(general_parse("(a b . c)").is_ok());
        let gast = general_parse("(. b)");
        let_assert!([err] = gast.errors());
        check!(err.kind == ParseErrorKind::MisplacedDot);
        let gast = general_parse("(a . b c)");
        let_assert!([err] = gast.errors());
        check!(err.kind == ParseErrorKind::MisplacedDot);
    }

    #[test]
    fn quote_needs_datum() {
        let gast = general_parse("(')");
        let_assert!([err] = gast.errors());
        check!(err.kind == ParseErrorKind::DanglingQuote);
    }

    #[test]
    fn lexer_errors_are_collected() {
        let gast = general_parse("(a \"unterminated)");
        check!(gast
            .errors()
            .iter()
            .any(|e| e.kind == ParseErrorKind::Lexer(LexerError::Invalid)));
    }
}
