pub use logos::Span;
use logos::{Lexer, Logos};

use crate::Number;

fn process_piped_ident(lexer: &mut Lexer<Token>) -> Result<Box<str>, LexerError> {
    let mut built_ident = String::new();

    // Skip the | at the beginning
    let mut chars = lexer.slice().chars().skip(1).peekable();
    while let Some(chr) = chars.next() {
        match chr {
            '\\' => match chars.peek() {
                Some('x' | 'X') => {
                    built_ident.push(read_hex_escape(&mut chars, || {
                        LexerError::MalformedIdentifier
                    })?);
                }
                Some(_) | None => Err(LexerError::MalformedIdentifier)?,
            },
            '|' => break,
            c => built_ident.push(c),
        }
    }

    Ok(Box::from(built_ident.as_str()))
}

// reads hex escapes in the form `x[0-9a-fA-F]+;` and outputs the corresponding character
fn read_hex_escape<F>(
    iter: &mut std::iter::Peekable<impl Iterator<Item = char>>,
    on_malformed: F,
) -> Result<char, LexerError>
where
    F: Fn() -> LexerError,
{
    // consume the x
    let _ = iter.next();

    let mut char_code = 0u32;
    while let Some(c) = iter.peek().copied() {
        if c == ';' {
            break;
        }
        let digit = c.to_digit(16).ok_or_else(&on_malformed)?;
        char_code = char_code
            .checked_mul(16)
            .and_then(|code| code.checked_add(digit))
            .ok_or(LexerError::InvalidCodepoint(u32::MAX))?;
        _ = iter.next();
    }
    if iter.next() != Some(';') {
        return Err(on_malformed());
    }
    char::from_u32(char_code).ok_or(LexerError::InvalidCodepoint(char_code))
}

fn process_string(lexer: &mut Lexer<Token>) -> Result<Box<str>, LexerError> {
    let mut string = String::new();

    let mut chars = lexer.slice().chars().skip(1).peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => break,
            '\\' => match chars.peek().copied() {
                Some('x' | 'X') => {
                    string.push(read_hex_escape(&mut chars, || LexerError::MalformedString)?)
                }
                // line continuation: drop the escape and the surrounding whitespace
                Some(' ' | '\t' | '\r' | '\n') => {
                    while let Some(' ' | '\t' | '\r' | '\n') = chars.peek() {
                        _ = chars.next();
                    }
                }
                Some(escaped) => {
                    string.push(match escaped {
                        'a' => '\x07',
                        'b' => '\x08',
                        't' => '\t',
                        'n' => '\n',
                        'r' => '\r',
                        '"' => '"',
                        '\\' => '\\',
                        _ => return Err(LexerError::MalformedString),
                    });
                    _ = chars.next();
                }
                None => return Err(LexerError::MalformedString),
            },
            c => string.push(c),
        }
    }

    Ok(Box::from(string.as_str()))
}

fn read_integer(lexer: &mut Lexer<Token>) -> Result<Number, LexerError> {
    // the regex only lets digits through, so a failed parse means overflow
    lexer
        .slice()
        .parse::<i64>()
        .map(Number::Integer)
        .map_err(|_| LexerError::NumberTooBig)
}

fn read_real(lexer: &mut Lexer<Token>) -> Result<Number, LexerError> {
    lexer
        .slice()
        .parse::<f64>()
        .map(Number::Real)
        .map_err(|_| LexerError::MalformedNumber)
}

fn read_special_real(lexer: &mut Lexer<Token>) -> Result<Number, LexerError> {
    match lexer.slice().to_ascii_lowercase().as_str() {
        "+inf.0" => Ok(Number::Real(f64::INFINITY)),
        "-inf.0" => Ok(Number::Real(f64::NEG_INFINITY)),
        "+nan.0" | "-nan.0" => Ok(Number::Real(f64::NAN)),
        _ => Err(LexerError::MalformedNumber),
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Default)]
pub enum LexerError {
    #[default]
    #[error("invalid token encountered")]
    Invalid,
    #[error("malformed identifier")]
    MalformedIdentifier,
    #[error("invalid Unicode codepoint: {0}")]
    InvalidCodepoint(u32),
    #[error("invalid directive: {0}")]
    InvalidDirective(Box<str>),
    #[error("malformed string")]
    MalformedString,
    #[error("malformed number")]
    MalformedNumber,
    #[error("number literal too big")]
    NumberTooBig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    FoldCase,
    NoFoldCase,
}

/// Tokens are lexed from some source. Trivia (whitespace, line endings,
/// comments and directives) is kept so the parser can build a lossless tree.
#[derive(Debug, Clone, PartialEq, Logos)]
#[logos(error = LexerError)]
pub enum Token {
    #[regex("[ \t]+")]
    IntralineWhitespace,
    #[token("\n")]
    #[token("\r\n")]
    #[token("\r")]
    LineEnding,
    #[regex(r";[^\r\n]*")]
    Comment,
    #[regex("(?i)#!fold-case", |_| Directive::FoldCase)]
    #[regex("(?i)#!no-fold-case", |_| Directive::NoFoldCase)]
    #[regex(r"(?i)#![a-z0-9\-]+", |l| Err(LexerError::InvalidDirective(Box::from(&l.slice()[2..]))))]
    Directive(Directive),

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("'")]
    Quote,
    #[token(".")]
    Dot,
    #[regex(r#"[a-zA-Z!$%&*/:<=>?^_~][0-9a-zA-Z!$%&*/:<=>?^_~+\-.@]*"#, |l| Box::from(l.slice()))]
    #[regex(r#"\|[^|]*\|"#, process_piped_ident)]
    #[token("+", |l| Box::from(l.slice()))]
    #[token("-", |l| Box::from(l.slice()))]
    #[regex(r"[-+][a-zA-Z!$%&*/:<=>?^_~+\-@][0-9a-zA-Z!$%&*/:<=>?^_~+\-.@]*", |l| Box::from(l.slice()))]
    #[regex(r"[-+]\.[a-zA-Z!$%&*/:<=>?^_~+\-.@][0-9a-zA-Z!$%&*/:<=>?^_~+\-.@]*", |l| Box::from(l.slice()))]
    #[regex(r"\.[a-zA-Z!$%&*/:<=>?^_~+\-.@][0-9a-zA-Z!$%&*/:<=>?^_~+\-.@]*", |l| Box::from(l.slice()))]
    Identifier(Box<str>),
    #[regex("(?i)#t(rue)?", |_| true)]
    #[regex("(?i)#f(alse)?", |_| false)]
    Boolean(bool),
    #[regex(r#""([^\\"]|\\[abntr"\\xX \t\r\n])*""#, process_string)]
    String(Box<str>),
    #[regex(r"[+-]?[0-9]+", read_integer)]
    #[regex(r"[+-]?[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", read_real)]
    #[regex(r"[+-]?\.[0-9]+([eE][+-]?[0-9]+)?", read_real)]
    #[regex(r"[+-]?[0-9]+[eE][+-]?[0-9]+", read_real)]
    #[regex(r"(?i)[+-](inf|nan)\.0", read_special_real)]
    Number(Number),
}

impl Token {
    pub fn lexer(source: &str) -> Lexer<'_, Self> {
        <Self as Logos>::lexer(source)
    }

    /// Tokens that never contribute to a datum
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            Self::IntralineWhitespace | Self::LineEnding | Self::Comment | Self::Directive(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::Number;

    use super::{Directive, LexerError, Token};
    use arbtest::arbtest;
    use assert2::{assert, check, let_assert};

    #[test]
    fn test_identifier_and_piped_identifier() {
        let id1 = r"Hello";
        let id2 = r"|H\x65;llo|";

        assert!(Token::lexer(id1).next() == Token::lexer(id2).next())
    }

    #[test]
    fn identifier_checklist() {
        macro_rules! test_valid {
            ($source:literal) => {{
                let mut lexer = Token::lexer($source);
                let token = lexer.next();
                let_assert!(Some(Ok(Token::Identifier(_))) = token);
                assert!(lexer.slice() == $source);
            }};

            ($source:literal as $target:literal) => {{
                let mut lexer = Token::lexer($source);
                let token = lexer.next();
                let_assert!(Some(Ok(Token::Identifier(s))) = token);
                assert!(s.as_ref() == $target);
            }};
        }

        test_valid!("...");
        test_valid!("<=?");
        test_valid!("+");
        test_valid!("-");
        test_valid!("+soup+");
        test_valid!("->string");
        test_valid!("set!");
        test_valid!("string=?");
        test_valid!("lambda");
        test_valid!("V17a");
        test_valid!("|two words|" as "two words");
        test_valid!(r"|two\x20;words|" as "two words");
    }

    #[test]
    fn test_boolean() {
        check!(Token::lexer("#t").next() == Some(Ok(Token::Boolean(true))));
        check!(Token::lexer("#true").next() == Some(Ok(Token::Boolean(true))));
        check!(Token::lexer("#F").next() == Some(Ok(Token::Boolean(false))));
        check!(Token::lexer("#FaLsE").next() == Some(Ok(Token::Boolean(false))));
    }

    #[test]
    fn test_directive() {
        check!(
            Token::lexer("#!fold-case").next() == Some(Ok(Token::Directive(Directive::FoldCase)))
        );
        check!(Token::lexer("#!NO-FOLD-CASE").next()
            == Some(Ok(Token::Directive(Directive::NoFoldCase))));
        check!(Token::lexer("#!shout").next()
            == Some(Err(LexerError::InvalidDirective(Box::from("shout")))));
    }

    #[test]
    fn test_string() {
        macro_rules! verify_string {
            ($source:literal as $target:literal) => {
                let mut source = String::new();
                source.push('"');
                source.push_str($source);
                source.push('"');
                let token = Token::lexer(&source).next();
                let_assert!(Some(Ok(Token::String(bs))) = token);
                check!(bs.as_ref() == $target);
            };
        }

        verify_string!(r#"apple"# as "apple");
        verify_string!(r#"\xea;\n\"\a"# as "\u{ea}\n\"\u{7}");
        verify_string!("one \\\n    two" as "one two");
    }

    #[test]
    fn test_number() {
        check!(Token::lexer("42").next() == Some(Ok(Token::Number(Number::Integer(42)))));
        check!(Token::lexer("-7").next() == Some(Ok(Token::Number(Number::Integer(-7)))));
        check!(Token::lexer("+7").next() == Some(Ok(Token::Number(Number::Integer(7)))));
        check!(Token::lexer("1.5").next() == Some(Ok(Token::Number(Number::Real(1.5)))));
        check!(Token::lexer(".25").next() == Some(Ok(Token::Number(Number::Real(0.25)))));
        check!(Token::lexer("2e3").next() == Some(Ok(Token::Number(Number::Real(2000.0)))));
        check!(
            Token::lexer("-inf.0").next() == Some(Ok(Token::Number(Number::Real(f64::NEG_INFINITY))))
        );
        check!(Token::lexer("99999999999999999999").next() == Some(Err(LexerError::NumberTooBig)));
    }

    #[test]
    fn test_trivia_is_kept() {
        let tokens: Vec<_> = Token::lexer("(a ; note\n)").map(|t| t.unwrap()).collect();
        check!(
            tokens
                == [
                    Token::LParen,
                    Token::Identifier(Box::from("a")),
                    Token::IntralineWhitespace,
                    Token::Comment,
                    Token::LineEnding,
                    Token::RParen,
                ]
        );
    }

    #[test]
    fn test_number_arbtest_roundtrip() {
        arbtest(|u| {
            let number: Number = u.arbitrary()?;
            let source = number.to_string();
            match number {
                Number::Real(real) if real.is_nan() => {
                    let_assert!(Some(Ok(Token::Number(Number::Real(read)))) = Token::lexer(&source).next());
                    check!(read.is_nan());
                }
                _ => {
                    check!(
                        Token::lexer(&source).next() == Some(Ok(Token::Number(number))),
                        "{number:?} `{source}` does not roundtrip"
                    );
                }
            }
            Ok(())
        });
    }
}
