use std::{path::PathBuf, sync::Once};

use anyhow::Context as _;
use cellar::{
    lexer::{LexerError, Span, Token},
    value::Value,
    Error, RedefinePolicy, World, WorldOptions,
};
use clap::Parser;
use codesnake::{Block, CodeWidth, Label, LineIndex};
use rustyline::error::ReadlineError;
use yansi::Paint;

/// Evaluate cellar programs interactively.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// A program to run before the prompt opens.
    file: Option<PathBuf>,

    /// Show the tokens of every line instead of evaluating it.
    #[arg(long)]
    tokens: bool,

    /// Keep the first definition of a global name instead of the latest one.
    #[arg(long)]
    first_wins: bool,

    /// Fold identifiers to lower case.
    #[arg(long)]
    fold_case: bool,

    /// Exit after running FILE.
    #[arg(long, requires = "file")]
    no_repl: bool,
}

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

fn token_block<'a>(
    idx: &'a LineIndex,
    labels: impl IntoIterator<Item = (Span, Result<Token, LexerError>)>,
) -> Option<Block<&'a str, String>> {
    Block::new(
        idx,
        labels.into_iter().map(|(range, tok)| {
            let text = match &tok {
                Ok(tok) => format!("{tok:?}"),
                Err(err) => err.to_string(),
            };
            Label::new(range)
                .with_text(if tok.is_ok() {
                    text.green().to_string()
                } else {
                    text.red().to_string()
                })
                .with_style(move |s| match tok {
                    Ok(Token::Identifier(_)) => s.blue().to_string(),
                    Ok(Token::Number(_)) => s.yellow().to_string(),
                    Ok(Token::String(_)) => s.cyan().to_string(),
                    Ok(_) => s,
                    Err(_) => s.red().to_string(),
                })
        }),
    )
}

fn error_block<'a>(idx: &'a LineIndex, labels: Vec<(Span, String)>) -> Option<Block<&'a str, String>> {
    Block::new(
        idx,
        labels.into_iter().map(|(range, text)| {
            Label::new(range)
                .with_text(text.red().to_string())
                .with_style(|s| s.red().to_string())
        }),
    )
}

fn print_block(name: &str, block: Block<&str, String>) {
    let block = block.map_code(|c| CodeWidth::new(c, c.len()));
    println!("{}[{name}]", block.prologue());
    print!("{block}");
    println!("{}", block.epilogue());
}

fn show_tokens(src: &str) {
    let idx = LineIndex::new(src);

    let mut blocks = vec![];
    let mut line_labels = vec![];
    for (token, span) in Token::lexer(src).spanned() {
        match token {
            Ok(Token::LineEnding) => blocks.push(token_block(&idx, line_labels.drain(..))),
            tok => line_labels.push((span, tok)),
        }
    }
    if !line_labels.is_empty() {
        blocks.push(token_block(&idx, line_labels.drain(..)));
    }

    for block in blocks.into_iter().flatten() {
        print_block("tokens", block);
    }
}

/// Labels must be ordered, disjoint and non-empty to be drawn.
fn drawable(src: &str, mut labels: Vec<(Span, String)>) -> Vec<(Span, String)> {
    labels.sort_by_key(|(span, _)| span.start);
    let mut end = 0;
    labels
        .into_iter()
        .filter_map(|(span, text)| {
            let span = if span.is_empty() {
                span.start.checked_sub(1)?..span.end
            } else {
                span
            };
            (span.start >= end && span.end <= src.len()).then(|| {
                end = span.end;
                (span, text)
            })
        })
        .collect()
}

fn report(name: &str, src: &str, error: &Error) {
    let labels = match error {
        Error::Parse(errors) => errors
            .iter()
            .map(|err| (err.span.clone(), err.to_string()))
            .collect(),
        Error::Syntax(err) => vec![(err.span.clone(), err.to_string())],
        Error::Eval(_) => vec![],
    };
    println!("{}", format!("error: {error}").red());

    let idx = LineIndex::new(src);
    if let Some(block) = error_block(&idx, drawable(src, labels)) {
        print_block(name, block);
    }
}

/// Runs every top-level form of `src`, echoing values as it goes.
fn run(world: &mut World, name: &str, src: &str) {
    let program = match world.parse(src) {
        Ok(program) => program,
        Err(err) => return report(name, src, &err),
    };
    for exp in &program.exps {
        match world.eval_toplevel(exp) {
            Ok(Value::Void) => {}
            Ok(value) => println!("{value}"),
            Err(err) => return report(name, src, &Error::Eval(err)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut world = World::with_options(WorldOptions {
        redefine: if args.first_wins {
            RedefinePolicy::FirstWins
        } else {
            RedefinePolicy::LatestWins
        },
        fold_case: args.fold_case,
    });

    if let Some(path) = &args.file {
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?;
        tracing::debug!(path = %path.display(), "running file");
        run(&mut world, &path.display().to_string(), &src);
        if args.no_repl {
            return Ok(());
        }
    }

    let mut readline = rustyline::DefaultEditor::new()?;
    loop {
        match readline.readline(">> ") {
            Ok(input) => {
                readline.add_history_entry(input.as_str())?;
                if args.tokens {
                    show_tokens(&input);
                } else {
                    run(&mut world, "repl", &input);
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
