use cellar::World;
use datatest_stable::Utf8Path;

#[derive(thiserror::Error, Debug)]
#[error("error(s) occured in evaluation datatest at {0}")]
pub struct DatatestError(Box<Utf8Path>);

/// An `.evd` file: the expected outcome (the display form of the final value, or
/// `error: <message>`), a `---` line, then the program. Lines starting with `;`
/// above the separator are comments and survive `DATATEST_EXPECT` rewrites.
struct EvalDatatest<'a> {
    comments: Vec<&'a str>,
    expected: Vec<&'a str>,
    source: String,
}

fn read_datatest(contents: &str) -> EvalDatatest<'_> {
    let mut comments = vec![];
    let mut expected = vec![];
    let mut source_lines = vec![];
    let mut in_source = false;

    for line in contents.lines() {
        if in_source {
            source_lines.push(line);
        } else if line.trim_end() == "---" {
            in_source = true;
        } else if line.trim_start().starts_with(';') {
            comments.push(line);
        } else {
            expected.push(line);
        }
    }

    EvalDatatest {
        comments,
        expected,
        source: source_lines.join("\n"),
    }
}

fn stitch_to_datatest(comments: &[&str], outcome: &str, source: &str) -> String {
    let mut lines = comments.to_vec();
    lines.extend(outcome.lines());
    lines.push("---");
    lines.extend(source.lines());
    let mut file = lines.join("\n");
    file.push('\n');
    file
}

fn outcome(source: &str) -> String {
    let mut world = World::new();
    match world.eval_source(source) {
        Ok(value) => value.to_string(),
        Err(err) => format!("error: {err}"),
    }
}

fn eval_test(path: &Utf8Path, contents: String) -> datatest_stable::Result<()> {
    let test = read_datatest(&contents);
    let got = outcome(&test.source);
    let expected = test.expected.join("\n");

    if std::env::var("DATATEST_EXPECT").is_ok() {
        std::fs::write(path, stitch_to_datatest(&test.comments, &got, &test.source))?;
        Ok(())
    } else if expected.trim() != got.trim() {
        println!(
            "error in {path}: mismatched outcome\n\nGot:\n{}\n\nExpected:\n{}",
            got.trim(),
            expected.trim()
        );
        Err(DatatestError(Box::from(path)))?
    } else {
        Ok(())
    }
}

datatest_stable::harness! {
    eval_test, "test_data", r"^.*\.evd",
}
