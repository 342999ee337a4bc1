//! Editing scripts: one step per line, `#` starts a comment.
//!
//! ```text
//! caret 0 1          # block 0, offset 1
//! select 0 1 1 2     # anchor then focus
//! type hello
//! key ctrl+z
//! command setBlockType h2; setText color red
//! print
//! ```

use std::io::Write;

use miette::Diagnostic;
use scrivet_core::{Editor, EditorError, KeyCombo, TextPosition, UndoManager};
use thiserror::Error;

/// One scripted action.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Caret(TextPosition),
    Select(TextPosition, TextPosition),
    SelectAll,
    Type(String),
    Key(KeyCombo),
    Command(String),
    Paste(String),
    Cut,
    Copy,
    Undo,
    Redo,
    /// Write the content markup.
    Print,
    /// Write the markup with markers and selection classes.
    Snapshot,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ScriptError {
    #[error("line {line}: unknown step {step:?}")]
    #[diagnostic(
        code(scrivet::script::unknown_step),
        help("steps are caret, select, all, type, key, command, paste, cut, copy, undo, redo, print and snapshot")
    )]
    UnknownStep { line: usize, step: String },

    #[error("line {line}: {reason}")]
    #[diagnostic(code(scrivet::script::arguments))]
    Arguments { line: usize, reason: String },

    #[error("line {line}: step failed")]
    #[diagnostic(code(scrivet::script::step))]
    Step {
        line: usize,
        #[source]
        source: EditorError,
    },

    #[error("io error: {0}")]
    #[diagnostic(code(scrivet::script::io))]
    Io(#[from] std::io::Error),
}

fn positions(line: usize, args: &str, count: usize) -> Result<Vec<TextPosition>, ScriptError> {
    let numbers = args
        .split_whitespace()
        .map(str::parse::<usize>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ScriptError::Arguments {
            line,
            reason: format!("expected numbers: {err}"),
        })?;
    if numbers.len() != count * 2 {
        return Err(ScriptError::Arguments {
            line,
            reason: format!("expected {} numbers, got {}", count * 2, numbers.len()),
        });
    }
    Ok(numbers
        .chunks(2)
        .map(|pair| TextPosition::new(pair[0], pair[1]))
        .collect())
}

fn parse_line(line: usize, text: &str) -> Result<Option<Step>, ScriptError> {
    let text = text.trim_start();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }
    let (name, rest) = text.split_once(' ').unwrap_or((text, ""));
    let rest = rest.trim_end_matches(['\r', '\n']);
    let args = rest.trim();
    let needs_args = |step: Step| {
        if args.is_empty() {
            Err(ScriptError::Arguments {
                line,
                reason: format!("{name} needs an argument"),
            })
        } else {
            Ok(step)
        }
    };

    let step = match name {
        "caret" => Step::Caret(positions(line, args, 1)?[0]),
        "select" => {
            let ends = positions(line, args, 2)?;
            Step::Select(ends[0], ends[1])
        }
        "all" => Step::SelectAll,
        // Typed and pasted text keeps its inner spacing.
        "type" => needs_args(Step::Type(rest.to_string()))?,
        "paste" => needs_args(Step::Paste(rest.replace("\\n", "\n")))?,
        "key" => Step::Key(args.parse().map_err(|err: EditorError| ScriptError::Arguments {
            line,
            reason: err.to_string(),
        })?),
        "command" => needs_args(Step::Command(args.to_string()))?,
        "cut" => Step::Cut,
        "copy" => Step::Copy,
        "undo" => Step::Undo,
        "redo" => Step::Redo,
        "print" => Step::Print,
        "snapshot" => Step::Snapshot,
        other => {
            return Err(ScriptError::UnknownStep {
                line,
                step: other.to_string(),
            });
        }
    };
    Ok(Some(step))
}

/// Parse a script. Line numbers in errors are 1-based.
pub fn parse(src: &str) -> Result<Vec<(usize, Step)>, ScriptError> {
    let mut steps = Vec::new();
    for (idx, text) in src.lines().enumerate() {
        if let Some(step) = parse_line(idx + 1, text)? {
            steps.push((idx + 1, step));
        }
    }
    Ok(steps)
}

fn apply(editor: &mut Editor, step: &Step, out: &mut impl Write) -> Result<(), ScriptError> {
    match step {
        Step::Caret(pos) => editor.set_caret(*pos).map_err(wrap)?,
        Step::Select(anchor, focus) => editor.select(*anchor, *focus).map_err(wrap)?,
        Step::SelectAll => editor.select_all().map_err(wrap)?,
        Step::Type(text) => editor.insert_text(text).map(drop).map_err(wrap)?,
        Step::Key(combo) => {
            let result = editor.keydown(combo);
            tracing::debug!(%combo, ?result, "key");
        }
        Step::Command(src) => {
            let ran = editor.do_command(src);
            tracing::debug!(command = %src, ran, "command");
        }
        Step::Paste(text) => editor.paste_text(text).map(drop).map_err(wrap)?,
        Step::Cut => {
            let text = editor.cut_text().map_err(wrap)?;
            writeln!(out, "{text}")?;
        }
        Step::Copy => writeln!(out, "{}", editor.copy_text())?,
        Step::Undo => {
            editor.undo();
        }
        Step::Redo => {
            editor.redo();
        }
        Step::Print => writeln!(out, "{}", editor.content_markup())?,
        Step::Snapshot => writeln!(out, "{}", editor.markup())?,
    }
    Ok(())
}

/// Placeholder line; `run` fills in the real one.
fn wrap(source: EditorError) -> ScriptError {
    ScriptError::Step { line: 0, source }
}

/// Run every step in order, stopping at the first failure.
pub fn run(
    editor: &mut Editor,
    steps: &[(usize, Step)],
    out: &mut impl Write,
) -> Result<(), ScriptError> {
    for (line, step) in steps {
        apply(editor, step, out).map_err(|err| match err {
            ScriptError::Step { source, .. } => ScriptError::Step {
                line: *line,
                source,
            },
            other => other,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrivet_core::{EditorConfig, Key, Modifiers};

    fn replay(markup: &str, script: &str) -> String {
        let mut editor = Editor::from_markup(markup, EditorConfig::default()).unwrap();
        let steps = parse(script).unwrap();
        let mut out = Vec::new();
        run(&mut editor, &steps, &mut out).unwrap();
        String::from_utf8(out).unwrap().trim_end().to_string()
    }

    #[test]
    fn test_parse_steps() {
        let steps = parse("# setup\n\ncaret 0 1\nselect 0 1 1 2\ntype  two words\nkey ctrl+z\n").unwrap();
        assert_eq!(
            steps,
            vec![
                (3, Step::Caret(TextPosition::new(0, 1))),
                (4, Step::Select(TextPosition::new(0, 1), TextPosition::new(1, 2))),
                (5, Step::Type(" two words".to_string())),
                (
                    6,
                    Step::Key(KeyCombo::with_modifiers(Key::character("z"), Modifiers::CTRL))
                ),
            ]
        );
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        assert!(matches!(
            parse("print\nfrobnicate"),
            Err(ScriptError::UnknownStep { line: 2, .. })
        ));
        assert!(matches!(
            parse("caret 0"),
            Err(ScriptError::Arguments { line: 1, .. })
        ));
        assert!(matches!(
            parse("\nkey ctrl+nope"),
            Err(ScriptError::Arguments { line: 2, .. })
        ));
        assert!(matches!(parse("type"), Err(ScriptError::Arguments { line: 1, .. })));
    }

    #[test]
    fn test_type_at_caret() {
        insta::assert_snapshot!(replay("<p>ab</p>", "caret 0 1\ntype X\nprint"), @"<p>aXb</p>");
    }

    #[test]
    fn test_delete_undo_redo() {
        let out = replay(
            "<p>ab</p><p>cd</p>",
            "select 0 1 1 1\nkey delete\nprint\nundo\nprint\nredo\nprint",
        );
        insta::assert_snapshot!(out, @r"
        <p>ad</p>
        <p>ab</p><p>cd</p>
        <p>ad</p>
        ");
    }

    #[test]
    fn test_enter_then_type() {
        insta::assert_snapshot!(
            replay("<p>abc</p>", "caret 0 1\nkey enter\ntype Z\nprint"),
            @"<p>a</p><p>Zbc</p>"
        );
    }

    #[test]
    fn test_copy_and_commands() {
        let out = replay(
            "<p>abc</p>",
            "select 0 0 0 2\ncopy\ncommand setBlockType h2; bogus\nprint",
        );
        insta::assert_snapshot!(out, @r"
        ab
        <h2>abc</h2>
        ");
    }

    #[test]
    fn test_failed_step_reports_its_line() {
        let mut editor = Editor::from_markup("<p>ab</p>", EditorConfig::default()).unwrap();
        let steps = parse("print\ncaret 5 0").unwrap();
        let mut out = Vec::new();
        let err = run(&mut editor, &steps, &mut out).unwrap_err();
        assert!(matches!(err, ScriptError::Step { line: 2, .. }));
        assert_eq!(String::from_utf8(out).unwrap(), "<p>ab</p>\n");
    }
}
