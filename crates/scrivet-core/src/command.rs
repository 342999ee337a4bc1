//! The string command protocol used by toolbars and shortcuts.
//!
//! A command string holds one or more commands separated by `;`. Each
//! command is a name followed by whitespace-separated arguments:
//!
//! ```text
//! setText font-weight bold; setBlocks text-align center
//! setBlockType h2
//! updateUndo undo
//! annotate footnote
//! ```
//!
//! Style values cannot contain spaces, so `+` stands for one.

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::error::{EditorError, Result};
use crate::history::UndoAction;

/// A style declaration list, `(property, value)` pairs.
pub type Declarations = Vec<(SmolStr, String)>;

/// A parsed editor command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace the tag of every selected block.
    SetBlockType(SmolStr),
    /// Style every selected block.
    SetBlocks(Declarations),
    /// Style the selected text.
    SetText(Declarations),
    /// Drive the undo history.
    UpdateUndo(UndoAction),
    /// Insert an annotation of the given kind after the caret.
    Annotate(SmolStr),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetBlockType(_) => "setBlockType",
            Self::SetBlocks(_) => "setBlocks",
            Self::SetText(_) => "setText",
            Self::UpdateUndo(_) => "updateUndo",
            Self::Annotate(_) => "annotate",
        }
    }
}

fn malformed(command: &str, reason: impl Into<String>) -> EditorError {
    EditorError::MalformedArguments {
        command: command.into(),
        reason: reason.into(),
    }
}

fn declarations(command: &str, args: &[&str]) -> Result<Declarations> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(malformed(
            command,
            format!("expected property/value pairs, got {} arguments", args.len()),
        ));
    }
    Ok(args
        .chunks(2)
        .map(|pair| (SmolStr::from(pair[0]), pair[1].replace('+', " ")))
        .collect())
}

fn single<'a>(command: &str, args: &[&'a str]) -> Result<&'a str> {
    match args {
        [arg] => Ok(*arg),
        _ => Err(malformed(
            command,
            format!("expected one argument, got {}", args.len()),
        )),
    }
}

impl FromStr for Command {
    type Err = EditorError;

    /// Parse a single command (no `;`).
    fn from_str(s: &str) -> Result<Self> {
        let mut words = s.split_whitespace();
        let Some(name) = words.next() else {
            return Err(EditorError::UnknownCommand(SmolStr::default()));
        };
        let args: Vec<&str> = words.collect();
        let command = match name {
            "setBlockType" => Self::SetBlockType(single(name, &args)?.into()),
            "setBlocks" => Self::SetBlocks(declarations(name, &args)?),
            "setText" => Self::SetText(declarations(name, &args)?),
            "updateUndo" => {
                let action = match single(name, &args)? {
                    "init" => UndoAction::Init,
                    "new" => UndoAction::New,
                    "undo" => UndoAction::Undo,
                    "redo" => UndoAction::Redo,
                    "coalesce" => UndoAction::Coalesce,
                    other => return Err(malformed(name, format!("unknown undo action {other:?}"))),
                };
                Self::UpdateUndo(action)
            }
            "annotate" => Self::Annotate(single(name, &args)?.into()),
            other => return Err(EditorError::UnknownCommand(other.into())),
        };
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        match self {
            Self::SetBlockType(arg) | Self::Annotate(arg) => write!(f, " {arg}"),
            Self::SetBlocks(decls) | Self::SetText(decls) => {
                for (property, value) in decls {
                    write!(f, " {property} {}", value.replace(' ', "+"))?;
                }
                Ok(())
            }
            Self::UpdateUndo(action) => {
                let word = match action {
                    UndoAction::Init => "init",
                    UndoAction::New => "new",
                    UndoAction::Undo => "undo",
                    UndoAction::Redo => "redo",
                    UndoAction::Coalesce => "coalesce",
                };
                write!(f, " {word}")
            }
        }
    }
}

/// Split a command string and parse each part. Empty parts are skipped;
/// a bad part does not prevent the others from parsing.
pub fn parse_commands(src: &str) -> Vec<Result<Command>> {
    src.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sequence() {
        let parsed = parse_commands("setText font-weight bold;  setBlocks text-align center; ;updateUndo undo");
        let commands: Vec<Command> = parsed.into_iter().map(|c| c.unwrap()).collect();
        assert_eq!(
            commands,
            vec![
                Command::SetText(vec![("font-weight".into(), "bold".into())]),
                Command::SetBlocks(vec![("text-align".into(), "center".into())]),
                Command::UpdateUndo(UndoAction::Undo),
            ]
        );
    }

    #[test]
    fn test_plus_means_space() {
        let cmd: Command = "setText font-family Times+New+Roman color red".parse().unwrap();
        assert_eq!(
            cmd,
            Command::SetText(vec![
                ("font-family".into(), "Times New Roman".into()),
                ("color".into(), "red".into()),
            ])
        );
        assert_eq!(cmd.to_string(), "setText font-family Times+New+Roman color red");
    }

    #[test]
    fn test_bad_commands_do_not_stop_the_rest() {
        let parsed = parse_commands("frobnicate; setText color; setBlockType h2");
        assert_eq!(parsed.len(), 3);
        assert_eq!(
            parsed[0],
            Err(EditorError::UnknownCommand("frobnicate".into()))
        );
        assert!(matches!(
            parsed[1],
            Err(EditorError::MalformedArguments { .. })
        ));
        assert_eq!(parsed[2], Ok(Command::SetBlockType("h2".into())));
    }

    #[test]
    fn test_argument_counts() {
        assert!("setBlockType".parse::<Command>().is_err());
        assert!("setBlockType h1 h2".parse::<Command>().is_err());
        assert!("annotate".parse::<Command>().is_err());
        assert!("updateUndo sideways".parse::<Command>().is_err());
        assert_eq!(
            "annotate footnote".parse::<Command>().unwrap(),
            Command::Annotate("footnote".into())
        );
    }
}
