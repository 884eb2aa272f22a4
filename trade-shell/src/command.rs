// Line-oriented command grammar for the interactive shell

use std::fmt;

pub const ADD_USAGE: &str = r#"add [station] --name "name""#;
pub const LIST_USAGE: &str =
    "list [commodities|entities|businesses|producers|stations|stockpile|active trades]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Help,
    Init,
    Start,
    Pause,
    List(ListTarget),
    AddStation { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListTarget {
    Commodities,
    Entities,
    Businesses,
    Producers,
    Stations,
    Stockpile,
    ActiveTrades,
}

impl fmt::Display for ListTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListTarget::Commodities => "commodities",
            ListTarget::Entities => "entities",
            ListTarget::Businesses => "businesses",
            ListTarget::Producers => "producers",
            ListTarget::Stations => "stations",
            ListTarget::Stockpile => "stockpile",
            ListTarget::ActiveTrades => "active trades",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown command")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("unterminated quote")]
    UnterminatedQuote,
}

pub const HELP: &str = "\
Commands:
  exit                     leave the shell
  help                     show this message
  init                     initialize example world
  start                    start the simulation
  pause                    pause the simulation
  list <what>              commodities, entities, businesses, producers,
                           stations, stockpile, active trades
  add station --name NAME  add a station";

/// Parse one input line. Blank lines parse to `None`.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let words = tokenize(line)?;
    let Some((head, rest)) = words.split_first() else {
        return Ok(None);
    };

    let command = match (head.as_str(), rest) {
        ("exit" | "quit", []) => Command::Exit,
        ("help", []) => Command::Help,
        ("init", []) => Command::Init,
        ("start", []) => Command::Start,
        ("pause", []) => Command::Pause,
        ("list", rest) => Command::List(list_target(rest)?),
        ("add", rest) => add_station(rest)?,
        _ => return Err(ParseError::Unknown(line.trim().to_string())),
    };
    Ok(Some(command))
}

fn list_target(words: &[String]) -> Result<ListTarget, ParseError> {
    let words: Vec<&str> = words.iter().map(String::as_str).collect();
    let target = match words.as_slice() {
        ["commodities"] => ListTarget::Commodities,
        ["entities"] => ListTarget::Entities,
        ["businesses"] => ListTarget::Businesses,
        ["producers"] => ListTarget::Producers,
        ["stations"] => ListTarget::Stations,
        ["stockpile"] => ListTarget::Stockpile,
        ["active", "trades"] => ListTarget::ActiveTrades,
        _ => return Err(ParseError::Usage(LIST_USAGE)),
    };
    Ok(target)
}

fn add_station(words: &[String]) -> Result<Command, ParseError> {
    let words: Vec<&str> = words.iter().map(String::as_str).collect();
    match words.as_slice() {
        ["station", "--name", name] if !name.is_empty() => Ok(Command::AddStation {
            name: (*name).to_string(),
        }),
        _ => Err(ParseError::Usage(ADD_USAGE)),
    }
}

/// Split on whitespace; double quotes group words and are removed.
fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quoted {
        return Err(ParseError::UnterminatedQuote);
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("exit"), Ok(Some(Command::Exit)));
        assert_eq!(parse("  help  "), Ok(Some(Command::Help)));
        assert_eq!(parse("init"), Ok(Some(Command::Init)));
        assert_eq!(parse("start"), Ok(Some(Command::Start)));
        assert_eq!(parse("pause"), Ok(Some(Command::Pause)));
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("   "), Ok(None));
    }

    #[test]
    fn test_list_targets() {
        assert_eq!(
            parse("list active trades"),
            Ok(Some(Command::List(ListTarget::ActiveTrades)))
        );
        assert_eq!(
            parse("list stockpile"),
            Ok(Some(Command::List(ListTarget::Stockpile)))
        );
        assert_eq!(parse("list"), Err(ParseError::Usage(LIST_USAGE)));
        assert_eq!(parse("list trades"), Err(ParseError::Usage(LIST_USAGE)));
    }

    #[test]
    fn test_add_station_with_quoted_name() {
        assert_eq!(
            parse(r#"add station --name "Ceres Dock""#),
            Ok(Some(Command::AddStation {
                name: "Ceres Dock".into()
            }))
        );
        assert_eq!(
            parse("add station --name Vesta"),
            Ok(Some(Command::AddStation {
                name: "Vesta".into()
            }))
        );
        assert_eq!(parse("add station"), Err(ParseError::Usage(ADD_USAGE)));
        assert_eq!(
            parse(r#"add station --name """#),
            Err(ParseError::Usage(ADD_USAGE))
        );
        assert_eq!(
            parse(r#"add station --name "Ceres"#),
            Err(ParseError::UnterminatedQuote)
        );
    }

    #[test]
    fn test_unknown_command() {
        let err = parse("launch rockets").unwrap_err();
        assert_eq!(err, ParseError::Unknown("launch rockets".into()));
        assert_eq!(err.to_string(), "Unknown command");
        assert!(matches!(parse("start now"), Err(ParseError::Unknown(_))));
    }
}
