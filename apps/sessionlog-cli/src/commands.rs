//! Line commands read from stdin.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTarget {
    Name(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Event(EventTarget),
    Custom {
        name: String,
        value: String,
        overwrite: bool,
    },
    Log {
        kind: String,
        message: String,
    },
    Save,
    Quit,
    Help,
}

pub const USAGE: &str = "commands: event <name> | event #<index> | custom <name> <value> [overwrite] | log <type> <message> | save | quit";

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb {
        "event" => {
            if rest.is_empty() {
                return Err("usage: event <name> | event #<index>".into());
            }
            let target = match rest.strip_prefix('#') {
                Some(index) => EventTarget::Index(
                    index
                        .parse()
                        .map_err(|_| format!("invalid action index '{index}'"))?,
                ),
                None => EventTarget::Name(rest.to_owned()),
            };
            Command::Event(target)
        }
        "custom" => {
            let mut parts = rest.split_whitespace();
            let (Some(name), Some(value)) = (parts.next(), parts.next()) else {
                return Err("usage: custom <name> <value> [overwrite]".into());
            };
            let overwrite = match parts.next() {
                None => false,
                Some("overwrite" | "true") => true,
                Some("false") => false,
                Some(other) => return Err(format!("unexpected flag '{other}'")),
            };
            Command::Custom {
                name: name.to_owned(),
                value: value.to_owned(),
                overwrite,
            }
        }
        "log" => {
            let Some((kind, message)) = rest.split_once(char::is_whitespace) else {
                return Err("usage: log <type> <message>".into());
            };
            Command::Log {
                kind: kind.to_owned(),
                message: message.trim().to_owned(),
            }
        }
        "save" => Command::Save,
        "quit" | "exit" => Command::Quit,
        "help" | "?" => Command::Help,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(command))
}
