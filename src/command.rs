//! Interactive command parsing. Prefix matching, no grammar.

use crate::report::ReportFormat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Free text: run a research query
    Search(String),
    Compare(String, String),
    Store(String),
    Load(String),
    /// Semantic query against the active session
    Query(String),
    /// Merge the current papers into a stored session
    Update(String),
    Export(ReportFormat),
    Delete(String),
    List,
    Help,
    Exit,
    Empty,
    /// A recognised command with bad arguments, with a usage hint
    Invalid(String),
}

pub const HELP_TEXT: &str = "Commands:
  <query>              run a research query
  /compare A vs B      compare two topics
  /store NAME          store the current results as a session
  /load NAME           load a stored session and make it active
  /query TEXT          semantic search in the active session
  /update NAME         add the current papers to a stored session
  /export md|bib|json  save the current results in another format
  /delete NAME         delete a stored session
  /list                list stored sessions
  /help                show this help
  /exit                quit";

pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    if input.is_empty() {
        return Command::Empty;
    }
    if ["/exit", "/quit", "exit", "quit"].contains(&input.to_lowercase().as_str()) {
        return Command::Exit;
    }

    if let Some(rest) = input.strip_prefix("/compare") {
        let parts: Vec<&str> = rest.split(" vs ").map(str::trim).collect();
        return match parts.as_slice() {
            [first, second] if !first.is_empty() && !second.is_empty() => {
                Command::Compare(first.to_string(), second.to_string())
            }
            _ => Command::Invalid("usage: /compare TOPIC1 vs TOPIC2".to_string()),
        };
    }
    if let Some(rest) = input.strip_prefix("/store") {
        return with_argument(rest, "usage: /store NAME", Command::Store);
    }
    if let Some(rest) = input.strip_prefix("/load") {
        return with_argument(rest, "usage: /load NAME", Command::Load);
    }
    if let Some(rest) = input.strip_prefix("/query") {
        return with_argument(rest, "usage: /query TEXT", Command::Query);
    }
    if let Some(rest) = input.strip_prefix("/update") {
        return with_argument(rest, "usage: /update NAME", Command::Update);
    }
    if let Some(rest) = input.strip_prefix("/delete") {
        return with_argument(rest, "usage: /delete NAME", Command::Delete);
    }
    if let Some(rest) = input.strip_prefix("/export") {
        let rest = rest.trim();
        let format = if rest.is_empty() { "md" } else { rest };
        return match format.parse::<ReportFormat>() {
            Ok(format) => Command::Export(format),
            Err(e) => Command::Invalid(e),
        };
    }
    if input.starts_with("/list") {
        return Command::List;
    }
    if input.starts_with("/help") {
        return Command::Help;
    }
    if input.starts_with('/') {
        return Command::Invalid(format!("unknown command {}; try /help", input));
    }

    Command::Search(input.to_string())
}

fn with_argument(rest: &str, usage: &str, build: fn(String) -> Command) -> Command {
    let argument = rest.trim();
    if argument.is_empty() {
        Command::Invalid(usage.to_string())
    } else {
        build(argument.to_string())
    }
}
