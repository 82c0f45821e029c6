//! Line commands read from stdin

use anyhow::{anyhow, bail, Context, Result};
use gd_core::{RecordId, SortField, StatusFilter};

/// One parsed command line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Page(usize),
    Next,
    Prev,
    Size(usize),
    Sort(SortField),
    /// Empty text clears the name filter
    Filter(String),
    Status(StatusFilter),
    Select(RecordId),
    Clear,
    Refresh,
    /// Make the next query fail, then refresh
    Fail(String),
    Show,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  page N          go to page N
  next | prev     step one page
  size N          set the page size
  sort FIELD      sort by FIELD, again to flip direction
  filter [TEXT]   filter names by TEXT, no text clears it
  status S|all    only show records with status S
  select ID       select a record
  clear           clear the selection
  refresh         reload the current page now
  fail MESSAGE    fail the next query
  show            print the views
  quit";

/// Parse a line; blank lines give `None`
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "page" | "p" => Command::Page(number(rest, "page")?),
        "next" | "n" => Command::Next,
        "prev" | "previous" => Command::Prev,
        "size" => Command::Size(number(rest, "size")?),
        "sort" => Command::Sort(
            SortField::parse(rest).ok_or_else(|| anyhow!("unknown sort field '{}'", rest))?,
        ),
        "filter" | "f" => Command::Filter(rest.to_string()),
        "status" => Command::Status(
            StatusFilter::parse(rest).ok_or_else(|| anyhow!("unknown status '{}'", rest))?,
        ),
        "select" | "s" => {
            if rest.is_empty() {
                bail!("select needs a record id");
            }
            Command::Select(RecordId::from(rest))
        }
        "clear" => Command::Clear,
        "refresh" | "r" => Command::Refresh,
        "fail" => Command::Fail(if rest.is_empty() {
            "simulated failure".to_string()
        } else {
            rest.to_string()
        }),
        "show" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command '{}', try 'help'", other),
    };

    Ok(Some(command))
}

fn number(arg: &str, what: &str) -> Result<usize> {
    arg.parse()
        .with_context(|| format!("{} needs a number, got '{}'", what, arg))
}
