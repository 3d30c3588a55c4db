use std::path::PathBuf;

/// A single command parsed from the command file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create(PathBuf),
    Delete(PathBuf),
    Rename { from: PathBuf, to: PathBuf },
    Append { path: PathBuf, content: String },
}

const CREATE: &str = "create a file";
const DELETE: &str = "delete the file";
const RENAME: &str = "rename the file";
const APPEND: &str = "add to the file";

const RENAME_SEPARATOR: &str = " to ";
const APPEND_SEPARATOR: &str = " this content: ";

/// Parses the text that follows a matched prefix.
type ArgParser = fn(&str) -> Option<Command>;

/// Grammar table, tried top to bottom. The first matching prefix wins even
/// when its arguments turn out to be malformed.
const GRAMMAR: &[(&str, ArgParser)] = &[
    (CREATE, parse_create),
    (DELETE, parse_delete),
    (RENAME, parse_rename),
    (APPEND, parse_append),
];

/// Parse the full content of the command file.
///
/// The input is trimmed first. Returns `None` when no prefix matches, or when
/// a rename/append command lacks its separator.
pub fn parse(raw: &str) -> Option<Command> {
    let text = raw.trim();
    GRAMMAR
        .iter()
        .find(|&&(prefix, _)| text.starts_with(prefix))
        .and_then(|&(prefix, parser)| parser(&text[prefix.len()..]))
}

fn parse_create(rest: &str) -> Option<Command> {
    Some(Command::Create(PathBuf::from(rest.trim())))
}

fn parse_delete(rest: &str) -> Option<Command> {
    Some(Command::Delete(PathBuf::from(rest.trim())))
}

fn parse_rename(rest: &str) -> Option<Command> {
    let (from, to) = rest.split_once(RENAME_SEPARATOR)?;
    Some(Command::Rename {
        from: PathBuf::from(from.trim()),
        to: PathBuf::from(to.trim()),
    })
}

fn parse_append(rest: &str) -> Option<Command> {
    let (path, content) = rest.split_once(APPEND_SEPARATOR)?;
    Some(Command::Append {
        path: PathBuf::from(path.trim()),
        content: content.trim().to_string(),
    })
}
