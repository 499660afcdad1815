//! Line-oriented statement interpreter.
//!
//! One statement per line, keywords case-insensitive, an optional trailing
//! `;`. Blank lines and lines starting with `--` or `#` are skipped.
//!
//! ```text
//! CREATE DATABASE shop
//! USE DATABASE shop
//! CREATE TABLE users
//! INSERT INTO users {"name": "alice", "age": 31}
//! ```
//!
//! `SELECT`, `UPDATE`, `DELETE` and `DROP` are recognised but not supported;
//! use the `get` subcommand or the library for those.

use crate::session::Session;
use amazedb_core::{CoreError, Database, Document};
use std::fmt;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Interpreter errors.
#[derive(Debug, Error)]
pub enum InterpreterError {
    /// The statement could not be parsed.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// A recognised verb with no implementation.
    #[error("{0} is not supported")]
    Unsupported(String),

    /// A table statement ran before `USE DATABASE`.
    #[error("no database selected (run USE DATABASE <name> first)")]
    NoDatabase,

    /// The `INSERT` payload is not a JSON object.
    #[error("invalid document: {0}")]
    Document(String),

    /// Error from the database.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Failure writing results.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `USE DATABASE <name>`
    UseDatabase(String),
    /// `CREATE DATABASE <name>`
    CreateDatabase(String),
    /// `CREATE TABLE <name>`
    CreateTable(String),
    /// `INSERT INTO <table> <json object>`
    InsertInto {
        /// Target table.
        table: String,
        /// Document to append.
        document: Document,
    },
}

/// What an executed statement did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A database was selected.
    DatabaseSelected(String),
    /// A database was created and selected.
    DatabaseCreated(String),
    /// A table was created.
    TableCreated(String),
    /// A document was inserted.
    Inserted(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DatabaseSelected(name) => write!(f, "using database {name}"),
            Self::DatabaseCreated(name) => write!(f, "created database {name}"),
            Self::TableCreated(name) => write!(f, "created table {name}"),
            Self::Inserted(table) => write!(f, "inserted 1 document into {table}"),
        }
    }
}

/// Counts from [`run_script`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Statements that succeeded.
    pub executed: usize,
    /// Statements that failed.
    pub failed: usize,
}

/// Splits off the first whitespace-delimited word.
fn next_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.find(char::is_whitespace) {
        Some(end) => Some((&input[..end], input[end..].trim_start())),
        None => Some((input, "")),
    }
}

fn expect_keyword<'a>(input: &'a str, keyword: &str, after: &str) -> Result<&'a str, InterpreterError> {
    match next_word(input) {
        Some((word, rest)) if word.eq_ignore_ascii_case(keyword) => Ok(rest),
        _ => Err(InterpreterError::Syntax(format!("expected {keyword} after {after}"))),
    }
}

fn single_name(input: &str, what: &str) -> Result<String, InterpreterError> {
    match next_word(input) {
        Some((name, "")) => Ok(name.to_string()),
        Some((_, extra)) => Err(InterpreterError::Syntax(format!(
            "unexpected input after {what} name: {extra}"
        ))),
        None => Err(InterpreterError::Syntax(format!("missing {what} name"))),
    }
}

/// Parses one statement.
pub fn parse(line: &str) -> Result<Statement, InterpreterError> {
    let line = line.trim();
    let line = line.strip_suffix(';').unwrap_or(line).trim_end();

    let Some((verb, rest)) = next_word(line) else {
        return Err(InterpreterError::Syntax("empty statement".to_string()));
    };

    match verb.to_ascii_uppercase().as_str() {
        "USE" => {
            let rest = expect_keyword(rest, "DATABASE", "USE")?;
            Ok(Statement::UseDatabase(single_name(rest, "database")?))
        }
        "CREATE" => match next_word(rest) {
            Some((kind, rest)) if kind.eq_ignore_ascii_case("DATABASE") => {
                Ok(Statement::CreateDatabase(single_name(rest, "database")?))
            }
            Some((kind, rest)) if kind.eq_ignore_ascii_case("TABLE") => {
                Ok(Statement::CreateTable(single_name(rest, "table")?))
            }
            _ => Err(InterpreterError::Syntax(
                "expected DATABASE or TABLE after CREATE".to_string(),
            )),
        },
        "INSERT" => {
            let rest = expect_keyword(rest, "INTO", "INSERT")?;
            let Some((table, payload)) = next_word(rest) else {
                return Err(InterpreterError::Syntax("missing table name".to_string()));
            };
            if payload.is_empty() {
                return Err(InterpreterError::Syntax("missing document".to_string()));
            }
            let document = match serde_json::from_str(payload) {
                Ok(serde_json::Value::Object(document)) => document,
                Ok(other) => {
                    return Err(InterpreterError::Document(format!(
                        "expected a JSON object, got {other}"
                    )))
                }
                Err(e) => return Err(InterpreterError::Document(e.to_string())),
            };
            Ok(Statement::InsertInto {
                table: table.to_string(),
                document,
            })
        }
        verb @ ("SELECT" | "UPDATE" | "DELETE" | "DROP") => {
            Err(InterpreterError::Unsupported(verb.to_string()))
        }
        _ => Err(InterpreterError::Syntax(format!("unknown statement: {verb}"))),
    }
}

fn require_database(session: &Session) -> Result<&Database, InterpreterError> {
    session.current().ok_or(InterpreterError::NoDatabase)
}

/// Executes a parsed statement against `session`.
pub fn execute(session: &mut Session, statement: Statement) -> Result<Outcome, InterpreterError> {
    match statement {
        Statement::UseDatabase(name) => {
            session.use_database(&name)?;
            Ok(Outcome::DatabaseSelected(name))
        }
        Statement::CreateDatabase(name) => {
            session.create_database(&name)?;
            Ok(Outcome::DatabaseCreated(name))
        }
        Statement::CreateTable(name) => {
            require_database(session)?.create_table(&name)?;
            Ok(Outcome::TableCreated(name))
        }
        Statement::InsertInto { table, document } => {
            require_database(session)?.load_table(&table)?.insert(document)?;
            Ok(Outcome::Inserted(table))
        }
    }
}

/// Runs every statement read from `input`, writing one result line per
/// statement to `out`. A failing statement is reported and skipped.
pub fn run_script<R, W>(
    session: &mut Session,
    input: R,
    out: &mut W,
) -> Result<RunSummary, InterpreterError>
where
    R: BufRead,
    W: Write,
{
    let mut summary = RunSummary::default();

    for (number, line) in input.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") || trimmed.starts_with('#') {
            continue;
        }

        match parse(trimmed).and_then(|statement| execute(session, statement)) {
            Ok(outcome) => {
                summary.executed += 1;
                writeln!(out, "ok: {outcome}")?;
            }
            Err(e) => {
                summary.failed += 1;
                writeln!(out, "error (line {}): {e}", number + 1)?;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use amazedb_core::{Config, Filters};
    use serde_json::json;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn parse_use_and_create() {
        assert_eq!(
            parse("USE DATABASE shop").unwrap(),
            Statement::UseDatabase("shop".to_string())
        );
        assert_eq!(
            parse("  create   table users ;").unwrap(),
            Statement::CreateTable("users".to_string())
        );
        assert_eq!(
            parse("Create Database shop;").unwrap(),
            Statement::CreateDatabase("shop".to_string())
        );
    }

    #[test]
    fn parse_insert() {
        let statement = parse(r#"INSERT INTO users {"name": "a", "age": 5};"#).unwrap();
        let Statement::InsertInto { table, document } = statement else {
            panic!("expected insert");
        };
        assert_eq!(table, "users");
        assert_eq!(document["age"], json!(5));
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(parse(""), Err(InterpreterError::Syntax(_))));
        assert!(matches!(parse("USE shop"), Err(InterpreterError::Syntax(_))));
        assert!(matches!(
            parse("CREATE INDEX x"),
            Err(InterpreterError::Syntax(_))
        ));
        assert!(matches!(
            parse("CREATE TABLE a b"),
            Err(InterpreterError::Syntax(_))
        ));
        assert!(matches!(
            parse("INSERT INTO users"),
            Err(InterpreterError::Syntax(_))
        ));
        assert!(matches!(
            parse("INSERT INTO users [1, 2]"),
            Err(InterpreterError::Document(_))
        ));
        assert!(matches!(
            parse("INSERT INTO users {oops"),
            Err(InterpreterError::Document(_))
        ));
        assert!(matches!(parse("FROB x"), Err(InterpreterError::Syntax(_))));
    }

    #[test]
    fn unsupported_verbs_are_named() {
        for line in ["SELECT * FROM users", "update users", "DELETE FROM x", "drop table x"] {
            match parse(line) {
                Err(InterpreterError::Unsupported(verb)) => {
                    assert_eq!(verb, verb.to_ascii_uppercase());
                }
                other => panic!("{line}: {other:?}"),
            }
        }
    }

    #[test]
    fn table_statements_need_database() {
        let temp = tempdir().unwrap();
        let mut session = Session::new(temp.path(), Config::default());
        assert!(matches!(
            execute(&mut session, Statement::CreateTable("users".to_string())),
            Err(InterpreterError::NoDatabase)
        ));
    }

    #[test]
    fn script_runs_statements_and_reports_failures() {
        let temp = tempdir().unwrap();
        let mut session = Session::new(temp.path(), Config::default().sync_on_write(false));

        let script = r#"
            -- set up
            CREATE DATABASE shop;
            CREATE TABLE users;
            INSERT INTO users {"name": "a", "age": 5};
            INSERT INTO users {"name": "b", "age": 3};
            SELECT * FROM users;
            # switch back
            USE DATABASE shop
        "#;
        let mut out = Vec::new();
        let summary = run_script(&mut session, Cursor::new(script), &mut out).unwrap();

        assert_eq!(summary, RunSummary { executed: 5, failed: 1 });
        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("ok: created database shop"));
        assert!(output.contains("error (line 7): SELECT is not supported"));

        let users = session.current().unwrap().load_table("users").unwrap();
        let found = users.get(&Filters::new().gt("age", 4), None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["name"], json!("a"));
    }
}
