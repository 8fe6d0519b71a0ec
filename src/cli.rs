//! CLI utilities for the HandlerSocket shell.
//!
//! Lines typed at the prompt are parsed into a [`Command`] and run against a
//! [`Client`] with [`execute`]. Lists of keys or values are comma separated and
//! the literal `NULL` stands for the null token.
//!
//! # Example
//! ```rust
//! use hsclient::cli::Command;
//! use hsclient::{Operator, Value};
//!
//! let cmd: Command = "find 98 >= k1 10".try_into().unwrap();
//! assert_eq!(
//!     cmd,
//!     Command::Find {
//!         index_num: 98,
//!         op: Operator::GreaterOrEqual,
//!         values: vec![Value::from("k1")],
//!         limit: 10,
//!         offset: 0,
//!     }
//! );
//! ```
use std::io::{BufRead, Write};

use thiserror::Error;

use crate::{
    client::Client,
    codec::Token,
    error::ClientResult,
    index::{IndexResolver, Mode},
    protocol::{Dialer, FindOptions, Inserted, Operator, Rows, Value},
};

/// List of possible errors a typed line can produce.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unrecognized command '{0}'")]
    UnrecognizedCommand(String),

    #[error("invalid '{command}' command, {reason}")]
    InvalidCommandArguments { command: String, reason: String },

    #[error("failed reading input: {0}")]
    Input(String),
}

/// Commands understood by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `.exit`
    Exit,
    /// `.close` both sockets.
    Close,
    /// `.open r|w <idx>`
    Open { mode: Mode, index_num: u32 },
    /// `find <idx> <op> <v1,v2..> [limit] [offset]`
    Find {
        index_num: u32,
        op: Operator,
        values: Vec<Value>,
        limit: u32,
        offset: u32,
    },
    /// `select <idx> <key..>`
    Select { index_num: u32, id: Vec<Value> },
    /// `insert <idx> <key..> <v1,v2..>` or `insert+ <idx> <v1,v2..>`
    Insert {
        index_num: u32,
        id: Vec<Value>,
        values: Vec<Value>,
        autoinc: bool,
    },
    /// `update <idx> <key..> <v1,v2..>`
    Update {
        index_num: u32,
        id: Vec<Value>,
        values: Vec<Value>,
    },
    /// `delete <idx> <key..>`
    Delete { index_num: u32, id: Vec<Value> },
}

impl TryFrom<&str> for Command {
    type Error = CommandError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parts = value.split_whitespace().collect::<Vec<&str>>();
        let Some(&name) = parts.first() else {
            return Err(CommandError::UnrecognizedCommand(String::new()));
        };
        let args = Args {
            command: name,
            parts: &parts[1..],
        };

        match name.to_lowercase().as_str() {
            ".exit" => Ok(Command::Exit),
            ".close" => Ok(Command::Close),
            ".open" => {
                args.expect(2, ".open r 98")?;
                let mode = args.parts[0]
                    .parse()
                    .map_err(|e: crate::index::DescriptorError| args.invalid(e.to_string()))?;
                Ok(Command::Open {
                    mode,
                    index_num: args.number(1)?,
                })
            }
            "find" => {
                args.expect(3, "find 98 >= k1 10 0")?;
                let op = Operator::try_from(args.parts[1]).map_err(|e| args.invalid(e))?;
                Ok(Command::Find {
                    index_num: args.number(0)?,
                    op,
                    values: parse_list(args.parts[2]),
                    limit: args.optional_number(3, 1)?,
                    offset: args.optional_number(4, 0)?,
                })
            }
            "select" => {
                args.expect(2, "select 98 k1")?;
                Ok(Command::Select {
                    index_num: args.number(0)?,
                    id: parse_list(args.parts[1]),
                })
            }
            "insert" => {
                args.expect(3, "insert 99 k1 v1,v2")?;
                Ok(Command::Insert {
                    index_num: args.number(0)?,
                    id: parse_list(args.parts[1]),
                    values: parse_list(args.parts[2]),
                    autoinc: false,
                })
            }
            "insert+" => {
                args.expect(2, "insert+ 99 v1,v2")?;
                Ok(Command::Insert {
                    index_num: args.number(0)?,
                    id: Vec::new(),
                    values: parse_list(args.parts[1]),
                    autoinc: true,
                })
            }
            "update" => {
                args.expect(3, "update 99 k1 k1,v2")?;
                Ok(Command::Update {
                    index_num: args.number(0)?,
                    id: parse_list(args.parts[1]),
                    values: parse_list(args.parts[2]),
                })
            }
            "delete" => {
                args.expect(2, "delete 99 k1")?;
                Ok(Command::Delete {
                    index_num: args.number(0)?,
                    id: parse_list(args.parts[1]),
                })
            }
            _ => Err(CommandError::UnrecognizedCommand(value.trim().to_string())),
        }
    }
}

struct Args<'a> {
    command: &'a str,
    parts: &'a [&'a str],
}

impl Args<'_> {
    fn invalid(&self, reason: impl Into<String>) -> CommandError {
        CommandError::InvalidCommandArguments {
            command: self.command.to_string(),
            reason: reason.into(),
        }
    }

    fn expect(&self, count: usize, example: &str) -> Result<(), CommandError> {
        if self.parts.len() < count {
            return Err(self.invalid(format!(
                "requires at least {count} arguments. Example: {example}"
            )));
        }
        Ok(())
    }

    fn number(&self, idx: usize) -> Result<u32, CommandError> {
        self.parts[idx]
            .parse::<u32>()
            .map_err(|_| self.invalid(format!("'{}' is not a non-negative integer", self.parts[idx])))
    }

    fn optional_number(&self, idx: usize, default: u32) -> Result<u32, CommandError> {
        match self.parts.get(idx) {
            Some(_) => self.number(idx),
            None => Ok(default),
        }
    }
}

fn parse_list(list: &str) -> Vec<Value> {
    list.split(',')
        .map(|item| match item {
            "NULL" => Value::Null,
            item => Value::from(item),
        })
        .collect()
}

/// Prompt user for a command. End of input reads as [`Command::Exit`].
pub fn prompt<R, W>(mut reader: R, mut writer: W) -> Result<Command, CommandError>
where
    R: BufRead,
    W: Write,
{
    let input = |e: std::io::Error| CommandError::Input(e.to_string());

    write!(&mut writer, "hs> ").map_err(input)?;
    writer.flush().map_err(input)?;

    let mut s = String::default();
    if reader.read_line(&mut s).map_err(input)? == 0 {
        return Ok(Command::Exit);
    }

    s.as_str().try_into()
}

/// Runs a command, returning the text to print.
pub fn execute<R, D>(client: &mut Client<R, D>, command: Command) -> ClientResult<Option<String>>
where
    R: IndexResolver,
    D: Dialer,
{
    let out = match command {
        Command::Exit => None,
        Command::Close => {
            client.close(None);
            None
        }
        Command::Open { mode, index_num } => {
            client.open_index(mode, index_num)?;
            Some(format!("index {index_num} open on {mode} socket"))
        }
        Command::Find {
            index_num,
            op,
            values,
            limit,
            offset,
        } => {
            let options = FindOptions {
                limit,
                offset,
                ..FindOptions::default()
            };
            Some(render_rows(&client.find(index_num, op, &values, &options)?))
        }
        Command::Select { index_num, id } => Some(match client.select(&id, index_num)? {
            Some(row) => render_tuple(&row),
            None => "(no row)".to_string(),
        }),
        Command::Insert {
            index_num,
            id,
            values,
            autoinc,
        } => Some(match client.insert(&id, &values, index_num, autoinc)? {
            Inserted::Stored => "inserted".to_string(),
            Inserted::Generated(key) => format!("inserted, id {}", render_token(&key)),
        }),
        Command::Update {
            index_num,
            id,
            values,
        } => Some(affected_text(client.update(&id, &values, index_num)?)),
        Command::Delete { index_num, id } => Some(affected_text(client.delete(&id, index_num)?)),
    };
    Ok(out)
}

fn affected_text(changed: bool) -> String {
    let text = if changed { "1 row affected" } else { "0 rows affected" };
    text.to_string()
}

fn render_token(token: &Token) -> String {
    match token {
        Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        None => "NULL".to_string(),
    }
}

fn render_tuple(row: &[Token]) -> String {
    row.iter().map(render_token).collect::<Vec<String>>().join("\t")
}

fn render_rows(rows: &Rows) -> String {
    let lines = match rows {
        Rows::Tuples(rows) => rows.iter().map(|r| render_tuple(r)).collect::<Vec<String>>(),
        Rows::Records(rows) => rows
            .iter()
            .map(|r| {
                r.iter()
                    .map(|(field, value)| format!("{field}={}", render_token(value)))
                    .collect::<Vec<String>>()
                    .join(" ")
            })
            .collect(),
    };

    if lines.is_empty() {
        "(no rows)".to_string()
    } else {
        lines.join("\n")
    }
}
