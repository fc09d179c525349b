//! Turns one line of shell input into a command for the table.

use storage::row::{COLUMN_EMAIL_SIZE, COLUMN_USERNAME_SIZE};
use storage::Row;
use thiserror::Error;

/// Commands starting with a dot, handled by the shell itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    Exit,
    Btree,
    Constants,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Meta(MetaCommand),
    Statement(Statement),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrepareError {
    #[error("ID must be positive.")]
    NegativeId,

    #[error("String is too long.")]
    StringTooLong,

    #[error("Syntax error. Could not parse statement.")]
    SyntaxError,

    #[error("Unrecognized keyword at start of {0}")]
    UnrecognizedStatement(String),

    #[error("Unrecognized command {0}")]
    UnrecognizedCommand(String),
}

pub fn parse(input: &str) -> Result<Command, PrepareError> {
    if input.starts_with('.') {
        return parse_meta_command(input).map(Command::Meta);
    }
    parse_statement(input).map(Command::Statement)
}

fn parse_meta_command(input: &str) -> Result<MetaCommand, PrepareError> {
    match input {
        ".exit" => Ok(MetaCommand::Exit),
        ".btree" => Ok(MetaCommand::Btree),
        ".constants" => Ok(MetaCommand::Constants),
        _ => Err(PrepareError::UnrecognizedCommand(input.to_string())),
    }
}

fn parse_statement(input: &str) -> Result<Statement, PrepareError> {
    if input.starts_with("insert") {
        return parse_insert(input);
    }
    if input == "select" {
        return Ok(Statement::Select);
    }
    Err(PrepareError::UnrecognizedStatement(input.to_string()))
}

fn parse_insert(input: &str) -> Result<Statement, PrepareError> {
    let mut tokens = input.split_whitespace().skip(1);
    let (Some(id), Some(username), Some(email)) = (tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(PrepareError::SyntaxError);
    };

    let id: i64 = id.parse().map_err(|_| PrepareError::SyntaxError)?;
    if id < 0 {
        return Err(PrepareError::NegativeId);
    }
    let id = u32::try_from(id).map_err(|_| PrepareError::SyntaxError)?;

    if username.len() > COLUMN_USERNAME_SIZE || email.len() > COLUMN_EMAIL_SIZE {
        return Err(PrepareError::StringTooLong);
    }

    let row = Row::new(id, username, email).map_err(|_| PrepareError::StringTooLong)?;
    Ok(Statement::Insert(row))
}
