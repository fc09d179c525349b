//! The interactive shell: reads lines, runs them against the table and
//! prints results.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use storage::{Constants, InsertOutcome, Table};
use tracing::debug;

use crate::statement::{self, Command, MetaCommand, Statement};

/// The prompt shown when waiting for input.
pub const PROMPT: &str = "db > ";

/// Runs the shell until `.exit` or end of input, then closes the table.
///
/// Storage errors end the session immediately without flushing.
pub fn run<R: BufRead, W: Write>(mut table: Table, input: R, out: &mut W) -> Result<()> {
    let mut lines = input.lines();

    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read input")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match statement::parse(line) {
            Ok(Command::Meta(MetaCommand::Exit)) => break,
            Ok(Command::Meta(MetaCommand::Btree)) => {
                writeln!(out, "Tree:")?;
                write!(out, "{}", table.dump_tree().context("failed to read tree")?)?;
            }
            Ok(Command::Meta(MetaCommand::Constants)) => {
                writeln!(out, "Constants:")?;
                write!(out, "{}", Constants::current())?;
            }
            Ok(Command::Statement(statement)) => execute(&mut table, statement, out)?,
            Err(e) => writeln!(out, "{e}")?,
        }
    }

    table.close().context("failed to close database")
}

fn execute<W: Write>(table: &mut Table, statement: Statement, out: &mut W) -> Result<()> {
    debug!(?statement, "executing");

    match statement {
        Statement::Insert(row) => {
            let outcome = table
                .insert(row.id, &row)
                .with_context(|| format!("failed to insert key {}", row.id))?;
            match outcome {
                InsertOutcome::Success => writeln!(out, "Executed.")?,
                InsertOutcome::DuplicateKey => writeln!(out, "Error: Duplicate key.")?,
            }
        }
        Statement::Select => {
            for row in table.rows().context("failed to start scan")? {
                writeln!(out, "{}", row.context("failed to read row")?)?;
            }
            writeln!(out, "Executed.")?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use tempfile::tempdir;

    fn run_script(path: &Path, commands: &[String]) -> Result<Vec<String>> {
        let table = Table::open(path)?;
        let input = commands.join("\n");
        let mut out = Vec::new();
        run(table, input.as_bytes(), &mut out)?;

        let text = String::from_utf8(out)?;
        Ok(text.lines().map(str::to_string).collect())
    }

    fn insert(key: u32) -> String {
        format!("insert {key} user{key} person{key}@example.com")
    }

    #[test]
    fn test_insert_and_select() {
        let dir = tempdir().unwrap();
        let output = run_script(
            &dir.path().join("test.db"),
            &[insert(1), "select".to_string(), ".exit".to_string()],
        )
        .unwrap();

        assert_eq!(
            output,
            vec![
                "db > Executed.",
                "db > (1, user1, person1@example.com)",
                "Executed.",
                "db > ",
            ]
        );
    }

    #[test]
    fn test_keeps_data_after_closing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        run_script(&path, &[insert(1), ".exit".to_string()]).unwrap();
        let output = run_script(&path, &["select".to_string(), ".exit".to_string()]).unwrap();

        assert_eq!(
            output,
            vec!["db > (1, user1, person1@example.com)", "Executed.", "db > "]
        );
    }

    #[test]
    fn test_end_of_input_closes_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        run_script(&path, &[insert(1)]).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4096);
    }

    #[test]
    fn test_error_messages() {
        let dir = tempdir().unwrap();
        let long_name = "a".repeat(33);
        let output = run_script(
            &dir.path().join("test.db"),
            &[
                format!("insert 1 {long_name} a@b.c"),
                "insert -1 cstack foo@bar.com".to_string(),
                "insert 1 cstack".to_string(),
                "delete 1".to_string(),
                ".tables".to_string(),
                insert(1),
                insert(1),
                ".exit".to_string(),
            ],
        )
        .unwrap();

        assert_eq!(
            output,
            vec![
                "db > String is too long.",
                "db > ID must be positive.",
                "db > Syntax error. Could not parse statement.",
                "db > Unrecognized keyword at start of delete 1",
                "db > Unrecognized command .tables",
                "db > Executed.",
                "db > Error: Duplicate key.",
                "db > ",
            ]
        );
    }

    #[test]
    fn test_print_constants() {
        let dir = tempdir().unwrap();
        let output = run_script(
            &dir.path().join("test.db"),
            &[".constants".to_string(), ".exit".to_string()],
        )
        .unwrap();

        assert_eq!(
            output,
            vec![
                "db > Constants:",
                "ROW_SIZE: 293",
                "COMMON_NODE_HEADER_SIZE: 6",
                "LEAF_NODE_HEADER_SIZE: 14",
                "LEAF_NODE_CELL_SIZE: 297",
                "LEAF_NODE_SPACE_FOR_CELLS: 4082",
                "LEAF_NODE_MAX_CELLS: 13",
                "db > ",
            ]
        );
    }

    #[test]
    fn test_print_tree_after_split() {
        let dir = tempdir().unwrap();
        let mut commands: Vec<String> = (1..=14).map(insert).collect();
        commands.push(".btree".to_string());
        commands.push(".exit".to_string());

        let output = run_script(&dir.path().join("test.db"), &commands).unwrap();

        let mut expected: Vec<String> = vec!["db > Executed.".to_string(); 14];
        expected.push("db > Tree:".to_string());
        expected.push("- internal (size 1)".to_string());
        expected.push("  - leaf (size 7)".to_string());
        expected.extend((1..=7).map(|k| format!("    - {k}")));
        expected.push("  - key 7".to_string());
        expected.push("  - leaf (size 7)".to_string());
        expected.extend((8..=14).map(|k| format!("    - {k}")));
        expected.push("db > ".to_string());

        assert_eq!(output, expected);
    }

    #[test]
    fn test_split_below_root_is_fatal() {
        let dir = tempdir().unwrap();
        let commands: Vec<String> = (1..=21).map(insert).collect();

        let err = run_script(&dir.path().join("test.db"), &commands).unwrap_err();
        assert!(err.to_string().contains("failed to insert key 21"));
    }
}
