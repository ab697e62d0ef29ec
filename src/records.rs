//! Reading `(key,secondary)` records from text.
//!
//! Records are written as `(key,secondary)` and separated by whitespace; a line may hold any
//! number of them. Whitespace inside a record is ignored, so `( 6, 25 )` is accepted.

use std::io::BufRead;

use tracing::debug;

use crate::{AvlTree, Pair};

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("failed to read records")]
    Io(#[from] std::io::Error),

    #[error("line {line}: malformed record at `{text}`")]
    Malformed { line: usize, text: String },
}

/// Parses every record in `input`.
pub fn parse_records(input: &str) -> Result<Vec<Pair>, RecordError> {
    let mut pairs = Vec::new();

    for (idx, line) in input.lines().enumerate() {
        parse_line(line, idx + 1, &mut pairs)?;
    }

    Ok(pairs)
}

/// Parses every record read from `reader`, line by line.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<Pair>, RecordError> {
    let mut pairs = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        parse_line(&line?, idx + 1, &mut pairs)?;
    }

    Ok(pairs)
}

fn parse_line(line: &str, line_no: usize, out: &mut Vec<Pair>) -> Result<(), RecordError> {
    let mut rest = line.trim_start();

    while !rest.is_empty() {
        let malformed = || RecordError::Malformed {
            line: line_no,
            text: rest.chars().take(24).collect(),
        };

        let body = rest.strip_prefix('(').ok_or_else(malformed)?;
        let (record, tail) = body.split_once(')').ok_or_else(malformed)?;
        let (key, secondary) = record.split_once(',').ok_or_else(malformed)?;

        let key = key.trim().parse().map_err(|_| malformed())?;
        let secondary = secondary.trim().parse().map_err(|_| malformed())?;

        out.push(Pair::new(key, secondary));
        rest = tail.trim_start();
    }

    Ok(())
}

impl AvlTree {
    /// Builds a tree by inserting every record read from `reader`.
    ///
    /// Records repeating an earlier pair are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<AvlTree, RecordError> {
        let pairs = read_records(reader)?;
        let records = pairs.len();

        let tree: AvlTree = pairs.into_iter().collect();

        debug!(
            records,
            len = tree.len(),
            skipped = records - tree.len(),
            "loaded tree"
        );

        Ok(tree)
    }
}
