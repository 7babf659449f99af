use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Source location of a node in a parsed feature file.
///
/// Both coordinates are 1-based and taken verbatim from the parser, so two
/// parses of byte-identical input always agree on every `Position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// 1-based line number.
    #[serde(deserialize_with = "positive")]
    pub line: usize,
    /// 1-based column number.
    #[serde(default = "first_column", deserialize_with = "positive")]
    pub column: usize,
}

fn first_column() -> usize {
    1
}

fn positive<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let value = usize::deserialize(deserializer)?;
    if value == 0 {
        return Err(serde::de::Error::custom("positions are 1-based, got 0"));
    }
    Ok(value)
}

impl Position {
    /// Creates a position at the given line and column.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
