//! Reading request descriptors for a batch
//!
//! Descriptors are read from a file or stdin, either as one JSON array or as
//! JSON Lines with one descriptor per line. Lines starting with `#` are
//! comments in JSON Lines input.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use volley_lib::RequestDescriptor;

/// Comment marker for ignoring lines in JSON Lines input
const COMMENT_MARKER: &str = "#";

/// The descriptors of one batch
#[derive(Debug, Clone)]
pub(crate) struct Requests {
    pub(crate) descriptors: Vec<RequestDescriptor>,
}

impl Requests {
    /// Read all descriptors from `reader`
    pub(crate) fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut contents = String::new();
        BufReader::new(reader)
            .read_to_string(&mut contents)
            .context("Cannot read request descriptors")?;

        let descriptors = if contents.trim_start().starts_with('[') {
            serde_json::from_str(&contents).context("Cannot parse JSON array of request descriptors")?
        } else {
            Self::parse_lines(contents.as_bytes())?
        };
        Ok(Requests { descriptors })
    }

    /// Parse JSON Lines, skipping empty lines and comments
    fn parse_lines(reader: impl BufRead) -> Result<Vec<RequestDescriptor>> {
        let mut descriptors = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.context("Cannot read request descriptors")?;
            let line = line.trim();
            if line.is_empty() || line.starts_with(COMMENT_MARKER) {
                continue;
            }
            let descriptor = serde_json::from_str(line)
                .with_context(|| format!("Invalid request descriptor on line {}", index + 1))?;
            descriptors.push(descriptor);
        }
        Ok(descriptors)
    }
}

impl TryFrom<Option<&Path>> for Requests {
    type Error = anyhow::Error;

    /// Read from the file at `path`, or from stdin if there is none
    fn try_from(path: Option<&Path>) -> Result<Self, Self::Error> {
        match path {
            None => Self::from_reader(std::io::stdin()),
            Some(path) => {
                let file = std::fs::File::open(path)
                    .with_context(|| format!("Cannot open input file: {}", path.display()))?;
                Self::from_reader(file)
            }
        }
    }
}
