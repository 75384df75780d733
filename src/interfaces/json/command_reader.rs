use crate::error::{MarketError, Result};
use serde_json::Value;
use std::io::{BufRead, BufReader, Read};

/// One parsed command line, before references are resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCommand {
    pub line: usize,
    /// Name under which the response data is remembered.
    pub reference: Option<String>,
    pub body: Value,
}

/// Reads newline-delimited JSON commands.
///
/// Blank lines and lines starting with `#` are skipped. Each remaining line
/// must be a JSON object; a stray `ref` string is lifted out of the body.
pub struct CommandReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
        }
    }

    /// Lazily parses the stream; a malformed line yields an error without
    /// ending the iteration.
    pub fn commands(self) -> impl Iterator<Item = Result<RawCommand>> {
        self.reader
            .lines()
            .enumerate()
            .filter_map(|(index, line)| {
                let line_no = index + 1;
                match line {
                    Err(err) => Some(Err(MarketError::from(err))),
                    Ok(text) => {
                        let text = text.trim();
                        if text.is_empty() || text.starts_with('#') {
                            None
                        } else {
                            Some(parse_line(line_no, text))
                        }
                    }
                }
            })
    }
}

fn parse_line(line: usize, text: &str) -> Result<RawCommand> {
    let mut body: Value = serde_json::from_str(text)
        .map_err(|err| MarketError::ValidationError(format!("line {}: {}", line, err)))?;
    let Some(object) = body.as_object_mut() else {
        return Err(MarketError::ValidationError(format!(
            "line {}: expected a JSON object",
            line
        )));
    };
    let reference = match object.remove("ref") {
        None => None,
        Some(Value::String(name)) => Some(name),
        Some(_) => {
            return Err(MarketError::ValidationError(format!(
                "line {}: 'ref' must be a string",
                line
            )));
        }
    };
    Ok(RawCommand {
        line,
        reference,
        body,
    })
}
