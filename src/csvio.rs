//! Minimal CSV codec for the pipeline's flat record streams.
//!
//! The writers quote a field only when it contains a quote, comma, CR or
//! LF; quotes are doubled. No writer ever emits an embedded newline inside
//! a field, so the reader stays line-oriented. Log files are append-only
//! and each row can be flushed durably before the next one is produced,
//! which keeps an interrupted run a valid prefix of a complete one.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("{path} is missing column {column}")]
    MissingColumn { path: String, column: String },
}

pub fn csv_escape(value: Option<&str>) -> String {
    let raw = value.unwrap_or("");
    if raw.is_empty() {
        String::new()
    } else if raw.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut field)),
                _ => field.push(c),
            }
        }
    }
    fields.push(field);
    fields
}

/// A fully-read CSV file: header row plus data rows.
#[derive(Debug, Clone)]
pub struct CsvTable {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Read a whole CSV file. Rows whose field count does not match the
    /// header are skipped with a warning: a torn trailing row from an
    /// interrupted writer must not poison the rest of the stream.
    pub fn read(path: &Path) -> Result<Self, CsvError> {
        let file = File::open(path).map_err(|source| CsvError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let reader = BufReader::new(file);

        let mut lines = reader.lines();
        let header_line = match lines.next() {
            Some(line) => line.map_err(|source| CsvError::Read {
                path: path.display().to_string(),
                source,
            })?,
            None => {
                return Ok(Self {
                    path: path.to_path_buf(),
                    headers: Vec::new(),
                    rows: Vec::new(),
                })
            }
        };
        let headers = parse_line(header_line.trim_end_matches(['\r', '\n']));

        let mut rows = Vec::new();
        for (index, line) in lines.enumerate() {
            let line = line.map_err(|source| CsvError::Read {
                path: path.display().to_string(),
                source,
            })?;
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                continue;
            }
            let fields = parse_line(trimmed);
            if fields.len() != headers.len() {
                tracing::warn!(
                    target: "ledgerbridge",
                    event = "csv_row_skipped",
                    path = %path.display(),
                    row = index + 2,
                    expected = headers.len(),
                    actual = fields.len(),
                );
                continue;
            }
            rows.push(fields);
        }

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Resolve a column name to its index, erroring when absent so callers
    /// fail loudly on a malformed input file rather than mis-joining.
    pub fn column(&self, name: &str) -> Result<usize, CsvError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CsvError::MissingColumn {
                path: self.path.display().to_string(),
                column: name.to_string(),
            })
    }

    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(|r| r.as_slice())
    }
}

/// Line-buffered CSV writer with explicit durability control.
pub struct CsvWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CsvWriter {
    /// Create (truncate) a CSV file and write its header row.
    pub fn create(path: &Path, headers: &[&str]) -> Result<Self, CsvError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CsvError::Open {
                path: path.display().to_string(),
                source,
            })?;
        }
        let file = File::create(path).map_err(|source| CsvError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let mut writer = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        };
        writer.write_row(headers)?;
        Ok(writer)
    }

    /// Open a CSV file for appending, writing the header only when the
    /// file did not previously exist.
    pub fn append(path: &Path, headers: &[&str]) -> Result<Self, CsvError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CsvError::Open {
                path: path.display().to_string(),
                source,
            })?;
        }
        let existed = path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| CsvError::Open {
                path: path.display().to_string(),
                source,
            })?;
        let mut writer = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        };
        if !existed {
            writer.write_row(headers)?;
        }
        Ok(writer)
    }

    /// Append one row, escaping each field, and flush it to the OS.
    pub fn write_row(&mut self, fields: &[&str]) -> Result<(), CsvError> {
        let line = fields
            .iter()
            .map(|f| csv_escape(Some(f)))
            .collect::<Vec<_>>()
            .join(",");
        let io_result = self
            .writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush());
        io_result.map_err(|source| CsvError::Write {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Force the row onto stable storage. The orchestrator calls this
    /// after every run-log row so an interrupted run leaves a valid,
    /// replay-safe prefix on disk.
    pub fn sync(&mut self) -> Result<(), CsvError> {
        self.writer
            .get_ref()
            .sync_all()
            .map_err(|source| CsvError::Write {
                path: self.path.display().to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_escape_quotes_fields() {
        assert_eq!(csv_escape(Some("plain")), "plain");
        assert_eq!(csv_escape(Some("with,comma")), "\"with,comma\"");
        assert_eq!(csv_escape(Some("with\"quote")), "\"with\"\"quote\"");
        assert_eq!(csv_escape(None), "");
    }

    #[test]
    fn parse_line_handles_quoted_fields() {
        assert_eq!(parse_line("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(parse_line("a,\"b,c\",d"), vec!["a", "b,c", "d"]);
        assert_eq!(parse_line("\"he said \"\"hi\"\"\",x"), vec![
            "he said \"hi\"",
            "x"
        ]);
        assert_eq!(parse_line("a,,c"), vec!["a", "", "c"]);
    }

    #[test]
    fn write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        {
            let mut w = CsvWriter::create(&path, &["id", "msg"]).unwrap();
            w.write_row(&["1", "plain"]).unwrap();
            w.write_row(&["2", "has,comma"]).unwrap();
            w.write_row(&["3", "has \"quote\""]).unwrap();
        }
        let table = CsvTable::read(&path).unwrap();
        assert_eq!(table.len(), 3);
        let msg = table.column("msg").unwrap();
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[1][msg], "has,comma");
        assert_eq!(rows[2][msg], "has \"quote\"");
    }

    #[test]
    fn append_writes_header_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        {
            let mut w = CsvWriter::append(&path, &["a"]).unwrap();
            w.write_row(&["1"]).unwrap();
        }
        {
            let mut w = CsvWriter::append(&path, &["a"]).unwrap();
            w.write_row(&["2"]).unwrap();
        }
        let table = CsvTable::read(&path).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn ragged_row_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torn.csv");
        std::fs::write(&path, "a,b\n1,2\n3\n4,5\n").unwrap();
        let table = CsvTable::read(&path).unwrap();
        assert_eq!(table.len(), 2);
    }
}
