//! Dataset loading and writing
//!
//! The whole CSV is held in memory as header + string records so that every
//! column other than the one being filled round-trips verbatim. The first
//! header cell is the row index column; `food_com` and `food_sci` must be
//! present.

use crate::error::{IngestError, Result};
use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use gfoods_common::types::{format_name, COMMON_NAME_COLUMN, SCIENTIFIC_NAME_COLUMN};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// In-memory CSV dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    source: PathBuf,
    headers: Vec<String>,
    records: Vec<Vec<String>>,
    common_idx: usize,
    scientific_idx: usize,
}

/// Read-only view of one row
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    position: usize,
    dataset: &'a Dataset,
}

impl<'a> Row<'a> {
    /// Zero-based position in the file (excluding the header)
    pub fn position(&self) -> usize {
        self.position
    }

    /// Value of the first column, the dataset's own row index
    pub fn index(&self) -> &'a str {
        self.cell(0)
    }

    pub fn common_name(&self) -> &'a str {
        self.cell(self.dataset.common_idx)
    }

    pub fn scientific_name(&self) -> &'a str {
        self.cell(self.dataset.scientific_idx)
    }

    /// Scientific name with underscores replaced and whitespace trimmed
    pub fn formatted_scientific_name(&self) -> String {
        format_name(self.scientific_name())
    }

    /// Formatted common name, `None` when blank
    pub fn formatted_common_name(&self) -> Option<String> {
        Some(format_name(self.common_name())).filter(|n| !n.is_empty())
    }

    /// True when the row has a scientific name to look up
    pub fn is_eligible(&self) -> bool {
        !self.formatted_scientific_name().is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.dataset.column_index(column).map(|idx| self.cell(idx))
    }

    fn cell(&self, idx: usize) -> &'a str {
        self.dataset.records[self.position]
            .get(idx)
            .map(String::as_str)
            .unwrap_or("")
    }
}

impl Dataset {
    /// Load a dataset from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(IngestError::InputNotFound(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|e| IngestError::Read {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        let dataset = Self::from_reader(file, path)?;

        info!(
            path = %path.display(),
            rows = dataset.len(),
            columns = dataset.headers.len(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    /// Parse a dataset from any reader; `source` is only used in messages
    pub fn from_reader<R: Read>(reader: R, source: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let read_err = |e: csv::Error| IngestError::Read {
            path: source.clone(),
            source: e,
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(read_err)?
            .iter()
            .map(str::to_string)
            .collect();

        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(IngestError::config(format!(
                "'{}' has no header row",
                source.display()
            )));
        }

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record.map_err(read_err)?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            if row.len() > headers.len() {
                warn!(
                    path = %source.display(),
                    line = record.position().map(|p| p.line()),
                    fields = row.len(),
                    columns = headers.len(),
                    "Dropping fields beyond the header width"
                );
            }
            row.resize(headers.len(), String::new());
            records.push(row);
        }

        let find = |column: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| IngestError::MissingColumn {
                    column: column.to_string(),
                    path: source.clone(),
                    expected: format!("{}, {}", COMMON_NAME_COLUMN, SCIENTIFIC_NAME_COLUMN),
                })
        };
        let common_idx = find(COMMON_NAME_COLUMN)?;
        let scientific_idx = find(SCIENTIFIC_NAME_COLUMN)?;

        Ok(Self {
            source,
            headers,
            records,
            common_idx,
            scientific_idx,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Index of `column`, appending it (empty in every row) if absent
    pub fn ensure_column(&mut self, column: &str) -> usize {
        if let Some(idx) = self.column_index(column) {
            return idx;
        }
        debug!(column, "Appending missing column");
        self.headers.push(column.to_string());
        for record in &mut self.records {
            record.resize(self.headers.len(), String::new());
        }
        self.headers.len() - 1
    }

    pub fn row(&self, position: usize) -> Option<Row<'_>> {
        (position < self.records.len()).then_some(Row {
            position,
            dataset: self,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.records.len()).map(move |position| Row {
            position,
            dataset: self,
        })
    }

    /// Cell at (`position`, `column`), "" when out of range
    pub fn cell(&self, position: usize, column: usize) -> &str {
        self.records
            .get(position)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Overwrite one cell; out-of-range positions are ignored
    pub fn set_cell(&mut self, position: usize, column: usize, value: impl Into<String>) {
        if column >= self.headers.len() {
            return;
        }
        if let Some(record) = self.records.get_mut(position) {
            if record.len() <= column {
                record.resize(column + 1, String::new());
            }
            record[column] = value.into();
        }
    }

    /// Serialise header and rows, quoting every field
    pub fn write_to<W: Write>(&self, writer: W) -> std::io::Result<()> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(writer);

        writer.write_record(&self.headers).map_err(csv_to_io)?;
        for record in &self.records {
            writer.write_record(record).map_err(csv_to_io)?;
        }
        writer.flush()
    }

    /// Write to `path` via a temporary file in the same directory, replacing
    /// the target only once the whole dataset is on disk
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| IngestError::write(path, e))?;
        self.write_to(tmp.as_file_mut())
            .map_err(|e| IngestError::write(path, e))?;
        tmp.as_file().sync_all().map_err(|e| IngestError::write(path, e))?;

        // Keep the target's permissions when replacing an existing file
        if let Ok(meta) = std::fs::metadata(path) {
            std::fs::set_permissions(tmp.path(), meta.permissions())
                .map_err(|e| IngestError::write(path, e))?;
        }

        tmp.persist(path).map_err(|e| IngestError::write(path, e.error))?;

        info!(path = %path.display(), rows = self.len(), "Wrote dataset");
        Ok(())
    }
}

fn csv_to_io(err: csv::Error) -> std::io::Error {
    match err.into_kind() {
        csv::ErrorKind::Io(e) => e,
        other => std::io::Error::new(std::io::ErrorKind::Other, format!("{:?}", other)),
    }
}
