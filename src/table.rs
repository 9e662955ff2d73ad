// A parsed GTFS text file: header row, raw records and per-column types.

use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::Path;

use crate::content::GtfsContent;
use crate::error::{GtfsError, Result};

// ============================================================================
// Cell Values
// ============================================================================

/// Type inferred for a whole column from its non-empty cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Missing,
}

impl Value {
    fn parse(raw: &str, kind: ColumnKind) -> Value {
        if raw.is_empty() {
            return Value::Missing;
        }
        let parsed = match kind {
            ColumnKind::Integer => raw.parse().ok().map(Value::Integer),
            ColumnKind::Float => raw.parse().ok().map(Value::Float),
            ColumnKind::Text => None,
        };
        parsed.unwrap_or_else(|| Value::Text(raw.to_string()))
    }

    /// Identity used for distinctness. `1` and `01` in an integer column,
    /// or `3` and `3.0` in a float column, share a key.
    fn key(&self) -> ValueKey {
        match self {
            Value::Integer(v) => ValueKey::Integer(*v),
            // -0.0 and 0.0 compare equal but differ in bits.
            Value::Float(v) if *v == 0.0 => ValueKey::Float(0.0f64.to_bits()),
            Value::Float(v) => ValueKey::Float(v.to_bits()),
            Value::Text(v) => ValueKey::Text(v.clone()),
            Value::Missing => ValueKey::Missing,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum ValueKey {
    Integer(i64),
    Float(u64),
    Text(String),
    Missing,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::Missing => f.write_str("NaN"),
        }
    }
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind = ColumnKind::Integer;
    let mut seen = false;
    for cell in cells.filter(|c| !c.is_empty()) {
        seen = true;
        if kind == ColumnKind::Integer && cell.parse::<i64>().is_err() {
            kind = ColumnKind::Float;
        }
        if kind == ColumnKind::Float && cell.parse::<f64>().is_err() {
            return ColumnKind::Text;
        }
    }
    if seen { kind } else { ColumnKind::Text }
}

// ============================================================================
// Table
// ============================================================================

#[derive(Debug, Clone)]
pub struct GtfsTable {
    content: GtfsContent,
    headers: csv::StringRecord,
    records: Vec<csv::StringRecord>,
    kinds: Vec<ColumnKind>,
}

impl GtfsTable {
    /// Reads a whole comma-separated file with a header row.
    pub fn read(content: GtfsContent, path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| GtfsError::io(path, e))?;
        Self::parse(content, file, path)
    }

    pub fn from_reader<R: Read>(content: GtfsContent, reader: R) -> Result<Self> {
        Self::parse(content, reader, Path::new(&content.file_name()))
    }

    /// Short rows are padded with empty cells; rows longer than the header
    /// are rejected.
    fn parse<R: Read>(content: GtfsContent, reader: R, origin: &Path) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: csv::StringRecord = rdr
            .headers()
            .map_err(|e| GtfsError::csv(origin, e))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}'))
            .collect();

        let mut records = Vec::new();
        for result in rdr.records() {
            let mut record = result.map_err(|e| GtfsError::csv(origin, e))?;
            if record.len() > headers.len() {
                return Err(GtfsError::TooManyFields {
                    path: origin.to_path_buf(),
                    line: record.position().map_or(0, |p| p.line()),
                    found: record.len(),
                    expected: headers.len(),
                });
            }
            while record.len() < headers.len() {
                record.push_field("");
            }
            records.push(record);
        }
        Ok(Self::from_records(content, headers, records))
    }

    fn from_records(
        content: GtfsContent,
        headers: csv::StringRecord,
        records: Vec<csv::StringRecord>,
    ) -> Self {
        let kinds = (0..headers.len())
            .map(|col| infer_kind(records.iter().map(|r| r.get(col).unwrap_or(""))))
            .collect();
        GtfsTable {
            content,
            headers,
            records,
            kinds,
        }
    }

    pub fn content(&self) -> GtfsContent {
        self.content
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Like `column_index`, but a missing column is an error.
    pub fn require_column(&self, column: &str) -> Result<usize> {
        self.column_index(column)
            .ok_or_else(|| GtfsError::MissingColumn {
                content: self.content,
                column: column.to_string(),
            })
    }

    pub fn kind(&self, column: &str) -> Option<ColumnKind> {
        self.column_index(column).map(|col| self.kinds[col])
    }

    pub fn records(&self) -> impl Iterator<Item = &csv::StringRecord> {
        self.records.iter()
    }

    pub fn raw(&self, row: usize, column: usize) -> Option<&str> {
        self.records.get(row)?.get(column)
    }

    pub fn value(&self, row: usize, column: usize) -> Option<Value> {
        let raw = self.raw(row, column)?;
        Some(Value::parse(raw, self.kinds[column]))
    }

    /// Distinct values of a column in order of first appearance.
    pub fn unique(&self, column: &str) -> Result<Vec<Value>> {
        let col = self.require_column(column)?;
        let kind = self.kinds[col];
        let mut seen = HashSet::new();
        Ok(self
            .records
            .iter()
            .map(|r| Value::parse(r.get(col).unwrap_or(""), kind))
            .filter(|value| seen.insert(value.key()))
            .collect())
    }

    /// Set of raw cell text in a column, for joins between tables.
    pub fn raw_set(&self, column: &str) -> Result<HashSet<String>> {
        let col = self.require_column(column)?;
        Ok(self
            .records
            .iter()
            .filter_map(|r| r.get(col))
            .filter(|raw| !raw.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Keeps the rows the predicate accepts; column types are re-inferred.
    pub fn retain_rows<F>(&self, mut keep: F) -> GtfsTable
    where
        F: FnMut(&csv::StringRecord) -> bool,
    {
        let records = self.records.iter().filter(|r| keep(r)).cloned().collect();
        Self::from_records(self.content, self.headers.clone(), records)
    }

    /// Writes the header and raw records back out as comma-separated text.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path).map_err(|e| GtfsError::csv(path, e))?;
        wtr.write_record(&self.headers)
            .map_err(|e| GtfsError::csv(path, e))?;
        for record in &self.records {
            wtr.write_record(record).map_err(|e| GtfsError::csv(path, e))?;
        }
        wtr.flush().map_err(|e| GtfsError::io(path, e))
    }
}
