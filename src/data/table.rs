//! In-memory CSV table.

use crate::error::{PlotlineError, Result};
use csv::StringRecord;
use std::io::Read;
use std::path::Path;
use tracing::{debug, instrument};

/// A header row plus data rows, all held in memory.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl Table {
    /// Build a table from owned values.
    pub fn new<H, R>(headers: H, rows: Vec<R>) -> Self
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let headers = headers.into_iter().collect::<StringRecord>();
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().collect::<StringRecord>())
            .collect();
        Self { headers, rows }
    }

    /// Read a CSV file with a header row.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            PlotlineError::Data(format!("Cannot read dataset {}: {}", path.display(), e))
        })?;
        let table = Self::from_reader(file)?;
        debug!("Loaded {} rows from {}", table.len(), path.display());
        Ok(table)
    }

    /// Read CSV data with a header row from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { headers, rows })
    }

    /// Column names.
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }

    /// Position of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    /// A new table with the same headers and the rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            headers: self.headers.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}
