//! CSV result table writer.

use crate::constants::output::{BIRDS_COLUMN, ROW_ID_COLUMN};
use crate::error::{Error, Result};
use crate::output::{LabelRow, LabelTable, OutputWriter};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Writes `row_id,birds` rows with `birds` as a Python list literal.
pub struct CsvWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl CsvWriter {
    /// Create (or truncate) the output file.
    pub fn new(path: &Path) -> Result<Self> {
        let writer = csv::Writer::from_path(path).map_err(|source| Error::OutputWrite {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }

    fn write_record(&mut self, record: [&str; 2]) -> Result<()> {
        self.writer
            .write_record(record)
            .map_err(|source| Error::OutputWrite {
                path: self.path.clone(),
                source,
            })
    }
}

impl OutputWriter for CsvWriter {
    fn write_header(&mut self) -> Result<()> {
        self.write_record([ROW_ID_COLUMN, BIRDS_COLUMN])
    }

    fn write_row(&mut self, row: &LabelRow) -> Result<()> {
        let birds = row.birds_literal();
        self.write_record([&row.row_id, &birds])
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Write a whole table to `path` in one go.
pub fn write_table(path: &Path, table: &LabelTable) -> Result<()> {
    let mut writer = CsvWriter::new(path)?;
    writer.write_header()?;
    for row in table.rows() {
        writer.write_row(row)?;
    }
    writer.finalize()
}
