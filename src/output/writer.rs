//! Output writer trait definition.

use crate::error::Result;
use crate::output::LabelRow;

/// Trait for writing the result table.
pub trait OutputWriter {
    /// Write the header row.
    fn write_header(&mut self) -> Result<()>;

    /// Write a single clip's labels.
    fn write_row(&mut self, row: &LabelRow) -> Result<()>;

    /// Flush and close the output.
    fn finalize(&mut self) -> Result<()>;
}
