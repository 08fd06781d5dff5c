//! Result table and progress reporting.

mod csv;
pub mod progress;
mod types;
mod writer;

pub use self::csv::{CsvWriter, write_table};
pub use types::{LabelRow, LabelTable};
pub use writer::OutputWriter;
