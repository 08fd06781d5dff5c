//! Result table types.

/// Labels predicted for one clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRow {
    /// Identifier derived from the clip's file name.
    pub row_id: String,
    /// Class names at or above the threshold, in class-index order.
    pub birds: Vec<String>,
}

impl LabelRow {
    /// Create a row.
    pub fn new(row_id: impl Into<String>, birds: Vec<String>) -> Self {
        Self {
            row_id: row_id.into(),
            birds,
        }
    }

    /// `birds` as a Python list literal, e.g. `['a', 'b']` or `[]`.
    pub fn birds_literal(&self) -> String {
        let items: Vec<String> = self
            .birds
            .iter()
            .map(|b| format!("'{}'", b.replace('\\', "\\\\").replace('\'', "\\'")))
            .collect();
        format!("[{}]", items.join(", "))
    }
}

/// Rows in clip processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    rows: Vec<LabelRow>,
}

impl LabelTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row.
    pub fn push(&mut self, row: LabelRow) {
        self.rows.push(row);
    }

    /// All rows.
    pub fn rows(&self) -> &[LabelRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total number of labels across all rows.
    pub fn label_count(&self) -> usize {
        self.rows.iter().map(|r| r.birds.len()).sum()
    }
}

impl FromIterator<LabelRow> for LabelTable {
    fn from_iter<I: IntoIterator<Item = LabelRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
