use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::model::MetadataValue;
use crate::error::{FrameError, Result, SelectAxis};

// ---------------------------------------------------------------------------
// MetadataTable – row-labeled, column-named table of metadata cells
// ---------------------------------------------------------------------------

/// Per-spectrum metadata: one row per spectrum, zero or more named columns.
///
/// Storage is column-major; `data[c][r]` is the cell of column `c` in row `r`.
/// Row labels live in `index` and are independent of the wavelength axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableParts")]
pub struct MetadataTable {
    index: Vec<MetadataValue>,
    columns: Vec<String>,
    data: Vec<Vec<MetadataValue>>,
}

/// Unvalidated wire form; deserialisation goes through [`MetadataTable::new`].
#[derive(Deserialize)]
struct TableParts {
    index: Vec<MetadataValue>,
    columns: Vec<String>,
    data: Vec<Vec<MetadataValue>>,
}

impl TryFrom<TableParts> for MetadataTable {
    type Error = FrameError;

    fn try_from(parts: TableParts) -> Result<Self> {
        MetadataTable::new(parts.index, parts.columns, parts.data)
    }
}

/// Default row labels `0..n_rows`.
pub(crate) fn range_index(n_rows: usize) -> Vec<MetadataValue> {
    (0..n_rows).map(MetadataValue::from).collect()
}

impl MetadataTable {
    /// Build a table, checking that every column matches the index length
    /// and that column names and row labels are unique.
    pub fn new(
        index: Vec<MetadataValue>,
        columns: Vec<String>,
        data: Vec<Vec<MetadataValue>>,
    ) -> Result<Self> {
        if columns.len() != data.len() {
            return Err(FrameError::MetadataShape {
                column: format!("<{} names for {} columns>", columns.len(), data.len()),
                expected: columns.len(),
                got: data.len(),
            });
        }
        let mut seen = HashSet::new();
        for (name, values) in columns.iter().zip(&data) {
            if !seen.insert(name.as_str()) {
                return Err(FrameError::DuplicateColumn(name.clone()));
            }
            if values.len() != index.len() {
                return Err(FrameError::MetadataShape {
                    column: name.clone(),
                    expected: index.len(),
                    got: values.len(),
                });
            }
        }
        check_unique_labels(&index)?;
        Ok(Self {
            index,
            columns,
            data,
        })
    }

    /// A table with `n_rows` rows labeled `0..n_rows` and no columns.
    pub fn empty(n_rows: usize) -> Self {
        Self {
            index: range_index(n_rows),
            columns: Vec::new(),
            data: Vec::new(),
        }
    }

    /// One named column with the default index.
    pub fn from_series<V: Into<MetadataValue>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values: Vec<MetadataValue> = values.into_iter().map(Into::into).collect();
        Self {
            index: range_index(values.len()),
            columns: vec![name.into()],
            data: vec![values],
        }
    }

    /// Build from named columns with the default index.
    pub fn from_columns<V: Into<MetadataValue>>(
        columns: impl IntoIterator<Item = (String, Vec<V>)>,
    ) -> Result<Self> {
        let (names, data): (Vec<String>, Vec<Vec<MetadataValue>>) = columns
            .into_iter()
            .map(|(name, values)| (name, values.into_iter().map(Into::into).collect()))
            .unzip();
        let n_rows = data.first().map_or(0, Vec::len);
        Self::new(range_index(n_rows), names, data)
    }

    /// Records-oriented JSON (`[{"group": "A", "conc": 1.5}, ...]`).
    ///
    /// Columns are the sorted union of keys; cells missing from a record are
    /// `Null`. Rows get the default index.
    pub fn from_json_records(root: &JsonValue) -> Result<Self> {
        let records = root
            .as_array()
            .ok_or_else(|| FrameError::InvalidRecords("expected a top-level array".into()))?;

        let mut rows: Vec<&serde_json::Map<String, JsonValue>> = Vec::with_capacity(records.len());
        let mut names: BTreeSet<&str> = BTreeSet::new();
        for (i, rec) in records.iter().enumerate() {
            let obj = rec
                .as_object()
                .ok_or_else(|| FrameError::InvalidRecords(format!("row {i} is not an object")))?;
            names.extend(obj.keys().map(String::as_str));
            rows.push(obj);
        }

        let columns: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        let data = names
            .iter()
            .map(|name| {
                rows.iter()
                    .map(|obj| obj.get(*name).map_or(MetadataValue::Null, MetadataValue::from))
                    .collect()
            })
            .collect();
        Self::new(range_index(rows.len()), columns, data)
    }

    /// Replace the row labels.
    pub fn with_index<V: Into<MetadataValue>>(
        mut self,
        index: impl IntoIterator<Item = V>,
    ) -> Result<Self> {
        let index: Vec<MetadataValue> = index.into_iter().map(Into::into).collect();
        if index.len() != self.n_rows() {
            return Err(FrameError::MetadataRowMismatch {
                expected: self.n_rows(),
                got: index.len(),
            });
        }
        check_unique_labels(&index)?;
        self.index = index;
        Ok(self)
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// `(n_rows, n_cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    pub fn index(&self) -> &[MetadataValue] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values of the named column, in row order.
    pub fn column(&self, name: &str) -> Option<&[MetadataValue]> {
        self.column_position(name).map(|c| self.data[c].as_slice())
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at row position `row` in the named column.
    pub fn get(&self, row: usize, column: &str) -> Option<&MetadataValue> {
        self.column(column).and_then(|values| values.get(row))
    }

    /// One row as `column_name → value`.
    pub fn row(&self, row: usize) -> Option<BTreeMap<String, MetadataValue>> {
        if row >= self.n_rows() {
            return None;
        }
        Some(
            self.columns
                .iter()
                .zip(&self.data)
                .map(|(name, values)| (name.clone(), values[row].clone()))
                .collect(),
        )
    }

    /// For each column the sorted set of unique values.
    pub fn unique_values(&self) -> BTreeMap<String, BTreeSet<MetadataValue>> {
        self.columns
            .iter()
            .zip(&self.data)
            .map(|(name, values)| (name.clone(), values.iter().cloned().collect()))
            .collect()
    }

    /// Row positions whose value in `column` satisfies `pred`, in row order.
    ///
    /// Feed the result to a positional selection to subset a frame by metadata.
    pub fn rows_where(
        &self,
        column: &str,
        pred: impl Fn(&MetadataValue) -> bool,
    ) -> Result<Vec<usize>> {
        let values = self.column(column).ok_or_else(|| FrameError::LabelNotFound {
            axis: SelectAxis::Columns,
            label: column.to_string(),
        })?;
        Ok(values
            .iter()
            .enumerate()
            .filter(|(_, value)| pred(value))
            .map(|(row, _)| row)
            .collect())
    }

    /// New table holding the given row and column positions, in the given order.
    ///
    /// Positions must be in bounds; callers resolve them first.
    pub fn take(&self, rows: &[usize], cols: &[usize]) -> Self {
        Self {
            index: rows.iter().map(|&r| self.index[r].clone()).collect(),
            columns: cols.iter().map(|&c| self.columns[c].clone()).collect(),
            data: cols
                .iter()
                .map(|&c| rows.iter().map(|&r| self.data[c][r].clone()).collect())
                .collect(),
        }
    }
}

fn check_unique_labels(index: &[MetadataValue]) -> Result<()> {
    let mut seen = HashSet::with_capacity(index.len());
    for label in index {
        if !seen.insert(label.label_key()) {
            return Err(FrameError::DuplicateLabel(label.to_string()));
        }
    }
    Ok(())
}
