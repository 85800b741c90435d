//! Purpose: Assemble mapped columns into per-partition or whole-table views.
//! Exports: `ViewRequest`, `ViewMode`, `RejectPolicy`, `RejectedColumn`, `RowIndex`,
//! `ColumnarTableView`, `build_views`.
//! Role: The only place that decides which files get mapped for a request.
//! Invariants: Columns appear in schema order, never request order.
//! Invariants: Every view's columns and index have the same length.
//! Invariants: A caller index must cover exactly the table's row count.
use std::sync::Arc;

use crate::core::column::{ColumnBuffer, ColumnData, concat_columns, map_column_file};
use crate::core::error::{Error, ErrorKind};
use crate::core::format::COLUMN_FILE_SUFFIX;
use crate::core::meta::ColumnMeta;
use crate::core::partition::LogicalPartition;
use crate::core::table::Table;
use crate::core::types::{self, ColumnType, Repr};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ViewMode {
    #[default]
    PerPartition,
    Concatenated,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RejectPolicy {
    #[default]
    Fail,
    Skip,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnRequest {
    pub name: String,
    pub expected_type: String,
}

impl ColumnRequest {
    /// Parses `name:TYPE`; the last `:` splits so names may contain colons.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let (name, expected_type) = raw.rsplit_once(':').ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("column request '{raw}' is not NAME:TYPE"))
                .with_hint("Use --column price:DOUBLE (type names are case-insensitive).")
        })?;
        if name.is_empty() || expected_type.trim().is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("column request '{raw}' has an empty name or type")));
        }
        Ok(Self {
            name: name.to_string(),
            expected_type: expected_type.trim().to_string(),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct ViewRequest {
    columns: Vec<ColumnRequest>,
    mode: ViewMode,
    index: Option<Arc<[i64]>>,
    reject_policy: RejectPolicy,
}

impl ViewRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, name: impl Into<String>, expected_type: impl Into<String>) -> Self {
        self.columns.push(ColumnRequest {
            name: name.into(),
            expected_type: expected_type.into(),
        });
        self
    }

    pub fn with_columns(mut self, columns: impl IntoIterator<Item = ColumnRequest>) -> Self {
        self.columns.extend(columns);
        self
    }

    pub fn with_mode(mut self, mode: ViewMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_index(mut self, index: Vec<i64>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_reject_policy(mut self, policy: RejectPolicy) -> Self {
        self.reject_policy = policy;
        self
    }

    pub fn columns(&self) -> &[ColumnRequest] {
        &self.columns
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn reject_policy(&self) -> RejectPolicy {
        self.reject_policy
    }

    fn requested(&self, name: &str) -> Option<&ColumnRequest> {
        self.columns.iter().find(|request| request.name == name)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RejectedColumn {
    pub name: String,
    pub kind: ErrorKind,
    pub reason: String,
}

#[derive(Debug)]
pub enum RowIndex {
    /// The designated timestamp column, mapped like any other column.
    Timestamp { name: String, values: ColumnBuffer<i64> },
    /// Dense `start..start + len`.
    Range { start: i64, len: usize },
    /// A window into caller-supplied values.
    Custom {
        values: Arc<[i64]>,
        start: usize,
        len: usize,
    },
}

impl RowIndex {
    pub fn len(&self) -> usize {
        match self {
            RowIndex::Timestamp { values, .. } => values.len(),
            RowIndex::Range { len, .. } | RowIndex::Custom { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timestamp column name when the index is the designated timestamp.
    pub fn name(&self) -> Option<&str> {
        match self {
            RowIndex::Timestamp { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn get(&self, row: usize) -> Option<i64> {
        if row >= self.len() {
            return None;
        }
        match self {
            RowIndex::Timestamp { values, .. } => values.get(row),
            RowIndex::Range { start, .. } => Some(start + row as i64),
            RowIndex::Custom { values, start, .. } => values.get(start + row).copied(),
        }
    }

    pub fn to_vec(&self) -> Vec<i64> {
        (0..self.len()).filter_map(|row| self.get(row)).collect()
    }
}

#[derive(Debug)]
pub struct ColumnarTableView {
    partition: Option<LogicalPartition>,
    row_count: usize,
    columns: Vec<(String, ColumnData)>,
    index: RowIndex,
    rejected: Vec<RejectedColumn>,
}

impl ColumnarTableView {
    /// `None` for a concatenated whole-table view.
    pub fn partition(&self) -> Option<&LogicalPartition> {
        self.partition.as_ref()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn columns(&self) -> &[(String, ColumnData)] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, data)| data)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn index(&self) -> &RowIndex {
        &self.index
    }

    pub fn rejected(&self) -> &[RejectedColumn] {
        &self.rejected
    }
}

struct Selection<'a> {
    columns: Vec<&'a ColumnMeta>,
    index_column: Option<&'a ColumnMeta>,
    rejected: Vec<RejectedColumn>,
}

pub fn build_views(table: &Table, request: &ViewRequest) -> Result<Vec<ColumnarTableView>, Error> {
    let total_rows = table.row_count();
    if let Some(index) = &request.index {
        if index.len() != total_rows {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!(
                    "index has {} values but the table has {total_rows} rows",
                    index.len()
                ))
                .with_path(table.root()));
        }
    }

    let selection = select_columns(table, request)?;
    let partitions = table.partitions();

    let views = match request.mode {
        ViewMode::PerPartition => {
            let mut views = Vec::with_capacity(partitions.len());
            for partition in partitions {
                views.push(partition_view(partition, &selection, request)?);
            }
            views
        }
        ViewMode::Concatenated => vec![concatenated_view(partitions, total_rows, &selection, request)?],
    };
    tracing::debug!(
        views = views.len(),
        columns = selection.columns.len(),
        rejected = selection.rejected.len(),
        rows = total_rows,
        "built columnar views"
    );
    Ok(views)
}

fn select_columns<'a>(table: &'a Table, request: &ViewRequest) -> Result<Selection<'a>, Error> {
    let meta = table.metadata();
    for wanted in &request.columns {
        if meta.column_index(&wanted.name).is_none() {
            tracing::warn!(column = %wanted.name, "requested column is not in the table schema");
        }
    }

    let mut selected = Vec::new();
    let mut rejected = Vec::new();
    for column in &meta.columns {
        let Some(wanted) = request.requested(&column.name) else {
            continue;
        };
        match check_column(column, wanted) {
            Ok(()) => selected.push(column),
            Err(err) if request.reject_policy == RejectPolicy::Skip && is_rejection(&err) => {
                tracing::warn!(column = %column.name, error = %err, "skipping rejected column");
                rejected.push(RejectedColumn {
                    name: column.name.clone(),
                    kind: err.kind(),
                    reason: err.message().unwrap_or_default().to_string(),
                });
            }
            Err(err) => return Err(err.with_path(table.root())),
        }
    }

    let index_column = match (&request.index, meta.timestamp_column()) {
        (None, Some(ts)) if ts.column_type().repr == Repr::I64 => selected
            .iter()
            .position(|column| column.name == ts.name)
            .map(|at| selected.remove(at)),
        _ => None,
    };

    Ok(Selection {
        columns: selected,
        index_column,
        rejected,
    })
}

fn is_rejection(err: &Error) -> bool {
    matches!(err.kind(), ErrorKind::TypeMismatch | ErrorKind::UnsupportedType)
}

fn check_column(column: &ColumnMeta, wanted: &ColumnRequest) -> Result<(), Error> {
    let expected = types::from_name(&wanted.expected_type).ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("unknown type name '{}'", wanted.expected_type))
            .with_column(&column.name)
    })?;
    let actual = column.column_type();
    if expected.id != actual.id {
        return Err(Error::new(ErrorKind::TypeMismatch)
            .with_message(format!("expected {} but column is {}", expected.name, actual.name))
            .with_column(&column.name));
    }
    if !actual.is_zero_copy() {
        return Err(Error::new(ErrorKind::UnsupportedType)
            .with_message(format!("{} columns cannot be memory-mapped", actual.name))
            .with_column(&column.name));
    }
    Ok(())
}

fn map_partition_column(partition: &LogicalPartition, column: &ColumnMeta) -> Result<ColumnData, Error> {
    let column_type: &'static ColumnType = column.column_type();
    if partition.row_count == 0 {
        return ColumnData::empty(column_type);
    }
    let path = partition
        .path
        .join(format!("{}{COLUMN_FILE_SUFFIX}", column.name));
    map_column_file(&path, column_type, partition.row_count).map_err(|err| err.with_column(&column.name))
}

fn timestamp_index(name: &str, data: ColumnData) -> Result<RowIndex, Error> {
    match data {
        ColumnData::I64(values) => Ok(RowIndex::Timestamp {
            name: name.to_string(),
            values,
        }),
        other => Err(Error::new(ErrorKind::Internal)
            .with_message(format!("{} cannot index rows", other.column_type().name))
            .with_column(name)),
    }
}

fn fallback_index(request: &ViewRequest, row_offset: usize, len: usize) -> RowIndex {
    match &request.index {
        Some(values) => RowIndex::Custom {
            values: Arc::clone(values),
            start: row_offset,
            len,
        },
        None => RowIndex::Range { start: 0, len },
    }
}

fn partition_view(
    partition: &LogicalPartition,
    selection: &Selection<'_>,
    request: &ViewRequest,
) -> Result<ColumnarTableView, Error> {
    let mut columns = Vec::with_capacity(selection.columns.len());
    for column in &selection.columns {
        columns.push((column.name.clone(), map_partition_column(partition, column)?));
    }
    let index = match selection.index_column {
        Some(column) => timestamp_index(&column.name, map_partition_column(partition, column)?)?,
        None => fallback_index(request, partition.row_offset, partition.row_count),
    };
    Ok(ColumnarTableView {
        partition: Some(partition.clone()),
        row_count: partition.row_count,
        columns,
        index,
        rejected: selection.rejected.clone(),
    })
}

fn concatenated_column(partitions: &[LogicalPartition], column: &ColumnMeta) -> Result<ColumnData, Error> {
    let mut parts = Vec::with_capacity(partitions.len());
    for partition in partitions {
        parts.push(map_partition_column(partition, column)?);
    }
    concat_columns(column.column_type(), &parts).map_err(|err| err.with_column(&column.name))
}

fn concatenated_view(
    partitions: &[LogicalPartition],
    total_rows: usize,
    selection: &Selection<'_>,
    request: &ViewRequest,
) -> Result<ColumnarTableView, Error> {
    let mut columns = Vec::with_capacity(selection.columns.len());
    for column in &selection.columns {
        columns.push((column.name.clone(), concatenated_column(partitions, column)?));
    }
    let index = match selection.index_column {
        Some(column) => timestamp_index(&column.name, concatenated_column(partitions, column)?)?,
        None => fallback_index(request, 0, total_rows),
    };
    Ok(ColumnarTableView {
        partition: None,
        row_count: total_rows,
        columns,
        index,
        rejected: selection.rejected.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::{ColumnRequest, RowIndex, ViewRequest};
    use crate::core::error::ErrorKind;
    use std::sync::Arc;

    #[test]
    fn column_requests_parse_name_and_type() {
        let request = ColumnRequest::parse("price:double").expect("parse");
        assert_eq!(request.name, "price");
        assert_eq!(request.expected_type, "double");

        let request = ColumnRequest::parse("a:b:INT").expect("parse");
        assert_eq!(request.name, "a:b");

        for bad in ["price", ":INT", "price:", "price: "] {
            let err = ColumnRequest::parse(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Usage, "{bad}");
        }
    }

    #[test]
    fn request_keeps_first_match_per_name() {
        let request = ViewRequest::new().column("x", "INT").column("x", "LONG");
        assert_eq!(request.requested("x").map(|r| r.expected_type.as_str()), Some("INT"));
        assert_eq!(request.columns().len(), 2);
    }

    #[test]
    fn range_and_custom_index_windows() {
        let range = RowIndex::Range { start: 0, len: 3 };
        assert_eq!(range.to_vec(), vec![0, 1, 2]);
        assert_eq!(range.get(3), None);
        assert_eq!(range.name(), None);

        let values: Arc<[i64]> = vec![10, 20, 30, 40].into();
        let window = RowIndex::Custom {
            values,
            start: 1,
            len: 2,
        };
        assert_eq!(window.to_vec(), vec![20, 30]);
        assert_eq!(window.get(2), None);
    }
}
