//! Purpose: JSON serializers for table snapshots, partitions, and mapped views.
//! Exports: `table_info_json`, `partition_json`, `view_json`, `micros_rfc3339`.
//! Role: Keep CLI output envelopes consistent across commands.
//! Invariants: Stable key names; TIMESTAMP/DATE values render as RFC 3339 strings.
//! Invariants: Null sentinels render as JSON `null`.

use colmap::api::{
    ColumnData, ColumnarTableView, LogicalPartition, RowIndex, Scalar, Table, TransactionState,
};
use colmap::core::types;
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub(crate) fn micros_rfc3339(micros: i64) -> Option<String> {
    let at = OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000).ok()?;
    at.format(&Rfc3339).ok()
}

fn millis_rfc3339(millis: i64) -> Option<String> {
    micros_rfc3339(millis.checked_mul(1_000)?)
}

pub(crate) fn table_info_json(table_ref: &str, table: &Table) -> Value {
    let meta = table.metadata();
    let columns = meta
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let column_type = column.column_type();
            json!({
                "index": index,
                "name": column.name,
                "type": column_type.name,
                "type_id": column.type_id,
                "storage_size": column_type.storage_size,
                "mappable": column_type.is_zero_copy(),
                "flags": column.flags,
                "index_block_size": column.index_block_size,
                "designated_timestamp": meta.timestamp_index == Some(index),
            })
        })
        .collect::<Vec<_>>();

    let mut map = Map::new();
    map.insert("name".to_string(), json!(table_ref));
    map.insert("path".to_string(), json!(table.root().display().to_string()));
    map.insert("partition_by".to_string(), json!(meta.partition_by.to_string()));
    map.insert(
        "timestamp_column".to_string(),
        json!(meta.timestamp_column().map(|column| column.name.as_str())),
    );
    map.insert("row_count".to_string(), json!(table.row_count()));
    map.insert("partition_count".to_string(), json!(table.partitions().len()));
    map.insert("schema_version".to_string(), json!(meta.schema_version));
    map.insert("table_id".to_string(), json!(meta.table_id));
    map.insert("max_uncommitted_rows".to_string(), json!(meta.max_uncommitted_rows));
    map.insert("commit_lag".to_string(), json!(meta.commit_lag));
    map.insert("columns".to_string(), Value::Array(columns));
    map.insert("txn".to_string(), txn_json(table.transaction()));
    Value::Object(map)
}

fn txn_json(txn: &TransactionState) -> Value {
    let committed_rows = txn.row_count();
    let has_rows = committed_rows.is_some_and(|rows| rows > 0);
    json!({
        "txn_id": txn.txn_id,
        "row_count": committed_rows,
        "transient_row_count": txn.transient_row_count,
        "fixed_row_count": txn.fixed_row_count,
        "min_timestamp": has_rows.then(|| micros_rfc3339(txn.min_timestamp)).flatten(),
        "max_timestamp": has_rows.then(|| micros_rfc3339(txn.max_timestamp)).flatten(),
        "struct_version": txn.struct_version,
        "data_version": txn.data_version,
        "partition_table_version": txn.partition_table_version,
        "txn_check": txn.txn_check,
        "symbol_count": txn.symbol_count,
    })
}

pub(crate) fn partition_json(partition: &LogicalPartition) -> Value {
    json!({
        "id": partition.id,
        "name": partition.name,
        "path": partition.path.display().to_string(),
        "timestamp": partition.timestamp.and_then(micros_rfc3339),
        "row_offset": partition.row_offset,
        "row_count": partition.row_count,
    })
}

pub(crate) fn view_json(view: &ColumnarTableView, limit: Option<usize>) -> Value {
    let rows = limit.map_or(view.row_count(), |limit| limit.min(view.row_count()));

    let mut columns = Map::new();
    for (name, data) in view.columns() {
        let values = (0..rows)
            .map(|row| scalar_json(data, row))
            .collect::<Vec<_>>();
        columns.insert(name.clone(), Value::Array(values));
    }

    let rejected = view
        .rejected()
        .iter()
        .map(|column| {
            json!({
                "name": column.name,
                "kind": format!("{:?}", column.kind),
                "reason": column.reason,
            })
        })
        .collect::<Vec<_>>();

    json!({
        "partition": view.partition().map(|partition| partition.name.as_str()),
        "row_count": view.row_count(),
        "rows_emitted": rows,
        "index": index_json(view.index(), rows),
        "columns": Value::Object(columns),
        "rejected": rejected,
    })
}

fn index_json(index: &RowIndex, rows: usize) -> Value {
    let (kind, values) = match index {
        RowIndex::Timestamp { .. } => (
            "timestamp",
            (0..rows)
                .map(|row| {
                    index
                        .get(row)
                        .map_or(Value::Null, |micros| json!(micros_rfc3339(micros)))
                })
                .collect::<Vec<_>>(),
        ),
        RowIndex::Range { .. } => ("range", (0..rows).map(|row| json!(index.get(row))).collect()),
        RowIndex::Custom { .. } => ("custom", (0..rows).map(|row| json!(index.get(row))).collect()),
    };
    json!({
        "kind": kind,
        "name": index.name(),
        "values": values,
    })
}

fn scalar_json(data: &ColumnData, row: usize) -> Value {
    let type_id = data.column_type().id;
    match data.scalar(row) {
        None | Some(Scalar::Null) => Value::Null,
        Some(Scalar::Bool(value)) => json!(value),
        Some(Scalar::Int(value)) if type_id == types::TIMESTAMP.id => json!(micros_rfc3339(value)),
        Some(Scalar::Int(value)) if type_id == types::DATE.id => json!(millis_rfc3339(value)),
        Some(Scalar::Int(value)) => json!(value),
        Some(Scalar::Char(unit)) => json!(char::from_u32(u32::from(unit)).map(String::from)),
        Some(Scalar::Float(value)) => json!(value),
    }
}
