// End-to-end view building over fixture table directories.
mod common;

use colmap::api::{
    ColumnData, ErrorKind, LocalClient, PartitionBy, RejectPolicy, RowIndex, Scalar, Table,
    TableRef, ValidationStatus, ViewMode, ViewRequest,
};
use colmap::core::validate::validate_table_state;
use common::{
    INT, OCT_01, OCT_02, column, day_table, day_table_ints, day_table_timestamps, metadata,
    none_table, transaction, write_column, write_table_files, write_txn,
};

fn client(data_root: &std::path::Path) -> LocalClient {
    LocalClient::new().with_data_root(data_root)
}

fn ints(data: &ColumnData) -> Vec<i32> {
    match data {
        ColumnData::I32(buf) => buf.to_vec(),
        other => panic!("expected INT column, got {:?}", other.column_type().name),
    }
}

fn doubles(data: &ColumnData) -> Vec<f64> {
    match data {
        ColumnData::F64(buf) => buf.to_vec(),
        other => panic!("expected DOUBLE column, got {:?}", other.column_type().name),
    }
}

fn weather_request() -> ViewRequest {
    ViewRequest::new()
        .column("ts", "TIMESTAMP")
        .column("double", "DOUBLE")
        .column("int", "INT")
}

#[test]
fn day_partitions_produce_one_view_each() {
    let temp = tempfile::tempdir().expect("tempdir");
    day_table(temp.path());
    let table = client(temp.path())
        .open_table(&TableRef::name("weather"))
        .expect("open");
    assert_eq!(table.row_count(), 7);

    let views = table.views(&weather_request()).expect("views");
    assert_eq!(views.len(), 3);
    let rows: Vec<usize> = views.iter().map(|view| view.row_count()).collect();
    assert_eq!(rows, [4, 2, 1]);
    assert_eq!(rows.iter().sum::<usize>(), 7);

    let names: Vec<&str> = views
        .iter()
        .map(|view| view.partition().map(|p| p.name.as_str()).unwrap_or(""))
        .collect();
    assert_eq!(names, ["2021-09-29", "2021-10-01", "2021-10-02"]);

    let mut all_ints = Vec::new();
    let mut all_stamps = Vec::new();
    for view in &views {
        let columns: Vec<&str> = view.column_names().collect();
        assert_eq!(columns, ["int", "double"], "schema order, timestamp excluded");
        assert_eq!(view.index().name(), Some("ts"));
        assert_eq!(view.index().len(), view.row_count());

        let int_values = ints(view.column("int").expect("int"));
        let double_values = doubles(view.column("double").expect("double"));
        for (int, double) in int_values.iter().zip(&double_values) {
            assert_eq!(f64::from(*int) + 0.5, *double);
        }
        all_ints.extend(int_values);
        all_stamps.extend(view.index().to_vec());
        assert!(view.rejected().is_empty());
    }
    assert_eq!(all_ints, day_table_ints());
    assert_eq!(all_stamps, day_table_timestamps());
    assert!(all_stamps.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn last_partition_maps_only_committed_rows() {
    let temp = tempfile::tempdir().expect("tempdir");
    day_table(temp.path());
    let table = client(temp.path())
        .open_table(&TableRef::name("weather"))
        .expect("open");
    let views = table
        .views(&ViewRequest::new().column("int", "INT"))
        .expect("views");
    let last = views.last().expect("last view");
    assert_eq!(ints(last.column("int").expect("int")), vec![7]);
}

#[test]
fn mapped_bytes_match_file_bytes() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = day_table(temp.path());
    let table = Table::open(&root, Default::default()).expect("open");
    let views = table
        .views(&ViewRequest::new().column("double", "double"))
        .expect("views");

    let on_disk = std::fs::read(root.join("2021-09-29").join("double.d")).expect("read");
    let mapped = views[0].column("double").expect("double").as_bytes();
    assert_eq!(mapped, on_disk.as_slice());
}

#[test]
fn concatenated_view_spans_the_table() {
    let temp = tempfile::tempdir().expect("tempdir");
    day_table(temp.path());
    let table = client(temp.path())
        .open_table(&TableRef::name("weather"))
        .expect("open");
    let request = weather_request().with_mode(ViewMode::Concatenated);
    let views = table.views(&request).expect("views");

    assert_eq!(views.len(), 1);
    let view = &views[0];
    assert!(view.partition().is_none());
    assert_eq!(view.row_count(), 7);
    assert_eq!(ints(view.column("int").expect("int")), day_table_ints());
    assert_eq!(view.index().to_vec(), day_table_timestamps());
}

#[test]
fn unpartitioned_table_without_timestamp_uses_dense_index() {
    let temp = tempfile::tempdir().expect("tempdir");
    none_table(temp.path());
    let table = client(temp.path())
        .open_table(&TableRef::name("plain"))
        .expect("open");
    let views = table
        .views(&ViewRequest::new().column("id", "LONG").column("flag", "BOOLEAN"))
        .expect("views");

    assert_eq!(views.len(), 1);
    let view = &views[0];
    assert_eq!(view.partition().map(|p| p.name.as_str()), Some("default"));
    assert!(matches!(view.index(), RowIndex::Range { start: 0, len: 5 }));
    assert_eq!(view.index().to_vec(), vec![0, 1, 2, 3, 4]);

    let id = view.column("id").expect("id");
    assert_eq!(id.null_count(), 1);
    assert_eq!(id.scalar(2), Some(Scalar::Null));
    assert_eq!(id.scalar(4), Some(Scalar::Int(50)));
    let flag = view.column("flag").expect("flag");
    assert_eq!(flag.scalar(0), Some(Scalar::Bool(true)));
    assert_eq!(flag.scalar(1), Some(Scalar::Bool(false)));
}

#[test]
fn type_mismatch_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    day_table(temp.path());
    let table = client(temp.path())
        .open_table(&TableRef::name("weather"))
        .expect("open");

    let request = ViewRequest::new().column("int", "LONG").column("double", "DOUBLE");
    let err = table.views(&request).expect_err("mismatch");
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(err.column(), Some("int"));

    let views = table
        .views(&request.with_reject_policy(RejectPolicy::Skip))
        .expect("views");
    for view in &views {
        assert_eq!(view.column_names().collect::<Vec<_>>(), ["double"]);
        assert_eq!(view.rejected().len(), 1);
        assert_eq!(view.rejected()[0].name, "int");
        assert_eq!(view.rejected()[0].kind, ErrorKind::TypeMismatch);
    }
}

#[test]
fn variable_width_columns_are_unsupported() {
    let temp = tempfile::tempdir().expect("tempdir");
    none_table(temp.path());
    let table = client(temp.path())
        .open_table(&TableRef::name("plain"))
        .expect("open");

    let request = ViewRequest::new().column("label", "STRING").column("id", "LONG");
    let err = table.views(&request).expect_err("unsupported");
    assert_eq!(err.kind(), ErrorKind::UnsupportedType);

    let views = table
        .views(&request.with_reject_policy(RejectPolicy::Skip))
        .expect("views");
    assert_eq!(views[0].column_names().collect::<Vec<_>>(), ["id"]);
    assert_eq!(views[0].rejected()[0].kind, ErrorKind::UnsupportedType);
}

#[test]
fn unknown_type_names_are_usage_errors() {
    let temp = tempfile::tempdir().expect("tempdir");
    none_table(temp.path());
    let table = client(temp.path())
        .open_table(&TableRef::name("plain"))
        .expect("open");
    let request = ViewRequest::new()
        .column("id", "DECIMAL")
        .with_reject_policy(RejectPolicy::Skip);
    assert_eq!(table.views(&request).unwrap_err().kind(), ErrorKind::Usage);
}

#[test]
fn names_missing_from_schema_are_skipped() {
    let temp = tempfile::tempdir().expect("tempdir");
    none_table(temp.path());
    let table = client(temp.path())
        .open_table(&TableRef::name("plain"))
        .expect("open");
    let views = table
        .views(&ViewRequest::new().column("nope", "INT").column("id", "LONG"))
        .expect("views");
    assert_eq!(views[0].column_names().collect::<Vec<_>>(), ["id"]);
    assert!(views[0].rejected().is_empty());
}

#[test]
fn missing_column_file_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = day_table(temp.path());
    std::fs::remove_file(root.join("2021-10-01").join("int.d")).expect("remove");
    let table = client(temp.path())
        .open_table(&TableRef::name("weather"))
        .expect("open");

    let err = table
        .views(&ViewRequest::new().column("int", "INT"))
        .expect_err("missing");
    assert_eq!(err.kind(), ErrorKind::ColumnFileMissing);
    assert_eq!(err.column(), Some("int"));
    assert!(err.path().is_some_and(|path| path.ends_with("2021-10-01/int.d")));
}

#[test]
fn short_column_file_is_corrupt() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = day_table(temp.path());
    write_column(&root.join("2021-09-29"), "int", &[1i32, 2]);
    let table = client(temp.path())
        .open_table(&TableRef::name("weather"))
        .expect("open");
    let err = table
        .views(&ViewRequest::new().column("int", "INT"))
        .expect_err("short");
    assert_eq!(err.kind(), ErrorKind::Corrupt);
}

#[test]
fn caller_index_overrides_timestamp() {
    let temp = tempfile::tempdir().expect("tempdir");
    day_table(temp.path());
    let table = client(temp.path())
        .open_table(&TableRef::name("weather"))
        .expect("open");
    let index: Vec<i64> = (100..107).collect();
    let views = table
        .views(&weather_request().with_index(index.clone()))
        .expect("views");

    let mut seen = Vec::new();
    for view in &views {
        assert!(matches!(view.index(), RowIndex::Custom { .. }));
        assert_eq!(view.column_names().collect::<Vec<_>>(), ["int", "double", "ts"]);
        seen.extend(view.index().to_vec());
    }
    assert_eq!(seen, index);

    let err = table
        .views(&weather_request().with_index(vec![1, 2, 3]))
        .expect_err("length");
    assert_eq!(err.kind(), ErrorKind::Usage);
}

#[test]
fn concatenated_view_takes_whole_caller_index() {
    let temp = tempfile::tempdir().expect("tempdir");
    day_table(temp.path());
    let table = client(temp.path())
        .open_table(&TableRef::name("weather"))
        .expect("open");
    let index: Vec<i64> = (0..7).map(|row| 1_000 - row).collect();
    let request = weather_request()
        .with_mode(ViewMode::Concatenated)
        .with_index(index.clone());
    let views = table.views(&request).expect("views");

    assert_eq!(views.len(), 1);
    let view = &views[0];
    assert!(matches!(view.index(), RowIndex::Custom { start: 0, len: 7, .. }));
    assert_eq!(view.index().to_vec(), index);
    assert_eq!(view.column_names().collect::<Vec<_>>(), ["int", "double", "ts"]);
    assert_eq!(ints(view.column("int").expect("int")), day_table_ints());
}

#[test]
fn timestamp_not_requested_means_dense_index() {
    let temp = tempfile::tempdir().expect("tempdir");
    day_table(temp.path());
    let table = client(temp.path())
        .open_table(&TableRef::name("weather"))
        .expect("open");
    let views = table
        .views(&ViewRequest::new().column("int", "INT"))
        .expect("views");
    assert_eq!(views[1].index().to_vec(), vec![0, 1]);
    assert_eq!(views[1].index().name(), None);
}

#[test]
fn generation_suffix_selects_directory() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("gen");
    let meta = metadata(PartitionBy::Day, None, vec![column("v", INT)]);
    write_table_files(&root, &meta, &transaction(&[(OCT_01, 2, 3)]));
    write_column(&root.join("2021-10-01.3"), "v", &[11i32, 12]);

    let table = client(temp.path())
        .open_table(&TableRef::name("gen"))
        .expect("open");
    assert_eq!(table.partitions()[0].name, "2021-10-01.3");
    let views = table.views(&ViewRequest::new().column("v", "INT")).expect("views");
    assert_eq!(ints(views[0].column("v").expect("v")), vec![11, 12]);
}

#[test]
fn refresh_observes_new_commits() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = day_table(temp.path());
    let table = Table::open(&root, Default::default()).expect("open");
    assert_eq!(table.row_count(), 7);

    let mut txn = table.transaction().clone();
    txn.transient_row_count = 2;
    txn.txn_id += 1;
    write_txn(&root, &txn);

    let refreshed = table.refresh().expect("refresh");
    assert_eq!(refreshed.row_count(), 8);
    assert_eq!(table.row_count(), 7, "old snapshot is unchanged");
    let views = refreshed
        .views(&ViewRequest::new().column("int", "INT"))
        .expect("views");
    assert_eq!(ints(views[2].column("int").expect("int")), vec![7, 99]);
}

#[test]
fn doctor_reports_healthy_and_broken_tables() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = day_table(temp.path());
    let client = client(temp.path());

    let report = client.validate_table(&TableRef::name("weather")).expect("report");
    assert_eq!(report.status, ValidationStatus::Ok);
    let table = client.open_table(&TableRef::name("weather")).expect("open");
    validate_table_state(&table).expect("consistent");
    assert_eq!(report.row_count, Some(7));
    assert_eq!(report.partition_count, Some(3));

    std::fs::remove_dir_all(root.join("2021-10-01")).expect("remove partition");
    let report = client.validate_table(&TableRef::name("weather")).expect("report");
    assert_eq!(report.status, ValidationStatus::Corrupt);
    assert_eq!(report.issues[0].code, "partition_dir_missing");

    let err = validate_table_state(&table.refresh().expect("refresh")).expect_err("missing dir");
    assert_eq!(err.kind(), ErrorKind::Corrupt);
    assert!(err.path().is_some_and(|path| path.ends_with("2021-10-01")));
}

#[test]
fn doctor_flags_commit_log_inconsistencies() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = day_table(temp.path());
    let table = Table::open(&root, Default::default()).expect("open");
    let mut txn = table.transaction().clone();
    txn.fixed_row_count = 5;
    txn.partitions.swap(0, 1);
    write_txn(&root, &txn);

    let report = client(temp.path())
        .validate_table(&TableRef::name("weather"))
        .expect("report");
    let codes: Vec<&str> = report.issues.iter().map(|issue| issue.code.as_str()).collect();
    assert!(codes.contains(&"partition_order"), "{codes:?}");
    assert!(codes.contains(&"fixed_row_count"), "{codes:?}");
}

#[test]
fn doctor_reports_sizes_too_large_to_map() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("huge");
    let meta = metadata(PartitionBy::Day, None, vec![column("v", INT)]);
    write_table_files(&root, &meta, &transaction(&[(OCT_01, i64::MAX, -1), (OCT_02, 1, -1)]));
    write_column(&root.join("2021-10-01"), "v", &[1i32, 2]);

    let report = client(temp.path())
        .validate_table(&TableRef::name("huge"))
        .expect("report");
    assert_eq!(report.status, ValidationStatus::Corrupt);
    let codes: Vec<&str> = report.issues.iter().map(|issue| issue.code.as_str()).collect();
    assert!(codes.contains(&"row_count_overflow"), "{codes:?}");
    assert!(codes.contains(&"partition_dir_missing"), "{codes:?}");
}

#[test]
fn overflowing_commit_counts_are_corrupt() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = none_table(temp.path());
    let mut txn = transaction(&[]);
    txn.transient_row_count = 1;
    txn.fixed_row_count = i64::MAX;
    write_txn(&root, &txn);

    let err = Table::open(&root, Default::default()).expect_err("overflow");
    assert_eq!(err.kind(), ErrorKind::Corrupt);

    let report = client(temp.path())
        .validate_table(&TableRef::name("plain"))
        .expect("report");
    assert_eq!(report.status, ValidationStatus::Corrupt);
    assert_eq!(report.issues[0].code, "decode");
}

#[test]
fn doctor_turns_decode_failures_into_reports() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = day_table(temp.path());
    std::fs::write(root.join("_txn"), [0u8; 16]).expect("truncate");

    let report = client(temp.path())
        .validate_table(&TableRef::name("weather"))
        .expect("report");
    assert_eq!(report.status, ValidationStatus::Corrupt);
    assert_eq!(report.issues[0].code, "decode");
}
