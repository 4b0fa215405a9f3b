//! Hybrid fanout output: one extraction pass feeding a CSV file and a
//! SQLite analytical database.

mod common;

use crvs_extract::{
    CheckpointFile, ChunkedExtractor, CsvSink, ExtractConfig, ExtractError, FanoutSink,
    RecordSink, SqliteConnector, SqliteSink,
};

fn quiet_config(chunk_size: usize) -> ExtractConfig {
    ExtractConfig {
        chunk_size,
        progress: false,
        retry_delay_secs: 0,
        ..ExtractConfig::default()
    }
}

#[test]
fn hybrid_extraction_fills_both_destinations_identically() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("source.db");
    common::seed_source_db(&source_path, &(1..=75).collect::<Vec<i64>>());

    let csv_path = dir.path().join("birth_records.csv");
    let db_path = dir.path().join("birth_records.db");
    let sink = FanoutSink::new(vec![
        Box::new(CsvSink::new(&csv_path)) as Box<dyn RecordSink>,
        Box::new(SqliteSink::new(&db_path)),
    ]);
    let checkpoint = CheckpointFile::for_output(&csv_path);
    let connector = SqliteConnector::new(&source_path, common::birth_schema());

    let report = ChunkedExtractor::new(connector, sink, checkpoint, quiet_config(20))
        .run()
        .unwrap();
    assert_eq!(report.total_rows, 75);
    assert_eq!(report.pages, 4);

    let body = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(body.lines().count(), 76, "header plus 75 rows");
    assert!(body.lines().next().unwrap().starts_with("Birth_Reg_ID,"));

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let keys = common::table_keys(&conn, "birth_records");
    assert_eq!(keys, (1..=75).collect::<Vec<i64>>());
}

/// Dirty source text is sanitized before it reaches either destination.
#[test]
fn sanitized_text_lands_in_both_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("source.db");
    // key 5 gets a surname with an embedded CRLF in the fixture
    common::seed_source_db(&source_path, &[5]);

    let csv_path = dir.path().join("birth_records.csv");
    let db_path = dir.path().join("birth_records.db");
    let sink = FanoutSink::new(vec![
        Box::new(CsvSink::new(&csv_path)) as Box<dyn RecordSink>,
        Box::new(SqliteSink::new(&db_path)),
    ]);
    let checkpoint = CheckpointFile::for_output(&csv_path);
    let connector = SqliteConnector::new(&source_path, common::birth_schema());

    ChunkedExtractor::new(connector, sink, checkpoint, quiet_config(10))
        .run()
        .unwrap();

    let body = std::fs::read_to_string(&csv_path).unwrap();
    assert!(body.contains("SUR NAME-5"));

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let surname: String = conn
        .query_row(
            "SELECT child_surname FROM birth_records WHERE Birth_Reg_ID = 5",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(surname, "SUR NAME-5");
}

/// The first sink in the fanout has committed when the second fails; the
/// restart re-feeds that key range and must not duplicate SQLite rows.
#[test]
fn sqlite_redo_after_partial_fanout_failure_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("source.db");
    common::seed_source_db(&source_path, &(1..=30).collect::<Vec<i64>>());

    let db_path = dir.path().join("birth_records.db");
    let connector = SqliteConnector::new(&source_path, common::birth_schema());

    // First run: SQLite commits chunks 1-2, the CSV side dies on chunk 2,
    // so the checkpoint stays at chunk 1.
    struct FailingSink {
        chunks: u32,
    }
    impl RecordSink for FailingSink {
        fn describe(&self) -> String {
            "failing".to_string()
        }
        fn setup(&mut self, _schema: &crvs_extract::RecordSchema) -> crvs_extract::Result<()> {
            Ok(())
        }
        fn write_chunk(&mut self, _rows: &[crvs_extract::CleanRow]) -> crvs_extract::Result<()> {
            self.chunks += 1;
            if self.chunks == 2 {
                return Err(ExtractError::Config("disk full".to_string()));
            }
            Ok(())
        }
        fn flush(&mut self) -> crvs_extract::Result<()> {
            Ok(())
        }
    }

    let checkpoint = CheckpointFile::new(dir.path().join(".resume_state.json"));
    let sink = FanoutSink::new(vec![
        Box::new(SqliteSink::new(&db_path)) as Box<dyn RecordSink>,
        Box::new(FailingSink { chunks: 0 }),
    ]);
    ChunkedExtractor::new(connector.clone(), sink, checkpoint.clone(), quiet_config(10))
        .run()
        .unwrap_err();

    // Keys 11..=20 are in SQLite but behind the checkpoint.
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    assert_eq!(common::table_keys(&conn, "birth_records").len(), 20);
    drop(conn);

    let report = ChunkedExtractor::new(
        connector,
        SqliteSink::new(&db_path),
        checkpoint,
        quiet_config(10),
    )
    .run()
    .unwrap();
    assert_eq!(report.resumed_from, 10);

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let keys = common::table_keys(&conn, "birth_records");
    assert_eq!(keys, (1..=30).collect::<Vec<i64>>(), "redo did not duplicate");
}
