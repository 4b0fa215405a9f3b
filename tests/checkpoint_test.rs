//! Checkpoint lifecycle across real extraction runs against a SQLite
//! source.

mod common;

use crvs_extract::{
    CheckpointFile, ChunkedExtractor, CsvSink, ExtractConfig, RESUME_FILE_NAME, SqliteConnector,
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
fn checkpoint_is_written_next_to_the_output() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("source.db");
    common::seed_source_db(&source_path, &(1..=40).collect::<Vec<i64>>());

    let csv_path = dir.path().join("out").join("birth_records.csv");
    let checkpoint = CheckpointFile::for_output(&csv_path);
    let connector = SqliteConnector::new(&source_path, common::birth_schema());

    ChunkedExtractor::new(
        connector,
        CsvSink::new(&csv_path),
        checkpoint.clone(),
        quiet_config(16),
    )
    .run()
    .unwrap();

    assert!(dir.path().join("out").join(RESUME_FILE_NAME).exists());
    let state = checkpoint.load(&csv_path.display().to_string());
    assert_eq!(state.last_id, 40);
    assert_eq!(state.total_rows, 40);
    // the recorded output identity is the file path itself
    assert_eq!(state.output_file, csv_path.display().to_string());
}

/// A corrupt checkpoint downgrades to a full re-extraction, which the
/// still-fresh output absorbs without duplication trouble.
#[test]
fn corrupt_checkpoint_restarts_from_scratch() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("source.db");
    common::seed_source_db(&source_path, &(1..=20).collect::<Vec<i64>>());

    let csv_path = dir.path().join("birth_records.csv");
    let checkpoint = CheckpointFile::for_output(&csv_path);
    std::fs::write(checkpoint.path(), "garbage, not json").unwrap();

    let connector = SqliteConnector::new(&source_path, common::birth_schema());
    let report = ChunkedExtractor::new(
        connector,
        CsvSink::new(&csv_path),
        checkpoint,
        quiet_config(8),
    )
    .run()
    .unwrap();

    assert_eq!(report.resumed_from, 0);
    assert_eq!(report.total_rows, 20);
}

#[test]
fn rows_added_behind_the_cursor_are_not_revisited() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("source.db");
    common::seed_source_db(&source_path, &(1..=30).collect::<Vec<i64>>());

    let csv_path = dir.path().join("birth_records.csv");
    let checkpoint = CheckpointFile::for_output(&csv_path);
    let connector = SqliteConnector::new(&source_path, common::birth_schema());

    ChunkedExtractor::new(
        connector.clone(),
        CsvSink::new(&csv_path),
        checkpoint.clone(),
        quiet_config(10),
    )
    .run()
    .unwrap();

    // New registrations land with higher keys; only they are picked up.
    let conn = rusqlite::Connection::open(&source_path).unwrap();
    for key in 31..=35 {
        let values = common::birth_values(key);
        let placeholders = (1..=values.len())
            .map(|n| format!("?{n}"))
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute(
            &format!("INSERT INTO birth_records VALUES ({placeholders})"),
            rusqlite::params_from_iter(values.iter()),
        )
        .unwrap();
    }

    let report = ChunkedExtractor::new(
        connector,
        CsvSink::new(&csv_path),
        checkpoint,
        quiet_config(10),
    )
    .run()
    .unwrap();

    assert_eq!(report.resumed_from, 30);
    assert_eq!(report.rows_this_run, 5);
    assert_eq!(report.total_rows, 35);

    let body = std::fs::read_to_string(&csv_path).unwrap();
    // header + 35 data rows
    assert_eq!(body.lines().count(), 36);
}
