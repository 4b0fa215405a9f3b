use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{info, warn};

use crvs_extract::{
    CheckpointFile, ChunkedExtractor, CsvSink, ExtractConfig, FanoutSink, RecordSink, Result,
    RuleSet, SqliteConnector, SqliteSink, Thresholds, birth_record_schema, get_chunk_size, report,
    validate::summary,
};

fn main() -> Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Source database and output directory from the environment
    let source_db = std::env::var("CRVS_SOURCE_DB").unwrap_or_else(|_| "births_source.db".into());
    let out_dir = PathBuf::from(std::env::var("CRVS_OUT_DIR").unwrap_or_else(|_| "output".into()));
    if !Path::new(&source_db).exists() {
        warn!("Source database not found: {source_db}");
        return Ok(());
    }

    let schema = birth_record_schema();
    let csv_path = out_dir.join("birth_records.csv");
    let db_path = out_dir.join("birth_records.db");

    // Extract into the hybrid CSV + SQLite destination
    info!("Extracting birth records from: {source_db}");
    let mut config = ExtractConfig::default();
    if let Some(chunk_size) = get_chunk_size() {
        info!("Using chunk size {chunk_size} from CRVS_CHUNK_SIZE");
        config.chunk_size = chunk_size;
    }

    let sink = FanoutSink::new(vec![
        Box::new(CsvSink::new(&csv_path).with_bom(true)) as Box<dyn RecordSink>,
        Box::new(SqliteSink::new(&db_path)),
    ]);
    let checkpoint = CheckpointFile::for_output(&csv_path);
    let connector = SqliteConnector::new(&source_db, schema.clone());

    let start = Instant::now();
    let run = ChunkedExtractor::new(connector, sink, checkpoint, config).run()?;
    info!(
        "Extracted {} rows ({} this run) in {:?}",
        run.total_rows,
        run.rows_this_run,
        start.elapsed()
    );

    // Validate the analytical table
    let thresholds = match std::env::var("CRVS_THRESHOLDS") {
        Ok(path) => {
            info!("Loading validation thresholds from: {path}");
            Thresholds::from_json_file(path)?
        }
        Err(_) => Thresholds::default(),
    };
    let column_names = schema.column_names();
    let rules = RuleSet::with_defaults(&thresholds).for_columns(&column_names);

    let conn = rusqlite::Connection::open(&db_path)?;
    let table = schema.table_name();

    info!("Validation summary by state:");
    for row in summary::run_error_summary(&conn, &rules, table, "registration_center_state")? {
        info!(
            "  {}: {} records, {} with errors, {} clean and approved",
            row.group.as_deref().unwrap_or("(unknown)"),
            row.total_records,
            row.records_with_any_error,
            row.records_clean_and_approved
        );
        for (rule, count) in row.rule_counts.iter().filter(|(_, count)| *count > 0) {
            info!("    {rule}: {count}");
        }
    }

    for row in summary::run_quality(&conn, &rules, table, "registration_center_state")? {
        info!(
            "  {}: error rate {:.2}%, clean approval rate {}",
            row.group.as_deref().unwrap_or("(unknown)"),
            row.error_rate,
            row.clean_approval_rate
                .map_or_else(|| "n/a".to_string(), |rate| format!("{rate:.2}%"))
        );
    }

    // Headline registration statistics
    let stats = report::registration_stats(&conn, table, None)?;
    info!(
        "Registration stats: {} total, {} registrars, {} centers, {} approved, avg delay {} days",
        stats.total_registrations,
        stats.total_registrars,
        stats.total_centers,
        stats.approved_count,
        stats
            .avg_delay
            .map_or_else(|| "n/a".to_string(), |d| format!("{d:.0}"))
    );

    for row in report::monthly_trend(&conn, table, None)? {
        info!(
            "  {}: {} registrations ({} male / {} female), {} approved",
            row.month, row.registrations, row.male_count, row.female_count, row.approved_count
        );
    }

    Ok(())
}
