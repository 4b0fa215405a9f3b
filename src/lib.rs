//! A Rust library for resumable extraction of civil-registration records
//! into CSV and SQLite outputs, with rule-based data-quality validation and
//! registration statistics.
//!
//! The extraction pipeline pulls pages from a record source with keyset
//! pagination, sanitizes each row, deduplicates by primary key and appends
//! the result to one or more sinks, checkpointing after every page so an
//! interrupted run resumes behind the last committed key. Validation
//! compiles a declarative rule registry into row-local verdicts or SQL
//! predicates over the extracted analytical table.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod report;
pub mod sanitize;
pub mod schema;
pub mod sink;
pub mod source;
pub mod utils;
pub mod validate;

// Re-export the most common types for easier use
// Core types
pub use config::ExtractConfig;
pub use error::{ExtractError, Result};
pub use models::{CleanRow, FieldValue, RawRow};

// Extraction pipeline
pub use checkpoint::{CheckpointFile, RESUME_FILE_NAME, ResumeState};
pub use extract::{ChunkedExtractor, ExtractionReport};
pub use sanitize::RowSanitizer;
pub use sink::csv::{CsvSink, CsvStyle};
pub use sink::sqlite::SqliteSink;
pub use sink::{FanoutSink, RecordSink};
pub use source::memory::{MemoryConnector, MemorySource};
pub use source::sqlite::{SqliteConnector, SqliteSource};
pub use source::{RecordSource, SourceConnector};

// Schemas
pub use schema::birth::{BIRTH_COLUMNS, BIRTH_KEY_COLUMN, BIRTH_TABLE_NAME, birth_record_schema};
pub use schema::{Column, ColumnType, RecordSchema};

// Validation and reporting
pub use report::{CenterPerformanceRow, DateRange, MonthlyTrendRow, RegistrationStats};
pub use validate::expr::{EvalContext, RecordView, RuleExpr};
pub use validate::summary::{ErrorSummaryRow, QualityRow};
pub use validate::thresholds::Thresholds;
pub use validate::{QualityVerdict, Rule, RuleCategory, RuleSet};

// Utility functions
pub use utils::{DEFAULT_CHUNK_SIZE, get_chunk_size};
