//! Shared fixtures for the integration tests.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::path::Path;

use rand::seq::SliceRandom;
use rusqlite::Connection;

use crvs_extract::{FieldValue, RawRow, RecordSchema};

/// Compact slice of the birth-registration columns, enough for every
/// validation rule and report metric.
pub const TEST_COLUMNS: [&str; 17] = [
    "Birth_Reg_ID",
    "Certificate_No",
    "child_surname",
    "child_firstname",
    "child_birth_date",
    "child_sex",
    "mother_surname",
    "mother_firstname",
    "mother_age_at_birth",
    "father_age_at_birth",
    "Date_Registerred",
    "initiated_at",
    "registered_by_nin",
    "registration_center",
    "registration_center_state",
    "registration_center_lga",
    "approval_status_desc",
];

pub fn birth_schema() -> RecordSchema {
    RecordSchema::new("birth_records", "Birth_Reg_ID", TEST_COLUMNS)
}

/// Plausible field values for one registration, derived from the key so
/// rows are distinct but deterministic. Every fifth surname carries
/// embedded control characters to exercise sanitization end to end.
pub fn birth_values(key: i64) -> Vec<String> {
    let day = 1 + (key % 28);
    let surname = if key % 5 == 0 {
        format!("SUR\r\nNAME-{key}")
    } else {
        format!("SURNAME-{key}")
    };
    vec![
        key.to_string(),
        format!("CERT-{key:06}"),
        surname,
        format!("FIRST-{key}"),
        format!("2024-01-{day:02}"),
        if key % 2 == 0 { "MALE" } else { "FEMALE" }.to_string(),
        format!("MSUR-{key}"),
        format!("MFIRST-{key}"),
        (20 + key % 15).to_string(),
        (25 + key % 20).to_string(),
        format!("2024-02-{day:02} 10:00:00"),
        format!("2024-02-{day:02} 10:00:00"),
        format!("NIN-{}", key % 3),
        format!("CENTER-{}", key % 2),
        if key % 2 == 0 { "LAGOS" } else { "KANO" }.to_string(),
        format!("LGA-{}", key % 2),
        if key % 3 == 0 { "Approved" } else { "Pending" }.to_string(),
    ]
}

pub fn birth_raw_row(key: i64) -> RawRow {
    let values = birth_values(key)
        .into_iter()
        .enumerate()
        .map(|(idx, v)| {
            if idx == 0 {
                FieldValue::Int(key)
            } else {
                FieldValue::Text(v)
            }
        })
        .collect();
    RawRow::new(key, values)
}

/// Create a source database holding one registration per key, inserted in
/// shuffled order so tests never rely on insertion order matching key
/// order.
pub fn seed_source_db(path: &Path, keys: &[i64]) {
    let conn = Connection::open(path).unwrap();
    let columns = TEST_COLUMNS
        .iter()
        .map(|c| format!("\"{c}\" TEXT"))
        .collect::<Vec<_>>()
        .join(", ");
    conn.execute_batch(&format!(
        "CREATE TABLE birth_records ({})",
        columns.replacen("\"Birth_Reg_ID\" TEXT", "\"Birth_Reg_ID\" INTEGER PRIMARY KEY", 1)
    ))
    .unwrap();

    let mut shuffled = keys.to_vec();
    shuffled.shuffle(&mut rand::rng());

    let placeholders = (1..=TEST_COLUMNS.len())
        .map(|n| format!("?{n}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("INSERT INTO birth_records VALUES ({placeholders})");
    let mut stmt = conn.prepare(&sql).unwrap();
    for key in shuffled {
        let values = birth_values(key);
        stmt.execute(rusqlite::params_from_iter(values.iter())).unwrap();
    }
}

/// Keys currently present in an analytical table, ascending.
pub fn table_keys(conn: &Connection, table: &str) -> Vec<i64> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT \"Birth_Reg_ID\" FROM \"{table}\" ORDER BY \"Birth_Reg_ID\""
        ))
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<i64>, _>>()
        .unwrap()
}
