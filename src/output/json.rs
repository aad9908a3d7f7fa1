use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};

use crate::db::models::ResultTable;
use crate::load::LoadStats;

/// Pretty-print any serializable value as JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `{"sql", "total", "movies": [{column: value}, ...]}`
pub fn query_payload(sql: &str, table: &ResultTable) -> Value {
    json!({
        "sql": sql,
        "total": table.len(),
        "movies": table.to_records(),
    })
}

pub fn load_payload(stats: &[LoadStats], dry_run: bool) -> Value {
    let rows: usize = stats.iter().map(|s| s.rows).sum();
    let skipped: usize = stats.iter().map(|s| s.skipped).sum();
    json!({
        "dry_run": dry_run,
        "rows": rows,
        "skipped": skipped,
        "files": stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_payload_keys_rows_by_column() {
        let table = ResultTable {
            columns: vec!["title".into(), "year".into()],
            rows: vec![vec![json!("Heat"), json!(1995)]],
        };
        let payload = query_payload("SELECT 1", &table);
        assert_eq!(payload["total"], 1);
        assert_eq!(payload["movies"][0]["title"], "Heat");
        assert_eq!(payload["movies"][0]["year"], 1995);
    }

    #[test]
    fn test_load_payload_sums_files() {
        let stats = vec![
            LoadStats {
                file: "movies.dat".into(),
                table: "movies".into(),
                rows: 10,
                skipped: 1,
            },
            LoadStats {
                file: "tags.dat".into(),
                table: "tags".into(),
                rows: 5,
                skipped: 0,
            },
        ];
        let payload = load_payload(&stats, true);
        assert_eq!(payload["rows"], 15);
        assert_eq!(payload["skipped"], 1);
        assert_eq!(payload["files"][1]["table"], "tags");
    }
}
