pub mod migrations;
pub mod models;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::MvqError;
use models::*;

pub struct Database {
    pub conn: Connection,
    pub path: PathBuf,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // Performance pragmas
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;",
        )?;

        Self::init(conn, path.to_path_buf())
    }

    /// Throwaway database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, path: PathBuf) -> Result<Self> {
        schema::create_schema(&conn)?;
        migrations::run_migrations(&conn)?;

        info!("Opened database: {}", path.display());

        Ok(Database { conn, path })
    }

    /// Default database path: ~/.mvq/mvq.db
    pub fn default_db_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".mvq").join("mvq.db"))
    }

    /// Column names of a table in declaration order. Empty if the table does not exist.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let rows = stmt.query_map([table], |row| row.get(0))?;
        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }

    /// Replace the contents of `table` with `rows`, in one transaction.
    ///
    /// Rows are inserted positionally; `None` cells become NULL.
    pub fn replace_rows(
        &self,
        table: &str,
        column_count: usize,
        rows: &[Vec<Option<String>>],
    ) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(&format!("DELETE FROM {table}"), [])
            .with_context(|| format!("Failed to clear table {table}"))?;

        let placeholders: Vec<String> = (1..=column_count).map(|i| format!("?{i}")).collect();
        let sql = format!("INSERT INTO {table} VALUES ({})", placeholders.join(", "));

        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                stmt.execute(rusqlite::params_from_iter(row.iter()))?;
            }
        }

        tx.commit()?;
        debug!("Inserted {} rows into {table}", rows.len());
        Ok(rows.len())
    }

    /// Sorted distinct values of a pick-list column.
    pub fn distinct_values(&self, lookup: Lookup) -> Result<Vec<String>> {
        let (table, column) = lookup.source();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT {column} FROM {table} WHERE {column} IS NOT NULL ORDER BY {column} ASC"
        ))?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }
        Ok(values)
    }

    /// Execute a statement and collect every row before returning.
    pub fn run_query(&self, sql: &str) -> Result<ResultTable, MvqError> {
        let mut stmt = self.conn.prepare(sql).map_err(MvqError::query)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut rows = stmt.query([]).map_err(MvqError::query)?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next().map_err(MvqError::query)? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                let value = row.get_ref(i).map_err(MvqError::query)?;
                cells.push(json_value(value));
            }
            collected.push(cells);
        }

        debug!("Query returned {} rows", collected.len());
        Ok(ResultTable {
            columns,
            rows: collected,
        })
    }

    /// Row counts per movie table.
    pub fn stats(&self) -> Result<DbStats> {
        let mut tables = Vec::new();
        for table in schema::TABLES {
            let rows: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
            tables.push(TableCount {
                table: table.to_string(),
                rows,
            });
        }

        let db_size_bytes = std::fs::metadata(&self.path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(DbStats {
            tables,
            db_size_bytes,
        })
    }

    pub fn schema_version(&self) -> Result<Option<String>> {
        let version = self
            .conn
            .query_row(
                "SELECT value FROM mvq_meta WHERE key = 'schema_version'",
                [],
                |r| r.get(0),
            )
            .optional()?;
        Ok(version)
    }
}

fn json_value(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Value::from(f),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::String(format!("<{} bytes>", b.len())),
    }
}

use rusqlite::OptionalExtension;

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.replace_rows(
            "movie_genres",
            2,
            &[
                vec![Some("1".into()), Some("Drama".into())],
                vec![Some("2".into()), Some("Comedy".into())],
                vec![Some("3".into()), Some("Drama".into())],
            ],
        )
        .unwrap();
        db
    }

    #[test]
    fn test_table_columns_in_declaration_order() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(
            db.table_columns("user_ratedmovies").unwrap(),
            vec!["user_id", "movie_id", "rating", "ts"]
        );
        assert!(db.table_columns("user_ratings").unwrap().is_empty());
    }

    #[test]
    fn test_replace_rows_clears_previous_contents() {
        let db = seeded();
        db.replace_rows("movie_genres", 2, &[vec![Some("9".into()), Some("War".into())]])
            .unwrap();
        assert_eq!(db.distinct_values(Lookup::Genres).unwrap(), vec!["War"]);
    }

    #[test]
    fn test_distinct_values_sorted_and_unique() {
        let db = seeded();
        assert_eq!(
            db.distinct_values(Lookup::Genres).unwrap(),
            vec!["Comedy", "Drama"]
        );
    }

    #[test]
    fn test_null_cells_are_inserted_as_null() {
        let db = Database::open_in_memory().unwrap();
        db.replace_rows("movie_countries", 2, &[vec![Some("1".into()), None]])
            .unwrap();
        let t = db.run_query("SELECT movie_id, country FROM movie_countries").unwrap();
        assert_eq!(t.rows[0][1], serde_json::Value::Null);
    }

    #[test]
    fn test_run_query_reports_engine_error() {
        let db = Database::open_in_memory().unwrap();
        let err = db.run_query("SELECT * FROM no_such_table").unwrap_err();
        match &err {
            MvqError::Query { message, code, .. } => {
                assert!(message.contains("no_such_table"));
                assert!(code.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_stats_counts_every_table() {
        let db = seeded();
        let stats = db.stats().unwrap();
        assert_eq!(stats.tables.len(), schema::TABLES.len());
        let genres = stats.tables.iter().find(|t| t.table == "movie_genres").unwrap();
        assert_eq!(genres.rows, 3);
        assert_eq!(db.schema_version().unwrap().as_deref(), Some("1"));
    }
}
