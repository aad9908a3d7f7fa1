use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::MvqError;

/// A fully materialized result set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, rendered as display text.
    pub fn column_text(&self, name: &str) -> Vec<String> {
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => self.rows.iter().map(|r| cell_text(&r[idx])).collect(),
            None => Vec::new(),
        }
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

/// Display form of a cell. NULL shows as `null`.
pub fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Pick lists that can be listed with `mvq values`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Genres,
    Countries,
    Directors,
    Actors,
    Tags,
}

impl Lookup {
    /// (table, column)
    pub fn source(&self) -> (&'static str, &'static str) {
        match self {
            Lookup::Genres => ("movie_genres", "genre"),
            Lookup::Countries => ("movie_countries", "country"),
            Lookup::Directors => ("movie_directors", "director_name"),
            Lookup::Actors => ("movie_actors", "actor_name"),
            Lookup::Tags => ("tags", "value"),
        }
    }
}

impl FromStr for Lookup {
    type Err = MvqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "genres" | "genre" => Ok(Lookup::Genres),
            "countries" | "country" => Ok(Lookup::Countries),
            "directors" | "director" => Ok(Lookup::Directors),
            "actors" | "actor" => Ok(Lookup::Actors),
            "tags" | "tag" => Ok(Lookup::Tags),
            other => Err(MvqError::UnknownLookup(other.to_string())),
        }
    }
}

/// Stats returned by `mvq stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStats {
    pub tables: Vec<TableCount>,
    pub db_size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCount {
    pub table: String,
    pub rows: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_accepts_singular_and_plural() {
        assert_eq!("Genre".parse::<Lookup>().unwrap(), Lookup::Genres);
        assert_eq!("actors".parse::<Lookup>().unwrap(), Lookup::Actors);
        assert!(matches!(
            "ratings".parse::<Lookup>(),
            Err(MvqError::UnknownLookup(_))
        ));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!(null)), "null");
        assert_eq!(cell_text(&json!("Heat")), "Heat");
        assert_eq!(cell_text(&json!(1995)), "1995");
        assert_eq!(cell_text(&json!(7.5)), "7.5");
    }

    #[test]
    fn test_records_pair_columns_with_cells() {
        let table = ResultTable {
            columns: vec!["title".into(), "year".into()],
            rows: vec![vec![json!("Heat"), json!(1995)]],
        };
        let records = table.to_records();
        assert_eq!(records[0]["title"], json!("Heat"));
        assert_eq!(records[0]["year"], json!(1995));
        assert_eq!(table.column_text("year"), vec!["1995"]);
        assert!(table.column_text("missing").is_empty());
    }
}
