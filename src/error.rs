use thiserror::Error;

#[derive(Error, Debug)]
pub enum MvqError {
    /// Statement failed to prepare or execute. `code` is SQLite's extended
    /// result code when the failure came from the engine.
    #[error("Query failed: {message}")]
    Query {
        message: String,
        code: Option<i32>,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Unknown lookup: {0} (use genres, countries, directors, actors or tags)")]
    UnknownLookup(String),

    #[error("Invalid config: {0}")]
    Config(String),
}

impl MvqError {
    pub fn query(source: rusqlite::Error) -> Self {
        let (message, code) = match &source {
            rusqlite::Error::SqliteFailure(err, msg) => (
                msg.clone().unwrap_or_else(|| err.to_string()),
                Some(err.extended_code),
            ),
            other => (other.to_string(), None),
        };
        MvqError::Query {
            message,
            code,
            source,
        }
    }

    /// Vendor error code, if any.
    pub fn code(&self) -> Option<i32> {
        match self {
            MvqError::Query { code, .. } => *code,
            _ => None,
        }
    }
}
