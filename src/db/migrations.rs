use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

/// Numbered schema changes applied on top of the v1 tables from schema.rs.
/// Ids only ever grow; an applied id is never run again.
const MIGRATIONS: [(i64, &str, &str); 2] = [
    (
        1,
        "add_movie_id_indexes",
        "CREATE INDEX IF NOT EXISTS idx_movie_genres_movie ON movie_genres(movie_id);
         CREATE INDEX IF NOT EXISTS idx_movie_genres_genre ON movie_genres(genre);
         CREATE INDEX IF NOT EXISTS idx_movie_directors_movie ON movie_directors(movie_id);
         CREATE INDEX IF NOT EXISTS idx_movie_actors_movie ON movie_actors(movie_id);
         CREATE INDEX IF NOT EXISTS idx_movie_actors_name ON movie_actors(actor_name);
         CREATE INDEX IF NOT EXISTS idx_movie_countries_movie ON movie_countries(movie_id);
         CREATE INDEX IF NOT EXISTS idx_user_taggedmovies_movie ON user_taggedmovies(movie_id);
         CREATE INDEX IF NOT EXISTS idx_user_taggedmovies_tag ON user_taggedmovies(tag_id);
         CREATE INDEX IF NOT EXISTS idx_user_ratedmovies_movie ON user_ratedmovies(movie_id);",
    ),
    (
        2,
        "add_lookup_indexes",
        "CREATE INDEX IF NOT EXISTS idx_tags_value ON tags(value);
         CREATE INDEX IF NOT EXISTS idx_user_ratedmovies_user ON user_ratedmovies(user_id);",
    ),
];

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS mvq_migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );",
    )?;

    let latest: i64 = conn.query_row(
        "SELECT COALESCE(MAX(id), 0) FROM mvq_migrations",
        [],
        |row| row.get(0),
    )?;

    for (id, name, sql) in MIGRATIONS.iter().filter(|(id, _, _)| *id > latest) {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)
            .with_context(|| format!("Migration {id} ({name}) failed"))?;
        tx.execute(
            "INSERT INTO mvq_migrations (id, name) VALUES (?1, ?2)",
            rusqlite::params![id, name],
        )?;
        tx.commit()?;
        info!("Applied migration {id}: {name}");
    }

    Ok(())
}
