use anyhow::Result;
use rusqlite::Connection;

/// Tables the loader may fill, in dependency order.
pub const TABLES: [&str; 8] = [
    "movies",
    "tags",
    "movie_genres",
    "movie_directors",
    "movie_actors",
    "movie_countries",
    "user_taggedmovies",
    "user_ratedmovies",
];

pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Version tracking
        CREATE TABLE IF NOT EXISTS mvq_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Column order is significant: the loader inserts positionally.
        CREATE TABLE IF NOT EXISTS movies (
            movie_id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            year INTEGER,
            rtAllCriticsRating REAL,
            rtAllCriticsNumReviews INTEGER,
            rtTopCriticsRating REAL,
            rtTopCriticsNumReviews INTEGER,
            rtAudienceRating REAL,
            rtAudienceNumReviews INTEGER
        );

        CREATE TABLE IF NOT EXISTS movie_genres (
            movie_id INTEGER NOT NULL,
            genre TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS movie_directors (
            movie_id INTEGER NOT NULL,
            director_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS movie_actors (
            movie_id INTEGER NOT NULL,
            actor_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS movie_countries (
            movie_id INTEGER NOT NULL,
            country TEXT
        );

        CREATE TABLE IF NOT EXISTS tags (
            tag_id INTEGER PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_taggedmovies (
            user_id INTEGER NOT NULL,
            movie_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL
        );

        -- ts is an ISO date (YYYY-MM-DD) so it compares correctly as text.
        CREATE TABLE IF NOT EXISTS user_ratedmovies (
            user_id INTEGER NOT NULL,
            movie_id INTEGER NOT NULL,
            rating REAL NOT NULL,
            ts TEXT
        );
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO mvq_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
