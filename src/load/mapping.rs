use chrono::{DateTime, NaiveDate, Utc};

use super::encoding::Encoding;

/// Marker the dumps use for a missing value.
pub const NULL_MARKER: &str = "\\N";

/// Placeholder for an empty director or actor name.
pub const UNKNOWN_NAME: &str = "N/A";

/// The dump files the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFile {
    Movies,
    MovieGenres,
    MovieDirectors,
    MovieActors,
    MovieCountries,
    Tags,
    UserTaggedMovies,
    UserTaggedMoviesTimestamps,
    UserRatedMovies,
    UserRatedMoviesTimestamps,
}

impl DataFile {
    pub fn from_file_name(name: &str) -> Option<Self> {
        match name {
            "movies.dat" => Some(DataFile::Movies),
            "movie_genres.dat" => Some(DataFile::MovieGenres),
            "movie_directors.dat" => Some(DataFile::MovieDirectors),
            "movie_actors.dat" => Some(DataFile::MovieActors),
            "movie_countries.dat" => Some(DataFile::MovieCountries),
            "tags.dat" => Some(DataFile::Tags),
            "user_taggedmovies.dat" => Some(DataFile::UserTaggedMovies),
            "user_taggedmovies-timestamps.dat" => Some(DataFile::UserTaggedMoviesTimestamps),
            "user_ratedmovies.dat" => Some(DataFile::UserRatedMovies),
            "user_ratedmovies-timestamps.dat" => Some(DataFile::UserRatedMoviesTimestamps),
            _ => None,
        }
    }

    pub fn encoding(&self) -> Encoding {
        match self {
            DataFile::Movies | DataFile::MovieDirectors | DataFile::MovieActors | DataFile::Tags => {
                Encoding::Latin1
            }
            _ => Encoding::Ascii,
        }
    }

    /// Turn one tab-split line into table cells. `None` is SQL NULL.
    pub fn map_fields(&self, fields: &[&str]) -> Result<Vec<Option<String>>, String> {
        let values: Vec<String> = match self {
            DataFile::Movies => {
                need(fields, 19)?;
                let mut values = vec![
                    fields[0].to_string(),
                    fields[1].to_string(),
                    fields[5].to_string(),
                ];
                // all critics, top critics, audience: rating then review count
                for i in [7, 8, 12, 13, 17, 18] {
                    values.push(zero_if_null(fields[i]));
                }
                values
            }
            DataFile::MovieGenres | DataFile::MovieCountries | DataFile::Tags => {
                need(fields, 2)?;
                take(fields, 2)
            }
            DataFile::MovieDirectors | DataFile::MovieActors => {
                need(fields, 3)?;
                let name = if fields[2].is_empty() {
                    UNKNOWN_NAME
                } else {
                    fields[2]
                };
                vec![fields[0].to_string(), name.to_string()]
            }
            DataFile::UserTaggedMovies | DataFile::UserTaggedMoviesTimestamps => {
                need(fields, 3)?;
                take(fields, 3)
            }
            DataFile::UserRatedMovies => {
                need(fields, 6)?;
                let mut values = take(fields, 3);
                values.push(date_from_parts(fields[3], fields[4], fields[5])?);
                values
            }
            DataFile::UserRatedMoviesTimestamps => {
                need(fields, 4)?;
                let mut values = take(fields, 3);
                values.push(date_from_millis(fields[3])?);
                values
            }
        };

        let row: Vec<Option<String>> = values
            .into_iter()
            .map(|v| if v == NULL_MARKER { None } else { Some(v) })
            .collect();

        if let Some(&idx) = self.required_columns().iter().find(|&&i| row[i].is_none()) {
            return Err(format!("missing value in required column {idx}"));
        }
        Ok(row)
    }

    /// Output positions whose table column is NOT NULL.
    fn required_columns(&self) -> &'static [usize] {
        match self {
            DataFile::Movies => &[0, 1],
            DataFile::MovieGenres
            | DataFile::MovieDirectors
            | DataFile::MovieActors
            | DataFile::Tags => &[0, 1],
            DataFile::MovieCountries => &[0],
            DataFile::UserTaggedMovies
            | DataFile::UserTaggedMoviesTimestamps
            | DataFile::UserRatedMovies
            | DataFile::UserRatedMoviesTimestamps => &[0, 1, 2],
        }
    }
}

/// Table a file loads into: the file name without `.dat`, cut at the first `-`.
pub fn table_for_file(file_name: &str) -> &str {
    let stem = file_name.strip_suffix(".dat").unwrap_or(file_name);
    match stem.find('-') {
        Some(idx) => &stem[..idx],
        None => stem,
    }
}

fn need(fields: &[&str], count: usize) -> Result<(), String> {
    if fields.len() < count {
        return Err(format!("expected at least {count} fields, found {}", fields.len()));
    }
    Ok(())
}

fn take(fields: &[&str], count: usize) -> Vec<String> {
    fields[..count].iter().map(|f| f.to_string()).collect()
}

fn zero_if_null(field: &str) -> String {
    if field == NULL_MARKER {
        "0".to_string()
    } else {
        field.to_string()
    }
}

fn date_from_parts(day: &str, month: &str, year: &str) -> Result<String, String> {
    let parse = |s: &str| s.trim().parse::<u32>().ok();
    let date = match (parse(day), parse(month), year.trim().parse::<i32>().ok()) {
        (Some(d), Some(m), Some(y)) => NaiveDate::from_ymd_opt(y, m, d),
        _ => None,
    };
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .ok_or_else(|| format!("invalid date {month}/{day}/{year}"))
}

fn date_from_millis(millis: &str) -> Result<String, String> {
    millis
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
        .ok_or_else(|| format!("invalid timestamp {millis}"))
}
