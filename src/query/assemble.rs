use serde::Serialize;
use tracing::debug;

use super::criteria::{Combinator, Criteria};
use super::literal::{LiteralWriter, Quoting};
use super::sections::{SectionPredicate, SECTIONS};

/// Projection over the per-row subquery. Genres and tags are de-duplicated by
/// the `g`/`t` row numbers before being aggregated.
pub const SELECT: &str = "SELECT
  title, year, country, critics_rating, critics_numreviews,
  audience_rating, audience_numreviews,
  group_concat(CASE WHEN g = 1 THEN genre END, ', ' ORDER BY genre) AS genres,
  group_concat(CASE WHEN t = 1 THEN tag END, ', ' ORDER BY tag) AS tags
FROM (
  SELECT
    M.movie_id AS id, M.title AS title,
    MG.genre AS genre,
    T.value AS tag,
    M.year AS year,
    MC.country AS country,
    ROUND((M.rtAllCriticsRating + M.rtTopCriticsRating) / 2.0, 1) AS critics_rating,
    M.rtAllCriticsNumReviews + M.rtTopCriticsNumReviews AS critics_numreviews,
    M.rtAudienceRating AS audience_rating,
    M.rtAudienceNumReviews AS audience_numreviews,
    row_number() OVER (PARTITION BY M.movie_id, MG.genre ORDER BY MG.genre) AS g,
    row_number() OVER (PARTITION BY M.movie_id, T.value ORDER BY T.value) AS t";

/// Joins every query needs. `MG1` is a second genre alias used only for filtering,
/// so a genre filter does not hide the movie's other genres from the projection.
pub const BASE_FROM: &str = "
  FROM
    movies M LEFT JOIN movie_genres MG ON M.movie_id = MG.movie_id
    LEFT JOIN movie_genres MG1 ON M.movie_id = MG1.movie_id
    LEFT JOIN user_taggedmovies UTM ON M.movie_id = UTM.movie_id
    LEFT JOIN movie_countries MC ON M.movie_id = MC.movie_id
    LEFT JOIN tags T ON UTM.tag_id = T.tag_id";

pub const GROUP_BY: &str = "
)
GROUP BY id, title, year, country, critics_rating, critics_numreviews, \
audience_rating, audience_numreviews";

/// Output column names, in order.
pub const COLUMNS: [&str; 9] = [
    "title",
    "year",
    "country",
    "critics_rating",
    "critics_numreviews",
    "audience_rating",
    "audience_numreviews",
    "genres",
    "tags",
];

/// One fully rendered statement and the pieces it was built from.
#[derive(Debug, Clone, Serialize)]
pub struct AssembledQuery {
    pub sql: String,
    pub combine: Combinator,
    pub predicates: Vec<SectionPredicate>,
    pub joins: Vec<&'static str>,
}

impl AssembledQuery {
    pub fn has_where(&self) -> bool {
        !self.predicates.is_empty()
    }
}

/// Turns criteria into SQL. Holds no state between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryAssembler {
    writer: LiteralWriter,
}

impl QueryAssembler {
    pub fn new(quoting: Quoting) -> Self {
        QueryAssembler {
            writer: LiteralWriter::new(quoting),
        }
    }

    pub fn build(&self, criteria: &Criteria) -> AssembledQuery {
        let predicates: Vec<SectionPredicate> = SECTIONS
            .iter()
            .filter_map(|(_, build)| build(criteria, &self.writer))
            .collect();

        let mut joins: Vec<&'static str> = Vec::new();
        for &join in predicates.iter().flat_map(|p| p.joins.iter()) {
            if !joins.contains(&join) {
                joins.push(join);
            }
        }

        let mut sql = String::from(SELECT);
        sql.push_str(BASE_FROM);
        for join in &joins {
            sql.push_str("\n    ");
            sql.push_str(join);
        }

        if !predicates.is_empty() {
            let separator = format!("\n    {} ", criteria.combine.token());
            let clauses: Vec<&str> = predicates.iter().map(|p| p.clause.as_str()).collect();
            sql.push_str("\n  WHERE\n    ");
            sql.push_str(&clauses.join(separator.as_str()));
        }

        sql.push_str(GROUP_BY);

        debug!(
            sections = predicates.len(),
            joins = joins.len(),
            "Assembled query:\n{sql}"
        );

        AssembledQuery {
            sql,
            combine: criteria.combine,
            predicates,
            joins,
        }
    }

    pub fn assemble(&self, criteria: &Criteria) -> String {
        self.build(criteria).sql
    }
}

/// Assemble with the default (escaping) literal writer.
pub fn assemble(criteria: &Criteria) -> String {
    QueryAssembler::default().assemble(criteria)
}

/// The statement produced when nothing is selected.
pub fn skeleton() -> String {
    format!("{SELECT}{BASE_FROM}{GROUP_BY}")
}
