use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::warn;

use super::criteria::{non_blank, Comparison, Criteria, MatchMode};
use super::literal::LiteralWriter;

pub const DIRECTOR_JOIN: &str = "LEFT JOIN movie_directors MD ON M.movie_id = MD.movie_id";
pub const ACTOR_JOIN: &str = "LEFT JOIN movie_actors MA ON M.movie_id = MA.movie_id";
/// Inner (comma) join: when `user_ratedmovies` is empty the whole statement
/// yields no rows, even if the sections are combined with OR.
pub const USER_RATINGS_JOIN: &str = ", user_ratedmovies URM";

const AVG_RATING: &str =
    "ROUND((M.rtAllCriticsRating + M.rtTopCriticsRating + M.rtAudienceRating) / 3.0, 1)";
const AVG_REVIEWS: &str =
    "ROUND((M.rtAllCriticsNumReviews + M.rtTopCriticsNumReviews + M.rtAudienceNumReviews) / 3.0, 1)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Genre,
    Country,
    Director,
    Actor,
    Rating,
    ReviewCount,
    Year,
    User,
    Tags,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Genre => "genre",
            Section::Country => "country",
            Section::Director => "director",
            Section::Actor => "actor",
            Section::Rating => "rating",
            Section::ReviewCount => "review_count",
            Section::Year => "year",
            Section::User => "user",
            Section::Tags => "tags",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A section's contribution to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionPredicate {
    pub section: Section,
    pub clause: String,
    pub joins: Vec<&'static str>,
}

impl SectionPredicate {
    fn new(section: Section, clause: String) -> Self {
        SectionPredicate {
            section,
            clause,
            joins: Vec::new(),
        }
    }

    fn with_join(mut self, join: &'static str) -> Self {
        self.joins.push(join);
        self
    }
}

/// Returns `None` when the section has nothing selected, otherwise a
/// parenthesized clause plus the joins its columns need.
pub type SectionBuilder = fn(&Criteria, &LiteralWriter) -> Option<SectionPredicate>;

/// All builders in the order their predicates (and joins) appear in the query.
pub const SECTIONS: [(Section, SectionBuilder); 9] = [
    (Section::Genre, genre),
    (Section::Country, country),
    (Section::Director, director),
    (Section::Actor, actor),
    (Section::Rating, rating),
    (Section::ReviewCount, review_count),
    (Section::Year, year),
    (Section::User, user),
    (Section::Tags, tags),
];

pub fn genre(c: &Criteria, w: &LiteralWriter) -> Option<SectionPredicate> {
    if c.genres.is_empty() {
        return None;
    }
    let values: Vec<&str> = c.genres.iter().map(String::as_str).collect();
    let clause = if c.genre_mode == MatchMode::All && values.len() > 1 {
        intersect(
            w,
            "SELECT movie_id FROM movie_genres WHERE genre = ",
            &values,
        )
    } else {
        format!("(MG1.genre IN {})", w.list(values))
    };
    Some(SectionPredicate::new(Section::Genre, clause))
}

/// A movie has at most one country, so the selection is always matched as ANY.
pub fn country(c: &Criteria, w: &LiteralWriter) -> Option<SectionPredicate> {
    if c.countries.is_empty() {
        return None;
    }
    let clause = format!(
        "(MC.country IN {})",
        w.list(c.countries.iter().map(String::as_str))
    );
    Some(SectionPredicate::new(Section::Country, clause))
}

pub fn director(c: &Criteria, w: &LiteralWriter) -> Option<SectionPredicate> {
    let name = non_blank(c.director.as_deref())?;
    let clause = format!("(MD.director_name = {})", w.quote(name));
    Some(SectionPredicate::new(Section::Director, clause).with_join(DIRECTOR_JOIN))
}

pub fn actor(c: &Criteria, w: &LiteralWriter) -> Option<SectionPredicate> {
    if c.actors.is_empty() {
        return None;
    }
    let values: Vec<&str> = c.actors.iter().map(String::as_str).collect();
    let clause = if c.actor_mode == MatchMode::All && values.len() > 1 {
        intersect(
            w,
            "SELECT movie_id FROM movie_actors WHERE actor_name = ",
            &values,
        )
    } else {
        format!("(MA.actor_name IN {})", w.list(values))
    };
    Some(SectionPredicate::new(Section::Actor, clause).with_join(ACTOR_JOIN))
}

pub fn rating(c: &Criteria, _w: &LiteralWriter) -> Option<SectionPredicate> {
    let clause = compare(AVG_RATING, &c.rating, "rating")?;
    Some(SectionPredicate::new(Section::Rating, clause))
}

pub fn review_count(c: &Criteria, _w: &LiteralWriter) -> Option<SectionPredicate> {
    let clause = compare(AVG_REVIEWS, &c.review_count, "review count")?;
    Some(SectionPredicate::new(Section::ReviewCount, clause))
}

/// Both bounds are inclusive and independent.
pub fn year(c: &Criteria, _w: &LiteralWriter) -> Option<SectionPredicate> {
    let mut bounds = Vec::new();
    if let Some(from) = parse_year(c.year_from.as_deref(), "year from") {
        bounds.push(format!("M.year >= {from}"));
    }
    if let Some(to) = parse_year(c.year_to.as_deref(), "year to") {
        bounds.push(format!("M.year <= {to}"));
    }
    if bounds.is_empty() {
        return None;
    }
    Some(SectionPredicate::new(
        Section::Year,
        format!("({})", bounds.join(" AND ")),
    ))
}

/// User id, rating date range and user rating, joined by the user ANY/ALL mode.
///
/// The rating row must belong to the outer movie whatever the mode, so the
/// movie id equality is ANDed around the whole group.
pub fn user(c: &Criteria, w: &LiteralWriter) -> Option<SectionPredicate> {
    let parts: Vec<String> = [
        user_id_clause(c),
        rated_date_clause(c, w),
        user_rating_clause(c),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        return None;
    }

    let separator = format!(" {} ", c.user_mode.joiner());
    let joined = parts.join(separator.as_str());
    let clause = format!("((URM.movie_id = M.movie_id) AND ({joined}))");
    Some(SectionPredicate::new(Section::User, clause).with_join(USER_RATINGS_JOIN))
}

pub fn user_id_clause(c: &Criteria) -> Option<String> {
    let raw = non_blank(c.user_id.as_deref())?;
    match raw.trim().parse::<i64>() {
        Ok(id) => Some(format!("(URM.user_id = {id})")),
        Err(_) => {
            warn!("Ignoring user id that is not a number: {raw:?}");
            None
        }
    }
}

/// Exclusive bounds on the rating date, either one optional.
pub fn rated_date_clause(c: &Criteria, w: &LiteralWriter) -> Option<String> {
    let mut bounds = Vec::new();
    if let Some(from) = parse_date(c.rated_from.as_deref(), "rated from") {
        bounds.push(format!("URM.ts > {}", w.quote(&from.format("%Y-%m-%d").to_string())));
    }
    if let Some(to) = parse_date(c.rated_to.as_deref(), "rated to") {
        bounds.push(format!("URM.ts < {}", w.quote(&to.format("%Y-%m-%d").to_string())));
    }
    if bounds.is_empty() {
        return None;
    }
    Some(format!("({})", bounds.join(" AND ")))
}

pub fn user_rating_clause(c: &Criteria) -> Option<String> {
    compare("URM.rating", &c.user_rating, "user rating")
}

/// Tags are split on commas exactly as typed; surrounding spaces are part of
/// the tag value.
pub fn tags(c: &Criteria, w: &LiteralWriter) -> Option<SectionPredicate> {
    let text = non_blank(c.tags.as_deref())?;
    let values = split_tags(text);
    if values.is_empty() {
        return None;
    }
    let clause = if c.tag_mode == MatchMode::All && values.len() > 1 {
        intersect(
            w,
            "SELECT DISTINCT UTM.movie_id FROM user_taggedmovies UTM, tags T \
             WHERE UTM.tag_id = T.tag_id AND T.value = ",
            &values,
        )
    } else {
        format!("(T.value IN {})", w.list(values))
    };
    Some(SectionPredicate::new(Section::Tags, clause))
}

pub fn split_tags(text: &str) -> Vec<&str> {
    text.split(',').filter(|t| !t.is_empty()).collect()
}

/// `(M.movie_id IN (<select> 'a' INTERSECT <select> 'b' ...))`
fn intersect(w: &LiteralWriter, select: &str, values: &[&str]) -> String {
    let branches: Vec<String> = values
        .iter()
        .map(|v| format!("    {select}{}", w.quote(v)))
        .collect();
    format!(
        "(M.movie_id IN (\n{}\n  ))",
        branches.join("\n    INTERSECT\n")
    )
}

fn compare(expr: &str, cmp: &Comparison, label: &str) -> Option<String> {
    let value = parse_number(cmp.value.as_deref(), label)?;
    Some(format!("({expr} {} {value})", cmp.op_or_default()))
}

/// Returns the trimmed text when it is a finite number.
fn parse_number<'a>(raw: Option<&'a str>, label: &str) -> Option<&'a str> {
    let raw = non_blank(raw)?.trim();
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(raw),
        _ => {
            warn!("Ignoring {label} that is not a number: {raw:?}");
            None
        }
    }
}

fn parse_year(raw: Option<&str>, label: &str) -> Option<i32> {
    let raw = non_blank(raw)?.trim();
    match raw.parse::<i32>() {
        Ok(y) => Some(y),
        Err(_) => {
            warn!("Ignoring {label} that is not a year: {raw:?}");
            None
        }
    }
}

/// Accepts `MM/DD/YYYY` and `YYYY-MM-DD`.
pub fn parse_date(raw: Option<&str>, label: &str) -> Option<NaiveDate> {
    let raw = non_blank(raw)?.trim();
    let parsed = NaiveDate::parse_from_str(raw, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"));
    match parsed {
        Ok(d) => Some(d),
        Err(_) => {
            warn!("Ignoring {label} that is not a date: {raw:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::criteria::CompareOp;
    use crate::query::literal::Quoting;
    use std::collections::BTreeSet;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn w() -> LiteralWriter {
        LiteralWriter::default()
    }

    #[test]
    fn test_every_builder_is_inactive_on_empty_criteria() {
        let c = Criteria::new();
        for (section, build) in SECTIONS {
            assert!(build(&c, &w()).is_none(), "{section} should be inactive");
        }
    }

    #[test]
    fn test_genre_any_uses_in_list() {
        let mut c = Criteria::new();
        c.genres = set(&["Comedy", "Drama"]);
        let p = genre(&c, &w()).unwrap();
        assert_eq!(p.clause, "(MG1.genre IN ('Comedy','Drama'))");
        assert!(p.joins.is_empty());
    }

    #[test]
    fn test_genre_all_uses_intersect() {
        let mut c = Criteria::new();
        c.genres = set(&["Comedy", "Drama"]);
        c.genre_mode = MatchMode::All;
        let p = genre(&c, &w()).unwrap();
        assert_eq!(p.clause.matches("INTERSECT").count(), 1);
        assert!(p.clause.starts_with("(M.movie_id IN ("));
        assert!(p
            .clause
            .contains("SELECT movie_id FROM movie_genres WHERE genre = 'Comedy'"));
        assert!(p
            .clause
            .contains("SELECT movie_id FROM movie_genres WHERE genre = 'Drama'"));
        assert!(p.joins.is_empty());
    }

    #[test]
    fn test_genre_all_with_single_value_degrades_to_any() {
        let mut c = Criteria::new();
        c.genres = set(&["Horror"]);
        c.genre_mode = MatchMode::All;
        assert_eq!(genre(&c, &w()).unwrap().clause, "(MG1.genre IN ('Horror'))");
    }

    #[test]
    fn test_country_ignores_modes() {
        let mut c = Criteria::new();
        c.countries = set(&["France", "USA"]);
        c.genre_mode = MatchMode::All;
        c.actor_mode = MatchMode::All;
        let p = country(&c, &w()).unwrap();
        assert_eq!(p.clause, "(MC.country IN ('France','USA'))");
        assert!(!p.clause.contains("INTERSECT"));
    }

    #[test]
    fn test_director_adds_join_and_matches_exactly() {
        let mut c = Criteria::new();
        c.director = Some("Quentin Tarantino".into());
        let p = director(&c, &w()).unwrap();
        assert_eq!(p.clause, "(MD.director_name = 'Quentin Tarantino')");
        assert_eq!(p.joins, vec![DIRECTOR_JOIN]);

        c.director = Some("  ".into());
        assert!(director(&c, &w()).is_none());
    }

    #[test]
    fn test_actor_join_present_in_both_modes() {
        let mut c = Criteria::new();
        c.actors = set(&["Brad Pitt", "Edward Norton"]);
        let any = actor(&c, &w()).unwrap();
        assert_eq!(any.clause, "(MA.actor_name IN ('Brad Pitt','Edward Norton'))");
        assert_eq!(any.joins, vec![ACTOR_JOIN]);

        c.actor_mode = MatchMode::All;
        let all = actor(&c, &w()).unwrap();
        assert_eq!(all.clause.matches("INTERSECT").count(), 1);
        assert!(all
            .clause
            .contains("SELECT movie_id FROM movie_actors WHERE actor_name = 'Brad Pitt'"));
        assert_eq!(all.joins, vec![ACTOR_JOIN]);
    }

    #[test]
    fn test_rating_defaults_to_equality() {
        let mut c = Criteria::new();
        c.rating.value = Some("7.5".into());
        let p = rating(&c, &w()).unwrap();
        assert_eq!(
            p.clause,
            "(ROUND((M.rtAllCriticsRating + M.rtTopCriticsRating + M.rtAudienceRating) / 3.0, 1) = 7.5)"
        );
    }

    #[test]
    fn test_operator_without_value_is_ignored() {
        let mut c = Criteria::new();
        c.rating.op = Some(CompareOp::Ge);
        c.review_count.op = Some(CompareOp::Lt);
        assert!(rating(&c, &w()).is_none());
        assert!(review_count(&c, &w()).is_none());
    }

    #[test]
    fn test_review_count_uses_operator() {
        let mut c = Criteria::new();
        c.review_count = Comparison::new(Some(CompareOp::Ge), Some(" 100 ".into()));
        let p = review_count(&c, &w()).unwrap();
        assert!(p.clause.ends_with(" >= 100)"));
        assert!(p.clause.contains("rtAudienceNumReviews"));
    }

    #[test]
    fn test_malformed_number_is_inactive() {
        let mut c = Criteria::new();
        c.rating.value = Some("high".into());
        c.review_count.value = Some("NaN".into());
        assert!(rating(&c, &w()).is_none());
        assert!(review_count(&c, &w()).is_none());
    }

    #[test]
    fn test_year_single_lower_bound() {
        let mut c = Criteria::new();
        c.year_from = Some("2000".into());
        c.year_to = Some("".into());
        let p = year(&c, &w()).unwrap();
        assert_eq!(p.clause, "(M.year >= 2000)");
        assert!(!p.clause.contains("AND"));
        assert!(!p.clause.contains("<="));
    }

    #[test]
    fn test_year_both_bounds_inclusive() {
        let mut c = Criteria::new();
        c.year_from = Some("1990".into());
        c.year_to = Some("1999".into());
        assert_eq!(
            year(&c, &w()).unwrap().clause,
            "(M.year >= 1990 AND M.year <= 1999)"
        );
        c.year_from = None;
        assert_eq!(year(&c, &w()).unwrap().clause, "(M.year <= 1999)");
    }

    #[test]
    fn test_user_sub_predicates_are_independent() {
        let mut c = Criteria::new();
        c.user_id = Some("75".into());
        assert_eq!(user_id_clause(&c).unwrap(), "(URM.user_id = 75)");
        assert!(rated_date_clause(&c, &w()).is_none());
        assert!(user_rating_clause(&c).is_none());

        c.rated_from = Some("01/15/2005".into());
        assert_eq!(
            rated_date_clause(&c, &w()).unwrap(),
            "(URM.ts > '2005-01-15')"
        );
        c.rated_to = Some("2006-03-01".into());
        assert_eq!(
            rated_date_clause(&c, &w()).unwrap(),
            "(URM.ts > '2005-01-15' AND URM.ts < '2006-03-01')"
        );

        c.user_rating = Comparison::new(None, Some("4".into()));
        assert_eq!(user_rating_clause(&c).unwrap(), "(URM.rating = 4)");
    }

    #[test]
    fn test_user_any_mode_keeps_movie_equality_outside_or() {
        let mut c = Criteria::new();
        c.user_id = Some("75".into());
        c.user_rating = Comparison::new(Some(CompareOp::Gt), Some("3".into()));
        let p = user(&c, &w()).unwrap();
        assert_eq!(
            p.clause,
            "((URM.movie_id = M.movie_id) AND ((URM.user_id = 75) OR (URM.rating > 3)))"
        );
        assert_eq!(p.joins, vec![USER_RATINGS_JOIN]);

        c.user_mode = MatchMode::All;
        let p = user(&c, &w()).unwrap();
        assert!(p.clause.contains("(URM.user_id = 75) AND (URM.rating > 3)"));
    }

    #[test]
    fn test_user_section_inactive_when_all_parts_invalid() {
        let mut c = Criteria::new();
        c.user_id = Some("abc".into());
        c.rated_from = Some("not a date".into());
        c.user_rating.op = Some(CompareOp::Le);
        assert!(user(&c, &w()).is_none());
    }

    #[test]
    fn test_tags_any_and_all() {
        let mut c = Criteria::new();
        c.tags = Some("funny,sad".into());
        assert_eq!(tags(&c, &w()).unwrap().clause, "(T.value IN ('funny','sad'))");

        c.tag_mode = MatchMode::All;
        let p = tags(&c, &w()).unwrap();
        assert_eq!(p.clause.matches("INTERSECT").count(), 1);
        assert!(p.clause.contains("T.value = 'funny'"));
        assert!(p.clause.contains("T.value = 'sad'"));
        assert!(p.joins.is_empty());
    }

    #[test]
    fn test_tags_are_not_trimmed() {
        assert_eq!(split_tags("funny, sad"), vec!["funny", " sad"]);
        assert_eq!(split_tags("funny,"), vec!["funny"]);
        let mut c = Criteria::new();
        c.tags = Some(",,".into());
        assert!(tags(&c, &w()).is_none());
    }

    #[test]
    fn test_verbatim_quoting_reproduces_raw_interpolation() {
        let mut c = Criteria::new();
        c.director = Some("O'Brien".into());
        let verbatim = director(&c, &LiteralWriter::new(Quoting::Verbatim)).unwrap();
        assert_eq!(verbatim.clause, "(MD.director_name = 'O'Brien')");
        let escaped = director(&c, &LiteralWriter::new(Quoting::Escaped)).unwrap();
        assert_eq!(escaped.clause, "(MD.director_name = 'O''Brien')");
    }
}
