use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Whether a multi-valued section must match at least one value or every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Any,
    All,
}

impl MatchMode {
    /// Boolean token used when this mode joins sub-predicates.
    pub fn joiner(&self) -> &'static str {
        match self {
            MatchMode::Any => "OR",
            MatchMode::All => "AND",
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" => Ok(MatchMode::Any),
            "all" => Ok(MatchMode::All),
            other => Err(format!("expected any or all, got '{other}'")),
        }
    }
}

/// How active sections are combined into the WHERE clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    pub fn token(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

impl FromStr for Combinator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "and" => Ok(Combinator::And),
            "or" => Ok(Combinator::Or),
            other => Err(format!("expected and or or, got '{other}'")),
        }
    }
}

/// Comparison operator for scalar filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" | "==" => Ok(CompareOp::Eq),
            "<" => Ok(CompareOp::Lt),
            ">" => Ok(CompareOp::Gt),
            "<=" | "≤" => Ok(CompareOp::Le),
            ">=" | "≥" => Ok(CompareOp::Ge),
            other => Err(format!("unknown comparison operator '{other}' (use =, <, >, <=, >=)")),
        }
    }
}

/// A scalar filter: optional operator plus the raw value text as entered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub op: Option<CompareOp>,
    pub value: Option<String>,
}

impl Comparison {
    pub fn new(op: Option<CompareOp>, value: Option<String>) -> Self {
        Comparison { op, value }
    }

    /// Operator to render; an unset operator means equality.
    pub fn op_or_default(&self) -> CompareOp {
        self.op.unwrap_or(CompareOp::Eq)
    }
}

/// Current selection state for every filter section.
///
/// Values are kept as the user typed them. Whether a section is active is
/// decided by the section builders, so an operator without a value, a blank
/// text field or a number that does not parse simply contributes nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    pub genres: BTreeSet<String>,
    pub genre_mode: MatchMode,

    pub countries: BTreeSet<String>,

    pub director: Option<String>,

    pub actors: BTreeSet<String>,
    pub actor_mode: MatchMode,

    pub rating: Comparison,
    pub review_count: Comparison,

    pub year_from: Option<String>,
    pub year_to: Option<String>,

    pub user_id: Option<String>,
    pub rated_from: Option<String>,
    pub rated_to: Option<String>,
    pub user_rating: Comparison,
    pub user_mode: MatchMode,

    pub tags: Option<String>,
    pub tag_mode: MatchMode,

    pub combine: Combinator,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the value if absent, remove it if present. Mirrors a checkbox list.
    pub fn toggle(set: &mut BTreeSet<String>, value: &str) -> bool {
        if set.remove(value) {
            false
        } else {
            set.insert(value.to_string());
            true
        }
    }

    /// True when no section would produce a predicate.
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
            && self.countries.is_empty()
            && self.actors.is_empty()
            && is_blank(self.director.as_deref())
            && is_blank(self.rating.value.as_deref())
            && is_blank(self.review_count.value.as_deref())
            && is_blank(self.year_from.as_deref())
            && is_blank(self.year_to.as_deref())
            && is_blank(self.user_id.as_deref())
            && is_blank(self.rated_from.as_deref())
            && is_blank(self.rated_to.as_deref())
            && is_blank(self.user_rating.value.as_deref())
            && is_blank(self.tags.as_deref())
    }
}

/// Missing, empty and whitespace-only text are all treated as "not entered".
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Returns the text when it has any non-whitespace content.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
