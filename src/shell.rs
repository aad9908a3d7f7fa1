use anyhow::Result;
use std::io::{BufRead, Write};

use crate::db::Database;
use crate::output::table::{self, Layout};
use crate::query::criteria::non_blank;
use crate::query::{Combinator, CompareOp, Comparison, Criteria, MatchMode, Session};

/// Which multi-valued section a `mode` command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeTarget {
    Genre,
    Actor,
    Tag,
    User,
}

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Genre(String),
    Country(String),
    Actor(String),
    Director(Option<String>),
    Rating(Comparison),
    Reviews(Comparison),
    Year(Option<String>, Option<String>),
    User(Option<String>),
    Rated(Option<String>, Option<String>),
    UserRating(Comparison),
    Tags(Option<String>),
    Mode(ModeTarget, MatchMode),
    Combine(Combinator),
    Show,
    Sql,
    Run,
    Clear,
    Help,
    Quit,
}

const HELP: &str = "\
Selections
  genre <name>              toggle a genre
  country <name>            toggle a country
  actor <name>              toggle an actor
  director <name|->         set or clear the director
  rating [op] <value|->     average rating, op is one of = < > <= >= (default =)
  reviews [op] <value|->    average review count
  year <from|-> <to|->      release year range, both ends inclusive
  user <id|->               user id for the rating filter
  rated <from|-> <to|->     rating date range (MM/DD/YYYY or YYYY-MM-DD)
  user-rating [op] <v|->    the user's rating
  tags <a,b,...|->          comma separated tag values
  mode <genre|actor|tag|user> <any|all>
  combine <and|or>          how sections are joined
Session
  show                      print current selections
  sql                       print the query without running it
  run                       run the query
  clear                     forget all selections
  help                      this text
  quit                      leave the shell";

/// Parse one non-empty shell line. Selections build up across lines and
/// across runs the way they would in a form.
pub fn parse(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    match word.to_lowercase().as_str() {
        "genre" => Ok(ShellCommand::Genre(required(rest, "genre")?)),
        "country" => Ok(ShellCommand::Country(required(rest, "country")?)),
        "actor" => Ok(ShellCommand::Actor(required(rest, "actor")?)),
        "director" => Ok(ShellCommand::Director(optional(rest))),
        "rating" => Ok(ShellCommand::Rating(comparison(rest)?)),
        "reviews" => Ok(ShellCommand::Reviews(comparison(rest)?)),
        "user-rating" => Ok(ShellCommand::UserRating(comparison(rest)?)),
        "year" => {
            let (from, to) = range(rest)?;
            Ok(ShellCommand::Year(from, to))
        }
        "rated" => {
            let (from, to) = range(rest)?;
            Ok(ShellCommand::Rated(from, to))
        }
        "user" => Ok(ShellCommand::User(optional(rest))),
        // Tag text is kept as typed; spaces around commas are significant.
        "tags" => Ok(ShellCommand::Tags(if rest == "-" {
            None
        } else {
            non_blank(Some(rest)).map(str::to_string)
        })),
        "mode" => {
            let mut parts = rest.split_whitespace();
            let target = match parts.next().map(str::to_lowercase).as_deref() {
                Some("genre") => ModeTarget::Genre,
                Some("actor") => ModeTarget::Actor,
                Some("tag") | Some("tags") => ModeTarget::Tag,
                Some("user") => ModeTarget::User,
                _ => return Err("usage: mode <genre|actor|tag|user> <any|all>".to_string()),
            };
            let mode = parts
                .next()
                .ok_or_else(|| "usage: mode <genre|actor|tag|user> <any|all>".to_string())?
                .parse::<MatchMode>()?;
            Ok(ShellCommand::Mode(target, mode))
        }
        "combine" => Ok(ShellCommand::Combine(rest.parse::<Combinator>()?)),
        "show" => Ok(ShellCommand::Show),
        "sql" => Ok(ShellCommand::Sql),
        "run" => Ok(ShellCommand::Run),
        "clear" => Ok(ShellCommand::Clear),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        other => Err(format!("unknown command '{other}', type help")),
    }
}

fn required(rest: &str, what: &str) -> Result<String, String> {
    if rest.is_empty() {
        return Err(format!("usage: {what} <value>"));
    }
    Ok(rest.to_string())
}

/// `-` or nothing clears the field.
fn optional(rest: &str) -> Option<String> {
    match rest {
        "" | "-" => None,
        v => Some(v.to_string()),
    }
}

/// `[op] <value>`, or `-` to clear both. A bare value compares with `=`.
fn comparison(rest: &str) -> Result<Comparison, String> {
    if rest.is_empty() || rest == "-" {
        return Ok(Comparison::default());
    }
    match rest.split_once(char::is_whitespace) {
        Some((op, value)) => Ok(Comparison::new(
            Some(op.parse::<CompareOp>()?),
            optional(value.trim()),
        )),
        None => match rest.parse::<CompareOp>() {
            Ok(op) => Ok(Comparison::new(Some(op), None)),
            Err(_) => Ok(Comparison::new(None, Some(rest.to_string()))),
        },
    }
}

fn range(rest: &str) -> Result<(Option<String>, Option<String>), String> {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(from), Some(to), None) => Ok((optional(from), optional(to))),
        _ => Err("usage: <from|-> <to|->".to_string()),
    }
}

/// What the loop should do after a command has been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Criteria changed; the message describes how.
    Updated(String),
    Print(String),
    Run,
    Quit,
}

/// Apply a command to the session. Everything except `run` is handled here.
pub fn apply(session: &mut Session, command: ShellCommand) -> Outcome {
    let c = &mut session.criteria;
    let toggled = |on: bool, what: &str, v: &str| {
        if on {
            format!("{what} + {v}")
        } else {
            format!("{what} - {v}")
        }
    };

    match command {
        ShellCommand::Genre(v) => {
            Outcome::Updated(toggled(Criteria::toggle(&mut c.genres, &v), "genre", &v))
        }
        ShellCommand::Country(v) => Outcome::Updated(toggled(
            Criteria::toggle(&mut c.countries, &v),
            "country",
            &v,
        )),
        ShellCommand::Actor(v) => {
            Outcome::Updated(toggled(Criteria::toggle(&mut c.actors, &v), "actor", &v))
        }
        ShellCommand::Director(v) => {
            c.director = v;
            Outcome::Updated(format!("director = {}", shown(c.director.as_deref())))
        }
        ShellCommand::Rating(cmp) => {
            c.rating = cmp;
            Outcome::Updated(format!("rating {}", shown_cmp(&c.rating)))
        }
        ShellCommand::Reviews(cmp) => {
            c.review_count = cmp;
            Outcome::Updated(format!("reviews {}", shown_cmp(&c.review_count)))
        }
        ShellCommand::Year(from, to) => {
            c.year_from = from;
            c.year_to = to;
            Outcome::Updated(format!(
                "year {} .. {}",
                shown(c.year_from.as_deref()),
                shown(c.year_to.as_deref())
            ))
        }
        ShellCommand::User(v) => {
            c.user_id = v;
            Outcome::Updated(format!("user = {}", shown(c.user_id.as_deref())))
        }
        ShellCommand::Rated(from, to) => {
            c.rated_from = from;
            c.rated_to = to;
            Outcome::Updated(format!(
                "rated {} .. {}",
                shown(c.rated_from.as_deref()),
                shown(c.rated_to.as_deref())
            ))
        }
        ShellCommand::UserRating(cmp) => {
            c.user_rating = cmp;
            Outcome::Updated(format!("user-rating {}", shown_cmp(&c.user_rating)))
        }
        ShellCommand::Tags(v) => {
            c.tags = v;
            Outcome::Updated(format!("tags = {}", shown(c.tags.as_deref())))
        }
        ShellCommand::Mode(target, mode) => {
            let slot = match target {
                ModeTarget::Genre => &mut c.genre_mode,
                ModeTarget::Actor => &mut c.actor_mode,
                ModeTarget::Tag => &mut c.tag_mode,
                ModeTarget::User => &mut c.user_mode,
            };
            *slot = mode;
            Outcome::Updated(format!("{target:?} mode = {mode:?}").to_lowercase())
        }
        ShellCommand::Combine(comb) => {
            c.combine = comb;
            Outcome::Updated(format!("combine = {}", comb.token()))
        }
        ShellCommand::Show => Outcome::Print(describe(c)),
        ShellCommand::Sql => Outcome::Print(session.preview()),
        ShellCommand::Clear => {
            session.clear();
            Outcome::Updated("selections cleared".to_string())
        }
        ShellCommand::Help => Outcome::Print(HELP.to_string()),
        ShellCommand::Run => Outcome::Run,
        ShellCommand::Quit => Outcome::Quit,
    }
}

fn shown(v: Option<&str>) -> &str {
    v.unwrap_or("-")
}

fn shown_cmp(cmp: &Comparison) -> String {
    match cmp.value.as_deref() {
        Some(v) => format!("{} {v}", cmp.op_or_default()),
        None => "-".to_string(),
    }
}

/// Human-readable summary of the current selections.
pub fn describe(c: &Criteria) -> String {
    let list = |set: &std::collections::BTreeSet<String>| {
        if set.is_empty() {
            "-".to_string()
        } else {
            set.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };
    let lines = [
        format!("genres      [{:?}] {}", c.genre_mode, list(&c.genres)),
        format!("countries   {}", list(&c.countries)),
        format!("director    {}", shown(c.director.as_deref())),
        format!("actors      [{:?}] {}", c.actor_mode, list(&c.actors)),
        format!("rating      {}", shown_cmp(&c.rating)),
        format!("reviews     {}", shown_cmp(&c.review_count)),
        format!(
            "year        {} .. {}",
            shown(c.year_from.as_deref()),
            shown(c.year_to.as_deref())
        ),
        format!(
            "user        [{:?}] id {}, rated {} .. {}, rating {}",
            c.user_mode,
            shown(c.user_id.as_deref()),
            shown(c.rated_from.as_deref()),
            shown(c.rated_to.as_deref()),
            shown_cmp(&c.user_rating)
        ),
        format!("tags        [{:?}] {}", c.tag_mode, shown(c.tags.as_deref())),
        format!("combine     {}", c.combine.token()),
    ];
    lines.join("\n")
}

/// Read commands from `input` until `quit` or end of input.
///
/// A failed query prints the statement and the error, then the loop goes on
/// so the criteria can be adjusted and run again.
pub fn run_shell<R: BufRead>(
    db: &Database,
    session: &mut Session,
    input: R,
    layout: Layout,
    label_width: usize,
) -> Result<()> {
    let mut stdout = std::io::stdout();
    println!("mvq shell. Type help for commands.");
    print!("mvq> ");
    stdout.flush()?;

    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            match parse(trimmed) {
                Ok(cmd) => match apply(session, cmd) {
                    Outcome::Updated(msg) => println!("  {msg}"),
                    Outcome::Print(text) => println!("{text}"),
                    Outcome::Quit => return Ok(()),
                    Outcome::Run => match session.run(db) {
                        Ok(results) => {
                            println!("{}\n", session.query_text());
                            table::print_results(&results, layout, label_width);
                        }
                        Err(e) => {
                            println!("{}\n", session.query_text());
                            eprintln!("Error: {:#}", anyhow::Error::from(e));
                        }
                    },
                },
                Err(e) => eprintln!("  {e}"),
            }
        }
        print!("mvq> ");
        stdout.flush()?;
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryAssembler;

    fn session() -> Session {
        Session::new(QueryAssembler::default(), 25)
    }

    fn feed(s: &mut Session, lines: &[&str]) {
        for line in lines {
            let cmd = parse(line).unwrap();
            apply(s, cmd);
        }
    }

    #[test]
    fn test_parse_toggles_keep_spaces_in_names() {
        assert_eq!(
            parse("actor  Tom Hanks").unwrap(),
            ShellCommand::Actor("Tom Hanks".into())
        );
        assert!(parse("genre").is_err());
    }

    #[test]
    fn test_parse_comparison_and_clear() {
        assert_eq!(
            parse("rating >= 7.5").unwrap(),
            ShellCommand::Rating(Comparison::new(Some(CompareOp::Ge), Some("7.5".into())))
        );
        assert_eq!(
            parse("reviews -").unwrap(),
            ShellCommand::Reviews(Comparison::default())
        );
        assert_eq!(
            parse("user-rating 4").unwrap(),
            ShellCommand::UserRating(Comparison::new(None, Some("4".into())))
        );
        assert!(parse("rating ~ 7").is_err());
    }

    #[test]
    fn test_parse_ranges_and_modes() {
        assert_eq!(
            parse("year 1990 -").unwrap(),
            ShellCommand::Year(Some("1990".into()), None)
        );
        assert!(parse("year 1990").is_err());
        assert_eq!(
            parse("mode genre all").unwrap(),
            ShellCommand::Mode(ModeTarget::Genre, MatchMode::All)
        );
        assert!(parse("mode year all").is_err());
        assert_eq!(
            parse("combine OR").unwrap(),
            ShellCommand::Combine(Combinator::Or)
        );
        assert!(parse("frobnicate").is_err());
    }

    #[test]
    fn test_toggle_twice_removes() {
        let mut s = session();
        feed(&mut s, &["genre Drama", "genre Comedy", "genre Drama"]);
        assert_eq!(s.criteria.genres.len(), 1);
        assert!(s.criteria.genres.contains("Comedy"));
    }

    #[test]
    fn test_commands_reach_assembled_sql() {
        let mut s = session();
        feed(
            &mut s,
            &[
                "director Ang Lee",
                "year 1990 2005",
                "combine or",
                "tags kung fu,wire fu",
                "mode tag all",
            ],
        );
        let sql = s.preview();
        assert!(sql.contains("(MD.director_name = 'Ang Lee')"));
        assert!(sql.contains("(M.year >= 1990 AND M.year <= 2005)"));
        assert!(sql.contains("\n    OR "));
        assert!(sql.contains("INTERSECT"));
    }

    #[test]
    fn test_bare_rating_value_compares_with_equals() {
        let mut s = session();
        feed(&mut s, &["rating 7"]);
        assert_eq!(s.criteria.rating.op_or_default(), CompareOp::Eq);
        assert!(s.preview().contains(" = 7)"));
    }

    #[test]
    fn test_tags_text_kept_as_typed() {
        let mut s = session();
        feed(&mut s, &["tags a, b"]);
        assert_eq!(s.criteria.tags.as_deref(), Some("a, b"));
        feed(&mut s, &["tags -"]);
        assert!(s.criteria.tags.is_none());
    }

    #[test]
    fn test_clear_and_control_outcomes() {
        let mut s = session();
        feed(&mut s, &["combine or", "country France"]);
        assert_eq!(
            apply(&mut s, ShellCommand::Clear),
            Outcome::Updated("selections cleared".into())
        );
        assert!(s.criteria.is_empty());
        assert_eq!(s.criteria.combine, Combinator::Or);
        assert_eq!(apply(&mut s, ShellCommand::Run), Outcome::Run);
        assert_eq!(apply(&mut s, ShellCommand::Quit), Outcome::Quit);
        match apply(&mut s, ShellCommand::Show) {
            Outcome::Print(text) => assert!(text.contains("combine     OR")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_shell_survives_failed_run() {
        let db = Database::open_in_memory().unwrap();
        db.conn.execute_batch("DROP TABLE movie_actors").unwrap();
        let mut s = session();
        let input = "actor Nobody\nrun\nactor Nobody\nrun\nquit\n".as_bytes();
        run_shell(&db, &mut s, input, Layout::Records, 25).unwrap();
        assert_eq!(s.runs(), 2);
        assert!(s.criteria.actors.is_empty());
    }
}
