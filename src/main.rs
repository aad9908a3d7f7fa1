use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use mvq::config::{self, MvqConfig};
use mvq::db::models::Lookup;
use mvq::db::Database;
use mvq::load;
use mvq::output::table::{self, format_bytes, Layout};
use mvq::output::json as json_out;
use mvq::query::{Combinator, CompareOp, Comparison, Criteria, MatchMode, QueryAssembler, Session};
use mvq::shell;

#[derive(Parser)]
#[command(name = "mvq", version, about = "Movie Query: load movie dumps into SQLite and search them by criteria")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Path to database file (default: ~/.mvq/mvq.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bulk-load .dat dump files, replacing each target table's rows
    Load {
        /// File names or glob patterns, or '*' for the default set
        files: Vec<String>,

        /// Directory the files are read from (default: ./data)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Parse and count rows without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Search movies by criteria
    Query {
        #[command(flatten)]
        criteria: CriteriaArgs,

        /// Print the assembled SQL without running it
        #[arg(long)]
        sql: bool,

        /// Result layout
        #[arg(long, value_enum)]
        layout: Option<Layout>,
    },

    /// Interactive session; selections persist between runs
    Shell,

    /// List the distinct values of a pick list
    Values {
        /// genres, countries, directors, actors or tags
        what: String,
    },

    /// Show row counts per table
    Stats,

    /// Show database info
    Info,

    /// Manage ~/.mvq/config.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a commented default config if none exists
    Init,
    /// Print the effective settings
    Show,
}

#[derive(Args, Debug, Default)]
struct CriteriaArgs {
    /// Genre to match (repeatable)
    #[arg(long = "genre")]
    genres: Vec<String>,

    /// Match any or all of the genres
    #[arg(long, value_enum)]
    genre_mode: Option<MatchMode>,

    /// Country to match (repeatable)
    #[arg(long = "country")]
    countries: Vec<String>,

    /// Director name (exact)
    #[arg(long)]
    director: Option<String>,

    /// Actor to match (repeatable)
    #[arg(long = "actor")]
    actors: Vec<String>,

    /// Match any or all of the actors
    #[arg(long, value_enum)]
    actor_mode: Option<MatchMode>,

    /// Average critic rating
    #[arg(long)]
    rating: Option<String>,

    /// Operator for --rating: =, <, >, <=, >= (default =)
    #[arg(long)]
    rating_op: Option<CompareOp>,

    /// Average number of reviews
    #[arg(long)]
    reviews: Option<String>,

    /// Operator for --reviews
    #[arg(long)]
    reviews_op: Option<CompareOp>,

    /// Earliest release year (inclusive)
    #[arg(long)]
    year_from: Option<String>,

    /// Latest release year (inclusive)
    #[arg(long)]
    year_to: Option<String>,

    /// User id for the rating filter
    #[arg(long)]
    user: Option<String>,

    /// Rated after this date (MM/DD/YYYY or YYYY-MM-DD)
    #[arg(long)]
    rated_from: Option<String>,

    /// Rated before this date
    #[arg(long)]
    rated_to: Option<String>,

    /// The user's rating
    #[arg(long)]
    user_rating: Option<String>,

    /// Operator for --user-rating
    #[arg(long)]
    user_rating_op: Option<CompareOp>,

    /// Match any or all of the user conditions
    #[arg(long, value_enum)]
    user_mode: Option<MatchMode>,

    /// Comma separated tag values
    #[arg(long)]
    tags: Option<String>,

    /// Match any or all of the tags
    #[arg(long, value_enum)]
    tag_mode: Option<MatchMode>,

    /// How sections are combined
    #[arg(long, value_enum)]
    combine: Option<Combinator>,
}

impl CriteriaArgs {
    fn into_criteria(self) -> Criteria {
        Criteria {
            genres: self.genres.into_iter().collect(),
            genre_mode: self.genre_mode.unwrap_or_default(),
            countries: self.countries.into_iter().collect(),
            director: self.director,
            actors: self.actors.into_iter().collect(),
            actor_mode: self.actor_mode.unwrap_or_default(),
            rating: Comparison::new(self.rating_op, self.rating),
            review_count: Comparison::new(self.reviews_op, self.reviews),
            year_from: self.year_from,
            year_to: self.year_to,
            user_id: self.user,
            rated_from: self.rated_from,
            rated_to: self.rated_to,
            user_rating: Comparison::new(self.user_rating_op, self.user_rating),
            user_mode: self.user_mode.unwrap_or_default(),
            tags: self.tags,
            tag_mode: self.tag_mode.unwrap_or_default(),
            combine: self.combine.unwrap_or_default(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let json_output = cli.json;
    let cfg = MvqConfig::load()?;

    let db_path = cfg.db_path(cli.db.as_deref())?;

    match cli.command {
        Commands::Load {
            files,
            data_dir,
            dry_run,
        } => {
            let data_dir = cfg.data_dir(data_dir.as_deref());
            let db = if dry_run {
                Database::open_in_memory()?
            } else {
                Database::open(&db_path)?
            };
            let stats = load::load_files(&db, &files, &data_dir, dry_run)?;

            if json_output {
                json_out::print_json(&json_out::load_payload(&stats, dry_run))?;
            } else {
                table::print_load_stats(&stats, dry_run);
                let total: usize = stats.iter().map(|s| s.rows).sum();
                let action = if dry_run { "Would load" } else { "Loaded" };
                println!(
                    "{action} {total} rows from {} file{}",
                    stats.len(),
                    if stats.len() == 1 { "" } else { "s" }
                );
            }
        }

        Commands::Query {
            criteria,
            sql,
            layout,
        } => {
            let assembler = QueryAssembler::new(cfg.quoting());
            let mut session = Session::new(assembler, cfg.label_width());
            session.criteria = criteria.into_criteria();

            if sql {
                let text = session.preview();
                if json_output {
                    json_out::print_json(&serde_json::json!({ "sql": text }))?;
                } else {
                    println!("{text}");
                }
                return Ok(());
            }

            let db = Database::open(&db_path)?;
            let results = session.run(&db)?;
            if json_output {
                json_out::print_json(&json_out::query_payload(session.query_text(), &results))?;
            } else {
                let layout = layout.unwrap_or_else(|| cfg.layout());
                table::print_results(&results, layout, cfg.label_width());
            }
        }

        Commands::Shell => {
            let db = Database::open(&db_path)?;
            let mut session = Session::new(QueryAssembler::new(cfg.quoting()), cfg.label_width());
            let stdin = std::io::stdin();
            shell::run_shell(
                &db,
                &mut session,
                stdin.lock(),
                cfg.layout(),
                cfg.label_width(),
            )?;
        }

        Commands::Values { what } => {
            let lookup = Lookup::from_str(&what)?;
            let db = Database::open(&db_path)?;
            let values = db.distinct_values(lookup)?;
            if json_output {
                json_out::print_json(&values)?;
            } else {
                table::print_values(&values);
            }
        }

        Commands::Stats => {
            let db = Database::open(&db_path)?;
            let stats = db.stats()?;
            if json_output {
                json_out::print_json(&stats)?;
            } else {
                table::print_stats(&stats);
            }
        }

        Commands::Info => {
            let db = Database::open(&db_path)?;
            let stats = db.stats()?;
            let schema_ver = db
                .schema_version()?
                .unwrap_or_else(|| "unknown".to_string());
            let movies = stats
                .tables
                .iter()
                .find(|t| t.table == "movies")
                .map_or(0, |t| t.rows);

            if json_output {
                json_out::print_json(&serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "schema_version": schema_ver,
                    "db_path": db.path.display().to_string(),
                    "db_size_bytes": stats.db_size_bytes,
                    "movies": movies,
                }))?;
            } else {
                println!("mvq v{}", env!("CARGO_PKG_VERSION"));
                println!("  Schema:   v{schema_ver}");
                println!("  Database: {}", db.path.display());
                println!("  Size:     {}", format_bytes(stats.db_size_bytes));
                println!("  Movies:   {movies}");
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Init => {
                let path = config::config_path()?;
                if config::init_config()? {
                    println!("Created {}", path.display());
                } else {
                    println!("Config already exists: {}", path.display());
                }
            }
            ConfigAction::Show => {
                if json_output {
                    json_out::print_json(&cfg)?;
                } else {
                    println!("# {}", config::config_path()?.display());
                    println!("{}", cfg.display());
                }
            }
        },
    }

    Ok(())
}
