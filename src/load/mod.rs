pub mod encoding;
pub mod mapping;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::db::Database;
use mapping::{table_for_file, DataFile};

/// Files loaded by `mvq load '*'`.
pub const DEFAULT_FILES: [&str; 7] = [
    "movies.dat",
    "movie_actors.dat",
    "movie_countries.dat",
    "movie_directors.dat",
    "movie_genres.dat",
    "user_ratedmovies.dat",
    "user_taggedmovies.dat",
];

/// Number of files a complete load uses.
const FULL_SET: usize = 8;

/// Outcome of loading one file.
#[derive(Debug, Clone, Serialize)]
pub struct LoadStats {
    pub file: String,
    pub table: String,
    pub rows: usize,
    pub skipped: usize,
}

/// Files in load order, plus warnings about what looks missing.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadPlan {
    pub files: Vec<String>,
    pub warnings: Vec<String>,
}

/// Decide which files to load and in what order.
///
/// `*` alone means the default set. Otherwise `movies.dat` goes first and
/// `tags.dat` second, since other tables refer to them.
pub fn plan(args: &[String]) -> LoadPlan {
    if args.len() == 1 && args[0] == "*" {
        return LoadPlan {
            files: DEFAULT_FILES.iter().map(|f| f.to_string()).collect(),
            warnings: Vec::new(),
        };
    }

    let is_named = |arg: &str, name: &str| file_name(arg) == name;
    let mut files: Vec<String> = Vec::with_capacity(args.len());
    files.extend(args.iter().filter(|a| is_named(a, "movies.dat")).cloned());
    files.extend(args.iter().filter(|a| is_named(a, "tags.dat")).cloned());
    files.extend(
        args.iter()
            .filter(|a| !is_named(a, "movies.dat") && !is_named(a, "tags.dat"))
            .cloned(),
    );

    let mut warnings = Vec::new();
    if !args.iter().any(|a| is_named(a, "movies.dat")) {
        warnings.push("movies.dat is not being loaded; other tables depend on it".to_string());
    }
    if !args.iter().any(|a| is_named(a, "tags.dat")) {
        warnings.push("tags.dat is not being loaded; tag searches depend on it".to_string());
    }
    if args.len() < FULL_SET {
        warnings.push("fewer than 8 data files given; one or more tables may stay empty".to_string());
    }

    LoadPlan { files, warnings }
}

/// Expand glob patterns against the data directory. Plain names pass through.
pub fn expand_args(args: &[String], data_dir: &Path) -> Result<Vec<String>> {
    let mut expanded = Vec::new();
    for arg in args {
        if arg == "*" || !arg.contains(['*', '?', '[']) {
            expanded.push(arg.clone());
            continue;
        }

        let pattern = data_dir.join(arg);
        let pattern = pattern.to_string_lossy();
        let mut matches: Vec<String> = glob::glob(&pattern)
            .with_context(|| format!("Invalid glob pattern: {arg}"))?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();

        if matches.is_empty() {
            bail!("No files found matching: {}", pattern);
        }
        matches.sort();
        expanded.append(&mut matches);
    }
    Ok(expanded)
}

/// Load every file in `args` (after globbing and ordering) into its table.
pub fn load_files(
    db: &Database,
    args: &[String],
    data_dir: &Path,
    dry_run: bool,
) -> Result<Vec<LoadStats>> {
    if args.is_empty() {
        bail!("No files given. Pass file names, glob patterns, or '*' for the default set.");
    }

    let expanded = expand_args(args, data_dir)?;
    let plan = plan(&expanded);
    for w in &plan.warnings {
        warn!("{w}");
    }

    let mut stats = Vec::new();
    for file in &plan.files {
        if let Some(s) = load_file(db, &resolve(file, data_dir), dry_run)? {
            stats.push(s);
        }
    }
    Ok(stats)
}

/// Load one dump file. Returns `None` when the file is skipped entirely.
pub fn load_file(db: &Database, path: &Path, dry_run: bool) -> Result<Option<LoadStats>> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let table = table_for_file(&name).to_string();

    let Some(kind) = DataFile::from_file_name(&name) else {
        warn!("Skipping {name}: not a known data file");
        return Ok(None);
    };

    let columns = db.table_columns(&table)?;
    if columns.is_empty() {
        warn!("Skipping {name}: table {table} does not exist");
        return Ok(None);
    }

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            warn!("Skipping {name}: cannot read {}: {e}", path.display());
            return Ok(None);
        }
    };
    let content = kind.encoding().decode(&bytes);

    let mut rows = Vec::new();
    let mut skipped = 0;
    // First line is the header.
    for (idx, line) in content.lines().enumerate().skip(1) {
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        match kind.map_fields(&fields) {
            Ok(row) => {
                if row.len() != columns.len() {
                    bail!(
                        "{name} maps to {} columns but table {table} has {}",
                        row.len(),
                        columns.len()
                    );
                }
                rows.push(row);
            }
            Err(reason) => {
                warn!("{name} line {}: {reason}; skipped", idx + 1);
                skipped += 1;
            }
        }
    }

    let inserted = if dry_run {
        rows.len()
    } else {
        db.replace_rows(&table, columns.len(), &rows)
            .with_context(|| format!("Failed to load {name} into {table}"))?
    };

    info!("Loaded {name}: {inserted} rows into {table}, {skipped} skipped");

    Ok(Some(LoadStats {
        file: name,
        table,
        rows: inserted,
        skipped,
    }))
}

/// A bare file name is looked up in the data directory; anything that exists
/// as given is used as is.
fn resolve(arg: &str, data_dir: &Path) -> PathBuf {
    let given = Path::new(arg);
    if given.exists() {
        given.to_path_buf()
    } else {
        data_dir.join(arg)
    }
}

fn file_name(arg: &str) -> &str {
    Path::new(arg)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(arg)
}
