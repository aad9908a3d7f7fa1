use tracing::{debug, warn};

use super::assemble::QueryAssembler;
use super::criteria::Criteria;
use crate::db::models::ResultTable;
use crate::db::Database;
use crate::error::MvqError;
use crate::output::table::format_records;

/// One interactive search session.
///
/// The criteria persist across runs until [`Session::clear`] is called. The
/// query text and result text describe only the latest run.
#[derive(Debug, Default)]
pub struct Session {
    pub criteria: Criteria,
    assembler: QueryAssembler,
    label_width: usize,
    query_text: String,
    result_text: String,
    runs: usize,
}

impl Session {
    pub fn new(assembler: QueryAssembler, label_width: usize) -> Self {
        Session {
            assembler,
            label_width,
            ..Default::default()
        }
    }

    /// SQL of the latest run, empty before the first run.
    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    /// Formatted rows of the latest successful run.
    pub fn result_text(&self) -> &str {
        &self.result_text
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    /// SQL the current criteria would produce, without running it.
    pub fn preview(&self) -> String {
        self.assembler.assemble(&self.criteria)
    }

    /// Build and execute the query for the current criteria.
    ///
    /// On failure the query text still shows the statement that failed and the
    /// result text stays empty.
    pub fn run(&mut self, db: &Database) -> Result<ResultTable, MvqError> {
        self.reset();
        self.runs += 1;

        let query = self.assembler.build(&self.criteria);
        self.query_text = query.sql;
        debug!(run = self.runs, sections = query.predicates.len(), "Running query");

        match db.run_query(&self.query_text) {
            Ok(table) => {
                self.result_text = format_records(&table, self.label_width);
                Ok(table)
            }
            Err(e) => {
                warn!(code = ?e.code(), "Query failed: {e}");
                Err(e)
            }
        }
    }

    /// Drop the display artifacts of the previous run. Criteria are kept.
    pub fn reset(&mut self) {
        self.query_text.clear();
        self.result_text.clear();
    }

    /// Forget every selection.
    pub fn clear(&mut self) {
        let combine = self.criteria.combine;
        self.criteria = Criteria {
            combine,
            ..Criteria::default()
        };
        self.reset();
    }
}
