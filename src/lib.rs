pub mod config;
pub mod db;
pub mod error;
pub mod load;
pub mod output;
pub mod query;
pub mod shell;
