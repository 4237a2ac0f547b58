pub mod browser;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod publish;
pub mod render;
pub mod sheets;
pub mod static_page;
pub mod table_parse;
pub mod table_select;

pub use config::{Cli, Config};
pub use error::JobError;
pub use models::{Candidate, ResolvedBy, RunReport, SelectedTable, Table};
pub use normalize::normalize_cell;
pub use pipeline::{extract_table, run, run_with};
pub use table_parse::{into_rectangular, parse_table};
pub use table_select::{candidates_from_html, select_table};
