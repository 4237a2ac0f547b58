use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MARKER: &str = "papel";
pub const DEFAULT_SHEET_TAB: &str = "Dados";
pub const DEFAULT_TOP_LEFT: &str = "A1";
pub const DEFAULT_CONTROL_LABELS: &[&str] = &["Buscar", "Pesquisar", "Filtrar", "Search"];

pub const DEFAULT_NAV_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_AFTER_ACTION_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_TABLE_TIMEOUT_MS: u64 = 20_000;

/// Number of characters of page markup carried by a `TableNotFound` error.
pub const DIAGNOSTIC_PREFIX_CHARS: usize = 2_000;

pub type Row = Vec<String>;
pub type Table = Vec<Row>;

/// One table-like element found on a rendered page.
///
/// `visible_text` is `None` when the renderer could not read the element's
/// text; such a candidate never matches the marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    pub visible_text: Option<String>,
    pub outer_html: String,
}

impl Candidate {
    pub fn new(visible_text: impl Into<String>, outer_html: impl Into<String>) -> Self {
        Self {
            visible_text: Some(visible_text.into()),
            outer_html: outer_html.into(),
        }
    }

    pub fn unreadable(outer_html: impl Into<String>) -> Self {
        Self {
            visible_text: None,
            outer_html: outer_html.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedBy {
    Marker,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedTable {
    pub index: usize,
    pub outer_html: String,
    pub resolved_by: ResolvedBy,
}

/// Result of one bounded wait against the renderer. Only `Ready` means the
/// condition was observed; callers proceed in every case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlOutcome {
    Activated,
    NotFound,
    Failed(String),
}

/// Tuning for one extraction call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub marker: String,
    pub control_labels: Vec<String>,
    pub network_idle: Duration,
    pub after_action: Duration,
    pub table_wait: Duration,
    pub diagnostic_prefix_chars: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            control_labels: DEFAULT_CONTROL_LABELS
                .iter()
                .map(|label| (*label).to_string())
                .collect(),
            network_idle: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
            after_action: Duration::from_millis(DEFAULT_AFTER_ACTION_TIMEOUT_MS),
            table_wait: Duration::from_millis(DEFAULT_TABLE_TIMEOUT_MS),
            diagnostic_prefix_chars: DIAGNOSTIC_PREFIX_CHARS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunReport {
    pub row_count: usize,
    pub column_count: usize,
    pub resolved_by: ResolvedBy,
    pub destination: String,
}
