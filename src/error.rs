use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("no table found on page (page length {page_len}); page starts with: {prefix}")]
    TableNotFound { page_len: usize, prefix: String },

    #[error("table {selected_index} of {candidates} candidate(s) parsed to zero rows")]
    EmptyTable {
        candidates: usize,
        selected_index: usize,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
}

/// `EX_USAGE`: the job is misconfigured and retrying will not help.
pub const EXIT_CONFIG: u8 = 64;

impl JobError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TableNotFound { .. } => "table_not_found",
            Self::EmptyTable { .. } => "empty_table",
            Self::Config(_) => "config_error",
            Self::Render(_) => "render_error",
            Self::Publish(_) => "publish_error",
            Self::Auth(_) => "auth_error",
            Self::Http(_) => "http_error",
            Self::Json(_) => "json_error",
            Self::Url(_) => "url_error",
            Self::Io(_) => "io_error",
            Self::Csv(_) => "csv_error",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::TableNotFound { .. } => 2,
            Self::EmptyTable { .. } => 3,
            Self::Config(_) => EXIT_CONFIG,
            _ => 1,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JobError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        Self::Auth(error.to_string())
    }
}

impl From<chromiumoxide::error::CdpError> for JobError {
    fn from(error: chromiumoxide::error::CdpError) -> Self {
        Self::Render(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::JobError;

    #[test]
    fn not_found_and_empty_table_have_distinct_exit_codes() {
        let not_found = JobError::TableNotFound {
            page_len: 10,
            prefix: "<html>".to_string(),
        };
        let empty = JobError::EmptyTable {
            candidates: 1,
            selected_index: 0,
        };

        assert_eq!(not_found.code(), "table_not_found");
        assert_eq!(empty.code(), "empty_table");
        assert_ne!(not_found.exit_code(), empty.exit_code());
        assert_eq!(JobError::Publish("boom".to_string()).exit_code(), 1);
    }
}
