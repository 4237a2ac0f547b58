use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use regex::Regex;
use url::Url;

use crate::browser::ChromiumSettings;
use crate::error::{EXIT_CONFIG, JobError};
use crate::models::{
    DEFAULT_AFTER_ACTION_TIMEOUT_MS, DEFAULT_CONTROL_LABELS, DEFAULT_IDLE_TIMEOUT_MS,
    DEFAULT_MARKER, DEFAULT_NAV_TIMEOUT_MS, DEFAULT_SHEET_TAB, DEFAULT_TABLE_TIMEOUT_MS,
    DEFAULT_TOP_LEFT, DIAGNOSTIC_PREFIX_CHARS, ExtractOptions,
};
use crate::publish::CsvTarget;
use crate::sheets::{Credentials, SheetTarget, ValueInputOption};

static A1_CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]{1,3}[1-9][0-9]{0,6}$").expect("hardcoded A1 cell regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererKind {
    /// Drive a headless Chromium and run the page's scripts.
    Chromium,
    /// Plain HTTP GET; for pages that render the table server-side.
    Static,
}

#[derive(Debug, Parser)]
#[command(
    name = "table-sheet-sync",
    version,
    about = "Scrape a rendered HTML table and overwrite a spreadsheet tab with it"
)]
pub struct Cli {
    /// Page that renders the target table.
    #[arg(long, env = "TARGET_URL")]
    pub url: String,

    /// Case-insensitive text identifying the target table.
    #[arg(long, env = "MARKER_TOKEN", default_value = DEFAULT_MARKER)]
    pub marker: String,

    /// Labels of controls that generate the results, tried in order. Repeatable.
    #[arg(long = "control-label", env = "CONTROL_LABELS", value_delimiter = ',')]
    pub control_labels: Vec<String>,

    /// Skip clicking any result-generation control; wins over CONTROL_LABELS.
    #[arg(long)]
    pub no_controls: bool,

    #[arg(long, default_value_t = DEFAULT_NAV_TIMEOUT_MS)]
    pub nav_timeout_ms: u64,

    #[arg(long, default_value_t = DEFAULT_IDLE_TIMEOUT_MS)]
    pub idle_timeout_ms: u64,

    #[arg(long, default_value_t = DEFAULT_AFTER_ACTION_TIMEOUT_MS)]
    pub after_action_timeout_ms: u64,

    #[arg(long, default_value_t = DEFAULT_TABLE_TIMEOUT_MS)]
    pub table_timeout_ms: u64,

    #[arg(long, value_enum, env = "RENDERER", default_value_t = RendererKind::Chromium)]
    pub renderer: RendererKind,

    /// Chromium executable; detected automatically when omitted.
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// Launch Chromium with --no-sandbox (needed in most containers).
    #[arg(long)]
    pub no_sandbox: bool,

    /// Show the browser window.
    #[arg(long)]
    pub headful: bool,

    /// Read page markup from a saved HTML file instead of the network.
    #[arg(long)]
    pub html_file: Option<PathBuf>,

    #[arg(long, env = "SPREADSHEET_ID")]
    pub spreadsheet_id: Option<String>,

    #[arg(long, env = "SHEET_TAB", default_value = DEFAULT_SHEET_TAB)]
    pub sheet_tab: String,

    /// Anchor cell of the written range, in A1 notation.
    #[arg(long, env = "TOP_LEFT_CELL", default_value = DEFAULT_TOP_LEFT)]
    pub top_left: String,

    /// Path to a service-account JSON key.
    #[arg(long = "credentials", env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials_path: Option<PathBuf>,

    #[arg(long, env = "GOOGLE_SERVICE_ACCOUNT_JSON", hide = true, hide_env_values = true)]
    pub service_account_json: Option<String>,

    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide = true, hide_env_values = true)]
    pub access_token: Option<String>,

    #[arg(long, value_enum, default_value_t = ValueInputOption::Raw)]
    pub value_input_option: ValueInputOption,

    /// Write the table as CSV to this path (`-` for stdout) instead of Sheets.
    #[arg(long)]
    pub csv_out: Option<String>,

    /// CSV delimiter character.
    #[arg(long, default_value = ",")]
    pub delimiter: char,

    /// Save the full page markup here when no table is found.
    #[arg(long)]
    pub dump_html: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Exit status for a rejected command line. `--help` and `--version`
    /// succeed; every other argument error counts as bad configuration.
    pub fn usage_exit_code(error: &clap::Error) -> u8 {
        if error.use_stderr() { EXIT_CONFIG } else { 0 }
    }
}

#[derive(Debug, Clone)]
pub enum RendererConfig {
    Chromium(ChromiumSettings),
    StaticHttp,
    StaticFile(PathBuf),
}

#[derive(Debug, Clone)]
pub enum Destination {
    Csv {
        target: CsvTarget,
        delimiter: u8,
    },
    Sheets {
        target: SheetTarget,
        credentials: Credentials,
        value_input: ValueInputOption,
    },
}

/// Validated job configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub url: Url,
    pub nav_timeout: Duration,
    pub extract: ExtractOptions,
    pub renderer: RendererConfig,
    pub destination: Destination,
    pub dump_html: Option<PathBuf>,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, JobError> {
        let url = Url::parse(cli.url.trim())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(JobError::Config(format!(
                "url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        let control_labels = if cli.no_controls {
            Vec::new()
        } else if cli.control_labels.is_empty() {
            DEFAULT_CONTROL_LABELS
                .iter()
                .map(|label| (*label).to_string())
                .collect()
        } else {
            cli.control_labels
                .iter()
                .map(|label| label.trim().to_string())
                .filter(|label| !label.is_empty())
                .collect()
        };

        let extract = ExtractOptions {
            marker: cli.marker.trim().to_string(),
            control_labels,
            network_idle: positive_millis("idle-timeout-ms", cli.idle_timeout_ms)?,
            after_action: positive_millis("after-action-timeout-ms", cli.after_action_timeout_ms)?,
            table_wait: positive_millis("table-timeout-ms", cli.table_timeout_ms)?,
            diagnostic_prefix_chars: DIAGNOSTIC_PREFIX_CHARS,
        };
        let nav_timeout = positive_millis("nav-timeout-ms", cli.nav_timeout_ms)?;

        let renderer = match (&cli.html_file, cli.renderer) {
            (Some(path), _) => RendererConfig::StaticFile(path.clone()),
            (None, RendererKind::Static) => RendererConfig::StaticHttp,
            (None, RendererKind::Chromium) => RendererConfig::Chromium(ChromiumSettings {
                executable: cli.chrome_path.clone(),
                no_sandbox: cli.no_sandbox,
                headful: cli.headful,
                ..ChromiumSettings::default()
            }),
        };

        let destination = destination_from_cli(&cli)?;

        Ok(Self {
            url,
            nav_timeout,
            extract,
            renderer,
            destination,
            dump_html: cli.dump_html,
        })
    }
}

fn destination_from_cli(cli: &Cli) -> Result<Destination, JobError> {
    if let Some(csv_out) = &cli.csv_out {
        if !cli.delimiter.is_ascii() {
            return Err(JobError::Config(
                "delimiter must be a single ASCII character".to_string(),
            ));
        }
        return Ok(Destination::Csv {
            target: CsvTarget::parse(csv_out),
            delimiter: cli.delimiter as u8,
        });
    }

    let spreadsheet_id = cli
        .spreadsheet_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            JobError::Config("spreadsheet id is required unless --csv-out is given".to_string())
        })?;

    let tab = cli.sheet_tab.trim();
    if tab.is_empty() {
        return Err(JobError::Config("sheet tab must not be empty".to_string()));
    }

    let top_left = cli.top_left.trim();
    if !A1_CELL_RE.is_match(top_left) {
        return Err(JobError::Config(format!(
            "top-left cell '{top_left}' is not in A1 notation"
        )));
    }

    Ok(Destination::Sheets {
        target: SheetTarget {
            spreadsheet_id: spreadsheet_id.to_string(),
            tab: tab.to_string(),
            top_left: top_left.to_ascii_uppercase(),
        },
        credentials: credentials_from_cli(cli)?,
        value_input: cli.value_input_option,
    })
}

fn credentials_from_cli(cli: &Cli) -> Result<Credentials, JobError> {
    if let Some(token) = cli.access_token.as_deref().filter(|t| !t.trim().is_empty()) {
        return Ok(Credentials::AccessToken(token.trim().to_string()));
    }
    if let Some(json) = cli
        .service_account_json
        .as_deref()
        .filter(|j| !j.trim().is_empty())
    {
        return Credentials::from_service_account_json(json);
    }
    if let Some(path) = &cli.credentials_path {
        let json = std::fs::read_to_string(path).map_err(|error| {
            JobError::Config(format!(
                "cannot read credentials file '{}': {error}",
                path.display()
            ))
        })?;
        return Credentials::from_service_account_json(&json);
    }

    Err(JobError::Config(
        "no Google credentials: set GOOGLE_APPLICATION_CREDENTIALS, \
         GOOGLE_SERVICE_ACCOUNT_JSON or GOOGLE_OAUTH_ACCESS_TOKEN"
            .to_string(),
    ))
}

fn positive_millis(name: &str, millis: u64) -> Result<Duration, JobError> {
    if millis == 0 {
        return Err(JobError::Config(format!("{name} must be greater than 0")));
    }
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;

    use super::{Cli, Config, Destination, RendererConfig};
    use crate::error::JobError;
    use crate::publish::CsvTarget;
    use crate::sheets::Credentials;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["table-sheet-sync"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments parse")
    }

    #[test]
    fn csv_dry_run_needs_no_spreadsheet() {
        let config = Config::from_cli(parse(&[
            "--url",
            "https://example.com/resultado.php",
            "--csv-out",
            "-",
            "--html-file",
            "page.html",
        ]))
        .expect("valid config");

        assert!(matches!(
            config.destination,
            Destination::Csv {
                target: CsvTarget::Stdout,
                delimiter: b','
            }
        ));
        assert!(matches!(config.renderer, RendererConfig::StaticFile(_)));
        assert_eq!(config.extract.marker, "papel");
        assert_eq!(config.extract.control_labels.len(), 4);
        assert_eq!(config.nav_timeout, Duration::from_secs(60));
    }

    #[test]
    fn sheets_destination_uses_access_token() {
        let config = Config::from_cli(parse(&[
            "--url",
            "https://example.com/",
            "--spreadsheet-id",
            "sheet-123",
            "--top-left",
            "b2",
            "--access-token",
            "ya29.token",
        ]))
        .expect("valid config");

        let Destination::Sheets {
            target,
            credentials,
            ..
        } = config.destination
        else {
            panic!("expected sheets destination");
        };
        assert_eq!(target.spreadsheet_id, "sheet-123");
        assert_eq!(target.top_left, "B2");
        assert_eq!(credentials, Credentials::AccessToken("ya29.token".to_string()));
    }

    #[test]
    fn rejects_non_http_urls() {
        let error = Config::from_cli(parse(&["--url", "file:///tmp/x.html", "--csv-out", "-"]))
            .expect_err("must fail");
        assert_eq!(error.code(), "config_error");
    }

    #[test]
    fn rejects_zero_timeouts() {
        let error = Config::from_cli(parse(&[
            "--url",
            "https://example.com/",
            "--csv-out",
            "-",
            "--table-timeout-ms",
            "0",
        ]))
        .expect_err("must fail");
        assert!(error.to_string().contains("table-timeout-ms"));
    }

    #[test]
    fn no_controls_clears_labels() {
        let config = Config::from_cli(parse(&[
            "--url",
            "https://example.com/",
            "--csv-out",
            "out.csv",
            "--no-controls",
        ]))
        .expect("valid config");
        assert!(config.extract.control_labels.is_empty());
    }

    #[test]
    fn explicit_control_labels_split_on_commas() {
        let config = Config::from_cli(parse(&[
            "--url",
            "https://example.com/",
            "--csv-out",
            "-",
            "--control-label",
            "Mostrar, Aplicar",
        ]))
        .expect("valid config");
        assert_eq!(config.extract.control_labels, vec!["Mostrar", "Aplicar"]);
    }

    #[test]
    fn no_controls_wins_over_explicit_labels() {
        let config = Config::from_cli(parse(&[
            "--url",
            "https://example.com/",
            "--csv-out",
            "-",
            "--control-label",
            "Mostrar",
            "--no-controls",
        ]))
        .expect("valid config");
        assert!(config.extract.control_labels.is_empty());
    }

    #[test]
    fn missing_url_exits_with_config_code() {
        let error = Cli::try_parse_from(["table-sheet-sync", "--csv-out", "-"])
            .expect_err("url is required");
        assert_eq!(Cli::usage_exit_code(&error), 64);
        assert_ne!(
            Cli::usage_exit_code(&error),
            JobError::TableNotFound {
                page_len: 0,
                prefix: String::new(),
            }
            .exit_code()
        );
    }

    #[test]
    fn malformed_argument_exits_with_config_code() {
        let error = Cli::try_parse_from([
            "table-sheet-sync",
            "--url",
            "https://example.com/",
            "--nav-timeout-ms",
            "soon",
        ])
        .expect_err("timeout must be numeric");
        assert_eq!(Cli::usage_exit_code(&error), 64);
    }

    #[test]
    fn help_and_version_exit_cleanly() {
        for flag in ["--help", "--version"] {
            let error = Cli::try_parse_from(["table-sheet-sync", flag]).expect_err("early exit");
            assert_eq!(Cli::usage_exit_code(&error), 0, "{flag}");
        }
    }
}
