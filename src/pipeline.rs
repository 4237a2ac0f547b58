//! Extraction pipeline: settle the page, pick the target table, parse it and
//! hand the rows to the publisher.
//!
//! Every wait is a single bounded attempt whose timeout is logged and
//! ignored. Only a missing table and an empty parse are hard failures, and
//! the rendered page is closed on every path.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::browser::ChromiumRenderer;
use crate::config::{Config, Destination, RendererConfig};
use crate::error::JobError;
use crate::models::{ControlOutcome, ExtractOptions, ResolvedBy, RunReport, Table, WaitOutcome};
use crate::publish::{CsvPublisher, TablePublisher};
use crate::render::{RenderedPage, Renderer};
use crate::sheets::{SheetsClient, SheetsPublisher};
use crate::static_page::StaticRenderer;
use crate::table_parse::{column_count, into_rectangular, parse_table};
use crate::table_select::select_table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub table: Table,
    pub resolved_by: ResolvedBy,
}

pub async fn extract_table(
    page: &dyn RenderedPage,
    options: &ExtractOptions,
) -> Result<Extraction, JobError> {
    log_wait(
        "network idle",
        page.wait_for_network_idle(options.network_idle).await,
    );

    trigger_results(page, options).await;

    log_wait(
        "table element",
        page.wait_for_table(options.table_wait).await,
    );

    let candidates = page.candidate_tables().await?;
    debug!("found {} candidate table(s)", candidates.len());

    let Some(selected) = select_table(&candidates, &options.marker) else {
        let markup = page.page_markup().await.unwrap_or_else(|error| {
            warn!("could not read page markup for diagnostics: {error}");
            String::new()
        });
        return Err(table_not_found(&markup, options.diagnostic_prefix_chars));
    };

    match selected.resolved_by {
        ResolvedBy::Marker => info!(
            "selected table {} of {} by marker '{}'",
            selected.index,
            candidates.len(),
            options.marker
        ),
        ResolvedBy::Fallback => warn!(
            "no table contains marker '{}'; falling back to the first of {} table(s)",
            options.marker,
            candidates.len()
        ),
    }

    let table = parse_table(&selected.outer_html);
    if table.is_empty() {
        return Err(JobError::EmptyTable {
            candidates: candidates.len(),
            selected_index: selected.index,
        });
    }

    info!(
        "parsed {} row(s), widest row has {} cell(s)",
        table.len(),
        column_count(&table)
    );
    Ok(Extraction {
        table,
        resolved_by: selected.resolved_by,
    })
}

/// Activates the first control whose label matches, then waits once for
/// the page to settle again.
async fn trigger_results(page: &dyn RenderedPage, options: &ExtractOptions) {
    for label in &options.control_labels {
        match page.activate_control(label).await {
            ControlOutcome::Activated => {
                info!("activated control '{label}'");
                log_wait(
                    "network idle after activation",
                    page.wait_for_network_idle(options.after_action).await,
                );
                return;
            }
            ControlOutcome::NotFound => debug!("no control labelled '{label}'"),
            ControlOutcome::Failed(error) => warn!("activating control '{label}' failed: {error}"),
        }
    }
}

fn log_wait(what: &str, outcome: WaitOutcome) {
    match outcome {
        WaitOutcome::Ready => debug!("wait for {what}: ready"),
        WaitOutcome::TimedOut => info!("wait for {what} timed out; continuing"),
        WaitOutcome::Failed(error) => warn!("wait for {what} failed: {error}; continuing"),
    }
}

fn table_not_found(markup: &str, prefix_chars: usize) -> JobError {
    JobError::TableNotFound {
        page_len: markup.len(),
        prefix: markup.chars().take(prefix_chars).collect(),
    }
}

/// Opens the page, extracts, releases the page and publishes on success.
pub async fn run_with(
    renderer: &dyn Renderer,
    publisher: &dyn TablePublisher,
    config: &Config,
) -> Result<RunReport, JobError> {
    let page = renderer.open(&config.url, config.nav_timeout).await?;
    let extracted = extract_table(page.as_ref(), &config.extract).await;

    if let (Err(JobError::TableNotFound { .. }), Some(path)) = (&extracted, &config.dump_html) {
        dump_page(page.as_ref(), path).await;
    }
    if let Err(error) = page.close().await {
        warn!("failed to release rendered page: {error}");
    }

    let Extraction { table, resolved_by } = extracted?;
    let rows = into_rectangular(table);
    let report = RunReport {
        row_count: rows.len(),
        column_count: column_count(&rows),
        resolved_by,
        destination: publisher.describe(),
    };

    info!("publishing {} row(s) to {}", report.row_count, report.destination);
    publisher.publish(&rows).await?;
    Ok(report)
}

pub async fn run(config: &Config) -> Result<RunReport, JobError> {
    let renderer = build_renderer(&config.renderer);
    let publisher = build_publisher(&config.destination);
    run_with(renderer.as_ref(), publisher.as_ref(), config).await
}

pub fn build_renderer(renderer: &RendererConfig) -> Box<dyn Renderer> {
    match renderer {
        RendererConfig::Chromium(settings) => Box::new(ChromiumRenderer::new(settings.clone())),
        RendererConfig::StaticHttp => Box::new(StaticRenderer::http()),
        RendererConfig::StaticFile(path) => Box::new(StaticRenderer::from_file(path.clone())),
    }
}

pub fn build_publisher(destination: &Destination) -> Box<dyn TablePublisher> {
    match destination {
        Destination::Csv { target, delimiter } => {
            Box::new(CsvPublisher::new(target.clone(), *delimiter))
        }
        Destination::Sheets {
            target,
            credentials,
            value_input,
        } => Box::new(SheetsPublisher::new(
            SheetsClient::new(credentials.clone()),
            target.clone(),
            *value_input,
        )),
    }
}

async fn dump_page(page: &dyn RenderedPage, path: &Path) {
    match page.page_markup().await {
        Ok(markup) => match tokio::fs::write(path, markup).await {
            Ok(()) => info!("saved page markup to {}", path.display()),
            Err(error) => warn!("could not save page markup to {}: {error}", path.display()),
        },
        Err(error) => warn!("could not read page markup: {error}"),
    }
}
