//! Renderer for pages that need no script execution: markup is read from a
//! local file or fetched with a plain GET.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use url::Url;

use crate::error::JobError;
use crate::models::{Candidate, ControlOutcome, WaitOutcome};
use crate::render::{RenderedPage, Renderer};
use crate::table_select::candidates_from_html;

#[derive(Debug, Clone)]
pub enum StaticSource {
    File(PathBuf),
    Http(reqwest::Client),
}

#[derive(Debug, Clone)]
pub struct StaticRenderer {
    source: StaticSource,
}

impl StaticRenderer {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: StaticSource::File(path.into()),
        }
    }

    pub fn http() -> Self {
        Self {
            source: StaticSource::Http(reqwest::Client::new()),
        }
    }
}

#[async_trait]
impl Renderer for StaticRenderer {
    async fn open(
        &self,
        url: &Url,
        nav_timeout: Duration,
    ) -> Result<Box<dyn RenderedPage>, JobError> {
        let html = match &self.source {
            StaticSource::File(path) => {
                info!("reading page markup from {}", path.display());
                tokio::fs::read_to_string(path).await?
            }
            StaticSource::Http(client) => {
                info!("fetching {url}");
                let response = client
                    .get(url.clone())
                    .timeout(nav_timeout)
                    .send()
                    .await?;
                let status = response.status();
                if status.as_u16() >= 400 {
                    return Err(JobError::Render(format!(
                        "failed to fetch source page: status {status}"
                    )));
                }
                response.text().await?
            }
        };

        Ok(Box::new(StaticPage::new(html)))
    }
}

/// Already-complete markup; every wait is satisfied immediately.
#[derive(Debug, Clone)]
pub struct StaticPage {
    html: String,
}

impl StaticPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

#[async_trait]
impl RenderedPage for StaticPage {
    async fn wait_for_network_idle(&self, _timeout: Duration) -> WaitOutcome {
        WaitOutcome::Ready
    }

    async fn activate_control(&self, _label: &str) -> ControlOutcome {
        ControlOutcome::NotFound
    }

    async fn wait_for_table(&self, _timeout: Duration) -> WaitOutcome {
        if candidates_from_html(&self.html).is_empty() {
            WaitOutcome::TimedOut
        } else {
            WaitOutcome::Ready
        }
    }

    async fn candidate_tables(&self) -> Result<Vec<Candidate>, JobError> {
        Ok(candidates_from_html(&self.html))
    }

    async fn page_markup(&self) -> Result<String, JobError> {
        Ok(self.html.clone())
    }

    async fn close(self: Box<Self>) -> Result<(), JobError> {
        Ok(())
    }
}
