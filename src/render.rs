//! Render collaborator seam.
//!
//! A `Renderer` opens the target page; the returned `RenderedPage` is owned
//! exclusively by one run and must be released through `close`.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::JobError;
use crate::models::{Candidate, ControlOutcome, WaitOutcome};

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigate to `url` and return the loaded page.
    async fn open(&self, url: &Url, nav_timeout: Duration)
    -> Result<Box<dyn RenderedPage>, JobError>;
}

#[async_trait]
pub trait RenderedPage: Send + Sync {
    async fn wait_for_network_idle(&self, timeout: Duration) -> WaitOutcome;

    /// Find the first visible control labelled `label` and activate it.
    async fn activate_control(&self, label: &str) -> ControlOutcome;

    async fn wait_for_table(&self, timeout: Duration) -> WaitOutcome;

    /// All table elements currently on the page, in document order.
    async fn candidate_tables(&self) -> Result<Vec<Candidate>, JobError>;

    async fn page_markup(&self) -> Result<String, JobError>;

    async fn close(self: Box<Self>) -> Result<(), JobError>;
}
