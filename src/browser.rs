//! Chromium-backed renderer driven over CDP.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::JobError;
use crate::models::{Candidate, ControlOutcome, WaitOutcome};
use crate::render::{RenderedPage, Renderer};

const TABLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Resolves once the document is complete and no new resource entries have
/// appeared for 500 ms.
const NETWORK_IDLE_JS: &str = r"
new Promise((resolve) => {
    const quietMs = 500;
    let seen = performance.getEntriesByType('resource').length;
    let stableSince = Date.now();
    const tick = () => {
        const current = performance.getEntriesByType('resource').length;
        if (current !== seen) {
            seen = current;
            stableSince = Date.now();
        }
        if (document.readyState === 'complete' && Date.now() - stableSince >= quietMs) {
            resolve(true);
            return;
        }
        setTimeout(tick, 100);
    };
    tick();
})
";

const ACTIVATE_CONTROL_JS: &str = r"
((label) => {
    const wanted = label.trim().toLowerCase();
    const nodes = document.querySelectorAll(
        'button, a, input[type=submit], input[type=button], [role=button]'
    );
    for (const el of nodes) {
        const texts = [el.innerText, el.value, el.getAttribute('aria-label'), el.getAttribute('title')];
        const hit = texts.some((t) => typeof t === 'string' && t.trim().toLowerCase() === wanted);
        if (!hit) continue;
        const box = el.getBoundingClientRect();
        if (box.width === 0 && box.height === 0) continue;
        el.click();
        return 'activated';
    }
    return 'not_found';
})";

const HAS_TABLE_JS: &str = "document.querySelector('table') !== null";

const CANDIDATE_TABLES_JS: &str = r"
Array.from(document.querySelectorAll('table')).map((el) => {
    let text = null;
    try {
        text = el.innerText;
    } catch (e) {
        text = null;
    }
    return {
        visible_text: typeof text === 'string' ? text : null,
        outer_html: el.outerHTML,
    };
})
";

#[derive(Debug, Clone)]
pub struct ChromiumSettings {
    pub executable: Option<PathBuf>,
    pub no_sandbox: bool,
    pub headful: bool,
    pub window_size: (u32, u32),
}

impl Default for ChromiumSettings {
    fn default() -> Self {
        Self {
            executable: None,
            no_sandbox: false,
            headful: false,
            window_size: (1366, 900),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChromiumRenderer {
    settings: ChromiumSettings,
}

impl ChromiumRenderer {
    pub fn new(settings: ChromiumSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self) -> Result<BrowserConfig, JobError> {
        let (width, height) = self.settings.window_size;
        let mut builder = BrowserConfig::builder().window_size(width, height);
        if let Some(path) = &self.settings.executable {
            builder = builder.chrome_executable(path);
        }
        if self.settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        if self.settings.headful {
            builder = builder.with_head();
        }
        builder.build().map_err(JobError::Render)
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn open(
        &self,
        url: &Url,
        nav_timeout: Duration,
    ) -> Result<Box<dyn RenderedPage>, JobError> {
        let (browser, mut handler) = Browser::launch(self.browser_config()?).await?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(error) = event {
                    debug!("cdp handler event error: {error}");
                }
            }
        });

        info!("navigating to {url}");
        let navigation = tokio::time::timeout(nav_timeout, async {
            let page = browser.new_page(url.as_str()).await?;
            page.wait_for_navigation().await?;
            Ok::<Page, CdpError>(page)
        })
        .await;

        let page = match navigation {
            Ok(Ok(page)) => page,
            Ok(Err(error)) => {
                shutdown_browser(browser, handler_task).await;
                return Err(error.into());
            }
            Err(_) => {
                shutdown_browser(browser, handler_task).await;
                return Err(JobError::Render(format!(
                    "navigation to {url} timed out after {} ms",
                    nav_timeout.as_millis()
                )));
            }
        };

        Ok(Box::new(ChromiumPage {
            browser: Mutex::new(browser),
            page,
            handler_task,
        }))
    }
}

pub struct ChromiumPage {
    browser: Mutex<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromiumPage {
    async fn evaluate<T>(&self, script: &str) -> Result<T, JobError>
    where
        T: DeserializeOwned,
    {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(JobError::Render)?;
        let result = self.page.evaluate_expression(params).await?;
        Ok(result.into_value::<T>()?)
    }

    async fn poll_for_table(&self) -> Result<(), JobError> {
        loop {
            if self.evaluate::<bool>(HAS_TABLE_JS).await? {
                return Ok(());
            }
            tokio::time::sleep(TABLE_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl RenderedPage for ChromiumPage {
    async fn wait_for_network_idle(&self, timeout: Duration) -> WaitOutcome {
        match tokio::time::timeout(timeout, self.evaluate::<bool>(NETWORK_IDLE_JS)).await {
            Ok(Ok(_)) => WaitOutcome::Ready,
            Ok(Err(error)) => WaitOutcome::Failed(error.to_string()),
            Err(_) => WaitOutcome::TimedOut,
        }
    }

    async fn activate_control(&self, label: &str) -> ControlOutcome {
        let label_literal = match serde_json::to_string(label) {
            Ok(literal) => literal,
            Err(error) => return ControlOutcome::Failed(error.to_string()),
        };
        let script = format!("{ACTIVATE_CONTROL_JS}({label_literal})");
        match self.evaluate::<String>(&script).await {
            Ok(outcome) if outcome == "activated" => ControlOutcome::Activated,
            Ok(_) => ControlOutcome::NotFound,
            Err(error) => ControlOutcome::Failed(error.to_string()),
        }
    }

    async fn wait_for_table(&self, timeout: Duration) -> WaitOutcome {
        match tokio::time::timeout(timeout, self.poll_for_table()).await {
            Ok(Ok(())) => WaitOutcome::Ready,
            Ok(Err(error)) => WaitOutcome::Failed(error.to_string()),
            Err(_) => WaitOutcome::TimedOut,
        }
    }

    async fn candidate_tables(&self) -> Result<Vec<Candidate>, JobError> {
        self.evaluate::<Vec<Candidate>>(CANDIDATE_TABLES_JS).await
    }

    async fn page_markup(&self) -> Result<String, JobError> {
        Ok(self.page.content().await?)
    }

    async fn close(self: Box<Self>) -> Result<(), JobError> {
        let Self {
            browser,
            page,
            handler_task,
        } = *self;

        let page_closed = page.close().await;
        if let Err(error) = &page_closed {
            warn!("failed to close page: {error}");
        }
        shutdown_browser(browser.into_inner(), handler_task).await;
        page_closed.map_err(JobError::from)
    }
}

async fn shutdown_browser(mut browser: Browser, handler_task: JoinHandle<()>) {
    if let Err(error) = browser.close().await {
        warn!("failed to close browser: {error}");
    }
    if let Err(error) = browser.wait().await {
        debug!("failed to reap browser process: {error}");
    }
    handler_task.abort();
}
