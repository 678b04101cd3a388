// Print backends turning populated HTML into PDF bytes
// Author: kelexine (https://github.com/kelexine)

use crate::config::ReportsConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const MM_PER_INCH: f64 = 25.4;

/// Page geometry and load bound for one print job. Defaults to A4 with
/// 20 mm top/bottom and 15 mm left/right margins.
#[derive(Debug, Clone)]
pub struct PrintOptions {
    pub paper_width_mm: f64,
    pub paper_height_mm: f64,
    pub margin_top_mm: f64,
    pub margin_bottom_mm: f64,
    pub margin_left_mm: f64,
    pub margin_right_mm: f64,
    pub scale: f64,
    pub print_background: bool,
    pub navigation_timeout: Duration,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            paper_width_mm: 210.0,
            paper_height_mm: 297.0,
            margin_top_mm: 20.0,
            margin_bottom_mm: 20.0,
            margin_left_mm: 15.0,
            margin_right_mm: 15.0,
            scale: 1.0,
            print_background: true,
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

impl PrintOptions {
    pub fn from_config(config: &ReportsConfig) -> Self {
        Self {
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            ..Self::default()
        }
    }

    fn to_cdp(&self) -> PrintToPdfParams {
        PrintToPdfParams {
            print_background: Some(self.print_background),
            scale: Some(self.scale),
            paper_width: Some(self.paper_width_mm / MM_PER_INCH),
            paper_height: Some(self.paper_height_mm / MM_PER_INCH),
            margin_top: Some(self.margin_top_mm / MM_PER_INCH),
            margin_bottom: Some(self.margin_bottom_mm / MM_PER_INCH),
            margin_left: Some(self.margin_left_mm / MM_PER_INCH),
            margin_right: Some(self.margin_right_mm / MM_PER_INCH),
            prefer_css_page_size: Some(false),
            ..Default::default()
        }
    }
}

/// Anything that can print a self-contained HTML document to PDF.
#[async_trait]
pub trait PrintBackend: Send + Sync {
    async fn print_pdf(&self, html: &str, options: &PrintOptions) -> Result<Vec<u8>>;

    /// Release long-lived resources. Called once on shutdown.
    async fn shutdown(&self) {}

    fn name(&self) -> &'static str;
}

struct BrowserHandle {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// Headless chromium over the DevTools protocol.
///
/// The browser is launched on first use and shared by every job; each job
/// gets its own browser context, which is disposed afterwards whether or not
/// printing succeeded.
pub struct ChromiumBackend {
    headless: bool,
    no_sandbox: bool,
    executable: Option<String>,
    browser: Mutex<Option<Arc<BrowserHandle>>>,
}

impl ChromiumBackend {
    pub fn new(config: &ReportsConfig) -> Self {
        Self {
            headless: config.headless,
            no_sandbox: config.no_sandbox,
            executable: config.chrome_executable.clone(),
            browser: Mutex::new(None),
        }
    }

    async fn browser(&self) -> Result<Arc<BrowserHandle>> {
        let mut slot = self.browser.lock().await;
        if let Some(handle) = slot.as_ref() {
            if !handle.handler.is_finished() {
                return Ok(handle.clone());
            }
            warn!("Browser connection lost, relaunching");
        }

        let handle = Arc::new(self.launch().await?);
        *slot = Some(handle.clone());
        Ok(handle)
    }

    async fn launch(&self) -> Result<BrowserHandle> {
        let mut builder = BrowserConfig::builder()
            .window_size(1200, 1600)
            .args([
                "--disable-blink-features=AutomationControlled",
                "--disable-dev-shm-usage",
                "--no-first-run",
                "--no-default-browser-check",
            ]);
        if !self.headless {
            builder = builder.with_head();
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|e| AppError::PdfGeneration(format!("Invalid browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::PdfGeneration(format!("Failed to launch browser: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser event error: {}", e);
                }
            }
        });

        info!("Headless browser launched");
        Ok(BrowserHandle { browser, handler })
    }

    async fn print_in_context(
        browser: &Browser,
        context_id: BrowserContextId,
        html: &str,
        options: &PrintOptions,
    ) -> Result<Vec<u8>> {
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id)
            .build()
            .map_err(AppError::PdfGeneration)?;

        let page = browser.new_page(target).await.map_err(pdf_error)?;
        let printed = Self::print_page(&page, html, options).await;

        if let Err(e) = page.close().await {
            debug!("Failed to close report page: {}", e);
        }
        printed
    }

    async fn print_page(page: &Page, html: &str, options: &PrintOptions) -> Result<Vec<u8>> {
        tokio::time::timeout(options.navigation_timeout, page.set_content(html))
            .await
            .map_err(|_| {
                AppError::PdfGeneration(format!(
                    "Report page did not load within {:?}",
                    options.navigation_timeout
                ))
            })?
            .map_err(pdf_error)?;

        page.pdf(options.to_cdp()).await.map_err(pdf_error)
    }
}

#[async_trait]
impl PrintBackend for ChromiumBackend {
    async fn print_pdf(&self, html: &str, options: &PrintOptions) -> Result<Vec<u8>> {
        let handle = self.browser().await?;

        let context_id = handle
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(pdf_error)?
            .result
            .browser_context_id;

        let printed =
            Self::print_in_context(&handle.browser, context_id.clone(), html, options).await;

        if let Err(e) = handle
            .browser
            .execute(DisposeBrowserContextParams::new(context_id))
            .await
        {
            warn!("Failed to dispose browser context: {}", e);
        }

        printed
    }

    async fn shutdown(&self) {
        let Some(handle) = self.browser.lock().await.take() else {
            return;
        };

        match Arc::try_unwrap(handle) {
            Ok(mut handle) => {
                if let Err(e) = handle.browser.close().await {
                    warn!("Failed to close browser cleanly: {}", e);
                }
                let _ = handle.browser.wait().await;
                handle.handler.abort();
                info!("Headless browser closed");
            }
            Err(shared) => {
                warn!("Browser still in use during shutdown, detaching");
                shared.handler.abort();
            }
        }
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    AppError::PdfGeneration(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry_is_a4_in_inches() {
        let params = PrintOptions::default().to_cdp();
        assert!((params.paper_width.unwrap() - 8.27).abs() < 0.01);
        assert!((params.paper_height.unwrap() - 11.69).abs() < 0.01);
        assert!((params.margin_top.unwrap() - 0.787).abs() < 0.001);
        assert!((params.margin_left.unwrap() - 0.591).abs() < 0.001);
        assert_eq!(params.print_background, Some(true));
        assert_eq!(params.scale, Some(1.0));
    }

    #[test]
    fn test_timeout_follows_config() {
        let config = ReportsConfig {
            navigation_timeout_ms: 1500,
            ..Default::default()
        };
        assert_eq!(
            PrintOptions::from_config(&config).navigation_timeout,
            Duration::from_millis(1500)
        );
    }
}
