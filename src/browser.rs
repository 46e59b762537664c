//! Chrome-backed page surface
//!
//! Launches a headless Chrome through the DevTools protocol, opens one page,
//! and exposes it to the pipeline as a [`PageSurface`].

use crate::{create_browser_config, Config, PageLayout, PageSurface, SnagError};
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use tracing::{debug, info};

const LAYOUT_PROBE: &str = r#"
    (() => ({
        scrollX: Math.round(window.scrollX),
        scrollY: Math.round(window.scrollY),
        totalHeight: document.documentElement.scrollHeight,
        viewportHeight: window.innerHeight,
        title: document.title,
        url: location.href
    }))()
"#;

pub struct ChromeSurface {
    browser: Browser,
    handler: tokio::task::JoinHandle<Result<(), chromiumoxide::error::CdpError>>,
    page: Page,
}

impl ChromeSurface {
    /// Start a browser, open `url`, and wait for it to finish loading.
    pub async fn launch(config: &Config, url: &str) -> Result<Self, SnagError> {
        let browser_config = create_browser_config(config)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| SnagError::BrowserLaunchFailed(e.to_string()))?;

        // The handler stream drives all DevTools traffic and must be polled
        // for as long as the browser is in use.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::error!("Handler error: {}", e);
                    return Err(e);
                }
            }
            tracing::debug!("Handler stream ended");
            Ok(())
        });

        let page = browser
            .new_page(url)
            .await
            .map_err(|e| SnagError::PageError(e.to_string()))?;

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(config.viewport.width)
            .height(config.viewport.height)
            .device_scale_factor(config.viewport.device_scale_factor)
            .mobile(false)
            .build()
            .map_err(SnagError::PageError)?;

        page.execute(metrics)
            .await
            .map_err(|e| SnagError::PageError(e.to_string()))?;

        page.wait_for_navigation()
            .await
            .map_err(|e| SnagError::PageError(e.to_string()))?;

        info!("Opened {} in headless Chrome", url);
        Ok(Self {
            browser,
            handler,
            page,
        })
    }

    pub async fn shutdown(mut self) {
        let _ = self.page.clone().close().await;
        let _ = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler.abort();
        debug!("Browser shut down");
    }
}

#[async_trait]
impl PageSurface for ChromeSurface {
    async fn probe_layout(&self) -> Result<PageLayout, SnagError> {
        self.page
            .evaluate(LAYOUT_PROBE)
            .await
            .map_err(|e| SnagError::LayoutProbeFailed(e.to_string()))?
            .into_value()
            .map_err(|e| SnagError::LayoutProbeFailed(e.to_string()))
    }

    async fn scroll_to(&self, x: i64, y: i64) -> Result<(), SnagError> {
        let script = format!("window.scrollTo({x}, {y})");
        self.page
            .evaluate(script.as_str())
            .await
            .map_err(|e| SnagError::ScrollFailed(e.to_string()))?;
        Ok(())
    }

    async fn capture_viewport(&self) -> Result<Vec<u8>, SnagError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();

        self.page
            .screenshot(params)
            .await
            .map_err(|e| SnagError::CaptureFailed(e.to_string()))
    }
}
