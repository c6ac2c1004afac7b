//! Browser lifecycle.

use std::path::Path;

use anyhow::{anyhow, Result};
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use crate::config::Config;

/// Launch a browser and start draining its CDP event stream in the
/// background. The handler task ends by itself once the browser goes away.
pub async fn launch(config: &Config) -> Result<Browser> {
    info!("🚀 Launching {} browser...", if config.headless { "headless" } else { "headful" });

    let mut builder = BrowserConfig::builder().args(vec![
        "--disable-gpu",
        "--no-sandbox",
        "--disable-dev-shm-usage",
    ]);
    if config.headless {
        builder = builder.new_headless_mode();
    } else {
        builder = builder.with_head();
    }
    if let Some(path) = &config.chrome_executable {
        builder = builder.chrome_executable(Path::new(path));
    }
    let browser_config = builder
        .build()
        .map_err(|e| anyhow!("browser configuration failed: {e}"))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| anyhow!("failed to launch browser: {e}"))?;

    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    // Give the browser a moment to settle before the first page opens.
    sleep(Duration::from_millis(300)).await;
    debug!("Browser ready");

    Ok(browser)
}
