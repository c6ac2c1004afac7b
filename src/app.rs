//! Command orchestration.
//!
//! Owns the browser for the lifetime of a command and delegates the actual
//! extraction to [`crate::scraper`]. In `multi` mode every admitted job gets
//! its own page, opened only after the output gate lets it run and closed on
//! every exit path, successful or not. Per-job failures are logged with the
//! job's label and counted; they never abort the batch.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::Browser;
use dialoguer::MultiSelect;
use tracing::{error, info, warn};

use crate::catalog::{self, SeriesListing};
use crate::config::Config;
use crate::error::ScrapeError;
use crate::models::{sanitize_component, SetJob};
use crate::output::{self, OutputDecision};
use crate::scheduler::run_concurrent;
use crate::scraper;
use crate::session::{cookies, CdpSession, DocumentSession};
use crate::{browser, storage};

/// Log into the site and persist the browser's cookies for later runs.
pub async fn login(config: Config, email: &str, password: &str) -> Result<()> {
    info!("Logging into TCG Collector");
    let browser = browser::launch(&config).await?;

    let outcome = async {
        let page = browser.new_page(config.login_url.as_str()).await?;
        page.wait_for_navigation().await?;

        page.find_element(r#"input[type="email"]"#)
            .await
            .context("email field not found")?
            .click()
            .await?
            .type_str(email)
            .await?;
        page.find_element(r#"input[type="password"]"#)
            .await
            .context("password field not found")?
            .click()
            .await?
            .type_str(password)
            .await?;
        page.find_element(r#"button[type="submit"]"#)
            .await
            .context("submit button not found")?
            .click()
            .await?;
        page.wait_for_navigation().await?;

        let browser_cookies = page.get_cookies().await?;
        cookies::save_cookies(&browser_cookies)?;
        Ok::<_, anyhow::Error>(())
    }
    .await;

    shutdown_browser(browser).await;

    match outcome {
        Ok(()) => {
            info!("✅ Logged in and cookies saved.");
            Ok(())
        }
        Err(e) => Err(e.context("login failed")),
    }
}

/// Forget the saved session.
pub fn logout() -> Result<()> {
    let result = cookies::clear_session()?;
    if result.removed_cookies || result.removed_dir {
        info!("✅ Session cleared successfully.");
    } else {
        info!("ℹ️  No session data found.");
    }
    Ok(())
}

/// Scrape one set page into a JSON file plus a CSV next to it.
pub async fn run_single(config: Config, url: &str, output: &Path) -> Result<()> {
    let url = normalize_url(url);
    let browser = browser::launch(&config).await?;

    let outcome = async {
        let page = browser.new_page("about:blank").await?;
        let session = CdpSession::new(page, config.poll_interval);
        inject_cookies(&session, &config).await?;

        info!("Navigating to {url}...");
        let scraped = async {
            session.navigate(&url).await?;
            info!("Beginning scrape...");
            scraper::scrape_set(&session, &config).await
        }
        .await;
        if let Err(e) = session.close().await {
            warn!("Failed to close page: {e}");
        }
        scraped.map_err(anyhow::Error::from)
    }
    .await;

    shutdown_browser(browser).await;
    let set = outcome?;

    let json_path = resolve_single_output(output, &set.name);
    storage::save_json(&set, &json_path)?;
    storage::save_csv(&set, &json_path.with_extension("csv"))?;
    Ok(())
}

/// List the set index, let the user pick sets, then scrape each selected set
/// into its own folder under `output`, `concurrency` jobs at a time.
pub async fn run_multi(
    config: Config,
    output: &Path,
    concurrency: Option<usize>,
    force: bool,
) -> Result<()> {
    let concurrency = concurrency.unwrap_or(config.concurrency);
    let browser = browser::launch(&config).await?;

    let listed = async {
        let page = browser.new_page("about:blank").await?;
        let session = CdpSession::new(page, config.poll_interval);
        inject_cookies(&session, &config).await?;
        let series = catalog::list_series(&session, &config).await;
        if let Err(e) = session.close().await {
            warn!("Failed to close listing page: {e}");
        }
        series
    }
    .await;

    let series = match listed {
        Ok(series) if !series.is_empty() => series,
        Ok(_) => {
            shutdown_browser(browser).await;
            bail!("set index came back empty");
        }
        Err(e) => {
            shutdown_browser(browser).await;
            return Err(e);
        }
    };

    let jobs = select_jobs(&series, output, force)?;
    if jobs.is_empty() {
        info!("Nothing selected, nothing to do.");
        shutdown_browser(browser).await;
        return Ok(());
    }

    let total = jobs.len();
    info!("📦 Scraping {total} sets, {concurrency} at a time");

    let stats = Arc::new(BatchStats::default());
    let shared_browser = Arc::new(browser);
    let shared_config = Arc::new(config);

    run_concurrent(jobs, concurrency, |job, index| {
        let browser = Arc::clone(&shared_browser);
        let config = Arc::clone(&shared_config);
        let stats = Arc::clone(&stats);
        async move { process_job(browser, config, stats, job, index).await }
    })
    .await;

    stats.log_final(total);

    match Arc::try_unwrap(shared_browser) {
        Ok(browser) => shutdown_browser(browser).await,
        Err(_) => warn!("Browser handle still shared at shutdown"),
    }
    Ok(())
}

/// One job end to end: gate, page, navigate, scrape, persist. Captures its
/// own errors so a failure degrades only this job.
async fn process_job(
    browser: Arc<Browser>,
    config: Arc<Config>,
    stats: Arc<BatchStats>,
    job: SetJob,
    index: usize,
) -> Result<()> {
    let label = job.label();

    let decision = match output::prepare(&job.out_dir, &job.json_path(), job.overwrite) {
        Ok(decision) => decision,
        Err(e) => {
            error!("❌ Failed {label}: {e}");
            stats.failed.fetch_add(1, Ordering::SeqCst);
            return Err(e.into());
        }
    };
    match decision {
        OutputDecision::SkipExisting => {
            info!("⏭️  Skipping {label} (already scraped)");
            stats.skipped.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }
        OutputDecision::OverwriteExisting => {
            info!("⚠️  Removed old {label} before re-scraping");
        }
        OutputDecision::Run => {}
    }

    info!("[{}] Scraping {}...", index + 1, job.name);

    let page = match browser.new_page("about:blank").await {
        Ok(page) => page,
        Err(e) => {
            error!("❌ Failed {label}: could not open page: {e}");
            stats.failed.fetch_add(1, Ordering::SeqCst);
            return Err(e.into());
        }
    };
    let session = CdpSession::new(page, config.poll_interval);

    let outcome = scrape_and_save(&session, &config, &job).await;
    if let Err(e) = session.close().await {
        warn!("Failed to close page for {label}: {e}");
    }

    match outcome {
        Ok(card_count) => {
            info!("✅ Finished {label} ({card_count} cards)");
            stats.success.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        Err(e) => {
            error!("❌ Failed {label}: {e}");
            stats.failed.fetch_add(1, Ordering::SeqCst);
            Err(e.into())
        }
    }
}

async fn scrape_and_save(
    session: &CdpSession,
    config: &Config,
    job: &SetJob,
) -> Result<usize, ScrapeError> {
    session.navigate(&job.url).await?;
    let set = scraper::scrape_set(session, config).await?;

    let json_path = job.json_path();
    let persist = |err: anyhow::Error| ScrapeError::Output {
        path: json_path.display().to_string(),
        source: std::io::Error::other(err),
    };
    storage::save_json(&set, &json_path).map_err(&persist)?;
    storage::save_csv(&set, &json_path.with_extension("csv")).map_err(&persist)?;
    Ok(set.cards.len())
}

/// Interactive two-stage selection: series first, then sets per series.
fn select_jobs(series: &[SeriesListing], output: &Path, force: bool) -> Result<Vec<SetJob>> {
    let labels: Vec<String> = series
        .iter()
        .map(|s| format!("{} ({} sets)", s.title, s.sets.len()))
        .collect();
    let picked = MultiSelect::new()
        .with_prompt("Select series")
        .items(&labels)
        .interact()?;

    let mut jobs = Vec::new();
    for series_index in picked {
        let block = &series[series_index];
        let names: Vec<&str> = block.sets.iter().map(|s| s.name.as_str()).collect();
        let chosen = MultiSelect::new()
            .with_prompt(format!("Select expansions from \"{}\" to scrape", block.title))
            .items(&names)
            .interact()?;
        for set_index in chosen {
            jobs.push(catalog::job_for_set(
                &block.title,
                &block.sets[set_index],
                output,
                force,
            ));
        }
    }
    Ok(jobs)
}

/// Re-inject any saved session cookies, plus the cookie that forces the
/// catalog into list display mode.
async fn inject_cookies(session: &CdpSession, config: &Config) -> Result<()> {
    let mut params = Vec::new();
    if let Some(stored) = cookies::load_cookies() {
        info!("Using saved session cookies...");
        for cookie in stored {
            params.push(cookie.into_param()?);
        }
    }

    let domain = config
        .base_url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    params.push(
        CookieParam::builder()
            .name("cards_displayAs")
            .value("list")
            .domain(domain)
            .build()
            .map_err(|e| anyhow!("invalid display cookie: {e}"))?,
    );

    session.page().set_cookies(params).await?;
    Ok(())
}

fn normalize_url(url: &str) -> String {
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// File-or-directory output handling: an existing directory gets a file named
/// after the set; anything else is taken as the target file itself.
fn resolve_single_output(output: &Path, set_name: &str) -> PathBuf {
    if output.is_dir() {
        output.join(format!("{} Scrape.json", sanitize_component(set_name)))
    } else {
        output.to_path_buf()
    }
}

async fn shutdown_browser(mut browser: Browser) {
    if let Err(e) = browser.close().await {
        warn!("Failed to close browser: {e}");
    }
    let _ = browser.wait().await;
}

#[derive(Debug, Default)]
struct BatchStats {
    success: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

impl BatchStats {
    fn log_final(&self, total: usize) {
        let success = self.success.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        let skipped = self.skipped.load(Ordering::SeqCst);
        info!("{}", "=".repeat(60));
        info!("📊 Batch complete: {success} scraped, {skipped} skipped, {failed} failed ({total} total)");
        info!("{}", "=".repeat(60));
    }
}
