use std::time::Duration;

/// Runtime configuration. Every field has a sensible default and can be
/// overridden through a `TCGSCRAPE_*` environment variable.
#[derive(Clone, Debug)]
pub struct Config {
    /// How many sets to scrape at the same time (the `multi` default).
    pub concurrency: usize,
    /// Bound on the wait for a catalog's result region to become visible.
    pub catalog_load_timeout: Duration,
    /// Bound on the wait for a card's variant dropdown to open.
    pub reveal_open_timeout: Duration,
    /// Bound on the wait for the dropdown to close again.
    pub reveal_close_timeout: Duration,
    /// Poll interval for visibility waits.
    pub poll_interval: Duration,
    /// Site root, also the cookie domain.
    pub base_url: String,
    /// Set index page used by `multi` to list all series.
    pub sets_url: String,
    /// Sign-in page used by `login`.
    pub login_url: String,
    /// Explicit Chrome/Edge binary. When unset, chromiumoxide autodetects.
    pub chrome_executable: Option<String>,
    /// Run the browser without a window.
    pub headless: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 3,
            catalog_load_timeout: Duration::from_secs(20),
            reveal_open_timeout: Duration::from_secs(6),
            reveal_close_timeout: Duration::from_secs(4),
            poll_interval: Duration::from_millis(100),
            base_url: "https://www.tcgcollector.com".to_string(),
            sets_url: "https://www.tcgcollector.com/sets/intl?setMode=regularCardVariants&releaseDateOrder=newToOld&displayAs=list".to_string(),
            login_url: "https://www.tcgcollector.com/account/sign-in".to_string(),
            chrome_executable: None,
            headless: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            concurrency: env_parse("TCGSCRAPE_CONCURRENCY", default.concurrency),
            catalog_load_timeout: env_secs("TCGSCRAPE_CATALOG_TIMEOUT_SECS", default.catalog_load_timeout),
            reveal_open_timeout: env_secs("TCGSCRAPE_REVEAL_OPEN_TIMEOUT_SECS", default.reveal_open_timeout),
            reveal_close_timeout: env_secs("TCGSCRAPE_REVEAL_CLOSE_TIMEOUT_SECS", default.reveal_close_timeout),
            poll_interval: default.poll_interval,
            base_url: std::env::var("TCGSCRAPE_BASE_URL").unwrap_or(default.base_url),
            sets_url: std::env::var("TCGSCRAPE_SETS_URL").unwrap_or(default.sets_url),
            login_url: std::env::var("TCGSCRAPE_LOGIN_URL").unwrap_or(default.login_url),
            chrome_executable: std::env::var("TCGSCRAPE_CHROME").ok(),
            headless: env_parse("TCGSCRAPE_HEADLESS", default.headless),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_secs(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
