//! Session cookie persistence.
//!
//! `login` saves the browser's cookies under the user data directory;
//! `run`/`multi` re-inject them before navigating so authenticated catalog
//! views render. The scraper core never reads this state.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::network::{Cookie, CookieParam};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "tcg-collector-scrape";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
}

impl From<&Cookie> for StoredCookie {
    fn from(c: &Cookie) -> Self {
        Self {
            name: c.name.clone(),
            value: c.value.clone(),
            domain: c.domain.clone(),
            path: c.path.clone(),
            secure: c.secure,
            http_only: c.http_only,
        }
    }
}

impl StoredCookie {
    pub fn into_param(self) -> Result<CookieParam> {
        CookieParam::builder()
            .name(self.name)
            .value(self.value)
            .domain(self.domain)
            .path(self.path)
            .secure(self.secure)
            .http_only(self.http_only)
            .build()
            .map_err(|e| anyhow::anyhow!("invalid cookie: {e}"))
    }
}

fn session_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR).join("sessions"))
        .context("no user data directory available")
}

fn cookie_file() -> Result<PathBuf> {
    Ok(session_dir()?.join("cookies.json"))
}

pub fn save_cookies(cookies: &[Cookie]) -> Result<()> {
    let dir = session_dir()?;
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let stored: Vec<StoredCookie> = cookies.iter().map(StoredCookie::from).collect();
    let file = cookie_file()?;
    fs::write(&file, serde_json::to_string_pretty(&stored)?)
        .with_context(|| format!("writing {}", file.display()))?;
    Ok(())
}

/// Saved cookies, or `None` when there is no (readable) session.
pub fn load_cookies() -> Option<Vec<StoredCookie>> {
    let file = cookie_file().ok()?;
    let raw = fs::read_to_string(file).ok()?;
    serde_json::from_str(&raw).ok()
}

pub fn has_session() -> bool {
    cookie_file().map(|f| f.exists()).unwrap_or(false)
}

#[derive(Debug, Default)]
pub struct SessionClearResult {
    pub removed_cookies: bool,
    pub removed_dir: bool,
}

/// Remove the cookie file, and the session directory too once it is empty.
pub fn clear_session() -> Result<SessionClearResult> {
    let mut result = SessionClearResult::default();

    let file = cookie_file()?;
    if file.exists() {
        fs::remove_file(&file).with_context(|| format!("removing {}", file.display()))?;
        result.removed_cookies = true;
    }

    let dir = session_dir()?;
    if dir.exists() && dir.read_dir().map(|mut d| d.next().is_none()).unwrap_or(false) {
        fs::remove_dir_all(&dir).with_context(|| format!("removing {}", dir.display()))?;
        result.removed_dir = true;
    }

    Ok(result)
}
