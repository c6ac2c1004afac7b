//! Set index listing.
//!
//! Scrapes the site's set index page into series blocks, each holding the
//! set links the user can pick jobs from. Runs on the concrete browser
//! session before any job is admitted.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::Config;
use crate::models::{sanitize_component, SetJob};
use crate::session::{CdpSession, DocumentSession, Visibility};

const SET_LIST: &str = ".set-list";

#[derive(Clone, Debug, Deserialize)]
pub struct SetLink {
    pub name: String,
    pub href: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SeriesListing {
    pub title: String,
    pub sets: Vec<SetLink>,
}

/// Navigate to the set index and read every series with its sets.
pub async fn list_series(session: &CdpSession, config: &Config) -> Result<Vec<SeriesListing>> {
    session
        .navigate(&config.sets_url)
        .await
        .context("navigating to the set index")?;
    session
        .wait_for(SET_LIST, Visibility::Visible, config.catalog_load_timeout)
        .await
        .context("set index did not load")?;

    let js = r#"(() => Array.from(document.querySelectorAll(".set-list")).map((el) => ({
        title: (() => {
            const t = el.querySelector("h2.set-list-title");
            return t ? (t.textContent || "").trim() : "";
        })(),
        sets: Array.from(el.querySelectorAll("a.set-list-item-set-name")).map((a) => ({
            name: (a.textContent || "").trim(),
            href: a.href + "?displayAs=list",
        })),
    })))()"#;

    let listing: Vec<SeriesListing> = session
        .eval_as(js)
        .await
        .context("reading the set index")?;
    Ok(listing)
}

/// Turn a selected set into a job rooted under `output`.
pub fn job_for_set(series: &str, set: &SetLink, output: &Path, overwrite: bool) -> SetJob {
    let series_dir = sanitize_component(series);
    let set_dir = sanitize_component(&set.name);
    SetJob {
        series: series.to_string(),
        name: set.name.clone(),
        url: set.href.clone(),
        out_dir: output.join(series_dir).join(set_dir),
        overwrite,
    }
}
