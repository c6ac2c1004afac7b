//! # tcg-collector-scrape
//!
//! CLI for scraping card set data from TCG Collector.
//!
//! Layering, bottom up:
//!
//! - `session` — the document session capability: an abstract handle that
//!   can navigate, wait on visibility conditions, read structured fragments,
//!   and simulate pointer input. Backed by chromiumoxide in production.
//! - `scraper` — the per-set extraction flow, including the strictly
//!   sequential per-card variant reveal cycle.
//! - `scheduler` — bounded-concurrency execution of independent set jobs
//!   with failure isolation.
//! - `output` / `storage` — the skip/overwrite gate and the JSON/CSV
//!   writers.
//! - `app` — command orchestration: login, logout, single scrape, and the
//!   interactive multi-set batch.

pub mod app;
pub mod browser;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
pub mod scheduler;
pub mod scraper;
pub mod session;
pub mod storage;

pub use config::Config;
pub use error::{ScrapeError, ScrapeResult, SessionError};
pub use models::{CardRecord, ScrapedSet, SetJob};
pub use output::OutputDecision;
pub use scheduler::run_concurrent;
pub use scraper::scrape_set;
pub use session::{CdpSession, DocumentSession, Visibility};
