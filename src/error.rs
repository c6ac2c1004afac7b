//! Error taxonomy for sessions and scrape jobs.
//!
//! Item-level trouble (a reveal that never opens or never closes) is absorbed
//! inside the scraper and only surfaces as a warning plus degraded data.
//! Job-level errors carry enough context to be reported once, at the job
//! boundary, without touching any other job.

use std::time::Duration;

use thiserror::Error;

use crate::session::Visibility;

/// Errors produced by a document session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A bounded wait elapsed before the condition held. This is a typed
    /// outcome, not a hang; whether it is fatal depends on where it happens.
    #[error("timed out after {waited:?} waiting for `{selector}` to become {state}")]
    WaitTimeout {
        selector: String,
        state: Visibility,
        waited: Duration,
    },

    /// Navigation or protocol transport failure. Always fatal to the job.
    #[error("session transport failure: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A script evaluated in the page returned something unusable.
    #[error("script returned unexpected value: {detail}")]
    Script { detail: String },

    /// The script result could not be decoded into the expected shape.
    #[error("failed to decode script result: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SessionError {
    pub fn transport(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        SessionError::Transport {
            source: Box::new(source),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::WaitTimeout { .. })
    }
}

/// Errors for one scrape job.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The catalog's result region never became visible. Fatal to the job.
    #[error("catalog view did not load: {0}")]
    CatalogLoadTimeout(SessionError),

    /// A card's reveal surface did not open or close in time. Non-fatal:
    /// the card is recorded with whatever was read before the timeout.
    #[error("reveal cycle for card `{card}` timed out: {source}")]
    RevealTimeout {
        card: String,
        #[source]
        source: SessionError,
    },

    /// Underlying session failure (navigation, transport). Fatal to the job.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Filesystem trouble while gating or persisting output.
    #[error("output error for {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
