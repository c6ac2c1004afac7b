//! Document session capability.
//!
//! The scraper never talks to a browser directly; it drives an abstract,
//! stateful session that can navigate, wait on visibility conditions, read
//! structured fragments, and simulate pointer interaction. The production
//! implementation sits on chromiumoxide ([`cdp::CdpSession`]); tests swap in
//! a scripted fake.

pub mod cdp;
pub mod cookies;

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SessionError;

pub use cdp::CdpSession;

/// Condition a wait resolves on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Visible => write!(f, "visible"),
            Visibility::Hidden => write!(f, "hidden"),
        }
    }
}

/// One named sub-query inside a list element, for [`DocumentSession::read_list_fields`].
///
/// An empty `css` targets the list element itself. With `attr` unset the
/// query reads trimmed text content; otherwise the named attribute.
#[derive(Clone, Copy, Debug)]
pub struct FieldQuery {
    pub name: &'static str,
    pub css: &'static str,
    pub attr: Option<&'static str>,
}

impl FieldQuery {
    pub const fn text(name: &'static str, css: &'static str) -> Self {
        Self { name, css, attr: None }
    }

    pub const fn attr(name: &'static str, css: &'static str, attr: &'static str) -> Self {
        Self { name, css, attr: Some(attr) }
    }
}

/// Field values for one list element. A missing sub-element reads as `None`,
/// which keeps rows aligned with the list's document order even when a field
/// is absent for some elements.
pub type Fragment = HashMap<String, Option<String>>;

/// An abstract handle over one rendered document.
///
/// One session belongs to exactly one job for its whole lifetime and must be
/// closed on every exit path. Within a session all calls are sequential; the
/// reveal overlay is a single shared surface, so callers must finish one
/// card's open/read/close cycle before starting the next.
#[async_trait]
pub trait DocumentSession: Send + Sync {
    /// Navigate and wait for the document to be ready.
    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// Wait (bounded) until the first element matching `css` is visible or
    /// hidden. Elapsing the bound yields [`SessionError::WaitTimeout`].
    async fn wait_for(
        &self,
        css: &str,
        state: Visibility,
        timeout: Duration,
    ) -> Result<(), SessionError>;

    /// Trimmed text content of the first match, `None` when nothing matches.
    async fn read_text(&self, css: &str) -> Result<Option<String>, SessionError>;

    /// Per-element label text for every match, in document order. Labels are
    /// built from the element's direct text nodes only, so nested markup
    /// (count badges and the like) does not leak into them.
    async fn read_labels(&self, css: &str) -> Result<Vec<String>, SessionError>;

    /// Read a structured fragment for every element matching `list_css`:
    /// one [`Fragment`] per element, each holding the requested fields.
    async fn read_list_fields(
        &self,
        list_css: &str,
        fields: &[FieldQuery],
    ) -> Result<Vec<Fragment>, SessionError>;

    /// Scroll the first match into view and click it.
    async fn click(&self, css: &str) -> Result<(), SessionError>;

    /// Click at viewport coordinates, e.g. outside an overlay to dismiss it.
    async fn click_at(&self, x: f64, y: f64) -> Result<(), SessionError>;

    /// Release the underlying rendering resource.
    async fn close(&self) -> Result<(), SessionError>;
}
