//! Chromium-backed document session.
//!
//! All structured reads go through a single `page.evaluate` round trip whose
//! result is deserialized with serde; visibility waits are bounded poll loops
//! over a small JS predicate. Raw pointer input goes through the CDP
//! `Input.dispatchMouseEvent` command so a dismiss click can land outside any
//! element.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::sleep;

use super::{DocumentSession, FieldQuery, Fragment, Visibility};
use crate::error::SessionError;

pub struct CdpSession {
    page: Page,
    poll_interval: Duration,
}

impl CdpSession {
    pub fn new(page: Page, poll_interval: Duration) -> Self {
        Self { page, poll_interval }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Evaluate a JS expression and return its JSON value.
    pub async fn eval(&self, js: impl Into<String>) -> Result<JsonValue, SessionError> {
        let result = self
            .page
            .evaluate(js.into())
            .await
            .map_err(SessionError::transport)?;
        Ok(result.into_value()?)
    }

    /// Evaluate a JS expression and deserialize its result.
    pub async fn eval_as<T: DeserializeOwned>(
        &self,
        js: impl Into<String>,
    ) -> Result<T, SessionError> {
        let result = self
            .page
            .evaluate(js.into())
            .await
            .map_err(SessionError::transport)?;
        Ok(result.into_value()?)
    }

    async fn dispatch_mouse(
        &self,
        kind: DispatchMouseEventType,
        x: f64,
        y: f64,
    ) -> Result<(), SessionError> {
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(|detail| SessionError::Script { detail })?;
        self.page
            .execute(params)
            .await
            .map_err(SessionError::transport)?;
        Ok(())
    }
}

/// Quote a string as a JS literal.
fn quote(s: &str) -> String {
    JsonValue::String(s.to_owned()).to_string()
}

/// Predicate evaluating to `true` once the first `css` match is in `state`.
fn visibility_predicate(css: &str, state: Visibility) -> String {
    let visible = format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            const rect = el.getBoundingClientRect();
            const style = window.getComputedStyle(el);
            return rect.width > 0 && rect.height > 0
                && style.visibility !== "hidden" && style.display !== "none";
        }})()"#,
        sel = quote(css)
    );
    match state {
        Visibility::Visible => visible,
        Visibility::Hidden => format!("!{visible}"),
    }
}

#[async_trait]
impl DocumentSession for CdpSession {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.page.goto(url).await.map_err(SessionError::transport)?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(SessionError::transport)?;
        Ok(())
    }

    async fn wait_for(
        &self,
        css: &str,
        state: Visibility,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let predicate = visibility_predicate(css, state);
        let started = Instant::now();
        loop {
            if self.eval_as::<bool>(predicate.clone()).await? {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(SessionError::WaitTimeout {
                    selector: css.to_string(),
                    state,
                    waited: timeout,
                });
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn read_text(&self, css: &str) -> Result<Option<String>, SessionError> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                return el ? (el.textContent || "").trim() : null;
            }})()"#,
            sel = quote(css)
        );
        self.eval_as(js).await
    }

    async fn read_labels(&self, css: &str) -> Result<Vec<String>, SessionError> {
        // Join direct text nodes only: the variant buttons nest extra markup
        // whose text is not part of the label.
        let js = format!(
            r#"(() => Array.from(document.querySelectorAll({sel})).map((el) =>
                Array.from(el.childNodes)
                    .filter((n) => n.nodeType === Node.TEXT_NODE && n.textContent.trim())
                    .map((n) => n.textContent.trim())
                    .join(" ")
            ))()"#,
            sel = quote(css)
        );
        self.eval_as(js).await
    }

    async fn read_list_fields(
        &self,
        list_css: &str,
        fields: &[FieldQuery],
    ) -> Result<Vec<Fragment>, SessionError> {
        let mut props = String::new();
        for field in fields {
            let target = if field.css.is_empty() {
                "el".to_string()
            } else {
                format!("el.querySelector({})", quote(field.css))
            };
            let read = match field.attr {
                Some(attr) => format!(
                    "((t) => t ? t.getAttribute({attr}) : null)({target})",
                    attr = quote(attr)
                ),
                None => format!(
                    "((t) => t ? (t.textContent || \"\").trim() : null)({target})"
                ),
            };
            props.push_str(&format!("{}: {read},", quote(field.name)));
        }
        let js = format!(
            "(() => Array.from(document.querySelectorAll({list})).map((el) => ({{ {props} }})))()",
            list = quote(list_css)
        );
        self.eval_as(js).await
    }

    async fn click(&self, css: &str) -> Result<(), SessionError> {
        let element = self
            .page
            .find_element(css)
            .await
            .map_err(SessionError::transport)?;
        element
            .scroll_into_view()
            .await
            .map_err(SessionError::transport)?;
        element.click().await.map_err(SessionError::transport)?;
        Ok(())
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), SessionError> {
        self.dispatch_mouse(DispatchMouseEventType::MousePressed, x, y)
            .await?;
        self.dispatch_mouse(DispatchMouseEventType::MouseReleased, x, y)
            .await
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(SessionError::transport)
    }
}
