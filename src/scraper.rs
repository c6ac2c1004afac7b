//! Set extraction.
//!
//! Drives one document session through a full catalog read: wait for the
//! result region, read the set title and code, bulk-read the static card
//! fields, then walk the cards in document order running the variant reveal
//! cycle (open the dropdown, wait for it to show, read the labels, dismiss,
//! wait for it to hide).
//!
//! The reveal dropdown is a single shared overlay, so the per-card cycle is
//! strictly sequential within a session: card `i + 1` does not start until
//! card `i`'s cycle has settled. Reveal timeouts degrade that one card to an
//! empty variant set and never abort the catalog; only the initial catalog
//! load timeout and transport failures are fatal to the job.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ScrapeError, ScrapeResult, SessionError};
use crate::models::{CardRecord, ScrapedSet};
use crate::session::{DocumentSession, FieldQuery, Fragment, Visibility};

const CATALOG_REGION: &str = "#card-search-result";
const CATALOG_NAME: &str = "#card-search-result-title-set-like-name";
const CATALOG_CODE: &str = "#card-search-result-title-set-code";
const CARD_ITEM: &str = ".card-list-item";
const REVEAL_CONTROL: &str = ".number-spinner-increment-button";
const DROPDOWN_MENU: &str =
    ".card-collection-card-controls-dropdown.dropdown.shown .dropdown-menu";
const VARIANT_LABELS: &str = ".card-collection-card-controls-dropdown.dropdown.shown \
     .dropdown-menu .card-collection-card-controls-add-card-variant-button";

const CARD_FIELDS: &[FieldQuery] = &[
    FieldQuery::text("name", ".card-list-item-card-name a"),
    FieldQuery::text("number", ".card-list-item-card-number .card-list-item-entry-text"),
    FieldQuery::attr("rarity", ".card-list-item-rarity img", "alt"),
    FieldQuery::attr("energy_type", ".card-list-item-card-type img", "alt"),
    FieldQuery::attr("card_id", "", "data-card-id"),
    FieldQuery::text("reveal", REVEAL_CONTROL),
];

/// Reveal control for one card, scoped by the card's identity so it cannot
/// match a different card's control.
fn reveal_control_for(card_id: &str) -> String {
    format!(r#"{CARD_ITEM}[data-card-id="{card_id}"] {REVEAL_CONTROL}"#)
}

/// The shown dropdown keyed to one card, used for the close wait.
fn dropdown_for(card_id: &str) -> String {
    format!(
        r#"{CARD_ITEM}[data-card-id="{card_id}"] .card-collection-card-controls-dropdown.dropdown.shown"#
    )
}

/// Extract one full set. The session is expected to already be on the set's
/// catalog page.
pub async fn scrape_set(
    session: &dyn DocumentSession,
    config: &Config,
) -> ScrapeResult<ScrapedSet> {
    session
        .wait_for(CATALOG_REGION, Visibility::Visible, config.catalog_load_timeout)
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ScrapeError::CatalogLoadTimeout(e)
            } else {
                ScrapeError::Session(e)
            }
        })?;

    let name = read_trimmed(session, CATALOG_NAME).await?;
    let code = read_trimmed(session, CATALOG_CODE).await?;

    let fragments = session.read_list_fields(CARD_ITEM, CARD_FIELDS).await?;
    info!("Catalog loaded: {name} ({code}), {} cards", fragments.len());

    let mut cards = Vec::with_capacity(fragments.len());
    for (index, fragment) in fragments.iter().enumerate() {
        let mut card = card_from_fragment(fragment);
        card.variants = match reveal_cycle(session, config, fragment, &card.name).await {
            Ok(variants) => variants,
            Err(ScrapeError::RevealTimeout { card: label, source }) => {
                warn!("Reveal cycle timed out for {label} (card {}): {source}", index + 1);
                Vec::new()
            }
            Err(fatal) => return Err(fatal),
        };
        debug!(
            "Card {}/{}: {} [{} variants]",
            index + 1,
            fragments.len(),
            card.name,
            card.variants.len()
        );
        cards.push(card);
    }

    Ok(ScrapedSet {
        name,
        code,
        cards,
        scraped_at: Utc::now(),
    })
}

async fn read_trimmed(
    session: &dyn DocumentSession,
    css: &str,
) -> Result<String, SessionError> {
    Ok(session
        .read_text(css)
        .await?
        .map(|t| t.trim().to_string())
        .unwrap_or_default())
}

fn field(fragment: &Fragment, name: &str) -> Option<String> {
    fragment
        .get(name)
        .and_then(|v| v.as_ref())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn card_from_fragment(fragment: &Fragment) -> CardRecord {
    CardRecord {
        name: field(fragment, "name").unwrap_or_default(),
        number: field(fragment, "number").unwrap_or_default(),
        rarity: field(fragment, "rarity").unwrap_or_default(),
        // Trainer cards carry no energy icon.
        energy_type: field(fragment, "energy_type").unwrap_or_else(|| "Trainer".to_string()),
        variants: Vec::new(),
    }
}

/// Run the open → read → close cycle for one card and return its variant
/// labels. Timeouts come back as [`ScrapeError::RevealTimeout`]; anything
/// else is fatal to the job.
async fn reveal_cycle(
    session: &dyn DocumentSession,
    config: &Config,
    fragment: &Fragment,
    card_name: &str,
) -> ScrapeResult<Vec<String>> {
    // A card without a reveal control has nothing to disclose.
    if fragment.get("reveal").map(|v| v.is_none()).unwrap_or(true) {
        warn!("No reveal control for {card_name}, recording without variants");
        return Ok(Vec::new());
    }

    // Without the card's identity the open and close waits cannot be keyed
    // to this card, and a stale overlay from a neighbour could be misread.
    // Treated like a reveal timeout rather than a hard failure.
    let Some(card_id) = field(fragment, "card_id") else {
        warn!("Card {card_name} has no data-card-id, skipping its reveal cycle");
        return Ok(Vec::new());
    };

    session.click(&reveal_control_for(&card_id)).await?;

    if let Err(e) = session
        .wait_for(DROPDOWN_MENU, Visibility::Visible, config.reveal_open_timeout)
        .await
    {
        if e.is_timeout() {
            // Best-effort dismiss in case the dropdown opens late; a stuck
            // overlay must not poison the next card's cycle.
            let _ = session.click_at(0.0, 0.0).await;
            return Err(ScrapeError::RevealTimeout {
                card: card_name.to_string(),
                source: e,
            });
        }
        return Err(ScrapeError::Session(e));
    }

    let variants = session.read_labels(VARIANT_LABELS).await?;

    // Dismiss by clicking outside the overlay, then wait for this card's
    // dropdown to report itself hidden.
    session.click_at(0.0, 0.0).await?;
    if let Err(e) = session
        .wait_for(
            &dropdown_for(&card_id),
            Visibility::Hidden,
            config.reveal_close_timeout,
        )
        .await
    {
        if e.is_timeout() {
            // The labels are already read; a stuck-open dropdown only costs
            // a warning and must not block the cards after this one.
            warn!("Dropdown for {card_name} did not close within {:?}", config.reveal_close_timeout);
        } else {
            return Err(ScrapeError::Session(e));
        }
    }

    Ok(variants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio_test::assert_ok;

    #[derive(Clone, Default)]
    struct FakeCard {
        card_id: Option<&'static str>,
        name: &'static str,
        number: &'static str,
        rarity: Option<&'static str>,
        energy_type: Option<&'static str>,
        has_reveal: bool,
        open_times_out: bool,
        close_times_out: bool,
        variants: Vec<&'static str>,
    }

    impl FakeCard {
        fn plain(id: &'static str, name: &'static str, variants: Vec<&'static str>) -> Self {
            Self {
                card_id: Some(id),
                name,
                number: "001/100",
                rarity: Some("Common"),
                energy_type: Some("Grass"),
                has_reveal: true,
                variants,
                ..Default::default()
            }
        }
    }

    /// Scripted session: serves a fixed catalog and emulates the shared
    /// reveal overlay, recording every interaction for ordering assertions.
    struct FakeSession {
        catalog_present: bool,
        set_name: &'static str,
        set_code: &'static str,
        cards: Vec<FakeCard>,
        open_overlay: Mutex<Option<String>>,
        events: Mutex<Vec<String>>,
    }

    impl FakeSession {
        fn new(cards: Vec<FakeCard>) -> Self {
            Self {
                catalog_present: true,
                set_name: "Temporal Forces",
                set_code: "TEF",
                cards,
                open_overlay: Mutex::new(None),
                events: Mutex::new(Vec::new()),
            }
        }

        fn card_by_id(&self, id: &str) -> Option<&FakeCard> {
            self.cards.iter().find(|c| c.card_id == Some(id))
        }

        fn record(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn extract_card_id(css: &str) -> Option<&str> {
        let start = css.find("data-card-id=\"")? + "data-card-id=\"".len();
        let end = css[start..].find('"')? + start;
        Some(&css[start..end])
    }

    fn timeout_err(css: &str, state: Visibility) -> SessionError {
        SessionError::WaitTimeout {
            selector: css.to_string(),
            state,
            waited: Duration::from_millis(1),
        }
    }

    #[async_trait]
    impl DocumentSession for FakeSession {
        async fn navigate(&self, _url: &str) -> Result<(), SessionError> {
            Ok(())
        }

        async fn wait_for(
            &self,
            css: &str,
            state: Visibility,
            _timeout: Duration,
        ) -> Result<(), SessionError> {
            if css == CATALOG_REGION {
                return if self.catalog_present {
                    Ok(())
                } else {
                    Err(timeout_err(css, state))
                };
            }
            if css == DROPDOWN_MENU && state == Visibility::Visible {
                return if self.open_overlay.lock().unwrap().is_some() {
                    Ok(())
                } else {
                    Err(timeout_err(css, state))
                };
            }
            if state == Visibility::Hidden {
                if let Some(id) = extract_card_id(css) {
                    let card = self.card_by_id(id).expect("wait keyed to unknown card");
                    return if card.close_times_out {
                        Err(timeout_err(css, state))
                    } else {
                        Ok(())
                    };
                }
            }
            Ok(())
        }

        async fn read_text(&self, css: &str) -> Result<Option<String>, SessionError> {
            Ok(match css {
                CATALOG_NAME => Some(format!("  {}  ", self.set_name)),
                CATALOG_CODE => Some(self.set_code.to_string()),
                _ => None,
            })
        }

        async fn read_labels(&self, _css: &str) -> Result<Vec<String>, SessionError> {
            let open = self.open_overlay.lock().unwrap();
            let Some(id) = open.as_deref() else {
                return Ok(Vec::new());
            };
            let card = self.card_by_id(id).expect("overlay open for unknown card");
            self.record(format!("read:{id}"));
            Ok(card.variants.iter().map(|v| v.to_string()).collect())
        }

        async fn read_list_fields(
            &self,
            _list_css: &str,
            _fields: &[FieldQuery],
        ) -> Result<Vec<Fragment>, SessionError> {
            Ok(self
                .cards
                .iter()
                .map(|c| {
                    let mut f: Fragment = HashMap::new();
                    f.insert("name".into(), Some(c.name.to_string()));
                    f.insert("number".into(), Some(c.number.to_string()));
                    f.insert("rarity".into(), c.rarity.map(str::to_string));
                    f.insert("energy_type".into(), c.energy_type.map(str::to_string));
                    f.insert("card_id".into(), c.card_id.map(str::to_string));
                    f.insert(
                        "reveal".into(),
                        c.has_reveal.then(|| "+".to_string()),
                    );
                    f
                })
                .collect())
        }

        async fn click(&self, css: &str) -> Result<(), SessionError> {
            let id = extract_card_id(css).expect("click not keyed to a card").to_string();
            let card = self.card_by_id(&id).expect("clicked unknown card");
            self.record(format!("open:{id}"));
            if !card.open_times_out {
                *self.open_overlay.lock().unwrap() = Some(id);
            }
            Ok(())
        }

        async fn click_at(&self, _x: f64, _y: f64) -> Result<(), SessionError> {
            let mut open = self.open_overlay.lock().unwrap();
            if let Some(id) = open.as_deref() {
                self.record(format!("close:{id}"));
                let stuck = self.card_by_id(id).map(|c| c.close_times_out).unwrap_or(false);
                if !stuck {
                    *open = None;
                }
            }
            Ok(())
        }

        async fn close(&self) -> Result<(), SessionError> {
            self.record("session-closed".into());
            Ok(())
        }
    }

    fn test_config() -> Config {
        Config {
            poll_interval: Duration::from_millis(1),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn reads_every_card_with_its_variants_in_document_order() {
        let session = FakeSession::new(vec![
            FakeCard::plain("c1", "Bulbasaur", vec!["Normal", "Reverse Holo"]),
            FakeCard::plain("c2", "Ivysaur", vec!["Normal"]),
            FakeCard::plain("c3", "Venusaur", vec!["Normal", "Holo", "Pokeball"]),
        ]);

        let set = tokio_test::assert_ok!(scrape_set(&session, &test_config()).await);

        assert_eq!(set.name, "Temporal Forces");
        assert_eq!(set.code, "TEF");
        let names: Vec<_> = set.cards.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Bulbasaur", "Ivysaur", "Venusaur"]);
        assert_eq!(set.cards[0].variants, ["Normal", "Reverse Holo"]);
        assert_eq!(set.cards[2].variants, ["Normal", "Holo", "Pokeball"]);

        // Each card's cycle fully settles before the next one begins.
        let events = session.events.lock().unwrap();
        assert_eq!(
            *events,
            [
                "open:c1", "read:c1", "close:c1",
                "open:c2", "read:c2", "close:c2",
                "open:c3", "read:c3", "close:c3",
            ]
        );
    }

    #[tokio::test]
    async fn card_without_reveal_control_is_recorded_with_empty_variants() {
        let mut middle = FakeCard::plain("c2", "Ivysaur", vec!["Normal"]);
        middle.has_reveal = false;
        let session = FakeSession::new(vec![
            FakeCard::plain("c1", "Bulbasaur", vec!["Normal"]),
            middle,
            FakeCard::plain("c3", "Venusaur", vec!["Normal"]),
        ]);

        let set = scrape_set(&session, &test_config()).await.unwrap();

        assert_eq!(set.cards.len(), 3);
        assert!(set.cards[1].variants.is_empty());
        assert_eq!(set.cards[0].variants, ["Normal"]);
        assert_eq!(set.cards[2].variants, ["Normal"]);

        // No pointer interaction ever targeted the control-less card.
        let events = session.events.lock().unwrap();
        assert!(!events.iter().any(|e| e.ends_with(":c2")));
    }

    #[tokio::test]
    async fn reveal_open_timeout_degrades_only_that_card() {
        let mut slow = FakeCard::plain("c2", "Ivysaur", vec!["Normal"]);
        slow.open_times_out = true;
        let session = FakeSession::new(vec![
            FakeCard::plain("c1", "Bulbasaur", vec!["Normal"]),
            slow,
            FakeCard::plain("c3", "Venusaur", vec!["Holo"]),
        ]);

        let set = scrape_set(&session, &test_config()).await.unwrap();

        assert_eq!(set.cards.len(), 3);
        assert!(set.cards[1].variants.is_empty());
        assert_eq!(set.cards[2].variants, ["Holo"]);
    }

    #[tokio::test]
    async fn stuck_open_dropdown_keeps_its_variants_and_does_not_block_the_next_card() {
        let mut stuck = FakeCard::plain("c1", "Bulbasaur", vec!["Normal", "Holo"]);
        stuck.close_times_out = true;
        let session = FakeSession::new(vec![
            stuck,
            FakeCard::plain("c2", "Ivysaur", vec!["Normal"]),
        ]);

        let set = scrape_set(&session, &test_config()).await.unwrap();

        assert_eq!(set.cards[0].variants, ["Normal", "Holo"]);
        assert_eq!(set.cards[1].variants, ["Normal"]);
    }

    #[tokio::test]
    async fn card_without_identity_skips_its_reveal_cycle() {
        let mut anonymous = FakeCard::plain("ignored", "Mystery", vec!["Normal"]);
        anonymous.card_id = None;
        let session = FakeSession::new(vec![
            anonymous,
            FakeCard::plain("c2", "Ivysaur", vec!["Normal"]),
        ]);

        let set = scrape_set(&session, &test_config()).await.unwrap();

        assert_eq!(set.cards.len(), 2);
        assert!(set.cards[0].variants.is_empty());
        assert_eq!(set.cards[1].variants, ["Normal"]);
    }

    #[tokio::test]
    async fn catalog_load_timeout_is_fatal() {
        let mut session = FakeSession::new(vec![FakeCard::plain("c1", "Bulbasaur", vec![])]);
        session.catalog_present = false;

        let err = scrape_set(&session, &test_config()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::CatalogLoadTimeout(_)));
    }

    #[tokio::test]
    async fn static_fields_fall_back_when_icons_are_missing() {
        let mut trainer = FakeCard::plain("c1", "Rare Candy", vec!["Normal"]);
        trainer.rarity = None;
        trainer.energy_type = None;
        let session = FakeSession::new(vec![trainer]);

        let set = scrape_set(&session, &test_config()).await.unwrap();

        assert_eq!(set.cards[0].rarity, "");
        assert_eq!(set.cards[0].energy_type, "Trainer");
        assert_eq!(set.name, "Temporal Forces");
    }
}
