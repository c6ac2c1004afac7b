use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of work: a single set to be fully scraped.
///
/// Built once by the caller (from the set index plus the user's selection)
/// and consumed exactly once by the scheduler.
#[derive(Clone, Debug)]
pub struct SetJob {
    /// Series the set belongs to, used for the output folder and reporting.
    pub series: String,
    /// Set display name from the index page.
    pub name: String,
    /// Set page URL (list display mode).
    pub url: String,
    /// Directory this job's output lands in.
    pub out_dir: PathBuf,
    /// Delete and re-scrape prior output instead of skipping it.
    pub overwrite: bool,
}

impl SetJob {
    /// Label used in per-job log lines and reports.
    pub fn label(&self) -> String {
        format!("{}/{}", self.series, self.name)
    }

    /// The JSON file whose presence marks this job as already completed.
    pub fn json_path(&self) -> PathBuf {
        self.out_dir.join(format!("{}.json", sanitize_component(&self.name)))
    }
}

/// One card row as read from the catalog, in document order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub name: String,
    pub number: String,
    pub rarity: String,
    pub energy_type: String,
    /// Variant labels read from the reveal dropdown. Empty when the card has
    /// no reveal control or the reveal cycle timed out. Duplicates preserved.
    pub variants: Vec<String>,
}

/// The complete extraction result for one set. Immutable after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedSet {
    pub name: String,
    pub code: String,
    pub cards: Vec<CardRecord>,
    pub scraped_at: DateTime<Utc>,
}

/// Strip characters that are unsafe in file and directory names.
pub fn sanitize_component(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_path_hostile_characters() {
        assert_eq!(sanitize_component("Scarlet & Violet"), "Scarlet & Violet");
        assert_eq!(sanitize_component("Black/White: EX?"), "BlackWhite EX");
        assert_eq!(sanitize_component("  <spaced>  "), "spaced");
    }

    #[test]
    fn card_record_serializes_with_original_field_names() {
        let card = CardRecord {
            name: "Pikachu".into(),
            number: "025/165".into(),
            rarity: "Common".into(),
            energy_type: "Lightning".into(),
            variants: vec!["Normal".into(), "Reverse Holo".into()],
        };
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["energyType"], "Lightning");
        assert_eq!(json["variants"][1], "Reverse Holo");
    }
}
