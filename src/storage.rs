//! Persistence of completed extraction results.
//!
//! One JSON file (the completion marker) plus a CSV rendering whose variant
//! columns are the first-seen-ordered union of variants across the set.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::models::ScrapedSet;

pub fn save_json(set: &ScrapedSet, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, serde_json::to_string_pretty(set)?)
        .with_context(|| format!("writing {}", path.display()))?;
    info!("✅ JSON saved: {}", path.display());
    Ok(())
}

pub fn save_csv(set: &ScrapedSet, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, csv_string(set)).with_context(|| format!("writing {}", path.display()))?;
    info!("✅ CSV saved: {}", path.display());
    Ok(())
}

/// Render a set as CSV: base columns, then one `true`/`false` column per
/// distinct variant in first-seen order.
pub fn csv_string(set: &ScrapedSet) -> String {
    let mut variants: Vec<&str> = Vec::new();
    for card in &set.cards {
        for v in &card.variants {
            let v = v.trim();
            if !variants.contains(&v) {
                variants.push(v);
            }
        }
    }

    let mut rows = Vec::with_capacity(set.cards.len() + 1);
    let mut header = vec!["Card Name", "Number", "Rarity", "Energy Type"];
    header.extend(variants.iter().copied());
    rows.push(header.into_iter().map(csv_cell).collect::<Vec<_>>().join(","));

    for card in &set.cards {
        let mut row = vec![
            csv_cell(&card.name),
            csv_cell(&card.number),
            csv_cell(&card.rarity),
            csv_cell(&card.energy_type),
        ];
        for variant in &variants {
            row.push(card.variants.iter().any(|v| v.trim() == *variant).to_string());
        }
        rows.push(row.join(","));
    }

    rows.join("\n")
}

fn csv_cell(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
