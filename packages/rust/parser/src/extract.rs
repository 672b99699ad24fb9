//! Item extraction rules.
//!
//! An item line on the activity page looks like:
//!
//! ```html
//! <p class="m-b-xs">
//!   BotName: Salvaged
//!   <span data-content="Armor&lt;br /&gt; 736&lt;br /&gt; ..."
//!         class="text-legendary">[Ancient] tyrael's might</span>
//! </p>
//! ```
//!
//! Everything here is pure and synchronous; the concurrent orchestration
//! lives in [`crate::fragment`].

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use rosbot_shared::{Destination, LegendaryItem, Quality, Rarity, unknown_timestamp};
use scraper::{ElementRef, Html, Selector};

/// Name the site shows for items that have not been identified yet.
const UNIDENTIFIED_NAME: &str = "unidentified";

/// Popover sentence repeated on every unidentified item.
const UNIDENTIFIED_NOTICE: &str = "This item cannot be equipped until it is identified.";

/// Line break marker left in the decoded popover content.
const BREAK_MARKER: &str = "<br />";

static ANNOTATION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span").expect("annotation selector"));

/// `DD/MM/YYYY - HH:MM`
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{2}/\d{2}/\d{4}\s-\s\d{2}:\d{2}").expect("timestamp regex")
});

/// `": " <word>` after the bot name.
static DESTINATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s([a-zA-Z]+)").expect("destination regex"));

/// `[Ancient]` / `[Primal]` tag in front of the name.
static RARITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([a-zA-Z]+)\]").expect("rarity regex"));

// ---------------------------------------------------------------------------
// ItemFragment
// ---------------------------------------------------------------------------

/// Raw values read from one item line, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFragment {
    /// `class` attribute of the annotation span.
    pub class: String,
    /// Visible text of the annotation span, trimmed.
    pub label: String,
    /// `data-content` attribute of the annotation span (entities decoded).
    pub stats: String,
    /// Full text of the line enclosing the annotation.
    pub line_text: String,
}

impl ItemFragment {
    /// Read the fragment from an item element. `None` when it has no annotation.
    pub fn from_element(line: ElementRef<'_>) -> Option<Self> {
        let span = line.select(&ANNOTATION_SEL).next()?;
        let attrs = span.value();

        Some(Self {
            class: attrs.attr("class").unwrap_or_default().to_string(),
            label: span.text().collect::<String>().trim().to_string(),
            stats: attrs.attr("data-content").unwrap_or_default().to_string(),
            line_text: line.text().collect(),
        })
    }

    /// Parse an item element's outer HTML and read the fragment from it.
    pub fn from_html(markup: &str) -> Option<Self> {
        let doc = Html::parse_fragment(markup);
        Self::from_element(doc.root_element())
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Turn a fragment into a record. `None` for items below legendary quality.
pub fn extract_item(fragment: &ItemFragment) -> Option<LegendaryItem> {
    let quality = parse_quality(&fragment.class)?;
    let rarity = parse_rarity(&fragment.label);
    let name = parse_name(&fragment.label, rarity);

    Some(LegendaryItem {
        is_identified: name != UNIDENTIFIED_NAME,
        name,
        quality,
        rarity,
        destination: parse_destination(&fragment.line_text),
        stats: sanitize_stats(&fragment.stats),
    })
}

/// Parse an item element's outer HTML straight into a record.
pub fn extract_item_markup(markup: &str) -> Option<LegendaryItem> {
    ItemFragment::from_html(markup).as_ref().and_then(extract_item)
}

/// Map the annotation's class tokens to a quality.
pub fn parse_quality(class: &str) -> Option<Quality> {
    class
        .split_whitespace()
        .find_map(|token| match token.to_ascii_lowercase().as_str() {
            "text-legendary" => Some(Quality::Normal),
            "text-set" => Some(Quality::Set),
            _ => None,
        })
}

/// Read the optional `[Ancient]` / `[Primal]` tag. Anything else is non-ancient.
pub fn parse_rarity(label: &str) -> Rarity {
    let tag = RARITY_RE
        .captures(label)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase());

    match tag.as_deref() {
        Some("ancient") => Rarity::Ancient,
        Some("primal") => Rarity::Primal,
        _ => Rarity::NonAncient,
    }
}

/// Strip the rarity tag from the label.
pub fn parse_name(label: &str, rarity: Rarity) -> String {
    if rarity == Rarity::NonAncient {
        return label.to_string();
    }
    label
        .split_once("] ")
        .map(|(_, name)| name)
        .unwrap_or(label)
        .to_string()
}

/// Read the destination word following the bot name.
pub fn parse_destination(text: &str) -> Destination {
    let word = DESTINATION_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase());

    match word.as_deref() {
        Some("salvaged") => Destination::Salvaged,
        Some("stashed") => Destination::Stashed,
        Some("sold") => Destination::Sold,
        _ => Destination::Unknown,
    }
}

/// Parse an update's date text, falling back to [`unknown_timestamp`].
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    TIMESTAMP_RE
        .find(raw.trim())
        .and_then(|m| NaiveDateTime::parse_from_str(m.as_str(), "%d/%m/%Y - %H:%M").ok())
        .map(|dt| dt.and_utc())
        .unwrap_or_else(unknown_timestamp)
}

/// Clean up popover stats: drop the unidentified notice and break markers,
/// and strip leading spaces from every line.
pub fn sanitize_stats(raw: &str) -> String {
    raw.replace(UNIDENTIFIED_NOTICE, "")
        .replace(BREAK_MARKER, "")
        .split('\n')
        .map(|line| line.trim_start_matches(' '))
        .collect::<Vec<_>>()
        .join("\n")
}
