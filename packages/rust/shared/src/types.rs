//! Core domain types for Ros-Bot activity records.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Login identity for the site. Immutable once constructed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username_or_email: String,
    password: String,
}

impl Credentials {
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
        }
    }

    pub fn username_or_email(&self) -> &str {
        &self.username_or_email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username_or_email", &self.username_or_email)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Item attributes
// ---------------------------------------------------------------------------

/// Where the bot placed the item upon collecting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Destination {
    #[serde(rename = "STASHED", alias = "stashed")]
    Stashed,
    #[serde(rename = "SALVAGED", alias = "salvaged")]
    Salvaged,
    #[serde(rename = "SOLD", alias = "sold")]
    Sold,
    #[serde(rename = "UNKNOWN", alias = "unknown")]
    Unknown,
}

/// Item rarity, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    #[default]
    #[serde(rename = "NON-ANCIENT", alias = "non-ancient")]
    NonAncient,
    #[serde(rename = "ANCIENT", alias = "ancient")]
    Ancient,
    #[serde(rename = "PRIMAL", alias = "primal")]
    Primal,
}

/// Item quality. Anything below legendary is never turned into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "NORMAL", alias = "normal")]
    Normal,
    #[serde(rename = "SET", alias = "set")]
    Set,
}

/// Quality restriction of a [`FilterConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityFilter {
    #[default]
    #[serde(rename = "ALL", alias = "all", alias = "*")]
    All,
    #[serde(rename = "NORMAL", alias = "normal")]
    Normal,
    #[serde(rename = "SET", alias = "set")]
    Set,
}

impl QualityFilter {
    /// Whether an item of the given quality passes this restriction.
    pub fn accepts(self, quality: Quality) -> bool {
        match self {
            QualityFilter::All => true,
            QualityFilter::Normal => quality == Quality::Normal,
            QualityFilter::Set => quality == Quality::Set,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Destination::Stashed => "stashed",
            Destination::Salvaged => "salvaged",
            Destination::Sold => "sold",
            Destination::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rarity::NonAncient => "non-ancient",
            Rarity::Ancient => "ancient",
            Rarity::Primal => "primal",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Normal => f.write_str("normal"),
            Quality::Set => f.write_str("set"),
        }
    }
}

impl FromStr for Destination {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stashed" => Ok(Destination::Stashed),
            "salvaged" => Ok(Destination::Salvaged),
            "sold" => Ok(Destination::Sold),
            "unknown" => Ok(Destination::Unknown),
            other => Err(format!(
                "unknown destination '{other}': expected stashed, salvaged, sold or unknown"
            )),
        }
    }
}

impl FromStr for Rarity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "non-ancient" | "nonancient" | "any" => Ok(Rarity::NonAncient),
            "ancient" => Ok(Rarity::Ancient),
            "primal" => Ok(Rarity::Primal),
            other => Err(format!(
                "unknown rarity '{other}': expected non-ancient, ancient or primal"
            )),
        }
    }
}

impl FromStr for QualityFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" | "*" => Ok(QualityFilter::All),
            "normal" => Ok(QualityFilter::Normal),
            "set" => Ok(QualityFilter::Set),
            other => Err(format!(
                "unknown quality '{other}': expected all, normal or set"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A legendary or set item dropped by the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendaryItem {
    pub name: String,
    #[serde(rename = "type")]
    pub quality: Quality,
    pub rarity: Rarity,
    pub destination: Destination,
    pub is_identified: bool,
    /// Sanitized stat lines joined with `\n`. Not parsed any further.
    pub stats: String,
}

/// One timeline entry of the activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerUpdate {
    #[serde(rename = "legendaries")]
    pub items: Vec<LegendaryItem>,
    pub server_timestamp: DateTime<Utc>,
}

impl ServerUpdate {
    /// Whether the block's timestamp could be read from the page.
    pub fn has_known_timestamp(&self) -> bool {
        self.server_timestamp != unknown_timestamp()
    }
}

/// Timestamp given to an update whose date text is missing or malformed:
/// `0001-01-01T00:00:00Z`.
pub fn unknown_timestamp() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// ---------------------------------------------------------------------------
// FilterConfig
// ---------------------------------------------------------------------------

/// Caller-owned description of which page to fetch and which items to keep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Accepted destinations. Empty accepts every destination.
    #[serde(default)]
    pub destinations: BTreeSet<Destination>,
    /// Lowest rarity to keep.
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub quality: QualityFilter,
    /// Feed page, starting at 1.
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            destinations: BTreeSet::new(),
            rarity: Rarity::NonAncient,
            quality: QualityFilter::All,
            page: default_page(),
        }
    }
}
