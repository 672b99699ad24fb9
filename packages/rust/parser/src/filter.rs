//! Client-side filtering of parsed updates.

use rosbot_shared::{FilterConfig, LegendaryItem, ServerUpdate};

/// Whether an item passes the rarity floor, quality and destination gates.
pub fn accepts(item: &LegendaryItem, config: &FilterConfig) -> bool {
    // Rarity is ordered, so the floor covers both "ancient or better" and "primal only".
    if item.rarity < config.rarity {
        return false;
    }

    if !config.quality.accepts(item.quality) {
        return false;
    }

    config.destinations.is_empty() || config.destinations.contains(&item.destination)
}

/// Keep only the accepted items of every update.
///
/// Updates left without items are kept so the result still mirrors the page.
pub fn filter_updates(updates: Vec<ServerUpdate>, config: &FilterConfig) -> Vec<ServerUpdate> {
    updates
        .into_iter()
        .map(|mut update| {
            update.items.retain(|item| accepts(item, config));
            update
        })
        .collect()
}
