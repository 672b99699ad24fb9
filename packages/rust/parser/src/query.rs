//! Query string for the activity page.
//!
//! The site filters server side on a single destination, the ancient flag and
//! the quality; client-side filtering in [`crate::filter`] does the rest.

use rosbot_shared::{Destination, FilterConfig, QualityFilter, Rarity};

/// Build the `/?item_destination=..&ancient=..&item_quality=..&page=..` suffix.
pub fn build_query(config: &FilterConfig) -> String {
    format!(
        "/?item_destination={}&ancient={}&item_quality={}&page={}",
        destination_param(config),
        ancient_param(config.rarity),
        quality_param(config.quality),
        config.page,
    )
}

fn destination_param(config: &FilterConfig) -> &'static str {
    let mut destinations = config.destinations.iter();
    match (destinations.next(), destinations.next()) {
        (Some(Destination::Stashed), None) => "1",
        (Some(Destination::Salvaged), None) => "2",
        (Some(Destination::Sold), None) => "4",
        _ => "All",
    }
}

/// Primal leaves the parameter empty, the site has no dedicated value for it.
fn ancient_param(rarity: Rarity) -> &'static str {
    match rarity {
        Rarity::Primal => "",
        Rarity::Ancient => "1",
        Rarity::NonAncient => "0",
    }
}

fn quality_param(quality: QualityFilter) -> &'static str {
    match quality {
        QualityFilter::Normal => "3",
        QualityFilter::Set => "4",
        QualityFilter::All => "All",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(
        destinations: &[Destination],
        rarity: Rarity,
        quality: QualityFilter,
        page: u32,
    ) -> FilterConfig {
        FilterConfig {
            destinations: destinations.iter().copied().collect(),
            rarity,
            quality,
            page,
        }
    }

    #[test]
    fn multiple_destinations() {
        let c = config(
            &[Destination::Salvaged, Destination::Sold],
            Rarity::NonAncient,
            QualityFilter::Normal,
            1,
        );
        assert_eq!(
            build_query(&c),
            "/?item_destination=All&ancient=0&item_quality=3&page=1"
        );
    }

    #[test]
    fn single_destination() {
        let c = config(&[Destination::Salvaged], Rarity::NonAncient, QualityFilter::Normal, 1);
        assert_eq!(
            build_query(&c),
            "/?item_destination=2&ancient=0&item_quality=3&page=1"
        );

        let c = config(&[Destination::Stashed], Rarity::NonAncient, QualityFilter::All, 1);
        assert!(build_query(&c).contains("item_destination=1&"));

        let c = config(&[Destination::Sold], Rarity::NonAncient, QualityFilter::All, 1);
        assert!(build_query(&c).contains("item_destination=4&"));
    }

    #[test]
    fn lone_unknown_destination_means_all() {
        let c = config(&[Destination::Unknown], Rarity::NonAncient, QualityFilter::All, 1);
        assert!(build_query(&c).starts_with("/?item_destination=All&"));
    }

    #[test]
    fn rarity_ancient() {
        let c = config(&[Destination::Salvaged], Rarity::Ancient, QualityFilter::Normal, 1);
        assert_eq!(
            build_query(&c),
            "/?item_destination=2&ancient=1&item_quality=3&page=1"
        );
    }

    #[test]
    fn rarity_primal_leaves_ancient_empty() {
        let c = config(&[], Rarity::Primal, QualityFilter::Normal, 1);
        assert_eq!(
            build_query(&c),
            "/?item_destination=All&ancient=&item_quality=3&page=1"
        );
    }

    #[test]
    fn quality_set() {
        let c = config(&[Destination::Salvaged], Rarity::NonAncient, QualityFilter::Set, 1);
        assert_eq!(
            build_query(&c),
            "/?item_destination=2&ancient=0&item_quality=4&page=1"
        );
    }

    #[test]
    fn everything() {
        assert_eq!(
            build_query(&FilterConfig::default()),
            "/?item_destination=All&ancient=0&item_quality=All&page=1"
        );
    }

    #[test]
    fn page_number() {
        let c = config(&[], Rarity::NonAncient, QualityFilter::All, 7);
        assert!(build_query(&c).ends_with("&page=7"));
    }
}
