//! Activity page parsing, query building, and filtering.
//!
//! This crate provides:
//! - [`extract`]: pure rules turning one item line into a [`LegendaryItem`]
//! - [`fragment`]: concurrent page parser producing ordered [`ServerUpdate`]s
//! - [`query`]: server-side filter query for the activity page
//! - [`filter`]: client-side filtering of parsed updates
//!
//! [`LegendaryItem`]: rosbot_shared::LegendaryItem
//! [`ServerUpdate`]: rosbot_shared::ServerUpdate

pub mod extract;
pub mod filter;
pub mod fragment;
pub mod query;

pub use extract::{ItemFragment, extract_item, extract_item_markup, parse_timestamp};
pub use filter::{accepts, filter_updates};
pub use fragment::{ITEM_WORKERS, parse_updates};
pub use query::build_query;
