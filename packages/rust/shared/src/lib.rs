//! Shared types, error model, and configuration for rosbot-collector.
//!
//! This crate is the foundation depended on by all other collector crates.
//! It provides:
//! - [`RosbotError`]: the unified error type
//! - Domain types ([`ServerUpdate`], [`LegendaryItem`], [`FilterConfig`], [`Credentials`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AccountConfig, AppConfig, DEFAULT_BASE_URL, SiteConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_password, validate_config,
};
pub use error::{Result, RosbotError};
pub use types::{
    Credentials, Destination, FilterConfig, LegendaryItem, Quality, QualityFilter, Rarity,
    ServerUpdate, unknown_timestamp,
};
