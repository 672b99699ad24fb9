//! Bot-activity collection for ros-bot.com accounts.
//!
//! [`Collector`] owns one authenticated session and turns activity pages into
//! filtered [`ServerUpdate`]s. [`pipeline::collect`] wraps the whole flow for
//! one-shot callers such as the CLI.
//!
//! [`ServerUpdate`]: rosbot_shared::ServerUpdate

pub mod collector;
pub mod pipeline;

pub use collector::Collector;
pub use pipeline::{CollectRequest, CollectResult, ProgressReporter, SilentProgress, collect};
