//! CLI command definitions, routing, and tracing setup.

use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use rosbot_core::pipeline::{CollectRequest, CollectResult, ProgressReporter};
use rosbot_session::SessionOptions;
use rosbot_shared::{
    AppConfig, Credentials, Destination, FilterConfig, QualityFilter, Rarity, ServerUpdate,
    init_config, load_config, resolve_password,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// rosbot: follow what your bot found.
#[derive(Parser)]
#[command(
    name = "rosbot",
    version,
    about = "Collect legendary and set item drops from a ros-bot.com activity feed.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Output format for collected updates.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Filter flags; anything left unset falls back to `[defaults]` in the config.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct FilterArgs {
    /// Accepted destination: stashed, salvaged, sold or unknown (repeatable).
    #[arg(short, long = "destination")]
    pub destinations: Vec<Destination>,

    /// Rarity floor: non-ancient, ancient or primal.
    #[arg(short, long)]
    pub rarity: Option<Rarity>,

    /// Quality: all, normal or set.
    #[arg(short, long)]
    pub quality: Option<QualityFilter>,

    /// Activity page to fetch, starting at 1.
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: Option<u32>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Log in and print one page of bot activity.
    Activity {
        /// Username or email (defaults to `account.username`).
        #[arg(short, long)]
        user: Option<String>,

        #[command(flatten)]
        filter: FilterArgs,

        /// Give up after this many seconds.
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// Output format: text or json.
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "rosbot=info",
        1 => "rosbot=debug",
        _ => "rosbot=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so `--output json` stays pipeable.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Activity {
            user,
            filter,
            deadline_secs,
            output,
        } => cmd_activity(user.as_deref(), &filter, deadline_secs, output).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_activity(
    user: Option<&str>,
    args: &FilterArgs,
    deadline_secs: Option<u64>,
    output: OutputFormat,
) -> Result<()> {
    let config = load_config()?;

    let username = user
        .map(String::from)
        .or_else(|| config.account.username.clone())
        .ok_or_else(|| eyre!("no account given: pass --user or set account.username"))?;
    let password = resolve_password(&config)?;

    let mut options = SessionOptions::with_base_url(&config.site.base_url)?;
    options.timeout_secs = config.site.timeout_secs;

    let filter = merge_filter(&config, args);

    info!(
        user = %username,
        page = filter.page,
        rarity = %filter.rarity,
        "collecting activity"
    );

    let request = CollectRequest {
        credentials: Credentials::new(username, password),
        options,
        filter,
        deadline: deadline_secs.map(Duration::from_secs),
    };

    let reporter = CliProgress::new();
    let result = rosbot_core::collect(&request, &reporter).await?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result.updates)?),
        OutputFormat::Text => print!("{}", render_text(&result)),
    }

    Ok(())
}

/// Command-line flags win over `[defaults]`.
fn merge_filter(config: &AppConfig, args: &FilterArgs) -> FilterConfig {
    let defaults = &config.defaults;
    FilterConfig {
        destinations: if args.destinations.is_empty() {
            defaults.destinations.clone()
        } else {
            args.destinations.iter().copied().collect()
        },
        rarity: args.rarity.unwrap_or(defaults.rarity),
        quality: args.quality.unwrap_or(defaults.quality),
        page: args.page.unwrap_or(defaults.page),
    }
}

fn render_text(result: &CollectResult) -> String {
    let mut out = String::new();
    out.push('\n');

    for update in &result.updates {
        out.push_str(&format!("  {}\n", update_heading(update)));
        if update.items.is_empty() {
            out.push_str("    (no matching items)\n");
        }
        for item in &update.items {
            out.push_str(&format!(
                "    {:<32} {:<11} {:<6} {}\n",
                item.name,
                item.rarity.to_string(),
                item.quality.to_string(),
                item.destination
            ));
        }
    }

    out.push_str(&format!(
        "\n  {} updates, {} items in {:.1}s\n\n",
        result.updates.len(),
        result.item_count(),
        result.elapsed.as_secs_f64()
    ));
    out
}

fn update_heading(update: &ServerUpdate) -> String {
    if update.has_known_timestamp() {
        update.server_timestamp.format("%Y-%m-%d %H:%M UTC").to_string()
    } else {
        "unknown time".to_string()
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &CollectResult) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        // Errors skip `done`; don't leave the spinner on screen.
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosbot_shared::{LegendaryItem, Quality, unknown_timestamp};

    #[test]
    fn flags_override_config_defaults() {
        let mut config = AppConfig::default();
        config.defaults.rarity = Rarity::Ancient;
        config.defaults.destinations.insert(Destination::Sold);
        config.defaults.page = 3;

        let args = FilterArgs {
            destinations: vec![Destination::Stashed, Destination::Salvaged],
            quality: Some(QualityFilter::Set),
            ..FilterArgs::default()
        };
        let merged = merge_filter(&config, &args);

        assert_eq!(merged.rarity, Rarity::Ancient);
        assert_eq!(merged.quality, QualityFilter::Set);
        assert_eq!(merged.page, 3);
        assert_eq!(merged.destinations.len(), 2);
        assert!(!merged.destinations.contains(&Destination::Sold));
    }

    #[test]
    fn empty_flags_keep_defaults() {
        let merged = merge_filter(&AppConfig::default(), &FilterArgs::default());
        assert_eq!(merged, FilterConfig::default());
    }

    #[test]
    fn text_output_lists_items() {
        let result = CollectResult {
            updates: vec![ServerUpdate {
                items: vec![LegendaryItem {
                    name: "the furnace".into(),
                    quality: Quality::Normal,
                    rarity: Rarity::Ancient,
                    destination: Destination::Stashed,
                    is_identified: true,
                    stats: String::new(),
                }],
                server_timestamp: unknown_timestamp(),
            }],
            elapsed: Duration::from_millis(1500),
        };

        let text = render_text(&result);
        assert!(text.contains("unknown time"));
        assert!(text.contains("the furnace"));
        assert!(text.contains("1 updates, 1 items in 1.5s"));
    }

    #[test]
    fn cli_parses_activity_flags() {
        let cli = Cli::try_parse_from([
            "rosbot", "activity", "-d", "stashed", "-d", "sold", "--rarity", "primal", "--page",
            "2", "--output", "json",
        ])
        .unwrap();

        match cli.command {
            Command::Activity { filter, output, .. } => {
                assert_eq!(filter.destinations, vec![Destination::Stashed, Destination::Sold]);
                assert_eq!(filter.rarity, Some(Rarity::Primal));
                assert_eq!(filter.page, Some(2));
                assert!(matches!(output, OutputFormat::Json));
            }
            Command::Config { .. } => panic!("expected activity"),
        }
    }

    #[test]
    fn cli_rejects_page_zero() {
        assert!(Cli::try_parse_from(["rosbot", "activity", "--page", "0"]).is_err());
    }
}
