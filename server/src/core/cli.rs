use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    DEFAULT_HOST, DEFAULT_PORT, ENV_CONFIG, ENV_DEBUG, ENV_DEFAULT_PAGE_SIZE, ENV_HOST,
    ENV_IN_MEMORY, ENV_MAX_PAGE_SIZE, ENV_PORT, ENV_SEED, ENV_SERVER_URL,
};

#[derive(Parser)]
#[command(name = "queryforge")]
#[command(version, about = "Generic entity query engine and CRUD server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Enable debug mode (verbose logging of compiled queries)
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Keep all data in memory (nothing is written to the data directory)
    #[arg(long, global = true, env = ENV_IN_MEMORY)]
    pub in_memory: Option<bool>,

    /// Seed the built-in catalog with demo records on first start
    #[arg(long, global = true, env = ENV_SEED)]
    pub seed: Option<bool>,

    /// Page size used when a list request does not specify one
    #[arg(long, global = true, env = ENV_DEFAULT_PAGE_SIZE)]
    pub default_page_size: Option<u32>,

    /// Largest page size a list request may ask for
    #[arg(long, global = true, env = ENV_MAX_PAGE_SIZE)]
    pub max_page_size: Option<u32>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// Run one list request against a running server and print the result
    Query(QueryArgs),
    /// System maintenance commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

#[derive(clap::Args, Clone, Debug)]
pub struct QueryArgs {
    /// Entity name, e.g. `members`
    pub entity: String,

    /// Filter condition as `field:operator:value` (repeatable, ANDed)
    #[arg(long = "filter", short = 'f', value_parser = parse_filter_arg)]
    pub filters: Vec<FilterArg>,

    /// Sort key as `field:asc` or `field:desc` (repeatable, first is primary)
    #[arg(long = "sort", short = 's', value_parser = parse_sort_arg)]
    pub sorts: Vec<SortArg>,

    /// Page number (1-based)
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Page size
    #[arg(long)]
    pub size: Option<u32>,

    /// Base URL of the server
    #[arg(long, env = ENV_SERVER_URL, default_value_t = default_server_url())]
    pub server: String,

    /// Print the shareable query string instead of fetching
    #[arg(long)]
    pub url: bool,
}

/// A `field:operator:value` triple from the command line
#[derive(Debug, Clone, PartialEq)]
pub struct FilterArg {
    pub field: String,
    pub operator: String,
    pub value: Option<serde_json::Value>,
}

/// A `field:direction` pair from the command line
#[derive(Debug, Clone, PartialEq)]
pub struct SortArg {
    pub field: String,
    pub descending: bool,
}

fn default_server_url() -> String {
    format!("http://{}:{}", DEFAULT_HOST, DEFAULT_PORT)
}

/// Parse `field:operator[:value]`; the value is read as JSON when possible
fn parse_filter_arg(s: &str) -> Result<FilterArg, String> {
    let mut parts = s.splitn(3, ':');
    let field = parts.next().unwrap_or_default().trim();
    let operator = parts.next().map(str::trim).unwrap_or_default();
    if field.is_empty() || operator.is_empty() {
        return Err(format!(
            "Invalid filter '{}'. Expected field:operator[:value]",
            s
        ));
    }
    let value = parts.next().map(|raw| {
        serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
    });
    Ok(FilterArg {
        field: field.to_string(),
        operator: operator.to_string(),
        value,
    })
}

/// Parse `field[:asc|:desc]` (ascending when the direction is omitted)
fn parse_sort_arg(s: &str) -> Result<SortArg, String> {
    let (field, direction) = s.split_once(':').unwrap_or((s, "asc"));
    if field.trim().is_empty() {
        return Err(format!("Invalid sort '{}'. Expected field:asc|desc", s));
    }
    let descending = match direction.to_lowercase().as_str() {
        "asc" => false,
        "desc" => true,
        _ => {
            return Err(format!(
                "Invalid sort direction '{}'. Valid options: asc, desc",
                direction
            ));
        }
    };
    Ok(SortArg {
        field: field.trim().to_string(),
        descending,
    })
}

#[derive(Subcommand, Clone, Debug)]
pub enum SystemCommands {
    /// Delete local data directory (database and caches). Requires confirmation.
    Prune {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub in_memory: Option<bool>,
    pub seed: Option<bool>,
    pub default_page_size: Option<u32>,
    pub max_page_size: Option<u32>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        debug: cli.debug,
        config: cli.config,
        in_memory: cli.in_memory,
        seed: cli.seed,
        default_page_size: cli.default_page_size,
        max_page_size: cli.max_page_size,
    };
    (config, cli.command)
}
