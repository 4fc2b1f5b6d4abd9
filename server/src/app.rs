//! Core application

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::api::types::ListResponse;
use crate::core::banner;
use crate::core::cli::{self, CliConfig, Commands, QueryArgs, SystemCommands};
use crate::core::config::AppConfig;
use crate::core::constants::ENV_LOG;
use crate::core::shutdown::ShutdownService;
use crate::core::storage::AppStorage;
use crate::data::{DocumentStore, SqliteService};
use crate::domain::catalog;
use crate::domain::entity::EntityRegistry;
use crate::domain::query::{
    FilterCondition, FilterNode, FilterValue, Operator, SortDirection, SortSpec, add_condition,
};
use crate::domain::sync::{FilterState, FilterSync, HttpFetcher};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    /// Absent when running against an in-memory database
    pub storage: Option<AppStorage>,
    pub database: Arc<SqliteService>,
    pub registry: EntityRegistry,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        let (cli_config, command) = cli::parse();
        Self::init_logging(cli_config.debug);

        tracing::debug!("Application starting");
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::System {
                command: system_cmd,
            }) => Self::handle_system_command(system_cmd).await,
            Some(Commands::Query(args)) => Self::run_query(&cli_config, args).await,
            Some(Commands::Start) | None => {
                let app = Self::init(&cli_config).await?;
                Self::start_server(app).await
            }
        }
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let (storage, database) = if config.database.in_memory {
            let database = SqliteService::init_in_memory()
                .await
                .context("Failed to open in-memory database")?;
            (None, database)
        } else {
            let storage = AppStorage::init().await?;
            let database = SqliteService::init(&storage)
                .await
                .context("Failed to open database")?;
            (Some(storage), database)
        };
        let database = Arc::new(database);
        let store: Arc<dyn DocumentStore> = Arc::new(database.clone());

        if config.database.seed {
            catalog::seed(store.as_ref())
                .await
                .context("Failed to seed catalog")?;
        }

        let registry = catalog::build_registry(store, config.query.limits())
            .context("Invalid built-in entity catalog")?;
        let shutdown = ShutdownService::new(database.clone(), config.database.in_memory);

        Ok(Self {
            shutdown,
            config,
            storage,
            database,
            registry,
        })
    }

    async fn handle_system_command(cmd: SystemCommands) -> Result<()> {
        match cmd {
            SystemCommands::Prune { yes } => Self::prune_data(yes).await,
        }
    }

    async fn prune_data(skip_confirm: bool) -> Result<()> {
        let data_dir = AppStorage::resolve_data_dir();

        if !data_dir.exists() {
            println!(
                "Nothing to prune. Data directory does not exist: {}",
                data_dir.display()
            );
            return Ok(());
        }

        let data_dir = data_dir.canonicalize().unwrap_or(data_dir);

        println!("This will permanently delete the local data directory:");
        println!("  {}", data_dir.display());
        println!();
        println!(
            "Make sure the server is not running. \
             Deleting data while the server is running will cause data corruption."
        );

        if !skip_confirm {
            print!("\nContinue? [y/N] ");
            std::io::Write::flush(&mut std::io::stdout())?;

            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;

            if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
                println!("Aborted.");
                return Ok(());
            }
        }

        AppStorage::prune(&data_dir).await?;
        println!("Pruned: {}", data_dir.display());
        Ok(())
    }

    /// Fetch one page from a running server through the filter synchronizer
    async fn run_query(cli: &CliConfig, args: QueryArgs) -> Result<()> {
        let config = AppConfig::load(cli)?;
        let state = state_from_args(&args, config.query.default_page_size)?;
        let fetcher = HttpFetcher::new(&args.server)?;

        if args.url {
            let url = fetcher.list_url(&args.entity, &state.search_query())?;
            println!("{}", url);
            println!("?{}", state.to_query_string()?);
            return Ok(());
        }

        let (page, page_size) = (state.page(), state.page_size());
        let (handle, task) = FilterSync::new(args.entity.clone(), Arc::new(fetcher))
            .debounce(Duration::from_millis(config.sync.debounce_ms))
            .initial_state(state)
            .spawn();
        let snapshot = handle.settled().await?;
        drop(handle);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Filter synchronizer task failed");
        }

        if let Some(error) = snapshot.error {
            anyhow::bail!("Query failed: {}", error);
        }
        let result = snapshot
            .result
            .context("Query finished without a result")?;
        let response = ListResponse::new(result, page, page_size);
        println!("{}", serde_json::to_string_pretty(&response)?);
        Ok(())
    }

    fn init_logging(debug: bool) {
        let default_filter = if debug {
            format!("debug,{}=trace", env!("CARGO_CRATE_NAME"))
        } else {
            format!("info,{}=info", env!("CARGO_CRATE_NAME"))
        };

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Before anything that can block
        app.shutdown.install_signal_handlers();

        app.start_background_tasks().await;

        let entities: Vec<&str> = app.registry.iter().map(|r| r.name()).collect();
        let data = match &app.storage {
            Some(storage) => storage.data_dir().display().to_string(),
            None => "in-memory".to_string(),
        };
        banner::print_banner(
            &app.config.server.host,
            app.config.server.port,
            &entities,
            &data,
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }

    pub async fn start_background_tasks(&self) {
        if self.storage.is_some() {
            self.shutdown
                .register(
                    self.database
                        .start_checkpoint_task(self.shutdown.subscribe()),
                )
                .await;
        }
        tracing::debug!("Background tasks started");
    }
}

/// Build the initial filter state from `--filter`/`--sort`/`--page`/`--size`
fn state_from_args(args: &QueryArgs, default_page_size: u32) -> Result<FilterState> {
    let mut filter: Option<FilterNode> = None;
    for arg in &args.filters {
        let operator: Operator = arg
            .operator
            .parse()
            .map_err(|e: String| anyhow::anyhow!("Invalid filter on '{}': {}", arg.field, e))?;
        let value = arg
            .value
            .clone()
            .map(serde_json::from_value::<FilterValue>)
            .transpose()
            .with_context(|| format!("Invalid value for filter on '{}'", arg.field))?;
        filter = Some(add_condition(
            filter,
            FilterCondition::new(arg.field.clone(), operator, value),
        ));
    }

    let sort = args
        .sorts
        .iter()
        .map(|s| SortSpec {
            field: s.field.clone(),
            direction: if s.descending {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            },
        })
        .collect();

    Ok(FilterState::from_parts(
        filter,
        sort,
        args.page,
        args.size.unwrap_or(default_page_size),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cli::{FilterArg, SortArg};
    use serde_json::json;

    fn args(filters: Vec<FilterArg>, sorts: Vec<SortArg>) -> QueryArgs {
        QueryArgs {
            entity: "members".to_string(),
            filters,
            sorts,
            page: 2,
            size: None,
            server: "http://127.0.0.1:5390".to_string(),
            url: false,
        }
    }

    fn filter(field: &str, operator: &str, value: Option<serde_json::Value>) -> FilterArg {
        FilterArg {
            field: field.to_string(),
            operator: operator.to_string(),
            value,
        }
    }

    #[test]
    fn test_state_from_args() {
        let args = args(
            vec![
                filter("role", "equals", Some(json!("admin"))),
                filter("joinedAt", "relativeToToday", Some(json!({"unit": "days", "value": 7}))),
            ],
            vec![SortArg {
                field: "name".to_string(),
                descending: true,
            }],
        );
        let state = state_from_args(&args, 25).unwrap();

        assert_eq!(state.page(), 2);
        assert_eq!(state.page_size(), 25);
        assert_eq!(state.sort(), &[SortSpec::desc("name")]);
        let filter = state.filter().unwrap();
        assert_eq!(crate::domain::query::count_conditions(filter), 2);
    }

    #[test]
    fn test_state_from_args_rejects_unknown_operator() {
        let args = args(vec![filter("role", "looksLike", Some(json!("x")))], vec![]);
        let err = state_from_args(&args, 10).unwrap_err();
        assert!(err.to_string().contains("role"));
    }
}
