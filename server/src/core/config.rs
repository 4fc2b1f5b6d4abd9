use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::query::QueryLimits;
use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_DEBOUNCE_MS, DEFAULT_HOST,
    DEFAULT_MAX_FILTER_CONDITIONS, DEFAULT_MAX_FILTER_DEPTH, DEFAULT_MAX_PAGE_SIZE,
    DEFAULT_PAGE_SIZE, DEFAULT_PORT, FILTER_DEPTH_CEILING, PAGE_SIZE_CEILING,
};

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Database configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    /// Use an in-memory SQLite database instead of the data directory
    pub in_memory: Option<bool>,
    /// Seed the built-in catalog with demo records when it is empty
    pub seed: Option<bool>,
}

/// Query limits section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct QueryFileConfig {
    pub default_page_size: Option<u32>,
    pub max_page_size: Option<u32>,
    pub max_filter_depth: Option<usize>,
    pub max_filter_conditions: Option<usize>,
}

/// Filter state synchronization section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SyncFileConfig {
    pub debounce_ms: Option<u64>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub database: Option<DatabaseFileConfig>,
    pub query: Option<QueryFileConfig>,
    pub sync: Option<SyncFileConfig>,
    pub debug: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        // Server
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                tracing::trace!(host = ?server.host, "Merging server.host");
                current.host = server.host;
            }
            if server.port.is_some() {
                tracing::trace!(port = ?server.port, "Merging server.port");
                current.port = server.port;
            }
        }

        // Database
        if let Some(database) = other.database {
            let current = self
                .database
                .get_or_insert_with(DatabaseFileConfig::default);
            if database.in_memory.is_some() {
                tracing::trace!(in_memory = ?database.in_memory, "Merging database.in_memory");
                current.in_memory = database.in_memory;
            }
            if database.seed.is_some() {
                tracing::trace!(seed = ?database.seed, "Merging database.seed");
                current.seed = database.seed;
            }
        }

        // Query limits
        if let Some(query) = other.query {
            let current = self.query.get_or_insert_with(QueryFileConfig::default);
            if query.default_page_size.is_some() {
                tracing::trace!(
                    default_page_size = ?query.default_page_size,
                    "Merging query.default_page_size"
                );
                current.default_page_size = query.default_page_size;
            }
            if query.max_page_size.is_some() {
                tracing::trace!(
                    max_page_size = ?query.max_page_size,
                    "Merging query.max_page_size"
                );
                current.max_page_size = query.max_page_size;
            }
            if query.max_filter_depth.is_some() {
                tracing::trace!(
                    max_filter_depth = ?query.max_filter_depth,
                    "Merging query.max_filter_depth"
                );
                current.max_filter_depth = query.max_filter_depth;
            }
            if query.max_filter_conditions.is_some() {
                tracing::trace!(
                    max_filter_conditions = ?query.max_filter_conditions,
                    "Merging query.max_filter_conditions"
                );
                current.max_filter_conditions = query.max_filter_conditions;
            }
        }

        // Sync
        if let Some(sync) = other.sync {
            let current = self.sync.get_or_insert_with(SyncFileConfig::default);
            if sync.debounce_ms.is_some() {
                tracing::trace!(debounce_ms = ?sync.debounce_ms, "Merging sync.debounce_ms");
                current.debounce_ms = sync.debounce_ms;
            }
        }

        if other.debug.is_some() {
            tracing::trace!(debug = ?other.debug, "Merging debug");
            self.debug = other.debug;
        }
    }
}

// =============================================================================
// Resolved Config Structs
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub in_memory: bool,
    pub seed: bool,
}

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub max_filter_depth: usize,
    pub max_filter_conditions: usize,
}

impl QueryConfig {
    /// Limits handed to the parser and compiler
    pub fn limits(&self) -> QueryLimits {
        QueryLimits {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
            max_depth: self.max_filter_depth,
            max_conditions: self.max_filter_conditions,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub debounce_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub query: QueryConfig,
    pub sync: SyncConfig,
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.queryforge/queryforge.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Load from profile dir - skip if not exists
        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. Load from CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::resolve(cli, file_config);
        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            in_memory = config.database.in_memory,
            max_page_size = config.query.max_page_size,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn resolve(cli: &CliConfig, file_config: FileConfig) -> Self {
        let file_server = file_config.server.unwrap_or_default();
        let file_database = file_config.database.unwrap_or_default();
        let file_query = file_config.query.unwrap_or_default();
        let file_sync = file_config.sync.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);

        Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                in_memory: cli.in_memory.or(file_database.in_memory).unwrap_or(false),
                seed: cli.seed.or(file_database.seed).unwrap_or(true),
            },
            query: QueryConfig {
                default_page_size: cli
                    .default_page_size
                    .or(file_query.default_page_size)
                    .unwrap_or(DEFAULT_PAGE_SIZE),
                max_page_size: cli
                    .max_page_size
                    .or(file_query.max_page_size)
                    .unwrap_or(DEFAULT_MAX_PAGE_SIZE),
                max_filter_depth: file_query
                    .max_filter_depth
                    .unwrap_or(DEFAULT_MAX_FILTER_DEPTH),
                max_filter_conditions: file_query
                    .max_filter_conditions
                    .unwrap_or(DEFAULT_MAX_FILTER_CONDITIONS),
            },
            sync: SyncConfig {
                debounce_ms: file_sync.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS),
            },
            debug: cli.debug || file_config.debug.unwrap_or(false),
        }
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        // Host must not be empty
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        // Port must be non-zero (port 0 would cause bind failure)
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        let query = &self.query;
        if query.max_page_size == 0 || query.max_page_size > PAGE_SIZE_CEILING {
            anyhow::bail!(
                "Configuration error: query.max_page_size must be between 1 and {}",
                PAGE_SIZE_CEILING
            );
        }
        if query.default_page_size == 0 || query.default_page_size > query.max_page_size {
            anyhow::bail!(
                "Configuration error: query.default_page_size ({}) must be between 1 and query.max_page_size ({})",
                query.default_page_size,
                query.max_page_size
            );
        }
        if query.max_filter_depth == 0 || query.max_filter_depth > FILTER_DEPTH_CEILING {
            anyhow::bail!(
                "Configuration error: query.max_filter_depth must be between 1 and {}",
                FILTER_DEPTH_CEILING
            );
        }
        if query.max_filter_conditions == 0 {
            anyhow::bail!("Configuration error: query.max_filter_conditions must be greater than 0");
        }

        if is_all_interfaces(&self.server.host) {
            tracing::warn!(
                host = %self.server.host,
                "Server binds to all interfaces; entity routes are reachable from the network"
            );
        }

        Ok(())
    }
}

/// Get the profile config path (~/.queryforge/queryforge.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Check if host binds to all network interfaces
pub fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn resolve_json(cli: &CliConfig, json: &str) -> AppConfig {
        let file_config: FileConfig = serde_json::from_str(json).unwrap();
        AppConfig::resolve(cli, file_config)
    }

    #[test]
    fn test_file_config_parse_full() {
        let json = r#"{
            "server": { "host": "0.0.0.0", "port": 8080 },
            "database": { "in_memory": true, "seed": false },
            "query": { "default_page_size": 25, "max_page_size": 200, "max_filter_depth": 3 },
            "sync": { "debounce_ms": 150 },
            "debug": true
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(server.port, Some(8080));
        assert_eq!(config.database.as_ref().unwrap().in_memory, Some(true));
        let query = config.query.as_ref().unwrap();
        assert_eq!(query.default_page_size, Some(25));
        assert_eq!(query.max_page_size, Some(200));
        assert_eq!(query.max_filter_depth, Some(3));
        assert!(query.max_filter_conditions.is_none());
        assert_eq!(config.sync.as_ref().unwrap().debounce_ms, Some(150));
        assert_eq!(config.debug, Some(true));
    }

    #[test]
    fn test_file_config_parse_empty() {
        let config: FileConfig = serde_json::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.query.is_none());
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let json = r#"{ "server": { "host": "localhost" }, "unknown_field": 123 }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        assert_eq!(
            config.server.as_ref().unwrap().host,
            Some("localhost".to_string())
        );
        assert_eq!(config.extra.get("unknown_field").unwrap(), 123);
    }

    #[test]
    fn test_file_config_merge() {
        let mut base: FileConfig = serde_json::from_str(
            r#"{
                "server": { "host": "127.0.0.1", "port": 5000 },
                "query": { "default_page_size": 20, "max_page_size": 50 }
            }"#,
        )
        .unwrap();
        let overlay: FileConfig = serde_json::from_str(
            r#"{
                "server": { "port": 6000 },
                "query": { "max_page_size": 80 },
                "sync": { "debounce_ms": 500 }
            }"#,
        )
        .unwrap();

        base.merge(overlay);

        let server = base.server.as_ref().unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(6000));
        let query = base.query.as_ref().unwrap();
        assert_eq!(query.default_page_size, Some(20));
        assert_eq!(query.max_page_size, Some(80));
        assert_eq!(base.sync.as_ref().unwrap().debounce_ms, Some(500));
    }

    #[test]
    fn test_app_config_defaults() {
        let config = resolve_json(&CliConfig::default(), "{}");

        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(!config.database.in_memory);
        assert!(config.database.seed);
        assert_eq!(config.query.default_page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.query.max_page_size, DEFAULT_MAX_PAGE_SIZE);
        assert_eq!(config.query.max_filter_depth, DEFAULT_MAX_FILTER_DEPTH);
        assert_eq!(config.sync.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert!(!config.debug);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_app_config_cli_override() {
        let cli = CliConfig {
            host: Some("cli.host".to_string()),
            port: Some(3000),
            debug: true,
            in_memory: Some(true),
            seed: Some(false),
            max_page_size: Some(40),
            ..Default::default()
        };
        let config = resolve_json(
            &cli,
            r#"{ "server": { "port": 9000 }, "query": { "max_page_size": 500 } }"#,
        );

        assert_eq!(config.server.host, "cli.host");
        assert_eq!(config.server.port, 3000);
        assert!(config.debug);
        assert!(config.database.in_memory);
        assert!(!config.database.seed);
        assert_eq!(config.query.max_page_size, 40);
    }

    #[test]
    fn test_app_config_limits() {
        let config = resolve_json(
            &CliConfig::default(),
            r#"{ "query": { "default_page_size": 5, "max_filter_conditions": 7 } }"#,
        );
        let limits = config.query.limits();
        assert_eq!(limits.default_page_size, 5);
        assert_eq!(limits.max_page_size, DEFAULT_MAX_PAGE_SIZE);
        assert_eq!(limits.max_conditions, 7);
    }

    #[test]
    fn test_app_config_validation_server_port_zero() {
        let cli = CliConfig {
            port: Some(0),
            ..Default::default()
        };
        let err = resolve_json(&cli, "{}").validate().unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn test_app_config_validation_empty_host() {
        let cli = CliConfig {
            host: Some(String::new()),
            ..Default::default()
        };
        let err = resolve_json(&cli, "{}").validate().unwrap_err();
        assert!(err.to_string().contains("server.host"));
    }

    #[test]
    fn test_app_config_validation_default_above_max() {
        let config = resolve_json(
            &CliConfig::default(),
            r#"{ "query": { "default_page_size": 50, "max_page_size": 20 } }"#,
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_page_size"));
    }

    #[test]
    fn test_app_config_validation_max_page_size_ceiling() {
        let config = resolve_json(
            &CliConfig::default(),
            r#"{ "query": { "max_page_size": 5000 } }"#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_app_config_validation_filter_depth() {
        let config = resolve_json(
            &CliConfig::default(),
            r#"{ "query": { "max_filter_depth": 0 } }"#,
        );
        assert!(config.validate().is_err());

        let config = resolve_json(
            &CliConfig::default(),
            r#"{ "query": { "max_filter_depth": 11 } }"#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_app_config_load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "server": {{ "port": 7123 }}, "query": {{ "max_page_size": 30 }} }}"#
        )
        .unwrap();

        let cli = CliConfig {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.server.port, 7123);
        assert_eq!(config.query.max_page_size, 30);
    }

    #[test]
    fn test_app_config_missing_explicit_file() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/nonexistent/queryforge.json")),
            ..Default::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_app_config_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let cli = CliConfig {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let err = AppConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_is_all_interfaces() {
        assert!(is_all_interfaces("0.0.0.0"));
        assert!(is_all_interfaces("::"));
        assert!(is_all_interfaces("[::]"));
        assert!(!is_all_interfaces("127.0.0.1"));
        assert!(!is_all_interfaces("localhost"));
    }
}
