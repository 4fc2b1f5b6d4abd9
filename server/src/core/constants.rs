// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "QueryForge";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".queryforge";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "queryforge.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "QUERYFORGE_CONFIG";

// =============================================================================
// Environment Variables - Debug
// =============================================================================

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "QUERYFORGE_DEBUG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "QUERYFORGE_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "QUERYFORGE_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "QUERYFORGE_LOG";

/// Environment variable for the base URL used by the `query` command
pub const ENV_SERVER_URL: &str = "QUERYFORGE_SERVER_URL";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5390;

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "QUERYFORGE_DATA_DIR";

/// Environment variable to run against an in-memory database
pub const ENV_IN_MEMORY: &str = "QUERYFORGE_IN_MEMORY";

/// Environment variable to toggle demo catalog seeding
pub const ENV_SEED: &str = "QUERYFORGE_SEED";

// =============================================================================
// SQLite Database
// =============================================================================

/// SQLite database filename
pub const SQLITE_DB_FILENAME: &str = "queryforge.db";

/// SQLite connection pool max connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// SQLite cache size (negative = KB, so -64000 = 64MB)
pub const SQLITE_CACHE_SIZE: &str = "-64000";

/// SQLite WAL auto-checkpoint threshold (pages, ~4MB at 1000)
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";

/// WAL checkpoint interval in seconds (5 minutes)
pub const SQLITE_CHECKPOINT_INTERVAL_SECS: u64 = 300;

// =============================================================================
// Request Body Limits
// =============================================================================

/// Default body limit for general API requests (1 MB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

// =============================================================================
// Shutdown
// =============================================================================

/// Graceful shutdown timeout in seconds (5 minutes)
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// Query Limits
// =============================================================================

/// Environment variable for default page size
pub const ENV_DEFAULT_PAGE_SIZE: &str = "QUERYFORGE_DEFAULT_PAGE_SIZE";

/// Environment variable for maximum page size
pub const ENV_MAX_PAGE_SIZE: &str = "QUERYFORGE_MAX_PAGE_SIZE";

/// Page size used when a request does not name one
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size a request may ask for
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Upper bound for the configurable maximum page size
pub const PAGE_SIZE_CEILING: u32 = 1000;

/// Default maximum nesting depth of a filter tree
pub const DEFAULT_MAX_FILTER_DEPTH: usize = 5;

/// Upper bound for the configurable filter depth
pub const FILTER_DEPTH_CEILING: usize = 10;

/// Default maximum number of conditions in one filter tree
pub const DEFAULT_MAX_FILTER_CONDITIONS: usize = 50;

/// Maximum size of a JSON-encoded filter parameter (64 KB)
pub const MAX_FILTER_JSON_SIZE: usize = 64 * 1024;

/// Maximum number of values for list operators (`in`, `notIn`)
pub const MAX_LIST_VALUES: usize = 100;

/// Maximum length of an entity identifier in a URL path
pub const MAX_ID_LENGTH: usize = 256;

// =============================================================================
// Filter State Synchronization
// =============================================================================

/// Default quiet period before a changed filter state is fetched
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// HTTP timeout for the `query` command in seconds
pub const QUERY_CLIENT_TIMEOUT_SECS: u64 = 10;
