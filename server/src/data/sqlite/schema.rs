//! SQLite schema definitions
//!
//! A fresh database gets the complete schema at the current version;
//! older databases are brought forward by `migrations`.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Complete schema SQL
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at INTEGER NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER,
    success INTEGER NOT NULL DEFAULT 1
);

-- =============================================================================
-- Documents: one row per entity instance, user fields kept as a JSON object.
-- Timestamps are RFC 3339 UTC with millisecond precision so that text order
-- equals chronological order.
-- =============================================================================
CREATE TABLE IF NOT EXISTS documents (
    entity TEXT NOT NULL CHECK(length(entity) >= 1 AND length(entity) <= 64),
    id TEXT NOT NULL CHECK(length(id) >= 1 AND length(id) <= 256),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    data TEXT NOT NULL CHECK(json_valid(data) AND json_type(data) = 'object'),
    PRIMARY KEY (entity, id)
);

CREATE INDEX IF NOT EXISTS idx_documents_entity_created ON documents(entity, created_at DESC, id);
CREATE INDEX IF NOT EXISTS idx_documents_entity_updated ON documents(entity, updated_at DESC, id);
"#;
