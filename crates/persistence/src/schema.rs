//! Row layout of the hosted store.
//!
//! Mirrors `migrations/`. The Postgres store uses the column types to cast
//! bound filter values; the in-memory store uses the defaults and unique keys
//! to behave like the database.

/// Table names.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const USER_ROLES: &str = "user_roles";
    pub const KYC_DOCUMENTS: &str = "kyc_documents";
    pub const TRANSACTIONS: &str = "transactions";
    pub const USER_REWARDS: &str = "user_rewards";
    pub const BOT_CONFIGS: &str = "bot_configs";
    pub const BOT_LOGS: &str = "bot_logs";
    pub const SYSTEM_SETTINGS: &str = "system_settings";
    pub const PLAYLISTS: &str = "playlists";
    pub const TRACKS: &str = "tracks";
    pub const PLAYLIST_TRACKS: &str = "playlist_tracks";
    pub const LISTENING_SESSIONS: &str = "listening_sessions";
    pub const REWARD_TRANSACTIONS: &str = "reward_transactions";
    pub const ADMIN_USERS: &str = "admin_users";
    pub const AUDIT_LOGS: &str = "audit_logs";
}

/// Storage bucket holding uploaded KYC documents.
pub const KYC_BUCKET: &str = "kyc-documents";

/// Value a column receives when an insert omits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDefault {
    Null,
    RandomUuid,
    Now,
    /// JSON literal.
    Literal(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    /// Postgres type used when casting bound values.
    pub sql_type: &'static str,
    pub default: ColumnDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [Column],
    /// Primary key and unique constraints.
    pub unique: &'static [&'static [&'static str]],
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

const fn col(name: &'static str, sql_type: &'static str, default: ColumnDefault) -> Column {
    Column {
        name,
        sql_type,
        default,
    }
}

use ColumnDefault::{Literal, Now, Null, RandomUuid};

const ID: Column = col("id", "uuid", RandomUuid);
const CREATED_AT: Column = col("created_at", "timestamptz", Now);
const UPDATED_AT: Column = col("updated_at", "timestamptz", Now);

pub static TABLES: &[TableDef] = &[
    TableDef {
        name: tables::PROFILES,
        columns: &[
            ID,
            col("email", "text", Null),
            col("full_name", "text", Null),
            col("phone", "text", Null),
            col("bio", "text", Null),
            col("avatar_url", "text", Null),
            col("is_active", "boolean", Literal("true")),
            col("spotify_connected", "boolean", Literal("false")),
            col("spotify_user_id", "text", Null),
            col("spotify_display_name", "text", Null),
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[&["id"]],
    },
    TableDef {
        name: tables::USER_ROLES,
        columns: &[
            ID,
            col("user_id", "uuid", Null),
            col("role", "text", Literal("\"user\"")),
            CREATED_AT,
        ],
        unique: &[&["id"], &["user_id"]],
    },
    TableDef {
        name: tables::KYC_DOCUMENTS,
        columns: &[
            ID,
            col("user_id", "uuid", Null),
            col("document_type", "text", Null),
            col("file_path", "text", Null),
            col("file_name", "text", Null),
            col("status", "text", Literal("\"pending\"")),
            col("rejection_reason", "text", Null),
            col("reviewed_by", "uuid", Null),
            col("reviewed_at", "timestamptz", Null),
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[&["id"]],
    },
    TableDef {
        name: tables::TRANSACTIONS,
        columns: &[
            ID,
            col("user_id", "uuid", Null),
            col("amount", "numeric", Literal("0")),
            col("currency", "text", Literal("\"USD\"")),
            col("transaction_type", "text", Null),
            col("status", "text", Literal("\"pending\"")),
            col("description", "text", Null),
            col("gateway_reference", "text", Null),
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[&["id"]],
    },
    TableDef {
        name: tables::USER_REWARDS,
        columns: &[
            col("user_id", "uuid", Null),
            col("total_points", "bigint", Literal("0")),
            col("total_listening_time", "bigint", Literal("0")),
            col("total_sessions", "bigint", Literal("0")),
            col("level", "integer", Literal("1")),
            UPDATED_AT,
        ],
        unique: &[&["user_id"]],
    },
    TableDef {
        name: tables::BOT_CONFIGS,
        columns: &[
            ID,
            col("name", "text", Null),
            col("description", "text", Null),
            col("config", "jsonb", Literal("{}")),
            col("status", "text", Literal("\"inactive\"")),
            col("last_tested_at", "timestamptz", Null),
            col("created_by", "uuid", Null),
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[&["id"]],
    },
    TableDef {
        name: tables::BOT_LOGS,
        columns: &[
            ID,
            col("bot_config_id", "uuid", Null),
            col("level", "text", Literal("\"info\"")),
            col("message", "text", Null),
            col("metadata", "jsonb", Literal("{}")),
            CREATED_AT,
        ],
        unique: &[&["id"]],
    },
    TableDef {
        name: tables::SYSTEM_SETTINGS,
        columns: &[
            col("key", "text", Null),
            col("value", "jsonb", Literal("{}")),
            col("category", "text", Literal("\"general\"")),
            col("description", "text", Null),
            col("updated_by", "uuid", Null),
            UPDATED_AT,
        ],
        unique: &[&["key"]],
    },
    TableDef {
        name: tables::PLAYLISTS,
        columns: &[
            ID,
            col("name", "text", Null),
            col("description", "text", Null),
            col("spotify_playlist_id", "text", Null),
            col("cover_url", "text", Null),
            col("is_featured", "boolean", Literal("false")),
            col("is_active", "boolean", Literal("true")),
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[&["id"]],
    },
    TableDef {
        name: tables::TRACKS,
        columns: &[
            ID,
            col("spotify_id", "text", Null),
            col("name", "text", Null),
            col("artist", "text", Null),
            col("album", "text", Null),
            col("duration_ms", "bigint", Literal("0")),
            col("preview_url", "text", Null),
            CREATED_AT,
        ],
        unique: &[&["id"], &["spotify_id"]],
    },
    TableDef {
        name: tables::PLAYLIST_TRACKS,
        columns: &[
            col("playlist_id", "uuid", Null),
            col("track_id", "uuid", Null),
            col("position", "integer", Literal("0")),
            col("added_at", "timestamptz", Now),
        ],
        unique: &[&["playlist_id", "track_id"]],
    },
    TableDef {
        name: tables::LISTENING_SESSIONS,
        columns: &[
            ID,
            col("user_id", "uuid", Null),
            col("track_id", "uuid", Null),
            col("duration_seconds", "bigint", Literal("0")),
            col("points_earned", "bigint", Literal("0")),
            col("started_at", "timestamptz", Now),
        ],
        unique: &[&["id"]],
    },
    TableDef {
        name: tables::REWARD_TRANSACTIONS,
        columns: &[
            ID,
            col("user_id", "uuid", Null),
            col("points", "bigint", Literal("0")),
            col("reason", "text", Null),
            CREATED_AT,
        ],
        unique: &[&["id"]],
    },
    TableDef {
        name: tables::ADMIN_USERS,
        columns: &[
            ID,
            col("user_id", "uuid", Null),
            col("email", "text", Null),
            CREATED_AT,
        ],
        unique: &[&["id"], &["user_id"]],
    },
    TableDef {
        name: tables::AUDIT_LOGS,
        columns: &[
            ID,
            col("actor_id", "uuid", Null),
            col("action", "text", Null),
            col("resource_type", "text", Null),
            col("resource_id", "text", Null),
            col("details", "jsonb", Literal("{}")),
            CREATED_AT,
        ],
        unique: &[&["id"]],
    },
];

/// Look up a table definition by name.
pub fn table(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().find(|t| t.name == name)
}
