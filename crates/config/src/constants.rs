//! Defaults and environment variable names

pub const DEFAULT_CONFIG_FILE: &str = "xfck.toml";

pub const DEFAULT_TABLE_NAME: &str = "files";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 16;
pub const DEFAULT_MIN_IDLE_CONNECTIONS: u32 = 2;
pub const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_HASH_WORKERS: usize = 8;
pub const DEFAULT_WALK_WORKERS: usize = 16;
pub const DEFAULT_INSERT_BATCH_SIZE: usize = 500;

// SQLite caps bound parameters per statement; each staged row binds three.
pub const MAX_INSERT_BATCH_SIZE: usize = 10_000;

pub const ENV_NEW_PATH: &str = "XFCK_NEW_PATH";
pub const ENV_OLD_PATH: &str = "XFCK_OLD_PATH";
pub const ENV_DATABASE: &str = "XFCK_DATABASE";
pub const ENV_TABLE: &str = "XFCK_TABLE";
pub const ENV_WHERE: &str = "XFCK_WHERE";
pub const ENV_HASH_WORKERS: &str = "XFCK_HASH_WORKERS";
pub const ENV_WALK_WORKERS: &str = "XFCK_WALK_WORKERS";
