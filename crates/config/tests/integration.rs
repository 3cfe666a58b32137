//! Integration tests for config

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::{Builder, NamedTempFile};
    use xfck_config::*;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[paths]
new_path = "/data/new"
old_path = "/data/old"

[ledger]
database = "/var/lib/xfck/ledger.sqlite"
table_name = "transfer_2024"
where_clause = "filename like 'sub/%'"
max_connections = 4

[workers]
hash_workers = 3
"#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.new_path().unwrap(), Path::new("/data/new"));
        assert_eq!(config.old_path().unwrap(), Path::new("/data/old"));
        assert_eq!(config.ledger.table_name, "transfer_2024");
        assert_eq!(config.ledger.filter(), Some("filename like 'sub/%'"));
        assert_eq!(config.ledger.max_connections, 4);
        assert_eq!(
            config.ledger.min_idle_connections,
            constants::DEFAULT_MIN_IDLE_CONNECTIONS
        );
        assert_eq!(config.workers.hash_workers, 3);
        assert_eq!(config.workers.walk_workers, constants::DEFAULT_WALK_WORKERS);
        config.validate().unwrap();
    }

    #[tokio::test]
    async fn test_load_legacy_json() {
        let mut temp_file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            temp_file,
            r#"{{
  "new_path": "/path/to/DATA_NEW",
  "old_path": "/path/to/DATA_OLD",
  "db_connstr": "sqlite:///tmp/ledger.db",
  "table_name": "files_check",
  "where_clause": "",
  "db_maxconnections": 10,
  "db_idleconnections": 5
}}"#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.new_path().unwrap(), Path::new("/path/to/DATA_NEW"));
        assert_eq!(config.database().unwrap(), Path::new("/tmp/ledger.db"));
        assert_eq!(config.ledger.table_name, "files_check");
        assert_eq!(config.ledger.filter(), None);
        assert_eq!(config.ledger.max_connections, 10);
        assert_eq!(config.ledger.min_idle_connections, 5);
        config.validate().unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from_file(&dir.path().join("nope.toml"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[tokio::test]
    async fn test_unreadable_path_keeps_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from_file(dir.path()).await.unwrap_err();
        assert!(matches!(err, xfck_errors::Error::Storage(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_legacy_postgres_connstr_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"new_path": "/n", "old_path": "/o", "db_connstr": "postgres://u@h/db"}"#,
        )
        .unwrap();

        let err = Config::load_from_file(&path).await.unwrap_err();
        assert!(matches!(
            err,
            xfck_errors::Error::Config(xfck_errors::ConfigError::InvalidValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_toml_is_parse_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[workers]\nhash_workers = \"many\"").unwrap();
        let err = Config::load_from_file(temp_file.path()).await.unwrap_err();
        assert!(matches!(
            err,
            xfck_errors::Error::Config(xfck_errors::ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var(constants::ENV_NEW_PATH, "/env/new");
        std::env::set_var(constants::ENV_WHERE, "size > 0");
        std::env::set_var(constants::ENV_HASH_WORKERS, "12");

        let mut config = Config::default();
        config.merge_env().unwrap();
        assert_eq!(config.new_path().unwrap(), Path::new("/env/new"));
        assert_eq!(config.ledger.filter(), Some("size > 0"));
        assert_eq!(config.workers.hash_workers, 12);

        std::env::set_var(constants::ENV_HASH_WORKERS, "lots");
        assert!(config.merge_env().is_err());

        std::env::remove_var(constants::ENV_NEW_PATH);
        std::env::remove_var(constants::ENV_WHERE);
        std::env::remove_var(constants::ENV_HASH_WORKERS);
    }
}
