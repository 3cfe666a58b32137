//! Integration tests for error types

#[cfg(test)]
mod tests {
    use xfck_errors::*;

    #[test]
    fn test_error_conversion() {
        let state_err = StateError::DatabaseError {
            message: "locked".into(),
        };
        let err: Error = state_err.into();
        assert!(matches!(err, Error::State(_)));
        assert_eq!(err.user_code(), Some("state.database_error"));
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::PathNotFound {
            path: "/data/new".into(),
        };
        assert_eq!(err.to_string(), "path not found: /data/new");
    }

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let storage_err = StorageError::from_io_with_path(&io_err, std::path::Path::new("/x"));
        assert!(matches!(storage_err, StorageError::PermissionDenied { .. }));
        assert!(storage_err.user_hint().is_some());
    }

    #[test]
    fn test_io_error_is_retryable() {
        let err: Error = std::io::Error::other("flaky disk").into();
        assert!(err.is_retryable());
        assert_eq!(err.user_code(), Some("error.io"));
    }

    #[test]
    fn test_config_missing_field_hint() {
        let err: Error = ConfigError::MissingField {
            field: "ledger.database".into(),
        }
        .into();
        assert_eq!(err.user_hint(), Some("Set [ledger].database or XFCK_DATABASE."));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_every_config_error_has_hint_and_code() {
        let errors = [
            ConfigError::NotFound { path: "x.toml".into() },
            ConfigError::Invalid { message: "bad".into() },
            ConfigError::ParseError { message: "line 1".into() },
            ConfigError::MissingField { field: "paths.new_path".into() },
            ConfigError::InvalidValue {
                field: "db_connstr".into(),
                value: "postgres://u@h/db".into(),
            },
        ];
        for err in errors {
            assert!(err.user_hint().is_some(), "{err:?}");
            assert!(err.user_code().unwrap().starts_with("config."), "{err:?}");
        }
    }
}
