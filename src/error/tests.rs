//! Unit tests for error handling

use super::*;
use std::io;

#[cfg(test)]
mod fantasy_critic_error_tests {
    use super::*;

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error = FantasyCriticError::from(json_error);

        match error {
            FantasyCriticError::Json(_) => (),
            _ => panic!("Expected Json error variant"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = FantasyCriticError::from(io_error);

        match error {
            FantasyCriticError::Io(_) => (),
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn test_uuid_error_conversion() {
        let uuid_error = uuid::Uuid::parse_str("not-a-uuid").unwrap_err();
        let error = FantasyCriticError::from(uuid_error);

        assert!(matches!(error, FantasyCriticError::InvalidId(_)));
        assert!(error.is_client_error());
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_error = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let error = FantasyCriticError::from(toml_error);

        assert!(matches!(error, FantasyCriticError::ConfigParse(_)));
        assert!(!error.is_client_error());
    }

    #[test]
    fn test_database_error_conversion() {
        let db_error = rusqlite::Error::InvalidColumnType(
            0,
            "test_column".to_string(),
            rusqlite::types::Type::Null,
        );
        let error = FantasyCriticError::from(db_error);

        match error {
            FantasyCriticError::Database(_) => (),
            _ => panic!("Expected Database error variant"),
        }
    }

    #[test]
    fn test_anyhow_error_is_transparent() {
        let anyhow_error = anyhow::anyhow!("Test anyhow error message");
        let error = FantasyCriticError::from(anyhow_error);

        assert_eq!(error.to_string(), "Test anyhow error message");
        assert!(!error.is_client_error());
    }

    #[test]
    fn test_validation_message_is_displayed_verbatim() {
        let error = FantasyCriticError::validation("You cannot have a blank league name.");
        assert_eq!(error.to_string(), "You cannot have a blank league name.");
        assert!(error.is_client_error());
    }

    #[test]
    fn test_forbidden_error() {
        let error = FantasyCriticError::forbidden("You are not the manager of that league.");
        let error_string = error.to_string();
        assert!(error_string.starts_with("Forbidden"));
        assert!(error_string.contains("manager"));
        assert!(error.is_client_error());
    }

    #[test]
    fn test_not_found_error() {
        let error = FantasyCriticError::not_found("Publisher", "abc");
        assert_eq!(error.to_string(), "Publisher not found: abc");
        assert!(error.is_client_error());
    }

    #[test]
    fn test_read_only_error() {
        let error = FantasyCriticError::ReadOnly;
        assert_eq!(
            error.to_string(),
            "Site is in read-only mode while actions process."
        );
    }

    #[test]
    fn test_missing_user_id_error() {
        let error = FantasyCriticError::MissingUserId {
            env_var: "FANTASY_CRITIC_USER_ID".to_string(),
        };

        let error_string = error.to_string();
        assert!(error_string.contains("User ID not provided"));
        assert!(error_string.contains("FANTASY_CRITIC_USER_ID"));
    }

    #[test]
    fn test_error_source_chain() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = FantasyCriticError::from(io_error);

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_result_type_alias_error() {
        fn test_function() -> Result<String> {
            Err(FantasyCriticError::ReadOnly)
        }

        match test_function().unwrap_err() {
            FantasyCriticError::ReadOnly => (),
            _ => panic!("Expected ReadOnly error"),
        }
    }
}
