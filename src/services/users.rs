//! Read-only borrower directory

use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
    config::UsersConfig,
    error::{AppError, AppResult},
    models::{BorrowerId, User},
    validation::is_valid_borrower_id,
};

const SAMPLE_USERS: &str = include_str!("../../config/users.json");

/// Borrower ID to display name lookup, loaded once at startup
#[derive(Clone, Default)]
pub struct UserDirectory {
    users: Arc<IndexMap<String, User>>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        let users = users
            .into_iter()
            .filter(|user| {
                let valid = is_valid_borrower_id(&user.id);
                if !valid {
                    tracing::warn!("Ignoring directory entry with invalid borrower ID '{}'", user.id);
                }
                valid
            })
            .map(|user| (user.id.clone(), user))
            .collect();

        Self {
            users: Arc::new(users),
        }
    }

    /// Parse a JSON array of users
    pub fn from_json(json: &str) -> AppResult<Self> {
        let users: Vec<User> = serde_json::from_str(json)
            .map_err(|e| AppError::Internal(format!("Invalid user directory: {}", e)))?;
        Ok(Self::new(users))
    }

    /// The sample borrowers `user1`..`user5` bundled with the server
    pub fn sample() -> AppResult<Self> {
        Self::from_json(SAMPLE_USERS)
    }

    /// Directory from the configured file, the sample users when none is
    /// configured
    pub fn from_config(config: &UsersConfig) -> AppResult<Self> {
        let Some(path) = config.directory.as_deref() else {
            let directory = Self::sample()?;
            tracing::info!("Using {} bundled sample users", directory.len());
            return Ok(directory);
        };

        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::Internal(format!("Failed to read user directory {}: {}", path, e))
        })?;
        let directory = Self::from_json(&json)?;
        tracing::info!("Loaded {} users from {}", directory.len(), path);
        Ok(directory)
    }

    pub fn get(&self, id: &str) -> Option<&User> {
        self.users.get(id)
    }

    /// Display name, falling back to the raw ID for unknown borrowers
    pub fn display_name(&self, id: &BorrowerId) -> String {
        self.get(id.as_str())
            .map(|user| user.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn list(&self) -> Vec<User> {
        self.users.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS: &str = r#"[
        {"id": "user1", "name": "Ada", "image_url": "https://example.com/ada.png"},
        {"id": "admin", "name": "Root", "image_url": "https://example.com/root.png"},
        {"id": "user2", "name": "Alan", "image_url": "https://example.com/alan.png"}
    ]"#;

    #[test]
    fn test_load_skips_invalid_ids() {
        let directory = UserDirectory::from_json(USERS).unwrap();
        assert_eq!(directory.len(), 2);
        assert!(directory.get("admin").is_none());
        assert_eq!(directory.list()[1].name, "Alan");
    }

    #[test]
    fn test_display_name_fallback() {
        let directory = UserDirectory::from_json(USERS).unwrap();
        assert_eq!(directory.display_name(&BorrowerId::parse("user1").unwrap()), "Ada");
        assert_eq!(directory.display_name(&BorrowerId::parse("user9").unwrap()), "user9");
    }

    #[test]
    fn test_no_file_configured_uses_sample_users() {
        let directory = UserDirectory::from_config(&UsersConfig::default()).unwrap();
        assert_eq!(directory.len(), 5);
        let ids: Vec<String> = directory.list().into_iter().map(|user| user.id).collect();
        assert_eq!(ids, vec!["user1", "user2", "user3", "user4", "user5"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let config = UsersConfig {
            directory: Some("does/not/exist.json".to_string()),
        };
        assert!(matches!(UserDirectory::from_config(&config), Err(AppError::Internal(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(UserDirectory::from_json("{"), Err(AppError::Internal(_))));
    }
}
