//! In-memory identity and permission directory.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use super::{PermissionStore, Permissions, StoreError, User, UserStore};

/// A token issued to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub user_id: i64,
    pub scope: String,
    /// Expiry timestamp (seconds since epoch).
    pub expiry: u64,
}

impl TokenRecord {
    pub fn is_expired(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.expiry <= now
    }
}

/// On-disk fixture layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Fixtures {
    users: Vec<User>,
    tokens: HashMap<String, TokenRecord>,
    permissions: HashMap<i64, Permissions>,
}

/// Thread-safe directory of users, tokens and permission grants.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    users: Arc<DashMap<i64, User>>,
    tokens: Arc<DashMap<String, TokenRecord>>,
    permissions: Arc<DashMap<i64, Permissions>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load users, tokens and grants from a JSON fixture file.
    pub fn load_from_file(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let fixtures: Fixtures = serde_json::from_reader(BufReader::new(file))?;

        let directory = Self::new();
        for user in fixtures.users {
            directory.insert_user(user);
        }
        for (token, record) in fixtures.tokens {
            directory.tokens.insert(token, record);
        }
        for (user_id, permissions) in fixtures.permissions {
            directory.permissions.insert(user_id, permissions);
        }

        tracing::info!(
            users = directory.users.len(),
            tokens = directory.tokens.len(),
            "Loaded identity fixtures"
        );
        Ok(directory)
    }

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Register a token for a user with the given scope and expiry.
    pub fn insert_token(&self, token: impl Into<String>, user_id: i64, scope: &str, expiry: u64) {
        self.tokens.insert(
            token.into(),
            TokenRecord {
                user_id,
                scope: scope.to_string(),
                expiry,
            },
        );
    }

    pub fn grant(&self, user_id: i64, permissions: Permissions) {
        self.permissions.insert(user_id, permissions);
    }
}

#[async_trait]
impl UserStore for MemoryDirectory {
    async fn get_for_token(&self, scope: &str, token: &str) -> Result<User, StoreError> {
        let user_id = match self.tokens.get(token) {
            Some(record) if record.scope == scope && !record.is_expired() => record.user_id,
            _ => return Err(StoreError::RecordNotFound),
        };

        self.users
            .get(&user_id)
            .map(|r| r.value().clone())
            .ok_or(StoreError::RecordNotFound)
    }
}

#[async_trait]
impl PermissionStore for MemoryDirectory {
    async fn get_all_for_user(&self, user_id: i64) -> Result<Permissions, StoreError> {
        Ok(self
            .permissions
            .get(&user_id)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }
}
