//! Named connection strings
//!
//! Connections are opened by name from a registry that can be loaded from JSON:
//!
//! ```json
//! {
//!   "connectionStrings": {
//!     "Test": { "providerName": "sqlite", "connectionString": ":memory:" }
//!   }
//! }
//! ```

use super::database_types::DatabaseType;
use super::error::{DatabaseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One configured connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStringSettings {
    /// Driver provider, parsed with [`DatabaseType`]'s `FromStr`
    pub provider_name: String,
    /// Driver-specific connection string; a file path or `:memory:` for SQLite
    pub connection_string: String,
}

impl ConnectionStringSettings {
    pub fn new(provider_name: impl Into<String>, connection_string: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            connection_string: connection_string.into(),
        }
    }

    /// The provider, if its name is recognized
    pub fn provider(&self) -> Option<DatabaseType> {
        self.provider_name.parse().ok()
    }
}

/// Registry of connection strings keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStrings {
    #[serde(default)]
    connection_strings: BTreeMap<String, ConnectionStringSettings>,
}

impl ConnectionStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let strings = Self::from_json_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            count = strings.connection_strings.len(),
            "loaded connection strings"
        );
        Ok(strings)
    }

    /// Add or replace a named connection
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, settings: ConnectionStringSettings) -> Self {
        self.insert(name, settings);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, settings: ConnectionStringSettings) {
        self.connection_strings.insert(name.into(), settings);
    }

    pub fn get(&self, name: &str) -> Option<&ConnectionStringSettings> {
        self.connection_strings.get(name)
    }

    /// Settings for `name`, checked for a provider this build can open
    pub fn resolve(&self, name: &str) -> Result<(DatabaseType, &ConnectionStringSettings)> {
        let settings = self
            .get(name)
            .ok_or_else(|| DatabaseError::ConnectionStringNotFound(name.to_string()))?;

        match settings.provider() {
            Some(provider) if provider.is_supported() => Ok((provider, settings)),
            provider => {
                tracing::warn!(
                    name,
                    provider_name = %settings.provider_name,
                    recognized = provider.is_some(),
                    "cannot create connection for provider"
                );
                Err(DatabaseError::connection(format!(
                    "Could not create connection for connection string '{}'",
                    name
                )))
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connection_strings.keys().map(String::as_str)
    }
}
