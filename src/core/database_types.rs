//! Database provider definitions
//!
//! Provider names come from connection-string configuration (`providerName`).

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Known database providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// No provider specified
    #[default]
    None,
    /// PostgreSQL
    Postgres,
    /// MySQL/MariaDB
    Mysql,
    /// SQLite
    Sqlite,
    /// Microsoft SQL Server
    SqlServer,
}

impl DatabaseType {
    pub fn to_str(&self) -> &'static str {
        match self {
            DatabaseType::None => "none",
            DatabaseType::Postgres => "postgres",
            DatabaseType::Mysql => "mysql",
            DatabaseType::Sqlite => "sqlite",
            DatabaseType::SqlServer => "sqlserver",
        }
    }

    /// Whether this build can open connections for the provider
    pub fn is_supported(&self) -> bool {
        match self {
            DatabaseType::Sqlite => cfg!(feature = "sqlite"),
            _ => false,
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for DatabaseType {
    type Err = String;

    /// Accepts short names as well as ADO.NET-style invariant names such as
    /// `System.Data.SQLite`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Ok(DatabaseType::None),
            "postgres" | "postgresql" | "npgsql" => Ok(DatabaseType::Postgres),
            "mysql" | "mariadb" | "mysql.data.mysqlclient" => Ok(DatabaseType::Mysql),
            "sqlite" | "sqlite3" | "system.data.sqlite" | "microsoft.data.sqlite" => {
                Ok(DatabaseType::Sqlite)
            }
            "sqlserver" | "mssql" | "system.data.sqlclient" => Ok(DatabaseType::SqlServer),
            _ => Err(format!("Invalid database type: '{}'", s)),
        }
    }
}
