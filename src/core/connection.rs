//! Owned connection façade
//!
//! [`Connection`] wraps a driver connection so that every [`DbConnectionExt`]
//! operation is reachable with plain method syntax.
//!
//! [`DbConnectionExt`]: super::extensions::DbConnectionExt

use super::config::ConnectionStrings;
use super::database::{Command, DataRecord, DbConnection};
use super::database_types::DatabaseType;
use super::error::{DatabaseError, Result};
use super::value::DatabaseValue;
use std::path::Path;

/// A database connection the mapping operations run against
#[derive(Debug)]
pub struct Connection<C = rusqlite::Connection> {
    inner: C,
}

impl<C: DbConnection> Connection<C> {
    /// Wrap an already open driver connection
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl Connection<rusqlite::Connection> {
    /// Open the connection configured under `name`
    ///
    /// # Errors
    ///
    /// - `ConnectionStringNotFound` when `name` is not configured
    /// - `ConnectionError` when the provider is unknown or not built in
    /// - `SqliteError` when the driver cannot open the database
    pub fn open(strings: &ConnectionStrings, name: &str) -> Result<Self> {
        let (provider, settings) = strings.resolve(name)?;
        match provider {
            DatabaseType::Sqlite => {
                tracing::info!(name, "opening sqlite connection");
                Ok(Self::new(rusqlite::Connection::open(
                    &settings.connection_string,
                )?))
            }
            _ => Err(DatabaseError::connection(format!(
                "Could not create connection for connection string '{}'",
                name
            ))),
        }
    }

    /// Open a SQLite database file, creating it if needed
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(rusqlite::Connection::open(path)?))
    }

    /// Open a private in-memory SQLite database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(rusqlite::Connection::open_in_memory()?))
    }

    /// Run a batch of semicolon-separated statements without parameters
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        tracing::debug!(sql, "executing batch");
        Ok(self.inner.execute_batch(sql)?)
    }

    /// Begin a transaction; operations run on the returned handle directly
    pub fn transaction(&mut self) -> Result<rusqlite::Transaction<'_>> {
        Ok(self.inner.transaction()?)
    }
}

impl<C: DbConnection> DbConnection for Connection<C> {
    fn execute_non_query(&self, command: &Command) -> Result<u64> {
        self.inner.execute_non_query(command)
    }

    fn execute_scalar(&self, command: &Command) -> Result<DatabaseValue> {
        self.inner.execute_scalar(command)
    }

    fn execute_reader(
        &self,
        command: &Command,
        on_row: &mut dyn FnMut(&dyn DataRecord) -> Result<()>,
    ) -> Result<()> {
        self.inner.execute_reader(command, on_row)
    }
}

impl From<rusqlite::Connection> for Connection<rusqlite::Connection> {
    fn from(inner: rusqlite::Connection) -> Self {
        Self::new(inner)
    }
}
