//! Core mapping types and traits
//!
//! This module provides the building blocks of the mapper: the value model, the
//! driver boundary, the per-type mapping cache, row materialization, SQL
//! generation and the query/CRUD operations built on top of them.

pub mod config;
#[cfg(feature = "sqlite")]
pub mod connection;
pub mod database;
pub mod database_types;
pub mod error;
pub mod extensions;
pub mod mapping;
pub mod row;
pub mod sql;
pub mod value;

// Re-export commonly used types
pub use config::{ConnectionStringSettings, ConnectionStrings};
#[cfg(feature = "sqlite")]
pub use connection::Connection;
pub use database::{Command, DataRecord, DbConnection, IntoParameters, NamedParams, Parameter};
pub use database_types::DatabaseType;
pub use error::{DatabaseError, MappingError, Result};
pub use extensions::DbConnectionExt;
pub use mapping::{mapping, ColumnMapping, Mapped, PropertyDescriptor, TypeDescriptor, TypeMapping};
pub use row::{FromRow, RowMapper};
pub use sql::{IntoKey, KeyValues, Statement};
pub use value::{ConversionError, DatabaseValue, FromValue};
