//! Error types for the mapping layer
//!
//! This module defines all error types that can occur while executing commands,
//! materializing rows or generating SQL from mapping metadata.

use super::value::ConversionError;

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Failures raised while turning rows into mapped objects
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// The mapped type never declared a constructor
    #[error("Could not find a parameterless constructor on the type '{type_name}'. rust_micro_orm can only be used to map types that have a public, parameterless constructor.")]
    NoParameterlessConstructor { type_name: &'static str },

    /// A column value could not be converted into the property's type
    #[error("Could not map the property '{column}' as its data type does not match the database.")]
    InvalidCast {
        column: String,
        #[source]
        source: ConversionError,
    },
}

impl MappingError {
    /// Create a missing-constructor error for `type_name`
    pub fn no_parameterless_constructor(type_name: &'static str) -> Self {
        MappingError::NoParameterlessConstructor { type_name }
    }

    /// Create an invalid-cast error for `column`, wrapping the conversion failure
    pub fn invalid_cast(column: impl Into<String>, source: ConversionError) -> Self {
        MappingError::InvalidCast {
            column: column.into(),
            source,
        }
    }
}

/// Error types for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Row-to-object mapping failed
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// A scalar result could not be converted into the requested type
    #[error(transparent)]
    TypeMismatch(#[from] ConversionError),

    /// A single result was expected but the query returned no rows
    #[error("Expected exactly one result but the query returned no rows")]
    NoElements,

    /// At most one result was expected but the query returned several
    #[error("Expected at most one result but the query returned more than one row")]
    MoreThanOneElement,

    /// The operation needs key columns and the type declares none
    #[error("No primary key properties were defined on type '{0}'")]
    NoKeyColumns(&'static str),

    /// Column not found
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// A placeholder in the SQL text has no matching parameter value
    #[error("No value was supplied for the parameter '{0}'")]
    UnboundParameter(String),

    /// Named connection string missing from configuration
    #[error("Connection string '{0}' was not found")]
    ConnectionStringNotFound(String),

    /// Connection error (generic)
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Unsupported operation
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// SQLite error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DatabaseError {
    /// Create a new connection error (generic)
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        DatabaseError::ConnectionError(msg.into())
    }

    /// Create a new unsupported operation error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        DatabaseError::UnsupportedOperation(msg.into())
    }

    /// Returns the mapping failure, if this error is one
    pub fn as_mapping(&self) -> Option<&MappingError> {
        match self {
            DatabaseError::Mapping(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_creation() {
        let err = DatabaseError::connection("Failed to connect");
        assert!(matches!(err, DatabaseError::ConnectionError(_)));

        let err = DatabaseError::unsupported("composite generated key");
        assert!(matches!(err, DatabaseError::UnsupportedOperation(_)));

        let err: DatabaseError = MappingError::no_parameterless_constructor("a::B").into();
        assert!(err.as_mapping().is_some());
    }

    #[test]
    fn test_mapping_messages() {
        let err = MappingError::no_parameterless_constructor("app::models::User4");
        assert_eq!(
            err.to_string(),
            "Could not find a parameterless constructor on the type 'app::models::User4'. \
             rust_micro_orm can only be used to map types that have a public, parameterless constructor."
        );

        let err = MappingError::invalid_cast("Name", ConversionError::new("i32", "string"));
        assert_eq!(
            err.to_string(),
            "Could not map the property 'Name' as its data type does not match the database."
        );
    }

    #[test]
    fn test_invalid_cast_keeps_source() {
        let err: DatabaseError =
            MappingError::invalid_cast("Name", ConversionError::new("i32", "string")).into();
        let source = err.source().map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("Type mismatch: expected i32, got string")
        );
    }

    #[test]
    fn test_error_display() {
        let err = DatabaseError::connection("Connection refused");
        assert_eq!(err.to_string(), "Connection error: Connection refused");

        let err = DatabaseError::UnboundParameter("@Nmae".into());
        assert_eq!(
            err.to_string(),
            "No value was supplied for the parameter '@Nmae'"
        );

        let err = DatabaseError::NoKeyColumns("Log");
        assert_eq!(
            err.to_string(),
            "No primary key properties were defined on type 'Log'"
        );
    }
}
