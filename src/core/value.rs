//! Database value types
//!
//! `DatabaseValue` is the cell type shared by parameters and result rows. The
//! [`FromValue`] trait performs the strict conversions used when a cell is written
//! into a mapped property.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database value that can hold different types
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum DatabaseValue {
    /// Null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit floating point
    Double(f64),
    /// String value
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Timestamp (Unix timestamp in microseconds)
    Timestamp(i64),
}

impl DatabaseValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            DatabaseValue::Null => "null",
            DatabaseValue::Bool(_) => "bool",
            DatabaseValue::Int(_) => "int",
            DatabaseValue::Long(_) => "long",
            DatabaseValue::Float(_) => "float",
            DatabaseValue::Double(_) => "double",
            DatabaseValue::String(_) => "string",
            DatabaseValue::Bytes(_) => "bytes",
            DatabaseValue::Timestamp(_) => "timestamp",
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(v: bool) -> Self {
        DatabaseValue::Bool(v)
    }
}

macro_rules! from_small_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for DatabaseValue {
                fn from(v: $ty) -> Self {
                    DatabaseValue::Int(i32::from(v))
                }
            }
        )*
    };
}

from_small_int!(i8, i16, u8, u16);

impl From<i32> for DatabaseValue {
    fn from(v: i32) -> Self {
        DatabaseValue::Int(v)
    }
}

impl From<u32> for DatabaseValue {
    fn from(v: u32) -> Self {
        DatabaseValue::Long(i64::from(v))
    }
}

impl From<i64> for DatabaseValue {
    fn from(v: i64) -> Self {
        DatabaseValue::Long(v)
    }
}

impl From<f32> for DatabaseValue {
    fn from(v: f32) -> Self {
        DatabaseValue::Float(v)
    }
}

impl From<f64> for DatabaseValue {
    fn from(v: f64) -> Self {
        DatabaseValue::Double(v)
    }
}

impl From<String> for DatabaseValue {
    fn from(v: String) -> Self {
        DatabaseValue::String(v)
    }
}

impl From<&str> for DatabaseValue {
    fn from(v: &str) -> Self {
        DatabaseValue::String(v.to_string())
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(v: Vec<u8>) -> Self {
        DatabaseValue::Bytes(v)
    }
}

impl From<DateTime<Utc>> for DatabaseValue {
    fn from(v: DateTime<Utc>) -> Self {
        DatabaseValue::Timestamp(v.timestamp_micros())
    }
}

impl<T: Into<DatabaseValue>> From<Option<T>> for DatabaseValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// A cell value whose runtime type does not fit the requested Rust type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Type mismatch: expected {expected}, got {actual}")]
pub struct ConversionError {
    /// Rust type that was requested
    pub expected: &'static str,
    /// `DatabaseValue::type_name` of the value that was supplied
    pub actual: &'static str,
}

impl ConversionError {
    pub fn new(expected: &'static str, actual: &'static str) -> Self {
        Self { expected, actual }
    }

    fn of<T>(value: &DatabaseValue) -> Self {
        Self::new(std::any::type_name::<T>(), value.type_name())
    }
}

/// Strict conversion from a database cell into a Rust value.
///
/// `from_value` is only ever handed non-NULL values; NULL cells resolve to
/// [`FromValue::null`], the type's zero or absent value. Strings are never
/// parsed into numbers.
pub trait FromValue: Sized {
    /// Convert a non-NULL value
    fn from_value(value: DatabaseValue) -> Result<Self, ConversionError>;

    /// The value a NULL cell materializes as
    fn null() -> Self;

    /// Convert any value, routing NULL to [`FromValue::null`]
    fn from_nullable(value: DatabaseValue) -> Result<Self, ConversionError> {
        if value.is_null() {
            Ok(Self::null())
        } else {
            Self::from_value(value)
        }
    }
}

macro_rules! integer_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: DatabaseValue) -> Result<Self, ConversionError> {
                    let wide = match &value {
                        DatabaseValue::Int(v) => i64::from(*v),
                        DatabaseValue::Long(v) => *v,
                        _ => return Err(ConversionError::of::<$ty>(&value)),
                    };
                    <$ty>::try_from(wide).map_err(|_| ConversionError::of::<$ty>(&value))
                }

                fn null() -> Self {
                    0
                }
            }
        )*
    };
}

integer_from_value!(i8, i16, i32, u8, u16, u32, u64);

impl FromValue for i64 {
    fn from_value(value: DatabaseValue) -> Result<Self, ConversionError> {
        match value {
            DatabaseValue::Int(v) => Ok(i64::from(v)),
            DatabaseValue::Long(v) | DatabaseValue::Timestamp(v) => Ok(v),
            other => Err(ConversionError::of::<i64>(&other)),
        }
    }

    fn null() -> Self {
        0
    }
}

impl FromValue for bool {
    fn from_value(value: DatabaseValue) -> Result<Self, ConversionError> {
        match value {
            DatabaseValue::Bool(v) => Ok(v),
            DatabaseValue::Int(v) => Ok(v != 0),
            DatabaseValue::Long(v) => Ok(v != 0),
            other => Err(ConversionError::of::<bool>(&other)),
        }
    }

    fn null() -> Self {
        false
    }
}

impl FromValue for f32 {
    fn from_value(value: DatabaseValue) -> Result<Self, ConversionError> {
        match value {
            DatabaseValue::Float(v) => Ok(v),
            DatabaseValue::Double(v) => Ok(v as f32),
            DatabaseValue::Int(v) => Ok(v as f32),
            DatabaseValue::Long(v) => Ok(v as f32),
            other => Err(ConversionError::of::<f32>(&other)),
        }
    }

    fn null() -> Self {
        0.0
    }
}

impl FromValue for f64 {
    fn from_value(value: DatabaseValue) -> Result<Self, ConversionError> {
        match value {
            DatabaseValue::Double(v) => Ok(v),
            DatabaseValue::Float(v) => Ok(f64::from(v)),
            DatabaseValue::Int(v) => Ok(f64::from(v)),
            DatabaseValue::Long(v) => Ok(v as f64),
            other => Err(ConversionError::of::<f64>(&other)),
        }
    }

    fn null() -> Self {
        0.0
    }
}

impl FromValue for String {
    fn from_value(value: DatabaseValue) -> Result<Self, ConversionError> {
        match value {
            DatabaseValue::String(s) => Ok(s),
            other => Err(ConversionError::of::<String>(&other)),
        }
    }

    fn null() -> Self {
        String::new()
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: DatabaseValue) -> Result<Self, ConversionError> {
        match value {
            DatabaseValue::Bytes(b) => Ok(b),
            other => Err(ConversionError::of::<Vec<u8>>(&other)),
        }
    }

    fn null() -> Self {
        Vec::new()
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: DatabaseValue) -> Result<Self, ConversionError> {
        let parsed = match &value {
            DatabaseValue::Timestamp(v) | DatabaseValue::Long(v) => {
                DateTime::<Utc>::from_timestamp_micros(*v)
            }
            DatabaseValue::String(s) => s.parse::<DateTime<Utc>>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| ConversionError::of::<DateTime<Utc>>(&value))
    }

    fn null() -> Self {
        DateTime::<Utc>::UNIX_EPOCH
    }
}

impl FromValue for DatabaseValue {
    fn from_value(value: DatabaseValue) -> Result<Self, ConversionError> {
        Ok(value)
    }

    fn null() -> Self {
        DatabaseValue::Null
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: DatabaseValue) -> Result<Self, ConversionError> {
        T::from_value(value).map(Some)
    }

    fn null() -> Self {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from_types() {
        let val: DatabaseValue = 42.into();
        assert_eq!(val, DatabaseValue::Int(42));

        let val: DatabaseValue = "hello".into();
        assert_eq!(val, DatabaseValue::String("hello".to_string()));

        let val: DatabaseValue = Some(42).into();
        assert_eq!(val, DatabaseValue::Int(42));

        let val: DatabaseValue = Option::<i32>::None.into();
        assert_eq!(val, DatabaseValue::Null);
    }

    #[test]
    fn test_null_becomes_zero_value() {
        assert_eq!(i32::from_nullable(DatabaseValue::Null), Ok(0));
        assert_eq!(String::from_nullable(DatabaseValue::Null), Ok(String::new()));
        assert_eq!(
            Option::<String>::from_nullable(DatabaseValue::Null),
            Ok(None)
        );
        assert_eq!(bool::from_nullable(DatabaseValue::Null), Ok(false));
    }

    #[test]
    fn test_sqlite_integers_narrow() {
        assert_eq!(i32::from_value(DatabaseValue::Long(7)), Ok(7));
        assert_eq!(bool::from_value(DatabaseValue::Long(1)), Ok(true));

        let err = i32::from_value(DatabaseValue::Long(i64::MAX)).unwrap_err();
        assert_eq!(err, ConversionError::new("i32", "long"));
    }

    #[test]
    fn test_strings_are_not_parsed_into_numbers() {
        let err = i32::from_value(DatabaseValue::String("123".into())).unwrap_err();
        assert_eq!(err.expected, "i32");
        assert_eq!(err.actual, "string");

        let err = String::from_value(DatabaseValue::Long(1)).unwrap_err();
        assert_eq!(err.actual, "long");
    }

    #[test]
    fn test_timestamp_round_trip() {
        let now = DateTime::<Utc>::from_timestamp_micros(1_700_000_000_123_456).unwrap();
        let stored: DatabaseValue = now.into();
        assert_eq!(stored, DatabaseValue::Timestamp(1_700_000_000_123_456));
        assert_eq!(DateTime::<Utc>::from_value(stored), Ok(now));
    }

    #[test]
    fn test_value_type_name() {
        assert_eq!(DatabaseValue::Null.type_name(), "null");
        assert_eq!(DatabaseValue::Long(42).type_name(), "long");
        assert_eq!(
            DatabaseValue::String("test".to_string()).type_name(),
            "string"
        );
    }
}
