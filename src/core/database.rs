//! Driver boundary
//!
//! This module defines the capability the mapping layer consumes from a database
//! driver: something that can run a [`Command`] and hand back a row count, a
//! scalar or a cursor of [`DataRecord`]s. Parameter sources (positional slices and
//! [`NamedParams`] property bags) are normalized into [`Parameter`] lists here.

use super::error::{DatabaseError, Result};
use super::mapping::{mapping, Mapped};
use super::value::DatabaseValue;
use serde::Serialize;

/// A bound parameter: placeholder name plus value
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Placeholder name including its prefix, e.g. `@0` or `@Name`
    pub name: String,
    /// Zero-based position for positional parameters, `None` for named ones
    pub ordinal: Option<usize>,
    /// Value to bind; `DatabaseValue::Null` binds SQL NULL
    pub value: DatabaseValue,
}

impl Parameter {
    /// Positional parameter, named `@<ordinal>`
    pub fn positional(ordinal: usize, value: DatabaseValue) -> Self {
        Self {
            name: format!("@{}", ordinal),
            ordinal: Some(ordinal),
            value,
        }
    }

    /// Named parameter; `@` is prepended unless the name already carries a prefix
    pub fn named(name: &str, value: DatabaseValue) -> Self {
        let name = if name.starts_with(['@', ':', '$']) {
            name.to_string()
        } else {
            format!("@{}", name)
        };
        Self {
            name,
            ordinal: None,
            value,
        }
    }
}

/// SQL text plus the parameters to bind to it
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub text: String,
    pub parameters: Vec<Parameter>,
}

impl Command {
    pub fn new(text: impl Into<String>, params: impl IntoParameters) -> Self {
        Self {
            text: text.into(),
            parameters: params.into_parameters(),
        }
    }
}

/// Anything that can be turned into a parameter list for a [`Command`]
pub trait IntoParameters {
    fn into_parameters(self) -> Vec<Parameter>;
}

fn positional<I: IntoIterator<Item = DatabaseValue>>(values: I) -> Vec<Parameter> {
    values
        .into_iter()
        .enumerate()
        .map(|(ordinal, value)| Parameter::positional(ordinal, value))
        .collect()
}

impl IntoParameters for () {
    fn into_parameters(self) -> Vec<Parameter> {
        Vec::new()
    }
}

impl IntoParameters for &[DatabaseValue] {
    fn into_parameters(self) -> Vec<Parameter> {
        positional(self.iter().cloned())
    }
}

impl IntoParameters for Vec<DatabaseValue> {
    fn into_parameters(self) -> Vec<Parameter> {
        positional(self)
    }
}

impl<const N: usize> IntoParameters for [DatabaseValue; N] {
    fn into_parameters(self) -> Vec<Parameter> {
        positional(self)
    }
}

impl<const N: usize> IntoParameters for &[DatabaseValue; N] {
    fn into_parameters(self) -> Vec<Parameter> {
        positional(self.iter().cloned())
    }
}

impl IntoParameters for NamedParams {
    fn into_parameters(self) -> Vec<Parameter> {
        self.entries
            .into_iter()
            .map(|(name, value)| Parameter::named(&name, value))
            .collect()
    }
}

impl IntoParameters for &NamedParams {
    fn into_parameters(self) -> Vec<Parameter> {
        self.iter()
            .map(|(name, value)| Parameter::named(name, value.clone()))
            .collect()
    }
}

impl IntoParameters for Vec<Parameter> {
    fn into_parameters(self) -> Vec<Parameter> {
        self
    }
}

/// An ordered bag of named values, bound as `@Name` parameters
///
/// # Example
///
/// ```
/// use rust_micro_orm::core::database::NamedParams;
///
/// let params = NamedParams::new().add("Id", 1).add("Name", "Alice");
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedParams {
    entries: Vec<(String, DatabaseValue)>,
}

impl NamedParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named value
    #[must_use]
    pub fn add(mut self, name: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<DatabaseValue>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Build a bag from the properties of a mapped object.
    ///
    /// Every mapped property contributes its value under its property name, so
    /// `insert into Users (Name) values (@Name)` can be fed a `User` directly.
    pub fn of<T: Mapped>(entity: &T) -> Self {
        mapping::<T>()
            .columns()
            .map(|column| (column.property_name().to_string(), column.get(entity)))
            .collect()
    }

    /// Build a bag from the top-level fields of any serializable value.
    ///
    /// Fields keep their serialization order. Nested objects and arrays are
    /// rejected, as are integers beyond the range of `i64`.
    pub fn from_serialize<S: Serialize + ?Sized>(source: &S) -> Result<Self> {
        use serde_json::Value;

        let object = match serde_json::to_value(source)? {
            Value::Object(object) => object,
            Value::Null => return Ok(Self::new()),
            other => {
                return Err(DatabaseError::unsupported(format!(
                    "named parameters must come from a struct or map, got {}",
                    json_kind(&other)
                )))
            }
        };

        let mut params = Self::new();
        for (name, value) in object {
            let value = match value {
                Value::Null => DatabaseValue::Null,
                Value::Bool(b) => DatabaseValue::Bool(b),
                Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                    (Some(i), _) => DatabaseValue::Long(i),
                    (None, Some(f)) if n.is_f64() => DatabaseValue::Double(f),
                    _ => {
                        return Err(DatabaseError::unsupported(format!(
                            "parameter '{}' does not fit in a 64-bit signed integer",
                            name
                        )))
                    }
                },
                Value::String(s) => DatabaseValue::String(s),
                other => {
                    return Err(DatabaseError::unsupported(format!(
                        "parameter '{}' is a nested {}",
                        name,
                        json_kind(&other)
                    )))
                }
            };
            params.push(name, value);
        }
        Ok(params)
    }

    /// Look up a value by exact name
    pub fn get(&self, name: &str) -> Option<&DatabaseValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatabaseValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl<K: Into<String>, V: Into<DatabaseValue>> FromIterator<(K, V)> for NamedParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Build a positional parameter array.
///
/// ```
/// use rust_micro_orm::params;
///
/// let values = params![1, "Foo", Option::<i32>::None];
/// assert_eq!(values.len(), 3);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        [$crate::core::value::DatabaseValue::Null; 0]
    };
    ($($value:expr),+ $(,)?) => {
        [$($crate::core::value::DatabaseValue::from($value)),+]
    };
}

/// Build a [`NamedParams`] bag.
///
/// ```
/// use rust_micro_orm::named_params;
///
/// let bag = named_params! { "Id" => 1, "Id2" => "foo" };
/// assert_eq!(bag.len(), 2);
/// ```
#[macro_export]
macro_rules! named_params {
    () => {
        $crate::core::database::NamedParams::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {
        $crate::core::database::NamedParams::new()$(.add($name, $value))+
    };
}

/// One row of a result cursor
pub trait DataRecord {
    /// Number of columns in the row
    fn field_count(&self) -> usize;

    /// Name of the column at `ordinal`
    fn name(&self, ordinal: usize) -> Result<&str>;

    /// Value of the column at `ordinal`; NULL is `DatabaseValue::Null`
    fn value(&self, ordinal: usize) -> Result<DatabaseValue>;
}

/// Column names of a record, in ordinal order
pub fn column_names(record: &dyn DataRecord) -> Result<Vec<String>> {
    (0..record.field_count())
        .map(|ordinal| record.name(ordinal).map(str::to_string))
        .collect()
}

/// Capability a database driver must provide to the mapping layer
///
/// Each call owns its statement and cursor for the duration of the call; both
/// are released before it returns, on success and on error.
pub trait DbConnection {
    /// Execute a command that does not return rows; returns the affected row count
    fn execute_non_query(&self, command: &Command) -> Result<u64>;

    /// Execute a command and return the first column of the first row, or
    /// `DatabaseValue::Null` when there is no row
    fn execute_scalar(&self, command: &Command) -> Result<DatabaseValue>;

    /// Execute a command and feed every row, in cursor order, to `on_row`
    fn execute_reader(
        &self,
        command: &Command,
        on_row: &mut dyn FnMut(&dyn DataRecord) -> Result<()>,
    ) -> Result<()>;
}

impl<C: DbConnection + ?Sized> DbConnection for &C {
    fn execute_non_query(&self, command: &Command) -> Result<u64> {
        (**self).execute_non_query(command)
    }

    fn execute_scalar(&self, command: &Command) -> Result<DatabaseValue> {
        (**self).execute_scalar(command)
    }

    fn execute_reader(
        &self,
        command: &Command,
        on_row: &mut dyn FnMut(&dyn DataRecord) -> Result<()>,
    ) -> Result<()> {
        (**self).execute_reader(command, on_row)
    }
}
