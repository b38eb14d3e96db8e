//! SQL generation for mapped types
//!
//! Builds INSERT, UPDATE and SELECT statements from a [`TypeMapping`]. Every
//! statement uses numbered placeholders (`@0`, `@1`, ...) whose values are returned
//! alongside the SQL text, in placeholder order.

use super::database::NamedParams;
use super::error::{DatabaseError, Result};
use super::mapping::{Mapped, TypeMapping};
use super::value::DatabaseValue;
use std::any::type_name;

/// SQL text with its positional parameter values
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<DatabaseValue>,
}

/// Key value(s) identifying a row for [`select_by_key`]
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValues {
    /// Value of the single key column
    Single(DatabaseValue),
    /// Key values by property or column name, for composite keys
    Named(NamedParams),
}

/// Anything usable as a row identifier
pub trait IntoKey {
    fn into_key(self) -> KeyValues;
}

impl IntoKey for KeyValues {
    fn into_key(self) -> KeyValues {
        self
    }
}

impl IntoKey for NamedParams {
    fn into_key(self) -> KeyValues {
        KeyValues::Named(self)
    }
}

impl IntoKey for &NamedParams {
    fn into_key(self) -> KeyValues {
        KeyValues::Named(self.clone())
    }
}

macro_rules! scalar_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoKey for $ty {
                fn into_key(self) -> KeyValues {
                    KeyValues::Single(self.into())
                }
            }
        )*
    };
}

scalar_key!(i16, i32, i64, u32, String, &str, DatabaseValue);

/// Numbered placeholder builder shared by the statement builders
#[derive(Debug, Default)]
struct Placeholders {
    params: Vec<DatabaseValue>,
}

impl Placeholders {
    fn bind(&mut self, value: DatabaseValue) -> String {
        let placeholder = format!("@{}", self.params.len());
        self.params.push(value);
        placeholder
    }
}

/// INSERT statement builder
#[derive(Debug, Clone)]
pub(crate) struct InsertBuilder {
    table: String,
    columns: Vec<String>,
    values: Vec<DatabaseValue>,
}

impl InsertBuilder {
    pub(crate) fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Add a column-value pair
    #[must_use]
    pub(crate) fn value(mut self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.columns.push(column.to_string());
        self.values.push(value.into());
        self
    }

    pub(crate) fn build(self) -> Statement {
        if self.columns.is_empty() {
            return Statement {
                sql: format!("INSERT INTO {} DEFAULT VALUES", self.table),
                params: Vec::new(),
            };
        }

        let mut placeholders = Placeholders::default();
        let slots: Vec<String> = self
            .values
            .into_iter()
            .map(|value| placeholders.bind(value))
            .collect();

        Statement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table,
                self.columns.join(", "),
                slots.join(", ")
            ),
            params: placeholders.params,
        }
    }
}

/// UPDATE statement builder
#[derive(Debug, Clone)]
pub(crate) struct UpdateBuilder {
    table: String,
    set: Vec<(String, DatabaseValue)>,
    conditions: Vec<(String, DatabaseValue)>,
}

impl UpdateBuilder {
    pub(crate) fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            set: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// Set a column value
    #[must_use]
    pub(crate) fn set(mut self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.set.push((column.to_string(), value.into()));
        self
    }

    /// Add a WHERE column = value condition, joined with AND
    #[must_use]
    pub(crate) fn where_eq(mut self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.conditions.push((column.to_string(), value.into()));
        self
    }

    /// SET placeholders are numbered first, WHERE placeholders continue after them
    pub(crate) fn build(self) -> Statement {
        let mut placeholders = Placeholders::default();

        let set_clauses: Vec<String> = self
            .set
            .into_iter()
            .map(|(column, value)| format!("{} = {}", column, placeholders.bind(value)))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", self.table, set_clauses.join(", "));

        if !self.conditions.is_empty() {
            let conditions: Vec<String> = self
                .conditions
                .into_iter()
                .map(|(column, value)| format!("{} = {}", column, placeholders.bind(value)))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        Statement {
            sql,
            params: placeholders.params,
        }
    }
}

/// SELECT * statement builder
#[derive(Debug, Clone)]
pub(crate) struct SelectBuilder {
    table: String,
    conditions: Vec<(String, DatabaseValue)>,
}

impl SelectBuilder {
    pub(crate) fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: Vec::new(),
        }
    }

    /// Add a WHERE column = value condition, joined with AND
    #[must_use]
    pub(crate) fn where_eq(mut self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.conditions.push((column.to_string(), value.into()));
        self
    }

    pub(crate) fn build(self) -> Statement {
        let mut sql = format!("SELECT * FROM {}", self.table);
        let mut placeholders = Placeholders::default();

        if !self.conditions.is_empty() {
            let conditions: Vec<String> = self
                .conditions
                .into_iter()
                .map(|(column, value)| format!("{} = {}", column, placeholders.bind(value)))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        Statement {
            sql,
            params: placeholders.params,
        }
    }
}

/// INSERT over every column except database-generated keys
pub fn insert_statement<T: Mapped>(mapping: &TypeMapping<T>, entity: &T) -> Statement {
    mapping
        .columns()
        .filter(|column| !(column.is_key() && column.is_generated()))
        .fold(InsertBuilder::new(mapping.table_name()), |builder, column| {
            builder.value(column.column_name(), column.get(entity))
        })
        .build()
}

/// UPDATE of every non-key column, filtered by all key columns.
///
/// Returns `Ok(None)` when the type has nothing but key columns.
pub fn update_statement<T: Mapped>(mapping: &TypeMapping<T>, entity: &T) -> Result<Option<Statement>> {
    require_keys(mapping)?;

    let mut builder = UpdateBuilder::new(mapping.table_name());
    let mut assignments = 0;
    for column in mapping.columns().filter(|column| !column.is_key()) {
        builder = builder.set(column.column_name(), column.get(entity));
        assignments += 1;
    }
    if assignments == 0 {
        return Ok(None);
    }

    for key in mapping.key_columns() {
        builder = builder.where_eq(key.column_name(), key.get(entity));
    }
    Ok(Some(builder.build()))
}

/// `SELECT * FROM <table>`
pub fn select_all<T: Mapped>(mapping: &TypeMapping<T>) -> Statement {
    SelectBuilder::new(mapping.table_name()).build()
}

/// SELECT filtered by key value(s).
///
/// A single value needs a single-column key. A named bag is matched against
/// property names first, then case-insensitively against column names, and its
/// entries are bound in bag order.
pub fn select_by_key<T: Mapped>(mapping: &TypeMapping<T>, key: KeyValues) -> Result<Statement> {
    require_keys(mapping)?;

    let mut builder = SelectBuilder::new(mapping.table_name());
    match key {
        KeyValues::Single(value) => {
            let mut keys = mapping.key_columns();
            match (keys.next(), keys.next()) {
                (Some(key), None) => builder = builder.where_eq(key.column_name(), value),
                _ => {
                    return Err(DatabaseError::unsupported(format!(
                        "type '{}' has a composite key; pass named key values",
                        type_name::<T>()
                    )))
                }
            }
        }
        KeyValues::Named(values) => {
            for (name, value) in values.iter() {
                let column = mapping
                    .column_for_property(name)
                    .or_else(|| mapping.column(name))
                    .ok_or_else(|| DatabaseError::ColumnNotFound(name.to_string()))?;
                builder = builder.where_eq(column.column_name(), value.clone());
            }
        }
    }
    Ok(builder.build())
}

fn require_keys<T: Mapped>(mapping: &TypeMapping<T>) -> Result<()> {
    if mapping.key_columns().next().is_none() {
        return Err(DatabaseError::NoKeyColumns(type_name::<T>()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mapping::{mapping, TypeDescriptor};
    use crate::named_params;

    #[derive(Default)]
    struct User {
        id: i64,
        name: Option<String>,
    }

    impl Mapped for User {
        fn describe(t: &mut TypeDescriptor<Self>) {
            t.table("Users").constructor(User::default);
            t.property("Id", |u| &u.id, |u| &mut u.id).key();
            t.property("OtherName", |u| &u.name, |u| &mut u.name)
                .column("Name");
        }
    }

    #[derive(Default)]
    struct CompositeKeyUser {
        id: i32,
        id2: String,
        name: String,
    }

    impl Mapped for CompositeKeyUser {
        fn describe(t: &mut TypeDescriptor<Self>) {
            t.constructor(CompositeKeyUser::default);
            t.property("Id", |u| &u.id, |u| &mut u.id).key().generated(false);
            t.property("Id2", |u| &u.id2, |u| &mut u.id2).key().generated(false);
            t.property("Name", |u| &u.name, |u| &mut u.name);
        }
    }

    #[derive(Default)]
    struct AuditLog {
        message: String,
    }

    impl Mapped for AuditLog {
        fn describe(t: &mut TypeDescriptor<Self>) {
            t.constructor(AuditLog::default);
            t.property("Message", |l| &l.message, |l| &mut l.message);
        }
    }

    #[derive(Default)]
    struct Counter {
        id: i64,
    }

    impl Mapped for Counter {
        fn describe(t: &mut TypeDescriptor<Self>) {
            t.constructor(Counter::default);
            t.property("Id", |c| &c.id, |c| &mut c.id).key();
        }
    }

    fn user() -> User {
        User {
            id: 7,
            name: Some("Foo".into()),
        }
    }

    #[test]
    fn test_insert_skips_generated_key() {
        let statement = insert_statement(&mapping::<User>(), &user());
        assert_eq!(statement.sql, "INSERT INTO Users (Name) VALUES (@0)");
        assert_eq!(statement.params, vec![DatabaseValue::String("Foo".into())]);
    }

    #[test]
    fn test_insert_keeps_manual_keys() {
        let entity = CompositeKeyUser {
            id: 1,
            id2: "foo".into(),
            name: "Jeremy".into(),
        };
        let statement = insert_statement(&mapping::<CompositeKeyUser>(), &entity);
        assert_eq!(
            statement.sql,
            "INSERT INTO CompositeKeyUser (Id, Id2, Name) VALUES (@0, @1, @2)"
        );
        assert_eq!(statement.params.len(), 3);
    }

    #[test]
    fn test_insert_with_only_generated_key() {
        let statement = insert_statement(&mapping::<Counter>(), &Counter::default());
        assert_eq!(statement.sql, "INSERT INTO Counter DEFAULT VALUES");
        assert!(statement.params.is_empty());
    }

    #[test]
    fn test_update_numbers_set_then_where() {
        let entity = CompositeKeyUser {
            id: 1,
            id2: "foo".into(),
            name: "Bar".into(),
        };
        let statement = update_statement(&mapping::<CompositeKeyUser>(), &entity)
            .unwrap()
            .unwrap();
        assert_eq!(
            statement.sql,
            "UPDATE CompositeKeyUser SET Name = @0 WHERE Id = @1 AND Id2 = @2"
        );
        assert_eq!(
            statement.params,
            vec![
                DatabaseValue::String("Bar".into()),
                DatabaseValue::Int(1),
                DatabaseValue::String("foo".into()),
            ]
        );
    }

    #[test]
    fn test_update_without_keys_fails() {
        let err = update_statement(&mapping::<AuditLog>(), &AuditLog::default()).unwrap_err();
        assert!(matches!(err, DatabaseError::NoKeyColumns(_)));
    }

    #[test]
    fn test_update_with_only_keys_is_noop() {
        let statement = update_statement(&mapping::<Counter>(), &Counter::default()).unwrap();
        assert!(statement.is_none());
    }

    #[test]
    fn test_select_all() {
        assert_eq!(select_all(&mapping::<User>()).sql, "SELECT * FROM Users");
    }

    #[test]
    fn test_select_by_single_key() {
        let statement = select_by_key(&mapping::<User>(), 5i64.into_key()).unwrap();
        assert_eq!(statement.sql, "SELECT * FROM Users WHERE Id = @0");
        assert_eq!(statement.params, vec![DatabaseValue::Long(5)]);
    }

    #[test]
    fn test_select_by_composite_key() {
        let key = named_params! { "Id" => 1, "Id2" => "foo" };
        let statement = select_by_key(&mapping::<CompositeKeyUser>(), key.into_key()).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM CompositeKeyUser WHERE Id = @0 AND Id2 = @1"
        );
    }

    #[test]
    fn test_select_by_key_resolves_aliases() {
        let key = named_params! { "OtherName" => "Foo" };
        let statement = select_by_key(&mapping::<User>(), key.into_key()).unwrap();
        assert_eq!(statement.sql, "SELECT * FROM Users WHERE Name = @0");

        let key = named_params! { "nope" => 1 };
        let err = select_by_key(&mapping::<User>(), key.into_key()).unwrap_err();
        assert!(matches!(err, DatabaseError::ColumnNotFound(ref name) if name == "nope"));
    }

    #[test]
    fn test_scalar_key_for_composite_type_fails() {
        let err = select_by_key(&mapping::<CompositeKeyUser>(), 1i32.into_key()).unwrap_err();
        assert!(matches!(err, DatabaseError::UnsupportedOperation(_)));
    }
}
