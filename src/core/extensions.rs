//! Query and CRUD operations available on every [`DbConnection`]
//!
//! Call through the trait when using a raw `rusqlite::Connection`, whose inherent
//! `execute` takes precedence over [`DbConnectionExt::execute`]:
//!
//! ```
//! use rust_micro_orm::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let conn = rusqlite::Connection::open_in_memory()?;
//! DbConnectionExt::execute(&conn, "CREATE TABLE t (n INTEGER)", ())?;
//! DbConnectionExt::execute(&conn, "INSERT INTO t (n) VALUES (@0)", params![7])?;
//! assert_eq!(conn.scalar::<i32, _>("SELECT n FROM t", ())?, 7);
//! # Ok(())
//! # }
//! ```

use super::database::{column_names, Command, DataRecord, DbConnection, IntoParameters};
use super::error::{DatabaseError, MappingError, Result};
use super::mapping::{mapping, ColumnMapping, Mapped};
use super::row::{FromRow, RowMapper};
use super::sql::{self, IntoKey, Statement};
use super::value::{DatabaseValue, FromValue};

/// Query used to read back the key generated by the last insert
pub const LAST_INSERT_ID_SQL: &str = "SELECT last_insert_rowid()";

const INSERT_SAVEPOINT_SQL: &str = "SAVEPOINT micro_orm_insert";
const INSERT_RELEASE_SQL: &str = "RELEASE micro_orm_insert";
const INSERT_ROLLBACK_SQL: &str = "ROLLBACK TO micro_orm_insert";

/// Convenience operations layered over [`DbConnection`]
pub trait DbConnectionExt: DbConnection {
    /// Execute a command; returns the number of affected rows
    fn execute<P: IntoParameters>(&self, sql: &str, params: P) -> Result<u64> {
        self.execute_non_query(&Command::new(sql, params))
    }

    /// Run a query and materialize every row, in cursor order
    fn query<T: FromRow, P: IntoParameters>(&self, sql: &str, params: P) -> Result<Vec<T>> {
        materialize(self, &Command::new(sql, params))
    }

    /// Run a query that must return exactly one row
    fn query_single<T: FromRow, P: IntoParameters>(&self, sql: &str, params: P) -> Result<T> {
        single(self.query(sql, params)?)
    }

    /// Run a query that returns zero or one row
    fn query_single_or_default<T: FromRow, P: IntoParameters>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Option<T>> {
        single_or_default(self.query(sql, params)?)
    }

    /// First column of the first row; NULL or no row yields the zero value
    fn scalar<T: FromValue, P: IntoParameters>(&self, sql: &str, params: P) -> Result<T> {
        let value = self.execute_scalar(&Command::new(sql, params))?;
        Ok(T::from_nullable(value)?)
    }

    /// Key generated by the most recent insert on this connection
    fn last_insert_id(&self) -> Result<i64> {
        self.scalar(LAST_INSERT_ID_SQL, ())
    }

    /// Insert `entity`, writing a database-generated key back into it.
    ///
    /// With a generated key the insert runs inside a savepoint, so a key that
    /// cannot be written back leaves no row behind.
    fn insert<T: Mapped>(&self, entity: &mut T) -> Result<u64> {
        let mapping = mapping::<T>();
        let mut generated = mapping.key_columns().filter(|c| c.is_generated());
        let generated_key = generated.next();
        if generated.next().is_some() {
            return Err(DatabaseError::unsupported(format!(
                "'{}' declares more than one generated key",
                mapping.table_name()
            )));
        }

        tracing::debug!(table = mapping.table_name(), "inserting row");
        let statement = sql::insert_statement(&mapping, &*entity);
        let Some(key) = generated_key else {
            return run(self, statement);
        };

        self.execute(INSERT_SAVEPOINT_SQL, ())?;
        match insert_returning_key(self, statement, key, entity) {
            Ok(affected) => {
                self.execute(INSERT_RELEASE_SQL, ())?;
                Ok(affected)
            }
            Err(err) => {
                tracing::warn!(table = mapping.table_name(), error = %err, "insert rolled back");
                if let Err(rollback) = self
                    .execute(INSERT_ROLLBACK_SQL, ())
                    .and_then(|_| self.execute(INSERT_RELEASE_SQL, ()))
                {
                    tracing::warn!(error = %rollback, "failed to roll back insert savepoint");
                }
                Err(err)
            }
        }
    }

    /// Update the row identified by `entity`'s key columns
    fn update<T: Mapped>(&self, entity: &T) -> Result<u64> {
        let mapping = mapping::<T>();
        match sql::update_statement(&mapping, entity)? {
            Some(statement) => {
                tracing::debug!(table = mapping.table_name(), "updating row");
                run(self, statement)
            }
            None => {
                tracing::debug!(
                    table = mapping.table_name(),
                    "no non-key columns to update"
                );
                Ok(0)
            }
        }
    }

    /// Every row of `T`'s table
    fn find_all<T: Mapped>(&self) -> Result<Vec<T>> {
        let mapping = mapping::<T>();
        fetch(self, sql::select_all(&mapping))
    }

    /// Row whose key matches `key`: a scalar for single-key types, a
    /// [`NamedParams`](super::database::NamedParams) bag for composite keys
    fn find_by_id<T: Mapped, K: IntoKey>(&self, key: K) -> Result<Option<T>> {
        let mapping = mapping::<T>();
        let statement = sql::select_by_key(&mapping, key.into_key())?;
        single_or_default(fetch(self, statement)?)
    }
}

impl<C: DbConnection + ?Sized> DbConnectionExt for C {}

fn run<C: DbConnection + ?Sized>(connection: &C, statement: Statement) -> Result<u64> {
    connection.execute_non_query(&Command::new(statement.sql, statement.params))
}

fn insert_returning_key<C: DbConnection + ?Sized, T>(
    connection: &C,
    statement: Statement,
    key: &ColumnMapping<T>,
    entity: &mut T,
) -> Result<u64> {
    let affected = run(connection, statement)?;
    let id = connection.last_insert_id()?;
    key.set(entity, DatabaseValue::Long(id))
        .map_err(|source| MappingError::invalid_cast(key.column_name(), source))?;
    tracing::debug!(column = key.column_name(), id, "assigned generated key");
    Ok(affected)
}

fn fetch<C: DbConnection + ?Sized, T: FromRow>(connection: &C, statement: Statement) -> Result<Vec<T>> {
    materialize(connection, &Command::new(statement.sql, statement.params))
}

fn materialize<C: DbConnection + ?Sized, T: FromRow>(connection: &C, command: &Command) -> Result<Vec<T>> {
    let mapper = T::row_mapper();
    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    connection.execute_reader(command, &mut |record: &dyn DataRecord| -> Result<()> {
        if columns.is_none() {
            columns = Some(column_names(record)?);
        }
        let names = columns.as_deref().unwrap_or_default();
        rows.push(mapper.map_row(record, names)?);
        Ok(())
    })?;

    tracing::debug!(rows = rows.len(), "materialized query results");
    Ok(rows)
}

fn single<T>(rows: Vec<T>) -> Result<T> {
    let mut rows = rows.into_iter();
    match (rows.next(), rows.next()) {
        (Some(row), None) => Ok(row),
        (None, _) => Err(DatabaseError::NoElements),
        (Some(_), Some(_)) => Err(DatabaseError::MoreThanOneElement),
    }
}

fn single_or_default<T>(rows: Vec<T>) -> Result<Option<T>> {
    let mut rows = rows.into_iter();
    match (rows.next(), rows.next()) {
        (row, None) => Ok(row),
        (Some(_), Some(_)) | (None, Some(_)) => Err(DatabaseError::MoreThanOneElement),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records commands and replays canned rows
    #[derive(Default)]
    struct ScriptedConnection {
        commands: RefCell<Vec<Command>>,
        rows: Vec<Vec<(&'static str, DatabaseValue)>>,
        scalar: DatabaseValue,
    }

    struct Record<'a>(&'a [(&'static str, DatabaseValue)]);

    impl DataRecord for Record<'_> {
        fn field_count(&self) -> usize {
            self.0.len()
        }

        fn name(&self, ordinal: usize) -> Result<&str> {
            Ok(self.0[ordinal].0)
        }

        fn value(&self, ordinal: usize) -> Result<DatabaseValue> {
            Ok(self.0[ordinal].1.clone())
        }
    }

    impl DbConnection for ScriptedConnection {
        fn execute_non_query(&self, command: &Command) -> Result<u64> {
            self.commands.borrow_mut().push(command.clone());
            Ok(1)
        }

        fn execute_scalar(&self, command: &Command) -> Result<DatabaseValue> {
            self.commands.borrow_mut().push(command.clone());
            Ok(self.scalar.clone())
        }

        fn execute_reader(
            &self,
            command: &Command,
            on_row: &mut dyn FnMut(&dyn DataRecord) -> Result<()>,
        ) -> Result<()> {
            self.commands.borrow_mut().push(command.clone());
            for row in &self.rows {
                on_row(&Record(row))?;
            }
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct User {
        id: i64,
        name: Option<String>,
    }

    impl Mapped for User {
        fn describe(t: &mut crate::core::mapping::TypeDescriptor<Self>) {
            t.table("Users").constructor(User::default);
            t.property("Id", |u| &u.id, |u| &mut u.id).key();
            t.property("Name", |u| &u.name, |u| &mut u.name);
        }
    }

    #[derive(Default)]
    struct TwoGenerated {
        a: i64,
        b: i64,
    }

    impl Mapped for TwoGenerated {
        fn describe(t: &mut crate::core::mapping::TypeDescriptor<Self>) {
            t.constructor(TwoGenerated::default);
            t.property("A", |x| &x.a, |x| &mut x.a).key();
            t.property("B", |x| &x.b, |x| &mut x.b).key();
        }
    }

    fn user_row(id: i64, name: &'static str) -> Vec<(&'static str, DatabaseValue)> {
        vec![
            ("Id", DatabaseValue::Long(id)),
            ("Name", DatabaseValue::String(name.into())),
        ]
    }

    #[test]
    fn test_insert_assigns_generated_key() -> Result<()> {
        let conn = ScriptedConnection {
            scalar: DatabaseValue::Long(42),
            ..Default::default()
        };
        let mut user = User {
            id: 0,
            name: Some("Foo".into()),
        };
        conn.insert(&mut user)?;
        assert_eq!(user.id, 42);

        let texts: Vec<_> = conn.commands.borrow().iter().map(|c| c.text.clone()).collect();
        assert_eq!(
            texts,
            [
                INSERT_SAVEPOINT_SQL,
                "INSERT INTO Users (Name) VALUES (@0)",
                LAST_INSERT_ID_SQL,
                INSERT_RELEASE_SQL,
            ]
        );
        Ok(())
    }

    #[derive(Default)]
    struct SmallKey {
        id: i32,
        name: String,
    }

    impl Mapped for SmallKey {
        fn describe(t: &mut crate::core::mapping::TypeDescriptor<Self>) {
            t.table("Small").constructor(SmallKey::default);
            t.property("Id", |x| &x.id, |x| &mut x.id).key();
            t.property("Name", |x| &x.name, |x| &mut x.name);
        }
    }

    #[test]
    fn test_insert_rolls_back_when_key_does_not_fit() {
        let conn = ScriptedConnection {
            scalar: DatabaseValue::Long(i64::from(i32::MAX) + 1),
            ..Default::default()
        };
        let mut row = SmallKey::default();
        let err = conn.insert(&mut row).unwrap_err();
        assert!(err.as_mapping().is_some());
        assert_eq!(row.id, 0);

        let texts: Vec<_> = conn.commands.borrow().iter().map(|c| c.text.clone()).collect();
        assert_eq!(
            texts,
            [
                INSERT_SAVEPOINT_SQL,
                "INSERT INTO Small (Name) VALUES (@0)",
                LAST_INSERT_ID_SQL,
                INSERT_ROLLBACK_SQL,
                INSERT_RELEASE_SQL,
            ]
        );
    }

    #[test]
    fn test_insert_rejects_multiple_generated_keys() {
        let conn = ScriptedConnection::default();
        let err = conn.insert(&mut TwoGenerated::default()).unwrap_err();
        assert!(matches!(err, DatabaseError::UnsupportedOperation(_)));
        assert!(conn.commands.borrow().is_empty());
    }

    #[test]
    fn test_query_single_cardinality() {
        let conn = ScriptedConnection::default();
        assert!(matches!(
            conn.query_single::<User, _>("SELECT * FROM Users", ()),
            Err(DatabaseError::NoElements)
        ));
        assert!(conn
            .query_single_or_default::<User, _>("SELECT * FROM Users", ())
            .unwrap()
            .is_none());

        let conn = ScriptedConnection {
            rows: vec![user_row(1, "Foo"), user_row(2, "Bar")],
            ..Default::default()
        };
        assert!(matches!(
            conn.query_single::<User, _>("SELECT * FROM Users", ()),
            Err(DatabaseError::MoreThanOneElement)
        ));
        assert!(matches!(
            conn.query_single_or_default::<User, _>("SELECT * FROM Users", ()),
            Err(DatabaseError::MoreThanOneElement)
        ));
    }

    #[test]
    fn test_query_preserves_row_order() -> Result<()> {
        let conn = ScriptedConnection {
            rows: vec![user_row(2, "Bar"), user_row(1, "Foo")],
            ..Default::default()
        };
        let users: Vec<User> = conn.find_all()?;
        let ids: Vec<_> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids, [2, 1]);
        assert_eq!(conn.commands.borrow()[0].text, "SELECT * FROM Users");
        Ok(())
    }

    #[test]
    fn test_scalar_null_is_zero() -> Result<()> {
        let conn = ScriptedConnection::default();
        assert_eq!(conn.scalar::<i64, _>("SELECT MAX(Id) FROM Users", ())?, 0);
        assert_eq!(conn.scalar::<Option<String>, _>("SELECT NULL", ())?, None);
        Ok(())
    }

    #[test]
    fn test_find_by_id_binds_key() -> Result<()> {
        let conn = ScriptedConnection {
            rows: vec![user_row(7, "Foo")],
            ..Default::default()
        };
        let user = conn.find_by_id::<User, _>(7i64)?.expect("row");
        assert_eq!(user.name.as_deref(), Some("Foo"));

        let commands = conn.commands.borrow();
        assert_eq!(commands[0].text, "SELECT * FROM Users WHERE Id = @0");
        assert_eq!(commands[0].parameters[0].value, DatabaseValue::Long(7));
        Ok(())
    }
}
