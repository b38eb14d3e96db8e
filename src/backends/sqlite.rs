//! SQLite driver binding
//!
//! Implements [`DbConnection`] for `rusqlite::Connection` (and therefore for an
//! open `rusqlite::Transaction`) and [`DataRecord`] for `rusqlite::Row`.

use crate::core::database::{Command, DataRecord, DbConnection, Parameter};
use crate::core::error::{DatabaseError, Result};
use crate::core::value::DatabaseValue;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, Row, Statement, Transaction};

impl ToSql for DatabaseValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            DatabaseValue::Null => ToSqlOutput::Owned(Value::Null),
            DatabaseValue::Bool(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            DatabaseValue::Int(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            DatabaseValue::Long(v) | DatabaseValue::Timestamp(v) => {
                ToSqlOutput::Owned(Value::Integer(*v))
            }
            DatabaseValue::Float(v) => ToSqlOutput::Owned(Value::Real(f64::from(*v))),
            DatabaseValue::Double(v) => ToSqlOutput::Owned(Value::Real(*v)),
            DatabaseValue::String(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            DatabaseValue::Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v.as_slice())),
        })
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Result<DatabaseValue> {
    Ok(match value {
        ValueRef::Null => DatabaseValue::Null,
        ValueRef::Integer(v) => DatabaseValue::Long(v),
        ValueRef::Real(v) => DatabaseValue::Double(v),
        ValueRef::Text(v) => {
            let text = std::str::from_utf8(v).map_err(rusqlite::Error::Utf8Error)?;
            DatabaseValue::String(text.to_string())
        }
        ValueRef::Blob(v) => DatabaseValue::Bytes(v.to_vec()),
    })
}

impl DataRecord for Row<'_> {
    fn field_count(&self) -> usize {
        self.as_ref().column_count()
    }

    fn name(&self, ordinal: usize) -> Result<&str> {
        Ok(self.as_ref().column_name(ordinal)?)
    }

    fn value(&self, ordinal: usize) -> Result<DatabaseValue> {
        from_value_ref(self.get_ref(ordinal)?)
    }
}

/// Bind every placeholder in `statement`.
///
/// Named placeholders (`@Name`, `:Name`, `$Name`) match parameter names without
/// regard to case; anonymous `?` placeholders bind by ordinal. Parameters the SQL
/// never mentions are skipped, so a whole object can be passed as the parameter
/// source. A placeholder left without a value is an error.
fn bind(statement: &mut Statement<'_>, parameters: &[Parameter]) -> Result<()> {
    for index in 1..=statement.parameter_count() {
        let parameter = match statement.parameter_name(index) {
            Some(placeholder) => find_named(parameters, placeholder)
                .ok_or_else(|| DatabaseError::UnboundParameter(placeholder.to_string()))?,
            None => parameters
                .iter()
                .find(|p| p.ordinal == Some(index - 1))
                .ok_or_else(|| DatabaseError::UnboundParameter(format!("?{}", index)))?,
        };
        statement.raw_bind_parameter(index, &parameter.value)?;
    }
    Ok(())
}

fn find_named<'p>(parameters: &'p [Parameter], placeholder: &str) -> Option<&'p Parameter> {
    // `?NNN` is one-based
    if let Some(number) = placeholder.strip_prefix('?') {
        let ordinal = number.parse::<usize>().ok()?.checked_sub(1)?;
        return parameters.iter().find(|p| p.ordinal == Some(ordinal));
    }

    let wanted = bare_name(placeholder);
    parameters
        .iter()
        .find(|p| bare_name(&p.name) == wanted)
        .or_else(|| {
            parameters
                .iter()
                .find(|p| bare_name(&p.name).eq_ignore_ascii_case(wanted))
        })
}

fn bare_name(name: &str) -> &str {
    name.strip_prefix(['@', ':', '$']).unwrap_or(name)
}

fn prepare<'c>(connection: &'c Connection, command: &Command) -> Result<Statement<'c>> {
    tracing::debug!(
        sql = %command.text,
        params = command.parameters.len(),
        "executing sqlite command"
    );
    let mut statement = connection.prepare(&command.text)?;
    bind(&mut statement, &command.parameters)?;
    Ok(statement)
}

impl DbConnection for Connection {
    fn execute_non_query(&self, command: &Command) -> Result<u64> {
        let mut statement = prepare(self, command)?;
        let affected = statement.raw_execute()?;
        Ok(affected as u64)
    }

    fn execute_scalar(&self, command: &Command) -> Result<DatabaseValue> {
        let mut statement = prepare(self, command)?;
        let mut rows = statement.raw_query();
        let value = match rows.next()? {
            Some(row) if row.field_count() > 0 => row.value(0)?,
            _ => DatabaseValue::Null,
        };
        Ok(value)
    }

    fn execute_reader(
        &self,
        command: &Command,
        on_row: &mut dyn FnMut(&dyn DataRecord) -> Result<()>,
    ) -> Result<()> {
        let mut statement = prepare(self, command)?;
        let mut rows = statement.raw_query();
        while let Some(row) = rows.next()? {
            on_row(row)?;
        }
        Ok(())
    }
}

impl DbConnection for Transaction<'_> {
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
