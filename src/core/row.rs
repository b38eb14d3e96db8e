//! Row materialization targets
//!
//! Queries are generic over [`FromRow`]. Mapped types go through their cached
//! [`TypeMapping`]; plain scalars read the first column of each row.

use super::database::DataRecord;
use super::error::Result;
use super::mapping::{mapping, Mapped, TypeMapping};
use super::value::{DatabaseValue, FromValue};
use chrono::{DateTime, Utc};
use std::marker::PhantomData;
use std::sync::Arc;

/// Per-query state that turns rows into values
pub trait RowMapper<T> {
    /// Map one row; `columns` are the result set's column names in ordinal order
    fn map_row(&self, record: &dyn DataRecord, columns: &[String]) -> Result<T>;
}

/// A type that rows can be materialized into
pub trait FromRow: Sized {
    type Mapper: RowMapper<Self>;

    /// Build the mapper once, before the first row is read
    fn row_mapper() -> Self::Mapper;
}

impl<T: Mapped> RowMapper<T> for Arc<TypeMapping<T>> {
    fn map_row(&self, record: &dyn DataRecord, columns: &[String]) -> Result<T> {
        self.map(record, columns)
    }
}

impl<T: Mapped> FromRow for T {
    type Mapper = Arc<TypeMapping<T>>;

    fn row_mapper() -> Self::Mapper {
        mapping::<T>()
    }
}

/// Reads the first column of each row
pub struct ScalarMapper<T>(PhantomData<fn() -> T>);

impl<T> Default for ScalarMapper<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: FromValue> RowMapper<T> for ScalarMapper<T> {
    fn map_row(&self, record: &dyn DataRecord, _columns: &[String]) -> Result<T> {
        if record.field_count() == 0 {
            return Ok(T::null());
        }
        Ok(T::from_nullable(record.value(0)?)?)
    }
}

macro_rules! scalar_from_row {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromRow for $ty {
                type Mapper = ScalarMapper<$ty>;

                fn row_mapper() -> Self::Mapper {
                    ScalarMapper::default()
                }
            }

            impl FromRow for Option<$ty> {
                type Mapper = ScalarMapper<Option<$ty>>;

                fn row_mapper() -> Self::Mapper {
                    ScalarMapper::default()
                }
            }
        )*
    };
}

scalar_from_row!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    String,
    Vec<u8>,
    DateTime<Utc>,
);

impl FromRow for DatabaseValue {
    type Mapper = ScalarMapper<DatabaseValue>;

    fn row_mapper() -> Self::Mapper {
        ScalarMapper::default()
    }
}
