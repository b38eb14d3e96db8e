//! Type-to-row mapping
//!
//! A mapped type describes its properties once through [`Mapped::describe`]. The
//! first call to [`mapping`] for that type turns the description into an
//! immutable [`TypeMapping`] (table name, case-insensitive column lookup, key
//! columns, constructor and bound accessors) which is then cached for the rest of
//! the process.
//!
//! ```
//! use rust_micro_orm::core::mapping::{mapping, Mapped, TypeDescriptor};
//!
//! #[derive(Default)]
//! struct User {
//!     id: i64,
//!     name: Option<String>,
//! }
//!
//! impl Mapped for User {
//!     fn describe(t: &mut TypeDescriptor<Self>) {
//!         t.table("Users").constructor(User::default);
//!         t.property("Id", |u| &u.id, |u| &mut u.id).key();
//!         t.property("Name", |u| &u.name, |u| &mut u.name);
//!     }
//! }
//!
//! let users = mapping::<User>();
//! assert_eq!(users.table_name(), "Users");
//! assert!(users.has_generated_key());
//! ```

use super::database::DataRecord;
use super::error::{MappingError, Result};
use super::value::{ConversionError, DatabaseValue, FromValue};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, OnceLock};

type Getter<T> = Box<dyn Fn(&T) -> DatabaseValue + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, DatabaseValue) -> std::result::Result<(), ConversionError> + Send + Sync>;

/// A type whose instances can be read from and written to table rows
pub trait Mapped: Sized + 'static {
    /// Declare the table, constructor and properties of the type
    fn describe(t: &mut TypeDescriptor<Self>);
}

/// Declarations collected from [`Mapped::describe`]
pub struct TypeDescriptor<T> {
    table: Option<String>,
    factory: Option<fn() -> T>,
    properties: Vec<PropertyDescriptor<T>>,
}

impl<T: 'static> TypeDescriptor<T> {
    fn new() -> Self {
        Self {
            table: None,
            factory: None,
            properties: Vec::new(),
        }
    }

    /// Map the type onto `name` instead of the type's own name
    pub fn table(&mut self, name: impl Into<String>) -> &mut Self {
        self.table = Some(name.into());
        self
    }

    /// Zero-argument constructor used to create one instance per row
    pub fn constructor(&mut self, factory: fn() -> T) -> &mut Self {
        self.factory = Some(factory);
        self
    }

    /// Declare a readable and writable property backed by a field
    pub fn property<F, G, S>(&mut self, name: &str, get: G, get_mut: S) -> &mut PropertyDescriptor<T>
    where
        F: FromValue + Clone + Into<DatabaseValue> + 'static,
        G: Fn(&T) -> &F + Send + Sync + 'static,
        S: Fn(&mut T) -> &mut F + Send + Sync + 'static,
    {
        let getter: Getter<T> = Box::new(move |instance: &T| get(instance).clone().into());
        let setter: Setter<T> = Box::new(
            move |instance: &mut T, value: DatabaseValue| -> std::result::Result<(), ConversionError> {
                *get_mut(instance) = F::from_nullable(value)?;
                Ok(())
            },
        );
        self.push(name, getter, Some(setter))
    }

    /// Declare a property that can be read but never written back.
    ///
    /// Read-only properties take no part in mapping; they are accepted so a type
    /// can list its full shape without tripping over computed values.
    pub fn read_only<F, G>(&mut self, name: &str, get: G) -> &mut PropertyDescriptor<T>
    where
        F: Clone + Into<DatabaseValue> + 'static,
        G: Fn(&T) -> F + Send + Sync + 'static,
    {
        let getter: Getter<T> = Box::new(move |instance: &T| get(instance).into());
        self.push(name, getter, None)
    }

    fn push(&mut self, name: &str, getter: Getter<T>, setter: Option<Setter<T>>) -> &mut PropertyDescriptor<T> {
        self.properties.push(PropertyDescriptor {
            name: name.to_string(),
            column: None,
            key: None,
            not_mapped: false,
            getter,
            setter,
        });
        let last = self.properties.len() - 1;
        &mut self.properties[last]
    }
}

/// Declarations for a single property
pub struct PropertyDescriptor<T> {
    name: String,
    column: Option<String>,
    key: Option<bool>,
    not_mapped: bool,
    getter: Getter<T>,
    setter: Option<Setter<T>>,
}

impl<T> PropertyDescriptor<T> {
    /// Mark the property as (part of) the primary key; keys are database-generated
    /// unless [`generated`](Self::generated) says otherwise
    pub fn key(&mut self) -> &mut Self {
        self.key = Some(self.key.unwrap_or(true));
        self
    }

    /// Mark the property as a key and set whether its value is assigned by the
    /// database
    pub fn generated(&mut self, generated: bool) -> &mut Self {
        self.key = Some(generated);
        self
    }

    /// Map the property onto a differently named column
    pub fn column(&mut self, name: impl Into<String>) -> &mut Self {
        self.column = Some(name.into());
        self
    }

    /// Exclude the property from mapping
    pub fn not_mapped(&mut self) -> &mut Self {
        self.not_mapped = true;
        self
    }
}

/// How one property corresponds to one column
pub struct ColumnMapping<T> {
    property_name: String,
    column_name: String,
    is_key: bool,
    is_generated: bool,
    getter: Getter<T>,
    setter: Setter<T>,
}

impl<T> ColumnMapping<T> {
    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn is_key(&self) -> bool {
        self.is_key
    }

    pub fn is_generated(&self) -> bool {
        self.is_generated
    }

    /// Read the property's current value
    pub fn get(&self, instance: &T) -> DatabaseValue {
        (self.getter)(instance)
    }

    /// Write `value` into the property; NULL writes the property's zero value
    pub fn set(&self, instance: &mut T, value: DatabaseValue) -> std::result::Result<(), ConversionError> {
        (self.setter)(instance, value)
    }
}

impl<T> std::fmt::Debug for ColumnMapping<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnMapping")
            .field("property_name", &self.property_name)
            .field("column_name", &self.column_name)
            .field("is_key", &self.is_key)
            .field("is_generated", &self.is_generated)
            .finish_non_exhaustive()
    }
}

/// Cached mapping metadata for a mapped type
pub struct TypeMapping<T> {
    table_name: String,
    columns: IndexMap<String, ColumnMapping<T>>,
    key_columns: Vec<usize>,
    has_generated_key: bool,
    factory: Option<fn() -> T>,
}

impl<T: Mapped> TypeMapping<T> {
    fn build() -> Self {
        let mut descriptor = TypeDescriptor::new();
        T::describe(&mut descriptor);

        let table_name = descriptor
            .table
            .unwrap_or_else(|| bare_type_name::<T>().to_string());

        let declares_key = descriptor.properties.iter().any(|p| p.key.is_some());
        let mut columns = IndexMap::new();

        for property in descriptor.properties {
            if property.not_mapped {
                continue;
            }
            let Some(setter) = property.setter else {
                continue;
            };

            // Types that declare no key fall back to an `Id` property.
            let key = match property.key {
                Some(generated) => Some(generated),
                None if !declares_key && property.name.eq_ignore_ascii_case("id") => Some(true),
                None => None,
            };
            let column_name = property.column.unwrap_or_else(|| property.name.clone());
            let lookup = column_name.to_lowercase();

            let column = ColumnMapping {
                property_name: property.name,
                column_name,
                is_key: key.is_some(),
                is_generated: key.unwrap_or(false),
                getter: property.getter,
                setter,
            };

            if let Some(previous) = columns.insert(lookup, column) {
                tracing::warn!(
                    type_name = type_name::<T>(),
                    column = previous.column_name(),
                    "duplicate column declaration, keeping the later property"
                );
            }
        }

        let key_columns: Vec<usize> = columns
            .values()
            .enumerate()
            .filter(|(_, column)| column.is_key)
            .map(|(index, _)| index)
            .collect();
        let has_generated_key = key_columns.iter().any(|&index| columns[index].is_generated);

        tracing::trace!(
            type_name = type_name::<T>(),
            table = %table_name,
            columns = columns.len(),
            keys = key_columns.len(),
            "built type mapping"
        );

        Self {
            table_name,
            columns,
            key_columns,
            has_generated_key,
            factory: descriptor.factory,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Mapped columns in declaration order
    pub fn columns(&self) -> impl Iterator<Item = &ColumnMapping<T>> {
        self.columns.values()
    }

    /// Case-insensitive column lookup
    pub fn column(&self, name: &str) -> Option<&ColumnMapping<T>> {
        self.columns.get(&name.to_lowercase())
    }

    /// Column mapped from the property called `name`
    pub fn column_for_property(&self, name: &str) -> Option<&ColumnMapping<T>> {
        self.columns().find(|c| c.property_name == name)
    }

    /// Key columns in declaration order
    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnMapping<T>> {
        self.key_columns.iter().map(|&index| &self.columns[index])
    }

    pub fn has_composite_key(&self) -> bool {
        self.key_columns.len() > 1
    }

    pub fn has_generated_key(&self) -> bool {
        self.has_generated_key
    }

    /// Create a fresh instance through the declared constructor
    pub fn instantiate(&self) -> std::result::Result<T, MappingError> {
        match self.factory {
            Some(factory) => Ok(factory()),
            None => Err(MappingError::no_parameterless_constructor(type_name::<T>())),
        }
    }

    /// Materialize one row. `columns` holds the result set's column names in
    /// ordinal order; columns without a matching property are skipped.
    pub fn map(&self, record: &dyn DataRecord, columns: &[String]) -> Result<T> {
        let mut instance = self.instantiate()?;

        for (ordinal, name) in columns.iter().enumerate() {
            let Some(column) = self.column(name) else {
                continue;
            };
            let value = record.value(ordinal)?;
            column
                .set(&mut instance, value)
                .map_err(|source| MappingError::invalid_cast(name.as_str(), source))?;
        }

        Ok(instance)
    }
}

impl<T> std::fmt::Debug for TypeMapping<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMapping")
            .field("table_name", &self.table_name)
            .field("columns", &self.columns.values().collect::<Vec<_>>())
            .field("has_generated_key", &self.has_generated_key)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

/// `a::b::User<c::D>` -> `User`
fn bare_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

type MappingCell<T> = OnceLock<Arc<TypeMapping<T>>>;

static REGISTRY: LazyLock<RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn cell<T: Mapped>() -> Arc<MappingCell<T>> {
    let id = TypeId::of::<T>();

    let existing = REGISTRY.read().get(&id).cloned();
    let entry = match existing {
        Some(entry) => entry,
        None => Arc::clone(
            REGISTRY
                .write()
                .entry(id)
                .or_insert_with(|| Arc::new(MappingCell::<T>::new()) as Arc<dyn Any + Send + Sync>),
        ),
    };

    match entry.downcast::<MappingCell<T>>() {
        Ok(cell) => cell,
        Err(_) => unreachable!("mapping registry entries are keyed by their own TypeId"),
    }
}

/// Get the cached mapping for `T`, building it on first use.
///
/// Concurrent first calls for the same type build the mapping exactly once; every
/// caller observes the same instance.
pub fn mapping<T: Mapped>() -> Arc<TypeMapping<T>> {
    let cell = cell::<T>();
    Arc::clone(cell.get_or_init(|| Arc::new(TypeMapping::build())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[derive(Debug, Default, Clone)]
    struct User {
        id: i64,
        name: Option<String>,
    }

    impl Mapped for User {
        fn describe(t: &mut TypeDescriptor<Self>) {
            t.table("Users").constructor(User::default);
            t.property("Id", |u| &u.id, |u| &mut u.id).key();
            t.property("Name", |u| &u.name, |u| &mut u.name);
        }
    }

    #[derive(Default)]
    struct Invoice {
        number: i32,
        series: String,
        total: f64,
        cached: String,
        label: String,
    }

    impl Mapped for Invoice {
        fn describe(t: &mut TypeDescriptor<Self>) {
            t.constructor(Invoice::default);
            t.property("Number", |i| &i.number, |i| &mut i.number)
                .key()
                .generated(false);
            t.property("Series", |i| &i.series, |i| &mut i.series)
                .key()
                .generated(false);
            t.property("Total", |i| &i.total, |i| &mut i.total)
                .column("amount_total");
            t.property("Cached", |i| &i.cached, |i| &mut i.cached)
                .not_mapped();
            t.read_only("Label", |i: &Invoice| i.label.clone());
        }
    }

    struct NoConstructor {
        id: i32,
    }

    impl Mapped for NoConstructor {
        fn describe(t: &mut TypeDescriptor<Self>) {
            t.property("Id", |n| &n.id, |n| &mut n.id);
        }
    }

    #[derive(Default)]
    struct ImplicitId {
        id: i32,
        other_id: i32,
    }

    impl Mapped for ImplicitId {
        fn describe(t: &mut TypeDescriptor<Self>) {
            t.constructor(ImplicitId::default);
            t.property("Id", |u| &u.id, |u| &mut u.id);
            t.property("OtherId", |u| &u.other_id, |u| &mut u.other_id);
        }
    }

    #[derive(Default)]
    struct Renamed {
        a: String,
        b: String,
        id: i32,
    }

    impl Mapped for Renamed {
        fn describe(t: &mut TypeDescriptor<Self>) {
            t.constructor(Renamed::default);
            t.property("A", |r| &r.a, |r| &mut r.a).column("Name");
            t.property("Id", |r| &r.id, |r| &mut r.id);
            t.property("B", |r| &r.b, |r| &mut r.b).column("name");
        }
    }

    struct Cells(Vec<DatabaseValue>);

    impl DataRecord for Cells {
        fn field_count(&self) -> usize {
            self.0.len()
        }

        fn name(&self, _ordinal: usize) -> Result<&str> {
            Ok("")
        }

        fn value(&self, ordinal: usize) -> Result<DatabaseValue> {
            Ok(self.0[ordinal].clone())
        }
    }

    #[test]
    fn test_mapping_is_cached() {
        let first = mapping::<User>();
        let second = mapping::<User>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.table_name(), "Users");
    }

    #[test]
    fn test_concurrent_first_access_builds_once() {
        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(mapping::<ImplicitId>))
            .collect();
        let mappings: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .collect();
        assert!(mappings.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_default_table_name_is_bare_type_name() {
        assert_eq!(mapping::<Invoice>().table_name(), "Invoice");
    }

    #[test]
    fn test_column_resolution() {
        let invoice = mapping::<Invoice>();
        let names: Vec<_> = invoice.columns().map(|c| c.column_name()).collect();
        assert_eq!(names, ["Number", "Series", "amount_total"]);

        assert!(invoice.column("AMOUNT_TOTAL").is_some());
        assert!(invoice.column("Total").is_none());
        assert!(invoice.column("Cached").is_none());
        assert!(invoice.column("Label").is_none());
        assert_eq!(
            invoice.column_for_property("Total").map(|c| c.column_name()),
            Some("amount_total")
        );
    }

    #[test]
    fn test_key_flags() {
        let invoice = mapping::<Invoice>();
        assert!(invoice.has_composite_key());
        assert!(!invoice.has_generated_key());
        assert!(invoice.key_columns().all(|c| c.is_key() && !c.is_generated()));

        let user = mapping::<User>();
        let keys: Vec<_> = user.key_columns().collect();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].is_generated());
    }

    #[test]
    fn test_implicit_id_key() {
        let implicit = mapping::<ImplicitId>();
        let keys: Vec<_> = implicit.key_columns().map(|c| c.property_name()).collect();
        assert_eq!(keys, ["Id"]);
        assert!(implicit.has_generated_key());
    }

    #[test]
    fn test_missing_constructor_is_deferred() {
        let mapped = mapping::<NoConstructor>();
        assert_eq!(mapped.columns().count(), 1);

        let err = mapped.instantiate().err().expect("instantiation should fail");
        let message = err.to_string();
        assert!(message.contains(type_name::<NoConstructor>()));
        assert!(message.starts_with("Could not find a parameterless constructor on the type '"));
    }

    #[test]
    fn test_accessors() {
        let user_mapping = mapping::<User>();
        let mut user = User::default();
        let name = user_mapping.column("name").expect("name column");

        name.set(&mut user, DatabaseValue::String("Foo".into())).unwrap();
        assert_eq!(name.get(&user), DatabaseValue::String("Foo".into()));

        name.set(&mut user, DatabaseValue::Null).unwrap();
        assert_eq!(user.name, None);

        let id = user_mapping.column("ID").expect("id column");
        assert!(id.set(&mut user, DatabaseValue::String("x".into())).is_err());
    }

    #[test]
    fn test_later_duplicate_column_replaces_earlier() {
        let renamed = mapping::<Renamed>();
        let properties: Vec<_> = renamed.columns().map(|c| c.property_name()).collect();
        assert_eq!(properties, ["B", "Id"]);
        assert_eq!(renamed.column("NAME").map(|c| c.property_name()), Some("B"));

        let columns = vec!["Name".to_string(), "Id".to_string()];
        let row = Cells(vec![DatabaseValue::String("Foo".into()), DatabaseValue::Long(3)]);
        let instance = renamed.map(&row, &columns).unwrap();
        assert_eq!(instance.a, "");
        assert_eq!(instance.b, "Foo");
        assert_eq!(instance.id, 3);
    }
}
