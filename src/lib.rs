//! # Rust Micro ORM
//!
//! A small object-relational mapping helper that attaches query and CRUD
//! conveniences to an existing database connection. It executes parameterized SQL,
//! maps result rows onto plain structs and performs insert/update/find operations
//! keyed by declared primary keys.
//!
//! ## Features
//!
//! - **Explicit mapping**: types describe their table, columns and keys once through
//!   [`Mapped`]; the resulting metadata is built on first use and cached for the
//!   life of the process
//! - **Case-insensitive columns**: result columns match properties regardless of
//!   case; columns with no matching property are ignored
//! - **Strict conversions**: a value that does not fit its property is an error
//!   naming the column, and NULL becomes the property's zero value
//! - **Composite keys**: `find_by_id` accepts a scalar or a [`NamedParams`] bag
//! - **Thread Safety**: mapping construction happens exactly once per type, even
//!   under concurrent first access
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_micro_orm::prelude::*;
//!
//! #[derive(Debug, Default)]
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
//! fn main() -> Result<()> {
//!     let conn = Connection::open_in_memory()?;
//!     conn.execute(
//!         "CREATE TABLE Users (Id INTEGER PRIMARY KEY AUTOINCREMENT, Name TEXT)",
//!         (),
//!     )?;
//!
//!     let mut user = User { id: 0, name: Some("Foo".into()) };
//!     conn.insert(&mut user)?;
//!     assert_eq!(user.id, 1);
//!
//!     user.name = Some("Bar".into());
//!     conn.update(&user)?;
//!
//!     let found = conn.find_by_id::<User, _>(1i64)?;
//!     assert_eq!(found.and_then(|u| u.name).as_deref(), Some("Bar"));
//!
//!     let names: Vec<String> = conn.query("SELECT Name FROM Users WHERE Id = @0", params![1])?;
//!     assert_eq!(names, ["Bar"]);
//!     Ok(())
//! }
//! ```
//!
//! ### Working with Transactions
//!
//! A `rusqlite::Transaction` is itself a [`DbConnection`], so every operation can
//! run inside it:
//!
//! ```rust
//! use rust_micro_orm::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut conn = Connection::open_in_memory()?;
//!     conn.execute_batch("CREATE TABLE accounts (id INTEGER PRIMARY KEY, balance REAL)")?;
//!
//!     let tx = conn.transaction()?;
//!     tx.execute("INSERT INTO accounts (balance) VALUES (@0)", params![100.0])?;
//!     tx.commit()?;
//!
//!     assert_eq!(conn.scalar::<i64, _>("SELECT COUNT(*) FROM accounts", ())?, 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! rust_micro_orm/
//! ├── src/
//! │   ├── core/                  # Mapper, value model and operations
//! │   │   ├── config.rs          # Named connection strings
//! │   │   ├── connection.rs      # Owned connection façade
//! │   │   ├── database.rs        # Driver boundary traits, parameters
//! │   │   ├── database_types.rs  # Provider names
//! │   │   ├── error.rs           # Error types
//! │   │   ├── extensions.rs      # Query and CRUD operations
//! │   │   ├── mapping.rs         # Type mapping registry
//! │   │   ├── row.rs             # Row materialization targets
//! │   │   ├── sql.rs             # INSERT/UPDATE/SELECT generation
//! │   │   └── value.rs           # Value types and conversions
//! │   ├── backends/
//! │   │   └── sqlite.rs          # rusqlite binding
//! │   └── lib.rs
//! ├── demos/                     # Example programs
//! ├── tests/                     # Integration tests
//! └── benches/                   # Criterion benchmarks
//! ```

/// Core mapping types and traits
pub mod core;

/// Driver bindings
pub mod backends;

/// Prelude for convenient imports
///
/// ```rust
/// use rust_micro_orm::prelude::*;
///
/// fn main() -> Result<()> {
///     let conn = Connection::open_in_memory()?;
///     assert_eq!(conn.scalar::<i32, _>("SELECT 40 + 2", ())?, 42);
///     Ok(())
/// }
/// ```
pub mod prelude {
    pub use crate::core::{
        mapping, ConnectionStringSettings, ConnectionStrings, DatabaseError, DatabaseType,
        DatabaseValue, DbConnection, DbConnectionExt, FromRow, FromValue, IntoKey, Mapped,
        MappingError, NamedParams, Result, TypeDescriptor,
    };
    pub use crate::{named_params, params};

    #[cfg(feature = "sqlite")]
    pub use crate::core::Connection;
}

// Re-export at root level for convenience
pub use crate::core::{
    mapping, ConnectionStrings, DatabaseError, DatabaseType, DatabaseValue, DbConnection,
    DbConnectionExt, Mapped, MappingError, NamedParams, Result, TypeDescriptor,
};

#[cfg(feature = "sqlite")]
pub use crate::core::Connection;
