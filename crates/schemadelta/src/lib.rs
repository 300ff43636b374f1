//! Live MySQL and MariaDB introspection for `schemadelta-core`.
//!
//! An [`Instance`] is a handle on one server. It keeps a pool per default
//! schema and session-variable set, detects the server [`Flavor`], and turns
//! schemas into detached [`Schema`] snapshots that the diff engine consumes.
//!
//! # Architecture
//!
//! - **Instance** - pools keyed by [`PoolKey`], schema listing, statement
//!   execution, parallel table drops with an optional emptiness check
//! - **Introspect** - `information_schema` queries plus parallel
//!   `SHOW CREATE TABLE`, reconciled per table
//! - **Fan-out** - bounded concurrency shared by introspection and drops
//!
//! # Example
//!
//! ```rust,no_run
//! use schemadelta::prelude::*;
//!
//! # async fn run() -> Result<(), InstanceError> {
//! let instance = Instance::connect("mysql://root@127.0.0.1:3306", InstanceOptions::new()).await?;
//! let from = instance.load_schema("app").await?;
//! let to = instance.load_schema("app_next").await?;
//!
//! let mods = StatementModifiers::new(instance.flavor());
//! for diff in SchemaDiff::new(Some(&from), Some(&to), instance.name_matching()).table_diffs {
//!     println!("{};", diff.statement(&mods)?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Print the statements turning schema `app` into `app_next`
//! schemadelta diff --from mysql://root@127.0.0.1 app app_next
//!
//! # Compare two servers, allowing destructive statements
//! schemadelta diff --from mysql://root@db1 --to mysql://root@db2 app --allow-unsafe
//!
//! # Show how each table would be rendered
//! schemadelta show --dsn mysql://root@127.0.0.1 app
//! ```
//!
//! [`Flavor`]: schemadelta_core::Flavor
//! [`Schema`]: schemadelta_core::Schema

pub mod error;
mod fanout;
pub mod instance;
mod introspect;
pub mod options;

pub use error::{ErrorKind, InstanceError, Result};
pub use instance::{Instance, PoolKey, SchemaRef};
pub use options::InstanceOptions;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{ErrorKind, InstanceError};
    pub use crate::instance::{Instance, SchemaRef};
    pub use crate::options::InstanceOptions;
    pub use schemadelta_core::prelude::*;
}
