//! MySQL and MariaDB schema model, DDL renderer and diff engine.
//!
//! `schemadelta-core` works on in-memory snapshots of database structure and
//! never talks to a server itself:
//! - The renderer reproduces `SHOW CREATE TABLE` output for a given server
//!   [`Flavor`], so a table that cannot be reproduced is detected and left
//!   alone instead of being altered incorrectly
//! - [`Table::diff`] and [`SchemaDiff`] compute ordered ALTER clauses
//! - [`TableDiff::statement`] turns them into SQL under a
//!   [`StatementModifiers`] policy, refusing unsafe changes unless allowed
//!
//! # Architecture
//!
//! - **Flavor** - vendor and version, with the capability gates the renderer
//!   consults
//! - **Model** - `Column`, `Index`, `ForeignKey`, `TablePartitioning`,
//!   `Table`, `Schema`
//! - **Diff** - `Table::diff` and `SchemaDiff`
//! - **Statements** - `TableAlterClause`, `TableDiff`, `StatementModifiers`
//! - **Introspect** - trait implemented by snapshot sources
//!
//! # Example
//!
//! ```rust
//! use schemadelta_core::prelude::*;
//!
//! let from = Table::new("users", "InnoDB", "utf8mb4", "utf8mb4_general_ci")
//!     .column(Column::new("id", "int(10) unsigned").not_null().auto_increment())
//!     .primary_key(Index::primary(["id"]));
//! let to = from.clone().column(Column::new("email", "varchar(100)"));
//!
//! let clauses = from.diff(&to).unwrap();
//! let diff = TableDiff::Alter { from: &from, to: &to, clauses };
//! let mods = StatementModifiers::new(Flavor::mysql(5, 7, 44));
//! assert_eq!(
//!     diff.statement(&mods).unwrap(),
//!     "ALTER TABLE `users` ADD COLUMN `email` varchar(100) DEFAULT NULL"
//! );
//! ```

pub mod alter;
pub mod column;
pub mod ddl;
pub mod error;
pub mod flavor;
pub mod foreign_key;
pub mod index;
pub mod introspect;
pub mod partition;
pub mod safety;
pub mod schema;
pub mod schema_diff;
pub mod statement;
pub mod table;
pub mod table_diff;

pub use alter::{ColumnPosition, PartitionListChange, TableAlterClause};
pub use column::{Column, ColumnDefault};
pub use error::{DiffError, Result, UnsupportedDiff, UnsupportedReason};
pub use flavor::{Flavor, Vendor};
pub use foreign_key::{ForeignKey, ReferentialAction};
pub use index::{Index, IndexKind, IndexPart};
pub use introspect::Introspect;
pub use partition::{Partition, TablePartitioning};
pub use schema::{Schema, TableNameMatching};
pub use schema_diff::SchemaDiff;
pub use statement::{NextAutoIncMode, PartitioningMode, StatementModifiers, TableDiff};
pub use table::{parse_create_auto_inc, Table};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::alter::{ColumnPosition, PartitionListChange, TableAlterClause};
    pub use crate::column::{Column, ColumnDefault};
    pub use crate::error::{DiffError, UnsupportedDiff, UnsupportedReason};
    pub use crate::flavor::{Flavor, Vendor};
    pub use crate::foreign_key::{ForeignKey, ReferentialAction};
    pub use crate::index::{Index, IndexKind, IndexPart};
    pub use crate::introspect::Introspect;
    pub use crate::partition::{Partition, TablePartitioning};
    pub use crate::schema::{Schema, TableNameMatching};
    pub use crate::schema_diff::SchemaDiff;
    pub use crate::statement::{NextAutoIncMode, PartitioningMode, StatementModifiers, TableDiff};
    pub use crate::table::Table;
}
