//! The seam between the diff engine and whatever supplies schema snapshots.

use std::future::Future;

use crate::flavor::Flavor;
use crate::schema::Schema;

/// A source of schema snapshots, such as a live server.
///
/// Implementations return fully populated, detached [`Schema`] values whose
/// tables have already been reconciled against the source's own
/// `CREATE TABLE` text.
pub trait Introspect {
    /// Error produced by the source.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Dialect of the source; decides how tables are rendered.
    fn flavor(&self) -> Flavor;

    /// Names of the schemas the source can introspect.
    fn schema_names(&self) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send;

    /// Loads one schema with all of its tables.
    fn introspect_schema(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Schema, Self::Error>> + Send;
}
