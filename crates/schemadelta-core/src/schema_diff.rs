//! Schema comparison.

use tracing::debug;

use crate::error::UnsupportedDiff;
use crate::schema::{Schema, TableNameMatching};
use crate::statement::TableDiff;
use crate::table::Table;

/// The differences between two schema snapshots.
///
/// Either side may be absent, meaning the schema does not exist there.
#[derive(Debug, Clone)]
pub struct SchemaDiff<'a> {
    /// Current schema.
    pub from: Option<&'a Schema>,
    /// Desired schema.
    pub to: Option<&'a Schema>,
    /// CREATE, ALTER or DROP DATABASE statement; empty if the schema itself
    /// does not change.
    pub schema_ddl: String,
    /// Table changes: creates and alters in "to" order, then drops in "from"
    /// order.
    pub table_diffs: Vec<TableDiff<'a>>,
    /// Tables present and identical on both sides.
    pub same_tables: Vec<&'a Table>,
    /// Tables present on both sides whose differences cannot be expressed.
    pub unsupported_tables: Vec<UnsupportedDiff>,
}

impl<'a> SchemaDiff<'a> {
    /// Compares two schemas.
    #[must_use]
    pub fn new(
        from: Option<&'a Schema>,
        to: Option<&'a Schema>,
        matching: TableNameMatching,
    ) -> Self {
        let mut diff = Self {
            from,
            to,
            schema_ddl: String::new(),
            table_diffs: Vec::new(),
            same_tables: Vec::new(),
            unsupported_tables: Vec::new(),
        };

        let (from_schema, to_schema) = match (from, to) {
            (None, None) => return diff,
            (None, Some(to)) => {
                diff.schema_ddl = to.create_statement();
                return diff;
            }
            (Some(from), None) => {
                diff.schema_ddl = from.drop_statement();
                return diff;
            }
            (Some(from), Some(to)) => (from, to),
        };

        diff.schema_ddl = from_schema.alter_statement(&to_schema.charset, &to_schema.collation);

        for to_table in &to_schema.tables {
            let Some(from_table) = from_schema.find_table(&to_table.name, matching) else {
                diff.table_diffs.push(TableDiff::Create(to_table));
                continue;
            };
            match from_table.diff(to_table) {
                Ok(clauses) if clauses.is_empty() => diff.same_tables.push(to_table),
                Ok(clauses) => diff.table_diffs.push(TableDiff::Alter {
                    from: from_table,
                    to: to_table,
                    clauses,
                }),
                Err(unsupported) => {
                    debug!(schema = %to_schema.name, table = %to_table.name, reason = %unsupported.reason, "table diff unsupported");
                    diff.unsupported_tables.push(unsupported);
                }
            }
        }
        for from_table in &from_schema.tables {
            if to_schema.find_table(&from_table.name, matching).is_none() {
                diff.table_diffs.push(TableDiff::Drop(from_table));
            }
        }
        diff
    }

    /// Whether there is nothing to change and nothing unsupported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schema_ddl.is_empty() && self.table_diffs.is_empty() && self.unsupported_tables.is_empty()
    }
}

impl Schema {
    /// Compares this schema with `to` using case-sensitive table names.
    #[must_use]
    pub fn diff<'a>(&'a self, to: &'a Schema) -> SchemaDiff<'a> {
        SchemaDiff::new(Some(self), Some(to), TableNameMatching::CaseSensitive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::error::UnsupportedReason;

    fn table(name: &str, cols: &[&str]) -> Table {
        cols.iter().fold(
            Table::new(name, "InnoDB", "latin1", "latin1_swedish_ci"),
            |t, c| t.column(Column::new(*c, "int(11)")),
        )
    }

    fn schema(tables: Vec<Table>) -> Schema {
        tables
            .into_iter()
            .fold(Schema::new("s1", "latin1", "latin1_swedish_ci"), Schema::table)
    }

    #[test]
    fn test_both_absent() {
        let diff = SchemaDiff::new(None, None, TableNameMatching::CaseSensitive);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_create_and_drop_database() {
        let s = Schema::new("s1", "latin1", "latin1_swedish_ci").table(table("t", &["a"]));
        let create = SchemaDiff::new(None, Some(&s), TableNameMatching::CaseSensitive);
        assert_eq!(
            create.schema_ddl,
            "CREATE DATABASE `s1` CHARACTER SET latin1 COLLATE latin1_swedish_ci"
        );
        assert!(create.table_diffs.is_empty());

        let drop = SchemaDiff::new(Some(&s), None, TableNameMatching::CaseSensitive);
        assert_eq!(drop.schema_ddl, "DROP DATABASE `s1`");
        assert!(drop.table_diffs.is_empty());
    }

    #[test]
    fn test_collation_only_alter() {
        let a = Schema::new("s1", "latin1", "latin1_swedish_ci");
        let b = Schema::new("s1", "latin1", "latin1_bin");
        let diff = a.diff(&b);
        assert_eq!(diff.schema_ddl, "ALTER DATABASE `s1` COLLATE latin1_bin");
        assert!(!diff.schema_ddl.contains("CHARACTER SET"));
    }

    #[test]
    fn test_table_classification() {
        let mut broken_from = table("broken", &["a"]);
        broken_from.unsupported_ddl = true;
        let from = schema(vec![
            table("same", &["a"]),
            table("changed", &["a"]),
            table("gone", &["a"]),
            broken_from,
        ]);
        let to = schema(vec![
            table("new", &["a"]),
            table("same", &["a"]),
            table("changed", &["a", "b"]),
            table("broken", &["a", "b"]),
        ]);
        let diff = from.diff(&to);
        assert_eq!(diff.schema_ddl, "");

        let kinds: Vec<(&str, &str)> = diff
            .table_diffs
            .iter()
            .map(|d| (d.kind(), d.table_name()))
            .collect();
        assert_eq!(
            kinds,
            vec![("CREATE", "new"), ("ALTER", "changed"), ("DROP", "gone")]
        );
        assert_eq!(diff.same_tables.len(), 1);
        assert_eq!(diff.same_tables[0].name, "same");
        assert_eq!(diff.unsupported_tables.len(), 1);
        assert_eq!(diff.unsupported_tables[0].table, "broken");
        assert_eq!(
            diff.unsupported_tables[0].reason,
            UnsupportedReason::UnsupportedDdl
        );
    }

    #[test]
    fn test_table_name_matching_policies() {
        let from = schema(vec![table("Users", &["a"])]);
        let to = schema(vec![table("users", &["a"])]);

        let sensitive = SchemaDiff::new(Some(&from), Some(&to), TableNameMatching::CaseSensitive);
        let kinds: Vec<&str> = sensitive.table_diffs.iter().map(TableDiff::kind).collect();
        assert_eq!(kinds, vec!["CREATE", "DROP"]);

        let insensitive =
            SchemaDiff::new(Some(&from), Some(&to), TableNameMatching::CaseInsensitive);
        assert!(insensitive.table_diffs.is_empty());
        assert_eq!(insensitive.same_tables.len(), 1);
    }

    #[test]
    fn test_case_insensitive_match_of_reconciled_tables() {
        let flavor = crate::flavor::Flavor::mysql(5, 7, 44);
        let reconciled = |name: &str| {
            let mut t = table(name, &["a", "b"]);
            let literal = t.generated_create_statement(flavor);
            t.reconcile(literal, flavor);
            assert!(!t.unsupported_ddl);
            t
        };
        let from = schema(vec![reconciled("Users")]);
        let to = schema(vec![reconciled("users")]);

        let diff = SchemaDiff::new(Some(&from), Some(&to), TableNameMatching::CaseInsensitive);
        assert!(diff.unsupported_tables.is_empty(), "{:?}", diff.unsupported_tables);
        assert!(diff.table_diffs.is_empty());
        assert_eq!(diff.same_tables.len(), 1);

        // A real difference is still found past the name.
        let mut wider = table("users", &["a", "b"]);
        wider.columns[1].type_in_db = "bigint(20)".into();
        let literal = wider.generated_create_statement(flavor);
        wider.reconcile(literal, flavor);
        let to = schema(vec![wider]);
        let diff = SchemaDiff::new(Some(&from), Some(&to), TableNameMatching::CaseInsensitive);
        assert_eq!(diff.table_diffs.len(), 1);
        assert_eq!(diff.table_diffs[0].kind(), "ALTER");
    }
}
