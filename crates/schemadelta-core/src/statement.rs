//! Statement assembly: turns table diffs into executable SQL under a set of
//! policy modifiers.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::alter::{ClausePlacement, TableAlterClause};
use crate::ddl::escape_identifier;
use crate::error::{DiffError, Result};
use crate::flavor::Flavor;
use crate::table::{parse_create_auto_inc, Table};

/// Policy for AUTO_INCREMENT values in generated statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NextAutoIncMode {
    /// Never include AUTO_INCREMENT changes.
    #[default]
    Ignore,
    /// Only when the value increases.
    IfIncreased,
    /// Only when the current value is already above 1.
    IfAlready,
    /// Always include it.
    Always,
}

/// Policy for partitioning changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PartitioningMode {
    /// Apply partitioning changes as computed.
    #[default]
    Permissive,
    /// Never remove partitioning from a table that has it.
    Keep,
}

/// Policy applied when rendering statements.
///
/// This is the only configuration surface of the diff engine.
#[derive(Debug, Clone, Default)]
pub struct StatementModifiers {
    /// AUTO_INCREMENT handling.
    pub next_auto_inc: NextAutoIncMode,
    /// Allow statements that may lose data.
    pub allow_unsafe: bool,
    /// `LOCK=` value to prepend to ALTER TABLE.
    pub lock_clause: Option<String>,
    /// `ALGORITHM=` value to prepend to ALTER TABLE.
    pub algorithm_clause: Option<String>,
    /// Emit index drop/re-add pairs that only restore index order.
    pub strict_index_order: bool,
    /// Emit foreign key drop/re-add pairs that only change the name.
    pub strict_foreign_key_naming: bool,
    /// Tables whose names match produce no statements.
    pub ignore_table: Option<Regex>,
    /// Partitioning handling.
    pub partitioning: PartitioningMode,
    /// Flavor used to render column and partition definitions.
    pub flavor: Flavor,
}

impl StatementModifiers {
    /// Creates modifiers with default policy for the given flavor.
    #[must_use]
    pub fn new(flavor: Flavor) -> Self {
        Self {
            flavor,
            ..Self::default()
        }
    }

    /// Sets the AUTO_INCREMENT policy.
    #[must_use]
    pub fn next_auto_inc(mut self, mode: NextAutoIncMode) -> Self {
        self.next_auto_inc = mode;
        self
    }

    /// Allows or forbids unsafe statements.
    #[must_use]
    pub fn allow_unsafe(mut self, allow: bool) -> Self {
        self.allow_unsafe = allow;
        self
    }

    /// Sets the `LOCK=` clause.
    #[must_use]
    pub fn lock_clause(mut self, lock: impl Into<String>) -> Self {
        self.lock_clause = Some(lock.into());
        self
    }

    /// Sets the `ALGORITHM=` clause.
    #[must_use]
    pub fn algorithm_clause(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm_clause = Some(algorithm.into());
        self
    }

    /// Enables or disables strict index ordering.
    #[must_use]
    pub fn strict_index_order(mut self, strict: bool) -> Self {
        self.strict_index_order = strict;
        self
    }

    /// Enables or disables strict foreign key naming.
    #[must_use]
    pub fn strict_foreign_key_naming(mut self, strict: bool) -> Self {
        self.strict_foreign_key_naming = strict;
        self
    }

    /// Sets the pattern of tables to ignore.
    #[must_use]
    pub fn ignore_table(mut self, pattern: Regex) -> Self {
        self.ignore_table = Some(pattern);
        self
    }

    /// Sets the partitioning policy.
    #[must_use]
    pub fn partitioning(mut self, mode: PartitioningMode) -> Self {
        self.partitioning = mode;
        self
    }

    fn ignores(&self, table: &str) -> bool {
        self.ignore_table.as_ref().is_some_and(|re| re.is_match(table))
    }
}

/// The change required for one table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableDiff<'a> {
    /// The table only exists on the "to" side.
    Create(&'a Table),
    /// The table only exists on the "from" side.
    Drop(&'a Table),
    /// The table exists on both sides and differs.
    Alter {
        /// Current table.
        from: &'a Table,
        /// Desired table.
        to: &'a Table,
        /// Clauses in application order.
        clauses: Vec<TableAlterClause>,
    },
    /// A rename. Never produced by the schema diff; cannot be rendered.
    Rename {
        /// Current table.
        from: &'a Table,
        /// Desired table.
        to: &'a Table,
    },
}

impl TableDiff<'_> {
    /// Name of the affected table (the desired name for renames).
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::Create(t) | Self::Drop(t) => &t.name,
            Self::Alter { to, .. } | Self::Rename { to, .. } => &to.name,
        }
    }

    /// Statement kind keyword.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create(_) => "CREATE",
            Self::Drop(_) => "DROP",
            Self::Alter { .. } => "ALTER",
            Self::Rename { .. } => "RENAME",
        }
    }

    /// Renders the diff as one or more SQL statements.
    ///
    /// An empty vector means there is nothing to run. Partition list changes
    /// need ALTER TABLE statements of their own, so an alter may yield more
    /// than one statement.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::Forbidden`] (with the rendered SQL attached) when
    /// the modifiers disallow the change, and
    /// [`DiffError::UnsupportedOperation`] for renames.
    pub fn statements(&self, mods: &StatementModifiers) -> Result<Vec<String>> {
        if mods.ignores(self.table_name()) {
            return Ok(Vec::new());
        }
        match self {
            Self::Create(table) => Ok(vec![create_statement(table, mods)]),
            Self::Drop(table) => {
                let statement = format!("DROP TABLE {}", escape_identifier(&table.name));
                if mods.allow_unsafe {
                    Ok(vec![statement])
                } else {
                    Err(DiffError::Forbidden {
                        table: table.name.clone(),
                        reason: "drops table".to_string(),
                        statement,
                    })
                }
            }
            Self::Alter { to, clauses, .. } => alter_statements(to, clauses, mods),
            Self::Rename { from, to } => Err(DiffError::UnsupportedOperation(format!(
                "rename table {} to {}",
                escape_identifier(&from.name),
                escape_identifier(&to.name)
            ))),
        }
    }

    /// Renders the diff as a single string, joining multiple statements with
    /// `;\n`. The empty string means there is nothing to run.
    ///
    /// # Errors
    ///
    /// Same as [`TableDiff::statements`].
    pub fn statement(&self, mods: &StatementModifiers) -> Result<String> {
        Ok(self.statements(mods)?.join(";\n"))
    }
}

fn create_statement(table: &Table, mods: &StatementModifiers) -> String {
    let statement = table.create_statement_for(mods.flavor);
    let strip = table.has_auto_increment()
        && matches!(
            mods.next_auto_inc,
            NextAutoIncMode::Ignore | NextAutoIncMode::IfAlready
        );
    if strip {
        parse_create_auto_inc(&statement).0
    } else {
        statement
    }
}

fn alter_statements(
    to: &Table,
    clauses: &[TableAlterClause],
    mods: &StatementModifiers,
) -> Result<Vec<String>> {
    let mut inline = Vec::new();
    let mut partition_option = None;
    let mut standalone = Vec::new();
    let mut rejection: Option<String> = None;

    for clause in clauses {
        let Some(text) = clause.clause(to, mods)? else {
            continue;
        };
        if !mods.allow_unsafe && rejection.is_none() && clause.is_unsafe() {
            rejection = Some(clause.describe());
        }
        match clause.placement() {
            ClausePlacement::Inline => inline.push(text),
            ClausePlacement::PartitionOption => partition_option = Some(text),
            ClausePlacement::Standalone => standalone.push(text),
        }
    }

    let table_name = escape_identifier(&to.name);
    let prefix = online_options(mods);
    let mut statements = Vec::new();
    if !inline.is_empty() || partition_option.is_some() {
        let mut options = prefix.clone();
        options.extend(inline);

        let mut statement = format!("ALTER TABLE {table_name}");
        if !options.is_empty() {
            statement.push(' ');
            statement.push_str(&options.join(", "));
        }
        if let Some(partition_option) = partition_option {
            statement.push(' ');
            statement.push_str(&partition_option);
        }
        statements.push(statement);
    }
    // Partition list changes are partition options, so ALGORITHM and LOCK
    // precede them without a comma.
    let prefix = if prefix.is_empty() {
        String::new()
    } else {
        format!("{} ", prefix.join(", "))
    };
    statements.extend(
        standalone
            .into_iter()
            .map(|text| format!("ALTER TABLE {table_name} {prefix}{text}")),
    );

    match rejection {
        Some(reason) => Err(DiffError::Forbidden {
            table: to.name.clone(),
            reason,
            statement: statements.join(";\n"),
        }),
        None => Ok(statements),
    }
}

/// `ALGORITHM=` then `LOCK=`, as configured.
fn online_options(mods: &StatementModifiers) -> Vec<String> {
    let mut options = Vec::new();
    if let Some(algorithm) = &mods.algorithm_clause {
        options.push(format!("ALGORITHM={algorithm}"));
    }
    if let Some(lock) = &mods.lock_clause {
        options.push(format!("LOCK={lock}"));
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alter::{ColumnPosition, PartitionListChange};
    use crate::column::Column;
    use crate::index::Index;
    use crate::partition::{Partition, TablePartitioning};

    const MYSQL57: Flavor = Flavor::mysql(5, 7, 44);

    fn mods() -> StatementModifiers {
        StatementModifiers::new(MYSQL57)
    }

    fn users() -> Table {
        Table::new("users", "InnoDB", "latin1", "latin1_swedish_ci")
            .column(Column::new("id", "int(11)").not_null().auto_increment())
            .column(Column::new("name", "varchar(20)"))
            .primary_key(Index::primary(["id"]))
            .next_auto_increment(7)
    }

    fn alter<'a>(from: &'a Table, to: &'a Table, clauses: Vec<TableAlterClause>) -> TableDiff<'a> {
        TableDiff::Alter { from, to, clauses }
    }

    #[test]
    fn test_drop_table_requires_allow_unsafe() {
        let t = users();
        let diff = TableDiff::Drop(&t);
        let err = diff.statement(&mods()).unwrap_err();
        assert!(err.is_forbidden());
        assert_eq!(err.statement(), Some("DROP TABLE `users`"));
        assert_eq!(
            diff.statement(&mods().allow_unsafe(true)).unwrap(),
            "DROP TABLE `users`"
        );
    }

    #[test]
    fn test_drop_column_forbidden_with_statement_attached() {
        let t = users();
        let diff = alter(
            &t,
            &t,
            vec![
                TableAlterClause::AddColumn {
                    column: Column::new("email", "varchar(50)"),
                    position: None,
                },
                TableAlterClause::DropColumn {
                    column: Column::new("name", "varchar(20)"),
                },
            ],
        );
        let expected =
            "ALTER TABLE `users` ADD COLUMN `email` varchar(50) DEFAULT NULL, DROP COLUMN `name`";
        let err = diff.statement(&mods()).unwrap_err();
        match &err {
            DiffError::Forbidden {
                table,
                reason,
                statement,
            } => {
                assert_eq!(table, "users");
                assert!(reason.contains("drops column"));
                assert_eq!(statement, expected);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(diff.statement(&mods().allow_unsafe(true)).unwrap(), expected);
    }

    #[test]
    fn test_unsafe_modify_column() {
        let t = users();
        let narrowing = alter(
            &t,
            &t,
            vec![TableAlterClause::ModifyColumn {
                old: Column::new("name", "varchar(20)"),
                new: Column::new("name", "varchar(19)"),
                position: None,
            }],
        );
        assert!(narrowing.statement(&mods()).is_err());
        let widening = alter(
            &t,
            &t,
            vec![TableAlterClause::ModifyColumn {
                old: Column::new("name", "varchar(20)"),
                new: Column::new("name", "varchar(21)"),
                position: Some(ColumnPosition::First),
            }],
        );
        assert_eq!(
            widening.statement(&mods()).unwrap(),
            "ALTER TABLE `users` MODIFY COLUMN `name` varchar(21) DEFAULT NULL FIRST"
        );
    }

    #[test]
    fn test_algorithm_and_lock_prefix() {
        let t = users();
        let diff = alter(
            &t,
            &t,
            vec![TableAlterClause::ChangeComment {
                comment: "people".into(),
            }],
        );
        let m = mods().lock_clause("NONE").algorithm_clause("INPLACE");
        assert_eq!(
            diff.statement(&m).unwrap(),
            "ALTER TABLE `users` ALGORITHM=INPLACE, LOCK=NONE, COMMENT 'people'"
        );
    }

    #[test]
    fn test_filtered_alter_is_empty() {
        let t = users();
        let diff = alter(
            &t,
            &t,
            vec![TableAlterClause::ChangeAutoIncrement { old: 7, new: 9 }],
        );
        let m = mods().lock_clause("NONE");
        assert_eq!(diff.statement(&m).unwrap(), "");
        assert_eq!(
            diff.statement(&m.next_auto_inc(NextAutoIncMode::Always))
                .unwrap(),
            "ALTER TABLE `users` LOCK=NONE, AUTO_INCREMENT = 9"
        );
    }

    #[test]
    fn test_create_table_auto_increment_handling() {
        let t = users();
        let diff = TableDiff::Create(&t);
        let stripped = diff.statement(&mods()).unwrap();
        assert!(!stripped.contains("AUTO_INCREMENT=7"));
        assert!(stripped.contains("`id` int(11) NOT NULL AUTO_INCREMENT"));
        let if_already = diff
            .statement(&mods().next_auto_inc(NextAutoIncMode::IfAlready))
            .unwrap();
        assert_eq!(if_already, stripped);
        let kept = diff
            .statement(&mods().next_auto_inc(NextAutoIncMode::Always))
            .unwrap();
        assert!(kept.contains(") ENGINE=InnoDB AUTO_INCREMENT=7 DEFAULT CHARSET=latin1"));
    }

    #[test]
    fn test_create_table_prefers_literal() {
        let mut t = users();
        t.create_statement = "CREATE TABLE `users` (literal) ENGINE=InnoDB".into();
        assert_eq!(
            TableDiff::Create(&t).statement(&mods()).unwrap(),
            "CREATE TABLE `users` (literal) ENGINE=InnoDB"
        );
    }

    #[test]
    fn test_ignore_table() {
        let t = users();
        let m = mods().ignore_table(Regex::new("^us").unwrap());
        assert_eq!(TableDiff::Drop(&t).statement(&m).unwrap(), "");
        assert!(TableDiff::Create(&t).statements(&m).unwrap().is_empty());
    }

    #[test]
    fn test_rename_table_is_unsupported() {
        let a = users();
        let b = Table::new("people", "InnoDB", "latin1", "latin1_swedish_ci");
        let err = TableDiff::Rename { from: &a, to: &b }
            .statement(&mods())
            .unwrap_err();
        assert!(matches!(err, DiffError::UnsupportedOperation(_)));
        assert_eq!(TableDiff::Rename { from: &a, to: &b }.table_name(), "people");
    }

    #[test]
    fn test_partition_statements() {
        let t = users();
        let partitioning = TablePartitioning::new("RANGE", "id");
        let diff = alter(
            &t,
            &t,
            vec![
                TableAlterClause::ChangeComment {
                    comment: "x".into(),
                },
                TableAlterClause::ModifyPartitions(PartitionListChange::Drop(vec!["p0".into()])),
                TableAlterClause::ModifyPartitions(PartitionListChange::Add {
                    partitioning,
                    partitions: vec![Partition::new("p9", "900")],
                }),
            ],
        );
        let m = mods().allow_unsafe(true);
        assert_eq!(
            diff.statements(&m).unwrap(),
            vec![
                "ALTER TABLE `users` COMMENT 'x'",
                "ALTER TABLE `users` DROP PARTITION `p0`",
                "ALTER TABLE `users` ADD PARTITION (PARTITION `p9` VALUES LESS THAN (900))",
            ]
        );
        assert!(diff.statement(&mods()).is_err());
    }

    #[test]
    fn test_partition_statements_carry_algorithm_and_lock() {
        let t = users();
        let diff = alter(
            &t,
            &t,
            vec![TableAlterClause::ModifyPartitions(PartitionListChange::Add {
                partitioning: TablePartitioning::new("RANGE", "id"),
                partitions: vec![Partition::new("p9", "900")],
            })],
        );
        let m = mods().algorithm_clause("INPLACE").lock_clause("NONE");
        assert_eq!(
            diff.statements(&m).unwrap(),
            vec![
                "ALTER TABLE `users` ALGORITHM=INPLACE, LOCK=NONE \
                 ADD PARTITION (PARTITION `p9` VALUES LESS THAN (900))",
            ]
        );
    }

    #[test]
    fn test_partition_by_appended_after_options() {
        let t = users();
        let diff = alter(
            &t,
            &t,
            vec![
                TableAlterClause::ChangeComment {
                    comment: "x".into(),
                },
                TableAlterClause::RemovePartitioning,
            ],
        );
        assert_eq!(
            diff.statement(&mods()).unwrap(),
            "ALTER TABLE `users` COMMENT 'x' REMOVE PARTITIONING"
        );
        assert_eq!(
            diff.statement(&mods().partitioning(PartitioningMode::Keep))
                .unwrap(),
            "ALTER TABLE `users` COMMENT 'x'"
        );
    }
}
