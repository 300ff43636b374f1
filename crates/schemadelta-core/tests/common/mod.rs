#![allow(dead_code)]

use schemadelta_core::prelude::*;

pub const MYSQL57: Flavor = Flavor::mysql(5, 7, 44);
pub const MYSQL80: Flavor = Flavor::mysql(8, 0, 36);
pub const MARIADB106: Flavor = Flavor::mariadb(10, 6, 16);

pub fn col(name: &str, type_in_db: &str) -> Column {
    Column::new(name, type_in_db)
}

pub fn table(name: &str) -> Table {
    Table::new(name, "InnoDB", "latin1", "latin1_swedish_ci")
}

/// A table whose literal CREATE statement is what the renderer produces, as
/// if it had been introspected from a server of the given flavor.
pub fn reconciled(mut t: Table, flavor: Flavor) -> Table {
    let literal = t.generated_create_statement(flavor);
    t.reconcile(literal, flavor);
    t
}

pub fn users_v1() -> Table {
    table("users")
        .column(col("id", "int(10) unsigned").not_null().auto_increment())
        .column(
            col("name", "varchar(45)")
                .charset("latin1", "latin1_swedish_ci", true)
                .not_null()
                .default_value(""),
        )
        .column(col("age", "tinyint(3) unsigned"))
        .column(col("created_at", "timestamp").not_null().default_expression("CURRENT_TIMESTAMP"))
        .primary_key(Index::primary(["id"]))
        .index(Index::new("idx_name", ["name"]))
        .next_auto_increment(10)
}

pub fn users_v2() -> Table {
    table("users")
        .column(col("id", "int(10) unsigned").not_null().auto_increment())
        .column(
            col("email", "varchar(100)")
                .charset("latin1", "latin1_swedish_ci", true)
                .not_null(),
        )
        .column(
            col("name", "varchar(60)")
                .charset("latin1", "latin1_swedish_ci", true)
                .not_null()
                .default_value(""),
        )
        .column(col("created_at", "timestamp").not_null().default_expression("CURRENT_TIMESTAMP"))
        .primary_key(Index::primary(["id"]))
        .index(Index::new("idx_name", ["name"]))
        .index(Index::new("idx_email", ["email"]).unique())
        .next_auto_increment(10)
}

/// Applies the column clauses of an ALTER to a list of column names the way
/// the server processes them: left to right.
pub fn apply_column_clauses(mut order: Vec<String>, clauses: &[TableAlterClause]) -> Vec<String> {
    fn place(order: &mut Vec<String>, name: &str, position: Option<&ColumnPosition>) {
        match position {
            None => order.push(name.to_string()),
            Some(ColumnPosition::First) => order.insert(0, name.to_string()),
            Some(ColumnPosition::After(prev)) => {
                let at = order
                    .iter()
                    .position(|n| n == prev)
                    .unwrap_or_else(|| panic!("AFTER unknown column {prev}"));
                order.insert(at + 1, name.to_string());
            }
        }
    }

    for clause in clauses {
        match clause {
            TableAlterClause::DropColumn { column } => order.retain(|n| *n != column.name),
            TableAlterClause::AddColumn { column, position } => {
                place(&mut order, &column.name, position.as_ref());
            }
            TableAlterClause::ModifyColumn {
                new,
                position: Some(position),
                ..
            } => {
                order.retain(|n| *n != new.name);
                place(&mut order, &new.name, Some(position));
            }
            _ => {}
        }
    }
    order
}

/// Applies every clause of an ALTER to a copy of `from`, left to right, and
/// returns the resulting table. New indexes and foreign keys are appended,
/// as the server lists them after the existing ones.
pub fn apply_clauses(from: &Table, clauses: &[TableAlterClause]) -> Table {
    fn place(columns: &mut Vec<Column>, column: Column, position: Option<&ColumnPosition>) {
        match position {
            None => columns.push(column),
            Some(ColumnPosition::First) => columns.insert(0, column),
            Some(ColumnPosition::After(prev)) => {
                let at = columns
                    .iter()
                    .position(|c| c.name == *prev)
                    .unwrap_or_else(|| panic!("AFTER unknown column {prev}"));
                columns.insert(at + 1, column);
            }
        }
    }

    let mut t = from.clone();
    t.create_statement.clear();
    for clause in clauses {
        match clause {
            TableAlterClause::AddColumn { column, position } => {
                place(&mut t.columns, column.clone(), position.as_ref());
            }
            TableAlterClause::DropColumn { column } => t.columns.retain(|c| c.name != column.name),
            TableAlterClause::ModifyColumn { new, position, .. } => {
                let at = t
                    .columns
                    .iter()
                    .position(|c| c.name == new.name)
                    .unwrap_or_else(|| panic!("MODIFY unknown column {}", new.name));
                match position {
                    None => t.columns[at] = new.clone(),
                    Some(position) => {
                        t.columns.remove(at);
                        place(&mut t.columns, new.clone(), Some(position));
                    }
                }
            }
            TableAlterClause::RenameColumn { .. } => panic!("column renames are never emitted"),
            TableAlterClause::AddIndex { index, .. } if index.primary_key => {
                t.primary_key = Some(index.clone());
            }
            TableAlterClause::AddIndex { index, .. } => t.secondary_indexes.push(index.clone()),
            TableAlterClause::DropIndex { index, .. } if index.primary_key => t.primary_key = None,
            TableAlterClause::DropIndex { index, .. } => {
                t.secondary_indexes.retain(|i| i.name != index.name);
            }
            TableAlterClause::AddForeignKey { foreign_key, .. } => {
                t.foreign_keys.push(foreign_key.clone());
            }
            TableAlterClause::DropForeignKey { foreign_key, .. } => {
                t.foreign_keys.retain(|fk| fk.name != foreign_key.name);
            }
            TableAlterClause::ChangeAutoIncrement { new, .. } => t.next_auto_increment = *new,
            TableAlterClause::ChangeCharSet { charset, collation } => {
                t.charset = charset.clone();
                t.collation = collation.clone();
            }
            TableAlterClause::ChangeCreateOptions { new, .. } => t.create_options = new.clone(),
            TableAlterClause::ChangeComment { comment } => t.comment = comment.clone(),
            TableAlterClause::ChangeStorageEngine { new, .. } => t.engine = new.clone(),
            TableAlterClause::PartitionBy { partitioning } => {
                t.partitioning = Some(partitioning.clone());
            }
            TableAlterClause::RemovePartitioning => t.partitioning = None,
            TableAlterClause::ModifyPartitions(change) => {
                let partitioning = t
                    .partitioning
                    .as_mut()
                    .unwrap_or_else(|| panic!("partition change on unpartitioned table"));
                match change {
                    PartitionListChange::Drop(names) => {
                        partitioning.partitions.retain(|p| !names.contains(&p.name));
                    }
                    PartitionListChange::Add { partitions, .. } => {
                        partitioning.partitions.extend(partitions.iter().cloned());
                    }
                }
            }
        }
    }
    t
}

/// The table's generated CREATE statement with foreign keys in name order,
/// the order the server prints them in.
pub fn structure(t: &Table, flavor: Flavor) -> String {
    let mut t = t.clone();
    t.create_statement.clear();
    t.foreign_keys.sort_by(|a, b| a.name.cmp(&b.name));
    t.generated_create_statement(flavor)
}

pub fn names(t: &Table) -> Vec<String> {
    t.columns.iter().map(|c| c.name.clone()).collect()
}
