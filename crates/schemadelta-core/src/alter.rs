//! ALTER TABLE clauses produced by [`Table::diff`](crate::Table::diff).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::column::Column;
use crate::ddl::{escape_identifier, quote_value};
use crate::error::{DiffError, Result};
use crate::foreign_key::ForeignKey;
use crate::index::Index;
use crate::partition::{Partition, TablePartitioning};
use crate::safety::modify_column_is_unsafe;
use crate::statement::{NextAutoIncMode, PartitioningMode, StatementModifiers};
use crate::table::Table;

/// Where an added or moved column lands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnPosition {
    /// `FIRST`.
    First,
    /// `AFTER <column>`.
    After(String),
}

impl fmt::Display for ColumnPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("FIRST"),
            Self::After(name) => write!(f, "AFTER {}", escape_identifier(name)),
        }
    }
}

/// A change to the partition list that keeps the partitioning scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionListChange {
    /// `DROP PARTITION a, b`.
    Drop(Vec<String>),
    /// `ADD PARTITION (...)`.
    Add {
        /// Partitioning scheme the partitions belong to.
        partitioning: TablePartitioning,
        /// Partitions to append.
        partitions: Vec<Partition>,
    },
}

/// How a rendered clause is placed in the final SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClausePlacement {
    /// Comma-separated alter option.
    Inline,
    /// Partition option appended after all alter options.
    PartitionOption,
    /// Needs an ALTER TABLE statement of its own.
    Standalone,
}

/// One atomic unit of an ALTER TABLE statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableAlterClause {
    /// `ADD COLUMN`.
    AddColumn {
        /// New column.
        column: Column,
        /// Position, `None` to append.
        position: Option<ColumnPosition>,
    },
    /// `DROP COLUMN`.
    DropColumn {
        /// Dropped column.
        column: Column,
    },
    /// `MODIFY COLUMN`, changing a definition and/or a position.
    ModifyColumn {
        /// Definition before the change.
        old: Column,
        /// Definition after the change.
        new: Column,
        /// New position, if the column moves.
        position: Option<ColumnPosition>,
    },
    /// Column rename. Never produced by the diff; cannot be rendered.
    RenameColumn {
        /// Old definition.
        old: Column,
        /// New definition.
        new: Column,
    },
    /// `ADD KEY` / `ADD PRIMARY KEY`.
    AddIndex {
        /// Index to add.
        index: Index,
        /// Set when the index only changes position in the index list.
        reorder_only: bool,
    },
    /// `DROP KEY` / `DROP PRIMARY KEY`.
    DropIndex {
        /// Index to drop.
        index: Index,
        /// Set when the index only changes position in the index list.
        reorder_only: bool,
    },
    /// `ADD CONSTRAINT ... FOREIGN KEY`.
    AddForeignKey {
        /// Constraint to add.
        foreign_key: ForeignKey,
        /// Set when an equivalent constraint is being dropped under another
        /// name.
        rename_only: bool,
    },
    /// `DROP FOREIGN KEY`.
    DropForeignKey {
        /// Constraint to drop.
        foreign_key: ForeignKey,
        /// Set when an equivalent constraint is being added under another
        /// name.
        rename_only: bool,
    },
    /// `AUTO_INCREMENT = n`.
    ChangeAutoIncrement {
        /// Current value.
        old: u64,
        /// Desired value.
        new: u64,
    },
    /// `DEFAULT CHARACTER SET = x COLLATE = y`.
    ChangeCharSet {
        /// New character set.
        charset: String,
        /// New collation.
        collation: String,
    },
    /// Table option changes.
    ChangeCreateOptions {
        /// Old options string.
        old: String,
        /// New options string.
        new: String,
    },
    /// `COMMENT 'x'`.
    ChangeComment {
        /// New comment.
        comment: String,
    },
    /// `ENGINE=x`.
    ChangeStorageEngine {
        /// Old engine.
        old: String,
        /// New engine.
        new: String,
    },
    /// `PARTITION BY ...`, partitioning or repartitioning the table.
    PartitionBy {
        /// Desired partitioning.
        partitioning: TablePartitioning,
    },
    /// `REMOVE PARTITIONING`.
    RemovePartitioning,
    /// `ADD PARTITION` or `DROP PARTITION`.
    ModifyPartitions(PartitionListChange),
}

impl TableAlterClause {
    /// Where the rendered clause goes in the final SQL.
    #[must_use]
    pub fn placement(&self) -> ClausePlacement {
        match self {
            Self::PartitionBy { .. } | Self::RemovePartitioning => ClausePlacement::PartitionOption,
            Self::ModifyPartitions(_) => ClausePlacement::Standalone,
            _ => ClausePlacement::Inline,
        }
    }

    /// Whether applying this clause risks data loss.
    #[must_use]
    pub fn is_unsafe(&self) -> bool {
        match self {
            Self::DropColumn { .. } | Self::RenameColumn { .. } | Self::ChangeStorageEngine { .. } => {
                true
            }
            Self::ModifyColumn { old, new, .. } => modify_column_is_unsafe(old, new),
            Self::ModifyPartitions(PartitionListChange::Drop(_)) => true,
            _ => false,
        }
    }

    /// Short description used when a modifier rejects the clause.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::DropColumn { column } => format!("drops column {}", escape_identifier(&column.name)),
            Self::ModifyColumn { old, new, .. } => format!(
                "modifies column {} from {} to {}",
                escape_identifier(&new.name),
                old.type_in_db,
                new.type_in_db
            ),
            Self::RenameColumn { old, .. } => {
                format!("renames column {}", escape_identifier(&old.name))
            }
            Self::ChangeStorageEngine { old, new } => {
                format!("changes storage engine from {old} to {new}")
            }
            Self::ModifyPartitions(PartitionListChange::Drop(names)) => {
                format!("drops partitions {}", names.join(", "))
            }
            other => format!("{other:?}"),
        }
    }

    /// Renders the clause.
    ///
    /// `table` is the desired ("to") table. Returns `Ok(None)` when the
    /// modifiers filter the clause out.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::UnsupportedOperation`] for column renames.
    pub fn clause(&self, table: &Table, mods: &StatementModifiers) -> Result<Option<String>> {
        let flavor = mods.flavor;
        let text = match self {
            Self::AddColumn { column, position } => {
                let text = format!("ADD COLUMN {}", column.definition(flavor, table));
                with_position(text, position.as_ref())
            }
            Self::DropColumn { column } => {
                format!("DROP COLUMN {}", escape_identifier(&column.name))
            }
            Self::ModifyColumn { new, position, .. } => {
                let text = format!("MODIFY COLUMN {}", new.definition(flavor, table));
                with_position(text, position.as_ref())
            }
            Self::RenameColumn { old, new } => {
                return Err(DiffError::UnsupportedOperation(format!(
                    "rename column {} to {} on table {}",
                    escape_identifier(&old.name),
                    escape_identifier(&new.name),
                    escape_identifier(&table.name)
                )));
            }
            Self::AddIndex { index, reorder_only } => {
                if *reorder_only && !mods.strict_index_order {
                    return Ok(None);
                }
                format!("ADD {}", index.definition())
            }
            Self::DropIndex { index, reorder_only } => {
                if *reorder_only && !mods.strict_index_order {
                    return Ok(None);
                }
                if index.primary_key {
                    "DROP PRIMARY KEY".to_string()
                } else {
                    format!("DROP KEY {}", escape_identifier(&index.name))
                }
            }
            Self::AddForeignKey {
                foreign_key,
                rename_only,
            } => {
                if *rename_only && !mods.strict_foreign_key_naming {
                    return Ok(None);
                }
                format!("ADD {}", foreign_key.definition())
            }
            Self::DropForeignKey {
                foreign_key,
                rename_only,
            } => {
                if *rename_only && !mods.strict_foreign_key_naming {
                    return Ok(None);
                }
                format!("DROP FOREIGN KEY {}", escape_identifier(&foreign_key.name))
            }
            Self::ChangeAutoIncrement { old, new } => {
                let keep = match mods.next_auto_inc {
                    NextAutoIncMode::Ignore => false,
                    NextAutoIncMode::IfIncreased => new > old,
                    NextAutoIncMode::IfAlready => *old > 1,
                    NextAutoIncMode::Always => true,
                };
                if !keep {
                    return Ok(None);
                }
                format!("AUTO_INCREMENT = {new}")
            }
            Self::ChangeCharSet { charset, collation } => {
                format!("DEFAULT CHARACTER SET = {charset} COLLATE = {collation}")
            }
            Self::ChangeCreateOptions { old, new } => {
                let text = create_options_clause(old, new);
                if text.is_empty() {
                    return Ok(None);
                }
                text
            }
            Self::ChangeComment { comment } => format!("COMMENT {}", quote_value(comment)),
            Self::ChangeStorageEngine { new, .. } => format!("ENGINE={new}"),
            Self::PartitionBy { partitioning } => partitioning.alter_definition(flavor),
            Self::RemovePartitioning => {
                if mods.partitioning == PartitioningMode::Keep {
                    return Ok(None);
                }
                "REMOVE PARTITIONING".to_string()
            }
            Self::ModifyPartitions(PartitionListChange::Drop(names)) => format!(
                "DROP PARTITION {}",
                names
                    .iter()
                    .map(|n| escape_identifier(n))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::ModifyPartitions(PartitionListChange::Add {
                partitioning,
                partitions,
            }) => partitioning.add_partitions_clause(partitions),
        };
        Ok(Some(text))
    }
}

fn with_position(mut text: String, position: Option<&ColumnPosition>) -> String {
    if let Some(position) = position {
        text.push(' ');
        text.push_str(&position.to_string());
    }
    text
}

/// Value a table option reverts to when it disappears from the options
/// string.
fn create_option_default(key: &str) -> &'static str {
    match key {
        "MIN_ROWS" | "MAX_ROWS" | "AVG_ROW_LENGTH" | "CHECKSUM" | "DELAY_KEY_WRITE"
        | "KEY_BLOCK_SIZE" => "0",
        "COMPRESSION" => "''",
        "ENCRYPTION" => "'N'",
        _ => "DEFAULT",
    }
}

fn parse_create_options(options: &str) -> Vec<(&str, &str)> {
    options
        .split_whitespace()
        .filter_map(|pair| pair.split_once('='))
        .collect()
}

/// Renders the option assignments needed to turn `old` into `new`. Options
/// present in `old` are handled first, in their order, then options only
/// present in `new`.
fn create_options_clause(old: &str, new: &str) -> String {
    let old_opts = parse_create_options(old);
    let new_opts = parse_create_options(new);
    let lookup = |opts: &[(&str, &str)], key: &str| {
        opts.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| (*v).to_string())
    };

    let mut assignments = Vec::new();
    for (key, value) in &old_opts {
        match lookup(&new_opts, key) {
            Some(new_value) if new_value != *value => {
                assignments.push(format!("{key}={new_value}"));
            }
            Some(_) => {}
            None => {
                let key_upper = key.to_ascii_uppercase();
                assignments.push(format!("{key}={}", create_option_default(&key_upper)));
            }
        }
    }
    for (key, value) in &new_opts {
        if lookup(&old_opts, key).is_none() {
            assignments.push(format!("{key}={value}"));
        }
    }
    assignments.join(" ")
}
