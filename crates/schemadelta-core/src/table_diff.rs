//! Table comparison: computes the ordered ALTER TABLE clauses turning one
//! table into another.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::alter::{ColumnPosition, PartitionListChange, TableAlterClause};
use crate::error::{UnsupportedDiff, UnsupportedReason};
use crate::foreign_key::ForeignKey;
use crate::table::Table;

type DiffResult<T> = std::result::Result<T, UnsupportedDiff>;

impl Table {
    /// Computes the clauses that turn `self` into `to`.
    ///
    /// Clause order matters: the server applies the clauses of one ALTER
    /// TABLE left to right, and column positions in later clauses refer to the
    /// column list produced by earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedDiff`] when either table uses DDL the renderer
    /// cannot reproduce, when a partition change cannot be expressed, or when
    /// the tables differ in a way no clause accounts for.
    pub fn diff(&self, to: &Table) -> DiffResult<Vec<TableAlterClause>> {
        if !self.create_statement.is_empty() && same_create_text(self, to) {
            return Ok(Vec::new());
        }
        if self.unsupported_ddl || to.unsupported_ddl {
            debug!(table = %to.name, "skipping diff of table with unsupported DDL");
            return Err(UnsupportedDiff::new(&to.name, UnsupportedReason::UnsupportedDdl));
        }

        let mut clauses = Vec::new();

        if self.charset != to.charset || self.collation != to.collation {
            clauses.push(TableAlterClause::ChangeCharSet {
                charset: to.charset.clone(),
                collation: to.collation.clone(),
            });
        }

        self.diff_columns(to, &mut clauses)?;
        self.diff_indexes(to, &mut clauses);
        self.diff_foreign_keys(to, &mut clauses);

        if self.engine != to.engine {
            clauses.push(TableAlterClause::ChangeStorageEngine {
                old: self.engine.clone(),
                new: to.engine.clone(),
            });
        }
        if to.has_auto_increment() && self.next_auto_increment != to.next_auto_increment {
            clauses.push(TableAlterClause::ChangeAutoIncrement {
                old: self.next_auto_increment,
                new: to.next_auto_increment,
            });
        }
        if self.create_options != to.create_options {
            clauses.push(TableAlterClause::ChangeCreateOptions {
                old: self.create_options.clone(),
                new: to.create_options.clone(),
            });
        }
        if self.comment != to.comment {
            clauses.push(TableAlterClause::ChangeComment {
                comment: to.comment.clone(),
            });
        }

        self.diff_partitioning(to, &mut clauses)?;

        if clauses.is_empty()
            && !self.create_statement.is_empty()
            && !to.create_statement.is_empty()
            && !same_create_text(self, to)
        {
            return Err(UnsupportedDiff::new(
                &to.name,
                UnsupportedReason::UnhandledDifference,
            ));
        }

        debug!(table = %to.name, clauses = clauses.len(), "computed table diff");
        Ok(clauses)
    }

    // ---- columns ----

    fn diff_columns(&self, to: &Table, clauses: &mut Vec<TableAlterClause>) -> DiffResult<()> {
        for column in &self.columns {
            if to.find_column(&column.name).is_none() {
                clauses.push(TableAlterClause::DropColumn {
                    column: column.clone(),
                });
            }
        }

        let current: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| to.find_column(&c.name).is_some())
            .map(|c| c.name.as_str())
            .collect();
        let target: Vec<&str> = to
            .columns
            .iter()
            .filter(|c| self.find_column(&c.name).is_some())
            .map(|c| c.name.as_str())
            .collect();
        let moves = plan_column_moves(&current, &target).ok_or_else(|| {
            UnsupportedDiff::new(&to.name, UnsupportedReason::ReorderDidNotConverge)
        })?;
        let moved: HashSet<&str> = moves.iter().map(|(name, _)| name.as_str()).collect();

        for new in &to.columns {
            if let Some(old) = self.find_column(&new.name) {
                if old != new && !moved.contains(new.name.as_str()) {
                    clauses.push(TableAlterClause::ModifyColumn {
                        old: old.clone(),
                        new: new.clone(),
                        position: None,
                    });
                }
            }
        }
        for (name, position) in moves {
            if let (Some(old), Some(new)) = (self.find_column(&name), to.find_column(&name)) {
                clauses.push(TableAlterClause::ModifyColumn {
                    old: old.clone(),
                    new: new.clone(),
                    position: Some(position),
                });
            }
        }

        for (i, column) in to.columns.iter().enumerate() {
            if self.find_column(&column.name).is_some() {
                continue;
            }
            let only_new_columns_follow = to.columns[i..]
                .iter()
                .all(|c| self.find_column(&c.name).is_none());
            let position = if only_new_columns_follow {
                None
            } else if i == 0 {
                Some(ColumnPosition::First)
            } else {
                Some(ColumnPosition::After(to.columns[i - 1].name.clone()))
            };
            clauses.push(TableAlterClause::AddColumn {
                column: column.clone(),
                position,
            });
        }
        Ok(())
    }

    // ---- indexes ----

    fn diff_indexes(&self, to: &Table, clauses: &mut Vec<TableAlterClause>) {
        if self.primary_key != to.primary_key {
            if let Some(pk) = &self.primary_key {
                clauses.push(TableAlterClause::DropIndex {
                    index: pk.clone(),
                    reorder_only: false,
                });
            }
            if let Some(pk) = &to.primary_key {
                clauses.push(TableAlterClause::AddIndex {
                    index: pk.clone(),
                    reorder_only: false,
                });
            }
        }

        for index in &self.secondary_indexes {
            if to.find_index(&index.name).is_none() {
                clauses.push(TableAlterClause::DropIndex {
                    index: index.clone(),
                    reorder_only: false,
                });
            }
        }

        // Unchanged indexes keep their relative order only while nothing has
        // been appended; new indexes always land at the end of the list.
        let unchanged: Vec<&str> = self
            .secondary_indexes
            .iter()
            .filter(|i| to.find_index(&i.name) == Some(*i))
            .map(|i| i.name.as_str())
            .collect();
        let mut cursor = 0;
        let mut appended = false;
        for index in &to.secondary_indexes {
            match self.find_index(&index.name) {
                None => {
                    clauses.push(TableAlterClause::AddIndex {
                        index: index.clone(),
                        reorder_only: false,
                    });
                    appended = true;
                }
                Some(old) if old != index => {
                    clauses.push(TableAlterClause::DropIndex {
                        index: old.clone(),
                        reorder_only: false,
                    });
                    clauses.push(TableAlterClause::AddIndex {
                        index: index.clone(),
                        reorder_only: false,
                    });
                    appended = true;
                }
                Some(_) => {
                    if !appended && unchanged.get(cursor) == Some(&index.name.as_str()) {
                        cursor += 1;
                        continue;
                    }
                    clauses.push(TableAlterClause::DropIndex {
                        index: index.clone(),
                        reorder_only: true,
                    });
                    clauses.push(TableAlterClause::AddIndex {
                        index: index.clone(),
                        reorder_only: true,
                    });
                    appended = true;
                }
            }
        }
    }

    // ---- foreign keys ----

    fn diff_foreign_keys(&self, to: &Table, clauses: &mut Vec<TableAlterClause>) {
        for fk in &self.foreign_keys {
            match to.find_foreign_key(&fk.name) {
                None => clauses.push(TableAlterClause::DropForeignKey {
                    foreign_key: fk.clone(),
                    rename_only: has_renamed_twin(fk, to, self),
                }),
                Some(new) if new != fk => clauses.push(TableAlterClause::DropForeignKey {
                    foreign_key: fk.clone(),
                    rename_only: false,
                }),
                Some(_) => {}
            }
        }
        for fk in &to.foreign_keys {
            match self.find_foreign_key(&fk.name) {
                None => clauses.push(TableAlterClause::AddForeignKey {
                    foreign_key: fk.clone(),
                    rename_only: has_renamed_twin(fk, self, to),
                }),
                Some(old) if old != fk => clauses.push(TableAlterClause::AddForeignKey {
                    foreign_key: fk.clone(),
                    rename_only: false,
                }),
                Some(_) => {}
            }
        }
    }

    // ---- partitioning ----

    fn diff_partitioning(&self, to: &Table, clauses: &mut Vec<TableAlterClause>) -> DiffResult<()> {
        let (from_parts, to_parts) = match (&self.partitioning, &to.partitioning) {
            (None, None) => return Ok(()),
            (None, Some(p)) => {
                clauses.push(TableAlterClause::PartitionBy {
                    partitioning: p.clone(),
                });
                return Ok(());
            }
            (Some(_), None) => {
                clauses.push(TableAlterClause::RemovePartitioning);
                return Ok(());
            }
            (Some(a), Some(b)) => (a, b),
        };

        if from_parts.method != to_parts.method
            || from_parts.expression != to_parts.expression
            || from_parts.sub_method != to_parts.sub_method
            || from_parts.sub_expression != to_parts.sub_expression
        {
            clauses.push(TableAlterClause::PartitionBy {
                partitioning: to_parts.clone(),
            });
            return Ok(());
        }
        if from_parts.partitions == to_parts.partitions {
            return Ok(());
        }
        let unsupported = || UnsupportedDiff::new(&to.name, UnsupportedReason::PartitionChange);
        if !from_parts.supports_list_diff() {
            return Err(unsupported());
        }

        let to_names: HashSet<&str> = to_parts.partitions.iter().map(|p| p.name.as_str()).collect();
        let (kept, dropped): (Vec<_>, Vec<_>) = from_parts
            .partitions
            .iter()
            .partition(|p| to_names.contains(p.name.as_str()));
        let kept_match = kept.len() <= to_parts.partitions.len()
            && kept
                .iter()
                .zip(&to_parts.partitions)
                .all(|(old, new)| *old == new);
        if !kept_match {
            return Err(unsupported());
        }

        if !dropped.is_empty() {
            clauses.push(TableAlterClause::ModifyPartitions(PartitionListChange::Drop(
                dropped.iter().map(|p| p.name.clone()).collect(),
            )));
        }
        let added = &to_parts.partitions[kept.len()..];
        if !added.is_empty() {
            clauses.push(TableAlterClause::ModifyPartitions(PartitionListChange::Add {
                partitioning: to_parts.clone(),
                partitions: added.to_vec(),
            }));
        }
        Ok(())
    }
}

/// Compares the literal CREATE statements past the table name, which may
/// differ in case when names are matched case-insensitively.
fn same_create_text(a: &Table, b: &Table) -> bool {
    a.create_body() == b.create_body()
}

/// Whether `fk`, missing by name on `other`, has an equivalent constraint on
/// `other` under a name that `own` does not use.
fn has_renamed_twin(fk: &ForeignKey, other: &Table, own: &Table) -> bool {
    other.foreign_keys.iter().any(|candidate| {
        candidate.name != fk.name
            && own.find_foreign_key(&candidate.name).is_none()
            && candidate.equivalent(fk)
    })
}

/// Plans the column moves that turn the order `current` into `target`.
///
/// Both slices must hold the same names. Each step moves the column whose
/// distance from its target index is largest (ties go to the column with the
/// smaller target index) and records where it lands as `FIRST` or
/// `AFTER <column>`. Every such move strictly lowers the total displacement,
/// so the loop ends; `None` is returned only if it somehow exceeds `n²` steps
/// or the inputs disagree.
#[must_use]
pub fn plan_column_moves(current: &[&str], target: &[&str]) -> Option<Vec<(String, ColumnPosition)>> {
    if current.len() != target.len() {
        return None;
    }
    let target_pos: HashMap<&str, usize> =
        target.iter().enumerate().map(|(i, name)| (*name, i)).collect();
    let mut order: Vec<&str> = current.to_vec();
    let mut moves = Vec::new();
    let limit = order.len() * order.len();

    for _ in 0..=limit {
        if order == target {
            return Some(moves);
        }
        let mut best: Option<(usize, usize)> = None;
        for (pos, name) in order.iter().enumerate() {
            let want = *target_pos.get(name)?;
            let better = match best {
                None => true,
                Some((best_pos, best_want)) => {
                    let (dist, best_dist) = (pos.abs_diff(want), best_pos.abs_diff(best_want));
                    dist > best_dist || (dist == best_dist && want < best_want)
                }
            };
            if better {
                best = Some((pos, want));
            }
        }
        let (from, to) = best?;
        let name = order.remove(from);
        order.insert(to, name);
        let position = if to == 0 {
            ColumnPosition::First
        } else {
            ColumnPosition::After(order[to - 1].to_string())
        };
        moves.push((name.to_string(), position));
    }
    None
}
