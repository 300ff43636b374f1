//! Property tests for column reordering: whatever the permutation, the planned
//! moves must reproduce the target order.

mod common;

use common::*;
use proptest::prelude::*;
use schemadelta_core::prelude::*;
use schemadelta_core::table_diff::plan_column_moves;

fn permutation() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
    (1..=12usize).prop_flat_map(|n| {
        let names: Vec<String> = (0..n).map(|i| format!("c{i}")).collect();
        (Just(names.clone()), Just(names).prop_shuffle())
    })
}

fn with_columns(names: &[String]) -> Table {
    names
        .iter()
        .fold(table("t"), |t, name| t.column(col(name, "int(11)")))
}

proptest! {
    #[test]
    fn test_planned_moves_reach_target((current, target) in permutation()) {
        let current_refs: Vec<&str> = current.iter().map(String::as_str).collect();
        let target_refs: Vec<&str> = target.iter().map(String::as_str).collect();
        let moves = plan_column_moves(&current_refs, &target_refs);
        prop_assert!(moves.is_some());
        let moves = moves.unwrap_or_default();
        prop_assert!(moves.len() <= current.len() * current.len());
        if current == target {
            prop_assert!(moves.is_empty());
        }

        let mut order = current.clone();
        for (name, position) in &moves {
            order.retain(|n| n != name);
            let at = match position {
                ColumnPosition::First => 0,
                ColumnPosition::After(prev) => order.iter().position(|n| n == prev).map_or(order.len(), |i| i + 1),
            };
            order.insert(at, name.clone());
        }
        prop_assert_eq!(order, target);
    }

    #[test]
    fn test_alter_clauses_reproduce_order((current, target) in permutation()) {
        let from = with_columns(&current);
        let to = with_columns(&target);
        let clauses = from.diff(&to);
        prop_assert!(clauses.is_ok());
        let clauses = clauses.unwrap_or_default();
        prop_assert_eq!(apply_column_clauses(current.clone(), &clauses), target.clone());
        let all_moves = clauses.iter().all(|c| matches!(
            c,
            TableAlterClause::ModifyColumn { position: Some(_), .. }
        ));
        prop_assert!(all_moves);
    }

    #[test]
    fn test_reorder_with_drops_and_adds(
        (current, target) in permutation(),
        dropped in prop::collection::vec(any::<bool>(), 12),
        added in 0..3usize,
    ) {
        let kept: Vec<String> = target
            .iter()
            .zip(&dropped)
            .filter(|(_, drop)| !**drop)
            .map(|(name, _)| name.clone())
            .collect();
        let mut wanted = kept;
        for i in 0..added {
            wanted.insert((i * 2).min(wanted.len()), format!("new{i}"));
        }
        prop_assume!(!wanted.is_empty());

        let from = with_columns(&current);
        let to = with_columns(&wanted);
        let clauses = from.diff(&to);
        prop_assert!(clauses.is_ok());
        let clauses = clauses.unwrap_or_default();
        prop_assert_eq!(apply_column_clauses(current.clone(), &clauses), wanted);
    }
}
