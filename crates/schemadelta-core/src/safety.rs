//! Classifies column type changes that may lose or truncate data.
//!
//! The rules are evaluated in order and the first match decides. Anything
//! that no rule recognizes is unsafe.

use crate::column::Column;
use crate::ddl::{base_type, strip_int_display_width, type_args};

const INT_RANKS: [&str; 5] = ["tinyint", "smallint", "mediumint", "int", "bigint"];
const BLOB_RANKS: [&str; 4] = ["tinyblob", "blob", "mediumblob", "longblob"];
const TEXT_RANKS: [&str; 4] = ["tinytext", "text", "mediumtext", "longtext"];

/// Whether changing `old` into `new` risks data loss.
#[must_use]
pub fn modify_column_is_unsafe(old: &Column, new: &Column) -> bool {
    if old.charset != new.charset {
        return true;
    }
    type_change_is_unsafe(&old.type_in_db, &new.type_in_db)
}

/// Whether changing a column type from `old` to `new` risks data loss.
#[must_use]
pub fn type_change_is_unsafe(old: &str, new: &str) -> bool {
    let old = strip_int_display_width(&old.to_ascii_lowercase());
    let new = strip_int_display_width(&new.to_ascii_lowercase());
    if old == new {
        return false;
    }
    if old.contains(" unsigned") != new.contains(" unsigned") {
        return true;
    }

    let (old_base, new_base) = (base_type(&old), base_type(&new));
    match (old_base, new_base) {
        ("enum", "enum") | ("set", "set") => {
            let (Some(old_list), Some(new_list)) = (type_args(&old), type_args(&new)) else {
                return true;
            };
            !(old_list == new_list || new_list.starts_with(&format!("{old_list},")))
        }
        ("decimal" | "numeric", "decimal" | "numeric") => {
            let old_ps = decimal_precision(&old);
            let new_ps = decimal_precision(&new);
            narrows(old_ps, new_ps)
        }
        ("varchar", "varchar") | ("varbinary", "varbinary") => {
            match (single_arg(&old), single_arg(&new)) {
                (Some(old_len), Some(new_len)) => new_len < old_len,
                _ => true,
            }
        }
        ("time", "time") | ("timestamp", "timestamp") | ("datetime", "datetime") => {
            match (single_arg(&old), single_arg(&new)) {
                (None | Some(0), _) => false,
                (Some(_), None) => true,
                (Some(old_fsp), Some(new_fsp)) => new_fsp < old_fsp,
            }
        }
        ("double", "float") => true,
        ("float" | "double", "float" | "double") => {
            match (float_precision(&old), float_precision(&new)) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(old_ps), Some(new_ps)) => narrows(old_ps, new_ps),
            }
        }
        _ => {
            let ranked = [&INT_RANKS[..], &BLOB_RANKS[..], &TEXT_RANKS[..]];
            for family in ranked {
                let old_rank = family.iter().position(|t| *t == old_base);
                let new_rank = family.iter().position(|t| *t == new_base);
                if let (Some(o), Some(n)) = (old_rank, new_rank) {
                    return n < o;
                }
            }
            true
        }
    }
}

fn narrows(old: (u32, u32), new: (u32, u32)) -> bool {
    new.0 < old.0 || new.1 < old.1
}

fn single_arg(type_in_db: &str) -> Option<u32> {
    type_args(type_in_db)?.trim().parse().ok()
}

fn two_args(type_in_db: &str) -> Option<(u32, Option<u32>)> {
    let args = type_args(type_in_db)?;
    let mut parts = args.split(',').map(str::trim);
    let precision = parts.next()?.parse().ok()?;
    let scale = parts.next().and_then(|s| s.parse().ok());
    Some((precision, scale))
}

fn decimal_precision(type_in_db: &str) -> (u32, u32) {
    match two_args(type_in_db) {
        Some((p, s)) => (p, s.unwrap_or(0)),
        None => (10, 0),
    }
}

fn float_precision(type_in_db: &str) -> Option<(u32, u32)> {
    two_args(type_in_db).map(|(p, s)| (p, s.unwrap_or(0)))
}
