//! Schema introspection through `information_schema` and
//! `SHOW CREATE TABLE`.
//!
//! Structured metadata comes from a handful of per-schema queries. The
//! literal CREATE statements are fetched in parallel and used to order
//! indexes and foreign keys the way the server prints them, then every table
//! is reconciled against its own literal text.

use std::collections::HashMap;
use std::future::Future;

use schemadelta_core::ddl::escape_identifier;
use schemadelta_core::{
    Column, ColumnDefault, Flavor, ForeignKey, Index, IndexKind, IndexPart, Introspect, Partition,
    ReferentialAction, Schema, Table, TablePartitioning,
};
use sqlx::mysql::MySqlRow;
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::error::{InstanceError, Result};
use crate::fanout::bounded_fan_out;
use crate::instance::{show_create_table, Instance, SchemaRef};

const TABLES_SQL: &str = "\
    SELECT t.table_name AS table_name, t.engine AS engine, \
           t.auto_increment AS auto_increment, t.table_collation AS collation, \
           t.create_options AS create_options, t.table_comment AS comment, \
           c.character_set_name AS charset, c.is_default AS is_default \
    FROM information_schema.tables t \
    JOIN information_schema.collations c ON c.collation_name = t.table_collation \
    WHERE t.table_schema = ? AND t.table_type = 'BASE TABLE' \
    ORDER BY t.table_name";

const COLUMNS_SQL: &str = "\
    SELECT c.table_name AS table_name, c.column_name AS column_name, \
           c.column_type AS column_type, c.is_nullable AS is_nullable, \
           c.column_default AS column_default, c.extra AS extra, \
           c.character_set_name AS charset, c.collation_name AS collation, \
           co.is_default AS collation_is_default, c.column_comment AS comment \
    FROM information_schema.columns c \
    LEFT JOIN information_schema.collations co ON co.collation_name = c.collation_name \
    WHERE c.table_schema = ? \
    ORDER BY c.table_name, c.ordinal_position";

const INDEXES_SQL: &str = "\
    SELECT table_name AS table_name, index_name AS index_name, \
           CAST(non_unique AS SIGNED) AS non_unique, column_name AS column_name, \
           CAST(sub_part AS SIGNED) AS sub_part, index_type AS index_type, \
           index_comment AS comment \
    FROM information_schema.statistics \
    WHERE table_schema = ? \
    ORDER BY table_name, index_name, seq_in_index";

const FOREIGN_KEYS_SQL: &str = "\
    SELECT rc.table_name AS table_name, rc.constraint_name AS name, \
           rc.update_rule AS update_rule, rc.delete_rule AS delete_rule, \
           kcu.column_name AS column_name, \
           kcu.referenced_table_schema AS referenced_schema, \
           kcu.referenced_table_name AS referenced_table, \
           kcu.referenced_column_name AS referenced_column \
    FROM information_schema.referential_constraints rc \
    JOIN information_schema.key_column_usage kcu \
      ON kcu.constraint_schema = rc.constraint_schema \
     AND kcu.table_name = rc.table_name \
     AND kcu.constraint_name = rc.constraint_name \
    WHERE rc.constraint_schema = ? \
    ORDER BY rc.table_name, rc.constraint_name, kcu.ordinal_position";

const PARTITIONS_SQL: &str = "\
    SELECT table_name AS table_name, partition_name AS name, \
           partition_method AS method, subpartition_method AS sub_method, \
           partition_expression AS expression, subpartition_expression AS sub_expression, \
           partition_description AS description, partition_comment AS comment, \
           subpartition_name AS sub_name \
    FROM information_schema.partitions \
    WHERE table_schema = ? AND partition_name IS NOT NULL \
    ORDER BY table_name, partition_ordinal_position, subpartition_ordinal_position";

/// Reads a text column, tolerating servers that report it as binary.
pub(crate) fn row_string(row: &MySqlRow, column: &str) -> String {
    row_opt_string(row, column).unwrap_or_default()
}

/// Reads a nullable text column, tolerating servers that report it as
/// binary.
pub(crate) fn row_opt_string(row: &MySqlRow, column: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .or_else(|| {
            row.try_get::<Option<Vec<u8>>, _>(column)
                .ok()
                .flatten()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
}

/// Reads a text column by position.
pub(crate) fn row_string_at(row: &MySqlRow, index: usize) -> String {
    row.try_get::<String, _>(index)
        .ok()
        .or_else(|| {
            row.try_get::<Vec<u8>, _>(index)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
        .unwrap_or_default()
}

/// Reads an integer column that may be signed or unsigned depending on the
/// server version.
fn row_u64(row: &MySqlRow, column: &str) -> Option<u64> {
    if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(column) {
        return Some(v);
    }
    row.try_get::<Option<i64>, _>(column)
        .ok()
        .flatten()
        .and_then(|v| u64::try_from(v).ok())
}

/// Normalizes `information_schema.TABLES.CREATE_OPTIONS` to the spelling
/// `SHOW CREATE TABLE` uses: upper-case option names, no `partitioned` flag.
pub(crate) fn normalize_create_options(raw: &str) -> String {
    raw.split_whitespace()
        .filter(|opt| !opt.eq_ignore_ascii_case("partitioned"))
        .map(|opt| match opt.split_once('=') {
            Some((key, value)) => format!("{}={value}", key.to_ascii_uppercase()),
            None => opt.to_ascii_uppercase(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Interprets `COLUMN_DEFAULT`, whose encoding depends on the flavor.
///
/// MariaDB 10.2+ quotes literal defaults and reports `NULL` as text; MySQL
/// reports the bare value and flags expressions in `EXTRA`.
pub(crate) fn parse_default(
    raw: Option<&str>,
    nullable: bool,
    type_in_db: &str,
    extra: &str,
    flavor: Flavor,
) -> ColumnDefault {
    let Some(raw) = raw else {
        return if nullable {
            ColumnDefault::Null
        } else {
            ColumnDefault::Forbidden
        };
    };

    if flavor.min_mariadb(10, 2, 0) {
        if raw.eq_ignore_ascii_case("null") {
            return ColumnDefault::Null;
        }
        if let Some(inner) = raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
            return ColumnDefault::Value(unquote_mariadb(inner));
        }
        return ColumnDefault::expression(raw);
    }

    let lower_type = type_in_db.to_ascii_lowercase();
    let temporal = lower_type.starts_with("timestamp") || lower_type.starts_with("datetime");
    if extra.to_ascii_uppercase().contains("DEFAULT_GENERATED")
        || (temporal && raw.to_ascii_uppercase().starts_with("CURRENT_TIMESTAMP"))
        || (lower_type.starts_with("bit") && raw.starts_with("b'"))
    {
        return ColumnDefault::expression(raw);
    }
    ColumnDefault::Value(raw.to_string())
}

fn unquote_mariadb(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                out.push('\'');
            }
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some('Z') => out.push('\u{1a}'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            other => out.push(other),
        }
    }
    out
}

/// Extracts the ON UPDATE expression from `EXTRA`.
pub(crate) fn parse_on_update(extra: &str) -> Option<String> {
    let lower = extra.to_ascii_lowercase();
    let start = lower.find("on update ")? + "on update ".len();
    let expr = extra[start..].split_whitespace().next()?;
    Some(expr.to_string())
}

fn build_column(row: &MySqlRow, flavor: Flavor) -> Column {
    let name = row_string(row, "column_name");
    let type_in_db = row_string(row, "column_type");
    let nullable = row_string(row, "is_nullable").eq_ignore_ascii_case("yes");
    let extra = row_string(row, "extra");
    let raw_default = row_opt_string(row, "column_default");

    let mut column = Column::new(name, type_in_db.clone());
    column.nullable = nullable;
    if extra.to_ascii_lowercase().contains("auto_increment") {
        column.auto_increment = true;
        column.default = ColumnDefault::Forbidden;
    } else {
        column.default = parse_default(raw_default.as_deref(), nullable, &type_in_db, &extra, flavor);
    }
    if let Some(expr) = parse_on_update(&extra) {
        column = column.on_update(&expr);
    }
    if let (Some(charset), Some(collation)) = (
        row_opt_string(row, "charset"),
        row_opt_string(row, "collation"),
    ) {
        let is_default = row_string(row, "collation_is_default").eq_ignore_ascii_case("yes");
        column = column.charset(charset, collation, is_default);
    }
    column.comment(row_string(row, "comment"))
}

#[derive(Default)]
struct IndexRows {
    parts: Vec<IndexPart>,
    unique: bool,
    kind: IndexKind,
    comment: String,
}

#[derive(Default)]
struct ForeignKeyRows {
    columns: Vec<String>,
    referenced_schema: String,
    referenced_table: String,
    referenced_columns: Vec<String>,
    update_rule: String,
    delete_rule: String,
}

/// Loads a full schema snapshot.
pub(crate) async fn load_schema(instance: &Instance, schema: &SchemaRef) -> Result<Schema> {
    let flavor = instance.flavor();
    let pool = instance.pool("", &[]).await?;
    let name = schema.name.as_str();
    info!(schema = name, flavor = %flavor, "introspecting schema");

    let table_rows = instance
        .timed("list tables", sqlx::query(TABLES_SQL).bind(name).fetch_all(&pool))
        .await?;
    let column_rows = instance
        .timed("list columns", sqlx::query(COLUMNS_SQL).bind(name).fetch_all(&pool))
        .await?;
    let index_rows = instance
        .timed("list indexes", sqlx::query(INDEXES_SQL).bind(name).fetch_all(&pool))
        .await?;
    let fk_rows = instance
        .timed(
            "list foreign keys",
            sqlx::query(FOREIGN_KEYS_SQL).bind(name).fetch_all(&pool),
        )
        .await?;
    let partition_rows = instance
        .timed(
            "list partitions",
            sqlx::query(PARTITIONS_SQL).bind(name).fetch_all(&pool),
        )
        .await?;

    let mut columns: HashMap<String, Vec<Column>> = HashMap::new();
    for row in &column_rows {
        columns
            .entry(row_string(row, "table_name"))
            .or_default()
            .push(build_column(row, flavor));
    }

    // Keyed by table, then index name in first-seen order.
    let mut indexes: HashMap<String, Vec<(String, IndexRows)>> = HashMap::new();
    for row in &index_rows {
        let table_indexes = indexes.entry(row_string(row, "table_name")).or_default();
        let index_name = row_string(row, "index_name");
        let position = match table_indexes.iter().position(|(n, _)| *n == index_name) {
            Some(p) => p,
            None => {
                let index_type = row_string(row, "index_type").to_ascii_uppercase();
                let kind = match index_type.as_str() {
                    "FULLTEXT" => IndexKind::FullText,
                    "SPATIAL" => IndexKind::Spatial,
                    _ => IndexKind::BTree,
                };
                let entry = IndexRows {
                    unique: row.try_get::<i64, _>("non_unique").unwrap_or(1) == 0,
                    kind,
                    comment: row_string(row, "comment"),
                    ..IndexRows::default()
                };
                table_indexes.push((index_name.clone(), entry));
                table_indexes.len() - 1
            }
        };
        // Functional key parts have no column; the table is flagged by
        // reconciliation since they cannot be rendered.
        if let Some(column) = row_opt_string(row, "column_name") {
            let part = match row_u64(row, "sub_part").and_then(|n| u32::try_from(n).ok()) {
                Some(length) => IndexPart::prefix(column, length),
                None => IndexPart::new(column),
            };
            table_indexes[position].1.parts.push(part);
        }
    }

    let mut foreign_keys: HashMap<String, Vec<(String, ForeignKeyRows)>> = HashMap::new();
    for row in &fk_rows {
        let table_fks = foreign_keys.entry(row_string(row, "table_name")).or_default();
        let fk_name = row_string(row, "name");
        let position = match table_fks.iter().position(|(n, _)| *n == fk_name) {
            Some(p) => p,
            None => {
                let referenced_schema = row_string(row, "referenced_schema");
                let entry = ForeignKeyRows {
                    referenced_schema: if referenced_schema == name {
                        String::new()
                    } else {
                        referenced_schema
                    },
                    referenced_table: row_string(row, "referenced_table"),
                    update_rule: row_string(row, "update_rule"),
                    delete_rule: row_string(row, "delete_rule"),
                    ..ForeignKeyRows::default()
                };
                table_fks.push((fk_name.clone(), entry));
                table_fks.len() - 1
            }
        };
        let entry = &mut table_fks[position].1;
        entry.columns.push(row_string(row, "column_name"));
        entry.referenced_columns.push(row_string(row, "referenced_column"));
    }

    let mut partitionings: HashMap<String, TablePartitioning> = HashMap::new();
    for row in &partition_rows {
        let table_name = row_string(row, "table_name");
        let partition_name = row_string(row, "name");
        let partitioning = partitionings.entry(table_name).or_insert_with(|| {
            let mut p = TablePartitioning::new(
                row_string(row, "method"),
                row_string(row, "expression"),
            );
            p.sub_method = row_string(row, "sub_method");
            p.sub_expression = row_string(row, "sub_expression");
            p
        });
        // One row per subpartition; keep the partition once.
        if partitioning.partitions.iter().any(|p| p.name == partition_name) {
            continue;
        }
        partitioning.partitions.push(
            Partition::new(partition_name, row_string(row, "description"))
                .comment(row_string(row, "comment")),
        );
    }

    let table_names: Vec<String> = table_rows
        .iter()
        .map(|row| row_string(row, "table_name"))
        .collect();
    let timeout = instance.options().query_timeout;
    let schema_name = name.to_string();
    let create_statements = bounded_fan_out(
        table_names,
        instance.options().concurrency,
        move |table: String| {
            let pool = pool.clone();
            let schema = schema_name.clone();
            async move { show_create_table(&pool, timeout, &schema, &table).await }
        },
    )
    .await?;

    let mut tables = Vec::with_capacity(table_rows.len());
    for (row, create_statement) in table_rows.iter().zip(create_statements) {
        let table_name = row_string(row, "table_name");
        let mut table = Table::new(
            table_name.clone(),
            row_string(row, "engine"),
            row_string(row, "charset"),
            row_string(row, "collation"),
        )
        .create_options(normalize_create_options(&row_string(row, "create_options")))
        .comment(row_string(row, "comment"));
        table.collation_is_default = row_string(row, "is_default").eq_ignore_ascii_case("yes");

        for column in columns.remove(&table_name).unwrap_or_default() {
            table = table.column(column);
        }

        let mut secondary = Vec::new();
        for (index_name, rows) in indexes.remove(&table_name).unwrap_or_default() {
            let mut index = Index::with_parts(index_name.clone(), rows.parts)
                .kind(rows.kind)
                .comment(rows.comment);
            if index_name == "PRIMARY" {
                index.primary_key = true;
                index.unique = true;
                table = table.primary_key(index);
                continue;
            }
            if rows.unique {
                index = index.unique();
            }
            secondary.push(index);
        }
        secondary.sort_by_key(|index| {
            create_statement
                .find(&format!("KEY {} (", escape_identifier(&index.name)))
                .unwrap_or(usize::MAX)
        });
        for index in secondary {
            table = table.index(index);
        }

        let mut fks: Vec<ForeignKey> = foreign_keys
            .remove(&table_name)
            .unwrap_or_default()
            .into_iter()
            .map(|(fk_name, rows)| {
                ForeignKey::new(fk_name, rows.columns, rows.referenced_table, rows.referenced_columns)
                    .in_schema(rows.referenced_schema)
                    .on_update(ReferentialAction::from_rule(&rows.update_rule))
                    .on_delete(ReferentialAction::from_rule(&rows.delete_rule))
            })
            .collect();
        fks.sort_by_key(|fk| {
            create_statement
                .find(&format!("CONSTRAINT {} FOREIGN KEY", escape_identifier(&fk.name)))
                .unwrap_or(usize::MAX)
        });
        for fk in fks {
            table = table.foreign_key(fk);
        }

        if let Some(partitioning) = partitionings.remove(&table_name) {
            table = table.partitioning(partitioning);
        }
        table.next_auto_increment = row_u64(row, "auto_increment").unwrap_or(0);
        table.reconcile(create_statement, flavor);
        if table.unsupported_ddl {
            warn!(schema = name, table = %table.name, "table uses unsupported DDL");
        }
        tables.push(table);
    }

    debug!(schema = name, tables = tables.len(), "introspection complete");
    Ok(Schema {
        name: schema.name.clone(),
        charset: schema.charset.clone(),
        collation: schema.collation.clone(),
        tables,
    })
}

impl Introspect for Instance {
    type Error = InstanceError;

    fn flavor(&self) -> Flavor {
        Instance::flavor(self)
    }

    fn schema_names(&self) -> impl Future<Output = Result<Vec<String>>> + Send {
        Instance::schema_names(self)
    }

    fn introspect_schema(&self, name: &str) -> impl Future<Output = Result<Schema>> + Send {
        Instance::load_schema(self, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MYSQL57: Flavor = Flavor::mysql(5, 7, 44);
    const MYSQL80: Flavor = Flavor::mysql(8, 0, 36);
    const MARIADB106: Flavor = Flavor::mariadb(10, 6, 16);

    #[test]
    fn test_normalize_create_options() {
        assert_eq!(
            normalize_create_options("row_format=COMPRESSED KEY_BLOCK_SIZE=8 partitioned"),
            "ROW_FORMAT=COMPRESSED KEY_BLOCK_SIZE=8"
        );
        assert_eq!(normalize_create_options(""), "");
        assert_eq!(normalize_create_options("partitioned"), "");
    }

    #[test]
    fn test_parse_default_mysql() {
        assert_eq!(
            parse_default(None, true, "int(11)", "", MYSQL57),
            ColumnDefault::Null
        );
        assert_eq!(
            parse_default(None, false, "int(11)", "", MYSQL57),
            ColumnDefault::Forbidden
        );
        assert_eq!(
            parse_default(Some("0"), false, "int(11)", "", MYSQL57),
            ColumnDefault::Value("0".into())
        );
        assert_eq!(
            parse_default(Some("CURRENT_TIMESTAMP"), false, "timestamp", "on update CURRENT_TIMESTAMP", MYSQL57),
            ColumnDefault::Expression("CURRENT_TIMESTAMP".into())
        );
        assert_eq!(
            parse_default(Some("rand()"), true, "double", "DEFAULT_GENERATED", MYSQL80),
            ColumnDefault::Expression("rand()".into())
        );
        assert_eq!(
            parse_default(Some("b'101'"), true, "bit(3)", "", MYSQL57),
            ColumnDefault::Expression("b'101'".into())
        );
    }

    #[test]
    fn test_parse_default_mariadb() {
        assert_eq!(
            parse_default(Some("NULL"), true, "int(11)", "", MARIADB106),
            ColumnDefault::Null
        );
        assert_eq!(
            parse_default(Some("'it''s'"), false, "varchar(10)", "", MARIADB106),
            ColumnDefault::Value("it's".into())
        );
        assert_eq!(
            parse_default(Some("current_timestamp()"), false, "timestamp", "", MARIADB106),
            ColumnDefault::Expression("CURRENT_TIMESTAMP".into())
        );
        assert_eq!(
            parse_default(Some("0"), false, "int(11)", "", MARIADB106),
            ColumnDefault::Expression("0".into())
        );
    }

    #[test]
    fn test_parse_on_update() {
        assert_eq!(
            parse_on_update("on update CURRENT_TIMESTAMP"),
            Some("CURRENT_TIMESTAMP".into())
        );
        assert_eq!(
            parse_on_update("DEFAULT_GENERATED on update CURRENT_TIMESTAMP(3)"),
            Some("CURRENT_TIMESTAMP(3)".into())
        );
        assert_eq!(parse_on_update("auto_increment"), None);
    }

    #[test]
    fn test_unquote_mariadb() {
        assert_eq!(unquote_mariadb(r"a\nb"), "a\nb");
        assert_eq!(unquote_mariadb("x''y"), "x'y");
    }
}
