//! Table model and the `CREATE TABLE` renderer.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::column::Column;
use crate::ddl::{escape_identifier, quote_value};
use crate::flavor::Flavor;
use crate::foreign_key::ForeignKey;
use crate::index::Index;
use crate::partition::TablePartitioning;

static AUTO_INC_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(\) ENGINE=[^\n]*?) AUTO_INCREMENT=(\d+)").expect("valid regex")
});

/// A table snapshot.
///
/// The structured fields and the literal `create_statement` describe the same
/// table. [`Table::reconcile`] checks that they agree and sets
/// `unsupported_ddl` when they do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Storage engine.
    pub engine: String,
    /// Default character set.
    pub charset: String,
    /// Default collation.
    pub collation: String,
    /// Whether `collation` is the default collation of `charset`.
    pub collation_is_default: bool,
    /// Extra table options as shown in `SHOW CREATE TABLE`, e.g.
    /// `ROW_FORMAT=COMPRESSED KEY_BLOCK_SIZE=8`.
    pub create_options: String,
    /// Columns in table order.
    pub columns: Vec<Column>,
    /// Primary key, if any.
    pub primary_key: Option<Index>,
    /// Secondary indexes in `SHOW CREATE TABLE` order.
    pub secondary_indexes: Vec<Index>,
    /// Foreign keys in `SHOW CREATE TABLE` order.
    pub foreign_keys: Vec<ForeignKey>,
    /// Table comment, unescaped.
    pub comment: String,
    /// Next AUTO_INCREMENT value; 0 when the table has no auto-increment
    /// column.
    pub next_auto_increment: u64,
    /// Partitioning, if any.
    pub partitioning: Option<TablePartitioning>,
    /// Set when the renderer cannot reproduce `create_statement`.
    pub unsupported_ddl: bool,
    /// The server's literal `SHOW CREATE TABLE` output. Empty for tables that
    /// were built in code and never reconciled.
    pub create_statement: String,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        engine: impl Into<String>,
        charset: impl Into<String>,
        collation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            engine: engine.into(),
            charset: charset.into(),
            collation: collation.into(),
            collation_is_default: true,
            create_options: String::new(),
            columns: Vec::new(),
            primary_key: None,
            secondary_indexes: Vec::new(),
            foreign_keys: Vec::new(),
            comment: String::new(),
            next_auto_increment: 0,
            partitioning: None,
            unsupported_ddl: false,
            create_statement: String::new(),
        }
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        if column.auto_increment && self.next_auto_increment == 0 {
            self.next_auto_increment = 1;
        }
        self.columns.push(column);
        self
    }

    /// Sets the primary key.
    #[must_use]
    pub fn primary_key(mut self, index: Index) -> Self {
        self.primary_key = Some(index);
        self
    }

    /// Appends a secondary index.
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.secondary_indexes.push(index);
        self
    }

    /// Appends a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Marks the table collation as non-default for its character set.
    #[must_use]
    pub fn non_default_collation(mut self) -> Self {
        self.collation_is_default = false;
        self
    }

    /// Sets the table options string.
    #[must_use]
    pub fn create_options(mut self, options: impl Into<String>) -> Self {
        self.create_options = options.into();
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Sets the next AUTO_INCREMENT value.
    #[must_use]
    pub fn next_auto_increment(mut self, value: u64) -> Self {
        self.next_auto_increment = value;
        self
    }

    /// Sets the partitioning scheme.
    #[must_use]
    pub fn partitioning(mut self, partitioning: TablePartitioning) -> Self {
        self.partitioning = Some(partitioning);
        self
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up a secondary index by name.
    #[must_use]
    pub fn find_index(&self, name: &str) -> Option<&Index> {
        self.secondary_indexes.iter().find(|i| i.name == name)
    }

    /// Looks up a foreign key by name.
    #[must_use]
    pub fn find_foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.name == name)
    }

    /// Whether any column is AUTO_INCREMENT.
    #[must_use]
    pub fn has_auto_increment(&self) -> bool {
        self.columns.iter().any(|c| c.auto_increment)
    }

    /// Renders the table the way `SHOW CREATE TABLE` would on `flavor`.
    #[must_use]
    pub fn generated_create_statement(&self, flavor: Flavor) -> String {
        let mut defs: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.definition(flavor, self))
            .collect();
        if let Some(pk) = &self.primary_key {
            defs.push(pk.definition());
        }
        defs.extend(self.secondary_indexes.iter().map(Index::definition));
        defs.extend(self.foreign_keys.iter().map(ForeignKey::definition));

        let mut stmt = format!(
            "CREATE TABLE {} (\n  {}\n) ENGINE={}",
            escape_identifier(&self.name),
            defs.join(",\n  "),
            self.engine
        );
        if self.next_auto_increment > 1 && self.has_auto_increment() {
            stmt.push_str(&format!(" AUTO_INCREMENT={}", self.next_auto_increment));
        }
        stmt.push_str(" DEFAULT CHARSET=");
        stmt.push_str(&self.charset);
        if !self.collation_is_default || flavor.always_show_table_collation(&self.charset) {
            stmt.push_str(" COLLATE=");
            stmt.push_str(&self.collation);
        }
        if !self.create_options.is_empty() {
            stmt.push(' ');
            stmt.push_str(&self.create_options);
        }
        if !self.comment.is_empty() {
            stmt.push_str(" COMMENT=");
            stmt.push_str(&quote_value(&self.comment));
        }
        if let Some(partitioning) = &self.partitioning {
            stmt.push('\n');
            stmt.push_str(&partitioning.definition(flavor, &self.engine));
        }
        stmt
    }

    /// Records the server's literal `CREATE TABLE` text and checks it against
    /// the renderer.
    ///
    /// The AUTO_INCREMENT value is taken from the literal text, which is more
    /// current than `information_schema` on some servers.
    pub fn reconcile(&mut self, create_statement: impl Into<String>, flavor: Flavor) {
        self.create_statement = create_statement.into();
        let (_, next) = parse_create_auto_inc(&self.create_statement);
        self.next_auto_increment = if self.has_auto_increment() {
            next.max(1)
        } else {
            0
        };
        self.unsupported_ddl = self.generated_create_statement(flavor) != self.create_statement;
        if self.unsupported_ddl {
            tracing::debug!(table = %self.name, "generated CREATE TABLE does not match server output");
        }
    }

    /// Returns the literal statement, or the generated one for tables that
    /// were never reconciled.
    #[must_use]
    pub fn create_statement_for(&self, flavor: Flavor) -> String {
        if self.create_statement.is_empty() {
            self.generated_create_statement(flavor)
        } else {
            self.create_statement.clone()
        }
    }

    /// The literal statement without its leading `CREATE TABLE <name>`.
    pub(crate) fn create_body(&self) -> &str {
        let head = format!("CREATE TABLE {}", escape_identifier(&self.name));
        self.create_statement
            .strip_prefix(head.as_str())
            .unwrap_or(&self.create_statement)
    }

    /// Lists secondary indexes made unnecessary by the primary key or by
    /// another secondary index. Of two identical indexes only the later one
    /// is listed.
    #[must_use]
    pub fn redundant_indexes(&self) -> Vec<&Index> {
        self.secondary_indexes
            .iter()
            .enumerate()
            .filter(|(i, index)| {
                if self
                    .primary_key
                    .as_ref()
                    .is_some_and(|pk| index.redundant_to(pk))
                {
                    return true;
                }
                self.secondary_indexes
                    .iter()
                    .enumerate()
                    .any(|(j, other)| {
                        j != *i && index.redundant_to(other) && !(j > *i && other.redundant_to(index))
                    })
            })
            .map(|(_, index)| index)
            .collect()
    }
}

/// Strips the table-level `AUTO_INCREMENT=<n>` option from a `CREATE TABLE`
/// statement, returning the stripped text and `n` (0 when absent).
#[must_use]
pub fn parse_create_auto_inc(create_statement: &str) -> (String, u64) {
    let Some(caps) = AUTO_INC_CLAUSE.captures(create_statement) else {
        return (create_statement.to_string(), 0);
    };
    let value = caps[2].parse().unwrap_or(0);
    let stripped = AUTO_INC_CLAUSE.replace(create_statement, "$1").into_owned();
    (stripped, value)
}
