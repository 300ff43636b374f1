//! Schema (database) model.

use serde::{Deserialize, Serialize};

use crate::ddl::escape_identifier;
use crate::table::Table;

/// How table names are matched when two schemas are compared.
///
/// Servers with `lower_case_table_names` set to 1 or 2 treat table names
/// case-insensitively; the caller picks the policy matching the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TableNameMatching {
    /// `Users` and `users` are different tables.
    #[default]
    CaseSensitive,
    /// `Users` and `users` are the same table.
    CaseInsensitive,
}

impl TableNameMatching {
    /// Derives the policy from the server's `lower_case_table_names` value.
    #[must_use]
    pub fn from_lower_case_table_names(value: u8) -> Self {
        if value == 0 {
            Self::CaseSensitive
        } else {
            Self::CaseInsensitive
        }
    }

    /// Whether two table names refer to the same table.
    #[must_use]
    pub fn matches(&self, a: &str, b: &str) -> bool {
        match self {
            Self::CaseSensitive => a == b,
            Self::CaseInsensitive => a.eq_ignore_ascii_case(b),
        }
    }
}

/// A fully populated schema snapshot.
///
/// A `Schema` owns its tables and holds no connection, so it can be diffed
/// long after the server it came from is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema name.
    pub name: String,
    /// Default character set.
    pub charset: String,
    /// Default collation.
    pub collation: String,
    /// Tables, in name order when introspected.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        charset: impl Into<String>,
        collation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            charset: charset.into(),
            collation: collation.into(),
            tables: Vec::new(),
        }
    }

    /// Appends a table.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Looks up a table by name using the given matching policy.
    #[must_use]
    pub fn find_table(&self, name: &str, matching: TableNameMatching) -> Option<&Table> {
        self.tables.iter().find(|t| matching.matches(&t.name, name))
    }

    /// Tables the renderer cannot reproduce.
    #[must_use]
    pub fn unsupported_tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter(|t| t.unsupported_ddl)
    }

    /// `CREATE DATABASE` statement for this schema.
    #[must_use]
    pub fn create_statement(&self) -> String {
        let mut stmt = format!("CREATE DATABASE {}", escape_identifier(&self.name));
        if !self.charset.is_empty() {
            stmt.push_str(" CHARACTER SET ");
            stmt.push_str(&self.charset);
        }
        if !self.collation.is_empty() {
            stmt.push_str(" COLLATE ");
            stmt.push_str(&self.collation);
        }
        stmt
    }

    /// `DROP DATABASE` statement for this schema.
    #[must_use]
    pub fn drop_statement(&self) -> String {
        format!("DROP DATABASE {}", escape_identifier(&self.name))
    }

    /// `ALTER DATABASE` statement turning this schema's defaults into
    /// `charset`/`collation`, or the empty string if nothing changes.
    ///
    /// A collation change within the same character set omits the
    /// CHARACTER SET clause.
    #[must_use]
    pub fn alter_statement(&self, charset: &str, collation: &str) -> String {
        let mut clauses = Vec::new();
        if self.charset != charset {
            clauses.push(format!("CHARACTER SET {charset}"));
            if !collation.is_empty() {
                clauses.push(format!("COLLATE {collation}"));
            }
        } else if self.collation != collation {
            clauses.push(format!("COLLATE {collation}"));
        }
        if clauses.is_empty() {
            return String::new();
        }
        format!(
            "ALTER DATABASE {} {}",
            escape_identifier(&self.name),
            clauses.join(" ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_drop() {
        let s = Schema::new("s1", "latin1", "latin1_swedish_ci");
        assert_eq!(
            s.create_statement(),
            "CREATE DATABASE `s1` CHARACTER SET latin1 COLLATE latin1_swedish_ci"
        );
        assert_eq!(s.drop_statement(), "DROP DATABASE `s1`");
    }

    #[test]
    fn test_alter_statement() {
        let s = Schema::new("s1", "latin1", "latin1_swedish_ci");
        assert_eq!(s.alter_statement("latin1", "latin1_swedish_ci"), "");
        assert_eq!(
            s.alter_statement("latin1", "latin1_bin"),
            "ALTER DATABASE `s1` COLLATE latin1_bin"
        );
        assert_eq!(
            s.alter_statement("utf8mb4", "utf8mb4_general_ci"),
            "ALTER DATABASE `s1` CHARACTER SET utf8mb4 COLLATE utf8mb4_general_ci"
        );
    }

    #[test]
    fn test_find_table_matching() {
        let s = Schema::new("s", "latin1", "latin1_swedish_ci").table(Table::new(
            "Users",
            "InnoDB",
            "latin1",
            "latin1_swedish_ci",
        ));
        assert!(s.find_table("users", TableNameMatching::CaseSensitive).is_none());
        assert!(s.find_table("users", TableNameMatching::CaseInsensitive).is_some());
        assert_eq!(
            TableNameMatching::from_lower_case_table_names(2),
            TableNameMatching::CaseInsensitive
        );
    }
}
