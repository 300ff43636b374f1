//! Foreign key constraints.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ddl::escape_identifier;

/// Referential action for ON DELETE / ON UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReferentialAction {
    /// RESTRICT, the server default. Never shown by `SHOW CREATE TABLE`.
    #[default]
    Restrict,
    /// CASCADE.
    Cascade,
    /// SET NULL.
    SetNull,
    /// NO ACTION.
    NoAction,
    /// SET DEFAULT.
    SetDefault,
}

impl ReferentialAction {
    /// Returns the SQL keyword(s).
    #[must_use]
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::NoAction => "NO ACTION",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Parses the `UPDATE_RULE`/`DELETE_RULE` spelling from
    /// `information_schema`. Unknown values map to RESTRICT.
    #[must_use]
    pub fn from_rule(rule: &str) -> Self {
        match rule.to_ascii_uppercase().as_str() {
            "CASCADE" => Self::Cascade,
            "SET NULL" => Self::SetNull,
            "NO ACTION" => Self::NoAction,
            "SET DEFAULT" => Self::SetDefault,
            _ => Self::Restrict,
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql())
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,
    /// Local columns, positionally matched with `referenced_columns`.
    pub columns: Vec<String>,
    /// Referenced schema; empty means the table's own schema.
    pub referenced_schema: String,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced columns.
    pub referenced_columns: Vec<String>,
    /// ON UPDATE action.
    pub update_rule: ReferentialAction,
    /// ON DELETE action.
    pub delete_rule: ReferentialAction,
}

impl ForeignKey {
    /// Creates a same-schema foreign key with RESTRICT actions.
    ///
    /// # Panics
    ///
    /// Panics if the column lists differ in length.
    #[must_use]
    pub fn new<I, J, S, T>(
        name: impl Into<String>,
        columns: I,
        referenced_table: impl Into<String>,
        referenced_columns: J,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let referenced_columns: Vec<String> =
            referenced_columns.into_iter().map(Into::into).collect();
        assert_eq!(
            columns.len(),
            referenced_columns.len(),
            "foreign key column lists must have the same length"
        );
        Self {
            name: name.into(),
            columns,
            referenced_schema: String::new(),
            referenced_table: referenced_table.into(),
            referenced_columns,
            update_rule: ReferentialAction::Restrict,
            delete_rule: ReferentialAction::Restrict,
        }
    }

    /// Points the constraint at a table in another schema.
    #[must_use]
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.referenced_schema = schema.into();
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.delete_rule = action;
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.update_rule = action;
        self
    }

    /// Renders the constraint as it appears inside `CREATE TABLE`.
    #[must_use]
    pub fn definition(&self) -> String {
        let cols = join_identifiers(&self.columns);
        let ref_cols = join_identifiers(&self.referenced_columns);
        let ref_table = if self.referenced_schema.is_empty() {
            escape_identifier(&self.referenced_table)
        } else {
            format!(
                "{}.{}",
                escape_identifier(&self.referenced_schema),
                escape_identifier(&self.referenced_table)
            )
        };
        let mut def = format!(
            "CONSTRAINT {} FOREIGN KEY ({cols}) REFERENCES {ref_table} ({ref_cols})",
            escape_identifier(&self.name)
        );
        if self.delete_rule != ReferentialAction::Restrict {
            def.push_str(" ON DELETE ");
            def.push_str(self.delete_rule.to_sql());
        }
        if self.update_rule != ReferentialAction::Restrict {
            def.push_str(" ON UPDATE ");
            def.push_str(self.update_rule.to_sql());
        }
        def
    }

    /// Whether two constraints behave identically, ignoring their names.
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        self.columns == other.columns
            && self.referenced_schema == other.referenced_schema
            && self.referenced_table == other.referenced_table
            && self.referenced_columns == other.referenced_columns
            && self.update_rule == other.update_rule
            && self.delete_rule == other.delete_rule
    }
}

fn join_identifiers(names: &[String]) -> String {
    names
        .iter()
        .map(|n| escape_identifier(n))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_omits_restrict() {
        let fk = ForeignKey::new("fk_post_author", ["author_id"], "users", ["id"]);
        assert_eq!(
            fk.definition(),
            "CONSTRAINT `fk_post_author` FOREIGN KEY (`author_id`) REFERENCES `users` (`id`)"
        );
    }

    #[test]
    fn test_definition_with_actions_and_schema() {
        let fk = ForeignKey::new("fk", ["a", "b"], "parent", ["x", "y"])
            .in_schema("other")
            .on_delete(ReferentialAction::Cascade)
            .on_update(ReferentialAction::SetNull);
        assert_eq!(
            fk.definition(),
            "CONSTRAINT `fk` FOREIGN KEY (`a`, `b`) REFERENCES `other`.`parent` (`x`, `y`) \
             ON DELETE CASCADE ON UPDATE SET NULL"
        );
    }

    #[test]
    fn test_equivalent_ignores_name() {
        let a = ForeignKey::new("a", ["x"], "t", ["id"]);
        let b = ForeignKey::new("b", ["x"], "t", ["id"]);
        assert!(a.equivalent(&b));
        assert_ne!(a, b);
        let c = b.clone().on_delete(ReferentialAction::Cascade);
        assert!(!a.equivalent(&c));
    }

    #[test]
    fn test_from_rule() {
        assert_eq!(ReferentialAction::from_rule("CASCADE"), ReferentialAction::Cascade);
        assert_eq!(ReferentialAction::from_rule("set null"), ReferentialAction::SetNull);
        assert_eq!(ReferentialAction::from_rule("RESTRICT"), ReferentialAction::Restrict);
        assert_eq!(ReferentialAction::NoAction.to_string(), "NO ACTION");
    }
}
