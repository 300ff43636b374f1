//! Column model and its `SHOW CREATE TABLE` rendering.

use serde::{Deserialize, Serialize};

use crate::ddl::{escape_identifier, is_blob_like, quote_value, strip_int_display_width};
use crate::flavor::Flavor;
use crate::table::Table;

/// Default value of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColumnDefault {
    /// No DEFAULT clause at all (NOT NULL columns without a default,
    /// auto-increment columns, most BLOB/TEXT columns).
    #[default]
    Forbidden,
    /// `DEFAULT NULL`.
    Null,
    /// A literal value, stored unescaped and rendered single-quoted.
    Value(String),
    /// An expression, rendered unquoted. Timestamp functions are stored in
    /// canonical `CURRENT_TIMESTAMP[(n)]` form.
    Expression(String),
}

impl ColumnDefault {
    /// Builds an expression default, canonicalizing timestamp functions.
    #[must_use]
    pub fn expression(expr: &str) -> Self {
        Self::Expression(canonical_timestamp(expr).unwrap_or_else(|| expr.to_string()))
    }

    fn render(&self, column: &Column, flavor: Flavor) -> Option<String> {
        match self {
            Self::Forbidden => None,
            Self::Null => {
                if !column.nullable {
                    return None;
                }
                if is_blob_like(&column.type_in_db) && !flavor.allow_blob_default() {
                    return None;
                }
                Some("NULL".to_string())
            }
            Self::Value(value) => Some(quote_value(value)),
            Self::Expression(expr) => Some(render_expression(expr, flavor)),
        }
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Type exactly as the server spells it, e.g. `varchar(45)` or
    /// `int(10) unsigned`.
    pub type_in_db: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Whether the column is AUTO_INCREMENT.
    pub auto_increment: bool,
    /// Default value.
    pub default: ColumnDefault,
    /// ON UPDATE expression, in canonical `CURRENT_TIMESTAMP[(n)]` form.
    pub on_update: Option<String>,
    /// Character set (string types only).
    pub charset: Option<String>,
    /// Collation (string types only).
    pub collation: Option<String>,
    /// Whether `collation` is the default collation of `charset`.
    pub collation_is_default: bool,
    /// Column comment, unescaped.
    pub comment: String,
}

impl Column {
    /// Creates a nullable column with `DEFAULT NULL`.
    #[must_use]
    pub fn new(name: impl Into<String>, type_in_db: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_in_db: type_in_db.into(),
            nullable: true,
            auto_increment: false,
            default: ColumnDefault::Null,
            on_update: None,
            charset: None,
            collation: None,
            collation_is_default: true,
            comment: String::new(),
        }
    }

    /// Marks the column NOT NULL, dropping an implicit `DEFAULT NULL`.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        if self.default == ColumnDefault::Null {
            self.default = ColumnDefault::Forbidden;
        }
        self
    }

    /// Marks the column AUTO_INCREMENT. Auto-increment columns never carry a
    /// default.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.default = ColumnDefault::Forbidden;
        self
    }

    /// Sets a literal default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = ColumnDefault::Value(value.into());
        self
    }

    /// Sets an expression default.
    #[must_use]
    pub fn default_expression(mut self, expr: &str) -> Self {
        self.default = ColumnDefault::expression(expr);
        self
    }

    /// Removes any default.
    #[must_use]
    pub fn no_default(mut self) -> Self {
        self.default = ColumnDefault::Forbidden;
        self
    }

    /// Sets the ON UPDATE expression.
    #[must_use]
    pub fn on_update(mut self, expr: &str) -> Self {
        self.on_update = Some(canonical_timestamp(expr).unwrap_or_else(|| expr.to_string()));
        self
    }

    /// Sets character set and collation.
    #[must_use]
    pub fn charset(
        mut self,
        charset: impl Into<String>,
        collation: impl Into<String>,
        collation_is_default: bool,
    ) -> Self {
        self.charset = Some(charset.into());
        self.collation = Some(collation.into());
        self.collation_is_default = collation_is_default;
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Returns the type as the given flavor displays it.
    #[must_use]
    pub fn rendered_type(&self, flavor: Flavor) -> String {
        if flavor.omit_int_display_width() {
            strip_int_display_width(&self.type_in_db)
        } else {
            self.type_in_db.clone()
        }
    }

    /// Renders the column definition as it appears inside `CREATE TABLE`.
    ///
    /// `table` supplies the table-level character set and collation, which
    /// decide whether the column repeats them.
    #[must_use]
    pub fn definition(&self, flavor: Flavor, table: &Table) -> String {
        let mut def = format!(
            "{} {}",
            escape_identifier(&self.name),
            self.rendered_type(flavor)
        );

        if let (Some(charset), Some(collation)) = (&self.charset, &self.collation) {
            if *charset != table.charset {
                def.push_str(" CHARACTER SET ");
                def.push_str(charset);
                if !self.collation_is_default || flavor.always_show_collation() {
                    def.push_str(" COLLATE ");
                    def.push_str(collation);
                }
            } else if *collation != table.collation {
                if flavor.always_show_collation() {
                    def.push_str(" CHARACTER SET ");
                    def.push_str(charset);
                }
                def.push_str(" COLLATE ");
                def.push_str(collation);
            }
        }

        if !self.nullable {
            def.push_str(" NOT NULL");
        } else if self.type_in_db.starts_with("timestamp") {
            def.push_str(" NULL");
        }
        if self.auto_increment {
            def.push_str(" AUTO_INCREMENT");
        }
        if let Some(default) = self.default.render(self, flavor) {
            def.push_str(" DEFAULT ");
            def.push_str(&default);
        }
        if let Some(on_update) = &self.on_update {
            def.push_str(" ON UPDATE ");
            def.push_str(&render_expression(on_update, flavor));
        }
        if !self.comment.is_empty() {
            def.push_str(" COMMENT ");
            def.push_str(&quote_value(&self.comment));
        }
        def
    }
}

/// Recognizes the timestamp functions the server treats as synonyms of
/// `CURRENT_TIMESTAMP` and returns the canonical spelling, keeping any
/// fractional precision argument.
#[must_use]
pub fn canonical_timestamp(expr: &str) -> Option<String> {
    let lower = expr.trim().to_ascii_lowercase();
    let (func, args) = match lower.find('(') {
        Some(open) if lower.ends_with(')') => (&lower[..open], &lower[open + 1..lower.len() - 1]),
        Some(_) => return None,
        None => (lower.as_str(), ""),
    };
    if !matches!(
        func,
        "current_timestamp" | "now" | "localtime" | "localtimestamp"
    ) {
        return None;
    }
    if func == "now" && !lower.contains('(') {
        return None;
    }
    let args = args.trim();
    match args {
        "" => Some("CURRENT_TIMESTAMP".to_string()),
        n if n.chars().all(|c| c.is_ascii_digit()) => Some(format!("CURRENT_TIMESTAMP({n})")),
        _ => None,
    }
}

fn is_bit_literal(expr: &str) -> bool {
    expr.starts_with("b'") || expr.starts_with("0x")
}

fn render_expression(expr: &str, flavor: Flavor) -> String {
    if let Some(canon) = canonical_timestamp(expr) {
        let (name, precision) = match canon.find('(') {
            Some(open) => (&canon[..open], Some(&canon[open..])),
            None => (canon.as_str(), None),
        };
        let precision = precision.filter(|_| flavor.fractional_timestamps());
        return if flavor.lowercase_on_update() {
            format!(
                "{}{}",
                name.to_ascii_lowercase(),
                precision.unwrap_or("()")
            )
        } else {
            format!("{name}{}", precision.unwrap_or(""))
        };
    }
    if flavor.is_mysql() && flavor.allow_default_expression() && !is_bit_literal(expr) {
        format!("({expr})")
    } else {
        expr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new("t", "InnoDB", "utf8mb4", "utf8mb4_general_ci")
    }

    const MYSQL57: Flavor = Flavor::mysql(5, 7, 44);
    const MYSQL80: Flavor = Flavor::mysql(8, 0, 36);
    const MARIA106: Flavor = Flavor::mariadb(10, 6, 16);

    #[test]
    fn test_basic_definitions() {
        let t = table();
        let id = Column::new("id", "int(10) unsigned").not_null().auto_increment();
        assert_eq!(
            id.definition(MYSQL57, &t),
            "`id` int(10) unsigned NOT NULL AUTO_INCREMENT"
        );
        assert_eq!(
            id.definition(MYSQL80, &t),
            "`id` int unsigned NOT NULL AUTO_INCREMENT"
        );

        let name = Column::new("name", "varchar(45)")
            .charset("utf8mb4", "utf8mb4_general_ci", true)
            .not_null()
            .default_value("");
        assert_eq!(
            name.definition(MYSQL57, &t),
            "`name` varchar(45) NOT NULL DEFAULT ''"
        );

        let nick = Column::new("nick", "varchar(20)").charset("utf8mb4", "utf8mb4_general_ci", true);
        assert_eq!(nick.definition(MYSQL57, &t), "`nick` varchar(20) DEFAULT NULL");
    }

    #[test]
    fn test_charset_and_collation_display() {
        let t = table();
        let latin = Column::new("c", "varchar(10)").charset("latin1", "latin1_swedish_ci", true);
        assert_eq!(
            latin.definition(MYSQL57, &t),
            "`c` varchar(10) CHARACTER SET latin1 DEFAULT NULL"
        );
        assert_eq!(
            latin.definition(MYSQL80, &t),
            "`c` varchar(10) CHARACTER SET latin1 COLLATE latin1_swedish_ci DEFAULT NULL"
        );

        let bin = Column::new("c", "varchar(10)").charset("utf8mb4", "utf8mb4_bin", false);
        assert_eq!(
            bin.definition(MYSQL57, &t),
            "`c` varchar(10) COLLATE utf8mb4_bin DEFAULT NULL"
        );
        assert_eq!(
            bin.definition(MYSQL80, &t),
            "`c` varchar(10) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin DEFAULT NULL"
        );
    }

    #[test]
    fn test_timestamp_defaults_per_flavor() {
        let t = table();
        let updated = Column::new("updated_at", "timestamp")
            .not_null()
            .default_expression("now()")
            .on_update("CURRENT_TIMESTAMP");
        assert_eq!(
            updated.definition(MYSQL57, &t),
            "`updated_at` timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP"
        );
        assert_eq!(
            updated.definition(MARIA106, &t),
            "`updated_at` timestamp NOT NULL DEFAULT current_timestamp() ON UPDATE current_timestamp()"
        );

        let precise = Column::new("ts", "datetime(6)").default_expression("CURRENT_TIMESTAMP(6)");
        assert_eq!(
            precise.definition(MYSQL80, &t),
            "`ts` datetime(6) DEFAULT CURRENT_TIMESTAMP(6)"
        );
        assert_eq!(
            precise.definition(MARIA106, &t),
            "`ts` datetime(6) DEFAULT current_timestamp(6)"
        );

        let nullable_ts = Column::new("deleted_at", "timestamp");
        assert_eq!(
            nullable_ts.definition(MYSQL57, &t),
            "`deleted_at` timestamp NULL DEFAULT NULL"
        );
    }

    #[test]
    fn test_blob_default_null_gate() {
        let t = table();
        let body = Column::new("body", "text").charset("utf8mb4", "utf8mb4_general_ci", true);
        assert_eq!(body.definition(MYSQL80, &t), "`body` text");
        assert_eq!(body.definition(MARIA106, &t), "`body` text DEFAULT NULL");
    }

    #[test]
    fn test_default_expression_parenthesized_on_mysql8() {
        let t = table();
        let c = Column::new("j", "json").default_expression("json_array()");
        assert_eq!(c.definition(MYSQL80, &t), "`j` json DEFAULT (json_array())");
        let bits = Column::new("flags", "bit(3)").not_null().default_expression("b'101'");
        assert_eq!(
            bits.definition(MYSQL80, &t),
            "`flags` bit(3) NOT NULL DEFAULT b'101'"
        );
    }

    #[test]
    fn test_comment_is_escaped() {
        let t = table();
        let c = Column::new("c", "int(11)").not_null().comment("it's \"x\"");
        assert_eq!(
            c.definition(MYSQL57, &t),
            "`c` int(11) NOT NULL COMMENT 'it''s \"x\"'"
        );
    }

    #[test]
    fn test_canonical_timestamp() {
        assert_eq!(canonical_timestamp("now()").as_deref(), Some("CURRENT_TIMESTAMP"));
        assert_eq!(
            canonical_timestamp("current_timestamp(3)").as_deref(),
            Some("CURRENT_TIMESTAMP(3)")
        );
        assert_eq!(
            canonical_timestamp("LOCALTIMESTAMP").as_deref(),
            Some("CURRENT_TIMESTAMP")
        );
        assert_eq!(canonical_timestamp("now"), None);
        assert_eq!(canonical_timestamp("uuid()"), None);
    }

    #[test]
    fn test_auto_increment_clears_default() {
        let c = Column::new("id", "bigint(20)").default_value("0").auto_increment();
        assert_eq!(c.default, ColumnDefault::Forbidden);
    }
}
