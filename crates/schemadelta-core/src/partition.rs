//! Table partitioning.

use serde::{Deserialize, Serialize};

use crate::ddl::{escape_identifier, quote_value};
use crate::flavor::Flavor;

/// One partition of a partitioned table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    /// Partition name.
    pub name: String,
    /// Boundary or value list as `information_schema.PARTITIONS` reports it
    /// (`10`, `MAXVALUE`, `1,2,3`). Empty for HASH and KEY partitions.
    pub values: String,
    /// Partition comment, unescaped.
    pub comment: String,
}

impl Partition {
    /// Creates a partition.
    #[must_use]
    pub fn new(name: impl Into<String>, values: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: values.into(),
            comment: String::new(),
        }
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Renders the partition definition.
    ///
    /// `engine` is appended as `ENGINE = x` inside `CREATE TABLE`; ALTER
    /// statements pass `None`.
    fn definition(&self, method: &str, quote_name: bool, engine: Option<&str>) -> String {
        let name = if quote_name {
            escape_identifier(&self.name)
        } else {
            self.name.clone()
        };
        let mut def = format!("PARTITION {name}");
        if method.starts_with("RANGE") {
            if self.values == "MAXVALUE" && method == "RANGE" {
                def.push_str(" VALUES LESS THAN MAXVALUE");
            } else {
                def.push_str(&format!(" VALUES LESS THAN ({})", self.values));
            }
        } else if method.starts_with("LIST") {
            def.push_str(&format!(" VALUES IN ({})", self.values));
        }
        if !self.comment.is_empty() {
            def.push_str(" COMMENT = ");
            def.push_str(&quote_value(&self.comment));
        }
        if let Some(engine) = engine {
            def.push_str(" ENGINE = ");
            def.push_str(engine);
        }
        def
    }
}

/// Partitioning scheme of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TablePartitioning {
    /// Method: `RANGE`, `RANGE COLUMNS`, `LIST`, `LIST COLUMNS`, `HASH`,
    /// `LINEAR HASH`, `KEY` or `LINEAR KEY`.
    pub method: String,
    /// Subpartitioning method, empty when not subpartitioned.
    pub sub_method: String,
    /// Partitioning expression or column list.
    pub expression: String,
    /// Subpartitioning expression.
    pub sub_expression: String,
    /// Partitions in definition order.
    pub partitions: Vec<Partition>,
}

impl TablePartitioning {
    /// Creates a partitioning scheme without partitions.
    #[must_use]
    pub fn new(method: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            sub_method: String::new(),
            expression: expression.into(),
            sub_expression: String::new(),
            partitions: Vec::new(),
        }
    }

    /// Appends a partition.
    #[must_use]
    pub fn partition(mut self, partition: Partition) -> Self {
        self.partitions.push(partition);
        self
    }

    /// Whether partitions can be added or dropped individually.
    #[must_use]
    pub fn supports_list_diff(&self) -> bool {
        matches!(
            self.method.as_str(),
            "RANGE" | "RANGE COLUMNS" | "LIST" | "LIST COLUMNS"
        )
    }

    /// HASH and KEY partitions named `p0`..`pN` are summarized as
    /// `PARTITIONS N`.
    fn uses_default_names(&self) -> bool {
        (self.method.ends_with("HASH") || self.method.ends_with("KEY"))
            && self
                .partitions
                .iter()
                .enumerate()
                .all(|(i, p)| p.name == format!("p{i}"))
    }

    fn method_clause(&self) -> String {
        match self.method.strip_suffix(" COLUMNS") {
            Some(base) => format!("{base}  COLUMNS({})", self.expression),
            None => format!("{} ({})", self.method, self.expression),
        }
    }

    fn body(&self, flavor: Flavor, engine: Option<&str>, in_create: bool) -> String {
        let quote_names = !in_create || flavor.quote_partition_names();
        let mut out = format!("PARTITION BY {}", self.method_clause());
        if !self.sub_method.is_empty() {
            out.push_str(&format!(
                "\nSUBPARTITION BY {} ({})",
                self.sub_method, self.sub_expression
            ));
        }
        if self.uses_default_names() {
            out.push_str(&format!("\nPARTITIONS {}", self.partitions.len()));
        } else if !self.partitions.is_empty() {
            let defs = self
                .partitions
                .iter()
                .map(|p| p.definition(&self.method, quote_names, engine))
                .collect::<Vec<_>>()
                .join(",\n ");
            out.push_str(&format!("\n({defs})"));
        }
        out
    }

    /// Renders the partitioning clause as `SHOW CREATE TABLE` shows it after
    /// the table options.
    #[must_use]
    pub fn definition(&self, flavor: Flavor, engine: &str) -> String {
        let body = self.body(flavor, Some(engine), true);
        if flavor.partition_version_comments() {
            let version = if self.method.ends_with("COLUMNS") {
                "50500"
            } else {
                "50100"
            };
            format!("/*!{version} {body} */")
        } else {
            body
        }
    }

    /// Renders the clause used by `ALTER TABLE ... PARTITION BY`.
    #[must_use]
    pub fn alter_definition(&self, flavor: Flavor) -> String {
        self.body(flavor, None, false)
    }

    /// Renders the partition list for `ALTER TABLE ... ADD PARTITION`.
    #[must_use]
    pub fn add_partitions_clause(&self, partitions: &[Partition]) -> String {
        let defs = partitions
            .iter()
            .map(|p| p.definition(&self.method, true, None))
            .collect::<Vec<_>>()
            .join(", ");
        format!("ADD PARTITION ({defs})")
    }
}
