//! Index model: primary keys, unique and secondary keys.

use serde::{Deserialize, Serialize};

use crate::ddl::{escape_identifier, quote_value};

/// Index storage kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IndexKind {
    /// Ordinary B-tree index.
    #[default]
    BTree,
    /// FULLTEXT index.
    FullText,
    /// SPATIAL index.
    Spatial,
}

/// One column of an index, with its optional prefix length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexPart {
    /// Column name.
    pub column: String,
    /// Prefix length (`SUB_PART`), if the index covers only a prefix.
    pub sub_part: Option<u32>,
}

impl IndexPart {
    /// Creates a full-column part.
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            sub_part: None,
        }
    }

    /// Creates a prefix part.
    #[must_use]
    pub fn prefix(column: impl Into<String>, length: u32) -> Self {
        Self {
            column: column.into(),
            sub_part: Some(length),
        }
    }

    fn render(&self) -> String {
        match self.sub_part {
            Some(len) => format!("{}({len})", escape_identifier(&self.column)),
            None => escape_identifier(&self.column),
        }
    }

    /// Whether this part covers no more than `other` on the same column.
    fn covered_by(&self, other: &Self) -> bool {
        if self.column != other.column {
            return false;
        }
        match (self.sub_part, other.sub_part) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(mine), Some(theirs)) => mine <= theirs,
        }
    }
}

/// A table index. Parts are ordered; the order defines the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    /// Index name (`PRIMARY` for primary keys).
    pub name: String,
    /// Indexed columns in key order.
    pub parts: Vec<IndexPart>,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
    /// Whether this is the primary key.
    pub primary_key: bool,
    /// Storage kind.
    pub kind: IndexKind,
    /// Index comment, unescaped.
    pub comment: String,
}

impl Index {
    /// Creates a non-unique B-tree index over whole columns.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parts: columns.into_iter().map(IndexPart::new).collect(),
            unique: false,
            primary_key: false,
            kind: IndexKind::BTree,
            comment: String::new(),
        }
    }

    /// Creates a primary key.
    #[must_use]
    pub fn primary<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::new("PRIMARY", columns);
        index.unique = true;
        index.primary_key = true;
        index
    }

    /// Creates an index from explicit parts.
    #[must_use]
    pub fn with_parts(name: impl Into<String>, parts: Vec<IndexPart>) -> Self {
        Self {
            name: name.into(),
            parts,
            unique: false,
            primary_key: false,
            kind: IndexKind::BTree,
            comment: String::new(),
        }
    }

    /// Marks the index unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the index kind.
    #[must_use]
    pub fn kind(mut self, kind: IndexKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Returns the indexed column names in key order.
    #[must_use]
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.column.as_str())
    }

    /// Renders the index definition as it appears inside `CREATE TABLE`.
    #[must_use]
    pub fn definition(&self) -> String {
        let parts = self
            .parts
            .iter()
            .map(IndexPart::render)
            .collect::<Vec<_>>()
            .join(",");
        let mut def = if self.primary_key {
            format!("PRIMARY KEY ({parts})")
        } else {
            let kind = match (self.kind, self.unique) {
                (IndexKind::FullText, _) => "FULLTEXT KEY",
                (IndexKind::Spatial, _) => "SPATIAL KEY",
                (IndexKind::BTree, true) => "UNIQUE KEY",
                (IndexKind::BTree, false) => "KEY",
            };
            format!("{kind} {} ({parts})", escape_identifier(&self.name))
        };
        if !self.comment.is_empty() {
            def.push_str(" COMMENT ");
            def.push_str(&quote_value(&self.comment));
        }
        def
    }

    /// Whether two indexes are functionally identical, ignoring name and
    /// comment.
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        self.parts == other.parts
            && self.unique == other.unique
            && self.primary_key == other.primary_key
            && self.kind == other.kind
    }

    /// Whether this index is made unnecessary by `other`.
    ///
    /// An index is redundant when its parts are a prefix of `other`'s parts.
    /// Primary keys are never redundant. A unique index is only redundant to
    /// another unique index (or the primary key) covering exactly the same
    /// parts. Two identical indexes are redundant to each other.
    #[must_use]
    pub fn redundant_to(&self, other: &Self) -> bool {
        if self.primary_key || self.kind != other.kind {
            return false;
        }
        if self.parts.len() > other.parts.len() {
            return false;
        }
        let prefix = self
            .parts
            .iter()
            .zip(&other.parts)
            .all(|(mine, theirs)| mine.covered_by(theirs));
        if !prefix {
            return false;
        }
        if self.kind != IndexKind::BTree {
            return self.parts == other.parts;
        }
        if self.unique {
            return other.unique && self.parts == other.parts;
        }
        true
    }
}
