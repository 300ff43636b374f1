//! Quoting and type-string helpers shared by the renderers.

/// Quotes an identifier with backticks, doubling any embedded backtick.
#[must_use]
pub fn escape_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Escapes a string the way `SHOW CREATE TABLE` escapes literals inside
/// single quotes (defaults, comments).
#[must_use]
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\0"),
            '\'' => out.push_str("''"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x1a' => out.push_str("\\Z"),
            other => out.push(other),
        }
    }
    out
}

/// Wraps an escaped value in single quotes.
#[must_use]
pub fn quote_value(value: &str) -> String {
    format!("'{}'", escape_value(value))
}

/// Returns the base type name of a column type: `varchar(45)` gives
/// `varchar`, `int unsigned` gives `int`.
#[must_use]
pub fn base_type(type_in_db: &str) -> &str {
    let end = type_in_db
        .find(|c: char| c == '(' || c == ' ')
        .unwrap_or(type_in_db.len());
    &type_in_db[..end]
}

/// Returns the parenthesized argument list of a type, if any:
/// `decimal(10,2)` gives `Some("10,2")`.
#[must_use]
pub fn type_args(type_in_db: &str) -> Option<&str> {
    let open = type_in_db.find('(')?;
    let close = type_in_db.rfind(')')?;
    (close > open).then(|| &type_in_db[open + 1..close])
}

/// Whether a type cannot carry a literal DEFAULT on most flavors.
#[must_use]
pub fn is_blob_like(type_in_db: &str) -> bool {
    let base = base_type(type_in_db);
    base.ends_with("blob")
        || base.ends_with("text")
        || base == "json"
        || matches!(
            base,
            "geometry"
                | "point"
                | "linestring"
                | "polygon"
                | "multipoint"
                | "multilinestring"
                | "multipolygon"
                | "geometrycollection"
        )
}

/// Whether a type belongs to the integer family.
#[must_use]
pub fn is_int_type(type_in_db: &str) -> bool {
    matches!(
        base_type(type_in_db),
        "tinyint" | "smallint" | "mediumint" | "int" | "bigint"
    )
}

/// Removes the display width from an integer type, so `int(11) unsigned`
/// becomes `int unsigned`. `tinyint(1)` and zerofill types keep their width,
/// since servers that hide widths still show them there.
#[must_use]
pub fn strip_int_display_width(type_in_db: &str) -> String {
    if !is_int_type(type_in_db) || type_in_db.contains("zerofill") {
        return type_in_db.to_string();
    }
    let Some(open) = type_in_db.find('(') else {
        return type_in_db.to_string();
    };
    let Some(close) = type_in_db[open..].find(')').map(|i| i + open) else {
        return type_in_db.to_string();
    };
    if &type_in_db[..open] == "tinyint" && &type_in_db[open + 1..close] == "1" {
        return type_in_db.to_string();
    }
    format!("{}{}", &type_in_db[..open], &type_in_db[close + 1..])
}
