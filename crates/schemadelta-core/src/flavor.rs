//! Server flavor: vendor plus version, and the capability gates derived from it.
//!
//! Each MySQL and MariaDB release changed some detail of `SHOW CREATE TABLE`
//! output. The renderer asks a [`Flavor`] about those details instead of
//! checking version numbers itself. An unknown flavor answers every gate the
//! conservative way, which matches the classic MySQL 5.x formatting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseFlavorError;

/// Database server vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Vendor {
    /// Vendor could not be determined.
    #[default]
    Unknown,
    /// Oracle MySQL.
    MySQL,
    /// Percona Server (a MySQL fork, formats DDL like MySQL).
    Percona,
    /// MariaDB.
    MariaDB,
}

impl Vendor {
    /// Returns the lowercase vendor name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::MySQL => "mysql",
            Self::Percona => "percona",
            Self::MariaDB => "mariadb",
        }
    }
}

impl FromStr for Vendor {
    type Err = ParseFlavorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(Self::MySQL),
            "percona" => Ok(Self::Percona),
            "mariadb" => Ok(Self::MariaDB),
            "unknown" => Ok(Self::Unknown),
            _ => Err(ParseFlavorError(s.to_string())),
        }
    }
}

/// A vendor and version pair identifying the server dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Flavor {
    /// Server vendor.
    pub vendor: Vendor,
    /// Major version.
    pub major: u16,
    /// Minor version.
    pub minor: u16,
    /// Patch version.
    pub patch: u16,
}

impl Flavor {
    /// The flavor used when nothing is known about the server.
    pub const UNKNOWN: Self = Self::new(Vendor::Unknown, 0, 0, 0);

    /// Creates a flavor.
    #[must_use]
    pub const fn new(vendor: Vendor, major: u16, minor: u16, patch: u16) -> Self {
        Self {
            vendor,
            major,
            minor,
            patch,
        }
    }

    /// Shorthand for a MySQL flavor.
    #[must_use]
    pub const fn mysql(major: u16, minor: u16, patch: u16) -> Self {
        Self::new(Vendor::MySQL, major, minor, patch)
    }

    /// Shorthand for a MariaDB flavor.
    #[must_use]
    pub const fn mariadb(major: u16, minor: u16, patch: u16) -> Self {
        Self::new(Vendor::MariaDB, major, minor, patch)
    }

    /// Derives a flavor from the `@@version` and `@@version_comment` server
    /// variables.
    ///
    /// Unrecognized input yields [`Vendor::Unknown`] rather than an error.
    #[must_use]
    pub fn parse(version: &str, version_comment: &str) -> Self {
        let version_lower = version.to_ascii_lowercase();
        let comment_lower = version_comment.to_ascii_lowercase();

        let vendor = if version_lower.contains("mariadb") || comment_lower.contains("mariadb") {
            Vendor::MariaDB
        } else if version_lower.contains("percona") || comment_lower.contains("percona") {
            Vendor::Percona
        } else if comment_lower.contains("mysql") || version_lower.contains("mysql") {
            Vendor::MySQL
        } else {
            Vendor::Unknown
        };

        // MariaDB 10.x used to advertise itself as "5.5.5-10.x.y" for
        // replication compatibility.
        let version = match vendor {
            Vendor::MariaDB => version.strip_prefix("5.5.5-").unwrap_or(version),
            _ => version,
        };

        match parse_version_triple(version) {
            Some((major, minor, patch)) => Self::new(vendor, major, minor, patch),
            None => Self::UNKNOWN,
        }
    }

    /// Returns `true` if both vendor and version are known.
    #[must_use]
    pub fn known(&self) -> bool {
        self.vendor != Vendor::Unknown && self.major > 0
    }

    /// Returns `true` for MySQL and Percona Server.
    #[must_use]
    pub fn is_mysql(&self) -> bool {
        matches!(self.vendor, Vendor::MySQL | Vendor::Percona)
    }

    /// Returns `true` for MariaDB.
    #[must_use]
    pub fn is_mariadb(&self) -> bool {
        self.vendor == Vendor::MariaDB
    }

    fn version(&self) -> (u16, u16, u16) {
        (self.major, self.minor, self.patch)
    }

    /// Returns `true` if this is MySQL (or Percona) at or above the given version.
    #[must_use]
    pub fn min_mysql(&self, major: u16, minor: u16, patch: u16) -> bool {
        self.is_mysql() && self.version() >= (major, minor, patch)
    }

    /// Returns `true` if this is MariaDB at or above the given version.
    #[must_use]
    pub fn min_mariadb(&self, major: u16, minor: u16, patch: u16) -> bool {
        self.is_mariadb() && self.version() >= (major, minor, patch)
    }

    /// Returns `true` if the vendor matches exactly and the version is at
    /// least `major.minor`.
    #[must_use]
    pub fn vendor_min_version(&self, vendor: Vendor, major: u16, minor: u16) -> bool {
        self.vendor == vendor && (self.major, self.minor) >= (major, minor)
    }

    /// Whether temporal types support fractional-second precision, so that
    /// `CURRENT_TIMESTAMP(n)` keeps its precision argument.
    #[must_use]
    pub fn fractional_timestamps(&self) -> bool {
        self.min_mysql(5, 6, 4) || self.is_mariadb()
    }

    /// Whether arbitrary DEFAULT expressions (beyond `CURRENT_TIMESTAMP`) are
    /// permitted.
    #[must_use]
    pub fn allow_default_expression(&self) -> bool {
        self.min_mysql(8, 0, 13) || self.min_mariadb(10, 2, 0)
    }

    /// Whether BLOB, TEXT, JSON and spatial columns show a DEFAULT clause.
    #[must_use]
    pub fn allow_blob_default(&self) -> bool {
        self.min_mariadb(10, 2, 0)
    }

    /// Whether `CURRENT_TIMESTAMP` in DEFAULT and ON UPDATE clauses is shown
    /// as lowercase `current_timestamp()`.
    #[must_use]
    pub fn lowercase_on_update(&self) -> bool {
        self.min_mariadb(10, 2, 0)
    }

    /// Whether integer display widths are omitted from column types.
    #[must_use]
    pub fn omit_int_display_width(&self) -> bool {
        self.min_mysql(8, 0, 19)
    }

    /// Whether a column's collation is shown whenever its character set is
    /// shown, even if it is the character set's default collation.
    #[must_use]
    pub fn always_show_collation(&self) -> bool {
        self.min_mysql(8, 0, 0)
    }

    /// Whether the table-level `COLLATE=` option is shown even when it is the
    /// default for the table's character set.
    #[must_use]
    pub fn always_show_table_collation(&self, charset: &str) -> bool {
        charset == "utf8mb4" && self.min_mysql(8, 0, 0)
    }

    /// Whether the partitioning clause of CREATE TABLE is wrapped in a
    /// versioned comment such as `/*!50100 ... */`.
    #[must_use]
    pub fn partition_version_comments(&self) -> bool {
        !self.is_mariadb()
    }

    /// Whether partition names are backtick-quoted in CREATE TABLE.
    #[must_use]
    pub fn quote_partition_names(&self) -> bool {
        self.is_mariadb()
    }
}

fn parse_version_triple(version: &str) -> Option<(u16, u16, u16)> {
    let numeric: String = version
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let mut parts = numeric.split('.').filter(|p| !p.is_empty());
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    Some((major, minor, patch))
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.known() {
            return f.write_str("unknown:0.0");
        }
        if self.patch > 0 {
            write!(
                f,
                "{}:{}.{}.{}",
                self.vendor.as_str(),
                self.major,
                self.minor,
                self.patch
            )
        } else {
            write!(f, "{}:{}.{}", self.vendor.as_str(), self.major, self.minor)
        }
    }
}

impl FromStr for Flavor {
    type Err = ParseFlavorError;

    /// Parses strings such as `mysql:8.0`, `mariadb:10.6.12` or `percona:5.7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (vendor, version) = s
            .split_once(':')
            .ok_or_else(|| ParseFlavorError(s.to_string()))?;
        let vendor: Vendor = vendor.parse()?;
        let (major, minor, patch) =
            parse_version_triple(version).ok_or_else(|| ParseFlavorError(s.to_string()))?;
        Ok(Self::new(vendor, major, minor, patch))
    }
}
