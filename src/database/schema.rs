//! Schema data structures
//!
//! Table and column descriptors returned by `/database-info`.

use serde::{Deserialize, Serialize};

/// Represents a column in a database table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name
    pub column_name: String,
    /// Declared data type as reported by the catalog (e.g. "integer", "character varying")
    pub data_type: String,
    /// Whether the column accepts NULL
    pub is_nullable: bool,
    /// Default expression, omitted when the column has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_default: Option<String>,
}

impl ColumnInfo {
    /// Build a column from raw catalog values
    ///
    /// `is_nullable` is the catalog's `YES`/`NO` flag. An empty default is
    /// treated the same as a missing one.
    pub fn from_catalog(
        column_name: impl Into<String>,
        data_type: impl Into<String>,
        is_nullable: &str,
        column_default: Option<String>,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
            is_nullable: is_nullable == "YES",
            column_default: column_default.filter(|d| !d.is_empty()),
        }
    }
}

/// Represents a base table in the public schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table name
    pub table_name: String,
    /// Columns in ordinal order
    pub columns: Vec<ColumnInfo>,
}
