//! Declarative sheet/column schema driving table construction.
//!
//! A [`Schema`] is an ordered list of [`SheetSpec`]s. A sheet with no
//! columns holds a bare list of values; a sheet with columns holds one list
//! per column. The schema is always supplied up front, never inferred from
//! the document.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading or validating a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema has no sheets.
    #[error("schema defines no sheets")]
    Empty,

    /// A sheet name is blank.
    #[error("schema sheet #{index} has an empty name")]
    EmptySheetName {
        /// 1-based position of the sheet in the schema.
        index: usize,
    },

    /// Two sheets share a name.
    #[error("schema sheet '{name}' is defined more than once")]
    DuplicateSheet {
        /// The repeated sheet name.
        name: String,
    },

    /// A column name is blank or repeated within one sheet.
    #[error("schema sheet '{sheet}' has an invalid column '{column}': {reason}")]
    InvalidColumn {
        /// Sheet holding the column.
        sheet: String,
        /// The offending column name.
        column: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The schema file could not be read.
    #[error("cannot read schema file {path}: {source}")]
    Io {
        /// Schema file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The schema file is not valid schema JSON.
    #[error("cannot parse schema file {path}: {source}")]
    Parse {
        /// Schema file path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// One sheet of the schema: its name and ordered column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSpec {
    /// Sheet name, also the top-level document key.
    pub name: String,
    /// Column names; empty for a "no header" sheet.
    #[serde(default)]
    pub columns: Vec<String>,
}

impl SheetSpec {
    /// Creates a sheet spec.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true when the sheet holds a bare list instead of named columns.
    #[must_use]
    pub fn is_headerless(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A validated, ordered collection of sheet specs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    sheets: Vec<SheetSpec>,
}

impl Schema {
    /// Validates and wraps a list of sheet specs.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the list is empty, a sheet name is blank
    /// or repeated, or a column name is blank or repeated within its sheet.
    pub fn new(sheets: Vec<SheetSpec>) -> Result<Self, SchemaError> {
        if sheets.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut seen_sheets = HashSet::new();
        for (index, sheet) in sheets.iter().enumerate() {
            if sheet.name.trim().is_empty() {
                return Err(SchemaError::EmptySheetName { index: index + 1 });
            }
            if !seen_sheets.insert(sheet.name.as_str()) {
                return Err(SchemaError::DuplicateSheet {
                    name: sheet.name.clone(),
                });
            }
            let mut seen_columns = HashSet::new();
            for column in &sheet.columns {
                let reason = if column.trim().is_empty() {
                    Some("column name is empty")
                } else if !seen_columns.insert(column.as_str()) {
                    Some("column is defined more than once")
                } else {
                    None
                };
                if let Some(reason) = reason {
                    return Err(SchemaError::InvalidColumn {
                        sheet: sheet.name.clone(),
                        column: column.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(Self { sheets })
    }

    /// The built-in auction catalogue schema, used when no schema file is given.
    #[must_use]
    pub fn catalogue() -> Self {
        Self {
            sheets: vec![
                SheetSpec::new("Documents", Vec::<String>::new()),
                SheetSpec::new("Bookseller", ["Name"]),
                SheetSpec::new(
                    "Catalogue",
                    [
                        "Annotation",
                        "Pages (original)",
                        "Scanned",
                        "Type",
                        "Literature",
                        "Pages",
                        "Collation",
                        "Manuscript notes",
                        "Scanned copy",
                        "Location",
                        "Title",
                        "Location (original)",
                        "Title page transcription",
                    ],
                ),
                SheetSpec::new("Citation", ["Title", "URL", "ID", "Type"]),
                SheetSpec::new("Owner", ["Profession", "Location", "Name"]),
                SheetSpec::new("Auction", ["Venue", "Year", "Location", "Date"]),
            ],
        }
    }

    /// Loads a schema from a JSON file shaped `[{"name": .., "columns": [..]}, ..]`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Io`] or [`SchemaError::Parse`] when the file
    /// cannot be read or parsed, and the validation errors of [`Schema::new`].
    pub fn from_json_file(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let sheets: Vec<SheetSpec> =
            serde_json::from_str(&content).map_err(|source| SchemaError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), sheets = sheets.len(), "schema file loaded");
        Self::new(sheets)
    }

    /// Returns the sheets in schema order.
    #[must_use]
    pub fn sheets(&self) -> &[SheetSpec] {
        &self.sheets
    }

    /// Number of data columns a compact table has: one per headerless sheet
    /// plus one per named column.
    #[must_use]
    pub fn data_column_count(&self) -> usize {
        self.sheets
            .iter()
            .map(|sheet| sheet.columns.len().max(1))
            .sum()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::catalogue()
    }
}
