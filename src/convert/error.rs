//! Error types for JSON→spreadsheet conversion.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::sheet::SheetError;

/// Which part of table construction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// Creating sheets and writing header cells.
    Header,
    /// Resolving document values and writing data cells.
    Population,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "header construction"),
            Self::Population => write!(f, "column population"),
        }
    }
}

/// Errors that can occur while converting a JSON document to a workbook.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Input path is missing or not a regular file.
    #[error("input {path} is not a file")]
    InputNotFile {
        /// The input path.
        path: PathBuf,
    },

    /// Resolved output path is an existing directory.
    #[error("output {path} is a directory, expected a file")]
    OutputIsDirectory {
        /// The resolved output path.
        path: PathBuf,
    },

    /// Reading the input failed.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// The input path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The input is not valid JSON.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        /// The input path.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The document root is not a JSON object keyed by sheet name.
    #[error("document root must be an object keyed by sheet name, found {found}")]
    DocumentNotObject {
        /// JSON type found at the root.
        found: &'static str,
    },

    /// The document does not have the shape the schema describes.
    #[error("{phase} failed for {}: {reason}", describe_target(.sheet, .column.as_deref()))]
    SchemaMismatch {
        /// Phase that failed.
        phase: BuildPhase,
        /// Sheet being built.
        sheet: String,
        /// Column being built, if the failure is column-specific.
        column: Option<String>,
        /// What did not match.
        reason: String,
    },

    /// The spreadsheet model rejected a sheet, header, or cell.
    #[error("{phase} failed for sheet '{sheet}': {source}")]
    Build {
        /// Phase that failed.
        phase: BuildPhase,
        /// Sheet being built.
        sheet: String,
        /// The underlying spreadsheet error.
        #[source]
        source: SheetError,
    },

    /// Saving the finished workbook failed.
    #[error("cannot save workbook to {path}: {source}")]
    Save {
        /// The output path.
        path: PathBuf,
        /// The underlying spreadsheet error.
        #[source]
        source: SheetError,
    },
}

fn describe_target(sheet: &str, column: Option<&str>) -> String {
    match column {
        Some(column) => format!("sheet '{sheet}' column '{column}'"),
        None => format!("sheet '{sheet}'"),
    }
}

impl ConvertError {
    /// Creates a schema mismatch error for a whole sheet.
    pub fn sheet_mismatch(
        phase: BuildPhase,
        sheet: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SchemaMismatch {
            phase,
            sheet: sheet.into(),
            column: None,
            reason: reason.into(),
        }
    }

    /// Creates a schema mismatch error for one column.
    pub fn column_mismatch(
        phase: BuildPhase,
        sheet: impl Into<String>,
        column: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SchemaMismatch {
            phase,
            sheet: sheet.into(),
            column: Some(column.into()),
            reason: reason.into(),
        }
    }

    /// Wraps a spreadsheet error raised while building a sheet.
    pub fn build(phase: BuildPhase, sheet: impl Into<String>, source: SheetError) -> Self {
        Self::Build {
            phase,
            sheet: sheet.into(),
            source,
        }
    }

    /// Returns the failed phase for table construction errors.
    #[must_use]
    pub fn phase(&self) -> Option<BuildPhase> {
        match self {
            Self::SchemaMismatch { phase, .. } | Self::Build { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_phase_display() {
        assert_eq!(BuildPhase::Header.to_string(), "header construction");
        assert_eq!(BuildPhase::Population.to_string(), "column population");
    }

    #[test]
    fn test_column_mismatch_display_names_phase_sheet_and_column() {
        let error = ConvertError::column_mismatch(
            BuildPhase::Population,
            "Owner",
            "Name",
            "missing key",
        );
        let msg = error.to_string();
        assert!(msg.contains("column population"), "Expected phase in: {msg}");
        assert!(msg.contains("sheet 'Owner'"), "Expected sheet in: {msg}");
        assert!(msg.contains("column 'Name'"), "Expected column in: {msg}");
        assert_eq!(error.phase(), Some(BuildPhase::Population));
    }

    #[test]
    fn test_sheet_mismatch_display_omits_column() {
        let msg =
            ConvertError::sheet_mismatch(BuildPhase::Population, "Documents", "not a list")
                .to_string();
        assert!(!msg.contains("column '"), "Unexpected column in: {msg}");
        assert!(msg.contains("not a list"), "Expected reason in: {msg}");
    }

    #[test]
    fn test_build_error_display_includes_source() {
        let error = ConvertError::build(
            BuildPhase::Header,
            "a/b",
            SheetError::InvalidSheetName {
                name: "a/b".into(),
                reason: "name contains one of []:*?/\\",
            },
        );
        let msg = error.to_string();
        assert!(msg.contains("header construction"), "Expected phase in: {msg}");
        assert!(msg.contains("invalid sheet name"), "Expected source in: {msg}");
    }

    #[test]
    fn test_input_not_file_has_no_phase() {
        let error = ConvertError::InputNotFile {
            path: PathBuf::from("missing.json"),
        };
        assert_eq!(error.phase(), None);
        assert!(error.to_string().contains("missing.json"));
    }
}
