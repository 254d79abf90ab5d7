//! Error types for spreadsheet reading and writing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building, reading, or saving a workbook.
#[derive(Debug, Error)]
pub enum SheetError {
    /// File system error while reading or writing a workbook file.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The workbook path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a readable zip package, or writing the package failed.
    #[error("invalid xlsx package {path}: {source}")]
    Zip {
        /// The workbook path.
        path: PathBuf,
        /// The underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// A package part contains malformed XML.
    #[error("malformed XML in {part}: {message}")]
    Xml {
        /// Name of the package part, e.g. `xl/workbook.xml`.
        part: String,
        /// Parser message.
        message: String,
    },

    /// A required package part is absent.
    #[error("xlsx package is missing required part {part}")]
    MissingPart {
        /// Name of the missing part.
        part: String,
    },

    /// A cell reference such as `AB12` could not be parsed.
    #[error("invalid cell reference '{reference}'")]
    InvalidCellRef {
        /// The offending reference text.
        reference: String,
    },

    /// A row or column index is outside the sheet bounds.
    #[error("invalid cell position row {row}, column {col} (rows and columns are 1-based)")]
    InvalidPosition {
        /// Row index.
        row: u64,
        /// Column index.
        col: u64,
    },

    /// A sheet name is rejected by spreadsheet applications.
    #[error("invalid sheet name '{name}': {reason}")]
    InvalidSheetName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Two sheets in one workbook share a name.
    #[error("duplicate sheet name '{name}'")]
    DuplicateSheet {
        /// The repeated name.
        name: String,
    },
}

impl SheetError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a zip package error.
    pub fn zip(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::Zip {
            path: path.into(),
            source,
        }
    }

    /// Creates an XML error for a package part.
    pub fn xml(part: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Xml {
            part: part.into(),
            message: message.to_string(),
        }
    }

    /// Creates a missing-part error.
    pub fn missing_part(part: impl Into<String>) -> Self {
        Self::MissingPart { part: part.into() }
    }

    /// Creates an invalid cell reference error.
    pub fn invalid_cell_ref(reference: impl Into<String>) -> Self {
        Self::InvalidCellRef {
            reference: reference.into(),
        }
    }

    /// Creates an invalid position error.
    pub fn invalid_position(row: impl Into<u64>, col: impl Into<u64>) -> Self {
        Self::InvalidPosition {
            row: row.into(),
            col: col.into(),
        }
    }
}
