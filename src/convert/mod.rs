//! JSON document → spreadsheet conversion.
//!
//! This module provides:
//! - [`coerce`] - JSON value to cell value mapping
//! - [`build`] - schema-driven table construction (compact or full layout)
//! - [`convert_file`] - the file-level entry point used by `json2xlsx`

mod builder;
mod coerce;
mod error;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{info, warn};

pub use builder::{COMPACT_SHEET_NAME, HEADER_COLUMN_WIDTH, NO_HEADER, build};
pub use coerce::{Coerced, coerce};
pub use error::{BuildPhase, ConvertError};

use crate::paths::with_base_suffix;
use crate::schema::Schema;

const UTF8_BOM: char = '\u{feff}';

/// Output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMethod {
    /// All columns on one sheet with `Sheet.Column` headers.
    #[default]
    Compact,
    /// One sheet per schema sheet.
    Full,
}

impl OutputMethod {
    /// The name used on the command line and in output file names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for OutputMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "full" => Ok(Self::Full),
            other => Err(format!(
                "unknown output method '{other}' (expected 'compact' or 'full')"
            )),
        }
    }
}

/// Inputs of one conversion run.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// JSON document to read.
    pub input: PathBuf,
    /// Output path prefix; its extension is replaced by `_<method>.xlsx`.
    pub output: PathBuf,
    /// Output layout.
    pub method: OutputMethod,
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    /// The workbook that was written.
    pub output: PathBuf,
    /// Number of sheets written.
    pub sheets: usize,
    /// Highest data row count over all sheets, excluding the header row.
    pub data_rows: u32,
    /// True when an existing file was replaced.
    pub overwritten: bool,
}

/// Resolves `<output base>_<method>.xlsx`.
#[must_use]
pub fn output_path_for(output: &Path, method: OutputMethod) -> PathBuf {
    with_base_suffix(output, &format!("_{method}.xlsx"))
}

/// Reads a JSON document, builds the workbook, and saves it.
///
/// The workbook is written only after the whole build succeeded, so a
/// failed conversion never leaves a new output file behind.
///
/// # Errors
///
/// Returns [`ConvertError::InputNotFile`] when the input is missing or not a
/// regular file, [`ConvertError::OutputIsDirectory`] when the resolved
/// output is a directory, [`ConvertError::Io`] / [`ConvertError::Json`] when
/// the document cannot be read, any error of [`build`], and
/// [`ConvertError::Save`] when writing the workbook fails.
pub fn convert_file(
    request: &ConversionRequest,
    schema: &Schema,
) -> Result<ConversionOutcome, ConvertError> {
    let output = output_path_for(&request.output, request.method);

    if !request.input.is_file() {
        return Err(ConvertError::InputNotFile {
            path: request.input.clone(),
        });
    }

    let overwritten = if output.is_dir() {
        return Err(ConvertError::OutputIsDirectory { path: output });
    } else if output.exists() {
        warn!(path = %output.display(), "overwriting existing output file");
        true
    } else {
        false
    };

    let content = std::fs::read_to_string(&request.input).map_err(|source| ConvertError::Io {
        path: request.input.clone(),
        source,
    })?;
    let document: serde_json::Value = serde_json::from_str(content.trim_start_matches(UTF8_BOM))
        .map_err(|source| ConvertError::Json {
            path: request.input.clone(),
            source,
        })?;

    let workbook = build(schema, &document, request.method)?;

    info!(path = %output.display(), "saving workbook");
    workbook
        .save(&output)
        .map_err(|source| ConvertError::Save {
            path: output.clone(),
            source,
        })?;

    Ok(ConversionOutcome {
        sheets: workbook.sheets().len(),
        data_rows: workbook
            .sheets()
            .iter()
            .map(|sheet| sheet.max_row().saturating_sub(1))
            .max()
            .unwrap_or(0),
        output,
        overwritten,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_output_method_parse_and_display() {
        assert_eq!("compact".parse::<OutputMethod>().unwrap(), OutputMethod::Compact);
        assert_eq!(" FULL ".parse::<OutputMethod>().unwrap(), OutputMethod::Full);
        assert_eq!(OutputMethod::default(), OutputMethod::Compact);
        assert_eq!(OutputMethod::Full.to_string(), "full");
        let err = "wide".parse::<OutputMethod>().unwrap_err();
        assert!(err.contains("'wide'"), "Expected method in: {err}");
    }

    #[test]
    fn test_output_path_for_appends_method() {
        assert_eq!(
            output_path_for(Path::new("out/book.xlsx"), OutputMethod::Compact),
            PathBuf::from("out/book_compact.xlsx")
        );
        assert_eq!(
            output_path_for(Path::new("book"), OutputMethod::Full),
            PathBuf::from("book_full.xlsx")
        );
    }

    #[test]
    fn test_convert_file_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let request = ConversionRequest {
            input: dir.path().join("absent.json"),
            output: dir.path().join("out"),
            method: OutputMethod::Compact,
        };
        let err = convert_file(&request, &Schema::catalogue()).unwrap_err();
        assert!(matches!(err, ConvertError::InputNotFile { .. }));
    }

    #[test]
    fn test_convert_file_input_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let request = ConversionRequest {
            input: dir.path().to_path_buf(),
            output: dir.path().join("out"),
            method: OutputMethod::Compact,
        };
        let err = convert_file(&request, &Schema::catalogue()).unwrap_err();
        assert!(matches!(err, ConvertError::InputNotFile { .. }));
    }

    #[test]
    fn test_convert_file_output_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        std::fs::write(&input, "{}").unwrap();
        std::fs::create_dir(dir.path().join("out_full.xlsx")).unwrap();
        let request = ConversionRequest {
            input,
            output: dir.path().join("out"),
            method: OutputMethod::Full,
        };
        let err = convert_file(&request, &Schema::catalogue()).unwrap_err();
        assert!(matches!(err, ConvertError::OutputIsDirectory { .. }));
    }

    #[test]
    fn test_convert_file_schema_mismatch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        std::fs::write(&input, r#"{"Bookseller": {"Name": ["Acme"]}}"#).unwrap();
        let request = ConversionRequest {
            input,
            output: dir.path().join("out.xlsx"),
            method: OutputMethod::Compact,
        };
        let err = convert_file(&request, &Schema::catalogue()).unwrap_err();
        assert!(matches!(err, ConvertError::SchemaMismatch { .. }));
        assert!(!dir.path().join("out_compact.xlsx").exists());
    }

    #[test]
    fn test_convert_file_accepts_bom_and_reports_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        std::fs::write(&input, "\u{feff}{\"Bookseller\": {\"Name\": [\"Acme\", \"Brill\"]}}")
            .unwrap();
        let schema = Schema::new(vec![crate::schema::SheetSpec::new("Bookseller", ["Name"])])
            .unwrap();
        let request = ConversionRequest {
            input,
            output: dir.path().join("out.xlsx"),
            method: OutputMethod::Compact,
        };

        let first = convert_file(&request, &schema).unwrap();
        assert_eq!(first.output, dir.path().join("out_compact.xlsx"));
        assert_eq!((first.sheets, first.data_rows), (1, 2));
        assert!(!first.overwritten);

        let second = convert_file(&request, &schema).unwrap();
        assert!(second.overwritten);
    }

    #[test]
    fn test_convert_file_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        std::fs::write(&input, "{oops").unwrap();
        let request = ConversionRequest {
            input,
            output: dir.path().join("out"),
            method: OutputMethod::Compact,
        };
        let err = convert_file(&request, &Schema::catalogue()).unwrap_err();
        assert!(matches!(err, ConvertError::Json { .. }));
    }
}
