//! Spreadsheet → archived resources entry point.
//!
//! A run has two stages. [`prepare`] validates paths, reads the active sheet
//! of the driving workbook, extracts every record, creates the archive
//! directory, and writes `<output base>_info.json`. [`archive`] then fetches
//! the two resources of each record. [`harvest`] runs both.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::download::{
    ArchiveFetcher, ArchiveReport, ArchiveStatus, DEFAULT_ARCHIVE_PREFIX, ResourceFetcher,
    ResourceKind,
};
use crate::extract::{ExtractError, RecordDescriptor, extract, write_info_json};
use crate::paths::with_base_suffix;
use crate::sheet::{SheetError, Workbook};

/// Errors that abort a harvest before any resource is fetched.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Input path is missing or not a regular file.
    #[error("input {path} is not a file")]
    InputNotFile {
        /// The input path.
        path: PathBuf,
    },

    /// Output path exists and is not a directory.
    #[error("output {path} exists and is not a directory")]
    OutputNotDirectory {
        /// The output path.
        path: PathBuf,
    },

    /// The workbook could not be opened.
    #[error("cannot read workbook {path}: {source}")]
    Workbook {
        /// The input path.
        path: PathBuf,
        /// The underlying spreadsheet error.
        #[source]
        source: SheetError,
    },

    /// The workbook has no worksheets.
    #[error("workbook {path} has no worksheets")]
    NoSheets {
        /// The input path.
        path: PathBuf,
    },

    /// Extracting records or writing the info file failed.
    #[error("cannot extract records from {path}: {source}")]
    Extract {
        /// The input path.
        path: PathBuf,
        /// The underlying extraction error.
        #[source]
        source: ExtractError,
    },

    /// The archive directory could not be created.
    #[error("cannot create output directory {path}: {source}")]
    CreateDir {
        /// The output directory.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Inputs of one harvest run.
#[derive(Debug, Clone)]
pub struct HarvestRequest {
    /// Driving workbook.
    pub input: PathBuf,
    /// Archive directory.
    pub output: PathBuf,
    /// Archive file name prefix.
    pub prefix: String,
}

impl HarvestRequest {
    /// Creates a request using the default archive prefix.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            prefix: DEFAULT_ARCHIVE_PREFIX.to_string(),
        }
    }

    /// Path of the info file, `<output base>_info.json`.
    #[must_use]
    pub fn info_path(&self) -> PathBuf {
        with_base_suffix(&self.output, "_info.json")
    }
}

/// Records extracted by [`prepare`], ready for archiving.
#[derive(Debug, Clone)]
pub struct HarvestPlan {
    /// Records in sheet order.
    pub records: Vec<RecordDescriptor>,
    /// The info file that was written.
    pub info_path: PathBuf,
    /// Name of the sheet the records were read from.
    pub sheet: String,
}

/// Result of a complete harvest run.
#[derive(Debug, Clone)]
pub struct HarvestOutcome {
    /// The extraction stage.
    pub plan: HarvestPlan,
    /// The archive stage.
    pub report: ArchiveReport,
}

/// Validates paths, extracts records, and writes the info file.
///
/// Nothing is created on disk unless extraction succeeded.
///
/// # Errors
///
/// Returns [`HarvestError`] when the input is not a file, the output is an
/// existing non-directory, the workbook cannot be read or has no sheets,
/// a row cannot be extracted, or the directory or info file cannot be written.
pub fn prepare(request: &HarvestRequest) -> Result<HarvestPlan, HarvestError> {
    if !request.input.is_file() {
        return Err(HarvestError::InputNotFile {
            path: request.input.clone(),
        });
    }
    if request.output.exists() && !request.output.is_dir() {
        return Err(HarvestError::OutputNotDirectory {
            path: request.output.clone(),
        });
    }

    let workbook = Workbook::open(&request.input).map_err(|source| HarvestError::Workbook {
        path: request.input.clone(),
        source,
    })?;
    let sheet = workbook
        .active_sheet()
        .ok_or_else(|| HarvestError::NoSheets {
            path: request.input.clone(),
        })?;
    let records = extract(sheet).map_err(|source| extract_error(&request.input, source))?;
    info!(sheet = sheet.name(), records = records.len(), "records extracted");

    std::fs::create_dir_all(&request.output).map_err(|source| HarvestError::CreateDir {
        path: request.output.clone(),
        source,
    })?;

    let info_path = request.info_path();
    write_info_json(&info_path, &records)
        .map_err(|source| extract_error(&request.input, source))?;

    Ok(HarvestPlan {
        records,
        info_path,
        sheet: sheet.name().to_string(),
    })
}

fn extract_error(path: &Path, source: ExtractError) -> HarvestError {
    HarvestError::Extract {
        path: path.to_path_buf(),
        source,
    }
}

/// Archives the resources of a prepared plan into the request's directory.
pub async fn archive<F>(
    request: &HarvestRequest,
    plan: &HarvestPlan,
    fetcher: &dyn ResourceFetcher,
    on_resource: F,
) -> ArchiveReport
where
    F: FnMut(&RecordDescriptor, ResourceKind, &ArchiveStatus),
{
    ArchiveFetcher::new(fetcher, &request.output)
        .with_prefix(request.prefix.as_str())
        .archive_all(&plan.records, on_resource)
        .await
}

/// Runs [`prepare`] and [`archive`].
///
/// # Errors
///
/// Returns the errors of [`prepare`]; resource failures are reported in the
/// outcome, not as errors.
pub async fn harvest(
    request: &HarvestRequest,
    fetcher: &dyn ResourceFetcher,
) -> Result<HarvestOutcome, HarvestError> {
    let plan = prepare(request)?;
    let report = archive(request, &plan, fetcher, |_, _, _| {}).await;
    Ok(HarvestOutcome { plan, report })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sheet::{CellValue, Worksheet};

    fn write_driving_workbook(path: &Path, rows: &[(i64, &str)]) {
        let mut sheet = Worksheet::new("Sheet1").unwrap();
        sheet.set_value(1, 1, "nr".into()).unwrap();
        for (row, (filenum, base)) in (2..).zip(rows) {
            sheet.set_value(row, 1, CellValue::Int(i64::from(row) - 1)).unwrap();
            sheet.set_value(row, 2, CellValue::Int(*filenum)).unwrap();
            sheet.set_value(row, 3, "scan".into()).unwrap();
            sheet.set_hyperlink(row, 3, format!("{base}/{filenum}.psd")).unwrap();
            sheet.set_hyperlink(row, 4, format!("{base}/{filenum}.xml")).unwrap();
            sheet.set_value(row, 5, CellValue::Int(1)).unwrap();
        }
        let mut book = Workbook::new();
        book.add_sheet(sheet).unwrap();
        book.save(path).unwrap();
    }

    #[test]
    fn test_info_path_is_sibling_of_output() {
        let request = HarvestRequest::new("in.xlsx", "/data/archive");
        assert_eq!(request.info_path(), PathBuf::from("/data/archive_info.json"));
    }

    #[test]
    fn test_prepare_rejects_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let request = HarvestRequest::new(dir.path().join("nope.xlsx"), dir.path().join("out"));
        assert!(matches!(
            prepare(&request),
            Err(HarvestError::InputNotFile { .. })
        ));
    }

    #[test]
    fn test_prepare_rejects_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.xlsx");
        write_driving_workbook(&input, &[(1, "https://example.com")]);
        let output = dir.path().join("taken");
        std::fs::write(&output, "x").unwrap();

        let request = HarvestRequest::new(input, output);
        assert!(matches!(
            prepare(&request),
            Err(HarvestError::OutputNotDirectory { .. })
        ));
    }

    #[test]
    fn test_prepare_creates_directory_and_info_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.xlsx");
        write_driving_workbook(&input, &[(11, "https://example.com"), (12, "https://example.com")]);
        let request = HarvestRequest::new(input, dir.path().join("archive"));

        let plan = prepare(&request).unwrap();

        assert_eq!(plan.records.len(), 2);
        assert_eq!(plan.sheet, "Sheet1");
        assert!(dir.path().join("archive").is_dir());
        assert_eq!(plan.info_path, dir.path().join("archive_info.json"));
        let bytes = std::fs::read(&plan.info_path).unwrap();
        assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    }

    #[test]
    fn test_prepare_extraction_error_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.xlsx");
        write_driving_workbook(&input, &[(1, "not-a-url")]);
        let request = HarvestRequest::new(input, dir.path().join("archive"));

        let err = prepare(&request).unwrap_err();

        assert!(matches!(err, HarvestError::Extract { .. }), "got {err:?}");
        assert!(!dir.path().join("archive").exists());
        assert!(!dir.path().join("archive_info.json").exists());
    }

    #[test]
    fn test_prepare_rejects_non_workbook_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.xlsx");
        std::fs::write(&input, "plain text").unwrap();
        let request = HarvestRequest::new(input, dir.path().join("archive"));
        assert!(matches!(
            prepare(&request),
            Err(HarvestError::Workbook { .. })
        ));
    }
}
