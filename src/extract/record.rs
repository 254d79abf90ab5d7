//! Record descriptors and location derivation.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use super::error::ExtractError;
use crate::sheet::CellValue;

/// A record's file number, as found in the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileNum {
    /// Numeric file number.
    Int(i64),
    /// Textual file number.
    Text(String),
}

impl FileNum {
    /// Reads a file number from a cell; blank cells yield `None`.
    #[must_use]
    pub fn from_cell(value: &CellValue) -> Option<Self> {
        if let Some(int) = value.as_int() {
            return Some(Self::Int(int));
        }
        match value {
            CellValue::Empty => None,
            CellValue::Text(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| Self::Text(text.to_string()))
            }
            other => Some(Self::Text(other.to_string())),
        }
    }
}

impl fmt::Display for FileNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Archive location code derived from the three location flag columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Location {
    /// First flag set.
    #[serde(rename = "xDF575regioDeWijk")]
    DeWijk,
    /// Second flag set.
    #[serde(rename = "xDC108Groningen1")]
    Groningen,
    /// Third flag set or empty.
    #[serde(rename = "xDF573regioHavelte")]
    Havelte,
    /// No flag matched.
    #[default]
    #[serde(rename = "")]
    Unknown,
}

impl Location {
    /// The code written to the info file.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::DeWijk => "xDF575regioDeWijk",
            Self::Groningen => "xDC108Groningen1",
            Self::Havelte => "xDF573regioHavelte",
            Self::Unknown => "",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

fn flag_set(value: &CellValue) -> bool {
    match value {
        CellValue::Bool(flag) => *flag,
        CellValue::Text(text) => text.trim() == "1",
        other => other.as_int() == Some(1),
    }
}

/// Derives the location from the three flag cells.
///
/// The first flag wins, then the second; the third matches when set or
/// blank. A `0` in all three yields [`Location::Unknown`].
#[must_use]
pub fn get_location(wijk: &CellValue, gron: &CellValue, have: &CellValue) -> Location {
    if flag_set(wijk) {
        Location::DeWijk
    } else if flag_set(gron) {
        Location::Groningen
    } else if have.is_blank() || flag_set(have) {
        Location::Havelte
    } else {
        Location::Unknown
    }
}

/// One row's extracted view, used to drive archival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordDescriptor {
    line: u32,
    filenum: FileNum,
    mrg_name: String,
    mrg_url: String,
    meta_url: String,
    location: Location,
}

impl RecordDescriptor {
    /// Creates a validated descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidLine`] for rows below 2,
    /// [`ExtractError::MissingFileNum`] for a blank textual file number, and
    /// [`ExtractError::InvalidUrl`] when either URL is not absolute http(s).
    pub fn new(
        line: u32,
        filenum: FileNum,
        mrg_name: impl Into<String>,
        mrg_url: &str,
        meta_url: &str,
        location: Location,
    ) -> Result<Self, ExtractError> {
        if line < 2 {
            return Err(ExtractError::InvalidLine { line });
        }
        if matches!(&filenum, FileNum::Text(text) if text.trim().is_empty()) {
            return Err(ExtractError::MissingFileNum { line });
        }
        Ok(Self {
            line,
            filenum,
            mrg_name: mrg_name.into(),
            mrg_url: validate_url(line, mrg_url)?,
            meta_url: validate_url(line, meta_url)?,
            location,
        })
    }

    /// Sheet row the record came from.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// File number used to name archive files.
    #[must_use]
    pub fn filenum(&self) -> &FileNum {
        &self.filenum
    }

    /// Displayed name of the primary resource cell.
    #[must_use]
    pub fn mrg_name(&self) -> &str {
        &self.mrg_name
    }

    /// Primary resource URL.
    #[must_use]
    pub fn mrg_url(&self) -> &str {
        &self.mrg_url
    }

    /// Metadata resource URL.
    #[must_use]
    pub fn meta_url(&self) -> &str {
        &self.meta_url
    }

    /// Derived location.
    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }
}

fn validate_url(line: u32, raw: &str) -> Result<String, ExtractError> {
    let trimmed = raw.trim();
    let parsed =
        Url::parse(trimmed).map_err(|e| ExtractError::invalid_url(line, raw, e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        scheme => Err(ExtractError::invalid_url(
            line,
            raw,
            format!("unsupported scheme '{scheme}'"),
        )),
    }
}
