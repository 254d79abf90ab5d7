//! Error types for record extraction.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while extracting record descriptors from a sheet.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file number cell of a record row is empty.
    #[error("row {line}: file number (column 2) is empty")]
    MissingFileNum {
        /// Sheet row number.
        line: u32,
    },

    /// A resource cell carries no hyperlink.
    #[error("row {line}: column {column} has no hyperlink")]
    MissingHyperlink {
        /// Sheet row number.
        line: u32,
        /// Column expected to hold the hyperlink.
        column: u32,
    },

    /// A hyperlink target is not an absolute http(s) URL.
    #[error("row {line}: invalid resource URL '{url}': {reason}")]
    InvalidUrl {
        /// Sheet row number.
        line: u32,
        /// The rejected target.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A record was constructed for the header row or row 0.
    #[error("record line {line} is not a data row (data starts at row 2)")]
    InvalidLine {
        /// The rejected row number.
        line: u32,
    },

    /// Writing the info file failed.
    #[error("IO error writing {path}: {source}")]
    Io {
        /// The info file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Serializing the records failed.
    #[error("cannot serialize records for {path}: {source}")]
    Json {
        /// The info file path.
        path: PathBuf,
        /// The underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}

impl ExtractError {
    /// Creates an invalid URL error.
    pub fn invalid_url(line: u32, url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            line,
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns the sheet row the error refers to, if any.
    #[must_use]
    pub fn line(&self) -> Option<u32> {
        match self {
            Self::MissingFileNum { line }
            | Self::MissingHyperlink { line, .. }
            | Self::InvalidUrl { line, .. }
            | Self::InvalidLine { line } => Some(*line),
            Self::Io { .. } | Self::Json { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_hyperlink_display() {
        let error = ExtractError::MissingHyperlink { line: 4, column: 3 };
        let msg = error.to_string();
        assert!(msg.contains("row 4"), "Expected row in: {msg}");
        assert!(msg.contains("column 3"), "Expected column in: {msg}");
        assert_eq!(error.line(), Some(4));
    }

    #[test]
    fn test_invalid_url_display() {
        let error = ExtractError::invalid_url(2, "ftp://x", "unsupported scheme");
        let msg = error.to_string();
        assert!(msg.contains("ftp://x"), "Expected URL in: {msg}");
        assert!(msg.contains("unsupported scheme"), "Expected reason in: {msg}");
    }

    #[test]
    fn test_io_error_has_no_line() {
        let error = ExtractError::Io {
            path: PathBuf::from("x_info.json"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(error.line(), None);
    }
}
