//! Info file holding the extracted records.

use std::path::Path;

use tracing::info;

use super::error::ExtractError;
use super::record::RecordDescriptor;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes the records as a JSON array, UTF-8 encoded with a leading BOM.
///
/// # Errors
///
/// Returns [`ExtractError::Json`] if serialization fails and
/// [`ExtractError::Io`] if the file cannot be written.
pub fn write_info_json(path: &Path, records: &[RecordDescriptor]) -> Result<(), ExtractError> {
    let mut bytes = UTF8_BOM.to_vec();
    serde_json::to_writer(&mut bytes, records).map_err(|source| ExtractError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, bytes).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), records = records.len(), "info file written");
    Ok(())
}
