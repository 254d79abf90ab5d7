//! Row-by-row record extraction.

use tracing::{debug, trace};

use super::error::ExtractError;
use super::record::{FileNum, RecordDescriptor, get_location};
use crate::sheet::{MAX_ROWS, SheetSource};

/// First row holding data; row 1 is the header.
pub const FIRST_DATA_ROW: u32 = 2;

const COL_RECORD: u32 = 1;
const COL_FILENUM: u32 = 2;
const COL_PRIMARY: u32 = 3;
const COL_METADATA: u32 = 4;
const COL_LOCATION_WIJK: u32 = 5;
const COL_LOCATION_GRON: u32 = 6;
const COL_LOCATION_HAVE: u32 = 7;

/// Lazily yields one [`RecordDescriptor`] per data row.
///
/// Iteration starts at row 2 and ends at the first row whose record number
/// (column 1) is blank. The iterator is fused: after the sentinel, an error,
/// or the last sheet row it only returns `None`. Restarting means creating a
/// new extractor.
#[derive(Debug)]
pub struct RowExtractor<'a, S: SheetSource + ?Sized> {
    source: &'a S,
    next_row: u32,
    finished: bool,
}

impl<'a, S: SheetSource + ?Sized> RowExtractor<'a, S> {
    /// Creates an extractor positioned at the first data row.
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            next_row: FIRST_DATA_ROW,
            finished: false,
        }
    }

    fn read_row(&self, row: u32) -> Result<RecordDescriptor, ExtractError> {
        let filenum = FileNum::from_cell(self.source.cell_value(row, COL_FILENUM))
            .ok_or(ExtractError::MissingFileNum { line: row })?;

        let mrg_name = self.source.cell_value(row, COL_PRIMARY).to_string();
        let mrg_url = self.hyperlink(row, COL_PRIMARY)?;
        let meta_url = self.hyperlink(row, COL_METADATA)?;

        let location = get_location(
            self.source.cell_value(row, COL_LOCATION_WIJK),
            self.source.cell_value(row, COL_LOCATION_GRON),
            self.source.cell_value(row, COL_LOCATION_HAVE),
        );

        RecordDescriptor::new(row, filenum, mrg_name, mrg_url, meta_url, location)
    }

    fn hyperlink(&self, row: u32, column: u32) -> Result<&'a str, ExtractError> {
        self.source
            .hyperlink(row, column)
            .ok_or(ExtractError::MissingHyperlink { line: row, column })
    }
}

impl<S: SheetSource + ?Sized> Iterator for RowExtractor<'_, S> {
    type Item = Result<RecordDescriptor, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let row = self.next_row;
        if row > MAX_ROWS || self.source.cell_value(row, COL_RECORD).is_blank() {
            debug!(row, "end of records");
            self.finished = true;
            return None;
        }

        let result = self.read_row(row);
        match &result {
            Ok(record) => trace!(row, filenum = %record.filenum(), "record extracted"),
            Err(_) => self.finished = true,
        }
        self.next_row = row.saturating_add(1);
        Some(result)
    }
}

impl<S: SheetSource + ?Sized> std::iter::FusedIterator for RowExtractor<'_, S> {}

/// Extracts every record of a sheet, in row order.
///
/// # Errors
///
/// Returns the first [`ExtractError`] encountered; no records are returned
/// in that case.
pub fn extract<S: SheetSource + ?Sized>(source: &S) -> Result<Vec<RecordDescriptor>, ExtractError> {
    RowExtractor::new(source).collect()
}
