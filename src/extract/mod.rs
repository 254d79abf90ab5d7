//! Spreadsheet → record descriptor extraction.
//!
//! The driving sheet has one record per row, starting at row 2:
//!
//! | col | content                                    |
//! |-----|--------------------------------------------|
//! | 1   | record number; blank ends the data         |
//! | 2   | file number                                |
//! | 3   | primary resource (display name + hyperlink)|
//! | 4   | metadata resource (hyperlink)              |
//! | 5-7 | location flags                             |

mod error;
mod extractor;
mod info;
mod record;

pub use error::ExtractError;
pub use extractor::{FIRST_DATA_ROW, RowExtractor, extract};
pub use info::write_info_json;
pub use record::{FileNum, Location, RecordDescriptor, get_location};
