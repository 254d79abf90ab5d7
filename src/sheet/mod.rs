//! In-memory spreadsheet model and xlsx persistence.
//!
//! The conversion and extraction code never touches the file format. They
//! work against [`Workbook`] / [`Worksheet`] values and the [`SheetSource`]
//! read trait; [`Workbook::save`] and [`Workbook::open`] translate to and from
//! Office Open XML packages.
//!
//! # Example
//!
//! ```no_run
//! use sheetbridge_core::sheet::{CellValue, Workbook, Worksheet};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut sheet = Worksheet::new("Compact")?;
//! sheet.set_value(1, 1, CellValue::Text("Bookseller.Name".into()))?;
//! let mut book = Workbook::new();
//! book.add_sheet(sheet)?;
//! book.save(std::path::Path::new("out_compact.xlsx"))?;
//! # Ok(())
//! # }
//! ```

mod cell_ref;
mod error;
mod reader;
mod writer;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

pub use cell_ref::{MAX_COLUMNS, MAX_ROWS, cell_ref, column_letter, parse_cell_ref};
pub use error::SheetError;

/// Maximum sheet name length accepted by spreadsheet applications.
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN_SHEET_NAME_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

static EMPTY_VALUE: CellValue = CellValue::Empty;

/// The value stored in one cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// No value.
    #[default]
    Empty,
    /// Whole number.
    Int(i64),
    /// Non-integral number.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Plain text, never evaluated as a formula.
    Text(String),
}

impl CellValue {
    /// Returns true for empty cells and empty text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// Returns the text content, if this is a text cell.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the integer content, accepting integral floats.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(value) if value.fract() == 0.0 && value.abs() < 9.0e15 => {
                Some(*value as i64)
            }
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{}", if *value { "TRUE" } else { "FALSE" }),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Formatting applied to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellStyle {
    /// Bold font.
    pub bold: bool,
    /// Explicit wrap-text alignment; `None` leaves the application default.
    pub wrap_text: Option<bool>,
}

impl CellStyle {
    /// Style used for header cells.
    pub const HEADER: Self = Self {
        bold: true,
        wrap_text: None,
    };

    /// Style used for data cells.
    pub const DATA: Self = Self {
        bold: false,
        wrap_text: Some(false),
    };
}

/// One cell: value, style, and optional hyperlink target.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    /// The stored value.
    pub value: CellValue,
    /// Formatting.
    pub style: CellStyle,
    /// Hyperlink target, distinct from the displayed value.
    pub hyperlink: Option<String>,
}

impl Cell {
    /// Creates a cell with the given value and style.
    #[must_use]
    pub fn new(value: CellValue, style: CellStyle) -> Self {
        Self {
            value,
            style,
            hyperlink: None,
        }
    }
}

/// Read access to a grid of cells, addressed by 1-based row and column.
///
/// Positions outside the populated area read as empty.
pub trait SheetSource {
    /// Returns the value at `(row, col)`.
    fn cell_value(&self, row: u32, col: u32) -> &CellValue;

    /// Returns the hyperlink target at `(row, col)`, if any.
    fn hyperlink(&self, row: u32, col: u32) -> Option<&str>;
}

/// A named, sparse grid of cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<(u32, u32), Cell>,
    column_widths: BTreeMap<u32, f64>,
}

impl Worksheet {
    /// Creates an empty worksheet.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::InvalidSheetName`] when the name is empty, longer
    /// than 31 characters, or contains one of `[]:*?/\`.
    pub fn new(name: impl Into<String>) -> Result<Self, SheetError> {
        let name = name.into();
        validate_sheet_name(&name)?;
        Ok(Self {
            name,
            cells: BTreeMap::new(),
            column_widths: BTreeMap::new(),
        })
    }

    /// Returns the sheet name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores a cell, replacing whatever was there.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::InvalidPosition`] when the position is outside the sheet.
    pub fn set_cell(&mut self, row: u32, col: u32, cell: Cell) -> Result<(), SheetError> {
        check_position(row, col)?;
        self.cells.insert((row, col), cell);
        Ok(())
    }

    /// Stores a value, keeping any existing style and hyperlink.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::InvalidPosition`] when the position is outside the sheet.
    pub fn set_value(&mut self, row: u32, col: u32, value: CellValue) -> Result<(), SheetError> {
        check_position(row, col)?;
        self.cells.entry((row, col)).or_default().value = value;
        Ok(())
    }

    /// Attaches a hyperlink target to a cell.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::InvalidPosition`] when the position is outside the sheet.
    pub fn set_hyperlink(
        &mut self,
        row: u32,
        col: u32,
        target: impl Into<String>,
    ) -> Result<(), SheetError> {
        check_position(row, col)?;
        self.cells.entry((row, col)).or_default().hyperlink = Some(target.into());
        Ok(())
    }

    /// Returns the cell at a position.
    #[must_use]
    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Iterates populated cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = ((u32, u32), &Cell)> {
        self.cells.iter().map(|(position, cell)| (*position, cell))
    }

    /// Sets the display width of a column.
    pub fn set_column_width(&mut self, col: u32, width: f64) {
        self.column_widths.insert(col, width);
    }

    /// Returns the display width of a column, if one was set.
    #[must_use]
    pub fn column_width(&self, col: u32) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    /// Iterates explicit column widths in column order.
    pub fn column_widths(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.column_widths.iter().map(|(col, width)| (*col, *width))
    }

    /// Returns the highest populated row, or 0 for an empty sheet.
    #[must_use]
    pub fn max_row(&self) -> u32 {
        self.cells.keys().map(|(row, _)| *row).max().unwrap_or(0)
    }

    /// Returns the highest populated column, or 0 for an empty sheet.
    #[must_use]
    pub fn max_column(&self) -> u32 {
        self.cells.keys().map(|(_, col)| *col).max().unwrap_or(0)
    }
}

impl SheetSource for Worksheet {
    fn cell_value(&self, row: u32, col: u32) -> &CellValue {
        self.cells
            .get(&(row, col))
            .map_or(&EMPTY_VALUE, |cell| &cell.value)
    }

    fn hyperlink(&self, row: u32, col: u32) -> Option<&str> {
        self.cells
            .get(&(row, col))
            .and_then(|cell| cell.hyperlink.as_deref())
    }
}

/// An ordered collection of worksheets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
    active: usize,
}

impl Workbook {
    /// Creates an empty workbook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a worksheet.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::DuplicateSheet`] when a sheet with the same name
    /// (compared case-insensitively, as spreadsheet applications do) exists.
    pub fn add_sheet(&mut self, sheet: Worksheet) -> Result<(), SheetError> {
        if self
            .sheets
            .iter()
            .any(|existing| existing.name.eq_ignore_ascii_case(&sheet.name))
        {
            return Err(SheetError::DuplicateSheet { name: sheet.name });
        }
        self.sheets.push(sheet);
        Ok(())
    }

    /// Returns all worksheets in order.
    #[must_use]
    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    /// Looks up a worksheet by name.
    #[must_use]
    pub fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    /// Returns the worksheet shown when the file is opened.
    #[must_use]
    pub fn active_sheet(&self) -> Option<&Worksheet> {
        self.sheets.get(self.active).or_else(|| self.sheets.first())
    }

    /// Returns the index of the active worksheet.
    #[must_use]
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Selects the active worksheet; out-of-range indices fall back to the first sheet.
    pub fn set_active(&mut self, index: usize) {
        self.active = if index < self.sheets.len() { index } else { 0 };
    }

    /// Writes the workbook as an xlsx file, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError`] when packaging or writing the file fails.
    pub fn save(&self, path: &Path) -> Result<(), SheetError> {
        writer::write_workbook(self, path)
    }

    /// Reads an xlsx file.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError`] when the file cannot be read or is not a valid package.
    pub fn open(path: &Path) -> Result<Self, SheetError> {
        reader::read_workbook(path)
    }
}

fn validate_sheet_name(name: &str) -> Result<(), SheetError> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name.chars().count() > MAX_SHEET_NAME_LEN {
        Some("name is longer than 31 characters")
    } else if name.contains(FORBIDDEN_SHEET_NAME_CHARS) {
        Some("name contains one of []:*?/\\")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(SheetError::InvalidSheetName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn check_position(row: u32, col: u32) -> Result<(), SheetError> {
    if row == 0 || col == 0 || row > MAX_ROWS || col > MAX_COLUMNS {
        return Err(SheetError::invalid_position(row, col));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_worksheet_rejects_invalid_names() {
        assert!(Worksheet::new("").is_err());
        assert!(Worksheet::new("a/b").is_err());
        assert!(Worksheet::new("x".repeat(32)).is_err());
        assert!(Worksheet::new("Pages (original)").is_ok());
    }

    #[test]
    fn test_worksheet_unset_cells_read_empty() {
        let sheet = Worksheet::new("S").unwrap();
        assert_eq!(sheet.cell_value(5, 5), &CellValue::Empty);
        assert_eq!(sheet.hyperlink(5, 5), None);
        assert_eq!(sheet.max_row(), 0);
    }

    #[test]
    fn test_worksheet_set_value_keeps_hyperlink() {
        let mut sheet = Worksheet::new("S").unwrap();
        sheet.set_hyperlink(2, 3, "https://example.com/a").unwrap();
        sheet.set_value(2, 3, "shown".into()).unwrap();
        assert_eq!(sheet.cell_value(2, 3), &CellValue::Text("shown".into()));
        assert_eq!(sheet.hyperlink(2, 3), Some("https://example.com/a"));
        assert_eq!((sheet.max_row(), sheet.max_column()), (2, 3));
    }

    #[test]
    fn test_worksheet_rejects_zero_position() {
        let mut sheet = Worksheet::new("S").unwrap();
        assert!(matches!(
            sheet.set_value(0, 1, CellValue::Int(1)),
            Err(SheetError::InvalidPosition { .. })
        ));
    }

    #[test]
    fn test_workbook_rejects_duplicate_names_case_insensitive() {
        let mut book = Workbook::new();
        book.add_sheet(Worksheet::new("Owner").unwrap()).unwrap();
        let result = book.add_sheet(Worksheet::new("owner").unwrap());
        assert!(matches!(result, Err(SheetError::DuplicateSheet { .. })));
    }

    #[test]
    fn test_workbook_active_sheet_falls_back_to_first() {
        let mut book = Workbook::new();
        book.add_sheet(Worksheet::new("One").unwrap()).unwrap();
        book.add_sheet(Worksheet::new("Two").unwrap()).unwrap();
        book.set_active(1);
        assert_eq!(book.active_sheet().unwrap().name(), "Two");
        book.set_active(9);
        assert_eq!(book.active_sheet().unwrap().name(), "One");
    }

    #[test]
    fn test_cell_value_blank_and_int() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::Text(String::new()).is_blank());
        assert!(!CellValue::Int(0).is_blank());
        assert_eq!(CellValue::Float(3.0).as_int(), Some(3));
        assert_eq!(CellValue::Float(3.5).as_int(), None);
        assert_eq!(CellValue::Int(7).to_string(), "7");
    }
}
