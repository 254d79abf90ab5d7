//! A1-style cell reference helpers.

use super::error::SheetError;

/// Largest column index a worksheet can hold (`XFD`).
pub const MAX_COLUMNS: u32 = 16_384;

/// Largest row index a worksheet can hold.
pub const MAX_ROWS: u32 = 1_048_576;

/// Converts a 1-based column index into its letter form (`1` → `A`, `27` → `AA`).
///
/// Index `0` has no letter form and yields an empty string.
#[must_use]
pub fn column_letter(col: u32) -> String {
    let mut letters = Vec::new();
    let mut remaining = col;
    while remaining > 0 {
        let offset = (remaining - 1) % 26;
        // offset < 26, so the cast cannot truncate
        #[allow(clippy::cast_possible_truncation)]
        letters.push(char::from(b'A' + offset as u8));
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Formats a 1-based `(row, col)` pair as an A1 reference.
#[must_use]
pub fn cell_ref(row: u32, col: u32) -> String {
    format!("{}{row}", column_letter(col))
}

/// Parses an A1 reference such as `AB12` into a 1-based `(row, col)` pair.
///
/// Absolute markers (`$A$1`) are accepted and ignored.
///
/// # Errors
///
/// Returns [`SheetError::InvalidCellRef`] when the text is not a reference
/// or points outside the worksheet bounds.
pub fn parse_cell_ref(reference: &str) -> Result<(u32, u32), SheetError> {
    let cleaned: String = reference.chars().filter(|c| *c != '$').collect();
    let split = cleaned
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| SheetError::invalid_cell_ref(reference))?;
    let (letters, digits) = cleaned.split_at(split);

    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(SheetError::invalid_cell_ref(reference));
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        let value = u32::from(c.to_ascii_uppercase()) - u32::from('A') + 1;
        col = col
            .checked_mul(26)
            .and_then(|v| v.checked_add(value))
            .ok_or_else(|| SheetError::invalid_cell_ref(reference))?;
    }

    let row: u32 = digits
        .parse()
        .map_err(|_| SheetError::invalid_cell_ref(reference))?;

    if row == 0 || row > MAX_ROWS || col > MAX_COLUMNS {
        return Err(SheetError::invalid_cell_ref(reference));
    }
    Ok((row, col))
}
