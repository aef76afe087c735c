use crate::spreadsheet::Sheet;
use std::collections::BTreeSet;

/// Finds the row where footnote/glossary text begins.
///
/// A candidate is any row after the header band that is neither a header row, a
/// repeated header row (nor the row following one), nor a sector row. The first
/// candidate holding a text cell with a `':'` while leaving at least one column
/// empty is the boundary.
///
/// # Arguments
/// * `sheet` - The sheet to scan
/// * `header_rows` - Header band rows
/// * `repeating_rows` - Start rows of repeated header bands
/// * `sector_rows` - Known sector marker rows
///
/// # Returns
/// The first glossary row, `None` when the data runs to the end of the sheet
pub fn detect_glossary(sheet: &Sheet, header_rows: &[usize], repeating_rows: &[usize], sector_rows: &[usize]) -> Option<usize> {
    let start = header_rows.last().map(|row| row + 1).unwrap_or(1);
    let excluded: BTreeSet<usize> = header_rows
        .iter()
        .copied()
        .chain(repeating_rows.iter().flat_map(|row| [*row, row + 1]))
        .chain(sector_rows.iter().copied())
        .collect();

    (start..=sheet.max_row())
        .filter(|row| !excluded.contains(row))
        .find(|row| is_glossary_row(sheet, *row))
}

fn is_glossary_row(sheet: &Sheet, row: usize) -> bool {
    let width = sheet.max_column();
    let mut filled = 0;
    let mut has_colon = false;
    for col in 1..=width {
        if let Some(cell) = sheet.cell(row, col) {
            filled += 1;
            has_colon |= cell.is_text() && cell.value.contains(':');
        }
    }
    has_colon && filled > 0 && filled < width
}
