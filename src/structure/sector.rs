use crate::spreadsheet::Sheet;
use serde::Serialize;

/// Labels must be longer than this to mark a sector.
const MIN_LABEL_CHARS: usize = 4;

/// A row opening a categorical group of data rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SectorMarker {
    pub row: usize,
    pub label: String,
}

/// Scans `start_row..` for sector marker rows, stopping before `glossary_start`.
///
/// A marker row has text longer than four characters in column 1 and a blank
/// column 2. Markers are returned top to bottom, duplicates included.
pub fn detect_sectors(sheet: &Sheet, start_row: usize, glossary_start: Option<usize>) -> Vec<SectorMarker> {
    let end = glossary_start.unwrap_or(sheet.max_row() + 1);
    (start_row..end)
        .filter_map(|row| {
            let cell = sheet.cell(row, 1).filter(|cell| cell.is_text())?;
            let label = cell.text();
            (label.chars().count() > MIN_LABEL_CHARS && sheet.is_blank(row, 2)).then_some(SectorMarker { row, label })
        })
        .collect()
}
