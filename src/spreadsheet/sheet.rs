use crate::error::SheetwiseError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::row_to_index;
use crate::spreadsheet::SpreadsheetError;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::OnceLock;

/// A rectangular merged area; the anchor is the top-left cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MergedRegion {
    pub first_row: usize,
    pub first_col: usize,
    pub last_row: usize,
    pub last_col: usize,
}

impl MergedRegion {
    pub fn new(first_row: usize, first_col: usize, last_row: usize, last_col: usize) -> Self {
        MergedRegion {
            first_row: first_row.min(last_row),
            first_col: first_col.min(last_col),
            last_row: first_row.max(last_row),
            last_col: first_col.max(last_col),
        }
    }

    /// A 1x1 region around a single cell
    pub fn single(row: usize, col: usize) -> Self {
        MergedRegion::new(row, col, row, col)
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.first_row..=self.last_row).contains(&row) && (self.first_col..=self.last_col).contains(&col)
    }
}

impl TryFrom<&str> for MergedRegion {
    type Error = SheetwiseError;

    /// Parses a merge reference such as "A1:C2" (a single cell "B4" is also accepted).
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^\$?([A-Z]+)\$?(\d+)(?::\$?([A-Z]+)\$?(\d+))?$").expect("Hardcode regex pattern")
        });
        let reference = value.trim().to_ascii_uppercase();
        let invalid = || SpreadsheetError::MergedRangeError(value.to_owned());
        let captures = pattern.captures(&reference).ok_or_else(invalid)?;
        let first_col = col_to_index(&captures[1]).ok_or_else(invalid)?;
        let first_row = row_to_index(&captures[2]).ok_or_else(invalid)?;
        let last_col = match captures.get(3) {
            Some(matcher) => col_to_index(matcher.as_str()).ok_or_else(invalid)?,
            None => first_col,
        };
        let last_row = match captures.get(4) {
            Some(matcher) => row_to_index(matcher.as_str()).ok_or_else(invalid)?,
            None => first_row,
        };
        Ok(MergedRegion::new(first_row, first_col, last_row, last_col))
    }
}

impl Display for MergedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            index_to_reference(self.first_row, self.first_col),
            index_to_reference(self.last_row, self.last_col)
        )
    }
}

/// One worksheet: a sparse, 1-based grid of cells plus merged regions.
/// Read-only once loaded.
#[derive(Clone, Debug, Default)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<(usize, usize), Cell>,
    merged: Vec<MergedRegion>,
    max_row: usize,
    max_column: usize,
}

impl Sheet {
    pub(crate) fn new(name: &str) -> Self {
        Sheet {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last row holding a value or covered by a merged region, 0 for an empty sheet.
    pub fn max_row(&self) -> usize {
        self.max_row
    }

    /// Last column holding a value or covered by a merged region, 0 for an empty sheet.
    pub fn max_column(&self) -> usize {
        self.max_column
    }

    pub fn merged_regions(&self) -> &[MergedRegion] {
        &self.merged
    }

    /// The cell at (row, col); `None` for blank or out-of-range positions.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(&(row, col)).filter(|cell| !cell.is_blank())
    }

    /// Stripped display text, empty when blank.
    pub fn text(&self, row: usize, col: usize) -> String {
        self.cell(row, col).map(Cell::text).unwrap_or_default()
    }

    pub fn is_blank(&self, row: usize, col: usize) -> bool {
        self.cell(row, col).is_none()
    }

    /// The merged region covering (row, col), if any.
    pub fn merged_region_at(&self, row: usize, col: usize) -> Option<&MergedRegion> {
        self.merged.iter().find(|region| region.contains(row, col))
    }

    /// Number of non-blank cells in a row.
    pub fn count_filled(&self, row: usize) -> usize {
        self.cells
            .range((row, 0)..=(row, usize::MAX))
            .filter(|(_, cell)| !cell.is_blank())
            .count()
    }

    pub(crate) fn push(&mut self, cell: Cell) {
        if cell.kind == CellType::Empty {
            return;
        }
        self.max_row = self.max_row.max(cell.row);
        self.max_column = self.max_column.max(cell.col);
        self.cells.insert((cell.row, cell.col), cell);
    }

    pub(crate) fn push_merged(&mut self, region: MergedRegion) {
        self.max_row = self.max_row.max(region.last_row);
        self.max_column = self.max_column.max(region.last_col);
        self.merged.push(region);
    }
}

/// Builds an in-memory [`Sheet`] without going through a workbook file.
///
/// ```
/// use sheetwise::spreadsheet::SheetBuilder;
///
/// let sheet = SheetBuilder::new("Prices")
///     .row(1, &["CODE", "P/E"])
///     .row(2, &["ABL", "8.5"])
///     .build();
/// assert_eq!(sheet.cell(2, 2).and_then(|cell| cell.as_number()), Some(8.5));
/// ```
#[derive(Debug)]
pub struct SheetBuilder {
    sheet: Sheet,
}

impl SheetBuilder {
    pub fn new(name: &str) -> Self {
        SheetBuilder { sheet: Sheet::new(name) }
    }

    /// Fills a row from column 1; values parsing as numbers become numeric cells,
    /// empty strings leave the cell blank.
    pub fn row(mut self, row: usize, values: &[&str]) -> Self {
        for (offset, value) in values.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let kind = if value.trim().parse::<f64>().is_ok() {
                CellType::Number
            } else {
                CellType::InlineString
            };
            self.sheet.push(Cell::new(row, offset + 1, kind, value.trim()));
        }
        self
    }

    /// Sets a text cell, even when the text looks numeric.
    pub fn text(mut self, row: usize, col: usize, value: &str) -> Self {
        self.sheet.push(Cell::new(row, col, CellType::InlineString, value));
        self
    }

    pub fn number(mut self, row: usize, col: usize, value: f64) -> Self {
        self.sheet.push(Cell::new(row, col, CellType::Number, value.to_string()));
        self
    }

    pub fn cell(mut self, cell: Cell) -> Self {
        self.sheet.push(cell);
        self
    }

    pub fn merge(mut self, first_row: usize, first_col: usize, last_row: usize, last_col: usize) -> Self {
        self.sheet.push_merged(MergedRegion::new(first_row, first_col, last_row, last_col));
        self
    }

    pub fn build(self) -> Sheet {
        self.sheet
    }
}
