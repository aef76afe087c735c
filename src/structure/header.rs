//! Header band detection and per-column label hierarchies.
use crate::spreadsheet::Cell;
use crate::spreadsheet::MergedRegion;
use crate::spreadsheet::Sheet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;

/// Joins hierarchy segments when a label is rendered.
pub const HIERARCHY_SEPARATOR: &str = " > ";

/// How many leading rows are searched for the header band.
pub const HEADER_SCAN_ROWS: usize = 10;

/// Only the first sheets compete for the two-row header layout.
const PRIMARY_CANDIDATES: usize = 3;

/// Header segment marking an entity code column.
const CODE_SEGMENT: &str = "CODE";

/// Ordered, de-duplicated label segments of one column, outermost first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderLabel {
    segments: Vec<String>,
}

impl HeaderLabel {
    /// `None` when no segment is given.
    pub fn new(segments: Vec<String>) -> Option<Self> {
        if segments.is_empty() {
            None
        } else {
            Some(HeaderLabel { segments })
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The outermost segment, e.g. "P/E" for "P/E > 2024".
    pub fn top(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or_default()
    }

    /// The innermost segment.
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Case-insensitive segment equality.
    pub fn has_segment(&self, text: &str) -> bool {
        self.segments.iter().any(|segment| segment.eq_ignore_ascii_case(text))
    }
}

impl Display for HeaderLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join(HIERARCHY_SEPARATOR))
    }
}

/// The value governing a cell and the bounds it came from.
#[derive(Debug)]
pub struct MergedParent<'a> {
    /// Anchor cell of the merged region, or the cell itself; `None` when blank.
    pub cell: Option<&'a Cell>,
    pub bounds: MergedRegion,
}

/// Resolves a position to its merged-region anchor.
///
/// # Arguments
/// * `sheet` - The sheet to inspect
/// * `row`, `col` - 1-based position
///
/// # Returns
/// The anchor cell and region bounds, or the cell itself with a 1x1 bound
pub fn merged_parent(sheet: &Sheet, row: usize, col: usize) -> MergedParent<'_> {
    match sheet.merged_region_at(row, col) {
        Some(region) => MergedParent {
            cell: sheet.cell(region.first_row, region.first_col),
            bounds: *region,
        },
        None => MergedParent {
            cell: sheet.cell(row, col),
            bounds: MergedRegion::single(row, col),
        },
    }
}

/// First row among `1..=max_scan` holding any value, row 1 when none does.
pub fn first_nonempty_row(sheet: &Sheet, max_scan: usize) -> usize {
    (1..=max_scan)
        .find(|row| sheet.count_filled(*row) > 0)
        .unwrap_or(1)
}

/// Distinct non-blank cells in `rows` rows from `start_row`, skipping rows past the sheet end.
pub fn count_filled_cells(sheet: &Sheet, start_row: usize, rows: usize) -> usize {
    (start_row..start_row + rows)
        .filter(|row| *row <= sheet.max_row())
        .map(|row| sheet.count_filled(row))
        .sum()
}

/// Picks the sheet whose two-row window below its first non-empty row is the most
/// populated, among the first three sheets. Earlier sheets win ties.
///
/// # Returns
/// Index of the primary sheet, `None` for an empty workbook
pub fn select_primary_sheet(sheets: &[Sheet]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (index, sheet) in sheets.iter().take(PRIMARY_CANDIDATES).enumerate() {
        let start = first_nonempty_row(sheet, HEADER_SCAN_ROWS);
        let count = count_filled_cells(sheet, start, 2);
        if best.map(|(_, most)| count > most).unwrap_or(true) {
            best = Some((index, count));
        }
    }
    best.map(|(index, _)| index)
}

/// Header rows: the first non-empty row, plus the next one on the primary sheet.
pub fn header_rows(sheet: &Sheet, is_primary: bool) -> Vec<usize> {
    let start = first_nonempty_row(sheet, HEADER_SCAN_ROWS);
    if is_primary {
        vec![start, start + 1]
    } else {
        vec![start]
    }
}

/// Builds one column's label from the header rows, reading merged anchors.
/// Rows past the sheet end are skipped.
pub fn column_hierarchy(sheet: &Sheet, header_rows: &[usize], col: usize) -> Option<HeaderLabel> {
    let mut segments = Vec::<String>::new();
    for row in header_rows.iter().copied().filter(|row| *row <= sheet.max_row()) {
        if let Some(cell) = merged_parent(sheet, row, col).cell {
            let text = cell.text();
            if !text.is_empty() && !segments.contains(&text) {
                segments.push(text);
            }
        }
    }
    HeaderLabel::new(segments)
}

/// Chooses the entity code column from the resolved headers.
///
/// Two `CODE` columns, or a single one in column 2, select column 2 (the first
/// one usually holds a sector code); anything else selects column 1.
pub fn primary_key_column(headers: &BTreeMap<usize, Option<HeaderLabel>>) -> usize {
    let code_columns: Vec<usize> = headers
        .iter()
        .filter(|(_, label)| label.as_ref().map(|label| label.has_segment(CODE_SEGMENT)).unwrap_or(false))
        .map(|(col, _)| *col)
        .collect();
    match code_columns.as_slice() {
        [_, _] | [2] => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::SheetBuilder;

    fn headers(pairs: Vec<(usize, Vec<&str>)>) -> BTreeMap<usize, Option<HeaderLabel>> {
        pairs
            .into_iter()
            .map(|(col, segments)| (col, HeaderLabel::new(segments.into_iter().map(String::from).collect())))
            .collect()
    }

    #[test]
    fn first_nonempty_row_scans_ten_rows() {
        let sheet = SheetBuilder::new("S").row(3, &["Title"]).build();
        assert_eq!(first_nonempty_row(&sheet, HEADER_SCAN_ROWS), 3);

        let sheet = SheetBuilder::new("S").row(11, &["Late"]).build();
        assert_eq!(first_nonempty_row(&sheet, HEADER_SCAN_ROWS), 1);

        let sheet = SheetBuilder::new("S").text(2, 1, "   ").row(4, &["", "x"]).build();
        assert_eq!(first_nonempty_row(&sheet, HEADER_SCAN_ROWS), 4);
    }

    #[test]
    fn primary_sheet_has_densest_header_window() {
        let sparse = SheetBuilder::new("A").row(1, &["CODE", "P/E"]).row(2, &["ABL", "8"]).build();
        let dense = SheetBuilder::new("B")
            .row(2, &["CODE", "P/E", "PBV"])
            .row(3, &["", "2024", "2024"])
            .build();
        let tied = SheetBuilder::new("C")
            .row(1, &["CODE", "P/E", "PBV"])
            .row(2, &["", "2024", "2024"])
            .build();
        let ignored = SheetBuilder::new("D")
            .row(1, &["a", "b", "c", "d", "e"])
            .row(2, &["a", "b", "c", "d", "e"])
            .build();

        assert_eq!(select_primary_sheet(&[sparse.clone(), dense.clone(), tied.clone(), ignored]), Some(1));
        assert_eq!(select_primary_sheet(&[tied, dense]), Some(0));
        assert_eq!(select_primary_sheet(&[sparse]), Some(0));
        assert_eq!(select_primary_sheet(&[]), None);
    }

    #[test]
    fn merged_parent_uses_anchor() {
        let sheet = SheetBuilder::new("S").row(1, &["Revenue"]).merge(1, 1, 1, 3).build();
        let parent = merged_parent(&sheet, 1, 3);
        assert_eq!(parent.cell.map(Cell::text).as_deref(), Some("Revenue"));
        assert_eq!(parent.bounds, MergedRegion::new(1, 1, 1, 3));

        let parent = merged_parent(&sheet, 2, 2);
        assert!(parent.cell.is_none());
        assert_eq!(parent.bounds, MergedRegion::single(2, 2));
    }

    #[test]
    fn hierarchy_from_two_rows() {
        let sheet = SheetBuilder::new("S")
            .row(1, &["CODE", "Revenue", "", "P/E"])
            .row(2, &["", "3M", "6M", "P/E"])
            .merge(1, 2, 1, 3)
            .merge(1, 1, 2, 1)
            .build();
        let rows = [1, 2];

        assert_eq!(column_hierarchy(&sheet, &rows, 1).map(|l| l.to_string()).as_deref(), Some("CODE"));
        assert_eq!(column_hierarchy(&sheet, &rows, 2).map(|l| l.to_string()).as_deref(), Some("Revenue > 3M"));
        assert_eq!(column_hierarchy(&sheet, &rows, 3).map(|l| l.to_string()).as_deref(), Some("Revenue > 6M"));
        // duplicates collapse
        assert_eq!(column_hierarchy(&sheet, &rows, 4).map(|l| l.to_string()).as_deref(), Some("P/E"));
        assert_eq!(column_hierarchy(&sheet, &rows, 5), None);

        let label = column_hierarchy(&sheet, &rows, 3).unwrap();
        assert_eq!(label.top(), "Revenue");
        assert_eq!(label.leaf(), "6M");
    }

    #[test]
    fn header_rows_past_sheet_end_are_skipped() {
        let sheet = SheetBuilder::new("S").row(1, &["CODE", "P/E"]).build();
        assert_eq!(header_rows(&sheet, true), vec![1, 2]);
        assert_eq!(column_hierarchy(&sheet, &[1, 2], 2).map(|l| l.to_string()).as_deref(), Some("P/E"));
    }

    #[test]
    fn primary_key_rules() {
        assert_eq!(primary_key_column(&headers(vec![(1, vec!["CODE"]), (2, vec!["Name"])])), 1);
        assert_eq!(primary_key_column(&headers(vec![(1, vec!["Sector", "Code"]), (2, vec!["CODE"])])), 2);
        assert_eq!(primary_key_column(&headers(vec![(1, vec!["Name"]), (2, vec!["code"])])), 2);
        assert_eq!(primary_key_column(&headers(vec![(1, vec!["Name"]), (3, vec!["CODE"])])), 1);
        assert_eq!(primary_key_column(&headers(vec![(1, vec!["CODE"]), (2, vec!["CODE"]), (3, vec!["CODE"])])), 1);
        assert_eq!(primary_key_column(&headers(vec![(1, vec![]), (2, vec!["Name"])])), 1);
        assert_eq!(primary_key_column(&BTreeMap::new()), 1);
    }
}
