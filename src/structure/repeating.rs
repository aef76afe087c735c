use crate::spreadsheet::Sheet;

/// Per column, the stripped non-blank texts of a band of rows.
pub type BandSignature = Vec<Vec<String>>;

/// Signature of the `height`-row band starting at `start_row`, over columns `1..=width`.
///
/// Raw cell values are used, merged anchors are not propagated. Rows past the end of
/// the sheet contribute nothing.
pub fn band_signature(sheet: &Sheet, start_row: usize, height: usize, width: usize) -> BandSignature {
    (1..=width)
        .map(|col| {
            (start_row..start_row + height)
                .filter(|row| *row <= sheet.max_row())
                .filter_map(|row| sheet.cell(row, col).map(|cell| cell.text()))
                .collect()
        })
        .collect()
}

/// Finds every row after the header band whose band reproduces the header band.
///
/// # Arguments
/// * `sheet` - The sheet to scan
/// * `header_rows` - Consecutive header rows, in order
///
/// # Returns
/// Start rows of each repeated header band, ascending
pub fn find_repeating_headers(sheet: &Sheet, header_rows: &[usize]) -> Vec<usize> {
    let (Some(first), Some(last)) = (header_rows.first(), header_rows.last()) else {
        return vec![];
    };
    let height = header_rows.len();
    let width = sheet.max_column();
    let signature = band_signature(sheet, *first, height, width);
    // A blank band would match every blank stretch of the sheet
    if signature.iter().all(Vec::is_empty) {
        return vec![];
    }
    (last + 1..sheet.max_row())
        .filter(|row| band_signature(sheet, *row, height, width) == signature)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::SheetBuilder;

    #[test]
    fn signature_ignores_merges_and_blanks() {
        let sheet = SheetBuilder::new("S")
            .row(1, &["CODE", "Revenue", ""])
            .row(2, &["", " 3M ", "6M"])
            .merge(1, 2, 1, 3)
            .build();
        assert_eq!(
            band_signature(&sheet, 1, 2, 3),
            vec![vec!["CODE".to_string()], vec!["Revenue".to_string(), "3M".to_string()], vec!["6M".to_string()]]
        );
        assert_eq!(band_signature(&sheet, 2, 3, 1), vec![Vec::<String>::new()]);
    }

    #[test]
    fn finds_every_repeated_band() {
        let sheet = SheetBuilder::new("S")
            .row(1, &["CODE", "P/E"])
            .row(2, &["", "2024"])
            .row(3, &["ABL", "8.5"])
            .row(4, &["CODE", "P/E"])
            .row(5, &["", "2024"])
            .row(6, &["BOC", "5"])
            .row(7, &["CODE", "P/E"])
            .row(8, &["", "2024"])
            .row(9, &["HNB", "4"])
            .build();
        assert_eq!(find_repeating_headers(&sheet, &[1, 2]), vec![4, 7]);
    }

    #[test]
    fn partial_band_does_not_match() {
        let sheet = SheetBuilder::new("S")
            .row(1, &["CODE", "P/E"])
            .row(2, &["", "2024"])
            .row(3, &["ABL", "8.5"])
            .row(4, &["CODE", "P/E"])
            .row(5, &["", "2025"])
            .row(6, &["BOC", "5"])
            .build();
        assert!(find_repeating_headers(&sheet, &[1, 2]).is_empty());
    }

    #[test]
    fn last_row_is_not_a_start_candidate() {
        let sheet = SheetBuilder::new("S").row(1, &["CODE"]).row(2, &["ABL"]).row(3, &["CODE"]).build();
        assert!(find_repeating_headers(&sheet, &[1]).is_empty());

        let sheet = SheetBuilder::new("S")
            .row(1, &["CODE"])
            .row(2, &["CODE"])
            .row(3, &["ABL"])
            .build();
        assert_eq!(find_repeating_headers(&sheet, &[1]), vec![2]);
    }

    #[test]
    fn blank_header_band_never_repeats() {
        let sheet = SheetBuilder::new("S").row(3, &["ABL", "8"]).build();
        assert!(find_repeating_headers(&sheet, &[1]).is_empty());
        assert!(find_repeating_headers(&sheet, &[]).is_empty());
    }
}
