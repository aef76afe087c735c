//! # Structural Inference Module
//!
//! Infers the logical layout of a sheet with no declared schema: the header band
//! and per-column label hierarchies, header bands repeated further down, the row
//! where trailing glossary text begins, sector marker rows, and from those the set
//! of data rows and the entity code column.
pub mod cache;
pub mod glossary;
pub mod header;
pub mod repeating;
pub mod sector;

use crate::spreadsheet::reference::index_to_col;
use crate::spreadsheet::Sheet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use tracing::debug;

pub use cache::StructureCache;
pub use header::HeaderLabel;
pub use sector::SectorMarker;

/// The inferred layout of one sheet. Immutable once resolved.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SheetStructure {
    pub sheet_name: String,
    /// Column index to label; `None` marks a blank header.
    pub headers: BTreeMap<usize, Option<HeaderLabel>>,
    pub header_rows: Vec<usize>,
    pub repeating_header_rows: Vec<usize>,
    pub glossary_start: Option<usize>,
    pub sectors: Vec<SectorMarker>,
    /// Ascending.
    pub data_rows: Vec<usize>,
    pub primary_key_column: usize,
    pub max_row: usize,
}

impl SheetStructure {
    /// Rows that can never hold data.
    pub fn excluded_rows(&self) -> BTreeSet<usize> {
        let mut excluded: BTreeSet<usize> = self.header_rows.iter().copied().collect();
        excluded.extend(self.repeating_header_rows.iter().flat_map(|row| [*row, row + 1]));
        excluded.extend(self.sectors.iter().map(|sector| sector.row));
        if let Some(glossary) = self.glossary_start {
            excluded.extend(glossary..=self.max_row);
        }
        excluded
    }

    pub fn header(&self, col: usize) -> Option<&HeaderLabel> {
        self.headers.get(&col).and_then(Option::as_ref)
    }

    /// One line per column: `A: Revenue > 3M`, or `A: [Blank]`.
    pub fn describe_headers(&self) -> Vec<String> {
        self.headers
            .iter()
            .map(|(col, label)| match label {
                Some(label) => format!("{}: {}", index_to_col(*col), label),
                None => format!("{}: [Blank]", index_to_col(*col)),
            })
            .collect()
    }
}

/// Infers the structure of a sheet.
///
/// The detectors run in a fixed order: header rows, repeated header bands, the
/// glossary boundary (which sees no sector rows yet), then sectors up to the
/// glossary. A sector row that also passes the glossary test therefore ends the
/// data region.
///
/// # Arguments
/// * `sheet` - The sheet to inspect
/// * `is_primary` - Whether the sheet uses a two-row header band
///
/// # Returns
/// The resolved structure; the same sheet always yields an equal value
pub fn resolve_structure(sheet: &Sheet, is_primary: bool) -> SheetStructure {
    let header_rows = header::header_rows(sheet, is_primary);
    let headers: BTreeMap<usize, Option<HeaderLabel>> = (1..=sheet.max_column())
        .map(|col| (col, header::column_hierarchy(sheet, &header_rows, col)))
        .collect();
    let primary_key_column = header::primary_key_column(&headers);

    let first_data_row = header_rows.last().map(|row| row + 1).unwrap_or(1);
    let repeating_header_rows = repeating::find_repeating_headers(sheet, &header_rows);
    let glossary_start = glossary::detect_glossary(sheet, &header_rows, &repeating_header_rows, &[]);
    let sectors = sector::detect_sectors(sheet, first_data_row, glossary_start);

    let mut structure = SheetStructure {
        sheet_name: sheet.name().to_owned(),
        headers,
        header_rows,
        repeating_header_rows,
        glossary_start,
        sectors,
        data_rows: vec![],
        primary_key_column,
        max_row: sheet.max_row(),
    };
    let excluded = structure.excluded_rows();
    structure.data_rows = (first_data_row..=sheet.max_row())
        .filter(|row| !excluded.contains(row))
        .collect();

    debug!(
        sheet = sheet.name(),
        header_rows = ?structure.header_rows,
        repeats = ?structure.repeating_header_rows,
        glossary = ?structure.glossary_start,
        sectors = structure.sectors.len(),
        data_rows = structure.data_rows.len(),
        key_column = structure.primary_key_column,
        "resolved sheet structure"
    );
    structure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::SheetBuilder;
    use proptest::prelude::*;

    fn market_sheet() -> Sheet {
        SheetBuilder::new("Market")
            .row(1, &["SECTOR", "CODE", "P/E", "Div Yield"])
            .row(2, &["", "", "2024", "%"])
            .row(3, &["BANKS"])
            .row(4, &["B1", "ABL", "8.5", "2"])
            .row(5, &["B1", "BOC", "5", "4"])
            .row(6, &["SECTOR", "CODE", "P/E", "Div Yield"])
            .row(7, &["", "", "2024", "%"])
            .row(8, &["HOTELS"])
            .row(9, &["H1", "AHPL", "12", "1"])
            .row(10, &["Source: exchange filings"])
            .row(11, &["X1", "ZZZ", "1", "1"])
            .build()
    }

    #[test]
    fn resolves_primary_sheet() {
        let structure = resolve_structure(&market_sheet(), true);

        assert_eq!(structure.header_rows, vec![1, 2]);
        assert_eq!(structure.repeating_header_rows, vec![6]);
        assert_eq!(structure.glossary_start, Some(10));
        assert_eq!(
            structure.sectors,
            vec![
                SectorMarker { row: 3, label: "BANKS".to_string() },
                SectorMarker { row: 8, label: "HOTELS".to_string() }
            ]
        );
        assert_eq!(structure.data_rows, vec![4, 5, 9]);
        assert_eq!(structure.primary_key_column, 2);
        assert_eq!(structure.header(3).map(|label| label.to_string()).as_deref(), Some("P/E > 2024"));
    }

    #[test]
    fn ordinary_sheet_uses_one_header_row() {
        let sheet = SheetBuilder::new("Other")
            .row(2, &["CODE", "", "PBV"])
            .row(3, &["ABL", "", "1.2"])
            .row(4, &["BOC", "", "0.9"])
            .build();
        let structure = resolve_structure(&sheet, false);

        assert_eq!(structure.header_rows, vec![2]);
        assert_eq!(structure.data_rows, vec![3, 4]);
        assert_eq!(structure.primary_key_column, 1);
        assert_eq!(structure.describe_headers(), vec!["A: CODE", "B: [Blank]", "C: PBV"]);
    }

    #[test]
    fn sector_row_with_colon_becomes_glossary() {
        let sheet = SheetBuilder::new("S")
            .row(1, &["CODE", "P/E"])
            .row(2, &["BANKS: LICENSED"])
            .row(3, &["ABL", "8.5"])
            .build();
        let structure = resolve_structure(&sheet, false);

        assert_eq!(structure.glossary_start, Some(2));
        assert!(structure.sectors.is_empty());
        assert!(structure.data_rows.is_empty());
    }

    #[test]
    fn empty_sheet() {
        let structure = resolve_structure(&SheetBuilder::new("Empty").build(), true);
        assert_eq!(structure.header_rows, vec![1, 2]);
        assert!(structure.headers.is_empty());
        assert!(structure.data_rows.is_empty());
        assert_eq!(structure.primary_key_column, 1);
    }

    fn cell_value() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec!["", "", "CODE", "P/E", "BANKS", "HOTELS", "ABL", "8.5", "4", "Note: x", "A:B"])
    }

    proptest! {
        #[test]
        fn data_rows_never_overlap_structure(
            grid in prop::collection::vec(prop::collection::vec(cell_value(), 1..5), 1..25),
            is_primary in any::<bool>(),
        ) {
            let mut builder = SheetBuilder::new("Random");
            for (index, values) in grid.iter().enumerate() {
                builder = builder.row(index + 1, values);
            }
            let sheet = builder.build();

            let structure = resolve_structure(&sheet, is_primary);
            let excluded = structure.excluded_rows();
            for row in &structure.data_rows {
                prop_assert!(!excluded.contains(row));
                prop_assert!(*row > *structure.header_rows.last().unwrap());
                prop_assert!(*row <= sheet.max_row());
            }
            prop_assert!(structure.data_rows.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert_eq!(&structure, &resolve_structure(&sheet, is_primary));
        }
    }
}
