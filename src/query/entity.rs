use crate::workbook::Workbook;
use tracing::debug;

/// Maps company codes to data rows and sector names to row ranges.
pub struct EntityResolver<'a> {
    workbook: &'a Workbook,
}

impl<'a> EntityResolver<'a> {
    pub fn new(workbook: &'a Workbook) -> Self {
        EntityResolver { workbook }
    }

    /// Data row holding `code` in the sheet's key column.
    ///
    /// An exact, case-sensitive match wins; otherwise a code such as `ABL.N0000`
    /// falls back to its `ABL` prefix, compared case-insensitively.
    pub fn find_company(&self, sheet: &str, code: &str) -> Option<usize> {
        let data = self.workbook.sheet(sheet)?;
        let structure = self.workbook.structure(sheet)?;
        let key = structure.primary_key_column;
        let code = code.trim();
        let exact = structure
            .data_rows
            .iter()
            .copied()
            .find(|row| data.text(*row, key) == code);
        if exact.is_some() {
            return exact;
        }
        let (prefix, _) = code.split_once('.')?;
        structure
            .data_rows
            .iter()
            .copied()
            .find(|row| data.text(*row, key).eq_ignore_ascii_case(prefix))
    }

    /// Data rows between the sector's marker and the next marker, `None` for an unknown sector.
    pub fn sector_rows(&self, sheet: &str, name: &str) -> Option<Vec<usize>> {
        let structure = self.workbook.structure(sheet)?;
        let name = name.trim();
        let position = structure
            .sectors
            .iter()
            .position(|sector| sector.label.eq_ignore_ascii_case(name))?;
        let start = structure.sectors[position].row;
        let end = structure
            .sectors
            .get(position + 1)
            .map(|next| next.row)
            .unwrap_or(structure.max_row + 1);
        let rows: Vec<usize> = structure
            .data_rows
            .iter()
            .copied()
            .filter(|row| start < *row && *row < end)
            .collect();
        debug!(sheet, sector = name, rows = rows.len(), "resolved sector rows");
        Some(rows)
    }

    /// Sector labels of a sheet in order.
    pub fn sectors(&self, sheet: &str) -> Vec<String> {
        self.workbook
            .structure(sheet)
            .map(|structure| structure.sectors.iter().map(|sector| sector.label.clone()).collect())
            .unwrap_or_default()
    }

    /// Whether the code resolves to a row on any sheet.
    pub fn is_company(&self, code: &str) -> bool {
        self.workbook
            .sheet_names()
            .iter()
            .any(|sheet| self.find_company(sheet, code).is_some())
    }

    /// Whether the name resolves to a non-empty sector on any sheet.
    pub fn is_sector(&self, name: &str) -> bool {
        self.workbook
            .sheet_names()
            .iter()
            .any(|sheet| self.sector_rows(sheet, name).map(|rows| !rows.is_empty()).unwrap_or(false))
    }
}
