//! A loaded workbook: its sheets, the primary sheet, and lazily resolved structures.
use crate::error::SheetwiseError;
use crate::spreadsheet::read_workbook_bytes;
use crate::spreadsheet::read_workbook_file;
use crate::spreadsheet::Sheet;
use crate::structure::header::select_primary_sheet;
use crate::structure::SheetStructure;
use crate::structure::StructureCache;
use glob::Pattern;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug)]
pub struct Workbook {
    name: String,
    source: Option<PathBuf>,
    sheets: Vec<Sheet>,
    primary: Option<usize>,
    structures: StructureCache,
}

impl Workbook {
    /// Reads an `.xlsx`/`.xlsm` file.
    pub fn open(path: &Path) -> Result<Self, SheetwiseError> {
        let sheets = read_workbook_file(path)?;
        let mut workbook = Workbook::from_sheets(&path.display().to_string(), sheets);
        workbook.source = Some(path.to_path_buf());
        Ok(workbook)
    }

    /// Reads a workbook from bytes, e.g. an upload.
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Self, SheetwiseError> {
        let sheets = read_workbook_bytes(name, bytes)?;
        Ok(Workbook::from_sheets(name, sheets))
    }

    /// Wraps sheets that are already in memory.
    pub fn from_sheets(name: &str, sheets: Vec<Sheet>) -> Self {
        let primary = select_primary_sheet(&sheets);
        if let Some(index) = primary {
            info!(workbook = name, sheet = sheets[index].name(), "selected primary sheet");
        }
        Workbook {
            name: name.to_owned(),
            source: None,
            structures: StructureCache::new(&sheets),
            sheets,
            primary,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(Sheet::name).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.structures.position(name).and_then(|index| self.sheets.get(index))
    }

    /// The sheet with the two-row header band.
    pub fn primary_sheet(&self) -> Option<&Sheet> {
        self.primary.and_then(|index| self.sheets.get(index))
    }

    /// The structure of a sheet, resolved on first access and cached.
    pub fn structure(&self, name: &str) -> Option<&SheetStructure> {
        let index = self.structures.position(name)?;
        self.structures.get(&self.sheets, index, self.primary)
    }

    /// Sheets whose name matches a glob pattern such as `Sheet*`.
    pub fn matching_sheets(&self, pattern: &str) -> Result<Vec<&Sheet>, SheetwiseError> {
        let pattern = Pattern::new(pattern)?;
        Ok(self.sheets.iter().filter(|sheet| pattern.matches(sheet.name())).collect())
    }

    /// Re-reads the file this workbook came from, dropping every cached structure.
    /// In-memory workbooks are left unchanged.
    pub fn reload(&mut self) -> Result<(), SheetwiseError> {
        if let Some(path) = self.source.clone() {
            *self = Workbook::open(&path)?;
        }
        Ok(())
    }
}
