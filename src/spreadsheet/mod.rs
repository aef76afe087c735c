//! # Spreadsheet Grid Module
//!
//! Read-only access to the cell grids of an Excel (.xlsx, .xlsm) workbook:
//! typed cells addressed by 1-based (row, column), merged regions, and the
//! ordered list of worksheets. Grids can also be assembled in memory with
//! [`SheetBuilder`].
pub mod cell;
pub(crate) mod excel;
pub mod reference;
pub mod sheet;
pub(crate) mod xlsx;

use crate::error::ResultMessage;
use crate::error::SheetwiseError;
use crate::helpers::reader::UnifiedReader;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub use cell::Cell;
pub use cell::CellType;
pub use sheet::MergedRegion;
pub use sheet::Sheet;
pub use sheet::SheetBuilder;

/// Errors raised while loading a workbook.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Missing workbook part '{0}'")]
    FileError(String),

    #[error("Spreadsheet '{0}' has no worksheets")]
    SpreadsheetEmptyError(String),

    #[error("Unsupported file format '{0}', expected .xlsx or .xlsm")]
    UnsupportedFormatError(String),

    #[error("Invalid merged range '{0}'")]
    MergedRangeError(String),

    #[error("Sheet '{0}' references missing shared string #{1}")]
    SharedStringError(String, usize),
}

/// A workbook format able to produce sheet grids
pub(crate) trait Spreadsheet {
    /// File name of this spreadsheet
    fn name(&self) -> String;

    /// Loads the string table shared by all worksheets
    fn load_shared_strings(&mut self) -> Result<Vec<String>, SheetwiseError>;

    /// Reads every worksheet, in workbook order
    fn read_sheets(&mut self, shared_strings: &[String]) -> Result<Vec<Sheet>, SheetwiseError>;
}

/// Reads all sheets of a local workbook file.
///
/// # Arguments
/// * `path` - Path to an `.xlsx`/`.xlsm` file
///
/// # Returns
/// The sheets in workbook order, or the load error prefixed with the file name
pub fn read_workbook_file(path: &Path) -> Result<Vec<Sheet>, SheetwiseError> {
    let name = path.display().to_string();
    let result = check_extension(path).and_then(|_| {
        let reader = UnifiedReader::open(path)?;
        read_sheets(&name, reader)
    });
    result.with_prefix(&name)
}

/// Reads all sheets of a workbook already held in memory.
pub fn read_workbook_bytes(name: &str, bytes: Vec<u8>) -> Result<Vec<Sheet>, SheetwiseError> {
    let result = UnifiedReader::from_bytes(name, bytes).and_then(|reader| read_sheets(name, reader));
    result.with_prefix(name)
}

fn read_sheets(name: &str, reader: UnifiedReader) -> Result<Vec<Sheet>, SheetwiseError> {
    let mut spreadsheet = XlsxSpreadsheet::open(name, reader)?;
    let shared_strings = spreadsheet.load_shared_strings()?;
    let sheets = spreadsheet.read_sheets(&shared_strings)?;
    info!(file = spreadsheet.name(), sheets = sheets.len(), "loaded workbook");
    Ok(sheets)
}

fn check_extension(path: &Path) -> Result<(), SheetwiseError> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase());
    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") => Ok(()),
        _ => Err(SpreadsheetError::UnsupportedFormatError(path.display().to_string()))?,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_extensions() {
        let error = read_workbook_file(Path::new("prices.ods")).unwrap_err();
        assert!(error.to_string().contains("Unsupported file format"));
    }

    #[test]
    fn rejects_non_zip_bytes() {
        assert!(read_workbook_bytes("upload.xlsx", b"not a zip archive".to_vec()).is_err());
        assert!(read_workbook_bytes("upload.xlsx", Vec::new()).is_err());
    }
}
