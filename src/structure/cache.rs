use crate::spreadsheet::Sheet;
use crate::structure::resolve_structure;
use crate::structure::SheetStructure;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// Lazily resolved structures keyed by sheet name.
///
/// Each slot is computed at most once, on first access; a cache lives exactly as
/// long as the sheets it was built for.
#[derive(Debug, Default)]
pub struct StructureCache {
    slots: Vec<OnceLock<SheetStructure>>,
    index: HashMap<String, usize>,
}

impl StructureCache {
    pub fn new(sheets: &[Sheet]) -> Self {
        let mut index = HashMap::new();
        for (position, sheet) in sheets.iter().enumerate() {
            // Duplicate names resolve to the first sheet
            index.entry(sheet.name().to_owned()).or_insert(position);
        }
        StructureCache {
            slots: sheets.iter().map(|_| OnceLock::new()).collect(),
            index,
        }
    }

    /// Position of a sheet by exact name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Returns the cached structure of `sheets[position]`, resolving it on first use.
    ///
    /// # Arguments
    /// * `sheets` - The sheets this cache was built for
    /// * `position` - Index of the sheet
    /// * `primary` - Index of the primary sheet, if any
    pub fn get(&self, sheets: &[Sheet], position: usize, primary: Option<usize>) -> Option<&SheetStructure> {
        let slot = self.slots.get(position)?;
        let sheet = sheets.get(position)?;
        Some(slot.get_or_init(|| {
            debug!(sheet = sheet.name(), "resolving structure on first access");
            resolve_structure(sheet, primary == Some(position))
        }))
    }

    /// Number of structures resolved so far.
    pub fn resolved(&self) -> usize {
        self.slots.iter().filter(|slot| slot.get().is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::SheetBuilder;

    #[test]
    fn resolves_once_per_sheet() {
        let sheets = vec![
            SheetBuilder::new("Market").row(1, &["CODE", "P/E"]).row(2, &["", "2024"]).row(3, &["ABL", "8"]).build(),
            SheetBuilder::new("Other").row(1, &["CODE"]).row(2, &["ABL"]).build(),
        ];
        let cache = StructureCache::new(&sheets);
        assert_eq!(cache.resolved(), 0);
        assert_eq!(cache.position("Other"), Some(1));
        assert_eq!(cache.position("missing"), None);

        let first = cache.get(&sheets, 0, Some(0)).unwrap();
        assert_eq!(first.header_rows, vec![1, 2]);
        let again = cache.get(&sheets, 0, Some(0)).unwrap();
        assert!(std::ptr::eq(first, again));

        assert_eq!(cache.get(&sheets, 1, Some(0)).unwrap().header_rows, vec![1]);
        assert_eq!(cache.resolved(), 2);
        assert!(cache.get(&sheets, 2, Some(0)).is_none());
    }
}
