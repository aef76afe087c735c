use crate::config::MetricCatalog;
use crate::structure::HeaderLabel;
use crate::workbook::Workbook;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// Comparison form of a metric name or header: lower-case, trimmed, without
/// `.`, `/` or whitespace.
pub fn canonicalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != '.' && *c != '/' && !c.is_whitespace())
        .collect()
}

/// A header column matching a metric keyword.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MetricMatch {
    pub sheet: String,
    pub column: usize,
    pub label: HeaderLabel,
}

/// Spellings tried for a keyword, in canonical form.
pub fn candidates(keyword: &str) -> BTreeSet<String> {
    let keyword = keyword.trim();
    let first_word = keyword.split(' ').next().unwrap_or_default();
    [
        keyword.to_owned(),
        keyword.replace(' ', ""),
        keyword.replace(' ', "."),
        first_word.to_owned(),
    ]
    .iter()
    .map(|candidate| canonicalize(candidate))
    .filter(|candidate| !candidate.is_empty())
    .collect()
}

/// Finds header columns for free-text metric names across a workbook.
pub struct MetricResolver<'a> {
    workbook: &'a Workbook,
    catalog: &'a MetricCatalog,
}

impl<'a> MetricResolver<'a> {
    pub fn new(workbook: &'a Workbook, catalog: &'a MetricCatalog) -> Self {
        MetricResolver { workbook, catalog }
    }

    /// Every column, on every sheet, whose top-level header matches `keyword`.
    ///
    /// Matches are ordered by sheet, then column. For ambiguous metrics only the
    /// lowest matching column of each sheet is kept.
    pub fn find(&self, keyword: &str) -> Vec<MetricMatch> {
        let candidates = candidates(keyword);
        let mut matches = Vec::new();
        for sheet in self.workbook.sheets() {
            let Some(structure) = self.workbook.structure(sheet.name()) else {
                continue;
            };
            let mut ambiguous_seen = false;
            for (column, label) in structure.headers.iter() {
                let Some(label) = label else {
                    continue;
                };
                let top = canonicalize(label.top());
                if !candidates.contains(&top) {
                    continue;
                }
                if self.catalog.is_ambiguous(&top) {
                    if ambiguous_seen {
                        continue;
                    }
                    ambiguous_seen = true;
                }
                matches.push(MetricMatch {
                    sheet: sheet.name().to_owned(),
                    column: *column,
                    label: label.clone(),
                });
            }
        }
        debug!(keyword, matches = matches.len(), "resolved metric columns");
        matches
    }

    /// Matching columns of one sheet, ascending.
    pub fn find_in_sheet(&self, keyword: &str, sheet: &str) -> Vec<MetricMatch> {
        self.find(keyword)
            .into_iter()
            .filter(|found| found.sheet == sheet)
            .collect()
    }
}
