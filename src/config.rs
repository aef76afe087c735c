//! Metric reference data: aliases, definitions, ranking preferences and the
//! composite score weights. Built once, read-only afterwards.
use crate::error::ResultMessage;
use crate::error::SheetwiseError;
use crate::query::metric::canonicalize;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Alias '{0}' maps to an empty metric name")]
    EmptyMetricError(String),

    #[error("Composite weight for '{0}' must be a positive number, got {1}")]
    InvalidWeightError(String, f64),

    #[error("Range for '{0}' needs min <= max and a positive step")]
    InvalidRangeError(String),
}

/// A metric contributing to the composite stock score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeight {
    pub metric: String,
    /// Magnitude; the sign comes from [`MetricCatalog::lower_is_better`].
    pub weight: f64,
}

/// Slider bounds offered for range queries on a metric.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// Reference tables shared by the metric resolver and the query interpreter.
///
/// Every field falls back to the built-in value when missing from a TOML file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricCatalog {
    /// Free-text alias to canonical metric name.
    pub aliases: BTreeMap<String, String>,
    /// Canonical metric name to a one-paragraph definition.
    pub definitions: BTreeMap<String, String>,
    /// Canonical forms (see [`canonicalize`]) of metrics where smaller is preferable.
    pub lower_is_better: Vec<String>,
    pub composite: Vec<CompositeWeight>,
    pub ranges: BTreeMap<String, MetricRange>,
    pub suggested_queries: Vec<String>,
    /// Canonical forms of metrics repeated as several columns per sheet; only the
    /// first column of each sheet is used.
    pub ambiguous: Vec<String>,
    pub default_compare_metric: String,
}

impl Default for MetricCatalog {
    fn default() -> Self {
        let aliases = [
            ("pe", "P/E"),
            ("pe ratio", "P/E"),
            ("price earnings", "P/E"),
            ("price to earnings", "P/E"),
            ("dividend yield", "Div Yield"),
            ("div yield", "Div Yield"),
            ("dy", "Div Yield"),
            ("yield", "Div Yield"),
            ("pbv", "PBV"),
            ("pb", "PBV"),
            ("price to book", "PBV"),
            ("price", "C.Price"),
            ("closing price", "C.Price"),
            ("cprice", "C.Price"),
            ("revenue", "Revenue 3M"),
            ("revenue 3m", "Revenue 3M"),
            ("issued qty", "Issued QTY Mn"),
            ("issued quantity", "Issued QTY Mn"),
            ("roe", "ROE"),
            ("return on equity", "ROE"),
            ("profit", "Cumulative Profit"),
        ];
        let definitions = [
            ("P/E", "Price to Earnings ratio: the share price divided by earnings per share. A lower P/E can indicate a cheaper stock relative to its earnings."),
            ("Div Yield", "Dividend Yield: annual dividends per share as a percentage of the share price."),
            ("PBV", "Price to Book Value: the share price divided by book value per share. Values below 1 suggest the stock trades under its net asset value."),
            ("C.Price", "Closing Price: the last traded price of the share for the period."),
            ("Revenue 3M", "Revenue for the latest three-month (quarterly) period."),
            ("Issued QTY Mn", "Issued Quantity in millions: the number of shares issued by the company."),
            ("ROE", "Return on Equity: net profit as a percentage of shareholders' equity."),
            ("Cumulative Profit", "Profit accumulated over the reported periods of the financial year."),
        ];
        MetricCatalog {
            aliases: aliases.iter().map(|(alias, metric)| (alias.to_string(), metric.to_string())).collect(),
            definitions: definitions.iter().map(|(metric, text)| (metric.to_string(), text.to_string())).collect(),
            lower_is_better: vec!["pe".into(), "pbv".into(), "issuedqtymn".into()],
            composite: vec![
                CompositeWeight { metric: "P/E".into(), weight: 0.4 },
                CompositeWeight { metric: "Div Yield".into(), weight: 0.3 },
                CompositeWeight { metric: "PBV".into(), weight: 0.2 },
            ],
            ranges: BTreeMap::from([
                ("P/E".to_string(), MetricRange { min: 0.0, max: 50.0, step: 0.5 }),
                ("Div Yield".to_string(), MetricRange { min: 0.0, max: 20.0, step: 0.1 }),
                ("PBV".to_string(), MetricRange { min: 0.0, max: 10.0, step: 0.1 }),
                ("C.Price".to_string(), MetricRange { min: 0.0, max: 1000.0, step: 1.0 }),
            ]),
            suggested_queries: vec![
                "P/E for ALLI".into(),
                "Div Yield and PBV for BOC".into(),
                "average P/E for sector BANKS".into(),
                "P/E for all sectors".into(),
                "average Div Yield".into(),
                "what is PBV".into(),
                "best stock".into(),
                "best sector by Div Yield".into(),
                "lowest P/E".into(),
                "compare stocks ALLI, BOC by PBV".into(),
                "ALLI vs BOC vs sector BANKS by Revenue 3M".into(),
                "show Div Yield where P/E between 5 and 10".into(),
            ],
            ambiguous: vec!["pe".into()],
            default_compare_metric: "P/E".into(),
        }
    }
}

impl MetricCatalog {
    /// Parses a TOML catalog; missing tables keep their built-in values.
    pub fn from_toml_str(text: &str) -> Result<Self, SheetwiseError> {
        let catalog: MetricCatalog = toml::from_str(text)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Loads a TOML catalog file.
    pub fn load(path: &Path) -> Result<Self, SheetwiseError> {
        let name = path.display().to_string();
        let catalog = std::fs::read_to_string(path)
            .map_err(SheetwiseError::from)
            .and_then(|text| Self::from_toml_str(&text))
            .with_prefix(&name)?;
        debug!(file = name, aliases = catalog.aliases.len(), "loaded metric catalog");
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), SheetwiseError> {
        if let Some((alias, _)) = self.aliases.iter().find(|(_, metric)| metric.trim().is_empty()) {
            Err(CatalogError::EmptyMetricError(alias.to_owned()))?
        }
        if let Some(item) = self.composite.iter().find(|item| !item.weight.is_finite() || item.weight <= 0.0) {
            Err(CatalogError::InvalidWeightError(item.metric.to_owned(), item.weight))?
        }
        if let Some((metric, _)) = self.ranges.iter().find(|(_, range)| range.min > range.max || range.step <= 0.0) {
            Err(CatalogError::InvalidRangeError(metric.to_owned()))?
        }
        Ok(())
    }

    /// Maps free text to its canonical metric name.
    ///
    /// The text is compared, lower-cased and without `.` and `/`, against every
    /// alias and canonical name; unknown text comes back trimmed but otherwise
    /// unchanged.
    pub fn normalize(&self, text: &str) -> String {
        let wanted = clean(text);
        if wanted.is_empty() {
            return text.trim().to_owned();
        }
        self.aliases
            .iter()
            .find(|(alias, metric)| clean(alias) == wanted || clean(metric) == wanted)
            .map(|(_, metric)| metric.to_owned())
            .unwrap_or_else(|| text.trim().to_owned())
    }

    /// The definition of a metric, by canonical name or alias.
    pub fn definition(&self, metric: &str) -> Option<&str> {
        let wanted = canonicalize(&self.normalize(metric));
        self.definitions
            .iter()
            .find(|(name, _)| canonicalize(name) == wanted)
            .map(|(_, text)| text.as_str())
    }

    pub fn is_lower_better(&self, metric: &str) -> bool {
        let wanted = canonicalize(&self.normalize(metric));
        self.lower_is_better.iter().any(|name| canonicalize(name) == wanted)
    }

    /// Whether a canonical metric form keeps one column per sheet.
    pub fn is_ambiguous(&self, canonical: &str) -> bool {
        self.ambiguous.iter().any(|name| canonicalize(name) == canonical)
    }

    /// Composite score weights with the sign applied: negative where smaller is better.
    pub fn composite_weights(&self) -> Vec<(String, f64)> {
        self.composite
            .iter()
            .map(|item| {
                let sign = if self.is_lower_better(&item.metric) { -1.0 } else { 1.0 };
                (item.metric.to_owned(), sign * item.weight)
            })
            .collect()
    }

    /// Label used when best stocks are ranked without explicit criteria.
    pub fn composite_label(&self) -> String {
        let metrics: Vec<&str> = self.composite.iter().map(|item| item.metric.as_str()).collect();
        format!("composite score ({})", metrics.join(", "))
    }

    pub fn range(&self, metric: &str) -> Option<&MetricRange> {
        let wanted = canonicalize(&self.normalize(metric));
        self.ranges
            .iter()
            .find(|(name, _)| canonicalize(name) == wanted)
            .map(|(_, range)| range)
    }
}

fn clean(text: &str) -> String {
    text.to_lowercase().replace(['.', '/'], "").trim().to_owned()
}
