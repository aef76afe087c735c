use crate::config::MetricCatalog;
use serde::Deserialize;
use serde::Serialize;

/// Sector scope of a sector metric query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectorScope {
    All,
    Named(String),
}

/// Which side of a metric ranking is reported.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ranking {
    Lowest,
    Highest,
    /// Both sides, best side first according to the metric's preference.
    Preferred,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Company,
    Sector,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
}

impl EntityRef {
    pub fn company(name: &str) -> Self {
        EntityRef {
            name: normalize_entity(name),
            kind: EntityKind::Company,
        }
    }

    pub fn sector(name: &str) -> Self {
        EntityRef {
            name: normalize_entity(name),
            kind: EntityKind::Sector,
        }
    }
}

/// The classified purpose of a query with its arguments.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    PointMetric { company: String, metric: String },
    MultiMetric { company: String, metrics: Vec<String> },
    SectorMetric { sector: SectorScope, metric: String },
    GeneralMetric { metric: String },
    Definition { metric: String },
    BestStock { criteria: Option<String> },
    BestSector { criteria: Option<String> },
    BestMetric { metric: String, ranking: Ranking },
    CompareStocks { stocks: Vec<String>, metric: String },
    CompareMixed { entities: Vec<EntityRef>, metric: String },
    MultiSheet { company: String, pairs: Vec<(String, String)> },
    RangeFilter { display_metric: String, filter_metric: String, min: f64, max: f64 },
    Unrecognized,
}

/// Entity text as matched against key columns: trimmed and upper-cased.
pub fn normalize_entity(text: &str) -> String {
    text.trim().to_uppercase()
}

/// JSON form of an intent, as produced by external parsers.
///
/// ```
/// use sheetwise::config::MetricCatalog;
/// use sheetwise::query::StructuredQuery;
///
/// let query: StructuredQuery = serde_json::from_str(r#"{"type": "company", "company": "alli", "metrics": ["pe"]}"#).unwrap();
/// let intent = query.into_intent(&MetricCatalog::default());
/// assert_eq!(format!("{intent:?}"), r#"MultiMetric { company: "ALLI", metrics: ["P/E"] }"#);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructuredQuery {
    Company {
        company: String,
        #[serde(default)]
        metrics: Vec<String>,
    },
    Sector {
        sector: String,
        #[serde(default)]
        metric: String,
    },
    General {
        #[serde(default)]
        metric: String,
    },
    Definition {
        #[serde(default)]
        metric: String,
    },
    BestStock {
        #[serde(default)]
        criteria: Option<String>,
    },
    BestSector {
        #[serde(default)]
        criteria: Option<String>,
    },
    BestMetric {
        #[serde(default)]
        metric: String,
    },
    CompareStocks {
        #[serde(default)]
        stocks: Vec<String>,
        #[serde(default)]
        metric: Option<String>,
    },
    MultiSheet {
        company: String,
        #[serde(default)]
        metric_sheet_pairs: Vec<(String, String)>,
    },
    CompareMixed {
        #[serde(default)]
        entities: Vec<EntityRef>,
        #[serde(default)]
        metric: Option<String>,
    },
    Range {
        display_metric: String,
        filter_metric: String,
        min: f64,
        max: f64,
    },
}

impl StructuredQuery {
    /// Normalizes metric aliases and entity names the same way free-text queries are.
    pub fn into_intent(self, catalog: &MetricCatalog) -> Intent {
        let metric = |text: &str| catalog.normalize(text);
        let compare_metric = |text: Option<String>| {
            text.filter(|text| !text.trim().is_empty())
                .map(|text| catalog.normalize(&text))
                .unwrap_or_else(|| catalog.default_compare_metric.clone())
        };
        let criteria = |text: Option<String>| text.filter(|text| !text.trim().is_empty()).map(|text| catalog.normalize(&text));
        match self {
            StructuredQuery::Company { company, metrics } => Intent::MultiMetric {
                company: normalize_entity(&company),
                metrics: metrics.iter().map(|text| metric(text)).collect(),
            },
            StructuredQuery::Sector { sector, metric: text } => Intent::SectorMetric {
                sector: if sector.trim().eq_ignore_ascii_case("all sectors") {
                    SectorScope::All
                } else {
                    SectorScope::Named(normalize_entity(&sector))
                },
                metric: metric(&text),
            },
            StructuredQuery::General { metric: text } => Intent::GeneralMetric { metric: metric(&text) },
            StructuredQuery::Definition { metric: text } => Intent::Definition { metric: metric(&text) },
            StructuredQuery::BestStock { criteria: text } => Intent::BestStock { criteria: criteria(text) },
            StructuredQuery::BestSector { criteria: text } => Intent::BestSector { criteria: criteria(text) },
            StructuredQuery::BestMetric { metric: text } => Intent::BestMetric {
                metric: metric(&text),
                ranking: Ranking::Preferred,
            },
            StructuredQuery::CompareStocks { stocks, metric: text } => Intent::CompareStocks {
                stocks: stocks.iter().map(|stock| normalize_entity(stock)).collect(),
                metric: compare_metric(text),
            },
            StructuredQuery::MultiSheet { company, metric_sheet_pairs } => Intent::MultiSheet {
                company: normalize_entity(&company),
                pairs: metric_sheet_pairs
                    .iter()
                    .map(|(text, sheet)| (metric(text), sheet.trim().to_owned()))
                    .collect(),
            },
            StructuredQuery::CompareMixed { entities, metric: text } => Intent::CompareMixed {
                entities: entities
                    .into_iter()
                    .map(|entity| EntityRef {
                        name: normalize_entity(&entity.name),
                        kind: entity.kind,
                    })
                    .collect(),
                metric: compare_metric(text),
            },
            StructuredQuery::Range {
                display_metric,
                filter_metric,
                min,
                max,
            } => Intent::RangeFilter {
                display_metric: metric(&display_metric),
                filter_metric: metric(&filter_metric),
                min,
                max,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Intent {
        serde_json::from_str::<StructuredQuery>(json)
            .unwrap()
            .into_intent(&MetricCatalog::default())
    }

    #[test]
    fn sector_scope() {
        assert_eq!(
            parse(r#"{"type": "sector", "sector": "all sectors", "metric": "dividend yield"}"#),
            Intent::SectorMetric {
                sector: SectorScope::All,
                metric: "Div Yield".into()
            }
        );
        assert_eq!(
            parse(r#"{"type": "sector", "sector": " banks ", "metric": "pbv"}"#),
            Intent::SectorMetric {
                sector: SectorScope::Named("BANKS".into()),
                metric: "PBV".into()
            }
        );
    }

    #[test]
    fn comparison_defaults_to_pe() {
        assert_eq!(
            parse(r#"{"type": "compare_stocks", "stocks": ["alli", "boc"]}"#),
            Intent::CompareStocks {
                stocks: vec!["ALLI".into(), "BOC".into()],
                metric: "P/E".into()
            }
        );
        assert_eq!(
            parse(r#"{"type": "compare_mixed", "entities": [{"name": "abl", "type": "company"}, {"name": "banks", "type": "sector"}], "metric": "pe"}"#),
            Intent::CompareMixed {
                entities: vec![EntityRef::company("ABL"), EntityRef::sector("BANKS")],
                metric: "P/E".into()
            }
        );
    }

    #[test]
    fn multi_sheet_pairs() {
        assert_eq!(
            parse(r#"{"type": "multi_sheet", "company": "abl", "metric_sheet_pairs": [["pe", "Sheet1"], ["roe", "Sheet2"]]}"#),
            Intent::MultiSheet {
                company: "ABL".into(),
                pairs: vec![("P/E".into(), "Sheet1".into()), ("ROE".into(), "Sheet2".into())]
            }
        );
    }

    #[test]
    fn best_stock_without_criteria() {
        assert_eq!(parse(r#"{"type": "best_stock"}"#), Intent::BestStock { criteria: None });
        assert_eq!(parse(r#"{"type": "best_stock", "criteria": ""}"#), Intent::BestStock { criteria: None });
        assert_eq!(
            parse(r#"{"type": "best_sector", "criteria": "yield"}"#),
            Intent::BestSector {
                criteria: Some("Div Yield".into())
            }
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<StructuredQuery>(r#"{"type": "weather", "city": "Colombo"}"#).is_err());
        assert!(serde_json::from_str::<StructuredQuery>(r#"{"company": "ABL"}"#).is_err());
    }
}
