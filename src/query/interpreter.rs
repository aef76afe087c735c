//! Free-text query classification.
//!
//! An ordered table of rules, each a regular expression over the lower-cased,
//! trimmed query and an extractor building the [`Intent`]. The first rule whose
//! pattern matches and whose extractor accepts the captures wins; structural
//! phrasings come before generic ones, and a query no rule accepts is
//! [`Intent::Unrecognized`].
use crate::config::MetricCatalog;
use crate::query::intent::normalize_entity;
use crate::query::intent::EntityRef;
use crate::query::intent::Intent;
use crate::query::intent::Ranking;
use crate::query::intent::SectorScope;
use regex::Captures;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

type Extractor = fn(&Captures, &MetricCatalog) -> Option<Intent>;

/// One classification rule.
pub struct Rule {
    pub name: &'static str,
    pattern: Regex,
    extract: Extractor,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, extract: Extractor) -> Self {
        Rule {
            name,
            pattern: Regex::new(pattern).expect("Hardcode regex pattern"),
            extract,
        }
    }

    /// The intent this rule produces for an already normalized query, if any.
    pub fn apply(&self, query: &str, catalog: &MetricCatalog) -> Option<Intent> {
        let captures = self.pattern.captures(query)?;
        (self.extract)(&captures, catalog)
    }
}

/// The rule table in priority order.
pub fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            Rule::new(
                "range_filter",
                r"^show\s+(.+?)\s+where\s+(.+?)\s+between\s+(\d+(?:\.\d+)?)\s+and\s+(\d+(?:\.\d+)?)$",
                range_filter,
            ),
            Rule::new("sector_vs_sector", r"^sector\s+(.+?)\s+vs\s+sector\s+(.+?)\s+by\s+(.+)$", sector_vs_sector),
            Rule::new("stock_vs_sector", r"^([a-z0-9.]+)\s+vs\s+sector\s+(.+?)\s+by\s+(.+)$", stock_vs_sector),
            Rule::new(
                "stocks_vs_sector",
                r"^([a-z0-9.]+)\s+vs\s+([a-z0-9.]+)\s+vs\s+sector\s+(.+?)\s+by\s+(.+)$",
                stocks_vs_sector,
            ),
            Rule::new(
                "compare_stocks",
                r"^(?:compare\s+stocks|which\s+stocks\s+are\s+best)\s+([a-z0-9.]+(?:(?:\s*,\s*|\s+and\s+)[a-z0-9.]+)*)(?:\s+by\s+(.+))?$",
                compare_stocks,
            ),
            Rule::new("best_metric", r"^(best|lowest|highest)\s+(.+)$", best_metric),
            Rule::new(
                "sector_metric",
                r"^(?:average\s+)?(.+?)\s+for\s+(all\s+sectors|sector\s+all\s+sectors|sector\s+(.+))$",
                sector_metric,
            ),
            Rule::new("multi_sheet", r"^(.+?\s+from\s+.+)\s+for\s+([a-z0-9.]+)$", multi_sheet),
            Rule::new("multi_metric", r"^(.+?\s+and\s+.+)\s+for\s+([a-z0-9.]+)$", multi_metric),
            Rule::new("point_metric", r"^(.+?)\s+for\s+([a-z0-9.]+)$", point_metric),
            Rule::new("definition", r"^(?:what\s+is|define)\s+(.+?)\s*\??$", definition),
            Rule::new(
                "best_stock",
                r"^(?:best\s+stocks?|which\s+stock\s+is\s+best|top\s+stocks?)(?:\s+by\s+(.+))?$",
                best_stock,
            ),
            Rule::new(
                "best_sector",
                r"^(?:best\s+sectors?|which\s+sector\s+is\s+best|top\s+sectors?)(?:\s+by\s+(.+))?$",
                best_sector,
            ),
            Rule::new("general_metric", r"^average\s+(.+)$", general_metric),
        ]
    })
}

/// Classifies a free-text query.
pub fn interpret(query: &str, catalog: &MetricCatalog) -> Intent {
    let normalized = query.trim().to_lowercase();
    for rule in rules() {
        if let Some(intent) = rule.apply(&normalized, catalog) {
            debug!(query = normalized, rule = rule.name, "classified query");
            return intent;
        }
    }
    debug!(query = normalized, "query not understood");
    Intent::Unrecognized
}

/// Name of the rule that accepts a query, for diagnostics.
pub fn matching_rule(query: &str, catalog: &MetricCatalog) -> Option<&'static str> {
    let normalized = query.trim().to_lowercase();
    rules()
        .iter()
        .find(|rule| rule.apply(&normalized, catalog).is_some())
        .map(|rule| rule.name)
}

fn group<'a>(captures: &'a Captures, index: usize) -> Option<&'a str> {
    captures
        .get(index)
        .map(|matcher| matcher.as_str().trim())
        .filter(|text| !text.is_empty())
}

fn metric(captures: &Captures, index: usize, catalog: &MetricCatalog) -> Option<String> {
    group(captures, index).map(|text| catalog.normalize(text))
}

fn range_filter(captures: &Captures, catalog: &MetricCatalog) -> Option<Intent> {
    Some(Intent::RangeFilter {
        display_metric: metric(captures, 1, catalog)?,
        filter_metric: metric(captures, 2, catalog)?,
        min: group(captures, 3)?.parse().ok()?,
        max: group(captures, 4)?.parse().ok()?,
    })
}

fn sector_vs_sector(captures: &Captures, catalog: &MetricCatalog) -> Option<Intent> {
    Some(Intent::CompareMixed {
        entities: vec![EntityRef::sector(group(captures, 1)?), EntityRef::sector(group(captures, 2)?)],
        metric: metric(captures, 3, catalog)?,
    })
}

fn stock_vs_sector(captures: &Captures, catalog: &MetricCatalog) -> Option<Intent> {
    Some(Intent::CompareMixed {
        entities: vec![EntityRef::company(group(captures, 1)?), EntityRef::sector(group(captures, 2)?)],
        metric: metric(captures, 3, catalog)?,
    })
}

fn stocks_vs_sector(captures: &Captures, catalog: &MetricCatalog) -> Option<Intent> {
    Some(Intent::CompareMixed {
        entities: vec![
            EntityRef::company(group(captures, 1)?),
            EntityRef::company(group(captures, 2)?),
            EntityRef::sector(group(captures, 3)?),
        ],
        metric: metric(captures, 4, catalog)?,
    })
}

fn compare_stocks(captures: &Captures, catalog: &MetricCatalog) -> Option<Intent> {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    let separator = SEPARATOR.get_or_init(|| Regex::new(r"\s*,\s*|\s+and\s+").expect("Hardcode regex pattern"));
    let stocks = separator
        .split(group(captures, 1)?)
        .filter(|stock| !stock.trim().is_empty())
        .map(normalize_entity)
        .collect();
    Some(Intent::CompareStocks {
        stocks,
        metric: metric(captures, 2, catalog).unwrap_or_else(|| catalog.default_compare_metric.clone()),
    })
}

fn best_metric(captures: &Captures, catalog: &MetricCatalog) -> Option<Intent> {
    let text = group(captures, 2)?;
    let first_word = text.split_whitespace().next().unwrap_or_default();
    if matches!(first_word, "stock" | "stocks" | "sector" | "sectors") || text.contains(" for ") {
        return None;
    }
    let ranking = match group(captures, 1)? {
        "lowest" => Ranking::Lowest,
        "highest" => Ranking::Highest,
        _ => Ranking::Preferred,
    };
    Some(Intent::BestMetric {
        metric: catalog.normalize(text),
        ranking,
    })
}

fn sector_metric(captures: &Captures, catalog: &MetricCatalog) -> Option<Intent> {
    let sector = match group(captures, 3) {
        Some(name) => SectorScope::Named(normalize_entity(name)),
        None => SectorScope::All,
    };
    Some(Intent::SectorMetric {
        sector,
        metric: metric(captures, 1, catalog)?,
    })
}

fn multi_sheet(captures: &Captures, catalog: &MetricCatalog) -> Option<Intent> {
    let pairs = group(captures, 1)?
        .split(" and ")
        .map(|part| {
            let (name, sheet) = part.rsplit_once(" from ")?;
            let name = name.trim();
            let sheet = sheet.trim();
            (!name.is_empty() && !sheet.is_empty()).then(|| (catalog.normalize(name), sheet.to_owned()))
        })
        .collect::<Option<Vec<_>>>()?;
    Some(Intent::MultiSheet {
        company: normalize_entity(group(captures, 2)?),
        pairs,
    })
}

fn multi_metric(captures: &Captures, catalog: &MetricCatalog) -> Option<Intent> {
    let metrics: Vec<String> = group(captures, 1)?
        .split(" and ")
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| catalog.normalize(text))
        .collect();
    if metrics.len() < 2 {
        return None;
    }
    Some(Intent::MultiMetric {
        company: normalize_entity(group(captures, 2)?),
        metrics,
    })
}

fn point_metric(captures: &Captures, catalog: &MetricCatalog) -> Option<Intent> {
    Some(Intent::PointMetric {
        company: normalize_entity(group(captures, 2)?),
        metric: metric(captures, 1, catalog)?,
    })
}

fn definition(captures: &Captures, catalog: &MetricCatalog) -> Option<Intent> {
    Some(Intent::Definition {
        metric: metric(captures, 1, catalog)?,
    })
}

fn best_stock(captures: &Captures, catalog: &MetricCatalog) -> Option<Intent> {
    Some(Intent::BestStock {
        criteria: metric(captures, 1, catalog),
    })
}

fn best_sector(captures: &Captures, catalog: &MetricCatalog) -> Option<Intent> {
    Some(Intent::BestSector {
        criteria: metric(captures, 1, catalog),
    })
}

fn general_metric(captures: &Captures, catalog: &MetricCatalog) -> Option<Intent> {
    Some(Intent::GeneralMetric {
        metric: metric(captures, 1, catalog)?,
    })
}
