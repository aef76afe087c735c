use crate::config::MetricCatalog;
use crate::error::SheetwiseError;
use crate::query::aggregate::average;
use crate::query::aggregate::rank;
use crate::query::aggregate::weighted_score;
use crate::query::aggregate::within;
use crate::query::aggregate::Order;
use crate::query::aggregate::Summary;
use crate::query::aggregate::TOP_N;
use crate::query::chart::ChartPayload;
use crate::query::chart::QueryResponse;
use crate::query::entity::EntityResolver;
use crate::query::intent::EntityKind;
use crate::query::intent::EntityRef;
use crate::query::intent::Intent;
use crate::query::intent::Ranking;
use crate::query::intent::SectorScope;
use crate::query::intent::StructuredQuery;
use crate::query::interpreter::interpret;
use crate::query::metric::MetricResolver;
use crate::spreadsheet::Cell;
use crate::spreadsheet::Sheet;
use crate::structure::SheetStructure;
use crate::workbook::Workbook;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use tracing::warn;

/// Reply to a query no rule understands.
pub const UNRECOGNIZED: &str = "Sorry, I couldn't understand your query. Try 'P/E for ALLI', 'P/E for sector FOOD, BEVERAGE & TOBACCO', 'average P/E', 'what is P/E', 'best stock by P/E', 'best sector by P/E', or 'ALLI vs BOC vs sector BANKS by Revenue 3M'.";

/// Reply to a structured query that cannot be parsed.
pub const INVALID_STRUCTURE: &str = "Invalid query structure.";

const NO_PRIMARY_SHEET: &str = "The workbook has no sheet to query.";

/// Sector member charts show at most this many companies.
const SECTOR_CHART_LIMIT: usize = 20;

/// Companies listed by a general metric analysis.
const GENERAL_TOP: usize = 5;

/// The primary sheet with its structure.
struct Primary<'a> {
    sheet: &'a Sheet,
    structure: &'a SheetStructure,
}

impl<'a> Primary<'a> {
    fn name(&self) -> &'a str {
        self.sheet.name()
    }

    fn code(&self, row: usize) -> String {
        self.sheet.text(row, self.structure.primary_key_column)
    }

    fn numbers(&self, row: usize, columns: &[usize]) -> Vec<f64> {
        columns
            .iter()
            .filter_map(|col| self.sheet.cell(row, *col).and_then(Cell::as_number))
            .collect()
    }

    fn first_number(&self, row: usize, columns: &[usize]) -> Option<f64> {
        self.numbers(row, columns).into_iter().next()
    }

    /// Every numeric value of `columns` over `rows`.
    fn values(&self, rows: &[usize], columns: &[usize]) -> Vec<f64> {
        rows.iter().flat_map(|row| self.numbers(*row, columns)).collect()
    }

    /// `(code, value)` for every numeric value on rows with a non-empty code.
    fn company_values(&self, rows: &[usize], columns: &[usize]) -> Vec<(String, f64)> {
        rows.iter()
            .map(|row| (self.code(*row), *row))
            .filter(|(code, _)| !code.is_empty())
            .flat_map(|(code, row)| {
                self.numbers(row, columns)
                    .into_iter()
                    .map(move |value| (code.clone(), value))
            })
            .collect()
    }
}

/// Answers free-text and structured queries against one workbook.
///
/// Query handling never fails: every unresolved metric, entity or empty data set
/// is reported in the response text.
pub struct QueryProcessor {
    workbook: Workbook,
    catalog: Arc<MetricCatalog>,
}

impl QueryProcessor {
    pub fn new(workbook: Workbook, catalog: Arc<MetricCatalog>) -> Self {
        QueryProcessor { workbook, catalog }
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    /// Re-reads the workbook file and drops cached structures.
    pub fn reload(&mut self) -> Result<(), SheetwiseError> {
        self.workbook.reload()
    }

    /// Header listing of a sheet, `None` for an unknown sheet.
    pub fn describe_headers(&self, sheet: &str) -> Option<Vec<String>> {
        self.workbook.structure(sheet).map(SheetStructure::describe_headers)
    }

    pub fn interpret(&self, query: &str) -> Intent {
        interpret(query, &self.catalog)
    }

    /// Classifies and answers a free-text query.
    pub fn process_query(&self, query: &str) -> QueryResponse {
        info!(query = query.trim(), "processing query");
        self.process_structured_query(self.interpret(query))
    }

    /// Answers a JSON [`StructuredQuery`].
    pub fn process_structured_json(&self, json: &str) -> QueryResponse {
        match serde_json::from_str::<StructuredQuery>(json) {
            Ok(query) => self.process_structured_query(query.into_intent(&self.catalog)),
            Err(error) => {
                warn!(%error, "rejected structured query");
                QueryResponse::text(INVALID_STRUCTURE)
            }
        }
    }

    /// Answers an already classified query.
    pub fn process_structured_query(&self, intent: Intent) -> QueryResponse {
        let entities = self.entities();
        match intent {
            Intent::PointMetric { company, .. } | Intent::MultiMetric { company, .. } | Intent::MultiSheet { company, .. }
                if !entities.is_company(&company) =>
            {
                QueryResponse::text(format!("Company '{company}' not found in any sheet."))
            }
            Intent::PointMetric { company, metric } => self.company_metrics(&company, &[metric]),
            Intent::MultiMetric { company, metrics } => self.company_metrics(&company, &metrics),
            Intent::MultiSheet { company, pairs } => self.multi_sheet(&company, &pairs),
            Intent::SectorMetric { sector: SectorScope::Named(sector), .. } if !entities.is_sector(&sector) => {
                QueryResponse::text(format!("Sector '{sector}' not found in any sheet."))
            }
            Intent::SectorMetric { sector, metric } => self.with_primary(|primary| self.sector_metric(primary, &sector, &metric)),
            Intent::GeneralMetric { metric } => self.with_primary(|primary| self.general_metric(primary, &metric)),
            Intent::Definition { metric } => self.definition(&metric),
            Intent::BestStock { criteria } => self.with_primary(|primary| self.best_stock(primary, criteria.as_deref())),
            Intent::BestSector { criteria } => self.with_primary(|primary| self.best_sector(primary, criteria.as_deref())),
            Intent::BestMetric { metric, ranking } => self.with_primary(|primary| self.best_metric(primary, &metric, ranking)),
            Intent::CompareStocks { stocks, metric } => {
                let invalid: Vec<&str> = stocks
                    .iter()
                    .filter(|stock| !entities.is_company(stock))
                    .map(String::as_str)
                    .collect();
                if invalid.is_empty() {
                    self.with_primary(|primary| self.compare_stocks(primary, &stocks, &metric))
                } else {
                    QueryResponse::text(format!("Companies {} not found.", invalid.join(", ")))
                }
            }
            Intent::CompareMixed { entities: targets, metric } => {
                let invalid: Vec<&str> = targets
                    .iter()
                    .filter(|target| !self.is_valid(target))
                    .map(|target| target.name.as_str())
                    .collect();
                if invalid.is_empty() {
                    self.with_primary(|primary| self.compare_mixed(primary, &targets, &metric))
                } else if targets.iter().all(|target| target.kind == EntityKind::Sector) {
                    QueryResponse::text(format!("Sectors {} not found.", invalid.join(", ")))
                } else {
                    QueryResponse::text(format!("Entities {} not found.", invalid.join(", ")))
                }
            }
            Intent::RangeFilter {
                display_metric,
                filter_metric,
                min,
                max,
            } => self.with_primary(|primary| self.range_filter(primary, &display_metric, &filter_metric, min, max)),
            Intent::Unrecognized => QueryResponse::text(UNRECOGNIZED),
        }
    }

    fn metrics(&self) -> MetricResolver<'_> {
        MetricResolver::new(&self.workbook, &self.catalog)
    }

    fn entities(&self) -> EntityResolver<'_> {
        EntityResolver::new(&self.workbook)
    }

    fn is_valid(&self, target: &EntityRef) -> bool {
        match target.kind {
            EntityKind::Company => self.entities().is_company(&target.name),
            EntityKind::Sector => self.entities().is_sector(&target.name),
        }
    }

    fn with_primary<F>(&self, handler: F) -> QueryResponse
    where
        F: FnOnce(&Primary) -> QueryResponse,
    {
        let primary = self.workbook.primary_sheet().and_then(|sheet| {
            self.workbook
                .structure(sheet.name())
                .map(|structure| Primary { sheet, structure })
        });
        match primary {
            Some(primary) => handler(&primary),
            None => QueryResponse::text(NO_PRIMARY_SHEET),
        }
    }

    fn columns(&self, primary: &Primary, metric: &str) -> Vec<usize> {
        self.metrics()
            .find_in_sheet(metric, primary.name())
            .into_iter()
            .map(|found| found.column)
            .collect()
    }

    fn company_metrics(&self, code: &str, metrics: &[String]) -> QueryResponse {
        let resolver = self.metrics();
        let entities = self.entities();
        let mut rows: HashMap<String, Option<usize>> = HashMap::new();
        let mut lines = Vec::new();
        let mut points = Vec::new();
        for metric in metrics {
            let matches = resolver.find(metric);
            if matches.is_empty() {
                lines.push(format!("Metric '{metric}' not found in any sheet."));
                continue;
            }
            for found in matches {
                let row = *rows
                    .entry(found.sheet.clone())
                    .or_insert_with(|| entities.find_company(&found.sheet, code));
                let (Some(row), Some(sheet)) = (row, self.workbook.sheet(&found.sheet)) else {
                    lines.push(format!("Company {code} not found in {} for metric '{metric}'.", found.sheet));
                    continue;
                };
                let cell = sheet.cell(row, found.column);
                let value = cell.map(Cell::text).unwrap_or_else(|| "N/A".to_owned());
                lines.push(format!("{} - {}: {}", found.sheet, found.label.leaf(), value));
                if let Some(number) = cell.and_then(Cell::as_number) {
                    points.push((format!("{} ({})", found.label, found.sheet), number));
                }
            }
        }
        if lines.is_empty() {
            return QueryResponse::text(format!("No data found for {code} with metrics {}.", metrics.join(", ")));
        }
        let chart = ChartPayload::bar(format!("Metrics for {code}"), "Metric", "Value").with_points(points);
        QueryResponse::with_chart(format!("Data for {code}:\n{}", lines.join("\n")), chart)
    }

    fn multi_sheet(&self, code: &str, pairs: &[(String, String)]) -> QueryResponse {
        let entities = self.entities();
        let mut lines = Vec::new();
        let mut points = Vec::new();
        for (metric, sheet_name) in pairs {
            let matches: Vec<_> = self
                .metrics()
                .find(metric)
                .into_iter()
                .filter(|found| found.sheet.eq_ignore_ascii_case(sheet_name))
                .collect();
            if matches.is_empty() {
                lines.push(format!("Metric '{metric}' not found in sheet '{sheet_name}'."));
                continue;
            }
            for found in matches {
                let row = entities.find_company(&found.sheet, code);
                let (Some(row), Some(sheet)) = (row, self.workbook.sheet(&found.sheet)) else {
                    lines.push(format!("Company {code} not found in {} for metric '{metric}'.", found.sheet));
                    continue;
                };
                let cell = sheet.cell(row, found.column);
                let value = cell.map(Cell::text).unwrap_or_else(|| "N/A".to_owned());
                lines.push(format!("{} - {}: {}", found.sheet, found.label.leaf(), value));
                if let Some(number) = cell.and_then(Cell::as_number) {
                    points.push((format!("{} ({})", metric, found.sheet), number));
                }
            }
        }
        if lines.is_empty() {
            return QueryResponse::text(format!("No data found for {code} with specified metrics."));
        }
        let chart = ChartPayload::bar(format!("Metrics for {code} across sheets"), "Metric (Sheet)", "Value").with_points(points);
        QueryResponse::with_chart(format!("Data for {code}:\n{}", lines.join("\n")), chart)
    }

    fn sector_metric(&self, primary: &Primary, scope: &SectorScope, metric: &str) -> QueryResponse {
        let sheet = primary.name();
        let columns = self.columns(primary, metric);
        if columns.is_empty() {
            return QueryResponse::text(format!("Metric '{metric}' not found in {sheet}."));
        }
        let entities = self.entities();
        match scope {
            SectorScope::All => {
                let averages: Vec<(String, f64)> = entities
                    .sectors(sheet)
                    .into_iter()
                    .filter_map(|sector| {
                        let rows = entities.sector_rows(sheet, &sector)?;
                        let mean = average(&primary.values(&rows, &columns))?;
                        Some((sector, mean))
                    })
                    .collect();
                if averages.is_empty() {
                    return QueryResponse::text(format!("No data found for {metric} across sectors."));
                }
                let mut text = format!("{metric} Across All Sectors in {sheet}:\n\n");
                for (sector, mean) in &averages {
                    text.push_str(&format!("• {sector}: Average {metric} = {mean:.2}\n"));
                }
                let chart = ChartPayload::bar(format!("Average {metric} Across All Sectors"), "Sector", format!("Average {metric}"))
                    .with_points(rank(&averages, Order::Descending, averages.len()));
                QueryResponse::with_chart(text.trim_end(), chart)
            }
            SectorScope::Named(sector) => {
                let not_found = || QueryResponse::text(format!("Sector '{sector}' or data for '{metric}' not found in {sheet}."));
                let Some(rows) = entities.sector_rows(sheet, sector) else {
                    return not_found();
                };
                let companies = primary.company_values(&rows, &columns);
                let values: Vec<f64> = companies.iter().map(|(_, value)| *value).collect();
                let Some(mean) = average(&values) else {
                    return not_found();
                };
                let sorted = rank(&companies, Order::Descending, companies.len());
                let mut text = format!("{metric} for sector {sector} in {sheet}:\nAverage: {mean:.2}\n\nCompanies in {sector}:\n");
                for (code, value) in &sorted {
                    text.push_str(&format!("  • {code}: {value:.2}\n"));
                }
                let chart = ChartPayload::bar(format!("{metric} for Companies in {sector}"), "Company", metric)
                    .with_points(sorted.into_iter().take(SECTOR_CHART_LIMIT));
                QueryResponse::with_chart(text.trim_end(), chart)
            }
        }
    }

    fn general_metric(&self, primary: &Primary, metric: &str) -> QueryResponse {
        let sheet = primary.name();
        let columns = self.columns(primary, metric);
        if columns.is_empty() {
            return QueryResponse::text(format!("Metric '{metric}' not found in {sheet}."));
        }
        let companies = primary.company_values(&primary.structure.data_rows, &columns);
        let values: Vec<f64> = companies.iter().map(|(_, value)| *value).collect();
        let Some(summary) = Summary::of(&values) else {
            return QueryResponse::text(format!("No numerical data found for {metric} in {sheet}."));
        };
        let mut text = format!(
            "Analysis of {metric} across all companies in {sheet}:\nAverage: {:.2}\nRange: {:.2} - {:.2}\nTotal Companies: {}\n\nTop {GENERAL_TOP} Companies by {metric}:\n",
            summary.mean, summary.min, summary.max, summary.count
        );
        for (index, (code, value)) in rank(&companies, Order::Descending, GENERAL_TOP).iter().enumerate() {
            text.push_str(&format!("  {}. {code}: {value:.2}\n", index + 1));
        }
        QueryResponse::text(text.trim_end())
    }

    fn best_stock(&self, primary: &Primary, criteria: Option<&str>) -> QueryResponse {
        let sheet = primary.name();
        let weights = match criteria {
            Some(metric) => vec![(metric.to_owned(), 1.0)],
            None => self.catalog.composite_weights(),
        };
        let mut columns = Vec::with_capacity(weights.len());
        for (metric, _) in &weights {
            match self.columns(primary, metric).first() {
                Some(column) => columns.push(*column),
                None => return QueryResponse::text(format!("Metric '{metric}' not found in {sheet}.")),
            }
        }
        let factors: Vec<f64> = weights.iter().map(|(_, weight)| *weight).collect();
        let scores: Vec<(String, f64)> = primary
            .structure
            .data_rows
            .iter()
            .map(|row| (primary.code(*row), *row))
            .filter(|(code, _)| !code.is_empty())
            .filter_map(|(code, row)| {
                let values: Vec<Option<f64>> = columns
                    .iter()
                    .map(|col| primary.sheet.cell(row, *col).and_then(Cell::as_number))
                    .collect();
                weighted_score(&values, &factors).map(|score| (code, score))
            })
            .collect();
        if scores.is_empty() {
            return QueryResponse::text("No valid data found to rank stocks.");
        }
        let label = criteria.map(str::to_owned).unwrap_or_else(|| self.catalog.composite_label());
        let top = rank(&scores, Order::Descending, TOP_N);
        let mut text = format!("Top stocks by {label} in {sheet}:\n");
        for (index, (code, score)) in top.iter().enumerate() {
            text.push_str(&format!("{}. {code}: Score = {score:.2}\n", index + 1));
        }
        let chart = ChartPayload::bar(format!("Top Stocks by {}", criteria.unwrap_or("Composite Score")), "Stock", "Score").with_points(top);
        QueryResponse::with_chart(text.trim_end(), chart)
    }

    fn best_sector(&self, primary: &Primary, criteria: Option<&str>) -> QueryResponse {
        let sheet = primary.name();
        let Some(metric) = criteria else {
            return QueryResponse::text("Please specify a metric (e.g., 'P/E') to rank sectors.");
        };
        let columns = self.columns(primary, metric);
        if columns.is_empty() {
            return QueryResponse::text(format!("Metric '{metric}' not found in {sheet}."));
        }
        let entities = self.entities();
        let averages: Vec<(String, f64)> = entities
            .sectors(sheet)
            .into_iter()
            .filter_map(|sector| {
                let rows = entities.sector_rows(sheet, &sector)?;
                average(&primary.values(&rows, &columns)).map(|mean| (sector, mean))
            })
            .collect();
        if averages.is_empty() {
            return QueryResponse::text(format!("No valid data found for {metric} across sectors."));
        }
        let top = rank(&averages, Order::Descending, TOP_N);
        let mut text = format!("Top sectors by {metric} in {sheet}:\n");
        for (index, (sector, mean)) in top.iter().enumerate() {
            text.push_str(&format!("{}. {sector}: Average {metric} = {mean:.2}\n", index + 1));
        }
        let chart = ChartPayload::bar(format!("Top Sectors by Average {metric}"), "Sector", format!("Average {metric}")).with_points(top);
        QueryResponse::with_chart(text.trim_end(), chart)
    }

    fn best_metric(&self, primary: &Primary, metric: &str, ranking: Ranking) -> QueryResponse {
        let sheet = primary.name();
        let columns = self.columns(primary, metric);
        if columns.is_empty() {
            return QueryResponse::text(format!("Metric '{metric}' not found in {sheet}."));
        }
        let values = primary.company_values(&primary.structure.data_rows, &columns);
        if values.is_empty() {
            return QueryResponse::text(format!("No valid data found for {metric} in {sheet}."));
        }
        let (side, order) = match ranking {
            Ranking::Lowest => ("lowest", Order::Ascending),
            Ranking::Highest => ("highest", Order::Descending),
            Ranking::Preferred => return self.preferred_metric(sheet, metric, &values),
        };
        let top = rank(&values, order, TOP_N);
        let mut text = format!("Top companies with {side} {metric} in {sheet}:\n");
        for (index, (code, value)) in top.iter().enumerate() {
            text.push_str(&format!("{}. {code}: {metric} = {value:.2}\n", index + 1));
        }
        let title = format!("Top Companies with {} {metric}", if side == "lowest" { "Lowest" } else { "Highest" });
        let chart = ChartPayload::bar(title, "Company", metric).with_points(top);
        QueryResponse::with_chart(text.trim_end(), chart)
    }

    /// Both ends of a metric ranking, the conventionally better end first.
    fn preferred_metric(&self, sheet: &str, metric: &str, values: &[(String, f64)]) -> QueryResponse {
        let highest = rank(values, Order::Descending, TOP_N);
        let lowest = rank(values, Order::Ascending, TOP_N);
        let lower_is_better = self.catalog.is_lower_better(metric);
        let text = if lower_is_better {
            format!(
                "Analysis of {metric} in {sheet}:\n\nBEST (Lowest {metric} - Typically Preferred):\n{}\n\nHIGHEST {metric}:\n{}\n\nFor {metric}, lower values are typically better.",
                numbered(&lowest),
                numbered(&highest)
            )
        } else {
            format!(
                "Analysis of {metric} in {sheet}:\n\nBEST (Highest {metric} - Typically Preferred):\n{}\n\nLOWEST {metric}:\n{}\n\nFor {metric}, higher values are typically better.",
                numbered(&highest),
                numbered(&lowest)
            )
        };
        let points = highest
            .iter()
            .map(|(code, value)| (format!("{code} (Highest)"), *value))
            .chain(lowest.iter().map(|(code, value)| (format!("{code} (Lowest)"), *value)));
        let chart = ChartPayload::bar(format!("{metric}: Highest vs Lowest"), "Company", metric).with_points(points);
        QueryResponse::with_chart(text, chart)
    }

    fn compare_stocks(&self, primary: &Primary, stocks: &[String], metric: &str) -> QueryResponse {
        let sheet = primary.name();
        let columns: Vec<usize> = self
            .metrics()
            .find_in_sheet(metric, sheet)
            .into_iter()
            .filter(|found| !found.label.to_string().contains('%'))
            .map(|found| found.column)
            .collect();
        if columns.is_empty() {
            return QueryResponse::text(format!("Metric '{metric}' not found in {sheet}."));
        }
        let entities = self.entities();
        let mut lines = Vec::new();
        let mut points = Vec::new();
        for code in stocks {
            let Some(row) = entities.find_company(sheet, code) else {
                lines.push(format!("{code}: Company not found in {sheet}."));
                continue;
            };
            match primary.first_number(row, &columns) {
                Some(value) => {
                    lines.push(format!("{code}: {metric} = {value:.2}"));
                    points.push((code.clone(), value));
                }
                None => lines.push(format!("{code}: No valid {metric} data in {sheet}.")),
            }
        }
        if points.is_empty() {
            return QueryResponse::text(format!("No valid data found for {metric} across specified stocks."));
        }
        let chart = ChartPayload::bar(format!("Comparison of {metric} Across Stocks"), "Stock", metric).with_points(points);
        QueryResponse::with_chart(format!("Comparison of stocks:\n{}", lines.join("\n")), chart)
    }

    fn compare_mixed(&self, primary: &Primary, targets: &[EntityRef], metric: &str) -> QueryResponse {
        let sheet = primary.name();
        let columns = self.columns(primary, metric);
        if columns.is_empty() {
            return QueryResponse::text(format!("Metric '{metric}' not found in {sheet}."));
        }
        let entities = self.entities();
        let mut lines = Vec::new();
        let mut points = Vec::new();
        for target in targets {
            let name = &target.name;
            match target.kind {
                EntityKind::Company => {
                    let Some(row) = entities.find_company(sheet, name) else {
                        lines.push(format!("Company '{name}' not found in {sheet}."));
                        continue;
                    };
                    match primary.first_number(row, &columns) {
                        Some(value) => {
                            lines.push(format!("Company {name}: {metric} = {value:.2}"));
                            points.push((name.clone(), value));
                        }
                        None => lines.push(format!("No valid {metric} data for company {name} in {sheet}.")),
                    }
                }
                EntityKind::Sector => {
                    let rows = entities.sector_rows(sheet, name).filter(|rows| !rows.is_empty());
                    let Some(rows) = rows else {
                        lines.push(format!("Sector '{name}' not found in {sheet}."));
                        continue;
                    };
                    match average(&primary.values(&rows, &columns)) {
                        Some(mean) => {
                            lines.push(format!("Sector {name}: Average {metric} = {mean:.2}"));
                            points.push((format!("{name} (Sector Avg)"), mean));
                        }
                        None => lines.push(format!("No valid {metric} data for sector {name} in {sheet}.")),
                    }
                }
            }
        }
        if points.is_empty() {
            return QueryResponse::text(format!("No valid data found for {metric} across specified entities."));
        }
        let chart = ChartPayload::bar(format!("Comparison of {metric} Across Entities"), "Entity", metric).with_points(points);
        QueryResponse::with_chart(format!("Comparison of {metric}:\n{}", lines.join("\n")), chart)
    }

    fn range_filter(&self, primary: &Primary, display: &str, filter: &str, min: f64, max: f64) -> QueryResponse {
        let sheet = primary.name();
        let display_columns = self.columns(primary, display);
        let filter_columns = self.columns(primary, filter);
        if display_columns.is_empty() || filter_columns.is_empty() {
            return QueryResponse::text(format!("One or both metrics ('{display}', '{filter}') not found in {sheet}."));
        }
        let entities = self.entities();
        let mut lines = Vec::new();
        let mut points = Vec::new();
        for row in &primary.structure.data_rows {
            let code = primary.code(*row);
            if code.is_empty() || !entities.is_company(&code.to_uppercase()) {
                continue;
            }
            let qualifies = primary
                .first_number(*row, &filter_columns)
                .map(|value| within(value, min, max))
                .unwrap_or(false);
            if !qualifies {
                continue;
            }
            if let Some(value) = primary.first_number(*row, &display_columns) {
                lines.push(format!("{code}: {display} = {value:.2}"));
                points.push((code, value));
            }
        }
        if lines.is_empty() {
            return QueryResponse::text(format!("No companies found with {filter} between {min} and {max} in {sheet}."));
        }
        let chart = ChartPayload::bar(format!("{display} for Companies with {filter} between {min} and {max}"), "Company", display)
            .with_points(points);
        QueryResponse::with_chart(format!("Companies with {filter} between {min} and {max}:\n{}", lines.join("\n")), chart)
    }

    fn definition(&self, metric: &str) -> QueryResponse {
        if let Some(definition) = self.catalog.definition(metric) {
            return QueryResponse::text(definition);
        }
        let sheets: BTreeSet<String> = self.metrics().find(metric).into_iter().map(|found| found.sheet).collect();
        if sheets.is_empty() {
            QueryResponse::text(format!(
                "Sorry, I don't have a definition for '{metric}'. Try metrics like 'P/E', 'Div Yield', or 'Revenue 3M'."
            ))
        } else {
            let sheets: Vec<String> = sheets.into_iter().collect();
            QueryResponse::text(format!(
                "'{metric}' is a financial metric found in sheets {}. No detailed definition available.",
                sheets.join(", ")
            ))
        }
    }
}

fn numbered(entries: &[(String, f64)]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(index, (code, value))| format!("  {}. {code}: {value:.2}", index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
