//! # Sheetwise
//!
//! Answers natural-language questions about semi-structured financial spreadsheets:
//! workbooks with multi-row merged headers, sector marker rows splitting the data,
//! header bands repeated down the sheet and glossary notes at the bottom.
//!
//! ## Features
//!
//! - **Structural inference**: header hierarchies, repeated header bands, sector
//!   markers, the glossary boundary and the entity code column, with no schema given
//! - **Metric resolution**: catalog aliases and tolerant header matching across sheets
//! - **Entity resolution**: company codes with exchange-suffix fallback, sector row ranges
//! - **Query interpretation**: an ordered rule table for free text, plus a JSON form
//! - **Aggregation**: averages, rankings, weighted composite scores and range filters,
//!   with bar chart data for the caller to render
//!
//! ## Example
//!
//! ```no_run
//! use sheetwise::MetricCatalog;
//! use sheetwise::QueryProcessor;
//! use sheetwise::Workbook;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let workbook = Workbook::open(Path::new("market.xlsx"))?;
//! let processor = QueryProcessor::new(workbook, Arc::new(MetricCatalog::default()));
//! println!("{}", processor.process_query("average P/E for sector BANKS").text);
//! # Ok::<(), sheetwise::SheetwiseError>(())
//! ```
pub mod config;
pub mod error;
pub(crate) mod helpers;
pub mod query;
pub mod spreadsheet;
pub mod structure;
pub mod workbook;

pub use config::MetricCatalog;
pub use error::SheetwiseError;
pub use query::QueryProcessor;
pub use query::QueryResponse;
pub use structure::resolve_structure;
pub use structure::SheetStructure;
pub use workbook::Workbook;
