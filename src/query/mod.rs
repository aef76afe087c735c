//! # Query Resolution Module
//!
//! Turns a question about a workbook into an answer. Free text is classified into
//! an [`Intent`] by the rule table in [`interpreter`]; JSON callers send a
//! [`StructuredQuery`] instead. [`MetricResolver`] maps metric names onto header
//! columns, [`EntityResolver`] maps company codes and sector names onto rows, and
//! [`QueryProcessor`] runs the aggregation and formats a [`QueryResponse`].
pub mod aggregate;
pub mod chart;
pub mod entity;
pub mod intent;
pub mod interpreter;
pub mod metric;
pub mod processor;

pub use chart::ChartPayload;
pub use chart::QueryResponse;
pub use entity::EntityResolver;
pub use intent::Intent;
pub use intent::StructuredQuery;
pub use metric::MetricResolver;
pub use processor::QueryProcessor;
