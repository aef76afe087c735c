use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Data for a chart; rendering is left to the caller.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartPayload {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<ChartPoint>,
}

impl ChartPayload {
    pub fn bar(title: impl Into<String>, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        ChartPayload {
            kind: ChartKind::Bar,
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            points: vec![],
        }
    }

    pub fn with_points<I, S>(mut self, points: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.points.extend(points.into_iter().map(|(label, value)| ChartPoint { label: label.into(), value }));
        self
    }

    /// `None` when there is nothing to plot.
    pub fn non_empty(self) -> Option<Self> {
        (!self.points.is_empty()).then_some(self)
    }
}

/// Result of a query: text for the user and optional chart data.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryResponse {
    pub text: String,
    pub chart: Option<ChartPayload>,
}

impl QueryResponse {
    pub fn text(text: impl Into<String>) -> Self {
        QueryResponse {
            text: text.into(),
            chart: None,
        }
    }

    pub fn with_chart(text: impl Into<String>, chart: ChartPayload) -> Self {
        QueryResponse {
            text: text.into(),
            chart: chart.non_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_points() {
        let chart = ChartPayload::bar("P/E by stock", "Stock", "P/E").with_points([("ABL", 8.5), ("BOC", 5.0)]);
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["kind"], "bar");
        assert_eq!(json["points"][1]["label"], "BOC");
        assert_eq!(json["points"][0]["value"], 8.5);
    }

    #[test]
    fn empty_chart_is_dropped() {
        let response = QueryResponse::with_chart("nothing", ChartPayload::bar("t", "x", "y"));
        assert!(response.chart.is_none());
    }
}
