use serde::{Deserialize, Serialize};

use crate::resource::ResourceName;
use crate::transport::{Endpoint, RawBody, RawResponse, TablePayload};

pub const NO_RESULTS_NOTICE: &str = "no results";
pub const DONE_NOTICE: &str = "done";
pub const LISTING_COLUMN: &str = "name";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TabularResult {
    /// Builds a result whose rows all match the column count. Missing column
    /// names are synthesized as `Col 1..Col N` from the first row's width.
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let columns = if columns.is_empty() {
            rows.first()
                .map(|row| synthesized_columns(row.len()))
                .unwrap_or_default()
        } else {
            columns
        };

        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Self { columns, rows }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn column_values(&self, index: usize) -> Vec<&str> {
        self.rows
            .iter()
            .filter_map(|row| row.get(index).map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Tabular(TabularResult),
    Notice(String),
    Failure(String),
}

impl Outcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Tabular(_) => "tabular",
            Self::Notice(_) => "notice",
            Self::Failure(_) => "failure",
        }
    }
}

/// Text prefixes used to sniff free-text bodies. Matching is case-sensitive
/// and applied to the trimmed body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSet {
    #[serde(default = "default_error_markers")]
    pub error: Vec<String>,
    #[serde(default = "default_success_markers")]
    pub success: Vec<String>,
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self {
            error: default_error_markers(),
            success: default_success_markers(),
        }
    }
}

impl MarkerSet {
    fn is_error(&self, trimmed: &str) -> bool {
        starts_with_any(trimmed, &self.error)
    }

    fn is_success(&self, trimmed: &str) -> bool {
        starts_with_any(trimmed, &self.success)
    }
}

fn default_error_markers() -> Vec<String> {
    ["Error", "syntax error", "System Error"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_success_markers() -> Vec<String> {
    ["Success", "Table"].into_iter().map(str::to_string).collect()
}

fn starts_with_any(trimmed: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .filter(|marker| !marker.is_empty())
        .any(|marker| trimmed.starts_with(marker.as_str()))
}

/// Turns raw responses into [`Outcome`]s. Pure: the same input always yields
/// the same outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classifier {
    markers: MarkerSet,
}

impl Classifier {
    #[must_use]
    pub fn new(markers: MarkerSet) -> Self {
        Self { markers }
    }

    #[must_use]
    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    #[must_use]
    pub fn classify(&self, endpoint: Endpoint, response: &RawResponse) -> Outcome {
        if !response.is_ok() {
            return Outcome::Failure(failure_message(response));
        }

        match &response.body {
            RawBody::Structured(payload) => classify_structured(payload),
            RawBody::Text(text) if endpoint.is_listing() => classify_listing(text),
            RawBody::Text(text) => match endpoint {
                Endpoint::Query | Endpoint::ReadRows => self.classify_query_text(text),
                _ => self.classify_mutation_text(text),
            },
        }
    }

    fn classify_query_text(&self, text: &str) -> Outcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Outcome::Notice(NO_RESULTS_NOTICE.to_string());
        }
        if self.markers.is_error(trimmed) {
            return Outcome::Failure(text.to_string());
        }
        if self.markers.is_success(trimmed) {
            return Outcome::Notice(text.to_string());
        }
        Outcome::Tabular(parse_csv_rows(text))
    }

    fn classify_mutation_text(&self, text: &str) -> Outcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Outcome::Notice(DONE_NOTICE.to_string());
        }
        if self.markers.is_error(trimmed) {
            return Outcome::Failure(text.to_string());
        }
        Outcome::Notice(text.to_string())
    }
}

fn failure_message(response: &RawResponse) -> String {
    match &response.body {
        RawBody::Text(text) if !text.trim().is_empty() => text.clone(),
        _ => format!("request failed with status {}", response.status),
    }
}

fn classify_structured(payload: &TablePayload) -> Outcome {
    Outcome::Tabular(TabularResult::new(
        payload.columns.clone(),
        payload.rows.clone(),
    ))
}

fn classify_listing(text: &str) -> Outcome {
    let rows = listing_lines(text)
        .map(|line| vec![line.to_string()])
        .collect::<Vec<_>>();
    Outcome::Tabular(TabularResult::new(vec![LISTING_COLUMN.to_string()], rows))
}

/// Parses a newline separated listing into resource names, keeping any
/// framing character so callers decide when to strip it.
#[must_use]
pub fn parse_listing(text: &str) -> Vec<ResourceName> {
    listing_lines(text)
        .filter_map(|line| ResourceName::new(line).ok())
        .collect()
}

fn listing_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Splits comma separated lines into a grid, synthesizing headers from the
/// first row. Blank lines are skipped.
#[must_use]
pub fn parse_csv_rows(text: &str) -> TabularResult {
    let rows = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(',').map(str::to_string).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    TabularResult::new(Vec::new(), rows)
}

fn synthesized_columns(width: usize) -> Vec<String> {
    (1..=width).map(|index| format!("Col {index}")).collect()
}
