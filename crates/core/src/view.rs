use crate::classifier::{Outcome, TabularResult};
use crate::navigation::{RowFilter, ViewContent, ViewState};
use crate::resource::{Location, ResourceName};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Loading,
    /// Loaded successfully but nothing to show.
    Empty { message: String },
    Error(String),
    Notice(String),
    Listing { heading: String, items: Vec<String> },
    Table(TabularResult),
}

/// Everything a frontend needs to draw one frame of the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub breadcrumb: String,
    pub banner: Option<String>,
    pub status: Option<String>,
    pub pending: Option<String>,
    pub filter: Option<String>,
    pub body: Body,
}

#[must_use]
pub fn render(location: &Location, view: &ViewState) -> Screen {
    Screen {
        breadcrumb: location.breadcrumb(),
        banner: view.banner.clone(),
        status: view.status.clone(),
        pending: view.pending.clone(),
        filter: view.filter.as_ref().map(filter_label),
        body: render_body(location, view),
    }
}

fn render_body(location: &Location, view: &ViewState) -> Body {
    let outcome = match &view.content {
        ViewContent::Loading => return Body::Loading,
        ViewContent::Loaded(outcome) => outcome,
    };

    match outcome {
        Outcome::Failure(message) => Body::Error(message.clone()),
        Outcome::Notice(message) => Body::Notice(message.clone()),
        Outcome::Tabular(result) => match location {
            Location::Root => listing("Databases", "no databases", result),
            Location::DatabaseView(database) | Location::TableListView(database) => listing(
                &format!("Tables in {database}"),
                &format!("no tables in {database}"),
                result,
            ),
            Location::TableDataView { table, .. } => {
                if result.is_empty() {
                    let message = match &view.filter {
                        Some(filter) => format!("no rows in {table} match {}", filter_label(filter)),
                        None => format!("no rows in {table}"),
                    };
                    Body::Empty { message }
                } else {
                    Body::Table(result.clone())
                }
            }
            Location::AdHocResultView { .. } => {
                if result.is_empty() {
                    Body::Empty {
                        message: "query returned no rows".to_string(),
                    }
                } else {
                    Body::Table(result.clone())
                }
            }
        },
    }
}

fn listing(heading: &str, empty_message: &str, result: &TabularResult) -> Body {
    let items = result
        .column_values(0)
        .into_iter()
        .filter_map(|raw| ResourceName::new(raw).ok())
        .map(|name| name.display_name().to_string())
        .collect::<Vec<_>>();

    if items.is_empty() {
        return Body::Empty {
            message: empty_message.to_string(),
        };
    }
    Body::Listing {
        heading: heading.to_string(),
        items,
    }
}

fn filter_label(filter: &RowFilter) -> String {
    format!("{}={}", filter.column, filter.value)
}
