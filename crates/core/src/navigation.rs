use thiserror::Error;
use tracing::{debug, info, warn};

use crate::actions::{action_enabled, ActionContext, ActionId};
use crate::classifier::{Outcome, TabularResult};
use crate::confirmation::{ConfirmOutcome, PendingPrompt, PromptWorkflow};
use crate::query_guard::assess_query;
use crate::resource::{Location, ResourceName, AD_HOC_RESULT_LABEL};
use crate::transport::{Request, TransportError};

pub type Epoch = u64;

/// What the navigator does with a response once it arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    LoadDatabases,
    OpenDatabase(ResourceName),
    LoadTables(ResourceName),
    OpenTable {
        database: ResourceName,
        table: ResourceName,
    },
    LoadRows {
        database: ResourceName,
        table: ResourceName,
    },
    Mutate(Mutation),
    Query {
        database: ResourceName,
        table: Option<ResourceName>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateDatabase,
    DropDatabase,
    CreateTable(ResourceName),
    DropTable(ResourceName),
    RowChange {
        database: ResourceName,
        table: ResourceName,
    },
}

/// A request together with the location and epoch that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    pub epoch: Epoch,
    pub origin: Location,
    pub intent: Intent,
    pub request: Request,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub ticket: RequestTicket,
    pub result: Result<Outcome, TransportError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Discarded,
    Applied { follow_up: Option<RequestTicket> },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewContent {
    #[default]
    Loading,
    Loaded(Outcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewState {
    pub content: ViewContent,
    /// Inline error shown above the content after a failed navigation.
    pub banner: Option<String>,
    pub status: Option<String>,
    /// Navigation that has been requested but not yet answered.
    pub pending: Option<String>,
    pub filter: Option<RowFilter>,
}

/// Work to run once a prompt is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptAction {
    Acknowledge,
    CreateDatabase,
    DropDatabase {
        database: ResourceName,
    },
    CreateTableName {
        database: ResourceName,
    },
    CreateTableColumns {
        database: ResourceName,
        table: String,
    },
    DropTable {
        database: ResourceName,
        table: ResourceName,
    },
    InsertRow {
        database: ResourceName,
        table: ResourceName,
    },
    EditRowColumn {
        database: ResourceName,
        table: ResourceName,
        pk_value: String,
    },
    EditRowValue {
        database: ResourceName,
        table: ResourceName,
        pk_value: String,
        column: String,
    },
    DeleteRow {
        database: ResourceName,
        table: ResourceName,
        pk_value: String,
    },
    FilterRows {
        database: ResourceName,
        table: ResourceName,
    },
    RunQuery {
        database: ResourceName,
        table: Option<ResourceName>,
    },
    ConfirmQuery {
        database: ResourceName,
        table: Option<ResourceName>,
        query: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("`{0:?}` is not available in the current view")]
    ActionUnavailable(ActionId),
    #[error("no {0} is selected")]
    NothingSelected(&'static str),
}

/// Owns the current [`Location`], the view it shows, and the prompt slot.
///
/// Every request leaves the navigator as a [`RequestTicket`]; its answer
/// comes back through [`Navigator::apply`], which drops answers whose
/// epoch or origin no longer match.
#[derive(Debug, Default)]
pub struct Navigator {
    location: Location,
    epoch: Epoch,
    view: ViewState,
    prompts: PromptWorkflow<PromptAction>,
}

impl Navigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    #[must_use]
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    #[must_use]
    pub fn prompt(&self) -> Option<&PendingPrompt<PromptAction>> {
        self.prompts.current()
    }

    #[must_use]
    pub fn action_context(&self) -> ActionContext<'_> {
        ActionContext::new(&self.location).with_filter(self.view.filter.is_some())
    }

    #[must_use]
    pub fn is_enabled(&self, action: ActionId) -> bool {
        action_enabled(action, &self.action_context())
    }

    /// Names shown by the current listing view, framing included.
    #[must_use]
    pub fn listing(&self) -> Vec<ResourceName> {
        if !matches!(
            self.location,
            Location::Root | Location::DatabaseView(_) | Location::TableListView(_)
        ) {
            return Vec::new();
        }
        match &self.view.content {
            ViewContent::Loaded(Outcome::Tabular(result)) => result
                .column_values(0)
                .into_iter()
                .filter_map(|raw| ResourceName::new(raw).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn rows(&self) -> Option<&TabularResult> {
        match &self.view.content {
            ViewContent::Loaded(Outcome::Tabular(result)) => Some(result),
            _ => None,
        }
    }

    pub fn start(&mut self) -> RequestTicket {
        self.location = Location::Root;
        self.view = ViewState::default();
        self.bump_epoch();
        self.issue(Intent::LoadDatabases, Request::list_databases())
    }

    pub fn refresh(&mut self) -> Result<RequestTicket, NavigationError> {
        self.ensure(ActionId::Refresh)?;
        self.reload()
            .ok_or(NavigationError::ActionUnavailable(ActionId::Refresh))
    }

    pub fn select_database(
        &mut self,
        database: ResourceName,
    ) -> Result<RequestTicket, NavigationError> {
        self.ensure(ActionId::OpenDatabase)?;
        self.bump_epoch();
        self.view.banner = None;
        self.view.pending = Some(format!("opening {database}"));
        let request = Request::list_tables(&database);
        Ok(self.issue(Intent::OpenDatabase(database), request))
    }

    pub fn select_table(&mut self, table: ResourceName) -> Result<RequestTicket, NavigationError> {
        self.ensure(ActionId::OpenTable)?;
        let database = self.current_database()?;
        self.bump_epoch();
        self.view.banner = None;
        self.view.pending = Some(format!("opening {table}"));
        let request = Request::read_rows(&database, &table, "", "");
        Ok(self.issue(Intent::OpenTable { database, table }, request))
    }

    pub fn back(&mut self) -> Result<RequestTicket, NavigationError> {
        self.ensure(ActionId::Back)?;
        let parent = match &self.location {
            Location::Root => return Err(NavigationError::ActionUnavailable(ActionId::Back)),
            Location::DatabaseView(_) | Location::TableListView(_) => Location::Root,
            Location::TableDataView { database, .. }
            | Location::AdHocResultView { database, .. } => {
                Location::TableListView(database.clone())
            }
        };
        self.enter(parent);
        self.view.filter = None;
        self.view.pending = None;
        self.reload()
            .ok_or(NavigationError::ActionUnavailable(ActionId::Back))
    }

    pub fn prompt_create_database(&mut self) -> Result<(), NavigationError> {
        self.ensure(ActionId::CreateDatabase)?;
        self.prompts.open(
            "New database",
            "Database name",
            true,
            PromptAction::CreateDatabase,
        );
        Ok(())
    }

    /// Asks before dropping `target`, or the database in context when `None`.
    pub fn prompt_drop_database(
        &mut self,
        target: Option<ResourceName>,
    ) -> Result<(), NavigationError> {
        self.ensure(ActionId::DropDatabase)?;
        let database = target
            .or_else(|| self.location.database().cloned())
            .ok_or(NavigationError::NothingSelected("database"))?;
        self.prompts.open(
            "Drop database",
            format!("Drop database `{database}` and every table in it?"),
            false,
            PromptAction::DropDatabase { database },
        );
        Ok(())
    }

    pub fn prompt_create_table(&mut self) -> Result<(), NavigationError> {
        self.ensure(ActionId::CreateTable)?;
        let database = self.current_database()?;
        self.prompts.open(
            "New table",
            format!("Table name in `{database}`"),
            true,
            PromptAction::CreateTableName { database },
        );
        Ok(())
    }

    pub fn prompt_drop_table(&mut self, target: Option<ResourceName>) -> Result<(), NavigationError> {
        self.ensure(ActionId::DropTable)?;
        let database = self.current_database()?;
        let table = target
            .or_else(|| self.location.table().cloned())
            .ok_or(NavigationError::NothingSelected("table"))?;
        self.prompts.open(
            "Drop table",
            format!("Drop table `{table}` from `{database}`?"),
            false,
            PromptAction::DropTable { database, table },
        );
        Ok(())
    }

    pub fn prompt_insert_row(&mut self) -> Result<(), NavigationError> {
        self.ensure(ActionId::InsertRow)?;
        let (database, table) = self.current_table()?;
        self.prompts.open(
            "Add row",
            format!("Comma separated values for `{table}`"),
            true,
            PromptAction::InsertRow { database, table },
        );
        Ok(())
    }

    pub fn prompt_edit_row(&mut self, pk_value: impl Into<String>) -> Result<(), NavigationError> {
        self.ensure(ActionId::EditRow)?;
        let (database, table) = self.current_table()?;
        let pk_value = pk_value.into();
        self.prompts.open(
            "Edit row",
            format!("Column to change in row `{pk_value}`"),
            true,
            PromptAction::EditRowColumn {
                database,
                table,
                pk_value,
            },
        );
        Ok(())
    }

    pub fn prompt_delete_row(&mut self, pk_value: impl Into<String>) -> Result<(), NavigationError> {
        self.ensure(ActionId::DeleteRow)?;
        let (database, table) = self.current_table()?;
        let pk_value = pk_value.into();
        self.prompts.open(
            "Delete row",
            format!("Delete the row with primary key `{pk_value}` from `{table}`?"),
            false,
            PromptAction::DeleteRow {
                database,
                table,
                pk_value,
            },
        );
        Ok(())
    }

    pub fn prompt_filter(&mut self) -> Result<(), NavigationError> {
        self.ensure(ActionId::FilterRows)?;
        let (database, table) = self.current_table()?;
        self.prompts.open(
            "Filter rows",
            "column=value",
            true,
            PromptAction::FilterRows { database, table },
        );
        Ok(())
    }

    pub fn clear_filter(&mut self) -> Result<RequestTicket, NavigationError> {
        self.ensure(ActionId::ClearFilter)?;
        self.view.filter = None;
        self.reload()
            .ok_or(NavigationError::ActionUnavailable(ActionId::ClearFilter))
    }

    pub fn prompt_query(&mut self) -> Result<(), NavigationError> {
        self.ensure(ActionId::RunQuery)?;
        let database = self.current_database()?;
        let table = self.location.table().cloned();
        self.prompts.open(
            "Query",
            format!("Query against `{database}`"),
            true,
            PromptAction::RunQuery { database, table },
        );
        Ok(())
    }

    /// Opens a plain notice whose confirmation does nothing.
    pub fn notify(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.prompts
            .open(title, message, false, PromptAction::Acknowledge);
    }

    pub fn confirm_prompt(&mut self, input: &str) -> Option<RequestTicket> {
        match self.prompts.confirm(input) {
            ConfirmOutcome::Confirmed { action, input } => {
                self.run_prompt_action(action, input.unwrap_or_default())
            }
            ConfirmOutcome::StillOpen => {
                debug!("prompt needs input before it can be confirmed");
                None
            }
            ConfirmOutcome::NothingOpen => None,
        }
    }

    pub fn cancel_prompt(&mut self) -> bool {
        self.prompts.cancel()
    }

    pub fn apply(&mut self, completion: Completion) -> Applied {
        let Completion { ticket, result } = completion;
        if ticket.epoch != self.epoch || ticket.origin != self.location {
            debug!(
                ticket_epoch = ticket.epoch,
                current_epoch = self.epoch,
                endpoint = ?ticket.request.endpoint,
                "discarding stale response"
            );
            return Applied::Discarded;
        }

        let outcome = result.unwrap_or_else(|error| {
            warn!(%error, "store unreachable");
            Outcome::Failure(error.to_string())
        });
        info!(
            endpoint = ?ticket.request.endpoint,
            outcome = outcome.label(),
            "response applied"
        );

        let follow_up = match ticket.intent {
            Intent::LoadDatabases | Intent::LoadTables(_) | Intent::LoadRows { .. } => {
                self.view.content = ViewContent::Loaded(outcome);
                None
            }
            Intent::OpenDatabase(database) => {
                self.view.pending = None;
                self.open_on_success(Location::TableListView(database), outcome);
                None
            }
            Intent::OpenTable { database, table } => {
                self.view.pending = None;
                self.view.filter = None;
                self.open_on_success(Location::TableDataView { database, table }, outcome);
                None
            }
            Intent::Mutate(mutation) => self.apply_mutation(mutation, outcome),
            Intent::Query { database, table } => self.apply_query(database, table, outcome),
        };

        Applied::Applied { follow_up }
    }

    fn open_on_success(&mut self, target: Location, outcome: Outcome) {
        if let Outcome::Failure(message) = outcome {
            self.view.banner = Some(message);
            return;
        }
        self.enter(target);
        self.view.content = ViewContent::Loaded(outcome);
    }

    fn apply_mutation(&mut self, mutation: Mutation, outcome: Outcome) -> Option<RequestTicket> {
        let message = match outcome {
            Outcome::Failure(message) => {
                self.notify("Operation failed", message);
                return None;
            }
            Outcome::Notice(message) => message,
            Outcome::Tabular(_) => "done".to_string(),
        };
        self.view.status = Some(message);

        match mutation {
            Mutation::CreateDatabase => {
                if matches!(self.location, Location::Root) {
                    self.reload()
                } else {
                    None
                }
            }
            Mutation::DropDatabase => {
                self.enter(Location::Root);
                self.view.filter = None;
                self.reload()
            }
            Mutation::CreateTable(database) => {
                if self.location == Location::TableListView(database) {
                    self.reload()
                } else {
                    None
                }
            }
            Mutation::DropTable(database) => {
                self.enter(Location::TableListView(database));
                self.view.filter = None;
                self.reload()
            }
            Mutation::RowChange { database, table } => {
                if self.location == (Location::TableDataView { database, table }) {
                    self.reload()
                } else {
                    None
                }
            }
        }
    }

    fn apply_query(
        &mut self,
        database: ResourceName,
        table: Option<ResourceName>,
        outcome: Outcome,
    ) -> Option<RequestTicket> {
        self.view.pending = None;
        match outcome {
            Outcome::Failure(message) => {
                self.notify("Query failed", message);
                None
            }
            Outcome::Tabular(_) if table.is_some() && self.location.table() == table.as_ref() => {
                self.reload()
            }
            Outcome::Tabular(result) => {
                self.enter(Location::AdHocResultView {
                    database,
                    label: AD_HOC_RESULT_LABEL.to_string(),
                });
                self.view.content = ViewContent::Loaded(Outcome::Tabular(result));
                None
            }
            Outcome::Notice(message) => {
                self.view.status = Some(message);
                if table.is_some() && self.location.table() == table.as_ref() {
                    self.reload()
                } else {
                    None
                }
            }
        }
    }

    fn run_prompt_action(&mut self, action: PromptAction, input: String) -> Option<RequestTicket> {
        match action {
            PromptAction::Acknowledge => None,
            PromptAction::CreateDatabase => Some(self.issue(
                Intent::Mutate(Mutation::CreateDatabase),
                Request::create_database(input.trim()),
            )),
            PromptAction::DropDatabase { database } => {
                let request = Request::drop_database(&database);
                Some(self.issue(Intent::Mutate(Mutation::DropDatabase), request))
            }
            PromptAction::CreateTableName { database } => {
                let table = input.trim().to_string();
                self.prompts.open(
                    "New table",
                    format!("Columns for `{table}` as name:type,..."),
                    true,
                    PromptAction::CreateTableColumns { database, table },
                );
                None
            }
            PromptAction::CreateTableColumns { database, table } => {
                let request = Request::create_table(&database, table, input.trim());
                Some(self.issue(Intent::Mutate(Mutation::CreateTable(database)), request))
            }
            PromptAction::DropTable { database, table } => {
                let request = Request::drop_table(&database, &table);
                Some(self.issue(Intent::Mutate(Mutation::DropTable(database)), request))
            }
            PromptAction::InsertRow { database, table } => {
                let request = Request::insert_row(&database, &table, input);
                Some(self.issue(Intent::Mutate(Mutation::RowChange { database, table }), request))
            }
            PromptAction::EditRowColumn {
                database,
                table,
                pk_value,
            } => {
                let column = input.trim().to_string();
                self.prompts.open(
                    "Edit row",
                    format!("New value for `{column}` in row `{pk_value}`"),
                    true,
                    PromptAction::EditRowValue {
                        database,
                        table,
                        pk_value,
                        column,
                    },
                );
                None
            }
            PromptAction::EditRowValue {
                database,
                table,
                pk_value,
                column,
            } => {
                let request = Request::update_row(&database, &table, pk_value, column, input);
                Some(self.issue(Intent::Mutate(Mutation::RowChange { database, table }), request))
            }
            PromptAction::DeleteRow {
                database,
                table,
                pk_value,
            } => {
                let request = Request::delete_row(&database, &table, pk_value);
                Some(self.issue(Intent::Mutate(Mutation::RowChange { database, table }), request))
            }
            PromptAction::FilterRows { database, table } => {
                let Some((column, value)) = input
                    .split_once('=')
                    .filter(|(column, _)| !column.trim().is_empty())
                else {
                    self.notify("Filter rows", format!("Expected column=value, got `{input}`"));
                    return None;
                };
                if self.location != (Location::TableDataView { database, table }) {
                    return None;
                }
                self.view.filter = Some(RowFilter {
                    column: column.trim().to_string(),
                    value: value.trim().to_string(),
                });
                self.reload()
            }
            PromptAction::RunQuery { database, table } => {
                let assessment = assess_query(&input);
                if assessment.requires_confirmation() {
                    self.prompts.open(
                        "Run query",
                        format!("{}. Send it anyway?", assessment.summary()),
                        false,
                        PromptAction::ConfirmQuery {
                            database,
                            table,
                            query: input,
                        },
                    );
                    return None;
                }
                Some(self.query_ticket(database, table, input))
            }
            PromptAction::ConfirmQuery {
                database,
                table,
                query,
            } => Some(self.query_ticket(database, table, query)),
        }
    }

    fn query_ticket(
        &mut self,
        database: ResourceName,
        table: Option<ResourceName>,
        query: String,
    ) -> RequestTicket {
        self.bump_epoch();
        self.view.pending = Some("running query".to_string());
        let request = Request::query(&database, query);
        self.issue(Intent::Query { database, table }, request)
    }

    /// Re-reads whatever the current location shows.
    fn reload(&mut self) -> Option<RequestTicket> {
        let (intent, request) = match &self.location {
            Location::Root => (Intent::LoadDatabases, Request::list_databases()),
            Location::DatabaseView(database) | Location::TableListView(database) => (
                Intent::LoadTables(database.clone()),
                Request::list_tables(database),
            ),
            Location::TableDataView { database, table } => {
                let (column, value) = self
                    .view
                    .filter
                    .as_ref()
                    .map(|filter| (filter.column.clone(), filter.value.clone()))
                    .unwrap_or_default();
                (
                    Intent::LoadRows {
                        database: database.clone(),
                        table: table.clone(),
                    },
                    Request::read_rows(database, table, column, value),
                )
            }
            Location::AdHocResultView { .. } => return None,
        };
        self.bump_epoch();
        self.view.content = ViewContent::Loading;
        self.view.pending = None;
        Some(self.issue(intent, request))
    }

    fn enter(&mut self, location: Location) {
        if location != self.location {
            debug!(from = ?self.location, to = ?location, "location changed");
            self.location = location;
            self.bump_epoch();
        }
        self.view.banner = None;
    }

    fn bump_epoch(&mut self) {
        self.epoch = self.epoch.saturating_add(1);
    }

    fn issue(&self, intent: Intent, request: Request) -> RequestTicket {
        debug!(
            epoch = self.epoch,
            endpoint = ?request.endpoint,
            "request issued"
        );
        RequestTicket {
            epoch: self.epoch,
            origin: self.location.clone(),
            intent,
            request,
        }
    }

    fn ensure(&self, action: ActionId) -> Result<(), NavigationError> {
        if self.is_enabled(action) {
            Ok(())
        } else {
            Err(NavigationError::ActionUnavailable(action))
        }
    }

    fn current_database(&self) -> Result<ResourceName, NavigationError> {
        self.location
            .database()
            .cloned()
            .ok_or(NavigationError::NothingSelected("database"))
    }

    fn current_table(&self) -> Result<(ResourceName, ResourceName), NavigationError> {
        match &self.location {
            Location::TableDataView { database, table } => Ok((database.clone(), table.clone())),
            _ => Err(NavigationError::NothingSelected("table")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Applied, Completion, Intent, NavigationError, Navigator, PromptAction, RequestTicket,
        ViewContent,
    };
    use crate::actions::ActionId;
    use crate::classifier::{Outcome, TabularResult};
    use crate::resource::{Location, ResourceName};
    use crate::transport::{Endpoint, RequestBody, TransportError};

    fn name(raw: &str) -> ResourceName {
        ResourceName::new(raw).expect("valid name")
    }

    fn listing(names: &[&str]) -> Outcome {
        Outcome::Tabular(TabularResult::new(
            vec!["name".to_string()],
            names.iter().map(|name| vec![(*name).to_string()]).collect(),
        ))
    }

    fn rows(columns: &[&str], rows: &[&[&str]]) -> Outcome {
        Outcome::Tabular(TabularResult::new(
            columns.iter().map(|column| (*column).to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
                .collect(),
        ))
    }

    fn complete(navigator: &mut Navigator, ticket: RequestTicket, outcome: Outcome) -> Applied {
        navigator.apply(Completion {
            ticket,
            result: Ok(outcome),
        })
    }

    fn follow_up(applied: Applied) -> RequestTicket {
        match applied {
            Applied::Applied {
                follow_up: Some(ticket),
            } => ticket,
            other => panic!("expected a follow-up request, got {other:?}"),
        }
    }

    fn at_root() -> Navigator {
        let mut navigator = Navigator::new();
        let ticket = navigator.start();
        complete(&mut navigator, ticket, listing(&["orders/", "users/"]));
        navigator
    }

    fn at_table_list(database: &str) -> Navigator {
        let mut navigator = at_root();
        let ticket = navigator
            .select_database(name(database))
            .expect("database selectable from root");
        complete(&mut navigator, ticket, listing(&["items", "lines"]));
        navigator
    }

    fn at_table(database: &str, table: &str) -> Navigator {
        let mut navigator = at_table_list(database);
        let ticket = navigator
            .select_table(name(table))
            .expect("table selectable from list");
        complete(
            &mut navigator,
            ticket,
            rows(&["id", "name"], &[&["1", "widget"], &["2", "gadget"]]),
        );
        navigator
    }

    #[test]
    fn starts_at_root_loading_databases() {
        let mut navigator = Navigator::new();
        let ticket = navigator.start();
        assert_eq!(navigator.location(), &Location::Root);
        assert_eq!(navigator.view().content, ViewContent::Loading);
        assert_eq!(ticket.request.endpoint, Endpoint::ListDatabases);
        assert!(ticket.request.body.is_none());

        complete(&mut navigator, ticket, listing(&["orders/", "users/"]));
        let names = navigator.listing();
        assert_eq!(names.len(), 2);
        assert_eq!(names[0].display_name(), "orders");
    }

    #[test]
    fn selecting_framed_database_opens_its_table_list() {
        let mut navigator = at_root();
        let ticket = navigator
            .select_database(name("orders/"))
            .expect("database selectable");
        assert_eq!(ticket.request.endpoint, Endpoint::ListTables);
        assert_eq!(
            ticket.request.body,
            Some(RequestBody::Name {
                name: "orders".to_string()
            })
        );
        assert_eq!(navigator.location(), &Location::Root);

        complete(&mut navigator, ticket, listing(&["items"]));
        assert_eq!(navigator.location(), &Location::TableListView(name("orders/")));
        assert_eq!(navigator.location().breadcrumb(), "databases / orders");
        assert!(navigator.view().pending.is_none());
    }

    #[test]
    fn failed_table_listing_keeps_root_with_banner() {
        let mut navigator = at_root();
        let ticket = navigator
            .select_database(name("orders/"))
            .expect("database selectable");
        complete(
            &mut navigator,
            ticket,
            Outcome::Failure("Missing fields".to_string()),
        );

        assert_eq!(navigator.location(), &Location::Root);
        assert_eq!(navigator.view().banner.as_deref(), Some("Missing fields"));
        assert_eq!(navigator.listing().len(), 2);
    }

    #[test]
    fn transport_errors_surface_as_failures_without_moving() {
        let mut navigator = at_table_list("orders/");
        let ticket = navigator
            .select_table(name("items"))
            .expect("table selectable");
        navigator.apply(Completion {
            ticket,
            result: Err(TransportError::Unreachable {
                url: "http://localhost:8080/data/query".to_string(),
                message: "connection refused".to_string(),
            }),
        });

        assert_eq!(navigator.location(), &Location::TableListView(name("orders/")));
        let banner = navigator.view().banner.clone().unwrap_or_default();
        assert!(banner.contains("connection refused"));
    }

    #[test]
    fn selecting_table_reads_rows_without_filter() {
        let mut navigator = at_table_list("orders/");
        let ticket = navigator
            .select_table(name("items"))
            .expect("table selectable");
        assert_eq!(
            ticket.request.body,
            Some(RequestBody::RowQuery {
                db_name: "orders".to_string(),
                table_name: "items".to_string(),
                column: String::new(),
                value: String::new(),
            })
        );

        complete(&mut navigator, ticket, rows(&["id", "name"], &[]));
        assert_eq!(
            navigator.location(),
            &Location::TableDataView {
                database: name("orders/"),
                table: name("items"),
            }
        );
        assert!(navigator.rows().is_some_and(TabularResult::is_empty));
    }

    #[test]
    fn back_from_table_returns_to_table_list() {
        let mut navigator = at_table("orders/", "items");
        let ticket = navigator.back().expect("back is available");
        assert_eq!(navigator.location(), &Location::TableListView(name("orders/")));
        assert_eq!(ticket.intent, Intent::LoadTables(name("orders/")));
        assert_eq!(navigator.view().content, ViewContent::Loading);

        let ticket = navigator.back().expect("back is available");
        assert_eq!(navigator.location(), &Location::Root);
        assert_eq!(ticket.request.endpoint, Endpoint::ListDatabases);
        assert_eq!(
            navigator.back(),
            Err(NavigationError::ActionUnavailable(ActionId::Back))
        );
    }

    #[test]
    fn row_mutation_success_refetches_same_table() {
        let mut navigator = at_table("orders/", "items");
        navigator.prompt_insert_row().expect("insert available");
        let ticket = navigator
            .confirm_prompt("3, gizmo")
            .expect("insert should issue a request");
        assert_eq!(
            ticket.request.body,
            Some(RequestBody::Insert {
                db_name: "orders".to_string(),
                table_name: "items".to_string(),
                values: "3, gizmo".to_string(),
            })
        );

        let refetch = follow_up(complete(
            &mut navigator,
            ticket,
            Outcome::Notice("Success".to_string()),
        ));
        assert_eq!(refetch.request.endpoint, Endpoint::ReadRows);
        assert_eq!(navigator.location().table(), Some(&name("items")));
        assert_eq!(navigator.view().status.as_deref(), Some("Success"));
    }

    #[test]
    fn edit_row_asks_for_column_then_value() {
        let mut navigator = at_table("orders/", "items");
        navigator.prompt_edit_row("2").expect("edit available");
        assert!(navigator.confirm_prompt("name").is_none());
        let prompt = navigator.prompt().expect("value prompt should be open");
        assert!(prompt.message.contains("`name`"));

        let ticket = navigator
            .confirm_prompt("sprocket")
            .expect("update should issue a request");
        assert_eq!(
            ticket.request.body,
            Some(RequestBody::Update {
                db_name: "orders".to_string(),
                table_name: "items".to_string(),
                pk_value: "2".to_string(),
                column: "name".to_string(),
                value: "sprocket".to_string(),
            })
        );
    }

    #[test]
    fn failed_mutation_opens_notice_and_keeps_location() {
        let mut navigator = at_table("orders/", "items");
        navigator.prompt_delete_row("1").expect("delete available");
        let ticket = navigator.confirm_prompt("").expect("delete issues request");
        assert_eq!(ticket.request.endpoint, Endpoint::DeleteRow);

        let applied = complete(
            &mut navigator,
            ticket,
            Outcome::Failure("row not found".to_string()),
        );
        assert_eq!(applied, Applied::Applied { follow_up: None });
        let prompt = navigator.prompt().expect("failure notice should be open");
        assert_eq!(prompt.message, "row not found");
        assert!(!prompt.requires_input);
        assert_eq!(prompt.on_confirm, PromptAction::Acknowledge);
        assert!(navigator.confirm_prompt("").is_none());
        assert!(navigator.prompt().is_none());
        assert_eq!(navigator.location().table(), Some(&name("items")));
    }

    #[test]
    fn dropping_current_database_from_table_view_returns_to_root() {
        let mut navigator = at_table("orders/", "items");
        navigator.prompt_drop_database(None).expect("drop available");
        let ticket = navigator.confirm_prompt("").expect("drop issues request");
        assert_eq!(
            ticket.request.body,
            Some(RequestBody::Name {
                name: "orders".to_string()
            })
        );

        let reload = follow_up(complete(
            &mut navigator,
            ticket,
            Outcome::Notice("dropped".to_string()),
        ));
        assert_eq!(navigator.location(), &Location::Root);
        assert!(navigator.location().table().is_none());
        assert!(navigator.location().database().is_none());
        assert_eq!(reload.request.endpoint, Endpoint::ListDatabases);
    }

    #[test]
    fn dropping_table_returns_to_refreshed_table_list() {
        let mut navigator = at_table("orders/", "items");
        navigator.prompt_drop_table(None).expect("drop table available");
        let ticket = navigator.confirm_prompt("").expect("drop issues request");
        let reload = follow_up(complete(
            &mut navigator,
            ticket,
            Outcome::Notice("dropped".to_string()),
        ));
        assert_eq!(navigator.location(), &Location::TableListView(name("orders/")));
        assert_eq!(reload.intent, Intent::LoadTables(name("orders/")));
    }

    #[test]
    fn table_creation_is_a_two_step_prompt() {
        let mut navigator = at_table_list("orders/");
        navigator.prompt_create_table().expect("create table available");
        assert!(navigator.confirm_prompt("  ").is_none());
        assert!(navigator.confirm_prompt(" lines ").is_none());

        let prompt = navigator.prompt().expect("column prompt should be open");
        assert!(prompt.message.contains("`lines`"));
        let ticket = navigator
            .confirm_prompt("id:int,sku:string")
            .expect("create table issues request");
        assert_eq!(
            ticket.request.body,
            Some(RequestBody::CreateTable {
                db_name: "orders".to_string(),
                table_name: "lines".to_string(),
                columns: "id:int,sku:string".to_string(),
            })
        );

        let reload = follow_up(complete(
            &mut navigator,
            ticket,
            Outcome::Notice("Success: created".to_string()),
        ));
        assert_eq!(reload.intent, Intent::LoadTables(name("orders/")));
    }

    #[test]
    fn tabular_query_without_table_opens_result_view() {
        let mut navigator = at_table_list("orders/");
        navigator.prompt_query().expect("query available");
        let ticket = navigator
            .confirm_prompt("SELECT * FROM items")
            .expect("query issues request");
        assert_eq!(
            ticket.request.body,
            Some(RequestBody::Query {
                db_name: "orders".to_string(),
                query: "SELECT * FROM items".to_string(),
            })
        );

        complete(&mut navigator, ticket, rows(&["Col 1"], &[&["1"]]));
        assert_eq!(
            navigator.location(),
            &Location::AdHocResultView {
                database: name("orders/"),
                label: "query result".to_string(),
            }
        );
        assert!(!navigator.is_enabled(ActionId::Refresh));
    }

    #[test]
    fn notice_query_with_table_in_context_refetches_table() {
        let mut navigator = at_table("orders/", "items");
        navigator.prompt_query().expect("query available");
        let ticket = navigator
            .confirm_prompt("INSERT INTO items VALUES (3, 'x')")
            .expect("query issues request");

        let reload = follow_up(complete(
            &mut navigator,
            ticket,
            Outcome::Notice("Success".to_string()),
        ));
        assert_eq!(navigator.location().table(), Some(&name("items")));
        assert_eq!(reload.request.endpoint, Endpoint::ReadRows);
    }

    #[test]
    fn tabular_query_with_table_in_context_stays_on_table() {
        let mut navigator = at_table("orders/", "items");
        navigator.prompt_query().expect("query available");
        let ticket = navigator
            .confirm_prompt("SELECT * FROM items")
            .expect("query issues request");

        let reload = follow_up(complete(
            &mut navigator,
            ticket,
            rows(&["id", "name"], &[&["1", "widget"]]),
        ));
        assert_eq!(
            navigator.location(),
            &Location::TableDataView {
                database: name("orders/"),
                table: name("items"),
            }
        );
        assert_eq!(reload.request.endpoint, Endpoint::ReadRows);
        assert_eq!(
            reload.intent,
            Intent::LoadRows {
                database: name("orders/"),
                table: name("items"),
            }
        );
    }

    #[test]
    fn superseded_open_does_not_leave_pending() {
        let mut navigator = at_root();
        let open = navigator
            .select_database(name("orders/"))
            .expect("database selectable");
        assert_eq!(navigator.view().pending.as_deref(), Some("opening orders"));

        let refresh = navigator.refresh().expect("refresh available at root");
        assert_eq!(navigator.view().pending, None);

        assert_eq!(
            complete(&mut navigator, open, listing(&["items"])),
            Applied::Discarded
        );
        complete(&mut navigator, refresh, listing(&["orders/", "users/"]));
        assert_eq!(navigator.location(), &Location::Root);
        assert_eq!(navigator.view().pending, None);
    }

    #[test]
    fn destructive_query_needs_second_confirmation() {
        let mut navigator = at_table_list("orders/");
        navigator.prompt_query().expect("query available");
        assert!(navigator.confirm_prompt("DROP TABLE items").is_none());
        let prompt = navigator.prompt().expect("confirmation should be open");
        assert!(prompt.message.contains("DROP"));

        let ticket = navigator.confirm_prompt("").expect("query sent after confirm");
        assert_eq!(
            ticket.request.body,
            Some(RequestBody::Query {
                db_name: "orders".to_string(),
                query: "DROP TABLE items".to_string(),
            })
        );

        navigator.prompt_query().expect("query available");
        navigator.confirm_prompt("DELETE FROM items");
        assert!(navigator.cancel_prompt());
        assert!(navigator.prompt().is_none());
    }

    #[test]
    fn filter_prompt_reads_rows_with_column_and_value() {
        let mut navigator = at_table("orders/", "items");
        navigator.prompt_filter().expect("filter available");
        let ticket = navigator
            .confirm_prompt("name = widget")
            .expect("filter issues request");
        assert_eq!(
            ticket.request.body,
            Some(RequestBody::RowQuery {
                db_name: "orders".to_string(),
                table_name: "items".to_string(),
                column: "name".to_string(),
                value: "widget".to_string(),
            })
        );
        assert!(navigator.is_enabled(ActionId::ClearFilter));

        let ticket = navigator.clear_filter().expect("clear available");
        assert_eq!(
            ticket.request.body,
            Some(RequestBody::RowQuery {
                db_name: "orders".to_string(),
                table_name: "items".to_string(),
                column: String::new(),
                value: String::new(),
            })
        );

        navigator.prompt_filter().expect("filter available");
        assert!(navigator.confirm_prompt("no equals sign").is_none());
        assert_eq!(
            navigator.prompt().map(|prompt| &prompt.on_confirm),
            Some(&PromptAction::Acknowledge)
        );
    }

    #[test]
    fn stale_response_from_previous_location_is_discarded() {
        let mut navigator = at_table("a/", "items");
        let stale = navigator.refresh().expect("refresh available");

        navigator.back().expect("back to list");
        navigator.back().expect("back to root");
        let ticket = navigator.select_database(name("b/")).expect("select b");
        complete(&mut navigator, ticket, listing(&["other"]));
        assert_eq!(navigator.location(), &Location::TableListView(name("b/")));
        let before = navigator.view().clone();

        let applied = complete(&mut navigator, stale, rows(&["id"], &[&["99"]]));
        assert_eq!(applied, Applied::Discarded);
        assert_eq!(navigator.location(), &Location::TableListView(name("b/")));
        assert_eq!(navigator.view(), &before);
    }

    #[test]
    fn older_selection_loses_to_newer_one() {
        let mut navigator = at_root();
        let first = navigator.select_database(name("orders/")).expect("select");
        let second = navigator.select_database(name("users/")).expect("select");

        assert_eq!(
            complete(&mut navigator, first, listing(&["items"])),
            Applied::Discarded
        );
        complete(&mut navigator, second, listing(&["accounts"]));
        assert_eq!(navigator.location(), &Location::TableListView(name("users/")));
    }

    #[test]
    fn unavailable_actions_are_rejected() {
        let mut navigator = at_root();
        assert_eq!(
            navigator.select_table(name("items")),
            Err(NavigationError::ActionUnavailable(ActionId::OpenTable))
        );
        assert_eq!(
            navigator.prompt_insert_row(),
            Err(NavigationError::ActionUnavailable(ActionId::InsertRow))
        );
        assert_eq!(
            navigator.prompt_drop_database(None),
            Err(NavigationError::NothingSelected("database"))
        );
        assert!(navigator.prompt().is_none());
    }
}
