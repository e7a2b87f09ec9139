use crate::resource::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionId {
    Refresh,
    OpenDatabase,
    OpenTable,
    Back,
    CreateDatabase,
    DropDatabase,
    CreateTable,
    DropTable,
    InsertRow,
    EditRow,
    DeleteRow,
    FilterRows,
    ClearFilter,
    RunQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionContext<'a> {
    pub location: &'a Location,
    pub filter_active: bool,
}

impl<'a> ActionContext<'a> {
    #[must_use]
    pub fn new(location: &'a Location) -> Self {
        Self {
            location,
            filter_active: false,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter_active: bool) -> Self {
        self.filter_active = filter_active;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionDefinition {
    pub id: ActionId,
    pub title: &'static str,
    pub description: &'static str,
}

const ACTIONS: [ActionDefinition; 14] = [
    ActionDefinition {
        id: ActionId::Refresh,
        title: "Refresh",
        description: "Reload the current listing or table",
    },
    ActionDefinition {
        id: ActionId::OpenDatabase,
        title: "Open database",
        description: "List the tables of the highlighted database",
    },
    ActionDefinition {
        id: ActionId::OpenTable,
        title: "Open table",
        description: "Read every row of the highlighted table",
    },
    ActionDefinition {
        id: ActionId::Back,
        title: "Back",
        description: "Return to the parent view",
    },
    ActionDefinition {
        id: ActionId::CreateDatabase,
        title: "New database",
        description: "Create a database by name",
    },
    ActionDefinition {
        id: ActionId::DropDatabase,
        title: "Drop database",
        description: "Delete a database and all of its tables",
    },
    ActionDefinition {
        id: ActionId::CreateTable,
        title: "New table",
        description: "Create a table from a name and a column list",
    },
    ActionDefinition {
        id: ActionId::DropTable,
        title: "Drop table",
        description: "Delete a table and its rows",
    },
    ActionDefinition {
        id: ActionId::InsertRow,
        title: "Add row",
        description: "Insert comma separated values",
    },
    ActionDefinition {
        id: ActionId::EditRow,
        title: "Edit row",
        description: "Change one column of the selected row",
    },
    ActionDefinition {
        id: ActionId::DeleteRow,
        title: "Delete row",
        description: "Delete the selected row by primary key",
    },
    ActionDefinition {
        id: ActionId::FilterRows,
        title: "Filter",
        description: "Show rows where column=value",
    },
    ActionDefinition {
        id: ActionId::ClearFilter,
        title: "Clear filter",
        description: "Show every row again",
    },
    ActionDefinition {
        id: ActionId::RunQuery,
        title: "Query",
        description: "Send a free-form query to the current database",
    },
];

#[derive(Debug, Default)]
pub struct ActionRegistry;

impl ActionRegistry {
    #[must_use]
    pub fn all(&self) -> &'static [ActionDefinition] {
        &ACTIONS
    }

    #[must_use]
    pub fn find(&self, action_id: ActionId) -> Option<ActionDefinition> {
        ACTIONS
            .iter()
            .copied()
            .find(|action| action.id == action_id)
    }

    #[must_use]
    pub fn enabled_actions(&self, context: &ActionContext<'_>) -> Vec<ActionDefinition> {
        ACTIONS
            .iter()
            .copied()
            .filter(|action| action_enabled(action.id, context))
            .collect()
    }
}

/// Decides which store calls are legal from the given location.
#[must_use]
pub fn action_enabled(action_id: ActionId, context: &ActionContext<'_>) -> bool {
    let location = context.location;
    match action_id {
        ActionId::Refresh => !matches!(location, Location::AdHocResultView { .. }),
        ActionId::OpenDatabase | ActionId::CreateDatabase => matches!(location, Location::Root),
        ActionId::OpenTable | ActionId::CreateTable => matches!(
            location,
            Location::TableListView(_) | Location::DatabaseView(_)
        ),
        ActionId::Back => !matches!(location, Location::Root),
        ActionId::DropDatabase => !matches!(location, Location::AdHocResultView { .. }),
        ActionId::DropTable => matches!(
            location,
            Location::TableListView(_) | Location::DatabaseView(_) | Location::TableDataView { .. }
        ),
        ActionId::InsertRow | ActionId::EditRow | ActionId::DeleteRow | ActionId::FilterRows => {
            matches!(location, Location::TableDataView { .. })
        }
        ActionId::ClearFilter => {
            context.filter_active && matches!(location, Location::TableDataView { .. })
        }
        ActionId::RunQuery => location.database().is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::{action_enabled, ActionContext, ActionId, ActionRegistry};
    use crate::resource::{Location, ResourceName};

    fn name(raw: &str) -> ResourceName {
        ResourceName::new(raw).expect("valid name")
    }

    #[test]
    fn root_only_offers_database_level_actions() {
        let registry = ActionRegistry;
        let enabled = registry
            .enabled_actions(&ActionContext::new(&Location::Root))
            .into_iter()
            .map(|action| action.id)
            .collect::<Vec<_>>();

        assert!(enabled.contains(&ActionId::OpenDatabase));
        assert!(enabled.contains(&ActionId::CreateDatabase));
        assert!(!enabled.contains(&ActionId::Back));
        assert!(!enabled.contains(&ActionId::RunQuery));
        assert!(!enabled.contains(&ActionId::InsertRow));
    }

    #[test]
    fn row_actions_require_a_table_in_view() {
        let table_view = Location::TableDataView {
            database: name("shop/"),
            table: name("items"),
        };
        let list_view = Location::TableListView(name("shop/"));

        for action in [ActionId::InsertRow, ActionId::EditRow, ActionId::DeleteRow] {
            assert!(action_enabled(action, &ActionContext::new(&table_view)));
            assert!(!action_enabled(action, &ActionContext::new(&list_view)));
        }
        assert!(action_enabled(ActionId::RunQuery, &ActionContext::new(&list_view)));
    }

    #[test]
    fn clear_filter_needs_an_active_filter() {
        let table_view = Location::TableDataView {
            database: name("shop/"),
            table: name("items"),
        };
        assert!(!action_enabled(
            ActionId::ClearFilter,
            &ActionContext::new(&table_view)
        ));
        assert!(action_enabled(
            ActionId::ClearFilter,
            &ActionContext::new(&table_view).with_filter(true)
        ));
    }

    #[test]
    fn registry_finds_definitions() {
        let registry = ActionRegistry;
        assert_eq!(
            registry.find(ActionId::DropTable).map(|action| action.title),
            Some("Drop table")
        );
        assert_eq!(registry.all().len(), 14);
    }
}
