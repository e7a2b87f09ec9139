use std::fmt;

use thiserror::Error;

const LISTING_FRAME: char = '/';
pub const AD_HOC_RESULT_LABEL: &str = "query result";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceNameError {
    #[error("resource name must not be empty")]
    Empty,
}

/// Identifier of a database or table as the store reports it.
///
/// The raw form is kept verbatim, including the trailing `/` the database
/// listing appends. Use [`ResourceName::display_name`] for labels and
/// [`ResourceName::wire_name`] when the name goes back over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceName(String);

impl ResourceName {
    pub fn new(raw: impl Into<String>) -> Result<Self, ResourceNameError> {
        let raw = raw.into();
        if raw.trim().is_empty() || raw.trim() == LISTING_FRAME.to_string() {
            return Err(ResourceNameError::Empty);
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.0.strip_suffix(LISTING_FRAME).unwrap_or(&self.0).trim()
    }

    #[must_use]
    pub fn wire_name(&self) -> String {
        self.display_name().to_string()
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Location {
    #[default]
    Root,
    DatabaseView(ResourceName),
    TableListView(ResourceName),
    TableDataView {
        database: ResourceName,
        table: ResourceName,
    },
    AdHocResultView {
        database: ResourceName,
        label: String,
    },
}

impl Location {
    #[must_use]
    pub fn database(&self) -> Option<&ResourceName> {
        match self {
            Self::Root => None,
            Self::DatabaseView(database) | Self::TableListView(database) => Some(database),
            Self::TableDataView { database, .. } | Self::AdHocResultView { database, .. } => {
                Some(database)
            }
        }
    }

    #[must_use]
    pub fn table(&self) -> Option<&ResourceName> {
        match self {
            Self::TableDataView { table, .. } => Some(table),
            _ => None,
        }
    }

    #[must_use]
    pub fn breadcrumb(&self) -> String {
        match self {
            Self::Root => "databases".to_string(),
            Self::DatabaseView(database) | Self::TableListView(database) => {
                format!("databases / {database}")
            }
            Self::TableDataView { database, table } => {
                format!("databases / {database} / {table}")
            }
            Self::AdHocResultView { database, label } => {
                format!("databases / {database} / {label}")
            }
        }
    }
}
