use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::resource::ResourceName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Text,
    Structured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ListDatabases,
    ListTables,
    ReadRows,
    InsertRow,
    UpdateRow,
    DeleteRow,
    CreateDatabase,
    DropDatabase,
    CreateTable,
    DropTable,
    Query,
}

impl Endpoint {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::ListDatabases => "/databases",
            Self::ListTables => "/tables",
            Self::ReadRows => "/data/query",
            Self::InsertRow => "/data/insert",
            Self::UpdateRow => "/data/update",
            Self::DeleteRow => "/data/delete",
            Self::CreateDatabase => "/database/create",
            Self::DropDatabase => "/database/delete",
            Self::CreateTable => "/table/create",
            Self::DropTable => "/table/delete",
            Self::Query => "/sql",
        }
    }

    #[must_use]
    pub fn method(self) -> Method {
        match self {
            Self::ListDatabases => Method::Get,
            _ => Method::Post,
        }
    }

    #[must_use]
    pub fn response_kind(self) -> ResponseKind {
        match self {
            Self::ReadRows => ResponseKind::Structured,
            _ => ResponseKind::Text,
        }
    }

    #[must_use]
    pub fn is_listing(self) -> bool {
        matches!(self, Self::ListDatabases | Self::ListTables)
    }
}

/// JSON bodies accepted by the store, one shape per route family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RequestBody {
    Name {
        name: String,
    },
    Table {
        db_name: String,
        table_name: String,
    },
    RowQuery {
        db_name: String,
        table_name: String,
        column: String,
        value: String,
    },
    Insert {
        db_name: String,
        table_name: String,
        values: String,
    },
    Update {
        db_name: String,
        table_name: String,
        pk_value: String,
        column: String,
        value: String,
    },
    Delete {
        db_name: String,
        table_name: String,
        pk_value: String,
    },
    CreateTable {
        db_name: String,
        table_name: String,
        columns: String,
    },
    Query {
        db_name: String,
        query: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub endpoint: Endpoint,
    pub body: Option<RequestBody>,
}

impl Request {
    #[must_use]
    pub fn list_databases() -> Self {
        Self {
            endpoint: Endpoint::ListDatabases,
            body: None,
        }
    }

    #[must_use]
    pub fn list_tables(database: &ResourceName) -> Self {
        Self::with_body(
            Endpoint::ListTables,
            RequestBody::Name {
                name: database.wire_name(),
            },
        )
    }

    /// Empty `column`/`value` strings mean "no filter".
    #[must_use]
    pub fn read_rows(
        database: &ResourceName,
        table: &ResourceName,
        column: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::with_body(
            Endpoint::ReadRows,
            RequestBody::RowQuery {
                db_name: database.wire_name(),
                table_name: table.wire_name(),
                column: column.into(),
                value: value.into(),
            },
        )
    }

    #[must_use]
    pub fn insert_row(
        database: &ResourceName,
        table: &ResourceName,
        values: impl Into<String>,
    ) -> Self {
        Self::with_body(
            Endpoint::InsertRow,
            RequestBody::Insert {
                db_name: database.wire_name(),
                table_name: table.wire_name(),
                values: values.into(),
            },
        )
    }

    #[must_use]
    pub fn update_row(
        database: &ResourceName,
        table: &ResourceName,
        pk_value: impl Into<String>,
        column: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::with_body(
            Endpoint::UpdateRow,
            RequestBody::Update {
                db_name: database.wire_name(),
                table_name: table.wire_name(),
                pk_value: pk_value.into(),
                column: column.into(),
                value: value.into(),
            },
        )
    }

    #[must_use]
    pub fn delete_row(
        database: &ResourceName,
        table: &ResourceName,
        pk_value: impl Into<String>,
    ) -> Self {
        Self::with_body(
            Endpoint::DeleteRow,
            RequestBody::Delete {
                db_name: database.wire_name(),
                table_name: table.wire_name(),
                pk_value: pk_value.into(),
            },
        )
    }

    #[must_use]
    pub fn create_database(name: impl Into<String>) -> Self {
        Self::with_body(Endpoint::CreateDatabase, RequestBody::Name { name: name.into() })
    }

    #[must_use]
    pub fn drop_database(database: &ResourceName) -> Self {
        Self::with_body(
            Endpoint::DropDatabase,
            RequestBody::Name {
                name: database.wire_name(),
            },
        )
    }

    /// `columns` uses the store's `name:type,...` notation.
    #[must_use]
    pub fn create_table(
        database: &ResourceName,
        table: impl Into<String>,
        columns: impl Into<String>,
    ) -> Self {
        Self::with_body(
            Endpoint::CreateTable,
            RequestBody::CreateTable {
                db_name: database.wire_name(),
                table_name: table.into(),
                columns: columns.into(),
            },
        )
    }

    #[must_use]
    pub fn drop_table(database: &ResourceName, table: &ResourceName) -> Self {
        Self::with_body(
            Endpoint::DropTable,
            RequestBody::Table {
                db_name: database.wire_name(),
                table_name: table.wire_name(),
            },
        )
    }

    #[must_use]
    pub fn query(database: &ResourceName, query: impl Into<String>) -> Self {
        Self::with_body(
            Endpoint::Query,
            RequestBody::Query {
                db_name: database.wire_name(),
                query: query.into(),
            },
        )
    }

    fn with_body(endpoint: Endpoint, body: RequestBody) -> Self {
        Self {
            endpoint,
            body: Some(body),
        }
    }
}

/// Self-describing row payload returned by the row-read route.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct TablePayload {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub columns: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rows: Vec<Vec<String>>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawBody {
    Text(String),
    Structured(TablePayload),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: RawBody,
}

impl RawResponse {
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: RawBody::Text(body.into()),
        }
    }

    #[must_use]
    pub fn structured(status: u16, payload: TablePayload) -> Self {
        Self {
            status,
            body: RawBody::Structured(payload),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The store could not be reached at all. Application-level failures are
/// carried by a not-ok [`RawResponse`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("could not reach {url}: {message}")]
    Unreachable { url: String, message: String },
    #[error("request to {url} timed out")]
    TimedOut { url: String },
    #[error("failed to read response from {url}: {message}")]
    Body { url: String, message: String },
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &Request) -> Result<RawResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Endpoint, Method, RawResponse, Request, ResponseKind, TablePayload};
    use crate::resource::ResourceName;

    fn name(raw: &str) -> ResourceName {
        ResourceName::new(raw).expect("valid name")
    }

    #[test]
    fn only_database_listing_is_a_read() {
        assert_eq!(Endpoint::ListDatabases.method(), Method::Get);
        assert_eq!(Endpoint::ListTables.method(), Method::Post);
        assert_eq!(Endpoint::Query.method(), Method::Post);
        assert_eq!(Endpoint::ReadRows.response_kind(), ResponseKind::Structured);
        assert_eq!(Endpoint::Query.response_kind(), ResponseKind::Text);
    }

    #[test]
    fn unfiltered_row_read_sends_empty_filter_strings() {
        let request = Request::read_rows(&name("shop/"), &name("items"), "", "");
        let body = serde_json::to_value(request.body).expect("serializable body");
        assert_eq!(
            body,
            json!({"db_name": "shop", "table_name": "items", "column": "", "value": ""})
        );
    }

    #[test]
    fn bodies_use_store_field_names_and_stripped_names() {
        let body = serde_json::to_value(Request::list_tables(&name("orders/")).body)
            .expect("serializable body");
        assert_eq!(body, json!({"name": "orders"}));

        let body = serde_json::to_value(
            Request::create_table(&name("orders/"), "lines", "id:int,sku:string").body,
        )
        .expect("serializable body");
        assert_eq!(
            body,
            json!({"db_name": "orders", "table_name": "lines", "columns": "id:int,sku:string"})
        );

        let body = serde_json::to_value(Request::query(&name("orders/"), " SELECT * FROM a ").body)
            .expect("serializable body");
        assert_eq!(body, json!({"db_name": "orders", "query": " SELECT * FROM a "}));
    }

    #[test]
    fn table_payload_tolerates_null_fields() {
        let payload: TablePayload =
            serde_json::from_str(r#"{"columns":["id","name"],"rows":null}"#)
                .expect("payload should decode");
        assert_eq!(payload.columns, vec!["id".to_string(), "name".to_string()]);
        assert!(payload.rows.is_empty());
    }

    #[test]
    fn ok_status_is_any_2xx() {
        assert!(RawResponse::text(200, "").is_ok());
        assert!(RawResponse::text(201, "Success").is_ok());
        assert!(!RawResponse::text(404, "").is_ok());
        assert!(!RawResponse::text(500, "boom").is_ok());
    }
}
