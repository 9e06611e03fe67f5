pub mod encoding;
pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// A single result row keyed by column name, in column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// One `information_schema.columns` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMetadata {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
}

impl ColumnMetadata {
    pub fn new(table_name: &str, column_name: &str, data_type: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            column_name: column_name.to_string(),
            data_type: data_type.to_string(),
        }
    }
}

/// Result field descriptor. `type` is the Postgres type OID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub type_oid: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub fields: Vec<Field>,
}

impl QueryResult {
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// DataStore runs SQL against the analytical database
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Column metadata from the `public` schema, ordered by table then ordinal
    /// position. `tables` restricts the lookup when given.
    async fn catalog_columns(
        &self,
        tables: Option<&[&str]>,
    ) -> Result<Vec<ColumnMetadata>, DataStoreError>;

    /// Execute the query and return the rows along with the field descriptors.
    ///
    /// With `read_only` set, the statement runs inside a read-only transaction.
    async fn execute(&self, sql: &str, read_only: bool) -> Result<QueryResult, DataStoreError>;

    async fn ping(&self) -> Result<(), DataStoreError>;
}

#[derive(Error, Debug)]
pub enum DataStoreError {
    #[error("{0}")]
    ConnectionError(String),

    #[error("{0}")]
    QueryError(String),
}

impl From<tokio_postgres::Error> for DataStoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        // Surface the backend's own message, not the driver's wrapper text
        match e.as_db_error() {
            Some(db_error) => DataStoreError::QueryError(db_error.message().to_string()),
            None if e.is_closed() => DataStoreError::ConnectionError(e.to_string()),
            None => DataStoreError::QueryError(e.to_string()),
        }
    }
}
