//! In-memory stand-ins for the database and the model.

use crate::data_store::{ColumnMetadata, DataStore, DataStoreError, Field, QueryResult, Row};
use crate::llm::{LanguageModel, ModelError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn result(field_names: &[&str], rows: Vec<Row>) -> QueryResult {
    QueryResult {
        rows,
        fields: field_names
            .iter()
            .map(|name| Field {
                name: name.to_string(),
                type_oid: 25,
            })
            .collect(),
    }
}

/// Returns its whole catalog regardless of the table filter, like a database
/// holding more tables than the allow-list.
#[derive(Default)]
pub struct StubDataStore {
    reachable: bool,
    catalog: Vec<ColumnMetadata>,
    results: Mutex<VecDeque<Result<QueryResult, String>>>,
    executed: Mutex<Vec<(String, bool)>>,
}

impl StubDataStore {
    pub fn with_catalog(catalog: Vec<ColumnMetadata>) -> Self {
        Self {
            reachable: true,
            catalog,
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn push_result(self, result: QueryResult) -> Self {
        self.results.lock().unwrap().push_back(Ok(result));
        self
    }

    pub fn push_error(self, message: &str) -> Self {
        self.results
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn executed(&self) -> Vec<(String, bool)> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataStore for StubDataStore {
    async fn catalog_columns(
        &self,
        _tables: Option<&[&str]>,
    ) -> Result<Vec<ColumnMetadata>, DataStoreError> {
        if !self.reachable {
            return Err(DataStoreError::ConnectionError(
                "connection refused".to_string(),
            ));
        }
        Ok(self.catalog.clone())
    }

    async fn execute(&self, sql: &str, read_only: bool) -> Result<QueryResult, DataStoreError> {
        if !self.reachable {
            return Err(DataStoreError::ConnectionError(
                "connection refused".to_string(),
            ));
        }
        self.executed
            .lock()
            .unwrap()
            .push((sql.to_string(), read_only));
        match self.results.lock().unwrap().pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(DataStoreError::QueryError(message)),
            None => Ok(QueryResult::default()),
        }
    }

    async fn ping(&self) -> Result<(), DataStoreError> {
        if self.reachable {
            Ok(())
        } else {
            Err(DataStoreError::ConnectionError(
                "connection refused".to_string(),
            ))
        }
    }
}

/// Replays scripted responses in order and records every prompt it receives.
#[derive(Default)]
pub struct StubModel {
    responses: Mutex<VecDeque<Result<Option<String>, ModelError>>>,
    prompts: Mutex<Vec<String>>,
}

impl StubModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(Some(text.to_string())));
        self
    }

    pub fn reply_empty(self) -> Self {
        self.responses.lock().unwrap().push_back(Ok(None));
        self
    }

    pub fn fail(self, error: ModelError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<Option<String>, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Network("no scripted response".to_string())))
    }
}
