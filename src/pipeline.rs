use crate::chart::{ChartDescriptor, ChartInference};
use crate::data_store::{DataStore, DataStoreError, QueryResult};
use crate::executor::{ExecutionError, QueryExecutor};
use crate::llm::{LanguageModel, ModelError};
use crate::prompt::render_sql_prompt;
use crate::schema::SchemaDescriptor;
use crate::translator::QueryTranslator;
use log::info;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    DataSource(#[from] DataStoreError),

    #[error("{0}")]
    ModelCall(#[from] ModelError),

    #[error("{0}")]
    MalformedModelOutput(String),

    #[error("{0}")]
    QueryExecution(#[from] ExecutionError),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::DataSource(_) => "data_source",
            PipelineError::ModelCall(_) => "model_call",
            PipelineError::MalformedModelOutput(_) => "malformed_model_output",
            PipelineError::QueryExecution(_) => "query_execution",
        }
    }
}

/// A non-empty natural-language question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    question: String,
}

impl TranslationRequest {
    pub fn new(question: &str) -> Option<Self> {
        if question.trim().is_empty() {
            return None;
        }
        Some(Self {
            question: question.to_string(),
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub query: String,
    pub result: QueryResult,
    pub chart: ChartDescriptor,
}

/// Question in, query result and chart out. Every stage runs once, in order,
/// and the first failure ends the run.
pub struct QueryPipeline {
    data_store: Arc<dyn DataStore>,
    translator: QueryTranslator,
    executor: Arc<QueryExecutor>,
    charts: ChartInference,
    row_limit: u64,
}

impl QueryPipeline {
    pub fn new(
        data_store: Arc<dyn DataStore>,
        model: Arc<dyn LanguageModel>,
        executor: Arc<QueryExecutor>,
        max_tokens: u32,
        row_limit: u64,
    ) -> Self {
        Self {
            data_store,
            translator: QueryTranslator::new(model.clone(), max_tokens),
            executor,
            charts: ChartInference::new(model, max_tokens),
            row_limit,
        }
    }

    pub async fn run(&self, request: &TranslationRequest) -> Result<PipelineOutput, PipelineError> {
        info!("Received question: {:?}", request.question());

        let schema = SchemaDescriptor::load(self.data_store.as_ref()).await?;
        let prompt = render_sql_prompt(&schema, request.question(), self.row_limit);
        let query = self.translator.translate(&prompt).await?;
        let execution = self.executor.execute(&query).await?;
        let chart = self.charts.infer(request.question(), &execution.result).await?;

        Ok(PipelineOutput {
            query: execution.sql,
            result: execution.result,
            chart,
        })
    }
}
