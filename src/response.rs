use crate::chart::ChartDescriptor;
use crate::data_store::Row;
use crate::pipeline::{PipelineError, PipelineOutput};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySuccess {
    pub query: String,
    pub data: Vec<Row>,
    pub chart_config: ChartDescriptor,
    pub row_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

impl ErrorEnvelope {
    pub fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

/// Either the full query answer or a bare `{error}`, never both.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    Success(QuerySuccess),
    Failure(ErrorEnvelope),
}

impl ResponsePayload {
    pub fn compose(outcome: Result<PipelineOutput, PipelineError>) -> Self {
        match outcome {
            Ok(output) => ResponsePayload::Success(QuerySuccess {
                query: output.query,
                row_count: output.result.row_count(),
                data: output.result.rows,
                chart_config: output.chart,
            }),
            Err(e) => {
                error!("Query pipeline failed ({}): {}", e.kind(), e);
                ResponsePayload::Failure(ErrorEnvelope::new(e))
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ResponsePayload::Success(_) => StatusCode::OK,
            ResponsePayload::Failure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ResponsePayload {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}
