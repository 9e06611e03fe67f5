use crate::config::Config;
use crate::data_store::{DataStore, Field, Row};
use crate::executor::QueryExecutor;
use crate::insights::Insight;
use crate::pipeline::{QueryPipeline, TranslationRequest};
use crate::response::{ErrorEnvelope, ResponsePayload};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

#[derive(Clone)]
pub struct AppState {
    pub data_store: Arc<dyn DataStore>,
    pub executor: Arc<QueryExecutor>,
    pub pipeline: Arc<QueryPipeline>,
}

#[derive(Debug, Deserialize)]
struct QuestionBody {
    #[serde(default)]
    question: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SqlBody {
    #[serde(default)]
    sql: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteResponse {
    data: Vec<Row>,
    row_count: usize,
    fields: Vec<Field>,
}

fn failure(status: StatusCode, error: impl ToString) -> Response {
    (status, Json(ErrorEnvelope::new(error))).into_response()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/schema", get(schema))
        .route("/api/query", post(query))
        .route("/api/execute", post(execute))
        .route("/api/insights/:kind", get(insights))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Response {
    match state.data_store.ping().await {
        Ok(()) => Json(json!({ "status": "ok", "db": "connected" })).into_response(),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "db": "disconnected" })),
            )
                .into_response()
        }
    }
}

async fn schema(State(state): State<AppState>) -> Response {
    match state.data_store.catalog_columns(None).await {
        Ok(columns) => Json(columns).into_response(),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// Unreadable bodies count as a missing field, so clients always get the `{error}` envelope.
fn body_or_none<T>(payload: Result<Json<T>, JsonRejection>) -> Option<T> {
    match payload {
        Ok(Json(body)) => Some(body),
        Err(rejection) => {
            warn!("Rejected request body: {}", rejection.body_text());
            None
        }
    }
}

async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QuestionBody>, JsonRejection>,
) -> Response {
    let Some(request) = body_or_none(payload)
        .and_then(|body| body.question)
        .as_deref()
        .and_then(TranslationRequest::new)
    else {
        return failure(StatusCode::BAD_REQUEST, "Question is required");
    };

    ResponsePayload::compose(state.pipeline.run(&request).await).into_response()
}

async fn execute(
    State(state): State<AppState>,
    payload: Result<Json<SqlBody>, JsonRejection>,
) -> Response {
    let sql = body_or_none(payload).and_then(|body| body.sql);
    let sql = match sql.as_deref().map(str::trim) {
        Some(sql) if !sql.is_empty() => sql.to_string(),
        _ => return failure(StatusCode::BAD_REQUEST, "SQL query is required"),
    };

    match state.executor.execute(&sql).await {
        Ok(execution) => Json(ExecuteResponse {
            row_count: execution.result.row_count(),
            data: execution.result.rows,
            fields: execution.result.fields,
        })
        .into_response(),
        Err(e) => {
            error!("Passthrough query failed: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn insights(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    let insight: Insight = match kind.parse() {
        Ok(insight) => insight,
        Err(e) => return failure(StatusCode::NOT_FOUND, e),
    };

    match state.executor.execute(insight.sql()).await {
        Ok(execution) => Json(json!({ "data": execution.result.rows })).into_response(),
        Err(e) => {
            error!("Insight {:?} failed: {}", insight, e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

pub struct InsightServer {
    config: Config,
    state: AppState,
}

impl InsightServer {
    pub fn new(config: Config, state: AppState) -> Self {
        Self { config, state }
    }

    pub async fn run(self) -> std::io::Result<()> {
        let server_address = self.config.server_address();
        info!("Starting server at {}", server_address);

        let app = router(self.state)
            .fallback_service(ServeDir::new(&self.config.static_dir))
            .layer(CorsLayer::permissive());

        let listener = TcpListener::bind(&server_address).await?;
        info!("Listening for connections on {}", server_address);

        axum::serve(listener, app).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryGuardConfig;
    use crate::data_store::ColumnMetadata;
    use crate::testing::{result, row, StubDataStore, StubModel};
    use axum::body::Body;
    use axum::http::Request;
    use rstest::rstest;
    use tower::ServiceExt;

    fn app(store: StubDataStore, model: StubModel) -> Router {
        let data_store: Arc<dyn DataStore> = Arc::new(store);
        let executor = Arc::new(QueryExecutor::new(
            data_store.clone(),
            QueryGuardConfig::default(),
        ));
        let pipeline = Arc::new(QueryPipeline::new(
            data_store.clone(),
            Arc::new(model),
            executor.clone(),
            1024,
            100,
        ));
        router(AppState {
            data_store,
            executor,
            pipeline,
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, json) = send(
            app(StubDataStore::with_catalog(vec![]), StubModel::new()),
            get_request("/health"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"status": "ok", "db": "connected"}));

        let (status, json) = send(
            app(StubDataStore::unreachable(), StubModel::new()),
            get_request("/health"),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"status": "error", "db": "disconnected"}));
    }

    #[tokio::test]
    async fn test_schema_lists_catalog() {
        let store = StubDataStore::with_catalog(vec![ColumnMetadata::new(
            "dim_card",
            "card_brand",
            "text",
        )]);
        let (status, json) = send(app(store, StubModel::new()), get_request("/api/schema")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!([{"table_name": "dim_card", "column_name": "card_brand", "data_type": "text"}])
        );
    }

    #[tokio::test]
    async fn test_query_requires_question() {
        for body in [json!({}), json!({"question": ""}), json!({"question": "   "})] {
            let model = StubModel::new();
            let (status, json) = send(
                app(StubDataStore::with_catalog(vec![]), model),
                post_json("/api/query", body),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json, json!({"error": "Question is required"}));
        }
    }

    fn post_raw(uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[rstest]
    #[case::no_content_type(None, r#"{"question": "revenue"}"#)]
    #[case::text_content_type(Some("text/plain"), r#"{"question": "revenue"}"#)]
    #[case::wrong_field_type(Some("application/json"), r#"{"question": 42}"#)]
    #[case::not_json(Some("application/json"), "revenue by day")]
    #[case::empty_body(Some("application/json"), "")]
    #[tokio::test]
    async fn test_unreadable_query_body_is_bad_request(
        #[case] content_type: Option<&str>,
        #[case] body: &str,
    ) {
        let model = StubModel::new().reply("SELECT 1");
        let (status, json) = send(
            app(StubDataStore::with_catalog(vec![]), model),
            post_raw("/api/query", content_type, body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "Question is required"}));
    }

    #[rstest]
    #[case::no_content_type(None, r#"{"sql": "SELECT 1"}"#)]
    #[case::wrong_field_type(Some("application/json"), r#"{"sql": ["SELECT 1"]}"#)]
    #[case::not_json(Some("application/json"), "SELECT 1")]
    #[tokio::test]
    async fn test_unreadable_execute_body_is_bad_request(
        #[case] content_type: Option<&str>,
        #[case] body: &str,
    ) {
        let store = StubDataStore::with_catalog(vec![]);
        let (status, json) = send(
            app(store, StubModel::new()),
            post_raw("/api/execute", content_type, body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "SQL query is required"}));
    }

    #[tokio::test]
    async fn test_query_success() {
        let store = StubDataStore::with_catalog(vec![ColumnMetadata::new(
            "dim_card",
            "card_brand",
            "text",
        )])
        .push_result(result(
            &["card_brand", "usage_count"],
            vec![row(&[("card_brand", json!("VISA")), ("usage_count", json!(12))])],
        ));
        let model = StubModel::new()
            .reply("SELECT card_brand, COUNT(*) AS usage_count FROM dim_card GROUP BY card_brand")
            .reply(r#"{"chartType":"PieChart","dataKey":"card_brand","valueKeys":["usage_count"],"title":"Card usage"}"#);

        let (status, json) = send(
            app(store, model),
            post_json("/api/query", json!({"question": "usage by card brand"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["rowCount"], 1);
        assert_eq!(json["data"][0]["card_brand"], "VISA");
        assert_eq!(json["chartConfig"]["chartType"], "PieChart");
        assert_eq!(
            json["query"],
            "SELECT card_brand, COUNT(*) AS usage_count FROM dim_card GROUP BY card_brand"
        );
    }

    #[tokio::test]
    async fn test_query_failure_envelope() {
        let model = StubModel::new().reply("SELECT 1");
        let (status, json) = send(
            app(StubDataStore::unreachable(), model),
            post_json("/api/query", json!({"question": "anything"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "connection refused"}));
    }

    #[tokio::test]
    async fn test_execute_passthrough() {
        let store = StubDataStore::with_catalog(vec![]).push_result(result(
            &["full_date"],
            vec![row(&[("full_date", json!("2024-01-01"))])],
        ));
        let (status, json) = send(
            app(store, StubModel::new()),
            post_json("/api/execute", json!({"sql": "SELECT full_date FROM dim_date"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({
                "data": [{"full_date": "2024-01-01"}],
                "rowCount": 1,
                "fields": [{"name": "full_date", "type": 25}]
            })
        );
    }

    #[tokio::test]
    async fn test_execute_requires_sql() {
        let (status, json) = send(
            app(StubDataStore::with_catalog(vec![]), StubModel::new()),
            post_json("/api/execute", json!({"sql": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "SQL query is required"}));
    }

    #[tokio::test]
    async fn test_execute_rejects_writes() {
        let (status, json) = send(
            app(StubDataStore::with_catalog(vec![]), StubModel::new()),
            post_json("/api/execute", json!({"sql": "DELETE FROM dim_card"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json,
            json!({"error": "Only read-only SQL statements are allowed"})
        );
    }

    #[tokio::test]
    async fn test_insights() {
        let store = StubDataStore::with_catalog(vec![]).push_result(result(
            &["error_code", "count"],
            vec![row(&[("error_code", json!("E42")), ("count", json!(3))])],
        ));
        let (status, json) = send(
            app(store, StubModel::new()),
            get_request("/api/insights/errors"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"data": [{"error_code": "E42", "count": 3}]}));

        let (status, json) = send(
            app(StubDataStore::with_catalog(vec![]), StubModel::new()),
            get_request("/api/insights/weekly"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json, json!({"error": "Unknown insight type: weekly"}));
    }
}
