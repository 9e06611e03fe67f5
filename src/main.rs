use log::error;
use std::process;
use std::sync::Arc;

use nl_insights::{
    config::{Config, ModelConfig, PostgresConfig, QueryGuardConfig},
    data_store::{postgres::PostgresDataStore, DataStore},
    executor::QueryExecutor,
    llm::AnthropicClient,
    server::AppState,
    InsightServer, QueryPipeline,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::new().map_err(|e| {
        error!("Failed to initialize config: {}", e);
        e
    })?;

    let postgres_config = PostgresConfig::new().map_err(|e| {
        error!("Failed to initialize Postgres config: {}", e);
        e
    })?;

    let model_config = ModelConfig::new().map_err(|e| {
        error!("Failed to initialize model config: {}", e);
        e
    })?;

    let guard_config = QueryGuardConfig::new().map_err(|e| {
        error!("Failed to initialize query guard config: {}", e);
        e
    })?;

    let data_store: Arc<dyn DataStore> =
        Arc::new(PostgresDataStore::new(postgres_config).await.map_err(|e| {
            error!("Failed to create PostgresDataStore: {}", e);
            e
        })?);

    let model = AnthropicClient::new(model_config).map_err(|e| {
        error!("Failed to create AnthropicClient: {}", e);
        e
    })?;
    let max_tokens = model.max_tokens();

    let row_limit = guard_config.row_limit;
    let executor = Arc::new(QueryExecutor::new(data_store.clone(), guard_config));
    let pipeline = Arc::new(QueryPipeline::new(
        data_store.clone(),
        Arc::new(model),
        executor.clone(),
        max_tokens,
        row_limit,
    ));

    let state = AppState {
        data_store,
        executor,
        pipeline,
    };
    let server = InsightServer::new(config, state);

    if let Err(e) = server.run().await {
        error!("Server encountered an error: {}", e);
        process::exit(1);
    }

    Ok(())
}
