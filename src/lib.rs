pub mod chart;
pub mod config;
pub mod data_store;
pub mod executor;
pub mod insights;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod response;
pub mod schema;
pub mod server;
pub mod translator;

#[cfg(test)]
mod testing;

pub use pipeline::QueryPipeline;
pub use server::InsightServer;
