use crate::config::PostgresConfig;
use crate::data_store::encoding::{encode_rows, fields_from_columns};
use crate::data_store::{ColumnMetadata, DataStore, DataStoreError, QueryResult};
use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime};
use log::{debug, info};
use std::time::Duration;
use tokio_postgres::{Client, GenericClient, NoTls};

const CATALOG_QUERY: &str = "SELECT table_name::text, column_name::text, data_type::text \
     FROM information_schema.columns \
     WHERE table_schema = 'public' \
     ORDER BY table_name, ordinal_position";

const CATALOG_QUERY_FOR_TABLES: &str = "SELECT table_name::text, column_name::text, data_type::text \
     FROM information_schema.columns \
     WHERE table_schema = 'public' AND table_name::text = ANY($1) \
     ORDER BY table_name, ordinal_position";

impl From<PoolError> for DataStoreError {
    fn from(e: PoolError) -> Self {
        DataStoreError::ConnectionError(e.to_string())
    }
}

/// Postgres behind a `deadpool` connection pool.
///
/// Connections are opened on demand up to `DB_POOL_SIZE`. A checkout waits
/// for any free connection, bounded by `DB_ACQUIRE_TIMEOUT_SECS`, and closed
/// connections are replaced when they are recycled.
pub struct PostgresDataStore {
    pool: Pool,
}

impl PostgresDataStore {
    /// Builds the pool and checks that the database answers.
    pub async fn new(config: PostgresConfig) -> Result<Self, DataStoreError> {
        let store = Self::from_config(&config)?;
        store.ping().await?;
        info!(
            "Connected to Postgres at {}:{} (pool size {})",
            config.host,
            config.port,
            store.pool.status().max_size
        );
        Ok(store)
    }

    /// Builds the pool without opening a connection.
    pub fn from_config(config: &PostgresConfig) -> Result<Self, DataStoreError> {
        let manager = Manager::from_config(
            config.to_pg_config(),
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let timeout = Some(Duration::from_secs(config.acquire_timeout_secs));
        let pool = Pool::builder(manager)
            .max_size(config.pool_size.max(1))
            .runtime(Runtime::Tokio1)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .build()
            .map_err(|e| DataStoreError::ConnectionError(e.to_string()))?;

        Ok(PostgresDataStore { pool })
    }
}

async fn run_query<C>(client: &C, sql: &str) -> Result<QueryResult, DataStoreError>
where
    C: GenericClient + Sync,
{
    let stmt = client.prepare(sql).await?;
    let rows = client.query(&stmt, &[]).await?;
    let rows = encode_rows(rows, stmt.columns())?;
    Ok(QueryResult {
        rows,
        fields: fields_from_columns(stmt.columns()),
    })
}

#[async_trait]
impl DataStore for PostgresDataStore {
    async fn catalog_columns(
        &self,
        tables: Option<&[&str]>,
    ) -> Result<Vec<ColumnMetadata>, DataStoreError> {
        let object = self.pool.get().await?;
        let client: &Client = &object;
        let rows = match tables {
            Some(tables) => {
                let tables: Vec<String> = tables.iter().map(|t| t.to_string()).collect();
                client.query(CATALOG_QUERY_FOR_TABLES, &[&tables]).await?
            }
            None => client.query(CATALOG_QUERY, &[]).await?,
        };

        rows.iter()
            .map(|row| -> Result<ColumnMetadata, DataStoreError> {
                Ok(ColumnMetadata {
                    table_name: row.try_get(0)?,
                    column_name: row.try_get(1)?,
                    data_type: row.try_get(2)?,
                })
            })
            .collect()
    }

    async fn execute(&self, sql: &str, read_only: bool) -> Result<QueryResult, DataStoreError> {
        let mut object = self.pool.get().await?;
        let client: &mut Client = &mut object;
        if !read_only {
            return run_query(&*client, sql).await;
        }

        debug!("Running statement in a read-only transaction");
        let transaction = client.build_transaction().read_only(true).start().await?;
        let result = run_query(&transaction, sql).await?;
        transaction.commit().await?;
        Ok(result)
    }

    async fn ping(&self) -> Result<(), DataStoreError> {
        let object = self.pool.get().await?;
        let client: &Client = &object;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }
}
