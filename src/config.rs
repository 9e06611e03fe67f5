use envconfig::Envconfig;
use log::debug;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "SERVER_HOST", default = "0.0.0.0")]
    pub server_host: String,

    #[envconfig(from = "PORT", default = "3000")]
    pub server_port: u16,

    #[envconfig(from = "STATIC_DIR", default = "public")]
    pub static_dir: String,
}

impl Config {
    pub fn new() -> Result<Self, envconfig::Error> {
        let config = Self::init_from_env()?;
        debug!(
            "Config loaded: server_host={}, server_port={}, static_dir={}",
            config.server_host, config.server_port, config.static_dir
        );
        Ok(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[derive(Envconfig, Clone)]
pub struct PostgresConfig {
    #[envconfig(from = "DB_HOST", default = "localhost")]
    pub host: String,
    #[envconfig(from = "DB_PORT", default = "5432")]
    pub port: u16,
    #[envconfig(from = "DB_USER", default = "postgres")]
    pub user: String,
    #[envconfig(from = "DB_PASSWORD", default = "postgres")]
    pub password: String,
    #[envconfig(from = "DB_NAME", default = "postgres")]
    pub dbname: String,
    #[envconfig(from = "DB_POOL_SIZE", default = "10")]
    pub pool_size: usize,
    #[envconfig(from = "DB_ACQUIRE_TIMEOUT_SECS", default = "30")]
    pub acquire_timeout_secs: u64,
}

impl PostgresConfig {
    pub fn new() -> Result<Self, envconfig::Error> {
        let config = Self::init_from_env()?;
        debug!(
            "PostgresConfig loaded: user={}, host={}, port={}, dbname={}, pool_size={}, acquire_timeout_secs={}",
            config.user,
            config.host,
            config.port,
            config.dbname,
            config.pool_size,
            config.acquire_timeout_secs
        );
        Ok(config)
    }

    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .password(&self.password)
            .dbname(&self.dbname);
        pg_config
    }
}

#[derive(Envconfig, Clone)]
pub struct ModelConfig {
    #[envconfig(from = "ANTHROPIC_API_KEY")]
    pub api_key: String,

    #[envconfig(from = "ANTHROPIC_MODEL", default = "claude-sonnet-4-20250514")]
    pub model: String,

    #[envconfig(from = "ANTHROPIC_BASE_URL", default = "https://api.anthropic.com")]
    pub base_url: String,

    #[envconfig(from = "MODEL_MAX_TOKENS", default = "1024")]
    pub max_tokens: u32,

    #[envconfig(from = "MODEL_TIMEOUT_SECS", default = "60")]
    pub timeout_secs: u64,
}

impl ModelConfig {
    pub fn new() -> Result<Self, envconfig::Error> {
        let config = Self::init_from_env()?;
        debug!(
            "ModelConfig loaded: model={}, base_url={}, max_tokens={}, timeout_secs={}",
            config.model, config.base_url, config.max_tokens, config.timeout_secs
        );
        Ok(config)
    }
}

/// Controls the statement checks applied before a query reaches the database.
#[derive(Envconfig, Clone, Debug)]
pub struct QueryGuardConfig {
    #[envconfig(from = "READ_ONLY_QUERIES", default = "true")]
    pub read_only: bool,

    #[envconfig(from = "ENFORCE_ROW_LIMIT", default = "false")]
    pub enforce_row_limit: bool,

    #[envconfig(from = "ROW_LIMIT", default = "100")]
    pub row_limit: u64,
}

impl QueryGuardConfig {
    pub fn new() -> Result<Self, envconfig::Error> {
        let config = Self::init_from_env()?;
        debug!("QueryGuardConfig loaded: {:?}", config);
        Ok(config)
    }
}

impl Default for QueryGuardConfig {
    fn default() -> Self {
        Self {
            read_only: true,
            enforce_row_limit: false,
            row_limit: 100,
        }
    }
}
