use metrics::gauge;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::ServiceError;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Connection settings of the printed-label ledger
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl DbConfig {
    pub fn for_url(url: &str) -> Self {
        let mut config = Self {
            url: url.to_string(),
            ..Default::default()
        };
        // every pooled connection to an in-memory database sees its own database
        if url.contains(":memory:") {
            config.max_connections = 1;
        }
        config
    }
}

pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    establish_connection_with_config(&DbConfig::for_url(database_url)).await
}

pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring ledger connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("ledger.max_connections", config.max_connections as f64);

    let pool = Database::connect(opt).await?;
    info!(
        max_connections = config.max_connections,
        "Ledger connection pool established"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_databases_use_a_single_connection() {
        assert_eq!(DbConfig::for_url("sqlite::memory:").max_connections, 1);
        assert_eq!(
            DbConfig::for_url("sqlite://labels.db?mode=rwc").max_connections,
            5
        );
    }
}
