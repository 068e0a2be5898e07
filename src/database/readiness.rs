use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::error::QueryError;

#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// Zero means retry forever.
    pub attempts: u32,
    pub interval: Duration,
    pub connect_timeout: Duration,
    pub max_connections: u32,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            attempts: 0,
            interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(5),
            max_connections: 10,
        }
    }
}

/// Errors that mean the server is not up yet, as opposed to a broken setup.
fn is_unavailable(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::Database(_)
    )
}

/// Connects to the database, retrying while it is unavailable.
pub async fn wait_for_db(url: &str, options: WaitOptions) -> Result<Pool<Postgres>, QueryError> {
    log::info!("Waiting for database...");
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let result = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.connect_timeout)
            .connect(url)
            .await;

        match result {
            Ok(pool) => {
                log::info!("Database available!");
                return Ok(pool);
            }
            Err(e) if is_unavailable(&e) => {
                if options.attempts != 0 && attempt >= options.attempts {
                    log::error!("Database still unavailable after {attempt} attempts");
                    return Err(QueryError::from(e));
                }

                log::warn!(
                    "Database unavailable ({e}), waiting {}s...",
                    options.interval.as_secs_f32()
                );
                tokio::time::sleep(options.interval).await;
            }
            Err(e) => return Err(QueryError::from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_url_fails_without_retrying() {
        let options = WaitOptions {
            attempts: 0,
            ..WaitOptions::default()
        };

        let error = wait_for_db("definitely not a url", options).await.unwrap_err();
        assert!(!error.info().is_empty());
    }

    #[tokio::test]
    async fn gives_up_after_configured_attempts() {
        let options = WaitOptions {
            attempts: 2,
            interval: Duration::from_millis(10),
            connect_timeout: Duration::from_millis(200),
            max_connections: 1,
        };

        let result = wait_for_db("postgres://postgres@127.0.0.1:1/none", options).await;
        assert!(result.is_err());
    }
}
