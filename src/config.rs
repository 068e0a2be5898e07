use std::{
    env,
    fmt::{self, Display},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use rand::{distributions::Alphanumeric, Rng};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub secret_key: String,
    pub token_lifetime_hours: i64,
    pub media_root: PathBuf,
    pub max_upload_bytes: u64,
    pub db_max_connections: u32,
    pub db_wait_attempts: u32,
    pub db_wait_interval: Duration,
}

#[derive(Debug)]
pub struct ConfigError {
    key: String,
    info: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {} value: {}", self.key, self.info)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source; `load` uses the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = match lookup("SECRET_KEY").filter(|key| !key.is_empty()) {
            Some(key) => key,
            None => {
                log::warn!("SECRET_KEY not set, issued tokens will not survive a restart");
                random_secret()
            }
        };

        Ok(Self {
            database_url: try_load(&lookup, "DATABASE_URL", "postgres://postgres@localhost/recipes")?,
            bind_address: try_load(&lookup, "BIND_ADDRESS", "0.0.0.0:8000")?,
            secret_key,
            token_lifetime_hours: try_load(&lookup, "TOKEN_LIFETIME_HOURS", "24")?,
            media_root: try_load(&lookup, "MEDIA_ROOT", "/vol/web/media")?,
            max_upload_bytes: try_load(&lookup, "MAX_UPLOAD_BYTES", "5242880")?,
            db_max_connections: try_load(&lookup, "DB_MAX_CONNECTIONS", "10")?,
            db_wait_attempts: try_load(&lookup, "DB_WAIT_ATTEMPTS", "0")?,
            db_wait_interval: Duration::from_secs(try_load(&lookup, "DB_WAIT_INTERVAL_SECS", "1")?),
        })
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        log::debug!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.trim().parse().map_err(|e: T::Err| ConfigError {
        key: key.to_string(),
        info: e.to_string(),
    })
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:8000");
        assert_eq!(config.token_lifetime_hours, 24);
        assert_eq!(config.db_wait_attempts, 0);
        assert_eq!(config.db_wait_interval, Duration::from_secs(1));
        assert_eq!(config.secret_key.len(), 64);
    }

    #[test]
    fn values_are_read_from_lookup() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://app@db/app"),
            ("SECRET_KEY", "changeme"),
            ("MEDIA_ROOT", "/tmp/media"),
            ("MAX_UPLOAD_BYTES", "1024"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "postgres://app@db/app");
        assert_eq!(config.secret_key, "changeme");
        assert_eq!(config.media_root, PathBuf::from("/tmp/media"));
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn invalid_number_names_the_variable() {
        let error = Config::from_lookup(lookup(&[("TOKEN_LIFETIME_HOURS", "soon")])).unwrap_err();
        assert!(error.to_string().starts_with("Invalid TOKEN_LIFETIME_HOURS value"));
    }
}
