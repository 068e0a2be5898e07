use std::{convert::Infallible, sync::Arc};

use sqlx::{Pool, Postgres};
use warp::Filter;

use crate::config::Config;

/// Shared by every handler: the connection pool and the loaded configuration.
#[derive(Clone)]
pub struct State {
    pub pool: Pool<Postgres>,
    pub config: Arc<Config>,
}

impl State {
    pub fn new(pool: Pool<Postgres>, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    pub fn secret(&self) -> &[u8] {
        self.config.secret_key.as_bytes()
    }
}

pub fn with_state(state: State) -> impl Filter<Extract = (State,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}
