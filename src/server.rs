use std::{convert::Infallible, net::SocketAddr};

use sqlx::{migrate::Migrator, Pool, Postgres};
use warp::{Filter, Reply};

use crate::{
    error::QueryError,
    routes::{attributes, health, recipes, rejection::handle_rejection, users},
    schema::AttributeKind,
    state::State,
};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), QueryError> {
    log::info!("Running migrations...");
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| QueryError::from(sqlx::Error::from(e)))?;
    log::info!("Migrations up to date");
    Ok(())
}

/// Every endpoint, with rejections rendered as JSON errors.
pub fn routes(state: State) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let media = warp::path("media").and(warp::fs::dir(state.config.media_root.clone()));

    health::routes()
        .or(users::routes(state.clone()))
        .unify()
        .or(recipes::routes(state.clone()))
        .unify()
        .or(attributes::routes(AttributeKind::Tag, state.clone()))
        .unify()
        .or(attributes::routes(AttributeKind::Ingredient, state))
        .unify()
        .or(media.map(Reply::into_response))
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::log("recipe_api"))
}

#[derive(Debug)]
pub struct ServerError {
    info: String,
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.info)
    }
}

impl std::error::Error for ServerError {}

/// Serves until ctrl-c or SIGTERM.
pub async fn serve(state: State) -> Result<(), ServerError> {
    let address: SocketAddr = state.config.bind_address.parse().map_err(|e| ServerError {
        info: format!("Invalid BIND_ADDRESS {}: {e}", state.config.bind_address),
    })?;

    let (address, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(address, shutdown_signal())
        .map_err(|e| ServerError {
            info: format!("Failed to bind {address}: {e}"),
        })?;

    log::info!("Server running on {address}");
    server.await;
    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                log::error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use warp::http::header::WWW_AUTHENTICATE;

    /// A state whose pool never connects; fine for routes that fail before
    /// touching the database.
    fn offline_state() -> State {
        let config = Config::from_lookup(|key| match key {
            "SECRET_KEY" => Some("test-secret".to_string()),
            _ => None,
        })
        .unwrap();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://postgres@127.0.0.1:1/none")
            .unwrap();

        State::new(pool, config)
    }

    #[tokio::test]
    async fn health_check_is_public() {
        let response = warp::test::request()
            .path("/health-check/")
            .reply(&routes(offline_state()))
            .await;

        assert_eq!(response.status(), 200);
        assert_eq!(
            serde_json::from_slice::<Value>(response.body()).unwrap(),
            json!({ "healthy": true })
        );
    }

    #[tokio::test]
    async fn trailing_slash_is_optional() {
        let response = warp::test::request()
            .path("/health-check")
            .reply(&routes(offline_state()))
            .await;

        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn recipes_require_credentials() {
        let response = warp::test::request()
            .path("/recipes/")
            .reply(&routes(offline_state()))
            .await;

        assert_eq!(response.status(), 401);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Token");
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(
            body["detail"],
            "Authentication credentials were not provided."
        );
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let response = warp::test::request()
            .path("/tags/")
            .header("authorization", "Token not-a-jwt")
            .reply(&routes(offline_state()))
            .await;

        assert_eq!(response.status(), 401);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["detail"], "Invalid token.");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = warp::test::request()
            .path("/nothing-here/")
            .reply(&routes(offline_state()))
            .await;

        assert_eq!(response.status(), 404);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["detail"], "Not found.");
    }

    #[tokio::test]
    async fn wrong_method_is_405() {
        let response = warp::test::request()
            .method("DELETE")
            .path("/health-check/")
            .reply(&routes(offline_state()))
            .await;

        assert_eq!(response.status(), 405);
    }

    #[tokio::test]
    async fn registration_is_validated_before_the_database() {
        let response = warp::test::request()
            .method("POST")
            .path("/user/create/")
            .json(&json!({ "email": "not-an-email", "password": "pw" }))
            .reply(&routes(offline_state()))
            .await;

        assert_eq!(response.status(), 400);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert!(body.get("email").is_some());
        assert!(body.get("password").is_some());
        assert!(body.get("name").is_some());
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let response = warp::test::request()
            .method("POST")
            .path("/user/token/")
            .header("content-type", "application/json")
            .body("{not json")
            .reply(&routes(offline_state()))
            .await;

        assert_eq!(response.status(), 400);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert!(body["detail"].as_str().unwrap().starts_with("JSON parse error"));
    }
}
