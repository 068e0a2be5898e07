use serde::Serialize;
use warp::{filters::BoxedFilter, reply::Response, Filter, Reply};

#[derive(Debug, Serialize)]
struct Health {
    healthy: bool,
}

/// Liveness probe. Answers without touching the database.
pub fn routes() -> BoxedFilter<(Response,)> {
    warp::path!("health-check")
        .and(warp::get())
        .map(|| warp::reply::json(&Health { healthy: true }).into_response())
        .boxed()
}
