mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod pagination;
    pub mod readiness;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod routes {
    pub mod attributes;
    pub mod filters;
    pub mod health;
    pub mod recipes;
    pub mod rejection;
    pub mod users;
}

pub mod config;
pub mod constants;
pub mod error;
pub mod media;
pub mod server;
pub mod state;

pub use authentication::*;
pub use database::*;
