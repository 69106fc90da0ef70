pub mod auth;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod password;
pub mod posts;
pub mod routes;
pub mod session;
pub mod token;
pub mod webhooks;
