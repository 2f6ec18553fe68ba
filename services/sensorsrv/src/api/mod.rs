//! HTTP API for the sensor service
//!
//! Request/response models, handlers and the router with its auth layer.

pub mod handlers;
pub mod models;
pub mod routes;

pub use routes::create_router;
