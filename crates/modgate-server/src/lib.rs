//! Modgate gateway server
//!
//! Wires the moderation pipeline behind an HTTP API: a chat endpoint with a
//! mock response generator, rule administration, audit listing, and the
//! Prometheus scrape endpoint.

pub mod config;
pub mod generator;
pub mod routes;
pub mod seed;

pub use config::{GeneratorConfig, ServerConfig};
pub use generator::{GeneratorMode, MockGenerator};
pub use routes::{create_router, AppState};
