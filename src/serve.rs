//! Scoring service and the HTTP front end that exposes it.

pub mod http;
pub mod routes;
pub mod server;
mod service;

pub use server::{ScoringServer, ServerHandle, ServerOptions};
pub use service::{DegradeReason, InferenceService, NEUTRAL_PROBABILITY, Score};
