//! HTTP and WebSocket handlers

pub mod health;
pub mod dataset;
pub mod model;
pub mod simulation;
