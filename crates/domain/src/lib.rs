//! Domain layer for the dispatch core.
//!
//! This crate contains:
//! - Pure domain models (Driver, Ride, Trip, Payment, OutboxEvent) and their
//!   request/response DTOs
//! - The ride/driver/trip state machine and fare calculation
//! - Service-trait seams (`NotificationService`, `EventBus`) that `crates/api`
//!   wires to concrete implementations
//!
//! Nothing here touches `sqlx` or `axum` — nothing here does I/O at all.

pub mod fare;
pub mod models;
pub mod services;
pub mod state_machine;
