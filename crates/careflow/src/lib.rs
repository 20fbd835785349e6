//! Authorization and moderation engine for the careflow marketplace.
//!
//! Every protected operation flows through the [`access`] gate before a
//! [`workflows`] state machine validates the transition and records it in
//! the [`audit`] trail.

pub mod access;
pub mod audit;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
