//! # ovenctl-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define the **transport port** adapters must implement
//!   ([`ports::Transport`]): discovery, command delivery, telemetry
//! - Map cook plans into wire commands ([`dispatcher`])
//! - Load and look up named recipes ([`recipes::RecipeLibrary`])
//! - Drive an appliance through a program ([`session::DeviceSession`]):
//!   discovery, binding, command serialization, retry, cancellation
//!
//! ## Dependency rule
//! Depends on `ovenctl-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the
//! reverse.

pub mod dispatcher;
pub mod ports;
pub mod recipes;
pub mod session;
