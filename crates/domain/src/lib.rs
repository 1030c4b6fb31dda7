//! # ovenctl-domain
//!
//! Pure domain model for driving a networked cooking appliance.
//!
//! ## Responsibilities
//! - Unit-safe [`temperature::Temperature`] with a fixed safe envelope
//! - Single cook stages ([`stage::StageSpec`]) and their structural invariants
//! - Ordered multi-stage programs ([`plan::CookPlan`]) with
//!   hardware-revision-dependent compatibility validation
//! - Appliance identity and lifecycle state ([`device::Device`])
//! - The error taxonomy every layer above reports through ([`error`])
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod device;
pub mod error;
pub mod plan;
pub mod stage;
pub mod temperature;
