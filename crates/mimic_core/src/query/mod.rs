//! Convention-driven query derivation.
//!
//! # Responsibility
//! - Turn method identifiers into ordered filter attributes.
//! - Build and bind select/count/delete descriptors for one entity.
//! - Keep per-repository named queries checked at registration time.
//!
//! # Invariants
//! - Predicates are conjunctions of equality conditions only.
//! - Argument binding order equals attribute declaration order.

pub mod builder;
pub mod convention;
pub mod registry;
