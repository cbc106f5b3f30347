//! Repository engine, transaction wrapper and error taxonomy.
//!
//! # Responsibility
//! - Offer generic CRUD and convention queries over declared entities.
//! - Give every write all-or-nothing semantics.
//!
//! # Invariants
//! - Repository APIs surface every failure; the only local recovery is
//!   rollback-then-return inside the transaction executor.

pub mod engine;
pub mod error;
pub mod transaction;
