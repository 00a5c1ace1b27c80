//! # palisade-contracts
//!
//! Shared types for the PALISADE sandbox verifier.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only the capability vocabulary, the policy statement model,
//! symbol identities, scan/verification result types, and error types.

pub mod batch;
pub mod capability;
pub mod error;
pub mod report;
pub mod scan;
pub mod statement;
pub mod symbol;
