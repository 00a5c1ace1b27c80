//! # palisade-verify
//!
//! The verification engine of the PALISADE sandbox: given a batch of named
//! class bytes and an allow-list policy, it scans the bytecode for every
//! requested capability and returns the accepted classes together with an
//! itemized, de-duplicated violation set. Deny execution on any non-empty
//! violation set.

pub mod engine;

pub use engine::SandboxVerifier;
