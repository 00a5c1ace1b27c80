//! The verifier's input unit: named class bytes.

use serde::{Deserialize, Serialize};

/// One compiled class as submitted for verification: the fully-qualified
/// dotted class name the producer claims, plus the raw class-file bytes.
///
/// The pair is opaque to the verifier until scanned and is never mutated;
/// accepted classes are returned with their bytes unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedClassBytes {
    /// Fully-qualified dotted class name, e.g. `com.example.Outer$Helper`.
    pub name: String,
    /// Raw class-file container bytes.
    pub bytes: Vec<u8>,
}

impl NamedClassBytes {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}
