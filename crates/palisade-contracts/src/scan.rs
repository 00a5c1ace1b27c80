//! Scan result types: what a batch of bytecode *requests*.
//!
//! A `ScanResult` is a write-once accumulator built during a single scan
//! pass and discarded after verification. It owns nothing beyond in-memory
//! lists: the requested policy statements per class, plus records of the
//! classes and members *defined* in the batch, which the verifier uses to
//! recognize self-references.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::statement::PolicyStatement;
use crate::symbol::ClassId;

/// A method or field declared by a scanned class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredMember {
    pub name: String,
    pub descriptor: String,
}

/// Everything observed while scanning one class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassScan {
    /// The class defined by this buffer (from the class header, not the
    /// submitted name).
    pub class: ClassId,
    /// SHA-256 of the raw class bytes, lowercase hex. Lets reports and
    /// logs name a byte buffer immutably.
    pub digest: String,
    /// Every capability statement this class's bytecode requests, in
    /// observation order. May contain duplicates; the verifier
    /// de-duplicates at the check-line level.
    pub requests: Vec<PolicyStatement>,
    /// Dynamic-invocation sites whose target could not be resolved. Each
    /// entry is a report string no policy line can match: these are
    /// unconditional violations (fail closed).
    pub unresolved: Vec<String>,
    /// Methods and constructors declared by this class.
    pub declared_methods: Vec<DeclaredMember>,
    /// Fields declared by this class.
    pub declared_fields: Vec<DeclaredMember>,
}

/// The scanner's output for one batch of classes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    /// One entry per scanned class, in submission order.
    pub classes: Vec<ClassScan>,
}

impl ScanResult {
    /// The set of classes defined within this batch.
    pub fn defined_classes(&self) -> BTreeSet<&ClassId> {
        self.classes.iter().map(|c| &c.class).collect()
    }

    /// Total number of requested statements across the batch.
    pub fn request_count(&self) -> usize {
        self.classes.iter().map(|c| c.requests.len()).sum()
    }

    /// True when any scanned class contains an unresolved dynamic site.
    pub fn has_unresolved(&self) -> bool {
        self.classes.iter().any(|c| !c.unresolved.is_empty())
    }
}
