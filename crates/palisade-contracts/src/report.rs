//! Verification outcome types.
//!
//! Violations are returned as data, not errors: denying adversarial input
//! is the expected, high-volume outcome and must be cheap and
//! side-effect-free to produce. An outcome with a non-empty violation set
//! MUST NOT be used to execute or ship the associated bytecode.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::batch::NamedClassBytes;
use crate::scan::ScanResult;

/// Unique identifier for a single verification call.
///
/// Appears in every log line the verifier emits, so a violation report can
/// be correlated with its traces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationId(pub uuid::Uuid);

impl VerificationId {
    /// Create a new, unique verification ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for VerificationId {
    fn default() -> Self {
        Self::new()
    }
}

/// The result of verifying a batch of classes against a policy set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// Identifier correlating this outcome with its log traces.
    pub id: VerificationId,
    /// Classes safe to ship or execute: the trusted self classes plus every
    /// scanned class with no violation attributed to it. Bytes unchanged.
    pub accepted: Vec<NamedClassBytes>,
    /// Names of submitted classes that were not accepted.
    pub rejected: Vec<String>,
    /// Requested capabilities not covered by any applicable policy, as
    /// canonical check lines. De-duplicated and ordered; each line is
    /// directly actionable ("add this line to the policy to permit this").
    pub violations: BTreeSet<String>,
    /// The underlying scan result for the classes that were scanned.
    pub scan: ScanResult,
    /// When this verification call completed.
    pub completed_at: DateTime<Utc>,
}

impl VerificationOutcome {
    /// True only when no violations were found. Anything else is a failed
    /// verification: the batch must be denied as a whole unless the caller
    /// explicitly asked for the accepted/rejected partition.
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// The result of the lighter, name-only verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameVerificationOutcome {
    /// Names whose instance-reference capability is covered.
    pub allowed: Vec<String>,
    /// Check lines for the names that are not covered.
    pub violations: BTreeSet<String>,
}

impl NameVerificationOutcome {
    /// True only when every submitted name was covered.
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}
