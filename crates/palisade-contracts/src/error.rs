//! Error types for the PALISADE verification pipeline.
//!
//! Only hard failures are errors: a byte buffer that is not a well-formed
//! class-file container, a policy statement built with a kind outside its
//! scope, or an unparseable policy line. Capability violations — the
//! dominant outcome of adversarial input — are returned as data in the
//! verification outcome, never as an `Err`.

use thiserror::Error;

/// The unified error type for the PALISADE crates.
#[derive(Debug, Error)]
pub enum PalisadeError {
    /// The byte buffer is not a well-formed class-file container.
    ///
    /// Fatal: a malformed input cannot be partially trusted, so this aborts
    /// the whole verification call.
    #[error("malformed class file '{class}': {reason}")]
    MalformedClass { class: String, reason: String },

    /// A policy statement was built with a capability kind its scope does
    /// not admit (e.g. `call_Class_Constructor` on a field statement).
    ///
    /// This is a defect in the policy source, raised at construction time;
    /// it never reaches the verifier.
    #[error("capability kind '{kind}' is not valid for a {scope} policy statement on '{target}'")]
    KindOutOfScope {
        scope: &'static str,
        kind: String,
        target: String,
    },

    /// A policy statement was built with no capability kinds at all.
    #[error("{scope} policy statement on '{target}' has an empty capability set")]
    EmptyKindSet {
        scope: &'static str,
        target: String,
    },

    /// A line of canonical policy text could not be parsed.
    #[error("cannot parse policy line '{line}': {reason}")]
    PolicyParse { line: String, reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Convenience alias used throughout the PALISADE crates.
pub type PalisadeResult<T> = Result<T, PalisadeError>;
