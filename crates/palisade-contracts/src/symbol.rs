//! Symbol identities: the targets policy statements are scoped to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The identity of one class: its dotted package path and its
/// fully-qualified dotted class name.
///
/// Inner classes keep the `$` separator of their binary name, so
/// `java/util/Map$Entry` becomes package `java.util`, class
/// `java.util.Map$Entry`. Classes in the unnamed package carry an empty
/// package path; the textual policy format cannot grant to them, so their
/// capabilities are only ever satisfied by batch definition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassId {
    /// Dotted package path, e.g. `java.lang`. Empty for the unnamed package.
    pub package: String,
    /// Fully-qualified dotted class name, e.g. `java.lang.StringBuilder`.
    pub class: String,
}

impl ClassId {
    /// Build a `ClassId` from a JVM binary name, e.g. `java/lang/String`.
    pub fn from_binary_name(binary: &str) -> Self {
        let dotted = binary.replace('/', ".");
        Self::from_dotted(&dotted)
    }

    /// Build a `ClassId` from a fully-qualified dotted name.
    pub fn from_dotted(dotted: &str) -> Self {
        let package = match dotted.rfind('.') {
            Some(idx) => dotted[..idx].to_string(),
            None => String::new(),
        };
        Self {
            package,
            class: dotted.to_string(),
        }
    }

    /// The class's own simple name (after the last package separator).
    pub fn simple_name(&self) -> &str {
        match self.class.rfind('.') {
            Some(idx) => &self.class[idx + 1..],
            None => &self.class,
        }
    }

    /// The binary-name form, e.g. `java/lang/String`.
    pub fn binary_name(&self) -> String {
        self.class.replace('.', "/")
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.class)
    }
}
