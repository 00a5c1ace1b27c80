//! The capability vocabulary: every discrete way bytecode can touch a symbol.
//!
//! A `CapabilityKind` is the currency shared by both sides of the sandbox:
//! policies grant kinds, scanned bytecode requests kinds, and the verifier
//! compares the two. The enumeration is fixed — no kind is ever added or
//! removed at runtime — and every kind has exactly one canonical name used
//! in policy text, check lines, and violation reports.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One discrete runtime capability.
///
/// The canonical names (see [`CapabilityKind::name`]) are the persisted and
/// transmissible form; they appear verbatim in policy files and violation
/// strings and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CapabilityKind {
    /// Reference a type at all (the base reference capability).
    #[serde(rename = "ref_Class")]
    RefClass,
    /// Reference the static side of a type (static members, class init).
    #[serde(rename = "ref_Class_Static")]
    RefClassStatic,
    /// Reference the instance side of a type (instantiation, casts, checks).
    #[serde(rename = "ref_Class_Instance")]
    RefClassInstance,
    /// Read a static field.
    #[serde(rename = "read_Class_Static_Field")]
    ReadClassStaticField,
    /// Write a static field.
    #[serde(rename = "write_Class_Static_Field")]
    WriteClassStaticField,
    /// Read an instance field.
    #[serde(rename = "read_Class_Instance_Field")]
    ReadClassInstanceField,
    /// Write an instance field.
    #[serde(rename = "write_Class_Instance_Field")]
    WriteClassInstanceField,
    /// Invoke a constructor.
    #[serde(rename = "call_Class_Constructor")]
    CallClassConstructor,
    /// Invoke a static method.
    #[serde(rename = "call_Class_Static_Method")]
    CallClassStaticMethod,
    /// Invoke an instance method.
    #[serde(rename = "call_Class_Instance_Method")]
    CallClassInstanceMethod,
    /// Read a static property.
    #[serde(rename = "read_Class_Static_Property")]
    ReadClassStaticProperty,
    /// Write a static property.
    #[serde(rename = "write_Class_Static_Property")]
    WriteClassStaticProperty,
    /// Read an instance property.
    #[serde(rename = "read_Class_Instance_Property")]
    ReadClassInstanceProperty,
    /// Write an instance property.
    #[serde(rename = "write_Class_Instance_Property")]
    WriteClassInstanceProperty,
}

use CapabilityKind::*;

/// Every kind, in declaration order.
pub const ALL_KINDS: &[CapabilityKind] = &[
    RefClass,
    RefClassStatic,
    RefClassInstance,
    ReadClassStaticField,
    WriteClassStaticField,
    ReadClassInstanceField,
    WriteClassInstanceField,
    CallClassConstructor,
    CallClassStaticMethod,
    CallClassInstanceMethod,
    ReadClassStaticProperty,
    WriteClassStaticProperty,
    ReadClassInstanceProperty,
    WriteClassInstanceProperty,
];

/// The class-level reference kinds ("all class-level access kinds").
pub const CLASS_REF_KINDS: &[CapabilityKind] = &[RefClass, RefClassStatic, RefClassInstance];

/// All field access kinds.
pub const FIELD_KINDS: &[CapabilityKind] = &[
    ReadClassStaticField,
    WriteClassStaticField,
    ReadClassInstanceField,
    WriteClassInstanceField,
];

/// All method invocation kinds (constructors are a separate scope).
pub const METHOD_KINDS: &[CapabilityKind] = &[CallClassStaticMethod, CallClassInstanceMethod];

/// All property access kinds.
pub const PROPERTY_KINDS: &[CapabilityKind] = &[
    ReadClassStaticProperty,
    WriteClassStaticProperty,
    ReadClassInstanceProperty,
    WriteClassInstanceProperty,
];

/// Kinds that touch the static side of a class.
pub const STATIC_SCOPED_KINDS: &[CapabilityKind] = &[
    RefClassStatic,
    ReadClassStaticField,
    WriteClassStaticField,
    CallClassStaticMethod,
    ReadClassStaticProperty,
    WriteClassStaticProperty,
];

/// Kinds that touch the instance side of a class. Constructing an instance
/// counts: `call_Class_Constructor` is instance-scoped.
pub const INSTANCE_SCOPED_KINDS: &[CapabilityKind] = &[
    RefClassInstance,
    ReadClassInstanceField,
    WriteClassInstanceField,
    CallClassConstructor,
    CallClassInstanceMethod,
    ReadClassInstanceProperty,
    WriteClassInstanceProperty,
];

impl CapabilityKind {
    /// The canonical name used in policy text, check lines, and violations.
    pub fn name(self) -> &'static str {
        match self {
            RefClass => "ref_Class",
            RefClassStatic => "ref_Class_Static",
            RefClassInstance => "ref_Class_Instance",
            ReadClassStaticField => "read_Class_Static_Field",
            WriteClassStaticField => "write_Class_Static_Field",
            ReadClassInstanceField => "read_Class_Instance_Field",
            WriteClassInstanceField => "write_Class_Instance_Field",
            CallClassConstructor => "call_Class_Constructor",
            CallClassStaticMethod => "call_Class_Static_Method",
            CallClassInstanceMethod => "call_Class_Instance_Method",
            ReadClassStaticProperty => "read_Class_Static_Property",
            WriteClassStaticProperty => "write_Class_Static_Property",
            ReadClassInstanceProperty => "read_Class_Instance_Property",
            WriteClassInstanceProperty => "write_Class_Instance_Property",
        }
    }

    /// True when this kind touches the static side of its target.
    pub fn is_static_scoped(self) -> bool {
        STATIC_SCOPED_KINDS.contains(&self)
    }

    /// True when this kind touches the instance side of its target.
    pub fn is_instance_scoped(self) -> bool {
        INSTANCE_SCOPED_KINDS.contains(&self)
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CapabilityKind {
    type Err = UnknownKind;

    /// Parse a canonical kind name. Any string outside the fixed vocabulary
    /// is rejected — unknown kinds must never be treated as granted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_KINDS
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Returned when a string is not a canonical capability kind name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown capability kind '{}'", self.0)
    }
}

/// An ordered, de-duplicated set of capability kinds.
///
/// Ordering is the enum declaration order, which keeps iteration and
/// rendering deterministic across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSet {
    inner: BTreeSet<CapabilityKind>,
}

impl KindSet {
    /// The empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from any iterator of kinds.
    pub fn from_kinds(kinds: impl IntoIterator<Item = CapabilityKind>) -> Self {
        Self {
            inner: kinds.into_iter().collect(),
        }
    }

    /// A set containing exactly one kind.
    pub fn single(kind: CapabilityKind) -> Self {
        Self::from_kinds([kind])
    }

    pub fn insert(&mut self, kind: CapabilityKind) {
        self.inner.insert(kind);
    }

    pub fn contains(&self, kind: CapabilityKind) -> bool {
        self.inner.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = CapabilityKind> + '_ {
        self.inner.iter().copied()
    }

    /// True when every kind in `self` appears in `allowed`.
    pub fn is_subset_of(&self, allowed: &[CapabilityKind]) -> bool {
        self.iter().all(|k| allowed.contains(&k))
    }

    /// Merge another set into this one.
    pub fn extend_from(&mut self, other: &KindSet) {
        self.inner.extend(other.iter());
    }

    /// Apply the default class-access inference rule.
    ///
    /// Policies do not have to spell out the reference grants implied by
    /// member grants, so both the renderer and the matcher derive them:
    ///
    /// - any static-scoped kind implies `ref_Class_Static`,
    /// - any instance-scoped kind implies `ref_Class_Instance`,
    /// - either reference kind (explicit or implied) implies `ref_Class`.
    ///
    /// Returns the input set unioned with the implied kinds. Applying the
    /// rule on only one side of the comparison makes matching spuriously
    /// fail, so every call site goes through this one function.
    pub fn with_implied_refs(&self) -> KindSet {
        let mut out = self.clone();
        if self.iter().any(|k| k.is_static_scoped()) {
            out.insert(RefClassStatic);
        }
        if self.iter().any(|k| k.is_instance_scoped()) {
            out.insert(RefClassInstance);
        }
        if out.contains(RefClassStatic) || out.contains(RefClassInstance) {
            out.insert(RefClass);
        }
        out
    }
}

impl FromIterator<CapabilityKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = CapabilityKind>>(iter: I) -> Self {
        Self::from_kinds(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every kind's canonical name must parse back to the same kind.
    #[test]
    fn kind_names_round_trip() {
        for kind in ALL_KINDS {
            let parsed: CapabilityKind = kind.name().parse().unwrap();
            assert_eq!(parsed, *kind);
        }
    }

    #[test]
    fn unknown_kind_name_is_rejected() {
        let err = "call_Dynamic".parse::<CapabilityKind>().unwrap_err();
        assert!(err.to_string().contains("call_Dynamic"));
    }

    #[test]
    fn static_and_instance_scopes_partition_member_kinds() {
        // Every non-base kind is either static- or instance-scoped, never both.
        for kind in ALL_KINDS.iter().filter(|k| **k != RefClass) {
            assert_ne!(
                kind.is_static_scoped(),
                kind.is_instance_scoped(),
                "{} must belong to exactly one scope",
                kind
            );
        }
        assert!(!RefClass.is_static_scoped());
        assert!(!RefClass.is_instance_scoped());
    }

    /// An instance-method grant implies the instance and base references.
    #[test]
    fn implied_refs_from_instance_kind() {
        let kinds = KindSet::single(CallClassInstanceMethod).with_implied_refs();
        assert!(kinds.contains(RefClassInstance));
        assert!(kinds.contains(RefClass));
        assert!(!kinds.contains(RefClassStatic));
    }

    /// A static-field grant implies the static and base references.
    #[test]
    fn implied_refs_from_static_kind() {
        let kinds = KindSet::single(WriteClassStaticField).with_implied_refs();
        assert!(kinds.contains(RefClassStatic));
        assert!(kinds.contains(RefClass));
        assert!(!kinds.contains(RefClassInstance));
    }

    /// An explicit reference kind alone still implies the base reference.
    #[test]
    fn explicit_ref_static_implies_base_ref() {
        let kinds = KindSet::single(RefClassStatic).with_implied_refs();
        assert!(kinds.contains(RefClass));
    }

    /// The bare base reference implies nothing further.
    #[test]
    fn base_ref_alone_is_fixed_point() {
        let kinds = KindSet::single(RefClass).with_implied_refs();
        assert_eq!(kinds.len(), 1);
    }

    #[test]
    fn kind_set_iterates_in_declaration_order() {
        let kinds = KindSet::from_kinds([WriteClassStaticField, RefClass, CallClassConstructor]);
        let order: Vec<CapabilityKind> = kinds.iter().collect();
        assert_eq!(order, vec![RefClass, WriteClassStaticField, CallClassConstructor]);
    }
}
