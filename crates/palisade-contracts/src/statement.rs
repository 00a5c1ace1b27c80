//! The policy statement model: a closed hierarchy of allowance statements.
//!
//! One statement grants a non-empty set of capability kinds to one target
//! symbol. Each scope (package, class, constructor, method, field,
//! property) admits only a subset of the vocabulary; constructing a
//! statement with an out-of-scope kind fails immediately — a defective
//! policy never reaches the verifier.
//!
//! Statements are immutable value objects. They are produced by the policy
//! parser (from canonical text) or by the bytecode scanner (from class
//! bytes), and the verifier only reads them.
//!
//! The canonical textual form is one line per `(target, kind)` pair:
//!
//! ```text
//! java.lang:sealed * ref_Class
//! java.lang java.lang.StringBuilder ref_Class_Instance
//! java.lang java.lang.StringBuilder.append(Ljava/lang/String;)Ljava/lang/StringBuilder; call_Class_Instance_Method
//! java.lang java.lang.StringBuilder.<init>:()Ljava/lang/StringBuilder; call_Class_Constructor
//! java.lang java.lang.System.out:Ljava/io/PrintStream; read_Class_Static_Field
//! ```
//!
//! Check lines (the lookup keys the verifier tests against the allow set)
//! use the identical formatting function, so string equality is a valid
//! substitute for structural equality.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::capability::{
    CapabilityKind, KindSet, ALL_KINDS, CLASS_REF_KINDS, FIELD_KINDS, METHOD_KINDS, PROPERTY_KINDS,
};
use crate::error::{PalisadeError, PalisadeResult};
use crate::symbol::ClassId;

/// The constructor member name in class-file binary form.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// One allow-list entry: a target symbol plus the capability kinds granted
/// on it. See the module docs for the textual form of each variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyStatement {
    /// Grants kinds to every class under a package. `sealed` declares the
    /// allow-list exhaustive for the package; it affects canonical
    /// rendering only, never matching.
    Package {
        package: String,
        sealed: bool,
        kinds: KindSet,
    },
    /// Grants reference kinds to one class.
    Class { class: ClassId, kinds: KindSet },
    /// Grants constructor invocation for one constructor overload. The
    /// descriptor carries the constructed class as its return type.
    Constructor {
        class: ClassId,
        descriptor: String,
        kinds: KindSet,
    },
    /// Grants method invocation for one method overload.
    Method {
        class: ClassId,
        name: String,
        descriptor: String,
        kinds: KindSet,
    },
    /// Grants field access for one field.
    Field {
        class: ClassId,
        name: String,
        descriptor: String,
        kinds: KindSet,
    },
    /// Grants property access for one property.
    Property {
        class: ClassId,
        name: String,
        descriptor: String,
        kinds: KindSet,
    },
}

/// Validate `kinds` against the scope's valid set, rejecting empty sets and
/// out-of-scope kinds at construction time.
fn checked(
    scope: &'static str,
    target: &str,
    kinds: KindSet,
    valid: &[CapabilityKind],
) -> PalisadeResult<KindSet> {
    if kinds.is_empty() {
        return Err(PalisadeError::EmptyKindSet {
            scope,
            target: target.to_string(),
        });
    }
    if let Some(bad) = kinds.iter().find(|k| !valid.contains(k)) {
        return Err(PalisadeError::KindOutOfScope {
            scope,
            kind: bad.name().to_string(),
            target: target.to_string(),
        });
    }
    Ok(kinds)
}

impl PolicyStatement {
    /// A package-level statement. Any kind is valid at package scope.
    pub fn package(package: impl Into<String>, sealed: bool, kinds: KindSet) -> PalisadeResult<Self> {
        let package = package.into();
        let kinds = checked("package", &package, kinds, ALL_KINDS)?;
        Ok(Self::Package { package, sealed, kinds })
    }

    /// A class-level statement. Only the three reference kinds are valid.
    pub fn class(class: ClassId, kinds: KindSet) -> PalisadeResult<Self> {
        let kinds = checked("class", &class.class, kinds, CLASS_REF_KINDS)?;
        Ok(Self::Class { class, kinds })
    }

    /// A constructor statement for one overload. Constructor scope admits
    /// exactly one kind, so this cannot carry an out-of-scope grant.
    pub fn constructor(class: ClassId, descriptor: impl Into<String>) -> PalisadeResult<Self> {
        Ok(Self::Constructor {
            class,
            descriptor: descriptor.into(),
            kinds: KindSet::single(CapabilityKind::CallClassConstructor),
        })
    }

    /// A method statement for one overload.
    pub fn method(
        class: ClassId,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        kinds: KindSet,
    ) -> PalisadeResult<Self> {
        let name = name.into();
        let target = format!("{}.{}", class.class, name);
        let kinds = checked("method", &target, kinds, METHOD_KINDS)?;
        Ok(Self::Method {
            class,
            name,
            descriptor: descriptor.into(),
            kinds,
        })
    }

    /// A field statement.
    pub fn field(
        class: ClassId,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        kinds: KindSet,
    ) -> PalisadeResult<Self> {
        let name = name.into();
        let target = format!("{}.{}", class.class, name);
        let kinds = checked("field", &target, kinds, FIELD_KINDS)?;
        Ok(Self::Field {
            class,
            name,
            descriptor: descriptor.into(),
            kinds,
        })
    }

    /// A property statement.
    pub fn property(
        class: ClassId,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        kinds: KindSet,
    ) -> PalisadeResult<Self> {
        let name = name.into();
        let target = format!("{}.{}", class.class, name);
        let kinds = checked("property", &target, kinds, PROPERTY_KINDS)?;
        Ok(Self::Property {
            class,
            name,
            descriptor: descriptor.into(),
            kinds,
        })
    }

    /// The dotted package path of this statement's target.
    pub fn target_package(&self) -> &str {
        match self {
            Self::Package { package, .. } => package,
            Self::Class { class, .. }
            | Self::Constructor { class, .. }
            | Self::Method { class, .. }
            | Self::Field { class, .. }
            | Self::Property { class, .. } => &class.package,
        }
    }

    /// The class this statement targets, if it is not package-scoped.
    pub fn target_class(&self) -> Option<&ClassId> {
        match self {
            Self::Package { .. } => None,
            Self::Class { class, .. }
            | Self::Constructor { class, .. }
            | Self::Method { class, .. }
            | Self::Field { class, .. }
            | Self::Property { class, .. } => Some(class),
        }
    }

    /// The kinds granted (or requested) by this statement. Never empty.
    pub fn kinds(&self) -> &KindSet {
        match self {
            Self::Package { kinds, .. }
            | Self::Class { kinds, .. }
            | Self::Constructor { kinds, .. }
            | Self::Method { kinds, .. }
            | Self::Field { kinds, .. }
            | Self::Property { kinds, .. } => kinds,
        }
    }

    /// The rendered target, everything on a canonical line before the kind.
    pub fn target_prefix(&self) -> String {
        match self {
            Self::Package { package, sealed, .. } => {
                if *sealed {
                    format!("{}:sealed *", package)
                } else {
                    format!("{} *", package)
                }
            }
            Self::Class { class, .. } => format!("{} {}", class.package, class.class),
            Self::Constructor { class, descriptor, .. } => format!(
                "{} {}.{}:{}",
                class.package, class.class, CONSTRUCTOR_NAME, descriptor
            ),
            Self::Method { class, name, descriptor, .. } => {
                format!("{} {}.{}{}", class.package, class.class, name, descriptor)
            }
            Self::Field { class, name, descriptor, .. }
            | Self::Property { class, name, descriptor, .. } => {
                format!("{} {}.{}:{}", class.package, class.class, name, descriptor)
            }
        }
    }

    /// The check line for one kind: the canonical line the verifier looks
    /// up in the allow set, and the unit a violation report is made of.
    pub fn check_line(&self, kind: CapabilityKind) -> String {
        format!("{} {}", self.target_prefix(), kind.name())
    }

    /// All check lines for this statement, one per granted kind.
    pub fn check_lines(&self) -> Vec<String> {
        self.kinds().iter().map(|k| self.check_line(k)).collect()
    }
}

/// Render a statement set to canonical policy text.
///
/// One line per `(target, kind)`, lexicographically sorted and
/// de-duplicated so rendering is deterministic and diffs are stable. The
/// default class-reference capabilities implied by member grants (see
/// [`KindSet::with_implied_refs`]) are synthesized as class-level lines —
/// they are derived during rendering, never stored in the statements.
pub fn canonical_lines(statements: &[PolicyStatement]) -> Vec<String> {
    let mut lines: BTreeSet<String> = BTreeSet::new();
    // Kinds granted per class across all statements, for ref synthesis.
    let mut per_class: BTreeMap<ClassId, KindSet> = BTreeMap::new();

    for statement in statements {
        for line in statement.check_lines() {
            lines.insert(line);
        }
        if let Some(class) = statement.target_class() {
            per_class
                .entry(class.clone())
                .or_default()
                .extend_from(statement.kinds());
        }
    }

    for (class, kinds) in per_class {
        let implied = kinds.with_implied_refs();
        let refs: KindSet = implied
            .iter()
            .filter(|k| CLASS_REF_KINDS.contains(k))
            .collect();
        if refs.is_empty() {
            continue;
        }
        // Statement construction cannot fail here: the kinds are drawn from
        // the class-scope valid set.
        if let Ok(stmt) = PolicyStatement::class(class, refs) {
            for line in stmt.check_lines() {
                lines.insert(line);
            }
        }
    }

    lines.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityKind::*;

    fn string_builder() -> ClassId {
        ClassId::from_binary_name("java/lang/StringBuilder")
    }

    // ── Scope validity ───────────────────────────────────────────────────────

    /// Constructing a field statement with a constructor-call kind fails at
    /// construction; with a field kind it succeeds.
    #[test]
    fn field_statement_rejects_constructor_kind() {
        let err = PolicyStatement::field(
            string_builder(),
            "count",
            "I",
            KindSet::single(CallClassConstructor),
        )
        .unwrap_err();
        assert!(matches!(err, PalisadeError::KindOutOfScope { scope: "field", .. }));

        PolicyStatement::field(
            string_builder(),
            "count",
            "I",
            KindSet::single(ReadClassInstanceField),
        )
        .unwrap();
    }

    #[test]
    fn class_statement_rejects_member_kinds() {
        let err = PolicyStatement::class(
            string_builder(),
            KindSet::single(CallClassInstanceMethod),
        )
        .unwrap_err();
        assert!(matches!(err, PalisadeError::KindOutOfScope { scope: "class", .. }));
    }

    #[test]
    fn empty_kind_set_is_rejected() {
        let err = PolicyStatement::class(string_builder(), KindSet::new()).unwrap_err();
        assert!(matches!(err, PalisadeError::EmptyKindSet { .. }));
    }

    #[test]
    fn package_statement_admits_any_kind() {
        PolicyStatement::package(
            "java.lang",
            false,
            KindSet::from_kinds([RefClass, CallClassInstanceMethod, WriteClassStaticField]),
        )
        .unwrap();
    }

    // ── Check-line rendering ─────────────────────────────────────────────────

    /// The exact persisted line forms, one per target shape.
    #[test]
    fn check_lines_match_the_canonical_format() {
        let call = PolicyStatement::method(
            string_builder(),
            "append",
            "(Ljava/lang/String;)Ljava/lang/StringBuilder;",
            KindSet::single(CallClassInstanceMethod),
        )
        .unwrap();
        assert_eq!(
            call.check_lines(),
            vec![
                "java.lang java.lang.StringBuilder.append(Ljava/lang/String;)Ljava/lang/StringBuilder; call_Class_Instance_Method"
            ]
        );

        let ctor = PolicyStatement::constructor(
            string_builder(),
            "()Ljava/lang/StringBuilder;",
        )
        .unwrap();
        assert_eq!(
            ctor.check_lines(),
            vec![
                "java.lang java.lang.StringBuilder.<init>:()Ljava/lang/StringBuilder; call_Class_Constructor"
            ]
        );

        let reference =
            PolicyStatement::class(string_builder(), KindSet::single(RefClassInstance)).unwrap();
        assert_eq!(
            reference.check_lines(),
            vec!["java.lang java.lang.StringBuilder ref_Class_Instance"]
        );
    }

    #[test]
    fn sealed_flag_renders_in_the_package_target() {
        let sealed =
            PolicyStatement::package("java.lang", true, KindSet::single(RefClass)).unwrap();
        assert_eq!(sealed.check_lines(), vec!["java.lang:sealed * ref_Class"]);

        let open = PolicyStatement::package("java.lang", false, KindSet::single(RefClass)).unwrap();
        assert_eq!(open.check_lines(), vec!["java.lang * ref_Class"]);
    }

    #[test]
    fn field_check_line_uses_colon_descriptor_form() {
        let out = ClassId::from_binary_name("java/lang/System");
        let stmt = PolicyStatement::field(
            out,
            "out",
            "Ljava/io/PrintStream;",
            KindSet::single(ReadClassStaticField),
        )
        .unwrap();
        assert_eq!(
            stmt.check_lines(),
            vec!["java.lang java.lang.System.out:Ljava/io/PrintStream; read_Class_Static_Field"]
        );
    }

    // ── Canonical set rendering ──────────────────────────────────────────────

    /// Member grants synthesize the implied class-reference lines; the
    /// output is sorted and de-duplicated.
    #[test]
    fn canonical_lines_synthesize_default_refs() {
        let stmts = vec![PolicyStatement::method(
            string_builder(),
            "append",
            "(Ljava/lang/String;)Ljava/lang/StringBuilder;",
            KindSet::single(CallClassInstanceMethod),
        )
        .unwrap()];

        let lines = canonical_lines(&stmts);
        assert_eq!(
            lines,
            vec![
                "java.lang java.lang.StringBuilder ref_Class".to_string(),
                "java.lang java.lang.StringBuilder ref_Class_Instance".to_string(),
                "java.lang java.lang.StringBuilder.append(Ljava/lang/String;)Ljava/lang/StringBuilder; call_Class_Instance_Method".to_string(),
            ]
        );
    }

    #[test]
    fn canonical_lines_are_stable_under_input_order() {
        let a = PolicyStatement::class(string_builder(), KindSet::single(RefClass)).unwrap();
        let b = PolicyStatement::package("java.util", false, KindSet::single(RefClass)).unwrap();

        let forward = canonical_lines(&[a.clone(), b.clone()]);
        let backward = canonical_lines(&[b, a]);
        assert_eq!(forward, backward);
    }
}
