//! `PolicySet`: the indexed allow-list the verifier queries.
//!
//! A set is built from canonical policy lines (or pre-built statements) and
//! answers one question: is this requested `(target, kind)` covered?
//! Coverage comes from either an exact member/class line or a package
//! wildcard line carrying the kind.
//!
//! The default class-access inference rule is applied while indexing, so a
//! policy that grants `call_Class_Instance_Method` on a class also covers
//! the `ref_Class_Instance` and `ref_Class` requests the scanner derives
//! from the same bytecode — identical to the synthesis the renderer
//! performs. A policy set never mutates matching state during queries.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use palisade_contracts::capability::{CapabilityKind, KindSet, CLASS_REF_KINDS};
use palisade_contracts::error::PalisadeResult;
use palisade_contracts::statement::{canonical_lines, PolicyStatement};
use palisade_contracts::symbol::ClassId;

use crate::parse::parse_policy;

/// An immutable-once-built allow-list with O(1) coverage queries.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    /// Every statement the set was built from, for re-rendering and merge.
    statements: Vec<PolicyStatement>,
    /// Exact per-kind check lines, including synthesized class references.
    exact: HashSet<String>,
    /// Package wildcard grants, ref-synthesized: package path → kinds.
    packages: HashMap<String, KindSet>,
    /// Union of granted kinds per class, used to keep reference synthesis
    /// correct as statements accumulate.
    per_class: HashMap<ClassId, KindSet>,
}

impl PolicySet {
    /// The empty set: covers nothing (deny-by-default).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from canonical policy text.
    pub fn from_text(text: &str) -> PalisadeResult<Self> {
        let mut set = Self::new();
        for statement in parse_policy(text)? {
            set.add_statement(statement);
        }
        debug!(
            statements = set.statements.len(),
            packages = set.packages.len(),
            "policy set loaded"
        );
        Ok(set)
    }

    /// Build a set from individual canonical lines.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> PalisadeResult<Self> {
        let mut set = Self::new();
        for line in lines {
            set.add_line(line)?;
        }
        Ok(set)
    }

    /// Build a set from pre-constructed statements.
    pub fn from_statements(statements: impl IntoIterator<Item = PolicyStatement>) -> Self {
        let mut set = Self::new();
        for statement in statements {
            set.add_statement(statement);
        }
        set
    }

    /// Parse and add one canonical line.
    pub fn add_line(&mut self, line: &str) -> PalisadeResult<()> {
        let statement = crate::parse::parse_line(line)?;
        self.add_statement(statement);
        Ok(())
    }

    /// Add a statement, updating the coverage indexes.
    pub fn add_statement(&mut self, statement: PolicyStatement) {
        match &statement {
            PolicyStatement::Package { package, kinds, .. } => {
                // A package grant of member kinds also implies the
                // reference kinds package-wide.
                self.packages
                    .entry(package.clone())
                    .or_default()
                    .extend_from(&kinds.with_implied_refs());
            }
            _ => {
                for line in statement.check_lines() {
                    self.exact.insert(line);
                }
                if let Some(class) = statement.target_class() {
                    let union = self.per_class.entry(class.clone()).or_default();
                    union.extend_from(statement.kinds());
                    // Synthesize the implied class-reference lines for the
                    // accumulated kinds. The inference is monotonic, so
                    // re-deriving after each statement is sound.
                    let implied = union.with_implied_refs();
                    for kind in implied.iter().filter(|k| CLASS_REF_KINDS.contains(k)) {
                        self.exact
                            .insert(format!("{} {} {}", class.package, class.class, kind.name()));
                    }
                }
            }
        }
        self.statements.push(statement);
    }

    /// A new set covering everything in `self` plus everything in `extra`.
    /// Used for call-scoped additional policies.
    pub fn merged_with(&self, extra: &PolicySet) -> PolicySet {
        let mut merged = self.clone();
        for statement in &extra.statements {
            merged.add_statement(statement.clone());
        }
        merged
    }

    /// True when the given kind of the given requested statement is covered
    /// by an exact line or a package wildcard.
    pub fn covers(&self, requested: &PolicyStatement, kind: CapabilityKind) -> bool {
        if self.exact.contains(&requested.check_line(kind)) {
            return true;
        }
        self.packages
            .get(requested.target_package())
            .is_some_and(|kinds| kinds.contains(kind))
    }

    /// True when the base class-reference capability of `class` is covered —
    /// the test that makes a submitted class a trusted "self" class.
    pub fn covers_class_ref(&self, class: &ClassId) -> bool {
        let line = format!(
            "{} {} {}",
            class.package,
            class.class,
            CapabilityKind::RefClass.name()
        );
        if self.exact.contains(&line) {
            return true;
        }
        self.packages
            .get(class.package.as_str())
            .is_some_and(|kinds| kinds.contains(CapabilityKind::RefClass))
    }

    /// Re-render the whole set to canonical policy text (sorted,
    /// de-duplicated, with synthesized default references).
    pub fn canonical_lines(&self) -> Vec<String> {
        canonical_lines(&self.statements)
    }

    /// Number of statements the set was built from.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_contracts::capability::CapabilityKind::*;

    fn sb() -> ClassId {
        ClassId::from_binary_name("java/lang/StringBuilder")
    }

    fn method_request() -> PolicyStatement {
        PolicyStatement::method(
            sb(),
            "append",
            "(Ljava/lang/String;)Ljava/lang/StringBuilder;",
            KindSet::single(CallClassInstanceMethod),
        )
        .unwrap()
    }

    #[test]
    fn empty_set_covers_nothing() {
        let set = PolicySet::new();
        assert!(!set.covers(&method_request(), CallClassInstanceMethod));
        assert!(!set.covers_class_ref(&sb()));
    }

    #[test]
    fn exact_line_covers_the_matching_request() {
        let set = PolicySet::from_lines([
            "java.lang java.lang.StringBuilder.append(Ljava/lang/String;)Ljava/lang/StringBuilder; call_Class_Instance_Method",
        ])
        .unwrap();
        assert!(set.covers(&method_request(), CallClassInstanceMethod));
    }

    #[test]
    fn package_wildcard_covers_every_class_in_the_package() {
        let set = PolicySet::from_lines(["java.lang * call_Class_Instance_Method"]).unwrap();
        assert!(set.covers(&method_request(), CallClassInstanceMethod));

        // A different package is not covered.
        let other = PolicyStatement::method(
            ClassId::from_binary_name("java/util/ArrayList"),
            "size",
            "()I",
            KindSet::single(CallClassInstanceMethod),
        )
        .unwrap();
        assert!(!set.covers(&other, CallClassInstanceMethod));
    }

    /// A member grant implies the class references, on both the exact and
    /// the wildcard paths.
    #[test]
    fn member_grant_implies_class_references() {
        let set = PolicySet::from_lines([
            "java.lang java.lang.StringBuilder.append(Ljava/lang/String;)Ljava/lang/StringBuilder; call_Class_Instance_Method",
        ])
        .unwrap();

        let reference =
            PolicyStatement::class(sb(), KindSet::single(RefClassInstance)).unwrap();
        assert!(set.covers(&reference, RefClassInstance));
        assert!(set.covers_class_ref(&sb()));

        let wildcard = PolicySet::from_lines(["java.lang * read_Class_Static_Field"]).unwrap();
        assert!(wildcard.covers(&reference, RefClass));
        assert!(wildcard.covers_class_ref(&sb()));
    }

    /// A grant of one field kind does not cover the other kinds.
    #[test]
    fn partial_kind_grant_does_not_cover_the_rest() {
        let set = PolicySet::from_lines([
            "java.lang java.lang.System.out:Ljava/io/PrintStream; read_Class_Static_Field",
        ])
        .unwrap();

        let field = PolicyStatement::field(
            ClassId::from_binary_name("java/lang/System"),
            "out",
            "Ljava/io/PrintStream;",
            KindSet::from_kinds([ReadClassStaticField, WriteClassStaticField]),
        )
        .unwrap();

        assert!(set.covers(&field, ReadClassStaticField));
        assert!(!set.covers(&field, WriteClassStaticField));
    }

    #[test]
    fn merged_with_unions_coverage() {
        let base = PolicySet::from_lines(["java.lang java.lang.String ref_Class"]).unwrap();
        let extra = PolicySet::from_lines(["java.util * ref_Class"]).unwrap();
        let merged = base.merged_with(&extra);

        assert!(merged.covers_class_ref(&ClassId::from_binary_name("java/lang/String")));
        assert!(merged.covers_class_ref(&ClassId::from_binary_name("java/util/ArrayList")));
        // Neither input set gained coverage.
        assert!(!base.covers_class_ref(&ClassId::from_binary_name("java/util/ArrayList")));
    }

    #[test]
    fn sealed_flag_does_not_change_matching() {
        let sealed = PolicySet::from_lines(["java.lang:sealed * ref_Class"]).unwrap();
        let open = PolicySet::from_lines(["java.lang * ref_Class"]).unwrap();
        let class = ClassId::from_binary_name("java/lang/String");
        assert_eq!(sealed.covers_class_ref(&class), open.covers_class_ref(&class));
    }
}
