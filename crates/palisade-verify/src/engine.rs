//! The PALISADE verification engine.
//!
//! Reconciles what a batch of bytecode *requests* (from the scanner)
//! against what the policy *grants* (a [`PolicySet`]), producing either a
//! filtered accept or an itemized violation set. The pipeline:
//!
//!   partition self classes → scan the rest → auto-satisfy batch-local
//!   references → check every (target, kind) → collect violations
//!
//! The engine is synchronous and side-effect-free: each call builds its
//! own scan result and touches no shared state, so concurrent calls need
//! no coordination. A malformed container aborts the whole call; every
//! other failure is data in the outcome.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{debug, warn};

use palisade_contracts::batch::NamedClassBytes;
use palisade_contracts::capability::{CapabilityKind, KindSet};
use palisade_contracts::error::PalisadeResult;
use palisade_contracts::report::{NameVerificationOutcome, VerificationId, VerificationOutcome};
use palisade_contracts::statement::PolicyStatement;
use palisade_contracts::symbol::ClassId;
use palisade_policy::PolicySet;
use palisade_scan::scan_batch;

/// The capability verifier for one baseline policy.
///
/// Construct once with the baseline allow-list; each `verify` call may add
/// call-scoped extra policies. The engine holds no mutable state.
pub struct SandboxVerifier {
    baseline: PolicySet,
}

impl SandboxVerifier {
    pub fn new(baseline: PolicySet) -> Self {
        Self { baseline }
    }

    /// Verify a batch of classes against the baseline plus `extra`.
    ///
    /// Classes whose own base class-reference capability is already covered
    /// are *self* classes: previously approved code bundled alongside the
    /// new submission. They are excluded from scanning entirely — their
    /// contents are trusted — and accepted as-is.
    ///
    /// Requested statements whose target is defined within this same batch
    /// (the scanned classes and the self classes) are auto-satisfied: code
    /// may always reference its sibling classes in one submission. Note
    /// this is a deliberate trust decision inherited from the design, not
    /// an oversight — a class smuggled into the batch becomes referenceable
    /// by the rest of the batch without any policy line.
    ///
    /// Returns `Err` only for a malformed class-file container. Capability
    /// violations are data: the outcome's violation set holds one canonical
    /// check line per missing `(target, kind)`, de-duplicated, plus one
    /// entry per unresolved dynamic-invocation site.
    pub fn verify(
        &self,
        classes: Vec<NamedClassBytes>,
        extra: &PolicySet,
    ) -> PalisadeResult<VerificationOutcome> {
        let id = VerificationId::new();
        let effective = self.effective(extra);

        // ── Phase 1: partition out the already-trusted self classes ──────────
        let mut self_classes = Vec::new();
        let mut to_scan = Vec::new();
        for class in classes {
            if effective.covers_class_ref(&ClassId::from_dotted(&class.name)) {
                self_classes.push(class);
            } else {
                to_scan.push(class);
            }
        }
        debug!(
            id = %id.0,
            self_count = self_classes.len(),
            scan_count = to_scan.len(),
            "verification started"
        );

        // ── Phase 2: scan everything that is not yet trusted ─────────────────
        let scan = scan_batch(&to_scan)?;

        // ── Phase 3: collect the batch-defined class set ─────────────────────
        //
        // The reconciliation barrier: violation filtering needs the complete
        // set of classes defined in this submission before it can begin.
        let mut batch_defined: BTreeSet<String> = scan
            .classes
            .iter()
            .map(|c| c.class.class.clone())
            .collect();
        batch_defined.extend(self_classes.iter().map(|c| c.name.clone()));

        // ── Phase 4: check every requested (target, kind) ────────────────────
        let mut violations: BTreeSet<String> = BTreeSet::new();
        let mut accepted = self_classes;
        let mut rejected = Vec::new();

        for (submitted, class_scan) in to_scan.into_iter().zip(&scan.classes) {
            let mut class_violations: BTreeSet<String> = BTreeSet::new();

            for request in &class_scan.requests {
                // Mutual self-reference among the newly submitted classes
                // is always satisfied.
                if request
                    .target_class()
                    .is_some_and(|target| batch_defined.contains(&target.class))
                {
                    continue;
                }
                // A statement is violated if ANY of its kinds is missing:
                // partial coverage still leaves an ungranted capability.
                for kind in request.kinds().iter() {
                    if !effective.covers(request, kind) {
                        class_violations.insert(request.check_line(kind));
                    }
                }
            }
            // Unresolved dynamic sites can never be granted.
            class_violations.extend(class_scan.unresolved.iter().cloned());

            if class_violations.is_empty() {
                accepted.push(submitted);
            } else {
                warn!(
                    id = %id.0,
                    class = %class_scan.class,
                    violations = class_violations.len(),
                    "class rejected"
                );
                rejected.push(submitted.name);
                violations.extend(class_violations);
            }
        }

        debug!(
            id = %id.0,
            accepted = accepted.len(),
            rejected = rejected.len(),
            violations = violations.len(),
            "verification complete"
        );

        Ok(VerificationOutcome {
            id,
            accepted,
            rejected,
            violations,
            scan,
            completed_at: Utc::now(),
        })
    }

    /// The lighter check for when only type identity is available, e.g.
    /// validating a deserialization stream's declared class names: each
    /// name is treated as requesting an instance reference only.
    pub fn verify_names(&self, names: &[String], extra: &PolicySet) -> NameVerificationOutcome {
        let effective = self.effective(extra);
        let mut allowed = Vec::new();
        let mut violations = BTreeSet::new();

        for name in names {
            let class = ClassId::from_dotted(name);
            // Instance references are class-scope kinds, so this cannot fail.
            let request = PolicyStatement::class(
                class,
                KindSet::single(CapabilityKind::RefClassInstance),
            )
            .expect("instance reference is always a valid class-scope kind");

            if effective.covers(&request, CapabilityKind::RefClassInstance) {
                allowed.push(name.clone());
            } else {
                violations.insert(request.check_line(CapabilityKind::RefClassInstance));
            }
        }

        NameVerificationOutcome { allowed, violations }
    }

    fn effective(&self, extra: &PolicySet) -> PolicySet {
        if extra.is_empty() {
            self.baseline.clone()
        } else {
            self.baseline.merged_with(extra)
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use palisade_contracts::batch::NamedClassBytes;
    use palisade_contracts::error::PalisadeError;
    use palisade_policy::PolicySet;
    use palisade_scan::testkit::{ClassBuilder, CodeAssembler};

    use super::SandboxVerifier;

    // ── Builder helpers ──────────────────────────────────────────────────────

    /// A class whose one method does `new StringBuilder().append(null)`.
    fn widget_class() -> NamedClassBytes {
        let mut b = ClassBuilder::new("com/example/Widget");
        let sb = b.class_const("java/lang/StringBuilder");
        let init = b.method_ref("java/lang/StringBuilder", "<init>", "()V");
        let append = b.method_ref(
            "java/lang/StringBuilder",
            "append",
            "(Ljava/lang/String;)Ljava/lang/StringBuilder;",
        );
        let code = CodeAssembler::new()
            .new_object(sb)
            .dup()
            .invokespecial(init)
            .aconst_null()
            .invokevirtual(append)
            .pop()
            .return_void()
            .into_bytes();
        b.add_method("run", "()V", &code);
        NamedClassBytes::new("com.example.Widget", b.build())
    }

    /// The full allow-list the widget class needs.
    fn widget_policy_lines() -> Vec<&'static str> {
        vec![
            "java.lang java.lang.StringBuilder ref_Class_Instance",
            "java.lang java.lang.StringBuilder.append(Ljava/lang/String;)Ljava/lang/StringBuilder; call_Class_Instance_Method",
            "java.lang java.lang.StringBuilder.<init>:()Ljava/lang/StringBuilder; call_Class_Constructor",
            "java.lang java.lang.Object ref_Class_Instance",
            "java.lang java.lang.String ref_Class",
        ]
    }

    fn verifier(lines: &[&str]) -> SandboxVerifier {
        SandboxVerifier::new(PolicySet::from_lines(lines.iter().copied()).unwrap())
    }

    // ── The concrete scenario ────────────────────────────────────────────────

    /// With the full policy the widget passes with no violations.
    #[test]
    fn test_scenario_accepts_with_full_policy() {
        let v = verifier(&widget_policy_lines());
        let outcome = v.verify(vec![widget_class()], &PolicySet::new()).unwrap();

        assert!(outcome.passed(), "violations: {:?}", outcome.violations);
        assert_eq!(outcome.accepted.len(), 1);
        assert!(outcome.rejected.is_empty());
    }

    /// Omitting the constructor line yields exactly one violation naming
    /// that constructor signature.
    #[test]
    fn test_scenario_reports_missing_constructor() {
        let lines: Vec<&str> = widget_policy_lines()
            .into_iter()
            .filter(|l| !l.contains("<init>"))
            .collect();
        let v = verifier(&lines);
        let outcome = v.verify(vec![widget_class()], &PolicySet::new()).unwrap();

        assert!(!outcome.passed());
        let expected: BTreeSet<String> = [
            "java.lang java.lang.StringBuilder.<init>:()Ljava/lang/StringBuilder; call_Class_Constructor".to_string(),
        ]
        .into();
        assert_eq!(outcome.violations, expected);
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.rejected, vec!["com.example.Widget".to_string()]);
    }

    // ── Self-reference closure ───────────────────────────────────────────────

    /// A batch containing Outer and Outer$Helper, where Outer calls a
    /// Helper method, produces zero violations for that call regardless of
    /// external policy.
    #[test]
    fn test_self_reference_closure() {
        let mut outer = ClassBuilder::new("com/example/Outer");
        let assist = outer.method_ref("com/example/Outer$Helper", "assist", "()V");
        let code = CodeAssembler::new()
            .aconst_null()
            .invokevirtual(assist)
            .return_void()
            .into_bytes();
        outer.add_method("work", "()V", &code);

        let mut helper = ClassBuilder::new("com/example/Outer$Helper");
        let noop = CodeAssembler::new().return_void().into_bytes();
        helper.add_method("assist", "()V", &noop);

        // The policy only trusts Object (both superclasses).
        let v = verifier(&["java.lang java.lang.Object ref_Class_Instance"]);
        let outcome = v
            .verify(
                vec![
                    NamedClassBytes::new("com.example.Outer", outer.build()),
                    NamedClassBytes::new("com.example.Outer$Helper", helper.build()),
                ],
                &PolicySet::new(),
            )
            .unwrap();

        assert!(outcome.passed(), "violations: {:?}", outcome.violations);
        assert_eq!(outcome.accepted.len(), 2);
    }

    // ── Partial-kind violation ───────────────────────────────────────────────

    /// A policy granting only the read half of a field that is both read
    /// and written reports a violation for the write half only.
    #[test]
    fn test_partial_kind_violation() {
        let mut b = ClassBuilder::new("com/example/Toucher");
        let out_field = b.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;");
        let code = CodeAssembler::new()
            .getstatic(out_field)
            .putstatic(out_field)
            .return_void()
            .into_bytes();
        b.add_method("swap", "()V", &code);

        let v = verifier(&[
            "java.lang java.lang.System.out:Ljava/io/PrintStream; read_Class_Static_Field",
            "java.io java.io.PrintStream ref_Class",
            "java.lang java.lang.Object ref_Class_Instance",
        ]);
        let outcome = v
            .verify(
                vec![NamedClassBytes::new("com.example.Toucher", b.build())],
                &PolicySet::new(),
            )
            .unwrap();

        let expected: BTreeSet<String> = [
            "java.lang java.lang.System.out:Ljava/io/PrintStream; write_Class_Static_Field".to_string(),
        ]
        .into();
        assert_eq!(outcome.violations, expected);
    }

    // ── Determinism and monotonicity ─────────────────────────────────────────

    /// Verifying the same inputs twice yields identical accepted and
    /// violation sets.
    #[test]
    fn test_idempotence() {
        let v = verifier(&["java.lang java.lang.Object ref_Class_Instance"]);

        let first = v.verify(vec![widget_class()], &PolicySet::new()).unwrap();
        let second = v.verify(vec![widget_class()], &PolicySet::new()).unwrap();

        assert_eq!(first.violations, second.violations);
        let names = |o: &super::VerificationOutcome| {
            o.accepted.iter().map(|c| c.name.clone()).collect::<BTreeSet<_>>()
        };
        assert_eq!(names(&first), names(&second));
    }

    /// Adding policy lines never increases violations.
    #[test]
    fn test_monotonicity() {
        let small = verifier(&["java.lang java.lang.Object ref_Class_Instance"]);
        let large = verifier(&[
            "java.lang java.lang.Object ref_Class_Instance",
            "java.lang java.lang.StringBuilder ref_Class_Instance",
            "java.lang java.lang.String ref_Class",
        ]);

        let small_outcome = small.verify(vec![widget_class()], &PolicySet::new()).unwrap();
        let large_outcome = large.verify(vec![widget_class()], &PolicySet::new()).unwrap();

        assert!(
            large_outcome.violations.is_subset(&small_outcome.violations),
            "larger policy produced new violations: {:?}",
            large_outcome.violations.difference(&small_outcome.violations).collect::<Vec<_>>()
        );
    }

    // ── Fail-closed dynamic invocation ───────────────────────────────────────

    /// A class with an unresolvable dynamic call site is never accepted,
    /// even under a wildcard policy granting every kind.
    #[test]
    fn test_fail_closed_on_unknown_dynamic_invoke() {
        let mut b = ClassBuilder::new("com/example/Weird");
        let bsm = b.add_bootstrap_method(
            "com/example/CustomLinker",
            "link",
            "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;",
            vec![],
        );
        let indy = b.invoke_dynamic(bsm, "mystery", "()V");
        let code = CodeAssembler::new().invokedynamic(indy).return_void().into_bytes();
        b.add_method("call", "()V", &code);

        // Grant every capability kind to both packages involved.
        let mut lines = Vec::new();
        for kind in palisade_contracts::capability::ALL_KINDS {
            lines.push(format!("com.example * {}", kind.name()));
            lines.push(format!("java.lang * {}", kind.name()));
        }
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let v = verifier(&refs);

        let outcome = v
            .verify(
                vec![NamedClassBytes::new("com.example.Weird", b.build())],
                &PolicySet::new(),
            )
            .unwrap();

        assert!(!outcome.passed());
        assert!(outcome.accepted.is_empty(), "wildcard policy must not cover an unresolved site");
        assert!(outcome
            .violations
            .iter()
            .any(|v| v.contains("CustomLinker")));
    }

    // ── Self-class passthrough ───────────────────────────────────────────────

    /// A class whose own reference is already covered is excluded from
    /// scanning: its contents are trusted as-is.
    #[test]
    fn test_self_class_passthrough() {
        // Trusted's body calls System.exit, which the policy does not cover.
        let mut b = ClassBuilder::new("com/example/Trusted");
        let exit = b.method_ref("java/lang/System", "exit", "(I)V");
        let code = CodeAssembler::new().invokestatic(exit).return_void().into_bytes();
        b.add_method("shutdown", "()V", &code);

        let v = verifier(&["com.example com.example.Trusted ref_Class"]);
        let outcome = v
            .verify(
                vec![NamedClassBytes::new("com.example.Trusted", b.build())],
                &PolicySet::new(),
            )
            .unwrap();

        assert!(outcome.passed());
        assert_eq!(outcome.accepted.len(), 1);
        // Nothing was scanned.
        assert!(outcome.scan.classes.is_empty());
    }

    /// Extra call-scoped policies extend the baseline for one call only.
    #[test]
    fn test_extra_policies_are_call_scoped() {
        let v = verifier(&[]);
        let extra = PolicySet::from_lines(["com.example com.example.Trusted ref_Class"]).unwrap();

        let b = ClassBuilder::new("com/example/Trusted");
        let bytes = b.build();

        let with_extra = v
            .verify(
                vec![NamedClassBytes::new("com.example.Trusted", bytes.clone())],
                &extra,
            )
            .unwrap();
        assert!(with_extra.passed());

        // Without the extra set, the class is scanned and its superclass
        // reference (java.lang.Object) is uncovered.
        let without = v
            .verify(
                vec![NamedClassBytes::new("com.example.Trusted", bytes)],
                &PolicySet::new(),
            )
            .unwrap();
        assert!(!without.passed());
    }

    // ── Attribution across a batch ───────────────────────────────────────────

    /// Only the violating class is rejected; its clean sibling passes.
    #[test]
    fn test_violations_attribute_to_the_requesting_class() {
        let clean = {
            let b = ClassBuilder::new("com/example/Clean");
            NamedClassBytes::new("com.example.Clean", b.build())
        };
        let dirty = {
            let mut b = ClassBuilder::new("com/example/Dirty");
            let exit = b.method_ref("java/lang/System", "exit", "(I)V");
            let code = CodeAssembler::new().invokestatic(exit).return_void().into_bytes();
            b.add_method("shutdown", "()V", &code);
            NamedClassBytes::new("com.example.Dirty", b.build())
        };

        let v = verifier(&["java.lang java.lang.Object ref_Class_Instance"]);
        let outcome = v.verify(vec![clean, dirty], &PolicySet::new()).unwrap();

        let accepted: Vec<&str> = outcome.accepted.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(accepted, vec!["com.example.Clean"]);
        assert_eq!(outcome.rejected, vec!["com.example.Dirty".to_string()]);
        assert!(outcome
            .violations
            .iter()
            .any(|v| v.contains("java.lang.System.exit(I)V call_Class_Static_Method")));
    }

    /// Accepted classes come back with their bytes unchanged.
    #[test]
    fn test_accepted_bytes_are_unchanged() {
        let class = widget_class();
        let original = class.bytes.clone();

        let v = verifier(&widget_policy_lines());
        let outcome = v.verify(vec![class], &PolicySet::new()).unwrap();

        assert_eq!(outcome.accepted[0].bytes, original);
    }

    // ── Hard failures ────────────────────────────────────────────────────────

    /// A malformed container aborts the whole call.
    #[test]
    fn test_malformed_class_aborts() {
        let v = verifier(&widget_policy_lines());
        let result = v.verify(
            vec![
                widget_class(),
                NamedClassBytes::new("com.example.Broken", vec![0xCA, 0xFE]),
            ],
            &PolicySet::new(),
        );

        assert!(matches!(result, Err(PalisadeError::MalformedClass { .. })));
    }

    // ── Name-only verification ───────────────────────────────────────────────

    #[test]
    fn test_verify_names() {
        let v = verifier(&[
            "java.lang java.lang.String ref_Class_Instance",
            // An instance-method grant implies the instance reference.
            "java.util java.util.ArrayList.size()I call_Class_Instance_Method",
        ]);

        let outcome = v.verify_names(
            &[
                "java.lang.String".to_string(),
                "java.util.ArrayList".to_string(),
                "java.net.Socket".to_string(),
            ],
            &PolicySet::new(),
        );

        assert_eq!(outcome.allowed, vec!["java.lang.String", "java.util.ArrayList"]);
        let expected: BTreeSet<String> =
            ["java.net java.net.Socket ref_Class_Instance".to_string()].into();
        assert_eq!(outcome.violations, expected);
        assert!(!outcome.passed());
    }
}
