//! Parser for the canonical line-oriented policy format.
//!
//! Each line is `<package>[:sealed] <target> <kind>` with exactly three
//! whitespace-separated fields (member signatures contain no whitespace).
//! The kind token selects the statement scope: a field kind produces a
//! field statement, `call_Class_Constructor` a constructor statement, and
//! so on — which is what makes the shared `name:descriptor` member form
//! unambiguous. Re-parsing rendered canonical text therefore reproduces an
//! equivalent statement set.

use palisade_contracts::capability::{CapabilityKind, KindSet, CLASS_REF_KINDS, FIELD_KINDS};
use palisade_contracts::error::{PalisadeError, PalisadeResult};
use palisade_contracts::statement::{PolicyStatement, CONSTRUCTOR_NAME};
use palisade_contracts::symbol::ClassId;

fn parse_error(line: &str, reason: impl Into<String>) -> PalisadeError {
    PalisadeError::PolicyParse {
        line: line.to_string(),
        reason: reason.into(),
    }
}

/// Parse one canonical policy line into a single-kind statement.
///
/// The line must be non-empty and not a comment; callers filter those out
/// (see [`parse_policy`]).
pub fn parse_line(line: &str) -> PalisadeResult<PolicyStatement> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let &[package_field, target, kind_name] = fields.as_slice() else {
        return Err(parse_error(line, "expected three whitespace-separated fields"));
    };

    let kind: CapabilityKind = kind_name
        .parse()
        .map_err(|e: palisade_contracts::capability::UnknownKind| parse_error(line, e.to_string()))?;

    let (package, sealed) = match package_field.strip_suffix(":sealed") {
        Some(stripped) => (stripped, true),
        None => (package_field, false),
    };

    if target == "*" {
        return PolicyStatement::package(package, sealed, KindSet::single(kind));
    }
    if sealed {
        return Err(parse_error(line, "the sealed flag is only valid on package lines"));
    }

    let statement = match kind {
        k if CLASS_REF_KINDS.contains(&k) => {
            PolicyStatement::class(class_target(line, package, target)?, KindSet::single(k))?
        }
        CapabilityKind::CallClassConstructor => {
            let marker = format!(".{}:", CONSTRUCTOR_NAME);
            let idx = target
                .find(&marker)
                .ok_or_else(|| parse_error(line, "constructor target must contain '.<init>:'"))?;
            let class = class_target(line, package, &target[..idx])?;
            let descriptor = &target[idx + marker.len()..];
            if !descriptor.starts_with('(') {
                return Err(parse_error(line, "constructor descriptor must start with '('"));
            }
            PolicyStatement::constructor(class, descriptor)?
        }
        CapabilityKind::CallClassStaticMethod | CapabilityKind::CallClassInstanceMethod => {
            let paren = target
                .find('(')
                .ok_or_else(|| parse_error(line, "method target must contain a descriptor"))?;
            let dot = target[..paren]
                .rfind('.')
                .ok_or_else(|| parse_error(line, "method target must contain '<class>.<name>'"))?;
            let class = class_target(line, package, &target[..dot])?;
            let name = &target[dot + 1..paren];
            if name.is_empty() {
                return Err(parse_error(line, "method name is empty"));
            }
            PolicyStatement::method(class, name, &target[paren..], KindSet::single(kind))?
        }
        // Remaining kinds are the field and property access kinds, which
        // share the `<class>.<name>:<descriptor>` member form.
        k => {
            let colon = target
                .rfind(':')
                .ok_or_else(|| parse_error(line, "member target must contain ':<descriptor>'"))?;
            let dot = target[..colon]
                .rfind('.')
                .ok_or_else(|| parse_error(line, "member target must contain '<class>.<name>'"))?;
            let class = class_target(line, package, &target[..dot])?;
            let name = &target[dot + 1..colon];
            let descriptor = &target[colon + 1..];
            if name.is_empty() || descriptor.is_empty() {
                return Err(parse_error(line, "member name and descriptor must be non-empty"));
            }
            if FIELD_KINDS.contains(&k) {
                PolicyStatement::field(class, name, descriptor, KindSet::single(k))?
            } else {
                PolicyStatement::property(class, name, descriptor, KindSet::single(k))?
            }
        }
    };

    Ok(statement)
}

/// Resolve a fully-qualified class target and cross-check it against the
/// line's package field — a mismatch means the line was hand-edited badly.
fn class_target(line: &str, package: &str, class: &str) -> PalisadeResult<ClassId> {
    let id = ClassId::from_dotted(class);
    if id.package != package {
        return Err(parse_error(
            line,
            format!(
                "class '{}' does not belong to package '{}'",
                id.class, package
            ),
        ));
    }
    Ok(id)
}

/// Parse a whole policy document: one statement per non-empty,
/// non-comment (`#`) line.
pub fn parse_policy(text: &str) -> PalisadeResult<Vec<PolicyStatement>> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(parse_line)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_contracts::capability::CapabilityKind::*;
    use palisade_contracts::statement::canonical_lines;

    #[test]
    fn parses_a_class_reference_line() {
        let stmt = parse_line("java.lang java.lang.StringBuilder ref_Class_Instance").unwrap();
        match &stmt {
            PolicyStatement::Class { class, kinds } => {
                assert_eq!(class.class, "java.lang.StringBuilder");
                assert!(kinds.contains(RefClassInstance));
            }
            other => panic!("expected a class statement, got {:?}", other),
        }
    }

    #[test]
    fn parses_a_method_line() {
        let stmt = parse_line(
            "java.lang java.lang.StringBuilder.append(Ljava/lang/String;)Ljava/lang/StringBuilder; call_Class_Instance_Method",
        )
        .unwrap();
        match &stmt {
            PolicyStatement::Method { class, name, descriptor, .. } => {
                assert_eq!(class.class, "java.lang.StringBuilder");
                assert_eq!(name, "append");
                assert_eq!(descriptor, "(Ljava/lang/String;)Ljava/lang/StringBuilder;");
            }
            other => panic!("expected a method statement, got {:?}", other),
        }
    }

    #[test]
    fn parses_a_constructor_line() {
        let stmt = parse_line(
            "java.lang java.lang.StringBuilder.<init>:()Ljava/lang/StringBuilder; call_Class_Constructor",
        )
        .unwrap();
        match &stmt {
            PolicyStatement::Constructor { class, descriptor, .. } => {
                assert_eq!(class.class, "java.lang.StringBuilder");
                assert_eq!(descriptor, "()Ljava/lang/StringBuilder;");
            }
            other => panic!("expected a constructor statement, got {:?}", other),
        }
    }

    #[test]
    fn parses_field_and_property_lines_by_kind() {
        let field = parse_line(
            "java.lang java.lang.System.out:Ljava/io/PrintStream; read_Class_Static_Field",
        )
        .unwrap();
        assert!(matches!(field, PolicyStatement::Field { .. }));

        let property = parse_line(
            "com.example com.example.Config.timeout:I read_Class_Instance_Property",
        )
        .unwrap();
        assert!(matches!(property, PolicyStatement::Property { .. }));
    }

    #[test]
    fn parses_sealed_and_open_package_lines() {
        let sealed = parse_line("java.lang:sealed * ref_Class").unwrap();
        assert!(matches!(sealed, PolicyStatement::Package { sealed: true, .. }));

        let open = parse_line("java.util * call_Class_Instance_Method").unwrap();
        assert!(matches!(open, PolicyStatement::Package { sealed: false, .. }));
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = parse_line("java.lang java.lang.String do_Anything").unwrap_err();
        assert!(matches!(err, PalisadeError::PolicyParse { .. }));
        assert!(err.to_string().contains("do_Anything"));
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = parse_line("java.lang ref_Class").unwrap_err();
        assert!(err.to_string().contains("three whitespace-separated fields"));
    }

    #[test]
    fn rejects_package_mismatch() {
        let err = parse_line("java.util java.lang.String ref_Class").unwrap_err();
        assert!(err.to_string().contains("does not belong to package"));
    }

    #[test]
    fn rejects_sealed_on_non_package_lines() {
        let err = parse_line("java.lang:sealed java.lang.String ref_Class").unwrap_err();
        assert!(err.to_string().contains("sealed"));
    }

    #[test]
    fn parse_policy_skips_comments_and_blanks() {
        let text = "\n# trusted core\njava.lang java.lang.String ref_Class\n\n";
        let stmts = parse_policy(text).unwrap();
        assert_eq!(stmts.len(), 1);
    }

    /// Rendering a statement set and re-parsing it reproduces an equivalent
    /// capability set, modulo the synthesized default references (which are
    /// stable under a second render).
    #[test]
    fn canonical_render_round_trips() {
        let original = vec![
            parse_line("java.lang java.lang.StringBuilder.append(Ljava/lang/String;)Ljava/lang/StringBuilder; call_Class_Instance_Method").unwrap(),
            parse_line("java.lang:sealed * ref_Class").unwrap(),
            parse_line("java.io java.io.File.exists()Z call_Class_Instance_Method").unwrap(),
        ];

        let rendered = canonical_lines(&original);
        let reparsed = parse_policy(&rendered.join("\n")).unwrap();
        let rerendered = canonical_lines(&reparsed);

        assert_eq!(rendered, rerendered);
    }
}
