//! The capability scanner: what does this bytecode try to do?
//!
//! A structural, recursive-descent walk over a parsed class file that
//! derives the policy statements the code *requests*: every type it
//! references (header, descriptors, generic signatures, annotations,
//! instructions), every field it reads or writes, every method and
//! constructor it invokes. The scanner never evaluates bytecode and
//! tolerates classes that would fail to link; only genuine container
//! malformation is an error.
//!
//! Dynamic-invocation sites are the one case that cannot always be derived
//! statically. The standard lambda and string-concat bootstraps are fully
//! resolved; anything else is recorded as an *unresolved* site — a report
//! string no policy line can match, so it fails closed in the verifier
//! rather than being silently skipped (silently skipping would be a
//! sandbox escape).
//!
//! Each scan function returns its own request list; there is no shared
//! visitor state, which keeps per-class scans independent and
//! parallelizable.

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use palisade_contracts::batch::NamedClassBytes;
use palisade_contracts::capability::{CapabilityKind, KindSet};
use palisade_contracts::error::{PalisadeError, PalisadeResult};
use palisade_contracts::scan::{ClassScan, DeclaredMember, ScanResult};
use palisade_contracts::statement::{PolicyStatement, CONSTRUCTOR_NAME};
use palisade_contracts::symbol::ClassId;

use crate::classfile::{parse_attributes, AttributeInfo, ClassFile, Constant, ConstantPool, MemberRef};
use crate::descriptor::{class_names_in_descriptor, class_names_in_signature};
use crate::reader::{ByteReader, ScanError, ScanRes};

/// The requests one scan step produced.
#[derive(Debug, Default)]
struct Requests {
    statements: Vec<PolicyStatement>,
    unresolved: Vec<String>,
}

impl Requests {
    fn absorb(&mut self, other: Requests) {
        self.statements.extend(other.statements);
        self.unresolved.extend(other.unresolved);
    }

    /// Request a reference capability on a type given in binary form.
    ///
    /// Array forms contribute their element class; primitives and
    /// primitive arrays reference nothing.
    fn reference(&mut self, binary: &str, kind: CapabilityKind) -> ScanRes<()> {
        let element = binary.trim_start_matches('[');
        let name = if element.starts_with('L') && element.ends_with(';') {
            &element[1..element.len() - 1]
        } else if element.len() == 1 && "BCDFIJSZV".contains(element) {
            // A primitive (or primitive array) references no class.
            return Ok(());
        } else {
            element
        };
        let class = ClassId::from_binary_name(name);
        self.statements
            .push(PolicyStatement::class(class, KindSet::single(kind))?);
        Ok(())
    }

    /// Base references for every class named in a descriptor.
    fn descriptor_refs(&mut self, descriptor: &str) -> ScanRes<()> {
        for name in class_names_in_descriptor(descriptor) {
            self.reference(&name, CapabilityKind::RefClass)?;
        }
        Ok(())
    }

    /// Base references for every class named in a generic signature.
    fn signature_refs(&mut self, signature: &str) -> ScanRes<()> {
        for name in class_names_in_signature(signature)? {
            self.reference(&name, CapabilityKind::RefClass)?;
        }
        Ok(())
    }
}

/// Scan one class buffer into a [`ClassScan`].
///
/// `submitted_name` is used for error context only; the class header is
/// authoritative for identity.
pub fn scan_class(submitted_name: &str, bytes: &[u8]) -> PalisadeResult<ClassScan> {
    let class_file = ClassFile::parse(submitted_name, bytes)?;
    scan_class_file(&class_file, bytes).map_err(|e| PalisadeError::MalformedClass {
        class: class_file.this_class.replace('/', "."),
        reason: e.0,
    })
}

/// Scan a whole batch. Each class scan is independent; a malformed class
/// aborts the batch.
pub fn scan_batch(classes: &[NamedClassBytes]) -> PalisadeResult<ScanResult> {
    let mut result = ScanResult::default();
    for class in classes {
        result.classes.push(scan_class(&class.name, &class.bytes)?);
    }
    Ok(result)
}

/// The class name declared by a buffer's header, without a full scan.
pub fn class_name_of(bytes: &[u8]) -> PalisadeResult<ClassId> {
    let class_file = ClassFile::parse("<unnamed>", bytes)?;
    Ok(ClassId::from_binary_name(&class_file.this_class))
}

fn scan_class_file(cf: &ClassFile, bytes: &[u8]) -> ScanRes<ClassScan> {
    let class = ClassId::from_binary_name(&cf.this_class);
    let pool = &cf.constant_pool;
    let bootstrap = parse_bootstrap_methods(cf)?;

    let mut requests = Requests::default();
    let mut declared_methods = Vec::new();
    let mut declared_fields = Vec::new();

    // ── Class header ─────────────────────────────────────────────────────────
    if let Some(super_class) = &cf.super_class {
        requests.reference(super_class, CapabilityKind::RefClassInstance)?;
    }
    for interface in &cf.interfaces {
        requests.reference(interface, CapabilityKind::RefClass)?;
    }
    requests.absorb(scan_shared_attributes(&cf.attributes, pool)?);
    if let Some(record) = cf.attribute("Record") {
        requests.absorb(scan_record_attribute(record, pool)?);
    }

    // ── Declared fields ──────────────────────────────────────────────────────
    for field in &cf.fields {
        declared_fields.push(DeclaredMember {
            name: field.name.clone(),
            descriptor: field.descriptor.clone(),
        });
        requests.descriptor_refs(&field.descriptor)?;
        requests.absorb(scan_shared_attributes(&field.attributes, pool)?);
    }

    // ── Declared methods and constructors ────────────────────────────────────
    for method in &cf.methods {
        declared_methods.push(DeclaredMember {
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
        });
        requests.descriptor_refs(&method.descriptor)?;
        requests.absorb(scan_shared_attributes(&method.attributes, pool)?);

        if let Some(exceptions) = method.attribute("Exceptions") {
            let mut r = ByteReader::new(&exceptions.data);
            let count = r.u16()?;
            for _ in 0..count {
                requests.reference(pool.class_name(r.u16()?)?, CapabilityKind::RefClass)?;
            }
        }
        for attr_name in ["RuntimeVisibleParameterAnnotations", "RuntimeInvisibleParameterAnnotations"] {
            if let Some(attr) = method.attribute(attr_name) {
                requests.absorb(scan_parameter_annotations(&attr.data, pool)?);
            }
        }
        if let Some(code) = method.attribute("Code") {
            requests.absorb(scan_code(&code.data, pool, &bootstrap, &class)?);
        }
    }

    for site in &requests.unresolved {
        warn!(class = %class, site = %site, "unresolved dynamic invocation site");
    }
    debug!(
        class = %class,
        requests = requests.statements.len(),
        unresolved = requests.unresolved.len(),
        "class scanned"
    );

    Ok(ClassScan {
        class,
        digest: hex::encode(Sha256::digest(bytes)),
        requests: requests.statements,
        unresolved: requests.unresolved,
        declared_methods,
        declared_fields,
    })
}

/// Attributes that can appear on classes, fields, and methods alike:
/// generic signatures, annotations, and type annotations.
fn scan_shared_attributes(attributes: &[AttributeInfo], pool: &ConstantPool) -> ScanRes<Requests> {
    let mut out = Requests::default();
    for attr in attributes {
        match attr.name.as_str() {
            "Signature" => {
                let mut r = ByteReader::new(&attr.data);
                out.signature_refs(pool.utf8(r.u16()?)?)?;
            }
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                out.absorb(scan_annotations(&attr.data, pool)?);
            }
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                out.absorb(scan_type_annotations(&attr.data, pool)?);
            }
            _ => {}
        }
    }
    Ok(out)
}

/// Record components carry the same reference surface as declared fields.
fn scan_record_attribute(attr: &AttributeInfo, pool: &ConstantPool) -> ScanRes<Requests> {
    let mut out = Requests::default();
    let mut r = ByteReader::new(&attr.data);
    let count = r.u16()?;
    for _ in 0..count {
        r.skip(2)?; // component name
        out.descriptor_refs(pool.utf8(r.u16()?)?)?;
        let attributes = parse_attributes(&mut r, pool)?;
        out.absorb(scan_shared_attributes(&attributes, pool)?);
    }
    Ok(out)
}

// ── Annotations ──────────────────────────────────────────────────────────────

fn scan_annotations(data: &[u8], pool: &ConstantPool) -> ScanRes<Requests> {
    let mut r = ByteReader::new(data);
    let mut out = Requests::default();
    let count = r.u16()?;
    for _ in 0..count {
        out.absorb(scan_annotation(&mut r, pool)?);
    }
    Ok(out)
}

fn scan_parameter_annotations(data: &[u8], pool: &ConstantPool) -> ScanRes<Requests> {
    let mut r = ByteReader::new(data);
    let mut out = Requests::default();
    let parameter_count = r.u8()?;
    for _ in 0..parameter_count {
        let count = r.u16()?;
        for _ in 0..count {
            out.absorb(scan_annotation(&mut r, pool)?);
        }
    }
    Ok(out)
}

/// One annotation structure: its type plus every element value, recursively.
fn scan_annotation(r: &mut ByteReader<'_>, pool: &ConstantPool) -> ScanRes<Requests> {
    let mut out = Requests::default();
    out.descriptor_refs(pool.utf8(r.u16()?)?)?;
    let pair_count = r.u16()?;
    for _ in 0..pair_count {
        r.skip(2)?; // element name
        out.absorb(scan_element_value(r, pool)?);
    }
    Ok(out)
}

fn scan_element_value(r: &mut ByteReader<'_>, pool: &ConstantPool) -> ScanRes<Requests> {
    let mut out = Requests::default();
    let tag = r.u8()?;
    match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => {
            r.skip(2)?;
        }
        b'e' => {
            // Enum constant: the enum type is a referenced class.
            out.descriptor_refs(pool.utf8(r.u16()?)?)?;
            r.skip(2)?;
        }
        b'c' => {
            // Class literal: a return descriptor, possibly primitive.
            out.descriptor_refs(pool.utf8(r.u16()?)?)?;
        }
        b'@' => {
            out.absorb(scan_annotation(r, pool)?);
        }
        b'[' => {
            let count = r.u16()?;
            for _ in 0..count {
                out.absorb(scan_element_value(r, pool)?);
            }
        }
        other => {
            return Err(ScanError::new(format!(
                "unknown annotation element tag '{}'",
                other as char
            )))
        }
    }
    Ok(out)
}

/// Type annotations wrap a regular annotation behind a target descriptor;
/// the target is skipped, the annotation scanned.
fn scan_type_annotations(data: &[u8], pool: &ConstantPool) -> ScanRes<Requests> {
    let mut r = ByteReader::new(data);
    let mut out = Requests::default();
    let count = r.u16()?;
    for _ in 0..count {
        let target_type = r.u8()?;
        let info_len = match target_type {
            0x00 | 0x01 | 0x16 => 1,
            0x10..=0x12 | 0x17 | 0x42..=0x46 => 2,
            0x13..=0x15 => 0,
            0x47..=0x4B => 3,
            0x40 | 0x41 => {
                let table_length = r.u16()? as usize;
                table_length * 6
            }
            other => {
                return Err(ScanError::new(format!(
                    "unknown type annotation target 0x{:02x}",
                    other
                )))
            }
        };
        r.skip(info_len)?;
        let path_length = r.u8()? as usize;
        r.skip(path_length * 2)?;
        out.absorb(scan_annotation(&mut r, pool)?);
    }
    Ok(out)
}

// ── Method bodies ────────────────────────────────────────────────────────────

fn scan_code(
    data: &[u8],
    pool: &ConstantPool,
    bootstrap: &[BootstrapMethod],
    class: &ClassId,
) -> ScanRes<Requests> {
    let mut r = ByteReader::new(data);
    let mut out = Requests::default();

    r.skip(4)?; // max_stack, max_locals
    let code_length = r.u32()? as usize;
    let code = r.take(code_length)?;
    out.absorb(walk_instructions(code, pool, bootstrap, class)?);

    // Exception handlers: each non-`finally` entry names a caught type.
    let handler_count = r.u16()?;
    for _ in 0..handler_count {
        r.skip(6)?; // start_pc, end_pc, handler_pc
        let catch_type = r.u16()?;
        if catch_type != 0 {
            out.reference(pool.class_name(catch_type)?, CapabilityKind::RefClass)?;
        }
    }

    // Code sub-attributes: local variable tables name further types.
    for attr in parse_attributes(&mut r, pool)? {
        match attr.name.as_str() {
            "LocalVariableTable" => {
                let mut t = ByteReader::new(&attr.data);
                let entries = t.u16()?;
                for _ in 0..entries {
                    t.skip(6)?; // start_pc, length, name
                    out.descriptor_refs(pool.utf8(t.u16()?)?)?;
                    t.skip(2)?; // slot index
                }
            }
            "LocalVariableTypeTable" => {
                let mut t = ByteReader::new(&attr.data);
                let entries = t.u16()?;
                for _ in 0..entries {
                    t.skip(6)?;
                    out.signature_refs(pool.utf8(t.u16()?)?)?;
                    t.skip(2)?;
                }
            }
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                out.absorb(scan_type_annotations(&attr.data, pool)?);
            }
            _ => {}
        }
    }

    Ok(out)
}

fn walk_instructions(
    code: &[u8],
    pool: &ConstantPool,
    bootstrap: &[BootstrapMethod],
    class: &ClassId,
) -> ScanRes<Requests> {
    let mut r = ByteReader::new(code);
    let mut out = Requests::default();

    while !r.is_at_end() {
        let opcode_pos = r.pos();
        let opcode = r.u8()?;
        match opcode {
            // ── Constant loads that can name types ───────────────────────────
            0x12 => {
                let index = r.u8()? as u16;
                out.absorb(scan_loaded_constant(index, pool, class)?);
            }
            0x13 | 0x14 => {
                let index = r.u16()?;
                out.absorb(scan_loaded_constant(index, pool, class)?);
            }

            // ── Field access ─────────────────────────────────────────────────
            0xB2..=0xB5 => {
                let member = pool.member_ref(r.u16()?)?;
                let kind = match opcode {
                    0xB2 => CapabilityKind::ReadClassStaticField,
                    0xB3 => CapabilityKind::WriteClassStaticField,
                    0xB4 => CapabilityKind::ReadClassInstanceField,
                    _ => CapabilityKind::WriteClassInstanceField,
                };
                out.absorb(field_access(member, kind)?);
            }

            // ── Invocations ──────────────────────────────────────────────────
            0xB6..=0xB8 => {
                let member = pool.member_ref(r.u16()?)?;
                out.absorb(invocation(member, opcode)?);
            }
            0xB9 => {
                let member = pool.member_ref(r.u16()?)?;
                r.skip(2)?; // count, zero
                out.absorb(invocation(member, opcode)?);
            }
            0xBA => {
                let index = r.u16()?;
                r.skip(2)?; // two zero bytes
                out.absorb(scan_invoke_dynamic(index, pool, bootstrap, class)?);
            }

            // ── Type-creating and type-testing instructions ──────────────────
            0xBB | 0xBD | 0xC0 | 0xC1 => {
                let name = pool.class_name(r.u16()?)?;
                out.reference(name, CapabilityKind::RefClassInstance)?;
            }
            0xC5 => {
                let name = pool.class_name(r.u16()?)?;
                r.skip(1)?; // dimensions
                out.reference(name, CapabilityKind::RefClassInstance)?;
            }

            // ── Everything else: skip operands by width ──────────────────────
            0x10 | 0x15..=0x19 | 0x36..=0x3A | 0xA9 | 0xBC => {
                r.skip(1)?;
            }
            0x11 | 0x84 | 0x99..=0xA8 | 0xC6 | 0xC7 => {
                r.skip(2)?;
            }
            0xC8 | 0xC9 => {
                r.skip(4)?;
            }
            0xC4 => {
                // wide: a modified load/store/ret (2 operand bytes) or
                // iinc (4 operand bytes).
                let widened = r.u8()?;
                r.skip(if widened == 0x84 { 4 } else { 2 })?;
            }
            0xAA => {
                // tableswitch: 0-3 alignment pad, default, low, high, jumps.
                r.skip((4 - (opcode_pos + 1) % 4) % 4)?;
                r.skip(4)?;
                let low = r.u32()? as i32;
                let high = r.u32()? as i32;
                if high < low {
                    return Err(ScanError::new("tableswitch high < low"));
                }
                r.skip(4 * (high as i64 - low as i64 + 1) as usize)?;
            }
            0xAB => {
                // lookupswitch: pad, default, npairs, match/offset pairs.
                r.skip((4 - (opcode_pos + 1) % 4) % 4)?;
                r.skip(4)?;
                let npairs = r.u32()? as usize;
                r.skip(8 * npairs)?;
            }
            0x00..=0x0F | 0x1A..=0x35 | 0x3B..=0x83 | 0x85..=0x98 | 0xAC..=0xB1 | 0xBE | 0xBF
            | 0xC2 | 0xC3 => {}
            other => {
                return Err(ScanError::new(format!(
                    "unknown opcode 0x{:02x} at code offset {}",
                    other, opcode_pos
                )))
            }
        }
    }

    Ok(out)
}

/// An `ldc`-family constant: Class, MethodType, and MethodHandle constants
/// name symbols; dynamically-computed constants fail closed.
fn scan_loaded_constant(index: u16, pool: &ConstantPool, class: &ClassId) -> ScanRes<Requests> {
    let mut out = Requests::default();
    match pool.get(index)? {
        Constant::Class { name_index } => {
            out.reference(pool.utf8(*name_index)?, CapabilityKind::RefClass)?;
        }
        Constant::MethodType { descriptor_index } => {
            out.descriptor_refs(pool.utf8(*descriptor_index)?)?;
        }
        Constant::MethodHandle { reference_kind, reference_index } => {
            match resolved_handle(pool, *reference_kind, *reference_index)? {
                Some(requests) => out.absorb(requests),
                None => out.unresolved.push(format!(
                    "{} {} method handle of unknown kind {} (fail closed)",
                    class.package, class.class, reference_kind
                )),
            }
        }
        Constant::Dynamic { name_and_type_index, .. } => {
            // A dynamically-computed constant is produced by a bootstrap at
            // link time; its value cannot be derived here, so it is never
            // silently trusted.
            let (name, descriptor) = pool.name_and_type(*name_and_type_index)?;
            out.unresolved.push(format!(
                "{} {}.{}:{} dynamic constant cannot be resolved (fail closed)",
                class.package, class.class, name, descriptor
            ));
        }
        _ => {}
    }
    Ok(out)
}

fn field_access(member: MemberRef<'_>, kind: CapabilityKind) -> ScanRes<Requests> {
    let mut out = Requests::default();
    out.descriptor_refs(member.descriptor)?;
    if member.owner.starts_with('[') {
        // Array pseudo-members have no grantable owner; the element class
        // reference is the capability that matters.
        out.reference(member.owner, CapabilityKind::RefClassInstance)?;
        return Ok(out);
    }
    out.statements.push(PolicyStatement::field(
        ClassId::from_binary_name(member.owner),
        member.name,
        member.descriptor,
        KindSet::single(kind),
    )?);
    Ok(out)
}

fn invocation(member: MemberRef<'_>, opcode: u8) -> ScanRes<Requests> {
    let mut out = Requests::default();
    out.descriptor_refs(member.descriptor)?;
    if member.owner.starts_with('[') {
        // Calls on array types resolve to intrinsic Object members.
        out.reference(member.owner, CapabilityKind::RefClassInstance)?;
        return Ok(out);
    }
    let owner = ClassId::from_binary_name(member.owner);
    let statement = if member.name == CONSTRUCTOR_NAME && opcode == 0xB7 {
        PolicyStatement::constructor(owner, constructor_descriptor(member.owner, member.descriptor))?
    } else {
        let kind = if opcode == 0xB8 {
            CapabilityKind::CallClassStaticMethod
        } else {
            CapabilityKind::CallClassInstanceMethod
        };
        PolicyStatement::method(owner, member.name, member.descriptor, KindSet::single(kind))?
    };
    out.statements.push(statement);
    Ok(out)
}

/// Rewrite a raw `(…)V` constructor descriptor so its return type names
/// the constructed class, the form policy text uses.
fn constructor_descriptor(owner_binary: &str, raw: &str) -> String {
    match raw.find(')') {
        Some(close) => format!("{}L{};", &raw[..=close], owner_binary),
        None => raw.to_string(),
    }
}

// ── Dynamic invocation ───────────────────────────────────────────────────────

#[derive(Debug)]
struct BootstrapMethod {
    owner: String,
    name: String,
    arguments: Vec<u16>,
}

fn parse_bootstrap_methods(cf: &ClassFile) -> ScanRes<Vec<BootstrapMethod>> {
    let Some(attr) = cf.attribute("BootstrapMethods") else {
        return Ok(Vec::new());
    };
    let pool = &cf.constant_pool;
    let mut r = ByteReader::new(&attr.data);
    let count = r.u16()?;
    let mut methods = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (_, reference_index) = pool.method_handle(r.u16()?)?;
        let handle = pool.member_ref(reference_index)?;
        let argument_count = r.u16()?;
        let mut arguments = Vec::with_capacity(argument_count as usize);
        for _ in 0..argument_count {
            arguments.push(r.u16()?);
        }
        methods.push(BootstrapMethod {
            owner: handle.owner.to_string(),
            name: handle.name.to_string(),
            arguments,
        });
    }
    Ok(methods)
}

fn scan_invoke_dynamic(
    index: u16,
    pool: &ConstantPool,
    bootstrap: &[BootstrapMethod],
    class: &ClassId,
) -> ScanRes<Requests> {
    let mut out = Requests::default();

    let (bootstrap_index, nat_index) = match pool.get(index)? {
        Constant::InvokeDynamic { bootstrap_index, name_and_type_index } => {
            (*bootstrap_index, *name_and_type_index)
        }
        other => {
            return Err(ScanError::new(format!(
                "constant {} is {:?}, expected InvokeDynamic",
                index, other
            )))
        }
    };
    let (site_name, site_descriptor) = pool.name_and_type(nat_index)?;
    // The call-site descriptor names the functional interface and captures.
    out.descriptor_refs(site_descriptor)?;

    let method = bootstrap.get(bootstrap_index as usize).ok_or_else(|| {
        ScanError::new(format!("bootstrap method index {} out of range", bootstrap_index))
    })?;

    match (method.owner.as_str(), method.name.as_str()) {
        // Lambda capture: the hidden target is the implementation handle
        // among the bootstrap arguments. Resolve every handle argument to
        // its concrete capability.
        ("java/lang/invoke/LambdaMetafactory", "metafactory" | "altMetafactory") => {
            for argument in &method.arguments {
                match pool.get(*argument)? {
                    Constant::MethodHandle { reference_kind, reference_index } => {
                        match resolved_handle(pool, *reference_kind, *reference_index)? {
                            Some(requests) => out.absorb(requests),
                            None => out.unresolved.push(format!(
                                "{} {}.{}{} lambda implementation handle of unknown kind {} (fail closed)",
                                class.package, class.class, site_name, site_descriptor, reference_kind
                            )),
                        }
                    }
                    Constant::MethodType { descriptor_index } => {
                        out.descriptor_refs(pool.utf8(*descriptor_index)?)?;
                    }
                    _ => {}
                }
            }
        }
        // String concatenation: no hidden target beyond the descriptor.
        ("java/lang/invoke/StringConcatFactory", "makeConcat" | "makeConcatWithConstants") => {}
        // Any other bootstrap binds a target this scan cannot see.
        (owner, name) => {
            out.unresolved.push(format!(
                "{} {}.{}{} call_Dynamic via bootstrap {}.{} cannot be resolved (fail closed)",
                class.package,
                class.class,
                site_name,
                site_descriptor,
                owner.replace('/', "."),
                name
            ));
        }
    }

    Ok(out)
}

/// Resolve a method-handle constant to the capability it confers.
/// Returns `None` for a reference kind outside the defined range, which the
/// caller must treat as unresolved.
fn resolved_handle(
    pool: &ConstantPool,
    reference_kind: u8,
    reference_index: u16,
) -> ScanRes<Option<Requests>> {
    let member = pool.member_ref(reference_index)?;
    let mut out = Requests::default();
    out.descriptor_refs(member.descriptor)?;

    if member.owner.starts_with('[') {
        out.reference(member.owner, CapabilityKind::RefClassInstance)?;
        return Ok(Some(out));
    }
    let owner = ClassId::from_binary_name(member.owner);

    let statement = match reference_kind {
        1 => PolicyStatement::field(owner, member.name, member.descriptor, KindSet::single(CapabilityKind::ReadClassInstanceField))?,
        2 => PolicyStatement::field(owner, member.name, member.descriptor, KindSet::single(CapabilityKind::ReadClassStaticField))?,
        3 => PolicyStatement::field(owner, member.name, member.descriptor, KindSet::single(CapabilityKind::WriteClassInstanceField))?,
        4 => PolicyStatement::field(owner, member.name, member.descriptor, KindSet::single(CapabilityKind::WriteClassStaticField))?,
        5 | 7 | 9 => PolicyStatement::method(owner, member.name, member.descriptor, KindSet::single(CapabilityKind::CallClassInstanceMethod))?,
        6 => PolicyStatement::method(owner, member.name, member.descriptor, KindSet::single(CapabilityKind::CallClassStaticMethod))?,
        8 => PolicyStatement::constructor(owner, constructor_descriptor(member.owner, member.descriptor))?,
        _ => return Ok(None),
    };
    out.statements.push(statement);
    Ok(Some(out))
}
