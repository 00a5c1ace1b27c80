//! Structural parse of the class-file container.
//!
//! This is a container parse only: constant pool, class header, member
//! tables, and attributes kept as raw named payloads for the scanner to
//! interpret. No linking, no bytecode verification — a class that would
//! fail to link still parses. Truncation, a bad magic number, a dangling
//! constant-pool index, or an unknown tag is a hard parse failure.

use palisade_contracts::error::{PalisadeError, PalisadeResult};

use crate::reader::{ByteReader, ScanError, ScanRes};

const MAGIC: u32 = 0xCAFE_BABE;

/// One constant-pool entry. Long and Double occupy two slots; the second
/// slot is `Unusable` and indexing it is a parse error.
#[derive(Debug, Clone)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
    Unusable,
}

/// A field, method, or interface-method reference resolved to strings.
#[derive(Debug, Clone, Copy)]
pub struct MemberRef<'a> {
    /// Owner class in binary form, e.g. `java/lang/StringBuilder`, or an
    /// array descriptor such as `[Ljava/lang/String;`.
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// The constant pool, 1-indexed as in the container format.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    pub(crate) fn get(&self, index: u16) -> ScanRes<&Constant> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(ScanError::new(format!(
                "constant pool index {} out of range or unusable",
                index
            ))),
            Some(entry) => Ok(entry),
        }
    }

    pub(crate) fn utf8(&self, index: u16) -> ScanRes<&str> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            other => Err(ScanError::new(format!(
                "constant {} is {:?}, expected Utf8",
                index, other
            ))),
        }
    }

    /// Resolve a Class constant to its binary name.
    pub(crate) fn class_name(&self, index: u16) -> ScanRes<&str> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            other => Err(ScanError::new(format!(
                "constant {} is {:?}, expected Class",
                index, other
            ))),
        }
    }

    pub(crate) fn name_and_type(&self, index: u16) -> ScanRes<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType { name_index, descriptor_index } => {
                Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?))
            }
            other => Err(ScanError::new(format!(
                "constant {} is {:?}, expected NameAndType",
                index, other
            ))),
        }
    }

    /// Resolve any of the three member-reference tags.
    pub(crate) fn member_ref(&self, index: u16) -> ScanRes<MemberRef<'_>> {
        let (class_index, nat_index) = match self.get(index)? {
            Constant::FieldRef { class_index, name_and_type_index }
            | Constant::MethodRef { class_index, name_and_type_index }
            | Constant::InterfaceMethodRef { class_index, name_and_type_index } => {
                (*class_index, *name_and_type_index)
            }
            other => {
                return Err(ScanError::new(format!(
                    "constant {} is {:?}, expected a member reference",
                    index, other
                )))
            }
        };
        let (name, descriptor) = self.name_and_type(nat_index)?;
        Ok(MemberRef {
            owner: self.class_name(class_index)?,
            name,
            descriptor,
        })
    }

    pub(crate) fn method_handle(&self, index: u16) -> ScanRes<(u8, u16)> {
        match self.get(index)? {
            Constant::MethodHandle { reference_kind, reference_index } => {
                Ok((*reference_kind, *reference_index))
            }
            other => Err(ScanError::new(format!(
                "constant {} is {:?}, expected MethodHandle",
                index, other
            ))),
        }
    }
}

/// An attribute kept as its raw payload; the scanner interprets the ones
/// it knows and ignores the rest.
#[derive(Debug, Clone)]
pub struct AttributeInfo {
    pub name: String,
    pub data: Vec<u8>,
}

/// A declared field or method.
#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<AttributeInfo>,
}

impl MemberInfo {
    /// The first attribute with the given name, if present.
    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// A structurally parsed class file.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    /// This class's binary name, from the header.
    pub this_class: String,
    /// The superclass binary name; absent only for `java/lang/Object`.
    pub super_class: Option<String>,
    /// Implemented interfaces, binary names.
    pub interfaces: Vec<String>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    /// Parse `bytes` as a class-file container.
    ///
    /// `submitted_name` is only used for error context; the parsed header
    /// is authoritative for the class's identity.
    pub fn parse(submitted_name: &str, bytes: &[u8]) -> PalisadeResult<Self> {
        Self::parse_inner(bytes).map_err(|e| PalisadeError::MalformedClass {
            class: submitted_name.to_string(),
            reason: e.0,
        })
    }

    pub(crate) fn parse_inner(bytes: &[u8]) -> ScanRes<Self> {
        let mut r = ByteReader::new(bytes);

        if r.u32()? != MAGIC {
            return Err(ScanError::new("bad magic number"));
        }
        r.skip(4)?; // minor, major — any version parses

        let pool = parse_constant_pool(&mut r)?;

        let access_flags = r.u16()?;
        let this_class = pool.class_name(r.u16()?)?.to_string();
        let super_index = r.u16()?;
        let super_class = if super_index == 0 {
            None
        } else {
            Some(pool.class_name(super_index)?.to_string())
        };

        let interface_count = r.u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(pool.class_name(r.u16()?)?.to_string());
        }

        let fields = parse_members(&mut r, &pool)?;
        let methods = parse_members(&mut r, &pool)?;
        let attributes = parse_attributes(&mut r, &pool)?;

        if !r.is_at_end() {
            return Err(ScanError::new(format!(
                "trailing bytes after class structure at offset {}",
                r.pos()
            )));
        }

        Ok(Self {
            constant_pool: pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    /// The first class-level attribute with the given name, if present.
    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

fn parse_constant_pool(r: &mut ByteReader<'_>) -> ScanRes<ConstantPool> {
    let count = r.u16()?;
    if count == 0 {
        return Err(ScanError::new("constant pool count is zero"));
    }
    // Slot 0 is reserved by the format.
    let mut entries = vec![Constant::Unusable];

    while entries.len() < count as usize {
        let tag = r.u8()?;
        let entry = match tag {
            1 => {
                let len = r.u16()? as usize;
                // Java's modified UTF-8 differs from UTF-8 only in corner
                // cases (embedded NUL, supplementary pairs); lossy decoding
                // keeps symbol names intact for every name the verifier
                // can meaningfully match.
                Constant::Utf8(String::from_utf8_lossy(r.take(len)?).into_owned())
            }
            3 => Constant::Integer(r.u32()? as i32),
            4 => Constant::Float(f32::from_bits(r.u32()?)),
            5 => {
                let high = r.u32()? as u64;
                let low = r.u32()? as u64;
                Constant::Long(((high << 32) | low) as i64)
            }
            6 => {
                let high = r.u32()? as u64;
                let low = r.u32()? as u64;
                Constant::Double(f64::from_bits((high << 32) | low))
            }
            7 => Constant::Class { name_index: r.u16()? },
            8 => Constant::String { string_index: r.u16()? },
            9 => Constant::FieldRef {
                class_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            10 => Constant::MethodRef {
                class_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            11 => Constant::InterfaceMethodRef {
                class_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            12 => Constant::NameAndType {
                name_index: r.u16()?,
                descriptor_index: r.u16()?,
            },
            15 => Constant::MethodHandle {
                reference_kind: r.u8()?,
                reference_index: r.u16()?,
            },
            16 => Constant::MethodType { descriptor_index: r.u16()? },
            17 => Constant::Dynamic {
                bootstrap_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            18 => Constant::InvokeDynamic {
                bootstrap_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            19 => Constant::Module { name_index: r.u16()? },
            20 => Constant::Package { name_index: r.u16()? },
            other => {
                return Err(ScanError::new(format!(
                    "unknown constant pool tag {} at entry {}",
                    other,
                    entries.len()
                )))
            }
        };

        let two_slots = matches!(entry, Constant::Long(_) | Constant::Double(_));
        entries.push(entry);
        if two_slots {
            entries.push(Constant::Unusable);
        }
    }

    if entries.len() != count as usize {
        return Err(ScanError::new(
            "long/double constant overruns the declared pool count",
        ));
    }

    Ok(ConstantPool { entries })
}

fn parse_members(r: &mut ByteReader<'_>, pool: &ConstantPool) -> ScanRes<Vec<MemberInfo>> {
    let count = r.u16()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let access_flags = r.u16()?;
        let name = pool.utf8(r.u16()?)?.to_string();
        let descriptor = pool.utf8(r.u16()?)?.to_string();
        let attributes = parse_attributes(r, pool)?;
        members.push(MemberInfo {
            access_flags,
            name,
            descriptor,
            attributes,
        });
    }
    Ok(members)
}

pub(crate) fn parse_attributes(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> ScanRes<Vec<AttributeInfo>> {
    let count = r.u16()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = pool.utf8(r.u16()?)?.to_string();
        let len = r.u32()? as usize;
        let data = r.take(len)?.to_vec();
        attributes.push(AttributeInfo { name, data });
    }
    Ok(attributes)
}
