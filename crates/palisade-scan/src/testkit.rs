//! A minimal class-file assembler for tests.
//!
//! Builds syntactically valid class-file containers — constant pool,
//! members, code, bootstrap methods — without any dependency on a Java
//! toolchain, so scanner and verifier tests can exercise real bytes.
//! Enabled for this crate's own tests and, via the `testkit` cargo
//! feature, for downstream crates' tests. Not intended for production use:
//! the emitted bytecode is structurally valid but makes no attempt to
//! satisfy the JVM verifier.

use std::collections::HashMap;

/// Incrementally assembles one class file.
pub struct ClassBuilder {
    encoded: Vec<Vec<u8>>,
    index_by_entry: HashMap<Vec<u8>, u16>,
    access_flags: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<RawMember>,
    methods: Vec<RawMember>,
    class_attributes: Vec<RawAttribute>,
    bootstrap_methods: Vec<BootstrapEntry>,
}

struct RawMember {
    access_flags: u16,
    name_index: u16,
    descriptor_index: u16,
    attributes: Vec<RawAttribute>,
}

/// A named attribute payload ready for emission.
pub struct RawAttribute {
    name_index: u16,
    data: Vec<u8>,
}

struct BootstrapEntry {
    handle_index: u16,
    arguments: Vec<u16>,
}

impl ClassBuilder {
    /// Start a public class with the given binary name extending Object.
    pub fn new(binary_name: &str) -> Self {
        let mut builder = Self {
            encoded: Vec::new(),
            index_by_entry: HashMap::new(),
            access_flags: 0x0021, // ACC_PUBLIC | ACC_SUPER
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            class_attributes: Vec::new(),
            bootstrap_methods: Vec::new(),
        };
        builder.this_class = builder.class_const(binary_name);
        builder.super_class = builder.class_const("java/lang/Object");
        builder
    }

    pub fn set_super(&mut self, binary_name: &str) {
        self.super_class = self.class_const(binary_name);
    }

    pub fn add_interface(&mut self, binary_name: &str) {
        let index = self.class_const(binary_name);
        self.interfaces.push(index);
    }

    // ── Constant pool ────────────────────────────────────────────────────────

    fn intern(&mut self, entry: Vec<u8>) -> u16 {
        if let Some(index) = self.index_by_entry.get(&entry) {
            return *index;
        }
        self.encoded.push(entry.clone());
        let index = self.encoded.len() as u16; // pool is 1-based
        self.index_by_entry.insert(entry, index);
        index
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        let mut entry = vec![1u8];
        entry.extend((value.len() as u16).to_be_bytes());
        entry.extend(value.as_bytes());
        self.intern(entry)
    }

    pub fn class_const(&mut self, binary_name: &str) -> u16 {
        let name = self.utf8(binary_name);
        let mut entry = vec![7u8];
        entry.extend(name.to_be_bytes());
        self.intern(entry)
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut entry = vec![12u8];
        entry.extend(name_index.to_be_bytes());
        entry.extend(descriptor_index.to_be_bytes());
        self.intern(entry)
    }

    fn member(&mut self, tag: u8, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class_const(owner);
        let nat_index = self.name_and_type(name, descriptor);
        let mut entry = vec![tag];
        entry.extend(class_index.to_be_bytes());
        entry.extend(nat_index.to_be_bytes());
        self.intern(entry)
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.member(9, owner, name, descriptor)
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.member(10, owner, name, descriptor)
    }

    pub fn interface_method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.member(11, owner, name, descriptor)
    }

    pub fn method_handle(&mut self, reference_kind: u8, member_index: u16) -> u16 {
        let mut entry = vec![15u8, reference_kind];
        entry.extend(member_index.to_be_bytes());
        self.intern(entry)
    }

    pub fn method_type(&mut self, descriptor: &str) -> u16 {
        let descriptor_index = self.utf8(descriptor);
        let mut entry = vec![16u8];
        entry.extend(descriptor_index.to_be_bytes());
        self.intern(entry)
    }

    /// Register a bootstrap method; returns its BootstrapMethods index for
    /// use with [`ClassBuilder::invoke_dynamic`].
    pub fn add_bootstrap_method(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        arguments: Vec<u16>,
    ) -> u16 {
        let member = self.method_ref(owner, name, descriptor);
        let handle_index = self.method_handle(6, member); // REF_invokeStatic
        self.bootstrap_methods.push(BootstrapEntry {
            handle_index,
            arguments,
        });
        (self.bootstrap_methods.len() - 1) as u16
    }

    pub fn invoke_dynamic(&mut self, bootstrap_index: u16, name: &str, descriptor: &str) -> u16 {
        let nat_index = self.name_and_type(name, descriptor);
        let mut entry = vec![18u8];
        entry.extend(bootstrap_index.to_be_bytes());
        entry.extend(nat_index.to_be_bytes());
        self.intern(entry)
    }

    // ── Attributes and members ───────────────────────────────────────────────

    pub fn attribute(&mut self, name: &str, data: Vec<u8>) -> RawAttribute {
        RawAttribute {
            name_index: self.utf8(name),
            data,
        }
    }

    pub fn signature_attribute(&mut self, signature: &str) -> RawAttribute {
        let index = self.utf8(signature);
        self.attribute("Signature", index.to_be_bytes().to_vec())
    }

    pub fn exceptions_attribute(&mut self, thrown: &[&str]) -> RawAttribute {
        let mut data = (thrown.len() as u16).to_be_bytes().to_vec();
        for binary_name in thrown {
            let index = self.class_const(binary_name);
            data.extend(index.to_be_bytes());
        }
        self.attribute("Exceptions", data)
    }

    pub fn add_class_attribute(&mut self, attribute: RawAttribute) {
        self.class_attributes.push(attribute);
    }

    pub fn add_field(&mut self, name: &str, descriptor: &str) {
        self.add_field_with(name, descriptor, Vec::new());
    }

    pub fn add_field_with(&mut self, name: &str, descriptor: &str, attributes: Vec<RawAttribute>) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.fields.push(RawMember {
            access_flags: 0x0002, // ACC_PRIVATE
            name_index,
            descriptor_index,
            attributes,
        });
    }

    /// Add a public method whose body is the given raw instruction bytes.
    pub fn add_method(&mut self, name: &str, descriptor: &str, code: &[u8]) {
        let attribute = self.code_attribute(code);
        self.add_method_with(name, descriptor, vec![attribute]);
    }

    pub fn add_method_with(&mut self, name: &str, descriptor: &str, attributes: Vec<RawAttribute>) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.methods.push(RawMember {
            access_flags: 0x0001, // ACC_PUBLIC
            name_index,
            descriptor_index,
            attributes,
        });
    }

    /// A Code attribute with generous frame sizes and no handler table.
    pub fn code_attribute(&mut self, code: &[u8]) -> RawAttribute {
        self.code_attribute_with(code, &[], Vec::new())
    }

    /// A Code attribute with an exception table and sub-attributes.
    /// Handlers are `(start, end, handler, catch_type_index)`; a zero
    /// catch type is a catch-all.
    pub fn code_attribute_with(
        &mut self,
        code: &[u8],
        handlers: &[(u16, u16, u16, u16)],
        sub_attributes: Vec<RawAttribute>,
    ) -> RawAttribute {
        let mut data = Vec::new();
        data.extend(8u16.to_be_bytes()); // max_stack
        data.extend(8u16.to_be_bytes()); // max_locals
        data.extend((code.len() as u32).to_be_bytes());
        data.extend(code);
        data.extend((handlers.len() as u16).to_be_bytes());
        for (start, end, handler, catch_type) in handlers {
            data.extend(start.to_be_bytes());
            data.extend(end.to_be_bytes());
            data.extend(handler.to_be_bytes());
            data.extend(catch_type.to_be_bytes());
        }
        data.extend((sub_attributes.len() as u16).to_be_bytes());
        for attribute in sub_attributes {
            data.extend(attribute.name_index.to_be_bytes());
            data.extend((attribute.data.len() as u32).to_be_bytes());
            data.extend(&attribute.data);
        }
        self.attribute("Code", data)
    }

    // ── Emission ─────────────────────────────────────────────────────────────

    /// Serialize the class file.
    pub fn build(mut self) -> Vec<u8> {
        if !self.bootstrap_methods.is_empty() {
            let mut data = (self.bootstrap_methods.len() as u16).to_be_bytes().to_vec();
            let entries = std::mem::take(&mut self.bootstrap_methods);
            for entry in &entries {
                data.extend(entry.handle_index.to_be_bytes());
                data.extend((entry.arguments.len() as u16).to_be_bytes());
                for argument in &entry.arguments {
                    data.extend(argument.to_be_bytes());
                }
            }
            let attribute = self.attribute("BootstrapMethods", data);
            self.class_attributes.push(attribute);
        }

        let mut out = Vec::new();
        out.extend(0xCAFE_BABEu32.to_be_bytes());
        out.extend(0u16.to_be_bytes()); // minor
        out.extend(52u16.to_be_bytes()); // major: Java 8

        out.extend(((self.encoded.len() + 1) as u16).to_be_bytes());
        for entry in &self.encoded {
            out.extend(entry);
        }

        out.extend(self.access_flags.to_be_bytes());
        out.extend(self.this_class.to_be_bytes());
        out.extend(self.super_class.to_be_bytes());

        out.extend((self.interfaces.len() as u16).to_be_bytes());
        for interface in &self.interfaces {
            out.extend(interface.to_be_bytes());
        }

        for members in [&self.fields, &self.methods] {
            out.extend((members.len() as u16).to_be_bytes());
            for member in members {
                out.extend(member.access_flags.to_be_bytes());
                out.extend(member.name_index.to_be_bytes());
                out.extend(member.descriptor_index.to_be_bytes());
                out.extend((member.attributes.len() as u16).to_be_bytes());
                for attribute in &member.attributes {
                    out.extend(attribute.name_index.to_be_bytes());
                    out.extend((attribute.data.len() as u32).to_be_bytes());
                    out.extend(&attribute.data);
                }
            }
        }

        out.extend((self.class_attributes.len() as u16).to_be_bytes());
        for attribute in &self.class_attributes {
            out.extend(attribute.name_index.to_be_bytes());
            out.extend((attribute.data.len() as u32).to_be_bytes());
            out.extend(&attribute.data);
        }

        out
    }
}

/// Assembles raw instruction bytes for test method bodies.
#[derive(Default)]
pub struct CodeAssembler {
    bytes: Vec<u8>,
}

impl CodeAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    fn op_indexed(mut self, opcode: u8, index: u16) -> Self {
        self.bytes.push(opcode);
        self.bytes.extend(index.to_be_bytes());
        self
    }

    pub fn new_object(self, class_index: u16) -> Self {
        self.op_indexed(0xBB, class_index)
    }

    pub fn dup(mut self) -> Self {
        self.bytes.push(0x59);
        self
    }

    pub fn aconst_null(mut self) -> Self {
        self.bytes.push(0x01);
        self
    }

    pub fn pop(mut self) -> Self {
        self.bytes.push(0x57);
        self
    }

    pub fn ldc_w(self, constant_index: u16) -> Self {
        self.op_indexed(0x13, constant_index)
    }

    pub fn getstatic(self, field_index: u16) -> Self {
        self.op_indexed(0xB2, field_index)
    }

    pub fn putstatic(self, field_index: u16) -> Self {
        self.op_indexed(0xB3, field_index)
    }

    pub fn getfield(self, field_index: u16) -> Self {
        self.op_indexed(0xB4, field_index)
    }

    pub fn putfield(self, field_index: u16) -> Self {
        self.op_indexed(0xB5, field_index)
    }

    pub fn invokevirtual(self, method_index: u16) -> Self {
        self.op_indexed(0xB6, method_index)
    }

    pub fn invokespecial(self, method_index: u16) -> Self {
        self.op_indexed(0xB7, method_index)
    }

    pub fn invokestatic(self, method_index: u16) -> Self {
        self.op_indexed(0xB8, method_index)
    }

    pub fn invokeinterface(mut self, method_index: u16, arg_slots: u8) -> Self {
        self.bytes.push(0xB9);
        self.bytes.extend(method_index.to_be_bytes());
        self.bytes.push(arg_slots);
        self.bytes.push(0);
        self
    }

    pub fn invokedynamic(mut self, indy_index: u16) -> Self {
        self.bytes.push(0xBA);
        self.bytes.extend(indy_index.to_be_bytes());
        self.bytes.extend([0, 0]);
        self
    }

    pub fn checkcast(self, class_index: u16) -> Self {
        self.op_indexed(0xC0, class_index)
    }

    pub fn instance_of(self, class_index: u16) -> Self {
        self.op_indexed(0xC1, class_index)
    }

    pub fn anewarray(self, class_index: u16) -> Self {
        self.op_indexed(0xBD, class_index)
    }

    pub fn athrow(mut self) -> Self {
        self.bytes.push(0xBF);
        self
    }

    pub fn return_void(mut self) -> Self {
        self.bytes.push(0xB1);
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
