// Assembles class files byte by byte, independently of the crate under test.
#![allow(dead_code)]

use std::collections::HashMap;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

pub struct ClassBuilder {
    constants: Vec<u8>,
    // Usable constant pool indices in ascending order
    indices: Vec<u16>,
    next_index: u16,
    utf8s: HashMap<String, u16>,
    classes: HashMap<String, u16>,
    access_flags: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    attributes: Vec<Vec<u8>>,
}
impl ClassBuilder {
    /// A public class, or an interface if `access_flags` says so.
    pub fn new(name: &str, super_name: Option<&str>) -> Self {
        let mut builder = ClassBuilder {
            constants: Vec::new(),
            indices: Vec::new(),
            next_index: 1,
            utf8s: HashMap::new(),
            classes: HashMap::new(),
            access_flags: ACC_PUBLIC | ACC_SUPER,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        };
        builder.this_class = builder.class(name);
        builder.super_class = super_name.map(|s| builder.class(s)).unwrap_or(0);
        builder
    }

    pub fn interface(name: &str) -> Self {
        let mut builder = Self::new(name, Some("java/lang/Object"));
        builder.access_flags = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;
        builder
    }

    pub fn access_flags(&mut self, access_flags: u16) -> &mut Self {
        self.access_flags = access_flags;
        self
    }

    fn push_constant(&mut self, bytes: &[u8], slots: u16) -> u16 {
        let index = self.next_index;
        self.constants.extend_from_slice(bytes);
        self.indices.push(index);
        self.next_index += slots;
        index
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        if let Some(index) = self.utf8s.get(value) {
            return *index;
        }
        let mut bytes = vec![0x01];
        bytes.extend_from_slice(&(value.len() as u16).to_be_bytes());
        bytes.extend_from_slice(value.as_bytes());
        let index = self.push_constant(&bytes, 1);
        self.utf8s.insert(value.to_owned(), index);
        index
    }

    /// A Utf8 constant holding `bytes` as they are, canonical or not.
    pub fn raw_utf8(&mut self, bytes: &[u8]) -> u16 {
        let mut constant = vec![0x01];
        constant.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
        constant.extend_from_slice(bytes);
        self.push_constant(&constant, 1)
    }

    pub fn class(&mut self, name: &str) -> u16 {
        if let Some(index) = self.classes.get(name) {
            return *index;
        }
        let name_index = self.utf8(name);
        let mut bytes = vec![0x07];
        bytes.extend_from_slice(&name_index.to_be_bytes());
        let index = self.push_constant(&bytes, 1);
        self.classes.insert(name.to_owned(), index);
        index
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        let mut bytes = vec![0x03];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push_constant(&bytes, 1)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        let mut bytes = vec![0x05];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push_constant(&bytes, 2)
    }

    pub fn double(&mut self, value: f64) -> u16 {
        let mut bytes = vec![0x06];
        bytes.extend_from_slice(&value.to_bits().to_be_bytes());
        self.push_constant(&bytes, 2)
    }

    pub fn string(&mut self, value: &str) -> u16 {
        let string_index = self.utf8(value);
        self.string_at(string_index)
    }

    /// A String constant for the Utf8 constant at `string_index`.
    pub fn string_at(&mut self, string_index: u16) -> u16 {
        let mut bytes = vec![0x08];
        bytes.extend_from_slice(&string_index.to_be_bytes());
        self.push_constant(&bytes, 1)
    }

    pub fn implements(&mut self, name: &str) -> &mut Self {
        let index = self.class(name);
        self.interfaces.push(index);
        self
    }

    pub fn field(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: Vec<Vec<u8>>,
    ) -> &mut Self {
        let member = self.member(access_flags, name, descriptor, attributes);
        self.fields.push(member);
        self
    }

    pub fn method(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: Vec<Vec<u8>>,
    ) -> &mut Self {
        let member = self.member(access_flags, name, descriptor, attributes);
        self.methods.push(member);
        self
    }

    fn member(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: Vec<Vec<u8>>,
    ) -> Vec<u8> {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&access_flags.to_be_bytes());
        bytes.extend_from_slice(&name_index.to_be_bytes());
        bytes.extend_from_slice(&descriptor_index.to_be_bytes());
        bytes.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
        for attribute in attributes {
            bytes.extend_from_slice(&attribute);
        }
        bytes
    }

    pub fn class_attribute(&mut self, attribute: Vec<u8>) -> &mut Self {
        self.attributes.push(attribute);
        self
    }

    /// Any attribute: name, length and the body verbatim.
    pub fn attribute(&mut self, name: &str, body: &[u8]) -> Vec<u8> {
        let name_index = self.utf8(name);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&name_index.to_be_bytes());
        bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    pub fn source_file(&mut self, file_name: &str) -> Vec<u8> {
        let index = self.utf8(file_name);
        self.attribute("SourceFile", &index.to_be_bytes())
    }

    pub fn constant_value(&mut self, index: u16) -> Vec<u8> {
        self.attribute("ConstantValue", &index.to_be_bytes())
    }

    pub fn exceptions(&mut self, class_names: &[&str]) -> Vec<u8> {
        let mut body = (class_names.len() as u16).to_be_bytes().to_vec();
        for name in class_names {
            body.extend_from_slice(&self.class(name).to_be_bytes());
        }
        self.attribute("Exceptions", &body)
    }

    /// `handlers` are (start_pc, end_pc, handler_pc, catch_type) tuples.
    pub fn code(
        &mut self,
        max_stack: u16,
        max_locals: u16,
        code: &[u8],
        handlers: &[(u16, u16, u16, u16)],
        attributes: Vec<Vec<u8>>,
    ) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&max_stack.to_be_bytes());
        body.extend_from_slice(&max_locals.to_be_bytes());
        body.extend_from_slice(&(code.len() as u32).to_be_bytes());
        body.extend_from_slice(code);
        body.extend_from_slice(&(handlers.len() as u16).to_be_bytes());
        for (start_pc, end_pc, handler_pc, catch_type) in handlers {
            body.extend_from_slice(&start_pc.to_be_bytes());
            body.extend_from_slice(&end_pc.to_be_bytes());
            body.extend_from_slice(&handler_pc.to_be_bytes());
            body.extend_from_slice(&catch_type.to_be_bytes());
        }
        body.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
        for attribute in attributes {
            body.extend_from_slice(&attribute);
        }
        self.attribute("Code", &body)
    }

    /// `entries` are (start_pc, line_number) pairs.
    pub fn line_number_table(&mut self, entries: &[(u16, u16)]) -> Vec<u8> {
        let mut body = (entries.len() as u16).to_be_bytes().to_vec();
        for (start_pc, line_number) in entries {
            body.extend_from_slice(&start_pc.to_be_bytes());
            body.extend_from_slice(&line_number.to_be_bytes());
        }
        self.attribute("LineNumberTable", &body)
    }

    /// `entries` are (start_pc, length, name, descriptor, slot) tuples.
    pub fn local_variable_table(&mut self, entries: &[(u16, u16, &str, &str, u16)]) -> Vec<u8> {
        let mut body = (entries.len() as u16).to_be_bytes().to_vec();
        for (start_pc, length, name, descriptor, slot) in entries {
            let name_index = self.utf8(name);
            let descriptor_index = self.utf8(descriptor);
            body.extend_from_slice(&start_pc.to_be_bytes());
            body.extend_from_slice(&length.to_be_bytes());
            body.extend_from_slice(&name_index.to_be_bytes());
            body.extend_from_slice(&descriptor_index.to_be_bytes());
            body.extend_from_slice(&slot.to_be_bytes());
        }
        self.attribute("LocalVariableTable", &body)
    }

    /// Usable constant pool indices, ascending.
    pub fn constant_indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = vec![0xca, 0xfe, 0xba, 0xbe, 0x00, 0x00, 0x00, 0x34];
        bytes.extend_from_slice(&self.next_index.to_be_bytes());
        bytes.extend_from_slice(&self.constants);
        bytes.extend_from_slice(&self.access_flags.to_be_bytes());
        bytes.extend_from_slice(&self.this_class.to_be_bytes());
        bytes.extend_from_slice(&self.super_class.to_be_bytes());
        bytes.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for interface in &self.interfaces {
            bytes.extend_from_slice(&interface.to_be_bytes());
        }
        for members in [&self.fields, &self.methods, &self.attributes] {
            bytes.extend_from_slice(&(members.len() as u16).to_be_bytes());
            for member in members {
                bytes.extend_from_slice(member);
            }
        }
        bytes
    }
}

/// `my/MyClass`:
///
/// ```java
/// package my;
///
/// public class MyClass {
///     private final int myField = 7;
///
///     public MyClass() { super(); }
///
///     public float add(int i) throws java.io.IOException {
///         try { ... } catch (IOException e) { ... }
///     }
/// }
/// ```
pub fn my_class() -> ClassBuilder {
    let mut builder = ClassBuilder::new("my/MyClass", Some("java/lang/Object"));

    let seven = builder.integer(7);
    let constant_value = builder.constant_value(seven);
    builder.field(ACC_PRIVATE | ACC_FINAL, "myField", "I", vec![constant_value]);

    let line_numbers = builder.line_number_table(&[(0, 3)]);
    let init = builder.code(1, 1, &[0x2a, 0xb7, 0x00, 0x01, 0xb1], &[], vec![line_numbers]);
    builder.method(ACC_PUBLIC, "<init>", "()V", vec![init]);

    let io_exception = builder.class("java/io/IOException");
    let line_numbers = builder.line_number_table(&[(0, 1), (5, 2), (10, 3)]);
    let local_variables = builder.local_variable_table(&[
        (0, 12, "this", "Lmy/MyClass;", 0),
        (0, 12, "i", "I", 1),
    ]);
    let add = builder.code(
        2,
        3,
        &[
            0x1b, 0x86, 0xae, 0x4d, 0x0b, 0xae, 0x4d, 0x0b, 0xae, 0x4d, 0x0b, 0xae,
        ],
        &[(0, 4, 5, io_exception), (0, 4, 8, 0)],
        vec![line_numbers, local_variables],
    );
    let exceptions = builder.exceptions(&["java/io/IOException"]);
    builder.method(ACC_PUBLIC, "add", "(I)F", vec![add, exceptions]);

    let source_file = builder.source_file("MyClass.java");
    builder.class_attribute(source_file);
    builder
}
