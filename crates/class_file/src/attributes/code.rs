use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::{
    find_attribute, read_attributes, Attribute, AttributeInfo, AttributeTag, LineNumberTable,
    LocalVariableTable,
};
use crate::{
    constant_pool::{ConstantPool, ConstantPoolRef},
    serialize::Serialize,
    ParserContext, Result,
};

/// Size of the fixed part of a `Code` body: max_stack, max_locals,
/// code_length, exception_table_length and attributes_count.
const CODE_HEADER_SIZE: u32 = 2 + 2 + 4 + 2 + 2;

/// Bytecode of a method together with its exception handlers and the
/// attributes nested inside it (line numbers, local variables, ...).
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html#jvms-4.7.3
#[derive(Debug, Clone)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<CodeException>,
    pub attributes: Vec<Attribute>,
}
impl Code {
    pub(super) fn read<R: Read>(
        r: &mut R,
        constant_pool: &ConstantPoolRef,
        context: &ParserContext,
    ) -> Result<Self> {
        let max_stack = r.read_u16::<BigEndian>()?;
        let max_locals = r.read_u16::<BigEndian>()?;
        let code_length = r.read_u32::<BigEndian>()?;
        let mut code = Vec::new();
        r.by_ref().take(code_length as u64).read_to_end(&mut code)?;
        if code.len() != code_length as usize {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }

        let exception_table_length = r.read_u16::<BigEndian>()?;
        let exception_table = (0..exception_table_length)
            .map(|_| CodeException::read(r))
            .collect::<Result<Vec<_>>>()?;
        let attributes = read_attributes(r, constant_pool, context)?;

        Ok(Code {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    /// Body length derived from the contents: the fixed header, the bytecode,
    /// 8 bytes per handler and every nested attribute with its 6 byte header.
    pub fn body_length(&self) -> u32 {
        CODE_HEADER_SIZE
            + self.code.len() as u32
            + 8 * self.exception_table.len() as u32
            + self
                .attributes
                .iter()
                .map(|a| 6 + a.info().body_length())
                .sum::<u32>()
    }

    pub fn line_number_table(&self) -> Option<&LineNumberTable> {
        match find_attribute(&self.attributes, AttributeTag::LineNumberTable)?.info() {
            AttributeInfo::LineNumberTable(table) => Some(table),
            _ => None,
        }
    }

    pub fn local_variable_table(&self) -> Option<&LocalVariableTable> {
        match find_attribute(&self.attributes, AttributeTag::LocalVariableTable)?.info() {
            AttributeInfo::LocalVariableTable(table) => Some(table),
            _ => None,
        }
    }

    pub fn local_variable_type_table(&self) -> Option<&LocalVariableTable> {
        match find_attribute(&self.attributes, AttributeTag::LocalVariableTypeTable)?.info() {
            AttributeInfo::LocalVariableTypeTable(table) => Some(table),
            _ => None,
        }
    }

    /// Deep copy with every nested attribute bound to `constant_pool`.
    pub fn copy(&self, constant_pool: &ConstantPoolRef) -> Code {
        Code {
            max_stack: self.max_stack,
            max_locals: self.max_locals,
            code: self.code.clone(),
            exception_table: self.exception_table.clone(),
            attributes: self
                .attributes
                .iter()
                .map(|a| a.copy(constant_pool))
                .collect(),
        }
    }

    pub(super) fn rebind(&mut self, constant_pool: &ConstantPoolRef) {
        for attribute in &mut self.attributes {
            attribute.rebind(constant_pool);
        }
    }
}
impl Serialize for Code {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.max_stack.serialize(writer)?;
        self.max_locals.serialize(writer)?;
        (self.code.len() as u32).serialize(writer)?;
        writer.write_all(&self.code)?;
        self.exception_table.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

/// One entry of the exception table of a `Code` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeException {
    /// Start of the protected range (inclusive)
    pub start_pc: u16,
    /// End of the protected range (exclusive)
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Class constant of the caught type, 0 catches everything
    pub catch_type: u16,
}
impl CodeException {
    fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(CodeException {
            start_pc: r.read_u16::<BigEndian>()?,
            end_pc: r.read_u16::<BigEndian>()?,
            handler_pc: r.read_u16::<BigEndian>()?,
            catch_type: r.read_u16::<BigEndian>()?,
        })
    }

    /// Name of the caught class in internal form, `None` for a catch-all handler.
    pub fn catch_type_name<'a>(&self, constant_pool: &'a ConstantPool) -> Result<Option<&'a str>> {
        if self.catch_type == 0 {
            return Ok(None);
        }
        constant_pool.get_class_name(self.catch_type).map(Some)
    }
}
impl Serialize for CodeException {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.end_pc.serialize(writer)?;
        self.handler_pc.serialize(writer)?;
        self.catch_type.serialize(writer)?;
        Ok(())
    }
}
