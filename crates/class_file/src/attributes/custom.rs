use std::{
    any::Any,
    fmt,
    io::{Cursor, Write},
};

use crate::{constant_pool::ConstantPool, Result};

/// Attribute kind decoded by an [`AttributeReader`] registered in a
/// [`ParserContext`](crate::ParserContext).
pub trait CustomAttribute: fmt::Debug + Send + Sync {
    /// Attribute name as stored in the constant pool
    fn name(&self) -> &str;

    /// Size of the body written by `write_body`.
    fn body_length(&self) -> u32;

    fn write_body(&self, writer: &mut dyn Write) -> std::io::Result<()>;

    fn box_clone(&self) -> Box<dyn CustomAttribute>;

    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn CustomAttribute> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Decodes the body of attributes that are not built into this crate.
///
/// `input` holds exactly `length` bytes. A reader has to consume all of them
/// and return an attribute whose `body_length` is `length`; anything else
/// fails the parse.
pub trait AttributeReader: Send + Sync {
    fn read(
        &self,
        name_index: u16,
        length: u32,
        input: &mut Cursor<&[u8]>,
        constant_pool: &ConstantPool,
    ) -> Result<Box<dyn CustomAttribute>>;
}

impl<F> AttributeReader for F
where
    F: Fn(u16, u32, &mut Cursor<&[u8]>, &ConstantPool) -> Result<Box<dyn CustomAttribute>>
        + Send
        + Sync,
{
    fn read(
        &self,
        name_index: u16,
        length: u32,
        input: &mut Cursor<&[u8]>,
        constant_pool: &ConstantPool,
    ) -> Result<Box<dyn CustomAttribute>> {
        self(name_index, length, input, constant_pool)
    }
}
