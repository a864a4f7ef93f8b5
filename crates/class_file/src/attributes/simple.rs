use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{constant_pool::ConstantPool, serialize::Serialize, AccessFlags, Result};

fn read_u16s<R: Read>(r: &mut R) -> Result<Vec<u16>> {
    let length = r.read_u16::<BigEndian>()?;
    let mut values = vec![0u16; length as usize];
    r.read_u16_into::<BigEndian>(&mut values)?;
    Ok(values)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub sourcefile_index: u16,
}
impl SourceFile {
    pub(super) fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(SourceFile {
            sourcefile_index: r.read_u16::<BigEndian>()?,
        })
    }

    pub fn source_file_name<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a str> {
        constant_pool.get_utf8(self.sourcefile_index)
    }
}
impl Serialize for SourceFile {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.sourcefile_index.serialize(writer)
    }
}

/// Initial value of a static field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantValue {
    pub constantvalue_index: u16,
}
impl ConstantValue {
    pub(super) fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(ConstantValue {
            constantvalue_index: r.read_u16::<BigEndian>()?,
        })
    }
}
impl Serialize for ConstantValue {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.constantvalue_index.serialize(writer)
    }
}

/// Checked exceptions a method declares (the `Exceptions` attribute).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionTable {
    pub exception_index_table: Vec<u16>,
}
impl ExceptionTable {
    pub(super) fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(ExceptionTable {
            exception_index_table: read_u16s(r)?,
        })
    }

    pub fn exception_names<'a>(&self, constant_pool: &'a ConstantPool) -> Result<Vec<&'a str>> {
        self.exception_index_table
            .iter()
            .map(|&index| constant_pool.get_class_name(index))
            .collect()
    }
}
impl Serialize for ExceptionTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.exception_index_table.serialize(writer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InnerClasses {
    pub classes: Vec<InnerClass>,
}
impl InnerClasses {
    pub(super) fn read<R: Read>(r: &mut R) -> Result<Self> {
        let length = r.read_u16::<BigEndian>()?;
        let classes = (0..length)
            .map(|_| InnerClass::read(r))
            .collect::<Result<Vec<_>>>()?;
        Ok(InnerClasses { classes })
    }
}
impl Serialize for InnerClasses {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.classes.serialize(writer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerClass {
    pub inner_class_info_index: u16,
    /// 0 for local and anonymous classes
    pub outer_class_info_index: u16,
    /// 0 for anonymous classes
    pub inner_name_index: u16,
    pub inner_access_flags: AccessFlags,
}
impl InnerClass {
    fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(InnerClass {
            inner_class_info_index: r.read_u16::<BigEndian>()?,
            outer_class_info_index: r.read_u16::<BigEndian>()?,
            inner_name_index: r.read_u16::<BigEndian>()?,
            inner_access_flags: AccessFlags::from_bits_truncate(r.read_u16::<BigEndian>()?),
        })
    }
}
impl Serialize for InnerClass {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.inner_class_info_index.serialize(writer)?;
        self.outer_class_info_index.serialize(writer)?;
        self.inner_name_index.serialize(writer)?;
        self.inner_access_flags.bits().serialize(writer)
    }
}

/// Marker attribute. The body is normally empty but is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Synthetic {
    pub bytes: Vec<u8>,
}

/// Marker attribute. The body is normally empty but is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deprecated {
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub signature_index: u16,
}
impl Signature {
    pub(super) fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Signature {
            signature_index: r.read_u16::<BigEndian>()?,
        })
    }

    pub fn signature<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a str> {
        constant_pool.get_utf8(self.signature_index)
    }
}
impl Serialize for Signature {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.signature_index.serialize(writer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclosingMethod {
    pub class_index: u16,
    /// 0 when the class is not enclosed by a method or constructor
    pub method_index: u16,
}
impl EnclosingMethod {
    pub(super) fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(EnclosingMethod {
            class_index: r.read_u16::<BigEndian>()?,
            method_index: r.read_u16::<BigEndian>()?,
        })
    }
}
impl Serialize for EnclosingMethod {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.class_index.serialize(writer)?;
        self.method_index.serialize(writer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestHost {
    pub host_class_index: u16,
}
impl NestHost {
    pub(super) fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(NestHost {
            host_class_index: r.read_u16::<BigEndian>()?,
        })
    }
}
impl Serialize for NestHost {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.host_class_index.serialize(writer)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NestMembers {
    pub classes: Vec<u16>,
}
impl NestMembers {
    pub(super) fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(NestMembers {
            classes: read_u16s(r)?,
        })
    }
}
impl Serialize for NestMembers {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.classes.serialize(writer)
    }
}

/// Body of an attribute nobody knows how to decode, kept byte for byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unknown {
    pub bytes: Vec<u8>,
}
