mod code;
mod custom;
mod line_number_table;
mod local_variable_table;
mod simple;

use std::{
    fmt,
    io::{Cursor, Read},
};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    constant_pool::ConstantPoolRef, serialize::Serialize, ClassFileError, ParserContext, Result,
};

pub use code::{Code, CodeException};
pub use custom::{AttributeReader, CustomAttribute};
pub use line_number_table::{LineNumber, LineNumberTable};
pub use local_variable_table::{LocalVariable, LocalVariableTable};
pub use simple::{
    ConstantValue, Deprecated, EnclosingMethod, ExceptionTable, InnerClass, InnerClasses,
    NestHost, NestMembers, Signature, SourceFile, Synthetic, Unknown,
};

/// Attribute kinds this crate decodes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeTag {
    SourceFile,
    ConstantValue,
    Code,
    Exceptions,
    LineNumberTable,
    LocalVariableTable,
    LocalVariableTypeTable,
    InnerClasses,
    Synthetic,
    Deprecated,
    Signature,
    EnclosingMethod,
    NestHost,
    NestMembers,
    Unknown,
}
impl AttributeTag {
    pub fn from_name(name: &str) -> Self {
        match name {
            "SourceFile" => AttributeTag::SourceFile,
            "ConstantValue" => AttributeTag::ConstantValue,
            "Code" => AttributeTag::Code,
            "Exceptions" => AttributeTag::Exceptions,
            "LineNumberTable" => AttributeTag::LineNumberTable,
            "LocalVariableTable" => AttributeTag::LocalVariableTable,
            "LocalVariableTypeTable" => AttributeTag::LocalVariableTypeTable,
            "InnerClasses" => AttributeTag::InnerClasses,
            "Synthetic" => AttributeTag::Synthetic,
            "Deprecated" => AttributeTag::Deprecated,
            "Signature" => AttributeTag::Signature,
            "EnclosingMethod" => AttributeTag::EnclosingMethod,
            "NestHost" => AttributeTag::NestHost,
            "NestMembers" => AttributeTag::NestMembers,
            _ => AttributeTag::Unknown,
        }
    }

    /// The attribute name as it appears in the constant pool, `None` for `Unknown`.
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            AttributeTag::SourceFile => "SourceFile",
            AttributeTag::ConstantValue => "ConstantValue",
            AttributeTag::Code => "Code",
            AttributeTag::Exceptions => "Exceptions",
            AttributeTag::LineNumberTable => "LineNumberTable",
            AttributeTag::LocalVariableTable => "LocalVariableTable",
            AttributeTag::LocalVariableTypeTable => "LocalVariableTypeTable",
            AttributeTag::InnerClasses => "InnerClasses",
            AttributeTag::Synthetic => "Synthetic",
            AttributeTag::Deprecated => "Deprecated",
            AttributeTag::Signature => "Signature",
            AttributeTag::EnclosingMethod => "EnclosingMethod",
            AttributeTag::NestHost => "NestHost",
            AttributeTag::NestMembers => "NestMembers",
            AttributeTag::Unknown => return None,
        })
    }
}

/// Decoded body of an attribute.
#[derive(Debug, Clone)]
pub enum AttributeInfo {
    SourceFile(SourceFile),
    ConstantValue(ConstantValue),
    Code(Code),
    Exceptions(ExceptionTable),
    LineNumberTable(LineNumberTable),
    LocalVariableTable(LocalVariableTable),
    LocalVariableTypeTable(LocalVariableTable),
    InnerClasses(InnerClasses),
    Synthetic(Synthetic),
    Deprecated(Deprecated),
    Signature(Signature),
    EnclosingMethod(EnclosingMethod),
    NestHost(NestHost),
    NestMembers(NestMembers),
    /// Produced by a reader registered in the [`ParserContext`].
    Custom(Box<dyn CustomAttribute>),
    Unknown(Unknown),
}
impl AttributeInfo {
    pub fn tag(&self) -> AttributeTag {
        match self {
            AttributeInfo::SourceFile(_) => AttributeTag::SourceFile,
            AttributeInfo::ConstantValue(_) => AttributeTag::ConstantValue,
            AttributeInfo::Code(_) => AttributeTag::Code,
            AttributeInfo::Exceptions(_) => AttributeTag::Exceptions,
            AttributeInfo::LineNumberTable(_) => AttributeTag::LineNumberTable,
            AttributeInfo::LocalVariableTable(_) => AttributeTag::LocalVariableTable,
            AttributeInfo::LocalVariableTypeTable(_) => AttributeTag::LocalVariableTypeTable,
            AttributeInfo::InnerClasses(_) => AttributeTag::InnerClasses,
            AttributeInfo::Synthetic(_) => AttributeTag::Synthetic,
            AttributeInfo::Deprecated(_) => AttributeTag::Deprecated,
            AttributeInfo::Signature(_) => AttributeTag::Signature,
            AttributeInfo::EnclosingMethod(_) => AttributeTag::EnclosingMethod,
            AttributeInfo::NestHost(_) => AttributeTag::NestHost,
            AttributeInfo::NestMembers(_) => AttributeTag::NestMembers,
            AttributeInfo::Custom(_) | AttributeInfo::Unknown(_) => AttributeTag::Unknown,
        }
    }

    /// Size of the serialized body, excluding the 6 byte attribute header.
    pub fn body_length(&self) -> u32 {
        match self {
            AttributeInfo::SourceFile(_)
            | AttributeInfo::ConstantValue(_)
            | AttributeInfo::Signature(_)
            | AttributeInfo::NestHost(_) => 2,
            AttributeInfo::EnclosingMethod(_) => 4,
            AttributeInfo::Code(code) => code.body_length(),
            AttributeInfo::Exceptions(e) => 2 + 2 * e.exception_index_table.len() as u32,
            AttributeInfo::LineNumberTable(t) => t.body_length(),
            AttributeInfo::LocalVariableTable(t) | AttributeInfo::LocalVariableTypeTable(t) => {
                t.body_length()
            }
            AttributeInfo::InnerClasses(c) => 2 + 8 * c.classes.len() as u32,
            AttributeInfo::Synthetic(Synthetic { bytes })
            | AttributeInfo::Deprecated(Deprecated { bytes })
            | AttributeInfo::Unknown(Unknown { bytes }) => bytes.len() as u32,
            AttributeInfo::NestMembers(n) => 2 + 2 * n.classes.len() as u32,
            AttributeInfo::Custom(custom) => custom.body_length(),
        }
    }

    pub fn as_code(&self) -> Option<&Code> {
        match self {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        }
    }

    pub fn as_code_mut(&mut self) -> Option<&mut Code> {
        match self {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        }
    }

    fn read<R: Read>(
        tag: AttributeTag,
        header: &AttributeHeader<'_>,
        r: &mut R,
        constant_pool: &ConstantPoolRef,
        context: &ParserContext,
    ) -> Result<Self> {
        Ok(match tag {
            AttributeTag::SourceFile => AttributeInfo::SourceFile(SourceFile::read(r)?),
            AttributeTag::ConstantValue => AttributeInfo::ConstantValue(ConstantValue::read(r)?),
            AttributeTag::Code => AttributeInfo::Code(Code::read(r, constant_pool, context)?),
            AttributeTag::Exceptions => AttributeInfo::Exceptions(ExceptionTable::read(r)?),
            AttributeTag::LineNumberTable => {
                AttributeInfo::LineNumberTable(LineNumberTable::read(r)?)
            }
            AttributeTag::LocalVariableTable => {
                AttributeInfo::LocalVariableTable(LocalVariableTable::read(r)?)
            }
            AttributeTag::LocalVariableTypeTable => {
                AttributeInfo::LocalVariableTypeTable(LocalVariableTable::read(r)?)
            }
            AttributeTag::InnerClasses => AttributeInfo::InnerClasses(InnerClasses::read(r)?),
            AttributeTag::Synthetic => AttributeInfo::Synthetic(Synthetic {
                bytes: read_remaining(r)?,
            }),
            AttributeTag::Deprecated => AttributeInfo::Deprecated(Deprecated {
                bytes: read_remaining(r)?,
            }),
            AttributeTag::Signature => AttributeInfo::Signature(Signature::read(r)?),
            AttributeTag::EnclosingMethod => {
                AttributeInfo::EnclosingMethod(EnclosingMethod::read(r)?)
            }
            AttributeTag::NestHost => AttributeInfo::NestHost(NestHost::read(r)?),
            AttributeTag::NestMembers => AttributeInfo::NestMembers(NestMembers::read(r)?),
            AttributeTag::Unknown => {
                return Err(ClassFileError::InvalidAttribute(
                    "unknown",
                    format!("{} must be read through the fallback path", header.name),
                ))
            }
        })
    }

    /// Deep copy, rebinding nested attributes to `constant_pool`.
    pub fn copy(&self, constant_pool: &ConstantPoolRef) -> Self {
        match self {
            AttributeInfo::Code(code) => AttributeInfo::Code(code.copy(constant_pool)),
            AttributeInfo::Custom(custom) => AttributeInfo::Custom(custom.box_clone()),
            info => info.clone(),
        }
    }

    fn rebind(&mut self, constant_pool: &ConstantPoolRef) {
        if let AttributeInfo::Code(code) = self {
            code.rebind(constant_pool);
        }
    }
}
impl Serialize for AttributeInfo {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            AttributeInfo::SourceFile(a) => a.serialize(writer),
            AttributeInfo::ConstantValue(a) => a.serialize(writer),
            AttributeInfo::Code(a) => a.serialize(writer),
            AttributeInfo::Exceptions(a) => a.serialize(writer),
            AttributeInfo::LineNumberTable(a) => a.serialize(writer),
            AttributeInfo::LocalVariableTable(a) | AttributeInfo::LocalVariableTypeTable(a) => {
                a.serialize(writer)
            }
            AttributeInfo::InnerClasses(a) => a.serialize(writer),
            AttributeInfo::Synthetic(Synthetic { bytes })
            | AttributeInfo::Deprecated(Deprecated { bytes })
            | AttributeInfo::Unknown(Unknown { bytes }) => writer.write_all(bytes),
            AttributeInfo::Signature(a) => a.serialize(writer),
            AttributeInfo::EnclosingMethod(a) => a.serialize(writer),
            AttributeInfo::NestHost(a) => a.serialize(writer),
            AttributeInfo::NestMembers(a) => a.serialize(writer),
            AttributeInfo::Custom(custom) => custom.write_body(writer),
        }
    }
}

struct AttributeHeader<'a> {
    name: &'a str,
    name_index: u16,
    length: u32,
}

/// An attribute of a class, field, method or `Code` attribute.
///
/// `length` is taken from the stream when parsing. Any change made through
/// [`Attribute::update`] recomputes it from the contents, and serialization
/// always writes the length of the contents.
#[derive(Clone)]
pub struct Attribute {
    name_index: u16,
    length: u32,
    info: AttributeInfo,
    constant_pool: ConstantPoolRef,
}
impl Attribute {
    pub fn new(name_index: u16, info: AttributeInfo, constant_pool: ConstantPoolRef) -> Self {
        let length = info.body_length();
        Self {
            name_index,
            length,
            info,
            constant_pool,
        }
    }

    /// Reads one attribute record: name index, length, then exactly `length`
    /// bytes of body.
    pub fn read<R: Read>(
        r: &mut R,
        constant_pool: &ConstantPoolRef,
        context: &ParserContext,
    ) -> Result<Attribute> {
        let name_index = r.read_u16::<BigEndian>()?;
        let name = constant_pool.get_utf8(name_index)?;
        let length = r.read_u32::<BigEndian>()?;

        let mut body = Vec::new();
        r.by_ref().take(length as u64).read_to_end(&mut body)?;
        if body.len() != length as usize {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }

        let header = AttributeHeader {
            name,
            name_index,
            length,
        };
        let mut cursor = Cursor::new(body.as_slice());
        let info = match AttributeTag::from_name(name) {
            AttributeTag::Unknown => Self::read_unknown(&header, &mut cursor, constant_pool, context)?,
            tag => AttributeInfo::read(tag, &header, &mut cursor, constant_pool, context)?,
        };

        if cursor.position() != length as u64 {
            return Err(ClassFileError::AttributeLengthMismatch {
                name: name.to_owned(),
                expected: length,
                actual: cursor.position(),
            });
        }

        Ok(Attribute {
            name_index,
            length,
            info,
            constant_pool: constant_pool.clone(),
        })
    }

    fn read_unknown(
        header: &AttributeHeader<'_>,
        cursor: &mut Cursor<&[u8]>,
        constant_pool: &ConstantPoolRef,
        context: &ParserContext,
    ) -> Result<AttributeInfo> {
        let Some(reader) = context.reader(header.name) else {
            log::debug!(
                "Keeping {} bytes of unknown attribute {} as raw data",
                header.length,
                header.name
            );
            return Ok(AttributeInfo::Unknown(Unknown {
                bytes: read_remaining(cursor)?,
            }));
        };

        let custom = reader.read(header.name_index, header.length, cursor, constant_pool)?;
        if custom.body_length() != header.length {
            return Err(ClassFileError::AttributeLengthMismatch {
                name: header.name.to_owned(),
                expected: header.length,
                actual: custom.body_length() as u64,
            });
        }
        Ok(AttributeInfo::Custom(custom))
    }

    pub fn name_index(&self) -> u16 {
        self.name_index
    }

    pub fn set_name_index(&mut self, name_index: u16) {
        self.name_index = name_index;
    }

    pub fn name(&self) -> Result<&str> {
        self.constant_pool.get_utf8(self.name_index)
    }

    /// Body length; see the type level documentation for when it is refreshed.
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn tag(&self) -> AttributeTag {
        self.info.tag()
    }

    pub fn info(&self) -> &AttributeInfo {
        &self.info
    }

    pub fn as_code(&self) -> Option<&Code> {
        self.info.as_code()
    }

    pub fn constant_pool(&self) -> &ConstantPoolRef {
        &self.constant_pool
    }

    /// Mutates the body, then recomputes `length` from the new contents.
    pub fn update<T>(&mut self, f: impl FnOnce(&mut AttributeInfo) -> T) -> T {
        let result = f(&mut self.info);
        self.recompute_length();
        result
    }

    pub fn recompute_length(&mut self) {
        self.length = self.info.body_length();
    }

    /// Deep copy bound to `constant_pool`.
    pub fn copy(&self, constant_pool: &ConstantPoolRef) -> Attribute {
        Attribute {
            name_index: self.name_index,
            length: self.length,
            info: self.info.copy(constant_pool),
            constant_pool: constant_pool.clone(),
        }
    }

    pub(crate) fn rebind(&mut self, constant_pool: &ConstantPoolRef) {
        self.constant_pool = constant_pool.clone();
        self.info.rebind(constant_pool);
    }
}
impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name_index", &self.name_index)
            .field("length", &self.length)
            .field("info", &self.info)
            .finish()
    }
}
impl Serialize for Attribute {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.name_index.serialize(writer)?;
        self.info.body_length().serialize(writer)?;
        self.info.serialize(writer)
    }
}

/// Reads an attribute count followed by that many attributes.
pub fn read_attributes<R: Read>(
    r: &mut R,
    constant_pool: &ConstantPoolRef,
    context: &ParserContext,
) -> Result<Vec<Attribute>> {
    let attributes_count = r.read_u16::<BigEndian>()?;
    (0..attributes_count)
        .map(|_| Attribute::read(r, constant_pool, context))
        .collect()
}

/// First attribute of the given kind.
pub fn find_attribute(attributes: &[Attribute], tag: AttributeTag) -> Option<&Attribute> {
    attributes.iter().find(|a| a.tag() == tag)
}

fn read_remaining<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    r.read_to_end(&mut bytes)?;
    Ok(bytes)
}
