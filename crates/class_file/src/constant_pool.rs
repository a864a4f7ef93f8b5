use std::{fmt, ops::Index, sync::Arc};

use byteorder::WriteBytesExt;

use crate::{mutf8, serialize::Serialize, ClassFileError, Result};

#[macro_export]
macro_rules! matches_cp_info {
    ($cp:expr, $index:expr, $i:ident) => {
        match $cp.get($index)? {
            $crate::constant_pool::CpInfo::$i(ref n) => Ok(n),
            c => Err($crate::ClassFileError::UnexpectedConstantPoolEntry(
                stringify!($i),
                c.clone(),
            )),
        }
    };
}

/// Shared, read-only handle on the constant pool of a class.
///
/// Every structure that resolves indices holds one of these. Only the owning
/// [`JavaClass`](crate::JavaClass) may replace the pool, and when it does it
/// rebinds every nested handle.
pub type ConstantPoolRef = Arc<ConstantPool>;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConstantPool {
    cp_infos: Vec<CpInfo>,
}
impl ConstantPool {
    pub fn new(cp_infos: Vec<CpInfo>) -> Self {
        Self { cp_infos }
    }

    /// Value of the `constant_pool_count` item, one more than the number of slots.
    pub fn count(&self) -> u16 {
        self.cp_infos.len() as u16 + 1
    }

    pub fn get(&self, index: u16) -> Result<&CpInfo> {
        match index
            .checked_sub(1)
            .and_then(|i| self.cp_infos.get(i as usize))
        {
            None | Some(CpInfo::Unusable) => Err(ClassFileError::InvalidConstantPoolIndex(index)),
            Some(cp_info) => Ok(cp_info),
        }
    }

    pub fn get_tagged(&self, index: u16, expected: ConstantTag) -> Result<&CpInfo> {
        let cp_info = self.get(index)?;
        if cp_info.tag() == Some(expected) {
            Ok(cp_info)
        } else {
            Err(ClassFileError::UnexpectedConstantPoolEntry(
                expected.name(),
                cp_info.clone(),
            ))
        }
    }

    pub fn get_utf8(&self, index: u16) -> Result<&str> {
        matches_cp_info!(self, index, Utf8).map(Utf8Info::as_str)
    }

    /// Resolves a `CONSTANT_Class_info` to its name in internal form.
    pub fn get_class_name(&self, index: u16) -> Result<&str> {
        let ClassInfo { name_index } = matches_cp_info!(self, index, Class)?;
        self.get_utf8(*name_index)
    }

    pub fn get_name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        let NameAndTypeInfo {
            name_index,
            descriptor_index,
        } = matches_cp_info!(self, index, NameAndType)?;
        Ok((self.get_utf8(*name_index)?, self.get_utf8(*descriptor_index)?))
    }

    /// Human readable rendering of a constant, resolving the indices it refers to.
    pub fn constant_to_string(&self, index: u16) -> Result<String> {
        Ok(match self.get(index)? {
            CpInfo::Utf8(s) => s.as_str().to_owned(),
            CpInfo::Integer(i) => i.to_string(),
            CpInfo::Float(f) => format!("{f}f"),
            CpInfo::Long(l) => format!("{l}L"),
            CpInfo::Double(d) => format!("{d}d"),
            CpInfo::Class(_) => compact_class_name(self.get_class_name(index)?),
            CpInfo::String { string_index } => format!("{:?}", self.get_utf8(*string_index)?),
            CpInfo::FieldRef(r) | CpInfo::MethodRef(r) | CpInfo::InterfaceMethodRef(r) => {
                let (name, descriptor) = self.get_name_and_type(r.name_and_type_index)?;
                format!(
                    "{}.{} {}",
                    compact_class_name(self.get_class_name(r.class_index)?),
                    name,
                    descriptor
                )
            }
            CpInfo::NameAndType(_) => {
                let (name, descriptor) = self.get_name_and_type(index)?;
                format!("{name} {descriptor}")
            }
            CpInfo::MethodHandle(h) => format!(
                "{}:{}",
                h.reference_kind,
                self.constant_to_string(h.reference_index)?
            ),
            CpInfo::MethodType(t) => self.get_utf8(t.descriptor_index)?.to_owned(),
            CpInfo::Dynamic(d) | CpInfo::InvokeDynamic(d) => {
                let (name, descriptor) = self.get_name_and_type(d.name_and_type_index)?;
                format!("#{}:{} {}", d.bootstrap_method_attr_index, name, descriptor)
            }
            CpInfo::Module { name_index } | CpInfo::Package { name_index } => {
                self.get_utf8(*name_index)?.to_owned()
            }
            CpInfo::Unusable => return Err(ClassFileError::InvalidConstantPoolIndex(index)),
        })
    }

    /// Usable entries in ascending index order. Index 0 and the upper slot of
    /// `Long`/`Double` entries are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &CpInfo)> {
        self.cp_infos
            .iter()
            .enumerate()
            .filter(|(_, cp_info)| **cp_info != CpInfo::Unusable)
            .map(|(i, cp_info)| (i as u16 + 1, cp_info))
    }

    /// Appends an entry and returns its index.
    pub fn add(&mut self, cp_info: CpInfo) -> u16 {
        let index = self.count();
        let wide = matches!(cp_info, CpInfo::Long(_) | CpInfo::Double(_));
        self.cp_infos.push(cp_info);
        if wide {
            self.cp_infos.push(CpInfo::Unusable);
        }
        index
    }

    pub fn lookup_utf8(&self, value: &str) -> Option<u16> {
        let bytes = mutf8::encode(value);
        self.iter()
            .find(|(_, cp_info)| matches!(cp_info, CpInfo::Utf8(s) if s.as_bytes() == &bytes[..]))
            .map(|(index, _)| index)
    }

    pub fn add_utf8(&mut self, value: &str) -> u16 {
        self.lookup_utf8(value)
            .unwrap_or_else(|| self.add(CpInfo::Utf8(value.into())))
    }

    /// Looks up a class entry by its name in internal form.
    pub fn lookup_class(&self, internal_name: &str) -> Option<u16> {
        self.iter()
            .find(|(_, cp_info)| match cp_info {
                CpInfo::Class(ClassInfo { name_index }) => {
                    self.get_utf8(*name_index).ok() == Some(internal_name)
                }
                _ => false,
            })
            .map(|(index, _)| index)
    }

    pub fn add_class(&mut self, internal_name: &str) -> u16 {
        if let Some(index) = self.lookup_class(internal_name) {
            return index;
        }
        let name_index = self.add_utf8(internal_name);
        self.add(CpInfo::Class(ClassInfo { name_index }))
    }
}
impl Index<u16> for ConstantPool {
    type Output = CpInfo;

    fn index(&self, index: u16) -> &Self::Output {
        &self.cp_infos[index as usize - 1]
    }
}
impl<'a> IntoIterator for &'a ConstantPool {
    type Item = &'a CpInfo;
    type IntoIter = std::slice::Iter<'a, CpInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.cp_infos.iter()
    }
}
impl Serialize for ConstantPool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.count().serialize(writer)?;
        for cp_info in &self.cp_infos {
            cp_info.serialize(writer)?;
        }
        Ok(())
    }
}

/// `java/lang/Object` becomes `java.lang.Object`.
pub fn compact_class_name(internal_name: &str) -> String {
    internal_name.replace('/', ".")
}

/// `java.lang.Object` becomes `java/lang/Object`.
pub fn internal_class_name(class_name: &str) -> String {
    class_name.replace('.', "/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConstantTag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
}
impl ConstantTag {
    pub fn name(self) -> &'static str {
        match self {
            ConstantTag::Utf8 => "Utf8",
            ConstantTag::Integer => "Integer",
            ConstantTag::Float => "Float",
            ConstantTag::Long => "Long",
            ConstantTag::Double => "Double",
            ConstantTag::Class => "Class",
            ConstantTag::String => "String",
            ConstantTag::FieldRef => "FieldRef",
            ConstantTag::MethodRef => "MethodRef",
            ConstantTag::InterfaceMethodRef => "InterfaceMethodRef",
            ConstantTag::NameAndType => "NameAndType",
            ConstantTag::MethodHandle => "MethodHandle",
            ConstantTag::MethodType => "MethodType",
            ConstantTag::Dynamic => "Dynamic",
            ConstantTag::InvokeDynamic => "InvokeDynamic",
            ConstantTag::Module => "Module",
            ConstantTag::Package => "Package",
        }
    }
}
impl TryFrom<u8> for ConstantTag {
    type Error = ClassFileError;

    fn try_from(tag: u8) -> Result<Self> {
        Ok(match tag {
            1 => ConstantTag::Utf8,
            3 => ConstantTag::Integer,
            4 => ConstantTag::Float,
            5 => ConstantTag::Long,
            6 => ConstantTag::Double,
            7 => ConstantTag::Class,
            8 => ConstantTag::String,
            9 => ConstantTag::FieldRef,
            10 => ConstantTag::MethodRef,
            11 => ConstantTag::InterfaceMethodRef,
            12 => ConstantTag::NameAndType,
            15 => ConstantTag::MethodHandle,
            16 => ConstantTag::MethodType,
            17 => ConstantTag::Dynamic,
            18 => ConstantTag::InvokeDynamic,
            19 => ConstantTag::Module,
            20 => ConstantTag::Package,
            _ => return Err(ClassFileError::InvalidCpInfoTag(tag)),
        })
    }
}
impl fmt::Display for ConstantTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The value of a `CONSTANT_Utf8_info`.
///
/// The bytes are kept as they were read and written back unchanged, so a
/// class round trips even when its strings are not in canonical form.
/// `as_str` is the decoded view of them.
#[derive(PartialEq, Clone)]
pub struct Utf8Info {
    bytes: Vec<u8>,
    value: String,
}
impl Utf8Info {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let value = mutf8::decode(&bytes)?.into_owned();
        Ok(Utf8Info { bytes, value })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The modified UTF-8 bytes, as stored in the class file.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
impl From<&str> for Utf8Info {
    fn from(value: &str) -> Self {
        Utf8Info {
            bytes: mutf8::encode(value).into_owned(),
            value: value.to_owned(),
        }
    }
}
impl fmt::Debug for Utf8Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.value, f)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum CpInfo {
    Utf8(Utf8Info),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(ClassInfo),
    String { string_index: u16 },
    FieldRef(RefInfo),
    MethodRef(RefInfo),
    InterfaceMethodRef(RefInfo),
    NameAndType(NameAndTypeInfo),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    Dynamic(InvokeDynamicInfo),
    InvokeDynamic(InvokeDynamicInfo),
    Module { name_index: u16 },
    Package { name_index: u16 },
    Unusable,
}
impl CpInfo {
    pub fn tag(&self) -> Option<ConstantTag> {
        Some(match self {
            CpInfo::Utf8(_) => ConstantTag::Utf8,
            CpInfo::Integer(_) => ConstantTag::Integer,
            CpInfo::Float(_) => ConstantTag::Float,
            CpInfo::Long(_) => ConstantTag::Long,
            CpInfo::Double(_) => ConstantTag::Double,
            CpInfo::Class(_) => ConstantTag::Class,
            CpInfo::String { .. } => ConstantTag::String,
            CpInfo::FieldRef(_) => ConstantTag::FieldRef,
            CpInfo::MethodRef(_) => ConstantTag::MethodRef,
            CpInfo::InterfaceMethodRef(_) => ConstantTag::InterfaceMethodRef,
            CpInfo::NameAndType(_) => ConstantTag::NameAndType,
            CpInfo::MethodHandle(_) => ConstantTag::MethodHandle,
            CpInfo::MethodType(_) => ConstantTag::MethodType,
            CpInfo::Dynamic(_) => ConstantTag::Dynamic,
            CpInfo::InvokeDynamic(_) => ConstantTag::InvokeDynamic,
            CpInfo::Module { .. } => ConstantTag::Module,
            CpInfo::Package { .. } => ConstantTag::Package,
            CpInfo::Unusable => return None,
        })
    }
}
impl Serialize for CpInfo {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        let Some(tag) = self.tag() else {
            return Ok(());
        };
        (tag as u8).serialize(writer)?;

        match self {
            CpInfo::Utf8(s) => {
                let bytes = s.as_bytes();
                (bytes.len() as u16).serialize(writer)?;
                writer.write_all(bytes)
            }
            CpInfo::Integer(i) => i.serialize(writer),
            CpInfo::Float(f) => f.to_bits().serialize(writer),
            CpInfo::Long(l) => l.serialize(writer),
            CpInfo::Double(d) => (d.to_bits() as i64).serialize(writer),
            CpInfo::Class(ClassInfo { name_index }) => name_index.serialize(writer),
            CpInfo::String { string_index } => string_index.serialize(writer),
            CpInfo::FieldRef(r) | CpInfo::MethodRef(r) | CpInfo::InterfaceMethodRef(r) => {
                r.class_index.serialize(writer)?;
                r.name_and_type_index.serialize(writer)
            }
            CpInfo::NameAndType(n) => {
                n.name_index.serialize(writer)?;
                n.descriptor_index.serialize(writer)
            }
            CpInfo::MethodHandle(h) => {
                h.reference_kind.serialize(writer)?;
                h.reference_index.serialize(writer)
            }
            CpInfo::MethodType(t) => t.descriptor_index.serialize(writer),
            CpInfo::Dynamic(d) | CpInfo::InvokeDynamic(d) => {
                d.bootstrap_method_attr_index.serialize(writer)?;
                d.name_and_type_index.serialize(writer)
            }
            CpInfo::Module { name_index } | CpInfo::Package { name_index } => {
                name_index.serialize(writer)
            }
            CpInfo::Unusable => Ok(()),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ClassInfo {
    // The constant_pool entry at name_index must be a CONSTANT_Utf8_info structure
    // representing a valid binary class or interface name encoded in internal form.
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct InvokeDynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}
