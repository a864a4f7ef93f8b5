use std::{fmt, io::Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    attributes::{find_attribute, read_attributes, Attribute, AttributeTag},
    constant_pool::ConstantPoolRef,
    serialize::Serialize,
    AccessFlags, ParserContext, Result,
};

/// Layout shared by `field_info` and `method_info`.
#[derive(Clone)]
pub struct MemberInfo {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub signature_index: u16,
    pub attributes: Vec<Attribute>,
    constant_pool: ConstantPoolRef,
}
impl MemberInfo {
    pub fn new(
        access_flags: AccessFlags,
        name_index: u16,
        signature_index: u16,
        attributes: Vec<Attribute>,
        constant_pool: ConstantPoolRef,
    ) -> Self {
        Self {
            access_flags,
            name_index,
            signature_index,
            attributes,
            constant_pool,
        }
    }

    pub(crate) fn read<R: Read>(
        r: &mut R,
        constant_pool: &ConstantPoolRef,
        context: &ParserContext,
    ) -> Result<Self> {
        let access_flags = AccessFlags::from_bits_truncate(r.read_u16::<BigEndian>()?);
        let name_index = r.read_u16::<BigEndian>()?;
        let signature_index = r.read_u16::<BigEndian>()?;
        let attributes = read_attributes(r, constant_pool, context)?;

        Ok(MemberInfo {
            access_flags,
            name_index,
            signature_index,
            attributes,
            constant_pool: constant_pool.clone(),
        })
    }

    pub(crate) fn copy(&self, constant_pool: &ConstantPoolRef) -> Self {
        MemberInfo {
            access_flags: self.access_flags,
            name_index: self.name_index,
            signature_index: self.signature_index,
            attributes: self
                .attributes
                .iter()
                .map(|a| a.copy(constant_pool))
                .collect(),
            constant_pool: constant_pool.clone(),
        }
    }

    pub(crate) fn rebind(&mut self, constant_pool: &ConstantPoolRef) {
        self.constant_pool = constant_pool.clone();
        for attribute in &mut self.attributes {
            attribute.rebind(constant_pool);
        }
    }
}
impl fmt::Debug for MemberInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberInfo")
            .field("access_flags", &self.access_flags)
            .field("name_index", &self.name_index)
            .field("signature_index", &self.signature_index)
            .field("attributes", &self.attributes)
            .finish()
    }
}
impl Serialize for MemberInfo {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.access_flags.bits().serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.signature_index.serialize(writer)?;
        self.attributes.serialize(writer)
    }
}

/// Accessors common to fields and methods.
pub trait Member {
    fn info(&self) -> &MemberInfo;

    fn info_mut(&mut self) -> &mut MemberInfo;

    fn access_flags(&self) -> AccessFlags {
        self.info().access_flags
    }

    fn constant_pool(&self) -> &ConstantPoolRef {
        &self.info().constant_pool
    }

    fn name(&self) -> Result<&str> {
        self.constant_pool().get_utf8(self.info().name_index)
    }

    /// Field descriptor or method descriptor
    fn signature(&self) -> Result<&str> {
        self.constant_pool().get_utf8(self.info().signature_index)
    }

    fn attributes(&self) -> &[Attribute] {
        &self.info().attributes
    }

    fn attributes_mut(&mut self) -> &mut Vec<Attribute> {
        &mut self.info_mut().attributes
    }

    /// First attribute of the given kind.
    fn attribute(&self, tag: AttributeTag) -> Option<&Attribute> {
        find_attribute(self.attributes(), tag)
    }

    fn is_public(&self) -> bool {
        self.access_flags().contains(AccessFlags::PUBLIC)
    }

    fn is_static(&self) -> bool {
        self.access_flags().contains(AccessFlags::STATIC)
    }

    fn is_synthetic(&self) -> bool {
        self.access_flags().contains(AccessFlags::SYNTHETIC)
            || self.attribute(AttributeTag::Synthetic).is_some()
    }

    fn is_deprecated(&self) -> bool {
        self.attribute(AttributeTag::Deprecated).is_some()
    }
}
