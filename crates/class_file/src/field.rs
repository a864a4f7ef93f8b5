use byteorder::WriteBytesExt;

use crate::{
    attributes::{Attribute, AttributeInfo, AttributeTag, ConstantValue},
    constant_pool::ConstantPoolRef,
    member::{Member, MemberInfo},
    serialize::Serialize,
    AccessFlags,
};

#[derive(Debug, Clone)]
pub struct Field {
    info: MemberInfo,
}
impl Field {
    pub fn new(
        access_flags: AccessFlags,
        name_index: u16,
        signature_index: u16,
        attributes: Vec<Attribute>,
        constant_pool: ConstantPoolRef,
    ) -> Self {
        Self {
            info: MemberInfo::new(
                access_flags,
                name_index,
                signature_index,
                attributes,
                constant_pool,
            ),
        }
    }

    pub(crate) fn from_info(info: MemberInfo) -> Self {
        Self { info }
    }

    /// Initial value of a static final field.
    pub fn constant_value(&self) -> Option<&ConstantValue> {
        match self.attribute(AttributeTag::ConstantValue)?.info() {
            AttributeInfo::ConstantValue(value) => Some(value),
            _ => None,
        }
    }

    /// Deep copy bound to `constant_pool`.
    pub fn copy(&self, constant_pool: &ConstantPoolRef) -> Field {
        Field {
            info: self.info.copy(constant_pool),
        }
    }

    pub(crate) fn rebind(&mut self, constant_pool: &ConstantPoolRef) {
        self.info.rebind(constant_pool);
    }
}
impl Member for Field {
    fn info(&self) -> &MemberInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut MemberInfo {
        &mut self.info
    }
}
impl Serialize for Field {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.info.serialize(writer)
    }
}
