use byteorder::WriteBytesExt;

use crate::{
    attributes::{
        Attribute, AttributeInfo, AttributeTag, Code, ExceptionTable, LineNumberTable,
        LocalVariableTable,
    },
    constant_pool::ConstantPoolRef,
    member::{Member, MemberInfo},
    serialize::Serialize,
    AccessFlags,
};

#[derive(Debug, Clone)]
pub struct Method {
    info: MemberInfo,
}
impl Method {
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

    /// `None` for abstract and native methods.
    pub fn code(&self) -> Option<&Code> {
        self.attribute(AttributeTag::Code)?.as_code()
    }

    /// Checked exceptions declared by the method.
    pub fn exception_table(&self) -> Option<&ExceptionTable> {
        match self.attribute(AttributeTag::Exceptions)?.info() {
            AttributeInfo::Exceptions(table) => Some(table),
            _ => None,
        }
    }

    pub fn line_number_table(&self) -> Option<&LineNumberTable> {
        self.code()?.line_number_table()
    }

    pub fn local_variable_table(&self) -> Option<&LocalVariableTable> {
        self.code()?.local_variable_table()
    }

    /// Mutates the `Code` attribute and refreshes its length. Returns `None`
    /// if the method has no code.
    pub fn update_code<T>(&mut self, f: impl FnOnce(&mut Code) -> T) -> Option<T> {
        let attribute = self
            .attributes_mut()
            .iter_mut()
            .find(|a| a.tag() == AttributeTag::Code)?;
        attribute.update(|info| info.as_code_mut().map(f))
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags().contains(AccessFlags::ABSTRACT)
    }

    pub fn is_native(&self) -> bool {
        self.access_flags().contains(AccessFlags::NATIVE)
    }

    /// Deep copy bound to `constant_pool`.
    pub fn copy(&self, constant_pool: &ConstantPoolRef) -> Method {
        Method {
            info: self.info.copy(constant_pool),
        }
    }

    pub(crate) fn rebind(&mut self, constant_pool: &ConstantPoolRef) {
        self.info.rebind(constant_pool);
    }
}
impl Member for Method {
    fn info(&self) -> &MemberInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut MemberInfo {
        &mut self.info
    }
}
impl Serialize for Method {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.info.serialize(writer)
    }
}
