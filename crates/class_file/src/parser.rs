use std::{
    borrow::Cow,
    io::{BufRead, Read},
    sync::Arc,
};

use byteorder::{BigEndian, ReadBytesExt};

use crate::{
    attributes::read_attributes,
    constant_pool::{
        ClassInfo, ConstantTag, CpInfo, InvokeDynamicInfo, MethodHandleInfo, MethodTypeInfo,
        NameAndTypeInfo, RefInfo, Utf8Info,
    },
    java_class::MAGIC,
    member::MemberInfo,
    AccessFlags, ClassComponents, ClassFileError, ClassSource, ConstantPool,
    ConstantPoolRef, Field, JavaClass, Method, ParserContext, Result,
};

type Endian = BigEndian;

/// Reads a class file from a byte stream.
///
/// The stream is read up to the last byte of the class and no further, so
/// whatever follows it is still there for the caller. Files need a
/// `BufReader` around them.
///
/// ```no_run
/// # use std::{fs::File, io::BufReader};
/// # use classkit_class_file::{Parser, ParserContext};
/// # fn main() -> classkit_class_file::Result<()> {
/// let context = ParserContext::new();
/// let class = Parser::new(BufReader::new(File::open("Main.class")?))
///     .with_context(&context)
///     .parse()?;
/// println!("{}", class.class_name());
/// # Ok(())
/// # }
/// ```
pub struct Parser<'c, R> {
    r: R,
    context: Cow<'c, ParserContext>,
    source: ClassSource,
    file_name: Option<String>,
}
impl<R: BufRead> Parser<'static, R> {
    pub fn new(r: R) -> Self {
        Self {
            r,
            context: Cow::Owned(ParserContext::default()),
            source: ClassSource::Heap,
            file_name: None,
        }
    }
}
impl<'c, R: BufRead> Parser<'c, R> {
    /// Uses the attribute readers registered in `context`.
    pub fn with_context<'a>(self, context: &'a ParserContext) -> Parser<'a, R> {
        Parser {
            r: self.r,
            context: Cow::Borrowed(context),
            source: self.source,
            file_name: self.file_name,
        }
    }

    pub fn with_source(mut self, source: ClassSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn parse(&mut self) -> Result<JavaClass> {
        self.parse_magic_identifier()?;
        let (major_version, minor_version) = self.parse_version()?;

        let constant_pool: ConstantPoolRef = Arc::new(self.parse_constant_pool()?);
        let access_flags = AccessFlags::from_bits_truncate(self.read_u16()?);
        let class_name_index = self.read_u16()?;
        let superclass_name_index = self.read_u16()?;
        let interfaces_count = self.read_u16()?;

        let mut interfaces = vec![0u16; interfaces_count as usize];
        self.r.read_u16_into::<Endian>(&mut interfaces)?;

        let fields = self
            .parse_members(&constant_pool)?
            .into_iter()
            .map(Field::from_info)
            .collect();
        let methods = self
            .parse_members(&constant_pool)?
            .into_iter()
            .map(Method::from_info)
            .collect();
        let attributes = read_attributes(&mut self.r, &constant_pool, &self.context)?;

        let class = JavaClass::new(ClassComponents {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            class_name_index,
            superclass_name_index,
            interfaces,
            fields,
            methods,
            attributes,
            source: self.source,
            file_name: self.file_name.clone(),
        })?;
        log::trace!(
            "Parsed {} ({} fields, {} methods)",
            class.class_name(),
            class.fields().len(),
            class.methods().len()
        );
        Ok(class)
    }

    fn parse_members(&mut self, constant_pool: &ConstantPoolRef) -> Result<Vec<MemberInfo>> {
        let count = self.read_u16()?;
        (0..count)
            .map(|_| MemberInfo::read(&mut self.r, constant_pool, &self.context))
            .collect()
    }

    fn parse_magic_identifier(&mut self) -> Result<()> {
        match self.read_u32()? {
            MAGIC => Ok(()),
            magic_identifier => Err(ClassFileError::InvalidMagicIdentifier(magic_identifier)),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.read_u16()?;
        let major = self.read_u16()?;
        Ok((major, minor))
    }

    fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let constant_pool_count = self.read_u16()?;
        let slots = constant_pool_count.saturating_sub(1) as usize;

        let mut cp_infos = Vec::with_capacity(slots);
        while cp_infos.len() < slots {
            let cp_info = self.parse_cp_info()?;
            let wide = matches!(cp_info, CpInfo::Long(_) | CpInfo::Double(_));
            cp_infos.push(cp_info);
            if wide {
                cp_infos.push(CpInfo::Unusable);
            }
        }

        // A Long or Double in the last slot spills past the declared count.
        if cp_infos.len() != slots {
            return Err(ClassFileError::InvalidConstantPoolIndex(constant_pool_count));
        }
        Ok(ConstantPool::new(cp_infos))
    }

    fn parse_cp_info(&mut self) -> Result<CpInfo> {
        let tag = ConstantTag::try_from(self.read_u8()?)?;
        Ok(match tag {
            ConstantTag::Utf8 => self.parse_utf8()?,
            ConstantTag::Integer => CpInfo::Integer(self.read_i32()?),
            ConstantTag::Float => CpInfo::Float(f32::from_bits(self.read_u32()?)),
            ConstantTag::Long => CpInfo::Long(self.r.read_i64::<Endian>()?),
            ConstantTag::Double => CpInfo::Double(f64::from_bits(self.r.read_u64::<Endian>()?)),
            ConstantTag::Class => CpInfo::Class(ClassInfo {
                name_index: self.read_u16()?,
            }),
            ConstantTag::String => CpInfo::String {
                string_index: self.read_u16()?,
            },
            ConstantTag::FieldRef => CpInfo::FieldRef(self.parse_ref_info()?),
            ConstantTag::MethodRef => CpInfo::MethodRef(self.parse_ref_info()?),
            ConstantTag::InterfaceMethodRef => {
                CpInfo::InterfaceMethodRef(self.parse_ref_info()?)
            }
            ConstantTag::NameAndType => self.parse_name_and_type_info()?,
            ConstantTag::MethodHandle => self.parse_method_handle()?,
            ConstantTag::MethodType => CpInfo::MethodType(MethodTypeInfo {
                descriptor_index: self.read_u16()?,
            }),
            ConstantTag::Dynamic => CpInfo::Dynamic(self.parse_invoke_dynamic_info()?),
            ConstantTag::InvokeDynamic => {
                CpInfo::InvokeDynamic(self.parse_invoke_dynamic_info()?)
            }
            ConstantTag::Module => CpInfo::Module {
                name_index: self.read_u16()?,
            },
            ConstantTag::Package => CpInfo::Package {
                name_index: self.read_u16()?,
            },
        })
    }

    fn parse_utf8(&mut self) -> Result<CpInfo> {
        let length = self.read_u16()?;
        let mut bytes = vec![0u8; length as usize];
        self.r.read_exact(&mut bytes)?;

        Ok(CpInfo::Utf8(Utf8Info::from_bytes(bytes)?))
    }

    fn parse_name_and_type_info(&mut self) -> Result<CpInfo> {
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;

        Ok(CpInfo::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    fn parse_method_handle(&mut self) -> Result<CpInfo> {
        let reference_kind = self.read_u8()?;
        let reference_index = self.read_u16()?;

        Ok(CpInfo::MethodHandle(MethodHandleInfo {
            reference_kind,
            reference_index,
        }))
    }

    fn parse_invoke_dynamic_info(&mut self) -> Result<InvokeDynamicInfo> {
        let bootstrap_method_attr_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(InvokeDynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        })
    }

    fn parse_ref_info(&mut self) -> Result<RefInfo> {
        let class_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(RefInfo {
            class_index,
            name_and_type_index,
        })
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(self.r.read_u32::<Endian>()?)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(self.r.read_u16::<Endian>()?)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.r.read_u8()?)
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(self.r.read_i32::<Endian>()?)
    }
}
