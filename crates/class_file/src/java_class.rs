use std::{
    collections::{HashSet, VecDeque},
    fmt,
    fs::File,
    io::{BufRead, BufWriter, Write},
    path::Path,
    sync::Arc,
};

use byteorder::WriteBytesExt;

use crate::{
    attributes::{find_attribute, Attribute, AttributeInfo, AttributeTag},
    constant_pool::{compact_class_name, ConstantPool, ConstantPoolRef},
    member::Member,
    parser::Parser,
    repository::ClassRepository,
    serialize::Serialize,
    AccessFlags, ClassFileError, Field, Method, ParserContext, Result,
};

pub const MAGIC: u32 = 0xCAFEBABE;

const OBJECT_CLASS_NAME: &str = "java.lang.Object";
const UNKNOWN_SOURCE_FILE: &str = "<Unknown>";

/// Where a class was read from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ClassSource {
    /// Generated or modified in memory.
    #[default]
    Heap,
    File,
    /// Loaded from a runtime image.
    Archive,
}

/// The raw parts of a class file, handed to [`JavaClass::new`].
#[derive(Debug, Clone)]
pub struct ClassComponents {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPoolRef,
    pub access_flags: AccessFlags,
    pub class_name_index: u16,
    pub superclass_name_index: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub attributes: Vec<Attribute>,
    pub source: ClassSource,
    pub file_name: Option<String>,
}

/// A parsed class file.
///
/// `class_name`, `package_name`, `superclass_name`, `interface_names` and
/// `source_file_name` are resolved once when the class is built. Changing
/// the indices they come from leaves them untouched until
/// [`JavaClass::refresh_derived_names`] is called, and the string setters
/// override them without touching any index.
///
/// `Clone` is shallow: the clone shares the constant pool handle with the
/// original. Only the pool is shared. Fields, methods and attributes are
/// owned by each class, so changing them on a clone is not seen by the
/// original, and the pool itself only changes through
/// [`JavaClass::update_constant_pool`], which gives the caller a new one.
/// [`JavaClass::copy`] gives the copy a constant pool of its own.
#[derive(Clone)]
pub struct JavaClass {
    minor_version: u16,
    major_version: u16,
    constant_pool: ConstantPoolRef,
    access_flags: AccessFlags,
    class_name_index: u16,
    superclass_name_index: u16,
    interfaces: Vec<u16>,
    fields: Vec<Field>,
    methods: Vec<Method>,
    attributes: Vec<Attribute>,
    source: ClassSource,
    file_name: Option<String>,

    class_name: String,
    package_name: String,
    superclass_name: String,
    interface_names: Vec<String>,
    source_file_name: String,
}
impl JavaClass {
    pub fn new(components: ClassComponents) -> Result<JavaClass> {
        let ClassComponents {
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
            source,
            file_name,
        } = components;

        let mut class = JavaClass {
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
            source,
            file_name,
            class_name: String::new(),
            package_name: String::new(),
            superclass_name: String::new(),
            interface_names: Vec::new(),
            source_file_name: String::new(),
        };
        class.refresh_derived_names()?;
        Ok(class)
    }

    pub fn parse<R: BufRead>(r: R) -> Result<JavaClass> {
        Parser::new(r).parse()
    }

    /// Parses with the attribute readers registered in `context`.
    pub fn parse_with<R: BufRead>(r: R, context: &ParserContext) -> Result<JavaClass> {
        Parser::new(r).with_context(context).parse()
    }

    /// Re-resolves the cached names from the current indices.
    pub fn refresh_derived_names(&mut self) -> Result<()> {
        let pool = &self.constant_pool;

        let class_name = compact_class_name(pool.get_class_name(self.class_name_index)?);
        let package_name = class_name
            .rsplit_once('.')
            .map(|(package, _)| package.to_owned())
            .unwrap_or_default();
        let superclass_name = match self.superclass_name_index {
            0 => OBJECT_CLASS_NAME.to_owned(),
            index => compact_class_name(pool.get_class_name(index)?),
        };
        let interface_names = self
            .interfaces
            .iter()
            .map(|&index| pool.get_class_name(index).map(compact_class_name))
            .collect::<Result<Vec<_>>>()?;
        let source_file_name = match find_attribute(&self.attributes, AttributeTag::SourceFile)
            .map(Attribute::info)
        {
            Some(AttributeInfo::SourceFile(source_file)) => {
                source_file.source_file_name(pool)?.to_owned()
            }
            _ => UNKNOWN_SOURCE_FILE.to_owned(),
        };

        self.class_name = class_name;
        self.package_name = package_name;
        self.superclass_name = superclass_name;
        self.interface_names = interface_names;
        self.source_file_name = source_file_name;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.serialize(&mut bytes)?;
        Ok(bytes)
    }

    pub fn dump<W: Write>(&self, writer: &mut W) -> Result<()> {
        Ok(self.serialize(writer)?)
    }

    pub fn dump_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.dump(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Deep copy. The copy owns a new constant pool and every nested
    /// structure is rebound to it.
    pub fn copy(&self) -> JavaClass {
        let constant_pool = Arc::new(ConstantPool::clone(&self.constant_pool));

        JavaClass {
            minor_version: self.minor_version,
            major_version: self.major_version,
            access_flags: self.access_flags,
            class_name_index: self.class_name_index,
            superclass_name_index: self.superclass_name_index,
            interfaces: self.interfaces.clone(),
            fields: self.fields.iter().map(|f| f.copy(&constant_pool)).collect(),
            methods: self.methods.iter().map(|m| m.copy(&constant_pool)).collect(),
            attributes: self
                .attributes
                .iter()
                .map(|a| a.copy(&constant_pool))
                .collect(),
            source: self.source,
            file_name: self.file_name.clone(),
            class_name: self.class_name.clone(),
            package_name: self.package_name.clone(),
            superclass_name: self.superclass_name.clone(),
            interface_names: self.interface_names.clone(),
            source_file_name: self.source_file_name.clone(),
            constant_pool,
        }
    }

    /// Mutates a private copy of the constant pool and rebinds every field,
    /// method and attribute to it. Other classes sharing the old pool are
    /// not affected.
    pub fn update_constant_pool<T>(&mut self, f: impl FnOnce(&mut ConstantPool) -> T) -> T {
        let mut constant_pool = ConstantPool::clone(&self.constant_pool);
        let result = f(&mut constant_pool);
        self.set_constant_pool(Arc::new(constant_pool));
        result
    }

    pub fn set_constant_pool(&mut self, constant_pool: ConstantPoolRef) {
        for field in &mut self.fields {
            field.rebind(&constant_pool);
        }
        for method in &mut self.methods {
            method.rebind(&constant_pool);
        }
        for attribute in &mut self.attributes {
            attribute.rebind(&constant_pool);
        }
        self.constant_pool = constant_pool;
    }

    pub fn minor_version(&self) -> u16 {
        self.minor_version
    }

    pub fn major_version(&self) -> u16 {
        self.major_version
    }

    pub fn set_version(&mut self, major_version: u16, minor_version: u16) {
        self.major_version = major_version;
        self.minor_version = minor_version;
    }

    pub fn constant_pool(&self) -> &ConstantPoolRef {
        &self.constant_pool
    }

    pub fn access_flags(&self) -> AccessFlags {
        self.access_flags
    }

    pub fn set_access_flags(&mut self, access_flags: AccessFlags) {
        self.access_flags = access_flags;
    }

    pub fn class_name_index(&self) -> u16 {
        self.class_name_index
    }

    pub fn set_class_name_index(&mut self, class_name_index: u16) {
        self.class_name_index = class_name_index;
    }

    pub fn superclass_name_index(&self) -> u16 {
        self.superclass_name_index
    }

    pub fn set_superclass_name_index(&mut self, superclass_name_index: u16) {
        self.superclass_name_index = superclass_name_index;
    }

    pub fn interface_indices(&self) -> &[u16] {
        &self.interfaces
    }

    pub fn set_interface_indices(&mut self, interfaces: Vec<u16>) {
        self.interfaces = interfaces;
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Vec<Field> {
        &mut self.fields
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn methods_mut(&mut self) -> &mut Vec<Method> {
        &mut self.methods
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Vec<Attribute> {
        &mut self.attributes
    }

    pub fn source(&self) -> ClassSource {
        self.source
    }

    /// Path or archive entry the class was read from, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn set_file_name(&mut self, file_name: impl Into<String>) {
        self.file_name = Some(file_name.into());
    }

    /// Fully qualified name, e.g. `java.lang.String`.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn set_class_name(&mut self, class_name: impl Into<String>) {
        self.class_name = class_name.into();
    }

    /// Empty for classes in the unnamed package.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn superclass_name(&self) -> &str {
        &self.superclass_name
    }

    pub fn set_superclass_name(&mut self, superclass_name: impl Into<String>) {
        self.superclass_name = superclass_name.into();
    }

    pub fn interface_names(&self) -> &[String] {
        &self.interface_names
    }

    pub fn set_interface_names(&mut self, interface_names: Vec<String>) {
        self.interface_names = interface_names;
    }

    pub fn source_file_name(&self) -> &str {
        &self.source_file_name
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(AccessFlags::INTERFACE)
    }

    pub fn is_class(&self) -> bool {
        !self.is_interface()
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&Method> {
        self.methods
            .iter()
            .find(|m| m.name().ok() == Some(name) && m.signature().ok() == Some(descriptor))
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name().ok() == Some(name))
    }

    /// `Ok(None)` for `java.lang.Object`, the only class without a superclass.
    /// Any other class with a zero superclass index extends `java.lang.Object`.
    pub fn super_class(
        &self,
        repository: &dyn ClassRepository,
    ) -> Result<Option<Arc<JavaClass>>> {
        if self.class_name == OBJECT_CLASS_NAME {
            return Ok(None);
        }
        repository.load_class(&self.superclass_name).map(Some)
    }

    /// Superclasses, the direct superclass first and `java.lang.Object` last.
    pub fn super_classes(&self, repository: &dyn ClassRepository) -> Result<Vec<Arc<JavaClass>>> {
        let mut super_classes = Vec::new();
        let mut next = self.super_class(repository)?;
        while let Some(class) = next {
            next = class.super_class(repository)?;
            super_classes.push(class);
        }
        Ok(super_classes)
    }

    /// Directly implemented interfaces, in declaration order.
    pub fn interfaces(&self, repository: &dyn ClassRepository) -> Result<Vec<Arc<JavaClass>>> {
        self.interface_names
            .iter()
            .map(|name| repository.load_class(name))
            .collect()
    }

    /// Every interface reachable from this class, including itself if it is
    /// an interface. Breadth first, each interface reported once.
    pub fn all_interfaces(
        self: &Arc<Self>,
        repository: &dyn ClassRepository,
    ) -> Result<Vec<Arc<JavaClass>>> {
        let mut seen = HashSet::from([self.class_name.clone()]);
        let mut queue = VecDeque::from([Arc::clone(self)]);
        let mut all_interfaces = Vec::new();

        while let Some(class) = queue.pop_front() {
            if class.is_interface() {
                all_interfaces.push(Arc::clone(&class));
            } else if let Some(super_class) = class.super_class(repository)? {
                if seen.insert(super_class.class_name.clone()) {
                    queue.push_back(super_class);
                }
            }

            for interface in class.interfaces(repository)? {
                if seen.insert(interface.class_name.clone()) {
                    queue.push_back(interface);
                }
            }
        }
        Ok(all_interfaces)
    }

    /// Whether this class is `class`, extends it or implements it.
    pub fn instance_of(
        self: &Arc<Self>,
        class: &JavaClass,
        repository: &dyn ClassRepository,
    ) -> Result<bool> {
        if self.class_name == class.class_name {
            return Ok(true);
        }
        if class.is_interface() {
            return self.implementation_of(class, repository);
        }
        Ok(self
            .super_classes(repository)?
            .iter()
            .any(|super_class| super_class.class_name == class.class_name))
    }

    pub fn implementation_of(
        self: &Arc<Self>,
        interface: &JavaClass,
        repository: &dyn ClassRepository,
    ) -> Result<bool> {
        if !interface.is_interface() {
            return Err(ClassFileError::NotAnInterface(interface.class_name.clone()));
        }
        if self.class_name == interface.class_name {
            return Ok(true);
        }
        Ok(self
            .all_interfaces(repository)?
            .iter()
            .any(|i| i.class_name == interface.class_name))
    }
}
impl fmt::Debug for JavaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JavaClass")
            .field("class_name", &self.class_name)
            .field("superclass_name", &self.superclass_name)
            .field("interface_names", &self.interface_names)
            .field("version", &(self.major_version, self.minor_version))
            .field("access_flags", &self.access_flags)
            .field("source", &self.source)
            .field("fields", &self.fields)
            .field("methods", &self.methods)
            .field("attributes", &self.attributes)
            .finish()
    }
}
impl Serialize for JavaClass {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        MAGIC.serialize(writer)?;
        self.minor_version.serialize(writer)?;
        self.major_version.serialize(writer)?;
        self.constant_pool.serialize(writer)?;
        self.access_flags.bits().serialize(writer)?;
        self.class_name_index.serialize(writer)?;
        self.superclass_name_index.serialize(writer)?;
        self.interfaces.serialize(writer)?;
        self.fields.serialize(writer)?;
        self.methods.serialize(writer)?;
        self.attributes.serialize(writer)
    }
}
