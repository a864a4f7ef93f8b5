// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html

#[macro_use]
pub mod constant_pool;

mod access_flags;
pub mod attributes;
mod context;
mod error;
mod field;
mod java_class;
mod member;
mod method;
pub mod mutf8;
mod parser;
mod repository;
pub mod serialize;
mod visitor;

pub use access_flags::AccessFlags;
pub use constant_pool::{ConstantPool, ConstantPoolRef};
pub use context::ParserContext;
pub use error::ClassFileError;
pub use field::Field;
pub use java_class::{ClassComponents, ClassSource, JavaClass, MAGIC};
pub use member::{Member, MemberInfo};
pub use method::Method;
pub use parser::Parser;
pub use repository::{ClassRepository, DirectoryRepository, ImageRepository, MemoryRepository};
pub use visitor::{dispatch_attribute, Ancestors, DescendingVisitor, Node, Visitor};

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;
