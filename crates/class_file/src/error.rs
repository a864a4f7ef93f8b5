use classkit_jimage::JImageError;
use thiserror::Error;

use crate::constant_pool;

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Invalid magic identifier: 0x{0:X}")]
    InvalidMagicIdentifier(u32),
    #[error("Invalid cp info tag: {0}")]
    InvalidCpInfoTag(u8),
    #[error("Invalid constant pool index: {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("Expected {0}, found {1:?}")]
    UnexpectedConstantPoolEntry(&'static str, constant_pool::CpInfo),
    #[error("Invalid modified UTF-8 sequence at byte {0}")]
    InvalidModifiedUtf8(usize),
    #[error("Attribute {name} declares {expected} bytes but {actual} were decoded")]
    AttributeLengthMismatch {
        name: String,
        expected: u32,
        actual: u64,
    },
    #[error("Invalid {0} attribute: {1}")]
    InvalidAttribute(&'static str, String),
    #[error("Class not found: {0}")]
    ClassNotFound(String),
    #[error("{0} is not an interface")]
    NotAnInterface(String),
    #[error(transparent)]
    Image(#[from] JImageError),
}

impl ClassFileError {
    /// Errors caused by malformed or inconsistent class file bytes.
    pub fn is_format_error(&self) -> bool {
        match self {
            ClassFileError::IOError(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
            ClassFileError::InvalidMagicIdentifier(_)
            | ClassFileError::InvalidCpInfoTag(_)
            | ClassFileError::InvalidConstantPoolIndex(_)
            | ClassFileError::UnexpectedConstantPoolEntry(..)
            | ClassFileError::InvalidModifiedUtf8(_)
            | ClassFileError::AttributeLengthMismatch { .. }
            | ClassFileError::InvalidAttribute(..) => true,
            _ => false,
        }
    }

    /// Errors raised while following a cross-reference through a class repository.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            ClassFileError::ClassNotFound(_)
                | ClassFileError::NotAnInterface(_)
                | ClassFileError::Image(_)
        )
    }
}
