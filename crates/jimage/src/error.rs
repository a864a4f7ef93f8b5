use thiserror::Error;

/// Everything that can go wrong while reading a runtime image.
#[derive(Debug, Error)]
pub enum JImageError {
    #[error("Image is not a jimage file, magic is 0x{0:X}")]
    InvalidMagicIdentifier(u32),
    #[error("Image ends at offset {offset}, {wanted} more bytes expected")]
    Truncated { offset: usize, wanted: usize },
    #[error("Unknown location attribute kind {0}")]
    InvalidAttributeKind(u8),
    #[error("Resource {0} is compressed")]
    CompressedResource(String),
    #[error("Resource {0} lies outside of the image")]
    ResourceOutOfBounds(String),
}
