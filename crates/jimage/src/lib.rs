// https://github.com/openjdk/jdk/blob/master/src/java.base/share/native/libjimage/imageFile.hpp

mod archive;
mod error;

pub use archive::{Archive, Header, Resource, Resources};
pub use error::JImageError;

pub type Result<T, E = JImageError> = std::result::Result<T, E>;
