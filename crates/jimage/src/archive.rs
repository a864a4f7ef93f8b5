mod parser;

use std::{convert::TryFrom, fmt};

use byteorder::NativeEndian;

use crate::{JImageError, Result};

use self::parser::{decode_location, ImageReader};

const HASH_MULTIPLIER: i32 = 0x01000193;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AttributeKind {
    Module,
    Parent,
    Base,
    Extension,
    Offset,
    Compressed,
    Uncompressed,

    Total,
}
impl TryFrom<u8> for AttributeKind {
    type Error = JImageError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(AttributeKind::Module),
            2 => Ok(AttributeKind::Parent),
            3 => Ok(AttributeKind::Base),
            4 => Ok(AttributeKind::Extension),
            5 => Ok(AttributeKind::Offset),
            6 => Ok(AttributeKind::Compressed),
            7 => Ok(AttributeKind::Uncompressed),
            _ => Err(JImageError::InvalidAttributeKind(value)),
        }
    }
}

type Attributes = [u64; AttributeKind::Total as usize];

// How each name attribute appears in a full resource name, when present:
// `/module/parent/base.extension`.
const NAME_PARTS: [(&str, AttributeKind, &str); 4] = [
    ("/", AttributeKind::Module, "/"),
    ("", AttributeKind::Parent, "/"),
    ("", AttributeKind::Base, ""),
    (".", AttributeKind::Extension, ""),
];

#[derive(Debug)]
pub struct Header {
    pub version: (u16, u16),
    pub flags: u32,
    pub resource_count: u32,
    pub table_length: u32,
    pub attributes_size: u32,
    pub strings_size: u32,
}
impl Header {
    pub fn index_size(&self) -> usize {
        std::mem::size_of::<u32>() // Magic identifier
            + std::mem::size_of::<Header>()
            + self.redirect_table_size()
            + self.attribute_offsets_size()
            + self.attributes_size as usize
            + self.strings_size as usize
    }

    pub fn redirect_table_size(&self) -> usize {
        self.table_length as usize * std::mem::size_of::<i32>()
    }

    pub fn attribute_offsets_size(&self) -> usize {
        self.table_length as usize * std::mem::size_of::<u32>()
    }
}
impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " Major Version:  {}", self.version.0)?;
        writeln!(f, " Minor Version:  {}", self.version.1)?;
        writeln!(f, " Flags:          {}", self.flags)?;
        writeln!(f, " Resource Count: {}", self.resource_count)?;
        writeln!(f, " Table Length:   {}", self.table_length)?;
        writeln!(f, " Offsets Size:   {}", self.attribute_offsets_size())?;
        writeln!(f, " Redirects Size: {}", self.redirect_table_size())?;
        writeln!(f, " Locations Size: {}", self.attributes_size)?;
        writeln!(f, " Strings Size:   {}", self.strings_size)?;
        writeln!(f, " Index Size:     {}", self.index_size())?;

        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct Index {
    redirect_table: Vec<i32>,
    attribute_offsets: Vec<u32>,
    strings_data: Vec<u8>,
    attribute_data: Vec<u8>,
}
impl Index {
    fn attributes(&self, slot: usize) -> Result<Attributes> {
        let offset = self
            .attribute_offsets
            .get(slot)
            .map(|offset| *offset as usize)
            .filter(|offset| *offset < self.attribute_data.len())
            .ok_or(JImageError::Truncated {
                offset: self.attribute_data.len(),
                wanted: 1,
            })?;
        decode_location(&self.attribute_data[offset..])
    }
}

/// A JDK runtime image, usually `$JAVA_HOME/lib/modules`.
///
/// `B` is anything that derefs to the image bytes: a memory map, a `Vec<u8>`
/// or a plain slice.
pub struct Archive<B> {
    buf: B,
    header: Header,
    index: Index,
    resource_data_start: usize,
}
impl<B: AsRef<[u8]>> Archive<B> {
    pub fn parse(buf: B) -> Result<Self> {
        let (header, index, resource_data_start) =
            ImageReader::<NativeEndian>::new(buf.as_ref()).read_index()?;

        Ok(Archive {
            buf,
            header,
            index,
            resource_data_start,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn resources(&self) -> Resources<'_> {
        Resources {
            index: &self.index,
            resource_data: self.resource_data(),
            slot: 0,
        }
    }

    /// Looks up a resource by its full name, e.g.
    /// `/java.base/java/lang/Object.class`.
    pub fn by_name(&self, path: &str) -> Option<Resource<'_>> {
        let table_length = self.index.redirect_table.len() as i32;
        if table_length == 0 {
            return None;
        }

        let slot = hash(path, HASH_MULTIPLIER) % table_length;
        let value = self.index.redirect_table[slot as usize];
        let slot = match value {
            0 => return None,
            value if value > 0 => hash(path, value) % table_length,
            value => -1 - value,
        };

        let attributes = match self.index.attributes(slot as usize) {
            Ok(attributes) => attributes,
            Err(e) => {
                log::warn!("Failed to decode the location of {}: {}", path, e);
                return None;
            }
        };
        let resource = Resource {
            attributes,
            strings_data: &self.index.strings_data,
            resource_data: self.resource_data(),
        };

        if Self::verify(&resource, path) {
            Some(resource)
        } else {
            None
        }
    }

    /// Bytes of the class `internal_name` (slash separated) in `module`.
    pub fn class_bytes(&self, module: &str, internal_name: &str) -> Result<Option<&[u8]>> {
        self.by_name(&format!("/{}/{}.class", module, internal_name))
            .map(|resource| resource.bytes())
            .transpose()
    }

    /// First of `modules` that contains the class `internal_name`.
    pub fn find_class<S: AsRef<str>>(
        &self,
        modules: &[S],
        internal_name: &str,
    ) -> Option<Resource<'_>> {
        modules.iter().find_map(|module| {
            self.by_name(&format!("/{}/{}.class", module.as_ref(), internal_name))
        })
    }

    fn resource_data(&self) -> &[u8] {
        self.buf
            .as_ref()
            .get(self.resource_data_start..)
            .unwrap_or_default()
    }

    // A redirect slot is shared by every name with the same hash, so the
    // location found must spell out `path` exactly.
    fn verify(resource: &Resource<'_>, path: &str) -> bool {
        let mut rest = path;
        for (prefix, kind, suffix) in NAME_PARTS {
            let part = resource.string_at(kind);
            if part.is_empty() {
                continue;
            }
            match rest
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix(part))
                .and_then(|rest| rest.strip_prefix(suffix))
            {
                Some(remaining) => rest = remaining,
                None => return false,
            }
        }
        rest.is_empty()
    }
}
impl<B> fmt::Debug for Archive<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("header", &self.header)
            .field("resource_data_start", &self.resource_data_start)
            .finish()
    }
}

fn hash(data: &str, seed: i32) -> i32 {
    let hash_code = data.bytes().fold(seed as u32, |useed, byte| {
        (useed.wrapping_mul(HASH_MULTIPLIER as u32)) ^ byte as u32
    });
    (hash_code & 0x7fff_ffff) as i32
}

/// Every resource of an archive, in table order.
pub struct Resources<'a> {
    index: &'a Index,
    resource_data: &'a [u8],
    slot: usize,
}
impl<'a> Iterator for Resources<'a> {
    type Item = Resource<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.slot < self.index.redirect_table.len() {
            let slot = self.slot;
            self.slot += 1;

            match self.index.attributes(slot) {
                Ok(attributes) => {
                    return Some(Resource {
                        attributes,
                        strings_data: &self.index.strings_data,
                        resource_data: self.resource_data,
                    })
                }
                Err(e) => log::warn!("Skipping resource {}: {}", slot, e),
            }
        }
        None
    }
}

pub struct Resource<'a> {
    attributes: Attributes,
    strings_data: &'a [u8],
    resource_data: &'a [u8],
}
impl fmt::Debug for Resource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.full_name())
            .field("attributes", &self.attributes)
            .finish()
    }
}
impl<'a> Resource<'a> {
    pub fn module(&self) -> &'a str {
        self.string_at(AttributeKind::Module)
    }

    pub fn parent(&self) -> &'a str {
        self.string_at(AttributeKind::Parent)
    }

    pub fn base(&self) -> &'a str {
        self.string_at(AttributeKind::Base)
    }

    pub fn extension(&self) -> &'a str {
        self.string_at(AttributeKind::Extension)
    }

    pub fn offset(&self) -> usize {
        self.attributes[AttributeKind::Offset as usize] as usize
    }

    pub fn is_compressed(&self) -> bool {
        self.attributes[AttributeKind::Compressed as usize] != 0
    }

    /// The resource content. Compressed resources are not supported.
    pub fn bytes(&self) -> Result<&'a [u8]> {
        if self.is_compressed() {
            return Err(JImageError::CompressedResource(self.full_name()));
        }

        let size = self.attributes[AttributeKind::Uncompressed as usize] as usize;
        self.offset()
            .checked_add(size)
            .and_then(|end| self.resource_data.get(self.offset()..end))
            .ok_or_else(|| JImageError::ResourceOutOfBounds(self.full_name()))
    }

    pub fn full_name(&self) -> String {
        NAME_PARTS
            .iter()
            .filter_map(|(prefix, kind, suffix)| {
                self.try_string(*kind)
                    .map(|part| format!("{}{}{}", prefix, part, suffix))
            })
            .collect()
    }

    fn string_at(&self, attribute_kind: AttributeKind) -> &'a str {
        self.try_string(attribute_kind).unwrap_or_default()
    }

    fn try_string(&self, attribute_kind: AttributeKind) -> Option<&'a str> {
        let offset = self.attributes[attribute_kind as usize] as usize;
        let bytes = self.strings_data.get(offset..)?.split(|n| *n == 0).next()?;

        if bytes.is_empty() {
            return None;
        }

        std::str::from_utf8(bytes).ok()
    }
}
