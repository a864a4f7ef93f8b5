use std::marker::PhantomData;

use byteorder::ByteOrder;

use crate::{
    archive::{AttributeKind, Attributes, Header, Index},
    JImageError, Result,
};

const MAGIC: u32 = 0xCAFE_DADA;

/// Walks the index at the start of an image. Multi-byte values are in `E`,
/// which is the byte order of the platform that wrote the image.
pub(crate) struct ImageReader<'a, E: ByteOrder> {
    buf: &'a [u8],
    pos: usize,
    order: PhantomData<E>,
}

impl<'a, E: ByteOrder> ImageReader<'a, E> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            order: PhantomData,
        }
    }

    /// Reads the header and the index, and returns them with the offset at
    /// which resource data starts.
    pub(crate) fn read_index(mut self) -> Result<(Header, Index, usize)> {
        let header = self.header()?;

        let redirect_table = self.table(header.table_length, E::read_i32)?;
        let attribute_offsets = self.table(header.table_length, E::read_u32)?;
        let attribute_data = self.take(header.attributes_size as usize)?.to_vec();
        let strings_data = self.take(header.strings_size as usize)?.to_vec();

        log::debug!(
            "Read image index of {} resources, data starts at {}",
            header.resource_count,
            self.pos
        );

        let index = Index {
            redirect_table,
            attribute_offsets,
            attribute_data,
            strings_data,
        };
        Ok((header, index, self.pos))
    }

    fn header(&mut self) -> Result<Header> {
        let magic = self.u32()?;
        if magic != MAGIC {
            return Err(JImageError::InvalidMagicIdentifier(magic));
        }

        // Minor version comes first
        let minor = self.u16()?;
        let major = self.u16()?;

        Ok(Header {
            version: (major, minor),
            flags: self.u32()?,
            resource_count: self.u32()?,
            table_length: self.u32()?,
            attributes_size: self.u32()?,
            strings_size: self.u32()?,
        })
    }

    fn table<T>(&mut self, length: u32, read: fn(&[u8]) -> T) -> Result<Vec<T>> {
        let bytes = self.take(length as usize * 4)?;
        Ok(bytes.chunks_exact(4).map(read).collect())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = self
            .buf
            .get(self.pos..)
            .and_then(|rest| rest.get(..n))
            .ok_or(JImageError::Truncated {
                offset: self.pos,
                wanted: n,
            })?;
        self.pos += n;
        Ok(bytes)
    }

    fn u32(&mut self) -> Result<u32> {
        self.take(4).map(E::read_u32)
    }

    fn u16(&mut self) -> Result<u16> {
        self.take(2).map(E::read_u16)
    }
}

/// Decodes the attribute stream describing one resource location.
///
/// Every attribute starts with a byte holding the kind in its high five bits
/// and the value length minus one in its low three bits. The value follows,
/// big endian whatever the image's byte order. A zero kind ends the stream.
pub(crate) fn decode_location(mut bytes: &[u8]) -> Result<Attributes> {
    let mut attributes = [0; AttributeKind::Total as usize];

    loop {
        let (&lead, rest) = bytes.split_first().ok_or(JImageError::Truncated {
            offset: 0,
            wanted: 1,
        })?;
        if lead >> 3 == 0 {
            return Ok(attributes);
        }
        let kind = AttributeKind::try_from(lead >> 3)?;

        let width = (lead & 0x7) as usize + 1;
        if rest.len() < width {
            return Err(JImageError::Truncated {
                offset: 1,
                wanted: width,
            });
        }
        let (value, rest) = rest.split_at(width);
        attributes[kind as usize] = value
            .iter()
            .fold(0u64, |acc, byte| acc << 8 | *byte as u64);
        bytes = rest;
    }
}
