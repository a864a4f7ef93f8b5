use std::{cmp::Ordering, io::Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{serialize::Serialize, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}
impl LineNumber {
    fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(LineNumber {
            start_pc: r.read_u16::<BigEndian>()?,
            line_number: r.read_u16::<BigEndian>()?,
        })
    }
}
impl Serialize for LineNumber {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.line_number.serialize(writer)
    }
}

/// Maps bytecode offsets to source lines.
///
/// Entries are expected in ascending `start_pc` order, which is how compilers
/// emit them. The order is not checked when reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineNumberTable {
    pub line_numbers: Vec<LineNumber>,
}
impl LineNumberTable {
    pub(super) fn read<R: Read>(r: &mut R) -> Result<Self> {
        let length = r.read_u16::<BigEndian>()?;
        let line_numbers = (0..length)
            .map(|_| LineNumber::read(r))
            .collect::<Result<Vec<_>>>()?;
        Ok(LineNumberTable { line_numbers })
    }

    pub fn body_length(&self) -> u32 {
        2 + 4 * self.line_numbers.len() as u32
    }

    /// Source line of the instruction at `pc`: the entry with the greatest
    /// `start_pc` not exceeding `pc`.
    pub fn source_line(&self, pc: u16) -> Option<u16> {
        let mut low = 0;
        let mut high = self.line_numbers.len();
        let mut floor = None;

        while low < high {
            let mid = low + (high - low) / 2;
            let entry = self.line_numbers[mid];
            match entry.start_pc.cmp(&pc) {
                Ordering::Equal => return Some(entry.line_number),
                Ordering::Less => {
                    floor = Some(entry.line_number);
                    low = mid + 1;
                }
                Ordering::Greater => high = mid,
            }
        }

        floor
    }
}
impl Serialize for LineNumberTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.line_numbers.serialize(writer)
    }
}
