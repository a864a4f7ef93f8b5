use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{constant_pool::ConstantPool, serialize::Serialize, Result};

/// A local variable live range.
///
/// In a `LocalVariableTable` `signature_index` refers to a field descriptor,
/// in a `LocalVariableTypeTable` to a generic signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub signature_index: u16,
    /// Slot in the local variable array of the frame
    pub index: u16,
}
impl LocalVariable {
    fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(LocalVariable {
            start_pc: r.read_u16::<BigEndian>()?,
            length: r.read_u16::<BigEndian>()?,
            name_index: r.read_u16::<BigEndian>()?,
            signature_index: r.read_u16::<BigEndian>()?,
            index: r.read_u16::<BigEndian>()?,
        })
    }

    pub fn name<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a str> {
        constant_pool.get_utf8(self.name_index)
    }

    pub fn signature<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a str> {
        constant_pool.get_utf8(self.signature_index)
    }

    /// Whether the variable is live at `pc`.
    pub fn covers(&self, pc: u16) -> bool {
        let start = self.start_pc as u32;
        (start..start + self.length as u32).contains(&(pc as u32))
    }
}
impl Serialize for LocalVariable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.length.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.signature_index.serialize(writer)?;
        self.index.serialize(writer)
    }
}

/// Body of both `LocalVariableTable` and `LocalVariableTypeTable`, which share
/// a layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalVariableTable {
    pub local_variables: Vec<LocalVariable>,
}
impl LocalVariableTable {
    pub(super) fn read<R: Read>(r: &mut R) -> Result<Self> {
        let length = r.read_u16::<BigEndian>()?;
        let local_variables = (0..length)
            .map(|_| LocalVariable::read(r))
            .collect::<Result<Vec<_>>>()?;
        Ok(LocalVariableTable { local_variables })
    }

    pub fn body_length(&self) -> u32 {
        2 + 10 * self.local_variables.len() as u32
    }

    /// First variable stored in `slot`, regardless of its live range.
    pub fn local_variable(&self, slot: u16) -> Option<&LocalVariable> {
        self.local_variables.iter().find(|v| v.index == slot)
    }

    /// Variable stored in `slot` that is live at `pc`.
    pub fn local_variable_at(&self, slot: u16, pc: u16) -> Option<&LocalVariable> {
        self.local_variables
            .iter()
            .find(|v| v.index == slot && v.covers(pc))
    }
}
impl Serialize for LocalVariableTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.local_variables.serialize(writer)
    }
}

#[cfg(test)]
mod local_variable_tests {
    use super::*;

    fn variable(start_pc: u16, length: u16, index: u16) -> LocalVariable {
        LocalVariable {
            start_pc,
            length,
            name_index: 1,
            signature_index: 2,
            index,
        }
    }

    #[test]
    fn it_should_find_the_first_variable_in_a_slot() {
        let table = LocalVariableTable {
            local_variables: vec![variable(0, 10, 0), variable(0, 4, 1), variable(6, 4, 1)],
        };
        assert_eq!(table.local_variable(1), Some(&variable(0, 4, 1)));
        assert_eq!(table.local_variable(2), None);
    }

    #[test]
    fn it_should_respect_live_ranges() {
        let table = LocalVariableTable {
            local_variables: vec![variable(0, 4, 1), variable(6, 4, 1)],
        };
        assert_eq!(table.local_variable_at(1, 7), Some(&variable(6, 4, 1)));
        assert_eq!(table.local_variable_at(1, 4), None);
        assert_eq!(table.local_variable_at(1, 10), None);
    }

    #[test]
    fn it_should_read_ten_bytes_per_entry() {
        let bytes = [0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x00, 0x03, 0x00, 0x04, 0x00, 0x00];
        let table = LocalVariableTable::read(&mut &bytes[..]).unwrap();
        assert_eq!(
            table.local_variables,
            vec![LocalVariable {
                start_pc: 0,
                length: 5,
                name_index: 3,
                signature_index: 4,
                index: 0
            }]
        );
        assert_eq!(table.body_length(), bytes.len() as u32);
    }
}
