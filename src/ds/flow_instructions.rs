use num_traits::FromPrimitive;

use super::super::err::*;
use super::actions::ActionList;
use super::mem::{ByteCursor, ByteWriter};
use super::{Pack, Version};

/// type(2) + len(2)
pub const INSTRUCTION_HEADER_LEN: usize = 4;
pub const INSTRUCTION_MIN_LEN: usize = 8;
const WRITE_METADATA_LEN: usize = 24;

#[derive(Primitive, Debug, PartialEq, Clone, Copy)]
pub enum InstructionType {
    /// Setup the next table in the lookup pipeline
    GotoTable = 1,
    /// Setup the metadata field for use later in pipeline
    WriteMetadata = 2,
    /// Write the action(s) onto the datapath action set
    WriteActions = 3,
    /// Applies the action(s) immediately
    ApplyActions = 4,
    /// Clears all actions from the datapath
    /// action set
    ClearActions = 5,
    /// Apply meter (rate limiter)
    Meter = 6,
    /// Experimenter instruction
    Experimenter = 0xFFFF,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Instruction {
    /// Set next table in the lookup pipeline.
    GotoTable(u8),
    WriteMetadata { metadata: u64, metadata_mask: u64 },
    WriteActions(ActionList),
    ApplyActions(ActionList),
    ClearActions,
    /// OpenFlow 1.3 only.
    Meter(u32),
}

impl Instruction {
    pub fn instruction_type(&self) -> InstructionType {
        match self {
            Instruction::GotoTable(_) => InstructionType::GotoTable,
            Instruction::WriteMetadata { .. } => InstructionType::WriteMetadata,
            Instruction::WriteActions(_) => InstructionType::WriteActions,
            Instruction::ApplyActions(_) => InstructionType::ApplyActions,
            Instruction::ClearActions => InstructionType::ClearActions,
            Instruction::Meter(_) => InstructionType::Meter,
        }
    }

    pub fn length(&self) -> usize {
        match self {
            Instruction::WriteMetadata { .. } => WRITE_METADATA_LEN,
            Instruction::WriteActions(actions) | Instruction::ApplyActions(actions) => {
                INSTRUCTION_MIN_LEN + actions.length()
            }
            _ => INSTRUCTION_MIN_LEN,
        }
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_u16(self.instruction_type() as u16)?;
        writer.write_u16(self.length() as u16)?;
        match self {
            Instruction::GotoTable(table_id) => {
                writer.write_u8(*table_id)?;
                writer.pad(3)
            }
            Instruction::WriteMetadata {
                metadata,
                metadata_mask,
            } => {
                writer.pad(4)?;
                writer.write_u64(*metadata)?;
                writer.write_u64(*metadata_mask)
            }
            Instruction::WriteActions(actions) | Instruction::ApplyActions(actions) => {
                writer.pad(4)?;
                actions.write(writer)
            }
            Instruction::ClearActions => writer.pad(4),
            Instruction::Meter(meter_id) => writer.write_u32(*meter_id),
        }
    }

    fn read(ttype: InstructionType, body: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(body, stringify!(Instruction));
        Ok(match ttype {
            InstructionType::GotoTable => Instruction::GotoTable(cursor.read_u8()?),
            InstructionType::WriteMetadata => {
                cursor.skip(4)?;
                Instruction::WriteMetadata {
                    metadata: cursor.read_u64()?,
                    metadata_mask: cursor.read_u64()?,
                }
            }
            InstructionType::WriteActions => {
                cursor.skip(4)?;
                Instruction::WriteActions(ActionList::unpack(cursor.rest())?)
            }
            InstructionType::ApplyActions => {
                cursor.skip(4)?;
                Instruction::ApplyActions(ActionList::unpack(cursor.rest())?)
            }
            InstructionType::ClearActions => Instruction::ClearActions,
            InstructionType::Meter => Instruction::Meter(cursor.read_u32()?),
            InstructionType::Experimenter => {
                bail!(ErrorKind::UnsupportedFeature("experimenter instruction"))
            }
        })
    }
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct InstructionList {
    instructions: Vec<Instruction>,
}

impl InstructionList {
    pub fn new() -> Self {
        InstructionList {
            instructions: Vec::new(),
        }
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn iter(&self) -> ::std::slice::Iter<Instruction> {
        self.instructions.iter()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Fails if an instruction does not exist in `version`.
    pub fn check_version(&self, version: Version) -> Result<()> {
        if version < Version::V1_3 {
            if let Some(meter) = self.instructions.iter().find(|i| match i {
                Instruction::Meter(_) => true,
                _ => false,
            }) {
                bail!(ErrorKind::UnsupportedInVersion(
                    format!("{:?}", meter.instruction_type()),
                    version.wire()
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        for instruction in &self.instructions {
            instruction.write(writer)?;
        }
        Ok(())
    }

    pub fn unpack(version: Version, bytes: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes, stringify!(InstructionList));
        let mut instructions = Vec::new();
        while !cursor.is_empty() {
            let raw_ttype = cursor.peek_u16(0)?;
            let len = cursor.peek_u16(2)? as usize;
            if len < INSTRUCTION_MIN_LEN || len % 8 != 0 {
                warn!("Instruction of type {} announces bad length {}.", raw_ttype, len);
                bail!(ErrorKind::BadLength(len, stringify!(Instruction)));
            }
            let raw = cursor.read_bytes(len)?;
            let ttype = InstructionType::from_u16(raw_ttype).ok_or::<Error>(
                ErrorKind::UnknownValue(raw_ttype as u64, stringify!(InstructionType)).into(),
            )?;
            instructions.push(Instruction::read(ttype, &raw[INSTRUCTION_HEADER_LEN..])?);
        }
        let list = InstructionList {
            instructions: instructions,
        };
        list.check_version(version)?;
        Ok(list)
    }
}

impl From<Vec<Instruction>> for InstructionList {
    fn from(instructions: Vec<Instruction>) -> Self {
        InstructionList {
            instructions: instructions,
        }
    }
}

impl Pack for InstructionList {
    fn length(&self) -> usize {
        self.instructions.iter().map(|i| i.length()).sum()
    }

    fn pack(&self, buf: &mut [u8]) -> Result<usize> {
        let needed = self.length();
        if buf.len() < needed {
            bail!(ErrorKind::BufferTooSmall(needed, buf.len()));
        }
        let mut writer = ByteWriter::new(buf);
        self.write(&mut writer)?;
        Ok(writer.position())
    }
}
