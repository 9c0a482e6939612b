use num_traits::FromPrimitive;
use std::convert::TryFrom;

use super::flow_instructions::InstructionList;
use super::flow_match::Match;
use super::group_mod::GroupId;
use super::mem::{ByteCursor, ByteWriter};
use super::ports::{PortNo, PortNumber};
use super::{Pack, Version};

use super::super::err::*;

/// Fixed part in front of the match.
pub const FLOW_MOD_HEADER_LEN: usize = 40;
pub const DEFAULT_PRIORITY: u16 = 0x8000;
/// buffer_id for flow mods that do not refer to a buffered packet.
pub const NO_BUFFER: u32 = 0xffff_ffff;

/// FLOW_MOD body of OpenFlow 1.2 and 1.3. The version is the one of the
/// embedded match.
#[derive(Debug, PartialEq, Clone)]
pub struct FlowMod {
    pub cookie: u64,
    pub cookie_mask: u64,
    pub table_id: u8,
    pub command: FlowModCommand,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub priority: u16,
    pub buffer_id: u32,
    pub out_port: PortNumber,
    pub out_group: u32,
    pub flags: FlowModFlags,
    pub mmatch: Match,
    pub instructions: InstructionList,
}

impl FlowMod {
    pub fn new(command: FlowModCommand, mmatch: Match) -> Self {
        FlowMod {
            cookie: 0,
            cookie_mask: 0,
            table_id: 0,
            command: command,
            idle_timeout: 0,
            hard_timeout: 0,
            priority: DEFAULT_PRIORITY,
            buffer_id: NO_BUFFER,
            out_port: PortNumber::Reserved(PortNo::Any),
            out_group: GroupId::Any as u32,
            flags: FlowModFlags::empty(),
            mmatch: mmatch,
            instructions: InstructionList::new(),
        }
    }

    pub fn version(&self) -> Version {
        self.mmatch.version()
    }

    pub fn unpack(version: Version, bytes: &[u8]) -> Result<Self> {
        if version == Version::V1_0 {
            bail!(ErrorKind::UnsupportedInVersion(
                stringify!(FlowMod).to_string(),
                version.wire()
            ));
        }
        let mut cursor = ByteCursor::new(bytes, stringify!(FlowMod));
        let cookie = cursor.read_u64()?;
        let cookie_mask = cursor.read_u64()?;
        let table_id = cursor.read_u8()?;
        let command_raw = cursor.read_u8()?;
        let command = FlowModCommand::from_u8(command_raw).ok_or::<Error>(
            ErrorKind::UnknownValue(command_raw as u64, stringify!(FlowModCommand)).into(),
        )?;
        let idle_timeout = cursor.read_u16()?;
        let hard_timeout = cursor.read_u16()?;
        let priority = cursor.read_u16()?;
        let buffer_id = cursor.read_u32()?;
        let out_port = PortNumber::try_from(cursor.read_u32()?)?;
        let out_group = cursor.read_u32()?;
        let flags = FlowModFlags::from_bits_truncate(cursor.read_u16()?);
        cursor.skip(2)?;

        let rest = cursor.rest();
        let match_len = Match::read_len(version, rest)?;
        let mut cursor = ByteCursor::new(rest, stringify!(FlowMod));
        let mmatch = Match::unpack(version, cursor.read_bytes(match_len)?)?;
        let instructions = InstructionList::unpack(version, cursor.rest())?;

        Ok(FlowMod {
            cookie: cookie,
            cookie_mask: cookie_mask,
            table_id: table_id,
            command: command,
            idle_timeout: idle_timeout,
            hard_timeout: hard_timeout,
            priority: priority,
            buffer_id: buffer_id,
            out_port: out_port,
            out_group: out_group,
            flags: flags,
            mmatch: mmatch,
            instructions: instructions,
        })
    }
}

impl Pack for FlowMod {
    fn length(&self) -> usize {
        FLOW_MOD_HEADER_LEN + self.mmatch.length() + self.instructions.length()
    }

    fn pack(&self, buf: &mut [u8]) -> Result<usize> {
        let version = self.version();
        if version == Version::V1_0 {
            bail!(ErrorKind::UnsupportedInVersion(
                stringify!(FlowMod).to_string(),
                version.wire()
            ));
        }
        self.instructions.check_version(version)?;
        let needed = self.length();
        if buf.len() < needed {
            bail!(ErrorKind::BufferTooSmall(needed, buf.len()));
        }
        let mut writer = ByteWriter::new(buf);
        writer.write_u64(self.cookie)?;
        writer.write_u64(self.cookie_mask)?;
        writer.write_u8(self.table_id)?;
        writer.write_u8(self.command as u8)?;
        writer.write_u16(self.idle_timeout)?;
        writer.write_u16(self.hard_timeout)?;
        writer.write_u16(self.priority)?;
        writer.write_u32(self.buffer_id)?;
        writer.write_u32(self.out_port.into())?;
        writer.write_u32(self.out_group)?;
        writer.write_u16(self.flags.bits())?;
        writer.pad(2)?;
        let match_len = self.mmatch.length();
        self.mmatch.pack(writer.reserve(match_len)?)?;
        self.instructions.write(&mut writer)?;
        Ok(writer.position())
    }
}

#[derive(Primitive, PartialEq, Debug, Clone, Copy)]
pub enum FlowModCommand {
    ///  New flow.
    Add = 0,
    /// Modify all matching flows.
    Modify = 1,
    ///  Modify entry strictly matching wildcards and
    /// priority.
    ModifyStrict = 2,
    /// Delete all matching flows.
    Delete = 3,
    /// Delete entry strictly matching wildcards and
    /// priority.
    DeleteStrict = 4,
}

bitflags!{
    pub struct FlowModFlags: u16 {
        /// Send flow removed message when flow
        /// expires or is deleted.
        const SEND_FLOW_REM = 1 << 0;
        /// Check for overlapping entries first.
        const CHECK_OVERLAP = 1 << 1;
        /// Reset flow packet and byte counts.
        const RESET_COUNTS = 1 << 2;
        /// Don't keep track of packet count.
        const NO_PKT_COUNTS = 1 << 3;
        /// Don't keep track of byte count.
        const NO_BYT_COUNTS = 1 << 4;
    }
}

#[cfg(test)]
mod tests {
    use super::super::actions::{Action, ActionList};
    use super::super::flow_instructions::Instruction;
    use super::*;
    use std::net::Ipv4Addr;

    fn testee(version: Version) -> FlowMod {
        let mut mmatch = Match::new(version).unwrap();
        mmatch.set_eth_type(0x0800).unwrap();
        mmatch
            .set_ipv4_dst_masked(Ipv4Addr::new(10, 1, 0, 0), Ipv4Addr::new(255, 255, 0, 0))
            .unwrap();
        let mut flow_mod = FlowMod::new(FlowModCommand::Add, mmatch);
        flow_mod.cookie = 0x1234;
        flow_mod.table_id = 1;
        flow_mod.idle_timeout = 30;
        flow_mod.flags = FlowModFlags::SEND_FLOW_REM | FlowModFlags::CHECK_OVERLAP;
        flow_mod.instructions.push(Instruction::ApplyActions(ActionList::from(vec![
            Action::output(PortNumber::NormalPort(2)),
        ])));
        flow_mod.instructions.push(Instruction::GotoTable(2));
        flow_mod
    }

    #[test]
    fn into_tryfrom() {
        for version in &[Version::V1_2, Version::V1_3] {
            let testee = testee(*version);
            let bytes = testee.to_bytes().unwrap();
            assert_eq!(testee.length(), bytes.len());
            assert_eq!(testee, FlowMod::unpack(*version, &bytes[..]).unwrap());
        }
    }

    #[test]
    fn header_layout() {
        let bytes = testee(Version::V1_3).to_bytes().unwrap();
        assert_eq!(&[0u8, 0, 0, 0, 0, 0, 0x12, 0x34][..], &bytes[0..8]);
        assert_eq!(1, bytes[16]);
        assert_eq!(FlowModCommand::Add as u8, bytes[17]);
        assert_eq!(&[0x80u8, 0][..], &bytes[22..24]);
        assert_eq!(&[0xffu8, 0xff, 0xff, 0xff][..], &bytes[24..28]);
        assert_eq!(&[0u8, 3, 0, 0][..], &bytes[36..40]);
        // OXM match type follows the fixed part
        assert_eq!(&[0u8, 1][..], &bytes[40..42]);
    }

    #[test]
    fn meter_rejected_for_of12() {
        let mut flow_mod = testee(Version::V1_2);
        flow_mod.instructions.push(Instruction::Meter(1));
        assert!(flow_mod.to_bytes().is_err());
    }

    #[test]
    fn of10_not_supported() {
        let flow_mod = FlowMod::new(FlowModCommand::Delete, Match::new(Version::V1_0).unwrap());
        assert!(flow_mod.to_bytes().is_err());
    }
}
