use num_traits::FromPrimitive;
use std::convert::TryFrom;

use super::super::err::*;
use super::mem::{pad_to_8, ByteCursor, ByteWriter};
use super::oxm::OxmEntry;
use super::ports::PortNumber;
use super::Pack;

/// type(2) + len(2)
pub const ACTION_HEADER_LEN: usize = 4;
/// Smallest action; every action is a multiple of this.
pub const ACTION_MIN_LEN: usize = 8;
pub const ACTION_OUTPUT_LEN: usize = 16;

/// OFPCML_NO_BUFFER: send the complete packet to the controller.
pub const CONTROLLER_MAX_LEN_NO_BUFFER: u16 = 0xffff;

#[derive(Primitive, Debug, PartialEq, Clone, Copy)]
pub enum ActionType {
    /// Output to switch port.
    Output = 0,
    /// Copy TTL "outwards" -- from next-to-outermost to outermost
    CopyTtlOut = 11,
    /// Copy TTL "inwards" -- from outermost to next-to-outermost
    CopyTtlIn = 12,
    /// MPLS TTL
    SetMplsTtl = 15,
    /// Decrement MPLS TTL
    DecMplsTtl = 16,
    /// Push a new VLAN tag
    PushVlan = 17,
    /// Pop the outer VLAN tag
    PopVlan = 18,
    /// Push a new MPLS tag
    PushMpls = 19,
    /// Pop the outer MPLS tag
    PopMpls = 20,
    /// Set queue id when outputting to a port
    SetQueue = 21,
    /// Apply group.
    Group = 22,
    /// IP TTL.
    SetNwTtl = 23,
    /// Decrement IP TTL.
    DecNwTtl = 24,
    /// Set a header field using OXM TLV format.
    SetField = 25,
    /// Push a new PBB service tag (I-TAG)
    PushPbb = 26,
    /// Pop the outer PBB service tag (I-TAG)
    PopPbb = 27,
    Experimenter = 0xffff,
}

/// A single action of an action list or bucket.
#[derive(Debug, PartialEq, Clone)]
pub enum Action {
    /// Sends packets out `port`. For the controller port `max_len` caps
    /// the number of packet bytes sent along.
    Output { port: PortNumber, max_len: u16 },
    CopyTtlOut,
    CopyTtlIn,
    SetMplsTtl(u8),
    DecMplsTtl,
    /// Ethertype of the new tag.
    PushVlan(u16),
    PopVlan,
    PushMpls(u16),
    /// Ethertype of the payload after the pop.
    PopMpls(u16),
    SetQueue(u32),
    Group(u32),
    SetNwTtl(u8),
    DecNwTtl,
    /// The OXM entry is padded so the action stays 8 byte aligned.
    SetField(OxmEntry),
    PushPbb(u16),
    PopPbb,
    /// Experimenter id and opaque body. A decoded body keeps its padding.
    Experimenter(u32, Vec<u8>),
}

impl Action {
    pub fn output(port: PortNumber) -> Self {
        Action::Output {
            port: port,
            max_len: CONTROLLER_MAX_LEN_NO_BUFFER,
        }
    }

    pub fn action_type(&self) -> ActionType {
        match self {
            Action::Output { .. } => ActionType::Output,
            Action::CopyTtlOut => ActionType::CopyTtlOut,
            Action::CopyTtlIn => ActionType::CopyTtlIn,
            Action::SetMplsTtl(_) => ActionType::SetMplsTtl,
            Action::DecMplsTtl => ActionType::DecMplsTtl,
            Action::PushVlan(_) => ActionType::PushVlan,
            Action::PopVlan => ActionType::PopVlan,
            Action::PushMpls(_) => ActionType::PushMpls,
            Action::PopMpls(_) => ActionType::PopMpls,
            Action::SetQueue(_) => ActionType::SetQueue,
            Action::Group(_) => ActionType::Group,
            Action::SetNwTtl(_) => ActionType::SetNwTtl,
            Action::DecNwTtl => ActionType::DecNwTtl,
            Action::SetField(_) => ActionType::SetField,
            Action::PushPbb(_) => ActionType::PushPbb,
            Action::PopPbb => ActionType::PopPbb,
            Action::Experimenter(..) => ActionType::Experimenter,
        }
    }

    /// Encoded length including the action header and padding.
    pub fn length(&self) -> usize {
        match self {
            Action::Output { .. } => ACTION_OUTPUT_LEN,
            Action::SetField(entry) => pad_to_8(ACTION_HEADER_LEN + entry.length()),
            Action::Experimenter(_, data) => pad_to_8(ACTION_HEADER_LEN + 4 + data.len()),
            _ => ACTION_MIN_LEN,
        }
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        let len = self.length();
        if len > u16::max_value() as usize {
            bail!(ErrorKind::BadLength(len, stringify!(Action)));
        }
        let start = writer.position();
        writer.write_u16(self.action_type() as u16)?;
        writer.write_u16(len as u16)?;
        match self {
            Action::Output { port, max_len } => {
                writer.write_u32((*port).into())?;
                writer.write_u16(*max_len)?;
            }
            Action::SetMplsTtl(ttl) | Action::SetNwTtl(ttl) => writer.write_u8(*ttl)?,
            Action::PushVlan(ethertype)
            | Action::PushMpls(ethertype)
            | Action::PopMpls(ethertype)
            | Action::PushPbb(ethertype) => writer.write_u16(*ethertype)?,
            Action::SetQueue(id) | Action::Group(id) => writer.write_u32(*id)?,
            Action::SetField(entry) => entry.write(writer)?,
            Action::Experimenter(experimenter, data) => {
                writer.write_u32(*experimenter)?;
                writer.write_bytes(&data[..])?;
            }
            _ => (),
        }
        let written = writer.position() - start;
        writer.pad(len - written)
    }

    fn read(ttype: ActionType, body: &[u8]) -> Result<Action> {
        let mut cursor = ByteCursor::new(body, stringify!(Action));
        Ok(match ttype {
            ActionType::Output => Action::Output {
                port: PortNumber::try_from(cursor.read_u32()?)?,
                max_len: cursor.read_u16()?,
            },
            ActionType::CopyTtlOut => Action::CopyTtlOut,
            ActionType::CopyTtlIn => Action::CopyTtlIn,
            ActionType::SetMplsTtl => Action::SetMplsTtl(cursor.read_u8()?),
            ActionType::DecMplsTtl => Action::DecMplsTtl,
            ActionType::PushVlan => Action::PushVlan(cursor.read_u16()?),
            ActionType::PopVlan => Action::PopVlan,
            ActionType::PushMpls => Action::PushMpls(cursor.read_u16()?),
            ActionType::PopMpls => Action::PopMpls(cursor.read_u16()?),
            ActionType::SetQueue => Action::SetQueue(cursor.read_u32()?),
            ActionType::Group => Action::Group(cursor.read_u32()?),
            ActionType::SetNwTtl => Action::SetNwTtl(cursor.read_u8()?),
            ActionType::DecNwTtl => Action::DecNwTtl,
            // the rest of the body is padding
            ActionType::SetField => Action::SetField(OxmEntry::read(&mut cursor)?),
            ActionType::PushPbb => Action::PushPbb(cursor.read_u16()?),
            ActionType::PopPbb => Action::PopPbb,
            ActionType::Experimenter => {
                Action::Experimenter(cursor.read_u32()?, cursor.rest().to_vec())
            }
        })
    }
}

/// Ordered list of actions as carried by buckets and apply/write
/// actions instructions.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct ActionList {
    actions: Vec<Action>,
}

impl ActionList {
    pub fn new() -> Self {
        ActionList {
            actions: Vec::new(),
        }
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn iter(&self) -> ::std::slice::Iter<Action> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub(crate) fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        for action in &self.actions {
            action.write(writer)?;
        }
        Ok(())
    }

    /// Decodes actions until `bytes` is used up.
    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes, stringify!(ActionList));
        let mut actions = Vec::new();
        while !cursor.is_empty() {
            let raw_ttype = cursor.peek_u16(0)?;
            let len = cursor.peek_u16(2)? as usize;
            if len < ACTION_MIN_LEN || len % ACTION_MIN_LEN != 0 {
                warn!("Action of type {} announces bad length {}.", raw_ttype, len);
                bail!(ErrorKind::BadLength(len, stringify!(Action)));
            }
            let raw = cursor.read_bytes(len)?;
            let ttype = ActionType::from_u16(raw_ttype).ok_or::<Error>(
                ErrorKind::UnknownValue(raw_ttype as u64, stringify!(ActionType)).into(),
            )?;
            actions.push(Action::read(ttype, &raw[ACTION_HEADER_LEN..])?);
        }
        Ok(ActionList { actions: actions })
    }
}

impl From<Vec<Action>> for ActionList {
    fn from(actions: Vec<Action>) -> Self {
        ActionList { actions: actions }
    }
}

impl<'a> IntoIterator for &'a ActionList {
    type Item = &'a Action;
    type IntoIter = ::std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl Pack for ActionList {
    fn length(&self) -> usize {
        self.actions.iter().map(|a| a.length()).sum()
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
