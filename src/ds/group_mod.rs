use num_traits::FromPrimitive;

use super::super::err::*;
use super::actions::ActionList;
use super::mem::{ByteCursor, ByteWriter, MemoryArea};
use super::ports::PortNo;
use super::{Pack, Version};

/// len(2) weight(2) watch_port(4) watch_group(4) pad(4)
pub const BUCKET_HEADER_LEN: usize = 16;
/// command(2) type(1) pad(1) group_id(4)
pub const GROUP_MOD_HEADER_LEN: usize = 8;
/// Initial size of the serialization area; grows when buckets need more.
const GROUP_MOD_AREA_LEN: usize = GROUP_MOD_HEADER_LEN + 128;

/// Group numbering. Groups can use any number up to `Max`.
#[repr(u32)]
#[derive(Primitive, PartialEq, Debug, Clone, Copy)]
pub enum GroupId {
    /// Last usable group number.
    Max = 0xffffff00,
    /// Represents all groups for group delete commands.
    All = 0xfffffffc,
    /// Wildcard group used only for flow stats requests. Selects all flows
    /// regardless of group (including flows with no group).
    Any = 0xffffffff,
}

/// Group commands
#[derive(Primitive, PartialEq, Debug, Clone, Copy)]
pub enum GroupModCommand {
    /// New group.
    Add = 0,
    /// Modify all matching groups.
    Modify = 1,
    /// Delete all matching groups.
    Delete = 2,
}

/// Group types. Values in the range [128, 255] are reserved for experimental
/// use.
#[derive(Primitive, PartialEq, Debug, Clone, Copy)]
pub enum GroupType {
    /// All (multicast/broadcast) group.
    All = 0,
    /// Select group.
    Select = 1,
    /// Indirect group.
    Indirect = 2,
    /// Fast failover group.
    Ff = 3,
}

/// One action bucket of a group.
#[derive(Getters, Debug, Clone, PartialEq)]
pub struct Bucket {
    /// Relative weight of bucket. Only defined for select groups.
    #[get = "pub"]
    weight: u16,
    /// Port whose state affects whether this bucket is live. Only
    /// required for fast failover groups.
    #[get = "pub"]
    watch_port: u32,
    /// Group whose state affects whether this bucket is live. Only
    /// required for fast failover groups.
    #[get = "pub"]
    watch_group: u32,
    #[get = "pub"]
    actions: ActionList,
}

impl Bucket {
    pub fn new(weight: u16, watch_port: u32, watch_group: u32, actions: ActionList) -> Self {
        Bucket {
            weight: weight,
            watch_port: watch_port,
            watch_group: watch_group,
            actions: actions,
        }
    }

    /// Bucket that watches nothing, as used by all/select/indirect groups.
    pub fn unwatched(weight: u16, actions: ActionList) -> Self {
        Bucket::new(weight, PortNo::Any.value(), GroupId::Any as u32, actions)
    }

    pub fn actions_mut(&mut self) -> &mut ActionList {
        &mut self.actions
    }

    pub fn length(&self) -> usize {
        BUCKET_HEADER_LEN + self.actions.length()
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        let len = self.length();
        if len > u16::max_value() as usize {
            bail!(ErrorKind::BadLength(len, stringify!(Bucket)));
        }
        writer.write_u16(len as u16)?;
        writer.write_u16(self.weight)?;
        writer.write_u32(self.watch_port)?;
        writer.write_u32(self.watch_group)?;
        writer.pad(4)?;
        self.actions.write(writer)
    }

    /// `bytes` holds exactly one bucket, as delimited by its length field.
    fn read(bytes: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes, stringify!(Bucket));
        cursor.skip(2)?;
        let weight = cursor.read_u16()?;
        let watch_port = cursor.read_u32()?;
        let watch_group = cursor.read_u32()?;
        cursor.skip(4)?;
        Ok(Bucket {
            weight: weight,
            watch_port: watch_port,
            watch_group: watch_group,
            actions: ActionList::unpack(cursor.rest())?,
        })
    }
}

/// Buckets of a group, kept in wire order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BucketList {
    buckets: Vec<Bucket>,
}

impl BucketList {
    pub fn new() -> Self {
        BucketList {
            buckets: Vec::new(),
        }
    }

    pub fn push(&mut self, bucket: Bucket) {
        self.buckets.push(bucket);
    }

    pub fn get(&self, index: usize) -> Option<&Bucket> {
        self.buckets.get(index)
    }

    pub fn iter(&self) -> ::std::slice::Iter<Bucket> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        for bucket in &self.buckets {
            bucket.write(writer)?;
        }
        Ok(())
    }

    /// Splits `bytes` into buckets by their embedded length fields.
    ///
    /// A region shorter than one bucket header holds no buckets. Once
    /// decoding started every bucket must be complete.
    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes, stringify!(BucketList));
        let mut buckets = Vec::new();
        if cursor.remaining() < BUCKET_HEADER_LEN {
            if !cursor.is_empty() {
                debug!("Ignoring {} trailing bytes shorter than a bucket.", cursor.remaining());
            }
            return Ok(BucketList { buckets: buckets });
        }
        while !cursor.is_empty() {
            let len = cursor.peek_u16(0)?;
            if (len as usize) < BUCKET_HEADER_LEN {
                warn!("Bucket {} announces length {}.", buckets.len(), len);
                bail!(ErrorKind::BucketTooShort(len));
            }
            buckets.push(Bucket::read(cursor.read_bytes(len as usize)?)?);
        }
        trace!("Decoded {} buckets.", buckets.len());
        Ok(BucketList { buckets: buckets })
    }
}

impl From<Vec<Bucket>> for BucketList {
    fn from(buckets: Vec<Bucket>) -> Self {
        BucketList { buckets: buckets }
    }
}

impl<'a> IntoIterator for &'a BucketList {
    type Item = &'a Bucket;
    type IntoIter = ::std::slice::Iter<'a, Bucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.iter()
    }
}

impl Pack for BucketList {
    fn length(&self) -> usize {
        self.buckets.iter().map(|b| b.length()).sum()
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

/// GROUP_MOD body. Keeps its own serialization area that grows with the
/// buckets.
#[derive(Getters, Debug, Clone)]
pub struct GroupMod {
    #[get = "pub"]
    command: GroupModCommand,
    #[get = "pub"]
    group_type: GroupType,
    #[get = "pub"]
    group_id: u32,
    #[get = "pub"]
    buckets: BucketList,
    area: MemoryArea,
}

impl GroupMod {
    pub fn new(command: GroupModCommand, group_type: GroupType, group_id: u32) -> Self {
        GroupMod {
            command: command,
            group_type: group_type,
            group_id: group_id,
            buckets: BucketList::new(),
            area: MemoryArea::new(GROUP_MOD_AREA_LEN),
        }
    }

    pub fn with_buckets(mut self, buckets: BucketList) -> Self {
        self.buckets = buckets;
        self
    }

    pub fn buckets_mut(&mut self) -> &mut BucketList {
        &mut self.buckets
    }

    /// Packs into the internal area, growing it first if the buckets do
    /// not fit, and returns the encoded bytes.
    pub fn serialize(&mut self) -> Result<&[u8]> {
        let needed = self.length();
        self.area.ensure_len(needed);
        let mut area = ::std::mem::replace(&mut self.area, MemoryArea::default());
        let written = self.pack(area.as_mut_slice());
        self.area = area;
        let written = written?;
        Ok(&self.area.as_slice()[..written])
    }

    /// Current size of the serialization area.
    pub fn area_len(&self) -> usize {
        self.area.len()
    }

    pub fn unpack(version: Version, bytes: &[u8]) -> Result<Self> {
        if version == Version::V1_0 {
            bail!(ErrorKind::UnsupportedInVersion(
                stringify!(GroupMod).to_string(),
                version.wire()
            ));
        }
        let mut cursor = ByteCursor::new(bytes, stringify!(GroupMod));
        let command_raw = cursor.read_u16()?;
        let command = GroupModCommand::from_u16(command_raw).ok_or::<Error>(
            ErrorKind::UnknownValue(command_raw as u64, stringify!(GroupModCommand)).into(),
        )?;
        let ttype_raw = cursor.read_u8()?;
        let group_type = GroupType::from_u8(ttype_raw).ok_or::<Error>(
            ErrorKind::UnknownValue(ttype_raw as u64, stringify!(GroupType)).into(),
        )?;
        cursor.skip(1)?;
        let group_id = cursor.read_u32()?;
        let buckets = BucketList::unpack(cursor.rest())?;

        Ok(GroupMod::new(command, group_type, group_id).with_buckets(buckets))
    }
}

impl PartialEq for GroupMod {
    fn eq(&self, other: &GroupMod) -> bool {
        self.command == other.command
            && self.group_type == other.group_type
            && self.group_id == other.group_id
            && self.buckets == other.buckets
    }
}

impl Pack for GroupMod {
    fn length(&self) -> usize {
        GROUP_MOD_HEADER_LEN + self.buckets.length()
    }

    fn pack(&self, buf: &mut [u8]) -> Result<usize> {
        let needed = self.length();
        if buf.len() < needed {
            bail!(ErrorKind::BufferTooSmall(needed, buf.len()));
        }
        let mut writer = ByteWriter::new(buf);
        writer.write_u16(self.command as u16)?;
        writer.write_u8(self.group_type as u8)?;
        writer.pad(1)?;
        writer.write_u32(self.group_id)?;
        self.buckets.write(&mut writer)?;
        Ok(writer.position())
    }
}
