//! Multipart (statistics) request and reply framing with group
//! statistics bodies. Other multipart types travel as raw bodies.

use num_traits::FromPrimitive;

use super::super::err::*;
use super::mem::{ByteCursor, ByteWriter};
use super::{Pack, Version};

/// type(2) flags(2) pad(4)
pub const MULTIPART_HEADER_LEN: usize = 8;
/// group_id(4) pad(4)
pub const GROUP_STATS_REQUEST_LEN: usize = 8;
/// packet_count(8) byte_count(8)
pub const BUCKET_COUNTER_LEN: usize = 16;
pub const OF12_GROUP_STATS_LEN: usize = 32;
/// OpenFlow 1.3 adds duration_sec(4) duration_nsec(4).
pub const OF13_GROUP_STATS_LEN: usize = 40;

bitflags!{
    pub struct MultipartRequestFlags: u16 {
        /// More requests to follow.
        const REQ_MORE = 1 << 0;
    }
}

bitflags!{
    pub struct MultipartReplyFlags: u16 {
        /// More replies to follow.
        const REPLY_MORE = 1 << 0;
    }
}

#[derive(Primitive, PartialEq, Debug, Clone, Copy)]
pub enum MultipartTypes {
    /// Description of this OpenFlow switch.
    /// The request body is empty.
    /// The reply body is struct ofp_desc.
    Desc = 0,
    /// Individual flow statistics.
    Flow = 1,
    /// Aggregate flow statistics.
    Aggregate = 2,
    /// Flow table statistics.
    Table = 3,
    /// Port statistics.
    PortStats = 4,
    /// Queue statistics for a port
    Queue = 5,
    /// Group counter statistics.
    /// The request body is struct ofp_group_stats_request.
    /// The reply is an array of struct ofp_group_stats.
    Group = 6,
    /// Group description.
    GroupDesc = 7,
    /// Group features.
    GroupFeatures = 8,
    /// Meter statistics.
    Meter = 9,
    /// Meter configuration.
    MeterConfig = 10,
    /// Meter features.
    MeterFeatures = 11,
    /// Table features.
    TableFeatures = 12,
    /// Port description.
    PortDesc = 13,
    /// Experimenter extension.
    Experimenter = 0xffff,
}

fn group_stats_len(version: Version) -> usize {
    if version >= Version::V1_3 {
        OF13_GROUP_STATS_LEN
    } else {
        OF12_GROUP_STATS_LEN
    }
}

fn ensure_multipart_version(version: Version) -> Result<()> {
    if version == Version::V1_0 {
        bail!(ErrorKind::UnsupportedInVersion(
            "multipart framing".to_string(),
            version.wire()
        ));
    }
    Ok(())
}

/// Counters of one bucket.
#[derive(Getters, Debug, Clone, Copy, PartialEq, Default)]
pub struct BucketCounter {
    /// Number of packets processed by bucket.
    #[get = "pub"]
    packet_count: u64,
    /// Number of bytes processed by bucket.
    #[get = "pub"]
    byte_count: u64,
}

impl BucketCounter {
    pub fn new(packet_count: u64, byte_count: u64) -> Self {
        BucketCounter {
            packet_count: packet_count,
            byte_count: byte_count,
        }
    }
}

/// Statistics of one group. The duration is only carried by OpenFlow 1.3
/// and reads as zero from older replies.
#[derive(Getters, Debug, Clone, PartialEq, Default)]
pub struct GroupStats {
    #[get = "pub"]
    group_id: u32,
    /// Number of flows or groups that directly forward to this group.
    #[get = "pub"]
    ref_count: u32,
    #[get = "pub"]
    packet_count: u64,
    #[get = "pub"]
    byte_count: u64,
    /// Time group has been alive in seconds.
    #[get = "pub"]
    duration_sec: u32,
    /// Time group has been alive in nanoseconds beyond duration_sec.
    #[get = "pub"]
    duration_nsec: u32,
    #[get = "pub"]
    bucket_stats: Vec<BucketCounter>,
}

impl GroupStats {
    pub fn new(group_id: u32, ref_count: u32, packet_count: u64, byte_count: u64) -> Self {
        GroupStats {
            group_id: group_id,
            ref_count: ref_count,
            packet_count: packet_count,
            byte_count: byte_count,
            ..Default::default()
        }
    }

    pub fn with_duration(mut self, sec: u32, nsec: u32) -> Self {
        self.duration_sec = sec;
        self.duration_nsec = nsec;
        self
    }

    pub fn with_bucket_stats(mut self, bucket_stats: Vec<BucketCounter>) -> Self {
        self.bucket_stats = bucket_stats;
        self
    }

    pub fn length(&self, version: Version) -> usize {
        group_stats_len(version) + self.bucket_stats.len() * BUCKET_COUNTER_LEN
    }

    fn write(&self, version: Version, writer: &mut ByteWriter) -> Result<()> {
        let len = self.length(version);
        if len > u16::max_value() as usize {
            bail!(ErrorKind::BadLength(len, stringify!(GroupStats)));
        }
        writer.write_u16(len as u16)?;
        writer.pad(2)?;
        writer.write_u32(self.group_id)?;
        writer.write_u32(self.ref_count)?;
        writer.pad(4)?;
        writer.write_u64(self.packet_count)?;
        writer.write_u64(self.byte_count)?;
        if version >= Version::V1_3 {
            writer.write_u32(self.duration_sec)?;
            writer.write_u32(self.duration_nsec)?;
        }
        for counter in &self.bucket_stats {
            writer.write_u64(counter.packet_count)?;
            writer.write_u64(counter.byte_count)?;
        }
        Ok(())
    }

    fn read(version: Version, cursor: &mut ByteCursor) -> Result<Self> {
        let fixed = group_stats_len(version);
        let len = cursor.peek_u16(0)? as usize;
        if len < fixed || (len - fixed) % BUCKET_COUNTER_LEN != 0 {
            warn!("Group stats entry announces length {} in {:?}.", len, version);
            bail!(ErrorKind::BadLength(len, stringify!(GroupStats)));
        }
        let mut entry = ByteCursor::new(cursor.read_bytes(len)?, stringify!(GroupStats));
        entry.skip(4)?;
        let group_id = entry.read_u32()?;
        let ref_count = entry.read_u32()?;
        entry.skip(4)?;
        let packet_count = entry.read_u64()?;
        let byte_count = entry.read_u64()?;
        let mut stats = GroupStats::new(group_id, ref_count, packet_count, byte_count);
        if version >= Version::V1_3 {
            stats.duration_sec = entry.read_u32()?;
            stats.duration_nsec = entry.read_u32()?;
        }
        while !entry.is_empty() {
            stats
                .bucket_stats
                .push(BucketCounter::new(entry.read_u64()?, entry.read_u64()?));
        }
        Ok(stats)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReqPayload {
    /// Group id, `GroupId::All` for every group.
    GroupStats(u32),
    Raw(Vec<u8>),
}

/// MULTIPART_REQUEST body.
#[derive(Getters, Debug, Clone, PartialEq)]
pub struct MultipartRequest {
    #[get = "pub"]
    version: Version,
    #[get = "pub"]
    ttype: u16,
    #[get = "pub"]
    flags: MultipartRequestFlags,
    #[get = "pub"]
    payload: ReqPayload,
}

impl MultipartRequest {
    pub fn group_stats(version: Version, group_id: u32) -> Self {
        MultipartRequest {
            version: version,
            ttype: MultipartTypes::Group as u16,
            flags: MultipartRequestFlags::empty(),
            payload: ReqPayload::GroupStats(group_id),
        }
    }

    pub fn multipart_type(&self) -> Option<MultipartTypes> {
        MultipartTypes::from_u16(self.ttype)
    }

    pub fn unpack(version: Version, bytes: &[u8]) -> Result<Self> {
        ensure_multipart_version(version)?;
        let mut cursor = ByteCursor::new(bytes, stringify!(MultipartRequest));
        let ttype = cursor.read_u16()?;
        let flags = MultipartRequestFlags::from_bits_truncate(cursor.read_u16()?);
        cursor.skip(4)?;
        let payload = match MultipartTypes::from_u16(ttype) {
            Some(MultipartTypes::Group) => {
                let group_id = cursor.read_u32()?;
                cursor.skip(4)?;
                ReqPayload::GroupStats(group_id)
            }
            _ => ReqPayload::Raw(cursor.rest().to_vec()),
        };
        Ok(MultipartRequest {
            version: version,
            ttype: ttype,
            flags: flags,
            payload: payload,
        })
    }
}

impl Pack for MultipartRequest {
    fn length(&self) -> usize {
        MULTIPART_HEADER_LEN
            + match self.payload {
                ReqPayload::GroupStats(_) => GROUP_STATS_REQUEST_LEN,
                ReqPayload::Raw(ref body) => body.len(),
            }
    }

    fn pack(&self, buf: &mut [u8]) -> Result<usize> {
        let needed = self.length();
        if buf.len() < needed {
            bail!(ErrorKind::BufferTooSmall(needed, buf.len()));
        }
        let mut writer = ByteWriter::new(buf);
        writer.write_u16(self.ttype)?;
        writer.write_u16(self.flags.bits())?;
        writer.pad(4)?;
        match self.payload {
            ReqPayload::GroupStats(group_id) => {
                writer.write_u32(group_id)?;
                writer.pad(4)?;
            }
            ReqPayload::Raw(ref body) => writer.write_bytes(&body[..])?,
        }
        Ok(writer.position())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RepPayload {
    GroupStats(Vec<GroupStats>),
    Raw(Vec<u8>),
}

/// MULTIPART_REPLY body.
#[derive(Getters, Debug, Clone, PartialEq)]
pub struct MultipartReply {
    #[get = "pub"]
    version: Version,
    #[get = "pub"]
    ttype: u16,
    #[get = "pub"]
    flags: MultipartReplyFlags,
    #[get = "pub"]
    payload: RepPayload,
}

impl MultipartReply {
    pub fn group_stats(version: Version, stats: Vec<GroupStats>) -> Self {
        MultipartReply {
            version: version,
            ttype: MultipartTypes::Group as u16,
            flags: MultipartReplyFlags::empty(),
            payload: RepPayload::GroupStats(stats),
        }
    }

    pub fn with_flags(mut self, flags: MultipartReplyFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn multipart_type(&self) -> Option<MultipartTypes> {
        MultipartTypes::from_u16(self.ttype)
    }

    /// True if the switch announced further replies for this xid.
    pub fn has_more(&self) -> bool {
        self.flags.contains(MultipartReplyFlags::REPLY_MORE)
    }

    pub fn unpack(version: Version, bytes: &[u8]) -> Result<Self> {
        ensure_multipart_version(version)?;
        let mut cursor = ByteCursor::new(bytes, stringify!(MultipartReply));
        let ttype = cursor.read_u16()?;
        let flags = MultipartReplyFlags::from_bits_truncate(cursor.read_u16()?);
        cursor.skip(4)?;
        let payload = match MultipartTypes::from_u16(ttype) {
            Some(MultipartTypes::Group) => {
                let mut stats = Vec::new();
                while !cursor.is_empty() {
                    stats.push(GroupStats::read(version, &mut cursor)?);
                }
                RepPayload::GroupStats(stats)
            }
            _ => RepPayload::Raw(cursor.rest().to_vec()),
        };
        Ok(MultipartReply {
            version: version,
            ttype: ttype,
            flags: flags,
            payload: payload,
        })
    }
}

impl Pack for MultipartReply {
    fn length(&self) -> usize {
        MULTIPART_HEADER_LEN
            + match self.payload {
                RepPayload::GroupStats(ref stats) => {
                    stats.iter().map(|s| s.length(self.version)).sum()
                }
                RepPayload::Raw(ref body) => body.len(),
            }
    }

    fn pack(&self, buf: &mut [u8]) -> Result<usize> {
        let needed = self.length();
        if buf.len() < needed {
            bail!(ErrorKind::BufferTooSmall(needed, buf.len()));
        }
        let mut writer = ByteWriter::new(buf);
        writer.write_u16(self.ttype)?;
        writer.write_u16(self.flags.bits())?;
        writer.pad(4)?;
        match self.payload {
            RepPayload::GroupStats(ref stats) => {
                for entry in stats {
                    entry.write(self.version, &mut writer)?;
                }
            }
            RepPayload::Raw(ref body) => writer.write_bytes(&body[..])?,
        }
        Ok(writer.position())
    }
}
