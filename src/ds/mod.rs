use num_traits::FromPrimitive;
use std::convert::TryFrom;

use super::err::*;

pub mod actions;
pub mod error_msg;
pub mod flow_instructions;
pub mod flow_match;
pub mod flow_mod;
pub mod group_mod;
pub mod hello;
pub mod hw_addr;
pub mod mem;
pub mod multipart;
pub mod oxm;
pub mod ports;

use self::error_msg::ErrorMsg;
use self::flow_mod::FlowMod;
use self::group_mod::GroupMod;
use self::hello::Hello;
use self::mem::{ByteCursor, ByteWriter};
use self::multipart::{MultipartReply, MultipartRequest};

/// Structures with a precomputed wire length that encode into a
/// caller supplied buffer.
pub trait Pack {
    /// Number of bytes `pack` writes.
    fn length(&self) -> usize;

    /// Encodes into `buf`, failing with `BufferTooSmall` if it cannot
    /// hold `length()` bytes. Returns the number of bytes written.
    fn pack(&self, buf: &mut [u8]) -> Result<usize>;

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.length()];
        let written = self.pack(&mut buf[..])?;
        buf.truncate(written);
        Ok(buf)
    }
}

/// defines an OpenFlow message
/// header + payload
#[derive(Getters, Debug, Clone, PartialEq)]
pub struct OfMsg {
    #[get = "pub"]
    header: Header,
    #[get = "pub"]
    payload: OfPayload,
}

impl OfMsg {
    pub fn new(header: Header, payload: OfPayload) -> Self {
        OfMsg {
            header: header,
            payload: payload,
        }
    }

    /// Builds a message for `version` with a header matching the payload.
    pub fn generate(version: Version, xid: u32, payload: OfPayload) -> Result<Self> {
        let ttype = payload.message_type();
        let raw_type = ttype.to_wire(version).ok_or::<Error>(
            ErrorKind::UnsupportedInVersion(format!("{:?}", ttype), version.wire()).into(),
        )?;
        let length = HEADER_LENGTH + payload.length();
        if length > u16::max_value() as usize {
            bail!(ErrorKind::BadLength(length, stringify!(OfMsg)));
        }
        Ok(OfMsg {
            header: Header::new(version.wire(), raw_type, length as u16, xid),
            payload: payload,
        })
    }

    pub fn into_payload(self) -> OfPayload {
        self.payload
    }
}

impl Pack for OfMsg {
    fn length(&self) -> usize {
        HEADER_LENGTH + self.payload.length()
    }

    fn pack(&self, buf: &mut [u8]) -> Result<usize> {
        let needed = self.length();
        if buf.len() < needed {
            bail!(ErrorKind::BufferTooSmall(needed, buf.len()));
        }
        let mut writer = ByteWriter::new(buf);
        let mut header = self.header.clone();
        header.length = needed as u16;
        header.write(&mut writer)?;
        let written = self.payload.pack(writer.reserve(needed - HEADER_LENGTH)?)?;
        Ok(HEADER_LENGTH + written)
    }
}

impl<'a> TryFrom<&'a [u8]> for OfMsg {
    type Error = Error;
    fn try_from(bytes: &'a [u8]) -> Result<Self> {
        let header = Header::try_from(bytes)?;
        let body = header.body(bytes)?;
        let ttype = header.message_type().ok_or::<Error>(
            ErrorKind::UnknownValue(header.ttype as u64, stringify!(Type)).into(),
        )?;
        let payload = OfPayload::unpack(header.ofp_version(), ttype, body)?;
        Ok(OfMsg {
            header: header,
            payload: payload,
        })
    }
}

/// OpenFlow message header length is 8 bytes.
pub const HEADER_LENGTH: usize = 8;

/// OpenFlow header struct.
///
/// Version and type are kept as raw wire values: a HELLO from a peer
/// speaking an unknown version must still be readable.
#[derive(Getters, Debug, PartialEq, Clone)]
pub struct Header {
    /// OpenFlow wire version
    #[get = "pub"]
    version: u8,
    /// OpenFlow message type, numbering depends on the version
    #[get = "pub"]
    ttype: u8,
    /// length of message including this header
    #[get = "pub"]
    length: u16,
    /// Transaction id associated with this packet.
    /// Replies use the same id as was in the request
    /// to facilitate pairing.
    #[get = "pub"]
    xid: u32,
}

impl Header {
    pub fn new(version: u8, ttype: u8, length: u16, xid: u32) -> Self {
        Header {
            version: version,
            ttype: ttype,
            length: length,
            xid: xid,
        }
    }

    /// returns the length of the payload in bytes
    /// equivalent to the length in the header - HEADER_LENGTH
    pub fn payload_length(&self) -> u16 {
        self.length.saturating_sub(HEADER_LENGTH as u16)
    }

    pub fn ofp_version(&self) -> Option<Version> {
        Version::from_u8(self.version)
    }

    pub fn message_type(&self) -> Option<Type> {
        Type::from_wire(self.version, self.ttype)
    }

    /// Slices the body out of a frame starting with this header.
    pub fn body<'a>(&self, frame: &'a [u8]) -> Result<&'a [u8]> {
        let length = self.length as usize;
        if length < HEADER_LENGTH {
            bail!(ErrorKind::BadLength(length, stringify!(Header)));
        }
        if frame.len() < length {
            bail!(ErrorKind::TruncatedMessage(length, frame.len(), stringify!(OfMsg)));
        }
        Ok(&frame[HEADER_LENGTH..length])
    }

    pub(crate) fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_u8(self.version)?;
        writer.write_u8(self.ttype)?;
        writer.write_u16(self.length)?;
        writer.write_u32(self.xid)
    }
}

impl Pack for Header {
    fn length(&self) -> usize {
        HEADER_LENGTH
    }

    fn pack(&self, buf: &mut [u8]) -> Result<usize> {
        let mut writer = ByteWriter::new(buf);
        self.write(&mut writer)?;
        Ok(HEADER_LENGTH)
    }
}

impl<'a> TryFrom<&'a [u8]> for Header {
    type Error = Error;
    fn try_from(bytes: &'a [u8]) -> Result<Self> {
        // check if bytes have correct length
        if bytes.len() < HEADER_LENGTH {
            bail!(ErrorKind::InvalidSliceLength(
                HEADER_LENGTH,
                bytes.len(),
                stringify!(Header),
            ));
        }
        let mut cursor = ByteCursor::new(bytes, stringify!(Header));
        Ok(Header {
            version: cursor.read_u8()?,
            ttype: cursor.read_u8()?,
            length: cursor.read_u16()?,
            xid: cursor.read_u32()?,
        })
    }
}

/// OpenFlow Version enum.
#[derive(Primitive, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub enum Version {
    /// indicates OpenFlow version 1.0
    V1_0 = 0x01,
    /// indicates OpenFlow version 1.1
    V1_1 = 0x02,
    /// indicates OpenFlow version 1.2
    V1_2 = 0x03,
    /// indicates OpenFlow version 1.3
    V1_3 = 0x04,
    /// indicates OpenFlow version 1.4
    V1_4 = 0x05,
}

impl Version {
    /// Versions this crate can encode and decode.
    pub const SUPPORTED: [Version; 3] = [Version::V1_0, Version::V1_2, Version::V1_3];

    pub fn wire(self) -> u8 {
        self as u8
    }

    pub fn is_supported(self) -> bool {
        Version::SUPPORTED.contains(&self)
    }
}

/// Enum of OpenFlow message types, named and numbered after OpenFlow 1.3.
#[derive(Primitive, PartialEq, Eq, Debug, Clone, Copy)]
pub enum Type {
    /* Immutable messages. */
    /// Hello message sent by switch and controller
    /// directly after establishing a connection.
    /// Symmetric message.
    Hello = 0,
    Error = 1,
    EchoRequest = 2,
    EchoReply = 3,
    Experimenter = 4,

    /* Switch configuration messages. */
    FeaturesRequest = 5,
    FeaturesReply = 6,
    GetConfigRequest = 7,
    GetConfigReply = 8,
    SetConfig = 9,

    /* Asynchronous messages. */
    PacketIn = 10,
    FlowRemoved = 11,
    PortStatus = 12,

    /* Controller command messages. */
    PacketOut = 13,
    FlowMod = 14,
    GroupMod = 15,
    PortMod = 16,
    TableMod = 17,

    /* Multipart messages. */
    MultipartRequest = 18,
    MultipartReply = 19,

    /* Barrier messages. */
    BarrierRequest = 20,
    BarrierReply = 21,

    /* Queue Configuration messages. */
    QueueGetConfigRequest = 22,
    QueueGetConfigReply = 23,
    /* Controller role change request messages. */
    RoleRequest = 24,
    RoleReply = 25,

    /* Asynchronous message configuration.  */
    GetAsyncRequest = 26,
    GetAsyncReply = 27,
    SetAsync = 28,

    /* Meters and rate limiters configuration messages. */
    MeterMod = 29,
}

/// OpenFlow 1.0 numbering of the types after FLOW_MOD.
const OF10_TAIL: [Type; 7] = [
    Type::PortMod,
    Type::MultipartRequest,
    Type::MultipartReply,
    Type::BarrierRequest,
    Type::BarrierReply,
    Type::QueueGetConfigRequest,
    Type::QueueGetConfigReply,
];

impl Type {
    /// Decodes a type byte. Types 0..=4 are the same in every version;
    /// unknown versions are read with that common prefix only.
    pub fn from_wire(version: u8, raw: u8) -> Option<Type> {
        match Version::from_u8(version) {
            Some(Version::V1_0) => {
                if raw <= Type::FlowMod as u8 {
                    Type::from_u8(raw)
                } else {
                    OF10_TAIL.get((raw - Type::GroupMod as u8) as usize).cloned()
                }
            }
            Some(Version::V1_2) if raw <= Type::RoleReply as u8 => Type::from_u8(raw),
            Some(Version::V1_3) => Type::from_u8(raw),
            _ if raw <= Type::Experimenter as u8 => Type::from_u8(raw),
            _ => None,
        }
    }

    /// Encodes the type for `version`, `None` if the version lacks it.
    pub fn to_wire(self, version: Version) -> Option<u8> {
        let raw = self as u8;
        match version {
            Version::V1_0 => {
                if raw <= Type::FlowMod as u8 {
                    Some(raw)
                } else {
                    OF10_TAIL
                        .iter()
                        .position(|t| *t == self)
                        .map(|idx| Type::GroupMod as u8 + idx as u8)
                }
            }
            Version::V1_2 if raw <= Type::RoleReply as u8 => Some(raw),
            Version::V1_3 => Some(raw),
            _ if raw <= Type::Experimenter as u8 => Some(raw),
            _ => None,
        }
    }
}

/// Message bodies. Types this crate does not model travel as `Raw`.
#[derive(Debug, Clone, PartialEq)]
pub enum OfPayload {
    Hello(Hello),
    Error(ErrorMsg),
    EchoRequest(Vec<u8>),
    EchoReply(Vec<u8>),
    FlowMod(FlowMod),
    GroupMod(GroupMod),
    MultipartRequest(MultipartRequest),
    MultipartReply(MultipartReply),
    Raw(Type, Vec<u8>),
}

impl OfPayload {
    pub fn message_type(&self) -> Type {
        match self {
            OfPayload::Hello(_) => Type::Hello,
            OfPayload::Error(_) => Type::Error,
            OfPayload::EchoRequest(_) => Type::EchoRequest,
            OfPayload::EchoReply(_) => Type::EchoReply,
            OfPayload::FlowMod(_) => Type::FlowMod,
            OfPayload::GroupMod(_) => Type::GroupMod,
            OfPayload::MultipartRequest(_) => Type::MultipartRequest,
            OfPayload::MultipartReply(_) => Type::MultipartReply,
            OfPayload::Raw(ttype, _) => *ttype,
        }
    }

    /// Decodes a body. Typed decoding needs a supported version; bodies
    /// of other versions are kept raw.
    pub fn unpack(version: Option<Version>, ttype: Type, bytes: &[u8]) -> Result<OfPayload> {
        let version = match version {
            Some(version) if version.is_supported() => version,
            _ => {
                return Ok(match ttype {
                    Type::Hello => OfPayload::Hello(Hello::try_from(bytes)?),
                    Type::Error => OfPayload::Error(ErrorMsg::try_from(bytes)?),
                    _ => OfPayload::Raw(ttype, bytes.to_vec()),
                })
            }
        };
        Ok(match ttype {
            Type::Hello => OfPayload::Hello(Hello::try_from(bytes)?),
            Type::Error => OfPayload::Error(ErrorMsg::try_from(bytes)?),
            Type::EchoRequest => OfPayload::EchoRequest(bytes.to_vec()),
            Type::EchoReply => OfPayload::EchoReply(bytes.to_vec()),
            Type::FlowMod if version != Version::V1_0 => {
                OfPayload::FlowMod(FlowMod::unpack(version, bytes)?)
            }
            Type::GroupMod => OfPayload::GroupMod(GroupMod::unpack(version, bytes)?),
            Type::MultipartRequest if version != Version::V1_0 => {
                OfPayload::MultipartRequest(MultipartRequest::unpack(version, bytes)?)
            }
            Type::MultipartReply if version != Version::V1_0 => {
                OfPayload::MultipartReply(MultipartReply::unpack(version, bytes)?)
            }
            _ => OfPayload::Raw(ttype, bytes.to_vec()),
        })
    }
}

impl Pack for OfPayload {
    fn length(&self) -> usize {
        match self {
            OfPayload::Hello(hello) => hello.length(),
            OfPayload::Error(error) => error.length(),
            OfPayload::EchoRequest(data) | OfPayload::EchoReply(data) => data.len(),
            OfPayload::FlowMod(flow_mod) => flow_mod.length(),
            OfPayload::GroupMod(group_mod) => group_mod.length(),
            OfPayload::MultipartRequest(request) => request.length(),
            OfPayload::MultipartReply(reply) => reply.length(),
            OfPayload::Raw(_, data) => data.len(),
        }
    }

    fn pack(&self, buf: &mut [u8]) -> Result<usize> {
        match self {
            OfPayload::Hello(hello) => hello.pack(buf),
            OfPayload::Error(error) => error.pack(buf),
            OfPayload::FlowMod(flow_mod) => flow_mod.pack(buf),
            OfPayload::GroupMod(group_mod) => group_mod.pack(buf),
            OfPayload::MultipartRequest(request) => request.pack(buf),
            OfPayload::MultipartReply(reply) => reply.pack(buf),
            OfPayload::EchoRequest(data)
            | OfPayload::EchoReply(data)
            | OfPayload::Raw(_, data) => {
                let mut writer = ByteWriter::new(buf);
                writer.write_bytes(&data[..])?;
                Ok(data.len())
            }
        }
    }
}
