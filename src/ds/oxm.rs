//! OpenFlow Extensible Match (OXM) TLVs.
//!
//! Wire layout of one entry:
//! class(2) field+hasmask(1) length(1) value(N) [mask(N)]
//! where `length` counts value and mask bytes.

use byteorder::{BigEndian, ByteOrder};
use num_traits::FromPrimitive;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::super::err::*;
use super::hw_addr::{self, EthernetAddress};
use super::mem::{ByteCursor, ByteWriter};
use super::{Pack, Version};

/// Length of the OXM TLV header in bytes.
pub const OXM_HEADER_LENGTH: usize = 4;

/// VLAN id flag indicating a tag is present (OFPVID_PRESENT).
pub const VLAN_VID_PRESENT: u16 = 0x1000;
/// VLAN id value indicating no tag is present (OFPVID_NONE).
pub const VLAN_VID_NONE: u16 = 0x0000;

bitfield!{
    pub struct OxmTlvHeader(u32);
    impl Debug;

    u32;
    pub get_length, set_length: 7, 0;
    pub get_hasmask, set_hasmask: 8, 8;
    pub get_oxm_field, set_oxm_field: 15, 9;
    pub get_oxm_class, set_oxm_class: 31, 16;
}

impl OxmTlvHeader {
    fn for_entry(entry: &OxmEntry) -> Self {
        let mut header = OxmTlvHeader(0);
        header.set_oxm_class(entry.class as u32);
        header.set_oxm_field(entry.field as u32);
        header.set_hasmask(entry.mask.is_some() as u32);
        header.set_length(entry.payload_length() as u32);
        header
    }
}

/// OXM Class IDs.
/// The high order bit differentiate reserved classes from member classes.
/// Classes 0x0000 to 0x7FFF are member classes, allocated by ONF.
/// Classes 0x8000 to 0xFFFE are reserved classes, reserved for standardisation.
#[derive(Primitive, PartialEq, Debug, Clone, Copy)]
pub enum OxmClass {
    /// Backward compatibility with NXM
    Nxm0 = 0x0000,
    /// Backward compatibility with NXM
    Nxm1 = 0x0001,
    /// Basic class for OpenFlow
    OpenFlowBasic = 0x8000,
    /// Experimenter class
    Experimenter = 0xFFFF,
}

/// Fields of the OpenFlow basic class.
#[derive(Primitive, PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum OfbMatchFields {
    /// Switch input port.
    InPort = 0,
    /// Switch physical input port.
    InPhyPort = 1,
    /// Metadata passed between tables.
    Metadata = 2,
    /// Ethernet destination address.
    EthDst = 3,
    /// Ethernet source address.
    EthSrc = 4,
    /// Ethernet frame type.
    EthType = 5,
    /// VLAN id.
    VlanVid = 6,
    /// VLAN priority.
    VlanPcp = 7,
    /// IP DSCP (6 bits in ToS field).
    IpDscp = 8,
    /// IP ECN (2 bits in ToS field).
    IpEcn = 9,
    /// IP protocol.
    IpProto = 10,
    /// IPv4 source address.
    Ipv4Src = 11,
    /// IPv4 destination address.
    Ipv4Dst = 12,
    /// TCP source port.
    TcpSrc = 13,
    /// TCP destination port.
    TcpDst = 14,
    /// UDP source port.
    UdpSrc = 15,
    /// UDP destination port.
    UdpDst = 16,
    /// SCTP source port.
    SctpSrc = 17,
    /// SCTP destination port.
    SctpDst = 18,
    /// ICMP type.
    Icmpv4Type = 19,
    /// ICMP code.
    Icmpv4Code = 20,
    /// ARP opcode.
    ArpOp = 21,
    /// ARP source IPv4 address.
    ArpSpa = 22,
    /// ARP target IPv4 address.
    ArpTpa = 23,
    /// ARP source hardware address.
    ArpSha = 24,
    /// ARP target hardware address.
    ArpTha = 25,
    /// IPv6 source address.
    Ipv6Src = 26,
    /// IPv6 destination address.
    Ipv6Dst = 27,
    /// IPv6 Flow Label
    Ipv6Flabel = 28,
    /// ICMPv6 type.
    Icmpv6Type = 29,
    /// ICMPv6 code.
    Icmpv6Code = 30,
    /// Target address for ND.
    Ipv6NdTarget = 31,
    /// Source link-layer for ND.
    Ipv6NdSll = 32,
    /// Target link-layer for ND.
    Ipv6NdTll = 33,
    /// MPLS label.
    MplsLabel = 34,
    /// MPLS TC.
    MplsTc = 35,
    /// MPLS BoS bit.
    MplsBos = 36,
    /// PBB I-SID.
    PbbIsid = 37,
    /// Logical Port Metadata.
    TunnelId = 38,
    /// IPv6 Extension Header pseudo-field
    Ipv6Exthdr = 39,
    /// PPPoE code (extension).
    PppoeCode = 41,
    /// PPPoE type (extension).
    PppoeType = 42,
    /// PPPoE session id (extension).
    PppoeSid = 43,
    /// PPP protocol (extension).
    PppProt = 44,
}

impl OfbMatchFields {
    /// Width of the field's value in bytes.
    pub fn width(self) -> usize {
        use self::OfbMatchFields::*;
        match self {
            InPort | InPhyPort => 4,
            Metadata => 8,
            EthDst | EthSrc => 6,
            EthType | VlanVid => 2,
            VlanPcp | IpDscp | IpEcn | IpProto => 1,
            Ipv4Src | Ipv4Dst => 4,
            TcpSrc | TcpDst | UdpSrc | UdpDst | SctpSrc | SctpDst => 2,
            Icmpv4Type | Icmpv4Code => 1,
            ArpOp => 2,
            ArpSpa | ArpTpa => 4,
            ArpSha | ArpTha => 6,
            Ipv6Src | Ipv6Dst => 16,
            Ipv6Flabel => 4,
            Icmpv6Type | Icmpv6Code => 1,
            Ipv6NdTarget => 16,
            Ipv6NdSll | Ipv6NdTll => 6,
            MplsLabel => 4,
            MplsTc | MplsBos => 1,
            PbbIsid => 3,
            TunnelId => 8,
            Ipv6Exthdr => 2,
            PppoeCode | PppoeType => 1,
            PppoeSid | PppProt => 2,
        }
    }

    /// Whether the field can be carried by a match of `version`.
    pub fn available_in(self, version: Version) -> bool {
        use self::OfbMatchFields::*;
        match version {
            Version::V1_0 => match self {
                InPort | EthDst | EthSrc | EthType | VlanVid | VlanPcp | IpDscp | IpProto
                | Ipv4Src | Ipv4Dst | TcpSrc | TcpDst | UdpSrc | UdpDst | Icmpv4Type
                | Icmpv4Code => true,
                _ => false,
            },
            Version::V1_2 => match self {
                MplsBos | PbbIsid | TunnelId | Ipv6Exthdr => false,
                _ => true,
            },
            Version::V1_3 => true,
            _ => false,
        }
    }

    pub fn key(self) -> OxmKey {
        OxmKey {
            class: OxmClass::OpenFlowBasic as u16,
            field: self as u8,
        }
    }
}

/// Value width for a (class, field) pair, `None` when the pair is unknown.
pub fn oxm_width(class: u16, field: u8) -> Option<usize> {
    if class != OxmClass::OpenFlowBasic as u16 {
        return None;
    }
    OfbMatchFields::from_u8(field).map(OfbMatchFields::width)
}

/// Identity of an entry inside an `OxmList`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OxmKey {
    pub class: u16,
    pub field: u8,
}

impl OxmKey {
    pub fn ofb_field(&self) -> Option<OfbMatchFields> {
        if self.class != OxmClass::OpenFlowBasic as u16 {
            return None;
        }
        OfbMatchFields::from_u8(self.field)
    }
}

impl fmt::Display for OxmKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.ofb_field() {
            Some(field) => write!(f, "{:?}", field),
            None => write!(f, "{:#06x}:{}", self.class, self.field),
        }
    }
}

/// Conversion between typed values and OXM value bytes.
pub trait OxmValue: Sized {
    fn to_oxm_bytes(&self) -> Vec<u8>;
    fn from_oxm_bytes(bytes: &[u8]) -> Result<Self>;
}

macro_rules! oxm_value_uint {
    ($t:ty, $size:expr) => {
        impl OxmValue for $t {
            fn to_oxm_bytes(&self) -> Vec<u8> {
                let mut buf = [0u8; 8];
                BigEndian::write_u64(&mut buf, *self as u64);
                buf[8 - $size..].to_vec()
            }

            fn from_oxm_bytes(bytes: &[u8]) -> Result<Self> {
                if bytes.is_empty() || bytes.len() > $size {
                    bail!(ErrorKind::InvalidSliceLength(
                        $size,
                        bytes.len(),
                        stringify!($t)
                    ));
                }
                Ok(BigEndian::read_uint(bytes, bytes.len()) as $t)
            }
        }
    };
}

oxm_value_uint!(u8, 1);
oxm_value_uint!(u16, 2);
oxm_value_uint!(u32, 4);
oxm_value_uint!(u64, 8);

impl OxmValue for EthernetAddress {
    fn to_oxm_bytes(&self) -> Vec<u8> {
        self.to_vec()
    }

    fn from_oxm_bytes(bytes: &[u8]) -> Result<Self> {
        hw_addr::from_slice_eth(bytes)
    }
}

impl OxmValue for Ipv4Addr {
    fn to_oxm_bytes(&self) -> Vec<u8> {
        self.octets().to_vec()
    }

    fn from_oxm_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 4 {
            bail!(ErrorKind::InvalidSliceLength(4, bytes.len(), stringify!(Ipv4Addr)));
        }
        Ok(Ipv4Addr::from(BigEndian::read_u32(bytes)))
    }
}

impl OxmValue for Ipv6Addr {
    fn to_oxm_bytes(&self) -> Vec<u8> {
        self.octets().to_vec()
    }

    fn from_oxm_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 16 {
            bail!(ErrorKind::InvalidSliceLength(16, bytes.len(), stringify!(Ipv6Addr)));
        }
        let mut octets = [0u8; 16];
        octets.copy_from_slice(bytes);
        Ok(Ipv6Addr::from(octets))
    }
}

/// Cuts typed value bytes down to the wire width of a field.
/// Dropped leading bytes must be zero.
fn fit_width(mut bytes: Vec<u8>, width: usize, key: OxmKey) -> Result<Vec<u8>> {
    if bytes.len() < width {
        bail!(ErrorKind::InvalidSliceLength(width, bytes.len(), "OxmEntry"));
    }
    let excess = bytes.len() - width;
    if bytes[..excess].iter().any(|b| *b != 0) {
        warn!("Value for {} does not fit into {} bytes.", key, width);
        bail!(ErrorKind::IllegalValue(
            BigEndian::read_uint(&bytes[..excess.min(8)], excess.min(8)),
            "OxmEntry"
        ));
    }
    Ok(bytes.split_off(excess))
}

/// One OXM TLV: a field value and an optional mask of the same width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OxmEntry {
    class: u16,
    field: u8,
    value: Vec<u8>,
    mask: Option<Vec<u8>>,
}

impl OxmEntry {
    /// Raw constructor; checks the pair is known and the widths match.
    pub fn new(class: u16, field: u8, value: Vec<u8>, mask: Option<Vec<u8>>) -> Result<Self> {
        let width = oxm_width(class, field).ok_or::<Error>(ErrorKind::UnknownField(class, field).into())?;
        if value.len() != width {
            bail!(ErrorKind::BadLength(value.len(), "OxmEntry value"));
        }
        if let Some(ref mask) = mask {
            if mask.len() != width {
                bail!(ErrorKind::BadLength(mask.len(), "OxmEntry mask"));
            }
        }
        Ok(OxmEntry {
            class: class,
            field: field,
            value: value,
            mask: mask,
        })
    }

    /// Unmasked entry of the OpenFlow basic class.
    pub fn basic<T: OxmValue>(field: OfbMatchFields, value: &T) -> Result<Self> {
        let value = fit_width(value.to_oxm_bytes(), field.width(), field.key())?;
        OxmEntry::new(OxmClass::OpenFlowBasic as u16, field as u8, value, None)
    }

    /// Masked entry of the OpenFlow basic class.
    pub fn basic_masked<T: OxmValue>(field: OfbMatchFields, value: &T, mask: &T) -> Result<Self> {
        let value = fit_width(value.to_oxm_bytes(), field.width(), field.key())?;
        let mask = fit_width(mask.to_oxm_bytes(), field.width(), field.key())?;
        OxmEntry::new(OxmClass::OpenFlowBasic as u16, field as u8, value, Some(mask))
    }

    pub fn class(&self) -> u16 {
        self.class
    }

    pub fn field(&self) -> u8 {
        self.field
    }

    pub fn key(&self) -> OxmKey {
        OxmKey {
            class: self.class,
            field: self.field,
        }
    }

    pub fn ofb_field(&self) -> Option<OfbMatchFields> {
        self.key().ofb_field()
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    pub fn value(&self) -> &[u8] {
        &self.value[..]
    }

    pub fn mask(&self) -> Option<&[u8]> {
        self.mask.as_ref().map(|m| &m[..])
    }

    pub fn value_as<T: OxmValue>(&self) -> Result<T> {
        T::from_oxm_bytes(&self.value[..])
    }

    pub fn mask_as<T: OxmValue>(&self) -> Result<Option<T>> {
        match self.mask {
            Some(ref mask) => Ok(Some(T::from_oxm_bytes(&mask[..])?)),
            None => Ok(None),
        }
    }

    fn payload_length(&self) -> usize {
        if self.mask.is_some() {
            2 * self.value.len()
        } else {
            self.value.len()
        }
    }

    /// Encoded length including the TLV header.
    pub fn length(&self) -> usize {
        OXM_HEADER_LENGTH + self.payload_length()
    }

    fn mask_byte(&self, i: usize) -> u8 {
        match self.mask {
            Some(ref mask) => mask[i],
            None => 0xff,
        }
    }

    /// True if some packet can satisfy both entries.
    pub fn intersects(&self, other: &OxmEntry) -> bool {
        if self.key() != other.key() || self.value.len() != other.value.len() {
            return false;
        }
        (0..self.value.len()).all(|i| {
            let common = self.mask_byte(i) & other.mask_byte(i);
            self.value[i] & common == other.value[i] & common
        })
    }

    /// True if every packet satisfying `self` also satisfies `other`.
    pub fn is_part_of(&self, other: &OxmEntry) -> bool {
        if self.key() != other.key() || self.value.len() != other.value.len() {
            return false;
        }
        (0..self.value.len()).all(|i| {
            let mine = self.mask_byte(i);
            let theirs = other.mask_byte(i);
            theirs & !mine == 0 && self.value[i] & theirs == other.value[i] & theirs
        })
    }

    pub(crate) fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_u32(OxmTlvHeader::for_entry(self).0)?;
        writer.write_bytes(&self.value[..])?;
        if let Some(ref mask) = self.mask {
            writer.write_bytes(&mask[..])?;
        }
        Ok(())
    }

    pub(crate) fn read(cursor: &mut ByteCursor) -> Result<Self> {
        let header = OxmTlvHeader(cursor.read_u32()?);
        let class = header.get_oxm_class() as u16;
        let field = header.get_oxm_field() as u8;
        let has_mask = header.get_hasmask() == 1;
        let length = header.get_length() as usize;

        let width = match oxm_width(class, field) {
            Some(width) => width,
            None => {
                warn!("Unknown OXM field {} in class {:#06x}.", field, class);
                bail!(ErrorKind::UnknownField(class, field));
            }
        };
        let expected = if has_mask { 2 * width } else { width };
        if length != expected {
            warn!(
                "OXM field {} of class {:#06x} announces {} bytes, expected {}.",
                field, class, length, expected
            );
            bail!(ErrorKind::BadLength(length, "OxmEntry"));
        }

        let value = cursor.read_bytes(width)?.to_vec();
        let mask = if has_mask {
            Some(cursor.read_bytes(width)?.to_vec())
        } else {
            None
        };
        Ok(OxmEntry {
            class: class,
            field: field,
            value: value,
            mask: mask,
        })
    }
}

impl fmt::Display for OxmEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}=", self.key())?;
        for b in &self.value {
            write!(f, "{:02x}", b)?;
        }
        if let Some(ref mask) = self.mask {
            write!(f, "/")?;
            for b in mask {
                write!(f, "{:02x}", b)?;
            }
        }
        Ok(())
    }
}

/// Insertion ordered set of OXM entries, at most one per (class, field).
#[derive(Debug, Clone, Default)]
pub struct OxmList {
    entries: Vec<OxmEntry>,
}

impl OxmList {
    pub fn new() -> Self {
        OxmList {
            entries: Vec::new(),
        }
    }

    /// Inserts `entry`, replacing (in place) an entry with the same key.
    /// Returns the replaced entry.
    pub fn insert(&mut self, entry: OxmEntry) -> Option<OxmEntry> {
        let key = entry.key();
        match self.entries.iter().position(|e| e.key() == key) {
            Some(idx) => Some(::std::mem::replace(&mut self.entries[idx], entry)),
            None => {
                self.entries.push(entry);
                None
            }
        }
    }

    pub fn get(&self, key: OxmKey) -> Option<&OxmEntry> {
        self.entries.iter().find(|e| e.key() == key)
    }

    pub fn get_basic(&self, field: OfbMatchFields) -> Option<&OxmEntry> {
        self.get(field.key())
    }

    pub fn remove(&mut self, key: OxmKey) -> Option<OxmEntry> {
        let idx = self.entries.iter().position(|e| e.key() == key)?;
        Some(self.entries.remove(idx))
    }

    pub fn contains(&self, key: OxmKey) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> ::std::slice::Iter<OxmEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Flow overlap check: on every field both lists carry the masked
    /// values must intersect. A field missing on one side is a wildcard.
    pub fn overlaps(&self, other: &OxmList) -> bool {
        self.entries.iter().all(|mine| match other.get(mine.key()) {
            Some(theirs) => mine.intersects(theirs),
            None => true,
        })
    }

    /// Containment: every packet matched by `self` is matched by `other`.
    pub fn is_part_of(&self, other: &OxmList) -> bool {
        other.entries.iter().all(|theirs| match self.get(theirs.key()) {
            Some(mine) => mine.is_part_of(theirs),
            None => false,
        })
    }

    pub(crate) fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        for entry in &self.entries {
            entry.write(writer)?;
        }
        Ok(())
    }

    /// Decodes entries until `bytes` is exhausted.
    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes, "OxmList");
        let mut list = OxmList::new();
        while !cursor.is_empty() {
            let entry = OxmEntry::read(&mut cursor)?;
            trace!("Decoded OXM {}.", entry);
            if let Some(old) = list.insert(entry) {
                debug!("Duplicate OXM {} replaced.", old.key());
            }
        }
        Ok(list)
    }
}

impl Pack for OxmList {
    fn length(&self) -> usize {
        self.entries.iter().map(OxmEntry::length).sum()
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

impl PartialEq for OxmList {
    fn eq(&self, other: &OxmList) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|e| other.get(e.key()).map_or(false, |o| o == e))
    }
}

impl Eq for OxmList {}

impl<'a> IntoIterator for &'a OxmList {
    type Item = &'a OxmEntry;
    type IntoIter = ::std::slice::Iter<'a, OxmEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
