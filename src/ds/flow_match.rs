//! Version independent match.
//!
//! OpenFlow 1.2 and 1.3 carry an `OxmList` behind a type/length header,
//! OpenFlow 1.0 a fixed 40 byte structure with an explicit wildcard word.
//! `Match` hides the difference behind OXM style accessors: a field that
//! is absent is a wildcard in either representation.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::super::err::*;
use super::hw_addr::{self, EthernetAddress};
use super::mem::{pad_to_8, ByteCursor, ByteWriter};
use super::oxm::{OfbMatchFields, OxmEntry, OxmList, VLAN_VID_NONE, VLAN_VID_PRESENT};
use super::ports::{port_from_of10, port_to_of10};
use super::{Pack, Version};

/// Length of an OpenFlow 1.0 match.
pub const OF10_MATCH_LENGTH: usize = 40;
/// type(2) + length(2) in front of the OXM TLVs.
pub const OXM_MATCH_HEADER_LENGTH: usize = 4;

/// dl_vlan value of OpenFlow 1.0 for untagged packets.
pub const OF10_VLAN_NONE: u16 = 0xffff;

pub const OF10_NW_SRC_SHIFT: u32 = 8;
pub const OF10_NW_DST_SHIFT: u32 = 14;

/// The match type indicates the match structure (set of fields that compose the
/// match) in use. The match type is placed in the type field at the beginning
/// of all match structures. The "OpenFlow Extensible Match" type corresponds
/// to OXM TLV format described below and must be supported by all OpenFlow
/// switches. Extensions that define other match types may be published on the
/// ONF wiki. Support for extensions is optional.
#[derive(Primitive, PartialEq, Debug, Clone, Copy)]
pub enum MatchType {
    /// Deprecated.
    Standard = 0,
    /// OpenFlow Extensible Match
    Oxm = 1,
}

bitflags!{
    /// OpenFlow 1.0 wildcard word.
    pub struct Ofp10Wildcards: u32 {
        /// Switch input port.
        const IN_PORT = 1 << 0;
        /// VLAN id.
        const DL_VLAN = 1 << 1;
        /// Ethernet source address.
        const DL_SRC = 1 << 2;
        /// Ethernet destination address.
        const DL_DST = 1 << 3;
        /// Ethernet frame type.
        const DL_TYPE = 1 << 4;
        /// IP protocol.
        const NW_PROTO = 1 << 5;
        /// TCP/UDP source port.
        const TP_SRC = 1 << 6;
        /// TCP/UDP destination port.
        const TP_DST = 1 << 7;
        /// Number of wildcarded low bits of the IP source address.
        const NW_SRC_MASK = 0x3f << 8;
        const NW_SRC_ALL = 32 << 8;
        /// Number of wildcarded low bits of the IP destination address.
        const NW_DST_MASK = 0x3f << 14;
        const NW_DST_ALL = 32 << 14;
        /// VLAN priority.
        const DL_VLAN_PCP = 1 << 20;
        /// IP ToS (DSCP field, 6 bits).
        const NW_TOS = 1 << 21;
    }
}

/// Fields an OpenFlow 1.0 match can express, in wire order.
const OF10_FIELDS: [OfbMatchFields; 16] = [
    OfbMatchFields::InPort,
    OfbMatchFields::EthSrc,
    OfbMatchFields::EthDst,
    OfbMatchFields::VlanVid,
    OfbMatchFields::VlanPcp,
    OfbMatchFields::EthType,
    OfbMatchFields::IpDscp,
    OfbMatchFields::IpProto,
    OfbMatchFields::Ipv4Src,
    OfbMatchFields::Ipv4Dst,
    OfbMatchFields::TcpSrc,
    OfbMatchFields::UdpSrc,
    OfbMatchFields::Icmpv4Type,
    OfbMatchFields::TcpDst,
    OfbMatchFields::UdpDst,
    OfbMatchFields::Icmpv4Code,
];

fn unsupported(what: String, version: Version) -> Error {
    ErrorKind::UnsupportedInVersion(what, version.wire()).into()
}

/// An IPv4 address plus the number of wildcarded low bits (0..=31).
type Prefix = (u32, u8);

/// OpenFlow 1.0 match. Every member is `None` when wildcarded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ofp10Match {
    in_port: Option<u16>,
    dl_src: Option<EthernetAddress>,
    dl_dst: Option<EthernetAddress>,
    dl_vlan: Option<u16>,
    dl_vlan_pcp: Option<u8>,
    dl_type: Option<u16>,
    nw_tos: Option<u8>,
    nw_proto: Option<u8>,
    nw_src: Option<Prefix>,
    nw_dst: Option<Prefix>,
    /// tp_src with the OXM field it was set through
    tp_src: Option<(OfbMatchFields, u16)>,
    tp_dst: Option<(OfbMatchFields, u16)>,
}

impl Ofp10Match {
    /// Match with every field wildcarded.
    pub fn new() -> Self {
        Ofp10Match::default()
    }

    fn reject_mask(entry: &OxmEntry) -> Result<()> {
        if entry.has_mask() {
            return Err(unsupported(format!("masked {}", entry.key()), Version::V1_0));
        }
        Ok(())
    }

    /// Prefix for an IPv4 entry; `None` when the mask wildcards all bits.
    fn prefix_of(entry: &OxmEntry) -> Result<Option<Prefix>> {
        let addr = entry.value_as::<u32>()?;
        let mask = match entry.mask_as::<u32>()? {
            Some(mask) => mask,
            None => return Ok(Some((addr, 0))),
        };
        let host_bits = !mask;
        if host_bits & host_bits.wrapping_add(1) != 0 {
            warn!("IPv4 mask {:#010x} is not a prefix, OpenFlow 1.0 cannot carry it.", mask);
            bail!(ErrorKind::IllegalValue(mask as u64, "OpenFlow 1.0 IPv4 mask"));
        }
        let wildcarded = mask.count_zeros();
        if wildcarded >= 32 {
            Ok(None)
        } else {
            Ok(Some((addr, wildcarded as u8)))
        }
    }

    fn prefix_entry(field: OfbMatchFields, prefix: Prefix) -> Result<OxmEntry> {
        let (addr, wildcarded) = prefix;
        let addr = Ipv4Addr::from(addr);
        if wildcarded == 0 {
            OxmEntry::basic(field, &addr)
        } else {
            let mask = Ipv4Addr::from(!0u32 << wildcarded as u32);
            OxmEntry::basic_masked(field, &addr, &mask)
        }
    }

    /// The OXM fields tp_src/tp_dst decode as for a given IP protocol.
    fn transport_fields(nw_proto: Option<u8>) -> (OfbMatchFields, OfbMatchFields) {
        match nw_proto {
            Some(17) => (OfbMatchFields::UdpSrc, OfbMatchFields::UdpDst),
            Some(1) => (OfbMatchFields::Icmpv4Type, OfbMatchFields::Icmpv4Code),
            _ => (OfbMatchFields::TcpSrc, OfbMatchFields::TcpDst),
        }
    }

    /// tp_src/tp_dst carry no field identity on the wire, so every set
    /// transport member must be the one `nw_proto` selects.
    fn check_transport(
        nw_proto: Option<u8>,
        tp_src: Option<(OfbMatchFields, u16)>,
        tp_dst: Option<(OfbMatchFields, u16)>,
    ) -> Result<()> {
        let (src_field, dst_field) = Ofp10Match::transport_fields(nw_proto);
        let mismatch = tp_src.map_or(false, |(field, _)| field != src_field)
            || tp_dst.map_or(false, |(field, _)| field != dst_field);
        if mismatch {
            warn!(
                "OpenFlow 1.0 transport fields {:?}/{:?} do not fit IP protocol {:?}.",
                tp_src.map(|(field, _)| field),
                tp_dst.map(|(field, _)| field),
                nw_proto
            );
            bail!(ErrorKind::IllegalValue(
                nw_proto.map_or(0, u64::from),
                "OpenFlow 1.0 IP protocol of transport field"
            ));
        }
        Ok(())
    }

    /// Writes the member `entry` translates to.
    ///
    /// UDP and ICMPv4 fields need the matching IP protocol set first,
    /// and the IP protocol cannot change under set transport fields.
    pub fn insert(&mut self, entry: &OxmEntry) -> Result<()> {
        use super::oxm::OfbMatchFields::*;
        let field = match entry.ofb_field() {
            Some(field) if field.available_in(Version::V1_0) => field,
            _ => return Err(unsupported(entry.key().to_string(), Version::V1_0)),
        };
        match field {
            Ipv4Src => self.nw_src = Ofp10Match::prefix_of(entry)?,
            Ipv4Dst => self.nw_dst = Ofp10Match::prefix_of(entry)?,
            _ => Ofp10Match::reject_mask(entry)?,
        }
        match field {
            InPort => self.in_port = Some(port_to_of10(entry.value_as()?)?),
            EthSrc => self.dl_src = Some(entry.value_as()?),
            EthDst => self.dl_dst = Some(entry.value_as()?),
            VlanVid => {
                let vid: u16 = entry.value_as()?;
                self.dl_vlan = Some(if vid & VLAN_VID_PRESENT != 0 {
                    vid & 0x0fff
                } else if vid == VLAN_VID_NONE {
                    OF10_VLAN_NONE
                } else {
                    bail!(ErrorKind::IllegalValue(vid as u64, "VLAN id"))
                });
            }
            VlanPcp => self.dl_vlan_pcp = Some(entry.value_as()?),
            EthType => self.dl_type = Some(entry.value_as()?),
            IpDscp => {
                let dscp: u8 = entry.value_as()?;
                if dscp > 0x3f {
                    bail!(ErrorKind::IllegalValue(dscp as u64, "IP DSCP"));
                }
                self.nw_tos = Some(dscp << 2);
            }
            IpProto => {
                let proto: u8 = entry.value_as()?;
                Ofp10Match::check_transport(Some(proto), self.tp_src, self.tp_dst)?;
                self.nw_proto = Some(proto);
            }
            TcpSrc | UdpSrc => {
                let tp_src = Some((field, entry.value_as()?));
                Ofp10Match::check_transport(self.nw_proto, tp_src, None)?;
                self.tp_src = tp_src;
            }
            TcpDst | UdpDst => {
                let tp_dst = Some((field, entry.value_as()?));
                Ofp10Match::check_transport(self.nw_proto, None, tp_dst)?;
                self.tp_dst = tp_dst;
            }
            Icmpv4Type => {
                let tp_src = Some((field, entry.value_as::<u8>()? as u16));
                Ofp10Match::check_transport(self.nw_proto, tp_src, None)?;
                self.tp_src = tp_src;
            }
            Icmpv4Code => {
                let tp_dst = Some((field, entry.value_as::<u8>()? as u16));
                Ofp10Match::check_transport(self.nw_proto, None, tp_dst)?;
                self.tp_dst = tp_dst;
            }
            Ipv4Src | Ipv4Dst => (),
            _ => return Err(unsupported(format!("{:?}", field), Version::V1_0)),
        }
        Ok(())
    }

    /// The OXM equivalent of the member `field` maps to.
    pub fn get(&self, field: OfbMatchFields) -> Result<Option<OxmEntry>> {
        use super::oxm::OfbMatchFields::*;
        fn transport(
            member: Option<(OfbMatchFields, u16)>,
            field: OfbMatchFields,
        ) -> Result<Option<OxmEntry>> {
            match member {
                Some((set_as, port)) if set_as == field => match field {
                    OfbMatchFields::Icmpv4Type | OfbMatchFields::Icmpv4Code => {
                        Ok(Some(OxmEntry::basic(field, &(port as u8))?))
                    }
                    _ => Ok(Some(OxmEntry::basic(field, &port)?)),
                },
                _ => Ok(None),
            }
        }

        Ok(match field {
            InPort => match self.in_port {
                Some(port) => Some(OxmEntry::basic(field, &port_from_of10(port))?),
                None => None,
            },
            EthSrc => opt_entry(field, self.dl_src.as_ref())?,
            EthDst => opt_entry(field, self.dl_dst.as_ref())?,
            VlanVid => match self.dl_vlan {
                Some(OF10_VLAN_NONE) => Some(OxmEntry::basic(field, &VLAN_VID_NONE)?),
                Some(vid) => Some(OxmEntry::basic(field, &(vid | VLAN_VID_PRESENT))?),
                None => None,
            },
            VlanPcp => opt_entry(field, self.dl_vlan_pcp.as_ref())?,
            EthType => opt_entry(field, self.dl_type.as_ref())?,
            IpDscp => opt_entry(field, self.nw_tos.map(|tos| tos >> 2).as_ref())?,
            IpProto => opt_entry(field, self.nw_proto.as_ref())?,
            Ipv4Src => match self.nw_src {
                Some(prefix) => Some(Ofp10Match::prefix_entry(field, prefix)?),
                None => None,
            },
            Ipv4Dst => match self.nw_dst {
                Some(prefix) => Some(Ofp10Match::prefix_entry(field, prefix)?),
                None => None,
            },
            TcpSrc | UdpSrc | Icmpv4Type => transport(self.tp_src, field)?,
            TcpDst | UdpDst | Icmpv4Code => transport(self.tp_dst, field)?,
            _ => return Err(unsupported(format!("{:?}", field), Version::V1_0)),
        })
    }

    pub fn remove(&mut self, field: OfbMatchFields) -> Result<Option<OxmEntry>> {
        use super::oxm::OfbMatchFields::*;
        let old = self.get(field)?;
        if old.is_some() {
            if field == IpProto {
                Ofp10Match::check_transport(None, self.tp_src, self.tp_dst)?;
            }
            match field {
                InPort => self.in_port = None,
                EthSrc => self.dl_src = None,
                EthDst => self.dl_dst = None,
                VlanVid => self.dl_vlan = None,
                VlanPcp => self.dl_vlan_pcp = None,
                EthType => self.dl_type = None,
                IpDscp => self.nw_tos = None,
                IpProto => self.nw_proto = None,
                Ipv4Src => self.nw_src = None,
                Ipv4Dst => self.nw_dst = None,
                TcpSrc | UdpSrc | Icmpv4Type => self.tp_src = None,
                _ => self.tp_dst = None,
            }
        }
        Ok(old)
    }

    pub fn to_oxm_list(&self) -> OxmList {
        let mut list = OxmList::new();
        for field in OF10_FIELDS.iter() {
            match self.get(*field) {
                Ok(Some(entry)) => {
                    list.insert(entry);
                }
                Ok(None) => (),
                Err(err) => error!("Cannot translate OpenFlow 1.0 {:?}: {}", field, err),
            }
        }
        list
    }

    pub fn wildcards(&self) -> Ofp10Wildcards {
        let mut wildcards = Ofp10Wildcards::empty();
        macro_rules! wildcard_if_none {
            ($member:ident, $flag:ident) => {
                if self.$member.is_none() {
                    wildcards |= Ofp10Wildcards::$flag;
                }
            };
        }
        wildcard_if_none!(in_port, IN_PORT);
        wildcard_if_none!(dl_src, DL_SRC);
        wildcard_if_none!(dl_dst, DL_DST);
        wildcard_if_none!(dl_vlan, DL_VLAN);
        wildcard_if_none!(dl_vlan_pcp, DL_VLAN_PCP);
        wildcard_if_none!(dl_type, DL_TYPE);
        wildcard_if_none!(nw_tos, NW_TOS);
        wildcard_if_none!(nw_proto, NW_PROTO);
        wildcard_if_none!(tp_src, TP_SRC);
        wildcard_if_none!(tp_dst, TP_DST);
        let src_bits = self.nw_src.map_or(32, |(_, bits)| bits as u32);
        let dst_bits = self.nw_dst.map_or(32, |(_, bits)| bits as u32);
        wildcards |= Ofp10Wildcards::from_bits_truncate(src_bits << OF10_NW_SRC_SHIFT);
        wildcards |= Ofp10Wildcards::from_bits_truncate(dst_bits << OF10_NW_DST_SHIFT);
        wildcards
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_u32(self.wildcards().bits())?;
        writer.write_u16(self.in_port.unwrap_or(0))?;
        writer.write_bytes(&self.dl_src.unwrap_or([0; 6])[..])?;
        writer.write_bytes(&self.dl_dst.unwrap_or([0; 6])[..])?;
        writer.write_u16(self.dl_vlan.unwrap_or(0))?;
        writer.write_u8(self.dl_vlan_pcp.unwrap_or(0))?;
        writer.pad(1)?;
        writer.write_u16(self.dl_type.unwrap_or(0))?;
        writer.write_u8(self.nw_tos.unwrap_or(0))?;
        writer.write_u8(self.nw_proto.unwrap_or(0))?;
        writer.pad(2)?;
        writer.write_u32(self.nw_src.map_or(0, |(addr, _)| addr))?;
        writer.write_u32(self.nw_dst.map_or(0, |(addr, _)| addr))?;
        writer.write_u16(self.tp_src.map_or(0, |(_, port)| port))?;
        writer.write_u16(self.tp_dst.map_or(0, |(_, port)| port))
    }

    fn read(cursor: &mut ByteCursor) -> Result<Self> {
        let raw = cursor.read_u32()?;
        let wildcards = Ofp10Wildcards::from_bits_truncate(raw);
        let present = |flag: Ofp10Wildcards| !wildcards.contains(flag);

        let in_port = cursor.read_u16()?;
        let dl_src = hw_addr::from_slice_eth(cursor.read_bytes(6)?)?;
        let dl_dst = hw_addr::from_slice_eth(cursor.read_bytes(6)?)?;
        let dl_vlan = cursor.read_u16()?;
        let dl_vlan_pcp = cursor.read_u8()?;
        cursor.skip(1)?;
        let dl_type = cursor.read_u16()?;
        let nw_tos = cursor.read_u8()?;
        let nw_proto = cursor.read_u8()?;
        cursor.skip(2)?;
        let nw_src = cursor.read_u32()?;
        let nw_dst = cursor.read_u32()?;
        let tp_src = cursor.read_u16()?;
        let tp_dst = cursor.read_u16()?;

        let prefix = |addr: u32, shift: u32| -> Option<Prefix> {
            let bits = (raw >> shift) & 0x3f;
            if bits >= 32 {
                None
            } else {
                Some((addr, bits as u8))
            }
        };

        let nw_proto = if present(Ofp10Wildcards::NW_PROTO) {
            Some(nw_proto)
        } else {
            None
        };
        let (src_field, dst_field) = Ofp10Match::transport_fields(nw_proto);

        Ok(Ofp10Match {
            in_port: Some(in_port).filter(|_| present(Ofp10Wildcards::IN_PORT)),
            dl_src: Some(dl_src).filter(|_| present(Ofp10Wildcards::DL_SRC)),
            dl_dst: Some(dl_dst).filter(|_| present(Ofp10Wildcards::DL_DST)),
            dl_vlan: Some(dl_vlan).filter(|_| present(Ofp10Wildcards::DL_VLAN)),
            dl_vlan_pcp: Some(dl_vlan_pcp).filter(|_| present(Ofp10Wildcards::DL_VLAN_PCP)),
            dl_type: Some(dl_type).filter(|_| present(Ofp10Wildcards::DL_TYPE)),
            nw_tos: Some(nw_tos).filter(|_| present(Ofp10Wildcards::NW_TOS)),
            nw_proto: nw_proto,
            nw_src: prefix(nw_src, OF10_NW_SRC_SHIFT),
            nw_dst: prefix(nw_dst, OF10_NW_DST_SHIFT),
            tp_src: Some((src_field, tp_src)).filter(|_| present(Ofp10Wildcards::TP_SRC)),
            tp_dst: Some((dst_field, tp_dst)).filter(|_| present(Ofp10Wildcards::TP_DST)),
        })
    }
}

fn opt_entry<T: super::oxm::OxmValue>(field: OfbMatchFields, value: Option<&T>) -> Result<Option<OxmEntry>> {
    match value {
        Some(value) => Ok(Some(OxmEntry::basic(field, value)?)),
        None => Ok(None),
    }
}

impl fmt::Display for Ofp10Match {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "wildcards={:#08x}", self.wildcards().bits())?;
        if let Some(ref addr) = self.dl_src {
            write!(f, " dl_src={}", hw_addr::format_eth(addr))?;
        }
        if let Some(ref addr) = self.dl_dst {
            write!(f, " dl_dst={}", hw_addr::format_eth(addr))?;
        }
        for entry in self.to_oxm_list().iter() {
            match entry.ofb_field() {
                Some(OfbMatchFields::EthSrc) | Some(OfbMatchFields::EthDst) => (),
                _ => write!(f, " {}", entry)?,
            }
        }
        Ok(())
    }
}

macro_rules! match_field {
    ($(#[$doc:meta])* $field:ident: $ty:ty, $set:ident, $get:ident) => {
        $(#[$doc])*
        pub fn $set(&mut self, value: $ty) -> Result<()> {
            self.insert(OxmEntry::basic(OfbMatchFields::$field, &value)?)
        }

        pub fn $get(&self) -> Result<Option<$ty>> {
            match self.get(OfbMatchFields::$field)? {
                Some(entry) => Ok(Some(entry.value_as::<$ty>()?)),
                None => Ok(None),
            }
        }
    };
    ($(#[$doc:meta])* $field:ident: $ty:ty, $set:ident, $get:ident,
     $set_masked:ident, $get_mask:ident) => {
        match_field!($(#[$doc])* $field: $ty, $set, $get);

        pub fn $set_masked(&mut self, value: $ty, mask: $ty) -> Result<()> {
            self.insert(OxmEntry::basic_masked(OfbMatchFields::$field, &value, &mask)?)
        }

        pub fn $get_mask(&self) -> Result<Option<$ty>> {
            match self.get(OfbMatchFields::$field)? {
                Some(entry) => entry.mask_as::<$ty>(),
                None => Ok(None),
            }
        }
    };
}

/// Fields to match against flows
#[derive(Debug, Clone, PartialEq)]
pub enum Match {
    V1_0(Ofp10Match),
    V1_2(OxmList),
    V1_3(OxmList),
}

impl Match {
    /// Empty (all wildcard) match for `version`.
    pub fn new(version: Version) -> Result<Self> {
        match version {
            Version::V1_0 => Ok(Match::V1_0(Ofp10Match::new())),
            Version::V1_2 => Ok(Match::V1_2(OxmList::new())),
            Version::V1_3 => Ok(Match::V1_3(OxmList::new())),
            _ => Err(unsupported(stringify!(Match).to_string(), version)),
        }
    }

    pub fn version(&self) -> Version {
        match self {
            Match::V1_0(_) => Version::V1_0,
            Match::V1_2(_) => Version::V1_2,
            Match::V1_3(_) => Version::V1_3,
        }
    }

    fn ensure_available(&self, field: OfbMatchFields) -> Result<()> {
        if field.available_in(self.version()) {
            Ok(())
        } else {
            Err(unsupported(format!("{:?}", field), self.version()))
        }
    }

    pub fn insert(&mut self, entry: OxmEntry) -> Result<()> {
        let field = entry.ofb_field().ok_or::<Error>(
            ErrorKind::UnknownField(entry.class(), entry.field()).into(),
        )?;
        self.ensure_available(field)?;
        match self {
            Match::V1_0(of10) => of10.insert(&entry),
            Match::V1_2(oxms) | Match::V1_3(oxms) => {
                oxms.insert(entry);
                Ok(())
            }
        }
    }

    /// `Ok(None)` if the field is wildcarded, `Err` if this version
    /// cannot carry it at all.
    pub fn get(&self, field: OfbMatchFields) -> Result<Option<OxmEntry>> {
        self.ensure_available(field)?;
        match self {
            Match::V1_0(of10) => of10.get(field),
            Match::V1_2(oxms) | Match::V1_3(oxms) => Ok(oxms.get_basic(field).cloned()),
        }
    }

    /// Like `get`, but an absent field is an error.
    pub fn require(&self, field: OfbMatchFields) -> Result<OxmEntry> {
        self.get(field)?
            .ok_or_else(|| ErrorKind::FieldNotFound(format!("{:?}", field)).into())
    }

    pub fn contains(&self, field: OfbMatchFields) -> Result<bool> {
        Ok(self.get(field)?.is_some())
    }

    pub fn remove(&mut self, field: OfbMatchFields) -> Result<Option<OxmEntry>> {
        self.ensure_available(field)?;
        match self {
            Match::V1_0(of10) => of10.remove(field),
            Match::V1_2(oxms) | Match::V1_3(oxms) => Ok(oxms.remove(field.key())),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Match::V1_0(of10) => *of10 = Ofp10Match::new(),
            Match::V1_2(oxms) | Match::V1_3(oxms) => oxms.clear(),
        }
    }

    /// The match as OXM entries, whatever the version.
    pub fn oxm_list(&self) -> OxmList {
        match self {
            Match::V1_0(of10) => of10.to_oxm_list(),
            Match::V1_2(oxms) | Match::V1_3(oxms) => oxms.clone(),
        }
    }

    pub fn overlaps(&self, other: &Match) -> bool {
        self.oxm_list().overlaps(&other.oxm_list())
    }

    pub fn is_part_of(&self, other: &Match) -> bool {
        self.oxm_list().is_part_of(&other.oxm_list())
    }

    /// Re-encodes the match for another version, field by field.
    pub fn to_version(&self, version: Version) -> Result<Match> {
        let mut converted = Match::new(version)?;
        let list = self.oxm_list();
        let mut entries: Vec<&OxmEntry> = list.iter().collect();
        // the IP protocol qualifies the OpenFlow 1.0 transport fields
        entries.sort_by_key(|entry| entry.ofb_field() != Some(OfbMatchFields::IpProto));
        for entry in entries {
            converted.insert(entry.clone())?;
        }
        Ok(converted)
    }

    /// Padded on-wire length of the match at the start of `bytes`.
    pub fn read_len(version: Version, bytes: &[u8]) -> Result<usize> {
        match version {
            Version::V1_0 => Ok(OF10_MATCH_LENGTH),
            _ => {
                let cursor = ByteCursor::new(bytes, stringify!(Match));
                Ok(pad_to_8(cursor.peek_u16(2)? as usize))
            }
        }
    }

    /// Decodes a match of `version` from the start of `bytes`.
    /// Trailing bytes after the match are ignored.
    pub fn unpack(version: Version, bytes: &[u8]) -> Result<Match> {
        let mut cursor = ByteCursor::new(bytes, stringify!(Match));
        match version {
            Version::V1_0 => return Ok(Match::V1_0(Ofp10Match::read(&mut cursor)?)),
            Version::V1_2 | Version::V1_3 => (),
            _ => return Err(unsupported(stringify!(Match).to_string(), version)),
        }

        let ttype = cursor.read_u16()?;
        if ttype != MatchType::Oxm as u16 {
            warn!("Received match of type {} in OpenFlow {:?}.", ttype, version);
            bail!(ErrorKind::BadMatchType(ttype));
        }
        let length = cursor.read_u16()? as usize;
        if length < OXM_MATCH_HEADER_LENGTH {
            bail!(ErrorKind::BadLength(length, stringify!(Match)));
        }
        let oxms = OxmList::unpack(cursor.read_bytes(length - OXM_MATCH_HEADER_LENGTH)?)?;

        let mut mmatch = Match::new(version)?;
        for entry in oxms.iter() {
            mmatch.insert(entry.clone())?;
        }
        Ok(mmatch)
    }

    match_field!(
        /// Switch input port.
        InPort: u32, set_in_port, get_in_port);
    match_field!(
        /// Switch physical input port.
        InPhyPort: u32, set_in_phy_port, get_in_phy_port);
    match_field!(
        /// Metadata passed between tables.
        Metadata: u64, set_metadata, get_metadata, set_metadata_masked, get_metadata_mask);
    match_field!(
        /// Ethernet destination address.
        EthDst: EthernetAddress, set_eth_dst, get_eth_dst, set_eth_dst_masked, get_eth_dst_mask);
    match_field!(
        /// Ethernet source address.
        EthSrc: EthernetAddress, set_eth_src, get_eth_src, set_eth_src_masked, get_eth_src_mask);
    match_field!(EthType: u16, set_eth_type, get_eth_type);
    match_field!(
        /// VLAN id including the `VLAN_VID_PRESENT` flag.
        VlanVid: u16, set_vlan_vid, get_vlan_vid, set_vlan_vid_masked, get_vlan_vid_mask);
    match_field!(VlanPcp: u8, set_vlan_pcp, get_vlan_pcp);
    match_field!(IpDscp: u8, set_ip_dscp, get_ip_dscp);
    match_field!(IpEcn: u8, set_ip_ecn, get_ip_ecn);
    match_field!(IpProto: u8, set_ip_proto, get_ip_proto);
    match_field!(
        Ipv4Src: Ipv4Addr, set_ipv4_src, get_ipv4_src, set_ipv4_src_masked, get_ipv4_src_mask);
    match_field!(
        Ipv4Dst: Ipv4Addr, set_ipv4_dst, get_ipv4_dst, set_ipv4_dst_masked, get_ipv4_dst_mask);
    match_field!(TcpSrc: u16, set_tcp_src, get_tcp_src);
    match_field!(TcpDst: u16, set_tcp_dst, get_tcp_dst);
    match_field!(UdpSrc: u16, set_udp_src, get_udp_src);
    match_field!(UdpDst: u16, set_udp_dst, get_udp_dst);
    match_field!(SctpSrc: u16, set_sctp_src, get_sctp_src);
    match_field!(SctpDst: u16, set_sctp_dst, get_sctp_dst);
    match_field!(Icmpv4Type: u8, set_icmpv4_type, get_icmpv4_type);
    match_field!(Icmpv4Code: u8, set_icmpv4_code, get_icmpv4_code);
    match_field!(ArpOp: u16, set_arp_opcode, get_arp_opcode);
    match_field!(
        ArpSpa: Ipv4Addr, set_arp_spa, get_arp_spa, set_arp_spa_masked, get_arp_spa_mask);
    match_field!(
        ArpTpa: Ipv4Addr, set_arp_tpa, get_arp_tpa, set_arp_tpa_masked, get_arp_tpa_mask);
    match_field!(
        ArpSha: EthernetAddress, set_arp_sha, get_arp_sha, set_arp_sha_masked, get_arp_sha_mask);
    match_field!(
        ArpTha: EthernetAddress, set_arp_tha, get_arp_tha, set_arp_tha_masked, get_arp_tha_mask);
    match_field!(
        Ipv6Src: Ipv6Addr, set_ipv6_src, get_ipv6_src, set_ipv6_src_masked, get_ipv6_src_mask);
    match_field!(
        Ipv6Dst: Ipv6Addr, set_ipv6_dst, get_ipv6_dst, set_ipv6_dst_masked, get_ipv6_dst_mask);
    match_field!(
        Ipv6Flabel: u32, set_ipv6_flabel, get_ipv6_flabel, set_ipv6_flabel_masked,
        get_ipv6_flabel_mask);
    match_field!(Icmpv6Type: u8, set_icmpv6_type, get_icmpv6_type);
    match_field!(Icmpv6Code: u8, set_icmpv6_code, get_icmpv6_code);
    match_field!(Ipv6NdTarget: Ipv6Addr, set_ipv6_nd_target, get_ipv6_nd_target);
    match_field!(Ipv6NdSll: EthernetAddress, set_ipv6_nd_sll, get_ipv6_nd_sll);
    match_field!(Ipv6NdTll: EthernetAddress, set_ipv6_nd_tll, get_ipv6_nd_tll);
    match_field!(MplsLabel: u32, set_mpls_label, get_mpls_label);
    match_field!(MplsTc: u8, set_mpls_tc, get_mpls_tc);
    match_field!(MplsBos: u8, set_mpls_bos, get_mpls_bos);
    match_field!(
        /// 24 bit I-SID.
        PbbIsid: u32, set_pbb_isid, get_pbb_isid, set_pbb_isid_masked, get_pbb_isid_mask);
    match_field!(
        TunnelId: u64, set_tunnel_id, get_tunnel_id, set_tunnel_id_masked, get_tunnel_id_mask);
    match_field!(
        Ipv6Exthdr: u16, set_ipv6_exthdr, get_ipv6_exthdr, set_ipv6_exthdr_masked,
        get_ipv6_exthdr_mask);
    match_field!(PppoeCode: u8, set_pppoe_code, get_pppoe_code);
    match_field!(PppoeType: u8, set_pppoe_type, get_pppoe_type);
    match_field!(PppoeSid: u16, set_pppoe_sid, get_pppoe_sid);
    match_field!(PppProt: u16, set_ppp_prot, get_ppp_prot);
}

impl Pack for Match {
    fn length(&self) -> usize {
        match self {
            Match::V1_0(_) => OF10_MATCH_LENGTH,
            Match::V1_2(oxms) | Match::V1_3(oxms) => {
                pad_to_8(OXM_MATCH_HEADER_LENGTH + oxms.length())
            }
        }
    }

    fn pack(&self, buf: &mut [u8]) -> Result<usize> {
        let needed = self.length();
        if buf.len() < needed {
            bail!(ErrorKind::BufferTooSmall(needed, buf.len()));
        }
        let mut writer = ByteWriter::new(buf);
        match self {
            Match::V1_0(of10) => of10.write(&mut writer)?,
            Match::V1_2(oxms) | Match::V1_3(oxms) => {
                // length excludes the trailing padding
                let exact = OXM_MATCH_HEADER_LENGTH + oxms.length();
                writer.write_u16(MatchType::Oxm as u16)?;
                writer.write_u16(exact as u16)?;
                oxms.write(&mut writer)?;
                writer.pad(needed - exact)?;
            }
        }
        Ok(writer.position())
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Match::V1_0(of10) => write!(f, "match(1.0) {}", of10),
            Match::V1_2(oxms) | Match::V1_3(oxms) => {
                write!(f, "match({:?})", self.version())?;
                for entry in oxms {
                    write!(f, " {}", entry)?;
                }
                Ok(())
            }
        }
    }
}
