use num_traits::FromPrimitive;
use std::convert::TryFrom;

use super::super::err::*;

/// First reserved port number in OpenFlow 1.0 (16 bit numbering).
pub const OF10_PORT_MAX: u16 = 0xff00;
/// First reserved port number in OpenFlow 1.2+ (32 bit numbering).
pub const PORT_MAX: u32 = 0xffff_ff00;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PortNumber {
    Reserved(PortNo),
    NormalPort(u32),
}

impl TryFrom<u32> for PortNumber {
    type Error = Error;
    fn try_from(port_no: u32) -> Result<Self> {
        if port_no == 0 {
            bail!(ErrorKind::IllegalValue(0, stringify!(PortNumber)));
        }
        Ok(match PortNo::from_u32(port_no) {
            Some(port) => PortNumber::Reserved(port),
            None => PortNumber::NormalPort(port_no),
        })
    }
}

impl From<PortNumber> for u32 {
    fn from(port: PortNumber) -> u32 {
        match port {
            PortNumber::Reserved(port_no) => port_no as u32,
            PortNumber::NormalPort(port_no) => port_no,
        }
    }
}

/// Maps a 32 bit port number onto the OpenFlow 1.0 16 bit space.
/// Reserved ports keep their offset from the reserved range start.
pub fn port_to_of10(port_no: u32) -> Result<u16> {
    if port_no >= PORT_MAX {
        Ok(OF10_PORT_MAX | (port_no - PORT_MAX) as u16)
    } else if port_no < OF10_PORT_MAX as u32 {
        Ok(port_no as u16)
    } else {
        bail!(ErrorKind::IllegalValue(port_no as u64, "OpenFlow 1.0 port"))
    }
}

/// Inverse of `port_to_of10`.
pub fn port_from_of10(port_no: u16) -> u32 {
    if port_no >= OF10_PORT_MAX {
        PORT_MAX | (port_no - OF10_PORT_MAX) as u32
    } else {
        port_no as u32
    }
}

/// Port numbering. Ports are numbered starting from 1.
#[repr(u32)]
#[derive(Primitive, PartialEq, Eq, Debug, Clone, Copy)]
pub enum PortNo {
    /* Maximum number of physical and logical switch ports. */
    Max = 0xffffff00,
    /* Reserved OpenFlow Port (fake output "ports"). */
    /// Send the packet out the input port. This
    /// reserved port must be explicitly used
    /// in order to send back out of the input
    /// port.
    InPort = 0xfffffff8,
    /// Submit the packet to the first flow table
    /// NB: This destination port can only be
    /// used in packet-out messages.
    Table = 0xfffffff9,
    /// Process with normal L2/L3 switching.
    Normal = 0xfffffffa,
    /// All physical ports in VLAN, except input
    /// port and those blocked or link down.
    Flood = 0xfffffffb,
    /// All physical ports except input port.
    All = 0xfffffffc,
    /// Send to controller.
    Controller = 0xfffffffd,
    /// Local openflow "port".
    Local = 0xfffffffe,
    /// Wildcard port used only for flow mod
    /// (delete) and flow stats requests. Selects
    /// all flows regardless of output port
    /// (including flows with no output port).
    Any = 0xffffffff,
}

impl PortNo {
    pub fn value(self) -> u32 {
        self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_from_u32() {
        assert!(PortNumber::try_from(0).is_err());
        assert_eq!(PortNumber::NormalPort(3), PortNumber::try_from(3).unwrap());
        assert_eq!(
            PortNumber::Reserved(PortNo::Controller),
            PortNumber::try_from(0xfffffffd).unwrap()
        );
        assert_eq!(0xffffffff, u32::from(PortNumber::Reserved(PortNo::Any)));
    }

    #[test]
    fn of10_mapping() {
        assert_eq!(0xfffd, port_to_of10(PortNo::Controller.value()).unwrap());
        assert_eq!(0xffff, port_to_of10(PortNo::Any.value()).unwrap());
        assert_eq!(12, port_to_of10(12).unwrap());
        assert!(port_to_of10(0x10000).is_err());
        assert_eq!(PortNo::Local.value(), port_from_of10(0xfffe));
        assert_eq!(7, port_from_of10(7));
    }
}
