use super::super::err::*;

/// length of ethernet address in bytes (6)
pub const ETHERNET_ADDRESS_LENGTH: usize = 6;
pub type EthernetAddress = [u8; ETHERNET_ADDRESS_LENGTH];

pub fn from_slice_eth(slice: &[u8]) -> Result<EthernetAddress> {
    if slice.len() != ETHERNET_ADDRESS_LENGTH {
        bail!(ErrorKind::InvalidSliceLength(
            ETHERNET_ADDRESS_LENGTH,
            slice.len(),
            stringify!(EthernetAddress),
        ));
    }
    let mut addr = [0u8; ETHERNET_ADDRESS_LENGTH];
    addr.copy_from_slice(slice);
    Ok(addr)
}

/// Colon separated hex notation, e.g. `00:11:22:33:44:55`.
pub fn format_eth(addr: &EthernetAddress) -> String {
    addr.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}
