use num_traits::FromPrimitive;
use std::convert::TryFrom;

use super::super::err::*;
use super::mem::{ByteCursor, ByteWriter};
use super::Pack;

/// Fixed part of an error body: type(2) code(2).
pub const ERROR_MSG_LENGTH: usize = 4;

/// Values for 'type' in ofp_error_message. These values are immutable: they
/// will not change in future versions of the protocol (although new values may
/// be added).
#[derive(Primitive, PartialEq, Debug, Clone, Copy)]
pub enum ErrorType {
    /// Hello protocol failed.
    HelloFailed = 0,
    /// Request was not understood.
    BadRequest = 1,
    /// Error in action description.
    BadAction = 2,
    /// Error in instruction list.
    BadInstruction = 3,
    /// Error in match.
    BadMatch = 4,
    /// Problem modifying flow entry.
    FlowModFailed = 5,
    /// Problem modifying group entry.
    GroupModFailed = 6,
    /// Port mod request failed.
    PortModFailed = 7,
    /// Table mod request failed.
    TableModFailed = 8,
    /// Queue operation failed.
    QueueOpFailed = 9,
    /// Switch config request failed.
    SwitchConfigFailed = 10,
    /// Controller Role request failed.
    RoleRequestFailed = 11,
    /// Error in meter.
    MeterModFailed = 12,
    /// Setting table features failed.
    TableFeaturesFailed = 13,
    /// Experimenter error messages.
    Experimenter = 0xffff,
}

/// ofp_error_msg 'code' values for OFPET_HELLO_FAILED.
#[derive(Primitive, PartialEq, Debug, Clone, Copy)]
pub enum HelloFailedCode {
    /// No compatible version.
    Incompatible = 0,
    /// Permissions error.
    EPerm = 1,
}

/// ERROR message body.
#[derive(Getters, Debug, Clone, PartialEq)]
pub struct ErrorMsg {
    #[get = "pub"]
    ttype: u16,
    #[get = "pub"]
    code: u16,
    /// At least the start of the offending message.
    #[get = "pub"]
    data: Vec<u8>,
}

impl ErrorMsg {
    pub fn new(ttype: u16, code: u16, data: Vec<u8>) -> Self {
        ErrorMsg {
            ttype: ttype,
            code: code,
            data: data,
        }
    }

    pub fn hello_failed(code: HelloFailedCode, data: Vec<u8>) -> Self {
        ErrorMsg::new(ErrorType::HelloFailed as u16, code as u16, data)
    }

    pub fn error_type(&self) -> Option<ErrorType> {
        ErrorType::from_u16(self.ttype)
    }

    pub fn is_hello_failed(&self) -> bool {
        self.error_type() == Some(ErrorType::HelloFailed)
    }
}

impl<'a> TryFrom<&'a [u8]> for ErrorMsg {
    type Error = Error;
    fn try_from(bytes: &'a [u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes, stringify!(ErrorMsg));
        Ok(ErrorMsg {
            ttype: cursor.read_u16()?,
            code: cursor.read_u16()?,
            data: cursor.rest().to_vec(),
        })
    }
}

impl Pack for ErrorMsg {
    fn length(&self) -> usize {
        ERROR_MSG_LENGTH + self.data.len()
    }

    fn pack(&self, buf: &mut [u8]) -> Result<usize> {
        let mut writer = ByteWriter::new(buf);
        writer.write_u16(self.ttype)?;
        writer.write_u16(self.code)?;
        writer.write_bytes(&self.data[..])?;
        Ok(writer.position())
    }
}
