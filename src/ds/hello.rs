//! HELLO body: a list of hello elements, of which only the version
//! bitmap element is understood.

use std::convert::TryFrom;
use std::fmt;
use std::ops::BitAnd;

use super::super::err::*;
use super::mem::{pad_to_8, ByteCursor, ByteWriter};
use super::{Pack, Version};

/// Length of a hello element header (type + length).
pub const HELLO_ELEM_HEADER_LENGTH: usize = 4;

#[derive(Primitive, PartialEq, Debug, Clone, Copy)]
pub enum HelloElemType {
    /// Bitmap of version supported.
    VersionBitmap = 1,
}

/// Set of protocol wire versions, one bit per version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionBitmap {
    bits: u32,
}

impl VersionBitmap {
    pub fn new() -> Self {
        VersionBitmap { bits: 0 }
    }

    pub fn from_versions(versions: &[Version]) -> Self {
        let mut bitmap = VersionBitmap::new();
        for version in versions {
            bitmap.add(version.wire());
        }
        bitmap
    }

    /// Bitmap holding just one wire version.
    pub fn single(version: u8) -> Self {
        let mut bitmap = VersionBitmap::new();
        bitmap.add(version);
        bitmap
    }

    /// Every version this crate implements.
    pub fn supported() -> Self {
        VersionBitmap::from_versions(&Version::SUPPORTED[..])
    }

    /// Versions beyond 31 cannot be represented and are ignored.
    pub fn add(&mut self, version: u8) {
        if version < 32 {
            self.bits |= 1 << version;
        } else {
            warn!("Ignoring wire version {} outside the bitmap range.", version);
        }
    }

    pub fn remove(&mut self, version: u8) {
        if version < 32 {
            self.bits &= !(1 << version);
        }
    }

    pub fn contains(&self, version: u8) -> bool {
        version < 32 && self.bits & (1 << version) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Highest wire version in the set.
    pub fn highest(&self) -> Option<u8> {
        if self.bits == 0 {
            None
        } else {
            Some(31 - self.bits.leading_zeros() as u8)
        }
    }

    pub fn versions(&self) -> Vec<u8> {
        (0..32u8).filter(|v| self.contains(*v)).collect()
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Length of the version bitmap hello element, padding included.
    pub fn elem_length(&self) -> usize {
        pad_to_8(HELLO_ELEM_HEADER_LENGTH + 4)
    }

    fn write_elem(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_u16(HelloElemType::VersionBitmap as u16)?;
        writer.write_u16((HELLO_ELEM_HEADER_LENGTH + 4) as u16)?;
        writer.write_u32(self.bits)?;
        writer.pad(self.elem_length() - HELLO_ELEM_HEADER_LENGTH - 4)
    }

    /// Reads the bitmaps of an element body. Only the first word is kept.
    fn read_elem(body: &[u8]) -> Result<Self> {
        if body.is_empty() || body.len() % 4 != 0 {
            bail!(ErrorKind::BadLength(
                body.len() + HELLO_ELEM_HEADER_LENGTH,
                stringify!(VersionBitmap)
            ));
        }
        let mut cursor = ByteCursor::new(body, stringify!(VersionBitmap));
        let bits = cursor.read_u32()?;
        while !cursor.is_empty() {
            if cursor.read_u32()? != 0 {
                debug!("Ignoring version bitmap words beyond the first.");
            }
        }
        Ok(VersionBitmap { bits: bits })
    }
}

impl BitAnd for VersionBitmap {
    type Output = VersionBitmap;

    fn bitand(self, rhs: VersionBitmap) -> VersionBitmap {
        VersionBitmap {
            bits: self.bits & rhs.bits,
        }
    }
}

impl fmt::Display for VersionBitmap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let versions: Vec<String> = self.versions().iter().map(|v| v.to_string()).collect();
        write!(f, "{{{}}}", versions.join(","))
    }
}

/// HELLO message body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hello {
    bitmap: Option<VersionBitmap>,
}

impl Hello {
    pub fn new(bitmap: Option<VersionBitmap>) -> Self {
        Hello { bitmap: bitmap }
    }

    pub fn bitmap(&self) -> Option<&VersionBitmap> {
        self.bitmap.as_ref()
    }
}

impl<'a> TryFrom<&'a [u8]> for Hello {
    type Error = Error;
    fn try_from(bytes: &'a [u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes, stringify!(Hello));
        let mut bitmap = None;
        while !cursor.is_empty() {
            let ttype = cursor.peek_u16(0)?;
            let len = cursor.peek_u16(2)? as usize;
            if len < HELLO_ELEM_HEADER_LENGTH {
                bail!(ErrorKind::BadLength(len, "hello element"));
            }
            if len > cursor.remaining() {
                bail!(ErrorKind::TruncatedMessage(len, cursor.remaining(), "hello element"));
            }
            let elem = cursor.read_bytes(len)?;
            if ttype == HelloElemType::VersionBitmap as u16 {
                bitmap = Some(VersionBitmap::read_elem(&elem[HELLO_ELEM_HEADER_LENGTH..])?);
            } else {
                debug!("Skipping unknown hello element type {}.", ttype);
            }
            // padding of the last element may be missing
            let padding = pad_to_8(len) - len;
            cursor.skip(padding.min(cursor.remaining()))?;
        }
        Ok(Hello { bitmap: bitmap })
    }
}

impl Pack for Hello {
    fn length(&self) -> usize {
        self.bitmap.map_or(0, |b| b.elem_length())
    }

    fn pack(&self, buf: &mut [u8]) -> Result<usize> {
        let mut writer = ByteWriter::new(buf);
        if let Some(ref bitmap) = self.bitmap {
            bitmap.write_elem(&mut writer)?;
        }
        Ok(writer.position())
    }
}
