//! Bounds-checked big-endian access to byte regions.
//!
//! Every codec in `ds` reads through a `ByteCursor` and writes through a
//! `ByteWriter`, so running off the end of a region surfaces as
//! `TruncatedMessage` or `BufferTooSmall` instead of a panic.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use super::super::err::*;

/// Read side: a cursor over a borrowed byte region.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    cursor: Cursor<&'a [u8]>,
    what: &'static str,
}

impl<'a> ByteCursor<'a> {
    /// `what` names the structure being decoded in error messages.
    pub fn new(bytes: &'a [u8], what: &'static str) -> Self {
        ByteCursor {
            cursor: Cursor::new(bytes),
            what: what,
        }
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len();
        len.saturating_sub(self.position())
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            trace!(
                "Short read for {}: need {} at offset {}, {} left.",
                self.what,
                needed,
                self.position(),
                self.remaining()
            );
            bail!(ErrorKind::TruncatedMessage(
                needed,
                self.remaining(),
                self.what
            ));
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.cursor.read_u16::<BigEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.cursor.read_u32::<BigEndian>()?)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.cursor.read_u64::<BigEndian>()?)
    }

    /// Borrows the next `len` bytes and advances past them.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let start = self.position();
        let bytes: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((start + len) as u64);
        Ok(&bytes[start..start + len])
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Reads a big-endian u16 `offset` bytes ahead without moving.
    pub fn peek_u16(&self, offset: usize) -> Result<u16> {
        let mut ahead = self.clone();
        ahead.skip(offset)?;
        ahead.read_u16()
    }

    /// Everything not consumed yet.
    pub fn rest(&mut self) -> &'a [u8] {
        let remaining = self.remaining();
        // cannot fail, the length was just taken from the cursor
        self.read_bytes(remaining).unwrap_or(&[])
    }
}

/// Write side: a cursor over a caller supplied buffer.
#[derive(Debug)]
pub struct ByteWriter<'a> {
    cursor: Cursor<&'a mut [u8]>,
}

impl<'a> ByteWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        ByteWriter {
            cursor: Cursor::new(buf),
        }
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            bail!(ErrorKind::BufferTooSmall(
                self.position() + needed,
                self.cursor.get_ref().len()
            ));
        }
        Ok(())
    }

    pub fn write_u8(&mut self, val: u8) -> Result<()> {
        self.ensure(1)?;
        Ok(self.cursor.write_u8(val)?)
    }

    pub fn write_u16(&mut self, val: u16) -> Result<()> {
        self.ensure(2)?;
        Ok(self.cursor.write_u16::<BigEndian>(val)?)
    }

    pub fn write_u32(&mut self, val: u32) -> Result<()> {
        self.ensure(4)?;
        Ok(self.cursor.write_u32::<BigEndian>(val)?)
    }

    pub fn write_u64(&mut self, val: u64) -> Result<()> {
        self.ensure(8)?;
        Ok(self.cursor.write_u64::<BigEndian>(val)?)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure(bytes.len())?;
        let start = self.position();
        self.cursor.get_mut()[start..start + bytes.len()].copy_from_slice(bytes);
        self.cursor.set_position((start + bytes.len()) as u64);
        Ok(())
    }

    /// Writes `count` zero bytes of padding.
    pub fn pad(&mut self, count: usize) -> Result<()> {
        self.ensure(count)?;
        for _ in 0..count {
            self.cursor.write_u8(0)?;
        }
        Ok(())
    }

    /// Hands out the next `len` bytes for a nested packer and skips them.
    pub fn reserve(&mut self, len: usize) -> Result<&mut [u8]> {
        self.ensure(len)?;
        let start = self.position();
        self.cursor.set_position((start + len) as u64);
        Ok(&mut self.cursor.get_mut()[start..start + len])
    }
}

/// Owned, resizable backing store for messages that are packed in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemoryArea {
    data: Vec<u8>,
}

impl MemoryArea {
    pub fn new(len: usize) -> Self {
        MemoryArea { data: vec![0u8; len] }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Grows or shrinks the area; new bytes are zero.
    pub fn resize(&mut self, len: usize) {
        self.data.resize(len, 0);
    }

    /// Grows the area to at least `len` bytes, never shrinks it.
    pub fn ensure_len(&mut self, len: usize) {
        if self.data.len() < len {
            debug!("Growing memory area from {} to {} bytes.", self.data.len(), len);
            self.resize(len);
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }

    pub fn clear(&mut self) {
        for b in self.data.iter_mut() {
            *b = 0;
        }
    }
}

/// Rounds `len` up to the next multiple of eight.
pub fn pad_to_8(len: usize) -> usize {
    (len + 7) / 8 * 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_past_end() {
        let bytes = [0x12u8, 0x34, 0x56];
        let mut testee = ByteCursor::new(&bytes[..], "test");
        assert_eq!(0x1234, testee.read_u16().unwrap());
        let err = testee.read_u16().unwrap_err();
        match err.kind() {
            ErrorKind::TruncatedMessage(needed, available, _) => {
                assert_eq!(2, *needed);
                assert_eq!(1, *available);
            }
            other => panic!("unexpected error {:?}", other),
        }
        // failed read does not move the cursor
        assert_eq!(0x56, testee.read_u8().unwrap());
        assert!(testee.is_empty());
    }

    #[test]
    fn peek_does_not_move() {
        let bytes = [0u8, 0, 0, 0x10, 0xff];
        let testee = ByteCursor::new(&bytes[..], "test");
        assert_eq!(0x10, testee.peek_u16(2).unwrap());
        assert_eq!(0, testee.position());
    }

    #[test]
    fn write_past_end() {
        let mut buf = [0u8; 5];
        let mut testee = ByteWriter::new(&mut buf[..]);
        testee.write_u32(0xdeadbeef).unwrap();
        let err = testee.write_u16(1).unwrap_err();
        match err.kind() {
            ErrorKind::BufferTooSmall(needed, available) => {
                assert_eq!(6, *needed);
                assert_eq!(5, *available);
            }
            other => panic!("unexpected error {:?}", other),
        }
        testee.pad(1).unwrap();
        assert_eq!([0xde, 0xad, 0xbe, 0xef, 0], buf);
    }

    #[test]
    fn area_grows_only_on_demand() {
        let mut testee = MemoryArea::new(8);
        testee.ensure_len(4);
        assert_eq!(8, testee.len());
        testee.ensure_len(24);
        assert_eq!(24, testee.len());
        assert!(testee.as_slice().iter().all(|b| *b == 0));
    }

    #[test]
    fn padding() {
        assert_eq!(0, pad_to_8(0));
        assert_eq!(8, pad_to_8(1));
        assert_eq!(8, pad_to_8(8));
        assert_eq!(16, pad_to_8(9));
    }
}
