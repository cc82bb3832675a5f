use crate::err::PayloadError;

/// Reads SOME/IP RPC argument payloads written by [`super::ByteWriter`].
/// Never panics on short input; every primitive getter returns a
/// [`PayloadError`] instead (spec §4.1b).
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> ByteReader<'a> {
        ByteReader { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], PayloadError> {
        if self.remaining() < n {
            return Err(PayloadError::UnexpectedEndOfInput {
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_bool(&mut self) -> Result<bool, PayloadError> {
        Ok(self.take(1)?[0] & 0x1 != 0)
    }

    pub fn read_u8(&mut self) -> Result<u8, PayloadError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, PayloadError> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, PayloadError> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn read_i16(&mut self) -> Result<i16, PayloadError> {
        Ok(i16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn read_u32(&mut self) -> Result<u32, PayloadError> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_i32(&mut self) -> Result<i32, PayloadError> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> Result<u64, PayloadError> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_i64(&mut self) -> Result<i64, PayloadError> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_f32(&mut self) -> Result<f32, PayloadError> {
        Ok(f32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_f64(&mut self) -> Result<f64, PayloadError> {
        Ok(f64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], PayloadError> {
        self.take(len)
    }

    /// Advances past zero-padding to the next `n`-byte boundary measured
    /// from the start of the reader's underlying buffer.
    pub fn align_to(&mut self, n: usize) -> Result<(), PayloadError> {
        if n == 0 {
            return Ok(());
        }
        let remainder = self.pos % n;
        if remainder != 0 {
            self.take(n - remainder)?;
        }
        Ok(())
    }

    /// A fixed-length string of exactly `len` bytes, not length-prefixed.
    /// Trailing zero padding is stripped.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String, PayloadError> {
        let raw = self.take(len)?;
        let trimmed = match raw.iter().position(|&b| b == 0) {
            Some(end) => &raw[..end],
            None => raw,
        };
        std::str::from_utf8(trimmed)
            .map(str::to_owned)
            .map_err(|_| PayloadError::InvalidUtf8)
    }

    /// A dynamic-length string: u32 byte-length prefix (BOM included),
    /// 3-byte UTF-8 BOM, then content.
    pub fn read_dynamic_string(&mut self) -> Result<String, PayloadError> {
        let declared = self.read_u32()? as usize;
        if declared < 3 {
            return Err(PayloadError::LengthExceedsPayload {
                declared,
                available: self.remaining(),
            });
        }
        let raw = self.take(declared)?;
        let content = &raw[3..];
        std::str::from_utf8(content)
            .map(str::to_owned)
            .map_err(|_| PayloadError::InvalidUtf8)
    }

    /// A dynamic-length array: reads the u32 byte-length prefix, then
    /// invokes `read_elem` on a sub-reader scoped to exactly that many
    /// bytes, collecting elements until the sub-reader is exhausted.
    pub fn read_dynamic_array<T>(
        &mut self,
        mut read_elem: impl FnMut(&mut ByteReader<'a>) -> Result<T, PayloadError>,
    ) -> Result<Vec<T>, PayloadError> {
        let declared = self.read_u32()? as usize;
        let raw = self.take(declared)?;
        let mut sub = ByteReader::new(raw);
        let mut out = Vec::new();
        while sub.remaining() > 0 {
            out.push(read_elem(&mut sub)?);
        }
        Ok(out)
    }

    /// A fixed-length array: exactly `count` calls to `read_elem`, no length
    /// prefix.
    pub fn read_fixed_array<T>(
        &mut self,
        count: usize,
        mut read_elem: impl FnMut(&mut ByteReader<'a>) -> Result<T, PayloadError>,
    ) -> Result<Vec<T>, PayloadError> {
        (0..count).map(|_| read_elem(self)).collect()
    }

    /// A tagged union: u32 overall length, u32 tag, then the element bytes
    /// scoped to the declared length.
    pub fn read_union<T>(
        &mut self,
        read_elem: impl FnOnce(u32, &mut ByteReader<'a>) -> Result<T, PayloadError>,
    ) -> Result<T, PayloadError> {
        let declared = self.read_u32()? as usize;
        let raw = self.take(declared)?;
        let mut sub = ByteReader::new(raw);
        let tag = sub.read_u32()?;
        read_elem(tag, &mut sub)
    }
}
