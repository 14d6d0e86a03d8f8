//! Bounds-checked reads over raw kernel and ELF byte buffers
//!
//! Every read checks the remaining length first and advances the position on
//! success, so a short buffer surfaces as [`DecodeError::Truncated`] instead of
//! an out-of-bounds read. Values are native-endian, matching how the kernel
//! writes them on the same host.

use crate::domain::DecodeError;

/// Read-and-advance cursor over a byte slice
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_ne {
    ($name:ident, $ty:ty) => {
        #[doc = concat!("Read a native-endian `", stringify!($ty), "`")]
        pub fn $name(&mut self) -> Result<$ty, DecodeError> {
            let bytes = self.read_array::<{ std::mem::size_of::<$ty>() }>()?;
            Ok(<$ty>::from_ne_bytes(bytes))
        }
    };
}

impl<'a> ByteCursor<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Cursor positioned at `offset`; fails if `offset` is past the end
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self, DecodeError> {
        if offset > data.len() {
            return Err(DecodeError::Truncated { needed: offset, available: data.len() });
        }
        Ok(Self { data, pos: offset })
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Take the next `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(DecodeError::Truncated { needed: len, available: self.remaining() })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.read_bytes(len).map(|_| ())
    }

    /// Advance to the next multiple of `align` (power of two), relative to the
    /// start of the buffer
    pub fn align_to(&mut self, align: usize) -> Result<(), DecodeError> {
        let padding = self.pos.next_multiple_of(align) - self.pos;
        self.skip(padding)
    }

    read_ne!(read_u8, u8);
    read_ne!(read_u16, u16);
    read_ne!(read_u32, u32);
    read_ne!(read_u64, u64);
    read_ne!(read_i8, i8);
    read_ne!(read_i16, i16);
    read_ne!(read_i32, i32);
    read_ne!(read_i64, i64);
    read_ne!(read_f32, f32);
    read_ne!(read_f64, f64);
}
