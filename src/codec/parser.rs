//! Low-level byte stream parser for debug-information decoding.
//!
//! This module provides the [`crate::codec::Parser`] type, a cursor-based binary data parser
//! for the debug-information format. It offers bounds-checked access to the input and the decoding
//! half of every primitive the format is built from.
//!
//! # Architecture
//!
//! The parser maintains a position within a borrowed byte slice. Every read validates data
//! availability first, so a truncated stream surfaces as [`crate::Error::OutOfBounds`] and never
//! as a panic. Structural problems (an over-long continuation chain, invalid UTF-8, a run-length
//! entry that overshoots its array) surface as [`crate::Error::Malformed`].
//!
//! # Encodings
//!
//! - **Unsigned varint** - little-endian base-128: each byte carries 7 data bits, the high bit set
//!   means more bytes follow.
//! - **Signed varint** - zig-zag: the sign is moved into bit 0, the magnitude into the upper bits,
//!   then the value is written as an unsigned varint. `0, -1, 1, -2` become `0, 1, 2, 3`.
//! - **Run-length array** - each run is `value << 1 | has_count`, followed by a `count` varint only
//!   when `has_count` is set. A run without a count stands for a single element.
//! - **String** - unsigned varint byte length followed by that many UTF-8 bytes.
//!
//! # Usage Examples
//!
//! ```rust
//! use aotdbg::codec::Parser;
//!
//! // 300 as a varint, then -2 zig-zag encoded
//! let data = [0xAC, 0x02, 0x03];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_varint()?, 300);
//! assert_eq!(parser.read_signed()?, -2);
//! assert!(!parser.has_more_data());
//! # Ok::<(), aotdbg::Error>(())
//! ```

use crate::Result;

/// Maximum number of bytes a 64-bit varint may occupy.
const MAX_VARINT_LEN: usize = 10;

/// A cursor over a byte slice that decodes the debug-information primitives.
///
/// `Parser` keeps an internal position and validates every access against the end of the data,
/// so malformed or truncated input can never cause an out-of-bounds panic.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] from a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Returns the current position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Returns the number of bytes remaining from the current position.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Ensures that at least `needed` bytes are available from the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `needed` bytes remain.
    pub fn ensure_remaining(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(out_of_bounds_error!());
        }
        Ok(())
    }

    /// Read a single byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn read_u8(&mut self) -> Result<u8> {
        let Some(&byte) = self.data.get(self.position) else {
            return Err(out_of_bounds_error!());
        };
        self.position += 1;
        Ok(byte)
    }

    /// Read an unsigned base-128 varint of up to 64 bits.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data ends before the continuation chain
    /// terminates, or [`crate::Error::Malformed`] if the chain is longer than a 64-bit value allows.
    pub fn read_varint_u64(&mut self) -> Result<u64> {
        let start = self.position;
        let mut value = 0u64;
        let mut shift = 0u32;

        for index in 0..MAX_VARINT_LEN {
            let byte = self.read_u8()?;
            let payload = u64::from(byte & 0x7F);

            // The tenth byte only has room for the single remaining bit
            if index == MAX_VARINT_LEN - 1 && payload > 1 {
                return Err(malformed_error!(
                    "Varint at offset {} overflows 64 bits",
                    start
                ));
            }

            value |= payload << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }

        Err(malformed_error!(
            "Invalid continuation byte - varint at offset {} exceeds {} bytes",
            start,
            MAX_VARINT_LEN
        ))
    }

    /// Read an unsigned base-128 varint that must fit into a `u32`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncation, [`crate::Error::Malformed`] if the
    /// decoded value does not fit.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use aotdbg::codec::Parser;
    ///
    /// let mut parser = Parser::new(&[0x7F, 0x80, 0x01]);
    /// assert_eq!(parser.read_varint()?, 127);
    /// assert_eq!(parser.read_varint()?, 128);
    /// # Ok::<(), aotdbg::Error>(())
    /// ```
    pub fn read_varint(&mut self) -> Result<u32> {
        let value = self.read_varint_u64()?;
        u32::try_from(value).map_err(|_| malformed_error!("Varint {} exceeds u32 range", value))
    }

    /// Read a zig-zag encoded signed integer.
    ///
    /// # Errors
    /// Same as [`Parser::read_varint`].
    pub fn read_signed(&mut self) -> Result<i32> {
        let unsigned = self.read_varint()?;
        #[allow(clippy::cast_possible_wrap)]
        let signed = ((unsigned >> 1) as i32) ^ -((unsigned & 1) as i32);
        Ok(signed)
    }

    /// Read a varint used as an element count and check it against `limit`.
    ///
    /// Counts are validated before anything is allocated for them, so a corrupted count cannot
    /// trigger a huge allocation.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the count exceeds `limit`.
    pub fn read_count(&mut self, limit: usize) -> Result<usize> {
        let count = self.read_varint()? as usize;
        if count > limit {
            return Err(malformed_error!(
                "Count {} at offset {} exceeds the limit of {}",
                count,
                self.position,
                limit
            ));
        }
        Ok(count)
    }

    /// Read a run-length encoded array of exactly `count` unsigned values.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a run has a zero count or extends past `count`
    /// elements, [`crate::Error::OutOfBounds`] on truncation.
    pub fn read_rle(&mut self, count: usize) -> Result<Vec<u32>> {
        let mut values = Vec::with_capacity(count.min(self.remaining()));

        while values.len() < count {
            let header = self.read_varint_u64()?;
            let value = u32::try_from(header >> 1)
                .map_err(|_| malformed_error!("Run value {} exceeds u32 range", header >> 1))?;
            let run = if header & 1 != 0 {
                let run = self.read_varint()? as usize;
                if run == 0 {
                    return Err(malformed_error!("Empty run at offset {}", self.position));
                }
                run
            } else {
                1
            };

            if run > count - values.len() {
                return Err(malformed_error!(
                    "Run of {} elements overshoots an array of {}",
                    run,
                    count
                ));
            }
            values.extend(std::iter::repeat(value).take(run));
        }

        Ok(values)
    }

    /// Read a length-prefixed UTF-8 string, rejecting lengths above `max_len`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the body is truncated or [`crate::Error::Malformed`]
    /// for an oversized length or invalid UTF-8.
    pub fn read_string(&mut self, max_len: usize) -> Result<String> {
        let length = self.read_count(max_len)?;
        let bytes = self.read_bytes(length)?;

        String::from_utf8(bytes.to_vec()).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 string at offset {}-{}: {}",
                self.position - length,
                self.position,
                e.utf8_error()
            )
        })
    }

    /// Read `length` raw bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        self.ensure_remaining(length)?;
        let bytes = &self.data[self.position..self.position + length];
        self.position += length;
        Ok(bytes)
    }
}
