//! Byte sink producing the debug-information primitives.
//!
//! [`crate::codec::Writer`] is the encoding mirror of [`crate::codec::Parser`]: every `write_*`
//! method produces exactly the bytes the corresponding `read_*` method consumes.

/// A growable output buffer with the debug-information encoders.
///
/// # Examples
///
/// ```rust
/// use aotdbg::codec::{Parser, Writer};
///
/// let mut writer = Writer::new();
/// writer.write_varint(300);
/// writer.write_signed(-2);
/// writer.write_string("Main.java");
///
/// let bytes = writer.into_bytes();
/// let mut parser = Parser::new(&bytes);
/// assert_eq!(parser.read_varint()?, 300);
/// assert_eq!(parser.read_signed()?, -2);
/// assert_eq!(parser.read_string(64)?, "Main.java");
/// # Ok::<(), aotdbg::Error>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct Writer {
    data: Vec<u8>,
}

impl Writer {
    /// Create an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The bytes written so far.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consume the writer and return its buffer.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Append a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Append an unsigned base-128 varint of up to 64 bits.
    pub fn write_varint_u64(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.data.push((value as u8 & 0x7F) | 0x80);
            value >>= 7;
        }
        self.data.push(value as u8);
    }

    /// Append an unsigned base-128 varint.
    pub fn write_varint(&mut self, value: u32) {
        self.write_varint_u64(u64::from(value));
    }

    /// Append a zig-zag encoded signed integer.
    pub fn write_signed(&mut self, value: i32) {
        #[allow(clippy::cast_sign_loss)]
        let unsigned = ((value << 1) ^ (value >> 31)) as u32;
        self.write_varint(unsigned);
    }

    /// Append a collection length.
    pub fn write_count(&mut self, count: usize) {
        self.write_varint_u64(count as u64);
    }

    /// Append a run-length encoded array.
    ///
    /// The element count is not written; callers write it beforehand so the reader knows how many
    /// elements to expand.
    pub fn write_rle(&mut self, values: &[u32]) {
        let mut index = 0;
        while index < values.len() {
            let value = values[index];
            let run = values[index..].iter().take_while(|v| **v == value).count();

            let header = u64::from(value) << 1;
            if run > 1 {
                self.write_varint_u64(header | 1);
                self.write_count(run);
            } else {
                self.write_varint_u64(header);
            }
            index += run;
        }
    }

    /// Append a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) {
        self.write_count(value.len());
        self.data.extend_from_slice(value.as_bytes());
    }
}
