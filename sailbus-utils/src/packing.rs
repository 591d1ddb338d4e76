//!
//! Packing and Unpacking of Primitive Data into Byte Buffers.
//!
//! Messages leaving the vessel (or arriving from a link) are flat byte
//! buffers.  The [`ByteWriter`] and [`ByteReader`] cursors walk a buffer
//! front to back so a message can be written or read field by field.
//!

use thiserror::Error;

/// An error from attempting to pack data into a buffer or from
/// attempting to unpack data from a slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PackingError {
    /// The buffer does not have enough bytes left for the value.
    #[error("buffer too small: needed {needed} bytes, {remaining} remaining")]
    InvalidBufferSize {
        /// Bytes the value needs
        needed: usize,
        /// Bytes left in the buffer
        remaining: usize,
    },
}

/// Trait implemented by data that can be written into and read back
/// from a byte buffer.
pub trait Packable: Sized {
    /// Number of bytes this value occupies once packed.
    fn len() -> usize;

    /// Pack a value into the front of `buffer`.
    fn pack(self, buffer: &mut [u8]) -> Result<(), PackingError>;

    /// Unpack a value from the front of `data`.
    fn unpack(data: &[u8]) -> Result<Self, PackingError>;
}

macro_rules! packable_primitive {
    ($primitive_name: ident, $length: literal) => {
        impl Packable for $primitive_name {
            fn len() -> usize {
                $length as usize
            }

            fn pack(self, buffer: &mut [u8]) -> Result<(), PackingError> {
                if buffer.len() < Self::len() {
                    return Err(PackingError::InvalidBufferSize {
                        needed: Self::len(),
                        remaining: buffer.len(),
                    });
                }

                #[cfg(feature = "little-endian")]
                let bytes = self.to_le_bytes();
                #[cfg(not(feature = "little-endian"))]
                let bytes = self.to_be_bytes();

                buffer[..Self::len()].copy_from_slice(&bytes[..]);
                Ok(())
            }

            fn unpack(data: &[u8]) -> Result<Self, PackingError> {
                let mut bytes = [0u8; $length];
                if data.len() < Self::len() {
                    return Err(PackingError::InvalidBufferSize {
                        needed: Self::len(),
                        remaining: data.len(),
                    });
                }
                bytes.copy_from_slice(&data[..Self::len()]);

                #[cfg(feature = "little-endian")]
                let value = Self::from_le_bytes(bytes);
                #[cfg(not(feature = "little-endian"))]
                let value = Self::from_be_bytes(bytes);

                Ok(value)
            }
        }
    };
}

packable_primitive!(u8, 1);
packable_primitive!(u16, 2);
packable_primitive!(u32, 4);
packable_primitive!(u64, 8);
packable_primitive!(i16, 2);
packable_primitive!(i32, 4);
packable_primitive!(f32, 4);
packable_primitive!(f64, 8);

/// Growable writer that appends packed values to an owned buffer.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a packed value to the end of the buffer
    pub fn write<T: Packable>(&mut self, value: T) -> &mut Self {
        let start = self.buffer.len();
        self.buffer.resize(start + T::len(), 0);
        // The buffer was just grown by exactly `T::len()` bytes
        if value.pack(&mut self.buffer[start..]).is_err() {
            self.buffer.truncate(start);
        }
        self
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consume the writer and return the packed bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// Cursor that unpacks values from the front of a borrowed slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Unpack the next value and advance past it.
    ///
    /// On error the cursor does not move.
    pub fn read<T: Packable>(&mut self) -> Result<T, PackingError> {
        let value = T::unpack(&self.data[self.position..])?;
        self.position += T::len();
        Ok(value)
    }

    /// Bytes that have not been read yet
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }
}
