use bitstream_io::{BigEndian, BitRead, BitReader, UnsignedInteger};
use std::io;

pub mod base64;

/// Reads `bits` bits starting at `start_bit`, most significant bit first.
///
/// Reading past the end of `bytes` fails with [`io::ErrorKind::UnexpectedEof`].
pub(crate) fn read_bits<U>(bytes: &[u8], start_bit: usize, bits: u32) -> io::Result<U>
where
    U: UnsignedInteger,
{
    DataReader::at(bytes, start_bit)?.read_fixed_integer(bits)
}

/// Reads the single bit at `bit_index`.
pub(crate) fn is_set(bytes: &[u8], bit_index: usize) -> io::Result<bool> {
    DataReader::at(bytes, bit_index)?.read_bool()
}

/// Number of bits held by `bytes`.
pub(crate) const fn bit_len(bytes: &[u8]) -> usize {
    bytes.len() * 8
}

/// Sequential big-endian bit reader over a borrowed byte slice.
pub(crate) struct DataReader<'a> {
    bit_reader: BitReader<&'a [u8], BigEndian>,
}

impl<'a> DataReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bit_reader: BitReader::endian(bytes, BigEndian),
        }
    }

    /// Creates a reader positioned on an arbitrary bit of `bytes`.
    pub fn at(bytes: &'a [u8], bit_offset: usize) -> io::Result<Self> {
        let tail = bytes
            .get(bit_offset / 8..)
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        let mut bit_reader = BitReader::endian(tail, BigEndian);
        bit_reader.skip((bit_offset % 8) as u32)?;

        Ok(Self { bit_reader })
    }

    pub fn read_bool(&mut self) -> io::Result<bool> {
        self.bit_reader.read_bit()
    }

    pub fn read_fixed_integer<U: UnsignedInteger>(&mut self, bits: u32) -> io::Result<U> {
        self.bit_reader.read_unsigned_var(bits)
    }

    /// Reads a 36 bits timestamp, expressed in deciseconds since the epoch.
    pub fn read_datetime_as_deciseconds(&mut self) -> io::Result<u64> {
        self.read_fixed_integer(36)
    }
}
