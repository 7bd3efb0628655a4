use crate::error::{HeaderError, Result};
use crate::stream::{ByteStream, Endianness, Whence};

pub const ALIGNMENT: u32 = 0x0000_0001;
/// "Bud1"
pub const MAGIC: u32 = 0x4275_6431;
pub const HEADER_SIZE: usize = 20;

/// Fixed header at the start of every file. The root offset is stored
/// twice and both copies must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub alignment: u32,
    pub magic: u32,
    pub root_offset: u32,
    pub root_size: u32,
    pub root_offset_dup: u32,
}

impl Header {
    pub fn read<S: ByteStream + ?Sized>(stream: &mut S) -> Result<Self> {
        stream.seek(0, Whence::Begin)?;
        let header = Self {
            alignment: stream.read_u32(Endianness::Big)?,
            magic: stream.read_u32(Endianness::Big)?,
            root_offset: stream.read_u32(Endianness::Big)?,
            root_size: stream.read_u32(Endianness::Big)?,
            root_offset_dup: stream.read_u32(Endianness::Big)?,
        };
        header.validate()?;
        tracing::debug!(
            root_offset = header.root_offset,
            root_size = header.root_size,
            "header"
        );
        Ok(header)
    }

    pub fn validate(&self) -> std::result::Result<(), HeaderError> {
        if self.alignment != ALIGNMENT || self.magic != MAGIC {
            return Err(HeaderError::BadMagic {
                alignment: self.alignment,
                magic: self.magic,
            });
        }
        if self.root_offset != self.root_offset_dup {
            return Err(HeaderError::RootOffsetMismatch {
                first: self.root_offset,
                second: self.root_offset_dup,
            });
        }
        if self.root_offset == 0 {
            return Err(HeaderError::ZeroRootOffset);
        }
        if self.root_size == 0 {
            return Err(HeaderError::ZeroRootSize);
        }
        Ok(())
    }
}
