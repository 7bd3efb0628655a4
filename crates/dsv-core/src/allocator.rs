//! Buddy allocator state stored at the header's root offset: the block
//! address table, the named directory table and the free list.
use crate::error::{DsStoreError, Result};
use crate::header::Header;
use crate::stream::{ByteStream, Endianness, Whence};

pub const FREE_LIST_BUCKETS: usize = 32;
/// The block table is stored in chunks of this many entries.
pub const BLOCK_TABLE_CHUNK: u32 = 256;

const SIZE_CLASS_MASK: u32 = 0x1F;

/// Location of a block. `size` is always a power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAddress {
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub id: u32,
}

#[derive(Debug, Clone)]
pub struct Allocator {
    blocks: Vec<BlockAddress>,
    directories: Vec<DirectoryEntry>,
    free_list: [Vec<u32>; FREE_LIST_BUCKETS],
}

impl Allocator {
    pub fn read<S: ByteStream + ?Sized>(stream: &mut S, header: &Header) -> Result<Self> {
        // The first word at the root offset is not used.
        stream.seek(i64::from(header.root_offset) + 4, Whence::Begin)?;

        let count = stream.read_u32(Endianness::Big)?;
        stream.skip(4)?;

        let mut blocks = Vec::new();
        for _ in 0..count {
            blocks.push(Self::decode_offset_and_size(stream.read_u32(Endianness::Big)?));
        }
        let padding = BLOCK_TABLE_CHUNK - count % BLOCK_TABLE_CHUNK;
        skip_exact(stream, u64::from(padding) * 4)?;

        let directories = read_directories(stream)?;
        let free_list = read_free_list(stream)?;

        tracing::debug!(
            blocks = blocks.len(),
            directories = directories.len(),
            free = free_list.iter().map(Vec::len).sum::<usize>(),
            "allocator"
        );
        Ok(Self {
            blocks,
            directories,
            free_list,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_blocks(blocks: Vec<BlockAddress>) -> Self {
        Self {
            blocks,
            directories: Vec::new(),
            free_list: Default::default(),
        }
    }

    /// Splits a packed block address: the low 5 bits are the log2 size,
    /// the rest is the 32-byte aligned offset.
    pub fn decode_offset_and_size(value: u32) -> BlockAddress {
        BlockAddress {
            offset: value & !SIZE_CLASS_MASK,
            size: 1 << (value & SIZE_CLASS_MASK),
        }
    }

    pub fn blocks(&self) -> &[BlockAddress] {
        &self.blocks
    }

    pub fn block(&self, id: u32) -> Result<BlockAddress> {
        self.blocks
            .get(id as usize)
            .copied()
            .ok_or(DsStoreError::InvalidBlockId {
                id,
                count: self.blocks.len(),
            })
    }

    /// Directory entries in file order. Names may repeat.
    pub fn directories(&self) -> &[DirectoryEntry] {
        &self.directories
    }

    /// Root block id for `name`; the last entry wins when a name repeats.
    pub fn directory_id(&self, name: &str) -> Option<u32> {
        self.directories
            .iter()
            .rev()
            .find(|d| d.name == name)
            .map(|d| d.id)
    }

    /// Bucket `i` lists free blocks of size `2^i`.
    pub fn free_list(&self) -> &[Vec<u32>; FREE_LIST_BUCKETS] {
        &self.free_list
    }
}

fn skip_exact<S: ByteStream + ?Sized>(stream: &mut S, count: u64) -> Result<()> {
    let available = stream.available_bytes()?;
    if count > available {
        return Err(DsStoreError::InsufficientData {
            requested: count,
            available,
        });
    }
    stream.skip(count as i64)
}

fn read_directories<S: ByteStream + ?Sized>(stream: &mut S) -> Result<Vec<DirectoryEntry>> {
    let count = stream.read_u32(Endianness::Big)?;
    let mut out = Vec::new();
    for _ in 0..count {
        let len = stream.read_u8()? as usize;
        let raw = stream.read(len)?;
        let name = String::from_utf8_lossy(&raw).into_owned();
        let id = stream.read_u32(Endianness::Big)?;
        out.push(DirectoryEntry { name, id });
    }
    Ok(out)
}

fn read_free_list<S: ByteStream + ?Sized>(
    stream: &mut S,
) -> Result<[Vec<u32>; FREE_LIST_BUCKETS]> {
    let mut buckets: [Vec<u32>; FREE_LIST_BUCKETS] = Default::default();
    for bucket in buckets.iter_mut() {
        let count = stream.read_u32(Endianness::Big)?;
        for _ in 0..count {
            bucket.push(stream.read_u32(Endianness::Big)?);
        }
    }
    Ok(buckets)
}
