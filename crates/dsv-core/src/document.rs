use std::path::Path;

use crate::allocator::Allocator;
use crate::block::{Block, MasterBlock};
use crate::error::Result;
use crate::header::Header;
use crate::record::Record;
use crate::stream::{ByteStream, DataStream, FileStream};

/// A fully decoded file. Decoding is all-or-nothing: any structural error
/// aborts and no partial document is returned.
#[derive(Debug, Clone)]
pub struct Document {
    header: Header,
    allocator: Allocator,
    /// File order; a repeated name keeps its first position.
    directories: Vec<(String, MasterBlock)>,
}

impl Document {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let _span = tracing::debug_span!("open", path = %path.display()).entered();
        let mut stream = FileStream::open(path)?;
        Self::read(&mut stream)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read(&mut DataStream::new(bytes))
    }

    pub fn read<S: ByteStream + ?Sized>(stream: &mut S) -> Result<Self> {
        let header = Header::read(stream)?;
        let allocator = Allocator::read(stream, &header)?;
        let mut directories: Vec<(String, MasterBlock)> = Vec::new();
        for entry in allocator.directories() {
            let master = MasterBlock::read(stream, entry.id, &allocator)?;
            // Repeated names: the later entry replaces the earlier one.
            match directories.iter_mut().find(|(name, _)| *name == entry.name) {
                Some((_, slot)) => *slot = master,
                None => directories.push((entry.name.clone(), master)),
            }
        }
        Ok(Self {
            header,
            allocator,
            directories,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    /// Named trees in the order the allocator lists them.
    pub fn directories(&self) -> &[(String, MasterBlock)] {
        &self.directories
    }

    pub fn directory(&self, name: &str) -> Option<&MasterBlock> {
        self.directories
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, master)| master)
    }

    /// Every node of every directory, each tree in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = &Block> {
        self.directories
            .iter()
            .flat_map(|(_, m)| m.root_node.nodes())
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.nodes().flat_map(|b| b.records.iter())
    }
}
