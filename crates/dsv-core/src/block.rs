//! B-tree nodes and the per-directory master block.
//!
//! A node starts 4 bytes into its block with `mode: u32` and `count: u32`.
//! Leaves (`mode == 0`) hold `count` records back to back. Internal nodes
//! hold `count` pairs of `child_id: u32` followed by one record. Children
//! are decoded as soon as their id is read, so the cursor position after
//! each id is saved and restored around the recursive call.
//!
//! Every block id appears at most once in a tree; a second reference is an
//! error, so the walk does at most one node read per allocated block.
use crate::allocator::Allocator;
use crate::error::{DsStoreError, Result};
use crate::record::Record;
use crate::stream::{ByteStream, Endianness, Whence};

/// Nesting limit for the tree walk. Real files use a handful of levels.
pub const MAX_TREE_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: u32,
    /// 0 for leaves, anything else for internal nodes.
    pub mode: u32,
    pub children: Vec<Block>,
    pub records: Vec<Record>,
}

impl Block {
    pub fn read<S: ByteStream + ?Sized>(
        stream: &mut S,
        id: u32,
        allocator: &Allocator,
    ) -> Result<Self> {
        let mut visited = vec![false; allocator.blocks().len()];
        Self::read_at_depth(stream, id, allocator, &mut visited, 0)
    }

    fn read_at_depth<S: ByteStream + ?Sized>(
        stream: &mut S,
        id: u32,
        allocator: &Allocator,
        visited: &mut [bool],
        depth: usize,
    ) -> Result<Self> {
        if depth >= MAX_TREE_DEPTH {
            return Err(DsStoreError::TreeTooDeep {
                depth: MAX_TREE_DEPTH,
            });
        }
        let address = allocator.block(id)?;
        // `block` succeeded, so `id` indexes `visited`.
        if std::mem::replace(&mut visited[id as usize], true) {
            return Err(DsStoreError::BlockRevisited { id });
        }
        stream.seek(i64::from(address.offset) + 4, Whence::Begin)?;

        let mode = stream.read_u32(Endianness::Big)?;
        let count = stream.read_u32(Endianness::Big)?;
        tracing::trace!(id, mode, count, depth, "block");

        let mut children = Vec::new();
        let mut records = Vec::new();
        if mode == 0 {
            for _ in 0..count {
                records.push(Record::read(stream)?);
            }
        } else {
            for _ in 0..count {
                let child_id = stream.read_u32(Endianness::Big)?;
                let resume = stream.tell();
                children.push(Self::read_at_depth(
                    stream,
                    child_id,
                    allocator,
                    visited,
                    depth + 1,
                )?);
                stream.seek(resume as i64, Whence::Begin)?;
                records.push(Record::read(stream)?);
            }
        }
        Ok(Self {
            id,
            mode,
            children,
            records,
        })
    }

    pub fn is_leaf(&self) -> bool {
        self.mode == 0
    }

    /// This node and all descendants, parents before children.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes { stack: vec![self] }
    }

    /// Records of every node in [`Block::nodes`] order.
    pub fn all_records(&self) -> impl Iterator<Item = &Record> {
        self.nodes().flat_map(|b| b.records.iter())
    }

    /// Number of levels below and including this node.
    pub fn height(&self) -> usize {
        1 + self.children.iter().map(Block::height).max().unwrap_or(0)
    }
}

/// Pre-order walk over a block tree.
pub struct Nodes<'a> {
    stack: Vec<&'a Block>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.stack.pop()?;
        self.stack.extend(block.children.iter().rev());
        Some(block)
    }
}

/// Root descriptor of one named directory: five `u32` fields followed by
/// the tree they point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterBlock {
    pub id: u32,
    pub root_node_id: u32,
    pub levels: u32,
    pub record_count: u32,
    pub block_count: u32,
    pub reserved: u32,
    pub root_node: Block,
}

impl MasterBlock {
    pub fn read<S: ByteStream + ?Sized>(
        stream: &mut S,
        id: u32,
        allocator: &Allocator,
    ) -> Result<Self> {
        let address = allocator.block(id)?;
        stream.seek(i64::from(address.offset) + 4, Whence::Begin)?;

        let root_node_id = stream.read_u32(Endianness::Big)?;
        let levels = stream.read_u32(Endianness::Big)?;
        let record_count = stream.read_u32(Endianness::Big)?;
        let block_count = stream.read_u32(Endianness::Big)?;
        let reserved = stream.read_u32(Endianness::Big)?;
        tracing::debug!(id, root_node_id, levels, record_count, block_count, "master block");

        let root_node = Block::read(stream, root_node_id, allocator)?;
        Ok(Self {
            id,
            root_node_id,
            levels,
            record_count,
            block_count,
            reserved,
            root_node,
        })
    }
}
