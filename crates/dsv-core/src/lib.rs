//! dsv-core: decoder for Finder `.DS_Store` files
//!
//! The decode is a single pass over one [`stream::ByteStream`]:
//! - [`header::Header`] validates the "Bud1" header and locates the allocator
//! - [`allocator::Allocator`] reads the buddy block table, named directories and free list
//! - [`block::MasterBlock`] / [`block::Block`] walk each directory's B-tree
//! - [`record::Record`] decodes the typed property records in every node
//!
//! [`dump`] and [`scan`] are thin helpers for the CLI: text/JSON rendering and
//! finding store files on disk.
pub mod allocator;
pub mod block;
pub mod document;
pub mod dump;
pub mod error;
pub mod header;
pub mod record;
pub mod scan;
pub mod stream;

#[cfg(test)]
mod testutil;

pub use allocator::{Allocator, BlockAddress, DirectoryEntry};
pub use block::{Block, MasterBlock};
pub use document::Document;
pub use dump::{DumpOpts, dump_json, dump_text};
pub use error::{DsStoreError, HeaderError, Result};
pub use header::Header;
pub use record::{DataType, Record, RecordValue, fourcc};
pub use stream::{ByteStream, DataStream, Encoding, Endianness, FileStream, Whence};
