use thiserror::Error;

/// Reasons a file header is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("invalid header magic bytes (alignment {alignment:#010x}, magic {magic:#010x})")]
    BadMagic { alignment: u32, magic: u32 },

    #[error("root block offsets disagree ({first:#x} != {second:#x})")]
    RootOffsetMismatch { first: u32, second: u32 },

    #[error("root block offset is zero")]
    ZeroRootOffset,

    #[error("root block size is zero")]
    ZeroRootSize,
}

#[derive(Error, Debug)]
pub enum DsStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid header: {0}")]
    InvalidHeader(#[from] HeaderError),

    #[error("not enough data: requested {requested} bytes, {available} available")]
    InsufficientData { requested: u64, available: u64 },

    #[error("buffer too small: requested {requested} bytes, capacity {capacity}")]
    BufferTooSmall { requested: usize, capacity: usize },

    #[error("invalid seek to {target} (stream length {len})")]
    InvalidSeek { target: i64, len: u64 },

    #[error("invalid block ID {id} (allocator has {count} blocks)")]
    InvalidBlockId { id: u32, count: usize },

    #[error("invalid record name")]
    InvalidRecordName,

    #[error("invalid record data-type")]
    InvalidDataTypeTag,

    #[error("unknown record data-type {0:?}")]
    UnknownDataType(String),

    #[error("invalid UTF-16 string value")]
    InvalidStringValue,

    #[error("timestamp {0} is out of range")]
    TimestampOutOfRange(i64),

    #[error("block tree deeper than {depth} levels")]
    TreeTooDeep { depth: usize },

    #[error("block {id} is referenced more than once in one tree")]
    BlockRevisited { id: u32 },
}

pub type Result<T> = std::result::Result<T, DsStoreError>;
