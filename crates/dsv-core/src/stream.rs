//! Seekable, bounds-checked byte sources.
//!
//! [`ByteStream`] is the cursor every decoder reads through. Two
//! implementations are provided: [`DataStream`] over an in-memory slice and
//! [`FileStream`] over any `Read + Seek` handle (a file by default). Both keep
//! an explicit position and refuse reads or seeks outside `[0, len]`.
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{DsStoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Begin,
    Current,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf16,
}

pub trait ByteStream {
    /// Current absolute position.
    fn tell(&self) -> u64;

    /// Moves the cursor relative to `whence`. Targets outside `[0, len]` fail
    /// with [`DsStoreError::InvalidSeek`] and leave the position unchanged.
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()>;

    /// Fills the first `size` bytes of `buf` and advances by `size`.
    fn read_into(&mut self, buf: &mut [u8], size: usize) -> Result<()>;

    /// Bytes left between the cursor and the end of the stream.
    ///
    /// Measured by seeking to the end and back, so the position is preserved.
    fn available_bytes(&mut self) -> Result<u64> {
        let current = self.tell();
        self.seek(0, Whence::End)?;
        let end = self.tell();
        self.seek(to_offset(current)?, Whence::Begin)?;
        Ok(end.saturating_sub(current))
    }

    fn has_bytes_available(&mut self) -> Result<bool> {
        Ok(self.available_bytes()? > 0)
    }

    fn skip(&mut self, count: i64) -> Result<()> {
        self.seek(count, Whence::Current)
    }

    fn read(&mut self, size: usize) -> Result<Vec<u8>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        // Length fields come from the file; check before allocating for them.
        let available = self.available_bytes()?;
        if size as u64 > available {
            return Err(DsStoreError::InsufficientData {
                requested: size as u64,
                available,
            });
        }
        let mut buf = vec![0u8; size];
        self.read_into(&mut buf, size)?;
        Ok(buf)
    }

    fn read_all(&mut self) -> Result<Vec<u8>> {
        let available = self.available_bytes()?;
        let size = usize::try_from(available).map_err(|_| DsStoreError::InsufficientData {
            requested: available,
            available,
        })?;
        self.read(size)
    }

    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_into(&mut buf, 1)?;
        Ok(buf[0])
    }

    fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    fn read_u16(&mut self, endianness: Endianness) -> Result<u16> {
        let mut b = [0u8; 2];
        self.read_into(&mut b, 2)?;
        Ok(match endianness {
            Endianness::Big => u16::from_be_bytes(b),
            Endianness::Little => u16::from_le_bytes(b),
        })
    }

    fn read_i16(&mut self, endianness: Endianness) -> Result<i16> {
        Ok(self.read_u16(endianness)? as i16)
    }

    fn read_u32(&mut self, endianness: Endianness) -> Result<u32> {
        let mut b = [0u8; 4];
        self.read_into(&mut b, 4)?;
        Ok(match endianness {
            Endianness::Big => u32::from_be_bytes(b),
            Endianness::Little => u32::from_le_bytes(b),
        })
    }

    fn read_i32(&mut self, endianness: Endianness) -> Result<i32> {
        Ok(self.read_u32(endianness)? as i32)
    }

    fn read_u64(&mut self, endianness: Endianness) -> Result<u64> {
        let mut b = [0u8; 8];
        self.read_into(&mut b, 8)?;
        Ok(match endianness {
            Endianness::Big => u64::from_be_bytes(b),
            Endianness::Little => u64::from_le_bytes(b),
        })
    }

    fn read_i64(&mut self, endianness: Endianness) -> Result<i64> {
        Ok(self.read_u64(endianness)? as i64)
    }

    /// Reads `length` bytes and decodes them. `Ok(None)` means the bytes were
    /// read but are not valid in `encoding`.
    fn read_string(&mut self, length: usize, encoding: Encoding) -> Result<Option<String>> {
        let bytes = self.read(length)?;
        Ok(decode_string(&bytes, encoding))
    }

    /// Reads up to and including a `0x00` byte and decodes what precedes it.
    fn read_nul_terminated_string(&mut self, encoding: Encoding) -> Result<Option<String>> {
        let mut bytes = Vec::new();
        loop {
            match self.read_u8()? {
                0 => break,
                b => bytes.push(b),
            }
        }
        Ok(decode_string(&bytes, encoding))
    }
}

impl<S: ByteStream + ?Sized> ByteStream for &mut S {
    fn tell(&self) -> u64 {
        (**self).tell()
    }
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        (**self).seek(offset, whence)
    }
    fn read_into(&mut self, buf: &mut [u8], size: usize) -> Result<()> {
        (**self).read_into(buf, size)
    }
}

pub fn decode_string(bytes: &[u8], encoding: Encoding) -> Option<String> {
    match encoding {
        Encoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
        Encoding::Utf16 => decode_utf16(bytes),
    }
}

/// Big-endian UTF-16 unless a byte-order mark says otherwise.
pub fn decode_utf16(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let (body, little) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (rest, true),
        [0xFE, 0xFF, rest @ ..] => (rest, false),
        _ => (bytes, false),
    };
    let units = body.chunks_exact(2).map(|c| {
        if little {
            u16::from_le_bytes([c[0], c[1]])
        } else {
            u16::from_be_bytes([c[0], c[1]])
        }
    });
    char::decode_utf16(units).collect::<std::result::Result<String, _>>().ok()
}

fn to_offset(pos: u64) -> Result<i64> {
    i64::try_from(pos).map_err(|_| DsStoreError::InvalidSeek {
        target: i64::MAX,
        len: pos,
    })
}

fn resolve_seek(pos: u64, len: u64, offset: i64, whence: Whence) -> Result<u64> {
    let base = match whence {
        Whence::Begin => 0,
        Whence::Current => to_offset(pos)?,
        Whence::End => to_offset(len)?,
    };
    let target = base.checked_add(offset).ok_or(DsStoreError::InvalidSeek {
        target: if offset < 0 { i64::MIN } else { i64::MAX },
        len,
    })?;
    if target < 0 || target as u64 > len {
        return Err(DsStoreError::InvalidSeek { target, len });
    }
    Ok(target as u64)
}

fn check_read(pos: u64, len: u64, size: usize, capacity: usize) -> Result<()> {
    let available = len - pos;
    if size as u64 > available {
        return Err(DsStoreError::InsufficientData {
            requested: size as u64,
            available,
        });
    }
    if size > capacity {
        return Err(DsStoreError::BufferTooSmall {
            requested: size,
            capacity,
        });
    }
    Ok(())
}

/// Cursor over bytes already in memory.
#[derive(Debug, Clone)]
pub struct DataStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DataStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl ByteStream for DataStream<'_> {
    fn tell(&self) -> u64 {
        self.pos as u64
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        self.pos = resolve_seek(self.pos as u64, self.data.len() as u64, offset, whence)? as usize;
        Ok(())
    }

    fn read_into(&mut self, buf: &mut [u8], size: usize) -> Result<()> {
        check_read(self.pos as u64, self.data.len() as u64, size, buf.len())?;
        buf[..size].copy_from_slice(&self.data[self.pos..self.pos + size]);
        self.pos += size;
        Ok(())
    }
}

/// Cursor over a seekable handle. The length is captured once at
/// construction; the handle is repositioned on every seek.
#[derive(Debug)]
pub struct FileStream<R = BufReader<File>> {
    inner: R,
    pos: u64,
    len: u64,
}

impl FileStream {
    pub fn open(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path)?;
        if !meta.is_file() {
            return Err(DsStoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            )));
        }
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> FileStream<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { inner, pos: 0, len })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<R: Read + Seek> ByteStream for FileStream<R> {
    fn tell(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<()> {
        let target = resolve_seek(self.pos, self.len, offset, whence)?;
        self.inner.seek(SeekFrom::Start(target))?;
        self.pos = target;
        Ok(())
    }

    /// Computed from the captured length; seeking would drop the read buffer.
    fn available_bytes(&mut self) -> Result<u64> {
        Ok(self.len - self.pos)
    }

    fn read_into(&mut self, buf: &mut [u8], size: usize) -> Result<()> {
        check_read(self.pos, self.len, size, buf.len())?;
        self.inner.read_exact(&mut buf[..size])?;
        self.pos += size as u64;
        Ok(())
    }
}
