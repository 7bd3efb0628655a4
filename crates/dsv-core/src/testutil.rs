//! Byte builders for unit tests.

pub fn be32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn record_bytes(name: &str, code: &[u8; 4], tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let mut out = Vec::new();
    be32(&mut out, units.len() as u32);
    for u in units {
        out.extend_from_slice(&u.to_be_bytes());
    }
    out.extend_from_slice(code);
    out.extend_from_slice(tag);
    out.extend_from_slice(payload);
    out
}

/// Sparse file image; writes past the end grow it with zeros.
#[derive(Default)]
pub struct Image {
    pub bytes: Vec<u8>,
}

impl Image {
    pub fn put(&mut self, offset: usize, data: &[u8]) {
        if self.bytes.len() < offset + data.len() {
            self.bytes.resize(offset + data.len(), 0);
        }
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
    }
}
