//! Directory entries.

use crate::codec::{dec16, enc16};
use crate::layout::DIRSIZ;

/// One directory entry: an inode number and a fixed-width, NUL-padded name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub inum: u16,
    pub name: [u8; DIRSIZ],
}

impl DirEntry {
    pub const ENCODED_LEN: usize = 2 + DIRSIZ;

    /// Builds an entry, truncating `name` to `DIRSIZ` bytes.
    pub fn new(inum: u16, name: &str) -> Self {
        let mut bytes = [0u8; DIRSIZ];
        let src = name.as_bytes();
        let len = src.len().min(DIRSIZ);
        bytes[..len].copy_from_slice(&src[..len]);
        Self { inum, name: bytes }
    }

    pub fn name_str(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(DIRSIZ);
        std::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    pub fn encode_into(&self, buf: &mut [u8]) {
        enc16(self.inum, &mut buf[0..2]);
        buf[2..2 + DIRSIZ].copy_from_slice(&self.name);
    }

    pub fn decode_from(buf: &[u8]) -> Self {
        let inum = dec16(&buf[0..2]);
        let mut name = [0u8; DIRSIZ];
        name.copy_from_slice(&buf[2..2 + DIRSIZ]);
        Self { inum, name }
    }
}

static_assertions::const_assert_eq!(DirEntry::ENCODED_LEN, 16);
