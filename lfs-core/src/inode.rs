//! The on-disk inode (dinode) and its in-memory mirror.
//!
//! Unlike a packed-inode-block filesystem, this format gives every inode
//! its own full block (see `crate::imap`): there is no `IPB`-style packing
//! of several dinodes into one block, because the LFS block allocator can't
//! guarantee contiguous placement for inodes that are rewritten at
//! different times.

use crate::codec::{dec16, dec32, enc16, enc32};
use crate::layout::NDIRECT;

/// Inode type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeType {
    Free,
    Directory,
    File,
    Device,
}

impl InodeType {
    fn to_u16(self) -> u16 {
        match self {
            InodeType::Free => 0,
            InodeType::Directory => 1,
            InodeType::File => 2,
            InodeType::Device => 3,
        }
    }

    fn from_u16(x: u16) -> Self {
        match x {
            1 => InodeType::Directory,
            2 => InodeType::File,
            3 => InodeType::Device,
            _ => InodeType::Free,
        }
    }
}

/// On-disk inode structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskInode {
    pub r#type: InodeType,
    pub major: u16,
    pub minor: u16,
    pub nlink: u16,
    pub size: u32,
    /// `NDIRECT` direct block addresses, followed by one single-indirect
    /// pointer in the last slot.
    pub addrs: [u32; NDIRECT + 1],
}

impl DiskInode {
    pub const ENCODED_LEN: usize = 2 + 2 + 2 + 2 + 4 + (NDIRECT + 1) * 4;

    pub fn new(r#type: InodeType) -> Self {
        Self {
            r#type,
            major: 0,
            minor: 0,
            nlink: 0,
            size: 0,
            addrs: [0; NDIRECT + 1],
        }
    }

    pub fn encode_into(&self, buf: &mut [u8]) {
        enc16(self.r#type.to_u16(), &mut buf[0..2]);
        enc16(self.major, &mut buf[2..4]);
        enc16(self.minor, &mut buf[4..6]);
        enc16(self.nlink, &mut buf[6..8]);
        enc32(self.size, &mut buf[8..12]);
        for (i, addr) in self.addrs.iter().enumerate() {
            let off = 12 + i * 4;
            enc32(*addr, &mut buf[off..off + 4]);
        }
    }

    pub fn decode_from(buf: &[u8]) -> Self {
        let r#type = InodeType::from_u16(dec16(&buf[0..2]));
        let major = dec16(&buf[2..4]);
        let minor = dec16(&buf[4..6]);
        let nlink = dec16(&buf[6..8]);
        let size = dec32(&buf[8..12]);
        let mut addrs = [0u32; NDIRECT + 1];
        for (i, addr) in addrs.iter_mut().enumerate() {
            let off = 12 + i * 4;
            *addr = dec32(&buf[off..off + 4]);
        }
        Self {
            r#type,
            major,
            minor,
            nlink,
            size,
            addrs,
        }
    }
}

static_assertions::const_assert!(DiskInode::ENCODED_LEN <= crate::layout::BSIZE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_buffer() {
        let mut din = DiskInode::new(InodeType::File);
        din.nlink = 1;
        din.size = 4096;
        din.addrs[0] = 42;
        din.addrs[NDIRECT] = 100;

        let mut buf = [0u8; crate::layout::BSIZE];
        din.encode_into(&mut buf);
        assert_eq!(DiskInode::decode_from(&buf), din);
    }

    #[test]
    fn unknown_type_decodes_as_free() {
        let mut buf = [0u8; DiskInode::ENCODED_LEN];
        enc16(99, &mut buf[0..2]);
        let din = DiskInode::decode_from(&buf);
        assert_eq!(din.r#type, InodeType::Free);
    }
}
