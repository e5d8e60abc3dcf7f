//! The inode map (imap): a persistent mapping from inode number to the
//! current on-disk block that holds that inode.
//!
//! `IBLOCK(i, imp)`-style lookup (see the design notes) has two code paths
//! that must agree: at build time `imp[]` lives in memory in the builder; at
//! mount time it is reconstructed by reading the active checkpoint's imap
//! block addresses and then each imap block. `ImapTable` is the single
//! abstraction both paths use.

use crate::codec::{dec32, enc32};
use crate::device::BlockDevice;
use crate::error::{LfsError, LfsResult};
use crate::layout::{BSIZE, NENTRY, NINODES};

/// In-memory mirror of the imap: inode number -> block number holding that
/// inode (0 means unallocated).
#[derive(Debug, Clone)]
pub struct ImapTable {
    blocks: Vec<u32>,
}

impl ImapTable {
    pub fn new() -> Self {
        Self {
            blocks: vec![0u32; NINODES as usize],
        }
    }

    pub fn set(&mut self, inum: u32, blockno: u32) {
        self.blocks[inum as usize] = blockno;
    }

    pub fn block_for(&self, inum: u32) -> Option<u32> {
        self.blocks.get(inum as usize).copied().filter(|b| *b != 0)
    }

    /// Splits the table into `NENTRY`-sized chunks, in imap-block order.
    pub fn chunks(&self) -> impl Iterator<Item = &[u32]> {
        self.blocks.chunks(NENTRY as usize)
    }

    pub fn encode_chunk(chunk: &[u32], buf: &mut [u8; BSIZE]) {
        for (i, entry) in chunk.iter().enumerate() {
            let off = i * 4;
            enc32(*entry, &mut buf[off..off + 4]);
        }
    }

    pub fn decode_chunk(buf: &[u8; BSIZE]) -> Vec<u32> {
        (0..NENTRY as usize).map(|i| dec32(&buf[i * 4..i * 4 + 4])).collect()
    }

    /// Reconstructs the table by reading the imap block addresses in
    /// `imap_block_addrs` (as stored in a checkpoint) and decoding each one
    /// through `dev`. This is the mount-time path.
    pub fn reconstruct(dev: &dyn BlockDevice, imap_block_addrs: &[u32]) -> LfsResult<Self> {
        let mut table = Self::new();
        let mut inum = 0u32;

        for &addr in imap_block_addrs {
            let mut buf = [0u8; BSIZE];
            if !dev.read_block(addr, &mut buf) {
                return Err(LfsError::Io(std::io::Error::other(format!(
                    "failed to read imap block {addr}"
                ))));
            }
            for entry in Self::decode_chunk(&buf) {
                if inum >= NINODES {
                    break;
                }
                table.set(inum, entry);
                inum += 1;
            }
        }

        Ok(table)
    }
}

impl Default for ImapTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemBlockDevice;

    #[test]
    fn set_and_lookup() {
        let mut table = ImapTable::new();
        assert_eq!(table.block_for(1), None);
        table.set(1, 42);
        assert_eq!(table.block_for(1), Some(42));
    }

    #[test]
    fn chunking_matches_nentry() {
        let table = ImapTable::new();
        let chunks: Vec<_> = table.chunks().collect();
        assert_eq!(chunks.len(), 1); // NINODES=200 fits in one NENTRY=256 chunk
        assert_eq!(chunks[0].len(), 200);
    }

    #[test]
    fn reconstruct_matches_build_time_table() {
        let dev = MemBlockDevice::new(8);
        let mut table = ImapTable::new();
        table.set(1, 10);
        table.set(2, 11);

        let mut block_addrs = Vec::new();
        for (i, chunk) in table.chunks().enumerate() {
            let mut buf = [0u8; BSIZE];
            ImapTable::encode_chunk(chunk, &mut buf);
            let addr = 4 + i as u32;
            dev.write_block(addr, &buf);
            block_addrs.push(addr);
        }

        let reconstructed = ImapTable::reconstruct(&dev, &block_addrs).unwrap();
        assert_eq!(reconstructed.block_for(1), Some(10));
        assert_eq!(reconstructed.block_for(2), Some(11));
        assert_eq!(reconstructed.block_for(3), None);
    }
}
