//! The builder-side block and inode allocators.
//!
//! Both are simple bump allocators with single-writer state, modeled as
//! owned values threaded through the build procedure rather than as global
//! mutable statics (see the design notes on the teacher's global
//! `freeblock`/`freeinode`/`imp[]`).

use crate::checkpoint::mark_segment_used;
use crate::device::BlockDevice;
use crate::error::{LfsError, LfsResult};
use crate::imap::ImapTable;
use crate::inode::{DiskInode, InodeType};
use crate::layout::{segment_of, segment_summary_block, BSIZE, NINODES, NSEG, SEGSIZE, SEGSTART, SEGTABLE_BYTES};
use crate::segsum::{BlockType, SegEntry, SegmentSummary};

/// Segment-aware bump allocator for data-region blocks.
pub struct BlockAllocator {
    freeblock: u32,
    segtable: Vec<u8>,
}

impl BlockAllocator {
    pub fn new() -> Self {
        Self {
            freeblock: SEGSTART,
            segtable: vec![0u8; SEGTABLE_BYTES],
        }
    }

    pub fn freeblock(&self) -> u32 {
        self.freeblock
    }

    pub fn segtable(&self) -> &[u8] {
        &self.segtable
    }

    /// Allocates the next block, writing its segment-summary entry before
    /// returning. Fails if the segment region would be exceeded.
    pub fn alloc(
        &mut self,
        device: &dyn BlockDevice,
        block_type: BlockType,
        inum: u32,
        block_no: u32,
    ) -> LfsResult<u32> {
        if (self.freeblock - SEGSTART) % SEGSIZE == 0 {
            self.freeblock += 1;
        }

        let segnum = segment_of(self.freeblock);
        if segnum >= NSEG {
            return Err(LfsError::Exhausted(format!(
                "balloc: would allocate block {} past the last segment (NSEG={})",
                self.freeblock, NSEG
            )));
        }

        let summary_block = segment_summary_block(segnum);
        let entry_index = (self.freeblock - summary_block - 1) as usize;

        let mut buf = [0u8; BSIZE];
        if !device.read_block(summary_block, &mut buf) {
            return Err(LfsError::Io(std::io::Error::other(format!(
                "failed to read segment summary block {summary_block}"
            ))));
        }
        let mut summary = SegmentSummary::decode_from(&buf);
        summary.set(
            entry_index,
            SegEntry {
                block_type,
                inum,
                block_no,
            },
        );
        summary.encode_into(&mut buf);
        if !device.write_block(summary_block, &buf) {
            return Err(LfsError::Io(std::io::Error::other(format!(
                "failed to write segment summary block {summary_block}"
            ))));
        }

        mark_segment_used(&mut self.segtable, segnum);

        let allocated = self.freeblock;
        self.freeblock += 1;
        Ok(allocated)
    }
}

impl Default for BlockAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Bump allocator for inode numbers, backed by the block allocator for the
/// one block every new inode needs.
pub struct InodeAllocator {
    freeinode: u32,
}

impl InodeAllocator {
    pub fn new() -> Self {
        // inode number 0 is reserved
        Self { freeinode: 1 }
    }

    /// Reserves the next inode number, writes a freshly zeroed dinode of
    /// `r#type`, and records its block in `imap`. Fails once every inode
    /// number has been issued.
    pub fn alloc(
        &mut self,
        device: &dyn BlockDevice,
        balloc: &mut BlockAllocator,
        imap: &mut ImapTable,
        r#type: InodeType,
    ) -> LfsResult<u32> {
        if self.freeinode >= NINODES {
            return Err(LfsError::Exhausted(format!(
                "ialloc: out of inodes (NINODES={NINODES})"
            )));
        }

        let inum = self.freeinode;
        self.freeinode += 1;

        let mut din = DiskInode::new(r#type);
        din.nlink = 1;
        din.size = 0;

        let block = balloc.alloc(device, BlockType::Inode, inum, 0)?;
        imap.set(inum, block);

        let mut buf = [0u8; BSIZE];
        din.encode_into(&mut buf);
        if !device.write_block(block, &buf) {
            return Err(LfsError::Io(std::io::Error::other(format!(
                "failed to write inode block {block}"
            ))));
        }

        Ok(inum)
    }
}

impl Default for InodeAllocator {
    fn default() -> Self {
        Self::new()
    }
}
