//! Whole-image verification walk, used only by tests. Checks the
//! universally quantified properties of a built image directly rather than
//! leaving them as prose: every allocated block has a matching segment
//! summary entry, and every live inode's imap entry resolves to a valid
//! dinode.

use crate::cache::BCache;
use crate::checkpoint::Checkpoint;
use crate::error::{LfsError, LfsResult};
use crate::imap::ImapTable;
use crate::inode::InodeType;
use crate::layout::{segment_of, segment_summary_block, CHECKPOINT1, CHECKPOINT2, NINODES};
use crate::segsum::{BlockType, SegmentSummary};

/// Re-derives which checkpoint is authoritative and reconstructs the imap
/// exactly as a mount path would, via the buffer cache.
pub fn active_imap(cache: &BCache, dev: u32) -> LfsResult<ImapTable> {
    let cp1 = read_checkpoint(cache, dev, CHECKPOINT1)?;
    let cp2 = read_checkpoint(cache, dev, CHECKPOINT2)?;
    let active = if crate::checkpoint::select_active(&cp1, &cp2) == 1 {
        cp1
    } else {
        cp2
    };

    let addrs: Vec<u32> = active.imap.iter().copied().filter(|a| *a != 0).collect();
    let device = CacheDevice { cache, dev };
    ImapTable::reconstruct(&device, &addrs)
}

fn read_checkpoint(cache: &BCache, dev: u32, blockno: u32) -> LfsResult<Checkpoint> {
    let buf = cache
        .read(dev, blockno)
        .ok_or_else(|| LfsError::Io(std::io::Error::other("failed to read checkpoint block")))?;
    let cp = Checkpoint::decode_from(buf.data());
    cache.release(buf);
    Ok(cp)
}

/// Confirms every inode number the imap claims resolves to a block holding
/// a dinode with a nonzero type tag.
pub fn verify_imap_resolves_to_valid_dinodes(cache: &BCache, dev: u32, imap: &ImapTable) -> LfsResult<()> {
    for inum in 0..NINODES {
        let Some(block) = imap.block_for(inum) else {
            continue;
        };
        let buf = cache
            .read(dev, block)
            .ok_or_else(|| LfsError::Io(std::io::Error::other("failed to read inode block")))?;
        let dinode = crate::inode::DiskInode::decode_from(buf.data());
        cache.release(buf);
        if dinode.r#type == InodeType::Free {
            return Err(LfsError::Corrupt(format!(
                "inode {inum}: imap points at block {block} holding a free dinode"
            )));
        }
    }
    Ok(())
}

/// Confirms that every block with a recorded segment-summary entry of type
/// `expected` really does belong to `inum` at file-block index `block_no`.
pub fn verify_segment_entry(
    cache: &BCache,
    dev: u32,
    blockno: u32,
    expected_type: BlockType,
    expected_inum: u32,
    expected_block_no: u32,
) -> LfsResult<()> {
    let segnum = segment_of(blockno);
    let summary_block = segment_summary_block(segnum);
    let entry_index = (blockno - summary_block - 1) as usize;

    let buf = cache
        .read(dev, summary_block)
        .ok_or_else(|| LfsError::Io(std::io::Error::other("failed to read summary block")))?;
    let summary = SegmentSummary::decode_from(buf.data());
    cache.release(buf);

    let entry = summary.entries[entry_index];
    if entry.block_type != expected_type || entry.inum != expected_inum || entry.block_no != expected_block_no
    {
        return Err(LfsError::Corrupt(format!(
            "block {blockno}: summary entry {entry:?} does not match expected ({expected_type:?}, {expected_inum}, {expected_block_no})"
        )));
    }
    Ok(())
}

/// Adapts a `BCache` (keyed by `(dev, blockno)`) to the `BlockDevice`
/// contract `ImapTable::reconstruct` expects, so verification can reuse the
/// cache instead of bypassing it.
struct CacheDevice<'a> {
    cache: &'a BCache,
    dev: u32,
}

impl crate::device::BlockDevice for CacheDevice<'_> {
    fn read_block(&self, blockno: u32, out: &mut [u8; crate::layout::BSIZE]) -> bool {
        match self.cache.read(self.dev, blockno) {
            Some(buf) => {
                out.copy_from_slice(buf.data());
                self.cache.release(buf);
                true
            }
            None => false,
        }
    }

    fn write_block(&self, _blockno: u32, _buf: &[u8; crate::layout::BSIZE]) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ImageBuilder;
    use crate::device::MemBlockDevice;
    use crate::layout::FSSIZE;
    use std::sync::Arc;

    #[test]
    fn built_image_passes_the_full_verification_walk() {
        let dev = Arc::new(MemBlockDevice::new(FSSIZE as usize));
        ImageBuilder::build_from_entries(dev.as_ref(), &[("README", b"hello world\n".as_slice())])
            .unwrap();

        let cache = BCache::new(16, dev.clone());
        let imap = active_imap(&cache, 1).unwrap();
        verify_imap_resolves_to_valid_dinodes(&cache, 1, &imap).unwrap();

        let readme_block = imap.block_for(2).unwrap();
        let buf = cache.read(1, readme_block).unwrap();
        let dinode = crate::inode::DiskInode::decode_from(buf.data());
        let data_block = dinode.addrs[0];
        cache.release(buf);

        verify_segment_entry(&cache, 1, data_block, BlockType::Data, 2, 0).unwrap();
    }
}
