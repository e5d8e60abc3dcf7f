//! `wimap`/`wchkpt`: flushing the in-memory imap and segment usage state to
//! their on-disk home at the end of a build.

use crate::builder::alloc::BlockAllocator;
use crate::checkpoint::Checkpoint;
use crate::device::BlockDevice;
use crate::error::{LfsError, LfsResult};
use crate::imap::ImapTable;
use crate::layout::{BSIZE, CHECKPOINT1, CHECKPOINT2, NINODEMAP};
use crate::segsum::BlockType;

/// Writes every `NENTRY`-sized chunk of `imap` out as its own block, via
/// `balloc`, and returns the block addresses in imap order.
pub fn write_imap(
    device: &dyn BlockDevice,
    balloc: &mut BlockAllocator,
    imap: &ImapTable,
) -> LfsResult<Vec<u32>> {
    let mut addrs = Vec::with_capacity(NINODEMAP as usize);

    for (i, chunk) in imap.chunks().enumerate() {
        let mut buf = [0u8; BSIZE];
        ImapTable::encode_chunk(chunk, &mut buf);
        let block = balloc.alloc(device, BlockType::Imap, 0, i as u32)?;
        if !device.write_block(block, &buf) {
            return Err(LfsError::Io(std::io::Error::other(format!(
                "failed to write imap block {block}"
            ))));
        }
        addrs.push(block);
    }

    Ok(addrs)
}

/// Writes checkpoint block `n` (1 or 2). `n == 1` carries the real,
/// fully-populated checkpoint; `n == 2` is written all-zero, matching
/// spec.md's choice of a freshly built image always selecting checkpoint 1
/// (its timestamp, 1, beats checkpoint 2's implicit 0).
pub fn write_checkpoint(
    device: &dyn BlockDevice,
    n: u8,
    imap_addrs: &[u32],
    balloc: &BlockAllocator,
    timestamp: u32,
) -> LfsResult<()> {
    let block = match n {
        1 => CHECKPOINT1,
        2 => CHECKPOINT2,
        _ => {
            return Err(LfsError::InvalidArgument(format!(
                "wchkpt: checkpoint number must be 1 or 2, got {n}"
            )))
        }
    };

    let mut buf = [0u8; BSIZE];
    if n == 1 {
        let mut cp = Checkpoint::empty();
        for (i, addr) in imap_addrs.iter().enumerate() {
            cp.imap[i] = *addr;
        }
        cp.segtable = balloc.segtable().to_vec();
        cp.timestamp = timestamp;
        cp.encode_into(&mut buf);
    }

    if !device.write_block(block, &buf) {
        return Err(LfsError::Io(std::io::Error::other(format!(
            "failed to write checkpoint block {block}"
        ))));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemBlockDevice;
    use crate::layout::FSSIZE;

    #[test]
    fn write_imap_then_checkpoint_round_trips() {
        let dev = MemBlockDevice::new(FSSIZE as usize);
        let mut balloc = BlockAllocator::new();
        let mut imap = ImapTable::new();
        imap.set(1, 42);
        imap.set(2, 43);

        let addrs = write_imap(&dev, &mut balloc, &imap).unwrap();
        assert_eq!(addrs.len(), 1);

        write_checkpoint(&dev, 1, &addrs, &balloc, 1).unwrap();
        write_checkpoint(&dev, 2, &addrs, &balloc, 0).unwrap();

        let mut buf = [0u8; BSIZE];
        dev.read_block(CHECKPOINT1, &mut buf);
        let cp1 = Checkpoint::decode_from(&buf);
        assert_eq!(cp1.imap[0], addrs[0]);
        assert_eq!(cp1.timestamp, 1);

        dev.read_block(CHECKPOINT2, &mut buf);
        let cp2 = Checkpoint::decode_from(&buf);
        assert_eq!(cp2.timestamp, 0);

        assert_eq!(crate::checkpoint::select_active(&cp1, &cp2), 1);

        let reconstructed = ImapTable::reconstruct(&dev, &cp1.imap).unwrap();
        assert_eq!(reconstructed.block_for(1), Some(42));
        assert_eq!(reconstructed.block_for(2), Some(43));
    }

    #[test]
    fn rejects_unknown_checkpoint_number() {
        let dev = MemBlockDevice::new(FSSIZE as usize);
        let balloc = BlockAllocator::new();
        assert!(matches!(
            write_checkpoint(&dev, 3, &[], &balloc, 0),
            Err(LfsError::InvalidArgument(_))
        ));
    }
}
