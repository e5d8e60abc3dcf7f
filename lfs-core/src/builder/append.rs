//! `iappend`: growing a file or directory's block tree one write at a time.
//!
//! Mirrors the teacher's `fs.rs` inode-growth shape (direct addresses, then
//! one level of indirection) but against the segment-aware allocator instead
//! of a bitmap, and reading/writing the dinode through `DiskInode::encode_into`/
//! `decode_from` instead of struct punning.

use crate::builder::alloc::BlockAllocator;
use crate::codec::{dec32, enc32};
use crate::device::BlockDevice;
use crate::error::{LfsError, LfsResult};
use crate::imap::ImapTable;
use crate::inode::DiskInode;
use crate::layout::{BSIZE, MAXFILE, NDIRECT};
use crate::segsum::BlockType;

/// Appends `data` to inode `inum`'s current contents, starting at its
/// current `size`. Allocates direct and, once exhausted, single-indirect
/// blocks as needed, then persists the updated dinode.
pub fn append(
    device: &dyn BlockDevice,
    balloc: &mut BlockAllocator,
    imap: &mut ImapTable,
    inum: u32,
    data: &[u8],
) -> LfsResult<()> {
    let inode_block = imap.block_for(inum).ok_or_else(|| {
        LfsError::Corrupt(format!("iappend: inode {inum} has no imap entry"))
    })?;

    let mut inode_buf = [0u8; BSIZE];
    if !device.read_block(inode_block, &mut inode_buf) {
        return Err(LfsError::Io(std::io::Error::other(format!(
            "failed to read inode block {inode_block}"
        ))));
    }
    let mut dinode = DiskInode::decode_from(&inode_buf);

    let mut offset = dinode.size;
    let mut remaining = data;

    while !remaining.is_empty() {
        let fbn = (offset as usize) / BSIZE;
        if fbn >= MAXFILE {
            return Err(LfsError::InvalidArgument(format!(
                "iappend: file grew past MAXFILE={MAXFILE} blocks"
            )));
        }

        let block_off = (offset as usize) % BSIZE;
        let n = remaining.len().min(BSIZE - block_off);

        let target_block = if fbn < NDIRECT {
            if dinode.addrs[fbn] == 0 {
                dinode.addrs[fbn] = balloc.alloc(device, BlockType::Data, inum, fbn as u32)?;
            }
            dinode.addrs[fbn]
        } else {
            let indirect_index = fbn - NDIRECT;
            if dinode.addrs[NDIRECT] == 0 {
                dinode.addrs[NDIRECT] = balloc.alloc(device, BlockType::Indirect, inum, 0)?;
                let zeroed = [0u8; BSIZE];
                if !device.write_block(dinode.addrs[NDIRECT], &zeroed) {
                    return Err(LfsError::Io(std::io::Error::other(
                        "failed to zero-initialize indirect block",
                    )));
                }
            }

            let indirect_block = dinode.addrs[NDIRECT];
            let mut indirect_buf = [0u8; BSIZE];
            if !device.read_block(indirect_block, &mut indirect_buf) {
                return Err(LfsError::Io(std::io::Error::other(format!(
                    "failed to read indirect block {indirect_block}"
                ))));
            }

            let entry_off = indirect_index * 4;
            let mut addr = dec32(&indirect_buf[entry_off..entry_off + 4]);
            if addr == 0 {
                addr = balloc.alloc(device, BlockType::Data, inum, fbn as u32)?;
                enc32(addr, &mut indirect_buf[entry_off..entry_off + 4]);
                if !device.write_block(indirect_block, &indirect_buf) {
                    return Err(LfsError::Io(std::io::Error::other(format!(
                        "failed to write indirect block {indirect_block}"
                    ))));
                }
            }
            addr
        };

        let mut data_buf = [0u8; BSIZE];
        if block_off != 0 && !device.read_block(target_block, &mut data_buf) {
            return Err(LfsError::Io(std::io::Error::other(format!(
                "failed to read data block {target_block}"
            ))));
        }
        data_buf[block_off..block_off + n].copy_from_slice(&remaining[..n]);
        if !device.write_block(target_block, &data_buf) {
            return Err(LfsError::Io(std::io::Error::other(format!(
                "failed to write data block {target_block}"
            ))));
        }

        offset += n as u32;
        remaining = &remaining[n..];
    }

    dinode.size = offset;
    dinode.encode_into(&mut inode_buf);
    if !device.write_block(inode_block, &inode_buf) {
        return Err(LfsError::Io(std::io::Error::other(format!(
            "failed to write inode block {inode_block}"
        ))));
    }

    Ok(())
}
