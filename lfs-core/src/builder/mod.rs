//! The offline image builder: ties the block allocator, inode allocator,
//! file appender, and checkpoint writer into the `mklfs` build procedure.

pub mod alloc;
pub mod append;
pub mod checkpoint_writer;
pub mod verify;

use std::path::Path;

use crate::device::{BlockDevice, FileBlockDevice};
use crate::dirent::DirEntry;
use crate::error::{LfsError, LfsResult};
use crate::imap::ImapTable;
use crate::inode::{DiskInode, InodeType};
use crate::layout::{BSIZE, DIRSIZ, FSSIZE, ROOTINO};

use self::alloc::{BlockAllocator, InodeAllocator};

/// Result of a completed build, carrying the two summary figures `mklfs`
/// prints to stdout.
pub struct BuildSummary {
    pub total_blocks: u32,
    pub blocks_allocated: u32,
    pub imap: ImapTable,
}

/// Owns every piece of single-writer state the builder touches during one
/// run: the two bump allocators and the in-memory imap. Kept as one value
/// threaded through the procedure rather than module-level statics.
pub struct ImageBuilder {
    balloc: BlockAllocator,
    ialloc: InodeAllocator,
    imap: ImapTable,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self {
            balloc: BlockAllocator::new(),
            ialloc: InodeAllocator::new(),
            imap: ImapTable::new(),
        }
    }

    /// Builds a fresh image at `image_path` containing `input_paths`.
    pub fn build(image_path: &Path, input_paths: &[impl AsRef<Path>]) -> LfsResult<BuildSummary> {
        let device = FileBlockDevice::create(image_path)?;
        let mut builder = Self::new();
        builder.run(&device, input_paths)
    }

    /// Builds from `(name, contents)` pairs directly, skipping host path
    /// normalization entirely. `name` is used as-is (still truncated to
    /// `DIRSIZ`). Useful for embedding generated or in-memory content, and
    /// for tests that want to exercise the allocator/appender/checkpoint
    /// pipeline without staging real files on disk.
    pub fn build_from_entries(
        device: &dyn BlockDevice,
        entries: &[(&str, &[u8])],
    ) -> LfsResult<BuildSummary> {
        let mut builder = Self::new();
        builder.run_with(device, entries.iter().map(|(name, contents)| {
            let truncated: String = name.chars().take(DIRSIZ).collect();
            Ok((truncated, contents.to_vec()))
        }))
    }

    fn run(
        &mut self,
        device: &dyn BlockDevice,
        input_paths: &[impl AsRef<Path>],
    ) -> LfsResult<BuildSummary> {
        self.run_with(
            device,
            input_paths.iter().map(|path| {
                let path = path.as_ref();
                let name = normalize_entry_name(path)?;
                let contents = std::fs::read(path)?;
                Ok((name, contents))
            }),
        )
    }

    /// Shared build procedure: `entries` yields the already-normalized
    /// on-disk name and raw bytes for each input, in CLI argument order.
    fn run_with(
        &mut self,
        device: &dyn BlockDevice,
        entries: impl Iterator<Item = LfsResult<(String, Vec<u8>)>>,
    ) -> LfsResult<BuildSummary> {
        zero_fill(device)?;

        let sb = crate::layout::SuperBlock::new();
        let mut sb_buf = [0u8; BSIZE];
        sb.encode_into(&mut sb_buf);
        write_block(device, 1, &sb_buf)?;

        let rootino = self
            .ialloc
            .alloc(device, &mut self.balloc, &mut self.imap, InodeType::Directory)?;
        if rootino != ROOTINO {
            return Err(LfsError::Corrupt(format!(
                "root inode allocated as {rootino}, expected {ROOTINO}"
            )));
        }

        self.append_dirent(device, rootino, rootino as u16, ".")?;
        self.append_dirent(device, rootino, rootino as u16, "..")?;

        for entry in entries {
            let (name, contents) = entry?;
            self.add_file(device, rootino, &name, &contents)?;
        }

        self.round_up_directory_size(device, rootino)?;

        let imap_addrs = checkpoint_writer::write_imap(device, &mut self.balloc, &self.imap)?;
        checkpoint_writer::write_checkpoint(device, 1, &imap_addrs, &self.balloc, 1)?;
        checkpoint_writer::write_checkpoint(device, 2, &imap_addrs, &self.balloc, 0)?;

        Ok(BuildSummary {
            total_blocks: FSSIZE,
            blocks_allocated: self.balloc.freeblock(),
            imap: self.imap.clone(),
        })
    }

    fn add_file(
        &mut self,
        device: &dyn BlockDevice,
        rootino: u32,
        name: &str,
        contents: &[u8],
    ) -> LfsResult<()> {
        let inum = self
            .ialloc
            .alloc(device, &mut self.balloc, &mut self.imap, InodeType::File)?;
        self.append_dirent(device, rootino, inum as u16, name)?;

        for chunk in contents.chunks(BSIZE) {
            append::append(device, &mut self.balloc, &mut self.imap, inum, chunk)?;
        }

        Ok(())
    }

    fn append_dirent(
        &mut self,
        device: &dyn BlockDevice,
        dir_inum: u32,
        target_inum: u16,
        name: &str,
    ) -> LfsResult<()> {
        let entry = DirEntry::new(target_inum, name);
        let mut buf = [0u8; DirEntry::ENCODED_LEN];
        entry.encode_into(&mut buf);
        append::append(device, &mut self.balloc, &mut self.imap, dir_inum, &buf)
    }

    /// Pads the root directory's recorded size up to the next `BSIZE`
    /// multiple without touching its block tree, so directory readers can
    /// always scan a whole trailing block.
    fn round_up_directory_size(&mut self, device: &dyn BlockDevice, inum: u32) -> LfsResult<()> {
        let block = self
            .imap
            .block_for(inum)
            .ok_or_else(|| LfsError::Corrupt("root inode missing from imap".to_string()))?;

        let mut buf = [0u8; BSIZE];
        if !device.read_block(block, &mut buf) {
            return Err(LfsError::Io(std::io::Error::other(
                "failed to read root inode block",
            )));
        }
        let mut dinode = DiskInode::decode_from(&buf);
        let rounded = dinode.size.div_ceil(BSIZE as u32) * BSIZE as u32;
        dinode.size = rounded;
        dinode.encode_into(&mut buf);
        if !device.write_block(block, &buf) {
            return Err(LfsError::Io(std::io::Error::other(
                "failed to write root inode block",
            )));
        }
        Ok(())
    }
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Zero-fills every block of a freshly truncated image.
fn zero_fill(device: &dyn BlockDevice) -> LfsResult<()> {
    let zero = [0u8; BSIZE];
    for blockno in 0..FSSIZE {
        if !device.write_block(blockno, &zero) {
            return Err(LfsError::Io(std::io::Error::other(format!(
                "failed to zero-fill block {blockno}"
            ))));
        }
    }
    Ok(())
}

fn write_block(device: &dyn BlockDevice, blockno: u32, buf: &[u8; BSIZE]) -> LfsResult<()> {
    if !device.write_block(blockno, buf) {
        return Err(LfsError::Io(std::io::Error::other(format!(
            "failed to write block {blockno}"
        ))));
    }
    Ok(())
}

/// Derives the on-disk directory-entry name for an input path: strips a
/// leading `user/` path component, strips a leading `_` from the basename,
/// rejects any remaining `/`, and truncates to `DIRSIZ`.
fn normalize_entry_name(path: &Path) -> LfsResult<String> {
    let path_str = path.to_str().ok_or_else(|| {
        LfsError::InvalidArgument(format!("{}: not valid UTF-8", path.display()))
    })?;

    let stripped = path_str.strip_prefix("user/").unwrap_or(path_str);

    if stripped.contains('/') {
        return Err(LfsError::InvalidArgument(format!(
            "{stripped}: '/' not allowed in on-disk file name"
        )));
    }

    let name = stripped.strip_prefix('_').unwrap_or(stripped);
    if name.is_empty() {
        return Err(LfsError::InvalidArgument(format!(
            "{path_str}: empty file name"
        )));
    }

    Ok(name.chars().take(DIRSIZ).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemBlockDevice;

    #[test]
    fn strips_user_prefix_and_underscore() {
        assert_eq!(
            normalize_entry_name(Path::new("user/_README")).unwrap(),
            "README"
        );
        assert_eq!(normalize_entry_name(Path::new("cat")).unwrap(), "cat");
    }

    #[test]
    fn truncates_to_dirsiz() {
        let name = normalize_entry_name(Path::new("this-name-is-way-too-long")).unwrap();
        assert_eq!(name.len(), DIRSIZ);
    }

    #[test]
    fn rejects_embedded_slash_after_stripping_prefix() {
        assert!(normalize_entry_name(Path::new("user/sub/dir")).is_err());
    }

    #[test]
    fn single_small_file_matches_scenario_one() {
        let mut builder = ImageBuilder::new();
        let dev = MemBlockDevice::new(FSSIZE as usize);
        let summary = builder
            .run_with(
                &dev,
                std::iter::once(Ok(("README".to_string(), b"hello world\n".to_vec()))),
            )
            .unwrap();
        assert!(summary.blocks_allocated > 0);

        let inum = 2u32;
        let block = builder.imap.block_for(inum).unwrap();
        let mut buf = [0u8; BSIZE];
        dev.read_block(block, &mut buf);
        let dinode = DiskInode::decode_from(&buf);
        assert_eq!(dinode.r#type, InodeType::File);
        assert_eq!(dinode.size, 12);

        let mut data_buf = [0u8; BSIZE];
        dev.read_block(dinode.addrs[0], &mut data_buf);
        assert_eq!(&data_buf[0..12], b"hello world\n");

        let root_block = builder.imap.block_for(ROOTINO).unwrap();
        dev.read_block(root_block, &mut buf);
        let root_dinode = DiskInode::decode_from(&buf);
        let mut root_data = [0u8; BSIZE];
        dev.read_block(root_dinode.addrs[0], &mut root_data);

        let dot = DirEntry::decode_from(&root_data[0..DirEntry::ENCODED_LEN]);
        let dotdot =
            DirEntry::decode_from(&root_data[DirEntry::ENCODED_LEN..2 * DirEntry::ENCODED_LEN]);
        let readme =
            DirEntry::decode_from(&root_data[2 * DirEntry::ENCODED_LEN..3 * DirEntry::ENCODED_LEN]);
        assert_eq!(dot.name_str(), ".");
        assert_eq!(dotdot.name_str(), "..");
        assert_eq!(readme.name_str(), "README");
        assert_eq!(readme.inum, 2);
    }
}
