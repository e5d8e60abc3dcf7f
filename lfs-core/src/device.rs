//! The block device contract consumed by the buffer cache and the builder.
//!
//! The real kernel driver (virtio-style) is out of scope here; only its
//! `read_block`/`write_block` contract is consumed. This module provides
//! the two implementors this crate actually needs: a file-backed device for
//! the builder (and for reading built images back in tests) and an
//! in-memory device for buffer-cache unit tests that shouldn't touch the
//! filesystem.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::sync::Mutex;

use crate::layout::BSIZE;

/// Synchronous, blocking block I/O over fixed-size `BSIZE` blocks.
///
/// Both methods are blocking. On failure, `read_block` must leave `buf`
/// untouched and `write_block` must not report a partial write as success.
pub trait BlockDevice: Send + Sync {
    fn read_block(&self, blockno: u32, buf: &mut [u8; BSIZE]) -> bool;
    fn write_block(&self, blockno: u32, buf: &[u8; BSIZE]) -> bool;
}

/// A block device backed by a single host file, one `BSIZE` block per slot.
pub struct FileBlockDevice {
    file: File,
}

impl FileBlockDevice {
    pub fn create(path: &std::path::Path) -> io::Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self { file })
    }

    pub fn open(path: &std::path::Path) -> io::Result<Self> {
        let file = File::options().read(true).write(true).open(path)?;
        Ok(Self { file })
    }
}

impl BlockDevice for FileBlockDevice {
    fn read_block(&self, blockno: u32, buf: &mut [u8; BSIZE]) -> bool {
        self.file
            .read_exact_at(buf, blockno as u64 * BSIZE as u64)
            .is_ok()
    }

    fn write_block(&self, blockno: u32, buf: &[u8; BSIZE]) -> bool {
        self.file
            .write_all_at(buf, blockno as u64 * BSIZE as u64)
            .is_ok()
    }
}

/// An in-memory block device, for buffer-cache tests that shouldn't depend
/// on the filesystem. Can be told to fail every Nth operation to exercise
/// the cache's failure-propagation paths.
pub struct MemBlockDevice {
    blocks: Mutex<Vec<[u8; BSIZE]>>,
    fail_reads: std::sync::atomic::AtomicBool,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl MemBlockDevice {
    pub fn new(nblocks: usize) -> Self {
        Self {
            blocks: Mutex::new(vec![[0u8; BSIZE]; nblocks]),
            fail_reads: std::sync::atomic::AtomicBool::new(false),
            fail_writes: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

impl BlockDevice for MemBlockDevice {
    fn read_block(&self, blockno: u32, buf: &mut [u8; BSIZE]) -> bool {
        if self.fail_reads.load(std::sync::atomic::Ordering::SeqCst) {
            return false;
        }
        let blocks = self.blocks.lock().unwrap();
        match blocks.get(blockno as usize) {
            Some(block) => {
                buf.copy_from_slice(block);
                true
            }
            None => false,
        }
    }

    fn write_block(&self, blockno: u32, buf: &[u8; BSIZE]) -> bool {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return false;
        }
        let mut blocks = self.blocks.lock().unwrap();
        match blocks.get_mut(blockno as usize) {
            Some(block) => {
                block.copy_from_slice(buf);
                true
            }
            None => false,
        }
    }
}
