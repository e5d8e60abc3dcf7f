//! The buffer cache: a fixed-capacity, LRU-ordered set of block buffers
//! mediating all I/O to a `BlockDevice`.
//!
//! Shape is the teacher's (`kernel/src/buf.rs`): buffer metadata
//! (`dev`, `block_no`, `valid`, `ref_count`, LRU links) lives in one array
//! guarded by a single cache-wide lock; each buffer's payload is guarded by
//! its own exclusive lock so concurrent I/O on different buffers doesn't
//! serialize through the cache lock. The LRU list is intrusive - a doubly
//! linked list threaded through `prev`/`next` indices with a dedicated
//! sentinel slot at index 0, rather than owned nodes, to sidestep cyclic
//! ownership (see the design notes on array-plus-indices lists).
//!
//! `ref_count`, `dev`, `block_no`, `valid` and the list links are only ever
//! read or written while the cache lock is held - never from inside the
//! per-buffer lock alone, and never across a device I/O call.

use std::sync::{Arc, Mutex};

use crate::device::BlockDevice;
use crate::layout::BSIZE;
use crate::sleeplock::{SleepLock, SleepLockGuard};

#[derive(Debug, Clone, Copy)]
struct BufMeta {
    dev: u32,
    block_no: u32,
    valid: bool,
    ref_count: u32,
    prev: usize,
    next: usize,
}

impl BufMeta {
    const fn sentinel() -> Self {
        Self {
            dev: 0,
            block_no: 0,
            valid: false,
            ref_count: 0,
            prev: 0,
            next: 0,
        }
    }
}

struct BufData {
    data: [u8; BSIZE],
}

struct CacheInner {
    /// `meta[0]` is the sentinel head; real buffers are `meta[1..=capacity]`.
    meta: Vec<BufMeta>,
}

/// A pinned, exclusively-locked buffer. Holds the slot's payload lock for
/// its entire lifetime; dropping it without calling `BCache::release` would
/// leak the pin (matching spec.md's "no automatic reclaim of buffers whose
/// holder died without releasing").
pub struct Buf<'a> {
    id: usize,
    dev: u32,
    blockno: u32,
    guard: SleepLockGuard<'a, BufData>,
}

impl Buf<'_> {
    pub fn dev(&self) -> u32 {
        self.dev
    }

    pub fn blockno(&self) -> u32 {
        self.blockno
    }

    pub fn data(&self) -> &[u8; BSIZE] {
        &self.guard.data
    }

    pub fn data_mut(&mut self) -> &mut [u8; BSIZE] {
        &mut self.guard.data
    }
}

pub struct BCache {
    inner: Mutex<CacheInner>,
    bufs: Vec<SleepLock<BufData>>,
    device: Arc<dyn BlockDevice>,
}

impl BCache {
    /// Builds a cache with `capacity` buffers backed by `device`.
    pub fn new(capacity: usize, device: Arc<dyn BlockDevice>) -> Self {
        assert!(capacity > 0, "buffer cache needs at least one buffer");

        let mut meta = vec![BufMeta::sentinel(); capacity + 1];
        // circular doubly-linked list: head(0) -> 1 -> 2 -> ... -> capacity -> head(0)
        for i in 0..=capacity {
            meta[i].prev = if i == 0 { capacity } else { i - 1 };
            meta[i].next = if i == capacity { 0 } else { i + 1 };
        }

        let bufs = (0..=capacity)
            .map(|_| SleepLock::new(BufData { data: [0u8; BSIZE] }))
            .collect();

        Self {
            inner: Mutex::new(CacheInner { meta }),
            bufs,
            device,
        }
    }

    pub fn capacity(&self) -> usize {
        self.bufs.len() - 1
    }

    /// Looks through the cache for block `(dev, blockno)`. If not found,
    /// recycles the least-recently-used buffer with `ref_count == 0`.
    /// Returns `None` if every buffer is pinned.
    fn get(&self, dev: u32, blockno: u32) -> Option<Buf<'_>> {
        let mut inner = self.inner.lock().unwrap();

        for i in 1..inner.meta.len() {
            if inner.meta[i].dev == dev && inner.meta[i].block_no == blockno {
                inner.meta[i].ref_count += 1;
                drop(inner);
                let guard = self.bufs[i].lock();
                return Some(Buf { id: i, dev, blockno, guard });
            }
        }

        // not cached: recycle starting from the LRU (tail) end
        let head = 0;
        let mut i = inner.meta[head].prev;
        while i != head {
            if inner.meta[i].ref_count == 0 {
                inner.meta[i].dev = dev;
                inner.meta[i].block_no = blockno;
                inner.meta[i].valid = false;
                inner.meta[i].ref_count = 1;
                drop(inner);
                let guard = self.bufs[i].lock();
                return Some(Buf { id: i, dev, blockno, guard });
            }
            i = inner.meta[i].prev;
        }

        None
    }

    /// Returns a pinned, exclusively-locked buffer with valid contents of
    /// block `(dev, blockno)`, or `None` if the cache is exhausted or the
    /// device read failed.
    pub fn read(&self, dev: u32, blockno: u32) -> Option<Buf<'_>> {
        let mut buf = self.get(dev, blockno)?;

        let valid = self.inner.lock().unwrap().meta[buf.id].valid;
        if !valid {
            if !self.device.read_block(blockno, &mut buf.guard.data) {
                self.release(buf);
                return None;
            }
            self.inner.lock().unwrap().meta[buf.id].valid = true;
        }

        Some(buf)
    }

    /// Forces `buf`'s contents to the device. The caller must already hold
    /// `buf` exclusively locked, which is guaranteed by `&mut Buf` only
    /// being constructible from a live guard returned by `read`/`get`.
    pub fn write(&self, buf: &mut Buf<'_>) -> bool {
        self.device.write_block(buf.blockno, &buf.guard.data)
    }

    /// Releases a locked buffer. If this was the last reference, moves it
    /// to the MRU position (`head.next`); LRU position is otherwise left
    /// untouched so concurrent holders don't churn the list.
    pub fn release(&self, buf: Buf<'_>) {
        let id = buf.id;
        drop(buf);

        let mut inner = self.inner.lock().unwrap();
        inner.meta[id].ref_count -= 1;

        if inner.meta[id].ref_count == 0 {
            let prev = inner.meta[id].prev;
            let next = inner.meta[id].next;
            inner.meta[next].prev = prev;
            inner.meta[prev].next = next;

            let head = 0;
            let first = inner.meta[head].next;
            inner.meta[id].next = first;
            inner.meta[id].prev = head;
            inner.meta[first].prev = id;
            inner.meta[head].next = id;
        }
    }

    /// Current reference count for whichever block is cached in `buf`'s
    /// slot. Exposed for tests asserting refcnt discipline.
    pub fn ref_count_of(&self, buf: &Buf<'_>) -> u32 {
        self.inner.lock().unwrap().meta[buf.id].ref_count
    }

    /// `(dev, blockno)` cached at the current LRU position.
    pub fn lru_key(&self) -> (u32, u32) {
        let inner = self.inner.lock().unwrap();
        let slot = inner.meta[0].prev;
        (inner.meta[slot].dev, inner.meta[slot].block_no)
    }
}

static_assertions::assert_impl_all!(BCache: Send, Sync);
