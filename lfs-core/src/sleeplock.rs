//! A lock that parks the calling thread while waiting, used to guard a
//! single buffer's payload for the entire span between `bread`/`bget` and
//! the matching `brelse`/`bwrite`.
//!
//! The teacher's kernel parks the *process* on a scheduler channel
//! (`src/sleeplock.rs`); there is no scheduler in this crate's scope (see
//! spec.md §1), so the same guard-based shape is rebuilt on top of
//! `std::sync::{Mutex, Condvar}` so real OS threads can block on it in
//! tests, per spec.md §8's concurrent testable properties.

use std::cell::UnsafeCell;
use std::sync::{Condvar, Mutex};

pub struct SleepLock<T> {
    locked: Mutex<bool>,
    condvar: Condvar,
    data: UnsafeCell<T>,
}

pub struct SleepLockGuard<'a, T> {
    lock: &'a SleepLock<T>,
}

impl<T> SleepLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            locked: Mutex::new(false),
            condvar: Condvar::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Blocks the calling thread until the lock is free, then acquires it.
    pub fn lock(&self) -> SleepLockGuard<'_, T> {
        let mut locked = self.locked.lock().unwrap();
        while *locked {
            locked = self.condvar.wait(locked).unwrap();
        }
        *locked = true;
        SleepLockGuard { lock: self }
    }
}

impl<T> Drop for SleepLockGuard<'_, T> {
    fn drop(&mut self) {
        let mut locked = self.lock.locked.lock().unwrap();
        *locked = false;
        drop(locked);
        self.lock.condvar.notify_one();
    }
}

impl<T> std::ops::Deref for SleepLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> std::ops::DerefMut for SleepLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}

/// # Safety
/// Only one `SleepLockGuard` can exist at a time (enforced by `locked`),
/// so handing out `&T`/`&mut T` across threads is sound as long as `T`
/// itself is safe to send between threads.
unsafe impl<T: Send> Sync for SleepLock<T> {}
unsafe impl<T: Send> Send for SleepLock<T> {}
