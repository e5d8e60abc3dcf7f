//! On-disk storage core for a small teaching operating system's
//! log-structured file system: the offline image builder and the in-kernel
//! buffer cache, sharing one on-disk format.

pub mod builder;
pub mod cache;
pub mod checkpoint;
pub mod codec;
pub mod device;
pub mod dirent;
pub mod error;
pub mod imap;
pub mod inode;
pub mod layout;
pub mod segsum;
pub mod sleeplock;

pub use error::{LfsError, LfsResult};
