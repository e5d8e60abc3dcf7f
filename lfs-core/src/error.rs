use std::fmt;
use std::io;

/// Error kinds produced by this crate.
///
/// The image builder treats every one of these as fatal (abort with a
/// diagnostic and a nonzero exit). The buffer cache never returns this type
/// directly - exhaustion and device failure are surfaced as `None`/`false`
/// per spec, since the cache is not supposed to panic or abort.
#[derive(Debug)]
pub enum LfsError {
    /// Bad CLI input, oversize name, file too large for the format.
    InvalidArgument(String),
    /// A device or host file read/write/seek failure.
    Io(io::Error),
    /// Out of inodes, out of blocks, or no buffer available.
    Exhausted(String),
    /// Magic mismatch or an impossible on-disk record.
    Corrupt(String),
}

impl LfsError {
    pub fn as_str(&self) -> String {
        match self {
            LfsError::InvalidArgument(msg) => format!("invalid argument: {msg}"),
            LfsError::Io(e) => format!("I/O error: {e}"),
            LfsError::Exhausted(msg) => format!("exhausted: {msg}"),
            LfsError::Corrupt(msg) => format!("corrupt: {msg}"),
        }
    }
}

impl fmt::Display for LfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl std::error::Error for LfsError {}

impl From<io::Error> for LfsError {
    fn from(value: io::Error) -> Self {
        LfsError::Io(value)
    }
}

pub type LfsResult<T> = Result<T, LfsError>;
