//! The segment summary block: the first block of every segment, describing
//! the `SEGSIZE - 1` blocks that follow it.

use crate::codec::{dec32, enc32};
use crate::layout::{SEGSUM_ENTRIES, BSIZE};

/// What kind of content a segment-summary entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Empty,
    Inode,
    Data,
    Indirect,
    Imap,
}

impl BlockType {
    fn to_u32(self) -> u32 {
        match self {
            BlockType::Empty => 0,
            BlockType::Inode => 1,
            BlockType::Data => 2,
            BlockType::Indirect => 3,
            BlockType::Imap => 4,
        }
    }

    fn from_u32(x: u32) -> Self {
        match x {
            1 => BlockType::Inode,
            2 => BlockType::Data,
            3 => BlockType::Indirect,
            4 => BlockType::Imap,
            _ => BlockType::Empty,
        }
    }
}

/// Metadata describing the content of one block in a segment.
///
/// `inum` is 0 for `Empty`/`Imap`. `block_no` is 0 for `Inode`/`Indirect`;
/// for `Data` it is the owning file's block index; for `Imap` it is the
/// imap chunk index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegEntry {
    pub block_type: BlockType,
    pub inum: u32,
    pub block_no: u32,
}

impl SegEntry {
    pub const ENCODED_LEN: usize = 12;

    pub const EMPTY: Self = Self {
        block_type: BlockType::Empty,
        inum: 0,
        block_no: 0,
    };

    fn encode_into(&self, buf: &mut [u8]) {
        enc32(self.block_type.to_u32(), &mut buf[0..4]);
        enc32(self.inum, &mut buf[4..8]);
        enc32(self.block_no, &mut buf[8..12]);
    }

    fn decode_from(buf: &[u8]) -> Self {
        Self {
            block_type: BlockType::from_u32(dec32(&buf[0..4])),
            inum: dec32(&buf[4..8]),
            block_no: dec32(&buf[8..12]),
        }
    }
}

/// A fully decoded segment summary block.
#[derive(Debug, Clone)]
pub struct SegmentSummary {
    pub entries: Vec<SegEntry>,
}

impl SegmentSummary {
    pub fn empty() -> Self {
        Self {
            entries: vec![SegEntry::EMPTY; SEGSUM_ENTRIES as usize],
        }
    }

    /// Index into `entries` for a block at `entry_index` positions past the
    /// summary block itself (`0..SEGSUM_ENTRIES`).
    pub fn set(&mut self, entry_index: usize, entry: SegEntry) {
        self.entries[entry_index] = entry;
    }

    pub fn encode_into(&self, buf: &mut [u8; BSIZE]) {
        for (i, entry) in self.entries.iter().enumerate() {
            let off = i * SegEntry::ENCODED_LEN;
            entry.encode_into(&mut buf[off..off + SegEntry::ENCODED_LEN]);
        }
    }

    pub fn decode_from(buf: &[u8; BSIZE]) -> Self {
        let entries = (0..SEGSUM_ENTRIES as usize)
            .map(|i| {
                let off = i * SegEntry::ENCODED_LEN;
                SegEntry::decode_from(&buf[off..off + SegEntry::ENCODED_LEN])
            })
            .collect();
        Self { entries }
    }
}

static_assertions::const_assert!(
    (SEGSUM_ENTRIES as usize) * SegEntry::ENCODED_LEN <= BSIZE
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_entry() {
        let entry = SegEntry {
            block_type: BlockType::Data,
            inum: 2,
            block_no: 7,
        };
        let mut buf = [0u8; SegEntry::ENCODED_LEN];
        entry.encode_into(&mut buf);
        assert_eq!(SegEntry::decode_from(&buf), entry);
    }

    #[test]
    fn round_trips_a_full_summary() {
        let mut summary = SegmentSummary::empty();
        summary.set(
            0,
            SegEntry {
                block_type: BlockType::Inode,
                inum: 1,
                block_no: 0,
            },
        );
        summary.set(
            1,
            SegEntry {
                block_type: BlockType::Data,
                inum: 1,
                block_no: 0,
            },
        );

        let mut buf = [0u8; BSIZE];
        summary.encode_into(&mut buf);
        let decoded = SegmentSummary::decode_from(&buf);
        assert_eq!(decoded.entries[0].block_type, BlockType::Inode);
        assert_eq!(decoded.entries[1].block_type, BlockType::Data);
        assert_eq!(decoded.entries[2].block_type, BlockType::Empty);
    }
}
