use crate::device::SECTOR_SIZE;
use crate::error::{Error, Result};

/// `"BOW\0"` read as a little-endian u32.
pub const BOW_MAGIC: u32 = 0x0057_4F42;

/// On-disk width of a `BowLogEntry` record.
pub const ENTRY_SIZE: usize = 8 + 8 + 4 + 4;

/// On-disk width of the fixed `BowLogSector` header, before `entries[]`.
pub const HEADER_SIZE: usize = 4 + 4 + 4 + 8;

/// A single copy-on-write log record: where data used to live, where its
/// pre-image was relocated to, and how to verify it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BowLogEntry {
    /// Sector where the data originally lived.
    pub source: u64,
    /// Sector where the pre-image was relocated to.
    pub dest: u64,
    /// Length in bytes; always a multiple of 4096.
    pub size: u32,
    /// CRC-32 over the pre-image, or `0` to skip verification.
    pub checksum: u32,
}

impl BowLogEntry {
    pub fn from_bytes(b: &[u8]) -> Result<Self> {
        if b.len() < ENTRY_SIZE {
            return Err(Error::InvalidFormat(format!(
                "bow log entry truncated: {} bytes, need {}",
                b.len(),
                ENTRY_SIZE
            )));
        }
        let source = u64::from_le_bytes(b[0..8].try_into().unwrap());
        let dest = u64::from_le_bytes(b[8..16].try_into().unwrap());
        let size = u32::from_le_bytes(b[16..20].try_into().unwrap());
        let checksum = u32::from_le_bytes(b[20..24].try_into().unwrap());
        Ok(Self {
            source,
            dest,
            size,
            checksum,
        })
    }

    pub fn to_bytes(self) -> [u8; ENTRY_SIZE] {
        let mut buf = [0u8; ENTRY_SIZE];
        buf[0..8].copy_from_slice(&self.source.to_le_bytes());
        buf[8..16].copy_from_slice(&self.dest.to_le_bytes());
        buf[16..20].copy_from_slice(&self.size.to_le_bytes());
        buf[20..24].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Number of sectors this entry's payload spans.
    pub fn size_sectors(&self) -> u64 {
        self.size as u64 / SECTOR_SIZE as u64
    }

    /// Whether sector `s` falls within this entry's `source` range.
    pub fn covers(&self, s: u64) -> bool {
        s >= self.source && s < self.source + self.size_sectors()
    }
}

/// The header + entries living at the start of one log sector.
///
/// Only sector 0 of the device carries a log sector today (always
/// re-read sector 0 through the growing RemapTable), but the type is kept
/// general over a `sequence` so validation can name which index failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BowLogSector {
    pub magic: u32,
    pub count: u32,
    pub sequence: u32,
    pub sector0: u64,
    pub entries: Vec<BowLogEntry>,
}

/// The fixed-width header fields, decoded positionally with no validation.
///
/// Used to bootstrap the very first read of sector 0: the roll-forward
/// fallback needs `sector0` even when `magic` turns out to be wrong,
/// so decoding is kept separate from validating.
#[derive(Debug, Clone, Copy)]
pub struct RawHeader {
    pub magic: u32,
    pub count: u32,
    pub sequence: u32,
    pub sector0: u64,
}

impl RawHeader {
    pub fn decode(b: &[u8]) -> Result<Self> {
        if b.len() < HEADER_SIZE {
            return Err(Error::InvalidFormat("log sector shorter than header".into()));
        }
        Ok(Self {
            magic: u32::from_le_bytes(b[0..4].try_into().unwrap()),
            count: u32::from_le_bytes(b[4..8].try_into().unwrap()),
            sequence: u32::from_le_bytes(b[8..12].try_into().unwrap()),
            sector0: u64::from_le_bytes(b[12..20].try_into().unwrap()),
        })
    }

    pub fn magic_valid(&self) -> bool {
        self.magic == BOW_MAGIC
    }
}

impl BowLogSector {
    /// Maximum entries that fit in one 512-byte sector after the fixed header.
    pub const MAX_ENTRIES: usize = (SECTOR_SIZE as usize - HEADER_SIZE) / ENTRY_SIZE;

    /// Parse a full sector's worth of bytes into a `BowLogSector`.
    ///
    /// Validates `count` against the sector's remaining capacity *before*
    /// indexing into it (per the Design Notes warning in ), returning
    /// `InvalidFormat` rather than panicking on a corrupt count.
    pub fn from_bytes(b: &[u8]) -> Result<Self> {
        let raw = RawHeader::decode(b)?;
        let (magic, count, sequence, sector0) = (raw.magic, raw.count, raw.sequence, raw.sector0);

        if magic != BOW_MAGIC {
            return Err(Error::InvalidFormat(format!(
                "bad magic {magic:#010x}, expected {BOW_MAGIC:#010x}"
            )));
        }

        if count as usize > Self::MAX_ENTRIES {
            return Err(Error::InvalidFormat(format!(
                "entry count {count} exceeds sector capacity {}",
                Self::MAX_ENTRIES
            )));
        }

        let mut entries = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let start = HEADER_SIZE + i * ENTRY_SIZE;
            let end = start + ENTRY_SIZE;
            if end > b.len() {
                return Err(Error::InvalidFormat("log sector truncated mid-entry".into()));
            }
            let entry = BowLogEntry::from_bytes(&b[start..end])?;
            if entry.size == 0 || entry.size % crate::device::BLOCK_SIZE != 0 {
                return Err(Error::InvalidFormat(format!(
                    "entry size {} is not a positive multiple of {}",
                    entry.size,
                    crate::device::BLOCK_SIZE
                )));
            }
            entries.push(entry);
        }

        Ok(Self {
            magic,
            count,
            sequence,
            sector0,
            entries,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; SECTOR_SIZE as usize];
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..8].copy_from_slice(&self.count.to_le_bytes());
        buf[8..12].copy_from_slice(&self.sequence.to_le_bytes());
        buf[12..20].copy_from_slice(&self.sector0.to_le_bytes());
        for (i, entry) in self.entries.iter().enumerate() {
            let start = HEADER_SIZE + i * ENTRY_SIZE;
            buf[start..start + ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BowLogSector {
        BowLogSector {
            magic: BOW_MAGIC,
            count: 1,
            sequence: 0,
            sector0: 4096,
            entries: vec![BowLogEntry {
                source: 8,
                dest: 16,
                size: 4096,
                checksum: 0xdead_beef,
            }],
        }
    }

    #[test]
    fn round_trips_through_bytes() {
        let sector = sample();
        let bytes = sector.to_bytes();
        assert_eq!(bytes.len(), SECTOR_SIZE as usize);

        let parsed = BowLogSector::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, sector);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample().to_bytes();
        bytes[0] = 0;
        let err = BowLogSector::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn rejects_count_exceeding_capacity() {
        let mut bytes = sample().to_bytes();
        bytes[4..8].copy_from_slice(&(BowLogSector::MAX_ENTRIES as u32 + 1).to_le_bytes());
        let err = BowLogSector::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn rejects_size_not_multiple_of_block() {
        let mut sector = sample();
        sector.entries[0].size = 100;
        let bytes = sector.to_bytes();
        let err = BowLogSector::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn entry_covers_its_source_range() {
        let entry = BowLogEntry {
            source: 8,
            dest: 16,
            size: 8192,
            checksum: 0,
        };
        assert!(!entry.covers(7));
        assert!(entry.covers(8));
        assert!(entry.covers(23));
        assert!(!entry.covers(24));
    }
}
