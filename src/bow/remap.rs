use crate::bow::log::BowLogEntry;
use crate::device::Device;
use crate::error::Result;

/// Ordered sequence of accepted `BowLogEntry` records.
///
/// Entries are appended in the order the restore engine validates them,
/// newest log write first, since the traversal walks the log newest-first
/// (highest sequence, then highest entry index, down to the oldest). A
/// lookup therefore resolves "newest entry wins" by taking the *first*
/// match in insertion order, not the last.
#[derive(Debug, Default)]
pub struct RemapTable {
    entries: Vec<BowLogEntry>,
}

impl RemapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a validated entry. Called once an entry's checksum (if any)
    /// has been confirmed.
    pub fn push(&mut self, entry: BowLogEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve logical sector `s` to the physical sector that currently
    /// holds its pre-checkpoint content: the `dest` of the newest entry
    /// covering `s`, or `s` itself if no entry covers it.
    pub fn resolve(&self, s: u64) -> u64 {
        match self.entries.iter().find(|e| e.covers(s)) {
            Some(e) => e.dest + (s - e.source),
            None => s,
        }
    }

    /// Read `count` sectors starting at logical sector `start`, resolving
    /// each sector independently through the table. Contiguous runs that
    /// resolve to contiguous physical sectors are read in one device call.
    pub fn read_through(&self, device: &Device, start: u64, count: u32) -> Result<Vec<u8>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut out = Vec::with_capacity(count as usize * crate::device::SECTOR_SIZE as usize);
        let mut i = 0u32;
        while i < count {
            let logical = start + i as u64;
            let physical_start = self.resolve(logical);

            let mut run = 1u32;
            while i + run < count && self.resolve(logical + run as u64) == physical_start + run as u64
            {
                run += 1;
            }

            out.extend_from_slice(&device.read_sectors(physical_start, run)?);
            i += run;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: u64, dest: u64, size: u32) -> BowLogEntry {
        BowLogEntry {
            source,
            dest,
            size,
            checksum: 0,
        }
    }

    #[test]
    fn resolves_uncovered_sector_to_itself() {
        let table = RemapTable::new();
        assert_eq!(table.resolve(42), 42);
    }

    #[test]
    fn resolves_covered_sector_through_dest_offset() {
        let mut table = RemapTable::new();
        table.push(entry(8, 16, 4096));
        assert_eq!(table.resolve(8), 16);
        assert_eq!(table.resolve(10), 18);
    }

    #[test]
    fn newest_entry_wins_on_overlap() {
        let mut table = RemapTable::new();
        // Newest write processed (and pushed) first: source 8 redirects to 100.
        table.push(entry(8, 100, 4096));
        // Older write covering the same range: should be shadowed.
        table.push(entry(8, 200, 4096));

        assert_eq!(table.resolve(8), 100);
    }

    #[test]
    fn read_through_matches_device_contents() {
        use tempfile::NamedTempFile;

        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), vec![0u8; 1024 * 1024]).unwrap();
        let device = Device::open(file.path()).unwrap();

        let pattern: Vec<u8> = (0..4096u32).map(|b| (b % 251) as u8).collect();
        device.write_sectors(16, &pattern).unwrap();

        let mut table = RemapTable::new();
        table.push(entry(8, 16, 4096));

        let read = table.read_through(&device, 8, 8).unwrap();
        assert_eq!(read, pattern);
    }
}
