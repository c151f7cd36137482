use crate::bow::crc::chained_crc32;
use crate::bow::log::{BowLogSector, RawHeader};
use crate::bow::remap::RemapTable;
use crate::device::{Device, BLOCK_SIZE};
use crate::error::{Error, Result};
use std::path::Path;

/// The restore engine: given a raw block device whose sector 0 is a bow
/// log header, replays the log in reverse to undo writes made during the
/// checkpoint window.
pub struct RestoreEngine;

impl RestoreEngine {
    /// Restore `block_device_path` in place.
    ///
    /// Runs Pass 1 (validate, read-only) then, if it succeeds, Pass 2
    /// (apply, writes the undone payloads back to their original sectors).
    /// If Pass 1 fails, falls back to restoring only the block-0 pre-image
    /// (roll-forward) and still returns success.
    pub fn restore(block_device_path: impl AsRef<Path>) -> Result<()> {
        let device = Device::open(block_device_path)?;

        let h0_bytes = device.read_sector(0)?;
        let h0 = RawHeader::decode(&h0_bytes)?;

        let (partial_remap, validated) = Self::validate(&device, &h0);
        match validated {
            Ok(()) => Self::apply(&device, h0.sequence),
            Err(_) => Self::roll_forward(&device, &h0, &partial_remap),
        }
    }

    /// Pass 1: dry-run validation. Builds a RemapTable as entries validate;
    /// fails with `InvalidFormat`/`ChecksumMismatch` on the first problem,
    /// without writing anything. Returns the table as it stood at the point
    /// of failure (possibly empty) alongside the result, since the
    /// roll-forward fallback reads the block-0 pre-image through whatever
    /// remapping *was* established before the log was judged untrustworthy.
    fn validate(device: &Device, h0: &RawHeader) -> (RemapTable, Result<()>) {
        let mut remap = RemapTable::new();

        if !h0.magic_valid() {
            let err = Err(Error::InvalidFormat(format!("bad magic {:#010x}", h0.magic)));
            return (remap, err);
        }

        match Self::validate_into(device, h0.sequence, &mut remap) {
            Ok(()) => (remap, Ok(())),
            Err(e) => (remap, Err(e)),
        }
    }

    fn validate_into(device: &Device, sequence: u32, remap: &mut RemapTable) -> Result<()> {
        for seq in (0..=sequence).rev() {
            let header_bytes = remap.read_through(device, 0, 1)?;
            let header = BowLogSector::from_bytes(&header_bytes)?;

            if header.sequence != seq {
                return Err(Error::InvalidFormat(format!(
                    "expected sequence {seq}, got {}",
                    header.sequence
                )));
            }

            for entry in header.entries.iter().rev() {
                let payload = remap.read_through(device, entry.dest, entry.size_sectors() as u32)?;

                if entry.checksum != 0 {
                    let initial = (entry.source / 8) as u32;
                    let crc = chained_crc32(initial, &payload, BLOCK_SIZE as usize);
                    if crc != entry.checksum {
                        return Err(Error::ChecksumMismatch {
                            source: entry.source,
                        });
                    }
                }

                remap.push(*entry);
            }
        }

        Ok(())
    }

    /// Pass 2: apply. Re-walks the identical traversal, reading each entry's
    /// payload directly from `dest` (no subsequent entry overlays it
    /// physically) and writing it back to `source`, undoing the overwrite.
    fn apply(device: &Device, sequence: u32) -> Result<()> {
        let mut remap = RemapTable::new();

        for seq in (0..=sequence).rev() {
            let header_bytes = remap.read_through(device, 0, 1)?;
            let header = BowLogSector::from_bytes(&header_bytes)?;

            if header.sequence != seq {
                return Err(Error::InvalidFormat(format!(
                    "expected sequence {seq}, got {} during apply",
                    header.sequence
                )));
            }

            for entry in header.entries.iter().rev() {
                let payload = device.read_sectors(entry.dest, entry.size_sectors() as u32)?;

                if entry.checksum != 0 {
                    let initial = (entry.source / 8) as u32;
                    let crc = chained_crc32(initial, &payload, BLOCK_SIZE as usize);
                    if crc != entry.checksum {
                        return Err(Error::ChecksumMismatch {
                            source: entry.source,
                        });
                    }
                }

                device.write_sectors(entry.source, &payload)?;
                remap.push(*entry);
            }
        }

        device.sync()?;
        Ok(())
    }

    /// Roll-forward fallback: restore only the block-0 pre-image named by
    /// `h0.sector0`, trusting that field even though `h0.magic` (or some
    /// later entry) failed validation.
    fn roll_forward(device: &Device, h0: &RawHeader, remap: &RemapTable) -> Result<()> {
        let preimage = remap.read_through(device, h0.sector0, BLOCK_SIZE / crate::device::SECTOR_SIZE)?;
        device.write_sectors(0, &preimage)?;
        device.sync()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bow::crc::chained_crc32 as crc;
    use crate::bow::log::{BowLogEntry, BowLogSector, BOW_MAGIC};
    use crate::device::SECTOR_SIZE;
    use tempfile::NamedTempFile;

    fn image_with_sectors(total_sectors: u64) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), vec![0u8; (total_sectors * SECTOR_SIZE as u64) as usize])
            .unwrap();
        file
    }

    fn fill_pattern(device: &Device, sector: u64, count: u32, seed: u8) {
        let data: Vec<u8> = (0..count as usize * SECTOR_SIZE as usize)
            .map(|i| seed.wrapping_add(i as u8))
            .collect();
        device.write_sectors(sector, &data).unwrap();
    }

    /// S1: empty log is a no-op success.
    #[test]
    fn s1_empty_log_is_noop() {
        let file = image_with_sectors(64);
        {
            let device = Device::open(file.path()).unwrap();
            let header = BowLogSector {
                magic: BOW_MAGIC,
                count: 0,
                sequence: 0,
                sector0: 0,
                entries: vec![],
            };
            device.write_sector(0, &header.to_bytes()).unwrap();
        }

        let before = std::fs::read(file.path()).unwrap();
        RestoreEngine::restore(file.path()).unwrap();
        let after = std::fs::read(file.path()).unwrap();
        assert_eq!(before, after);
    }

    /// S2: single-entry replay undoes the overwrite at `source`.
    #[test]
    fn s2_single_entry_replay() {
        let file = image_with_sectors(64);
        let original_data;
        {
            let device = Device::open(file.path()).unwrap();
            // sectors 16..23 hold the pre-image that should end up at 8..15
            fill_pattern(&device, 16, 8, 0xAB);
            original_data = device.read_sectors(16, 8).unwrap();

            let checksum = crc((8u64 / 8) as u32, &original_data, BLOCK_SIZE as usize);
            let header = BowLogSector {
                magic: BOW_MAGIC,
                count: 1,
                sequence: 0,
                sector0: 0,
                entries: vec![BowLogEntry {
                    source: 8,
                    dest: 16,
                    size: BLOCK_SIZE,
                    checksum,
                }],
            };
            device.write_sector(0, &header.to_bytes()).unwrap();

            // sectors 8..15 currently hold post-checkpoint (garbage) data.
            fill_pattern(&device, 8, 8, 0xFF);
        }

        RestoreEngine::restore(file.path()).unwrap();

        let device = Device::open(file.path()).unwrap();
        let restored = device.read_sectors(8, 8).unwrap();
        assert_eq!(restored, original_data);
    }

    /// S3: wrong checksum triggers roll-forward instead of applying the entry.
    #[test]
    fn s3_checksum_mismatch_rolls_forward() {
        let file = image_with_sectors(64);
        let preimage_block0;
        let garbage_at_8;
        {
            let device = Device::open(file.path()).unwrap();

            // Pre-image of block 0, stashed at sector 32 by the (fake) bow driver.
            fill_pattern(&device, 32, 8, 0x11);
            preimage_block0 = device.read_sectors(32, 8).unwrap();

            fill_pattern(&device, 16, 8, 0xAB);

            let header = BowLogSector {
                magic: BOW_MAGIC,
                count: 1,
                sequence: 0,
                sector0: 32,
                entries: vec![BowLogEntry {
                    source: 8,
                    dest: 16,
                    size: BLOCK_SIZE,
                    checksum: 0xDEAD_BEEF, // deliberately wrong
                }],
            };
            device.write_sector(0, &header.to_bytes()).unwrap();

            fill_pattern(&device, 8, 8, 0xFF);
            garbage_at_8 = device.read_sectors(8, 8).unwrap();
        }

        RestoreEngine::restore(file.path()).unwrap();

        let device = Device::open(file.path()).unwrap();
        // source sector untouched by the rejected entry
        assert_eq!(device.read_sectors(8, 8).unwrap(), garbage_at_8);
        // block 0 restored from the stashed pre-image
        assert_eq!(device.read_sectors(0, 8).unwrap(), preimage_block0);
    }

    /// S4: sequence mismatch on re-read triggers roll-forward.
    #[test]
    fn s4_sequence_mismatch_rolls_forward() {
        let file = image_with_sectors(64);
        let preimage_block0;
        {
            let device = Device::open(file.path()).unwrap();
            fill_pattern(&device, 32, 8, 0x22);
            preimage_block0 = device.read_sectors(32, 8).unwrap();

            // Header claims sequence=2 but sector 0 re-reads as itself (no
            // remap yet), which is sequence 2 -- but the loop on its first
            // iteration expects `seq == 2` (S) so that part matches; make S
            // disagree with the *stored* field on a later (lower) iteration
            // by using a count of 0, so no remap ever forms, and set
            // sequence to a value that won't match the second loop iteration.
            let header = BowLogSector {
                magic: BOW_MAGIC,
                count: 0,
                sequence: 2,
                sector0: 32,
                entries: vec![],
            };
            device.write_sector(0, &header.to_bytes()).unwrap();
        }

        RestoreEngine::restore(file.path()).unwrap();

        let device = Device::open(file.path()).unwrap();
        assert_eq!(device.read_sectors(0, 8).unwrap(), preimage_block0);
    }

    /// Restoring twice yields the same final contents.
    #[test]
    fn restore_is_idempotent() {
        let file = image_with_sectors(64);
        {
            let device = Device::open(file.path()).unwrap();
            fill_pattern(&device, 16, 8, 0xAB);
            let original_data = device.read_sectors(16, 8).unwrap();
            let checksum = crc((8u64 / 8) as u32, &original_data, BLOCK_SIZE as usize);
            let header = BowLogSector {
                magic: BOW_MAGIC,
                count: 1,
                sequence: 0,
                sector0: 0,
                entries: vec![BowLogEntry {
                    source: 8,
                    dest: 16,
                    size: BLOCK_SIZE,
                    checksum,
                }],
            };
            device.write_sector(0, &header.to_bytes()).unwrap();
            fill_pattern(&device, 8, 8, 0xFF);
        }

        RestoreEngine::restore(file.path()).unwrap();
        let first_pass = std::fs::read(file.path()).unwrap();

        // Second restore: sector 0 no longer carries a valid bow header
        // (it was overwritten by the first restore's payload), so this call
        // exercises the roll-forward path. Contents must still not regress.
        let _ = RestoreEngine::restore(file.path());
        let second_pass = std::fs::read(file.path()).unwrap();

        // Data sectors untouched by the no-op/roll-forward second call.
        assert_eq!(first_pass[8 * SECTOR_SIZE as usize..16 * SECTOR_SIZE as usize],
            second_pass[8 * SECTOR_SIZE as usize..16 * SECTOR_SIZE as usize]);
    }
}
