use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

/// Sector size assumed by the bow log engine and control paths.
pub const SECTOR_SIZE: u32 = 512;

/// Block size used for CRC/IO granularity during restore. Always 8 sectors.
pub const BLOCK_SIZE: u32 = 4096;

/// Wrapper around a block device or image file for sector-based I/O.
///
/// Unlike a filesystem-aware resizer, the bow log engine never needs to learn
/// a sector size from on-disk metadata: fixes it at 512 bytes.
pub struct Device {
    file: File,
    path: PathBuf,
    total_sectors: u64,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("path", &self.path)
            .field("total_sectors", &self.total_sectors)
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Internal helper to open a device with specified mode
    fn open_impl<P: AsRef<Path>>(path: P, writable: bool) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let path_display = path_buf.display().to_string();

        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(&path_buf)
            .map_err(|_| Error::device_not_found(&path_display))?;

        let metadata = file.metadata()?;
        let size = if metadata.is_file() {
            metadata.len()
        } else {
            let mut f = file.try_clone()?;
            f.seek(SeekFrom::End(0))?
        };

        let total_sectors = size / SECTOR_SIZE as u64;

        Ok(Self {
            file,
            path: path_buf,
            total_sectors,
        })
    }

    /// Open a device or image file for read/write access
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_impl(path, true)
    }

    /// Open a device in read-only mode (for validate-only inspection)
    pub fn open_readonly<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_impl(path, false)
    }

    /// Get the device path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get total number of 512-byte sectors
    pub fn total_sectors(&self) -> u64 {
        self.total_sectors
    }

    /// Get total device size in bytes
    pub fn size_bytes(&self) -> Result<u64> {
        let metadata = self.file.metadata()?;
        if metadata.is_file() {
            Ok(metadata.len())
        } else {
            let mut f = self.file.try_clone()?;
            Ok(f.seek(SeekFrom::End(0))?)
        }
    }

    /// Read sectors starting at the given sector number
    pub fn read_sectors(&self, start_sector: u64, count: u32) -> Result<Vec<u8>> {
        let offset = start_sector * SECTOR_SIZE as u64;
        let size = count as usize * SECTOR_SIZE as usize;
        let mut buffer = vec![0u8; size];

        self.file.read_exact_at(&mut buffer, offset)?;
        Ok(buffer)
    }

    /// Read a single sector
    pub fn read_sector(&self, sector: u64) -> Result<Vec<u8>> {
        self.read_sectors(sector, 1)
    }

    /// Write sectors starting at the given sector number
    pub fn write_sectors(&self, start_sector: u64, data: &[u8]) -> Result<()> {
        let offset = start_sector * SECTOR_SIZE as u64;
        self.file.write_all_at(data, offset)?;
        Ok(())
    }

    /// Write a single sector
    pub fn write_sector(&self, sector: u64, data: &[u8]) -> Result<()> {
        if data.len() != SECTOR_SIZE as usize {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "data size {} does not match sector size {}",
                    data.len(),
                    SECTOR_SIZE
                ),
            )));
        }
        self.write_sectors(sector, data)
    }

    /// Flush all writes to disk
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_device_open_file() {
        let file = NamedTempFile::new().unwrap();
        let zeros = vec![0u8; 1024 * 1024];
        std::fs::write(file.path(), &zeros).unwrap();

        let device = Device::open(file.path()).unwrap();
        assert_eq!(device.total_sectors(), 2048); // 1MB / 512 = 2048 sectors
    }

    #[test]
    fn test_device_read_write() {
        let file = NamedTempFile::new().unwrap();
        let zeros = vec![0u8; 1024 * 1024];
        std::fs::write(file.path(), &zeros).unwrap();

        let device = Device::open(file.path()).unwrap();

        let test_data = vec![0xAB; 512];
        device.write_sector(10, &test_data).unwrap();

        let read_data = device.read_sector(10).unwrap();
        assert_eq!(read_data, test_data);

        let sector0 = device.read_sector(0).unwrap();
        assert_eq!(sector0, vec![0u8; 512]);
    }

    #[test]
    fn test_device_multi_sector_read_write() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), vec![0u8; 1024 * 1024]).unwrap();

        let device = Device::open(file.path()).unwrap();
        let pattern: Vec<u8> = (0..BLOCK_SIZE).map(|b| (b % 251) as u8).collect();
        device.write_sectors(16, &pattern).unwrap();

        let read_back = device.read_sectors(16, BLOCK_SIZE / SECTOR_SIZE).unwrap();
        assert_eq!(read_back, pattern);
    }
}
