use crate::error::Result;
use crate::mount::fstab::FstabEntry;
use std::path::Path;

/// A live mount joined against its fstab descriptor: a mount point that is
/// both currently mounted and flagged for checkpointing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointingMount {
    pub mount_point: String,
    pub block_device: String,
    pub fs_type: String,
    pub mount_flags: u64,
    pub checkpoint_blk: bool,
    pub checkpoint_fs: bool,
}

impl From<&FstabEntry> for CheckpointingMount {
    fn from(e: &FstabEntry) -> Self {
        Self {
            mount_point: e.mount_point.clone(),
            block_device: e.block_device.clone(),
            fs_type: e.fs_type.clone(),
            mount_flags: e.mount_flags,
            checkpoint_blk: e.checkpoint_blk,
            checkpoint_fs: e.checkpoint_fs,
        }
    }
}

/// Parse a kernel-provided mount table (`/proc/mounts` format: `device
/// mount_point fstype options ...`) into `(device, mount_point)` pairs.
///
/// Unparseable rows are skipped silently.
fn parse_mount_table(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            Some((device.to_string(), mount_point.to_string()))
        })
        .collect()
}

/// Join the live mount table against the fstab descriptors and invoke
/// `callback` for every mount point that is both mounted and
/// checkpoint-participating.
///
/// Mount-table rows with no matching fstab entry are ignored silently.
/// Failure to read the mount table is surfaced as `IOFailed`.
pub fn for_each_checkpointing_mount(
    mount_table_path: impl AsRef<Path>,
    fstab: &[FstabEntry],
    mut callback: impl FnMut(&CheckpointingMount),
) -> Result<()> {
    let contents = std::fs::read_to_string(mount_table_path)?;
    let live_mounts = parse_mount_table(&contents);

    for (_device, mount_point) in &live_mounts {
        if let Some(entry) = fstab
            .iter()
            .find(|e| &e.mount_point == mount_point && e.is_checkpointing())
        {
            callback(&CheckpointingMount::from(entry));
        }
    }

    Ok(())
}

/// Convenience wrapper over `for_each_checkpointing_mount` that collects the
/// full set up front; used where the caller needs to iterate the set more
/// than once (CLM's `prepare`/`commit`).
pub fn checkpointing_mounts(
    mount_table_path: impl AsRef<Path>,
    fstab: &[FstabEntry],
) -> Result<Vec<CheckpointingMount>> {
    let mut mounts = Vec::new();
    for_each_checkpointing_mount(mount_table_path, fstab, |m| mounts.push(m.clone()))?;
    Ok(mounts)
}
