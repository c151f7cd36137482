use crate::error::Result;
use std::path::Path;

/// A single fstab-like entry describing a checkpointable mount.
///
/// `checkpoint_blk` and `checkpoint_fs` are mutually exclusive: a mount is
/// checkpointed either by the block-level bow log or by asking the
/// filesystem itself to track changes, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FstabEntry {
    pub mount_point: String,
    pub block_device: String,
    pub fs_type: String,
    pub mount_flags: u64,
    pub checkpoint_blk: bool,
    pub checkpoint_fs: bool,
}

impl FstabEntry {
    pub fn is_checkpointing(&self) -> bool {
        self.checkpoint_blk || self.checkpoint_fs
    }
}

/// Parse a line-oriented fstab-like descriptor.
///
/// Each non-empty, non-comment line is whitespace-separated:
/// `block_device mount_point fs_type mount_flags_hex flags...`
///
/// Recognized trailing flag tokens: `checkpoint=block`, `checkpoint=fs`.
/// Unrecognized trailing tokens are ignored rather than rejected.
pub fn parse_fstab(contents: &str) -> Vec<FstabEntry> {
    let mut entries = Vec::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let (Some(block_device), Some(mount_point), Some(fs_type), Some(flags_field)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            continue;
        };

        let mount_flags = u64::from_str_radix(flags_field.trim_start_matches("0x"), 16)
            .or_else(|_| flags_field.parse::<u64>())
            .unwrap_or(0);

        let mut checkpoint_blk = false;
        let mut checkpoint_fs = false;
        for token in fields {
            match token {
                "checkpoint=block" => checkpoint_blk = true,
                "checkpoint=fs" => checkpoint_fs = true,
                _ => {}
            }
        }

        entries.push(FstabEntry {
            mount_point: mount_point.to_string(),
            block_device: block_device.to_string(),
            fs_type: fs_type.to_string(),
            mount_flags,
            checkpoint_blk,
            checkpoint_fs,
        });
    }

    entries
}

/// Load and parse the fstab-like descriptor at `path`.
pub fn load_fstab(path: impl AsRef<Path>) -> Result<Vec<FstabEntry>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(parse_fstab(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_checkpointing_and_plain_entries() {
        let fstab = "\
            # comment\n\
            /dev/block/dm-1 /data ext4 0x0 checkpoint=fs\n\
            /dev/block/by-name/userdata /mnt/userdata f2fs 0x0 checkpoint=block\n\
            /dev/block/by-name/boot /boot vfat 0x0\n";

        let entries = parse_fstab(fstab);
        assert_eq!(entries.len(), 3);

        assert!(entries[0].checkpoint_fs);
        assert!(!entries[0].checkpoint_blk);

        assert!(entries[1].checkpoint_blk);
        assert!(!entries[1].checkpoint_fs);

        assert!(!entries[2].is_checkpointing());
    }

    #[test]
    fn ignores_blank_and_comment_lines() {
        let entries = parse_fstab("\n# nothing here\n   \n");
        assert!(entries.is_empty());
    }
}
