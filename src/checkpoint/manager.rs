use crate::bow::control::{BowControl, BowState};
use crate::checkpoint::hal::BootControlHal;
use crate::checkpoint::metadata::{delete_metadata, read_metadata, write_metadata, CheckpointState};
use crate::checkpoint::property::PropertySetter;
use crate::checkpoint::reboot::RebootHook;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fs_checkpoint::{remount_with_checkpoint, CHECKPOINTING_FS_TYPE};
use crate::mount::{checkpointing_mounts, CheckpointingMount, FstabEntry};
use std::cell::Cell;
use std::path::Path;

/// The checkpoint lifecycle manager: the state machine driving a
/// checkpoint from `start` through `commit`/`abort`, backed by a small
/// persisted metadata file and a set of injectable external collaborators.
///
/// `is_checkpointing` is the only in-process shared state - an owned
/// `Cell<bool>`, not a global, so tests can build independent managers that
/// don't leak state into one another.
pub struct CheckpointManager {
    config: Config,
    fstab: Vec<FstabEntry>,
    hal: Option<Box<dyn BootControlHal>>,
    reboot: Box<dyn RebootHook>,
    property: Box<dyn PropertySetter>,
    is_checkpointing: Cell<bool>,
}

impl CheckpointManager {
    pub fn new(
        config: Config,
        fstab: Vec<FstabEntry>,
        hal: Option<Box<dyn BootControlHal>>,
        reboot: Box<dyn RebootHook>,
        property: Box<dyn PropertySetter>,
    ) -> Self {
        Self {
            config,
            fstab,
            hal,
            reboot,
            property,
            is_checkpointing: Cell::new(false),
        }
    }

    pub fn is_checkpointing(&self) -> bool {
        self.is_checkpointing.get()
    }

    fn mounts(&self) -> Result<Vec<CheckpointingMount>> {
        checkpointing_mounts(&self.config.mount_table_path, &self.fstab)
    }

    fn metadata_path(&self) -> &Path {
        &self.config.metadata_path
    }

    fn read_state(&self) -> Result<CheckpointState> {
        read_metadata(self.metadata_path())
    }

    /// `supports() -> bool`: true iff any fstab entry has a checkpoint flag.
    pub fn supports(&self) -> bool {
        self.fstab.iter().any(|e| e.is_checkpointing())
    }

    /// `start(retry)`: arm a checkpoint.
    ///
    /// `retry == -1` arms a slot-scoped rollback if the HAL can name the
    /// current slot suffix; otherwise (including `retry == -1` with no HAL)
    /// it falls through to the `retry + 1` arithmetic, which for `retry ==
    /// -1` writes `Armed(0)`.
    pub fn start(&self, retry: i64) -> Result<()> {
        if retry < -1 {
            return Err(Error::InvalidArgument(format!(
                "retry count {retry} is less than the -1 sentinel"
            )));
        }

        let state = if retry == -1 {
            match self.hal.as_ref().and_then(|h| h.current_slot_suffix()) {
                Some(suffix) => CheckpointState::RollbackArmed(suffix),
                None => CheckpointState::Armed((retry + 1) as u32),
            }
        } else {
            CheckpointState::Armed((retry + 1) as u32)
        };

        write_metadata(self.metadata_path(), &state)?;
        Ok(())
    }

    /// `needsCheckpoint() -> bool`: the HAL branch wins over the file branch
    /// (consulted first, returns immediately on a positive answer). Latches
    /// `is_checkpointing` whenever it returns true.
    pub fn needs_checkpoint(&self) -> Result<bool> {
        if let Some(hal) = &self.hal {
            if hal.is_current_slot_successful() == Some(false) {
                self.is_checkpointing.set(true);
                return Ok(true);
            }
        }

        let needed = match self.read_state()? {
            CheckpointState::Idle => false,
            CheckpointState::Armed(0) => false,
            CheckpointState::Armed(_) | CheckpointState::RollbackArmed(_) => true,
        };

        if needed {
            self.is_checkpointing.set(true);
        }
        Ok(needed)
    }

    /// `needsRollback() -> bool`: metadata contents are exactly `"0"`, or
    /// begin with `"-1 "` and the suffix that follows matches the HAL's
    /// current slot suffix.
    pub fn needs_rollback(&self) -> Result<bool> {
        match self.read_state()? {
            CheckpointState::Idle => Ok(false),
            CheckpointState::Armed(0) => Ok(true),
            CheckpointState::Armed(_) => Ok(false),
            CheckpointState::RollbackArmed(suffix) => {
                let current = self.hal.as_ref().and_then(|h| h.current_slot_suffix());
                Ok(current.as_deref() == Some(suffix.as_str()))
            }
        }
    }

    /// `markBootAttempt()`: decrement the leading retry counter by one, or
    /// no-op if the metadata is absent, the counter is already `0`, or the
    /// metadata is a slot-scoped rollback marker (whose leading token is the
    /// `-1` sentinel, never `> 0`).
    pub fn mark_boot_attempt(&self) -> Result<()> {
        match self.read_state()? {
            CheckpointState::Idle => Ok(()),
            CheckpointState::Armed(0) => Ok(()),
            CheckpointState::Armed(n) => {
                write_metadata(self.metadata_path(), &CheckpointState::Armed(n - 1))
            }
            CheckpointState::RollbackArmed(_) => Ok(()),
        }
    }

    /// `prepare()`: for each `checkpoint_blk` mount, best-effort discard the
    /// mount point then set bow state to `Prepared`. Per-mount failures are
    /// logged and skipped - a failed discard or state write on one mount
    /// must not block the others.
    pub fn prepare(&self) -> Result<()> {
        for mount in self.mounts()? {
            if !mount.checkpoint_blk {
                continue;
            }

            if let Err(e) = discard_mount_point(&mount.mount_point) {
                log::warn!(
                    "bow prepare: discard of '{}' failed (continuing): {e}",
                    mount.mount_point
                );
            }

            if let Err(e) = BowControl::set_state(&mount.block_device, BowState::Prepared) {
                log::warn!(
                    "bow prepare: set_state(Prepared) on '{}' failed (continuing): {e}",
                    mount.block_device
                );
            }
        }

        Ok(())
    }

    /// `commit()`: no-op if no checkpoint is in progress. Otherwise remounts
    /// every checkpointing fs-mode mount with `checkpoint=enable`, commits
    /// every block-mode mount's bow state, sets the committed property, and
    /// deletes the metadata file. Any failure short-circuits the loop -
    /// correctness requires every participating mount to transition.
    pub fn commit(&self) -> Result<()> {
        if !self.is_checkpointing.get() {
            return Ok(());
        }

        for mount in self.mounts()? {
            if mount.checkpoint_fs && mount.fs_type == CHECKPOINTING_FS_TYPE {
                remount_with_checkpoint(&mount.mount_point, mount.mount_flags)?;
            }
            if mount.checkpoint_blk {
                BowControl::set_state(&mount.block_device, BowState::Committed)?;
            }
        }

        self.property
            .set(&self.config.committed_property_name(), "1")?;
        self.is_checkpointing.set(false);
        delete_metadata(self.metadata_path())?;

        Ok(())
    }

    /// `abort()`: unconditionally triggers a system reboot. Never returns an
    /// error - there is nothing sensible to return to a caller once the
    /// reboot request has been issued.
    pub fn abort(&self) {
        self.reboot.reboot();
    }
}

/// Issue a full-range discard (trim) over `mount_point`, via the `FITRIM`
/// ioctl on the mounted filesystem.
#[cfg(target_os = "linux")]
fn discard_mount_point(mount_point: &str) -> Result<()> {
    use std::fs::File;
    use std::os::unix::io::AsRawFd;

    #[repr(C)]
    struct FstrimRange {
        start: u64,
        len: u64,
        minlen: u64,
    }

    // FITRIM = _IOWR('X', 121, struct fstrim_range)
    const FITRIM: libc::Ioctl = 0xC018_5879u32 as libc::Ioctl;

    let file = File::open(mount_point)?;
    let mut range = FstrimRange {
        start: 0,
        len: u64::MAX,
        minlen: 0,
    };

    let ret = unsafe { libc::ioctl(file.as_raw_fd(), FITRIM, &mut range) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn discard_mount_point(_mount_point: &str) -> Result<()> {
    Ok(())
}
