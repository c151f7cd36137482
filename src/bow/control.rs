use crate::error::{Error, Result};
use std::path::Path;

/// Prefix every block device path passed to `set_state` must carry.
const DEVICE_PREFIX: &str = "/dev/";

/// The three states Bow Control can drive a device through.
///
/// Modeled as a typed enum rather than bare string literals at call sites,
/// wrapping the on-disk/wire primitive in a small enum instead of passing
/// raw bytes around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BowState {
    /// `"0"` - idle / checkpoint in progress, not yet prepared.
    Idle,
    /// `"1"` - prepared for the risky window.
    Prepared,
    /// `"2"` - committed, pre-images may be reclaimed.
    Committed,
}

impl BowState {
    pub fn as_str(self) -> &'static str {
        match self {
            BowState::Idle => "0",
            BowState::Prepared => "1",
            BowState::Committed => "2",
        }
    }
}

/// Bow Control: writes state transitions to the per-device sysfs control
/// sink that the kernel block remapper observes.
pub struct BowControl;

impl BowControl {
    /// Derive `/sys/<block-tail>/bow/state` from a `/dev/...` device path.
    fn control_path(block_device_path: &str) -> Result<String> {
        let tail = block_device_path.strip_prefix(DEVICE_PREFIX).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "block device path '{block_device_path}' does not start with '{DEVICE_PREFIX}'"
            ))
        })?;
        Ok(format!("/sys/{tail}/bow/state"))
    }

    /// Write `state` to the device's bow control sink by whole-file replace.
    pub fn set_state(block_device_path: &str, state: BowState) -> Result<()> {
        Self::set_state_at(&Self::control_path(block_device_path)?, state)
    }

    /// Same as `set_state` but writes to an explicit path, so tests can point
    /// it at a scratch file instead of a real `/sys` tree.
    pub fn set_state_at(control_path: impl AsRef<Path>, state: BowState) -> Result<()> {
        std::fs::write(control_path, state.as_str())?;
        Ok(())
    }
}
