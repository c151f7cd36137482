pub mod bow;
pub mod checkpoint;
pub mod config;
pub mod device;
pub mod error;
pub mod fs_checkpoint;
pub mod mount;
pub mod system;

pub use bow::{BowControl, BowState, RestoreEngine};
pub use checkpoint::{CheckpointManager, CheckpointState};
pub use config::Config;
pub use device::Device;
pub use error::{Error, Result};
pub use mount::{checkpointing_mounts, for_each_checkpointing_mount, load_fstab, FstabEntry};
pub use system::{check_root, get_block_device_size};
