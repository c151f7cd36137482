pub mod fstab;
pub mod inventory;

pub use fstab::{load_fstab, parse_fstab, FstabEntry};
pub use inventory::{checkpointing_mounts, for_each_checkpointing_mount, CheckpointingMount};
