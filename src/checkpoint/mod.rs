pub mod hal;
pub mod manager;
pub mod metadata;
pub mod property;
pub mod reboot;

pub use hal::{BootControlHal, FakeBootControlHal};
pub use manager::CheckpointManager;
pub use metadata::{delete_metadata, read_metadata, write_metadata, CheckpointState};
pub use property::{FakePropertySetter, FilePropertySetter, PropertySetter};
pub use reboot::{FakeRebootHook, LinuxRebootHook, RebootHook};
