use std::path::PathBuf;

/// Runtime configuration for the checkpoint/rollback engine.
///
/// Parameterizes the daemon name and metadata path so a given deployment can
/// rename its committed property namespace without touching call sites.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the owning daemon, used as the property namespace
    /// (`"<daemon_name>.checkpoint_committed"`).
    pub daemon_name: String,
    /// Path to the persisted checkpoint metadata file.
    pub metadata_path: PathBuf,
    /// Path to the kernel-provided mount table (`/proc/mounts` format).
    pub mount_table_path: PathBuf,
    /// Path to the line-oriented fstab-like descriptor file.
    pub fstab_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_name: "vold".to_string(),
            metadata_path: PathBuf::from("/metadata/vold/checkpoint"),
            mount_table_path: PathBuf::from("/proc/mounts"),
            fstab_path: PathBuf::from("/etc/fstab"),
        }
    }
}

impl Config {
    /// The property name commit() sets once a checkpoint is confirmed durable.
    pub fn committed_property_name(&self) -> String {
        format!("{}.checkpoint_committed", self.daemon_name)
    }
}
