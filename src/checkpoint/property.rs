use crate::error::Result;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Process-wide property setter consumed by `CheckpointManager::commit`
/// to set `<daemon>.checkpoint_committed = "1"`.
///
/// The real platform property service is out of scope here; this crate's
/// stand-in is a small key/value store, with a real file-backed
/// implementation plus an in-memory fake for tests.
pub trait PropertySetter {
    fn set(&self, name: &str, value: &str) -> Result<()>;
}

/// File-backed real implementation: one file per property under a directory,
/// whole-file replace, the same write discipline `BowControl` uses for the
/// sysfs control path.
pub struct FilePropertySetter {
    dir: PathBuf,
}

impl FilePropertySetter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl PropertySetter for FilePropertySetter {
    fn set(&self, name: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(name), value)?;
        Ok(())
    }
}

/// In-memory fake recording every property set, used in tests.
#[derive(Debug, Default)]
pub struct FakePropertySetter {
    pub values: RefCell<HashMap<String, String>>,
}

impl PropertySetter for FakePropertySetter {
    fn set(&self, name: &str, value: &str) -> Result<()> {
        self.values
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }
}

impl FakePropertySetter {
    pub fn get(&self, name: &str) -> Option<String> {
        self.values.borrow().get(name).cloned()
    }
}

/// Read a property back from a file-backed store, for the CLI's `status`
/// subcommand and for tests exercising `FilePropertySetter` round trips.
pub fn read_file_property(dir: impl AsRef<Path>, name: &str) -> Option<String> {
    std::fs::read_to_string(dir.as_ref().join(name)).ok()
}
