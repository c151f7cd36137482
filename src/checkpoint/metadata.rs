use crate::error::{Error, Result};
use std::path::Path;

/// The checkpoint lifecycle's persisted state.
///
/// Presence of the metadata file implies a checkpoint is in progress;
/// absence implies none is pending. `CheckpointState::Idle` is therefore
/// never itself written to disk - it is the reading one gets when the file
/// does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointState {
    /// No metadata file on disk.
    Idle,
    /// File contents `"n"`, n >= 0: remaining retry budget.
    Armed(u32),
    /// File contents `"-1 <suffix>"`: rollback on boot if the slot matches.
    RollbackArmed(String),
}

impl CheckpointState {
    /// Serialize to the exact ASCII the file should hold.
    pub fn to_ascii(&self) -> String {
        match self {
            CheckpointState::Idle => String::new(),
            CheckpointState::Armed(n) => n.to_string(),
            CheckpointState::RollbackArmed(suffix) => format!("-1 {suffix}"),
        }
    }

    /// Parse the file's raw contents (never called on `Idle` - that state is
    /// inferred from the file's absence, one level up).
    pub fn parse(contents: &str) -> Result<Self> {
        let contents = contents.trim();
        let mut tokens = contents.split(' ');
        let first = tokens.next().unwrap_or("");

        let n: i64 = first
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("unparseable checkpoint counter: '{first}'")))?;

        if n == -1 {
            let suffix = tokens.next().unwrap_or("").to_string();
            Ok(CheckpointState::RollbackArmed(suffix))
        } else if n >= 0 {
            Ok(CheckpointState::Armed(n as u32))
        } else {
            Err(Error::InvalidArgument(format!(
                "checkpoint counter {n} is neither >= 0 nor the -1 sentinel"
            )))
        }
    }
}

/// Read and parse the metadata file at `path`, or `Idle` if it does not exist.
pub fn read_metadata(path: impl AsRef<Path>) -> Result<CheckpointState> {
    match std::fs::read_to_string(&path) {
        Ok(contents) => CheckpointState::parse(&contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CheckpointState::Idle),
        Err(e) => Err(e.into()),
    }
}

/// Write `state` to the metadata file, creating it if absent.
///
/// Writing `Idle` is a logic error at call sites (there is no ASCII form for
/// "no checkpoint") - callers that want to clear state should `delete_metadata`.
pub fn write_metadata(path: impl AsRef<Path>, state: &CheckpointState) -> Result<()> {
    debug_assert!(!matches!(state, CheckpointState::Idle));
    std::fs::write(path, state.to_ascii())?;
    Ok(())
}

/// Delete the metadata file. Idempotent: a missing file is not an error.
pub fn delete_metadata(path: impl AsRef<Path>) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_reads_as_idle() {
        let state = read_metadata("/nonexistent/path/checkpoint").unwrap();
        assert_eq!(state, CheckpointState::Idle);
    }

    #[test]
    fn armed_round_trips() {
        let file = NamedTempFile::new().unwrap();
        write_metadata(file.path(), &CheckpointState::Armed(4)).unwrap();
        assert_eq!(
            read_metadata(file.path()).unwrap(),
            CheckpointState::Armed(4)
        );
    }

    #[test]
    fn rollback_armed_round_trips() {
        let file = NamedTempFile::new().unwrap();
        write_metadata(file.path(), &CheckpointState::RollbackArmed("_a".into())).unwrap();
        assert_eq!(
            read_metadata(file.path()).unwrap(),
            CheckpointState::RollbackArmed("_a".into())
        );
    }

    #[test]
    fn rejects_unparseable_counter() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "not-a-number").unwrap();
        let err = read_metadata(file.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn delete_is_idempotent() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        std::fs::remove_file(&path).unwrap();
        delete_metadata(&path).unwrap();
        delete_metadata(&path).unwrap();
    }
}
