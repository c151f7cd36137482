/// The A/B boot-control HAL query surface this crate consumes.
///
/// The HAL may be entirely absent at runtime; call sites hold an
/// `Option<Box<dyn BootControlHal>>` and treat `None` the same as a present
/// HAL that answers "no information."
pub trait BootControlHal {
    /// The slot suffix (e.g. `"_a"`) in effect right now, if known.
    fn current_slot_suffix(&self) -> Option<String>;

    /// Whether the current slot has been marked successful, if known.
    fn is_current_slot_successful(&self) -> Option<bool>;
}

/// In-memory fake used in tests, the same fake-in-tests pattern as the
/// real file-backed `Device`.
#[derive(Debug, Clone, Default)]
pub struct FakeBootControlHal {
    pub suffix: Option<String>,
    pub successful: Option<bool>,
}

impl FakeBootControlHal {
    pub fn new(suffix: impl Into<String>, successful: bool) -> Self {
        Self {
            suffix: Some(suffix.into()),
            successful: Some(successful),
        }
    }

    /// A HAL that is present but reports no information, distinct from the
    /// absent (`None`) case at the `CheckpointManager` call site.
    pub fn unknown() -> Self {
        Self {
            suffix: None,
            successful: None,
        }
    }
}

impl BootControlHal for FakeBootControlHal {
    fn current_slot_suffix(&self) -> Option<String> {
        self.suffix.clone()
    }

    fn is_current_slot_successful(&self) -> Option<bool> {
        self.successful
    }
}
