/// System reboot hook consumed by `CheckpointManager::abort`.
///
/// Modeled as a trait so tests can assert `abort()` was invoked without
/// actually rebooting the test process, the same real-impl/fake split
/// `Device` uses.
pub trait RebootHook {
    fn reboot(&self);
}

/// Real implementation: asks the kernel to restart the system immediately.
///
/// A thin, unsafe syscall wrapper with no retry or recovery - a failed
/// reboot request has no sane fallback.
#[cfg(target_os = "linux")]
pub struct LinuxRebootHook;

#[cfg(target_os = "linux")]
impl RebootHook for LinuxRebootHook {
    fn reboot(&self) {
        unsafe {
            libc::sync();
            libc::reboot(libc::RB_AUTOBOOT);
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub struct LinuxRebootHook;

#[cfg(not(target_os = "linux"))]
impl RebootHook for LinuxRebootHook {
    fn reboot(&self) {
        // No reboot syscall off Linux; nothing sane to stub beyond a no-op.
    }
}

/// In-memory fake that records whether it was asked to reboot.
#[derive(Debug, Default)]
pub struct FakeRebootHook {
    pub rebooted: std::cell::Cell<bool>,
}

impl RebootHook for FakeRebootHook {
    fn reboot(&self) {
        self.rebooted.set(true);
    }
}
