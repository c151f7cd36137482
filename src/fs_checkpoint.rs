use crate::error::Result;

/// Filesystem-level checkpointing helper: remount a `checkpoint_fs`
/// mount with the `checkpoint=enable` option, preserving its prior mount
/// flags and OR-ing in `MS_REMOUNT`.
///
/// The real syscall path is Linux-only; other targets get a harmless stub
/// rather than a compile error.
#[cfg(target_os = "linux")]
pub fn remount_with_checkpoint(mount_point: &str, prior_flags: u64) -> Result<()> {
    use std::ffi::CString;

    let target = CString::new(mount_point).map_err(|_| {
        crate::error::Error::InvalidArgument(format!(
            "mount point '{mount_point}' contains an interior NUL"
        ))
    })?;
    let fstype = CString::new("none").unwrap();
    let data = CString::new("checkpoint=enable").unwrap();
    let flags = (prior_flags as libc::c_ulong) | libc::MS_REMOUNT;

    let ret = unsafe {
        libc::mount(
            std::ptr::null(),
            target.as_ptr(),
            fstype.as_ptr(),
            flags,
            data.as_ptr() as *const libc::c_void,
        )
    };

    if ret != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn remount_with_checkpoint(_mount_point: &str, _prior_flags: u64) -> Result<()> {
    Ok(())
}

/// Filesystem types this crate treats as supporting `checkpoint=enable`
/// remounts. f2fs is the journaling filesystem mobile storage daemons
/// checkpoint in practice; other fstypes are skipped during commit.
pub const CHECKPOINTING_FS_TYPE: &str = "f2fs";
