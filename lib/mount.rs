//! Volume mount and unmount operations.
//!
//! The external disk-image primitive is modeled as an injectable
//! [`VolumeMounter`] capability so the extraction pipeline can be exercised
//! deterministically with a stand-in implementation.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use crate::{utils::require_non_empty, DmgError, DmgResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The external disk-image primitive invoked for attach and unmount.
const HDIUTIL_COMMAND: &str = "hdiutil";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The capability boundary for the external disk-image primitive.
///
/// A mounted volume path is valid only between a successful [`mount`] and the
/// corresponding [`unmount`]; neither operation verifies that the path exists.
///
/// [`mount`]: VolumeMounter::mount
/// [`unmount`]: VolumeMounter::unmount
pub trait VolumeMounter {
    /// Mounts the disk image at `image_path` and returns the path of the
    /// resulting volume.
    fn mount(&self, image_path: &Path) -> DmgResult<PathBuf>;

    /// Unmounts the volume at `volume_path`.
    fn unmount(&self, volume_path: &Path) -> DmgResult<()>;
}

/// A [`VolumeMounter`] backed by the `hdiutil` command.
#[derive(Debug, Default, Clone, Copy)]
pub struct HdiutilMounter;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Mounts the disk image at `image_path` with [`HdiutilMounter`].
///
/// ## Example
/// ```no_run
/// # fn example() -> anyhow::Result<()> {
/// let volume_path = dmgextract::mount("app_1.0.0.dmg")?;
/// # Ok(())
/// # }
/// ```
pub fn mount(image_path: impl AsRef<Path>) -> DmgResult<PathBuf> {
    HdiutilMounter.mount(image_path.as_ref())
}

/// Unmounts the volume at `volume_path` with [`HdiutilMounter`].
pub fn unmount(volume_path: impl AsRef<Path>) -> DmgResult<()> {
    HdiutilMounter.unmount(volume_path.as_ref())
}

/// Extracts the mounted volume path from `hdiutil attach` output.
///
/// The output is tab-delimited text with a fixed column order; the volume
/// path is the last field after trimming. Returns `None` when the last field
/// trims to nothing.
fn parse_attach_output(output: &str) -> Option<PathBuf> {
    let field = output.split('\t').next_back()?.trim();
    if field.is_empty() {
        return None;
    }

    Some(PathBuf::from(field))
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl VolumeMounter for HdiutilMounter {
    fn mount(&self, image_path: &Path) -> DmgResult<PathBuf> {
        require_non_empty(image_path, "image")?;

        tracing::info!("Attaching disk image at {}", image_path.display());

        let output = Command::new(HDIUTIL_COMMAND)
            .arg("attach")
            .arg("-nobrowse")
            .arg(image_path)
            .output()
            .map_err(|e| {
                DmgError::MountFailed(format!("failed to run {}: {}", HDIUTIL_COMMAND, e))
            })?;

        if !output.status.success() {
            return Err(DmgError::MountFailed(format!(
                "{} attach exited with status {}: {}",
                HDIUTIL_COMMAND,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let volume_path = parse_attach_output(&stdout).ok_or_else(|| {
            DmgError::MountFailed(format!(
                "{} attach produced no usable volume path",
                HDIUTIL_COMMAND
            ))
        })?;

        tracing::info!("Mounted volume at {}", volume_path.display());
        Ok(volume_path)
    }

    fn unmount(&self, volume_path: &Path) -> DmgResult<()> {
        require_non_empty(volume_path, "volume")?;

        tracing::info!("Unmounting volume at {}", volume_path.display());

        let status = Command::new(HDIUTIL_COMMAND)
            .arg("unmount")
            .arg(volume_path)
            .status()
            .map_err(|e| {
                DmgError::UnmountFailed(format!("failed to run {}: {}", HDIUTIL_COMMAND, e))
            })?;

        if !status.success() {
            return Err(DmgError::UnmountFailed(format!(
                "{} unmount exited with status: {}",
                HDIUTIL_COMMAND, status
            )));
        }

        tracing::info!("Successfully unmounted volume at {}", volume_path.display());
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn test_parse_attach_output() {
        assert_eq!(
            parse_attach_output("a\tb\t/Volumes/Test\n"),
            Some(PathBuf::from("/Volumes/Test"))
        );

        // A single field is returned whole, trimmed.
        assert_eq!(
            parse_attach_output("  /Volumes/Only \n"),
            Some(PathBuf::from("/Volumes/Only"))
        );

        assert_eq!(
            parse_attach_output("/dev/disk2s1 \tApple_HFS \t/Volumes/dmgextract test_0.0.1\n"),
            Some(PathBuf::from("/Volumes/dmgextract test_0.0.1"))
        );

        assert_eq!(parse_attach_output(""), None);
        assert_eq!(parse_attach_output("a\tb\t \n"), None);
    }

    #[test_log::test]
    fn test_mount_rejects_empty_image_path() {
        let err = mount(Path::new("")).unwrap_err();
        assert!(matches!(err, DmgError::PathValidation(_)));
    }

    #[test_log::test]
    fn test_unmount_rejects_empty_volume_path() {
        let err = unmount(Path::new("")).unwrap_err();
        assert!(matches!(err, DmgError::PathValidation(_)));
    }
}
