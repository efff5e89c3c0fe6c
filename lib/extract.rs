//! Disk image extraction orchestration.

use std::path::Path;

use crate::{
    copy_directory_with, CopyOptions, DmgError, DmgResult, HdiutilMounter, VolumeMounter,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Sequences the extraction pipeline: mount, tree copy, unmount.
///
/// Each stage's failure is wrapped with the stage it occurred in
/// ([`DmgError::MountStage`], [`DmgError::CopyStage`],
/// [`DmgError::UnmountStage`]) while preserving the underlying cause. No
/// compensating actions are attempted: a copy failure after a successful
/// mount leaves the volume mounted, and a caller that wants cleanup must
/// unmount manually.
#[derive(Debug, Default, Clone)]
pub struct Extractor<M = HdiutilMounter> {
    mounter: M,
    options: CopyOptions,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Extractor<HdiutilMounter> {
    /// Creates an extractor backed by `hdiutil` with default copy options.
    pub fn new() -> Self {
        Self {
            mounter: HdiutilMounter,
            options: CopyOptions::default(),
        }
    }
}

impl<M: VolumeMounter> Extractor<M> {
    /// Creates an extractor backed by the given mounter with default copy
    /// options.
    pub fn with_mounter(mounter: M) -> Self {
        Self {
            mounter,
            options: CopyOptions::default(),
        }
    }

    /// Replaces the copy options used by the copy stage.
    pub fn with_options(mut self, options: CopyOptions) -> Self {
        self.options = options;
        self
    }

    /// Mounts the disk image at `image_path`, copies the mounted volume's
    /// contents to `destination_path`, and unmounts the volume.
    ///
    /// ## Errors
    /// Returns the first failing stage's error, wrapping the underlying
    /// cause. A [`DmgError::CopyStage`] failure leaves the volume mounted.
    pub fn extract(
        &self,
        image_path: impl AsRef<Path>,
        destination_path: impl AsRef<Path>,
    ) -> DmgResult<()> {
        let image_path = image_path.as_ref();
        let destination_path = destination_path.as_ref();

        tracing::info!(
            "Extracting disk image {} to {}",
            image_path.display(),
            destination_path.display()
        );

        let volume_path = self
            .mounter
            .mount(image_path)
            .map_err(|e| DmgError::MountStage(Box::new(e)))?;

        copy_directory_with(&volume_path, destination_path, &self.options)
            .map_err(|e| DmgError::CopyStage(Box::new(e)))?;

        self.mounter
            .unmount(&volume_path)
            .map_err(|e| DmgError::UnmountStage(Box::new(e)))?;

        tracing::info!("Extraction complete: {}", destination_path.display());
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Mounts the disk image at `image_path` and copies the contents of the
/// mounted volume to `destination_path`, unmounting afterwards.
///
/// ## Example
/// ```no_run
/// # fn example() -> anyhow::Result<()> {
/// dmgextract::extract("app_1.0.0.dmg", "/tmp/app_payload")?;
/// # Ok(())
/// # }
/// ```
pub fn extract(
    image_path: impl AsRef<Path>,
    destination_path: impl AsRef<Path>,
) -> DmgResult<()> {
    Extractor::new().extract(image_path, destination_path)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{cell::Cell, fs, path::PathBuf};

    use tempfile::TempDir;

    use super::*;

    /// A mounter whose volume is an ordinary directory, recording how often
    /// each primitive is invoked.
    struct StubMounter {
        volume_path: PathBuf,
        fail_mount: bool,
        fail_unmount: bool,
        mount_calls: Cell<usize>,
        unmount_calls: Cell<usize>,
    }

    impl StubMounter {
        fn new(volume_path: PathBuf) -> Self {
            Self {
                volume_path,
                fail_mount: false,
                fail_unmount: false,
                mount_calls: Cell::new(0),
                unmount_calls: Cell::new(0),
            }
        }
    }

    impl VolumeMounter for &StubMounter {
        fn mount(&self, _image_path: &Path) -> DmgResult<PathBuf> {
            self.mount_calls.set(self.mount_calls.get() + 1);
            if self.fail_mount {
                return Err(DmgError::MountFailed("stub mount failure".to_string()));
            }
            Ok(self.volume_path.clone())
        }

        fn unmount(&self, _volume_path: &Path) -> DmgResult<()> {
            self.unmount_calls.set(self.unmount_calls.get() + 1);
            if self.fail_unmount {
                return Err(DmgError::UnmountFailed("stub unmount failure".to_string()));
            }
            Ok(())
        }
    }

    #[test_log::test]
    fn test_extract_copies_volume_and_unmounts() {
        let temp = TempDir::new().unwrap();
        let volume = temp.path().join("volume");
        let destination = temp.path().join("destination");

        fs::create_dir_all(volume.join("app")).unwrap();
        fs::write(volume.join("app/payload.txt"), "payload").unwrap();

        let mounter = StubMounter::new(volume);
        Extractor::with_mounter(&mounter)
            .extract("image.dmg", &destination)
            .unwrap();

        assert_eq!(
            fs::read(destination.join("app/payload.txt")).unwrap(),
            b"payload"
        );
        assert_eq!(mounter.mount_calls.get(), 1);
        assert_eq!(mounter.unmount_calls.get(), 1);
    }

    #[test_log::test]
    fn test_extract_mount_failure_runs_no_further_stage() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("destination");

        let mut mounter = StubMounter::new(temp.path().join("volume"));
        mounter.fail_mount = true;

        let err = Extractor::with_mounter(&mounter)
            .extract("image.dmg", &destination)
            .unwrap_err();

        assert!(matches!(err, DmgError::MountStage(_)));
        assert_eq!(mounter.unmount_calls.get(), 0);
        assert!(!destination.exists());
    }

    #[test_log::test]
    fn test_extract_copy_failure_leaves_volume_mounted() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("destination");

        // The stub reports a volume path that does not exist, so the copy
        // stage fails after a successful mount.
        let mounter = StubMounter::new(temp.path().join("missing_volume"));

        let err = Extractor::with_mounter(&mounter)
            .extract("image.dmg", &destination)
            .unwrap_err();

        assert!(matches!(err, DmgError::CopyStage(_)));
        assert_eq!(mounter.mount_calls.get(), 1);
        assert_eq!(mounter.unmount_calls.get(), 0);
    }

    #[test_log::test]
    fn test_extract_unmount_failure() {
        let temp = TempDir::new().unwrap();
        let volume = temp.path().join("volume");
        let destination = temp.path().join("destination");

        fs::create_dir_all(&volume).unwrap();
        fs::write(volume.join("file.txt"), "data").unwrap();

        let mut mounter = StubMounter::new(volume);
        mounter.fail_unmount = true;

        let err = Extractor::with_mounter(&mounter)
            .extract("image.dmg", &destination)
            .unwrap_err();

        assert!(matches!(err, DmgError::UnmountStage(_)));
        assert!(destination.join("file.txt").exists());
    }

    #[test_log::test]
    fn test_extract_respects_copy_options() {
        let temp = TempDir::new().unwrap();
        let volume = temp.path().join("volume");
        let destination = temp.path().join("destination");

        fs::create_dir_all(volume.join("sub")).unwrap();
        fs::write(volume.join("top.txt"), "top").unwrap();
        fs::write(volume.join("sub/inner.txt"), "inner").unwrap();

        let mounter = StubMounter::new(volume);
        let options = CopyOptions::builder().recursive(false).build();
        Extractor::with_mounter(&mounter)
            .with_options(options)
            .extract("image.dmg", &destination)
            .unwrap();

        assert!(destination.join("top.txt").exists());
        assert!(!destination.join("sub").exists());
    }

    #[test_log::test]
    fn test_extract_rejects_empty_image_path() {
        let err = extract("", "/tmp/unused_destination").unwrap_err();
        assert!(
            matches!(err, DmgError::MountStage(cause) if matches!(cause.as_ref(), DmgError::PathValidation(_)))
        );
    }
}
