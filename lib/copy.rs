//! Filesystem entry replication.
//!
//! Implements the copy half of the extraction pipeline: classifying entries
//! without following symlinks, replicating single files and symlinks, and
//! walking directory trees depth-first with selective exclusion.

use std::{
    collections::HashSet,
    fs::{self, File},
    io,
    os::unix::fs::{symlink, PermissionsExt},
    path::Path,
};

use getset::{CopyGetters, Getters};
use typed_builder::TypedBuilder;

use crate::{
    utils::{require_non_empty, TRASHES_DIRNAME},
    DmgError, DmgResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The kind of a filesystem entry, derived without following a terminal symlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,

    /// A symbolic link.
    Symlink,

    /// A directory.
    Directory,

    /// Anything else (device, socket, fifo, ...).
    Other,
}

/// Options controlling directory tree replication.
///
/// ## Example
/// ```
/// use dmgextract::CopyOptions;
///
/// let options = CopyOptions::builder()
///     .replicate_symlinks(false)
///     .build();
/// assert!(options.get_recursive());
/// ```
#[derive(Debug, Clone, TypedBuilder, CopyGetters, Getters)]
pub struct CopyOptions {
    /// Whether subdirectories are descended into and replicated. When false,
    /// only the direct non-directory children of the source are copied.
    #[builder(default = true)]
    #[getset(get_copy = "pub with_prefix")]
    recursive: bool,

    /// Whether symbolic links encountered during tree replication are
    /// replicated as links. When false they are skipped silently.
    #[builder(default = true)]
    #[getset(get_copy = "pub with_prefix")]
    replicate_symlinks: bool,

    /// Entry names skipped entirely during tree replication, regardless of
    /// their kind.
    #[builder(default = default_excluded_names())]
    #[getset(get = "pub with_prefix")]
    excluded_names: HashSet<String>,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Determines the kind of the entry at `path` without following a terminal
/// symlink.
///
/// ## Errors
/// Returns [`DmgError::NotFound`] if the path does not exist, or
/// [`DmgError::Io`] if it cannot be inspected.
pub fn classify(path: impl AsRef<Path>) -> DmgResult<EntryKind> {
    let (kind, _) = classified_metadata(path.as_ref())?;
    Ok(kind)
}

/// Copies a single file from `source` to `destination`.
///
/// A regular file is replicated byte-for-byte and its permission mode is
/// applied to the destination. A symbolic link is recreated at the
/// destination pointing at the same target text; the content it points at is
/// never read. Entries of any other kind are rejected.
///
/// ## Arguments
/// * `source` - The file or symlink to copy. Must be non-empty
/// * `destination` - The path to create. Its parent directory must exist
///
/// ## Errors
/// Returns [`DmgError::PathValidation`] for empty paths,
/// [`DmgError::NotFound`] if the source does not exist,
/// [`DmgError::UnsupportedFileType`] for entries that are neither regular
/// files nor symlinks, and [`DmgError::Io`] for any read/write/chmod/symlink
/// failure. On failure no rollback of a partially written destination is
/// attempted.
pub fn copy_file(source: impl AsRef<Path>, destination: impl AsRef<Path>) -> DmgResult<()> {
    let source = source.as_ref();
    let destination = destination.as_ref();

    require_non_empty(source, "source")?;
    require_non_empty(destination, "destination")?;

    let (kind, metadata) = classified_metadata(source)?;
    match kind {
        EntryKind::File => copy_regular_file(source, destination),
        EntryKind::Symlink => copy_symlink(source, destination),
        EntryKind::Directory | EntryKind::Other => Err(DmgError::UnsupportedFileType {
            path: source.to_path_buf(),
            mode: metadata.permissions().mode(),
        }),
    }
}

/// Recursively copies the directory tree at `source` to `destination`.
///
/// Convenience over [`copy_directory_with`] using default options with the
/// given `recursive` setting.
pub fn copy_directory(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    recursive: bool,
) -> DmgResult<()> {
    let options = CopyOptions::builder().recursive(recursive).build();
    copy_directory_with(source, destination, &options)
}

/// Copies the directory tree at `source` to `destination` according to
/// `options`.
///
/// The destination directory is created (with the source directory's
/// permission mode) before any children are written. Children are processed
/// in name order; entries whose name is in the excluded set are skipped
/// entirely. The first failure aborts the walk, leaving unprocessed siblings
/// uncopied and performing no cleanup of the partially-copied destination.
///
/// ## Errors
/// Returns [`DmgError::PathValidation`] for empty paths,
/// [`DmgError::NotFound`] if the source does not exist, and
/// [`DmgError::Io`] for any filesystem failure during the walk.
pub fn copy_directory_with(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    options: &CopyOptions,
) -> DmgResult<()> {
    let source = source.as_ref();
    let destination = destination.as_ref();

    require_non_empty(source, "source")?;
    require_non_empty(destination, "destination")?;

    let source_metadata = match fs::metadata(source) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DmgError::NotFound(source.to_path_buf()))
        }
        Err(e) => return Err(DmgError::Io(e)),
    };

    // The destination must exist before any of its children are written.
    fs::create_dir_all(destination)?;
    fs::set_permissions(destination, source_metadata.permissions())?;

    let mut entries = fs::read_dir(source)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name();
        if options
            .get_excluded_names()
            .contains(name.to_string_lossy().as_ref())
        {
            tracing::debug!("Skipping excluded entry: {}", entry.path().display());
            continue;
        }

        let entry_source = entry.path();
        let entry_destination = destination.join(&name);

        match EntryKind::from_file_type(entry.file_type()?) {
            EntryKind::Directory => {
                if options.get_recursive() {
                    copy_directory_with(&entry_source, &entry_destination, options)?;
                } else {
                    tracing::debug!(
                        "Skipping subdirectory (recursion disabled): {}",
                        entry_source.display()
                    );
                }
            }
            EntryKind::File => copy_regular_file(&entry_source, &entry_destination)?,
            EntryKind::Symlink => {
                if options.get_replicate_symlinks() {
                    copy_symlink(&entry_source, &entry_destination)?;
                } else {
                    tracing::debug!("Skipping symlink: {}", entry_source.display());
                }
            }
            EntryKind::Other => {
                tracing::debug!("Skipping unsupported entry: {}", entry_source.display());
            }
        }
    }

    Ok(())
}

/// Stats `path` without following a terminal symlink and classifies it.
fn classified_metadata(path: &Path) -> DmgResult<(EntryKind, fs::Metadata)> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DmgError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(DmgError::Io(e)),
    };

    let kind = EntryKind::from_file_type(metadata.file_type());
    Ok((kind, metadata))
}

/// Streams a regular file's bytes to `destination`, then applies the mode
/// read from the source file's own fresh status.
fn copy_regular_file(source: &Path, destination: &Path) -> DmgResult<()> {
    {
        let mut reader = File::open(source)?;
        let mut writer = File::create(destination)?;
        io::copy(&mut reader, &mut writer)?;
    }

    let source_metadata = fs::metadata(source)?;
    fs::set_permissions(destination, source_metadata.permissions())?;

    Ok(())
}

/// Recreates the symlink at `source` as a new symlink at `destination` with
/// the same target text. Works on broken links; the target is never resolved.
fn copy_symlink(source: &Path, destination: &Path) -> DmgResult<()> {
    let target = fs::read_link(source)?;
    symlink(&target, destination)?;
    Ok(())
}

fn default_excluded_names() -> HashSet<String> {
    HashSet::from([TRASHES_DIRNAME.to_string()])
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl EntryKind {
    /// Maps a raw file type to an entry kind.
    pub fn from_file_type(file_type: fs::FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::Other
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for CopyOptions {
    fn default() -> Self {
        CopyOptions::builder().build()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
