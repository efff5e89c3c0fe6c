use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of a dmgextract operation.
pub type DmgResult<T> = Result<T, DmgError>;

/// An error that occurred while mounting, copying, or unmounting a disk image volume.
#[derive(pretty_error_debug::Debug, Error)]
pub enum DmgError {
    /// A path argument failed validation.
    #[error("path validation error: {0}")]
    PathValidation(String),

    /// The path does not exist.
    #[error("path does not exist: {0}")]
    NotFound(PathBuf),

    /// IO error during a filesystem operation.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The entry's file type cannot be replicated.
    #[error("unsupported file type (mode {mode:o}): {path}")]
    UnsupportedFileType {
        /// The path of the offending entry.
        path: PathBuf,

        /// The raw mode bits reported for the entry.
        mode: u32,
    },

    /// The external mount primitive failed to start, run, or produce usable output.
    #[error("mount failed: {0}")]
    MountFailed(String),

    /// The external unmount primitive failed to start or exited abnormally.
    #[error("unmount failed: {0}")]
    UnmountFailed(String),

    /// The mount stage of an extraction failed. No further stages were run.
    #[error("failed to mount the volume: {0}")]
    MountStage(#[source] Box<DmgError>),

    /// The copy stage of an extraction failed. The volume is left mounted.
    #[error("failed to copy contents of the volume: {0}")]
    CopyStage(#[source] Box<DmgError>),

    /// The unmount stage of an extraction failed.
    #[error("failed to unmount the volume: {0}")]
    UnmountStage(#[source] Box<DmgError>),

    /// An error that can represent any error.
    #[error(transparent)]
    Custom(#[from] AnyError),
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DmgError {
    /// Creates a new `Err` result.
    pub fn custom(error: impl Into<anyhow::Error>) -> DmgError {
        DmgError::Custom(AnyError {
            error: error.into(),
        })
    }
}

impl AnyError {
    /// Downcasts the error to a `T`.
    pub fn downcast<T>(&self) -> Option<&T>
    where
        T: Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<T>()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates an `Ok` `DmgResult`.
#[allow(non_snake_case)]
pub fn Ok<T>(value: T) -> DmgResult<T> {
    Result::Ok(value)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl PartialEq for AnyError {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string()
    }
}

impl Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Error for AnyError {}
