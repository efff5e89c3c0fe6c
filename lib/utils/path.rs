//! Path utilities.

use std::path::Path;

use crate::{DmgError, DmgResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The name of the volume trash folder that tree replication skips by default.
pub const TRASHES_DIRNAME: &str = ".Trashes";

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Validates that a path argument is non-empty.
///
/// ## Arguments
/// * `path` - The path to validate
/// * `name` - The argument name used in the error message
pub(crate) fn require_non_empty(path: &Path, name: &str) -> DmgResult<()> {
    if path.as_os_str().is_empty() {
        return Err(DmgError::PathValidation(format!(
            "{} path cannot be empty",
            name
        )));
    }

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_non_empty() {
        assert!(require_non_empty(Path::new("/Volumes/Test"), "source").is_ok());
        assert!(require_non_empty(Path::new("relative/path"), "source").is_ok());

        let err = require_non_empty(Path::new(""), "destination").unwrap_err();
        assert!(matches!(
            err,
            DmgError::PathValidation(msg) if msg.contains("destination")
        ));
    }
}
