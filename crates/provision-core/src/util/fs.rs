//! Filesystem utilities.

use provision_types::Result;
use std::path::{Path, PathBuf};
use std::fs;

/// Expand a leading tilde to the home directory.
pub fn expand_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();

    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }

    path.to_path_buf()
}

/// Read entire file as string (slurp).
pub fn slurp(path: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(path).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_leaves_plain_paths() {
        assert_eq!(expand_path("/etc/provision"), PathBuf::from("/etc/provision"));
        assert_eq!(expand_path("relative/dir"), PathBuf::from("relative/dir"));
    }

    #[test]
    fn test_slurp_missing_file_is_io_error() {
        let err = slurp("/definitely/not/here.mf").unwrap_err();
        assert!(matches!(err, provision_types::ProvisionError::Io(_)));
    }
}
