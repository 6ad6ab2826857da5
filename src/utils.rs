//! Shared helpers for local paths and credential display.
//!
//! These functions are reused by the library and the CLI.

use std::path::{Path, PathBuf};

use crate::storage::StorageError;

/// Gets the cross-platform local storage path.
///
/// Returns the path as `{data_dir}/rfpbot/local_storage.json` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
///
/// # Errors
///
/// Returns `NoDataDir` if the data directory cannot be determined.
pub fn get_storage_path() -> Result<PathBuf, StorageError> {
    let data_dir = dirs::data_dir().ok_or(StorageError::NoDataDir)?;

    Ok(data_dir.join("rfpbot").join("local_storage.json"))
}

/// Ensures the parent directory of `path` exists.
///
/// Creates the directory structure if it doesn't exist using `create_dir_all`.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub fn ensure_parent_directory(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    Ok(())
}

/// Masks a credential for display, keeping only its last four characters.
///
/// Credentials of four characters or fewer are masked entirely.
///
/// # Examples
///
/// ```
/// use rfpbot::utils::mask_credential;
///
/// assert_eq!(mask_credential("sk-12345678"), "*******5678");
/// assert_eq!(mask_credential("abc"), "***");
/// ```
pub fn mask_credential(credential: &str) -> String {
    let chars: Vec<char> = credential.chars().collect();
    let visible = if chars.len() > 4 { 4 } else { 0 };
    let hidden = chars.len() - visible;

    "*".repeat(hidden) + &chars[hidden..].iter().collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn get_storage_path_returns_valid_path() {
        let path = get_storage_path();
        assert!(path.is_ok());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("rfpbot"));
        assert!(path.to_string_lossy().ends_with("local_storage.json"));
    }

    #[test]
    fn ensure_parent_directory_creates_nested_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("file.json");

        ensure_parent_directory(&path).unwrap();
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn ensure_parent_directory_accepts_bare_file_name() {
        assert!(ensure_parent_directory(Path::new("answered_questions.csv")).is_ok());
    }

    #[test]
    fn mask_credential_keeps_last_four() {
        assert_eq!(mask_credential("abcdefgh"), "****efgh");
    }

    #[test]
    fn mask_credential_hides_short_values_entirely() {
        assert_eq!(mask_credential("abcd"), "****");
        assert_eq!(mask_credential(""), "");
    }
}
