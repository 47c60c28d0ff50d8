//! Path validation for cache-relative storage paths.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Normalizes a storage path and rejects anything that would resolve outside
/// of the backend root (leading `..`, absolute prefixes on Windows, null bytes
/// or paths that normalize to nothing).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use wallrand_storage::validate_path;
///
/// assert!(validate_path("3f/3fa9c1.png").is_ok());
/// assert!(validate_path("3f/../4e/4e01.jpg").is_ok());
/// assert!(validate_path("../index.sqlite").is_err());
/// assert!(validate_path("3f\0.png").is_err());
/// assert_eq!(
///     validate_path("./3f//./3fa9c1.png/").unwrap(),
///     Path::new("3f/3fa9c1.png")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || exn::Exn::from(ErrorKind::InvalidPath(original.to_path_buf()));
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(segment) => {
                // Null bytes survive Path::components() on Unix but truncate
                // in the underlying syscalls.
                if segment.as_encoded_bytes().contains(&0) {
                    return Err(invalid());
                }
                components.push(segment);
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => return Err(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    return Err(invalid());
                }
            },
        }
    }
    if components.is_empty() {
        return Err(invalid());
    }
    Ok(components.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert_eq!(validate("ab/abcdef.png").unwrap(), Path::new("ab/abcdef.png"));
        assert_eq!(validate("index.sqlite").unwrap(), Path::new("index.sqlite"));
    }

    #[test]
    fn test_normalization() {
        assert_eq!(validate("ab//cd").unwrap(), Path::new("ab/cd"));
        assert_eq!(validate("ab/./cd/").unwrap(), Path::new("ab/cd"));
        assert_eq!(validate("ab/cd/..").unwrap(), Path::new("ab"));
        // Leading root is stripped rather than rejected; paths are always
        // joined onto the backend root.
        assert_eq!(validate("/ab/cd.jpg").unwrap(), Path::new("ab/cd.jpg"));
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(validate("../outside.png").is_err());
        assert!(validate("ab/../../outside.png").is_err());
        assert!(validate("..").is_err());
    }

    #[test]
    fn test_empty_and_null() {
        assert!(validate("").is_err());
        assert!(validate(".").is_err());
        assert!(validate("//").is_err());
        assert!(validate("ab\0cd").is_err());
    }
}
