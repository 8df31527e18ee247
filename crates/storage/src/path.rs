//! Path validation for document lookups.
//!
//! Edition filenames come from an untrusted manifest, so every lookup is
//! normalized here before it reaches a backend.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a document path relative to the store root.
///
/// Resolves `.` and `..` components without touching the filesystem and
/// rejects anything that would leave the root, absolute Windows prefixes,
/// null bytes and paths that normalize to nothing.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use editions_storage::validate_path;
///
/// assert_eq!(validate_path("Edition 9.pdf").unwrap(), Path::new("Edition 9.pdf"));
/// assert_eq!(validate_path("/archive/./Edition 3.pdf").unwrap(), Path::new("archive/Edition 3.pdf"));
/// assert!(validate_path("../secrets.pdf").is_err());
/// assert!(validate_path("Edition\09.pdf").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(original.to_path_buf());
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(segment) => {
                // Null bytes survive Path::components() on Unix but truncate
                // C-based syscalls.
                if segment.as_encoded_bytes().contains(&0) {
                    exn::bail!(invalid());
                }
                components.push(segment);
            },
            // A leading slash is how manifests and URLs spell "from the root".
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    if components.is_empty() {
        exn::bail!(invalid());
    }
    Ok(components.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Edition 9.pdf", "Edition 9.pdf")]
    #[case("Edition 7  (1).pdf", "Edition 7  (1).pdf")]
    #[case("/Edition 5.pdf", "Edition 5.pdf")]
    #[case("archive//Edition 3.pdf", "archive/Edition 3.pdf")]
    #[case("archive/old/../Edition 3.pdf", "archive/Edition 3.pdf")]
    #[case("index.json/", "index.json")]
    fn test_normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("//")]
    #[case("..")]
    #[case("../Edition 9.pdf")]
    #[case("archive/../../Edition 9.pdf")]
    #[case("Edition\09.pdf")]
    fn test_rejects(#[case] input: &str) {
        let err = validate(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }
}
