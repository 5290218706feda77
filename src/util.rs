use sha2::Digest;
use std::path::{Component, Path};

pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = path.strip_prefix(base) {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// True for non-empty relative paths that never climb above their base.
pub fn is_contained_relative(rel: &str) -> bool {
    let path = Path::new(rel);
    !rel.trim().is_empty()
        && !path.is_absolute()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// `123456789/42` → `123456789-42`, the handle form used in package file names.
pub fn handle_file_token(handle: &str) -> String {
    handle.trim().replace('/', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_is_lowercase_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn contained_relative_paths_reject_escapes() {
        assert!(is_contained_relative("bitstreams/a.pdf"));
        assert!(is_contained_relative("./mets.xml"));
        assert!(!is_contained_relative("../outside.xml"));
        assert!(!is_contained_relative("/etc/passwd"));
        assert!(!is_contained_relative(""));
    }

    #[test]
    fn handle_tokens_replace_the_separator() {
        assert_eq!(handle_file_token("123456789/42"), "123456789-42");
    }
}
