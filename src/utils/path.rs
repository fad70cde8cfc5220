//! Path helpers for user-supplied file arguments.

use std::path::PathBuf;

/// Expand a leading `~/` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(path.trim_start_matches("~/"));
    }
    PathBuf::from(path)
}

/// Same as `expand_tilde`, as an owned string for APIs taking `&str`.
pub fn expand_str(path: &str) -> String {
    expand_tilde(path).to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(expand_tilde("/tmp/a.sqlite"), PathBuf::from("/tmp/a.sqlite"));
        assert_eq!(expand_str("rel/b.zip"), "rel/b.zip");
    }

    #[test]
    fn tilde_is_expanded() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/x.csv"), home.join("x.csv"));
        }
    }
}
