use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

/// Default extension filter: `{.jpg, .jpeg, .png}` (§4.11, §6).
#[must_use]
pub fn default_extensions() -> Vec<String> {
    vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()]
}

/// Enumerates `input_dir` for files whose extension case-insensitively
/// matches `extensions`, in stable (lexicographic path) order (§4.11).
///
/// Non-UTF-8 paths are skipped rather than failing the whole enumeration —
/// an input directory is user-controlled and a single odd filename
/// shouldn't abort the run.
#[must_use]
pub fn enumerate_inputs(input_dir: &Utf8Path, extensions: &[String]) -> Vec<Utf8PathBuf> {
    let wanted: Vec<String> = extensions.iter().map(|e| e.to_lowercase()).collect();

    let mut paths: Vec<Utf8PathBuf> = WalkDir::new(input_dir.as_std_path())
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.into_path()).ok())
        .filter(|path| {
            path.extension()
                .map(|ext| wanted.iter().any(|w| w == &ext.to_lowercase()))
                .unwrap_or(false)
        })
        .collect();

    paths.sort();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_only_recognized_extensions_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::write(base.join("b.JPG"), b"x").unwrap();
        std::fs::write(base.join("a.png"), b"x").unwrap();
        std::fs::write(base.join("ignore.txt"), b"x").unwrap();
        std::fs::create_dir(base.join("sub")).unwrap();
        std::fs::write(base.join("sub/c.jpeg"), b"x").unwrap();

        let found = enumerate_inputs(&base, &default_extensions());
        let names: Vec<String> = found
            .iter()
            .map(|p| p.strip_prefix(&base).unwrap().to_string())
            .collect();

        assert_eq!(names, vec!["a.png", "b.JPG", "sub/c.jpeg"]);
    }

    #[test]
    fn empty_input_dir_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        assert!(enumerate_inputs(&base, &default_extensions()).is_empty());
    }
}
