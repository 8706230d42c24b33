use camino::Utf8Path;

/// Best-effort short commit hash of the repository containing `dir`, or
/// `None` if `git` isn't available or `dir` isn't inside a repository
/// (§4.11: "if available").
#[must_use]
pub fn current_commit_hash(dir: &Utf8Path) -> Option<String> {
    let output = std::process::Command::new("git")
        .arg("rev-parse")
        .arg("--short")
        .arg("HEAD")
        .current_dir(dir)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    let hash = hash.trim();
    if hash.is_empty() {
        None
    } else {
        Some(hash.to_string())
    }
}
