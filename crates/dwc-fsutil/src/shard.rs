//! Deterministic content-addressed shard layout, `base/ab/cd/<sha>.<ext>`,
//! shared by the local image source and the JIT cache (§4.4).

use camino::Utf8PathBuf;

use dwc_types::Sha256Hex;

/// Build the sharded path for `sha` under `base`, using the first two
/// hex-char pairs as nested directories.
#[must_use]
pub fn shard_path(base: &camino::Utf8Path, sha: &Sha256Hex, ext: &str) -> Utf8PathBuf {
    let hex = sha.as_str();
    let a = &hex[0..2];
    let b = &hex[2..4];
    base.join(a).join(b).join(format!("{hex}.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shards_by_first_two_byte_pairs() {
        let sha = Sha256Hex::of(b"hello");
        let path = shard_path(camino::Utf8Path::new("base"), &sha, "jpg");
        let hex = sha.as_str();
        let expected = format!("base/{}/{}/{}.jpg", &hex[0..2], &hex[2..4], hex);
        assert_eq!(path.as_str(), expected);
    }
}
