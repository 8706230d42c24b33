use std::fs::File;
use std::io::{Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::OutputError;

static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleFormat {
    Simple,
    Rich,
}

/// Validates `version` against `^\d+\.\d+\.\d+$` and builds the DwC-A file
/// name (§4.12). `Rich` embeds a UTC timestamp, short git commit, and input
/// filter hash so repeated runs over different inputs don't collide.
pub fn archive_name(
    version: &str,
    format: BundleFormat,
    utc_compact: &str,
    git_short: Option<&str>,
    filter_hash: Option<&str>,
) -> Result<String, OutputError> {
    if !VERSION_PATTERN.is_match(version) {
        return Err(OutputError::InvalidVersion(version.to_string()));
    }
    Ok(match format {
        BundleFormat::Simple => format!("dwca_v{version}.zip"),
        BundleFormat::Rich => format!(
            "dwca_v{version}_{utc_compact}_{}_{}.zip",
            git_short.unwrap_or("nogit"),
            filter_hash.unwrap_or("nofilter"),
        ),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleFileStats {
    pub name: String,
    pub sha256: String,
    pub size_bytes: u64,
}

/// Zips `files` (name in the archive, source path on disk) into
/// `dest_dir/<archive_name>`, returning the bundle path and per-file
/// checksums for the manifest (§4.12).
pub fn write_bundle(
    dest_dir: &Utf8Path,
    version: &str,
    format: BundleFormat,
    utc_compact: &str,
    git_short: Option<&str>,
    filter_hash: Option<&str>,
    files: &[(&str, Utf8PathBuf)],
    compress: bool,
) -> Result<(Utf8PathBuf, Vec<BundleFileStats>), OutputError> {
    let name = archive_name(version, format, utc_compact, git_short, filter_hash)?;
    std::fs::create_dir_all(dest_dir).map_err(|source| OutputError::Io {
        path: dest_dir.to_path_buf(),
        source,
    })?;
    let bundle_path = dest_dir.join(&name);

    let file = File::create(&bundle_path).map_err(|source| OutputError::Io {
        path: bundle_path.clone(),
        source,
    })?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(if compress {
        CompressionMethod::Deflated
    } else {
        CompressionMethod::Stored
    });

    let mut stats = Vec::with_capacity(files.len());
    for (entry_name, source_path) in files {
        let mut bytes = Vec::new();
        File::open(source_path)
            .and_then(|mut f| f.read_to_end(&mut bytes))
            .map_err(|source| OutputError::Io {
                path: source_path.clone(),
                source,
            })?;

        zip.start_file(*entry_name, options)?;
        zip.write_all(&bytes)?;

        stats.push(BundleFileStats {
            name: (*entry_name).to_string(),
            sha256: dwc_types::Sha256Hex::of(&bytes).to_string(),
            size_bytes: bytes.len() as u64,
        });
    }
    zip.finish()?;

    Ok((bundle_path, stats))
}
