//! Gzip helpers for bundles shipped in prod mode.
//!
//! When the `PROD` environment variable is set, spec, mask and custom
//! action files are distributed gzip-compressed with a `.gz` suffix; the
//! helpers here unpack them transparently.

use crate::consts;
use crate::error::Result;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decompress a gzip byte buffer.
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Read and decompress `path` (the path must point at the `.gz` file).
pub fn read_gzip_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let content = std::fs::read(path.as_ref())?;
    gunzip(&content)
}

/// The gzip sibling of a plain file path (`mask.yaml` -> `mask.yaml.gz`).
pub fn gzip_path(path: impl AsRef<Path>) -> PathBuf {
    let mut name = path.as_ref().as_os_str().to_os_string();
    name.push(consts::GZIP_SUFFIX);
    PathBuf::from(name)
}

/// Unpack `<path>.gz` next to itself, writing `path` and removing the
/// compressed original.
pub fn unzip_file(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let gz = gzip_path(path);

    debug!(path = %path.display(), "unpacking gzip bundle");
    let data = read_gzip_file(&gz)?;
    std::fs::write(path, data)?;
    std::fs::remove_file(&gz)?;

    Ok(())
}

/// Read a file honoring prod mode: in prod the gzip sibling is read and
/// decompressed, otherwise the path is read verbatim.
pub fn read_maybe_gzipped(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    if consts::prod_enabled() {
        read_gzip_file(gzip_path(path))
    } else {
        Ok(std::fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn gunzip_round_trip() {
        let packed = gzip(b"actions: {}");
        assert_eq!(gunzip(&packed).unwrap(), b"actions: {}");
    }

    #[test]
    fn unzip_file_replaces_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("mask.yaml");
        let gz = gzip_path(&plain);
        std::fs::write(&gz, gzip(b"actions: {}")).unwrap();

        unzip_file(&plain).unwrap();

        assert_eq!(std::fs::read(&plain).unwrap(), b"actions: {}");
        assert!(!gz.exists());
    }

    #[test]
    fn gzip_path_appends_suffix() {
        assert_eq!(gzip_path("spec.yaml"), PathBuf::from("spec.yaml.gz"));
    }
}
