//! Read-back measurement of exported files.
//!
//! Sizes and hashes in the loadfile always come from the persisted bytes,
//! never from what the exporter believes it wrote.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{PstError, Result};

/// Size and optional MD5 of a file as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    pub size: u64,
    /// Lowercase hex MD5, when requested.
    pub md5: Option<String>,
}

/// A file to measure, and whether its hash is needed.
#[derive(Debug, Clone)]
pub struct DigestRequest {
    pub path: PathBuf,
    pub with_hash: bool,
}

/// Measure one file by mapping it and reading its bytes.
pub fn digest_file(path: &Path, with_hash: bool) -> Result<FileDigest> {
    let file = File::open(path).map_err(|e| PstError::io(path, e))?;

    // Zero-length files cannot be mapped.
    if file.metadata().map_err(|e| PstError::io(path, e))?.len() == 0 {
        return Ok(FileDigest {
            size: 0,
            md5: with_hash.then(|| format!("{:x}", md5::compute(b""))),
        });
    }

    // Safety: the file was created by this run and is not modified while mapped.
    let map = unsafe { Mmap::map(&file) }.map_err(|e| PstError::io(path, e))?;
    Ok(FileDigest {
        size: map.len() as u64,
        md5: with_hash.then(|| format!("{:x}", md5::compute(&map[..]))),
    })
}

/// Measure many files on a pool of `workers` threads (0 = one per core).
///
/// Results come back in request order.
pub fn digest_files(requests: &[DigestRequest], workers: usize) -> Result<Vec<FileDigest>> {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
    debug!(
        files = requests.len(),
        threads = pool.current_num_threads(),
        "Measuring exported files"
    );
    pool.install(|| {
        requests
            .par_iter()
            .map(|req| digest_file(&req.path, req.with_hash))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_known_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"Data").unwrap();
        let digest = digest_file(&path, true).unwrap();
        assert_eq!(digest.size, 4);
        assert_eq!(
            digest.md5.as_deref(),
            Some("f6068daa29dbb05a7ead1e3b5a48bbee")
        );
    }

    #[test]
    fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();
        let digest = digest_file(&path, true).unwrap();
        assert_eq!(digest.size, 0);
        assert_eq!(
            digest.md5.as_deref(),
            Some("d41d8cd98f00b204e9800998ecf8427e")
        );
    }

    #[test]
    fn test_size_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello").unwrap();
        assert_eq!(
            digest_file(&path, false).unwrap(),
            FileDigest { size: 5, md5: None }
        );
    }

    #[test]
    fn test_parallel_results_keep_order() {
        let dir = tempfile::tempdir().unwrap();
        let requests: Vec<DigestRequest> = (0..32)
            .map(|i| {
                let path = dir.path().join(format!("{i}.bin"));
                std::fs::write(&path, vec![b'x'; i]).unwrap();
                DigestRequest {
                    path,
                    with_hash: i % 2 == 0,
                }
            })
            .collect();
        let digests = digest_files(&requests, 4).unwrap();
        for (i, d) in digests.iter().enumerate() {
            assert_eq!(d.size, i as u64);
            assert_eq!(d.md5.is_some(), i % 2 == 0);
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = digest_file(Path::new("/nonexistent/file.bin"), true).unwrap_err();
        assert!(matches!(err, PstError::Io { .. }));
    }
}
