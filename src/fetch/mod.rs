//! Raw dataset acquisition.
//!
//! [`ensure_dataset`] guarantees `<raw_dir>/<level>.csv` exists, downloading
//! the UCI archive and unpacking it only when the cached copies are missing.
//! Nothing is checksummed: a truncated archive left by an earlier failed run
//! is treated as valid input.

mod basic;
mod cache;
mod client;

pub use basic::{BasicClient, DEFAULT_TIMEOUT};
pub use cache::{FsCache, RawCache, extract_member};
pub use client::HttpClient;

use crate::config::Level;
use crate::error::AcquireError;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const UCI_BIKE_ZIP_URL: &str =
    "https://archive.ics.uci.edu/static/public/275/bike%2Bsharing%2Bdataset.zip";
pub const ARCHIVE_NAME: &str = "bike_sharing_dataset.zip";

const CHUNK_SIZE: usize = 128 * 1024;

/// Streams `url` into `dest` in bounded chunks.
///
/// A failed transfer removes the partially written file.
pub fn download_file<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    dest: &Path,
) -> Result<u64, AcquireError> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AcquireError::io(parent, e))?;
    }

    let mut body = client.get(url)?;
    let mut out = File::create(dest).map_err(|e| AcquireError::io(dest, e))?;

    let result = copy_chunked(&mut body, &mut out);
    drop(out);

    match result {
        Ok(written) => Ok(written),
        Err(e) => {
            let _ = std::fs::remove_file(dest);
            Err(AcquireError::Network {
                url: url.to_string(),
                reason: format!("transfer interrupted: {e}"),
            })
        }
    }
}

fn copy_chunked(src: &mut dyn Read, dst: &mut File) -> std::io::Result<u64> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let n = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        dst.write_all(&buf[..n])?;
        written += n as u64;
    }
    dst.flush()?;
    Ok(written)
}

/// Makes sure the CSV for `level` is present under `raw_dir` and returns its path.
///
/// When both the archive and the CSV already exist this is a pure cache
/// check: no fetch and no archive I/O goes through `cache`.
#[tracing::instrument(skip_all, fields(raw_dir = %raw_dir.display(), level = %level))]
pub fn ensure_dataset<R: RawCache + ?Sized>(
    cache: &R,
    raw_dir: &Path,
    level: Level,
) -> Result<PathBuf, AcquireError> {
    std::fs::create_dir_all(raw_dir).map_err(|e| AcquireError::io(raw_dir, e))?;

    let zip_path = raw_dir.join(ARCHIVE_NAME);
    let target_name = level.csv_name();
    let target_path = raw_dir.join(&target_name);

    if cache.exists(&target_path) && cache.exists(&zip_path) {
        info!(path = %target_path.display(), "Dataset already cached");
        return Ok(target_path);
    }

    if cache.exists(&zip_path) {
        info!(path = %zip_path.display(), "Dataset archive already exists");
    } else {
        info!(url = UCI_BIKE_ZIP_URL, path = %zip_path.display(), "Downloading dataset");
        let bytes = cache.fetch(UCI_BIKE_ZIP_URL, &zip_path)?;
        info!(bytes, "Download complete");
    }

    if cache.exists(&target_path) {
        info!(path = %target_path.display(), "CSV already extracted");
    } else {
        info!(member = %target_name, "Extracting from archive");
        cache.extract(&zip_path, &target_name, &target_path)?;
    }

    Ok(target_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut w = zip::ZipWriter::new(&mut buf);
            let opts = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            for (name, body) in entries {
                w.start_file(*name, opts).unwrap();
                w.write_all(body.as_bytes()).unwrap();
            }
            w.finish().unwrap();
        }
        buf.into_inner()
    }

    struct CannedClient {
        body: Option<Vec<u8>>,
        calls: AtomicUsize,
    }

    impl CannedClient {
        fn serving(body: Vec<u8>) -> Self {
            Self {
                body: Some(body),
                calls: AtomicUsize::new(0),
            }
        }

        fn unreachable() -> Self {
            Self {
                body: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl HttpClient for CannedClient {
        fn get(&self, url: &str) -> Result<Box<dyn Read + Send>, AcquireError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.body {
                Some(b) => Ok(Box::new(Cursor::new(b.clone()))),
                None => Err(AcquireError::Network {
                    url: url.to_string(),
                    reason: "remote returned status 503 Service Unavailable".to_string(),
                }),
            }
        }
    }

    /// Records calls and writes fixed content instead of touching the network.
    #[derive(Default)]
    struct RecordingCache {
        fetches: Cell<usize>,
        extracts: Cell<usize>,
    }

    impl RawCache for RecordingCache {
        fn exists(&self, path: &Path) -> bool {
            path.exists()
        }

        fn fetch(&self, _url: &str, dest: &Path) -> Result<u64, AcquireError> {
            self.fetches.set(self.fetches.get() + 1);
            std::fs::write(dest, b"zip").unwrap();
            Ok(3)
        }

        fn extract(&self, _archive: &Path, _member: &str, dest: &Path) -> Result<(), AcquireError> {
            self.extracts.set(self.extracts.get() + 1);
            std::fs::write(dest, "dteday,cnt\n2011-01-01,5\n").unwrap();
            Ok(())
        }
    }

    #[test]
    fn test_second_call_is_a_pure_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        let cache = RecordingCache::default();

        let first = ensure_dataset(&cache, &raw, Level::Day).unwrap();
        let content = std::fs::read(&first).unwrap();
        assert_eq!((cache.fetches.get(), cache.extracts.get()), (1, 1));

        let second = ensure_dataset(&cache, &raw, Level::Day).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, raw.join("day.csv"));
        assert_eq!((cache.fetches.get(), cache.extracts.get()), (1, 1));
        assert_eq!(std::fs::read(&second).unwrap(), content);
    }

    #[test]
    fn test_existing_archive_skips_download() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ARCHIVE_NAME), b"zip").unwrap();
        let cache = RecordingCache::default();

        ensure_dataset(&cache, dir.path(), Level::Hour).unwrap();
        assert_eq!(cache.fetches.get(), 0);
        assert_eq!(cache.extracts.get(), 1);
    }

    #[test]
    fn test_fs_cache_downloads_and_extracts_nested_member() {
        let dir = tempfile::tempdir().unwrap();
        let body = zip_bytes(&[
            ("Readme.txt", "readme"),
            ("Bike-Sharing-Dataset/hour.csv", "hr,cnt\n0,1\n"),
            ("Bike-Sharing-Dataset/day.csv", "cnt\n1\n"),
        ]);
        let cache = FsCache::new(CannedClient::serving(body));

        let path = ensure_dataset(&cache, dir.path(), Level::Hour).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hr,cnt\n0,1\n");

        ensure_dataset(&cache, dir.path(), Level::Hour).unwrap();
        assert_eq!(cache.client().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_member_is_corrupt_archive() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::new(CannedClient::serving(zip_bytes(&[("Readme.txt", "x")])));

        let err = ensure_dataset(&cache, dir.path(), Level::Day).unwrap_err();
        match err {
            AcquireError::CorruptArchive { reason, .. } => {
                assert!(reason.contains("day.csv"));
                assert!(reason.contains("Readme.txt"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join("day.csv").exists());
    }

    #[test]
    fn test_garbage_archive_is_corrupt_archive() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::new(CannedClient::serving(b"not a zip".to_vec()));

        let err = ensure_dataset(&cache, dir.path(), Level::Hour).unwrap_err();
        assert!(matches!(err, AcquireError::CorruptArchive { .. }));
    }

    #[test]
    fn test_unreachable_remote_is_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FsCache::new(CannedClient::unreachable());

        let err = ensure_dataset(&cache, dir.path(), Level::Hour).unwrap_err();
        assert!(matches!(err, AcquireError::Network { .. }));
        assert!(!dir.path().join(ARCHIVE_NAME).exists());
    }

    #[test]
    fn test_download_spans_multiple_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let body: Vec<u8> = (0..(CHUNK_SIZE * 2 + 17)).map(|i| (i % 251) as u8).collect();
        let client = CannedClient::serving(body.clone());
        let dest = dir.path().join("nested").join("file.bin");

        let written = download_file(&client, "https://example.invalid/f", &dest).unwrap();
        assert_eq!(written as usize, body.len());
        assert_eq!(std::fs::read(&dest).unwrap(), body);
    }

    /// Yields its bytes one at a time, failing with `Interrupted` before each.
    struct InterruptingReader {
        data: Cursor<Vec<u8>>,
        interrupt_next: bool,
    }

    impl Read for InterruptingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.interrupt_next = !self.interrupt_next;
            if self.interrupt_next {
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let end = buf.len().min(1);
            self.data.read(&mut buf[..end])
        }
    }

    #[test]
    fn test_copy_retries_interrupted_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let mut src = InterruptingReader {
            data: Cursor::new(b"bike".to_vec()),
            interrupt_next: false,
        };
        let mut dst = File::create(&path).unwrap();

        assert_eq!(copy_chunked(&mut src, &mut dst).unwrap(), 4);
        drop(dst);
        assert_eq!(std::fs::read(&path).unwrap(), b"bike");
    }
}
