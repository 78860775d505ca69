use super::client::HttpClient;
use super::download_file;
use crate::error::AcquireError;
use std::fs::File;
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

/// The three cache primitives acquisition is built from.
///
/// [`FsCache`] backs them with the real filesystem and an [`HttpClient`];
/// tests plug in recording or in-memory implementations.
pub trait RawCache {
    fn exists(&self, path: &Path) -> bool;

    /// Downloads `url` into `dest`, returning the number of bytes written.
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64, AcquireError>;

    /// Copies the first archive entry whose name ends with `member` to `dest`.
    fn extract(&self, archive: &Path, member: &str, dest: &Path) -> Result<(), AcquireError>;
}

pub struct FsCache<C> {
    client: C,
}

impl<C: HttpClient> FsCache<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: HttpClient> RawCache for FsCache<C> {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn fetch(&self, url: &str, dest: &Path) -> Result<u64, AcquireError> {
        download_file(&self.client, url, dest)
    }

    fn extract(&self, archive: &Path, member: &str, dest: &Path) -> Result<(), AcquireError> {
        extract_member(archive, member, dest)
    }
}

/// Extracts the first entry of a zip archive whose name ends with `member`.
///
/// # Errors
///
/// [`AcquireError::CorruptArchive`] when the archive cannot be read or holds
/// no matching entry.
pub fn extract_member(archive: &Path, member: &str, dest: &Path) -> Result<(), AcquireError> {
    let corrupt = |reason: String| AcquireError::CorruptArchive {
        archive: archive.to_path_buf(),
        reason,
    };

    let file = File::open(archive).map_err(|e| AcquireError::io(archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| corrupt(format!("unreadable zip: {e}")))?;

    let mut names = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let entry = zip
            .by_index_raw(i)
            .map_err(|e| corrupt(format!("entry {i}: {e}")))?;
        names.push(entry.name().to_string());
    }

    let Some(index) = names.iter().position(|n| n.ends_with(member)) else {
        let preview: Vec<&str> = names.iter().take(10).map(String::as_str).collect();
        return Err(corrupt(format!(
            "{member} not found; contents: {preview:?}"
        )));
    };
    debug!(entry = %names[index], "Matched archive entry");

    let mut entry = zip
        .by_index(index)
        .map_err(|e| corrupt(format!("{}: {e}", names[index])))?;
    let mut out = File::create(dest).map_err(|e| AcquireError::io(dest, e))?;

    if let Err(e) = std::io::copy(&mut entry, &mut out) {
        drop(out);
        let _ = std::fs::remove_file(dest);
        return Err(corrupt(format!("{}: {e}", names[index])));
    }

    Ok(())
}
