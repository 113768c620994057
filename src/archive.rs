//! Backup archives of server working directories.
//!
//! An archive is a single zip over `<servers_dir>/<id>/`, written to
//! `<backups_dir>/<id>.zip`. Exclusions use gitignore syntax; by default any
//! `libraries/` directory (downloaded server jars) and every dot-prefixed
//! file or directory are left out.
//!
//! The zip is written to `<id>.zip.partial` and renamed into place, so an
//! interrupted stop never leaves a truncated backup where a good one was.

use crate::error::{Error, Result};
use crate::workspace::{archive_name, ServerDirs, ServerId};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Gitignore-style patterns excluded from every archive.
pub const DEFAULT_EXCLUDES: &[&str] = &["libraries/", ".*"];

/// An archive read back into memory, ready to be stored with the record.
#[derive(Clone, PartialEq, Eq)]
pub struct ArchiveArtifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ArchiveArtifact {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl std::fmt::Debug for ArchiveArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveArtifact")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Archiver {
    dirs: ServerDirs,
    excludes: Gitignore,
}

impl Archiver {
    pub fn new(dirs: ServerDirs) -> Result<Self> {
        Self::with_excludes(dirs, DEFAULT_EXCLUDES)
    }

    pub fn with_excludes<S: AsRef<str>>(dirs: ServerDirs, patterns: &[S]) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(dirs.servers_dir());
        for pattern in patterns {
            builder.add_line(None, pattern.as_ref()).map_err(|e| {
                Error::Config(format!(
                    "Invalid archive exclude pattern '{}': {}",
                    pattern.as_ref(),
                    e
                ))
            })?;
        }
        let excludes = builder
            .build()
            .map_err(|e| Error::Config(format!("Invalid archive exclude patterns: {}", e)))?;
        Ok(Self { dirs, excludes })
    }

    /// Zip a server's working directory and read the result back.
    ///
    /// Any previous archive for `id` is replaced. Fails with
    /// [`Error::ServerNotFound`] if the working directory is missing.
    #[tracing::instrument(skip(self, id), fields(server = %id))]
    pub async fn archive(&self, id: &ServerId) -> Result<ArchiveArtifact> {
        let source = self.dirs.ensure_exists(id)?;
        let dest = self.dirs.backup_path(id);
        let excludes = self.excludes.clone();

        let dest_for_task = dest.clone();
        let entries = tokio::task::spawn_blocking(move || {
            write_archive(&source, &dest_for_task, &excludes)
        })
        .await
        .map_err(|e| Error::archive(id.as_str(), format!("archive task failed: {}", e)))?
        .map_err(|e| Error::archive_io(id.as_str(), "failed to write zip", e))?;

        let bytes = tokio::fs::read(&dest)
            .await
            .map_err(|e| Error::archive_io(id.as_str(), "failed to read back zip", e))?;

        info!(
            "Archived {} file(s) into {} ({} bytes)",
            entries,
            dest.display(),
            bytes.len()
        );

        Ok(ArchiveArtifact {
            name: archive_name(id),
            bytes,
        })
    }
}

/// Write `source` into a zip at `dest` through a `.partial` sibling.
/// Returns the number of files stored.
fn write_archive(source: &Path, dest: &Path, excludes: &Gitignore) -> io::Result<usize> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let partial = partial_path(dest);

    match zip_tree(source, &partial, excludes) {
        Ok(count) => {
            fs::rename(&partial, dest)?;
            Ok(count)
        }
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e)
        }
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    dest.with_file_name(name)
}

fn zip_tree(source: &Path, out: &Path, excludes: &Gitignore) -> io::Result<usize> {
    let file = File::create(out)?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut count = 0;
    add_dir(&mut zip, source, Path::new(""), excludes, options, &mut count)?;
    let file = zip.finish()?;
    file.sync_all()?;
    Ok(count)
}

fn add_dir<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    root: &Path,
    rel: &Path,
    excludes: &Gitignore,
    options: FileOptions,
    count: &mut usize,
) -> io::Result<()> {
    let mut entries = fs::read_dir(root.join(rel))?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let rel_path = rel.join(entry.file_name());
        let file_type = entry.file_type()?;
        let is_dir = file_type.is_dir();

        if excludes.matched(&rel_path, is_dir).is_ignore() {
            trace!("Excluding {}", rel_path.display());
            continue;
        }

        let name = entry_name(&rel_path);
        if is_dir {
            zip.add_directory(name, options)?;
            add_dir(zip, root, &rel_path, excludes, options, count)?;
        } else if file_type.is_file() {
            zip.start_file(name, options)?;
            let mut input = File::open(entry.path())?;
            io::copy(&mut input, zip)?;
            *count += 1;
        } else {
            debug!("Skipping non-regular file {}", rel_path.display());
        }
    }
    Ok(())
}

/// Zip entry names always use `/`.
fn entry_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
