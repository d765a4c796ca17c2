use crate::config::PackageSpec;
use crate::deb::tar::Tarball;
use crate::error::{MDResult, MkDebError};
use crate::listener::Listener;
use std::fs;
use std::io::Write;
use std::time::UNIX_EPOCH;

/// Streams every payload file into an uncompressed tar written to `dest`,
/// under `./{normalized}` names. Files are copied header-then-contents and
/// never fully buffered.
pub fn generate_archive<W: Write>(dest: W, spec: &PackageSpec, time: u64, listener: &dyn Listener) -> MDResult<W> {
    let mut archive = Tarball::new(dest, time);

    for source in spec.list_files()? {
        let target = spec.normalize_filename(&source)?;

        if spec.preserve_symlinks {
            let meta = fs::symlink_metadata(&source)
                .map_err(|e| MkDebError::IoFile("Failed to stat", e, source.clone()))?;
            if meta.is_symlink() {
                let link_name = fs::read_link(&source)
                    .map_err(|e| MkDebError::IoFile("Unable to read symlink", e, source.clone()))?;
                listener.progress("Linking", format!("{} -> ./{target}", source.display()));
                archive.symlink(&target, &link_name)?;
                continue;
            }
        }

        let file = fs::File::open(&source)
            .map_err(|e| MkDebError::IoFile("Unable to open file", e, source.clone()))?;
        let meta = file.metadata()
            .map_err(|e| MkDebError::IoFile("Failed to stat", e, source.clone()))?;
        listener.progress("Adding", format!("{} -> ./{target}", source.display()));
        archive.stream_file(&target, file, meta.len(), file_mode(&meta), mtime_secs(&meta))?;
    }

    archive.into_inner().map_err(MkDebError::from)
}

#[cfg(unix)]
fn file_mode(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() { 0o444 } else { 0o644 }
}

fn mtime_secs(meta: &fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs())
}
