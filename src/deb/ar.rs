use crate::error::{MDResult, MkDebError};
use ar::{Builder, Header};
use std::fs;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::PathBuf;

/// The outermost `ar` archive that contains the tarballs inside.
///
/// Creating one writes the global header and the `debian-binary` member;
/// the two tarballs are appended afterwards, in order.
pub struct DebArchive {
    out_abspath: PathBuf,
    ar_builder: Builder<File>,
    mtime_timestamp: u64,
}

impl DebArchive {
    pub fn new(out_abspath: PathBuf, mtime_timestamp: u64) -> MDResult<Self> {
        if let Some(dir) = out_abspath.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| MkDebError::IoFile("Unable to create target directory", e, dir.to_path_buf()))?;
        }
        let file = File::create(&out_abspath)
            .map_err(|e| MkDebError::IoFile("Unable to create deb file", e, out_abspath.clone()))?;

        let mut ar = Self {
            out_abspath,
            ar_builder: Builder::new(file),
            mtime_timestamp,
        };
        ar.add_bytes("debian-binary", b"2.0\n")?;
        Ok(ar)
    }

    pub fn add_control(&mut self, control_tarball: &mut File) -> MDResult<()> {
        self.add_file("control.tar.gz", control_tarball)
    }

    pub fn add_data(&mut self, data_tarball: &mut File) -> MDResult<()> {
        self.add_file("data.tar.gz", data_tarball)
    }

    fn header(&self, dest_path: &str, size: u64) -> Header {
        let mut header = Header::new(dest_path.as_bytes().to_vec(), size);
        header.set_mode(0o600);
        header.set_mtime(self.mtime_timestamp);
        header.set_uid(0);
        header.set_gid(0);
        header
    }

    fn add_bytes(&mut self, dest_path: &str, data: &[u8]) -> MDResult<()> {
        let header = self.header(dest_path, data.len() as u64);
        self.ar_builder.append(&header, data)?;
        Ok(())
    }

    fn add_file(&mut self, dest_path: &str, file: &mut File) -> MDResult<()> {
        file.seek(SeekFrom::Start(0))?;
        let size = file.metadata()?.len();
        let header = self.header(dest_path, size);
        self.ar_builder.append(&header, file)?;
        Ok(())
    }

    pub fn finish(self) -> MDResult<PathBuf> {
        Ok(self.out_abspath)
    }
}
