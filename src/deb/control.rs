use crate::config::PackageSpec;
use crate::deb::tar::Tarball;
use crate::error::{MDResult, MkDebError};
use crate::listener::Listener;
use std::fs;
use std::io::Write;

pub struct ControlArchiveBuilder<'l, W: Write> {
    archive: Tarball<W>,
    listener: &'l dyn Listener,
}

impl<'l, W: Write> ControlArchiveBuilder<'l, W> {
    pub fn new(dest: W, time: u64, listener: &'l dyn Listener) -> Self {
        Self {
            archive: Tarball::new(dest, time),
            listener,
        }
    }

    /// Generates an uncompressed tar with `md5sums`, `conffiles`, `control`
    /// and any maintainer scripts, in that order.
    pub fn generate_archive(&mut self, spec: &PackageSpec) -> MDResult<()> {
        self.add_md5sums(&spec.calculate_checksums()?)?;
        self.add_conffiles(&spec.list_etc_files()?)?;
        self.add_control(&spec.generate_control()?)?;
        self.generate_scripts(spec)?;
        Ok(())
    }

    pub fn finish(self) -> MDResult<W> {
        Ok(self.archive.into_inner()?)
    }

    /// Appends the maintainer scripts at their bare names. Scripts get mode
    /// 0755 per Debian Policy section 10.9.
    fn generate_scripts(&mut self, spec: &PackageSpec) -> MDResult<()> {
        for (name, source) in spec.map_control_files() {
            let contents = fs::read(&source)
                .map_err(|e| MkDebError::IoFile("Failed reading maintainer script", e, source.clone()))?;
            self.listener.info(format!("{} -> {name}", source.display()));
            self.archive.file(name, &contents, 0o755)?;
        }
        Ok(())
    }

    fn add_md5sums(&mut self, sums: &[u8]) -> MDResult<()> {
        self.archive.file("md5sums", sums, 0o600)
    }

    fn add_conffiles(&mut self, list: &[String]) -> MDResult<()> {
        let mut data = list.join("\n");
        data.push('\n');
        self.archive.file("conffiles", data.as_bytes(), 0o600)
    }

    fn add_control(&mut self, control: &[u8]) -> MDResult<()> {
        self.archive.file("control", control, 0o600)
    }
}
