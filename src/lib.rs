/*!

Builds Debian binary packages (`.deb`) from a JSON config file plus a
directory of payload files, without any dpkg tooling. A `.deb` is an `ar`
archive holding `debian-binary`, `control.tar.gz` and `data.tar.gz`; this
crate assembles all three from a [`PackageSpec`].

```no_run
use mkdeb::listener::NoOpListener;
use mkdeb::PackageSpec;
use std::path::Path;

let mut spec = PackageSpec::from_file(Path::new("mkdeb.json"))?;
spec.version = "1.0".to_owned();
let built = spec.build(Path::new("output"), &NoOpListener)?;
println!("{}", built.display());
# Ok::<(), mkdeb::MkDebError>(())
```

See <https://www.debian.org/doc/debian-policy/ch-controlfields.html> and
<https://www.debian.org/doc/manuals/debian-faq/ch-pkg_basics.en.html>.
*/

pub mod deb {
    pub mod ar;
    pub mod control;
    pub mod data;
    pub(crate) mod tar;
}
pub mod listener;

mod config;
mod error;
mod inventory;

pub use crate::config::{PackageSpec, SUPPORTED_ARCHITECTURES};
pub use crate::deb::ar::DebArchive;
pub use crate::error::*;

use crate::deb::control::ControlArchiveBuilder;
use crate::listener::Listener;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;

impl PackageSpec {
    /// Assembles the `.deb` into `target_dir`, creating the directory if
    /// needed. The file name is derived from [`PackageSpec::filename`].
    ///
    /// The two tarballs are staged in scratch files (inside `tempPath` when
    /// set, otherwise the working directory) and removed before this
    /// returns, on success and on error alike.
    pub fn build(&mut self, target_dir: &Path, listener: &dyn Listener) -> MDResult<PathBuf> {
        self.validate(true)?;
        self.installed_size = self.calculate_size()?;

        let build_started = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let mut deb = DebArchive::new(target_dir.join(self.filename()), build_started)?;

        {
            let mut scratch = self.scratch_file("control")?;
            let mut builder = ControlArchiveBuilder::new(
                GzEncoder::new(scratch.as_file_mut(), Compression::default()),
                build_started,
                listener,
            );
            builder.generate_archive(self)?;
            builder.finish()?.finish()?;
            deb.add_control(scratch.as_file_mut())?;
        }

        {
            let mut scratch = self.scratch_file("data")?;
            let encoder = GzEncoder::new(scratch.as_file_mut(), Compression::default());
            deb::data::generate_archive(encoder, self, build_started, listener)?.finish()?;
            deb.add_data(scratch.as_file_mut())?;
        }

        deb.finish()
    }

    fn scratch_file(&self, prefix: &str) -> MDResult<NamedTempFile> {
        let dir = if self.temp_path.is_empty() {
            Path::new(".")
        } else {
            Path::new(&self.temp_path)
        };
        tempfile::Builder::new()
            .prefix(prefix)
            .tempfile_in(dir)
            .map_err(|e| MkDebError::IoFile("Failed creating temp file", e, dir.to_path_buf()))
    }
}
