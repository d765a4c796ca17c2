use crate::config::{PackageSpec, CONTROL_SCRIPTS};
use crate::error::{MDResult, MkDebError};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

impl PackageSpec {
    /// Source paths that go into the data archive, in archive order: the
    /// `autoPath` tree first (depth-first, siblings lexically sorted), then
    /// the `files` map sorted by source path. Fails if two sources map to
    /// the same in-archive target.
    pub fn list_files(&self) -> MDResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut seen_targets = HashSet::new();

        if self.auto_path_enabled() && Path::new(&self.auto_path).exists() {
            for entry in WalkDir::new(&self.auto_path).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_dir() {
                    continue;
                }
                // Maintainer scripts ride in the control archive instead
                if CONTROL_SCRIPTS.iter().any(|s| entry.file_name() == OsStr::new(s)) {
                    continue;
                }
                let source = entry.into_path();
                let target = self.normalize_filename(&source)?;
                if !seen_targets.insert(target.clone()) {
                    return Err(MkDebError::DuplicateFromAutoPath(target, source));
                }
                files.push(source);
            }
        }

        for src in self.files.keys() {
            let source = PathBuf::from(src);
            let target = self.normalize_filename(&source)?;
            if !seen_targets.insert(target.clone()) {
                return Err(MkDebError::DuplicateFromFiles(target, src.clone()));
            }
            files.push(source);
        }

        log::debug!("{} files in package inventory", files.len());
        Ok(files)
    }

    /// In-archive conffiles entries: every data file that lands under /etc,
    /// with a leading slash. Empty when `upgradeConfigs` is set, so the
    /// package manager replaces config files on upgrade.
    pub fn list_etc_files(&self) -> MDResult<Vec<String>> {
        let mut etc_files = Vec::new();
        if self.upgrade_configs {
            return Ok(etc_files);
        }
        for file in self.list_files()? {
            let normalized = self.normalize_filename(&file)?;
            if normalized.starts_with("etc/") {
                etc_files.push(format!("/{normalized}"));
            }
        }
        Ok(etc_files)
    }

    /// Maintainer scripts to package, as (script name, source path) pairs in
    /// the order they are added to the control archive. An explicit field
    /// wins; otherwise the script is picked up from `autoPath` if present.
    pub fn map_control_files(&self) -> Vec<(&'static str, PathBuf)> {
        let overrides: [(&'static str, &str); 4] = [
            ("preinst", &self.preinst),
            ("postinst", &self.postinst),
            ("prerm", &self.prerm),
            ("postrm", &self.postrm),
        ];

        let mut scripts = Vec::new();
        for (name, explicit) in overrides {
            if !explicit.is_empty() {
                scripts.push((name, PathBuf::from(explicit)));
            } else if self.auto_path_enabled() {
                let candidate = Path::new(&self.auto_path).join(name);
                if candidate.is_file() {
                    scripts.push((name, candidate));
                }
            }
        }
        scripts
    }

    /// Translates an on-disk source path to its in-archive path: a clean
    /// `/`-separated relative path such as `etc/package1/config`. The data
    /// archive prefixes entries with `./` when headers are written.
    pub fn normalize_filename(&self, src: &Path) -> MDResult<String> {
        if let Some(dest) = self.files.get(src.to_string_lossy().as_ref()) {
            return Ok(clean_archive_path(Path::new(dest)));
        }
        if self.auto_path_enabled() {
            if let Ok(rel) = src.strip_prefix(&self.auto_path) {
                return Ok(clean_archive_path(rel));
            }
        }
        Err(MkDebError::UnmappedSource(src.to_path_buf()))
    }

    /// Total installed size in kilobytes, rounded up. Counts every data file
    /// plus every maintainer script.
    pub fn calculate_size(&self) -> MDResult<u64> {
        let mut all = self.list_files()?;
        all.extend(self.map_control_files().into_iter().map(|(_, path)| path));

        let mut bytes = 0u64;
        for file in &all {
            let meta = if self.preserve_symlinks {
                fs::symlink_metadata(file)
            } else {
                fs::metadata(file)
            }
            .map_err(|e| MkDebError::IoFile("Failed to stat", e, file.clone()))?;
            bytes += meta.len();
        }
        Ok(bytes.div_ceil(1024))
    }

    /// Contents of the md5sums control file: one
    /// `"{checksum}  {normalized path}\n"` line per data file, in inventory
    /// order.
    pub fn calculate_checksums(&self) -> MDResult<Vec<u8>> {
        let mut out = Vec::new();
        for file in self.list_files()? {
            let sum = md5_sum_file(&file)?;
            let normalized = self.normalize_filename(&file)?;
            writeln!(&mut out, "{sum}  {normalized}")?;
        }
        Ok(out)
    }
}

/// Joins the normal components of `path` with `/`, dropping any leading
/// slash or `.` so the result is always a clean relative POSIX path.
fn clean_archive_path(path: &Path) -> String {
    let mut out = String::new();
    for comp in path.components() {
        if let Component::Normal(c) = comp {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(&c.to_string_lossy());
        }
    }
    out
}

fn md5_sum_file(path: &Path) -> MDResult<String> {
    let mut file = fs::File::open(path)
        .map_err(|e| MkDebError::IoFile("Unable to read file for checksumming", e, path.to_path_buf()))?;
    let mut context = md5::Context::new();
    io::copy(&mut file, &mut context)
        .map_err(|e| MkDebError::IoFile("Unable to read file for checksumming", e, path.to_path_buf()))?;
    Ok(format!("{:x}", context.compute()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use tempfile::TempDir;

    // md5 test vectors from RFC 1321: "abc" and the empty string, plus the
    // classic fox pangram.
    const CONFIG_DATA: &[u8] = b"abc";
    const CONFIG_MD5: &str = "900150983cd24fb0d6963f7d28e17f72";
    const BINARY_DATA: &[u8] = b"The quick brown fox jumps over the lazy dog";
    const BINARY_MD5: &str = "9e107d9d372bb6826bd81d3542a419d6";

    fn fixture(with_scripts: bool) -> (TempDir, PackageSpec) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("package1");
        fs::create_dir_all(root.join("etc/package1")).unwrap();
        fs::create_dir_all(root.join("usr/local/bin")).unwrap();
        fs::write(root.join("etc/package1/config"), CONFIG_DATA).unwrap();
        fs::write(root.join("usr/local/bin/package1"), BINARY_DATA).unwrap();
        if with_scripts {
            fs::write(root.join("preinst"), b"#!/bin/sh\ntrue\n").unwrap();
            fs::write(root.join("postrm"), b"#!/bin/sh\ntrue\n").unwrap();
        }

        let mut spec = PackageSpec::default();
        spec.auto_path = root.to_str().unwrap().to_owned();
        (dir, spec)
    }

    #[test]
    fn lists_autopath_files_without_scripts() {
        let (_dir, spec) = fixture(true);
        let files = spec.list_files().unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| spec.normalize_filename(f).unwrap())
            .collect();
        assert_eq!(names, ["etc/package1/config", "usr/local/bin/package1"]);
    }

    #[test]
    fn files_map_appended_in_lexical_order() {
        let (dir, mut spec) = fixture(false);
        fs::write(dir.path().join("zeta"), b"z").unwrap();
        fs::write(dir.path().join("alpha"), b"a").unwrap();
        spec.files.insert(
            dir.path().join("zeta").to_str().unwrap().to_owned(),
            "/usr/share/zeta".to_owned(),
        );
        spec.files.insert(
            dir.path().join("alpha").to_str().unwrap().to_owned(),
            "/usr/share/alpha".to_owned(),
        );

        let files = spec.list_files().unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| spec.normalize_filename(f).unwrap())
            .collect();
        assert_eq!(
            names,
            [
                "etc/package1/config",
                "usr/local/bin/package1",
                "usr/share/alpha",
                "usr/share/zeta",
            ]
        );
    }

    #[test]
    fn duplicate_target_from_files_map() {
        let (_dir, mut spec) = fixture(false);
        spec.files.insert("package/binary".to_owned(), "/usr/local/bin/package1".to_owned());
        let err = spec.list_files().unwrap_err();
        assert!(err.to_string().contains("Duplicate"), "{err}");
    }

    #[test]
    fn normalize_from_autopath() {
        let (_dir, spec) = fixture(false);
        let source = Path::new(&spec.auto_path).join("etc/package1/config");
        assert_eq!(spec.normalize_filename(&source).unwrap(), "etc/package1/config");
    }

    #[test]
    fn normalize_from_files_map() {
        let (_dir, mut spec) = fixture(false);
        spec.files.insert("something/magic".to_owned(), "/usr/local/bin/magic".to_owned());
        assert_eq!(
            spec.normalize_filename(Path::new("something/magic")).unwrap(),
            "usr/local/bin/magic"
        );
    }

    #[test]
    fn normalize_fails_with_autopath_disabled() {
        let mut spec = PackageSpec::default();
        spec.auto_path = "-".to_owned();
        let err = spec.normalize_filename(Path::new("orphan")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Not sure what to do with \"orphan\" because it is not specified in files and autopath is disabled"
        );
    }

    #[test]
    fn etc_files_have_leading_slash() {
        let (_dir, spec) = fixture(false);
        let files = spec.list_etc_files().unwrap();
        assert_eq!(files, ["/etc/package1/config"]);
    }

    #[test]
    fn upgrade_configs_empties_conffiles() {
        let (_dir, mut spec) = fixture(false);
        spec.upgrade_configs = true;
        assert!(spec.list_etc_files().unwrap().is_empty());
    }

    #[test]
    fn control_scripts_discovered_in_autopath() {
        let (_dir, spec) = fixture(true);
        let scripts = spec.map_control_files();
        let names: Vec<&str> = scripts.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["preinst", "postrm"]);
        assert_eq!(scripts[0].1, Path::new(&spec.auto_path).join("preinst"));
    }

    #[test]
    fn explicit_control_script_wins() {
        let (dir, mut spec) = fixture(true);
        let custom = dir.path().join("my-preinst");
        fs::write(&custom, b"#!/bin/sh\n").unwrap();
        spec.preinst = custom.to_str().unwrap().to_owned();
        let scripts = spec.map_control_files();
        assert_eq!(scripts[0], ("preinst", custom));
    }

    #[test]
    fn size_is_kilobytes_rounded_up() {
        let (_dir, spec) = fixture(false);
        // 3 + 43 bytes, well under one kilobyte
        assert_eq!(spec.calculate_size().unwrap(), 1);
    }

    #[test]
    fn size_counts_control_scripts() {
        let (dir, mut spec) = fixture(false);
        let big = dir.path().join("postinst-src");
        fs::write(&big, vec![0u8; 2049]).unwrap();
        spec.postinst = big.to_str().unwrap().to_owned();
        // ceil((3 + 43 + 2049) / 1024) = 3
        assert_eq!(spec.calculate_size().unwrap(), 3);
    }

    #[test]
    fn checksums_fixture() {
        let (_dir, spec) = fixture(true);
        let expected = format!(
            "{CONFIG_MD5}  etc/package1/config\n{BINARY_MD5}  usr/local/bin/package1\n"
        );
        let sums = spec.calculate_checksums().unwrap();
        assert_eq!(String::from_utf8(sums).unwrap(), expected);
    }

    #[test]
    fn checksum_line_shape() {
        let (_dir, spec) = fixture(false);
        let sums = String::from_utf8(spec.calculate_checksums().unwrap()).unwrap();
        let line = Regex::new(r"^[0-9a-f]{32}  \S").unwrap();
        let lines: Vec<&str> = sums.lines().collect();
        assert_eq!(lines.len(), spec.list_files().unwrap().len());
        for l in &lines {
            assert!(line.is_match(l), "{l:?}");
        }
        assert!(sums.ends_with('\n'));
    }

    #[test]
    fn empty_file_checksum() {
        let (dir, mut spec) = fixture(false);
        let empty = dir.path().join("empty");
        fs::write(&empty, b"").unwrap();
        spec.files.insert(empty.to_str().unwrap().to_owned(), "/usr/share/empty".to_owned());
        let sums = String::from_utf8(spec.calculate_checksums().unwrap()).unwrap();
        assert!(sums.contains("d41d8cd98f00b204e9800998ecf8427e  usr/share/empty\n"), "{sums}");
    }

    #[test]
    fn clean_archive_path_strips_prefixes() {
        assert_eq!(clean_archive_path(Path::new("/usr/local/bin/magic")), "usr/local/bin/magic");
        assert_eq!(clean_archive_path(Path::new("./etc/blah")), "etc/blah");
        assert_eq!(clean_archive_path(Path::new("etc//blah")), "etc/blah");
    }
}
