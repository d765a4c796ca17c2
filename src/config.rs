use crate::error::{MDResult, MkDebError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

/// Architectures dpkg will accept for a binary package.
pub const SUPPORTED_ARCHITECTURES: &[&str] = &[
    "all", // for packages that ship no compiled binaries
    "amd64", "arm64", "armel", "armhf", "i386", "mips", "mipsel", "powerpc", "ppc64el", "s390x",
];

/// Maintainer scripts, in the order they are placed into the control archive.
pub(crate) const CONTROL_SCRIPTS: [&str; 4] = ["preinst", "postinst", "prerm", "postrm"];

const DEPENDS_PATTERN: &str = r"^[A-Za-z0-9.+_-]+( \((>|>=|<|<=|=) [0-9][0-9A-Za-z.-]*\))?$";
const RELATION_PATTERN: &str = r"^[A-Za-z0-9.+_-]+( \(<< [0-9][0-9A-Za-z.-]*\))?$";

static RE_DEPENDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(DEPENDS_PATTERN).unwrap());
static RE_RELATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(RELATION_PATTERN).unwrap());

/// A package build specification, parsed from a JSON config file.
///
/// Missing keys fall back to the values from [`PackageSpec::default`];
/// unknown keys are ignored. `version` is injected at build time and never
/// round-tripped through the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PackageSpec {
    // Binary debian control file - required fields
    pub package: String,
    #[serde(skip_serializing)]
    pub version: String,
    pub architecture: String,
    pub maintainer: String,
    pub description: String,

    // Optional control fields
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub breaks: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replaces: Vec<String>,
    pub section: String,
    pub priority: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub homepage: String,

    /// Maintainer scripts. An empty value means "look inside `autoPath`".
    #[serde(skip_serializing_if = "String::is_empty")]
    pub preinst: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub postinst: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub prerm: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub postrm: String,

    /// Directory whose tree mirrors the installed filesystem layout.
    /// `""` or `"-"` disables the automatic scan.
    #[serde(rename = "autoPath")]
    pub auto_path: String,

    /// On-disk source path to absolute installed path.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, String>,

    /// Scratch directory for the intermediate tarballs. Empty means the
    /// process working directory.
    #[serde(rename = "tempPath", skip_serializing_if = "String::is_empty")]
    pub temp_path: String,

    /// Archive symlinks as symlinks instead of the contents of their targets.
    #[serde(rename = "preserveSymlinks", skip_serializing_if = "is_false")]
    pub preserve_symlinks: bool,

    /// Leave /etc out of conffiles so upgrades replace config files.
    #[serde(rename = "upgradeConfigs", skip_serializing_if = "is_false")]
    pub upgrade_configs: bool,

    /// Kilobytes, rounded up. Derived from file sizes at build time.
    #[serde(skip)]
    pub installed_size: u64,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Default for PackageSpec {
    fn default() -> Self {
        Self {
            package: String::new(),
            version: String::new(),
            architecture: String::new(),
            maintainer: String::new(),
            description: String::new(),
            depends: Vec::new(),
            conflicts: Vec::new(),
            breaks: Vec::new(),
            replaces: Vec::new(),
            section: "default".to_owned(),
            priority: "extra".to_owned(),
            homepage: String::new(),
            preinst: String::new(),
            postinst: String::new(),
            prerm: String::new(),
            postrm: String::new(),
            auto_path: "deb-pkg".to_owned(),
            files: BTreeMap::new(),
            temp_path: String::new(),
            preserve_symlinks: false,
            upgrade_configs: false,
            installed_size: 0,
        }
    }
}

impl PackageSpec {
    pub fn from_json(data: &[u8]) -> MDResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn from_file(path: &Path) -> MDResult<Self> {
        let data = fs::read(path)
            .map_err(|e| MkDebError::IoFile("Unable to read package config", e, path.to_path_buf()))?;
        Self::from_json(&data)
    }

    /// Checks the syntax of the text fields against the debian control file
    /// grammar. Purely syntactic; nothing on disk is consulted. `version` is
    /// only required when validating for a build, since it is normally
    /// injected by the build command.
    pub fn validate(&self, build_time: bool) -> MDResult<()> {
        let mut missing = Vec::new();
        if self.package.is_empty() {
            missing.push("package");
        }
        if build_time && self.version.is_empty() {
            missing.push("version");
        }
        if self.architecture.is_empty() {
            missing.push("architecture");
        }
        if self.maintainer.is_empty() {
            missing.push("maintainer");
        }
        if self.description.is_empty() {
            missing.push("description");
        }
        if !missing.is_empty() {
            return Err(MkDebError::MissingFields(missing.join(", ")));
        }

        if !SUPPORTED_ARCHITECTURES.contains(&self.architecture.as_str()) {
            return Err(MkDebError::UnsupportedArchitecture(
                self.architecture.clone(),
                SUPPORTED_ARCHITECTURES.join(", "),
            ));
        }

        for dep in &self.depends {
            if !RE_DEPENDS.is_match(dep) {
                return Err(MkDebError::InvalidDependency(dep.clone(), DEPENDS_PATTERN));
            }
        }
        for (field, entries) in [
            ("Conflict", &self.conflicts),
            ("Break", &self.breaks),
            ("Replacement", &self.replaces),
        ] {
            for entry in entries {
                if !RE_RELATION.is_match(entry) {
                    return Err(MkDebError::InvalidRelation(field, entry.clone(), RELATION_PATTERN));
                }
            }
        }
        Ok(())
    }

    /// The standard debian package filename, `package-version-arch.deb`.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}-{}-{}.deb", self.package, self.version, self.architecture)
    }

    /// The auto scan participates in the build unless unset or explicitly
    /// disabled with `-`.
    pub(crate) fn auto_path_enabled(&self) -> bool {
        !self.auto_path.is_empty() && self.auto_path != "-"
    }

    /// Renders the `control` file embedded in the control archive.
    pub fn generate_control(&self) -> MDResult<Vec<u8>> {
        let mut control = Vec::with_capacity(1024);
        writeln!(&mut control, "Package: {}", self.package)?;
        writeln!(&mut control, "Version: {}", self.version)?;
        writeln!(&mut control, "Architecture: {}", self.architecture)?;
        writeln!(&mut control, "Maintainer: {}", self.maintainer)?;
        writeln!(&mut control, "Installed-Size: {}", self.installed_size)?;
        if !self.depends.is_empty() {
            writeln!(&mut control, "Depends: {}", self.depends.join(", "))?;
        }
        if !self.conflicts.is_empty() {
            writeln!(&mut control, "Conflicts: {}", self.conflicts.join(", "))?;
        }
        if !self.breaks.is_empty() {
            writeln!(&mut control, "Breaks: {}", self.breaks.join(", "))?;
        }
        if !self.replaces.is_empty() {
            writeln!(&mut control, "Replaces: {}", self.replaces.join(", "))?;
        }
        writeln!(&mut control, "Section: {}", self.section)?;
        writeln!(&mut control, "Priority: {}", self.priority)?;
        writeln!(&mut control, "Homepage: {}", self.homepage)?;
        writeln!(&mut control, "Description: {}", self.description)?;
        Ok(control)
    }
}
