use anstream::AutoStream;
use clap::{Arg, ArgAction, Command};
use mkdeb::listener::{Listener, StdErrListener};
use mkdeb::{MDResult, MkDebError, PackageSpec, SUPPORTED_ARCHITECTURES};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::{env, fs};

fn main() -> ExitCode {
    let matches = Command::new("mkdeb")
        .about("Build Debian binary packages (.deb) from a JSON config file")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(Arg::new("quiet").short('q').long("quiet").action(ArgAction::SetTrue).global(true).help("Don't print warnings"))
        .arg(Arg::new("verbose").short('v').long("verbose").action(ArgAction::SetTrue).global(true).conflicts_with("quiet").help("Print progress"))
        .subcommand(Command::new("archs")
            .about("List supported CPU architectures"))
        .subcommand(Command::new("init")
            .about("Create a new mkdeb config file in the current directory")
            .arg(Arg::new("config").long("config").num_args(1).value_name("file").default_value("mkdeb.json").help("Config file name")))
        .subcommand(Command::new("validate")
            .about("Validate a config file")
            .arg(Arg::new("config").required(true).value_name("config.json")))
        .subcommand(Command::new("build")
            .about("Build a package based on the specified config file")
            .long_about("Build a package based on the specified config file.\n\n\
                The build command changes to the directory where the config file is\n\
                located, so paths should always be specified relative to the config file.")
            .arg(Arg::new("version").long("version").num_args(1).value_name("version").default_value("1.0").help("Package version"))
            .arg(Arg::new("target").long("target").num_args(1).value_name("dir").help("Target folder for the generated package"))
            .arg(Arg::new("config").required(true).value_name("config.json")))
        .get_matches();

    env_logger::init();

    let listener = StdErrListener {
        verbose: matches.get_flag("verbose"),
        quiet: matches.get_flag("quiet"),
        color: AutoStream::choice(&std::io::stderr()),
    };

    let result = match matches.subcommand() {
        Some(("archs", _)) => {
            println!("mkdeb supported architectures: {}", SUPPORTED_ARCHITECTURES.join(", "));
            Ok(())
        },
        Some(("init", m)) => initialize(m.get_one::<String>("config").expect("has default")),
        Some(("validate", m)) => validate(m.get_one::<String>("config").expect("required")),
        Some(("build", m)) => build(
            m.get_one::<String>("config").expect("required"),
            m.get_one::<String>("version").expect("has default"),
            m.get_one::<String>("target").map(|s| s.as_str()),
            &listener,
        ),
        _ => unreachable!("subcommand required"),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("Error: {err}");
            ExitCode::FAILURE
        },
    }
}

/// Creates a starter config seeded from the defaults, with a sample files
/// mapping derived from the working directory's name.
fn initialize(filename: &str) -> MDResult<()> {
    if filename.is_empty() {
        return Err(MkDebError::Str("-config argument cannot be empty"));
    }
    let workdir = env::current_dir()?;
    let target = workdir.join(filename);
    if target.exists() {
        return Err(MkDebError::FileExists(PathBuf::from(filename)));
    }

    let project = workdir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_owned());

    let mut spec = PackageSpec::default();
    spec.package = project.clone();
    spec.architecture = "amd64".to_owned();
    spec.maintainer = "Your Name <you@example.com>".to_owned();
    spec.description = format!("{project} is an awesome project for...");
    spec.homepage = "https://www.example.com/project".to_owned();
    spec.files.insert(project.clone(), format!("/usr/local/bin/{project}"));

    let mut data = serde_json::to_vec_pretty(&spec)?;
    data.push(b'\n');
    fs::write(&target, data).map_err(|e| MkDebError::IoFile("Unable to write config file", e, target))?;
    Ok(())
}

fn validate(config: &str) -> MDResult<()> {
    let spec = PackageSpec::from_file(Path::new(config))?;
    spec.validate(false)
}

fn build(config: &str, version: &str, target: Option<&str>, listener: &dyn Listener) -> MDResult<()> {
    let abspath = fs::canonicalize(config)
        .map_err(|e| MkDebError::IoFile("Can't find config", e, PathBuf::from(config)))?;
    let workdir = abspath
        .parent()
        .ok_or("config file has no parent directory")?
        .to_path_buf();

    // Paths in the config are relative to the config file
    env::set_current_dir(&workdir)
        .map_err(|e| MkDebError::IoFile("Unable to change directory", e, workdir.clone()))?;

    let mut spec = PackageSpec::from_file(&abspath)?;
    spec.version = version.to_owned();

    let target_dir = match target {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            if dir.exists() && !dir.is_dir() {
                return Err(MkDebError::TargetNotDirectory(dir));
            }
            dir
        },
        None => workdir,
    };

    spec.validate(true)?;
    let built = spec.build(&target_dir, listener)?;
    println!("Built package {}", built.display());
    Ok(())
}
