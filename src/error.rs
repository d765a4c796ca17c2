use quick_error::quick_error;
use std::path::PathBuf;
use std::{io, time};

quick_error! {
    #[derive(Debug)]
    #[non_exhaustive]
    pub enum MkDebError {
        Io(err: io::Error) {
            from()
            display("I/O error: {}", err)
            source(err)
        }
        IoFile(msg: &'static str, err: io::Error, file: PathBuf) {
            display("{}: {}", msg, file.display())
            source(err)
        }
        Walk(err: walkdir::Error) {
            from()
            display("Unable to scan directory: {}", err)
            source(err)
        }
        ParseJson(err: serde_json::Error) {
            from()
            display("Unable to parse package config: {}", err)
            source(err)
        }
        SystemTime(err: time::SystemTimeError) {
            from()
            display("Unable to get system time")
            source(err)
        }
        Str(msg: &'static str) {
            display("{}", msg)
            from()
        }
        MissingFields(fields: String) {
            display("These required fields are missing: {}", fields)
        }
        UnsupportedArchitecture(arch: String, expected: String) {
            display("Arch {:?} is not supported; expected one of {}", arch, expected)
        }
        InvalidDependency(entry: String, pattern: &'static str) {
            display("Dependency {:?} is invalid; expected something like 'libc (= 5.1.2)' matching {:?}", entry, pattern)
        }
        InvalidRelation(field: &'static str, entry: String, pattern: &'static str) {
            display("{} {:?} is invalid; expected something like 'libc (<< 5.1.2)' matching {:?}", field, entry, pattern)
        }
        DuplicateFromAutoPath(target: String, source: PathBuf) {
            display("Duplicate file {:?} found while scanning autopath: {}", target, source.display())
        }
        DuplicateFromFiles(target: String, source: String) {
            display("Duplicate file {:?} declared in the files map as {:?}", target, source)
        }
        UnmappedSource(path: PathBuf) {
            display("Not sure what to do with \"{}\" because it is not specified in files and autopath is disabled", path.display())
        }
        FileExists(path: PathBuf) {
            display("{} already exists in this directory", path.display())
        }
        TargetNotDirectory(path: PathBuf) {
            display("\"{}\" is not a directory", path.display())
        }
    }
}

pub type MDResult<T> = Result<T, MkDebError>;
