use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::{Error, Result};

/// Counter dumps written by the simulator for every run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatFile {
    Memory,
    BranchPredictor,
}

impl StatFile {
    pub fn file_name(self) -> &'static str {
        match self {
            StatFile::Memory => "memory.stat.0.csv",
            StatFile::BranchPredictor => "bp.stat.0.csv",
        }
    }
}

/// Anything that can answer counter lookups for a single run
pub trait StatSource {
    fn stat(&self, file: StatFile, key: &str) -> Result<Option<f64>>;
}

/// Finds `key` in comma separated `lines`.
///
/// The first line whose trimmed first field equals `key` decides the result:
/// its last field parsed as a float, or `None` if that does not parse. Later
/// lines with the same key are never consulted.
pub fn lookup<'a>(lines: impl IntoIterator<Item = &'a str>, key: &str) -> Option<f64> {
    for line in lines {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 2 || fields[0] != key {
            continue;
        }
        return match fields[fields.len() - 1].parse::<f64>() {
            Ok(value) => Some(value),
            Err(_) => {
                debug!("Non numeric value for {key}: {line:?}");
                None
            }
        };
    }
    None
}

/// Reads `key` from the stat file at `path`. A missing file is `Ok(None)`,
/// other I/O failures are returned.
pub fn read_stat(path: &Path, key: &str) -> Result<Option<f64>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("Missing stat file {path:?}");
            return Ok(None);
        }
        Err(err) => return Err(Error::io(path, err)),
    };
    let value = lookup(contents.lines(), key);
    if value.is_none() {
        debug!("No value for {key} in {path:?}");
    }
    Ok(value)
}

/// Output directory of one (benchmark, experiment, configuration) run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDir {
    path: PathBuf,
}

impl RunDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn stat_path(&self, file: StatFile) -> PathBuf {
        self.path.join(file.file_name())
    }
}

impl StatSource for RunDir {
    fn stat(&self, file: StatFile, key: &str) -> Result<Option<f64>> {
        read_stat(&self.stat_path(file), key)
    }
}
