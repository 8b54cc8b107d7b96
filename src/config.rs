use std::{collections::BTreeSet, fs::File, io::ErrorKind, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Name of the optional configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = ".Archive.json";

/// Settings shared, unchanged, by every directory of one archiving run.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the repository subdirectory marking a directory as archived.
    pub repository: String,
    /// Base names which are never archived, at any depth.
    pub ignore: BTreeSet<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            repository: String::from(".Archive"),
            ignore: BTreeSet::new(),
        }
    }
}

impl Config {
    /// Reads [`CONFIG_FILE`] from `dir`, falling back to the defaults when
    /// there is none.
    pub fn load(dir: &Path) -> Result<Self, Error> {
        match File::options().read(true).open(dir.join(CONFIG_FILE)) {
            Ok(f) => Ok(serde_json::from_reader(f)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Config::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore.contains(name)
    }
}

#[test]
fn test_load_defaults() {
    let tempdir = tempfile::tempdir().unwrap();
    assert_eq!(Config::load(tempdir.path()).unwrap(), Config::default());
}

#[test]
fn test_load_partial() {
    let tempdir = tempfile::tempdir().unwrap();
    std::fs::write(
        tempdir.path().join(CONFIG_FILE),
        br#"{ "ignore": ["target", "a.out"] }"#,
    )
    .unwrap();
    let config = Config::load(tempdir.path()).unwrap();
    assert_eq!(config.repository, ".Archive");
    assert!(config.is_ignored("a.out"));
    assert!(!config.is_ignored("main.c"));
}

#[test]
fn test_load_malformed() {
    let tempdir = tempfile::tempdir().unwrap();
    std::fs::write(tempdir.path().join(CONFIG_FILE), b"Retain: *.c").unwrap();
    assert!(matches!(Config::load(tempdir.path()), Err(Error::Serde(_))));
}
