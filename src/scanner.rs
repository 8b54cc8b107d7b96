use std::{fs::read_dir, path::Path};

use crate::config::Config;

/// The immediate children of one directory, split by kind and sorted by name.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct Listing {
    pub subdirs: Vec<String>,
    pub files: Vec<String>,
}

impl Listing {
    /// Lists `dir` without recursing.
    ///
    /// Symbolic links are followed, so a link to a file counts as a file.
    /// Anything else that is neither a regular file nor a directory, anything
    /// which can't be stat'd, and names the summary format can't carry are
    /// dropped without a report.
    pub fn scan(dir: &Path, config: &Config) -> Result<Self, std::io::Error> {
        let mut listing = Listing::default();
        for entry in read_dir(dir)? {
            let Ok(entry) = entry else { continue };
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                log::debug!("dropping non utf-8 name in {:?}", dir);
                continue;
            };
            if name.contains('\n') {
                log::debug!("dropping {:?} in {:?}", name, dir);
                continue;
            }
            if name != config.repository && config.is_ignored(&name) {
                continue;
            }
            let Ok(metadata) = std::fs::metadata(entry.path()) else {
                continue;
            };
            if metadata.is_dir() {
                listing.subdirs.push(name);
            } else if metadata.is_file() {
                listing.files.push(name);
            }
        }
        listing.subdirs.sort();
        listing.files.sort();
        Ok(listing)
    }

    pub fn has_repository(&self, config: &Config) -> bool {
        self.subdirs.iter().any(|d| *d == config.repository)
    }
}

#[test]
fn test_scan() -> Result<(), std::io::Error> {
    let tempdir = tempfile::tempdir()?;
    let root = tempdir.path();
    std::fs::create_dir(root.join("zeta"))?;
    std::fs::create_dir(root.join("alpha"))?;
    std::fs::create_dir(root.join(".Archive"))?;
    std::fs::write(root.join("b.txt"), b"b")?;
    std::fs::write(root.join("a.txt"), b"a")?;
    std::fs::write(root.join("zeta").join("hidden.txt"), b"not listed")?;

    let listing = Listing::scan(root, &Config::default())?;
    assert_eq!(listing.subdirs, vec![".Archive", "alpha", "zeta"]);
    assert_eq!(listing.files, vec!["a.txt", "b.txt"]);
    assert!(listing.has_repository(&Config::default()));
    Ok(())
}

#[test]
fn test_scan_ignores() -> Result<(), std::io::Error> {
    let tempdir = tempfile::tempdir()?;
    let root = tempdir.path();
    std::fs::create_dir(root.join("target"))?;
    std::fs::write(root.join("main.c"), b"int main;")?;
    std::fs::write(root.join("a.out"), b"\x7fELF")?;
    let config = Config {
        ignore: ["target", "a.out"].into_iter().map(String::from).collect(),
        ..Config::default()
    };
    let listing = Listing::scan(root, &config)?;
    assert!(listing.subdirs.is_empty());
    assert_eq!(listing.files, vec!["main.c"]);
    assert!(!listing.has_repository(&config));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_scan_follows_and_drops_links() -> Result<(), std::io::Error> {
    let tempdir = tempfile::tempdir()?;
    let root = tempdir.path();
    std::fs::write(root.join("real.txt"), b"data")?;
    std::os::unix::fs::symlink(root.join("real.txt"), root.join("link.txt"))?;
    std::os::unix::fs::symlink(root.join("missing"), root.join("dangling"))?;
    let listing = Listing::scan(root, &Config::default())?;
    assert_eq!(listing.files, vec!["link.txt", "real.txt"]);
    assert!(listing.subdirs.is_empty());
    Ok(())
}
