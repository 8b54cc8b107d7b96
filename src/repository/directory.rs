use std::{
    fs::{read_dir, File},
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use crate::revision::RevisionName;

use super::RevisionStore;

/// A persistent [`RevisionStore`]: the repository subdirectory of an
/// archived directory, holding one plain file per revision, named by the
/// [`RevisionName`].
#[derive(Debug, Clone)]
pub struct DirectoryRevisionStore {
    root: PathBuf,
}

impl DirectoryRevisionStore {
    /// Opens an existing repository directory. Creating one is the job of
    /// the init command, never of an archiving run.
    pub fn open(root: PathBuf) -> Result<Self, std::io::Error> {
        if !root.is_dir() {
            return Err(std::io::Error::new(
                ErrorKind::NotFound,
                format!("no repository directory at {:?}", root),
            ));
        }
        Ok(Self { root })
    }

    fn path(&self, revision: &RevisionName) -> PathBuf {
        self.root.join(revision.to_string())
    }

    /// Stores the file at `src` as a new revision, following symbolic links
    /// to the data they point at.
    ///
    /// On Unix the copy keeps the source's permission bits and modification
    /// time. Elsewhere only the bytes are written, and permissions are lost.
    pub fn copy_file(&mut self, src: &Path, revision: &RevisionName) -> Result<(), std::io::Error> {
        let dest = self.path(revision);
        log::info!("copying {:?} to {:?}", src, dest);
        let mut input = File::options().read(true).open(src)?;
        let metadata = input.metadata()?;
        let mut output = File::options().write(true).create_new(true).open(&dest)?;
        std::io::copy(&mut input, &mut output)?;
        preserve_metadata(&output, &metadata)?;
        Ok(())
    }
}

#[cfg(unix)]
fn preserve_metadata(output: &File, metadata: &std::fs::Metadata) -> Result<(), std::io::Error> {
    output.set_permissions(metadata.permissions())?;
    output.set_modified(metadata.modified()?)
}

#[cfg(not(unix))]
fn preserve_metadata(_output: &File, _metadata: &std::fs::Metadata) -> Result<(), std::io::Error> {
    Ok(())
}

impl RevisionStore for DirectoryRevisionStore {
    type Error = std::io::Error;

    /// Lists regular files only. Names that aren't UTF-8 can't be revisions
    /// and are skipped.
    fn names(&self) -> Result<Vec<String>, Self::Error> {
        let mut names = Vec::new();
        for entry in read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => log::warn!("ignoring {:?} in {:?}", name, self.root),
            }
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, revision: &RevisionName) -> Result<Option<Vec<u8>>, Self::Error> {
        log::debug!("reading {} from {:?}", revision, self.root);
        match File::options().read(true).open(self.path(revision)) {
            Ok(mut f) => {
                let mut v = Vec::new();
                f.read_to_end(&mut v)?;
                Ok(Some(v))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Fails with [`ErrorKind::AlreadyExists`] rather than replace a revision.
    fn insert(&mut self, revision: &RevisionName, content: &[u8]) -> Result<(), Self::Error> {
        log::info!("inserting {} into {:?}", revision, self.root);
        let mut f = File::options()
            .write(true)
            .create_new(true)
            .open(self.path(revision))?;
        f.write_all(content)
    }
}

#[cfg(test)]
fn revision(s: &str) -> RevisionName {
    s.parse().unwrap()
}

#[test]
fn test_directory_revision_store() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut store = DirectoryRevisionStore::open(tempdir.path().into()).unwrap();
    let rev = revision("Y20240101T000000Z_hello.txt");
    assert_eq!(store.read(&rev).unwrap(), None);
    store.insert(&rev, b"hello, world").unwrap();
    assert!(tempdir.path().join("Y20240101T000000Z_hello.txt").is_file());
    assert_eq!(store.read(&rev).unwrap(), Some(Vec::from(&b"hello, world"[..])));

    let err = store.insert(&rev, b"again").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(store.read(&rev).unwrap(), Some(Vec::from(&b"hello, world"[..])));
}

#[test]
fn test_names_skip_subdirectories() {
    let tempdir = tempfile::tempdir().unwrap();
    std::fs::create_dir(tempdir.path().join("nested")).unwrap();
    let mut store = DirectoryRevisionStore::open(tempdir.path().into()).unwrap();
    store.insert(&revision("Y20240102T000000Z_b"), b"2").unwrap();
    store.insert(&revision("Y20240101T000000Z_b"), b"1").unwrap();
    assert_eq!(
        store.names().unwrap(),
        vec!["Y20240101T000000Z_b", "Y20240102T000000Z_b"]
    );
}

#[test]
fn test_open_missing() {
    let tempdir = tempfile::tempdir().unwrap();
    let err = DirectoryRevisionStore::open(tempdir.path().join(".Archive")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[cfg(unix)]
#[test]
fn test_copy_file_preserves_metadata() -> Result<(), std::io::Error> {
    use std::os::unix::fs::PermissionsExt;
    use std::time::{Duration, UNIX_EPOCH};

    let tempdir = tempfile::tempdir()?;
    let src = tempdir.path().join("tool.sh");
    std::fs::write(&src, b"echo hi\n")?;
    std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o741))?;
    let mtime = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    File::options().write(true).open(&src)?.set_modified(mtime)?;

    let repo = tempdir.path().join(".Archive");
    std::fs::create_dir(&repo)?;
    let mut store = DirectoryRevisionStore::open(repo.clone())?;
    let rev = revision("Y20231114T221320Z_tool.sh");
    store.copy_file(&src, &rev)?;

    let copied = std::fs::metadata(repo.join(rev.to_string()))?;
    assert_eq!(copied.permissions().mode() & 0o777, 0o741);
    assert_eq!(copied.modified()?, mtime);
    assert_eq!(store.read(&rev)?, Some(b"echo hi\n".to_vec()));
    assert!(store.copy_file(&src, &rev).is_err());
    Ok(())
}
