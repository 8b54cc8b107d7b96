use std::{
    fs::{self, Metadata},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{
    comparator::should_store,
    config::Config,
    error::{Error, Problem, ProblemKind},
    index::RevisionIndex,
    repository::{directory::DirectoryRevisionStore, RevisionStore},
    revision::{RevisionName, Timestamp},
    scanner::Listing,
    summary::{SummaryLine, SELF_NAME},
};

/// Something an archiving run wants the operator to know about.
#[derive(Debug)]
pub enum Event {
    Archiving(PathBuf),
    StoringFile(PathBuf),
    StoringLink(PathBuf),
    StoringDir(PathBuf),
    Problem(Problem),
}

/// Receives progress and problem reports as they happen.
pub trait Observer {
    fn event(&mut self, event: Event);
}

impl Observer for Vec<Event> {
    fn event(&mut self, event: Event) {
        self.push(event);
    }
}

/// The result of a complete run.
#[derive(Debug)]
pub struct Archived {
    /// The summary of the archiving root, self line first.
    pub summary: String,
    /// How many entries were skipped and reported.
    pub problems: usize,
}

/// One archiving run. Every directory self revision written by the run is
/// named with the same `now`.
pub struct Archiver<'a> {
    config: &'a Config,
    now: Timestamp,
    observer: &'a mut dyn Observer,
    problems: usize,
}

enum Kind {
    Dir,
    File,
}

struct Entry {
    kind: Kind,
    metadata: Metadata,
    content: Vec<u8>,
}

impl<'a> Archiver<'a> {
    pub fn new(config: &'a Config, now: Timestamp, observer: &'a mut dyn Observer) -> Self {
        Archiver {
            config,
            now,
            observer,
            problems: 0,
        }
    }

    /// Archives `root`, which must hold a repository.
    ///
    /// With no `paths`, everything in `root` is considered. Otherwise only the
    /// named children of `root` are; unusable names are reported, ignored
    /// names are dropped, and if none is left the whole directory is
    /// considered after all.
    pub fn run(mut self, root: &Path, paths: &[PathBuf]) -> Result<Archived, Error> {
        let listing = Listing::scan(root, self.config)?;
        if !listing.has_repository(self.config) {
            return Err(Error::NoRepository(root.to_path_buf()));
        }
        let mut selected = self.select(root, paths);
        if selected.subdirs.is_empty() && selected.files.is_empty() {
            selected = listing;
        }
        let summary = self.archive_dir(root, &selected.subdirs, &selected.files)?;
        Ok(Archived {
            summary,
            problems: self.problems,
        })
    }

    fn select(&mut self, root: &Path, paths: &[PathBuf]) -> Listing {
        let mut selected = Listing::default();
        for path in paths {
            let name = match path.to_str() {
                Some(name) if !name.contains(char::is_whitespace) => name,
                _ => {
                    self.report(path.clone(), ProblemKind::UnusableName);
                    continue;
                }
            };
            let name = name.trim_end_matches(['/', '\\']);
            if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
                self.report(path.clone(), ProblemKind::UnusableName);
                continue;
            }
            if self.config.is_ignored(name) {
                log::debug!("skipping ignored {:?}", path);
                continue;
            }
            let full = root.join(name);
            match fs::metadata(&full) {
                Err(err) => self.report(full, ProblemKind::CouldNotStat(err)),
                Ok(m) if m.is_dir() => selected.subdirs.push(name.to_owned()),
                Ok(m) if m.is_file() => match fs::File::open(&full) {
                    Ok(_) => selected.files.push(name.to_owned()),
                    Err(err) => self.report(full, ProblemKind::CouldNotRead(err)),
                },
                Ok(_) => self.report(full, ProblemKind::NotFileOrDirectory),
            }
        }
        selected.subdirs.sort();
        selected.subdirs.dedup();
        selected.files.sort();
        selected.files.dedup();
        selected
    }

    /// Archives one directory level and returns its summary: subdirectories
    /// holding a repository first (recursively), then files, then the
    /// directory itself.
    pub fn archive_dir(
        &mut self,
        root: &Path,
        subdirs: &[String],
        files: &[String],
    ) -> Result<String, Error> {
        let metadata = fs::metadata(root)?;
        self.observer.event(Event::Archiving(root.to_path_buf()));
        let mut store = DirectoryRevisionStore::open(root.join(&self.config.repository))?;
        let mut index = RevisionIndex::build(&store)?;

        let mut summary = String::new();
        for name in subdirs.iter().chain(files) {
            if *name == self.config.repository {
                continue;
            }
            let path = root.join(name);
            let Some(entry) = self.entry(&path) else {
                continue;
            };
            summary.push_str(&SummaryLine::new(&entry.content, &entry.metadata, name).to_string());
            self.store_entry(&mut store, &mut index, &path, name, entry);
        }

        let this = SummaryLine::new(summary.as_bytes(), &metadata, SELF_NAME);
        summary.insert_str(0, &this.to_string());
        self.store_self(&mut store, &index, root, &summary);
        Ok(summary)
    }

    /// Determines an entry's content, or reports why it has none this run.
    /// Subdirectories without a repository are passed over silently.
    fn entry(&mut self, path: &Path) -> Option<Entry> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) => {
                self.report(path.to_path_buf(), ProblemKind::CouldNotStat(err));
                return None;
            }
        };
        if metadata.is_dir() {
            let listing = match Listing::scan(path, self.config) {
                Ok(listing) => listing,
                Err(err) => {
                    self.report(path.to_path_buf(), ProblemKind::CouldNotRead(err));
                    return None;
                }
            };
            if !listing.has_repository(self.config) {
                log::debug!("skipping untracked directory {:?}", path);
                return None;
            }
            match self.archive_dir(path, &listing.subdirs, &listing.files) {
                Ok(summary) => Some(Entry {
                    kind: Kind::Dir,
                    metadata,
                    content: summary.into_bytes(),
                }),
                Err(err) => {
                    self.report(path.to_path_buf(), ProblemKind::Subtree(err));
                    None
                }
            }
        } else if metadata.is_file() {
            match fs::read(path) {
                Ok(content) => Some(Entry {
                    kind: Kind::File,
                    metadata,
                    content,
                }),
                Err(err) => {
                    self.report(path.to_path_buf(), ProblemKind::CouldNotRead(err));
                    None
                }
            }
        } else {
            self.report(path.to_path_buf(), ProblemKind::NotFileOrDirectory);
            None
        }
    }

    fn store_entry(
        &mut self,
        store: &mut DirectoryRevisionStore,
        index: &mut RevisionIndex,
        path: &Path,
        name: &str,
        entry: Entry,
    ) {
        match should_store(name, &entry.content, &*index, &*store) {
            Ok(true) => {}
            Ok(false) => return,
            Err(err) => {
                self.report(path.to_path_buf(), ProblemKind::CouldNotRead(err));
                return;
            }
        }
        // Only the file's metadata is needed from here on.
        let Entry {
            kind,
            metadata,
            content,
        } = entry;
        drop(content);
        match kind {
            // Already stored as its own self revision by the recursive call.
            Kind::Dir => log::debug!("{:?} changed", path),
            Kind::File => {
                let modified = metadata
                    .modified()
                    .ok()
                    .and_then(|t| Timestamp::from_system_time(t).ok());
                let timestamp = match next_timestamp(modified, &self.now, index.latest(name)) {
                    Ok(timestamp) => timestamp,
                    Err(err) => {
                        self.report(path.to_path_buf(), ProblemKind::NoRevisionName(err));
                        return;
                    }
                };
                let revision = RevisionName::new(timestamp, name);
                let is_link = fs::symlink_metadata(path)
                    .map(|m| m.file_type().is_symlink())
                    .unwrap_or(false);
                self.observer.event(if is_link {
                    Event::StoringLink(path.to_path_buf())
                } else {
                    Event::StoringFile(path.to_path_buf())
                });
                match store.copy_file(path, &revision) {
                    Ok(()) => index.insert(revision),
                    Err(err) => self.store_failed(path, &revision, err),
                }
            }
        }
    }

    fn store_self(
        &mut self,
        store: &mut DirectoryRevisionStore,
        index: &RevisionIndex,
        root: &Path,
        summary: &str,
    ) {
        match should_store(SELF_NAME, summary.as_bytes(), index, &*store) {
            Ok(true) => {}
            Ok(false) => return,
            Err(err) => {
                self.report(root.to_path_buf(), ProblemKind::CouldNotRead(err));
                return;
            }
        }
        let timestamp = match next_timestamp(None, &self.now, index.latest(SELF_NAME)) {
            Ok(timestamp) => timestamp,
            Err(err) => {
                self.report(root.to_path_buf(), ProblemKind::NoRevisionName(err));
                return;
            }
        };
        let revision = RevisionName::new(timestamp, SELF_NAME);
        self.observer.event(Event::StoringDir(root.to_path_buf()));
        if let Err(err) = store.insert(&revision, summary.as_bytes()) {
            self.store_failed(root, &revision, err);
        }
    }

    fn store_failed(&mut self, path: &Path, revision: &RevisionName, err: std::io::Error) {
        let kind = if err.kind() == ErrorKind::AlreadyExists {
            ProblemKind::RevisionExists(revision.to_string())
        } else {
            ProblemKind::CouldNotStore(err)
        };
        self.report(path.to_path_buf(), kind);
    }

    fn report(&mut self, path: PathBuf, kind: ProblemKind) {
        self.problems += 1;
        let problem = Problem { path, kind };
        log::debug!("{}", problem);
        self.observer.event(Event::Problem(problem));
    }
}

/// Picks the timestamp for a new revision so that it sorts after `latest`:
/// the preferred one (a file's modification time) if that is late enough,
/// else the run's `now`, else one second after `latest`.
///
/// A future dated revision, from clock skew or a restored archive, would
/// otherwise stay "latest" forever and get every run to store again.
fn next_timestamp(
    preferred: Option<Timestamp>,
    now: &Timestamp,
    latest: Option<RevisionName>,
) -> Result<Timestamp, Error> {
    let Some(latest) = latest.map(|revision| revision.timestamp) else {
        return Ok(preferred.unwrap_or_else(|| now.clone()));
    };
    if let Some(preferred) = preferred.filter(|t| *t > latest) {
        return Ok(preferred);
    }
    if *now > latest {
        return Ok(now.clone());
    }
    latest.successor()
}

#[cfg(test)]
fn now(year: i32) -> Timestamp {
    use chrono::{TimeZone, Utc};
    Timestamp::from_datetime(Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap()).unwrap()
}

#[cfg(test)]
fn archive(root: &Path, config: &Config, now: Timestamp) -> (Archived, Vec<Event>) {
    let mut events = Vec::new();
    let archived = Archiver::new(config, now, &mut events)
        .run(root, &[])
        .unwrap();
    (archived, events)
}

#[cfg(test)]
fn revisions(dir: &Path) -> Vec<String> {
    let store = DirectoryRevisionStore::open(dir.join(".Archive")).unwrap();
    store.names().unwrap()
}

#[cfg(test)]
fn tracked_dir(path: &Path) {
    fs::create_dir_all(path.join(".Archive")).unwrap();
}

#[test]
fn test_scenario() {
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    let sub = root.join("sub");
    tracked_dir(root);
    tracked_dir(&sub);
    fs::write(root.join("a.txt"), b"hello").unwrap();
    fs::write(sub.join("b.txt"), b"world").unwrap();
    let config = Config::default();

    let (first, _) = archive(root, &config, now(2100));
    assert_eq!(first.problems, 0);
    let root_revisions = revisions(root);
    let sub_revisions = revisions(&sub);
    assert_eq!(root_revisions.len(), 2);
    assert_eq!(sub_revisions.len(), 2);
    assert!(root_revisions.contains(&String::from("Y21000101T000000Z_.")));
    assert!(root_revisions.iter().any(|r| r.ends_with("_a.txt")));
    assert!(sub_revisions.contains(&String::from("Y21000101T000000Z_.")));
    assert!(sub_revisions.iter().any(|r| r.ends_with("_b.txt")));

    let (second, events) = archive(root, &config, now(2101));
    assert_eq!(second.summary, first.summary);
    assert_eq!(revisions(root), root_revisions);
    assert_eq!(revisions(&sub), sub_revisions);
    assert!(!events.iter().any(|e| matches!(
        e,
        Event::StoringFile(_) | Event::StoringDir(_) | Event::StoringLink(_)
    )));

    fs::write(root.join("a.txt"), b"hello!").unwrap();
    let (third, _) = archive(root, &config, now(2102));
    assert_ne!(third.summary, first.summary);
    let new: Vec<String> = revisions(root)
        .into_iter()
        .filter(|r| !root_revisions.contains(r))
        .collect();
    assert_eq!(new.len(), 2);
    assert!(new.contains(&String::from("Y21020101T000000Z_.")));
    assert!(new.iter().any(|r| r.ends_with("_a.txt")));
    assert_eq!(revisions(&sub), sub_revisions);
}

#[test]
fn test_stored_content() {
    use crate::{content_hash::ContentHash, summary::Summary};
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    tracked_dir(root);
    tracked_dir(&root.join("sub"));
    fs::write(root.join("a.txt"), b"hello").unwrap();
    let (archived, _) = archive(root, &Config::default(), now(2100));

    let stored = fs::read_to_string(root.join(".Archive").join("Y21000101T000000Z_.")).unwrap();
    assert_eq!(stored, archived.summary);
    let summary: Summary = stored.parse().unwrap();
    assert!(summary.is_consistent());
    assert!(summary.this.is_dir());
    let names: Vec<&str> = summary.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["sub", "a.txt"]);
    assert_eq!(
        summary.entry("a.txt").unwrap().hash,
        ContentHash::from(&b"hello"[..])
    );

    let sub_summary = fs::read(root.join("sub/.Archive/Y21000101T000000Z_.")).unwrap();
    assert_eq!(
        summary.entry("sub").unwrap().hash,
        ContentHash::from(&sub_summary)
    );

    let a_revision = revisions(root)
        .into_iter()
        .find(|r| r.ends_with("_a.txt"))
        .unwrap();
    assert_eq!(fs::read(root.join(".Archive").join(a_revision)).unwrap(), b"hello");
}

#[test]
fn test_change_propagates_to_root() {
    use crate::summary::Summary;
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    let middle = root.join("middle");
    let leaf = middle.join("leaf");
    tracked_dir(root);
    tracked_dir(&middle);
    tracked_dir(&leaf);
    fs::write(root.join("top.txt"), b"top").unwrap();
    fs::write(middle.join("middle.txt"), b"middle").unwrap();
    fs::write(leaf.join("deep.txt"), b"deep").unwrap();
    let config = Config::default();

    let (before, _) = archive(root, &config, now(2100));
    fs::write(leaf.join("deep.txt"), b"deeper").unwrap();
    let (after, _) = archive(root, &config, now(2101));

    let before: Summary = before.summary.parse().unwrap();
    let after: Summary = after.summary.parse().unwrap();
    assert_ne!(before.this.hash, after.this.hash);
    assert_ne!(before.entry("middle"), after.entry("middle"));
    assert_eq!(before.entry("top.txt"), after.entry("top.txt"));

    for dir in [root, middle.as_path(), leaf.as_path()] {
        assert!(revisions(dir).contains(&String::from("Y21010101T000000Z_.")));
    }
    assert_eq!(
        revisions(&leaf).iter().filter(|r| r.ends_with("_deep.txt")).count(),
        2
    );
    assert_eq!(revisions(&middle).len(), 3);
}

#[test]
fn test_untracked_subdirectory_is_invisible() {
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    tracked_dir(root);
    fs::create_dir(root.join("plain")).unwrap();
    fs::write(root.join("plain").join("x.txt"), b"x").unwrap();
    fs::write(root.join("a.txt"), b"a").unwrap();
    let config = Config::default();

    let (first, events) = archive(root, &config, now(2100));
    assert!(!first.summary.contains(" plain\n"));
    assert!(!events
        .iter()
        .any(|e| matches!(e, Event::Archiving(p) if p.ends_with("plain"))));
    assert!(!root.join("plain").join(".Archive").exists());

    fs::write(root.join("plain").join("x.txt"), b"changed").unwrap();
    let (second, _) = archive(root, &config, now(2101));
    assert_eq!(first.summary, second.summary);
    assert_eq!(revisions(root).len(), 2);
}

#[test]
fn test_missing_repository_is_fatal() {
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    fs::write(root.join("a.txt"), b"a").unwrap();
    let mut events = Vec::new();
    let config = Config::default();
    let result = Archiver::new(&config, now(2100), &mut events).run(root, &[]);
    assert!(matches!(result, Err(Error::NoRepository(_))));
    assert!(events.is_empty());
    assert_eq!(fs::read_dir(root).unwrap().count(), 1);
}

#[test]
fn test_ignored_names() {
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    tracked_dir(root);
    tracked_dir(&root.join("build"));
    fs::write(root.join("main.c"), b"int main;").unwrap();
    fs::write(root.join("main.o"), b"\x7fELF").unwrap();
    let config = Config {
        ignore: ["build", "main.o"].into_iter().map(String::from).collect(),
        ..Config::default()
    };
    let (archived, _) = archive(root, &config, now(2100));
    assert!(archived.summary.ends_with(" main.c\n"));
    assert_eq!(archived.summary.lines().count(), 2);
    assert!(revisions(&root.join("build")).is_empty());
}

#[test]
fn test_explicit_paths() {
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    tracked_dir(root);
    fs::write(root.join("a.c"), b"a").unwrap();
    fs::write(root.join("b.h"), b"b").unwrap();
    fs::write(root.join("notes.txt"), b"n").unwrap();
    let config = Config::default();
    let paths = [
        PathBuf::from("b.h"),
        PathBuf::from("a.c"),
        PathBuf::from("missing.c"),
        PathBuf::from("two words.c"),
        PathBuf::from("../escape.c"),
    ];

    let mut events = Vec::new();
    let archived = Archiver::new(&config, now(2100), &mut events)
        .run(root, &paths)
        .unwrap();
    assert_eq!(archived.problems, 3);
    let names: Vec<&str> = archived
        .summary
        .lines()
        .map(|l| l.rsplit(' ').next().unwrap())
        .collect();
    assert_eq!(names, vec![".", "a.c", "b.h"]);
    let problems = events
        .iter()
        .filter(|e| matches!(e, Event::Problem(_)))
        .count();
    assert_eq!(problems, 3);
}

#[test]
fn test_only_bad_paths_falls_back_to_everything() {
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    tracked_dir(root);
    fs::write(root.join("a.c"), b"a").unwrap();
    let config = Config::default();
    let mut events = Vec::new();
    let archived = Archiver::new(&config, now(2100), &mut events)
        .run(root, &[PathBuf::from("missing.c")])
        .unwrap();
    assert_eq!(archived.problems, 1);
    assert!(archived.summary.ends_with(" a.c\n"));
}

#[test]
fn test_file_revision_uses_mtime() {
    use std::time::{Duration, UNIX_EPOCH};
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    tracked_dir(root);
    let file = root.join("a.txt");
    fs::write(&file, b"a").unwrap();
    let mtime = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    fs::File::options()
        .write(true)
        .open(&file)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
    archive(root, &Config::default(), now(2100));
    assert!(revisions(root).contains(&String::from("Y20231114T221320Z_a.txt")));

    // Same modification time, different content: the run's timestamp keeps
    // the new revision last.
    fs::write(&file, b"b").unwrap();
    fs::File::options()
        .write(true)
        .open(&file)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
    archive(root, &Config::default(), now(2101));
    let names = revisions(root);
    assert!(names.contains(&String::from("Y21010101T000000Z_a.txt")));
    let index = RevisionIndex::from_names(&names);
    assert_eq!(
        index.latest("a.txt").unwrap().to_string(),
        "Y21010101T000000Z_a.txt"
    );
}

#[test]
fn test_rerun_in_same_second_takes_next_second() {
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    tracked_dir(root);
    fs::write(root.join("a.txt"), b"a").unwrap();
    let config = Config::default();
    archive(root, &config, now(2100));
    fs::write(root.join("b.txt"), b"b").unwrap();
    let (archived, _) = archive(root, &config, now(2100));
    assert_eq!(archived.problems, 0);
    let stored = fs::read_to_string(root.join(".Archive/Y21000101T000001Z_.")).unwrap();
    assert_eq!(stored, archived.summary);
    assert!(stored.contains(" b.txt\n"));
}

#[test]
fn test_future_dated_revision_stays_idempotent() {
    use chrono::{TimeZone, Utc};
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    tracked_dir(root);
    let file = root.join("a.txt");
    fs::write(&file, b"from the future").unwrap();
    let future: std::time::SystemTime = Utc.with_ymd_and_hms(2200, 1, 1, 0, 0, 0).unwrap().into();
    fs::File::options()
        .write(true)
        .open(&file)
        .unwrap()
        .set_modified(future)
        .unwrap();
    let config = Config::default();
    archive(root, &config, now(2100));

    fs::write(&file, b"edited today").unwrap();
    archive(root, &config, now(2101));
    for year in [2102, 2103] {
        let (_, events) = archive(root, &config, now(year));
        assert!(!events.iter().any(|e| matches!(e, Event::StoringFile(_))));
    }
    let a: Vec<String> = revisions(root)
        .into_iter()
        .filter(|r| r.ends_with("_a.txt"))
        .collect();
    assert_eq!(a, vec!["Y22000101T000000Z_a.txt", "Y22000101T000001Z_a.txt"]);
    let latest = fs::read(root.join(".Archive/Y22000101T000001Z_a.txt")).unwrap();
    assert_eq!(latest, b"edited today");
}

#[test]
fn test_next_timestamp() {
    let latest = |s: &str| Some(RevisionName::new(Timestamp::parse(s).unwrap(), "a"));
    let ts = |s: &str| Timestamp::parse(s).unwrap();
    let run = ts("Y21000101T000000Z_");

    assert_eq!(next_timestamp(None, &run, None).unwrap(), run);
    let mtime = ts("Y20240101T000000Z_");
    assert_eq!(next_timestamp(Some(mtime.clone()), &run, None).unwrap(), mtime);
    assert_eq!(
        next_timestamp(Some(mtime.clone()), &run, latest("Y20230101T000000Z_")).unwrap(),
        mtime
    );
    assert_eq!(
        next_timestamp(Some(mtime.clone()), &run, latest("Y20240101T000000Z_")).unwrap(),
        run
    );
    assert_eq!(
        next_timestamp(Some(mtime), &run, latest("Y22000101T000000Z_")).unwrap(),
        ts("Y22000101T000001Z_")
    );
    assert!(next_timestamp(None, &run, latest("Y99991231T235959Z_")).is_err());
}

#[test]
fn test_explicit_ignored_name_is_dropped() {
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    tracked_dir(root);
    fs::write(root.join("main.c"), b"int main;").unwrap();
    fs::write(root.join("main.o"), b"\x7fELF").unwrap();
    let config = Config {
        ignore: ["main.o"].into_iter().map(String::from).collect(),
        ..Config::default()
    };
    let mut events = Vec::new();
    let archived = Archiver::new(&config, now(2100), &mut events)
        .run(root, &[PathBuf::from("main.o"), PathBuf::from("main.c")])
        .unwrap();
    assert_eq!(archived.problems, 0);
    assert!(!archived.summary.contains("main.o"));
    assert!(archived.summary.ends_with(" main.c\n"));
    assert!(!revisions(root).iter().any(|r| r.ends_with("_main.o")));
}

#[test]
fn test_unstattable_directory_is_an_error() {
    let tempdir = tempfile::tempdir().unwrap();
    let mut events = Vec::new();
    let config = Config::default();
    let mut archiver = Archiver::new(&config, now(2100), &mut events);
    let result = archiver.archive_dir(&tempdir.path().join("gone"), &[], &[]);
    assert!(matches!(result, Err(Error::IO(ref err)) if err.kind() == ErrorKind::NotFound));
    drop(archiver);
    assert!(events.is_empty());
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_reported_and_left_out() {
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    tracked_dir(root);
    fs::write(root.join("a.txt"), b"a").unwrap();
    let secret = root.join("secret.txt");
    fs::write(&secret, b"s").unwrap();
    set_mode(&secret, 0o000);
    if fs::read(&secret).is_ok() {
        // Permission bits don't apply to this user.
        return;
    }
    let config = Config::default();

    let (first, events) = archive(root, &config, now(2100));
    assert_eq!(first.problems, 1);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Problem(Problem {
            kind: ProblemKind::CouldNotRead(_),
            ..
        })
    )));
    assert!(!first.summary.contains("secret.txt"));
    assert!(!revisions(root).iter().any(|r| r.ends_with("_secret.txt")));

    set_mode(&secret, 0o644);
    let (second, _) = archive(root, &config, now(2101));
    assert_eq!(second.problems, 0);
    assert!(second.summary.ends_with(" secret.txt\n"));
    assert!(revisions(root).contains(&String::from("Y21010101T000000Z_.")));
    assert!(revisions(root).iter().any(|r| r.ends_with("_secret.txt")));
}

#[cfg(unix)]
#[test]
fn test_unlistable_subtree_is_reported_and_left_out() {
    let tempdir = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    let sub = root.join("sub");
    tracked_dir(root);
    tracked_dir(&sub);
    fs::write(sub.join("b.txt"), b"b").unwrap();
    fs::write(root.join("a.txt"), b"a").unwrap();
    let repository = sub.join(".Archive");
    set_mode(&repository, 0o000);
    if fs::read_dir(&repository).is_ok() {
        set_mode(&repository, 0o755);
        return;
    }

    let (archived, events) = archive(root, &Config::default(), now(2100));
    set_mode(&repository, 0o755);
    assert_eq!(archived.problems, 1);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Problem(Problem {
            kind: ProblemKind::Subtree(_),
            path,
        }) if path.ends_with("sub")
    )));
    assert!(!archived.summary.contains(" sub\n"));
    assert!(archived.summary.ends_with(" a.txt\n"));
    assert!(revisions(&sub).is_empty());
}

#[cfg(unix)]
#[test]
fn test_symlink_stores_target_data() {
    let tempdir = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let root = tempdir.path();
    tracked_dir(root);
    fs::write(outside.path().join("target.txt"), b"linked data").unwrap();
    std::os::unix::fs::symlink(outside.path().join("target.txt"), root.join("link.txt")).unwrap();
    let (_, events) = archive(root, &Config::default(), now(2100));
    assert!(events.iter().any(|e| matches!(e, Event::StoringLink(_))));
    let revision = revisions(root)
        .into_iter()
        .find(|r| r.ends_with("_link.txt"))
        .unwrap();
    let stored = root.join(".Archive").join(revision);
    assert!(!fs::symlink_metadata(&stored).unwrap().file_type().is_symlink());
    assert_eq!(fs::read(stored).unwrap(), b"linked data");
}
