use std::collections::{BTreeMap, BTreeSet};

use crate::{
    repository::RevisionStore,
    revision::{RevisionName, Timestamp},
};

/// Every name stored in one repository, each with the timestamps of all of
/// its revisions. Rebuilt from the repository contents on every run.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct RevisionIndex {
    revisions: BTreeMap<String, BTreeSet<Timestamp>>,
}

impl RevisionIndex {
    pub fn build<S: RevisionStore>(store: &S) -> Result<Self, S::Error> {
        Ok(RevisionIndex::from_names(store.names()?))
    }

    /// Files whose names don't parse as revisions are logged and left out,
    /// instead of being split at a fixed width into a bogus name.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = RevisionIndex::default();
        for name in names {
            match name.as_ref().parse::<RevisionName>() {
                Ok(revision) => index.insert(revision),
                Err(err) => log::warn!("ignoring repository entry: {}", err),
            }
        }
        index
    }

    pub fn insert(&mut self, revision: RevisionName) {
        self.revisions
            .entry(revision.name)
            .or_default()
            .insert(revision.timestamp);
    }

    /// The most recent revision of `name`, i.e. the one with the greatest timestamp.
    pub fn latest(&self, name: &str) -> Option<RevisionName> {
        let timestamp = self.revisions.get(name)?.last()?;
        Some(RevisionName::new(timestamp.clone(), name))
    }
}

#[test]
fn test_merge() {
    let index = RevisionIndex::from_names([
        "Y20240301T000000Z_a.txt",
        "Y20240101T000000Z_a.txt",
        "Y20240201T000000Z_.",
        "Y20240201T000000Z_b.txt",
        "stray-file",
    ]);
    assert_eq!(
        index.latest("a.txt").unwrap().to_string(),
        "Y20240301T000000Z_a.txt"
    );
    assert_eq!(index.latest(".").unwrap().to_string(), "Y20240201T000000Z_.");
    assert_eq!(index.latest("b.txt").unwrap().to_string(), "Y20240201T000000Z_b.txt");
    assert_eq!(index.latest("c.txt"), None);
    assert_eq!(index.latest("stray-file"), None);
}

#[test]
fn test_insert() {
    let mut index = RevisionIndex::from_names(["Y20240201T000000Z_a.txt"]);
    let older: RevisionName = "Y20240101T000000Z_a.txt".parse().unwrap();
    index.insert(older);
    assert_eq!(
        index.latest("a.txt").unwrap().to_string(),
        "Y20240201T000000Z_a.txt"
    );
    let newer: RevisionName = "Y20240301T000000Z_a.txt".parse().unwrap();
    index.insert(newer.clone());
    assert_eq!(index.latest("a.txt"), Some(newer));
}
