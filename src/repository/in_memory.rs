use std::{collections::BTreeMap, convert::Infallible};

use crate::revision::RevisionName;

use super::RevisionStore;

#[derive(Debug, Default)]
pub struct InMemoryRevisionStore {
    revisions: BTreeMap<String, Vec<u8>>,
}

impl InMemoryRevisionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RevisionStore for InMemoryRevisionStore {
    type Error = Infallible;

    fn names(&self) -> Result<Vec<String>, Self::Error> {
        Ok(self.revisions.keys().cloned().collect())
    }

    fn read(&self, revision: &RevisionName) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.revisions.get(&revision.to_string()).cloned())
    }

    /// A revision which already exists is left as it was.
    fn insert(&mut self, revision: &RevisionName, content: &[u8]) -> Result<(), Self::Error> {
        self.revisions
            .entry(revision.to_string())
            .or_insert_with(|| Vec::from(content));
        Ok(())
    }
}

#[test]
fn test_in_memory_revision_store() {
    use crate::revision::Timestamp;
    let mut store = InMemoryRevisionStore::new();
    let ts = Timestamp::parse("Y20240101T000000Z_").unwrap();
    let rev = RevisionName::new(ts, "hello.txt");
    store.insert(&rev, b"hello, world").unwrap();
    store.insert(&rev, b"overwritten?").unwrap();
    assert_eq!(store.read(&rev).unwrap(), Some(Vec::from(&b"hello, world"[..])));
    assert_eq!(store.names().unwrap(), vec!["Y20240101T000000Z_hello.txt"]);
}
