use crate::{index::RevisionIndex, repository::RevisionStore};

/// Decides whether `content` has to be stored as a new revision of `name`.
///
/// It does unless the latest stored revision of `name` holds exactly the same
/// bytes. This compares the bytes themselves, not their hashes.
pub fn should_store<S: RevisionStore>(
    name: &str,
    content: &[u8],
    index: &RevisionIndex,
    store: &S,
) -> Result<bool, S::Error> {
    let Some(latest) = index.latest(name) else {
        log::debug!("{} has no revisions yet", name);
        return Ok(true);
    };
    // The previous content is dropped before returning, so large files aren't
    // kept alive while the caller recurses.
    let differs = match store.read(&latest)? {
        Some(previous) => previous != content,
        None => {
            log::warn!("revision {} vanished", latest);
            true
        }
    };
    log::debug!("{} {} {}", name, if differs { "differs from" } else { "matches" }, latest);
    Ok(differs)
}

#[cfg(test)]
use crate::{repository::in_memory::InMemoryRevisionStore, revision::RevisionName};

#[cfg(test)]
fn store_with(revisions: &[(&str, &[u8])]) -> (InMemoryRevisionStore, RevisionIndex) {
    let mut store = InMemoryRevisionStore::new();
    for (name, content) in revisions {
        let revision: RevisionName = name.parse().unwrap();
        store.insert(&revision, content).unwrap();
    }
    let index = RevisionIndex::build(&store).unwrap();
    (store, index)
}

#[test]
fn test_new_name_is_stored() {
    let (store, index) = store_with(&[("Y20240101T000000Z_other.txt", &b"hello"[..])]);
    assert!(should_store("hello.txt", b"hello", &index, &store).unwrap());
}

#[test]
fn test_unchanged_is_skipped() {
    let (store, index) = store_with(&[("Y20240101T000000Z_hello.txt", &b"hello"[..])]);
    assert!(!should_store("hello.txt", b"hello", &index, &store).unwrap());
    assert!(should_store("hello.txt", b"hello!", &index, &store).unwrap());
}

#[test]
fn test_only_latest_counts() {
    let (store, index) = store_with(&[
        ("Y20240101T000000Z_hello.txt", &b"first"[..]),
        ("Y20240301T000000Z_hello.txt", &b"third"[..]),
        ("Y20240201T000000Z_hello.txt", &b"second"[..]),
    ]);
    assert!(!should_store("hello.txt", b"third", &index, &store).unwrap());
    // Reverting to an older revision's content is still a change.
    assert!(should_store("hello.txt", b"first", &index, &store).unwrap());
}

#[test]
fn test_vanished_revision_is_stored() {
    let (store, _) = store_with(&[]);
    let index = RevisionIndex::from_names(["Y20240101T000000Z_hello.txt"]);
    assert!(should_store("hello.txt", b"hello", &index, &store).unwrap());
}
