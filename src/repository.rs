use crate::revision::RevisionName;

pub mod directory;
pub mod in_memory;

/// Where the revisions of one archived directory live.
///
/// Revisions are immutable: `insert` never replaces an existing revision.
pub trait RevisionStore {
    type Error;

    /// Every file name in the store, whether or not it parses as a revision.
    fn names(&self) -> Result<Vec<String>, Self::Error>;

    fn read(&self, revision: &RevisionName) -> Result<Option<Vec<u8>>, Self::Error>;

    fn insert(&mut self, revision: &RevisionName, content: &[u8]) -> Result<(), Self::Error>;
}
