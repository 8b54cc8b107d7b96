//! # Archiver
//!
//! A simple recursive file revision control system. Every archived directory
//! holds a repository subdirectory with timestamped copies of each file as it
//! was whenever it changed, plus a summary of the directory itself whose
//! hashes chain up from the deepest tracked subdirectory to the root.

mod b64;

/// The archiving pass itself.
pub mod archiver;
/// Deciding whether content differs from its latest revision.
pub mod comparator;
/// Settings threaded through a run.
pub mod config;
/// SHA-384 digest of binary content.
pub mod content_hash;
pub mod error;
/// All revisions in one repository, by name.
pub mod index;
pub mod mode;
/// Storage of revisions.
pub mod repository;
/// Revision file names and their timestamps.
pub mod revision;
pub mod scanner;
pub mod summary;

pub use archiver::{Archived, Archiver, Event, Observer};
pub use config::Config;
pub use error::{Error, Problem};
pub use revision::Timestamp;
