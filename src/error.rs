use std::{fmt, path::PathBuf};

use derive_more::{Display, From};

/// Errors which stop an archiving run, or the processing of a whole subtree.
#[derive(Debug, Display, From)]
pub enum Error {
    #[from]
    #[display(fmt = "{}", _0)]
    IO(std::io::Error),
    #[from]
    #[display(fmt = "{}", _0)]
    Serde(serde_json::Error),
    #[display(fmt = "no repository in {:?}, use the init command first", _0)]
    NoRepository(PathBuf),
    #[display(fmt = "malformed revision name {:?}", _0)]
    MalformedRevisionName(String),
    /// Only four digit years fit the fixed width revision prefix.
    #[display(fmt = "year {} does not fit in a revision timestamp", _0)]
    TimestampOutOfRange(i32),
    #[display(fmt = "malformed summary line {:?}", _0)]
    MalformedSummaryLine(String),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IO(err) => Some(err),
            Error::Serde(err) => Some(err),
            _ => None,
        }
    }
}

/// An entry which was left out of this run and reported to the operator.
#[derive(Debug)]
pub struct Problem {
    pub path: PathBuf,
    pub kind: ProblemKind,
}

#[derive(Debug)]
pub enum ProblemKind {
    CouldNotStat(std::io::Error),
    CouldNotRead(std::io::Error),
    NotFileOrDirectory,
    /// Whitespace, a path separator, or invalid UTF-8 in an explicitly named path.
    UnusableName,
    CouldNotStore(std::io::Error),
    /// The repository already holds a revision with the name we would write.
    RevisionExists(String),
    /// No timestamp sorts after the latest revision, i.e. it is dated 9999-12-31T23:59:59.
    NoRevisionName(Error),
    /// A tracked subdirectory could not be archived at all.
    Subtree(Error),
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.display();
        match &self.kind {
            ProblemKind::CouldNotStat(err) => write!(f, "could not stat {}: {}", path, err),
            ProblemKind::CouldNotRead(err) => write!(f, "could not read {}: {}", path, err),
            ProblemKind::NotFileOrDirectory => write!(f, "non-file non-dir {}", path),
            ProblemKind::UnusableName => write!(f, "unusable filename {}", path),
            ProblemKind::CouldNotStore(err) => write!(f, "could not store {}: {}", path, err),
            ProblemKind::RevisionExists(name) => {
                write!(f, "revision {} of {} already exists", name, path)
            }
            ProblemKind::NoRevisionName(err) => {
                write!(f, "no revision name left for {}: {}", path, err)
            }
            ProblemKind::Subtree(err) => write!(f, "could not archive {}: {}", path, err),
        }
    }
}

#[test]
fn test_problem_display() {
    let problem = Problem {
        path: PathBuf::from("docs/a b.txt"),
        kind: ProblemKind::UnusableName,
    };
    assert_eq!(problem.to_string(), "unusable filename docs/a b.txt");
    let err = Error::NoRepository(PathBuf::from("."));
    assert!(err.to_string().starts_with("no repository in"));
}
