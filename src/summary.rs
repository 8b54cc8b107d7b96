//! The text format of directory summaries.
//!
//! A summary has one line per entry, `<hash> <mode> <name>\n`. The first line
//! always describes the directory itself under the name `.`, and its hash
//! covers every line after it. This text is what gets stored as the
//! directory's own revision, and what the parent directory hashes.

use std::{fmt::Display, fs::Metadata, str::FromStr};

use crate::{content_hash::ContentHash, error::Error, mode};

/// The name a directory's own line is stored under.
pub const SELF_NAME: &str = ".";

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct SummaryLine {
    pub hash: ContentHash,
    pub mode: String,
    pub name: String,
}

impl SummaryLine {
    pub fn new(content: &[u8], metadata: &Metadata, name: &str) -> Self {
        SummaryLine {
            hash: ContentHash::from(content),
            mode: mode::mode_string(metadata),
            name: name.to_owned(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mode.starts_with('d')
    }
}

impl Display for SummaryLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} {} {}", self.hash, self.mode, self.name)
    }
}

/// Parses one line, with or without its trailing newline. Names may contain
/// spaces; everything after the second space is the name.
impl FromStr for SummaryLine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::MalformedSummaryLine(s.to_owned());
        let line = s.strip_suffix('\n').unwrap_or(s);
        let mut parts = line.splitn(3, ' ');
        let (Some(hash), Some(mode), Some(name)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if !mode::is_mode_string(mode) || name.is_empty() || name.contains('\n') {
            return Err(malformed());
        }
        Ok(SummaryLine {
            hash: hash.parse().map_err(|_| malformed())?,
            mode: mode.to_owned(),
            name: name.to_owned(),
        })
    }
}

/// A parsed directory summary.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Summary {
    pub this: SummaryLine,
    pub entries: Vec<SummaryLine>,
}

impl Summary {
    pub fn entry(&self, name: &str) -> Option<&SummaryLine> {
        self.entries.iter().find(|line| line.name == name)
    }

    /// Whether the self line's hash matches the entry lines below it.
    pub fn is_consistent(&self) -> bool {
        let rest: String = self.entries.iter().map(ToString::to_string).collect();
        self.this.hash == ContentHash::from(rest.as_bytes())
    }
}

impl FromStr for Summary {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = s.split_inclusive('\n').map(|line| {
            if line.ends_with('\n') {
                line.parse::<SummaryLine>()
            } else {
                Err(Error::MalformedSummaryLine(line.to_owned()))
            }
        });
        let this = lines
            .next()
            .ok_or_else(|| Error::MalformedSummaryLine(String::new()))??;
        if this.name != SELF_NAME {
            return Err(Error::MalformedSummaryLine(this.to_string()));
        }
        let entries = lines.collect::<Result<Vec<_>, _>>()?;
        Ok(Summary { this, entries })
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.this)?;
        for entry in &self.entries {
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
fn line(content: &[u8], mode: &str, name: &str) -> SummaryLine {
    SummaryLine {
        hash: ContentHash::from(content),
        mode: mode.to_owned(),
        name: name.to_owned(),
    }
}

#[test]
fn test_line_format() {
    let l = line(b"hello", "-rw-r--r--", "a.txt");
    assert_eq!(
        l.to_string(),
        "WeF0h3dEjGnea4ANejO7-5_xtGPkQ1TDVTvNucZm-pASWjx5-QOXvfX2oT3oKGhP -rw-r--r-- a.txt\n"
    );
    assert_eq!(l.to_string().parse::<SummaryLine>().unwrap(), l);
    let spaced = line(b"x", "-rw-------", "my notes.txt");
    assert_eq!(spaced.to_string().parse::<SummaryLine>().unwrap().name, "my notes.txt");
}

#[test]
fn test_line_rejects_garbage() {
    let hash = ContentHash::from(&b"x"[..]).to_string();
    for bad in [
        String::from(""),
        String::from("short -rw-r--r-- a.txt"),
        format!("{} -rw-r--r--", hash),
        format!("{} rw-r--r-- a.txt", hash),
        format!("{} -rw-r--r-- ", hash),
    ] {
        assert!(bad.parse::<SummaryLine>().is_err(), "{:?}", bad);
    }
}

#[test]
fn test_summary() {
    let entries = vec![
        line(b"sub summary", "drwxr-xr-x", "sub"),
        line(b"hello", "-rw-r--r--", "a.txt"),
    ];
    let rest: String = entries.iter().map(ToString::to_string).collect();
    let summary = Summary {
        this: line(rest.as_bytes(), "drwxr-xr-x", SELF_NAME),
        entries,
    };
    assert!(summary.is_consistent());
    let text = summary.to_string();
    let parsed: Summary = text.parse().unwrap();
    assert_eq!(parsed, summary);
    assert!(parsed.entry("sub").unwrap().is_dir());
    assert!(parsed.entry("missing").is_none());

    assert!(rest.parse::<Summary>().is_err());
    assert!(text.trim_end().parse::<Summary>().is_err());
    assert!("".parse::<Summary>().is_err());
}
