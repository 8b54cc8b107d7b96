use std::{fmt::Display, str::FromStr, time::SystemTime};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::error::Error;

const FORMAT: &str = "Y%Y%m%dT%H%M%SZ_";

/// The fixed width prefix of every revision file name, e.g. `Y20240131T235959Z_`.
///
/// Because every timestamp has the same width and is zero padded, comparing
/// them as strings orders them chronologically. That stops holding in the
/// year 10000, so such years are refused rather than encoded wider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(String);

impl Timestamp {
    pub const LEN: usize = 18;

    pub fn now() -> Result<Self, Error> {
        Timestamp::from_datetime(Utc::now())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Result<Self, Error> {
        if !(0..=9999).contains(&at.year()) {
            return Err(Error::TimestampOutOfRange(at.year()));
        }
        Ok(Timestamp(at.format(FORMAT).to_string()))
    }

    pub fn from_system_time(at: SystemTime) -> Result<Self, Error> {
        Timestamp::from_datetime(DateTime::<Utc>::from(at))
    }

    /// Validates a timestamp prefix: the literal letters in place, digits
    /// everywhere else, and a real calendar date and time of day.
    pub fn parse(s: &str) -> Option<Self> {
        fields(s)?;
        Some(Timestamp(s.to_owned()))
    }

    /// The timestamp one second later.
    pub fn successor(&self) -> Result<Self, Error> {
        // Only ever built from a validated or formatted prefix.
        let at = fields(&self.0).ok_or_else(|| Error::MalformedRevisionName(self.0.clone()))?;
        let next = at
            .checked_add_signed(Duration::seconds(1))
            .ok_or(Error::TimestampOutOfRange(at.year()))?;
        Timestamp::from_datetime(Utc.from_utc_datetime(&next))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn fields(s: &str) -> Option<NaiveDateTime> {
    let b = s.as_bytes();
    if b.len() != Timestamp::LEN || b[0] != b'Y' || b[9] != b'T' || b[16] != b'Z' || b[17] != b'_'
    {
        return None;
    }
    let digits = |range: std::ops::Range<usize>| -> Option<u32> {
        let mut n = 0;
        for &c in &b[range] {
            if !c.is_ascii_digit() {
                return None;
            }
            n = n * 10 + (c - b'0') as u32;
        }
        Some(n)
    };
    let date = NaiveDate::from_ymd_opt(digits(1..5)? as i32, digits(5..7)?, digits(7..9)?)?;
    let time = NaiveTime::from_hms_opt(digits(10..12)?, digits(12..14)?, digits(14..16)?)?;
    Some(date.and_time(time))
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The file name of a stored revision: `<timestamp><name>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RevisionName {
    pub timestamp: Timestamp,
    pub name: String,
}

impl RevisionName {
    pub fn new(timestamp: Timestamp, name: impl Into<String>) -> Self {
        RevisionName {
            timestamp,
            name: name.into(),
        }
    }
}

impl Display for RevisionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.timestamp, self.name)
    }
}

impl FromStr for RevisionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::MalformedRevisionName(s.to_owned());
        let prefix = s.get(..Timestamp::LEN).ok_or_else(malformed)?;
        let timestamp = Timestamp::parse(prefix).ok_or_else(malformed)?;
        let name = &s[Timestamp::LEN..];
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(malformed());
        }
        Ok(RevisionName::new(timestamp, name))
    }
}

#[cfg(test)]
fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

#[test]
fn test_timestamp_format() {
    let ts = Timestamp::from_datetime(at(2024, 1, 31, 23, 5, 9)).unwrap();
    assert_eq!(ts.as_str(), "Y20240131T230509Z_");
    assert_eq!(ts.as_str().len(), Timestamp::LEN);
    let early = Timestamp::from_datetime(at(987, 6, 5, 4, 3, 2)).unwrap();
    assert_eq!(early.as_str(), "Y09870605T040302Z_");
}

#[test]
fn test_year_ten_thousand_is_refused() {
    assert!(matches!(
        Timestamp::from_datetime(at(10000, 1, 1, 0, 0, 0)),
        Err(Error::TimestampOutOfRange(10000))
    ));
}

#[test]
fn test_revisions_sort_chronologically() {
    let times = [
        at(1999, 12, 31, 23, 59, 59),
        at(2000, 1, 1, 0, 0, 0),
        at(2000, 1, 1, 0, 0, 1),
        at(2000, 1, 10, 0, 0, 0),
        at(2023, 11, 2, 8, 0, 0),
    ];
    let mut names: Vec<String> = times
        .iter()
        .map(|t| RevisionName::new(Timestamp::from_datetime(*t).unwrap(), "notes.txt").to_string())
        .collect();
    let chronological = names.clone();
    names.sort();
    assert_eq!(names, chronological);
}

#[test]
fn test_successor() {
    let ts = Timestamp::parse("Y20231231T235959Z_").unwrap();
    assert_eq!(ts.successor().unwrap().as_str(), "Y20240101T000000Z_");
    assert!(ts.successor().unwrap() > ts);
    let last = Timestamp::parse("Y99991231T235959Z_").unwrap();
    assert!(matches!(last.successor(), Err(Error::TimestampOutOfRange(_))));
}

#[test]
fn test_parse_revision_name() {
    let rev: RevisionName = "Y20240131T230509Z_notes.txt".parse().unwrap();
    assert_eq!(rev.timestamp.as_str(), "Y20240131T230509Z_");
    assert_eq!(rev.name, "notes.txt");
    let dir: RevisionName = "Y20240131T230509Z_.".parse().unwrap();
    assert_eq!(dir.name, ".");
    assert_eq!(dir.to_string(), "Y20240131T230509Z_.");
}

#[test]
fn test_parse_rejects_malformed() {
    for bad in [
        "notes.txt",
        "Y20240131T230509Z_",
        "Y+100000131T230509Z_notes.txt",
        "Y20241331T230509Z_notes.txt",
        "Y20240131T250509Z_notes.txt",
        "X20240131T230509Z_notes.txt",
        "Y2024013lT230509Z_notes.txt",
    ] {
        assert!(bad.parse::<RevisionName>().is_err(), "{}", bad);
    }
}
