// src/version.rs

//! Version tokens and their ordering
//!
//! Versions are opaque ASCII tokens. They are ordered by splitting into
//! maximal runs of digits and non-digits and comparing the runs pairwise:
//! digit runs by numeric magnitude, everything else byte-wise.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Longest version token accepted from disk or the network
pub const MAX_VERSION_LENGTH: usize = 64;

/// A validated version token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionString(String);

impl VersionString {
    /// Validate and wrap a version token
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidVersion("empty version".to_string()));
        }

        if s.len() > MAX_VERSION_LENGTH {
            return Err(Error::InvalidVersion(format!(
                "version longer than {} bytes",
                MAX_VERSION_LENGTH
            )));
        }

        if !s.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(Error::InvalidVersion(format!(
                "version {:?} contains non-printable or non-ASCII characters",
                s
            )));
        }

        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for VersionString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Ord for VersionString {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_versions(&self.0, &other.0)
    }
}

impl PartialOrd for VersionString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Split a version into maximal runs of digits and non-digits
fn segments(s: &str) -> impl Iterator<Item = &[u8]> {
    let bytes = s.as_bytes();
    let mut pos = 0;

    std::iter::from_fn(move || {
        if pos >= bytes.len() {
            return None;
        }

        let start = pos;
        let digit = bytes[pos].is_ascii_digit();
        while pos < bytes.len() && bytes[pos].is_ascii_digit() == digit {
            pos += 1;
        }

        Some(&bytes[start..pos])
    })
}

/// Compare two digit runs by magnitude without parsing into a fixed-width integer
fn compare_numeric(a: &[u8], b: &[u8]) -> Ordering {
    let strip = |s: &[u8]| -> usize { s.iter().take_while(|&&c| c == b'0').count() };
    let (a_zeros, b_zeros) = (strip(a), strip(b));
    let (a_digits, b_digits) = (&a[a_zeros..], &b[b_zeros..]);

    a_digits
        .len()
        .cmp(&b_digits.len())
        .then_with(|| a_digits.cmp(b_digits))
        // Same magnitude: more leading zeros sorts after
        .then_with(|| a.len().cmp(&b.len()))
}

/// Numeric-segment-aware comparison of two version strings
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = segments(a);
    let mut right = segments(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let both_numeric = x[0].is_ascii_digit() && y[0].is_ascii_digit();
                let ord = if both_numeric {
                    compare_numeric(x, y)
                } else {
                    x.cmp(y)
                };

                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}
