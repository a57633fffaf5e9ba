// src/packages/deb.rs

//! Debian package extraction
//!
//! A .deb is an AR archive whose `data.tar.*` member holds the installed
//! file tree. Extraction finds that member, decompresses it, and writes the
//! entries under the source prefix into the install root.

use crate::config::{Config, Ownership};
use crate::error::{Error, Result};
use crate::filesystem::{self, ChownFn, DiskWriter, EntryMetadata};
use crate::packages::rewrite::PathRewriter;
use flate2::read::GzDecoder;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use tar::Archive;
use tracing::{debug, info, warn};
use xz2::read::XzDecoder;

/// Name prefix of the payload member in the outer archive
const DATA_MEMBER_PREFIX: &str = "data.tar";

/// Compression of the data member, derived from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Xz,
    Zstd,
    None,
}

impl Compression {
    fn from_member_name(name: &str) -> Result<Self> {
        match name.strip_prefix(DATA_MEMBER_PREFIX) {
            Some(".gz") => Ok(Self::Gzip),
            Some(".xz") => Ok(Self::Xz),
            Some(".zst") => Ok(Self::Zstd),
            Some("") => Ok(Self::None),
            _ => Err(Error::UnsupportedCompression(name.to_string())),
        }
    }

    fn decoder<'a>(self, data: &'a [u8]) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Self::Gzip => Box::new(GzDecoder::new(data)),
            Self::Xz => Box::new(XzDecoder::new(data)),
            Self::Zstd => Box::new(zstd::Decoder::new(data).map_err(|e| {
                Error::ArchiveReadFailure(format!("Failed to create zstd decoder: {}", e))
            })?),
            Self::None => Box::new(data),
        })
    }
}

/// The payload member lifted out of the outer archive
#[derive(Debug)]
pub struct DataMember {
    pub name: String,
    pub compression: Compression,
    pub bytes: Vec<u8>,
}

/// Kinds of payload entries that get installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A payload entry with its rewritten destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionEntry {
    pub source: String,
    pub destination: PathBuf,
    pub kind: EntryKind,
    pub size: u64,
    pub metadata: EntryMetadata,
}

/// Summary of one extraction
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
    pub bytes_written: u64,
}

/// Unpacks the payload of a .deb into the install root
pub struct DebExtractor {
    rewriter: PathRewriter,
    owner: Option<Ownership>,
    chown: ChownFn,
}

impl DebExtractor {
    pub fn new(rewriter: PathRewriter, owner: Option<Ownership>) -> Self {
        Self {
            rewriter,
            owner,
            chown: filesystem::lchown,
        }
    }

    /// Apply the forced owner through `chown` instead of `lchown(2)`
    pub fn with_chown(mut self, chown: ChownFn) -> Self {
        self.chown = chown;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(PathRewriter::from_config(config)?, config.owner))
    }

    pub fn rewriter(&self) -> &PathRewriter {
        &self.rewriter
    }

    /// Extract the payload of an in-memory package
    ///
    /// Nothing is written unless the data member is found. A failure after
    /// the first write leaves the entries written so far in place.
    pub fn extract(&self, package: &[u8]) -> Result<ExtractionReport> {
        let member = read_data_member(package)?;
        debug!(
            "Found {} ({} bytes, {:?})",
            member.name,
            member.bytes.len(),
            member.compression
        );

        let mut writer = DiskWriter::with_chown(self.chown);
        let report = self.unpack(&member, &mut writer)?;
        drop(member);
        writer.finish()?;

        info!(
            "Extracted {} files and {} directories ({} bytes), skipped {} entries",
            report.files, report.directories, report.bytes_written, report.skipped
        );
        Ok(report)
    }

    /// Stream the data member's entries into `writer`
    fn unpack(&self, member: &DataMember, writer: &mut DiskWriter) -> Result<ExtractionReport> {
        let reader = member.compression.decoder(&member.bytes)?;
        let mut archive = Archive::new(reader);
        let mut report = ExtractionReport::default();
        let mut scratch = Vec::new();

        let entries = archive.entries().map_err(|e| {
            Error::ArchiveReadFailure(format!("Failed to read {}: {}", member.name, e))
        })?;

        for entry in entries {
            let mut entry = entry.map_err(|e| {
                Error::ArchiveReadFailure(format!("Failed to read entry of {}: {}", member.name, e))
            })?;

            let Some(planned) = self.plan_entry(&entry)? else {
                report.skipped += 1;
                continue;
            };

            match planned.kind {
                EntryKind::Directory => {
                    writer.write_directory(&planned.destination, &planned.metadata)?;
                    report.directories += 1;
                }
                EntryKind::File => {
                    let data = read_entry_data(&mut entry, &planned, &mut scratch)?;
                    writer.write_file(&planned.destination, data, &planned.metadata)?;
                    report.files += 1;
                    report.bytes_written += planned.size;
                }
            }
        }

        Ok(report)
    }

    /// Decide where an entry goes, or `None` if it is not installed
    fn plan_entry<R: Read>(&self, entry: &tar::Entry<'_, R>) -> Result<Option<ExtractionEntry>> {
        let source = String::from_utf8_lossy(&entry.path_bytes()).into_owned();

        let Some(destination) = self.rewriter.rewrite(&source)? else {
            debug!("Skipping {}", source);
            return Ok(None);
        };

        let header = entry.header();
        let entry_type = header.entry_type();
        let kind = if entry_type.is_file() {
            EntryKind::File
        } else if entry_type.is_dir() {
            EntryKind::Directory
        } else {
            warn!("Skipping {} of unsupported type {:?}", source, entry_type);
            return Ok(None);
        };

        let mode = header.mode().map_err(|e| {
            Error::ArchiveReadFailure(format!("Invalid mode for {}: {}", source, e))
        })?;

        Ok(Some(ExtractionEntry {
            destination,
            kind,
            size: entry.size(),
            metadata: EntryMetadata {
                mode,
                mtime: header.mtime().ok(),
                owner: self.owner,
            },
            source,
        }))
    }
}

/// Find the payload member and copy it out of the outer archive
pub fn read_data_member(package: &[u8]) -> Result<DataMember> {
    let mut archive = ar::Archive::new(package);

    while let Some(member) = archive.next_entry() {
        let mut member = member
            .map_err(|e| Error::ArchiveReadFailure(format!("Failed to read AR member: {}", e)))?;

        let name = String::from_utf8_lossy(member.header().identifier())
            .trim_end_matches('/')
            .to_string();

        if !name.starts_with(DATA_MEMBER_PREFIX) {
            debug!("Skipping AR member {}", name);
            continue;
        }

        let compression = Compression::from_member_name(&name)?;
        let expected = member.header().size();

        // The declared size is untrusted; never reserve beyond what exists
        let mut bytes = Vec::with_capacity(expected.min(package.len() as u64) as usize);
        member.read_to_end(&mut bytes).map_err(|e| {
            Error::ArchiveReadFailure(format!("Failed to read AR member {}: {}", name, e))
        })?;

        if bytes.len() as u64 != expected {
            return Err(Error::TruncatedMember {
                name,
                expected,
                actual: bytes.len() as u64,
            });
        }

        return Ok(DataMember {
            name,
            compression,
            bytes,
        });
    }

    Err(Error::DataMemberNotFound)
}

/// Read an entry's declared size into the grow-only scratch buffer
fn read_entry_data<'s, R: Read>(
    entry: &mut R,
    planned: &ExtractionEntry,
    scratch: &'s mut Vec<u8>,
) -> Result<&'s [u8]> {
    scratch.clear();

    // Grow with the data actually present rather than the declared size
    match entry.take(planned.size).read_to_end(scratch) {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {}
        Err(e) => {
            return Err(Error::ArchiveReadFailure(format!(
                "Failed to read {}: {}",
                planned.source, e
            )));
        }
    }

    if (scratch.len() as u64) < planned.size {
        return Err(Error::EntrySizeMismatch {
            path: planned.source.clone(),
            expected: planned.size,
            actual: scratch.len() as u64,
        });
    }

    Ok(&scratch[..])
}
