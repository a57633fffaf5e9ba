// src/packages/rewrite.rs

//! Translation of payload paths into the install root
//!
//! Only entries under the source prefix belong to the installable payload.
//! Their path loses the strip prefix and gains the install prefix, so with
//! source `./usr/share/app/`, strip `./usr/share` and install `/opt`, the
//! entry `./usr/share/app/bin/x` lands at `/opt/app/bin/x`.

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRewriter {
    source_prefix: String,
    strip_prefix: String,
    install_prefix: PathBuf,
}

impl PathRewriter {
    pub fn new(
        source_prefix: impl Into<String>,
        strip_prefix: impl Into<String>,
        install_prefix: impl Into<PathBuf>,
    ) -> Result<Self> {
        let source_prefix = source_prefix.into();
        let strip_prefix = strip_prefix.into();
        let install_prefix = install_prefix.into();

        if !source_prefix.starts_with(&strip_prefix) {
            return Err(Error::ConfigError(format!(
                "strip prefix {:?} is not a prefix of source prefix {:?}",
                strip_prefix, source_prefix
            )));
        }

        if !install_prefix.is_absolute() {
            return Err(Error::ConfigError(format!(
                "install prefix {} must be absolute",
                install_prefix.display()
            )));
        }

        Ok(Self {
            source_prefix,
            strip_prefix,
            install_prefix,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.source_prefix.clone(),
            config.strip_prefix.clone(),
            config.install_prefix.clone(),
        )
    }

    /// Directory the source prefix itself maps to
    pub fn install_root(&self) -> PathBuf {
        install_root(&self.source_prefix, &self.strip_prefix, &self.install_prefix)
    }

    /// Destination of a payload entry, or `None` when it is not payload
    ///
    /// Fails on paths that would climb out of the install root.
    pub fn rewrite(&self, source: &str) -> Result<Option<PathBuf>> {
        if source.len() < self.source_prefix.len() || !source.starts_with(&self.source_prefix) {
            return Ok(None);
        }

        let mut destination = self.install_prefix.clone();
        for component in Path::new(&source[self.strip_prefix.len()..]).components() {
            match component {
                Component::Normal(part) => destination.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(Error::UnsafePath(source.to_string()));
                }
            }
        }

        if !destination.starts_with(self.install_root()) {
            return Err(Error::UnsafePath(source.to_string()));
        }

        Ok(Some(destination))
    }
}

/// Directory that `source_prefix` lands in once rewritten
///
/// Only the normal components of the part after `strip_prefix` are kept, so
/// `.` segments and repeated slashes do not change the result.
pub fn install_root(source_prefix: &str, strip_prefix: &str, install_prefix: &Path) -> PathBuf {
    let tail = source_prefix.strip_prefix(strip_prefix).unwrap_or(source_prefix);

    let mut root = install_prefix.to_path_buf();
    for component in Path::new(tail).components() {
        if let Component::Normal(part) = component {
            root.push(part);
        }
    }
    root
}
