// src/transport/mod.rs

//! Blocking network access for the updater
//!
//! The [`Transport`] trait is the seam between the orchestration logic and
//! the network. [`HttpTransport`] is the production implementation.

mod http;
mod progress;

pub use http::HttpTransport;
pub use progress::ProgressTracker;

use crate::error::Result;

/// Package bytes accumulated from a download
///
/// Owned by whoever holds it; the extractor only borrows the contents.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackageBuffer(Vec<u8>);

impl PackageBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for PackageBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Network operations the updater depends on
pub trait Transport {
    /// Issue a header-only request and return the redirect target
    ///
    /// The redirect is read from the response, never followed.
    fn redirect_target(&self, url: &str) -> Result<String>;

    /// Download the full body of `url` into memory
    ///
    /// `progress` receives completion ratios in `0.0..=1.0`, coalesced by
    /// [`ProgressTracker`].
    fn fetch(&self, url: &str, progress: &mut dyn FnMut(f64)) -> Result<PackageBuffer>;
}
