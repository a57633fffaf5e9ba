// src/lib.rs

//! Canary Updater
//!
//! Keeps a single application installed from its Debian package release
//! channel up to date, then hands off to it.
//!
//! # Architecture
//!
//! - Resolver: installed version from the build info record, latest version
//!   from the distribution endpoint's redirect target
//! - Transport: blocking HTTP with coalesced progress reporting
//! - Packages: AR container -> compressed data.tar -> filtered, rewritten
//!   entries written with forced ownership
//! - Updater: sequences the above into a single update attempt
//!
//! Everything runs on the calling thread. Concurrent runs against the same
//! install root are not supported.

pub mod config;
mod error;
pub mod filesystem;
pub mod packages;
pub mod resolver;
pub mod transport;
pub mod updater;
pub mod version;

pub use config::{Config, Ownership};
pub use error::{Error, Result};
pub use updater::{Outcome, Updater};
pub use version::VersionString;
