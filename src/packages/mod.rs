// src/packages/mod.rs

//! Package extraction
//!
//! Decodes downloaded .deb packages and installs the payload subtree into
//! the install root.

pub mod deb;
pub mod rewrite;

pub use deb::{DebExtractor, EntryKind, ExtractionEntry, ExtractionReport};
pub use rewrite::PathRewriter;
