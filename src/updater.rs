// src/updater.rs

//! Update orchestration
//!
//! One attempt walks `Start -> ResolveVersions -> UpToDate | UpdateNeeded ->
//! Fetch -> Extract -> Done`. Any error ends the attempt in `Failed`; there
//! is no retry and no cleanup of a partially written install root.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::packages::{DebExtractor, ExtractionReport};
use crate::resolver::{UpdateCheck, VersionResolver, needs_update};
use crate::transport::{HttpTransport, Transport};
use crate::version::VersionString;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Steps of an update attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Start,
    ResolveVersions,
    UpToDate,
    UpdateNeeded,
    Fetch,
    Extract,
    Done,
    Failed,
}

/// Final result of an update attempt
#[derive(Debug)]
pub enum Outcome {
    /// The installed version is current
    UpToDate { version: VersionString },
    /// A new version was installed
    Updated {
        from: Option<VersionString>,
        to: VersionString,
        report: ExtractionReport,
    },
    Failed(Error),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed(_))
    }
}

/// Runs update attempts for one application install
pub struct Updater<T: Transport> {
    config: Config,
    transport: T,
    resolver: VersionResolver,
    extractor: DebExtractor,
}

impl Updater<HttpTransport> {
    /// Updater talking to the network over HTTP(S)
    pub fn from_config(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Self::new(config, transport)
    }
}

impl<T: Transport> Updater<T> {
    pub fn new(config: Config, transport: T) -> Result<Self> {
        config.validate()?;

        let resolver = VersionResolver::new(config.build_info_file(), config.discovery_url.clone());
        let extractor = DebExtractor::from_config(&config)?;

        Ok(Self {
            config,
            transport,
            resolver,
            extractor,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn resolver(&self) -> &VersionResolver {
        &self.resolver
    }

    /// Compare installed and latest versions without changing anything
    pub fn check(&self) -> Result<UpdateCheck> {
        self.resolver.check(&self.transport)
    }

    /// Bring the install root up to date
    ///
    /// With `force` the package is installed even when the installed
    /// version is current or unreadable.
    pub fn check_and_prepare_update(&self, force: bool, progress: &mut dyn FnMut(f64)) -> Outcome {
        transition(UpdateState::Start);

        match self.attempt(force, progress) {
            Ok(outcome) => outcome,
            Err(e) => {
                transition(UpdateState::Failed);
                warn!("Update failed: {}", e);
                Outcome::Failed(e)
            }
        }
    }

    fn attempt(&self, force: bool, progress: &mut dyn FnMut(f64)) -> Result<Outcome> {
        transition(UpdateState::ResolveVersions);

        let local = match self.resolver.local_version() {
            Ok(version) => Some(version),
            Err(e) if force => {
                warn!("{}; continuing with forced update", e);
                None
            }
            Err(e) => return Err(e),
        };

        let remote = self.resolver.remote_version(&self.transport)?;

        match &local {
            Some(local) if !needs_update(local, &remote) && !force => {
                transition(UpdateState::UpToDate);
                info!("{} is up to date (latest {})", local, remote);
                return Ok(Outcome::UpToDate {
                    version: local.clone(),
                });
            }
            Some(local) => info!("Updating {} -> {}", local, remote),
            None => info!("Installing {}", remote),
        }
        transition(UpdateState::UpdateNeeded);

        transition(UpdateState::Fetch);
        let url = self.config.download_url(&remote);
        let package = self.transport.fetch(&url, progress)?;
        debug!(
            "Package is {} bytes, sha256 {:x}",
            package.len(),
            Sha256::digest(package.as_slice())
        );

        transition(UpdateState::Extract);
        let report = self.extractor.extract(package.as_slice())?;
        drop(package);

        transition(UpdateState::Done);
        info!(
            "Installed {} into {}",
            remote,
            self.extractor.rewriter().install_root().display()
        );

        Ok(Outcome::Updated {
            from: local,
            to: remote,
            report,
        })
    }
}

fn transition(state: UpdateState) {
    debug!("Update state: {:?}", state);
}
