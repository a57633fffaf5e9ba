// src/config.rs

//! Updater configuration
//!
//! Every field has a default so a configuration file only needs to name
//! what it overrides. Without a file the defaults target the Discord Canary
//! Linux distribution channel.

use crate::error::{Error, Result};
use crate::packages::rewrite;
use crate::version::VersionString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Placeholder substituted with the resolved version in the download template
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Owner forced onto every extracted entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

impl Ownership {
    pub const ROOT: Ownership = Ownership { uid: 0, gid: 0 };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint answering a HEAD request with a redirect to the latest package
    pub discovery_url: String,

    /// Package URL with `{version}` placeholders
    pub download_url_template: String,

    /// Build info record, relative to the install root
    pub build_info_path: PathBuf,

    /// Only payload entries under this prefix are installed
    pub source_prefix: String,

    /// Leading part of the source prefix replaced by `install_prefix`
    pub strip_prefix: String,

    /// Absolute directory grafted in place of `strip_prefix`
    pub install_prefix: PathBuf,

    /// Executable launched from the install root
    pub executable: String,

    /// Forced owner of extracted entries; `None` keeps the invoking user's
    pub owner: Option<Ownership>,

    /// Timeout for each network wait; a slow download that keeps making
    /// progress is never cut off
    pub timeout_secs: u64,

    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discovery_url: "https://discord.com/api/download/canary?platform=linux".to_string(),
            download_url_template:
                "https://dl-canary.discordapp.net/apps/linux/{version}/discord-canary-{version}.deb"
                    .to_string(),
            build_info_path: PathBuf::from("resources/build_info.json"),
            source_prefix: "./usr/share/discord-canary/".to_string(),
            strip_prefix: "./usr/share".to_string(),
            install_prefix: PathBuf::from("/opt"),
            executable: "DiscordCanary".to_string(),
            owner: Some(Ownership::ROOT),
            timeout_secs: 300,
            user_agent: concat!("canary-updater/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Load a JSON configuration file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Config = serde_json::from_str(&content).map_err(|e| {
            Error::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check that the path prefixes and URL template are consistent
    pub fn validate(&self) -> Result<()> {
        if !self.source_prefix.starts_with(&self.strip_prefix) {
            return Err(Error::ConfigError(format!(
                "strip_prefix {:?} is not a prefix of source_prefix {:?}",
                self.strip_prefix, self.source_prefix
            )));
        }

        if !self.install_prefix.is_absolute() {
            return Err(Error::ConfigError(format!(
                "install_prefix {} must be absolute",
                self.install_prefix.display()
            )));
        }

        if !self.download_url_template.contains(VERSION_PLACEHOLDER) {
            return Err(Error::ConfigError(format!(
                "download_url_template must contain {}",
                VERSION_PLACEHOLDER
            )));
        }

        if self.build_info_path.is_absolute() {
            return Err(Error::ConfigError(
                "build_info_path must be relative to the install root".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(Error::ConfigError("timeout_secs must be positive".to_string()));
        }

        Ok(())
    }

    /// Directory the application is installed into
    ///
    /// This is where the source prefix itself lands after rewriting,
    /// e.g. `/opt` + `/discord-canary/`.
    pub fn install_root(&self) -> PathBuf {
        rewrite::install_root(&self.source_prefix, &self.strip_prefix, &self.install_prefix)
    }

    pub fn build_info_file(&self) -> PathBuf {
        self.install_root().join(&self.build_info_path)
    }

    pub fn executable_path(&self) -> PathBuf {
        self.install_root().join(&self.executable)
    }

    /// Download URL for the given version
    pub fn download_url(&self, version: &VersionString) -> String {
        self.download_url_template
            .replace(VERSION_PLACEHOLDER, version.as_str())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::PathRewriter;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.install_root(), PathBuf::from("/opt/discord-canary"));
        assert_eq!(
            config.build_info_file(),
            PathBuf::from("/opt/discord-canary/resources/build_info.json")
        );
        assert_eq!(
            config.executable_path(),
            PathBuf::from("/opt/discord-canary/DiscordCanary")
        );
    }

    #[test]
    fn test_download_url_substitutes_every_placeholder() {
        let config = Config::default();
        let version = VersionString::parse("0.0.512").unwrap();
        assert_eq!(
            config.download_url(&version),
            "https://dl-canary.discordapp.net/apps/linux/0.0.512/discord-canary-0.0.512.deb"
        );
    }

    #[test]
    fn test_validate_rejects_mismatched_prefixes() {
        let config = Config {
            strip_prefix: "./usr/lib".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_relative_install_prefix() {
        let config = Config {
            install_prefix: PathBuf::from("opt"),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_template_without_placeholder() {
        let config = Config {
            download_url_template: "https://example.com/latest.deb".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_install_root_matches_rewritten_prefix() {
        let config = Config {
            source_prefix: "./usr/share/./app//".to_string(),
            install_prefix: PathBuf::from("/srv"),
            ..Config::default()
        };
        let rewriter = PathRewriter::from_config(&config).unwrap();

        assert_eq!(config.install_root(), PathBuf::from("/srv/app"));
        assert_eq!(config.install_root(), rewriter.install_root());
        assert_eq!(
            rewriter.rewrite("./usr/share/./app//resources/build_info.json").unwrap(),
            Some(config.build_info_file())
        );
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"install_prefix": "/srv/apps", "owner": null, "timeout_secs": 10}}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.install_root(), PathBuf::from("/srv/apps/discord-canary"));
        assert_eq!(config.owner, None);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.executable, "DiscordCanary");
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/updater.json"));
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}
