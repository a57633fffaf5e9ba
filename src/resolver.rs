// src/resolver.rs

//! Local and remote version resolution
//!
//! The installed version comes from the application's own JSON build info
//! record. The latest version is advertised only through the redirect the
//! distribution endpoint answers with, so it is recovered from the final
//! path segment of the redirect target.

use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::version::VersionString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Fields of the build info record we care about; the rest is ignored
#[derive(Debug, Deserialize)]
struct BuildInfo {
    version: String,
}

/// Result of comparing the installed and the advertised version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheck {
    pub local: VersionString,
    pub remote: VersionString,
    pub needed: bool,
}

/// Resolves installed and latest versions for one application
pub struct VersionResolver {
    build_info: PathBuf,
    discovery_url: String,
}

impl VersionResolver {
    pub fn new(build_info: impl Into<PathBuf>, discovery_url: impl Into<String>) -> Self {
        Self {
            build_info: build_info.into(),
            discovery_url: discovery_url.into(),
        }
    }

    pub fn build_info(&self) -> &Path {
        &self.build_info
    }

    /// Read the installed version from the build info record
    pub fn local_version(&self) -> Result<VersionString> {
        let path = &self.build_info;
        debug!("Reading local version from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::LocalVersionUnavailable(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let info: BuildInfo = serde_json::from_str(&content).map_err(|e| {
            Error::LocalVersionUnavailable(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        VersionString::parse(&info.version).map_err(|e| {
            Error::LocalVersionUnavailable(format!("{}: {}", path.display(), e))
        })
    }

    /// Discover the latest version from the distribution endpoint's redirect
    pub fn remote_version<T: Transport + ?Sized>(&self, transport: &T) -> Result<VersionString> {
        let target = transport.redirect_target(&self.discovery_url).map_err(|e| match e {
            Error::RemoteVersionUnavailable(_) => e,
            other => Error::RemoteVersionUnavailable(other.to_string()),
        })?;

        version_from_url(&target)
    }

    /// Compare both versions
    pub fn check<T: Transport + ?Sized>(&self, transport: &T) -> Result<UpdateCheck> {
        let local = self.local_version()?;
        let remote = self.remote_version(transport)?;
        let needed = needs_update(&local, &remote);

        info!(
            "Installed version {}, latest version {}{}",
            local,
            remote,
            if needed { " (update available)" } else { "" }
        );

        Ok(UpdateCheck {
            local,
            remote,
            needed,
        })
    }
}

/// True iff `remote` is strictly newer than `local`
pub fn needs_update(local: &VersionString, remote: &VersionString) -> bool {
    remote > local
}

/// Extract the version embedded in a package URL
///
/// The token sits between the last `-` and the last `.` of the final path
/// segment: `.../discord-canary-0.0.512.deb` yields `0.0.512`.
pub fn version_from_url(url: &str) -> Result<VersionString> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or(path);

    let start = segment.rfind('-').ok_or_else(|| {
        Error::RemoteVersionUnavailable(format!("No '-' in final segment of {}", url))
    })? + 1;

    let end = segment.rfind('.').ok_or_else(|| {
        Error::RemoteVersionUnavailable(format!("No '.' in final segment of {}", url))
    })?;

    if end <= start {
        return Err(Error::RemoteVersionUnavailable(format!(
            "No version between '-' and '.' in {}",
            url
        )));
    }

    VersionString::parse(&segment[start..end])
        .map_err(|e| Error::RemoteVersionUnavailable(format!("{}: {}", url, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::PackageBuffer;
    use std::io::Write;

    struct FixedRedirect(Result<String>);

    impl Transport for FixedRedirect {
        fn redirect_target(&self, _url: &str) -> Result<String> {
            match &self.0 {
                Ok(target) => Ok(target.clone()),
                Err(e) => Err(Error::TransportFailure(e.to_string())),
            }
        }

        fn fetch(&self, _url: &str, _progress: &mut dyn FnMut(f64)) -> Result<PackageBuffer> {
            unreachable!("resolver never downloads")
        }
    }

    fn write_build_info(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn v(s: &str) -> VersionString {
        VersionString::parse(s).unwrap()
    }

    #[test]
    fn test_version_from_url() {
        let version = version_from_url("https://dl.example.com/apps/linux/1.2.3/app-1.2.3.deb");
        assert_eq!(version.unwrap(), v("1.2.3"));

        let version =
            version_from_url("https://dl.example.com/discord-canary-0.0.512.deb?dl=1#frag");
        assert_eq!(version.unwrap(), v("0.0.512"));
    }

    #[test]
    fn test_version_from_url_ignores_dashes_in_directories() {
        let version = version_from_url("https://dl-canary.example.com/app-linux/app-7.deb");
        assert_eq!(version.unwrap(), v("7"));
    }

    #[test]
    fn test_version_from_url_requires_both_delimiters() {
        for url in [
            "https://dl.example.com/app_1.2.3",
            "https://dl-canary.example.com/app_1_2_3.deb",
            "https://dl.example.com/apps.linux/app-123",
            "https://dl.example.com/app.deb-",
            "https://dl.example.com/app-.deb",
        ] {
            assert!(
                matches!(version_from_url(url), Err(Error::RemoteVersionUnavailable(_))),
                "{} should not parse",
                url
            );
        }
    }

    #[test]
    fn test_local_version_reads_build_info() {
        let file = write_build_info(r#"{"releaseChannel": "canary", "version": "0.0.300"}"#);
        let resolver = VersionResolver::new(file.path(), "https://example.com/latest");
        assert_eq!(resolver.local_version().unwrap(), v("0.0.300"));
    }

    #[test]
    fn test_local_version_failures() {
        let missing = VersionResolver::new("/nonexistent/build_info.json", "");
        assert!(matches!(
            missing.local_version(),
            Err(Error::LocalVersionUnavailable(_))
        ));

        for content in ["{not json", r#"{"releaseChannel": "canary"}"#, r#"{"version": 12}"#, r#"{"version": ""}"#] {
            let file = write_build_info(content);
            let resolver = VersionResolver::new(file.path(), "");
            assert!(
                matches!(resolver.local_version(), Err(Error::LocalVersionUnavailable(_))),
                "{} should fail",
                content
            );
        }
    }

    #[test]
    fn test_remote_version_wraps_transport_errors() {
        let resolver = VersionResolver::new("/unused", "https://example.com/latest");
        let transport = FixedRedirect(Err(Error::TransportFailure("refused".to_string())));
        assert!(matches!(
            resolver.remote_version(&transport),
            Err(Error::RemoteVersionUnavailable(_))
        ));
    }

    #[test]
    fn test_needs_update() {
        assert!(needs_update(&v("1.2.9"), &v("1.2.10")));
        assert!(!needs_update(&v("1.2.0"), &v("1.2.0")));
        assert!(!needs_update(&v("1.10.0"), &v("1.9.0")));
    }

    #[test]
    fn test_check_combines_both_versions() {
        let file = write_build_info(r#"{"version": "0.0.9"}"#);
        let resolver = VersionResolver::new(file.path(), "https://example.com/latest");
        let transport = FixedRedirect(Ok("https://example.com/0.0.10/app-0.0.10.deb".to_string()));

        let check = resolver.check(&transport).unwrap();
        assert_eq!(check.local, v("0.0.9"));
        assert_eq!(check.remote, v("0.0.10"));
        assert!(check.needed);
    }

    #[test]
    fn test_check_fails_when_either_side_is_unavailable() {
        let transport = FixedRedirect(Ok("https://example.com/app-1.0.deb".to_string()));
        let resolver = VersionResolver::new("/nonexistent/build_info.json", "");
        assert!(resolver.check(&transport).is_err());

        let file = write_build_info(r#"{"version": "1.0"}"#);
        let resolver = VersionResolver::new(file.path(), "");
        let transport = FixedRedirect(Ok("https://example.com/latest".to_string()));
        assert!(matches!(
            resolver.check(&transport),
            Err(Error::RemoteVersionUnavailable(_))
        ));
    }
}
