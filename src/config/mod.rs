//! Solution-level settings for the package-management core.
//!
//! Settings live in a `wspm.toml` file in the solution directory and cover
//! the concerns the host-integration layer needs resolved before it can
//! perform package operations: the package source list and the client
//! certificates used to authenticate against private sources.
//!
//! # File Format
//!
//! ```toml
//! # Package sources, name -> feed URL
//! [sources]
//! public = "https://pkgs.example.org/v3/index.json"
//! internal = "https://feeds.corp.example.com/v3/index.json"
//!
//! # Client certificates for authenticated feeds
//! [[client-certificates]]
//! name = "internal"
//! from-pem = """
//! -----BEGIN CERTIFICATE-----
//! ...
//! -----END CERTIFICATE-----
//! """
//! password = "optional"
//!
//! [[client-certificates]]
//! name = "partner"
//! from-file = "certs/partner.pfx"
//! ```
//!
//! # Validation
//!
//! Certificate entries are validated at load time: an inline certificate
//! with a blank PEM body, or a file-based certificate with an empty path,
//! is a [`WspmError::ConfigValidationError`], and the invalid file never makes
//! it into a loaded [`SolutionConfig`].
//!
//! A missing settings file is not an error: [`SolutionConfig::load_from`]
//! returns the default (empty) configuration, matching the behavior of the
//! rest of the configuration surface.
//!
//! # Examples
//!
//! ```rust,no_run
//! use wspm::config::SolutionConfig;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = SolutionConfig::load_from_dir(Path::new("/work/solution")).await?;
//! for (name, url) in &config.sources {
//!     println!("source {name}: {url}");
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::core::{Result, WspmError};

/// Name of the settings file looked up in the solution directory.
pub const CONFIG_FILE_NAME: &str = "wspm.toml";

/// Solution-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionConfig {
    /// Package sources, name → feed URL. A `BTreeMap` keeps serialization
    /// order stable across round trips.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, String>,

    /// Client certificates for authenticated sources.
    #[serde(
        default,
        rename = "client-certificates",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub client_certificates: Vec<ClientCertificate>,
}

/// One named client certificate entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCertificate {
    /// The package source this certificate authenticates against.
    pub name: String,

    /// Where the certificate material comes from.
    #[serde(flatten)]
    pub source: CertificateSource,
}

/// Certificate material location.
///
/// The password, when present, is passed through opaque for the transport
/// layer to interpret; no decryption happens in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CertificateSource {
    /// Inline PEM body.
    FromPem {
        /// The PEM-encoded certificate. Must not be blank.
        #[serde(rename = "from-pem")]
        pem: String,
        /// Optional password for an encrypted key.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    /// Certificate file on disk, resolved relative to the solution
    /// directory.
    FromFile {
        /// Path to the certificate file. Must not be empty.
        #[serde(rename = "from-file")]
        path: PathBuf,
        /// Optional password for an encrypted container.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
}

/// Resolved certificate material, ready for the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateData {
    /// Raw certificate bytes (PEM text or container file contents).
    pub bytes: Vec<u8>,
    /// The configured password, if any.
    pub password: Option<String>,
}

impl SolutionConfig {
    /// Loads the settings file from `path`.
    ///
    /// A missing file yields the default configuration. A present file is
    /// parsed and validated; an invalid file is an error, never a partial
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read, is not valid TOML,
    /// or fails certificate validation.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            debug!("no settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&content).map_err(|error| WspmError::ConfigParseError {
            file: path.display().to_string(),
            reason: error.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `wspm.toml` from the given solution directory.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`load_from`](Self::load_from).
    pub async fn load_from_dir(solution_dir: &Path) -> Result<Self> {
        Self::load_from(&solution_dir.join(CONFIG_FILE_NAME)).await
    }

    /// Saves the settings to `path`, creating parent directories as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization or the write fails.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content).await?;
        Ok(())
    }

    /// Checks every certificate entry.
    ///
    /// # Errors
    ///
    /// Returns [`WspmError::ConfigValidationError`] for the first invalid
    /// entry.
    pub fn validate(&self) -> Result<()> {
        for certificate in &self.client_certificates {
            certificate.validate()?;
        }
        Ok(())
    }

    /// Looks up the certificate entry for a source.
    #[must_use]
    pub fn certificate_for(&self, source_name: &str) -> Option<&ClientCertificate> {
        self.client_certificates
            .iter()
            .find(|certificate| certificate.name.eq_ignore_ascii_case(source_name))
    }
}

impl ClientCertificate {
    fn validate(&self) -> Result<()> {
        match &self.source {
            CertificateSource::FromPem { pem, .. } if pem.trim().is_empty() => {
                Err(WspmError::ConfigValidationError {
                    reason: format!("certificate '{}' has an empty PEM body", self.name),
                })
            }
            CertificateSource::FromFile { path, .. } if path.as_os_str().is_empty() => {
                Err(WspmError::ConfigValidationError {
                    reason: format!("certificate '{}' has an empty file path", self.name),
                })
            }
            _ => Ok(()),
        }
    }

    /// Resolves the certificate material, reading file-based entries
    /// relative to `solution_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error when a file-based certificate cannot be read.
    pub async fn resolve(&self, solution_dir: &Path) -> Result<CertificateData> {
        match &self.source {
            CertificateSource::FromPem { pem, password } => Ok(CertificateData {
                bytes: pem.clone().into_bytes(),
                password: password.clone(),
            }),
            CertificateSource::FromFile { path, password } => {
                let resolved = if path.is_absolute() {
                    path.clone()
                } else {
                    solution_dir.join(path)
                };
                let bytes = fs::read(&resolved).await?;
                Ok(CertificateData {
                    bytes,
                    password: password.clone(),
                })
            }
        }
    }
}
