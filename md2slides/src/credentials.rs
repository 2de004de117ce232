//! Google service-account credential materialization.
//!
//! The converter discovers its credentials through `GOOGLE_APPLICATION_CREDENTIALS`, which must
//! name a file. Deployments either mount a key file and point that variable at it, or pass the
//! key itself in `GOOGLE_CREDENTIALS_JSON`. In the latter case the JSON is written verbatim to a
//! fixed path before each conversion and that path is handed to the child process.
//!
//! The server never validates the key material: a malformed key surfaces as a converter failure.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::config::CredentialsConfig;

/// Environment variable the converter (and Google client libraries) read the key path from.
pub const CREDENTIALS_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Where the credentials for a conversion come from.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Inline key material, written to `path` on demand
    Inline { json: String, path: PathBuf },
    /// An existing key file
    File(PathBuf),
    /// Nothing configured; the child inherits the server environment untouched
    Ambient,
}

impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline { path, .. } => f.debug_struct("Inline").field("json", &"<redacted>").field("path", path).finish(),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Ambient => write!(f, "Ambient"),
        }
    }
}

impl CredentialSource {
    /// Inline JSON takes precedence over a key file path.
    pub fn from_config(config: &CredentialsConfig) -> Self {
        if let Some(json) = config.credentials_json.as_ref().filter(|j| !j.is_empty()) {
            return Self::Inline {
                json: json.clone(),
                path: config.json_path.clone(),
            };
        }

        match &config.application_credentials {
            Some(path) => Self::File(path.clone()),
            None => Self::Ambient,
        }
    }

    /// Produce the key file path to export to the converter, writing inline material first.
    pub async fn materialize(&self) -> io::Result<Option<PathBuf>> {
        match self {
            Self::Inline { json, path } => {
                write_key_file(path, json).await?;
                debug!(path = %path.display(), "Wrote inline service-account credentials");
                Ok(Some(path.clone()))
            }
            Self::File(path) => Ok(Some(path.clone())),
            Self::Ambient => Ok(None),
        }
    }
}

/// Write `contents` to `path` via a sibling temp file and a rename, so a converter reading the
/// key concurrently never sees a partially written file.
async fn write_key_file(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let staging = path.with_file_name(format!(".{file_name}.{}", Uuid::new_v4()));

    tokio::fs::write(&staging, contents).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&staging, std::fs::Permissions::from_mode(0o600)).await?;
    }

    if let Err(e) = tokio::fs::rename(&staging, path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e);
    }

    Ok(())
}
