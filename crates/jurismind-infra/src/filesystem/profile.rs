//! profile.toml file operations.
//!
//! The profile stands in for the external identity service: it names the
//! actor (`id`, `label`, `role`) that the CLI hands to the session manager.

use std::path::Path;

use jurismind_types::actor::Actor;

use super::profile_path;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid profile {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to encode profile: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Read the actor profile from `{data_dir}/profile.toml`.
///
/// Returns `None` if the file doesn't exist. An unknown role slug is a
/// [`ProfileError::Parse`].
pub async fn read_profile(data_dir: &Path) -> Result<Option<Actor>, ProfileError> {
    let path = profile_path(data_dir);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ProfileError::Io {
                path: path.display().to_string(),
                source,
            });
        }
    };

    toml::from_str(&content)
        .map(Some)
        .map_err(|source| ProfileError::Parse {
            path: path.display().to_string(),
            source,
        })
}

/// Write the actor profile, creating the data directory if needed.
pub async fn write_profile(data_dir: &Path, actor: &Actor) -> Result<(), ProfileError> {
    let path = profile_path(data_dir);
    let io_err = |source| ProfileError::Io {
        path: path.display().to_string(),
        source,
    };

    let content = toml::to_string(actor)?;
    tokio::fs::create_dir_all(data_dir).await.map_err(io_err)?;
    tokio::fs::write(&path, content).await.map_err(io_err)?;

    tracing::debug!(path = %path.display(), role = %actor.role, "profile written");
    Ok(())
}
