//! Filesystem permission probe.

use async_trait::async_trait;
use bridge_traits::{error::Result, security::PermissionProbe};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::warn;

/// Treats the music library as accessible when its root directory can be
/// listed by the current user.
pub struct DirectoryPermissionProbe {
    library_root: PathBuf,
}

impl DirectoryPermissionProbe {
    pub fn new(library_root: impl Into<PathBuf>) -> Self {
        Self {
            library_root: library_root.into(),
        }
    }

    /// Probe the user's audio directory, falling back to the home directory.
    pub fn user_music_dir() -> Self {
        let root = dirs::audio_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(root)
    }
}

#[async_trait]
impl PermissionProbe for DirectoryPermissionProbe {
    async fn has_media_access(&self) -> Result<bool> {
        match tokio::fs::read_dir(&self.library_root).await {
            Ok(_) => Ok(true),
            Err(err) if matches!(err.kind(), ErrorKind::PermissionDenied | ErrorKind::NotFound) => {
                warn!(error = %err, "Music library is not readable");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn readable_directory_grants_access() {
        let probe = DirectoryPermissionProbe::new(std::env::temp_dir());
        assert!(probe.has_media_access().await.unwrap());
    }

    #[tokio::test]
    async fn missing_directory_denies_access() {
        let probe = DirectoryPermissionProbe::new("/no/such/music/library");
        assert!(!probe.has_media_access().await.unwrap());
    }
}
