//! Client identity and media permission bridges.

use crate::{error::Result, platform::PlatformSendSync};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a UI client connecting to the session, as vouched for by
/// the host (calling package and OS user id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientIdentity {
    pub package: String,
    pub uid: u32,
}

impl ClientIdentity {
    pub fn new(package: impl Into<String>, uid: u32) -> Self {
        Self {
            package: package.into(),
            uid,
        }
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (uid {})", self.package, self.uid)
    }
}

/// Checks whether the process may read the user's media.
///
/// A missing permission is reported as `Ok(false)`; `Err` is reserved for
/// failures of the probe itself.
#[async_trait::async_trait]
pub trait PermissionProbe: PlatformSendSync {
    async fn has_media_access(&self) -> Result<bool>;
}
