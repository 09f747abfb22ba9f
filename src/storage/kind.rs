use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// The kinds of storage a persisted store can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Ephemeral, lives as long as the session.
    Session,
    /// Durable across restarts.
    Local,
    /// Small values with a short expiry.
    Cookie,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Session => "sessionStorage",
            StorageKind::Local => "localStorage",
            StorageKind::Cookie => "cookies",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sessionStorage" => Ok(StorageKind::Session),
            "localStorage" => Ok(StorageKind::Local),
            "cookies" => Ok(StorageKind::Cookie),
            other => Err(StoreError::UnsupportedStorageType {
                storage_type: other.to_string(),
            }),
        }
    }
}
