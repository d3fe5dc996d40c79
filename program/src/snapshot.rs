// Raffle Sweeper - Store snapshot encoding
use borsh::{BorshDeserialize, BorshSerialize};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::state::{Raffle, Winner};

const SNAPSHOT_VERSION: u8 = 1;

/// Full record set as written to disk
#[derive(BorshSerialize, BorshDeserialize, Debug, Default, PartialEq)]
pub struct StoreSnapshot {
    pub version: u8,
    pub raffles: Vec<Raffle>,
    /// Winners in insertion order
    pub winners: Vec<Winner>,
}

impl StoreSnapshot {
    pub fn new(raffles: Vec<Raffle>, winners: Vec<Winner>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            raffles,
            winners,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        Ok(self.try_to_vec()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        let snapshot =
            Self::try_from_slice(bytes).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }
}

/// Read a snapshot, or an empty one if the file does not exist yet
pub async fn load(path: &Path) -> Result<StoreSnapshot, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => StoreSnapshot::decode(&bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(StoreSnapshot::new(Vec::new(), Vec::new()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Replace the snapshot at `path`. The bytes go to a sibling temp file first and are
/// renamed into place, so readers never see a partial write.
pub async fn save(path: &Path, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
    let bytes = snapshot.encode()?;
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
