/*!
 * Snapshot Files
 * Layout, space address and captured image bundled for offline inspection
 */

use super::image::HeapImage;
use crate::core::bincode::{self, BincodeError};
use crate::core::types::Address;
use crate::core::InspectError;
use crate::heap::InspectContext;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Snapshot file errors
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Codec(#[from] BincodeError),
    #[error(transparent)]
    Layout(#[from] InspectError),
}

/// Everything needed to inspect one space without the target process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub context: InspectContext,
    pub space_address: Address,
    pub image: HeapImage,
}

impl SnapshotFile {
    pub fn new(context: InspectContext, space_address: Address, image: HeapImage) -> Self {
        Self {
            context,
            space_address,
            image,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::to_vec_framed(self)?)
    }

    /// Decode a snapshot and reject an inconsistent embedded layout
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::from_slice_framed(bytes)?;
        snapshot.context.layout.validate()?;
        Ok(snapshot)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes()?).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }
}
