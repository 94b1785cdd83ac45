//! Configuration options for rule retrieval

use serde::{Deserialize, Serialize};

use crate::constants::{ids, limits};
use crate::error::{Error, Result};
use crate::rules::{Aid, FileId};

/// Configuration options for reading GPD access rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessControlConfig {
    /// AID of the PKCS#15 application holding the ODF
    pub pkcs15_aid: Aid,

    /// File identifier of the ODF inside the PKCS#15 application
    pub odf_file_id: FileId,

    /// Largest number of bytes requested by one READ BINARY
    pub max_read_chunk: u8,
}

impl Default for AccessControlConfig {
    fn default() -> Self {
        Self {
            pkcs15_aid: Aid::from_static(&ids::PKCS15_AID),
            odf_file_id: FileId::new(ids::ODF_FILE_ID),
            max_read_chunk: limits::DEFAULT_READ_CHUNK,
        }
    }
}

impl AccessControlConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the PKCS#15 application AID
    pub fn with_pkcs15_aid(mut self, aid: Aid) -> Self {
        self.pkcs15_aid = aid;
        self
    }

    /// Set the ODF file identifier
    pub const fn with_odf_file_id(mut self, file: FileId) -> Self {
        self.odf_file_id = file;
        self
    }

    /// Set the READ BINARY chunk size
    pub const fn with_max_read_chunk(mut self, chunk: u8) -> Self {
        self.max_read_chunk = chunk;
        self
    }

    /// Check values that cannot be expressed in the types
    pub fn validate(&self) -> Result<()> {
        if self.max_read_chunk == 0 {
            return Err(Error::Config("max_read_chunk must be at least 1".into()));
        }
        Ok(())
    }
}
