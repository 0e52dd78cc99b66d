use std::{fs, path::Path, sync::Arc};

use structures::{Descriptor, SchemaError, WallConstants};
use tracing::debug;

use crate::{
    constants::{READ_FROM_FIELD, RECORD_TYPE, VERSION_FIELD},
    offsets::{ByteRange, Layout, RecordFilter},
};

/// Everything derived from the ledger descriptor at startup. Built once and
/// shared behind an `Arc`; never re-derived per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallConfig {
    pub constants: WallConstants,
    pub layout: Layout,
    pub discriminator: [u8; 8],
    /// Matches records written with the current layout version.
    pub version_filter: RecordFilter,
    /// Part of each record fetched during a rebuild.
    pub read_slice: ByteRange,
}

impl WallConfig {
    pub fn from_descriptor(descriptor: &Descriptor) -> Result<Self, SchemaError> {
        let constants = WallConstants::from_descriptor(descriptor)?;
        let schema = descriptor.schema(RECORD_TYPE, |field| constants.string_capacity(field))?;
        let layout = Layout::new(schema);

        // The pixel data field must match the published capacity exactly.
        if layout.field_size("data")? != constants.max_data_size {
            return Err(SchemaError::InvalidConstant {
                name: "maxDataSize".to_string(),
                value: constants.max_data_size.to_string(),
                reason: format!(
                    "record data field is {} bytes",
                    layout.field_size("data")?
                ),
            });
        }

        let version_filter = layout.equality_filter(VERSION_FIELD, vec![constants.version])?;
        let read_slice = layout.slice(READ_FROM_FIELD, None)?;
        let discriminator = descriptor.discriminator(RECORD_TYPE)?;

        debug!(
            record_size = layout.record_size(),
            version = constants.version,
            read_offset = read_slice.offset,
            "loaded wall config"
        );

        Ok(Self {
            constants,
            layout,
            discriminator,
            version_filter,
            read_slice,
        })
    }

    pub fn builtin() -> Result<Arc<Self>, SchemaError> {
        Ok(Arc::new(Self::from_descriptor(&Descriptor::builtin()?)?))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Arc<Self>, SchemaError> {
        let json = fs::read_to_string(path.as_ref()).map_err(|err| {
            SchemaError::InvalidConstant {
                name: "descriptor".to_string(),
                value: path.as_ref().display().to_string(),
                reason: err.to_string(),
            }
        })?;
        Ok(Arc::new(Self::from_descriptor(&Descriptor::from_json(&json)?)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_config() {
        let config = WallConfig::builtin().unwrap();

        assert_eq!(config.layout.record_size(), 1058);
        assert_eq!(config.version_filter.offset, 41);
        assert_eq!(config.version_filter.bytes, vec![1]);
        assert_eq!(config.read_slice, ByteRange { offset: 50, length: 1008 });
    }

    #[test]
    fn test_data_field_must_match_capacity() {
        let mut descriptor = Descriptor::builtin().unwrap();
        for constant in descriptor.constants.iter_mut() {
            if constant.name == "maxDataSize" {
                constant.value = "250".to_string();
            }
        }

        assert!(matches!(
            WallConfig::from_descriptor(&descriptor),
            Err(SchemaError::InvalidConstant { name, .. }) if name == "maxDataSize"
        ));
    }

    #[test]
    fn test_missing_descriptor_file() {
        assert!(WallConfig::load("/nonexistent/descriptor.json").is_err());
    }
}
