use crate::{descriptor::Descriptor, errors::SchemaError};

/// Capacities published by the wall program. Read once from the descriptor and
/// treated as immutable for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallConstants {
    pub max_data_size: usize,
    pub px_size: usize,
    pub px_width: usize,
    pub px_height: usize,
    pub data_delimiter: u8,
    pub max_socials_size: usize,
    pub string_delimiter: String,
    pub name_length: usize,
    pub ticker_length: usize,
    pub twitter_length: usize,
    pub seed_prefix: Vec<u8>,
    pub version: u8,
}

impl WallConstants {
    pub fn from_descriptor(descriptor: &Descriptor) -> Result<Self, SchemaError> {
        let constants = Self {
            max_data_size: descriptor.number("maxDataSize")?,
            px_size: descriptor.number("pxSize")?,
            px_width: descriptor.number("pxWidth")?,
            px_height: descriptor.number("pxHeight")?,
            data_delimiter: descriptor.number("dataDelimiter")?,
            max_socials_size: descriptor.number("maxSocialsSize")?,
            string_delimiter: descriptor.string("stringDelimiter")?,
            name_length: descriptor.number("nameLength")?,
            ticker_length: descriptor.number("tickerLength")?,
            twitter_length: descriptor.number("twitterLength")?,
            seed_prefix: descriptor.bytes("seedPrefix")?,
            version: descriptor.number("version")?,
        };
        constants.validate()?;
        Ok(constants)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let invalid = |name: &str, value: String, reason: &str| SchemaError::InvalidConstant {
            name: name.to_string(),
            value,
            reason: reason.to_string(),
        };

        // Each pixel tuple is (x, y, r, g, b).
        if self.px_size != 5 {
            return Err(invalid(
                "pxSize",
                self.px_size.to_string(),
                "pixel tuples are 5 bytes",
            ));
        }
        if self.max_data_size == 0 || self.max_data_size % self.px_size != 0 {
            return Err(invalid(
                "maxDataSize",
                self.max_data_size.to_string(),
                "must be a non-zero multiple of pxSize",
            ));
        }
        // Coordinates are single bytes and must never collide with the delimiter.
        for (name, value) in [("pxWidth", self.px_width), ("pxHeight", self.px_height)] {
            if value == 0 || value > self.data_delimiter as usize {
                return Err(invalid(
                    name,
                    value.to_string(),
                    "must be between 1 and dataDelimiter",
                ));
            }
        }
        if self.string_delimiter.is_empty() {
            return Err(invalid(
                "stringDelimiter",
                String::new(),
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// Number of pixel edits one record can carry.
    pub fn capacity_pixels(&self) -> usize {
        self.max_data_size / self.px_size
    }

    pub fn canvas_size(&self) -> usize {
        self.px_width * self.px_height
    }

    /// Capacity of a string field, if the program publishes one for it.
    pub fn string_capacity(&self, field: &str) -> Option<usize> {
        match field {
            "socials" => Some(self.max_socials_size),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_constants() {
        let constants = WallConstants::from_descriptor(&Descriptor::builtin().unwrap()).unwrap();

        assert_eq!(constants.capacity_pixels(), 100);
        assert_eq!(constants.canvas_size(), 10_000);
        assert_eq!(constants.string_delimiter, "\0");
        assert_eq!(constants.string_capacity("socials"), Some(400));
        assert_eq!(constants.string_capacity("name"), None);
    }

    #[test]
    fn test_data_size_must_divide_into_pixels() {
        let mut descriptor = Descriptor::builtin().unwrap();
        for constant in descriptor.constants.iter_mut() {
            if constant.name == "maxDataSize" {
                constant.value = "502".to_string();
            }
        }

        assert!(matches!(
            WallConstants::from_descriptor(&descriptor),
            Err(SchemaError::InvalidConstant { name, .. }) if name == "maxDataSize"
        ));
    }

    #[test]
    fn test_width_cannot_reach_delimiter() {
        let mut descriptor = Descriptor::builtin().unwrap();
        for constant in descriptor.constants.iter_mut() {
            if constant.name == "pxWidth" {
                constant.value = "256".to_string();
            }
        }

        assert!(matches!(
            WallConstants::from_descriptor(&descriptor),
            Err(SchemaError::InvalidConstant { name, .. }) if name == "pxWidth"
        ));
    }
}
