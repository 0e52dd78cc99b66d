use structures::{Field, RecordSchema, SchemaError};

use crate::constants::DISCRIMINATOR_SIZE;

/// A contiguous byte range inside a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: usize,
    pub length: usize,
}

impl ByteRange {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Server-side equality filter: keep records whose bytes at `offset` equal `bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub field: String,
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl RecordFilter {
    pub fn matches(&self, raw: &[u8]) -> bool {
        raw.get(self.offset..self.offset + self.bytes.len()) == Some(self.bytes.as_slice())
    }

    /// Base58 form of the expected bytes, as ledger RPCs take them.
    pub fn encoded(&self) -> String {
        bs58::encode(&self.bytes).into_string()
    }
}

/// Byte offsets of every field of a record schema. Offsets accumulate in
/// declaration order after the discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    schema: RecordSchema,
    offsets: Vec<usize>,
}

impl Layout {
    pub fn new(schema: RecordSchema) -> Self {
        let offsets = schema
            .fields
            .iter()
            .scan(DISCRIMINATOR_SIZE, |offset, field| {
                let start = *offset;
                *offset += field.kind.size();
                Some(start)
            })
            .collect();

        Self { schema, offsets }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn field_offset(&self, field: &str) -> Result<usize, SchemaError> {
        Ok(self.offsets[self.schema.position(field)?])
    }

    pub fn field_size(&self, field: &str) -> Result<usize, SchemaError> {
        Ok(self.schema.field(field)?.kind.size())
    }

    pub fn record_size(&self) -> usize {
        DISCRIMINATOR_SIZE + self.schema.body_size()
    }

    /// Range covering `from` up to (not including) `to`, or to the end of the
    /// record when `to` is `None`.
    pub fn slice(&self, from: &str, to: Option<&str>) -> Result<ByteRange, SchemaError> {
        let (start, end) = self.positions(from, to)?;
        let offset = self.offsets[start];
        let end_offset = self
            .offsets
            .get(end)
            .copied()
            .unwrap_or_else(|| self.record_size());

        Ok(ByteRange {
            offset,
            length: end_offset - offset,
        })
    }

    /// Fields covered by `slice(from, to)`, with their absolute offsets.
    pub fn fields_between(
        &self,
        from: &str,
        to: Option<&str>,
    ) -> Result<Vec<(usize, &Field)>, SchemaError> {
        let (start, end) = self.positions(from, to)?;
        Ok((start..end)
            .map(|i| (self.offsets[i], &self.schema.fields[i]))
            .collect())
    }

    pub fn equality_filter(&self, field: &str, bytes: Vec<u8>) -> Result<RecordFilter, SchemaError> {
        let size = self.field_size(field)?;
        if bytes.len() > size {
            return Err(SchemaError::InvalidConstant {
                name: field.to_string(),
                value: format!("{:?}", bytes),
                reason: format!("filter is longer than the {}-byte field", size),
            });
        }

        Ok(RecordFilter {
            field: field.to_string(),
            offset: self.field_offset(field)?,
            bytes,
        })
    }

    fn positions(&self, from: &str, to: Option<&str>) -> Result<(usize, usize), SchemaError> {
        let start = self.schema.position(from)?;
        let end = match to {
            Some(to) => self.schema.position(to)?,
            None => self.schema.fields.len(),
        };

        if start >= end {
            return Err(SchemaError::InvalidFieldOrder {
                from: from.to_string(),
                to: to.unwrap_or("<end>").to_string(),
            });
        }
        Ok((start, end))
    }
}

#[cfg(test)]
mod tests {
    use structures::{Field, FieldKind, Primitive};

    use super::*;

    fn metadata_layout() -> Layout {
        let u8 = FieldKind::Primitive(Primitive::U8);
        let key = FieldKind::Primitive(Primitive::Pubkey);
        Layout::new(RecordSchema::new(
            "metadataAccount",
            vec![
                Field::new("bump", u8),
                Field::new("id", FieldKind::Array(Primitive::U8, 32)),
                Field::new("version", u8),
                Field::new("epoch", FieldKind::Primitive(Primitive::U64)),
                Field::new("mint", key),
                Field::new("timestamp", FieldKind::Primitive(Primitive::I64)),
                Field::new("payer", key),
                Field::new("token", key),
                Field::new("data", FieldKind::Array(Primitive::U8, 500)),
                Field::new("socials", FieldKind::String { capacity: 400 }),
            ],
        ))
    }

    #[test]
    fn test_offsets_accumulate_after_discriminator() {
        let layout = metadata_layout();

        assert_eq!(layout.field_offset("bump").unwrap(), 8);
        assert_eq!(layout.field_offset("id").unwrap(), 9);
        assert_eq!(layout.field_offset("version").unwrap(), 41);
        assert_eq!(layout.field_offset("epoch").unwrap(), 42);
        assert_eq!(layout.field_offset("mint").unwrap(), 50);
        assert_eq!(layout.field_offset("timestamp").unwrap(), 82);
        assert_eq!(layout.field_offset("payer").unwrap(), 90);
        assert_eq!(layout.field_offset("token").unwrap(), 122);
        assert_eq!(layout.field_offset("data").unwrap(), 154);
        assert_eq!(layout.field_offset("socials").unwrap(), 654);
        assert_eq!(layout.record_size(), 1058);
    }

    #[test]
    fn test_offsets_are_monotonic_and_sizes_sum_to_body() {
        let layout = metadata_layout();
        let names: Vec<&str> = layout
            .schema()
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();

        let offsets: Vec<usize> = names
            .iter()
            .map(|n| layout.field_offset(n).unwrap())
            .collect();
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));

        let total: usize = names.iter().map(|n| layout.field_size(n).unwrap()).sum();
        assert_eq!(total, layout.record_size() - DISCRIMINATOR_SIZE);
    }

    #[test]
    fn test_slice_to_end_of_record() {
        let layout = metadata_layout();
        let range = layout.slice("mint", None).unwrap();

        assert_eq!(range.offset, 50);
        assert_eq!(range.length, 1058 - 50);
        assert_eq!(range.end(), layout.record_size());
    }

    #[test]
    fn test_slice_between_fields() {
        let layout = metadata_layout();
        let range = layout.slice("timestamp", Some("token")).unwrap();

        assert_eq!(range, ByteRange { offset: 82, length: 40 });
        assert_eq!(
            layout
                .fields_between("timestamp", Some("token"))
                .unwrap()
                .iter()
                .map(|(offset, f)| (*offset, f.name.as_str()))
                .collect::<Vec<_>>(),
            vec![(82, "timestamp"), (90, "payer")]
        );
    }

    #[test]
    fn test_slice_rejects_reversed_or_empty_ranges() {
        let layout = metadata_layout();

        assert!(matches!(
            layout.slice("token", Some("mint")),
            Err(SchemaError::InvalidFieldOrder { .. })
        ));
        assert!(matches!(
            layout.slice("token", Some("token")),
            Err(SchemaError::InvalidFieldOrder { .. })
        ));
    }

    #[test]
    fn test_unknown_field() {
        let layout = metadata_layout();

        assert!(matches!(
            layout.field_offset("owner"),
            Err(SchemaError::UnknownField { .. })
        ));
        assert!(matches!(
            layout.slice("mint", Some("owner")),
            Err(SchemaError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_version_filter() {
        let layout = metadata_layout();
        let filter = layout.equality_filter("version", vec![1]).unwrap();

        assert_eq!(filter.offset, 41);
        assert_eq!(filter.encoded(), "2");

        let mut raw = vec![0u8; layout.record_size()];
        assert!(!filter.matches(&raw));
        raw[41] = 1;
        assert!(filter.matches(&raw));
        assert!(!filter.matches(&raw[..30]));

        assert!(layout.equality_filter("version", vec![1, 2]).is_err());
    }
}
