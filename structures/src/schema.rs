use crate::errors::SchemaError;

/// Strings are stored as a little-endian `u32` byte length followed by the bytes.
pub const STRING_LENGTH_PREFIX: usize = 4;

/// Fixed-width primitive kinds that can appear in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    U8,
    I8,
    Bool,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    U128,
    I128,
    Pubkey,
}

impl Primitive {
    pub const fn size(self) -> usize {
        match self {
            Primitive::U8 | Primitive::I8 | Primitive::Bool => 1,
            Primitive::U16 | Primitive::I16 => 2,
            Primitive::U32 | Primitive::I32 => 4,
            Primitive::U64 | Primitive::I64 => 8,
            Primitive::U128 | Primitive::I128 => 16,
            Primitive::Pubkey => 32,
        }
    }

    /// Maps a descriptor type name onto a primitive. `string` is not a
    /// primitive because its size depends on a configured capacity.
    pub fn from_name(name: &str) -> Option<Self> {
        let primitive = match name {
            "u8" => Primitive::U8,
            "i8" => Primitive::I8,
            "bool" => Primitive::Bool,
            "u16" => Primitive::U16,
            "i16" => Primitive::I16,
            "u32" => Primitive::U32,
            "i32" => Primitive::I32,
            "u64" => Primitive::U64,
            "i64" => Primitive::I64,
            "u128" => Primitive::U128,
            "i128" => Primitive::I128,
            "pubkey" | "publicKey" => Primitive::Pubkey,
            _ => return None,
        };
        Some(primitive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Primitive(Primitive),
    Array(Primitive, usize),
    /// Capacity-bounded string, occupying its full capacity plus the length prefix.
    String { capacity: usize },
}

impl FieldKind {
    pub const fn size(&self) -> usize {
        match *self {
            FieldKind::Primitive(primitive) => primitive.size(),
            FieldKind::Array(element, len) => element.size() * len,
            FieldKind::String { capacity } => STRING_LENGTH_PREFIX + capacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Fields of one record type, in declaration (and therefore storage) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    pub name: String,
    pub fields: Vec<Field>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn position(&self, field: &str) -> Result<usize, SchemaError> {
        self.fields
            .iter()
            .position(|f| f.name == field)
            .ok_or_else(|| SchemaError::UnknownField {
                record: self.name.clone(),
                field: field.to_string(),
            })
    }

    pub fn field(&self, field: &str) -> Result<&Field, SchemaError> {
        Ok(&self.fields[self.position(field)?])
    }

    /// Sum of all field sizes, excluding the record-type discriminator.
    pub fn body_size(&self) -> usize {
        self.fields.iter().map(|f| f.kind.size()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_sizes() {
        assert_eq!(Primitive::U8.size(), 1);
        assert_eq!(Primitive::Bool.size(), 1);
        assert_eq!(Primitive::I16.size(), 2);
        assert_eq!(Primitive::U32.size(), 4);
        assert_eq!(Primitive::I64.size(), 8);
        assert_eq!(Primitive::U128.size(), 16);
        assert_eq!(Primitive::Pubkey.size(), 32);
    }

    #[test]
    fn test_compound_sizes() {
        assert_eq!(FieldKind::Array(Primitive::U8, 500).size(), 500);
        assert_eq!(FieldKind::Array(Primitive::U16, 3).size(), 6);
        assert_eq!(FieldKind::String { capacity: 400 }.size(), 404);
    }

    #[test]
    fn test_unknown_field() {
        let schema = RecordSchema::new(
            "pair",
            vec![
                Field::new("a", FieldKind::Primitive(Primitive::U8)),
                Field::new("b", FieldKind::Primitive(Primitive::U64)),
            ],
        );

        assert_eq!(schema.position("b").unwrap(), 1);
        assert_eq!(schema.body_size(), 9);
        assert!(matches!(
            schema.position("c"),
            Err(SchemaError::UnknownField { .. })
        ));
    }
}
