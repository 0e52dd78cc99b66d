use std::str::FromStr;

use crate::{
    errors::SchemaError,
    schema::{Field, FieldKind, Primitive, RecordSchema},
};

/// Interface description shipped with the wall program.
pub const DEFAULT_DESCRIPTOR: &str = include_str!("../descriptor.json");

/// The subset of the ledger program's interface description this client reads:
/// published constants, struct layouts and account discriminators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Descriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub constants: Vec<IdlConstant>,
    #[serde(default)]
    pub accounts: Vec<IdlAccount>,
    #[serde(default)]
    pub types: Vec<IdlTypeDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IdlConstant {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlType,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IdlAccount {
    pub name: String,
    pub discriminator: [u8; 8],
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IdlTypeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlTypeBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IdlTypeBody {
    pub kind: String,
    #[serde(default)]
    pub fields: Vec<IdlField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IdlField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlType,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum IdlType {
    Named(String),
    Array { array: (Box<IdlType>, usize) },
}

impl Descriptor {
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn builtin() -> Result<Self, SchemaError> {
        Self::from_json(DEFAULT_DESCRIPTOR)
    }

    pub fn constant(&self, name: &str) -> Result<&str, SchemaError> {
        self.constants
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
            .ok_or_else(|| SchemaError::MissingConstant(name.to_string()))
    }

    pub fn number<T: FromStr>(&self, name: &str) -> Result<T, SchemaError> {
        let value = self.constant(name)?;
        value
            .trim()
            .parse()
            .map_err(|_| SchemaError::InvalidConstant {
                name: name.to_string(),
                value: value.to_string(),
                reason: "not a number".to_string(),
            })
    }

    /// String constants are published with their surrounding quotes.
    pub fn string(&self, name: &str) -> Result<String, SchemaError> {
        let value = self.constant(name)?;
        let unquoted = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Ok(unquoted.to_string())
    }

    /// Byte constants are published as `[1, 2, 3]`.
    pub fn bytes(&self, name: &str) -> Result<Vec<u8>, SchemaError> {
        let value = self.constant(name)?;
        let invalid = || SchemaError::InvalidConstant {
            name: name.to_string(),
            value: value.to_string(),
            reason: "not a byte list".to_string(),
        };

        let inner = value
            .trim()
            .strip_prefix('[')
            .and_then(|v| v.strip_suffix(']'))
            .ok_or_else(invalid)?;

        if inner.trim().is_empty() {
            return Ok(Vec::new());
        }

        inner
            .split(',')
            .map(|b| b.trim().parse::<u8>().map_err(|_| invalid()))
            .collect()
    }

    pub fn discriminator(&self, account: &str) -> Result<[u8; 8], SchemaError> {
        self.accounts
            .iter()
            .find(|a| a.name == account)
            .map(|a| a.discriminator)
            .ok_or_else(|| SchemaError::UnknownRecord(account.to_string()))
    }

    /// Resolves the struct named `record` into a closed schema. String fields
    /// take their capacity from `string_capacity`; a string without one is rejected.
    pub fn schema<F>(&self, record: &str, string_capacity: F) -> Result<RecordSchema, SchemaError>
    where
        F: Fn(&str) -> Option<usize>,
    {
        let def = self
            .types
            .iter()
            .find(|t| t.name == record)
            .ok_or_else(|| SchemaError::UnknownRecord(record.to_string()))?;

        let fields = def
            .ty
            .fields
            .iter()
            .map(|field| {
                let kind = match &field.ty {
                    IdlType::Named(name) if name == "string" => FieldKind::String {
                        capacity: string_capacity(&field.name)
                            .ok_or_else(|| SchemaError::UnboundedString(field.name.clone()))?,
                    },
                    IdlType::Named(name) => FieldKind::Primitive(primitive(name)?),
                    IdlType::Array {
                        array: (element, len),
                    } => match element.as_ref() {
                        IdlType::Named(name) => FieldKind::Array(primitive(name)?, *len),
                        nested => return Err(SchemaError::UnknownType(format!("{:?}", nested))),
                    },
                };
                Ok(Field::new(field.name.clone(), kind))
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        Ok(RecordSchema::new(record, fields))
    }
}

fn primitive(name: &str) -> Result<Primitive, SchemaError> {
    Primitive::from_name(name).ok_or_else(|| SchemaError::UnknownType(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_descriptor_parses() {
        let descriptor = Descriptor::builtin().unwrap();

        assert_eq!(descriptor.number::<usize>("maxDataSize").unwrap(), 500);
        assert_eq!(descriptor.string("stringDelimiter").unwrap(), "\0");
        assert_eq!(descriptor.bytes("seedPrefix").unwrap(), b"degen".to_vec());
        assert_eq!(
            descriptor.discriminator("metadataAccount").unwrap(),
            [132, 41, 58, 218, 7, 70, 55, 22]
        );
    }

    #[test]
    fn test_schema_resolves_strings_and_arrays() {
        let descriptor = Descriptor::builtin().unwrap();
        let schema = descriptor
            .schema("metadataAccount", |name| (name == "socials").then_some(400))
            .unwrap();

        assert_eq!(schema.fields.len(), 10);
        assert_eq!(
            schema.field("id").unwrap().kind,
            FieldKind::Array(Primitive::U8, 32)
        );
        assert_eq!(
            schema.field("socials").unwrap().kind,
            FieldKind::String { capacity: 400 }
        );
    }

    #[test]
    fn test_string_without_capacity_is_rejected() {
        let descriptor = Descriptor::builtin().unwrap();
        let err = descriptor.schema("metadataAccount", |_| None).unwrap_err();

        assert!(matches!(err, SchemaError::UnboundedString(field) if field == "socials"));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let json = r#"{
            "types": [{ "name": "odd", "type": { "kind": "struct", "fields": [
                { "name": "f", "type": "f32" }
            ] } }]
        }"#;
        let descriptor = Descriptor::from_json(json).unwrap();

        assert!(matches!(
            descriptor.schema("odd", |_| None),
            Err(SchemaError::UnknownType(name)) if name == "f32"
        ));
    }

    #[test]
    fn test_missing_constant() {
        let descriptor = Descriptor::from_json("{}").unwrap();

        assert!(matches!(
            descriptor.number::<u8>("version"),
            Err(SchemaError::MissingConstant(_))
        ));
    }

    #[test]
    fn test_malformed_bytes_constant() {
        let json = r#"{ "constants": [{ "name": "seedPrefix", "type": "bytes", "value": "1, 2" }] }"#;
        let descriptor = Descriptor::from_json(json).unwrap();

        assert!(matches!(
            descriptor.bytes("seedPrefix"),
            Err(SchemaError::InvalidConstant { .. })
        ));
    }
}
