/// Errors raised while loading the ledger descriptor or resolving fields in a
/// record schema. These are configuration mistakes and are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("field `{field}` does not exist in record `{record}`")]
    UnknownField { record: String, field: String },

    #[error("slice start `{from}` must come before slice end `{to}`")]
    InvalidFieldOrder { from: String, to: String },

    #[error("unsupported field type `{0}`")]
    UnknownType(String),

    #[error("string field `{0}` has no configured capacity")]
    UnboundedString(String),

    #[error("constant `{0}` is missing from the descriptor")]
    MissingConstant(String),

    #[error("constant `{name}` has invalid value `{value}`: {reason}")]
    InvalidConstant {
        name: String,
        value: String,
        reason: String,
    },

    #[error("record type `{0}` is missing from the descriptor")]
    UnknownRecord(String),

    #[error("could not parse descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),
}
