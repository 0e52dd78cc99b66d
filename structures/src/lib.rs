#[macro_use]
extern crate serde_derive;

mod constants;
mod descriptor;
mod errors;
mod schema;

pub use crate::constants::WallConstants;
pub use crate::descriptor::{
    Descriptor, IdlAccount, IdlConstant, IdlField, IdlType, IdlTypeBody, IdlTypeDef,
    DEFAULT_DESCRIPTOR,
};
pub use crate::errors::SchemaError;
pub use crate::schema::{Field, FieldKind, Primitive, RecordSchema, STRING_LENGTH_PREFIX};
