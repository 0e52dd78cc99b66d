use std::{collections::HashMap, fmt, str::FromStr};

use bincode::{Decode, Encode};
use chrono::{DateTime, Utc};
use colors_transform::{Color as _, Rgb};

use crate::{
    constants::{
        DEFAULT_COLOR, DEFAULT_COMMUNITY, DEFAULT_DESCRIPTION, DEFAULT_IMAGE, DEFAULT_NAME,
        DEFAULT_PAYER, DEFAULT_TICKER, DEFAULT_TOKEN, DEFAULT_TWITTER, DEFAULT_WEBSITE,
    },
    errors::EncodeError,
};

/// Canvas index (`x + y * width`) to target color.
pub type EditSet = HashMap<u32, Color>;

#[derive(Encode, Decode, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pubkey(pub [u8; 32]);

impl Pubkey {
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl FromStr for Pubkey {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| EncodeError::InvalidPubkey(s.to_string()))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| EncodeError::InvalidPubkey(s.to_string()))?;
        Ok(Pubkey(key))
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self.to_base58())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn default_wall() -> Self {
        Self::new(DEFAULT_COLOR[0], DEFAULT_COLOR[1], DEFAULT_COLOR[2])
    }
}

impl FromStr for Color {
    type Err = EncodeError;

    /// Accepts `rrggbb` or `#rrggbb` in either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim();
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(EncodeError::InvalidColor(s.to_string()));
        }

        let parsed = Rgb::from_hex_str(&format!("#{}", digits))
            .map_err(|_| EncodeError::InvalidColor(s.to_string()))?;

        Ok(Color::new(
            parsed.get_red() as u8,
            parsed.get_green() as u8,
            parsed.get_blue() as u8,
        ))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// One `(x, y, r, g, b)` tuple from a record's data field.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PixelEdit {
    pub x: u8,
    pub y: u8,
    pub color: Color,
}

impl PixelEdit {
    pub fn index(&self, width: usize) -> usize {
        self.x as usize + self.y as usize * width
    }
}

/// Free-text metadata attached to a record. Empty strings are treated as absent.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct SocialBundle {
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub community: Option<String>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub ticker: Option<String>,
    pub description: Option<String>,
}

impl SocialBundle {
    pub fn default_wall() -> Self {
        Self {
            website: Some(DEFAULT_WEBSITE.to_string()),
            twitter: Some(DEFAULT_TWITTER.to_string()),
            community: Some(DEFAULT_COMMUNITY.to_string()),
            image: Some(DEFAULT_IMAGE.to_string()),
            name: Some(DEFAULT_NAME.to_string()),
            ticker: Some(DEFAULT_TICKER.to_string()),
            description: Some(DEFAULT_DESCRIPTION.to_string()),
        }
    }
}

/// Who painted a pixel, shared by every pixel of the same record.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Attribution {
    pub payer: Pubkey,
    pub token: Pubkey,
    pub socials: SocialBundle,
}

impl Attribution {
    pub fn default_wall() -> Self {
        Self {
            payer: DEFAULT_PAYER.parse().unwrap_or_default(),
            token: default_token(),
            socials: SocialBundle::default_wall(),
        }
    }

    /// The advertised token, unless it is the wall's placeholder.
    pub fn advertised_token(&self) -> Option<Pubkey> {
        (self.token != default_token()).then_some(self.token)
    }
}

pub fn default_token() -> Pubkey {
    DEFAULT_TOKEN.parse().unwrap_or_default()
}

/// A full record as written to the ledger. `data` and `socials` are already
/// packed (see `codec::encode_data` and `codec::encode_socials`).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Record {
    pub bump: u8,
    pub id: [u8; 32],
    pub version: u8,
    pub epoch: u64,
    pub mint: Pubkey,
    pub timestamp: i64,
    pub payer: Pubkey,
    pub token: Pubkey,
    pub data: Vec<u8>,
    pub socials: String,
}

impl Record {
    pub fn value(&self, field: &str) -> Option<FieldValue> {
        let value = match field {
            "bump" => FieldValue::U8(self.bump),
            "id" => FieldValue::Bytes(self.id.to_vec()),
            "version" => FieldValue::U8(self.version),
            "epoch" => FieldValue::U64(self.epoch),
            "mint" => FieldValue::Pubkey(self.mint),
            "timestamp" => FieldValue::I64(self.timestamp),
            "payer" => FieldValue::Pubkey(self.payer),
            "token" => FieldValue::Pubkey(self.token),
            "data" => FieldValue::Bytes(self.data.clone()),
            "socials" => FieldValue::Str(self.socials.clone()),
            _ => return None,
        };
        Some(value)
    }
}

/// A record read back from the ledger. Fields ahead of the fetched slice are `None`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DecodedRecord {
    pub bump: Option<u8>,
    pub id: Option<[u8; 32]>,
    pub version: Option<u8>,
    pub epoch: Option<u64>,
    pub mint: Option<Pubkey>,
    pub timestamp: i64,
    pub payer: Pubkey,
    pub token: Pubkey,
    pub pixels: Vec<PixelEdit>,
    pub socials: SocialBundle,
}

impl DecodedRecord {
    pub fn attribution(&self) -> Attribution {
        Attribution {
            payer: self.payer,
            token: self.token,
            socials: self.socials.clone(),
        }
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    pub fn edit_set(&self, width: usize) -> EditSet {
        self.pixels
            .iter()
            .map(|p| (p.index(width) as u32, p.color))
            .collect()
    }
}

/// Header of a ledger snapshot archive.
#[derive(Encode, Decode, Clone, PartialEq, Eq, Debug)]
pub struct ArchiveMeta {
    pub version: u8,
    pub record_size: u32,
    pub record_count: u32,
    pub px_width: u16,
    pub px_height: u16,
    /// Unix seconds.
    pub created_at: i64,
    pub has_snapshot: bool,
}

/// A single field decoded by walking the schema.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum FieldValue {
    U8(u8),
    I8(i8),
    Bool(bool),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    U128(u128),
    I128(i128),
    Pubkey(Pubkey),
    Bytes(Vec<u8>),
    Array(Vec<FieldValue>),
    Str(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::U8(v) => write!(f, "{}", v),
            FieldValue::I8(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::U16(v) => write!(f, "{}", v),
            FieldValue::I16(v) => write!(f, "{}", v),
            FieldValue::U32(v) => write!(f, "{}", v),
            FieldValue::I32(v) => write!(f, "{}", v),
            FieldValue::U64(v) => write!(f, "{}", v),
            FieldValue::I64(v) => write!(f, "{}", v),
            FieldValue::U128(v) => write!(f, "{}", v),
            FieldValue::I128(v) => write!(f, "{}", v),
            FieldValue::Pubkey(v) => write!(f, "{}", v),
            FieldValue::Bytes(v) => write!(f, "{} bytes", v.len()),
            FieldValue::Array(v) => write!(f, "{} items", v.len()),
            FieldValue::Str(v) => write!(f, "{:?}", v),
        }
    }
}
