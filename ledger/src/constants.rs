use bincode::config::{Configuration, Fixint, LittleEndian, NoLimit};

// Legacy encoding keeps integers fixed-width so every field sits at a known offset
pub const BINCODE_CONFIG: Configuration<LittleEndian, Fixint, NoLimit> =
    bincode::config::legacy();

/// Opaque record-type prefix written ahead of the first field.
pub const DISCRIMINATOR_SIZE: usize = 8;

/// Struct in the descriptor that describes a pixel edit record.
pub const RECORD_TYPE: &str = "metadataAccount";

/// Field that tags the record layout version; used as the server-side filter.
pub const VERSION_FIELD: &str = "version";

/// First field fetched during a rebuild. Everything before it is ledger bookkeeping.
pub const READ_FROM_FIELD: &str = "mint";

pub const MAX_RETRY_ATTEMPTS: u32 = 3;

pub const DEFAULT_COLOR: [u8; 3] = [0x1b, 0x1d, 0x28];
pub const DEFAULT_PAYER: &str = "DEGenPMwjmLCw9LmdvfCUK5M4XKrbep2rts4DDqG3J5x";
/// Wrapped SOL; a record carrying it advertises no token.
pub const DEFAULT_TOKEN: &str = "So11111111111111111111111111111111111111112";
pub const DEFAULT_WEBSITE: &str = "degen_wall.com";
pub const DEFAULT_TWITTER: &str = "degen_wall";
pub const DEFAULT_COMMUNITY: &str = "t.me/degen_wall";
pub const DEFAULT_IMAGE: &str = "i.ibb.co/ABC/1500x500.jpg";
pub const DEFAULT_NAME: &str = "Degen Wall";
pub const DEFAULT_TICKER: &str = "DEV";
pub const DEFAULT_DESCRIPTION: &str = "Put your pixels on display dawg";

pub const URL_PREFIX: &str = "https://";
pub const TWITTER_URL_PREFIX: &str = "https://x.com/";
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];
