use bincode::Decode;
use structures::{Field, FieldKind, Primitive, WallConstants};
use tracing::trace;

use crate::{
    config::WallConfig,
    constants::BINCODE_CONFIG,
    errors::{DecodeError, EncodeError},
    offsets::Layout,
    structures::{Color, DecodedRecord, FieldValue, PixelEdit, Pubkey, Record, SocialBundle},
};

/// Named fields decoded from a slice of a record, in storage order.
pub type DecodedFields = Vec<(String, FieldValue)>;

/// Packs edits into a record's data field, in the order given. Unused capacity
/// is filled with the data delimiter.
pub fn encode_data<I>(edits: I, constants: &WallConstants) -> Result<Vec<u8>, EncodeError>
where
    I: IntoIterator<Item = (u32, Color)>,
{
    let edits: Vec<(u32, Color)> = edits.into_iter().collect();
    let capacity = constants.capacity_pixels();
    if edits.len() > capacity {
        return Err(EncodeError::TooManyPixels {
            count: edits.len(),
            capacity,
        });
    }

    let mut data = Vec::with_capacity(constants.max_data_size);
    for (index, color) in edits {
        if index as usize >= constants.canvas_size() {
            return Err(EncodeError::IndexOutOfBounds {
                index,
                size: constants.canvas_size(),
            });
        }

        let x = index as usize % constants.px_width;
        let y = index as usize / constants.px_width;
        data.extend_from_slice(&[x as u8, y as u8, color.r, color.g, color.b]);
    }
    data.resize(constants.max_data_size, constants.data_delimiter);

    Ok(data)
}

/// Reads pixel tuples up to the first delimiter, without checking them
/// against the canvas. Records are decoded this way so the reducer can reject
/// an off-canvas pixel on its own and keep the rest.
pub fn decode_pixels(
    data: &[u8],
    constants: &WallConstants,
) -> Result<Vec<PixelEdit>, DecodeError> {
    if data.len() % constants.px_size != 0 {
        return Err(DecodeError::InvalidFieldValue {
            field: "data".to_string(),
            offset: data.len() - data.len() % constants.px_size,
            reason: format!(
                "{} bytes is not a whole number of {}-byte pixels",
                data.len(),
                constants.px_size
            ),
        });
    }

    let mut pixels = Vec::new();
    for tuple in data.chunks_exact(constants.px_size) {
        let (x, y) = (tuple[0], tuple[1]);
        if x == constants.data_delimiter {
            break;
        }

        pixels.push(PixelEdit {
            x,
            y,
            color: Color::new(tuple[2], tuple[3], tuple[4]),
        });
    }

    Ok(pixels)
}

/// Like [`decode_pixels`], but any coordinate outside the canvas fails the
/// whole field.
pub fn decode_data(data: &[u8], constants: &WallConstants) -> Result<Vec<PixelEdit>, DecodeError> {
    let pixels = decode_pixels(data, constants)?;

    for (i, pixel) in pixels.iter().enumerate() {
        let offset = i * constants.px_size;
        if pixel.x as usize >= constants.px_width {
            return Err(DecodeError::InvalidFieldValue {
                field: "data".to_string(),
                offset,
                reason: format!("x {} is outside canvas width {}", pixel.x, constants.px_width),
            });
        }
        if pixel.y as usize >= constants.px_height {
            return Err(DecodeError::InvalidFieldValue {
                field: "data".to_string(),
                offset: offset + 1,
                reason: format!("y {} is outside canvas height {}", pixel.y, constants.px_height),
            });
        }
    }

    Ok(pixels)
}

/// Joins the socials into the single delimited string stored on the ledger.
pub fn encode_socials(
    socials: &SocialBundle,
    constants: &WallConstants,
) -> Result<String, EncodeError> {
    let delimiter = constants.string_delimiter.as_str();
    let leading = [
        ("website", &socials.website),
        ("twitter", &socials.twitter),
        ("community", &socials.community),
        ("image", &socials.image),
        ("name", &socials.name),
        ("ticker", &socials.ticker),
    ];

    for (field, value) in leading {
        if value.as_deref().is_some_and(|v| v.contains(delimiter)) {
            return Err(EncodeError::DelimiterInField(field));
        }
    }
    check_length("name", &socials.name, constants.name_length)?;
    check_length("ticker", &socials.ticker, constants.ticker_length)?;
    check_length("twitter", &socials.twitter, constants.twitter_length)?;

    let mut packed = leading
        .iter()
        .map(|(_, value)| value.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(delimiter);
    packed.push_str(delimiter);
    packed.push_str(socials.description.as_deref().unwrap_or(""));

    if packed.len() > constants.max_socials_size {
        return Err(EncodeError::FieldTooLong {
            field: "socials".to_string(),
            len: packed.len(),
            max: constants.max_socials_size,
        });
    }

    Ok(packed)
}

fn check_length(field: &str, value: &Option<String>, max: usize) -> Result<(), EncodeError> {
    match value {
        Some(value) if value.len() > max => Err(EncodeError::FieldTooLong {
            field: field.to_string(),
            len: value.len(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Splits a stored socials string. The first six segments are fixed fields;
/// everything after them is the description, delimiters included.
pub fn decode_socials(raw: &str, delimiter: &str) -> SocialBundle {
    let mut parts = raw.split(delimiter);

    let website = next_segment(&mut parts);
    let twitter = next_segment(&mut parts);
    let community = next_segment(&mut parts);
    let image = next_segment(&mut parts);
    let name = next_segment(&mut parts);
    let ticker = next_segment(&mut parts);

    let rest: Vec<&str> = parts.collect();
    let description = Some(rest.join(delimiter)).filter(|d| !d.is_empty());

    SocialBundle {
        website,
        twitter,
        community,
        image,
        name,
        ticker,
        description,
    }
}

fn next_segment<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Option<String> {
    parts
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Writes the discriminator followed by every schema field in declaration order.
pub fn encode_record(record: &Record, config: &WallConfig) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::with_capacity(config.layout.record_size());
    buf.extend_from_slice(&config.discriminator);

    for field in &config.layout.schema().fields {
        let value = record
            .value(&field.name)
            .ok_or_else(|| EncodeError::MissingValue(field.name.clone()))?;
        encode_value(field, &value, &mut buf)?;
    }

    trace!(len = buf.len(), "encoded record");
    Ok(buf)
}

fn encode_value(field: &Field, value: &FieldValue, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    match (field.kind, value) {
        (FieldKind::Primitive(primitive), value) => encode_primitive(&field.name, primitive, value, buf),
        (FieldKind::Array(Primitive::U8, len), FieldValue::Bytes(bytes)) if bytes.len() == len => {
            buf.extend_from_slice(bytes);
            Ok(())
        }
        (FieldKind::Array(primitive, len), FieldValue::Array(items)) if items.len() == len => {
            for item in items {
                encode_primitive(&field.name, primitive, item, buf)?;
            }
            Ok(())
        }
        (FieldKind::String { capacity }, FieldValue::Str(text)) => {
            if text.len() > capacity {
                return Err(EncodeError::FieldTooLong {
                    field: field.name.clone(),
                    len: text.len(),
                    max: capacity,
                });
            }
            write(text.len() as u32, buf)?;
            buf.extend_from_slice(text.as_bytes());
            buf.resize(buf.len() + capacity - text.len(), 0);
            Ok(())
        }
        _ => Err(EncodeError::TypeMismatch(field.name.clone())),
    }
}

fn encode_primitive(
    name: &str,
    primitive: Primitive,
    value: &FieldValue,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match (primitive, value) {
        (Primitive::U8, FieldValue::U8(v)) => write(v, buf),
        (Primitive::I8, FieldValue::I8(v)) => write(v, buf),
        (Primitive::Bool, FieldValue::Bool(v)) => write(v, buf),
        (Primitive::U16, FieldValue::U16(v)) => write(v, buf),
        (Primitive::I16, FieldValue::I16(v)) => write(v, buf),
        (Primitive::U32, FieldValue::U32(v)) => write(v, buf),
        (Primitive::I32, FieldValue::I32(v)) => write(v, buf),
        (Primitive::U64, FieldValue::U64(v)) => write(v, buf),
        (Primitive::I64, FieldValue::I64(v)) => write(v, buf),
        (Primitive::U128, FieldValue::U128(v)) => write(v, buf),
        (Primitive::I128, FieldValue::I128(v)) => write(v, buf),
        (Primitive::Pubkey, FieldValue::Pubkey(v)) => write(v, buf),
        _ => Err(EncodeError::TypeMismatch(name.to_string())),
    }
}

fn write<E: bincode::Encode>(value: E, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    bincode::encode_into_std_write(value, buf, BINCODE_CONFIG)?;
    Ok(())
}

/// Decodes the fields in `[from, to)` from a slice that starts at `from`'s
/// offset. `to = None` means the slice runs to the end of the record.
pub fn decode_fields(
    bytes: &[u8],
    layout: &Layout,
    from: &str,
    to: Option<&str>,
) -> Result<DecodedFields, DecodeError> {
    let range = layout.slice(from, to)?;
    if bytes.len() != range.length {
        return Err(DecodeError::malformed(
            from,
            format!("expected {} bytes, got {}", range.length, bytes.len()),
        ));
    }

    layout
        .fields_between(from, to)?
        .into_iter()
        .map(|(offset, field)| {
            let start = offset - range.offset;
            let raw = &bytes[start..start + field.kind.size()];
            Ok((field.name.clone(), decode_value(field, raw)?))
        })
        .collect()
}

fn decode_value(field: &Field, raw: &[u8]) -> Result<FieldValue, DecodeError> {
    match field.kind {
        FieldKind::Primitive(primitive) => decode_primitive(&field.name, primitive, raw),
        FieldKind::Array(Primitive::U8, _) => Ok(FieldValue::Bytes(raw.to_vec())),
        FieldKind::Array(primitive, _) => raw
            .chunks_exact(primitive.size())
            .map(|item| decode_primitive(&field.name, primitive, item))
            .collect::<Result<Vec<_>, _>>()
            .map(FieldValue::Array),
        FieldKind::String { capacity } => {
            let (prefix, body) = raw.split_at(structures::STRING_LENGTH_PREFIX);
            let len = read::<u32>(prefix, &field.name)? as usize;
            if len > capacity {
                return Err(DecodeError::malformed(
                    &field.name,
                    format!("string length {} exceeds capacity {}", len, capacity),
                ));
            }
            let text = std::str::from_utf8(&body[..len])
                .map_err(|err| DecodeError::malformed(&field.name, err.to_string()))?;
            Ok(FieldValue::Str(text.to_string()))
        }
    }
}

fn decode_primitive(name: &str, primitive: Primitive, raw: &[u8]) -> Result<FieldValue, DecodeError> {
    let value = match primitive {
        Primitive::U8 => FieldValue::U8(read(raw, name)?),
        Primitive::I8 => FieldValue::I8(read(raw, name)?),
        Primitive::Bool => FieldValue::Bool(read(raw, name)?),
        Primitive::U16 => FieldValue::U16(read(raw, name)?),
        Primitive::I16 => FieldValue::I16(read(raw, name)?),
        Primitive::U32 => FieldValue::U32(read(raw, name)?),
        Primitive::I32 => FieldValue::I32(read(raw, name)?),
        Primitive::U64 => FieldValue::U64(read(raw, name)?),
        Primitive::I64 => FieldValue::I64(read(raw, name)?),
        Primitive::U128 => FieldValue::U128(read(raw, name)?),
        Primitive::I128 => FieldValue::I128(read(raw, name)?),
        Primitive::Pubkey => FieldValue::Pubkey(read::<Pubkey>(raw, name)?),
    };
    Ok(value)
}

fn read<T: Decode<()>>(raw: &[u8], field: &str) -> Result<T, DecodeError> {
    let (value, _) = bincode::decode_from_slice(raw, BINCODE_CONFIG)
        .map_err(|err| DecodeError::malformed(field, err.to_string()))?;
    Ok(value)
}

/// Decodes a record slice starting at `from` and running to the end of the
/// record. `timestamp`, `payer`, `token`, `data` and `socials` must be present.
pub fn decode_record(
    bytes: &[u8],
    config: &WallConfig,
    from: &str,
) -> Result<DecodedRecord, DecodeError> {
    let mut bump = None;
    let mut id = None;
    let mut version = None;
    let mut epoch = None;
    let mut mint = None;
    let mut timestamp = None;
    let mut payer = None;
    let mut token = None;
    let mut pixels = None;
    let mut socials = None;

    for (name, value) in decode_fields(bytes, &config.layout, from, None)? {
        match (name.as_str(), value) {
            ("bump", FieldValue::U8(v)) => bump = Some(v),
            ("id", FieldValue::Bytes(v)) => {
                id = Some(
                    <[u8; 32]>::try_from(v)
                        .map_err(|_| DecodeError::malformed("id", "expected 32 bytes"))?,
                )
            }
            ("version", FieldValue::U8(v)) => version = Some(v),
            ("epoch", FieldValue::U64(v)) => epoch = Some(v),
            ("mint", FieldValue::Pubkey(v)) => mint = Some(v),
            ("timestamp", FieldValue::I64(v)) => timestamp = Some(v),
            ("payer", FieldValue::Pubkey(v)) => payer = Some(v),
            ("token", FieldValue::Pubkey(v)) => token = Some(v),
            ("data", FieldValue::Bytes(v)) => pixels = Some(decode_pixels(&v, &config.constants)?),
            ("socials", FieldValue::Str(v)) => {
                socials = Some(decode_socials(&v, &config.constants.string_delimiter))
            }
            (
                field @ ("bump" | "id" | "version" | "epoch" | "mint" | "timestamp" | "payer"
                | "token" | "data" | "socials"),
                value,
            ) => {
                return Err(DecodeError::malformed(
                    field,
                    format!("unexpected value {}", value),
                ))
            }
            _ => {}
        }
    }

    Ok(DecodedRecord {
        bump,
        id,
        version,
        epoch,
        mint,
        timestamp: timestamp.ok_or_else(|| missing("timestamp"))?,
        payer: payer.ok_or_else(|| missing("payer"))?,
        token: token.ok_or_else(|| missing("token"))?,
        pixels: pixels.ok_or_else(|| missing("data"))?,
        socials: socials.ok_or_else(|| missing("socials"))?,
    })
}

fn missing(field: &str) -> DecodeError {
    DecodeError::malformed(field, "field is not part of the decoded slice")
}
