//! Value encoding for cache entries
//!
//! [`Encoding::Json`] writes plain `serde_json` bytes so other services can
//! read the entry. [`Encoding::Binary`] writes a MessagePack payload with
//! named struct fields behind a three byte envelope:
//!
//! ```text
//! +------+------+---------+---------------------+
//! | 'C'  | 'W'  | format  | MessagePack payload |
//! +------+------+---------+---------------------+
//! ```
//!
//! MessagePack is self-describing, so tagged and flattened enums, `Value`
//! fields and skipped fields read back the way they were written. Values
//! that would still not survive the trip (`Some(None)`, non-finite floats in
//! JSON) are rejected by [`encode`] with [`CodecError::Unrepresentable`].
//!
//! The format byte lets an older or newer payload layout be rejected cleanly
//! instead of being misread.

mod guard;

use std::io::Cursor;

use cacheward_domain::Encoding;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Leading bytes of every binary entry
pub const ENVELOPE_MAGIC: [u8; 2] = *b"CW";

/// Current binary payload layout
pub const ENVELOPE_FORMAT_VERSION: u8 = 2;

const HEADER_LEN: usize = ENVELOPE_MAGIC.len() + 1;

/// Encoding or decoding failure
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary: {0}")]
    BinaryEncode(#[from] rmp_serde::encode::Error),

    #[error("binary: {0}")]
    Binary(#[from] rmp_serde::decode::Error),

    #[error("value would not decode to itself: {0}")]
    Unrepresentable(String),

    #[error("binary entry has {extra} trailing bytes")]
    TrailingBytes { extra: usize },

    #[error("binary entry is {len} bytes, shorter than its header")]
    Truncated { len: usize },

    #[error("binary entry has bad magic bytes {found:02x?}")]
    BadMagic { found: [u8; 2] },

    #[error("binary entry has unsupported format version {0}")]
    UnsupportedFormat(u8),
}

/// Encode `value` with `encoding`
///
/// # Errors
/// [`CodecError::Unrepresentable`] when the value would decode to something
/// else, or the encoder's own error.
pub fn encode<T>(value: &T, encoding: Encoding) -> Result<Vec<u8>, CodecError>
where
    T: Serialize + ?Sized,
{
    let json = matches!(encoding, Encoding::Json);
    guard::check(value, json).map_err(|err| CodecError::Unrepresentable(err.to_string()))?;

    match encoding {
        Encoding::Json => Ok(serde_json::to_vec(value)?),
        Encoding::Binary => {
            let mut bytes = Vec::with_capacity(64);
            bytes.extend_from_slice(&ENVELOPE_MAGIC);
            bytes.push(ENVELOPE_FORMAT_VERSION);
            rmp_serde::encode::write_named(&mut bytes, value)?;
            Ok(bytes)
        }
    }
}

/// Decode bytes written by [`encode`] with the same `encoding`
///
/// # Errors
/// Any header or payload mismatch; trailing bytes after the payload mean the
/// entry was not written by this codec.
pub fn decode<T>(bytes: &[u8], encoding: Encoding) -> Result<T, CodecError>
where
    T: DeserializeOwned,
{
    match encoding {
        Encoding::Json => Ok(serde_json::from_slice(bytes)?),
        Encoding::Binary => {
            if bytes.len() < HEADER_LEN {
                return Err(CodecError::Truncated { len: bytes.len() });
            }
            let found = [bytes[0], bytes[1]];
            if found != ENVELOPE_MAGIC {
                return Err(CodecError::BadMagic { found });
            }
            if bytes[2] != ENVELOPE_FORMAT_VERSION {
                return Err(CodecError::UnsupportedFormat(bytes[2]));
            }

            let payload = &bytes[HEADER_LEN..];
            let mut cursor = Cursor::new(payload);
            let value = rmp_serde::from_read(&mut cursor)?;
            let read = usize::try_from(cursor.position()).unwrap_or(payload.len());
            if read < payload.len() {
                return Err(CodecError::TrailingBytes { extra: payload.len() - read });
            }
            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Shelter {
        id: u64,
        name: String,
        beds: Option<u16>,
        tags: Vec<String>,
    }

    fn shelter() -> Shelter {
        Shelter {
            id: 7,
            name: "Covenant House".into(),
            beds: Some(54),
            tags: vec!["youth".into(), "meals".into()],
        }
    }

    #[test]
    fn test_json_is_plain_text() {
        let bytes = encode(&shelter(), Encoding::Json).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.starts_with(r#"{"id":7,"name":"Covenant House""#));
        assert_eq!(decode::<Shelter>(&bytes, Encoding::Json).unwrap(), shelter());
    }

    /// Validates the binary envelope header.
    ///
    /// Assertions:
    /// - Confirms the entry starts with `CW` and the format version.
    /// - Confirms the value decodes back unchanged.
    #[test]
    fn test_binary_envelope_header() {
        let rows = vec![shelter(), Shelter { beds: None, ..shelter() }];
        let bytes = encode(&rows, Encoding::Binary).unwrap();

        assert_eq!(&bytes[..2], b"CW");
        assert_eq!(bytes[2], ENVELOPE_FORMAT_VERSION);
        assert_eq!(decode::<Vec<Shelter>>(&bytes, Encoding::Binary).unwrap(), rows);
    }

    #[test]
    fn test_json_rejects_non_string_map_keys() {
        let mut map = HashMap::new();
        map.insert((1, 2), "pair");
        assert!(matches!(encode(&map, Encoding::Json), Err(CodecError::Json(_))));
        // Binary handles the same value
        assert!(encode(&map, Encoding::Binary).is_ok());
    }

    #[test]
    fn test_json_rejects_malformed_input() {
        assert!(matches!(decode::<Shelter>(b"{\"id\":", Encoding::Json), Err(CodecError::Json(_))));
    }

    /// Validates every way a binary entry can be rejected.
    ///
    /// Assertions:
    /// - Confirms short input, bad magic and unknown format are distinct.
    /// - Confirms a truncated payload and trailing bytes are decode errors.
    #[test]
    fn test_binary_rejects_corrupt_entries() {
        let bytes = encode(&shelter(), Encoding::Binary).unwrap();

        assert!(matches!(
            decode::<Shelter>(&bytes[..2], Encoding::Binary),
            Err(CodecError::Truncated { len: 2 })
        ));

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(matches!(
            decode::<Shelter>(&bad_magic, Encoding::Binary),
            Err(CodecError::BadMagic { found: [b'X', b'W'] })
        ));

        let mut future_format = bytes.clone();
        future_format[2] = ENVELOPE_FORMAT_VERSION + 1;
        assert!(matches!(
            decode::<Shelter>(&future_format, Encoding::Binary),
            Err(CodecError::UnsupportedFormat(v)) if v == ENVELOPE_FORMAT_VERSION + 1
        ));

        // Entries from the first, fixed-width layout
        let mut first_layout = bytes.clone();
        first_layout[2] = 1;
        assert!(matches!(
            decode::<Shelter>(&first_layout, Encoding::Binary),
            Err(CodecError::UnsupportedFormat(1))
        ));

        assert!(matches!(
            decode::<Shelter>(&bytes[..bytes.len() - 3], Encoding::Binary),
            Err(CodecError::Binary(_))
        ));

        let mut trailing = bytes;
        trailing.push(0);
        let result = decode::<Shelter>(&trailing, Encoding::Binary);
        assert!(matches!(result, Err(CodecError::TrailingBytes { extra: 1 })));
    }

    #[test]
    fn test_json_bytes_are_not_binary_entries() {
        let json = encode(&shelter(), Encoding::Json).unwrap();
        assert!(matches!(
            decode::<Shelter>(&json, Encoding::Binary),
            Err(CodecError::BadMagic { .. })
        ));
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    enum Resource {
        Shelter { name: String, beds: u16 },
        FoodBank { name: String, open_days: Vec<String> },
        Closed,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Contact {
        phone: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        email: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Listing {
        id: u64,
        #[serde(flatten)]
        contact: Contact,
        resource: Resource,
        extra: serde_json::Value,
    }

    fn listings() -> Vec<Listing> {
        vec![
            Listing {
                id: 1,
                contact: Contact { phone: "+16045550100".into(), email: None },
                resource: Resource::Shelter { name: "Covenant House".into(), beds: 54 },
                extra: json!({ "wheelchair": true, "floors": [1, 2], "rating": 4.5 }),
            },
            Listing {
                id: 2,
                contact: Contact { phone: "+16045550101".into(), email: Some("a@b.org".into()) },
                resource: Resource::FoodBank {
                    name: "Greater Vancouver".into(),
                    open_days: vec!["mon".into(), "thu".into()],
                },
                extra: serde_json::Value::Null,
            },
            Listing {
                id: 3,
                contact: Contact { phone: "+16045550102".into(), email: None },
                resource: Resource::Closed,
                extra: json!("seasonal"),
            },
        ]
    }

    /// Validates serde shapes that need a self-describing format.
    ///
    /// Assertions:
    /// - Confirms tagged enums, flatten, `Value` and skipped fields decode
    ///   unchanged with both encodings.
    #[test]
    fn test_self_describing_shapes_round_trip() {
        for encoding in [Encoding::Binary, Encoding::Json] {
            let bytes = encode(&listings(), encoding).unwrap();
            let decoded: Vec<Listing> = decode(&bytes, encoding).unwrap();
            assert_eq!(decoded, listings(), "{encoding:?}");
        }
    }

    #[test]
    fn test_non_finite_floats() {
        let readings = vec![1.5, f64::INFINITY, f64::NEG_INFINITY];

        let bytes = encode(&readings, Encoding::Binary).unwrap();
        assert_eq!(decode::<Vec<f64>>(&bytes, Encoding::Binary).unwrap(), readings);

        let err = encode(&readings, Encoding::Json).unwrap_err();
        assert!(matches!(err, CodecError::Unrepresentable(_)));
        assert!(matches!(encode(&f64::NAN, Encoding::Json), Err(CodecError::Unrepresentable(_))));
    }

    /// Validates that values collapsing to `None` are refused up front.
    #[test]
    fn test_nested_none_is_unrepresentable() {
        for encoding in [Encoding::Binary, Encoding::Json] {
            let err = encode(&Some(None::<u32>), encoding).unwrap_err();
            assert!(matches!(err, CodecError::Unrepresentable(_)), "{encoding:?}");
            assert!(encode(&Some(json!(null)), encoding).is_err());
        }

        let nested: Option<Vec<Option<u8>>> = Some(vec![None, Some(3)]);
        let bytes = encode(&nested, Encoding::Binary).unwrap();
        assert_eq!(decode::<Option<Vec<Option<u8>>>>(&bytes, Encoding::Binary).unwrap(), nested);
    }

    #[test]
    fn test_binary_keeps_field_names() {
        let bytes = encode(&shelter(), Encoding::Binary).unwrap();
        let payload = &bytes[HEADER_LEN..];
        assert!(payload.windows(4).any(|w| w == b"beds"));
    }
}
