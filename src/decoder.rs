//! Result decoder for read-only inspection return values.
//!
//! The node returns values whose encoding depends on how the field was
//! rendered: raw byte arrays of different widths, `[bytes, type]` tuples, or
//! comma-joined text with a trailing type marker. Nothing here returns an
//! error. Unrecognised shapes degrade to a pass-through string for
//! addresses and `false` for booleans.

use serde_json::Value;

use crate::constants::{ADDRESS_LENGTH, ZERO_ADDRESS};

/// Fewest integers a comma-separated list needs before it is treated as an
/// address.
const MIN_BYTE_LIST_LEN: usize = 20;
const TAGGED_ADDRESS_LEN: usize = 65;
const WIDE_ADDRESS_LEN: usize = 64;
const ADDRESS_TYPE_MARKER: &str = ",address";
const MAX_BOOL_DEPTH: usize = 16;

/// Observed wire shape of an address value.
#[derive(Debug, PartialEq, Eq)]
enum AddressShape<'a> {
    /// 65 bytes: one type tag followed by 64 bytes.
    Tagged(Vec<u8>),
    /// Exactly 64 bytes.
    Wide(Vec<u8>),
    /// Exactly 32 bytes, the on-chain address width.
    Canonical(Vec<u8>),
    /// Text holding comma-separated integers.
    ByteList(&'a str),
    Opaque,
}

fn classify_address(value: &Value) -> AddressShape<'_> {
    match value {
        Value::Array(items) => match (items.len(), byte_array(items)) {
            (TAGGED_ADDRESS_LEN, Some(bytes)) => AddressShape::Tagged(bytes),
            (WIDE_ADDRESS_LEN, Some(bytes)) => AddressShape::Wide(bytes),
            (ADDRESS_LENGTH, Some(bytes)) => AddressShape::Canonical(bytes),
            _ => AddressShape::Opaque,
        },
        Value::String(text) if text.contains(',') => AddressShape::ByteList(text),
        _ => AddressShape::Opaque,
    }
}

/// Renders bytes as two lowercase hex digits each, no separator.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decodes an address from any of the shapes the node is known to produce.
pub fn decode_address(value: &Value) -> String {
    match classify_address(value) {
        AddressShape::Tagged(bytes) => format!("0x{}", bytes_to_hex(&bytes[1..])),
        AddressShape::Wide(bytes) | AddressShape::Canonical(bytes) => {
            format!("0x{}", bytes_to_hex(&bytes))
        }
        AddressShape::ByteList(text) => {
            decode_byte_list(text).unwrap_or_else(|| text.to_string())
        }
        AddressShape::Opaque => render_text(value),
    }
}

fn decode_byte_list(text: &str) -> Option<String> {
    let stripped = text.replacen(ADDRESS_TYPE_MARKER, "", 1);
    let mut segments: Vec<&str> = stripped.trim().split(',').collect();

    // Any other trailing type marker (e.g. `0x1::option::Option<address>`).
    if segments
        .last()
        .is_some_and(|last| !last.trim().chars().all(|c| c.is_ascii_digit()))
    {
        segments.pop();
    }

    let bytes: Vec<u8> = segments.into_iter().filter_map(parse_leading_byte).collect();
    if bytes.len() < MIN_BYTE_LIST_LEN {
        return None;
    }

    let tail = if bytes.len() > ADDRESS_LENGTH {
        &bytes[bytes.len() - ADDRESS_LENGTH..]
    } else {
        &bytes[..]
    };
    Some(format!("0x{:0>64}", bytes_to_hex(tail)))
}

fn parse_leading_byte(segment: &str) -> Option<u8> {
    let digits: String = segment
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u8>().ok()
}

/// Decodes a boolean. Unknown shapes are `false`.
pub fn decode_bool(value: &Value) -> bool {
    decode_bool_at(value, 0)
}

fn decode_bool_at(value: &Value, depth: usize) -> bool {
    if depth > MAX_BOOL_DEPTH {
        return false;
    }
    match value {
        Value::Array(items) if items.len() == 1 => decode_bool_at(&items[0], depth + 1),
        Value::Array(items) if items.len() > 1 => match &items[0] {
            Value::Array(inner) => inner.first().is_some_and(is_truthy_scalar),
            _ => false,
        },
        Value::String(text) => {
            let lowered = text.to_ascii_lowercase();
            lowered == "true" || lowered == "1"
        }
        Value::Bool(flag) => *flag,
        Value::Number(_) => is_truthy_scalar(value),
        _ => false,
    }
}

fn is_truthy_scalar(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64() == Some(1.0),
        _ => false,
    }
}

/// Decodes an unsigned integer from a number, numeric text, little-endian
/// bytes, or a `[bytes, type]` tuple.
pub fn decode_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(text) => {
            let digits: String = text
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse::<u64>().ok()
        }
        Value::Array(items) => match items.first() {
            Some(Value::Array(_)) => decode_u64(&items[0]),
            _ => byte_array(items).and_then(|bytes| le_u64(&bytes)),
        },
        _ => None,
    }
}

fn le_u64(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    if bytes.len() > 8 && bytes[8..].iter().any(|b| *b != 0) {
        return None;
    }
    Some(
        bytes
            .iter()
            .take(8)
            .enumerate()
            .fold(0_u64, |acc, (i, b)| acc | (u64::from(*b) << (8 * i))),
    )
}

/// Decodes an `Option<address>`.
///
/// Accepts JSON null, a plain address string, BCS option bytes (`[0]` or
/// `[1, ..32 bytes]`), or a `[bytes, type]` tuple wrapping them. The zero
/// address counts as absent.
pub fn decode_optional_address(value: &Value) -> Option<String> {
    let decoded = match value {
        Value::Null => return None,
        Value::String(text) if text.trim().is_empty() => return None,
        Value::Array(items) => match items.first() {
            None => return None,
            Some(Value::Array(_)) => return decode_optional_address(&items[0]),
            Some(_) => match byte_array(items) {
                Some(bytes) if bytes.len() == 1 && bytes[0] == 0 => return None,
                Some(bytes) if bytes[0] == 1 && bytes.len() == ADDRESS_LENGTH + 1 => {
                    format!("0x{}", bytes_to_hex(&bytes[1..]))
                }
                _ => decode_address(value),
            },
        },
        _ => decode_address(value),
    };
    if is_empty_address(&decoded) {
        None
    } else {
        Some(decoded)
    }
}

/// `"0"` and the zero address both mean "nobody" on the wire.
pub fn is_empty_address(address: &str) -> bool {
    let trimmed = address.trim();
    trimmed.is_empty() || trimmed == "0" || trimmed == ZERO_ADDRESS
}

/// Decodes a BCS `vector<ID>`: ULEB128 length followed by 32-byte ids.
/// Trailing bytes that do not form a whole id are ignored.
pub fn decode_id_vector(bytes: &[u8]) -> Vec<String> {
    let Some((declared, offset)) = read_uleb128(bytes) else {
        return Vec::new();
    };
    bytes[offset..]
        .chunks_exact(ADDRESS_LENGTH)
        .take(usize::try_from(declared).unwrap_or(usize::MAX))
        .map(|chunk| format!("0x{}", bytes_to_hex(chunk)))
        .collect()
}

fn read_uleb128(bytes: &[u8]) -> Option<(u64, usize)> {
    let mut value = 0_u64;
    for (index, byte) in bytes.iter().enumerate().take(10) {
        value |= u64::from(byte & 0x7f) << (7 * index);
        if byte & 0x80 == 0 {
            return Some((value, index + 1));
        }
    }
    None
}

/// Comma-joined text rendering of a raw value; nested arrays are flattened.
pub fn render_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(render_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn byte_array(items: &[Value]) -> Option<Vec<u8>> {
    items
        .iter()
        .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn zeros(len: usize) -> Vec<u8> {
        vec![0_u8; len]
    }

    #[test]
    fn tagged_65_bytes_drop_the_type_tag() {
        let mut bytes = zeros(65);
        bytes[0] = 7;
        bytes[1] = 0x12;
        bytes[2] = 0x34;
        let decoded = decode_address(&json!(bytes));
        assert_eq!(decoded, format!("0x1234{}", "0".repeat(124)));
        assert_eq!(decoded.len(), 2 + 128);
    }

    #[test]
    fn wide_64_bytes_are_encoded_whole() {
        let mut bytes = zeros(64);
        bytes[63] = 0xff;
        let decoded = decode_address(&json!(bytes));
        assert_eq!(decoded, format!("0x{}ff", "0".repeat(126)));
    }

    #[test]
    fn canonical_32_bytes_keep_order() {
        let mut bytes = zeros(32);
        bytes[0] = 0xAB;
        bytes[1] = 0xCD;
        assert_eq!(
            decode_address(&json!(bytes)),
            format!("0xabcd{}", "0".repeat(60))
        );
    }

    #[test]
    fn zero_address_roundtrip() {
        assert_eq!(decode_address(&json!(zeros(32))), ZERO_ADDRESS);
    }

    #[test]
    fn byte_list_with_address_marker_is_padded() {
        let list: Vec<String> = (1..=22).map(|n| n.to_string()).collect();
        let raw = format!("18,52,{},address", list.join(","));
        let decoded = decode_address(&json!(raw));

        assert!(decoded.starts_with("0x"));
        assert_eq!(decoded.len(), 66);
        // 24 bytes recovered, so 8 bytes of zero padding up front.
        assert!(decoded[2..].starts_with(&"0".repeat(16)));
        assert_eq!(&decoded[18..22], "1234");
        assert!(decoded.ends_with("141516"));
    }

    #[test]
    fn byte_list_longer_than_32_keeps_the_tail() {
        let mut bytes = vec![1_u8, 9, 9];
        bytes.extend(zeros(31));
        bytes.push(0xee);
        let raw = bytes
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let decoded = decode_address(&json!(raw));
        assert_eq!(decoded, format!("0x{}ee", "0".repeat(62)));
    }

    #[test]
    fn short_byte_list_passes_through() {
        let raw = "1,2,3,address";
        assert_eq!(decode_address(&json!(raw)), raw);
    }

    #[test]
    fn byte_list_strips_generic_type_marker() {
        let mut parts: Vec<String> = vec!["1".into()];
        parts.extend((0..31).map(|_| "0".to_string()));
        parts.push("171".into());
        parts.push("0x1::option::Option<address>".into());
        let decoded = decode_address(&json!(parts.join(",")));
        assert_eq!(decoded, format!("0x{}ab", "0".repeat(62)));
    }

    #[test]
    fn unrecognised_shapes_pass_through() {
        assert_eq!(decode_address(&json!("0xabc")), "0xabc");
        assert_eq!(decode_address(&json!([1, 2, 3])), "1,2,3");
        assert_eq!(decode_address(&Value::Null), "");
        // Byte-wide shapes that contain a non-byte never count as addresses.
        let mut bad = vec![json!(0); 32];
        bad[4] = json!(300);
        assert!(!decode_address(&Value::Array(bad)).starts_with("0x"));
    }

    #[test]
    fn tuple_shape_is_not_treated_as_byte_list() {
        let tuple = json!([zeros(32), "address"]);
        let decoded = decode_address(&tuple);
        assert!(decoded.ends_with(",address"));
    }

    #[test]
    fn bool_single_element_arrays() {
        assert!(decode_bool(&json!([1])));
        assert!(!decode_bool(&json!([0])));
        assert!(decode_bool(&json!([[1]])));
        assert!(decode_bool(&json!([true])));
        assert!(!decode_bool(&json!([false])));
    }

    #[test]
    fn bool_tuple_uses_first_inner_element() {
        assert!(decode_bool(&json!([[1], "bool"])));
        assert!(!decode_bool(&json!([[0], "bool"])));
        assert!(!decode_bool(&json!([[], "bool"])));
    }

    #[test]
    fn bool_strings() {
        assert!(decode_bool(&json!("true")));
        assert!(decode_bool(&json!("TRUE")));
        assert!(decode_bool(&json!("1")));
        assert!(!decode_bool(&json!("false")));
        assert!(!decode_bool(&json!("0")));
        assert!(!decode_bool(&json!("maybe")));
        assert!(!decode_bool(&json!(" true")));
        assert!(!decode_bool(&json!("1 ")));
    }

    #[test]
    fn bool_natives_and_defaults() {
        assert!(decode_bool(&json!(true)));
        assert!(!decode_bool(&json!(false)));
        assert!(decode_bool(&json!(1)));
        assert!(!decode_bool(&json!(2)));
        assert!(!decode_bool(&Value::Null));
        assert!(!decode_bool(&json!({"value": true})));
        assert!(!decode_bool(&json!([1, 1])));
    }

    #[test]
    fn bool_deep_nesting_is_bounded() {
        let mut value = json!(1);
        for _ in 0..64 {
            value = json!([value]);
        }
        assert!(!decode_bool(&value));
    }

    #[test]
    fn u64_from_every_shape() {
        assert_eq!(decode_u64(&json!(3)), Some(3));
        assert_eq!(decode_u64(&json!("42")), Some(42));
        assert_eq!(decode_u64(&json!([44, 1, 0, 0, 0, 0, 0, 0])), Some(300));
        assert_eq!(decode_u64(&json!([[5, 0, 0, 0, 0, 0, 0, 0], "u64"])), Some(5));
        assert_eq!(decode_u64(&json!([2])), Some(2));
        assert_eq!(decode_u64(&json!("abc")), None);
        assert_eq!(decode_u64(&json!([])), None);
        assert_eq!(decode_u64(&Value::Null), None);
    }

    #[test]
    fn optional_address_shapes() {
        assert_eq!(decode_optional_address(&Value::Null), None);
        assert_eq!(decode_optional_address(&json!([[0], "0x1::option::Option<address>"])), None);
        assert_eq!(decode_optional_address(&json!([0])), None);

        let mut some = vec![1_u8];
        some.extend(zeros(31));
        some.push(0x0b);
        assert_eq!(
            decode_optional_address(&json!([some, "0x1::option::Option<address>"])),
            Some(format!("0x{}0b", "0".repeat(62)))
        );

        let plain = format!("0x{}", "c".repeat(64));
        assert_eq!(decode_optional_address(&json!(plain)), Some(plain.clone()));
        assert_eq!(decode_optional_address(&json!(ZERO_ADDRESS)), None);
    }

    #[test]
    fn optional_address_with_leading_zero_byte_is_some() {
        let mut bytes = zeros(32);
        bytes[1] = 0xab;
        bytes[31] = 0x01;
        let expected = format!("0x00ab{}01", "0".repeat(58));
        assert_eq!(decode_address(&json!(bytes)), expected);
        assert_eq!(decode_optional_address(&json!(bytes)), Some(expected.clone()));
        assert_eq!(
            decode_optional_address(&json!([bytes, "address"])),
            Some(expected)
        );
    }

    #[test]
    fn id_vector_reads_declared_count() {
        let mut bytes = vec![2_u8];
        bytes.extend(vec![0xaa; 32]);
        bytes.extend(vec![0xbb; 32]);
        bytes.extend(vec![0xcc; 5]);
        let ids = decode_id_vector(&bytes);
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], format!("0x{}", "aa".repeat(32)));
        assert_eq!(ids[1], format!("0x{}", "bb".repeat(32)));
        assert!(decode_id_vector(&[0]).is_empty());
        assert!(decode_id_vector(&[]).is_empty());
    }

    #[test]
    fn classify_prefers_tagged_over_other_widths() {
        assert!(matches!(
            classify_address(&json!(zeros(65))),
            AddressShape::Tagged(_)
        ));
        assert!(matches!(
            classify_address(&json!("1,2")),
            AddressShape::ByteList(_)
        ));
        assert_eq!(classify_address(&json!("12")), AddressShape::Opaque);
    }
}
