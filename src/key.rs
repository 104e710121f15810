use std::cmp::Ordering;
use std::str::FromStr;

use crate::field_type::FieldType;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const KIB: f64 = 1024.0;

/// The parsed form of a sort key. The raw key text is kept by the caller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Key {
    /// compared by its raw text
    String,
    Integer {
        i: i64
    },
    Size {
        bytes: f64
    },
    Month {
        ordinal: u8
    },
    /// the raw text does not parse under the active field type
    Malformed,
}

impl Key {
    pub(crate) fn new(raw: &str, field_type: FieldType) -> Key {
        match field_type {
            FieldType::String => Key::String,
            FieldType::Integer => match i64::from_str(raw) {
                Ok(i) => Key::Integer { i },
                Err(_) => Key::Malformed,
            },
            FieldType::HumanSize => match parse_human_size(raw) {
                Some(bytes) => Key::Size { bytes },
                None => Key::Malformed,
            },
            FieldType::Month => match parse_month(raw) {
                Some(ordinal) => Key::Month { ordinal },
                None => Key::Malformed,
            },
        }
    }
}

/// Ascending comparison of two keys together with their raw text.
///
/// Two malformed keys compare by raw text, a single malformed key sorts after a well formed one.
pub(crate) fn compare_keys(a_raw: &str, a: &Key, b_raw: &str, b: &Key) -> Ordering {
    match (a, b) {
        (Key::Malformed, Key::Malformed) => a_raw.cmp(b_raw),
        (Key::Malformed, _) => Ordering::Greater,
        (_, Key::Malformed) => Ordering::Less,
        (Key::Integer { i: x }, Key::Integer { i: y }) => x.cmp(y),
        (Key::Size { bytes: x }, Key::Size { bytes: y }) => x.total_cmp(y),
        (Key::Month { ordinal: x }, Key::Month { ordinal: y }) => x.cmp(y),
        _ => a_raw.cmp(b_raw),
    }
}

/// Parse `<number><unit>` where unit is one of K, M, G, T (latin or cyrillic, any case).
///
/// The number is made of ASCII digits and '.'. A key without a numeric prefix does not parse.
/// An unknown unit leaves the number unscaled.
pub(crate) fn parse_human_size(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let split = s.find(|c: char| !c.is_ascii_digit() && c != '.').unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    if number.is_empty() {
        return None;
    }
    let value = f64::from_str(number).ok()?;
    let multiplier = match unit.trim().to_uppercase().as_str() {
        "K" | "К" => KIB,
        "M" | "М" => KIB * KIB,
        "G" | "Г" => KIB * KIB * KIB,
        "T" | "Т" => KIB * KIB * KIB * KIB,
        _ => 1.0,
    };
    Some(value * multiplier)
}

/// Month ordinal 1..=12 of the first three characters, case sensitive.
pub(crate) fn parse_month(raw: &str) -> Option<u8> {
    let end = match raw.char_indices().nth(3) {
        Some((end, _)) => end,
        None => raw.len(),
    };
    let prefix = &raw[..end];
    MONTHS.iter()
        .position(|month| *month == prefix)
        .map(|index| index as u8 + 1)
}
