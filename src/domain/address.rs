// src/domain/address.rs

use similar::TextDiff;

/// Street suffixes folded to their postal abbreviation.
const SUFFIXES: &[(&str, &str)] = &[
    ("street", "st"),
    ("avenue", "ave"),
    ("road", "rd"),
    ("drive", "dr"),
    ("boulevard", "blvd"),
    ("lane", "ln"),
    ("court", "ct"),
];

/// Canonical lookup key for an address: lowercase, single spaces, street
/// suffixes abbreviated. Idempotent.
pub fn normalize(address: &str) -> String {
    address
        .split_whitespace()
        .map(|token| fold_suffix(&token.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fold a single token, keeping trailing punctuation ("Street," -> "st,").
fn fold_suffix(token: &str) -> String {
    let core_len = token.trim_end_matches(|c: char| !c.is_alphanumeric()).len();
    let (core, tail) = token.split_at(core_len);

    match SUFFIXES.iter().find(|(full, _)| *full == core) {
        Some((_, abbrev)) => format!("{abbrev}{tail}"),
        None => token.to_string(),
    }
}

/// Similarity ratio in `[0, 1]` between two addresses, compared on their
/// normalized forms.
pub fn similarity(a: &str, b: &str) -> f32 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    TextDiff::from_chars(a.as_str(), b.as_str()).ratio()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// Split "street, city, STATE ZIP" into components. Missing parts are empty.
pub fn parse_address(address: &str) -> AddressParts {
    let mut parts = address.trim().split(',').map(str::trim);
    let mut out = AddressParts::default();

    if let Some(street) = parts.next() {
        out.street = street.to_string();
    }
    if let Some(city) = parts.next() {
        out.city = city.to_string();
    }
    if let Some(last) = parts.next() {
        let mut state_zip = last.split_whitespace();
        if let Some(state) = state_zip.next() {
            out.state = state.to_string();
        }
        if let Some(zip) = state_zip.next() {
            out.zip_code = zip.to_string();
        }
    }

    out
}
