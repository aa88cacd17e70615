//! Offer extraction from harvested screen text.
//!
//! The screen is noisy: labels, OCR fragments, and decoration arrive as a
//! flat list of lines in harvest order. Each offer field is resolved
//! independently over that list. Price, distance and destination keep the
//! first line that matches; the call count keeps the highest explicit
//! mention found anywhere.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::types::Offer;

lazy_static! {
    // Fee: digits with optional thousands separators followed by the
    // currency marker, e.g. "5,000원"
    static ref PRICE: Regex = Regex::new(r"([0-9,]+)\s*원").unwrap();

    // Distance in kilometers, e.g. "1.2km"
    static ref DIST_KM: Regex = Regex::new(r"([0-9.]+)\s*km").unwrap();

    // Distance in meters, e.g. "500m"
    static ref DIST_M: Regex = Regex::new(r"([0-9.]+)\s*m").unwrap();
}

/// Suffixes that mark a line as a destination address.
const ADDRESS_KEYWORDS: &[&str] = &["동", "구", "로", "길", "아파트", "빌딩", "시", "군"];

/// Phrases announcing a bundled offer. The three-call phrases are checked
/// first so a line mentioning both sizes resolves to the larger bundle.
const TRIPLE_CALL_TOKENS: &[&str] = &["3건", "3개"];
const DOUBLE_CALL_TOKENS: &[&str] = &["2건", "2개"];

/// Parse one screen's worth of text lines into an offer.
///
/// Returns `None` unless both the fee and the distance were found; an
/// unresolved destination defaults to empty, an unannounced call count
/// defaults to a single call.
pub fn parse_offer(lines: &[String]) -> Option<Offer> {
    let mut price: Option<u32> = None;
    let mut distance: Option<f64> = None;
    let mut address: Option<String> = None;
    let mut call_count: u32 = 1;

    for line in lines {
        if price.is_none() {
            price = extract_price(line);
        }

        if distance.is_none() {
            distance = extract_distance(line);
        }

        if address.is_none() && is_address_like(line) {
            address = Some(line.clone());
        }

        if let Some(explicit) = extract_call_count(line) {
            call_count = call_count.max(explicit);
        }
    }

    let offer = Offer {
        call_count,
        total_price: price?,
        distance_km: distance?,
        address: address.unwrap_or_default(),
    };

    if !offer.is_valid() {
        trace!("Discarding degenerate offer: {:?}", offer);
        return None;
    }

    Some(offer)
}

/// Fee from a line like "배달료 5,000원".
/// A match that fails to convert counts as no match, so later lines still
/// get their chance.
fn extract_price(line: &str) -> Option<u32> {
    let captures = PRICE.captures(line)?;
    captures[1].replace(',', "").parse().ok()
}

/// Distance from a line like "1.2km" or "800m". The kilometer pattern is
/// tried first; meter values are converted to kilometers.
fn extract_distance(line: &str) -> Option<f64> {
    if let Some(captures) = DIST_KM.captures(line) {
        if let Ok(km) = captures[1].parse::<f64>() {
            return Some(km);
        }
    }

    if let Some(captures) = DIST_M.captures(line) {
        if let Ok(m) = captures[1].parse::<f64>() {
            return Some(m / 1000.0);
        }
    }

    None
}

/// Explicit bundle-size mention on this line, if any.
fn extract_call_count(line: &str) -> Option<u32> {
    if TRIPLE_CALL_TOKENS.iter().any(|t| line.contains(t)) {
        Some(3)
    } else if DOUBLE_CALL_TOKENS.iter().any(|t| line.contains(t)) {
        Some(2)
    } else {
        None
    }
}

/// A line reads like an address when it carries an administrative suffix
/// and enough characters to be more than a stray token.
fn is_address_like(line: &str) -> bool {
    ADDRESS_KEYWORDS.iter().any(|k| line.contains(k)) && line.chars().count() > 5
}
