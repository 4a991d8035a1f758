//! `Accept` header parsing and media type negotiation
//!
//! A header such as `text/html, application/json;q=0.9, */*;q=0.1` is split
//! into [`AcceptCandidate`]s. [`preferred`] then picks which of the types a
//! handler can produce the client likes best.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One media range from an `Accept` header
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptCandidate {
    pub value: String,
    /// q-value in `[0, 1]`
    pub quality: f32,
    pub params: BTreeMap<String, String>,
    /// Position within the header, when parsed from one
    pub original_index: Option<usize>,
}

/// Parse a single media range with its parameters
///
/// `q` is taken as the quality and kept out of `params`. A missing or
/// malformed `q` means `1`; out-of-range values are clamped.
///
/// # Examples
/// ```
/// use respkit::http::accept::accept_params;
/// let c = accept_params("image/png; q=0.8; level=1", None);
/// assert_eq!(c.value, "image/png");
/// assert_eq!(c.quality, 0.8);
/// assert_eq!(c.params.get("level").map(String::as_str), Some("1"));
/// ```
pub fn accept_params(input: &str, index: Option<usize>) -> AcceptCandidate {
    let mut segments = input.split(';');
    let value = segments.next().unwrap_or_default().trim().to_string();

    let mut quality = 1.0;
    let mut params = BTreeMap::new();
    for segment in segments {
        let Some((key, val)) = segment.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();
        if key == "q" {
            quality = parse_quality(val);
        } else {
            params.insert(key.to_string(), val.to_string());
        }
    }

    AcceptCandidate {
        value,
        quality,
        params,
        original_index: index,
    }
}

/// Parse every comma-separated media range, recording its position
pub fn parse_accept(header: &str) -> Vec<AcceptCandidate> {
    header
        .split(',')
        .filter(|range| !range.trim().is_empty())
        .enumerate()
        .map(|(i, range)| accept_params(range, Some(i)))
        .collect()
}

/// Pick the index of the offered type the client prefers
///
/// Each offer is scored by its most specific matching range. Offers nothing
/// matches, or whose best match has `q=0`, are not acceptable. The rest rank
/// by quality, then by the position of the range in the header, then by
/// specificity, then by the order of the offers. Without an `Accept` header
/// the first offer wins.
pub fn preferred(accept: Option<&str>, offered: &[&str]) -> Option<usize> {
    if offered.is_empty() {
        return None;
    }
    let Some(header) = accept.filter(|h| !h.trim().is_empty()) else {
        return Some(0);
    };

    let ranges = parse_accept(header);
    let mut ranked: Vec<Priority> = offered
        .iter()
        .enumerate()
        .filter_map(|(i, offer)| priority_for(offer, i, &ranges))
        .filter(|p| p.quality > 0.0)
        .collect();
    ranked.sort_by(compare_priority);
    ranked.first().map(|p| p.offer)
}

#[derive(Debug, Clone, Copy)]
struct Priority {
    offer: usize,
    quality: f32,
    position: usize,
    specificity: u8,
}

fn priority_for(offer: &str, offer_index: usize, ranges: &[AcceptCandidate]) -> Option<Priority> {
    let offer = accept_params(offer, None);
    let (offer_type, offer_subtype) = split_type(&offer.value)?;

    ranges
        .iter()
        .filter_map(|range| {
            let specificity = specificity(range, offer_type, offer_subtype, &offer.params)?;
            Some(Priority {
                offer: offer_index,
                quality: range.quality,
                position: range.original_index.unwrap_or(usize::MAX),
                specificity,
            })
        })
        .reduce(|best, p| {
            let better = p
                .specificity
                .cmp(&best.specificity)
                .then_with(|| p.quality.total_cmp(&best.quality))
                .then_with(|| best.position.cmp(&p.position));
            if better == Ordering::Greater {
                p
            } else {
                best
            }
        })
}

/// Bit 4: type matched, bit 2: subtype matched, bit 1: params matched
fn specificity(
    range: &AcceptCandidate,
    offer_type: &str,
    offer_subtype: &str,
    offer_params: &BTreeMap<String, String>,
) -> Option<u8> {
    let (range_type, range_subtype) = split_type(&range.value)?;
    let mut s = 0;

    if range_type.eq_ignore_ascii_case(offer_type) {
        s |= 4;
    } else if range_type != "*" {
        return None;
    }

    if range_subtype.eq_ignore_ascii_case(offer_subtype) {
        s |= 2;
    } else if range_subtype != "*" {
        return None;
    }

    if !range.params.is_empty() {
        let all_match = range.params.iter().all(|(key, value)| {
            value == "*"
                || offer_params
                    .iter()
                    .any(|(k, v)| k.eq_ignore_ascii_case(key) && v.eq_ignore_ascii_case(value))
        });
        if !all_match {
            return None;
        }
        s |= 1;
    }

    Some(s)
}

fn compare_priority(a: &Priority, b: &Priority) -> Ordering {
    b.quality
        .total_cmp(&a.quality)
        .then_with(|| a.position.cmp(&b.position))
        .then_with(|| b.specificity.cmp(&a.specificity))
        .then_with(|| a.offer.cmp(&b.offer))
}

fn split_type(value: &str) -> Option<(&str, &str)> {
    let (ty, subtype) = value.split_once('/')?;
    let (ty, subtype) = (ty.trim(), subtype.trim());
    if ty.is_empty() || subtype.is_empty() {
        return None;
    }
    Some((ty, subtype))
}

fn parse_quality(raw: &str) -> f32 {
    match raw.parse::<f32>() {
        Ok(q) if q.is_finite() => q.clamp(0.0, 1.0),
        _ => 1.0,
    }
}
