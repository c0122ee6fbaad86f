//! Byte-size estimation for policy enforcement and analytics
//!
//! Estimates are deliberately upper bounds; they feed the per-item
//! `max_size` gate and the analytics totals that drive eviction, not
//! allocator accounting.

use serde_json::Value;

/// Flat overhead charged per stored item (metadata, map slots)
const ITEM_BASE_OVERHEAD: u64 = 64;

/// Extra charge per configured expiry field
const EXPIRY_FIELD_OVERHEAD: u64 = 8;

const LIST_OVERHEAD: u64 = 16;
const MAP_OVERHEAD: u64 = 32;

/// Estimate returned when a value defies estimation
const FALLBACK_ESTIMATE: u64 = 100;

/// Upper-bound byte estimate for a JSON value
pub fn estimate_value_size(value: &Value) -> u64 {
    match value {
        Value::Null => 4,
        Value::Bool(_) => 1,
        Value::Number(n) => {
            if n.is_f64() {
                8
            } else {
                4
            }
        }
        Value::String(s) => (s.len() as u64) * 2,
        Value::Array(items) => {
            LIST_OVERHEAD + items.iter().map(estimate_value_size).sum::<u64>()
        }
        Value::Object(map) => {
            MAP_OVERHEAD
                + map
                    .iter()
                    .map(|(k, v)| (k.len() as u64) * 2 + estimate_value_size(v))
                    .sum::<u64>()
        }
    }
}

/// Estimate for an arbitrary serializable value: serialize to JSON and walk
/// it; when serialization fails, fall back to a flat guess.
pub fn estimate_serializable<T: serde::Serialize>(value: &T) -> u64 {
    serde_json::to_value(value)
        .map(|v| estimate_value_size(&v))
        .unwrap_or(FALLBACK_ESTIMATE)
}

/// Estimate for a full cache item.
///
/// Compressed items are charged the exact compressed payload length; for
/// uncompressed items the caller passes the JSON-value estimate of the
/// payload so strings keep their type-based estimate.
pub fn estimate_item_size(
    payload_estimate: u64,
    has_expiry: bool,
    has_sliding: bool,
) -> u64 {
    let mut total = ITEM_BASE_OVERHEAD + payload_estimate;
    if has_expiry {
        total += EXPIRY_FIELD_OVERHEAD;
    }
    if has_sliding {
        total += EXPIRY_FIELD_OVERHEAD;
    }
    total
}
