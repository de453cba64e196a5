//! Tolerant mapping of upstream search payloads onto [`NormalizedResult`].
//!
//! Every output field is looked up through an ordered list of candidate
//! source keys; the first present one wins, otherwise a typed default.
//! Nothing in here returns an error.

use crate::models::{NormalizedProduct, NormalizedResult};
use serde_json::{Map, Value};
use tracing::{debug, warn};

// ── Candidate field names ─────────────────────────────────────────────────────

const ID_KEYS: &[&str] = &["id", "productId"];
const TITLE_KEYS: &[&str] = &["productTitle", "title", "name"];
const PRICE_KEYS: &[&str] = &["price", "lowestPrice", "originalPrice"];
const IMAGE_KEYS: &[&str] = &["imageUrl", "productImageUrl", "thumbnail"];
const SHOP_KEYS: &[&str] = &["mallName", "shopName", "seller"];
const RATING_KEYS: &[&str] = &["reviewScore", "rating"];
const REVIEW_COUNT_KEYS: &[&str] = &["reviewCount", "reviews"];
const URL_KEYS: &[&str] = &["productUrl", "url", "link"];

const TOTAL_KEYS: &[&str] = &["totalCount", "total"];
const HAS_MORE_KEYS: &[&str] = &["hasMore", "hasNext"];
const CURSOR_KEYS: &[&str] = &["cursor", "nextCursor"];

// ── Field helpers ─────────────────────────────────────────────────────────────

/// Absent, `null` and `""` all count as missing.
fn is_present(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// First present value among `keys`.
pub fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| is_present(v))
}

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> String {
    match first_present(obj, keys) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Non-finite values ("NaN", "inf") fall back to 0.0 so the output stays valid JSON.
fn float_field(obj: &Map<String, Value>, keys: &[&str]) -> f64 {
    let parsed = match first_present(obj, keys) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite()).unwrap_or(0.0)
}

fn int_field(obj: &Map<String, Value>, keys: &[&str]) -> i64 {
    match first_present(obj, keys) {
        Some(v @ Value::Number(_)) => number_to_i64(v),
        Some(Value::String(s)) => parse_count(s),
        _ => 0,
    }
}

fn number_to_i64(v: &Value) -> i64 {
    v.as_i64()
        .or_else(|| v.as_f64().map(|f| f as i64))
        .unwrap_or(0)
}

/// Leading integer, ignoring thousands separators: "1,204 reviews" → 1204.
pub fn parse_count(s: &str) -> i64 {
    let digits: String = s
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Price in the smallest currency unit.
///
/// Numbers pass through; text keeps only its digits: "₩1,234" → 1234.
pub fn parse_price(v: &Value) -> i64 {
    match v {
        Value::Number(_) => number_to_i64(v),
        Value::String(s) => {
            let cleaned: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
            cleaned.parse().unwrap_or(0)
        }
        _ => 0,
    }
}

fn bool_field(obj: &Map<String, Value>, keys: &[&str]) -> bool {
    match first_present(obj, keys) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

// ── Product list ──────────────────────────────────────────────────────────────

/// Where the product array lives, in priority order.
fn locate_products(data: &Value) -> Option<&Value> {
    if data.is_array() {
        return Some(data);
    }
    let obj = data.as_object()?;

    obj.get("shoppingResult")
        .and_then(|r| r.get("products"))
        .filter(|v| !v.is_null())
        .or_else(|| obj.get("products").filter(|v| !v.is_null()))
        .or_else(|| obj.get("items").filter(|v| !v.is_null()))
}

pub fn normalize_product(obj: &Map<String, Value>) -> NormalizedProduct {
    NormalizedProduct {
        id: text_field(obj, ID_KEYS),
        title: text_field(obj, TITLE_KEYS),
        price: first_present(obj, PRICE_KEYS).map(parse_price).unwrap_or(0),
        image_url: text_field(obj, IMAGE_KEYS),
        shop_name: text_field(obj, SHOP_KEYS),
        rating: float_field(obj, RATING_KEYS),
        review_count: int_field(obj, REVIEW_COUNT_KEYS),
        url: text_field(obj, URL_KEYS),
    }
}

/// `None` when the payload shape is unusable.
fn try_normalize(data: &Value) -> Option<NormalizedResult> {
    if !data.is_object() && !data.is_array() {
        return None;
    }

    let products: Vec<NormalizedProduct> = match locate_products(data) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .map(normalize_product)
            .collect(),
        Some(_) => return None,
        None => Vec::new(),
    };

    let Some(top) = data.as_object() else {
        let total_count = products.len() as i64;
        return Some(NormalizedResult {
            products,
            total_count,
            has_more: false,
            cursor: None,
        });
    };

    let total_count = match first_present(top, TOTAL_KEYS) {
        Some(v @ Value::Number(_)) => number_to_i64(v),
        Some(Value::String(s)) => parse_count(s),
        _ => products.len() as i64,
    };

    let cursor = match first_present(top, CURSOR_KEYS) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    Some(NormalizedResult {
        total_count,
        has_more: bool_field(top, HAS_MORE_KEYS),
        cursor,
        products,
    })
}

pub fn normalize_value(data: &Value) -> NormalizedResult {
    match try_normalize(data) {
        Some(result) => {
            debug!(
                "Normalized {} products (total {}, has_more {})",
                result.products.len(),
                result.total_count,
                result.has_more
            );
            result
        }
        None => {
            warn!("Unrecognised upstream payload shape, returning empty result");
            NormalizedResult::empty()
        }
    }
}

/// Parse and normalize a raw response body.
pub fn normalize(raw_body: &str) -> NormalizedResult {
    match serde_json::from_str::<Value>(raw_body) {
        Ok(data) => normalize_value(&data),
        Err(e) => {
            warn!("Error parsing upstream response: {}", e);
            NormalizedResult::empty()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
