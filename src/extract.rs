//! Per-attribute field extraction from raw index hits.
//!
//! The index schema drifts across product eras and locales, so each attribute
//! is read from an ordered list of candidate keys and the first one holding a
//! non-blank string wins. Nothing here fails: unusable data yields an empty
//! string or `None`.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use url::Url;

use crate::record::RawRecord;

pub const REFERENCE_KEYS: &[&str] = &[
    "globalReference",
    "shortGlobalReference",
    "localReference",
    "objectID",
];
pub const LOCAL_REFERENCE_KEYS: &[&str] = &["localReference", "shortGlobalReference"];
pub const TITLE_KEYS: &[&str] = &["productName", "englishProductName", "title", "productModel"];
pub const CURRENCY_KEYS: &[&str] = &["priceCurrency", "currency"];
pub const URL_KEYS: &[&str] = &["newPdpLink", "pdpLink", "oldPdpLink"];
pub const COLLECTION_KEYS: &[&str] = &[
    "collectionProductLine",
    "englishCollectionProductLine",
    "englishCollectionName",
    "collectionText",
];

const PRICE_VALUE_KEY: &str = "priceValue";
const PRICE_DISPLAY_KEY: &str = "price";
const COLLECTIONS_LIST_KEY: &str = "_collections";
const SOURCE_ID_KEY: &str = "objectID";

pub const DEFAULT_CURRENCY: &str = "EUR";

/// First candidate key holding a non-blank string, trimmed.
pub fn first_text<'a>(record: &'a RawRecord, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| record.text(k))
}

pub fn reference_code(record: &RawRecord) -> String {
    first_text(record, REFERENCE_KEYS)
        .map(str::to_uppercase)
        .unwrap_or_default()
}

pub fn local_reference(record: &RawRecord) -> String {
    first_text(record, LOCAL_REFERENCE_KEYS)
        .map(str::to_uppercase)
        .unwrap_or_default()
}

pub fn title(record: &RawRecord) -> String {
    first_text(record, TITLE_KEYS)
        .map(str::to_string)
        .unwrap_or_default()
}

/// Numeric `priceValue` when present, else the parsed display string.
pub fn price(record: &RawRecord) -> Option<Decimal> {
    if let Some(Value::Number(n)) = record.get(PRICE_VALUE_KEY) {
        if let Some(d) = decimal_from_number(n) {
            return Some(d);
        }
    }
    record.text(PRICE_DISPLAY_KEY).and_then(parse_display_price)
}

fn decimal_from_number(n: &Number) -> Option<Decimal> {
    Decimal::from_str(&n.to_string())
        .ok()
        .or_else(|| n.as_f64().and_then(Decimal::from_f64))
}

fn currency_symbols() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\p{Sc}").unwrap())
}

/// Parse a locale-formatted display price such as `"5 000 €"` or `"1.234,56€"`.
///
/// Dots and apostrophes are thousands separators, the comma is the decimal
/// separator. Returns `None` when nothing numeric is left.
pub fn parse_display_price(display: &str) -> Option<Decimal> {
    let stripped = currency_symbols().replace_all(display, "");
    let normalized: String = stripped
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '.' | '\'' | '\u{2019}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    Decimal::from_str(&normalized).ok()
}

pub fn currency(record: &RawRecord) -> String {
    first_text(record, CURRENCY_KEYS)
        .map(str::to_uppercase)
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

/// Product page link. Anything without a scheme gets the site origin
/// prepended verbatim; the path itself is never resolved or re-encoded.
pub fn url(record: &RawRecord, base: &Url) -> String {
    let Some(link) = first_text(record, URL_KEYS) else {
        return String::new();
    };
    if Url::parse(link).is_ok() {
        return link.to_string();
    }
    let origin = base.as_str().trim_end_matches('/');
    if link.starts_with('/') {
        format!("{}{}", origin, link)
    } else {
        format!("{}/{}", origin, link)
    }
}

pub fn collection(record: &RawRecord) -> String {
    if let Some(name) = first_text(record, COLLECTION_KEYS) {
        return name.to_string();
    }
    match record.get(COLLECTIONS_LIST_KEY) {
        Some(Value::Array(items)) => items.first().map(scalar_to_string).unwrap_or_default(),
        _ => String::new(),
    }
}

/// Native identifier of the hit, rendered as text whatever its JSON type.
pub fn source_id(record: &RawRecord) -> String {
    record
        .get(SOURCE_ID_KEY)
        .map(scalar_to_string)
        .unwrap_or_default()
}

fn scalar_to_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> RawRecord {
        RawRecord::from_value(v)
    }

    fn base() -> Url {
        Url::parse("https://www.cartier.com").unwrap()
    }

    #[test]
    fn reference_prefers_global_reference() {
        let r = rec(json!({ "globalReference": "crwsta0030", "objectID": "123" }));
        assert_eq!(reference_code(&r), "CRWSTA0030");
    }

    #[test]
    fn reference_falls_through_blank_candidates() {
        let r = rec(json!({
            "globalReference": "  ",
            "shortGlobalReference": null,
            "localReference": "wsta0030",
        }));
        assert_eq!(reference_code(&r), "WSTA0030");
        assert_eq!(reference_code(&rec(json!({ "objectID": "x-1" }))), "X-1");
        assert_eq!(reference_code(&rec(json!({}))), "");
    }

    #[test]
    fn local_reference_order() {
        let r = rec(json!({ "shortGlobalReference": "s1", "localReference": "l1" }));
        assert_eq!(local_reference(&r), "L1");
        assert_eq!(local_reference(&rec(json!({ "shortGlobalReference": "s1" }))), "S1");
    }

    #[test]
    fn title_candidates() {
        let r = rec(json!({ "englishProductName": " Santos de Cartier ", "productModel": "M" }));
        assert_eq!(title(&r), "Santos de Cartier");
        assert_eq!(title(&rec(json!({ "productName": 3 }))), "");
    }

    #[test]
    fn price_display_narrow_space_euro() {
        assert_eq!(parse_display_price("5\u{202f}000€"), Some(Decimal::from(5000)));
        assert_eq!(parse_display_price("5\u{a0}000 €"), Some(Decimal::from(5000)));
    }

    #[test]
    fn price_display_european_decimal() {
        assert_eq!(parse_display_price("1.234,56€"), Some(Decimal::new(123456, 2)));
    }

    #[test]
    fn price_garbage_is_none() {
        assert_eq!(parse_display_price("sur demande"), None);
        assert_eq!(parse_display_price("€"), None);
        assert_eq!(price(&rec(json!({ "price": "Prix sur demande" }))), None);
        assert_eq!(price(&rec(json!({}))), None);
    }

    #[test]
    fn price_prefers_numeric_value() {
        let r = rec(json!({ "priceValue": 12900, "price": "1,00 €" }));
        assert_eq!(price(&r), Some(Decimal::from(12900)));
        let r = rec(json!({ "priceValue": 1234.5 }));
        assert_eq!(price(&r), Some(Decimal::new(12345, 1)));
    }

    #[test]
    fn price_ignores_non_numeric_value_field() {
        let r = rec(json!({ "priceValue": "12900", "price": "7 350 €" }));
        assert_eq!(price(&r), Some(Decimal::from(7350)));
    }

    #[test]
    fn currency_default_and_upper() {
        assert_eq!(currency(&rec(json!({ "currency": "chf" }))), "CHF");
        assert_eq!(currency(&rec(json!({ "priceCurrency": "gbp", "currency": "chf" }))), "GBP");
        assert_eq!(currency(&rec(json!({}))), "EUR");
    }

    #[test]
    fn url_relative_gets_origin() {
        let r = rec(json!({ "pdpLink": "/en-fr/watch/x" }));
        assert_eq!(url(&r, &base()), "https://www.cartier.com/en-fr/watch/x");
    }

    #[test]
    fn url_relative_kept_verbatim() {
        let b = base();
        let r = rec(json!({ "pdpLink": "//cdn.example.com/x" }));
        assert_eq!(url(&r, &b), "https://www.cartier.com//cdn.example.com/x");
        let r = rec(json!({ "pdpLink": "/a/../b/./c" }));
        assert_eq!(url(&r, &b), "https://www.cartier.com/a/../b/./c");
        let r = rec(json!({ "pdpLink": "/en-fr/watch/santos é" }));
        assert_eq!(url(&r, &b), "https://www.cartier.com/en-fr/watch/santos é");
        let r = rec(json!({ "pdpLink": "en-fr/watch/x" }));
        assert_eq!(url(&r, &b), "https://www.cartier.com/en-fr/watch/x");
    }

    #[test]
    fn url_absolute_unchanged() {
        let link = "https://www.cartier.com/fr-fr/montres/santos?x=1";
        let r = rec(json!({ "newPdpLink": link, "pdpLink": "/other" }));
        assert_eq!(url(&r, &base()), link);
    }

    #[test]
    fn url_missing_is_empty() {
        assert_eq!(url(&rec(json!({ "title": "t" })), &base()), "");
    }

    #[test]
    fn collection_falls_back_to_list() {
        let r = rec(json!({ "collectionText": "", "_collections": ["Tank", "Santos"] }));
        assert_eq!(collection(&r), "Tank");
        assert_eq!(collection(&rec(json!({ "_collections": [] }))), "");
        let r = rec(json!({ "englishCollectionName": "Ballon Bleu", "_collections": ["Tank"] }));
        assert_eq!(collection(&r), "Ballon Bleu");
    }

    #[test]
    fn source_id_stringifies() {
        assert_eq!(source_id(&rec(json!({ "objectID": " abc " }))), "abc");
        assert_eq!(source_id(&rec(json!({ "objectID": 991 }))), "991");
        assert_eq!(source_id(&rec(json!({}))), "");
    }
}
