use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

/// One product as returned by the index. No fixed schema: any key may be
/// absent, null, or of an unexpected type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    /// Non-object hits become an empty record, which normalizes to a row
    /// without identity and is dropped during cleaning.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => RawRecord(map),
            _ => RawRecord::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Trimmed string value of `key`, only if it is a string with content.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        RawRecord(map)
    }
}

/// Fixed-schema output row. Field order is the column order of the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct CanonicalRow {
    pub reference_code: String,
    pub local_reference: String,
    pub title: String,
    pub price: Option<Decimal>,
    pub currency: String,
    pub url: String,
    pub collection: String,
    pub source_id: String,
}

impl CanonicalRow {
    pub const COLUMNS: [&'static str; 8] = [
        "reference_code",
        "local_reference",
        "title",
        "price",
        "currency",
        "url",
        "collection",
        "source_id",
    ];
}

/// One fetch response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    pub total_hits: u64,
    pub total_pages: u64,
    pub records: Vec<RawRecord>,
}

/// Finalized rows: `reference_code` is non-empty and unique across the set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<CanonicalRow>,
}

impl Dataset {
    /// Only the cleaner builds a dataset; it guarantees the identity invariant.
    pub(crate) fn from_clean_rows(rows: Vec<CanonicalRow>) -> Self {
        Dataset { rows }
    }

    pub fn rows(&self) -> &[CanonicalRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        CanonicalRow::COLUMNS.len()
    }

    /// Most frequent currency codes, descending by count then by code.
    pub fn currency_counts(&self, top: usize) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for row in &self.rows {
            *counts.entry(row.currency.as_str()).or_default() += 1;
        }
        let mut counts: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(code, n)| (code.to_string(), n))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts.truncate(top);
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_skips_blank_and_non_strings() {
        let r = RawRecord::from_value(json!({
            "a": "  CRWSTA0030 ",
            "b": "   ",
            "c": 42,
            "d": null
        }));
        assert_eq!(r.text("a"), Some("CRWSTA0030"));
        assert_eq!(r.text("b"), None);
        assert_eq!(r.text("c"), None);
        assert_eq!(r.text("d"), None);
        assert_eq!(r.text("missing"), None);
    }

    #[test]
    fn non_object_hit_is_empty_record() {
        assert_eq!(RawRecord::from_value(json!([1, 2])), RawRecord::default());
    }

    #[test]
    fn currency_counts_ranked() {
        let row = |c: &str| CanonicalRow { currency: c.into(), ..Default::default() };
        let ds = Dataset::from_clean_rows(vec![row("EUR"), row("CHF"), row("EUR"), row("GBP")]);
        assert_eq!(
            ds.currency_counts(2),
            vec![("EUR".to_string(), 2), ("CHF".to_string(), 1)]
        );
    }
}
