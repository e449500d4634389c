use url::Url;

use crate::extract;
use crate::record::{CanonicalRow, RawRecord};

/// Turns raw hits into canonical rows. Total: every record yields a row.
#[derive(Debug, Clone)]
pub struct Normalizer {
    base: Url,
}

impl Normalizer {
    /// `base` is the public site origin used to absolutize product links.
    pub fn new(base: Url) -> Self {
        Normalizer { base }
    }

    pub fn normalize(&self, record: &RawRecord) -> CanonicalRow {
        CanonicalRow {
            reference_code: extract::reference_code(record),
            local_reference: extract::local_reference(record),
            title: extract::title(record),
            price: extract::price(record),
            currency: extract::currency(record),
            url: extract::url(record, &self.base),
            collection: extract::collection(record),
            source_id: extract::source_id(record),
        }
    }
}
